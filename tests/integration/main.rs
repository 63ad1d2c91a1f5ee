mod feed_render;
mod helpers;
mod range_loading;
mod settle;
mod virtual_window;
