use pretty_assertions::assert_eq;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use session_feed::app::{App, AppOptions};
use session_feed::session::{FeedItem, SessionIndex};
use session_feed::virtual_list::{ContentSource, VirtualListConfig};
use std::time::Duration;
use tokio::time::Instant;

use crate::helpers::session_file;

fn render_frame_to_string(terminal: &mut Terminal<TestBackend>, app: &mut App) -> String {
    terminal.draw(|f| session_feed::ui::render(f, app)).expect("draw frame");
    let buffer = terminal.backend().buffer();
    let area = buffer.area;
    let mut out = String::new();
    for y in 0..area.height {
        for x in 0..area.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

async fn app_for(records: usize) -> (tempfile::NamedTempFile, App) {
    let file = session_file(records);
    let index = SessionIndex::open(file.path()).await.expect("index");
    let options = AppOptions {
        list: VirtualListConfig::default().with_min_item_height(1).with_buffer(2).with_unload_buffer(4),
        load_ahead: 0,
        ..AppOptions::default()
    };
    let app = App::new(&options, index).expect("app");
    (file, app)
}

/// Fetch whatever the loader has queued and apply it to the list.
async fn load_pending(app: &mut App) {
    let batch = app.loader.take_due(Instant::now() + Duration::from_secs(1)).expect("queued batch");
    let loaded = app.source.fetch(&batch.ranges).await.expect("fetch");
    {
        let mut list = app.list.borrow_mut();
        for (index, entry) in loaded {
            list.with_item_mut(index, |item: &mut FeedItem| item.entry = Some(entry));
        }
    }
    app.loader.complete(&batch);
}

#[tokio::test]
async fn unloaded_records_render_as_placeholders() {
    let (_file, mut app) = app_for(50).await;
    let mut terminal = Terminal::new(TestBackend::new(60, 16)).expect("terminal");

    let screen = render_frame_to_string(&mut terminal, &mut app);
    assert!(screen.contains("record 1 loading"), "{screen}");
    assert!(screen.contains("50 records"), "{screen}");
    assert!(!app.loader.pending().is_empty());
}

#[tokio::test]
async fn loaded_records_render_and_get_measured() {
    let (_file, mut app) = app_for(50).await;
    let mut terminal = Terminal::new(TestBackend::new(60, 16)).expect("terminal");
    render_frame_to_string(&mut terminal, &mut app);

    load_pending(&mut app).await;
    // One frame to measure, one to draw at the measured heights.
    render_frame_to_string(&mut terminal, &mut app);
    let screen = render_frame_to_string(&mut terminal, &mut app);

    assert!(screen.contains("message 0"), "{screen}");
    assert!(screen.contains("User"), "{screen}");
    let list = app.list.borrow();
    assert_eq!(list.height_of(0), 3);
    assert!(list.visible_rows_measured());
}

#[tokio::test]
async fn empty_session_shows_a_notice() {
    let (_file, mut app) = app_for(0).await;
    let mut terminal = Terminal::new(TestBackend::new(60, 10)).expect("terminal");
    let screen = render_frame_to_string(&mut terminal, &mut app);
    assert!(screen.contains("no records yet"), "{screen}");
    assert!(screen.contains("no rows"), "{screen}");
}
