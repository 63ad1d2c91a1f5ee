use session_feed::virtual_list::{ListEvent, VirtualList, VirtualListConfig};
use std::io::Write;
use tokio::sync::mpsc;

/// List of `len` rows keyed by their own value.
pub fn keyed_list(len: u32, min_height: u32, buffer: usize, unload: usize, viewport: u32) -> VirtualList<u32, u32> {
    let config = VirtualListConfig::default()
        .with_min_item_height(min_height)
        .with_buffer(buffer)
        .with_unload_buffer(unload);
    let mut list = VirtualList::new(config, |id: &u32| Some(*id)).expect("valid config");
    list.set_items((0..len).collect()).expect("unique keys");
    list.set_viewport(viewport);
    list
}

/// Report `height(key)` for every row in the visible range. Returns the
/// number of rows whose height changed.
pub fn measure_visible(list: &mut VirtualList<u32, u32>, height: impl Fn(u32) -> u32) -> usize {
    let visible = list.visible_range();
    let batch: Vec<(u32, u32)> = (visible.start..visible.end)
        .filter_map(|i| list.key_of(i).map(|key| (*key, height(*key))))
        .collect();
    list.apply_measurements(batch)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<ListEvent>) -> Vec<ListEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

/// Session file with `records` chat records.
pub fn session_file(records: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    for i in 0..records {
        let role = if i % 2 == 0 { "user" } else { "assistant" };
        writeln!(file, "{{\"role\":\"{role}\",\"content\":\"message {i}\"}}").expect("write record");
    }
    file
}
