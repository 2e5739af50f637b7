use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Paragraph, Widget},
};

/// On-screen counters shown with `--debug`.
#[derive(Default)]
pub struct DebugState {
    pub num_events: usize,
    pub num_frames: usize,
    pub num_key_events: usize,
    pub last_key_event_name: String,
    /// Last action taken (e.g. "next_page") for debugging key handling.
    pub last_action: String,
    pub enabled: bool,
    pub engine_variant: Option<&'static str>,
    pub window_fetches: usize,
    pub stale_results: usize,
}

impl DebugState {
    pub fn on_key(&mut self, event: &crossterm::event::KeyEvent) {
        self.num_key_events += 1;
        self.last_key_event_name = format!("{:?}", event.code);
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(format!(
            "events={} keys={} last_key={} last_action={} frames={} engine={} fetches={} stale={}",
            self.num_events,
            self.num_key_events,
            self.last_key_event_name,
            self.last_action,
            self.num_frames,
            self.engine_variant.unwrap_or("-"),
            self.window_fetches,
            self.stale_results,
        ))
        .render(area, buf);
    }
}
