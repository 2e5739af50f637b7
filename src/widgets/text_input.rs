use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use tui_textarea::{CursorMove, Key, TextArea};

use crate::cache::CacheManager;
use crate::config::Theme;

use super::text_input_common::{focused_cursor_style, key_event_to_input, InputHistory};

/// Event emitted by the text inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputEvent {
    None,
    Submit,
    Cancel,
    HistoryChanged,
}

/// Single-line text input wrapping tui-textarea, with optional persisted history
pub struct TextInput {
    textarea: TextArea<'static>,
    value: String,
    pub history: Option<InputHistory>,
    text_color: Option<Color>,
    cursor_color: Color,
    focused: bool,
}

impl TextInput {
    pub fn new() -> Self {
        let mut widget = Self {
            textarea: TextArea::default(),
            value: String::new(),
            history: None,
            text_color: None,
            cursor_color: Color::Reset,
            focused: false,
        };
        widget.apply_style();
        widget
    }

    pub fn with_theme(mut self, theme: &Theme) -> Self {
        self.text_color = Some(theme.get("text_primary"));
        self.cursor_color = theme.get("primary");
        self.apply_style();
        self
    }

    /// Enable history stored under `history_id` in the cache directory
    pub fn with_history(mut self, history_id: &str, limit: usize) -> Self {
        self.history = Some(InputHistory::new(history_id, limit));
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.set_value(value.into());
        self
    }

    fn apply_style(&mut self) {
        let style = match self.text_color {
            Some(c) => Style::default().fg(c),
            None => Style::default(),
        };
        self.textarea.set_style(style);
        self.textarea.set_cursor_line_style(Style::default());
        let cursor = if self.focused {
            focused_cursor_style(self.cursor_color)
        } else {
            // same style as the text hides the cursor
            style
        };
        self.textarea.set_cursor_style(cursor);
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        self.apply_style();
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the text; newlines are flattened and the cursor moves to the end
    pub fn set_value(&mut self, value: String) {
        let single_line = value.replace(['\n', '\r'], " ");
        self.textarea = TextArea::new(vec![single_line.clone()]);
        self.value = single_line;
        self.apply_style();
        self.textarea.move_cursor(CursorMove::End);
    }

    pub fn clear(&mut self) {
        self.set_value(String::new());
        if let Some(h) = self.history.as_mut() {
            h.reset_navigation();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.textarea.cursor().1
    }

    /// Record the current value in history (if enabled)
    pub fn save_to_history(&mut self, cache: Option<&CacheManager>) {
        let value = self.value.clone();
        if let Some(h) = self.history.as_mut() {
            h.record(&value, cache);
        }
    }

    pub fn handle_key(&mut self, event: &KeyEvent, cache: Option<&CacheManager>) -> TextInputEvent {
        match event.code {
            KeyCode::Enter => {
                self.save_to_history(cache);
                TextInputEvent::Submit
            }
            KeyCode::Esc => TextInputEvent::Cancel,
            KeyCode::Up if self.history.is_some() => {
                let current = self.value.clone();
                let entry = self.history.as_mut().and_then(|h| h.older(&current, cache));
                if let Some(entry) = entry {
                    self.set_value(entry);
                }
                TextInputEvent::HistoryChanged
            }
            KeyCode::Down if self.history.is_some() => {
                if let Some(entry) = self.history.as_mut().and_then(|h| h.newer()) {
                    self.set_value(entry);
                }
                TextInputEvent::HistoryChanged
            }
            _ => {
                let input = key_event_to_input(event);
                if matches!(input.key, Key::Char('\n') | Key::Char('\r') | Key::Null) {
                    return TextInputEvent::None;
                }
                self.textarea.input(input);
                self.sync_from_textarea();
                if let Some(h) = self.history.as_mut() {
                    h.reset_navigation();
                }
                TextInputEvent::None
            }
        }
    }

    /// Insert pasted text at the cursor
    pub fn insert_str(&mut self, text: &str) {
        let single_line = text.replace(['\n', '\r'], "");
        self.textarea.insert_str(single_line);
        self.sync_from_textarea();
    }

    fn sync_from_textarea(&mut self) {
        self.value = self.textarea.lines().first().cloned().unwrap_or_default();
    }
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &TextInput {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        self.textarea.render(area, buf);

        // tui-textarea underlines the cursor line
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let cell = &mut buf[(x, y)];
                let style = cell.style().remove_modifier(Modifier::UNDERLINED);
                cell.set_style(style);
            }
        }
    }
}
