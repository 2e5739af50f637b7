use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use tui_textarea::{CursorMove, Key, TextArea};

use crate::cache::CacheManager;
use crate::config::Theme;

use super::text_input::TextInputEvent;
use super::text_input_common::{focused_cursor_style, key_event_to_input, InputHistory};

/// Multi-line editor wrapping tui-textarea.
///
/// Enter inserts a newline. Ctrl+Enter or F5 submits, Esc cancels, and Ctrl-P / Ctrl-N walk the
/// history.
pub struct MultiLineTextInput {
    textarea: TextArea<'static>,
    pub history: Option<InputHistory>,
    text_color: Option<Color>,
    cursor_color: Color,
    focused: bool,
}

impl MultiLineTextInput {
    pub fn new() -> Self {
        let mut widget = Self {
            textarea: TextArea::default(),
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

    pub fn with_history(mut self, history_id: &str, limit: usize) -> Self {
        self.history = Some(InputHistory::new(history_id, limit));
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

    /// Full text, lines joined with `\n`
    pub fn value(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn set_value(&mut self, value: &str) {
        let lines: Vec<String> = value.lines().map(|l| l.to_string()).collect();
        self.textarea = TextArea::new(if lines.is_empty() {
            vec![String::new()]
        } else {
            lines
        });
        self.apply_style();
        self.textarea.move_cursor(CursorMove::Bottom);
        self.textarea.move_cursor(CursorMove::End);
    }

    pub fn line_count(&self) -> usize {
        self.textarea.lines().len()
    }

    /// (line, column) of the cursor
    pub fn cursor(&self) -> (usize, usize) {
        self.textarea.cursor()
    }

    pub fn clear(&mut self) {
        self.set_value("");
        if let Some(h) = self.history.as_mut() {
            h.reset_navigation();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.textarea.lines().iter().all(|l| l.is_empty())
    }

    pub fn save_to_history(&mut self, cache: Option<&CacheManager>) {
        let value = self.value();
        if let Some(h) = self.history.as_mut() {
            h.record(&value, cache);
        }
    }

    pub fn insert_str(&mut self, text: &str) {
        self.textarea.insert_str(text);
    }

    pub fn handle_key(&mut self, event: &KeyEvent, cache: Option<&CacheManager>) -> TextInputEvent {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        match event.code {
            KeyCode::Esc => TextInputEvent::Cancel,
            KeyCode::F(5) => TextInputEvent::Submit,
            KeyCode::Enter if ctrl => TextInputEvent::Submit,
            KeyCode::Char('p') | KeyCode::Char('P') if ctrl && self.history.is_some() => {
                let current = self.value();
                if let Some(entry) = self.history.as_mut().and_then(|h| h.older(&current, cache)) {
                    self.set_value(&entry);
                }
                TextInputEvent::HistoryChanged
            }
            KeyCode::Char('n') | KeyCode::Char('N') if ctrl && self.history.is_some() => {
                if let Some(entry) = self.history.as_mut().and_then(|h| h.newer()) {
                    self.set_value(&entry);
                }
                TextInputEvent::HistoryChanged
            }
            _ => {
                let input = key_event_to_input(event);
                if input.key == Key::Null {
                    return TextInputEvent::None;
                }
                self.textarea.input(input);
                if let Some(h) = self.history.as_mut() {
                    h.reset_navigation();
                }
                TextInputEvent::None
            }
        }
    }
}

impl Default for MultiLineTextInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &MultiLineTextInput {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        self.textarea.render(area, buf);

        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let cell = &mut buf[(x, y)];
                let style = cell.style().remove_modifier(Modifier::UNDERLINED);
                cell.set_style(style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_inserts_newline() {
        let mut input = MultiLineTextInput::new();
        input.set_value("SELECT 1");
        let ev = input.handle_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), None);
        assert_eq!(ev, TextInputEvent::None);
        assert_eq!(input.line_count(), 2);
    }

    #[test]
    fn test_ctrl_enter_and_f5_submit() {
        let mut input = MultiLineTextInput::new();
        let ev = input.handle_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::CONTROL), None);
        assert_eq!(ev, TextInputEvent::Submit);
        let ev = input.handle_key(&KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE), None);
        assert_eq!(ev, TextInputEvent::Submit);
    }

    #[test]
    fn test_set_value_round_trip() {
        let mut input = MultiLineTextInput::new();
        input.set_value("-- c\n\nSELECT * FROM t");
        assert_eq!(input.value(), "-- c\n\nSELECT * FROM t");
        assert_eq!(input.cursor(), (2, 15));
        input.clear();
        assert!(input.is_empty());
    }

    #[test]
    fn test_ctrl_p_recalls_history() {
        let mut input = MultiLineTextInput::new().with_history("sql", 10);
        if let Some(h) = input.history.as_mut() {
            h.loaded = true;
            h.entries = vec!["SELECT 42".into()];
        }
        input.handle_key(&KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL), None);
        assert_eq!(input.value(), "SELECT 42");
    }
}
