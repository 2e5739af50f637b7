//! Pieces shared by the single-line and multi-line text inputs: history navigation, key
//! translation for tui-textarea, and cursor styling.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Color, Modifier, Style};
use tracing::warn;
use tui_textarea::{Input, Key};

use crate::cache::CacheManager;

/// Persisted, navigable input history. Entries are oldest first.
#[derive(Debug, Clone)]
pub struct InputHistory {
    pub id: String,
    pub entries: Vec<String>,
    /// Position while browsing; `None` means editing a fresh value.
    pub index: Option<usize>,
    /// The value being edited before browsing started.
    pub temp: Option<String>,
    pub limit: usize,
    pub loaded: bool,
}

impl InputHistory {
    pub fn new(id: impl Into<String>, limit: usize) -> Self {
        Self {
            id: id.into(),
            entries: Vec::new(),
            index: None,
            temp: None,
            limit,
            loaded: false,
        }
    }

    /// Lazy-load entries from the cache directory.
    pub fn ensure_loaded(&mut self, cache: Option<&CacheManager>) {
        if self.loaded {
            return;
        }
        let Some(cache) = cache else {
            return;
        };
        match cache.load_history(&self.id) {
            Ok(entries) => self.entries = entries,
            Err(e) => warn!(history = %self.id, error = %e, "could not load history"),
        }
        self.loaded = true;
    }

    /// Append `entry` (skipping a consecutive duplicate) and persist.
    pub fn record(&mut self, entry: &str, cache: Option<&CacheManager>) {
        self.index = None;
        self.temp = None;
        if entry.trim().is_empty() {
            return;
        }
        self.ensure_loaded(cache);
        add_to_history(&mut self.entries, entry.to_string());
        if let Some(cache) = cache {
            if let Err(e) = cache.save_history(&self.id, &self.entries, self.limit) {
                warn!(history = %self.id, error = %e, "could not save history");
            }
        }
    }

    /// Step to an older entry. `current` is stashed when browsing starts.
    pub fn older(&mut self, current: &str, cache: Option<&CacheManager>) -> Option<String> {
        self.ensure_loaded(cache);
        if self.entries.is_empty() {
            return None;
        }
        let next = match self.index {
            None => {
                self.temp = Some(current.to_string());
                self.entries.len() - 1
            }
            Some(i) => i.saturating_sub(1),
        };
        self.index = Some(next);
        self.entries.get(next).cloned()
    }

    /// Step to a newer entry; past the newest, the stashed value comes back.
    pub fn newer(&mut self) -> Option<String> {
        let i = self.index?;
        if i + 1 >= self.entries.len() {
            self.index = None;
            return Some(self.temp.take().unwrap_or_default());
        }
        self.index = Some(i + 1);
        self.entries.get(i + 1).cloned()
    }

    /// Typing leaves browse mode.
    pub fn reset_navigation(&mut self) {
        self.index = None;
        self.temp = None;
    }
}

/// Add entry to history; only consecutive duplicates are skipped
pub fn add_to_history(history: &mut Vec<String>, entry: String) {
    if history.last() == Some(&entry) {
        return;
    }
    history.push(entry);
}

/// Translate a crossterm key into tui-textarea input
pub fn key_event_to_input(event: &KeyEvent) -> Input {
    let key = match event.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Enter => Key::Enter,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Tab | KeyCode::BackTab => Key::Tab,
        KeyCode::Delete => Key::Delete,
        KeyCode::Esc => Key::Esc,
        _ => Key::Null,
    };

    Input {
        key,
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        alt: event.modifiers.contains(KeyModifiers::ALT),
        shift: event.modifiers.contains(KeyModifiers::SHIFT),
    }
}

/// Cursor style for a focused input. `Reset` means the terminal's reversed video.
pub fn focused_cursor_style(cursor_color: Color) -> Style {
    if cursor_color == Color::Reset {
        return Style::default().add_modifier(Modifier::REVERSED);
    }
    let fg = match cursor_color {
        Color::Black | Color::Red | Color::Blue | Color::Magenta | Color::DarkGray => Color::White,
        _ => Color::Black,
    };
    Style::default().bg(cursor_color).fg(fg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_to_history_skips_consecutive_duplicates() {
        let mut history = vec!["a".to_string()];
        add_to_history(&mut history, "a".to_string());
        add_to_history(&mut history, "b".to_string());
        add_to_history(&mut history, "a".to_string());
        assert_eq!(history, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_history_navigation_restores_draft() {
        let mut history = InputHistory::new("t", 10);
        history.loaded = true;
        history.entries = vec!["one".into(), "two".into()];
        assert_eq!(history.older("draft", None).as_deref(), Some("two"));
        assert_eq!(history.older("two", None).as_deref(), Some("one"));
        assert_eq!(history.older("one", None).as_deref(), Some("one"));
        assert_eq!(history.newer().as_deref(), Some("two"));
        assert_eq!(history.newer().as_deref(), Some("draft"));
        assert_eq!(history.newer(), None);
    }

    #[test]
    fn test_key_translation() {
        let ev = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL);
        let input = key_event_to_input(&ev);
        assert_eq!(input.key, Key::Char('p'));
        assert!(input.ctrl);
        let ev = KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(key_event_to_input(&ev).key, Key::Null);
    }

    #[test]
    fn test_focused_cursor_style() {
        assert!(focused_cursor_style(Color::Reset)
            .add_modifier
            .contains(Modifier::REVERSED));
        assert_eq!(focused_cursor_style(Color::Cyan).fg, Some(Color::Black));
    }
}
