use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, BorderType, Borders, Paragraph, Widget, Wrap},
};

use crate::cache::{CacheManager, SQL_HISTORY};
use crate::config::Theme;
use crate::query::{default_sql, QueryOutcome, QueryState};
use crate::render::context::RenderContext;
use crate::value::QueryResult;

use super::multiline_text_input::MultiLineTextInput;
use super::text_input::TextInputEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlEditorAction {
    None,
    /// Run this SQL (row limit already applied).
    Execute(String),
    Close,
}

/// SQL text editor bound to query execution state.
pub struct SqlEditor {
    pub input: MultiLineTextInput,
    pub query: QueryState,
    table: String,
}

impl SqlEditor {
    pub fn new(theme: &Theme, row_limit: usize, history_limit: Option<usize>) -> Self {
        let mut input = MultiLineTextInput::new().with_theme(theme);
        if let Some(limit) = history_limit {
            input = input.with_history(SQL_HISTORY, limit);
        }
        Self {
            input,
            query: QueryState::new(row_limit),
            table: String::new(),
        }
    }

    /// New table loaded: default text and no previous outcome.
    pub fn load_table(&mut self, table: &str) {
        self.table = table.to_string();
        self.query = QueryState::new(self.query.row_limit);
        self.reset();
    }

    /// Restore the starter query for the current table.
    pub fn reset(&mut self) {
        self.input.set_value(&default_sql(&self.table));
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.input.set_focused(focused);
    }

    pub fn handle_key(&mut self, event: &KeyEvent, cache: Option<&CacheManager>) -> SqlEditorAction {
        if event.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(event.code, KeyCode::Char('r') | KeyCode::Char('R'))
        {
            self.reset();
            return SqlEditorAction::None;
        }
        match self.input.handle_key(event, cache) {
            TextInputEvent::Submit => {
                let text = self.input.value();
                match self.query.begin(&text) {
                    Some(sql) => {
                        self.input.save_to_history(cache);
                        SqlEditorAction::Execute(sql)
                    }
                    None => SqlEditorAction::None,
                }
            }
            TextInputEvent::Cancel => SqlEditorAction::Close,
            _ => SqlEditorAction::None,
        }
    }

    pub fn finish(&mut self, result: &Result<QueryResult, String>) {
        self.query.finish(result);
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext) {
        let border = if self.input.is_focused() {
            ctx.modal_border_active
        } else {
            ctx.modal_border
        };
        let block = Block::default()
            .title("SQL (Ctrl+Enter/F5 run, Ctrl+R reset, Esc leave)")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border));
        let inner = block.inner(area);
        block.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Fill(1), Constraint::Length(1)])
            .split(inner);

        (&self.input).render(chunks[0], buf);

        let (status, color) = if self.query.executing {
            ("Running…".to_string(), ctx.warning)
        } else {
            match &self.query.outcome {
                Some(QueryOutcome::Failed(_)) => {
                    (self.query.status_line().unwrap_or_default(), ctx.error)
                }
                Some(QueryOutcome::Success { .. }) => {
                    (self.query.status_line().unwrap_or_default(), ctx.success)
                }
                None => (String::new(), ctx.text_secondary),
            }
        };
        Paragraph::new(status)
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: true })
            .render(chunks[1], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dataset;

    fn editor() -> SqlEditor {
        let mut e = SqlEditor::new(&Theme::default(), 10_000, None);
        e.load_table("sales");
        e
    }

    #[test]
    fn test_load_table_sets_default_text() {
        let e = editor();
        assert_eq!(e.input.value(), default_sql("sales"));
    }

    #[test]
    fn test_execute_applies_limit_and_blocks_overlap() {
        let mut e = editor();
        let run = KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        match e.handle_key(&run, None) {
            SqlEditorAction::Execute(sql) => assert!(sql.ends_with("SELECT * FROM sales\nLIMIT 10000")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(e.handle_key(&run, None), SqlEditorAction::None);

        let result = Ok(QueryResult {
            dataset: Dataset::empty(),
            elapsed_ms: 3,
        });
        e.finish(&result);
        assert!(!e.query.executing);
        assert_eq!(
            e.query.status_line().as_deref(),
            Some("0 rows × 0 columns in 3 ms")
        );
    }

    #[test]
    fn test_reset_restores_default() {
        let mut e = editor();
        e.input.set_value("SELECT 1");
        e.handle_key(&KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL), None);
        assert_eq!(e.input.value(), default_sql("sales"));
    }

    #[test]
    fn test_esc_closes() {
        let mut e = editor();
        assert_eq!(
            e.handle_key(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE), None),
            SqlEditorAction::Close
        );
    }
}
