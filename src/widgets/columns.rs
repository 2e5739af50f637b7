use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, StatefulWidget, Widget},
};

use crate::render::context::RenderContext;
use crate::render::layout::centered_rect_fixed;
use crate::value::Dataset;
use crate::widgets::datatable::DataTableState;

/// Column visibility picker: Space toggles, `a` shows every column, Esc/Enter closes.
#[derive(Debug, Default)]
pub struct ColumnChooser {
    pub active: bool,
    pub cursor: usize,
}

impl ColumnChooser {
    pub fn open(&mut self) {
        self.active = true;
        self.cursor = 0;
    }

    pub fn close(&mut self) {
        self.active = false;
    }

    /// Apply a key. Returns false when the chooser closed.
    pub fn handle_key(
        &mut self,
        event: &KeyEvent,
        dataset: &Dataset,
        table: &mut DataTableState,
    ) -> bool {
        let n = dataset.columns.len();
        match event.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('c') | KeyCode::Char('q') => {
                self.close();
                return false;
            }
            KeyCode::Down | KeyCode::Char('j') if self.cursor + 1 < n => self.cursor += 1,
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Char(' ') => {
                if let Some(name) = dataset.columns.get(self.cursor) {
                    table.toggle_column(name);
                }
            }
            KeyCode::Char('a') => table.show_all_columns(),
            _ => {}
        }
        table.clamp_focus(dataset);
        true
    }

    pub fn render(
        &self,
        area: Rect,
        buf: &mut Buffer,
        dataset: &Dataset,
        table: &DataTableState,
        ctx: &RenderContext,
    ) {
        let height = (dataset.columns.len() as u16 + 3).min(area.height);
        let popup = centered_rect_fixed(area, 44, height.max(5));
        Clear.render(popup, buf);

        let block = Block::default()
            .title("Columns (Space toggle, a all visible)")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(ctx.modal_border_active));

        let items: Vec<ListItem> = dataset
            .columns
            .iter()
            .map(|name| {
                let (mark, style) = if table.is_hidden(name) {
                    ("[ ]", Style::default().fg(ctx.dimmed))
                } else {
                    ("[x]", Style::default().fg(ctx.text_primary))
                };
                ListItem::new(Line::from(Span::styled(format!("{} {}", mark, name), style)))
            })
            .collect();

        let mut state = ListState::default().with_selected(Some(self.cursor));
        StatefulWidget::render(
            List::new(items)
                .block(block)
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            popup,
            buf,
            &mut state,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{CellValue, DataSource};
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_toggle_and_reset() {
        let ds = Dataset::complete(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Int(1), CellValue::Int(2)]],
            DataSource::Local,
        );
        let mut table = DataTableState::new(10, vec![10], 1000, 3);
        let mut chooser = ColumnChooser::default();
        chooser.open();
        chooser.handle_key(&key(KeyCode::Down), &ds, &mut table);
        chooser.handle_key(&key(KeyCode::Char(' ')), &ds, &mut table);
        assert!(table.is_hidden("b"));
        assert_eq!(table.visible_columns(&ds), vec![0]);
        chooser.handle_key(&key(KeyCode::Char('a')), &ds, &mut table);
        assert_eq!(table.hidden_count(), 0);
        assert!(!chooser.handle_key(&key(KeyCode::Esc), &ds, &mut table));
        assert!(!chooser.active);
    }
}
