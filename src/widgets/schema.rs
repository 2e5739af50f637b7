use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Cell, Row, Table, Widget},
};

use crate::render::context::RenderContext;
use crate::value::SchemaColumn;

/// Two-column table of the probed schema; type names are colored by class.
pub struct SchemaView<'a> {
    pub columns: &'a [SchemaColumn],
    pub ctx: &'a RenderContext,
    pub scroll: usize,
}

impl<'a> SchemaView<'a> {
    pub fn new(columns: &'a [SchemaColumn], ctx: &'a RenderContext) -> Self {
        Self {
            columns,
            ctx,
            scroll: 0,
        }
    }

    pub fn with_scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for &SchemaView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!("Schema ({} columns)", self.columns.len());
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.ctx.modal_border));

        let rows: Vec<Row> = self
            .columns
            .iter()
            .skip(self.scroll)
            .map(|column| {
                let color = self.ctx.type_color(column.type_class());
                Row::new(vec![
                    Cell::from(Span::styled(
                        column.name.clone(),
                        Style::default().fg(self.ctx.text_primary),
                    )),
                    Cell::from(Span::styled(column.dtype.clone(), Style::default().fg(color))),
                ])
            })
            .collect();

        let header = Row::new(vec![
            Cell::from(Span::styled(
                "Column",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Cell::from(Span::styled(
                "Type",
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ]);

        let table = Table::new(rows, [Constraint::Percentage(55), Constraint::Percentage(45)])
            .header(header)
            .block(block);
        Widget::render(table, area, buf);
    }
}
