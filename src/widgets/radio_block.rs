//! Bordered block with a grid of radio options (● selected, ○ unselected).
//! Used for the export format, the Parquet compression and the CSV delimiter.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

pub struct RadioBlock<'a> {
    pub title: &'a str,
    pub options: &'a [&'a str],
    pub selected: usize,
    pub focused: bool,
    pub columns: usize,
    pub border_color: Color,
    pub active_color: Color,
}

impl<'a> RadioBlock<'a> {
    pub fn new(
        title: &'a str,
        options: &'a [&'a str],
        selected: usize,
        focused: bool,
        columns: usize,
        border_color: Color,
        active_color: Color,
    ) -> Self {
        Self {
            title,
            options,
            selected,
            focused,
            columns: columns.max(1),
            border_color,
            active_color,
        }
    }

    /// Rows needed inside the border for `n` options in `columns` columns, plus the border.
    pub fn height_for(n: usize, columns: usize) -> u16 {
        n.div_ceil(columns.max(1)) as u16 + 2
    }

    fn render_inner(&self, area: Rect, buf: &mut Buffer) {
        if self.options.is_empty() || area.width == 0 {
            return;
        }
        let cols = self.columns.min(self.options.len());
        let col_width = area.width / cols as u16;

        for (idx, label) in self.options.iter().enumerate() {
            let row = (idx / cols) as u16;
            if row >= area.height {
                break;
            }
            let cell = Rect {
                x: area.x + (idx % cols) as u16 * col_width,
                y: area.y + row,
                width: col_width,
                height: 1,
            };

            let is_selected = idx == self.selected;
            let marker = if is_selected { "●" } else { "○" };
            let mut style = Style::default().fg(if is_selected {
                self.active_color
            } else {
                self.border_color
            });
            if self.focused && is_selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Paragraph::new(Line::from(Span::styled(format!("{} {}", marker, label), style)))
                .render(cell, buf);
        }
    }
}

impl Widget for RadioBlock<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(self.title)
            .border_style(Style::default().fg(if self.focused {
                self.active_color
            } else {
                self.border_color
            }));
        let inner = block.inner(area);
        block.render(area, buf);
        self.render_inner(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_for() {
        assert_eq!(RadioBlock::height_for(6, 3), 4);
        assert_eq!(RadioBlock::height_for(4, 4), 3);
    }

    #[test]
    fn test_selected_marker() {
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        let options = ["snappy", "zstd"];
        RadioBlock::new("Compression", &options, 1, true, 2, Color::White, Color::Cyan)
            .render(area, &mut buf);
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("○ snappy"));
        assert!(text.contains("● zstd"));
    }
}
