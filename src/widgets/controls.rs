use crate::render::context::RenderContext;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Paragraph, Widget},
};

/// Bottom bar: key hints on the left, row count and a busy throbber on the right.
pub struct Controls {
    pub row_count: Option<usize>,
    pub dimmed: bool,
    pub controls: Vec<(&'static str, &'static str)>,
    pub bg_color: Color,
    pub key_color: Color,
    pub label_color: Color,
    pub dimmed_color: Color,
    pub throbber_color: Color,
    pub busy: bool,
    pub throbber_frame: u8,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            row_count: None,
            dimmed: false,
            controls: Vec::new(),
            bg_color: Color::Indexed(236),
            key_color: Color::Cyan,
            label_color: Color::White,
            dimmed_color: Color::DarkGray,
            throbber_color: Color::Cyan,
            busy: false,
            throbber_frame: 0,
        }
    }
}

impl Controls {
    pub fn from_context(ctx: &RenderContext) -> Self {
        Self {
            bg_color: ctx.controls_bg,
            key_color: ctx.keybind_hints,
            label_color: ctx.keybind_labels,
            dimmed_color: ctx.dimmed,
            throbber_color: ctx.throbber,
            ..Self::default()
        }
    }

    pub fn with_controls(mut self, controls: Vec<(&'static str, &'static str)>) -> Self {
        self.controls = controls;
        self
    }

    pub fn with_row_count(mut self, row_count: Option<usize>) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn with_busy(mut self, busy: bool, throbber_frame: u8) -> Self {
        self.busy = busy;
        self.throbber_frame = throbber_frame;
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let no_bg = self.bg_color == Color::Reset;
        let base = if no_bg {
            Style::default()
        } else {
            Style::default().bg(self.bg_color)
        };
        Block::default().style(base).render(area, buf);

        const THROBBER_WIDTH: u16 = 3;
        let right_reserved = if self.row_count.is_some() { 21 } else { 1 } + THROBBER_WIDTH;
        let mut available = area.width.saturating_sub(right_reserved);

        // pairs are dropped from the right rather than squeezed
        let mut shown = 0;
        for (key, action) in &self.controls {
            let need = key.chars().count() as u16 + action.chars().count() as u16 + 2;
            if available < need {
                break;
            }
            available -= need;
            shown += 1;
        }

        let mut constraints: Vec<Constraint> = self
            .controls
            .iter()
            .take(shown)
            .flat_map(|(key, action)| {
                [
                    Constraint::Length(key.chars().count() as u16 + 1),
                    Constraint::Length(action.chars().count() as u16 + 1),
                ]
            })
            .collect();
        constraints.push(Constraint::Fill(1));
        if self.row_count.is_some() {
            constraints.push(Constraint::Length(20));
        }
        constraints.push(Constraint::Length(THROBBER_WIDTH));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);

        let (key_style, label_style) = if self.dimmed {
            (base.fg(self.dimmed_color), base.fg(self.dimmed_color))
        } else {
            (base.fg(self.key_color), base.fg(self.label_color))
        };

        for (i, (key, action)) in self.controls.iter().take(shown).enumerate() {
            Paragraph::new(*key).style(key_style).render(layout[i * 2], buf);
            Paragraph::new(*action)
                .style(label_style)
                .render(layout[i * 2 + 1], buf);
        }

        let fill_idx = shown * 2;
        if let Some(count) = self.row_count {
            Paragraph::new(format!("Rows: {}", format_number_with_commas(count)))
                .style(label_style)
                .right_aligned()
                .render(layout[fill_idx + 1], buf);
        }

        const THROBBER: [char; 4] = ['|', '/', '-', '\\'];
        let throbber_idx = fill_idx + if self.row_count.is_some() { 2 } else { 1 };
        let throbber = if self.busy {
            THROBBER[self.throbber_frame as usize % THROBBER.len()].to_string()
        } else {
            " ".to_string()
        };
        Paragraph::new(throbber)
            .style(base.fg(self.throbber_color))
            .centered()
            .render(layout[throbber_idx], buf);
    }
}

pub fn format_number_with_commas(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_with_commas() {
        assert_eq!(format_number_with_commas(0), "0");
        assert_eq!(format_number_with_commas(999), "999");
        assert_eq!(format_number_with_commas(1000), "1,000");
        assert_eq!(format_number_with_commas(1234567), "1,234,567");
    }

    #[test]
    fn test_controls_render_hints_and_rows() {
        let area = Rect::new(0, 0, 80, 1);
        let mut buf = Buffer::empty(area);
        let controls = Controls::default()
            .with_controls(vec![("q", "Quit"), ("?", "Help")])
            .with_row_count(Some(12345));
        (&controls).render(area, &mut buf);
        let line: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(line.starts_with("q Quit ? Help"));
        assert!(line.contains("Rows: 12,345"));
    }

    #[test]
    fn test_controls_drop_pairs_that_do_not_fit() {
        let area = Rect::new(0, 0, 30, 1);
        let mut buf = Buffer::empty(area);
        let controls = Controls::default().with_controls(vec![
            ("/", "Query"),
            ("e", "Export"),
            ("s", "Schema"),
            ("?", "Help"),
            ("q", "Quit"),
        ]);
        (&controls).render(area, &mut buf);
        let line: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(line.contains("Query"));
        assert!(!line.contains("Quit"));
    }
}
