//! Export modal rendering.

use pqview_cli::{ExportFormat, ParquetCodec};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Widget};

use crate::export_modal::{ExportFocus, ExportModal, ExportTarget};
use crate::render::context::RenderContext;
use crate::render::layout::centered_rect_fixed;
use crate::widgets::radio_block::RadioBlock;

const CODEC_LABELS: [&str; 4] = ["snappy", "zstd", "gzip", "uncompressed"];

fn border(focused: bool, ctx: &RenderContext) -> Style {
    Style::default().fg(if focused {
        ctx.modal_border_active
    } else {
        ctx.modal_border
    })
}

/// Render the export modal centred in `area`: format list on the left for data exports,
/// compression choice on top for Parquet.
pub fn render_export_modal(area: Rect, buf: &mut Buffer, modal: &ExportModal, ctx: &RenderContext) {
    let height = match modal.target {
        ExportTarget::Data => 14,
        ExportTarget::Parquet => 12,
    };
    let popup = centered_rect_fixed(area, 72, height);
    Clear.render(popup, buf);
    let title = match modal.target {
        ExportTarget::Data => "Export Data",
        ExportTarget::Parquet => "Convert to Parquet",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ctx.modal_border))
        .title(title);
    let inner = block.inner(popup);
    block.render(popup, buf);

    match modal.target {
        ExportTarget::Data => {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(18), Constraint::Min(30)])
                .split(inner);
            render_format_list(chunks[0], buf, modal, ctx);

            let right = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Fill(1),
                    Constraint::Length(3),
                ])
                .split(chunks[1]);
            render_input(right[0], buf, "File name", modal, ExportFocus::FileName, ctx);
            if modal.selected_format.is_sql() {
                render_input(right[1], buf, "Table name (optional)", modal, ExportFocus::TableName, ctx);
            } else {
                Paragraph::new(format!("Writes .{}", modal.selected_format.extension()))
                    .style(Style::default().fg(ctx.text_secondary))
                    .render(right[1], buf);
            }
            render_footer(right[3], buf, modal, ctx);
        }
        ExportTarget::Parquet => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(RadioBlock::height_for(CODEC_LABELS.len(), 4)),
                    Constraint::Length(3),
                    Constraint::Fill(1),
                    Constraint::Length(3),
                ])
                .split(inner);
            let selected = ParquetCodec::ALL
                .iter()
                .position(|c| *c == modal.codec)
                .unwrap_or(0);
            RadioBlock::new(
                "Compression",
                &CODEC_LABELS,
                selected,
                modal.focus == ExportFocus::Compression,
                4,
                ctx.modal_border,
                ctx.modal_border_active,
            )
            .render(rows[0], buf);
            render_input(rows[1], buf, "File name (.parquet)", modal, ExportFocus::FileName, ctx);
            render_footer(rows[3], buf, modal, ctx);
        }
    }
}

fn render_format_list(area: Rect, buf: &mut Buffer, modal: &ExportModal, ctx: &RenderContext) {
    let focused = modal.focus == ExportFocus::FormatSelector;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border(focused, ctx))
        .title("Format");

    let items: Vec<ListItem> = ExportFormat::ALL
        .iter()
        .map(|format| {
            let selected = modal.selected_format == *format;
            let marker = if selected { "●" } else { "○" };
            let style = if selected {
                Style::default().fg(ctx.modal_border_active)
            } else {
                Style::default().fg(ctx.text_primary)
            };
            ListItem::new(Line::from(Span::styled(
                format!("{} {}", marker, format.as_str()),
                style,
            )))
        })
        .collect();
    List::new(items).block(block).render(area, buf);
}

fn render_input(
    area: Rect,
    buf: &mut Buffer,
    title: &str,
    modal: &ExportModal,
    which: ExportFocus,
    ctx: &RenderContext,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border(modal.focus == which, ctx))
        .title(title);
    let inner = block.inner(area);
    block.render(area, buf);
    let input = if which == ExportFocus::TableName {
        &modal.table_name
    } else {
        &modal.file_name
    };
    input.render(inner, buf);
}

fn render_footer(area: Rect, buf: &mut Buffer, modal: &ExportModal, ctx: &RenderContext) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    button(chunks[0], buf, "Export", modal.focus == ExportFocus::ExportButton, ctx.modal_border_active, ctx);
    button(chunks[1], buf, "Cancel", modal.focus == ExportFocus::CancelButton, ctx.modal_border_error, ctx);
}

fn button(area: Rect, buf: &mut Buffer, label: &str, focused: bool, accent: Color, ctx: &RenderContext) {
    let mut text = Style::default().fg(ctx.text_primary);
    if focused {
        text = text.fg(accent).add_modifier(Modifier::BOLD);
    }
    Paragraph::new(label)
        .centered()
        .style(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(border(focused, ctx)),
        )
        .render(area, buf);
}
