//! Overlay rendering (loading gauge, success/error modals, help).

use crate::render::context::RenderContext;
use crate::render::layout::{centered_rect, centered_rect_loading};
use crate::{ErrorModal, SuccessModal};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{StatefulWidget, Widget};
use ratatui::style::Style;
use ratatui::widgets::{
    Block, BorderType, Borders, Clear, Gauge, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState, Wrap,
};

/// Bordered box with a progress gauge, centered in `area`.
pub fn render_loading_gauge(
    area: Rect,
    buf: &mut Buffer,
    title: &str,
    label: &str,
    progress_percent: u16,
    ctx: &RenderContext,
) {
    let popup = centered_rect_loading(area);
    Clear.render(popup, buf);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .border_style(Style::default().fg(ctx.modal_border));

    let inner = block.inner(popup);
    block.render(popup, buf);

    Gauge::default()
        .gauge_style(Style::default().fg(ctx.progress))
        .percent(progress_percent.min(100))
        .label(label)
        .render(inner, buf);
}

fn render_message_modal(
    area: Rect,
    buf: &mut Buffer,
    title: &str,
    message: &str,
    border: Style,
    text: Style,
    ctx: &RenderContext,
) {
    let popup_area = centered_rect(area, 70, 40);
    Clear.render(popup_area, buf);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .border_style(border);
    let inner_area = block.inner(popup_area);
    block.render(popup_area, buf);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(inner_area);

    Paragraph::new(message)
        .style(text)
        .wrap(Wrap { trim: true })
        .render(chunks[0], buf);

    Paragraph::new("OK")
        .centered()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(ctx.modal_border_active)),
        )
        .render(chunks[1], buf);
}

/// Renders the success modal (OK).
pub fn render_success_modal(
    area: Rect,
    buf: &mut Buffer,
    modal: &SuccessModal,
    ctx: &RenderContext,
) {
    render_message_modal(
        area,
        buf,
        "Success",
        &modal.message,
        Style::default().fg(ctx.success),
        Style::default().fg(ctx.text_primary),
        ctx,
    );
}

/// Renders the error modal (OK).
pub fn render_error_modal(area: Rect, buf: &mut Buffer, modal: &ErrorModal, ctx: &RenderContext) {
    render_message_modal(
        area,
        buf,
        "Error",
        &modal.message,
        Style::default().fg(ctx.modal_border_error),
        Style::default().fg(ctx.error),
        ctx,
    );
}

/// Help text in a scrollable box. `scroll` is clamped so the caller can persist it.
pub fn render_help_overlay(
    area: Rect,
    buf: &mut Buffer,
    title: &str,
    text: &str,
    scroll: &mut usize,
    ctx: &RenderContext,
) {
    let popup_area = centered_rect(area, 80, 80);
    Clear.render(popup_area, buf);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ctx.modal_border));
    let inner = block.inner(popup_area);
    block.render(popup_area, buf);

    let total = text.lines().count();
    let visible = inner.height as usize;
    let max_scroll = total.saturating_sub(visible);
    *scroll = (*scroll).min(max_scroll);

    Paragraph::new(text)
        .style(Style::default().fg(ctx.text_primary))
        .scroll((*scroll as u16, 0))
        .render(inner, buf);

    if max_scroll > 0 {
        let mut state = ScrollbarState::new(max_scroll).position(*scroll);
        Scrollbar::new(ScrollbarOrientation::VerticalRight).render(popup_area, buf, &mut state);
    }
}
