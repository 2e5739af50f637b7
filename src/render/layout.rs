use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Top-level layout: main view, control bar, optional debug row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub main_view: Rect,
    pub control_bar: Rect,
    pub debug: Option<Rect>,
}

/// Top-level vertical layout: main view (fill), control bar (1 row), optional debug (1 row).
pub fn app_layout(area: Rect, debug_enabled: bool) -> AppLayout {
    let mut constraints = vec![Constraint::Fill(1), Constraint::Length(1)];

    if debug_enabled {
        constraints.push(Constraint::Length(1));
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    AppLayout {
        main_view: layout[0],
        control_bar: layout[1],
        debug: debug_enabled.then(|| layout[2]),
    }
}

/// The loaded view split into grid, optional schema sidebar and optional SQL editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewLayout {
    pub grid: Rect,
    pub schema: Option<Rect>,
    pub sql: Option<Rect>,
}

/// Schema sidebar on the right (a third of the width, at most 48 cells); SQL editor on top.
pub fn view_layout(area: Rect, show_schema: bool, show_sql: bool) -> ViewLayout {
    let (top, sql) = if show_sql {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(10), Constraint::Fill(1)])
            .split(area);
        (rows[1], Some(rows[0]))
    } else {
        (area, None)
    };

    let (grid, schema) = if show_schema {
        let sidebar = (top.width / 3).min(48);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Fill(1), Constraint::Length(sidebar)])
            .split(top);
        (cols[0], Some(cols[1]))
    } else {
        (top, None)
    };

    ViewLayout { grid, schema, sql }
}

/// Centered rect within `r` with given percentage width and height.
pub fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Centered rect with fixed width and height, clamped to fit inside `r`.
pub fn centered_rect_fixed(r: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(r.width);
    let h = height.min(r.height);
    let x = r.x + r.width.saturating_sub(w) / 2;
    let y = r.y + r.height.saturating_sub(h) / 2;
    Rect {
        x,
        y,
        width: w,
        height: h,
    }
}

/// Loading gauge box: 40% wide, five rows, centered.
pub fn centered_rect_loading(r: Rect) -> Rect {
    centered_rect_fixed(r, (r.width * 2 / 5).max(30), 5)
}
