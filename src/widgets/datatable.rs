//! The data grid: pagination over a fully loaded or engine-windowed dataset, client-side
//! sorting, column widths and column visibility.

use std::collections::{HashMap, HashSet};

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, StatefulWidget, Table, TableState, Widget},
};

use crate::render::context::RenderContext;
use crate::value::{CellValue, Dataset, SchemaColumn, TypeClass};
use crate::widgets::controls::format_number_with_commas;

pub const MIN_COLUMN_WIDTH: u16 = 3;
const MAX_AUTO_WIDTH: u16 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

/// Rows to fetch from the engine so a page can be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRequest {
    pub offset: usize,
    pub limit: usize,
}

/// `[start, end)` of page `page`, clamped to `total`.
pub fn page_bounds(page: usize, size: usize, total: usize) -> (usize, usize) {
    let start = page.saturating_mul(size).min(total);
    let end = start.saturating_add(size).min(total);
    (start, end)
}

/// Number of pages; an empty dataset still has one (empty) page.
pub fn page_count(total: usize, size: usize) -> usize {
    if size == 0 {
        return 1;
    }
    total.div_ceil(size).max(1)
}

/// Refill needed to show `[start, start + size)`, or `None` when the current window covers it.
///
/// The window starts a quarter window before `start` so paging backwards stays local, and is
/// at least long enough to reach the end of the requested page.
pub fn plan_window(
    start: usize,
    size: usize,
    window_size: usize,
    dataset: &Dataset,
) -> Option<WindowRequest> {
    let end = start.saturating_add(size).min(dataset.total_rows);
    if dataset.fully_loaded || dataset.contains_range(start, end) {
        return None;
    }
    let offset = start - start.min(window_size / 4);
    let limit = window_size.max((start - offset) + size);
    Some(WindowRequest { offset, limit })
}

/// Color class per dataset column: declared schema type when known, else the first non-null value.
pub fn column_classes(dataset: &Dataset, schema: &[SchemaColumn]) -> Vec<TypeClass> {
    dataset
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if let Some(column) = schema.iter().find(|c| &c.name == name) {
                return column.type_class();
            }
            dataset
                .rows
                .iter()
                .map(|row| &row[idx])
                .find(|v| !v.is_null())
                .map(value_class)
                .unwrap_or(TypeClass::Other)
        })
        .collect()
}

fn value_class(value: &CellValue) -> TypeClass {
    match value {
        CellValue::Null => TypeClass::Other,
        CellValue::Int(_) => TypeClass::Integer,
        CellValue::Float(_) => TypeClass::Float,
        CellValue::Bool(_) => TypeClass::Boolean,
        CellValue::Text(_) => TypeClass::Text,
        CellValue::Nested(v) if v.is_array() => TypeClass::List,
        CellValue::Nested(_) => TypeClass::Struct,
    }
}

pub struct DataTableState {
    pub table_state: TableState,
    pub page: usize,
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
    /// Index into the visible columns.
    pub focused_column: usize,
    /// First visible column drawn (horizontal scroll).
    pub column_offset: usize,
    /// Data rows that fit in the last rendered area.
    pub visible_rows: usize,
    /// Refill requested but not yet applied.
    pub pending: Option<WindowRequest>,
    window_size: usize,
    min_column_width: u16,
    sort: Option<SortKey>,
    sorted: Option<Vec<usize>>,
    widths: HashMap<String, u16>,
    hidden: HashSet<String>,
}

impl DataTableState {
    pub fn new(
        page_size: usize,
        page_size_options: Vec<usize>,
        window_size: usize,
        min_column_width: u16,
    ) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));
        Self {
            table_state,
            page: 0,
            page_size: page_size.max(1),
            page_size_options,
            focused_column: 0,
            column_offset: 0,
            visible_rows: 0,
            pending: None,
            window_size: window_size.max(1),
            min_column_width: min_column_width.max(MIN_COLUMN_WIDTH),
            sort: None,
            sorted: None,
            widths: HashMap::new(),
            hidden: HashSet::new(),
        }
    }

    /// Forget per-dataset state; called whenever the active dataset changes.
    pub fn reset(&mut self) {
        self.page = 0;
        self.focused_column = 0;
        self.column_offset = 0;
        self.pending = None;
        self.sort = None;
        self.sorted = None;
        self.widths.clear();
        self.hidden.clear();
        self.table_state.select(Some(0));
    }

    /// Server mode: the dataset is a window over an engine table.
    pub fn is_server_mode(dataset: &Dataset) -> bool {
        !dataset.fully_loaded
    }

    pub fn page_count(&self, dataset: &Dataset) -> usize {
        page_count(dataset.total_rows, self.page_size)
    }

    pub fn bounds(&self, dataset: &Dataset) -> (usize, usize) {
        page_bounds(self.page, self.page_size, dataset.total_rows)
    }

    /// Move to `page` (clamped). Returns the refill the engine must serve, if any.
    pub fn go_to_page(&mut self, page: usize, dataset: &Dataset) -> Option<WindowRequest> {
        self.page = page.min(self.page_count(dataset) - 1);
        self.table_state.select(Some(0));
        let (start, _) = self.bounds(dataset);
        self.pending = plan_window(start, self.page_size, self.window_size, dataset);
        self.pending
    }

    pub fn first_page(&mut self, dataset: &Dataset) -> Option<WindowRequest> {
        self.go_to_page(0, dataset)
    }

    pub fn prev_page(&mut self, dataset: &Dataset) -> Option<WindowRequest> {
        self.go_to_page(self.page.saturating_sub(1), dataset)
    }

    pub fn next_page(&mut self, dataset: &Dataset) -> Option<WindowRequest> {
        self.go_to_page(self.page + 1, dataset)
    }

    pub fn last_page(&mut self, dataset: &Dataset) -> Option<WindowRequest> {
        self.go_to_page(self.page_count(dataset) - 1, dataset)
    }

    /// Change the page size, keeping the first row of the current page in view.
    pub fn set_page_size(&mut self, size: usize, dataset: &Dataset) -> Option<WindowRequest> {
        let (start, _) = self.bounds(dataset);
        self.page_size = size.max(1);
        self.go_to_page(start / self.page_size, dataset)
    }

    pub fn cycle_page_size(&mut self, dataset: &Dataset) -> Option<WindowRequest> {
        if self.page_size_options.is_empty() {
            return None;
        }
        let next = self
            .page_size_options
            .iter()
            .position(|s| *s == self.page_size)
            .map(|i| (i + 1) % self.page_size_options.len())
            .unwrap_or(0);
        self.set_page_size(self.page_size_options[next], dataset)
    }

    /// A refill arrived (or was superseded).
    pub fn window_applied(&mut self) {
        self.pending = None;
    }

    /// Rows of the current page, in display order. Empty while the page's window is missing.
    pub fn page_rows<'a>(&self, dataset: &'a Dataset) -> Vec<&'a [CellValue]> {
        let (start, end) = self.bounds(dataset);
        if Self::is_server_mode(dataset) {
            if !dataset.contains_range(start, end) {
                return Vec::new();
            }
            let local = start - dataset.window_start;
            return dataset.rows[local..]
                .iter()
                .take(end - start)
                .map(|r| r.as_slice())
                .collect();
        }
        match &self.sorted {
            Some(order) => order[start.min(order.len())..end.min(order.len())]
                .iter()
                .map(|&i| dataset.rows[i].as_slice())
                .collect(),
            None => dataset.rows[start.min(dataset.rows.len())..end.min(dataset.rows.len())]
                .iter()
                .map(|r| r.as_slice())
                .collect(),
        }
    }

    /// Indices (into `dataset.columns`) of the columns that are not hidden.
    pub fn visible_columns(&self, dataset: &Dataset) -> Vec<usize> {
        dataset
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| !self.hidden.contains(*name))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn focused_column_name<'a>(&self, dataset: &'a Dataset) -> Option<&'a str> {
        self.visible_columns(dataset)
            .get(self.focused_column)
            .map(|&i| dataset.columns[i].as_str())
    }

    pub fn focus_next_column(&mut self, dataset: &Dataset) {
        let n = self.visible_columns(dataset).len();
        if self.focused_column + 1 < n {
            self.focused_column += 1;
        }
    }

    pub fn focus_prev_column(&mut self) {
        self.focused_column = self.focused_column.saturating_sub(1);
    }

    pub fn select_next(&mut self, dataset: &Dataset) {
        let rows = self.page_rows(dataset).len();
        let current = self.table_state.selected().unwrap_or(0);
        if current + 1 < rows {
            self.table_state.select(Some(current + 1));
        }
    }

    pub fn select_previous(&mut self) {
        let current = self.table_state.selected().unwrap_or(0);
        self.table_state.select(Some(current.saturating_sub(1)));
    }

    pub fn sort_key(&self) -> Option<&SortKey> {
        self.sort.as_ref()
    }

    /// Cycle the focused column through ascending, descending and unsorted.
    /// Returns false (and does nothing) for engine-windowed data.
    pub fn cycle_sort(&mut self, dataset: &Dataset) -> bool {
        if Self::is_server_mode(dataset) {
            return false;
        }
        let Some(name) = self.focused_column_name(dataset).map(str::to_string) else {
            return false;
        };
        self.sort = match self.sort.take() {
            Some(key) if key.column == name => match key.direction {
                SortDirection::Ascending => Some(SortKey {
                    column: name,
                    direction: SortDirection::Descending,
                }),
                SortDirection::Descending => None,
            },
            _ => Some(SortKey {
                column: name,
                direction: SortDirection::Ascending,
            }),
        };
        self.resort(dataset);
        self.page = 0;
        self.table_state.select(Some(0));
        true
    }

    /// Recompute the sort order for `dataset` (after the sort key or the rows change).
    pub fn resort(&mut self, dataset: &Dataset) {
        self.sorted = self.sort.as_ref().and_then(|key| {
            let col = dataset.column_index(&key.column)?;
            let mut order: Vec<usize> = (0..dataset.rows.len()).collect();
            match key.direction {
                SortDirection::Ascending => {
                    order.sort_by(|&a, &b| dataset.rows[a][col].sort_cmp(&dataset.rows[b][col]))
                }
                SortDirection::Descending => {
                    order.sort_by(|&a, &b| dataset.rows[b][col].sort_cmp(&dataset.rows[a][col]))
                }
            }
            Some(order)
        });
    }

    /// Width of `dataset.columns[col]`: the user's override, else fitted to header and page.
    pub fn column_width(&self, dataset: &Dataset, col: usize) -> u16 {
        let name = &dataset.columns[col];
        if let Some(w) = self.widths.get(name) {
            return *w;
        }
        let header = name.chars().count() as u16 + 2;
        let content = self
            .page_rows(dataset)
            .iter()
            .map(|row| row[col].display().chars().count() as u16)
            .max()
            .unwrap_or(0);
        header
            .max(content)
            .min(MAX_AUTO_WIDTH)
            .max(self.min_column_width)
    }

    /// Widen (positive) or narrow (negative) the focused column; never below the minimum.
    pub fn resize_focused(&mut self, delta: i16, dataset: &Dataset) {
        let Some(&col) = self.visible_columns(dataset).get(self.focused_column) else {
            return;
        };
        let current = self.column_width(dataset, col) as i32;
        let width = (current + delta as i32).clamp(self.min_column_width as i32, u16::MAX as i32);
        self.widths
            .insert(dataset.columns[col].clone(), width as u16);
    }

    pub fn is_hidden(&self, column: &str) -> bool {
        self.hidden.contains(column)
    }

    pub fn toggle_column(&mut self, column: &str) {
        if !self.hidden.remove(column) {
            self.hidden.insert(column.to_string());
        }
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }

    pub fn show_all_columns(&mut self) {
        self.hidden.clear();
    }

    /// Keep the focused column inside the visible range after hiding columns.
    pub fn clamp_focus(&mut self, dataset: &Dataset) {
        let n = self.visible_columns(dataset).len();
        self.focused_column = self.focused_column.min(n.saturating_sub(1));
        self.column_offset = self.column_offset.min(self.focused_column);
    }
}

/// Renders the grid and a one-line pagination footer.
pub struct DataTable<'a> {
    pub dataset: &'a Dataset,
    pub classes: &'a [TypeClass],
    pub ctx: &'a RenderContext,
}

impl<'a> DataTable<'a> {
    pub fn new(dataset: &'a Dataset, classes: &'a [TypeClass], ctx: &'a RenderContext) -> Self {
        Self {
            dataset,
            classes,
            ctx,
        }
    }

    fn footer(&self, state: &DataTableState) -> String {
        let ds = self.dataset;
        let (start, end) = state.bounds(ds);
        let mut parts = vec![
            format!("Page {}/{}", state.page + 1, state.page_count(ds)),
            if ds.total_rows == 0 {
                "no rows".to_string()
            } else {
                format!(
                    "rows {}-{} of {}",
                    format_number_with_commas(start + 1),
                    format_number_with_commas(end),
                    format_number_with_commas(ds.total_rows)
                )
            },
            format!("{}/page", state.page_size),
        ];
        if let Some(key) = state.sort_key() {
            let arrow = match key.direction {
                SortDirection::Ascending => "▲",
                SortDirection::Descending => "▼",
            };
            parts.push(format!("sorted by {} {}", key.column, arrow));
        }
        if state.hidden_count() > 0 {
            parts.push(format!("{} hidden", state.hidden_count()));
        }
        if DataTableState::is_server_mode(ds) {
            parts.push("windowed".to_string());
        }
        parts.join(" │ ")
    }
}

impl StatefulWidget for DataTable<'_> {
    type State = DataTableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if area.height < 2 {
            return;
        }
        let table_area = Rect {
            height: area.height - 1,
            ..area
        };
        let footer_area = Rect {
            y: area.y + area.height - 1,
            height: 1,
            ..area
        };
        state.visible_rows = table_area.height.saturating_sub(1) as usize;

        Paragraph::new(self.footer(state))
            .style(Style::default().fg(self.ctx.text_secondary))
            .render(footer_area, buf);

        let ds = self.dataset;
        if ds.columns.is_empty() {
            Paragraph::new("No rows")
                .style(Style::default().fg(self.ctx.dimmed))
                .centered()
                .render(table_area, buf);
            return;
        }

        let visible = state.visible_columns(ds);
        if visible.is_empty() {
            Paragraph::new("All columns hidden (press c to choose columns)")
                .style(Style::default().fg(self.ctx.dimmed))
                .centered()
                .render(table_area, buf);
            return;
        }
        state.clamp_focus(ds);

        let page = state.page_rows(ds);
        if page.is_empty() && ds.total_rows > 0 {
            Paragraph::new("Loading rows…")
                .style(Style::default().fg(self.ctx.dimmed))
                .centered()
                .render(table_area, buf);
            return;
        }

        let widths: Vec<u16> = visible.iter().map(|&c| state.column_width(ds, c)).collect();
        let padding = self.ctx.table_cell_padding;

        // scroll so the focused column is drawn
        if state.focused_column < state.column_offset {
            state.column_offset = state.focused_column;
        }
        loop {
            let used: u16 = widths[state.column_offset..=state.focused_column]
                .iter()
                .map(|w| w + padding)
                .sum();
            if used <= table_area.width + padding || state.column_offset == state.focused_column {
                break;
            }
            state.column_offset += 1;
        }

        let mut shown = Vec::new();
        let mut used = 0u16;
        for (pos, &col) in visible.iter().enumerate().skip(state.column_offset) {
            let w = widths[pos];
            if used > 0 && used + w > table_area.width {
                break;
            }
            shown.push((pos, col, w));
            used += w + padding;
        }

        let header_style = if self.ctx.table_header_bg == Color::Reset {
            Style::default().fg(self.ctx.table_header)
        } else {
            Style::default()
                .bg(self.ctx.table_header_bg)
                .fg(self.ctx.table_header)
        };
        let headers: Vec<Cell> = shown
            .iter()
            .map(|&(pos, col, _)| {
                let name = &ds.columns[col];
                let mut label = name.clone();
                if let Some(key) = state.sort_key().filter(|k| &k.column == name) {
                    label.push_str(match key.direction {
                        SortDirection::Ascending => " ▲",
                        SortDirection::Descending => " ▼",
                    });
                }
                let style = if pos == state.focused_column {
                    Style::default()
                        .fg(self.ctx.primary)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                } else {
                    Style::default().add_modifier(Modifier::BOLD)
                };
                Cell::from(Span::styled(label, style))
            })
            .collect();

        let rows: Vec<Row> = page
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cells: Vec<Cell> = shown
                    .iter()
                    .map(|&(_, col, _)| {
                        let class = self.classes.get(col).copied().unwrap_or(TypeClass::Other);
                        let color = match self.ctx.type_color(class) {
                            Color::Reset => self.ctx.text_primary,
                            c => c,
                        };
                        let value = &row[col];
                        let style = if value.is_null() {
                            Style::default().fg(self.ctx.dimmed)
                        } else {
                            Style::default().fg(color)
                        };
                        Cell::from(Line::from(Span::styled(value.display().into_owned(), style)))
                    })
                    .collect();
                let row_style = match self.ctx.alternate_row_color {
                    Some(bg) if i % 2 == 1 => Style::default().bg(bg),
                    _ => Style::default(),
                };
                Row::new(cells).style(row_style)
            })
            .collect();

        if let Some(selected) = state.table_state.selected() {
            if selected >= page.len() {
                state.table_state.select(Some(page.len().saturating_sub(1)));
            }
        }

        let constraints: Vec<Constraint> =
            shown.iter().map(|&(_, _, w)| Constraint::Length(w)).collect();
        StatefulWidget::render(
            Table::new(rows, constraints)
                .column_spacing(padding)
                .header(Row::new(headers).style(header_style))
                .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            table_area,
            buf,
            &mut state.table_state,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DataSource;

    fn int_rows(range: std::ops::Range<i64>) -> Vec<Vec<CellValue>> {
        range.map(|i| vec![CellValue::Int(i)]).collect()
    }

    fn windowed(total: usize, start: usize, len: usize) -> Dataset {
        Dataset::windowed(
            vec!["n".into()],
            int_rows(start as i64..(start + len) as i64),
            "t".into(),
            total,
            start,
        )
    }

    fn local() -> Dataset {
        Dataset::complete(
            vec!["id".into(), "name".into()],
            vec![
                vec![CellValue::Int(3), CellValue::Text("c".into())],
                vec![CellValue::Int(1), CellValue::Null],
                vec![CellValue::Int(2), CellValue::Text("b".into())],
            ],
            DataSource::Local,
        )
    }

    fn state(size: usize) -> DataTableState {
        DataTableState::new(size, vec![10, 20, 50, 100], 1000, 3)
    }

    #[test]
    fn test_page_math() {
        assert_eq!(page_bounds(0, 10, 25), (0, 10));
        assert_eq!(page_bounds(2, 10, 25), (20, 25));
        assert_eq!(page_bounds(9, 10, 25), (25, 25));
        assert_eq!(page_count(25, 10), 3);
        assert_eq!(page_count(0, 10), 1);
    }

    #[test]
    fn test_plan_window_inside_window_needs_nothing() {
        let ds = windowed(50_000, 0, 1000);
        assert_eq!(plan_window(990, 10, 1000, &ds), None);
    }

    #[test]
    fn test_plan_window_refill_covers_page() {
        let ds = windowed(50_000, 0, 1000);
        let req = plan_window(5000, 10, 1000, &ds).unwrap();
        assert_eq!(req, WindowRequest { offset: 4750, limit: 1000 });

        // near the start the lookback shrinks to what exists
        let ds = windowed(50_000, 10_000, 1000);
        let req = plan_window(100, 100, 1000, &ds).unwrap();
        assert_eq!(req, WindowRequest { offset: 0, limit: 1000 });
    }

    #[test]
    fn test_plan_window_contains_requested_range() {
        let total = 20_000;
        for &window_size in &[4usize, 100, 1000] {
            for &size in &[10usize, 100, 5000] {
                for start in (0..total).step_by(997) {
                    let ds = windowed(total, 0, 1);
                    let end = (start + size).min(total);
                    if let Some(req) = plan_window(start, size, window_size, &ds) {
                        let refilled = windowed(total, req.offset, req.limit);
                        assert!(refilled.contains_range(start, end), "{start} {size} {window_size}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_fully_loaded_never_refills() {
        let ds = local();
        let mut st = state(1);
        assert_eq!(st.next_page(&ds), None);
        assert_eq!(st.last_page(&ds), None);
        assert_eq!(st.page, 2);
        assert_eq!(st.next_page(&ds), None);
        assert_eq!(st.page, 2);
    }

    #[test]
    fn test_navigation_requests_and_local_slice() {
        let mut ds = windowed(5000, 0, 1000);
        let mut st = state(100);
        assert_eq!(st.next_page(&ds), None);
        let req = st.last_page(&ds).unwrap();
        assert_eq!(st.page, 49);
        assert!(st.page_rows(&ds).is_empty());

        let rows = int_rows(req.offset as i64..(req.offset + req.limit) as i64);
        ds.replace_window(vec!["n".into()], rows, req.offset);
        st.window_applied();
        let page = st.page_rows(&ds);
        assert_eq!(page.len(), 100);
        assert_eq!(page[0][0], CellValue::Int(4900));
        assert_eq!(page[99][0], CellValue::Int(4999));
    }

    #[test]
    fn test_set_page_size_keeps_first_row() {
        let ds = windowed(5000, 0, 5000);
        let mut st = state(10);
        st.go_to_page(7, &ds);
        st.set_page_size(50, &ds);
        assert_eq!(st.page, 1);
        st.cycle_page_size(&ds);
        assert_eq!(st.page_size, 100);
    }

    #[test]
    fn test_sort_cycles_and_is_local_only() {
        let ds = local();
        let mut st = state(10);
        assert!(st.cycle_sort(&ds));
        let ids: Vec<_> = st.page_rows(&ds).iter().map(|r| r[0].clone()).collect();
        assert_eq!(ids, vec![CellValue::Int(1), CellValue::Int(2), CellValue::Int(3)]);

        st.cycle_sort(&ds);
        assert_eq!(st.sort_key().map(|k| k.direction), Some(SortDirection::Descending));
        assert_eq!(st.page_rows(&ds)[0][0], CellValue::Int(3));

        st.cycle_sort(&ds);
        assert!(st.sort_key().is_none());
        assert_eq!(st.page_rows(&ds)[0][0], CellValue::Int(3));

        let server = windowed(5000, 0, 1000);
        assert!(!st.cycle_sort(&server));
    }

    #[test]
    fn test_resize_respects_minimum() {
        let ds = local();
        let mut st = state(10);
        let base = st.column_width(&ds, 0);
        st.resize_focused(4, &ds);
        assert_eq!(st.column_width(&ds, 0), base + 4);
        st.resize_focused(-100, &ds);
        assert_eq!(st.column_width(&ds, 0), MIN_COLUMN_WIDTH);
    }

    #[test]
    fn test_column_visibility() {
        let ds = local();
        let mut st = state(10);
        st.toggle_column("id");
        assert_eq!(st.visible_columns(&ds), vec![1]);
        assert_eq!(st.focused_column_name(&ds), Some("name"));
        st.toggle_column("id");
        assert_eq!(st.visible_columns(&ds), vec![0, 1]);
        st.toggle_column("name");
        st.toggle_column("id");
        assert!(st.visible_columns(&ds).is_empty());
        st.show_all_columns();
        assert_eq!(st.visible_columns(&ds).len(), 2);
    }

    #[test]
    fn test_column_classes_fall_back_to_values() {
        let ds = local();
        let schema = vec![SchemaColumn {
            name: "id".into(),
            dtype: "BIGINT".into(),
        }];
        assert_eq!(
            column_classes(&ds, &schema),
            vec![TypeClass::Integer, TypeClass::Text]
        );
    }

    #[test]
    fn test_render_grid_and_footer() {
        let ds = local();
        let classes = column_classes(&ds, &[]);
        let ctx = RenderContext::default();
        let mut st = state(10);
        st.cycle_sort(&ds);
        let area = Rect::new(0, 0, 60, 6);
        let mut buf = Buffer::empty(area);
        DataTable::new(&ds, &classes, &ctx).render(area, &mut buf, &mut st);
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("id ▲"));
        assert!(text.contains("name"));
        assert!(text.contains("Page 1/1"));
        assert!(text.contains("rows 1-3 of 3"));
        assert_eq!(st.visible_rows, 4);
    }
}
