//! File intake: a path prompt (typed, pasted or dropped) plus the delimited-text options form.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use pqview_cli::{SourceFormat, ViewMode};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, StatefulWidget, Widget},
};

use crate::cache::{CacheManager, PATH_HISTORY};
use crate::config::Theme;
use crate::ingest::{CsvOptions, Delimiter};
use crate::render::context::RenderContext;
use crate::widgets::radio_block::RadioBlock;
use crate::widgets::text_input::{TextInput, TextInputEvent};

const DELIMITER_LABELS: [&str; 6] = ["Auto", "Comma", "Semicolon", "Tab", "Pipe", "Custom"];
const CUSTOM_INDEX: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeFocus {
    Path,
    Delimiter,
    CustomDelimiter,
    Header,
    AllText,
    NullValues,
    NewNull,
}

impl IntakeFocus {
    const ORDER: [IntakeFocus; 7] = [
        Self::Path,
        Self::Delimiter,
        Self::CustomDelimiter,
        Self::Header,
        Self::AllText,
        Self::NullValues,
        Self::NewNull,
    ];

    fn step(self, forward: bool) -> Self {
        let n = Self::ORDER.len();
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        let next = if forward { (i + 1) % n } else { (i + n - 1) % n };
        Self::ORDER[next]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntakeAction {
    None,
    Open(PathBuf, CsvOptions),
    Cancel,
}

/// Extensions shown (and accepted) for a mode.
pub fn accepted_extensions(mode: ViewMode) -> &'static [&'static str] {
    const ALL: &[&str] = &[
        ".parquet", ".csv", ".tsv", ".txt", ".json", ".xlsx", ".xls", ".xlsm", ".xlsb", ".ods",
    ];
    match mode {
        ViewMode::Convert => &ALL[1..],
        _ => ALL,
    }
}

/// Turn pasted or dropped text into a path: trims whitespace and quotes, drops a `file://`
/// prefix and unescapes `\ `.
pub fn normalize_dropped_path(text: &str) -> PathBuf {
    let mut s = text.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            s = &s[1..s.len() - 1];
        }
    }
    let s = s.strip_prefix("file://").unwrap_or(s);
    PathBuf::from(s.replace("\\ ", " "))
}

/// Check that `path` can be opened in `mode`.
pub fn validate_path(path: &std::path::Path, mode: ViewMode) -> Result<SourceFormat, String> {
    if path.as_os_str().is_empty() {
        return Err("Enter a file path".to_string());
    }
    let format = SourceFormat::from_path(path).ok_or_else(|| {
        format!(
            "Unsupported file type. Accepted: {}",
            accepted_extensions(mode).join(" ")
        )
    })?;
    if !mode.accepts(format) {
        return Err(format!(
            "{} files cannot be used in {} mode",
            format.table_prefix(),
            mode.as_str()
        ));
    }
    if !path.is_file() {
        return Err(format!("File not found: {}", path.display()));
    }
    Ok(format)
}

pub struct Intake {
    pub path: TextInput,
    pub custom_delimiter: TextInput,
    pub new_null: TextInput,
    pub options: CsvOptions,
    pub focus: IntakeFocus,
    pub message: Option<String>,
    delimiter_index: usize,
    null_cursor: usize,
    mode: ViewMode,
}

impl Intake {
    pub fn new(mode: ViewMode, options: CsvOptions, theme: &Theme, history_limit: Option<usize>) -> Self {
        let mut path = TextInput::new().with_theme(theme);
        if let Some(limit) = history_limit {
            path = path.with_history(PATH_HISTORY, limit);
        }
        let (delimiter_index, custom) = match options.delimiter {
            Delimiter::Custom(b) => (CUSTOM_INDEX, (b as char).to_string()),
            d => (
                Delimiter::CHOICES.iter().position(|c| *c == d).unwrap_or(0),
                String::new(),
            ),
        };
        let mut intake = Self {
            path,
            custom_delimiter: TextInput::new().with_theme(theme).with_value(custom),
            new_null: TextInput::new().with_theme(theme),
            options,
            focus: IntakeFocus::Path,
            message: None,
            delimiter_index,
            null_cursor: 0,
            mode,
        };
        intake.sync_focus();
        intake
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    fn sync_focus(&mut self) {
        self.path.set_focused(self.focus == IntakeFocus::Path);
        self.custom_delimiter
            .set_focused(self.focus == IntakeFocus::CustomDelimiter);
        self.new_null.set_focused(self.focus == IntakeFocus::NewNull);
    }

    pub fn set_focus(&mut self, focus: IntakeFocus) {
        self.focus = focus;
        self.sync_focus();
    }

    /// Options as they will be frozen for ingestion.
    pub fn resolved_options(&self) -> Result<CsvOptions, String> {
        let mut options = self.options.clone();
        options.delimiter = if self.delimiter_index == CUSTOM_INDEX {
            Delimiter::parse(self.custom_delimiter.value())
                .filter(|d| *d != Delimiter::Auto)
                .ok_or_else(|| "Custom delimiter must be a single character".to_string())?
        } else {
            Delimiter::CHOICES[self.delimiter_index]
        };
        Ok(options)
    }

    /// Validate the prompt and produce an `Open` action.
    pub fn submit(&mut self, cache: Option<&CacheManager>) -> IntakeAction {
        let path = normalize_dropped_path(self.path.value());
        if let Err(msg) = validate_path(&path, self.mode) {
            self.message = Some(msg);
            return IntakeAction::None;
        }
        match self.resolved_options() {
            Ok(options) => {
                self.message = None;
                self.path.set_value(path.display().to_string());
                self.path.save_to_history(cache);
                IntakeAction::Open(path, options)
            }
            Err(msg) => {
                self.message = Some(msg);
                IntakeAction::None
            }
        }
    }

    /// Bracketed paste. A paste into the path prompt is treated as a drop and submitted.
    pub fn paste(&mut self, text: &str, cache: Option<&CacheManager>) -> IntakeAction {
        match self.focus {
            IntakeFocus::Path => {
                self.path
                    .set_value(normalize_dropped_path(text).display().to_string());
                self.submit(cache)
            }
            IntakeFocus::CustomDelimiter => {
                self.custom_delimiter.insert_str(text);
                IntakeAction::None
            }
            IntakeFocus::NewNull => {
                self.new_null.insert_str(text);
                IntakeAction::None
            }
            _ => IntakeAction::None,
        }
    }

    pub fn handle_key(&mut self, event: &KeyEvent, cache: Option<&CacheManager>) -> IntakeAction {
        match event.code {
            KeyCode::Tab => {
                self.set_focus(self.focus.step(true));
                return IntakeAction::None;
            }
            KeyCode::BackTab => {
                self.set_focus(self.focus.step(false));
                return IntakeAction::None;
            }
            _ => {}
        }

        match self.focus {
            // Enter is handled here so only valid paths reach the history.
            IntakeFocus::Path if event.code == KeyCode::Enter => self.submit(cache),
            IntakeFocus::Path => match self.path.handle_key(event, cache) {
                TextInputEvent::Cancel => IntakeAction::Cancel,
                _ => IntakeAction::None,
            },
            IntakeFocus::Delimiter => {
                match event.code {
                    KeyCode::Left | KeyCode::Char('h') => {
                        self.delimiter_index =
                            (self.delimiter_index + DELIMITER_LABELS.len() - 1) % DELIMITER_LABELS.len();
                    }
                    KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => {
                        self.delimiter_index = (self.delimiter_index + 1) % DELIMITER_LABELS.len();
                    }
                    KeyCode::Esc => return IntakeAction::Cancel,
                    KeyCode::Enter => return self.submit(cache),
                    _ => {}
                }
                IntakeAction::None
            }
            IntakeFocus::CustomDelimiter => match self.custom_delimiter.handle_key(event, None) {
                TextInputEvent::Submit => self.submit(cache),
                TextInputEvent::Cancel => IntakeAction::Cancel,
                _ => {
                    if !self.custom_delimiter.is_empty() {
                        self.delimiter_index = CUSTOM_INDEX;
                    }
                    IntakeAction::None
                }
            },
            IntakeFocus::Header | IntakeFocus::AllText => match event.code {
                KeyCode::Char(' ') => {
                    if self.focus == IntakeFocus::Header {
                        self.options.has_header = !self.options.has_header;
                    } else {
                        self.options.all_varchar = !self.options.all_varchar;
                    }
                    IntakeAction::None
                }
                KeyCode::Enter => self.submit(cache),
                KeyCode::Esc => IntakeAction::Cancel,
                _ => IntakeAction::None,
            },
            IntakeFocus::NullValues => {
                let n = self.options.null_values.len();
                match event.code {
                    KeyCode::Down | KeyCode::Char('j') if self.null_cursor + 1 < n => {
                        self.null_cursor += 1
                    }
                    KeyCode::Up | KeyCode::Char('k') => {
                        self.null_cursor = self.null_cursor.saturating_sub(1)
                    }
                    KeyCode::Delete | KeyCode::Backspace | KeyCode::Char('d') => {
                        self.remove_null_value(self.null_cursor);
                    }
                    KeyCode::Enter => return self.submit(cache),
                    KeyCode::Esc => return IntakeAction::Cancel,
                    _ => {}
                }
                IntakeAction::None
            }
            IntakeFocus::NewNull => match self.new_null.handle_key(event, None) {
                TextInputEvent::Submit => {
                    let value = self.new_null.value().to_string();
                    self.add_null_value(value);
                    self.new_null.clear();
                    IntakeAction::None
                }
                TextInputEvent::Cancel => IntakeAction::Cancel,
                _ => IntakeAction::None,
            },
        }
    }

    /// Add a null marker unless it is already listed.
    pub fn add_null_value(&mut self, value: String) -> bool {
        if self.options.null_values.contains(&value) {
            return false;
        }
        self.options.null_values.push(value);
        true
    }

    pub fn remove_null_value(&mut self, index: usize) -> Option<String> {
        if index >= self.options.null_values.len() {
            return None;
        }
        let removed = self.options.null_values.remove(index);
        self.null_cursor = self
            .null_cursor
            .min(self.options.null_values.len().saturating_sub(1));
        Some(removed)
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext) {
        let title = match self.mode {
            ViewMode::Convert => "Convert to Parquet: open a file",
            _ => "Open a file",
        };
        let outer = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(ctx.modal_border));
        let inner = outer.inner(area);
        outer.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(RadioBlock::height_for(DELIMITER_LABELS.len(), 6)),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Fill(1),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(inner);

        let field_block = |title: &'static str, focused: bool| {
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(if focused {
                    ctx.modal_border_active
                } else {
                    ctx.modal_border
                }))
        };

        let path_block = field_block("Path (type, paste or drop a file)", self.focus == IntakeFocus::Path);
        let path_inner = path_block.inner(chunks[0]);
        path_block.render(chunks[0], buf);
        (&self.path).render(path_inner, buf);

        Paragraph::new(format!("Accepted: {}", accepted_extensions(self.mode).join(" ")))
            .style(Style::default().fg(ctx.text_secondary))
            .render(chunks[1], buf);

        if let Some(msg) = &self.message {
            Paragraph::new(msg.as_str())
                .style(Style::default().fg(ctx.error))
                .render(chunks[2], buf);
        }

        RadioBlock::new(
            "Delimiter (delimited text)",
            &DELIMITER_LABELS,
            self.delimiter_index,
            self.focus == IntakeFocus::Delimiter,
            6,
            ctx.modal_border,
            ctx.modal_border_active,
        )
        .render(chunks[3], buf);

        let custom_block = field_block("Custom delimiter", self.focus == IntakeFocus::CustomDelimiter);
        let custom_inner = custom_block.inner(chunks[4]);
        custom_block.render(chunks[4], buf);
        (&self.custom_delimiter).render(custom_inner, buf);

        let toggle = |label: &str, on: bool, focused: bool| {
            let mut style = Style::default().fg(ctx.text_primary);
            if focused {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Span::styled(format!("[{}] {}", if on { "x" } else { " " }, label), style)
        };
        Paragraph::new(Line::from(vec![
            toggle(
                "First row is header",
                self.options.has_header,
                self.focus == IntakeFocus::Header,
            ),
            Span::raw("   "),
            toggle(
                "Read all columns as text",
                self.options.all_varchar,
                self.focus == IntakeFocus::AllText,
            ),
        ]))
        .render(chunks[5], buf);

        let items: Vec<ListItem> = self
            .options
            .null_values
            .iter()
            .map(|v| {
                let shown = if v.is_empty() {
                    "(empty string)".to_string()
                } else {
                    format!("\"{}\"", v)
                };
                ListItem::new(shown)
            })
            .collect();
        let focused = self.focus == IntakeFocus::NullValues;
        let mut list_state = ListState::default().with_selected(focused.then_some(self.null_cursor));
        StatefulWidget::render(
            List::new(items)
                .block(field_block("Null values (d removes)", focused))
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            chunks[6],
            buf,
            &mut list_state,
        );

        let new_block = field_block("Add null value (Enter adds)", self.focus == IntakeFocus::NewNull);
        let new_inner = new_block.inner(chunks[7]);
        new_block.render(chunks[7], buf);
        (&self.new_null).render(new_inner, buf);

        Paragraph::new("Tab next field · Enter open · Esc cancel")
            .style(Style::default().fg(ctx.dimmed))
            .render(chunks[8], buf);
    }
}
