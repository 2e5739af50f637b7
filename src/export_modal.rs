//! Export modal state and focus management.

use crossterm::event::{KeyCode, KeyEvent};
use pqview_cli::{ExportFormat, ParquetCodec};

use crate::config::Theme;
use crate::export::{default_file_name, ExportConfig};
use crate::widgets::text_input::{TextInput, TextInputEvent};

/// What the modal produces: one of the six grid formats, or a Parquet conversion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ExportTarget {
    #[default]
    Data,
    Parquet,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ExportFocus {
    #[default]
    FormatSelector,
    FileName,
    TableName,
    Compression,
    ExportButton,
    CancelButton,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportRequest {
    Data(ExportConfig),
    Parquet { base: String, codec: ParquetCodec },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportModalAction {
    None,
    Submit(ExportRequest),
    Cancel,
}

pub struct ExportModal {
    pub active: bool,
    pub focus: ExportFocus,
    pub target: ExportTarget,
    pub selected_format: ExportFormat,
    pub codec: ParquetCodec,
    pub file_name: TextInput,
    pub table_name: TextInput,
}

impl Default for ExportModal {
    fn default() -> Self {
        Self {
            active: false,
            focus: ExportFocus::FormatSelector,
            target: ExportTarget::Data,
            selected_format: ExportFormat::default(),
            codec: ParquetCodec::default(),
            file_name: TextInput::new(),
            table_name: TextInput::new(),
        }
    }
}

impl ExportModal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open for the grid's formats with a fresh `export_<millis>` file name.
    pub fn open_data(&mut self, default_format: ExportFormat, theme: &Theme) {
        self.open(ExportTarget::Data, theme, default_file_name());
        self.selected_format = default_format;
        self.focus = ExportFocus::FormatSelector;
        self.sync_focus();
    }

    /// Open the convert-to-Parquet form; the file name defaults to the source stem.
    pub fn open_parquet(&mut self, codec: ParquetCodec, base: &str, theme: &Theme) {
        self.open(ExportTarget::Parquet, theme, base.to_string());
        self.codec = codec;
        self.focus = ExportFocus::Compression;
        self.sync_focus();
    }

    fn open(&mut self, target: ExportTarget, theme: &Theme, file_name: String) {
        self.active = true;
        self.target = target;
        self.file_name = TextInput::new().with_theme(theme).with_value(file_name);
        self.table_name = TextInput::new().with_theme(theme);
    }

    pub fn close(&mut self) {
        self.active = false;
        self.focus = ExportFocus::FormatSelector;
        self.sync_focus();
    }

    fn focus_order(&self) -> Vec<ExportFocus> {
        let mut order = Vec::with_capacity(6);
        match self.target {
            ExportTarget::Data => {
                order.push(ExportFocus::FormatSelector);
                order.push(ExportFocus::FileName);
                if self.selected_format.is_sql() {
                    order.push(ExportFocus::TableName);
                }
            }
            ExportTarget::Parquet => {
                order.push(ExportFocus::Compression);
                order.push(ExportFocus::FileName);
            }
        }
        order.push(ExportFocus::ExportButton);
        order.push(ExportFocus::CancelButton);
        order
    }

    fn step_focus(&mut self, forward: bool) {
        let order = self.focus_order();
        let n = order.len();
        let i = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[if forward { (i + 1) % n } else { (i + n - 1) % n }];
        self.sync_focus();
    }

    pub fn next_focus(&mut self) {
        self.step_focus(true);
    }

    pub fn prev_focus(&mut self) {
        self.step_focus(false);
    }

    fn sync_focus(&mut self) {
        self.file_name.set_focused(self.focus == ExportFocus::FileName);
        self.table_name.set_focused(self.focus == ExportFocus::TableName);
    }

    pub fn cycle_format(&mut self, forward: bool) {
        let n = ExportFormat::ALL.len();
        let i = ExportFormat::ALL
            .iter()
            .position(|f| *f == self.selected_format)
            .unwrap_or(0);
        self.selected_format = ExportFormat::ALL[if forward { (i + 1) % n } else { (i + n - 1) % n }];
    }

    pub fn cycle_codec(&mut self, forward: bool) {
        let n = ParquetCodec::ALL.len();
        let i = ParquetCodec::ALL
            .iter()
            .position(|c| *c == self.codec)
            .unwrap_or(0);
        self.codec = ParquetCodec::ALL[if forward { (i + 1) % n } else { (i + n - 1) % n }];
    }

    /// The request the form currently describes. A blank file name is replaced by the default.
    pub fn request(&self) -> ExportRequest {
        let name = self.file_name.value().trim();
        match self.target {
            ExportTarget::Data => {
                let file_name = if name.is_empty() {
                    default_file_name()
                } else {
                    name.to_string()
                };
                let table = self.selected_format.is_sql().then(|| self.table_name.value().to_string());
                ExportRequest::Data(
                    ExportConfig::new(self.selected_format)
                        .with_file_name(file_name)
                        .with_table_name(table),
                )
            }
            ExportTarget::Parquet => {
                let base = name.strip_suffix(".parquet").unwrap_or(name);
                ExportRequest::Parquet {
                    base: if base.is_empty() { "data".to_string() } else { base.to_string() },
                    codec: self.codec,
                }
            }
        }
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> ExportModalAction {
        match event.code {
            KeyCode::Tab => {
                self.next_focus();
                return ExportModalAction::None;
            }
            KeyCode::BackTab => {
                self.prev_focus();
                return ExportModalAction::None;
            }
            KeyCode::Esc => return ExportModalAction::Cancel,
            _ => {}
        }

        match self.focus {
            ExportFocus::FormatSelector => match event.code {
                KeyCode::Up | KeyCode::Char('k') => self.cycle_format(false),
                KeyCode::Down | KeyCode::Char('j') => self.cycle_format(true),
                KeyCode::Enter => return ExportModalAction::Submit(self.request()),
                _ => {}
            },
            ExportFocus::Compression => match event.code {
                KeyCode::Left | KeyCode::Char('h') => self.cycle_codec(false),
                KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => self.cycle_codec(true),
                KeyCode::Enter => return ExportModalAction::Submit(self.request()),
                _ => {}
            },
            ExportFocus::FileName | ExportFocus::TableName => {
                let input = if self.focus == ExportFocus::FileName {
                    &mut self.file_name
                } else {
                    &mut self.table_name
                };
                if input.handle_key(event, None) == TextInputEvent::Submit {
                    return ExportModalAction::Submit(self.request());
                }
            }
            ExportFocus::ExportButton => {
                if event.code == KeyCode::Enter {
                    return ExportModalAction::Submit(self.request());
                }
            }
            ExportFocus::CancelButton => {
                if event.code == KeyCode::Enter {
                    return ExportModalAction::Cancel;
                }
            }
        }
        ExportModalAction::None
    }
}
