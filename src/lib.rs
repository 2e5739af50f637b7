use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, BorderType, Borders, Clear, StatefulWidget, Widget};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod batch;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod export_modal;
pub(crate) mod help_strings;
pub mod ingest;
pub mod query;
mod render;
pub mod session;
pub mod value;
pub mod widgets;

pub use cache::CacheManager;
pub use config::{AppConfig, ColorParser, ConfigManager, Theme};
pub use pqview_cli::{Args, ExportFormat, ParquetCodec, SourceFormat, ViewMode};

use engine::{Catalog, EngineBinding};
use export::{convert_to_parquet, export_dataset, write_export};
use export_modal::{ExportModal, ExportModalAction, ExportRequest};
use ingest::{
    load_table, CsvOptions, Delimiter, LoadLimits, LoadPhase, LoadedTable,
    DEFAULT_INFER_SCHEMA_ROWS,
};
use render::context::RenderContext;
use render::layout::{app_layout, centered_rect_fixed, view_layout};
use render::overlays::{
    render_error_modal, render_help_overlay, render_loading_gauge, render_success_modal,
};
use session::{RequestKind, Session};
use value::{CellValue, QueryResult};
use widgets::columns::ColumnChooser;
use widgets::controls::Controls;
use widgets::datatable::{column_classes, DataTable, DataTableState, WindowRequest};
use widgets::debug::DebugState;
use widgets::export::render_export_modal;
use widgets::intake::{validate_path, Intake, IntakeAction, IntakeFocus};
use widgets::schema::SchemaView;
use widgets::sql_editor::{SqlEditor, SqlEditorAction};

/// Application name used for config and cache directories.
pub const APP_NAME: &str = "pqview";

/// Outcome of work done off the UI thread; errors are already user-facing messages.
pub type Outcome<T> = std::result::Result<T, String>;

#[derive(Default)]
pub struct ErrorModal {
    pub active: bool,
    pub message: String,
}

impl ErrorModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: String) {
        self.active = true;
        self.message = message;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
    }
}

#[derive(Default)]
pub struct SuccessModal {
    pub active: bool,
    pub message: String,
}

impl SuccessModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: String) {
        self.active = true;
        self.message = message;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
    }
}

/// Settings for a session: command-line arguments layered over the config file.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub mode: ViewMode,
    pub csv: CsvOptions,
    pub page_size: usize,
    pub export_format: ExportFormat,
    pub table_name: Option<String>,
    pub compression: ParquetCodec,
    pub output_dir: PathBuf,
    pub streaming: Option<bool>,
    pub limits: LoadLimits,
    pub row_limit: usize,
    /// `None` when query and path history are disabled.
    pub history_limit: Option<usize>,
    pub debug: bool,
}

impl OpenOptions {
    pub fn from_args_and_config(args: &Args, config: &AppConfig) -> Result<Self> {
        let delimiter = match args
            .delimiter
            .as_deref()
            .or(config.file_loading.delimiter.as_deref())
        {
            Some(text) => Delimiter::parse(text).ok_or_else(|| {
                eyre!(
                    "Invalid delimiter {:?}: use auto, comma, semicolon, tab, pipe or a single character",
                    text
                )
            })?,
            None => Delimiter::Auto,
        };
        let csv = CsvOptions {
            delimiter,
            has_header: !args.no_header && config.file_loading.has_header,
            null_values: if args.null_value.is_empty() {
                config.file_loading.null_values.clone()
            } else {
                args.null_value.clone()
            },
            all_varchar: args.all_varchar || config.file_loading.all_varchar,
            infer_schema_length: args
                .infer_schema_length
                .or(config.file_loading.infer_schema_length)
                .unwrap_or(DEFAULT_INFER_SCHEMA_ROWS)
                .max(1),
        };
        let streaming = match args.streaming {
            Some(streaming) => Some(streaming),
            None => config.engine.streaming_override()?,
        };

        Ok(Self {
            mode: args.mode.unwrap_or_default(),
            csv,
            page_size: args.page_size.unwrap_or(config.display.page_size).max(1),
            export_format: args
                .export_format
                .unwrap_or_else(|| config.export.format()),
            table_name: args.table_name.clone(),
            compression: args.compression.unwrap_or_else(|| config.convert.codec()),
            output_dir: args
                .output_dir
                .clone()
                .or_else(|| config.export.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            streaming,
            limits: LoadLimits {
                full_load_threshold: config.performance.full_load_threshold,
                window_size: config.performance.window_size,
            },
            row_limit: config.query.row_limit,
            history_limit: config
                .query
                .enable_history
                .then_some(config.query.history_limit),
            debug: args.debug || config.debug.enabled,
        })
    }
}

pub enum AppEvent {
    Key(KeyEvent),
    /// Bracketed paste; a dropped file arrives this way.
    Paste(String),
    Resize(u16, u16),
    Open(PathBuf, CsvOptions),
    DoLoad(PathBuf, CsvOptions, u64), // Internal event to start ingestion after the gauge is drawn
    LoadProgress(u64, LoadPhase),
    Loaded(u64, Outcome<LoadedTable>),
    /// Refill for the file table: generation, offset, columns and rows.
    WindowLoaded(u64, usize, Outcome<(Vec<String>, Vec<Vec<CellValue>>)>),
    QueryDone(u64, Outcome<QueryResult>),
    Exported(Outcome<PathBuf>),
    Exit,
    Crash(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Intake,
    Sql,
    Columns,
    Export,
}

pub struct App {
    events: Sender<AppEvent>,
    engine: Arc<EngineBinding>,
    pub session: Session,
    pub table: DataTableState,
    pub sql_editor: SqlEditor,
    pub columns: ColumnChooser,
    pub intake: Intake,
    pub export_modal: ExportModal,
    pub error_modal: ErrorModal,
    pub success_modal: SuccessModal,
    pub debug: DebugState,
    pub input_mode: InputMode,
    pub show_schema: bool,
    pub show_sql: bool,
    pub show_help: bool,
    help_scroll: usize,
    schema_scroll: usize,
    pub busy: bool,
    throbber_frame: u8,
    exporting: bool,
    theme: Theme,
    config: AppConfig,
    opts: OpenOptions,
    cache: Option<CacheManager>,
}

impl App {
    pub fn new(events: Sender<AppEvent>, theme: Theme, config: AppConfig, opts: OpenOptions) -> Self {
        let table = DataTableState::new(
            opts.page_size,
            config.display.page_size_options.clone(),
            opts.limits.window_size,
            config.display.min_column_width,
        );
        let sql_editor = SqlEditor::new(&theme, opts.row_limit, opts.history_limit);
        let intake = Intake::new(opts.mode, opts.csv.clone(), &theme, opts.history_limit);
        Self {
            events,
            engine: Arc::new(EngineBinding::new(opts.streaming)),
            session: Session::new(),
            table,
            sql_editor,
            columns: ColumnChooser::default(),
            intake,
            export_modal: ExportModal::new(),
            error_modal: ErrorModal::new(),
            success_modal: SuccessModal::new(),
            debug: DebugState::default(),
            input_mode: InputMode::Intake,
            show_schema: opts.mode == ViewMode::Schema,
            show_sql: false,
            show_help: false,
            help_scroll: 0,
            schema_scroll: 0,
            busy: false,
            throbber_frame: 0,
            exporting: false,
            theme,
            config,
            opts,
            cache: CacheManager::new(APP_NAME).ok(),
        }
    }

    /// Replace the history cache (`None` disables persistence).
    pub fn with_cache(mut self, cache: Option<CacheManager>) -> Self {
        self.cache = cache;
        self
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    pub fn options(&self) -> &OpenOptions {
        &self.opts
    }

    /// Handle one event. A returned event is sent back through the channel by the caller.
    pub fn event(&mut self, event: AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;

        match event {
            AppEvent::Key(key) => {
                let quit = key.code == KeyCode::Char('q')
                    || (key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL));
                // While loading or exporting only quitting is allowed.
                if self.busy && !quit {
                    return None;
                }
                self.key(&key)
            }
            AppEvent::Paste(text) => self.paste(&text),
            AppEvent::Resize(..) => None,
            AppEvent::Open(path, options) => self.open(path, options),
            AppEvent::DoLoad(path, options, generation) => self.load(path, options, generation),
            AppEvent::LoadProgress(generation, phase) => {
                self.session.set_phase(generation, phase);
                None
            }
            AppEvent::Loaded(generation, result) => self.loaded(generation, result),
            AppEvent::WindowLoaded(generation, offset, result) => {
                self.window_loaded(generation, offset, result);
                None
            }
            AppEvent::QueryDone(generation, result) => {
                self.query_done(generation, result);
                None
            }
            AppEvent::Exported(result) => {
                self.busy = false;
                self.exporting = false;
                match result {
                    Ok(path) => {
                        info!(path = %path.display(), "export finished");
                        self.success_modal
                            .show(format!("Exported to {}", path.display()));
                    }
                    Err(message) => {
                        warn!(error = %message, "export failed");
                        self.error_modal.show(message);
                    }
                }
                None
            }
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn open(&mut self, path: PathBuf, options: CsvOptions) -> Option<AppEvent> {
        if let Some(previous) = self.session.table().map(str::to_string) {
            self.release_table(previous);
        }
        let generation = self.session.begin_ingest(&path);
        info!(path = %path.display(), generation, "opening file");
        self.busy = true;
        self.input_mode = InputMode::Normal;
        self.show_sql = false;
        self.sql_editor.set_focused(false);
        self.export_modal.close();
        self.columns.close();
        self.table.reset();
        self.schema_scroll = 0;
        Some(AppEvent::DoLoad(path, options, generation))
    }

    fn load(&mut self, path: PathBuf, options: CsvOptions, generation: u64) -> Option<AppEvent> {
        if !self.session.is_current(RequestKind::Ingest, generation) {
            return None;
        }
        let format = match validate_path(&path, self.opts.mode) {
            Ok(format) => format,
            Err(message) => return Some(AppEvent::Loaded(generation, Err(message))),
        };
        let engine = match self.engine.get() {
            Ok(engine) => engine,
            Err(e) => return Some(AppEvent::Crash(e.user_message())),
        };
        self.debug.engine_variant = Some(engine.variant().as_str());

        let limits = self.opts.limits;
        let progress = self.events.clone();
        let done = self.events.clone();
        let submitted = engine.submit(
            move |catalog| {
                load_table(catalog, &path, format, &options, limits, &mut |phase| {
                    let _ = progress.send(AppEvent::LoadProgress(generation, phase));
                })
            },
            move |result| {
                let event = match result {
                    Err(e) if e.is_fatal() => AppEvent::Crash(e.user_message()),
                    result => AppEvent::Loaded(generation, result.map_err(|e| e.user_message())),
                };
                let _ = done.send(event);
            },
        );
        match submitted {
            Ok(()) => None,
            Err(e) => Some(AppEvent::Crash(e.user_message())),
        }
    }

    fn loaded(&mut self, generation: u64, result: Outcome<LoadedTable>) -> Option<AppEvent> {
        match result {
            Ok(loaded) => {
                let table = loaded.table.clone();
                let rows = loaded.dataset.total_rows;
                if !self.session.finish_ingest(generation, loaded) {
                    self.debug.stale_results += 1;
                    self.release_table(table);
                    return None;
                }
                info!(table = %table, rows, "file loaded");
                self.busy = false;
                self.sql_editor.load_table(&table);
                self.table.reset();
                match self.opts.mode {
                    ViewMode::Viewer => {}
                    ViewMode::Schema => self.show_schema = true,
                    ViewMode::Sql => self.focus_sql(),
                    ViewMode::Convert => self.open_export(),
                }
            }
            Err(message) => {
                if !self.session.fail_ingest(generation) {
                    self.debug.stale_results += 1;
                    return None;
                }
                warn!(error = %message, "load failed");
                self.busy = false;
                self.error_modal.show(message);
                self.input_mode = InputMode::Intake;
            }
        }
        None
    }

    /// Drop an engine table that is no longer shown.
    fn release_table(&self, table: String) {
        if !self.engine.is_started() {
            return;
        }
        if let Ok(engine) = self.engine.get() {
            let submitted = engine.submit(
                move |catalog| Ok(catalog.drop_table(&table)),
                |_dropped| {},
            );
            if let Err(e) = submitted {
                warn!(error = %e, "could not release table");
            }
        }
    }

    fn request_window(&mut self, request: Option<WindowRequest>) {
        let Some(request) = request else {
            return;
        };
        let Some(table) = self.session.table().map(str::to_string) else {
            return;
        };
        let engine = match self.engine.get() {
            Ok(engine) => engine,
            Err(e) => {
                self.table.window_applied();
                self.error_modal.show(e.user_message());
                return;
            }
        };
        let generation = self.session.begin_window();
        debug!(
            offset = request.offset,
            limit = request.limit,
            generation,
            "window requested"
        );
        let tx = self.events.clone();
        let submitted = engine.submit(
            move |catalog| catalog.fetch_window(&table, request.offset, request.limit),
            move |result| {
                let _ = tx.send(AppEvent::WindowLoaded(
                    generation,
                    request.offset,
                    result.map_err(|e| e.user_message()),
                ));
            },
        );
        if let Err(e) = submitted {
            self.table.window_applied();
            self.error_modal.show(e.user_message());
        }
    }

    fn window_loaded(
        &mut self,
        generation: u64,
        offset: usize,
        result: Outcome<(Vec<String>, Vec<Vec<CellValue>>)>,
    ) {
        match result {
            Ok((columns, rows)) => {
                if self.session.apply_window(generation, offset, columns, rows) {
                    self.table.window_applied();
                    self.debug.window_fetches += 1;
                } else {
                    self.debug.stale_results += 1;
                }
            }
            Err(message) => {
                if self.session.is_current(RequestKind::Window, generation) {
                    self.table.window_applied();
                    self.error_modal.show(message);
                } else {
                    self.debug.stale_results += 1;
                }
            }
        }
    }

    fn run_query(&mut self, sql: String) {
        let engine = match self.engine.get() {
            Ok(engine) => engine,
            Err(e) => {
                self.sql_editor.finish(&Err(e.user_message()));
                return;
            }
        };
        let generation = self.session.begin_query();
        debug!(%sql, generation, "running query");
        let tx = self.events.clone();
        let submitted = engine.submit(
            move |catalog| catalog.execute_sql(&sql),
            move |result| {
                let _ = tx.send(AppEvent::QueryDone(
                    generation,
                    result.map_err(|e| e.user_message()),
                ));
            },
        );
        if let Err(e) = submitted {
            self.sql_editor.finish(&Err(e.user_message()));
        }
    }

    fn query_done(&mut self, generation: u64, result: Outcome<QueryResult>) {
        if !self.session.is_current(RequestKind::Query, generation) {
            self.sql_editor.query.executing = false;
            self.debug.stale_results += 1;
            return;
        }
        self.sql_editor.finish(&result);
        match result {
            Ok(result) => {
                info!(
                    rows = result.dataset.total_rows,
                    elapsed_ms = result.elapsed_ms as u64,
                    "query finished"
                );
                self.session.apply_query(generation, result);
                self.reset_grid();
            }
            Err(message) => debug!(error = %message, "query failed"),
        }
    }

    /// The active dataset changed: back to its first page, fetching a window if needed.
    fn reset_grid(&mut self) {
        self.table.reset();
        let request = match self.session.active_dataset() {
            Some(dataset) => self.table.first_page(dataset),
            None => None,
        };
        self.request_window(request);
    }

    fn export(&mut self, request: ExportRequest) -> Option<AppEvent> {
        self.export_modal.close();
        self.input_mode = InputMode::Normal;
        let dir = self.opts.output_dir.clone();

        match request {
            ExportRequest::Data(config) => {
                let dataset = self.session.active_dataset()?;
                let visible = self.table.visible_columns(dataset);
                if dataset.fully_loaded {
                    let written = export_dataset(Some(&config), dataset, &visible)
                        .and_then(|bytes| write_export(&dir, &config, &bytes.unwrap_or_default()));
                    return Some(AppEvent::Exported(written.map_err(|e| e.user_message())));
                }
                // A window only holds part of the table: fetch every row first.
                let names: Vec<String> = visible
                    .iter()
                    .map(|&idx| dataset.columns[idx].clone())
                    .collect();
                let table = dataset.table()?.to_string();
                self.submit_export(move |catalog| {
                    let all = catalog.fetch_all(&table)?;
                    let visible: Vec<usize> =
                        names.iter().filter_map(|n| all.column_index(n)).collect();
                    let bytes = export_dataset(Some(&config), &all, &visible)?.unwrap_or_default();
                    write_export(&dir, &config, &bytes)
                })
            }
            ExportRequest::Parquet { base, codec } => {
                let table = self.session.table()?.to_string();
                self.submit_export(move |catalog| {
                    convert_to_parquet(catalog, &table, codec, &dir, &base)
                })
            }
        }
    }

    fn submit_export<F>(&mut self, op: F) -> Option<AppEvent>
    where
        F: FnOnce(&mut Catalog) -> error::Result<PathBuf> + Send + 'static,
    {
        let engine = match self.engine.get() {
            Ok(engine) => engine,
            Err(e) => return Some(AppEvent::Exported(Err(e.user_message()))),
        };
        let tx = self.events.clone();
        self.busy = true;
        self.exporting = true;
        let submitted = engine.submit(op, move |result| {
            let _ = tx.send(AppEvent::Exported(result.map_err(|e| e.user_message())));
        });
        match submitted {
            Ok(()) => None,
            Err(e) => Some(AppEvent::Exported(Err(e.user_message()))),
        }
    }

    fn open_intake(&mut self) {
        self.intake.set_focus(IntakeFocus::Path);
        self.input_mode = InputMode::Intake;
    }

    fn focus_sql(&mut self) {
        if !self.session.is_loaded() {
            return;
        }
        self.show_sql = true;
        self.sql_editor.set_focused(true);
        self.input_mode = InputMode::Sql;
    }

    fn open_export(&mut self) {
        if !self.session.is_loaded() {
            return;
        }
        match self.opts.mode {
            ViewMode::Schema => {
                self.debug.last_action = "export disabled in schema mode".to_string();
                return;
            }
            ViewMode::Convert => self.export_modal.open_parquet(
                self.opts.compression,
                &self.session.output_base_name(),
                &self.theme,
            ),
            ViewMode::Viewer | ViewMode::Sql => {
                self.export_modal
                    .open_data(self.opts.export_format, &self.theme);
                if let Some(name) = &self.opts.table_name {
                    self.export_modal.table_name.set_value(name.clone());
                }
            }
        }
        self.input_mode = InputMode::Export;
    }

    fn intake_action(&mut self, action: IntakeAction) -> Option<AppEvent> {
        match action {
            IntakeAction::Open(path, options) => Some(AppEvent::Open(path, options)),
            IntakeAction::Cancel if self.session.is_loaded() => {
                self.input_mode = InputMode::Normal;
                None
            }
            IntakeAction::Cancel => Some(AppEvent::Exit),
            IntakeAction::None => None,
        }
    }

    fn paste(&mut self, text: &str) -> Option<AppEvent> {
        match self.input_mode {
            InputMode::Intake => {
                let action = self.intake.paste(text, self.cache.as_ref());
                self.intake_action(action)
            }
            InputMode::Sql => {
                self.sql_editor.input.insert_str(text);
                None
            }
            InputMode::Normal if !self.busy => {
                self.open_intake();
                let action = self.intake.paste(text, self.cache.as_ref());
                self.intake_action(action)
            }
            _ => None,
        }
    }

    fn help_text(&self) -> &'static str {
        match self.input_mode {
            InputMode::Intake => help_strings::intake(),
            InputMode::Sql => help_strings::query(),
            InputMode::Export => help_strings::export(),
            InputMode::Normal | InputMode::Columns => help_strings::main_view(),
        }
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        self.debug.on_key(event);

        if event.modifiers.contains(KeyModifiers::CONTROL) && event.code == KeyCode::Char('c') {
            return Some(AppEvent::Exit);
        }
        if self.error_modal.active {
            if matches!(event.code, KeyCode::Enter | KeyCode::Esc) {
                self.error_modal.hide();
            }
            return None;
        }
        if self.success_modal.active {
            if matches!(event.code, KeyCode::Enter | KeyCode::Esc) {
                self.success_modal.hide();
            }
            return None;
        }
        if self.show_help {
            match event.code {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::F(1) => {
                    self.show_help = false;
                    self.help_scroll = 0;
                }
                KeyCode::Down | KeyCode::Char('j') => self.help_scroll += 1,
                KeyCode::Up | KeyCode::Char('k') => {
                    self.help_scroll = self.help_scroll.saturating_sub(1)
                }
                KeyCode::PageDown => self.help_scroll += 10,
                KeyCode::PageUp => self.help_scroll = self.help_scroll.saturating_sub(10),
                _ => {}
            }
            return None;
        }
        if event.code == KeyCode::F(1) {
            self.show_help = true;
            return None;
        }

        match self.input_mode {
            InputMode::Intake => {
                let action = self.intake.handle_key(event, self.cache.as_ref());
                self.intake_action(action)
            }
            InputMode::Sql => {
                match self.sql_editor.handle_key(event, self.cache.as_ref()) {
                    SqlEditorAction::Execute(sql) => self.run_query(sql),
                    SqlEditorAction::Close => {
                        self.sql_editor.set_focused(false);
                        self.input_mode = InputMode::Normal;
                    }
                    SqlEditorAction::None => {}
                }
                None
            }
            InputMode::Columns => {
                let still_open = match self.session.active_dataset() {
                    Some(dataset) => self.columns.handle_key(event, dataset, &mut self.table),
                    None => false,
                };
                if !still_open {
                    self.columns.close();
                    self.input_mode = InputMode::Normal;
                }
                None
            }
            InputMode::Export => match self.export_modal.handle_key(event) {
                ExportModalAction::Submit(request) => self.export(request),
                ExportModalAction::Cancel => {
                    self.export_modal.close();
                    self.input_mode = InputMode::Normal;
                    None
                }
                ExportModalAction::None => None,
            },
            InputMode::Normal => self.normal_key(event),
        }
    }

    fn normal_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        match event.code {
            KeyCode::Char('q') => return Some(AppEvent::Exit),
            KeyCode::Char('?') => {
                self.show_help = true;
                return None;
            }
            KeyCode::Char('O') => {
                self.open_intake();
                return None;
            }
            _ => {}
        }
        if !self.session.is_loaded() || self.grid_key(event) {
            return None;
        }

        match event.code {
            KeyCode::Char('s') => self.show_schema = !self.show_schema,
            KeyCode::Char('J') if self.show_schema => {
                if self.schema_scroll + 1 < self.session.schema().len() {
                    self.schema_scroll += 1;
                }
            }
            KeyCode::Char('K') if self.show_schema => {
                self.schema_scroll = self.schema_scroll.saturating_sub(1)
            }
            KeyCode::Char('/') => self.focus_sql(),
            KeyCode::Esc if self.show_sql => {
                self.show_sql = false;
                self.sql_editor.set_focused(false);
            }
            KeyCode::Char('x') => {
                if self.session.clear_query() {
                    self.sql_editor.query.clear();
                    self.reset_grid();
                }
            }
            KeyCode::Char('c') => {
                self.columns.open();
                self.input_mode = InputMode::Columns;
            }
            KeyCode::Char('e') => self.open_export(),
            _ => {}
        }
        None
    }

    /// Row, page and column keys. Returns false when the key is not a grid key.
    fn grid_key(&mut self, event: &KeyEvent) -> bool {
        let Some(dataset) = self.session.active_dataset() else {
            return false;
        };
        let table = &mut self.table;
        let request = match event.code {
            KeyCode::Down | KeyCode::Char('j') => {
                table.select_next(dataset);
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                table.select_previous();
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                table.focus_next_column(dataset);
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                table.focus_prev_column();
                None
            }
            KeyCode::PageDown | KeyCode::Char(']') => table.next_page(dataset),
            KeyCode::PageUp | KeyCode::Char('[') => table.prev_page(dataset),
            KeyCode::Home | KeyCode::Char('g') => table.first_page(dataset),
            KeyCode::End | KeyCode::Char('G') => table.last_page(dataset),
            KeyCode::Char('z') => table.cycle_page_size(dataset),
            KeyCode::Char('o') => {
                if !table.cycle_sort(dataset) {
                    self.debug.last_action = "sort unavailable for windowed data".to_string();
                }
                None
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                table.resize_focused(1, dataset);
                None
            }
            KeyCode::Char('-') => {
                table.resize_focused(-1, dataset);
                None
            }
            _ => return false,
        };
        self.request_window(request);
        true
    }

    fn control_hints(&self) -> Vec<(&'static str, &'static str)> {
        match self.input_mode {
            InputMode::Intake => vec![("Enter", "Open"), ("Tab", "Next field"), ("Esc", "Cancel")],
            InputMode::Sql => vec![
                ("Ctrl+Enter", "Run"),
                ("Ctrl+R", "Reset"),
                ("Ctrl+P/N", "History"),
                ("Esc", "Leave"),
            ],
            InputMode::Columns => vec![("Space", "Toggle"), ("a", "Show all"), ("Esc", "Close")],
            InputMode::Export => vec![("Tab", "Next"), ("Enter", "Export"), ("Esc", "Cancel")],
            InputMode::Normal => {
                let mut hints = vec![("[ ]", "Page"), ("o", "Sort"), ("/", "SQL"), ("s", "Schema")];
                if self.session.showing_query_result() {
                    hints.push(("x", "Clear result"));
                }
                if self.opts.mode != ViewMode::Schema {
                    hints.push(("e", "Export"));
                }
                hints.extend([("c", "Columns"), ("O", "Open"), ("?", "Help"), ("q", "Quit")]);
                hints
            }
        }
    }

    fn render_view(&mut self, area: Rect, buf: &mut Buffer, ctx: &RenderContext) {
        let view = view_layout(area, self.show_schema, self.show_sql);
        if let Some(sql_area) = view.sql {
            self.sql_editor.render(sql_area, buf, ctx);
        }
        if let Some(schema_area) = view.schema {
            (&SchemaView::new(self.session.schema(), ctx).with_scroll(self.schema_scroll))
                .render(schema_area, buf);
        }

        let Some(dataset) = self.session.active_dataset() else {
            return;
        };
        let title = if self.session.showing_query_result() {
            "Query result".to_string()
        } else {
            self.session
                .source_path
                .as_deref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let focused = self.input_mode == InputMode::Normal;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(if focused {
                ctx.modal_border_active
            } else {
                ctx.modal_border
            }))
            .title(title);
        let inner = block.inner(view.grid);
        block.render(view.grid, buf);

        let classes = column_classes(dataset, self.session.schema());
        DataTable::new(dataset, &classes, ctx).render(inner, buf, &mut self.table);
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        let ctx = RenderContext::from_theme_and_config(
            &self.theme,
            self.config.display.table_cell_padding,
            self.config.display.min_column_width,
            self.config.display.column_colors,
        );

        Clear.render(area, buf);
        Block::default()
            .style(Style::default().bg(ctx.background))
            .render(area, buf);

        let layout = app_layout(area, self.debug.enabled);
        let main_area = layout.main_view;
        let phase = self.session.phase();

        if self.input_mode == InputMode::Intake || (!self.session.is_loaded() && phase.is_none()) {
            self.intake
                .render(centered_rect_fixed(main_area, 90, 26), buf, &ctx);
        } else if self.session.is_loaded() {
            self.render_view(main_area, buf, &ctx);
        }

        if let Some(phase) = phase {
            render_loading_gauge(main_area, buf, "Loading", phase.label(), phase.percent(), &ctx);
        }
        if self.exporting {
            render_loading_gauge(main_area, buf, "Exporting", "Writing file", 50, &ctx);
        }
        if self.input_mode == InputMode::Columns {
            if let Some(dataset) = self.session.active_dataset() {
                self.columns
                    .render(main_area, buf, dataset, &self.table, &ctx);
            }
        }
        if self.export_modal.active {
            render_export_modal(main_area, buf, &self.export_modal, &ctx);
        }
        if self.success_modal.active {
            render_success_modal(main_area, buf, &self.success_modal, &ctx);
        }
        if self.error_modal.active {
            render_error_modal(main_area, buf, &self.error_modal, &ctx);
        }
        if self.show_help {
            let text = self.help_text();
            render_help_overlay(main_area, buf, "Help", text, &mut self.help_scroll, &ctx);
        }

        if self.busy {
            self.throbber_frame = self.throbber_frame.wrapping_add(1);
        }
        let controls = Controls::from_context(&ctx)
            .with_controls(self.control_hints())
            .with_row_count(self.session.active_dataset().map(|d| d.total_rows))
            .with_busy(self.busy, self.throbber_frame)
            .with_dimmed(self.input_mode != InputMode::Normal);
        (&controls).render(layout.control_bar, buf);
        if let Some(debug_area) = layout.debug {
            (&self.debug).render(debug_area, buf);
        }
    }
}

/// Run the interface. `path`, when given, is opened immediately; otherwise the intake prompt
/// is shown.
pub fn run(path: Option<PathBuf>, opts: OpenOptions, config: AppConfig) -> Result<()> {
    use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste, Event};
    use std::sync::{mpsc, Mutex, Once};
    use std::time::Duration;

    let theme = Theme::from_config(&config.theme)
        .or_else(|e| Theme::from_config(&AppConfig::default().theme).map_err(|_| e))?;

    // Install color_eyre at most once per process.
    static COLOR_EYRE_INIT: Once = Once::new();
    static INSTALL_RESULT: Mutex<Option<Result<(), color_eyre::Report>>> = Mutex::new(None);
    COLOR_EYRE_INIT.call_once(|| {
        *INSTALL_RESULT.lock().unwrap_or_else(|e| e.into_inner()) = Some(color_eyre::install());
    });
    if let Some(Err(e)) = INSTALL_RESULT
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .as_ref()
    {
        return Err(eyre!(e.to_string()));
    }

    if let Some(path) = &path {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )
            .into());
        }
        validate_path(path, opts.mode).map_err(|msg| eyre!(msg))?;
    }

    let mut terminal = ratatui::try_init().map_err(|e| {
        eyre!(
            "pqview requires an interactive terminal (TTY). No terminal detected: {}. \
             Run from a terminal or ensure stdout is connected to a TTY.",
            e
        )
    })?;
    crossterm::execute!(std::io::stdout(), EnableBracketedPaste)?;

    let (tx, rx) = mpsc::channel::<AppEvent>();
    let mut app = App::new(tx.clone(), theme, config.clone(), opts.clone());
    if opts.debug {
        app.enable_debug();
    }

    terminal.draw(|frame| frame.render_widget(&mut app, frame.area()))?;

    if let Some(path) = path {
        tx.send(AppEvent::Open(path, opts.csv.clone()))?;
    }

    let poll_interval = Duration::from_millis(config.performance.event_poll_interval_ms);
    let outcome = loop {
        if crossterm::event::poll(poll_interval)? {
            match crossterm::event::read()? {
                Event::Key(key) => {
                    if key.is_press() {
                        tx.send(AppEvent::Key(key))?
                    }
                }
                Event::Paste(text) => tx.send(AppEvent::Paste(text))?,
                Event::Resize(cols, rows) => tx.send(AppEvent::Resize(cols, rows))?,
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break Ok(()),
                    AppEvent::Crash(msg) => break Err(eyre!(msg)),
                    event => {
                        if let Some(next) = app.event(event) {
                            tx.send(next)?;
                        }
                    }
                }
                true
            }
            Err(mpsc::RecvTimeoutError::Timeout) => app.busy,
            Err(mpsc::RecvTimeoutError::Disconnected) => break Ok(()),
        };

        if updated {
            terminal.draw(|frame| frame.render_widget(&mut app, frame.area()))?;
        }
    };

    let _ = crossterm::execute!(std::io::stdout(), DisableBracketedPaste);
    ratatui::restore();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::sync::mpsc;

    fn options(argv: &[&str]) -> Result<OpenOptions> {
        let args = Args::parse_from(argv);
        OpenOptions::from_args_and_config(&args, &AppConfig::default())
    }

    fn app(mode: ViewMode) -> (App, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        let mut opts = options(&["pqview"]).unwrap();
        opts.mode = mode;
        let app = App::new(tx, Theme::default(), AppConfig::default(), opts).with_cache(None);
        (app, rx)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_options_defaults() {
        let opts = options(&["pqview"]).unwrap();
        assert_eq!(opts.mode, ViewMode::Viewer);
        assert_eq!(opts.csv.delimiter, Delimiter::Auto);
        assert!(opts.csv.has_header);
        assert_eq!(opts.page_size, 10);
        assert_eq!(opts.output_dir, PathBuf::from("."));
        assert_eq!(opts.row_limit, 10_000);
        assert_eq!(opts.streaming, None);
        assert_eq!(opts.csv.infer_schema_length, 1000);
    }

    #[test]
    fn test_args_override_config() {
        let opts = options(&[
            "pqview",
            "--delimiter",
            ";",
            "--no-header",
            "--null-value",
            "NA",
            "--null-value",
            "-",
            "--page-size",
            "50",
            "--export-format",
            "postgres",
            "--compression",
            "zstd",
            "--output-dir",
            "out",
            "--streaming",
            "true",
            "--infer-schema-length",
            "250",
        ])
        .unwrap();
        assert_eq!(opts.csv.infer_schema_length, 250);
        assert_eq!(opts.csv.delimiter, Delimiter::Semicolon);
        assert!(!opts.csv.has_header);
        assert_eq!(opts.csv.null_values, vec!["NA".to_string(), "-".to_string()]);
        assert_eq!(opts.page_size, 50);
        assert_eq!(opts.export_format, ExportFormat::Postgres);
        assert_eq!(opts.compression, ParquetCodec::Zstd);
        assert_eq!(opts.output_dir, PathBuf::from("out"));
        assert_eq!(opts.streaming, Some(true));
    }

    #[test]
    fn test_invalid_delimiter_rejected() {
        assert!(options(&["pqview", "--delimiter", "ab"]).is_err());
    }

    #[test]
    fn test_starts_in_intake() {
        let (app, _rx) = app(ViewMode::Viewer);
        assert_eq!(app.input_mode, InputMode::Intake);
        assert!(!app.session.is_loaded());
    }

    #[test]
    fn test_open_marks_busy_and_defers_load() {
        let (mut app, _rx) = app(ViewMode::Viewer);
        let next = app.event(AppEvent::Open(PathBuf::from("a.csv"), CsvOptions::default()));
        assert!(matches!(next, Some(AppEvent::DoLoad(_, _, 1))));
        assert!(app.busy);
        assert_eq!(app.session.phase(), Some(LoadPhase::InitialisingEngine));
        // keys other than quit are ignored while loading
        assert!(app.event(key(KeyCode::Char('s'))).is_none());
        assert!(matches!(app.event(key(KeyCode::Char('q'))), Some(AppEvent::Exit)));
    }

    #[test]
    fn test_failed_load_returns_to_intake() {
        let (mut app, _rx) = app(ViewMode::Viewer);
        app.event(AppEvent::Open(PathBuf::from("a.csv"), CsvOptions::default()));
        app.event(AppEvent::Loaded(1, Err("Empty JSON".to_string())));
        assert!(!app.busy);
        assert!(app.error_modal.active);
        assert_eq!(app.error_modal.message, "Empty JSON");
        assert_eq!(app.input_mode, InputMode::Intake);

        app.event(key(KeyCode::Enter));
        assert!(!app.error_modal.active);
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let (mut app, _rx) = app(ViewMode::Viewer);
        app.event(AppEvent::Open(PathBuf::from("a.csv"), CsvOptions::default()));
        app.event(AppEvent::Open(PathBuf::from("b.csv"), CsvOptions::default()));
        app.event(AppEvent::Loaded(1, Err("late".to_string())));
        assert!(!app.error_modal.active);
        assert_eq!(app.debug.stale_results, 1);
        assert!(app.busy);
    }

    #[test]
    fn test_paste_with_missing_file_stays_in_intake() {
        let (mut app, _rx) = app(ViewMode::Viewer);
        app.input_mode = InputMode::Normal;
        let next = app.event(AppEvent::Paste("'/no/such/file.csv'".to_string()));
        assert!(next.is_none());
        assert_eq!(app.input_mode, InputMode::Intake);
        assert_eq!(
            app.intake.message.as_deref(),
            Some("File not found: /no/such/file.csv")
        );
    }

    #[test]
    fn test_intake_cancel_without_file_exits() {
        let (mut app, _rx) = app(ViewMode::Viewer);
        assert!(matches!(app.event(key(KeyCode::Esc)), Some(AppEvent::Exit)));
    }

    #[test]
    fn test_help_toggle() {
        let (mut app, _rx) = app(ViewMode::Viewer);
        app.input_mode = InputMode::Normal;
        app.event(key(KeyCode::Char('?')));
        assert!(app.show_help);
        app.event(key(KeyCode::Esc));
        assert!(!app.show_help);
    }

    #[test]
    fn test_render_intake_and_controls() {
        let (mut app, _rx) = app(ViewMode::Viewer);
        let area = Rect::new(0, 0, 100, 30);
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Open a file"));
        assert!(text.contains("Tab"));
        assert_eq!(app.debug.num_frames, 1);
    }
}
