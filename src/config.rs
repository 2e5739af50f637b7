use color_eyre::eyre::eyre;
use color_eyre::Result;
use pqview_cli::{ExportFormat, ParquetCodec};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use supports_color::Stream;

use crate::ingest::Delimiter;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Default configuration template (every option commented out)
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write the default template to config.toml. Refuses to overwrite unless `force`.
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }

    /// Read and parse config.toml from this manager's directory. Missing file gives defaults.
    pub fn load_file(&self) -> Result<AppConfig> {
        let config_path = self.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub display: DisplayConfig,
    pub performance: PerformanceConfig,
    pub engine: EngineConfig,
    pub query: QueryConfig,
    pub export: ExportSettings,
    pub convert: ConvertConfig,
    pub theme: ThemeConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoadingConfig {
    /// "auto", a name ("comma", "tab", ...) or a single character
    pub delimiter: Option<String>,
    pub has_header: bool,
    pub null_values: Vec<String>,
    pub all_varchar: bool,
    /// Rows sampled when inferring column types (default 1000)
    pub infer_schema_length: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
    pub column_colors: bool,
    pub min_column_width: u16,
    pub table_cell_padding: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub full_load_threshold: usize,
    pub window_size: usize,
    pub event_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// "auto", "true" or "false"
    pub streaming: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub row_limit: usize,
    pub history_limit: usize,
    pub enable_history: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub default_format: String,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub compression: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub primary: String,
    pub secondary: String,
    pub success: String,
    pub error: String,
    pub warning: String,
    pub dimmed: String,
    pub background: String,
    pub surface: String,
    pub controls_bg: String,
    pub text_primary: String,
    pub text_secondary: String,
    pub text_inverse: String,
    pub table_header: String,
    pub table_header_bg: String,
    pub table_selected: String,
    pub alternate_row_color: String,
    pub column_separator: String,
    pub modal_border: String,
    pub modal_border_active: String,
    pub modal_border_error: String,
    pub keybind_hints: String,
    pub keybind_labels: String,
    pub throbber: String,
    pub progress: String,
    pub int_col: String,
    pub float_col: String,
    pub str_col: String,
    pub bool_col: String,
    pub temporal_col: String,
    pub binary_col: String,
    pub list_col: String,
    pub struct_col: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            display: DisplayConfig::default(),
            performance: PerformanceConfig::default(),
            engine: EngineConfig::default(),
            query: QueryConfig::default(),
            export: ExportSettings::default(),
            convert: ConvertConfig::default(),
            theme: ThemeConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for FileLoadingConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            null_values: crate::ingest::DEFAULT_NULL_STRINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            all_varchar: false,
            infer_schema_length: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            page_size_options: vec![10, 20, 50, 100],
            column_colors: true,
            min_column_width: 3,
            table_cell_padding: 2,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            full_load_threshold: 10_000,
            window_size: 1_000,
            event_poll_interval_ms: 25,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            streaming: "auto".to_string(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            row_limit: crate::query::DEFAULT_ROW_LIMIT,
            history_limit: 1000,
            enable_history: true,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            default_format: "json".to_string(),
            output_dir: None,
        }
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            compression: "snappy".to_string(),
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            primary: "cyan".to_string(),
            secondary: "yellow".to_string(),
            success: "green".to_string(),
            error: "red".to_string(),
            warning: "yellow".to_string(),
            dimmed: "dark_gray".to_string(),
            background: "default".to_string(),
            surface: "default".to_string(),
            controls_bg: "indexed(236)".to_string(),
            text_primary: "white".to_string(),
            text_secondary: "dark_gray".to_string(),
            text_inverse: "black".to_string(),
            table_header: "white".to_string(),
            table_header_bg: "indexed(236)".to_string(),
            table_selected: "reversed".to_string(),
            alternate_row_color: "indexed(234)".to_string(),
            column_separator: "cyan".to_string(),
            modal_border: "cyan".to_string(),
            modal_border_active: "yellow".to_string(),
            modal_border_error: "red".to_string(),
            keybind_hints: "cyan".to_string(),
            keybind_labels: "indexed(252)".to_string(),
            throbber: "cyan".to_string(),
            progress: "cyan".to_string(),
            int_col: "blue".to_string(),
            float_col: "cyan".to_string(),
            str_col: "green".to_string(),
            bool_col: "yellow".to_string(),
            temporal_col: "magenta".to_string(),
            binary_col: "dark_gray".to_string(),
            list_col: "bright_yellow".to_string(),
            struct_col: "bright_magenta".to_string(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Defaults merged with the config file managed by `manager`, then validated.
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(manager.load_file()?);
        config.validate().map_err(|e| {
            eyre!(
                "Invalid configuration in {}: {}",
                manager.config_path("config.toml").display(),
                e
            )
        })?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.display.merge(other.display);
        self.performance.merge(other.performance);
        self.engine.merge(other.engine);
        self.query.merge(other.query);
        self.export.merge(other.export);
        self.convert.merge(other.convert);
        self.theme.merge(other.theme);
        self.debug.merge(other.debug);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if let Some(d) = &self.file_loading.delimiter {
            if Delimiter::parse(d).is_none() {
                return Err(eyre!(
                    "Invalid delimiter: '{}'. Use auto, comma, semicolon, tab, pipe or a single character",
                    d
                ));
            }
        }

        if self.file_loading.infer_schema_length == Some(0) {
            return Err(eyre!("infer_schema_length must be greater than 0"));
        }

        if self.display.page_size == 0 {
            return Err(eyre!("page_size must be greater than 0"));
        }
        if self.display.page_size_options.iter().any(|n| *n == 0) {
            return Err(eyre!("page_size_options must all be greater than 0"));
        }

        if self.performance.window_size == 0 {
            return Err(eyre!("window_size must be greater than 0"));
        }
        if self.performance.event_poll_interval_ms == 0 {
            return Err(eyre!("event_poll_interval_ms must be greater than 0"));
        }

        self.engine.streaming_override()?;

        if self.query.row_limit == 0 {
            return Err(eyre!("row_limit must be greater than 0"));
        }

        if ExportFormat::from_name(&self.export.default_format).is_none() {
            return Err(eyre!(
                "Invalid default_format: {}. Must be one of json, csv, tsv, excel, mysql, postgres",
                self.export.default_format
            ));
        }

        if ParquetCodec::from_name(&self.convert.compression).is_none() {
            return Err(eyre!(
                "Invalid compression: {}. Must be snappy, zstd, gzip or uncompressed",
                self.convert.compression
            ));
        }

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        let default = FileLoadingConfig::default();
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header != default.has_header {
            self.has_header = other.has_header;
        }
        if other.null_values != default.null_values {
            self.null_values = other.null_values;
        }
        if other.all_varchar != default.all_varchar {
            self.all_varchar = other.all_varchar;
        }
        if other.infer_schema_length.is_some() {
            self.infer_schema_length = other.infer_schema_length;
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.page_size != default.page_size {
            self.page_size = other.page_size;
        }
        if other.page_size_options != default.page_size_options {
            self.page_size_options = other.page_size_options;
        }
        if other.column_colors != default.column_colors {
            self.column_colors = other.column_colors;
        }
        if other.min_column_width != default.min_column_width {
            self.min_column_width = other.min_column_width;
        }
        if other.table_cell_padding != default.table_cell_padding {
            self.table_cell_padding = other.table_cell_padding;
        }
    }
}

impl PerformanceConfig {
    pub fn merge(&mut self, other: Self) {
        let default = PerformanceConfig::default();
        if other.full_load_threshold != default.full_load_threshold {
            self.full_load_threshold = other.full_load_threshold;
        }
        if other.window_size != default.window_size {
            self.window_size = other.window_size;
        }
        if other.event_poll_interval_ms != default.event_poll_interval_ms {
            self.event_poll_interval_ms = other.event_poll_interval_ms;
        }
    }
}

impl EngineConfig {
    pub fn merge(&mut self, other: Self) {
        if other.streaming != EngineConfig::default().streaming {
            self.streaming = other.streaming;
        }
    }

    /// `None` for auto, otherwise the forced streaming choice.
    pub fn streaming_override(&self) -> Result<Option<bool>> {
        match self.streaming.to_lowercase().as_str() {
            "auto" => Ok(None),
            "true" | "on" | "yes" => Ok(Some(true)),
            "false" | "off" | "no" => Ok(Some(false)),
            other => Err(eyre!(
                "Invalid streaming setting: {}. Must be 'auto', 'true' or 'false'",
                other
            )),
        }
    }
}

impl QueryConfig {
    pub fn merge(&mut self, other: Self) {
        let default = QueryConfig::default();
        if other.row_limit != default.row_limit {
            self.row_limit = other.row_limit;
        }
        if other.history_limit != default.history_limit {
            self.history_limit = other.history_limit;
        }
        if other.enable_history != default.enable_history {
            self.enable_history = other.enable_history;
        }
    }
}

impl ExportSettings {
    pub fn merge(&mut self, other: Self) {
        if other.default_format != ExportSettings::default().default_format {
            self.default_format = other.default_format;
        }
        if other.output_dir.is_some() {
            self.output_dir = other.output_dir;
        }
    }

    pub fn format(&self) -> ExportFormat {
        ExportFormat::from_name(&self.default_format).unwrap_or_default()
    }
}

impl ConvertConfig {
    pub fn merge(&mut self, other: Self) {
        if other.compression != ConvertConfig::default().compression {
            self.compression = other.compression;
        }
    }

    pub fn codec(&self) -> ParquetCodec {
        ParquetCodec::from_name(&self.compression).unwrap_or_default()
    }
}

impl ThemeConfig {
    pub fn merge(&mut self, other: Self) {
        self.colors.merge(other.colors);
    }
}

impl ColorConfig {
    /// Every (name, value) pair, in declaration order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("primary", self.primary.as_str()),
            ("secondary", self.secondary.as_str()),
            ("success", self.success.as_str()),
            ("error", self.error.as_str()),
            ("warning", self.warning.as_str()),
            ("dimmed", self.dimmed.as_str()),
            ("background", self.background.as_str()),
            ("surface", self.surface.as_str()),
            ("controls_bg", self.controls_bg.as_str()),
            ("text_primary", self.text_primary.as_str()),
            ("text_secondary", self.text_secondary.as_str()),
            ("text_inverse", self.text_inverse.as_str()),
            ("table_header", self.table_header.as_str()),
            ("table_header_bg", self.table_header_bg.as_str()),
            ("table_selected", self.table_selected.as_str()),
            ("alternate_row_color", self.alternate_row_color.as_str()),
            ("column_separator", self.column_separator.as_str()),
            ("modal_border", self.modal_border.as_str()),
            ("modal_border_active", self.modal_border_active.as_str()),
            ("modal_border_error", self.modal_border_error.as_str()),
            ("keybind_hints", self.keybind_hints.as_str()),
            ("keybind_labels", self.keybind_labels.as_str()),
            ("throbber", self.throbber.as_str()),
            ("progress", self.progress.as_str()),
            ("int_col", self.int_col.as_str()),
            ("float_col", self.float_col.as_str()),
            ("str_col", self.str_col.as_str()),
            ("bool_col", self.bool_col.as_str()),
            ("temporal_col", self.temporal_col.as_str()),
            ("binary_col", self.binary_col.as_str()),
            ("list_col", self.list_col.as_str()),
            ("struct_col", self.struct_col.as_str()),
        ]
    }

    /// Validate all color strings can be parsed
    fn validate(&self, parser: &ColorParser) -> Result<()> {
        for (name, value) in self.entries() {
            parser
                .parse(value)
                .map_err(|e| eyre!("Invalid color value for '{}': {}", name, e))?;
        }
        Ok(())
    }

    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();

        macro_rules! merge_color {
            ($($field:ident),* $(,)?) => {
                $(
                    if other.$field != default.$field {
                        self.$field = other.$field;
                    }
                )*
            };
        }

        merge_color!(
            primary,
            secondary,
            success,
            error,
            warning,
            dimmed,
            background,
            surface,
            controls_bg,
            text_primary,
            text_secondary,
            text_inverse,
            table_header,
            table_header_bg,
            table_selected,
            alternate_row_color,
            column_separator,
            modal_border,
            modal_border_active,
            modal_border_error,
            keybind_hints,
            keybind_labels,
            throbber,
            progress,
            int_col,
            float_col,
            str_col,
            bool_col,
            temporal_col,
            binary_col,
            list_col,
            struct_col,
        );
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DebugConfig::default();
        if other.enabled != default.enabled {
            self.enabled = other.enabled;
        }
        if other.log_level != default.log_level {
            self.log_level = other.log_level;
        }
    }
}

/// Color parser with terminal capability detection
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    /// Create a new ColorParser with automatic terminal capability detection
    pub fn new() -> Self {
        let no_color = std::env::var("NO_COLOR").is_ok();
        let support = supports_color::on(Stream::Stdout);

        Self {
            supports_true_color: support.as_ref().map(|s| s.has_16m).unwrap_or(false),
            supports_256: support.as_ref().map(|s| s.has_256).unwrap_or(false),
            no_color,
        }
    }

    /// Parser with fixed capabilities, for tests and headless use.
    pub fn with_capabilities(true_color: bool, palette_256: bool) -> Self {
        Self {
            supports_true_color: true_color,
            supports_256: palette_256,
            no_color: false,
        }
    }

    /// Parse a color string (hex, indexed or named) for the current terminal
    pub fn parse(&self, s: &str) -> Result<Color> {
        if self.no_color {
            return Ok(Color::Reset);
        }

        let trimmed = s.trim();

        if trimmed.starts_with('#') && trimmed.len() == 7 {
            let (r, g, b) = parse_hex(trimmed)?;
            return Ok(self.convert_rgb_to_terminal_color(r, g, b));
        }

        if trimmed.to_lowercase().starts_with("indexed(") && trimmed.ends_with(')') {
            let num_str = &trimmed[8..trimmed.len() - 1];
            let num = num_str.parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            return Ok(Color::Indexed(num));
        }

        let lower = trimmed.to_lowercase();
        match lower.as_str() {
            "black" => Ok(Color::Black),
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "cyan" => Ok(Color::Cyan),
            "white" => Ok(Color::White),

            "bright_black" | "bright black" => Ok(Color::Indexed(8)),
            "bright_red" | "bright red" => Ok(Color::Indexed(9)),
            "bright_green" | "bright green" => Ok(Color::Indexed(10)),
            "bright_yellow" | "bright yellow" => Ok(Color::Indexed(11)),
            "bright_blue" | "bright blue" => Ok(Color::Indexed(12)),
            "bright_magenta" | "bright magenta" => Ok(Color::Indexed(13)),
            "bright_cyan" | "bright cyan" => Ok(Color::Indexed(14)),
            "bright_white" | "bright white" => Ok(Color::Indexed(15)),

            "gray" | "grey" => Ok(Color::Indexed(8)),
            "dark_gray" | "dark gray" | "dark_grey" | "dark grey" => Ok(Color::Indexed(8)),
            "light_gray" | "light gray" | "light_grey" | "light grey" => Ok(Color::Indexed(7)),

            // Reset is rendered as "terminal default"; reversed is applied as a modifier
            "reset" | "default" | "none" | "reversed" => Ok(Color::Reset),

            _ => Err(eyre!(
                "Unknown color name: '{}'. Supported: basic ANSI colors (red, blue, etc.), \
                 bright variants (bright_red, etc.), indexed(n), or hex colors (#ff0000)",
                trimmed
            )),
        }
    }

    fn convert_rgb_to_terminal_color(&self, r: u8, g: u8, b: u8) -> Color {
        if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            rgb_to_basic_ansi(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse hex color string (#ff0000) to RGB components
fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    if !s.starts_with('#') || s.len() != 7 {
        return Err(eyre!(
            "Invalid hex color format: '{}'. Expected format: #rrggbb",
            s
        ));
    }

    let r = u8::from_str_radix(&s[1..3], 16)
        .map_err(|_| eyre!("Invalid red component in hex color: {}", s))?;
    let g = u8::from_str_radix(&s[3..5], 16)
        .map_err(|_| eyre!("Invalid green component in hex color: {}", s))?;
    let b = u8::from_str_radix(&s[5..7], 16)
        .map_err(|_| eyre!("Invalid blue component in hex color: {}", s))?;

    Ok((r, g, b))
}

/// Nearest index in the xterm 256-color palette
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 10 {
        // grayscale ramp 232-255
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        if gray < 8 {
            return 16;
        } else if gray > 247 {
            return 231;
        } else {
            return 232 + ((gray - 8) * 24 / 240) as u8;
        }
    }

    // 6x6x6 color cube 16-231
    let r_idx = (r as u16 * 5 / 255) as u8;
    let g_idx = (g as u16 * 5 / 255) as u8;
    let b_idx = (b as u16 * 5 / 255) as u8;

    16 + 36 * r_idx + 6 * g_idx + b_idx
}

/// Nearest of the 8 basic ANSI colors
pub fn rgb_to_basic_ansi(r: u8, g: u8, b: u8) -> Color {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 30 {
        let avg = (r as u16 + g as u16 + b as u16) / 3;
        return if avg < 64 { Color::Black } else { Color::White };
    }

    match (r > 128, g > 128, b > 128) {
        (false, false, false) => Color::Black,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (true, true, false) => Color::Yellow,
        (false, false, true) => Color::Blue,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => Color::White,
    }
}

/// Theme containing parsed colors ready for use
#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
}

impl Theme {
    /// Create a Theme from a ThemeConfig by parsing all color strings
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        Self::from_config_with_parser(config, &ColorParser::new())
    }

    pub fn from_config_with_parser(config: &ThemeConfig, parser: &ColorParser) -> Result<Self> {
        let mut colors = HashMap::new();
        for (name, value) in config.colors.entries() {
            // "default" alternate rows means no striping at all
            if name == "alternate_row_color" && value.trim().eq_ignore_ascii_case("default") {
                continue;
            }
            colors.insert(name.to_string(), parser.parse(value)?);
        }
        Ok(Self { colors })
    }

    /// Get a color by name, returns Reset if not found
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }

    /// Get a color by name, returns None if not found
    pub fn get_optional(&self, name: &str) -> Option<Color> {
        self.colors.get(name).copied()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_config_with_parser(
            &ThemeConfig::default(),
            &ColorParser::with_capabilities(false, true),
        )
        .unwrap_or_else(|_| Self {
            colors: HashMap::new(),
        })
    }
}

// Default configuration template
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
