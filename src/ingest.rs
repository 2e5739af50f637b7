//! Format ingestion adapters.
//!
//! Delimited text is scanned lazily with the user's dialect options. JSON and spreadsheets are
//! flattened into synthetic delimited text and read through the same CSV reader. Parquet is
//! scanned directly. Everything here runs on the engine worker.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use polars::io::csv::read::NullValues;
use polars::prelude::*;
use pqview_cli::SourceFormat;
use serde_json::Value;
use tracing::{debug, info};

use crate::engine::Catalog;
use crate::error::{Result, ViewerError};
use crate::export::{escape_csv_field, sanitize_table_name};
use crate::value::{Dataset, SchemaColumn};

/// Null markers applied to delimited text unless the user edits them.
pub const DEFAULT_NULL_STRINGS: [&str; 7] = ["", "NULL", "null", "N/A", "NA", "n/a", "-"];

/// Rows scanned when inferring column types from delimited files.
pub const DEFAULT_INFER_SCHEMA_ROWS: usize = 1000;

const SNIFF_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

static TABLE_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Field separator for delimited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Auto,
    Comma,
    Semicolon,
    Tab,
    Pipe,
    Custom(u8),
}

impl Delimiter {
    pub const CHOICES: [Delimiter; 5] = [
        Delimiter::Auto,
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Tab,
        Delimiter::Pipe,
    ];

    /// Parse a user-supplied delimiter: `auto`, a name (`comma`, `tab`, ...), `\t`, or a single
    /// ASCII character.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => return Some(Self::Auto),
            "comma" => return Some(Self::Comma),
            "semicolon" => return Some(Self::Semicolon),
            "tab" | "\\t" => return Some(Self::Tab),
            "pipe" => return Some(Self::Pipe),
            _ => {}
        }
        match s.as_bytes() {
            [b] if b.is_ascii() && *b != b'\n' && *b != b'"' => Some(Self::from_byte(*b)),
            _ => None,
        }
    }

    pub fn from_byte(b: u8) -> Self {
        match b {
            b',' => Self::Comma,
            b';' => Self::Semicolon,
            b'\t' => Self::Tab,
            b'|' => Self::Pipe,
            other => Self::Custom(other),
        }
    }

    /// The separator byte, or `None` for auto-detection.
    pub fn as_byte(self) -> Option<u8> {
        match self {
            Self::Auto => None,
            Self::Comma => Some(b','),
            Self::Semicolon => Some(b';'),
            Self::Tab => Some(b'\t'),
            Self::Pipe => Some(b'|'),
            Self::Custom(b) => Some(b),
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::Auto => "Auto-detect".to_string(),
            Self::Comma => "Comma (,)".to_string(),
            Self::Semicolon => "Semicolon (;)".to_string(),
            Self::Tab => "Tab (\\t)".to_string(),
            Self::Pipe => "Pipe (|)".to_string(),
            Self::Custom(b) => format!("Custom ({})", b as char),
        }
    }
}

/// Pick the most frequent candidate separator in `line`, defaulting to a comma.
pub fn sniff_delimiter(line: &str) -> u8 {
    let mut best = b',';
    let mut best_count = 0;
    for candidate in SNIFF_CANDIDATES {
        let count = line.bytes().filter(|b| *b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Dialect options for delimited text. Frozen once ingestion starts.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    pub delimiter: Delimiter,
    pub has_header: bool,
    pub null_values: Vec<String>,
    pub all_varchar: bool,
    /// Rows sampled for type inference.
    pub infer_schema_length: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Auto,
            has_header: true,
            null_values: DEFAULT_NULL_STRINGS.iter().map(|s| s.to_string()).collect(),
            all_varchar: false,
            infer_schema_length: DEFAULT_INFER_SCHEMA_ROWS,
        }
    }
}

impl CsvOptions {
    /// Resolve the separator for `path`, reading its first line when set to auto.
    pub fn resolve_delimiter(&self, path: &Path) -> Result<u8> {
        if let Some(b) = self.delimiter.as_byte() {
            return Ok(b);
        }
        let mut reader = BufReader::new(File::open(path)?);
        let mut first_line = String::new();
        reader.read_line(&mut first_line)?;
        let sep = sniff_delimiter(&first_line);
        debug!(separator = %(sep as char).escape_default(), "sniffed delimiter");
        Ok(sep)
    }

    fn polars_null_values(&self) -> Option<NullValues> {
        if self.null_values.is_empty() {
            return None;
        }
        Some(NullValues::AllColumns(
            self.null_values
                .iter()
                .map(|s| PlSmallStr::from(s.as_str()))
                .collect(),
        ))
    }
}

/// Steps of a file load, in order, as shown on the loading gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    InitialisingEngine,
    RegisteringTable,
    ProbingSchema,
    CountingRows,
    LoadingRows,
}

impl LoadPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::InitialisingEngine => "Initialising engine",
            Self::RegisteringTable => "Registering table",
            Self::ProbingSchema => "Probing schema",
            Self::CountingRows => "Counting rows",
            Self::LoadingRows => "Loading rows",
        }
    }

    /// Gauge position for the start of this phase.
    pub fn percent(self) -> u16 {
        match self {
            Self::InitialisingEngine => 5,
            Self::RegisteringTable => 20,
            Self::ProbingSchema => 45,
            Self::CountingRows => 60,
            Self::LoadingRows => 80,
        }
    }
}

/// Row thresholds for the initial window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadLimits {
    /// Load every row when the table has at most this many.
    pub full_load_threshold: usize,
    /// Otherwise load this many rows from offset 0.
    pub window_size: usize,
}

impl Default for LoadLimits {
    fn default() -> Self {
        Self {
            full_load_threshold: 10_000,
            window_size: 1_000,
        }
    }
}

impl LoadLimits {
    pub fn initial_window(&self, total_rows: usize) -> usize {
        if total_rows <= self.full_load_threshold {
            total_rows
        } else {
            self.window_size
        }
    }
}

/// An ingested file: the engine table plus its schema and initial window.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub table: String,
    pub format: SourceFormat,
    pub schema: Vec<SchemaColumn>,
    pub dataset: Dataset,
}

/// `<prefix>_<token>` for synthetic tables, or the sanitised file stem for Parquet.
pub fn table_name_for(format: SourceFormat, path: &Path) -> String {
    match format {
        SourceFormat::Parquet => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            sanitize_identifier(&stem)
        }
        other => {
            let token = TABLE_TOKEN.fetch_add(1, Ordering::Relaxed);
            format!("{}_{}", other.table_prefix(), token)
        }
    }
}

/// Replace anything outside `[A-Za-z0-9_]` with `_`; prefix `t_` when the result starts with
/// a digit or is empty.
pub fn sanitize_identifier(name: &str) -> String {
    let cleaned = sanitize_table_name(name);
    match cleaned.chars().next() {
        None => "t_".to_string(),
        Some(c) if c.is_ascii_digit() => format!("t_{}", cleaned),
        Some(_) => cleaned,
    }
}

fn pl_path(path: &Path) -> PlPath {
    PlPath::Local(Arc::from(path))
}

pub fn scan_parquet(path: &Path) -> Result<LazyFrame> {
    Ok(LazyFrame::scan_parquet(pl_path(path), Default::default())?)
}

/// Lazy CSV scan with the given dialect.
pub fn scan_csv(path: &Path, options: &CsvOptions) -> Result<LazyFrame> {
    let separator = options.resolve_delimiter(path)?;
    let infer = if options.all_varchar {
        Some(0)
    } else {
        Some(options.infer_schema_length)
    };
    let null_values = options.polars_null_values();
    let lf = LazyCsvReader::new(pl_path(path))
        .with_separator(separator)
        .with_has_header(options.has_header)
        .with_infer_schema_length(infer)
        .map_parse_options(|o| o.with_null_values(null_values.clone()))
        .finish()?;
    Ok(lf)
}

/// Read synthetic CSV text into a frame. Types are inferred from every row.
pub fn read_csv_text(text: String) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()?;
    Ok(df)
}

/// Serialise a header and rows of text fields as comma-separated lines.
pub fn rows_to_csv(columns: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    let header: Vec<String> = columns.iter().map(|c| escape_csv_field(c)).collect();
    out.push_str(&header.join(","));
    for row in rows {
        out.push('\n');
        let fields: Vec<String> = row.iter().map(|f| escape_csv_field(f)).collect();
        out.push_str(&fields.join(","));
    }
    out.push('\n');
    out
}

/// The row sequence of a JSON document.
pub fn json_rows(value: Value) -> Result<Vec<Value>> {
    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(map) => {
            let first_array = map.iter().find_map(|(_, v)| match v {
                Value::Array(rows) => Some(rows.clone()),
                _ => None,
            });
            match first_array {
                Some(rows) => rows,
                None => vec![Value::Object(map)],
            }
        }
        _ => {
            return Err(ViewerError::Format(
                "Invalid JSON format: JSON must be an array or an object".to_string(),
            ))
        }
    };
    if rows.is_empty() {
        return Err(ViewerError::Format("JSON array is empty".to_string()));
    }
    Ok(rows)
}

fn json_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Flatten JSON text into synthetic CSV. Columns come from the first row's keys.
pub fn json_to_csv(text: &str) -> Result<String> {
    let value: Value = serde_json::from_str(text)?;
    let rows = json_rows(value)?;
    let columns: Vec<String> = match &rows[0] {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => vec!["value".to_string()],
    };
    let fields: Vec<Vec<String>> = rows
        .iter()
        .map(|row| match row {
            Value::Object(map) => columns.iter().map(|c| json_field(map.get(c))).collect(),
            scalar => vec![json_field(Some(scalar))],
        })
        .collect();
    Ok(rows_to_csv(&columns, &fields))
}

fn excel_cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        // as_datetime() also reads plain numbers as serial dates, so only date cells go through it
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == chrono::NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

/// Flatten the first worksheet into synthetic CSV. Row one is the header.
pub fn excel_to_csv(path: &Path) -> Result<String> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ViewerError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ViewerError::Format("Excel file has no worksheets".to_string()))?
        .map_err(|e| ViewerError::Spreadsheet(e.to_string()))?;
    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| ViewerError::Format("Excel sheet is empty".to_string()))?;
    let columns: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = excel_cell_text(cell);
            if name.trim().is_empty() {
                format!("column_{}", i + 1)
            } else {
                name
            }
        })
        .collect();
    let data: Vec<Vec<String>> = rows
        .map(|row| {
            (0..columns.len())
                .map(|i| row.get(i).map(excel_cell_text).unwrap_or_default())
                .collect()
        })
        .collect();
    if data.is_empty() {
        return Err(ViewerError::Format("Excel sheet is empty".to_string()));
    }
    Ok(rows_to_csv(&columns, &data))
}

/// Register `path` with the catalog through the adapter for `format`. Returns the table name.
pub fn register_source(
    catalog: &mut Catalog,
    path: &Path,
    format: SourceFormat,
    options: &CsvOptions,
) -> Result<String> {
    let table = table_name_for(format, path);
    let lf = match format {
        SourceFormat::Parquet => scan_parquet(path)?,
        SourceFormat::Csv => scan_csv(path, options)?,
        SourceFormat::Json => {
            let text = std::fs::read_to_string(path)?;
            read_csv_text(json_to_csv(&text)?)?.lazy()
        }
        SourceFormat::Excel => read_csv_text(excel_to_csv(path)?)?.lazy(),
    };
    catalog.register(&table, lf);
    info!(table = %table, path = %path.display(), "registered source");
    Ok(table)
}

/// Full ingestion: register, probe schema, count, load the initial window.
///
/// `progress` is told about each phase before it starts.
pub fn load_table(
    catalog: &mut Catalog,
    path: &Path,
    format: SourceFormat,
    options: &CsvOptions,
    limits: LoadLimits,
    progress: &mut dyn FnMut(LoadPhase),
) -> Result<LoadedTable> {
    progress(LoadPhase::RegisteringTable);
    let table = register_source(catalog, path, format, options)?;

    let loaded = probe_and_window(catalog, &table, limits, progress);
    if loaded.is_err() {
        catalog.drop_table(&table);
    }
    let (schema, dataset) = loaded?;
    Ok(LoadedTable {
        table,
        format,
        schema,
        dataset,
    })
}

fn probe_and_window(
    catalog: &Catalog,
    table: &str,
    limits: LoadLimits,
    progress: &mut dyn FnMut(LoadPhase),
) -> Result<(Vec<SchemaColumn>, Dataset)> {
    let as_ingestion = |e: ViewerError| match e {
        ViewerError::Format(_) | ViewerError::Ingestion(_) => e,
        other => ViewerError::Ingestion(other.user_message()),
    };

    progress(LoadPhase::ProbingSchema);
    let schema = catalog.schema(table).map_err(as_ingestion)?;

    progress(LoadPhase::CountingRows);
    let total = catalog.count(table).map_err(as_ingestion)?;

    progress(LoadPhase::LoadingRows);
    let limit = limits.initial_window(total);
    let (columns, rows) = catalog
        .fetch_window(table, 0, limit)
        .map_err(as_ingestion)?;
    if total > 0 && rows.is_empty() {
        return Err(ViewerError::Ingestion(
            "File is empty or could not be parsed.".to_string(),
        ));
    }
    debug!(table, total, window = rows.len(), "initial window loaded");
    Ok((
        schema,
        Dataset::windowed(columns, rows, table.to_string(), total, 0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_parse() {
        assert_eq!(Delimiter::parse("auto"), Some(Delimiter::Auto));
        assert_eq!(Delimiter::parse("\\t"), Some(Delimiter::Tab));
        assert_eq!(Delimiter::parse(";"), Some(Delimiter::Semicolon));
        assert_eq!(Delimiter::parse("#"), Some(Delimiter::Custom(b'#')));
        assert_eq!(Delimiter::parse("ab"), None);
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter("a|b,c|d"), b'|');
        assert_eq!(sniff_delimiter("single"), b',');
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("My File"), "My_File");
        assert_eq!(sanitize_identifier("2024-sales"), "t_2024_sales");
        assert_eq!(sanitize_identifier(""), "t_");
    }

    #[test]
    fn test_table_names_are_unique() {
        let p = Path::new("x.csv");
        let a = table_name_for(SourceFormat::Csv, p);
        let b = table_name_for(SourceFormat::Csv, p);
        assert!(a.starts_with("csv_"));
        assert_ne!(a, b);
        assert_eq!(
            table_name_for(SourceFormat::Parquet, Path::new("/d/My File.parquet")),
            "My_File"
        );
    }

    #[test]
    fn test_json_to_csv_array() {
        let csv = json_to_csv(r#"[{"id":1,"name":"A"},{"id":2,"name":null}]"#).unwrap();
        assert_eq!(csv, "id,name\n1,A\n2,\n");
    }

    #[test]
    fn test_json_to_csv_object_with_array_member() {
        let csv = json_to_csv(r#"{"meta":"x","items":[{"a":"1, 2"}]}"#).unwrap();
        assert_eq!(csv, "a\n\"1, 2\"\n");
    }

    #[test]
    fn test_json_object_without_array_is_one_row() {
        let csv = json_to_csv(r#"{"a":1,"b":{"c":true}}"#).unwrap();
        assert_eq!(csv, "a,b\n1,\"{\"\"c\"\":true}\"\n");
    }

    #[test]
    fn test_json_errors() {
        let err = json_to_csv("[]").unwrap_err();
        assert_eq!(err.to_string(), "JSON array is empty");
        let err = json_to_csv("42").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid JSON format: JSON must be an array or an object"
        );
        assert!(matches!(json_to_csv("{oops"), Err(ViewerError::Json(_))));
    }

    #[test]
    fn test_initial_window_threshold() {
        let limits = LoadLimits::default();
        assert_eq!(limits.initial_window(10_000), 10_000);
        assert_eq!(limits.initial_window(10_001), 1_000);
        assert_eq!(limits.initial_window(0), 0);
    }

    #[test]
    fn test_read_csv_text_infers_types() {
        let df = read_csv_text("id,name\n1,A\n2,B\n".to_string()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
    }
}
