//! Serialise the grid's visible columns to JSON, CSV, TSV, Excel or SQL INSERT statements.

use std::fs;
use std::path::{Path, PathBuf};

use pqview_cli::{ExportFormat, ParquetCodec};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde_json::{Map, Value};
use tracing::info;

use crate::engine::Catalog;
use crate::error::{Result, ViewerError};
use crate::value::{CellValue, Dataset};

const EXCEL_SHEET_NAME: &str = "Data";

/// What to write and under which name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// File name without extension.
    pub file_name: String,
    /// Target table for SQL formats; derived from `file_name` when `None`.
    pub table_name: Option<String>,
}

impl ExportConfig {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            file_name: default_file_name(),
            table_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_table_name(mut self, table_name: Option<String>) -> Self {
        self.table_name = table_name.filter(|t| !t.trim().is_empty());
        self
    }

    /// `file_name` with the format's extension.
    pub fn file_name_with_extension(&self) -> String {
        let ext = self.format.extension();
        let suffix = format!(".{}", ext);
        if self.file_name.to_lowercase().ends_with(&suffix) {
            self.file_name.clone()
        } else {
            format!("{}{}", self.file_name, suffix)
        }
    }

    pub fn resolved_table_name(&self) -> String {
        match &self.table_name {
            Some(t) => sanitize_table_name(t),
            None => {
                let stem = Path::new(&self.file_name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| self.file_name.clone());
                sanitize_table_name(&stem)
            }
        }
    }
}

/// `export_<unix millis>`.
pub fn default_file_name() -> String {
    format!("export_{}", chrono::Utc::now().timestamp_millis())
}

/// Replace everything outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_table_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Serialise `visible` columns (indices into `dataset.columns`) across every row.
///
/// Returns `Ok(None)` when there is no export configuration.
pub fn export_dataset(
    config: Option<&ExportConfig>,
    dataset: &Dataset,
    visible: &[usize],
) -> Result<Option<Vec<u8>>> {
    let Some(config) = config else {
        return Ok(None);
    };
    let view = VisibleView::new(dataset, visible);
    let bytes = match config.format {
        ExportFormat::Json => to_json(&view)?.into_bytes(),
        ExportFormat::Csv => to_csv(&view).into_bytes(),
        ExportFormat::Tsv => to_tsv(&view).into_bytes(),
        ExportFormat::Excel => to_excel(&view)?,
        ExportFormat::Mysql | ExportFormat::Postgres => {
            let dialect = SqlDialect::from_format(config.format);
            to_sql_inserts(&view, dialect, &config.resolved_table_name()).into_bytes()
        }
    };
    info!(
        format = config.format.as_str(),
        rows = dataset.rows.len(),
        columns = view.columns.len(),
        bytes = bytes.len(),
        "export serialised"
    );
    Ok(Some(bytes))
}

/// Write exported bytes to `<dir>/<file_name>.<ext>` and return the path.
pub fn write_export(dir: &Path, config: &ExportConfig, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(config.file_name_with_extension());
    fs::write(&path, bytes).map_err(|e| {
        ViewerError::Export(format!(
            "Export failed: {}",
            crate::error::user_message_from_io(&e, Some(&format!("({})", path.display())))
        ))
    })?;
    info!(path = %path.display(), "export written");
    Ok(path)
}

/// Convert `table` to `<output_dir>/<base>.parquet`.
///
/// The engine writes to a unique scratch file first; its bytes are then written to the output
/// directory. Runs on the engine worker.
pub fn convert_to_parquet(
    catalog: &Catalog,
    table: &str,
    codec: ParquetCodec,
    output_dir: &Path,
    base: &str,
) -> Result<PathBuf> {
    let scratch_dir = std::env::temp_dir().join("pqview");
    let bytes = catalog
        .write_parquet(table, codec, &scratch_dir, base)
        .map_err(export_failed)?;
    fs::create_dir_all(output_dir).map_err(|e| export_failed(e.into()))?;
    let path = output_dir.join(format!("{}.parquet", base));
    fs::write(&path, &bytes).map_err(|e| {
        ViewerError::Export(format!(
            "Export failed: {}",
            crate::error::user_message_from_io(&e, Some(&format!("({})", path.display())))
        ))
    })?;
    info!(path = %path.display(), codec = codec.as_str(), "parquet conversion written");
    Ok(path)
}

fn export_failed(err: ViewerError) -> ViewerError {
    match err {
        ViewerError::Export(_) => err,
        other => ViewerError::Export(format!("Export failed: {}", other.user_message())),
    }
}

/// Column names and row cells restricted to the visible columns.
struct VisibleView<'a> {
    columns: Vec<&'a str>,
    indices: Vec<usize>,
    rows: &'a [Vec<CellValue>],
}

impl<'a> VisibleView<'a> {
    fn new(dataset: &'a Dataset, visible: &[usize]) -> Self {
        let indices: Vec<usize> = visible
            .iter()
            .copied()
            .filter(|i| *i < dataset.columns.len())
            .collect();
        Self {
            columns: indices
                .iter()
                .map(|i| dataset.columns[*i].as_str())
                .collect(),
            indices,
            rows: &dataset.rows,
        }
    }

    fn cells<'r>(&'r self, row: &'r [CellValue]) -> impl Iterator<Item = &'r CellValue> + 'r {
        static NULL: CellValue = CellValue::Null;
        self.indices.iter().map(move |i| row.get(*i).unwrap_or(&NULL))
    }
}

fn to_json(view: &VisibleView) -> Result<String> {
    let records: Vec<Value> = view
        .rows
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            for (name, cell) in view.columns.iter().zip(view.cells(row)) {
                obj.insert(name.to_string(), cell.to_json());
            }
            Value::Object(obj)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Quote a CSV field when it contains a comma, quote or line break.
pub fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Replace tabs and line breaks with spaces. TSV fields are never quoted.
pub fn escape_tsv_field(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

fn to_delimited(view: &VisibleView, sep: &str, escape: fn(&str) -> String) -> String {
    let mut lines = Vec::with_capacity(view.rows.len() + 1);
    lines.push(
        view.columns
            .iter()
            .map(|c| escape(c))
            .collect::<Vec<_>>()
            .join(sep),
    );
    for row in view.rows {
        lines.push(
            view.cells(row)
                .map(|cell| escape(&cell.display()))
                .collect::<Vec<_>>()
                .join(sep),
        );
    }
    lines.join("\n")
}

fn to_csv(view: &VisibleView) -> String {
    to_delimited(view, ",", escape_csv_field)
}

fn to_tsv(view: &VisibleView) -> String {
    to_delimited(view, "\t", escape_tsv_field)
}

fn to_excel(view: &VisibleView) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut sheet = Worksheet::new();
    sheet.set_name(EXCEL_SHEET_NAME)?;
    let header_format = Format::new().set_bold();
    for (col, name) in view.columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header_format)?;
    }
    for (r, row) in view.rows.iter().enumerate() {
        let row_num = (r + 1) as u32;
        for (col, cell) in view.cells(row).enumerate() {
            let col = col as u16;
            match cell {
                CellValue::Null => {}
                CellValue::Int(i) => {
                    sheet.write_number(row_num, col, *i as f64)?;
                }
                CellValue::Float(f) => {
                    sheet.write_number(row_num, col, *f)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(row_num, col, *b)?;
                }
                other => {
                    sheet.write_string(row_num, col, other.display().as_ref())?;
                }
            }
        }
    }
    workbook.push_worksheet(sheet);
    Ok(workbook.save_to_buffer()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    MySql,
    Postgres,
}

impl SqlDialect {
    pub fn from_format(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Postgres => Self::Postgres,
            _ => Self::MySql,
        }
    }

    fn quote_ident(self, ident: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", ident.replace('`', "``")),
            Self::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    fn header_name(self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
        }
    }

    /// SQL literal for a cell.
    pub fn literal(self, cell: &CellValue) -> String {
        match cell {
            CellValue::Null => "NULL".to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) if f.is_finite() => f.to_string(),
            CellValue::Bool(b) => match (self, b) {
                (Self::MySql, true) => "1".to_string(),
                (Self::MySql, false) => "0".to_string(),
                (Self::Postgres, true) => "TRUE".to_string(),
                (Self::Postgres, false) => "FALSE".to_string(),
            },
            other => format!("'{}'", other.display().replace('\'', "''")),
        }
    }
}

fn to_sql_inserts(view: &VisibleView, dialect: SqlDialect, table: &str) -> String {
    let mut out = format!(
        "-- {} Export\n-- Generated at {}\n\n",
        dialect.header_name(),
        chrono::Utc::now().to_rfc3339()
    );
    let table = dialect.quote_ident(table);
    let columns = view
        .columns
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let statements: Vec<String> = view
        .rows
        .iter()
        .map(|row| {
            let values = view
                .cells(row)
                .map(|cell| dialect.literal(cell))
                .collect::<Vec<_>>()
                .join(", ");
            format!("INSERT INTO {} ({}) VALUES ({});", table, columns, values)
        })
        .collect();
    out.push_str(&statements.join("\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DataSource;

    fn dataset() -> Dataset {
        Dataset::complete(
            vec!["id".into(), "name".into(), "active".into()],
            vec![
                vec![
                    CellValue::Int(1),
                    CellValue::Text("Acme, Inc.".into()),
                    CellValue::Bool(true),
                ],
                vec![CellValue::Int(2), CellValue::Null, CellValue::Bool(false)],
            ],
            DataSource::Local,
        )
    }

    fn export(format: ExportFormat, visible: &[usize]) -> String {
        let config = ExportConfig::new(format).with_file_name("people");
        let bytes = export_dataset(Some(&config), &dataset(), visible)
            .unwrap()
            .unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_no_config_is_noop() {
        assert!(export_dataset(None, &dataset(), &[0]).unwrap().is_none());
    }

    #[test]
    fn test_csv_quotes_and_nulls() {
        assert_eq!(
            export(ExportFormat::Csv, &[0, 1]),
            "id,name\n1,\"Acme, Inc.\"\n2,"
        );
    }

    #[test]
    fn test_tsv_is_unquoted() {
        assert_eq!(
            export(ExportFormat::Tsv, &[1, 0]),
            "name\tid\nAcme, Inc.\t1\n\t2"
        );
        assert_eq!(escape_tsv_field("a\tb\nc"), "a b c");
    }

    #[test]
    fn test_json_only_visible_columns() {
        let out = export(ExportFormat::Json, &[0, 1]);
        let parsed: Vec<Map<String, Value>> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].get("name"), Some(&Value::Null));
        assert!(parsed[0].get("active").is_none());
        assert!(out.contains("\n  {"));
    }

    #[test]
    fn test_mysql_inserts() {
        let out = export(ExportFormat::Mysql, &[0, 1, 2]);
        assert!(out.starts_with("-- MySQL Export\n-- Generated at "));
        assert!(out.contains("INSERT INTO `people` (`id`, `name`, `active`) VALUES (1, 'Acme, Inc.', 1);"));
        assert!(out.contains("VALUES (2, NULL, 0);"));
        assert_eq!(out.matches("INSERT").count(), 2);
    }

    #[test]
    fn test_postgres_inserts() {
        let out = export(ExportFormat::Postgres, &[2]);
        assert!(out.starts_with("-- PostgreSQL Export"));
        assert!(out.contains("INSERT INTO \"people\" (\"active\") VALUES (TRUE);"));
    }

    #[test]
    fn test_sql_literal_escapes_quotes() {
        let lit = SqlDialect::MySql.literal(&CellValue::Text("O'Brien".into()));
        assert_eq!(lit, "'O''Brien'");
    }

    #[test]
    fn test_table_name_from_file_name() {
        let config = ExportConfig::new(ExportFormat::Mysql).with_file_name("my-data 2024");
        assert_eq!(config.resolved_table_name(), "my_data_2024");
        let config = config.with_table_name(Some("orders".into()));
        assert_eq!(config.resolved_table_name(), "orders");
    }

    #[test]
    fn test_file_name_extension() {
        let config = ExportConfig::new(ExportFormat::Excel).with_file_name("out");
        assert_eq!(config.file_name_with_extension(), "out.xlsx");
        assert!(default_file_name().starts_with("export_"));
    }

    #[test]
    fn test_convert_to_parquet_writes_output() {
        use crate::engine::RuntimeVariant;
        use polars::prelude::*;

        let dir = tempfile::TempDir::new().unwrap();
        let mut catalog = Catalog::new(RuntimeVariant::InMemory);
        catalog.register_frame("t", df!("id" => &[1i64, 2, 3]).unwrap());
        let path =
            convert_to_parquet(&catalog, "t", ParquetCodec::Zstd, dir.path(), "orders").unwrap();
        assert_eq!(path, dir.path().join("orders.parquet"));
        let back = ParquetReader::new(std::fs::File::open(&path).unwrap())
            .finish()
            .unwrap();
        assert_eq!(back.height(), 3);
    }

    #[test]
    fn test_convert_missing_table_is_export_error() {
        use crate::engine::RuntimeVariant;

        let dir = tempfile::TempDir::new().unwrap();
        let catalog = Catalog::new(RuntimeVariant::InMemory);
        let err = convert_to_parquet(&catalog, "nope", ParquetCodec::Snappy, dir.path(), "x")
            .unwrap_err();
        match err {
            ViewerError::Export(msg) => assert!(msg.starts_with("Export failed: ")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_excel_bytes_are_zip() {
        let config = ExportConfig::new(ExportFormat::Excel);
        let bytes = export_dataset(Some(&config), &dataset(), &[0, 1, 2])
            .unwrap()
            .unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
