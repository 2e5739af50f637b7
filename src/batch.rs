//! Headless operation: `--export-to` and `--convert-to` run one job against the engine and exit
//! without starting the interface.

use std::path::{Path, PathBuf};

use pqview_cli::{ExportFormat, ParquetCodec, SourceFormat, ViewMode};
use tracing::info;

use crate::engine::Engine;
use crate::error::{Result, ViewerError};
use crate::export::{convert_to_parquet, export_dataset, write_export, ExportConfig};
use crate::ingest::{register_source, CsvOptions};

/// Placeholder in `--query` text that is replaced by the loaded table's name.
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// Split `--export-to PATH` into the output directory and an export configuration.
///
/// The format comes from `format` when given, otherwise from the path's extension, otherwise
/// `fallback`.
pub fn export_target(
    path: &Path,
    format: Option<ExportFormat>,
    fallback: ExportFormat,
    table_name: Option<String>,
) -> (PathBuf, ExportConfig) {
    let format = format
        .or_else(|| {
            path.extension()
                .and_then(|e| e.to_str())
                .and_then(ExportFormat::from_name)
        })
        .unwrap_or(fallback);
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let config = ExportConfig::new(format).with_table_name(table_name);
    let config = if file_name.is_empty() {
        config
    } else {
        config.with_file_name(file_name)
    };
    (dir, config)
}

fn detect_format(source: &Path) -> Result<SourceFormat> {
    SourceFormat::from_path(source).ok_or_else(|| {
        ViewerError::Format(format!("Unsupported file type: {}", source.display()))
    })
}

/// Load `source` and write it (or the result of `query`) with `config` into `dir`.
///
/// Every column is exported. `query` is run without the interactive row ceiling.
pub fn export_file(
    engine: &Engine,
    source: &Path,
    options: CsvOptions,
    query: Option<String>,
    dir: &Path,
    config: &ExportConfig,
) -> Result<PathBuf> {
    let format = detect_format(source)?;
    let source_path = source.to_path_buf();
    let dataset = engine.call(move |catalog| {
        let table = register_source(catalog, &source_path, format, &options)?;
        let result = match query {
            Some(sql) => catalog
                .execute_sql(&sql.replace(TABLE_PLACEHOLDER, &table))
                .map(|r| r.dataset),
            None => catalog.fetch_all(&table),
        };
        catalog.drop_table(&table);
        result
    })?;

    let visible: Vec<usize> = (0..dataset.columns.len()).collect();
    let bytes = export_dataset(Some(config), &dataset, &visible)?.unwrap_or_default();
    let path = write_export(dir, config, &bytes)?;
    info!(source = %source.display(), rows = dataset.rows.len(), "headless export finished");
    Ok(path)
}

/// Convert `source` to `<dir>/<stem>.parquet`.
pub fn convert_file(
    engine: &Engine,
    source: &Path,
    options: CsvOptions,
    dir: &Path,
    codec: ParquetCodec,
) -> Result<PathBuf> {
    let format = detect_format(source)?;
    if !ViewMode::Convert.accepts(format) {
        return Err(ViewerError::Format(
            "Conversion accepts CSV, JSON and Excel sources".to_string(),
        ));
    }
    let base = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let source_path = source.to_path_buf();
    let dir = dir.to_path_buf();
    engine.call(move |catalog| {
        let table = register_source(catalog, &source_path, format, &options)?;
        let written = convert_to_parquet(catalog, &table, codec, &dir, &base);
        catalog.drop_table(&table);
        written
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_target_from_extension() {
        let (dir, config) = export_target(Path::new("out/report.csv"), None, ExportFormat::Json, None);
        assert_eq!(dir, PathBuf::from("out"));
        assert_eq!(config.format, ExportFormat::Csv);
        assert_eq!(config.file_name_with_extension(), "report.csv");
    }

    #[test]
    fn test_export_target_explicit_format_and_fallback() {
        let (dir, config) = export_target(
            Path::new("dump"),
            Some(ExportFormat::Postgres),
            ExportFormat::Json,
            Some("orders".into()),
        );
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(config.file_name_with_extension(), "dump.sql");
        assert_eq!(config.resolved_table_name(), "orders");

        let (_, config) = export_target(Path::new("data.bin"), None, ExportFormat::Tsv, None);
        assert_eq!(config.format, ExportFormat::Tsv);
    }
}
