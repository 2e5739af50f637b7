mod common;

use common::{read_parquet, sample_frame, write_csv, write_parquet, write_text};
use pqview::batch::{convert_file, export_file, export_target};
use pqview::engine::{Engine, RuntimeVariant};
use pqview::export::{export_dataset, write_export, ExportConfig};
use pqview::ingest::CsvOptions;
use pqview::value::{frame_to_rows, CellValue, DataSource, Dataset};
use pqview::{ExportFormat, ParquetCodec};
use polars::prelude::*;
use std::fs;
use std::io::Cursor;
use tempfile::TempDir;

fn two_rows() -> Dataset {
    Dataset::complete(
        vec!["id".to_string(), "name".to_string()],
        vec![
            vec![CellValue::Int(1), CellValue::Text("A".to_string())],
            vec![CellValue::Int(2), CellValue::Text("B".to_string())],
        ],
        DataSource::Local,
    )
}

fn serialise(format: ExportFormat, dataset: &Dataset, visible: &[usize]) -> String {
    let config = ExportConfig::new(format).with_file_name("data");
    let bytes = export_dataset(Some(&config), dataset, visible)
        .unwrap()
        .unwrap();
    String::from_utf8(bytes).unwrap()
}

fn engine() -> Engine {
    Engine::start(RuntimeVariant::InMemory).unwrap()
}

#[test]
fn test_csv_export_plain() {
    assert_eq!(
        serialise(ExportFormat::Csv, &two_rows(), &[0, 1]),
        "id,name\n1,A\n2,B"
    );
}

#[test]
fn test_csv_export_quotes_embedded_separators() {
    let dataset = Dataset::complete(
        vec!["company".to_string(), "note".to_string()],
        vec![vec![
            CellValue::Text("Acme, Inc.".to_string()),
            CellValue::Text("say \"hi\"".to_string()),
        ]],
        DataSource::Local,
    );
    assert_eq!(
        serialise(ExportFormat::Csv, &dataset, &[0, 1]),
        "company,note\n\"Acme, Inc.\",\"say \"\"hi\"\"\""
    );
}

#[test]
fn test_tsv_keeps_commas() {
    let dataset = Dataset::complete(
        vec!["company".to_string()],
        vec![vec![CellValue::Text("Acme, Inc.".to_string())]],
        DataSource::Local,
    );
    assert_eq!(
        serialise(ExportFormat::Tsv, &dataset, &[0]),
        "company\nAcme, Inc."
    );
}

#[test]
fn test_json_record_count_and_hidden_columns() {
    let out = serialise(ExportFormat::Json, &two_rows(), &[1]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let records = parsed.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], serde_json::json!({"name": "A"}));
}

#[test]
fn test_sql_export_writes_null_literal() {
    let dataset = Dataset::complete(
        vec!["id".to_string(), "name".to_string()],
        vec![vec![CellValue::Int(3), CellValue::Null]],
        DataSource::Local,
    );
    let config = ExportConfig::new(ExportFormat::Postgres)
        .with_file_name("data")
        .with_table_name(Some("people".to_string()));
    let bytes = export_dataset(Some(&config), &dataset, &[0, 1])
        .unwrap()
        .unwrap();
    let out = String::from_utf8(bytes).unwrap();
    assert!(out.contains("INSERT INTO \"people\" (\"id\", \"name\") VALUES (3, NULL);"));
}

#[test]
fn test_write_export_creates_directory() {
    let dir = TempDir::new().unwrap();
    let out_dir = dir.path().join("nested").join("exports");
    let config = ExportConfig::new(ExportFormat::Csv).with_file_name("report");
    let path = write_export(&out_dir, &config, b"id\n1").unwrap();
    assert_eq!(path, out_dir.join("report.csv"));
    assert_eq!(fs::read_to_string(path).unwrap(), "id\n1");
}

#[test]
fn test_headless_export_of_every_row() {
    let dir = TempDir::new().unwrap();
    let source = write_parquet(dir.path(), "items.parquet", &mut sample_frame(40));
    let (out_dir, config) = export_target(
        &dir.path().join("out").join("items.csv"),
        None,
        ExportFormat::Json,
        None,
    );

    let path = export_file(
        &engine(),
        &source,
        CsvOptions::default(),
        None,
        &out_dir,
        &config,
    )
    .unwrap();
    assert_eq!(path, dir.path().join("out").join("items.csv"));
    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 41);
    assert_eq!(lines[0], "id,name,group");
    assert_eq!(lines[40], "39,text_39,0");
}

#[test]
fn test_headless_export_with_query() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(dir.path(), "items.csv", &mut sample_frame(30));
    let (out_dir, config) = export_target(
        &dir.path().join("subset.json"),
        None,
        ExportFormat::Csv,
        None,
    );

    let path = export_file(
        &engine(),
        &source,
        CsvOptions::default(),
        Some("SELECT id FROM {table} WHERE \"group\" = 1 ORDER BY id".to_string()),
        &out_dir,
        &config,
    )
    .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    let records = parsed.as_array().unwrap();
    assert_eq!(records.len(), 10);
    assert_eq!(records[0], serde_json::json!({"id": 1}));
}

#[test]
fn test_headless_export_rejects_unknown_source() {
    let dir = TempDir::new().unwrap();
    let source = write_text(dir.path(), "notes.md", "# hi");
    let config = ExportConfig::new(ExportFormat::Csv);
    let err = export_file(
        &engine(),
        &source,
        CsvOptions::default(),
        None,
        dir.path(),
        &config,
    )
    .unwrap_err();
    assert!(err.user_message().starts_with("Unsupported file type"));
}

#[test]
fn test_convert_csv_to_parquet() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(dir.path(), "orders.csv", &mut sample_frame(25));
    let out_dir = dir.path().join("converted");
    fs::create_dir_all(&out_dir).unwrap();

    let engine = engine();
    let path = convert_file(
        &engine,
        &source,
        CsvOptions::default(),
        &out_dir,
        ParquetCodec::Zstd,
    )
    .unwrap();
    assert_eq!(path, out_dir.join("orders.parquet"));
    let back = read_parquet(&path);
    assert_eq!(back.height(), 25);
    assert_eq!(back.get_column_names_str(), vec!["id", "name", "group"]);
    // the conversion's table is released again
    assert!(engine.call(|catalog| Ok(catalog.table_names())).unwrap().is_empty());
}

#[test]
fn test_convert_json_to_parquet() {
    let dir = TempDir::new().unwrap();
    let source = write_text(
        dir.path(),
        "events.json",
        r#"{"events": [{"kind": "open", "n": 1}, {"kind": "close", "n": 2}]}"#,
    );
    let path = convert_file(
        &engine(),
        &source,
        CsvOptions::default(),
        dir.path(),
        ParquetCodec::Uncompressed,
    )
    .unwrap();
    let back = read_parquet(&path);
    assert_eq!(back.height(), 2);
    assert_eq!(back.width(), 2);
}

#[test]
fn test_convert_rejects_parquet_source() {
    let dir = TempDir::new().unwrap();
    let source = write_parquet(dir.path(), "already.parquet", &mut sample_frame(2));
    let err = convert_file(
        &engine(),
        &source,
        CsvOptions::default(),
        dir.path(),
        ParquetCodec::Snappy,
    )
    .unwrap_err();
    assert_eq!(err.user_message(), "Conversion accepts CSV, JSON and Excel sources");
}

fn frame_dataset(frame: DataFrame) -> Dataset {
    let engine = engine();
    engine.register_frame("t", frame).unwrap();
    engine.fetch_all("t").unwrap()
}

fn reread(text: &str, separator: u8) -> (Vec<String>, Vec<Vec<CellValue>>) {
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .map_parse_options(|o| o.with_separator(separator))
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()
        .unwrap();
    frame_to_rows(&frame).unwrap()
}

fn visible_rows(dataset: &Dataset, visible: &[usize]) -> Vec<Vec<CellValue>> {
    dataset
        .rows
        .iter()
        .map(|row| visible.iter().map(|i| row[*i].clone()).collect())
        .collect()
}

#[test]
fn test_csv_export_reads_back_as_visible_values() {
    let dataset = frame_dataset(
        df!(
            "id" => [1i64, 2, 3],
            "company" => ["Acme, Inc.", "say \"hi\"", "line\nbreak"],
            "score" => [1.5f64, 2.25, -3.5]
        )
        .unwrap(),
    );
    for visible in [vec![0, 1, 2], vec![1, 2], vec![0]] {
        let text = serialise(ExportFormat::Csv, &dataset, &visible);
        let (columns, rows) = reread(&text, b',');
        let expected: Vec<String> = visible.iter().map(|i| dataset.columns[*i].clone()).collect();
        assert_eq!(columns, expected);
        assert_eq!(rows, visible_rows(&dataset, &visible));
    }
}

#[test]
fn test_tsv_export_reads_back_as_visible_values() {
    let dataset = frame_dataset(
        df!(
            "id" => [10i64, 20],
            "company" => ["Acme, Inc.", "a,b,c"]
        )
        .unwrap(),
    );
    let text = serialise(ExportFormat::Tsv, &dataset, &[0, 1]);
    let (columns, rows) = reread(&text, b'\t');
    assert_eq!(columns, vec!["id", "company"]);
    assert_eq!(rows, visible_rows(&dataset, &[0, 1]));
}

#[test]
fn test_repeated_export_is_identical() {
    let dataset = frame_dataset(sample_frame(15));
    for format in [ExportFormat::Json, ExportFormat::Csv, ExportFormat::Tsv] {
        assert_eq!(
            serialise(format, &dataset, &[0, 2]),
            serialise(format, &dataset, &[0, 2])
        );
    }

    let without_timestamp = |format| {
        serialise(format, &dataset, &[0, 1, 2])
            .lines()
            .filter(|line| !line.starts_with("-- Generated at"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    for format in [ExportFormat::Mysql, ExportFormat::Postgres] {
        assert_eq!(without_timestamp(format), without_timestamp(format));
    }
}

#[test]
fn test_json_source_exported_as_csv() {
    let dir = TempDir::new().unwrap();
    let source = write_text(
        dir.path(),
        "people.json",
        r#"[{"id":1,"name":"A"},{"id":2,"name":"B"}]"#,
    );
    let (out_dir, config) = export_target(
        &dir.path().join("people.csv"),
        None,
        ExportFormat::Json,
        None,
    );
    let path = export_file(
        &engine(),
        &source,
        CsvOptions::default(),
        None,
        &out_dir,
        &config,
    )
    .unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "id,name\n1,A\n2,B");
}
