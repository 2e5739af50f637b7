mod common;

use common::{sample_frame, write_parquet};
use pqview::engine::{Engine, EngineBinding, RuntimeVariant};
use pqview::error::ViewerError;
use pqview::value::CellValue;
use pqview::ParquetCodec;
use std::sync::mpsc;
use tempfile::TempDir;

#[test]
fn test_parquet_table_window_and_count() {
    let dir = TempDir::new().unwrap();
    let path = write_parquet(dir.path(), "items.parquet", &mut sample_frame(25));
    let engine = Engine::start(RuntimeVariant::InMemory).unwrap();
    engine.register_parquet("items", &path).unwrap();

    assert_eq!(engine.count("items").unwrap(), 25);
    let schema = engine.schema("items").unwrap();
    let names: Vec<&str> = schema.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "group"]);

    let (columns, rows) = engine.fetch_window("items", 20, 10).unwrap();
    assert_eq!(columns.len(), 3);
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0][0], CellValue::Int(20));
    assert_eq!(rows[4][1], CellValue::Text("text_24".to_string()));
}

#[test]
fn test_streaming_variant_gives_same_rows() {
    let engine = Engine::start(RuntimeVariant::Streaming).unwrap();
    engine.register_frame("t", sample_frame(12)).unwrap();
    let all = engine.fetch_all("t").unwrap();
    assert!(all.fully_loaded);
    assert_eq!(all.total_rows, 12);
    assert_eq!(all.rows[11][0], CellValue::Int(11));
}

#[test]
fn test_sql_over_registered_tables() {
    let engine = Engine::start(RuntimeVariant::InMemory).unwrap();
    engine.register_frame("t", sample_frame(30)).unwrap();

    let result = engine
        .execute_sql("SELECT \"group\", COUNT(*) AS n FROM t GROUP BY \"group\" ORDER BY \"group\"")
        .unwrap();
    assert_eq!(result.dataset.columns, vec!["group", "n"]);
    assert_eq!(result.row_count(), 3);
    assert_eq!(result.dataset.rows[0][1], CellValue::Int(10));

    let filtered = engine
        .execute_sql("SELECT name FROM t WHERE id >= 28 ORDER BY id")
        .unwrap();
    assert_eq!(
        filtered.dataset.rows,
        vec![
            vec![CellValue::Text("text_28".to_string())],
            vec![CellValue::Text("text_29".to_string())],
        ]
    );
}

#[test]
fn test_sql_errors_are_query_errors() {
    let engine = Engine::start(RuntimeVariant::InMemory).unwrap();
    engine.register_frame("t", sample_frame(3)).unwrap();

    assert!(matches!(
        engine.execute_sql("SELECT nope FROM t"),
        Err(ViewerError::Query(_))
    ));
    assert!(matches!(
        engine.execute_sql("SELECT * FROM missing_table"),
        Err(ViewerError::Query(_))
    ));
    // the worker keeps serving after a failed query
    assert_eq!(engine.count("t").unwrap(), 3);
}

#[test]
fn test_drop_table() {
    let engine = Engine::start(RuntimeVariant::InMemory).unwrap();
    engine.register_frame("t", sample_frame(3)).unwrap();
    assert!(engine.drop_table("t").unwrap());
    assert!(!engine.drop_table("t").unwrap());
    let err = engine.count("t").unwrap_err();
    assert_eq!(err.to_string(), "Table not found: t");
}

#[test]
fn test_jobs_run_in_submission_order() {
    let engine = Engine::start(RuntimeVariant::InMemory).unwrap();
    let (tx, rx) = mpsc::channel();
    for i in 0..5 {
        let tx = tx.clone();
        engine
            .submit(
                move |catalog| {
                    catalog.register_frame(&format!("t{}", i), sample_frame(i + 1));
                    Ok(catalog.table_names().len())
                },
                move |result| {
                    tx.send((i, result.unwrap())).unwrap();
                },
            )
            .unwrap();
    }
    let seen: Vec<(usize, usize)> = rx.iter().take(5).collect();
    assert_eq!(seen, vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)]);
}

#[test]
fn test_write_parquet_returns_bytes_and_cleans_scratch() {
    let scratch = TempDir::new().unwrap();
    let engine = Engine::start(RuntimeVariant::InMemory).unwrap();
    engine.register_frame("t", sample_frame(8)).unwrap();

    let bytes = engine
        .write_parquet("t", ParquetCodec::Gzip, scratch.path(), "t")
        .unwrap();
    assert_eq!(&bytes[..4], b"PAR1");
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn test_binding_shares_one_engine() {
    let binding = EngineBinding::new(None);
    let first = binding.get().unwrap();
    first.register_frame("shared", sample_frame(4)).unwrap();
    let second = binding.get().unwrap();
    assert_eq!(first.variant(), second.variant());
    assert_eq!(second.count("shared").unwrap(), 4);
}
