//! Query engine binding.
//!
//! One background worker owns the catalog of registered tables (lazy frames). Every engine
//! operation is a job sent to that worker, so operations are serialised in submission order.
//! `EngineBinding` starts the worker on first use and hands out cheap `Engine` clones.

use std::collections::HashMap;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::OnceLock;
use std::thread;
use std::time::Instant;

use polars::prelude::*;
use polars_sql::SQLContext;
use pqview_cli::ParquetCodec;
use tracing::{debug, info, warn};

use crate::error::{user_message_from_polars, Result, ViewerError};
use crate::value::{
    frame_to_rows, schema_columns, CellValue, DataSource, Dataset, QueryResult, SchemaColumn,
};

const WORKER_THREAD_NAME: &str = "pqview-engine";

static SCRATCH_TOKEN: AtomicU64 = AtomicU64::new(0);

/// How lazy frames are materialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeVariant {
    Streaming,
    InMemory,
}

impl RuntimeVariant {
    /// Pick a variant. `None` means auto: streaming when more than one CPU is available.
    pub fn select(streaming: Option<bool>) -> Self {
        match streaming {
            Some(true) => Self::Streaming,
            Some(false) => Self::InMemory,
            None => {
                let cpus = thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1);
                if cpus > 1 {
                    Self::Streaming
                } else {
                    Self::InMemory
                }
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::InMemory => "in-memory",
        }
    }

    pub fn collect(self, lf: LazyFrame) -> PolarsResult<DataFrame> {
        match self {
            Self::Streaming => lf.with_new_streaming(true).collect(),
            Self::InMemory => lf.collect(),
        }
    }
}

/// Tables registered with the engine. Only the worker thread touches this.
pub struct Catalog {
    tables: HashMap<String, LazyFrame>,
    variant: RuntimeVariant,
}

impl Catalog {
    pub fn new(variant: RuntimeVariant) -> Self {
        Self {
            tables: HashMap::new(),
            variant,
        }
    }

    pub fn variant(&self) -> RuntimeVariant {
        self.variant
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register (or replace) a table backed by a lazy scan.
    pub fn register(&mut self, table: &str, lf: LazyFrame) {
        if self.tables.insert(table.to_string(), lf).is_some() {
            debug!(table, "replaced existing table");
        } else {
            debug!(table, "registered table");
        }
    }

    /// Register an in-memory frame as a table.
    pub fn register_frame(&mut self, table: &str, df: DataFrame) {
        self.register(table, df.lazy());
    }

    pub fn drop_table(&mut self, table: &str) -> bool {
        let dropped = self.tables.remove(table).is_some();
        debug!(table, dropped, "drop table");
        dropped
    }

    fn frame(&self, table: &str) -> Result<LazyFrame> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| ViewerError::Query(format!("Table not found: {}", table)))
    }

    pub fn schema(&self, table: &str) -> Result<Vec<SchemaColumn>> {
        let mut lf = self.frame(table)?;
        let schema = lf.collect_schema()?;
        Ok(schema_columns(&schema))
    }

    pub fn count(&self, table: &str) -> Result<usize> {
        let lf = self.frame(table)?;
        let df = self.variant.collect(lf.select([len()]))?;
        let count = match df.get_columns().first() {
            Some(col) => col.get(0)?.extract::<u64>().unwrap_or(0) as usize,
            None => 0,
        };
        Ok(count)
    }

    /// Rows `[offset, offset + limit)` as typed cells.
    pub fn fetch_window(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<String>, Vec<Vec<CellValue>>)> {
        let lf = self.frame(table)?;
        let len = limit.min(IdxSize::MAX as usize) as IdxSize;
        let df = self.variant.collect(lf.slice(offset as i64, len))?;
        Ok(frame_to_rows(&df)?)
    }

    pub fn fetch_all(&self, table: &str) -> Result<Dataset> {
        let df = self.variant.collect(self.frame(table)?)?;
        let (columns, rows) = frame_to_rows(&df)?;
        Ok(Dataset::complete(columns, rows, DataSource::Local))
    }

    /// Run SQL against a fresh context holding every registered table.
    pub fn execute_sql(&self, sql: &str) -> Result<QueryResult> {
        let started = Instant::now();
        let mut ctx = SQLContext::new();
        for (name, lf) in &self.tables {
            ctx.register(name, lf.clone());
        }
        let lf = ctx
            .execute(sql)
            .map_err(|e| ViewerError::Query(user_message_from_polars(&e)))?;
        let df = self
            .variant
            .collect(lf)
            .map_err(|e| ViewerError::Query(user_message_from_polars(&e)))?;
        let (columns, rows) = frame_to_rows(&df)?;
        let elapsed_ms = started.elapsed().as_millis();
        info!(rows = rows.len(), elapsed_ms = elapsed_ms as u64, "query executed");
        Ok(QueryResult {
            dataset: Dataset::complete(columns, rows, DataSource::Local),
            elapsed_ms,
        })
    }

    /// Write `table` as Parquet under a unique scratch name and return the file's bytes.
    pub fn write_parquet(
        &self,
        table: &str,
        codec: ParquetCodec,
        scratch_dir: &Path,
        base: &str,
    ) -> Result<Vec<u8>> {
        let mut df = self.variant.collect(self.frame(table)?)?;
        fs::create_dir_all(scratch_dir)?;
        let scratch = scratch_file_name(scratch_dir, base);
        let written = write_parquet_file(&mut df, codec, &scratch);
        let bytes = written.and_then(|_| fs::read(&scratch).map_err(ViewerError::from));
        if let Err(e) = fs::remove_file(&scratch) {
            warn!(path = %scratch.display(), error = %e, "could not remove scratch file");
        }
        let bytes = bytes?;
        info!(table, codec = codec.as_str(), bytes = bytes.len(), "parquet written");
        Ok(bytes)
    }
}

fn write_parquet_file(df: &mut DataFrame, codec: ParquetCodec, path: &Path) -> Result<()> {
    let mut file = fs::File::create(path)?;
    ParquetWriter::new(&mut file)
        .with_compression(parquet_compression(codec))
        .finish(df)?;
    Ok(())
}

pub fn parquet_compression(codec: ParquetCodec) -> ParquetCompression {
    match codec {
        ParquetCodec::Snappy => ParquetCompression::Snappy,
        ParquetCodec::Zstd => ParquetCompression::Zstd(None),
        ParquetCodec::Gzip => ParquetCompression::Gzip(None),
        ParquetCodec::Uncompressed => ParquetCompression::Uncompressed,
    }
}

/// `<dir>/<base>_<millis>_<token>.parquet`, unique within the process.
pub fn scratch_file_name(dir: &Path, base: &str) -> PathBuf {
    let millis = chrono::Utc::now().timestamp_millis();
    let token = SCRATCH_TOKEN.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("{}_{}_{}.parquet", base, millis, token))
}

type Job = Box<dyn FnOnce(&mut Catalog) + Send>;

/// Handle to the engine worker. Clones share the worker; it exits when the last clone drops.
#[derive(Clone)]
pub struct Engine {
    jobs: Sender<Job>,
    variant: RuntimeVariant,
}

impl Engine {
    /// Spawn the worker thread.
    pub fn start(variant: RuntimeVariant) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut catalog = Catalog::new(variant);
                info!(variant = variant.as_str(), "engine worker started");
                while let Ok(job) = rx.recv() {
                    job(&mut catalog);
                }
                debug!("engine worker exiting");
            })?;
        Ok(Self { jobs: tx, variant })
    }

    pub fn variant(&self) -> RuntimeVariant {
        self.variant
    }

    /// Queue `op` on the worker; `done` runs on the worker with its result.
    pub fn submit<T, F, D>(&self, op: F, done: D) -> Result<()>
    where
        T: Send + 'static,
        F: FnOnce(&mut Catalog) -> Result<T> + Send + 'static,
        D: FnOnce(Result<T>) + Send + 'static,
    {
        let job: Job = Box::new(move |catalog| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| op(catalog)))
                .unwrap_or_else(|payload| Err(ViewerError::Query(panic_message(payload))));
            done(result);
        });
        self.jobs.send(job).map_err(|_| ViewerError::EngineClosed)
    }

    /// Run `op` on the worker and wait for its result.
    pub fn call<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Catalog) -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        self.submit(op, move |result| {
            let _ = tx.send(result);
        })?;
        rx.recv().map_err(|_| ViewerError::EngineClosed)?
    }

    pub fn register_frame(&self, table: &str, df: DataFrame) -> Result<()> {
        let table = table.to_string();
        self.call(move |catalog| {
            catalog.register_frame(&table, df);
            Ok(())
        })
    }

    pub fn register_parquet(&self, table: &str, path: &Path) -> Result<()> {
        let table = table.to_string();
        let path = path.to_path_buf();
        self.call(move |catalog| {
            let lf = crate::ingest::scan_parquet(&path)?;
            catalog.register(&table, lf);
            Ok(())
        })
    }

    pub fn schema(&self, table: &str) -> Result<Vec<SchemaColumn>> {
        let table = table.to_string();
        self.call(move |catalog| catalog.schema(&table))
    }

    pub fn count(&self, table: &str) -> Result<usize> {
        let table = table.to_string();
        self.call(move |catalog| catalog.count(&table))
    }

    pub fn fetch_window(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<String>, Vec<Vec<CellValue>>)> {
        let table = table.to_string();
        self.call(move |catalog| catalog.fetch_window(&table, offset, limit))
    }

    pub fn fetch_all(&self, table: &str) -> Result<Dataset> {
        let table = table.to_string();
        self.call(move |catalog| catalog.fetch_all(&table))
    }

    pub fn execute_sql(&self, sql: &str) -> Result<QueryResult> {
        let sql = sql.to_string();
        self.call(move |catalog| catalog.execute_sql(&sql))
    }

    pub fn write_parquet(
        &self,
        table: &str,
        codec: ParquetCodec,
        scratch_dir: &Path,
        base: &str,
    ) -> Result<Vec<u8>> {
        let table = table.to_string();
        let scratch_dir = scratch_dir.to_path_buf();
        let base = base.to_string();
        self.call(move |catalog| catalog.write_parquet(&table, codec, &scratch_dir, &base))
    }

    pub fn drop_table(&self, table: &str) -> Result<bool> {
        let table = table.to_string();
        self.call(move |catalog| Ok(catalog.drop_table(&table)))
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    let msg = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    warn!(message = %msg, "engine job panicked");
    format!("Query engine failed: {}", msg)
}

/// Starts the engine on first use and caches the outcome for the life of the binding.
pub struct EngineBinding {
    cell: OnceLock<std::result::Result<Engine, String>>,
    streaming: Option<bool>,
}

impl EngineBinding {
    pub fn new(streaming: Option<bool>) -> Self {
        Self {
            cell: OnceLock::new(),
            streaming,
        }
    }

    /// The shared engine. Concurrent callers wait for the same initialisation; a failure is
    /// returned to every caller and never retried.
    pub fn get(&self) -> Result<Engine> {
        self.cell
            .get_or_init(|| {
                let variant = RuntimeVariant::select(self.streaming);
                Engine::start(variant).map_err(|e| {
                    warn!(error = %e, "engine initialisation failed");
                    e.to_string()
                })
            })
            .clone()
            .map_err(ViewerError::EngineInit)
    }

    pub fn is_started(&self) -> bool {
        matches!(self.cell.get(), Some(Ok(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "id" => &[1i64, 2, 3, 4, 5],
            "name" => &["a", "b", "c", "d", "e"],
        )
        .unwrap()
    }

    #[test]
    fn test_select_variant() {
        assert_eq!(RuntimeVariant::select(Some(true)), RuntimeVariant::Streaming);
        assert_eq!(RuntimeVariant::select(Some(false)), RuntimeVariant::InMemory);
    }

    #[test]
    fn test_catalog_count_and_window() {
        let mut catalog = Catalog::new(RuntimeVariant::InMemory);
        catalog.register_frame("t", sample());
        assert_eq!(catalog.count("t").unwrap(), 5);
        let (columns, rows) = catalog.fetch_window("t", 3, 10).unwrap();
        assert_eq!(columns, vec!["id", "name"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], CellValue::Int(4));
    }

    #[test]
    fn test_catalog_missing_table() {
        let catalog = Catalog::new(RuntimeVariant::InMemory);
        assert!(matches!(catalog.count("nope"), Err(ViewerError::Query(_))));
    }

    #[test]
    fn test_catalog_schema() {
        let mut catalog = Catalog::new(RuntimeVariant::InMemory);
        catalog.register_frame("t", sample());
        let schema = catalog.schema("t").unwrap();
        assert_eq!(schema[0].dtype, "BIGINT");
        assert_eq!(schema[1].dtype, "VARCHAR");
    }

    #[test]
    fn test_binding_returns_same_worker() {
        let binding = EngineBinding::new(Some(false));
        assert!(!binding.is_started());
        let a = binding.get().unwrap();
        a.register_frame("t", sample()).unwrap();
        let b = binding.get().unwrap();
        assert!(binding.is_started());
        assert_eq!(b.count("t").unwrap(), 5);
    }

    #[test]
    fn test_submit_runs_callback() {
        let engine = Engine::start(RuntimeVariant::InMemory).unwrap();
        engine.register_frame("t", sample()).unwrap();
        let (tx, rx) = mpsc::channel();
        engine
            .submit(
                |catalog| catalog.count("t"),
                move |result| {
                    tx.send(result.unwrap()).unwrap();
                },
            )
            .unwrap();
        assert_eq!(rx.recv().unwrap(), 5);
    }

    #[test]
    fn test_panicking_job_reports_error() {
        let engine = Engine::start(RuntimeVariant::InMemory).unwrap();
        let result: Result<()> = engine.call(|_| panic!("boom"));
        assert!(result.unwrap_err().to_string().contains("boom"));
        // worker survives
        assert!(engine.drop_table("missing").is_ok());
    }

    #[test]
    fn test_scratch_names_unique() {
        let dir = Path::new("/tmp");
        assert_ne!(scratch_file_name(dir, "x"), scratch_file_name(dir, "x"));
    }
}
