//! Per-file session state: the loaded table, an optional query result, and the generation
//! counters used to discard results of superseded async operations.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ingest::{LoadPhase, LoadedTable};
use crate::value::{CellValue, Dataset, QueryResult, SchemaColumn};

/// Where the browse/convert flow currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Idle,
    Ingesting { path: PathBuf, phase: LoadPhase },
    Loaded,
}

/// Kinds of async request that carry a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Ingest,
    Window,
    Query,
}

#[derive(Debug)]
pub struct Session {
    pub state: FlowState,
    pub loaded: Option<LoadedTable>,
    pub query_result: Option<QueryResult>,
    pub source_path: Option<PathBuf>,
    ingest_generation: u64,
    window_generation: u64,
    query_generation: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: FlowState::Idle,
            loaded: None,
            query_result: None,
            source_path: None,
            ingest_generation: 0,
            window_generation: 0,
            query_generation: 0,
        }
    }

    /// Start loading `path`. Everything from the previous file is discarded and any in-flight
    /// result for it becomes stale.
    pub fn begin_ingest(&mut self, path: &Path) -> u64 {
        self.ingest_generation += 1;
        self.window_generation += 1;
        self.query_generation += 1;
        self.loaded = None;
        self.query_result = None;
        self.source_path = Some(path.to_path_buf());
        self.state = FlowState::Ingesting {
            path: path.to_path_buf(),
            phase: LoadPhase::InitialisingEngine,
        };
        self.ingest_generation
    }

    pub fn begin_window(&mut self) -> u64 {
        self.window_generation += 1;
        self.window_generation
    }

    pub fn begin_query(&mut self) -> u64 {
        self.query_generation += 1;
        self.query_generation
    }

    /// Whether a result tagged with `generation` is still wanted.
    pub fn is_current(&self, kind: RequestKind, generation: u64) -> bool {
        let current = match kind {
            RequestKind::Ingest => self.ingest_generation,
            RequestKind::Window => self.window_generation,
            RequestKind::Query => self.query_generation,
        };
        let fresh = current == generation;
        if !fresh {
            debug!(?kind, generation, current, "discarding stale result");
        }
        fresh
    }

    pub fn set_phase(&mut self, generation: u64, phase: LoadPhase) {
        if generation != self.ingest_generation {
            return;
        }
        if let FlowState::Ingesting { phase: p, .. } = &mut self.state {
            *p = phase;
        }
    }

    pub fn phase(&self) -> Option<LoadPhase> {
        match &self.state {
            FlowState::Ingesting { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Install a finished load. Returns false if it was superseded.
    pub fn finish_ingest(&mut self, generation: u64, loaded: LoadedTable) -> bool {
        if !self.is_current(RequestKind::Ingest, generation) {
            return false;
        }
        self.loaded = Some(loaded);
        self.state = FlowState::Loaded;
        true
    }

    /// Failed load: back to idle. Returns false if it was superseded.
    pub fn fail_ingest(&mut self, generation: u64) -> bool {
        if !self.is_current(RequestKind::Ingest, generation) {
            return false;
        }
        self.loaded = None;
        self.state = FlowState::Idle;
        true
    }

    /// Replace the loaded dataset's window. Returns false if it was superseded.
    pub fn apply_window(
        &mut self,
        generation: u64,
        offset: usize,
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> bool {
        if !self.is_current(RequestKind::Window, generation) {
            return false;
        }
        match &mut self.loaded {
            Some(loaded) => {
                loaded.dataset.replace_window(columns, rows, offset);
                true
            }
            None => false,
        }
    }

    /// Install a query result; it replaces the file dataset as the active source.
    pub fn apply_query(&mut self, generation: u64, result: QueryResult) -> bool {
        if !self.is_current(RequestKind::Query, generation) {
            return false;
        }
        self.query_result = Some(result);
        true
    }

    /// Drop the query result so the file dataset is active again.
    pub fn clear_query(&mut self) -> bool {
        self.query_generation += 1;
        self.query_result.take().is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.state == FlowState::Loaded && self.loaded.is_some()
    }

    /// The grid's source: the query result if there is one, else the file dataset.
    pub fn active_dataset(&self) -> Option<&Dataset> {
        match &self.query_result {
            Some(result) => Some(&result.dataset),
            None => self.loaded.as_ref().map(|l| &l.dataset),
        }
    }

    pub fn showing_query_result(&self) -> bool {
        self.query_result.is_some()
    }

    pub fn table(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.table.as_str())
    }

    pub fn schema(&self) -> &[SchemaColumn] {
        self.loaded
            .as_ref()
            .map(|l| l.schema.as_slice())
            .unwrap_or(&[])
    }

    /// Base name for output files: the source file's stem.
    pub fn output_base_name(&self) -> String {
        self.source_path
            .as_deref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DataSource;
    use pqview_cli::SourceFormat;

    fn loaded(total: usize) -> LoadedTable {
        let rows: Vec<Vec<CellValue>> = (0..total.min(3))
            .map(|i| vec![CellValue::Int(i as i64)])
            .collect();
        LoadedTable {
            table: "t".into(),
            format: SourceFormat::Csv,
            schema: vec![],
            dataset: Dataset::windowed(vec!["a".into()], rows, "t".into(), total, 0),
        }
    }

    #[test]
    fn test_stale_ingest_is_discarded() {
        let mut session = Session::new();
        let first = session.begin_ingest(Path::new("a.csv"));
        let second = session.begin_ingest(Path::new("b.csv"));
        assert!(!session.finish_ingest(first, loaded(3)));
        assert!(session.loaded.is_none());
        assert!(session.finish_ingest(second, loaded(3)));
        assert!(session.is_loaded());
        assert_eq!(session.output_base_name(), "b");
    }

    #[test]
    fn test_new_ingest_invalidates_window() {
        let mut session = Session::new();
        let g = session.begin_ingest(Path::new("a.csv"));
        session.finish_ingest(g, loaded(100));
        let w = session.begin_window();
        session.begin_ingest(Path::new("b.csv"));
        assert!(!session.apply_window(w, 50, vec![], vec![]));
    }

    #[test]
    fn test_query_result_is_exclusive() {
        let mut session = Session::new();
        let g = session.begin_ingest(Path::new("a.csv"));
        session.finish_ingest(g, loaded(3));
        let q = session.begin_query();
        let result = QueryResult {
            dataset: Dataset::complete(vec!["x".into()], vec![], DataSource::Local),
            elapsed_ms: 1,
        };
        assert!(session.apply_query(q, result));
        assert_eq!(session.active_dataset().unwrap().columns, vec!["x"]);
        assert!(session.clear_query());
        assert_eq!(session.active_dataset().unwrap().columns, vec!["a"]);
    }

    #[test]
    fn test_failed_ingest_returns_to_idle() {
        let mut session = Session::new();
        let g = session.begin_ingest(Path::new("a.json"));
        session.set_phase(g, LoadPhase::CountingRows);
        assert_eq!(session.phase(), Some(LoadPhase::CountingRows));
        assert!(session.fail_ingest(g));
        assert_eq!(session.state, FlowState::Idle);
    }
}
