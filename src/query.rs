//! SQL text helpers and the state of the interactive query surface.

use regex::Regex;

use crate::value::QueryResult;

/// Rows returned by an interactive query that has no LIMIT of its own.
pub const DEFAULT_ROW_LIMIT: usize = 10_000;

/// Starter text for a freshly loaded table.
pub fn default_sql(table: &str) -> String {
    format!(
        "-- Query your data using SQL\n-- Table: {}\n\nSELECT * FROM {}",
        table, table
    )
}

/// True when `sql` already contains `LIMIT <n>` (any case).
pub fn has_limit(sql: &str) -> bool {
    match Regex::new(r"(?i)\bLIMIT\s+\d+") {
        Ok(re) => re.is_match(sql),
        Err(_) => sql.to_uppercase().contains("LIMIT "),
    }
}

/// Append `LIMIT <row_limit>` on a new line unless the query already limits its rows.
/// Trailing whitespace and semicolons are stripped first.
pub fn apply_row_limit(sql: &str, row_limit: usize) -> String {
    if has_limit(sql) {
        return sql.to_string();
    }
    let trimmed = sql.trim_end_matches(|c: char| c.is_whitespace() || c == ';');
    format!("{}\nLIMIT {}", trimmed, row_limit)
}

/// Outcome of the most recent execution, shown next to the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Success {
        rows: usize,
        columns: usize,
        elapsed_ms: u128,
    },
    Failed(String),
}

/// Execution bookkeeping for the SQL surface. The text itself lives in the editor widget.
#[derive(Debug, Default)]
pub struct QueryState {
    pub executing: bool,
    pub outcome: Option<QueryOutcome>,
    pub row_limit: usize,
}

impl QueryState {
    pub fn new(row_limit: usize) -> Self {
        Self {
            executing: false,
            outcome: None,
            row_limit,
        }
    }

    /// Mark a submission as started. Returns the SQL to run, or `None` when one is already
    /// in flight or the text is blank.
    pub fn begin(&mut self, text: &str) -> Option<String> {
        if self.executing || is_blank_sql(text) {
            return None;
        }
        self.executing = true;
        Some(apply_row_limit(text, self.row_limit))
    }

    pub fn finish(&mut self, result: &Result<QueryResult, String>) {
        self.executing = false;
        self.outcome = Some(match result {
            Ok(r) => QueryOutcome::Success {
                rows: r.row_count(),
                columns: r.dataset.columns.len(),
                elapsed_ms: r.elapsed_ms,
            },
            Err(msg) => QueryOutcome::Failed(msg.clone()),
        });
    }

    pub fn clear(&mut self) {
        self.outcome = None;
    }

    pub fn status_line(&self) -> Option<String> {
        match &self.outcome {
            Some(QueryOutcome::Success {
                rows,
                columns,
                elapsed_ms,
            }) => Some(format!(
                "{} rows × {} columns in {} ms",
                rows, columns, elapsed_ms
            )),
            Some(QueryOutcome::Failed(msg)) => Some(msg.clone()),
            None => None,
        }
    }
}

/// Only comments and whitespace.
fn is_blank_sql(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}
