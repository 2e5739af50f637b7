//! Error type for engine, ingestion, query and export operations, plus
//! user-facing message formatting.
//!
//! Messages are produced by matching on typed errors (PolarsError variants,
//! io::ErrorKind) rather than parsing strings.

use polars::prelude::PolarsError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// The engine could not be started. Fatal for the session.
    #[error("Failed to initialise query engine: {0}")]
    EngineInit(String),

    /// Malformed or empty JSON / spreadsheet input.
    #[error("{0}")]
    Format(String),

    /// Schema probe, count or initial window failed after registration.
    #[error("{0}")]
    Ingestion(String),

    #[error("{0}")]
    Query(String),

    #[error("{0}")]
    Export(String),

    /// The engine worker has exited and no longer accepts jobs.
    #[error("Query engine is no longer running")]
    EngineClosed,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;

impl ViewerError {
    /// Message suitable for the error modal or the inline query panel.
    pub fn user_message(&self) -> String {
        match self {
            Self::Polars(e) => user_message_from_polars(e),
            Self::Io(e) => user_message_from_io(e, None),
            Self::Json(e) => format!("Invalid JSON: {}", e),
            other => other.to_string(),
        }
    }

    /// Whether the session can continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::EngineInit(_) | Self::EngineClosed)
    }
}

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check spelling and that the column exists.",
            msg
        ),
        PE::Duplicate(msg) => format!(
            "Duplicate column in result: {}. Use AS to give each column a unique name.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::OutOfBounds(msg) => format!("Index or row out of bounds: {}", msg),
        PE::SchemaFieldNotFound(msg) => format!("Schema field not found: {}", msg),
        PE::ComputeError(msg) => simplify_compute_message(msg),
        PE::SQLInterface(msg) | PE::SQLSyntax(msg) => format!("SQL error: {}", msg),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check access rights.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::AlreadyExists => "File already exists.".to_string(),
        ErrorKind::Other => {
            let msg = err.to_string();
            if msg.contains("space left") {
                return "No space left on device. Free up disk space and try again.".to_string();
            }
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            return if context.is_some() {
                format!("I/O error: {}", msg)
            } else {
                msg
            };
        }
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Strip engine-internal phrasing from compute errors.
fn simplify_compute_message(msg: &str) -> String {
    let first = msg.lines().next().unwrap_or(msg).trim();
    if first.contains(".alias(") {
        return "Duplicate output column name. Use AS to give each column a unique name."
            .to_string();
    }
    first.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_from_io_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(msg.contains("not found"), "got: {}", msg);
    }

    #[test]
    fn test_user_message_from_io_with_context() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let msg = user_message_from_io(&err, Some("(out.csv)"));
        assert!(msg.starts_with("Permission denied"));
        assert!(msg.ends_with("(out.csv)"));
    }

    #[test]
    fn test_user_message_from_polars_column_not_found() {
        let err = PolarsError::ColumnNotFound("foo".into());
        let msg = user_message_from_polars(&err);
        assert!(msg.contains("Column not found"));
        assert!(msg.contains("foo"));
    }

    #[test]
    fn test_compute_message_alias_hint() {
        let raw = "projections contained duplicate: 'x'. Try renaming with .alias(\"name\")";
        let msg = simplify_compute_message(raw);
        assert!(!msg.contains(".alias("));
        assert!(msg.contains("AS"));
    }

    #[test]
    fn test_viewer_error_messages() {
        let err = ViewerError::Format("JSON array is empty".into());
        assert_eq!(err.user_message(), "JSON array is empty");
        assert!(!err.is_fatal());
        assert!(ViewerError::EngineInit("no threads".into()).is_fatal());
        let err: ViewerError = PolarsError::NoData("empty".into()).into();
        assert_eq!(err.user_message(), "No data: empty");
    }
}
