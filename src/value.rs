//! Row and schema model shared by the grid, the exporters and the query surface.

use polars::prelude::*;
use std::borrow::Cow;

/// A single cell. Engine values are narrowed to these tags before they leave the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    /// Lists and other compound values, kept as JSON.
    Nested(serde_json::Value),
}

impl CellValue {
    pub fn from_any(value: &AnyValue) -> Self {
        match value {
            AnyValue::Null => Self::Null,
            AnyValue::Boolean(b) => Self::Bool(*b),
            AnyValue::Float32(f) => Self::Float(*f as f64),
            AnyValue::Float64(f) => Self::Float(*f),
            AnyValue::String(s) => Self::Text(s.to_string()),
            AnyValue::StringOwned(s) => Self::Text(s.to_string()),
            AnyValue::List(series) => Self::Nested(series_to_json(series)),
            AnyValue::Struct(_, _, fields) => {
                Self::Nested(struct_to_json(fields.iter().zip(value._iter_struct_av())))
            }
            AnyValue::StructOwned(payload) => {
                let (values, fields) = &**payload;
                Self::Nested(struct_to_json(fields.iter().zip(values.iter().cloned())))
            }
            v if v.dtype().is_integer() => match v.extract::<i64>() {
                Some(i) => Self::Int(i),
                // u64 beyond i64::MAX
                None => Self::Text(v.str_value().into_owned()),
            },
            other => Self::Text(other.str_value().into_owned()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text shown in the grid and written to delimited exports. Null is empty.
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::Int(i) => Cow::Owned(i.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
            Self::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Self::Text(s) => Cow::Borrowed(s.as_str()),
            Self::Nested(v) => Cow::Owned(v.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Null => Value::Null,
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Bool(b) => Value::Bool(*b),
            Self::Text(s) => Value::String(s.clone()),
            Self::Nested(v) => v.clone(),
        }
    }

    /// Ordering used by the grid's client-side sort: nulls first, numbers numerically,
    /// everything else by display text.
    pub fn sort_cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (a, b) => a.display().cmp(&b.display()),
        }
    }
}

fn series_to_json(series: &Series) -> serde_json::Value {
    let items = (0..series.len())
        .map(|i| {
            series
                .get(i)
                .map(|v| CellValue::from_any(&v).to_json())
                .unwrap_or(serde_json::Value::Null)
        })
        .collect();
    serde_json::Value::Array(items)
}

fn struct_to_json<'a>(
    members: impl Iterator<Item = (&'a Field, AnyValue<'a>)>,
) -> serde_json::Value {
    let map = members
        .map(|(field, v)| (field.name().to_string(), CellValue::from_any(&v).to_json()))
        .collect();
    serde_json::Value::Object(map)
}

/// Convert a collected frame into ordered column names and typed rows.
///
/// An empty frame yields no columns: the column list is derived from the rows.
pub fn frame_to_rows(df: &DataFrame) -> PolarsResult<(Vec<String>, Vec<Vec<CellValue>>)> {
    if df.height() == 0 {
        return Ok((Vec::new(), Vec::new()));
    }
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let cols = df.get_columns();
    let mut rows = Vec::with_capacity(df.height());
    for row_index in 0..df.height() {
        let mut row = Vec::with_capacity(cols.len());
        for col in cols {
            row.push(CellValue::from_any(&col.get(row_index)?));
        }
        rows.push(row);
    }
    Ok((columns, rows))
}

/// Where a dataset's rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Every row is in memory (query results, small files).
    Local,
    /// Rows are a window over an engine table and more can be fetched.
    Engine { table: String },
}

/// The grid's data: a window of rows aligned to `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub source: DataSource,
    pub total_rows: usize,
    pub fully_loaded: bool,
    pub window_start: usize,
}

impl Dataset {
    /// A dataset holding every row of its source.
    pub fn complete(columns: Vec<String>, rows: Vec<Vec<CellValue>>, source: DataSource) -> Self {
        let total_rows = rows.len();
        Self {
            columns,
            rows,
            source,
            total_rows,
            fully_loaded: true,
            window_start: 0,
        }
    }

    /// A dataset holding `rows` starting at `window_start` out of `total_rows`.
    pub fn windowed(
        columns: Vec<String>,
        mut rows: Vec<Vec<CellValue>>,
        table: String,
        total_rows: usize,
        window_start: usize,
    ) -> Self {
        rows.truncate(total_rows.saturating_sub(window_start));
        let fully_loaded = window_start == 0 && rows.len() == total_rows;
        Self {
            columns,
            rows,
            source: DataSource::Engine { table },
            total_rows,
            fully_loaded,
            window_start,
        }
    }

    pub fn empty() -> Self {
        Self::complete(Vec::new(), Vec::new(), DataSource::Local)
    }

    /// Swap in a freshly fetched window. Columns are kept when the window is empty.
    pub fn replace_window(
        &mut self,
        columns: Vec<String>,
        mut rows: Vec<Vec<CellValue>>,
        window_start: usize,
    ) {
        rows.truncate(self.total_rows.saturating_sub(window_start));
        if !columns.is_empty() {
            self.columns = columns;
        }
        self.rows = rows;
        self.window_start = window_start;
        self.fully_loaded = window_start == 0 && self.rows.len() == self.total_rows;
    }

    /// True when rows `[start, end)` are all inside the current window.
    pub fn contains_range(&self, start: usize, end: usize) -> bool {
        start >= self.window_start && end <= self.window_start + self.rows.len()
    }

    pub fn table(&self) -> Option<&str> {
        match &self.source {
            DataSource::Engine { table } => Some(table),
            DataSource::Local => None,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// A fully materialised query result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub dataset: Dataset,
    pub elapsed_ms: u128,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.dataset.rows.len()
    }
}

/// One column of the probed schema, with its type in SQL vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaColumn {
    pub name: String,
    pub dtype: String,
}

impl SchemaColumn {
    pub fn from_field(name: &str, dtype: &DataType) -> Self {
        Self {
            name: name.to_string(),
            dtype: declared_type(dtype),
        }
    }

    pub fn type_class(&self) -> TypeClass {
        TypeClass::from_type_name(&self.dtype)
    }
}

pub fn schema_columns(schema: &Schema) -> Vec<SchemaColumn> {
    schema
        .iter()
        .map(|(name, dtype)| SchemaColumn::from_field(name.as_str(), dtype))
        .collect()
}

/// Map an engine type onto the SQL names shown in the schema panel.
pub fn declared_type(dtype: &DataType) -> String {
    match dtype {
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Int32 => "INTEGER".to_string(),
        DataType::Int64 => "BIGINT".to_string(),
        DataType::UInt32 => "UINTEGER".to_string(),
        DataType::UInt64 => "UBIGINT".to_string(),
        DataType::Int8 => "TINYINT".to_string(),
        DataType::UInt8 => "UTINYINT".to_string(),
        DataType::Int16 => "SMALLINT".to_string(),
        DataType::UInt16 => "USMALLINT".to_string(),
        d if d.is_integer() => "HUGEINT".to_string(),
        DataType::Float32 => "FLOAT".to_string(),
        DataType::Float64 => "DOUBLE".to_string(),
        DataType::String => "VARCHAR".to_string(),
        DataType::Binary => "BLOB".to_string(),
        DataType::Date => "DATE".to_string(),
        DataType::Datetime(_, None) => "TIMESTAMP".to_string(),
        DataType::Datetime(_, Some(_)) => "TIMESTAMP WITH TIME ZONE".to_string(),
        DataType::Duration(_) => "INTERVAL".to_string(),
        DataType::Time => "TIME".to_string(),
        DataType::List(inner) => format!("{}[]", declared_type(inner)),
        DataType::Null => "NULL".to_string(),
        other => other.to_string().to_uppercase(),
    }
}

/// Colour class for a declared type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Integer,
    Float,
    Text,
    Boolean,
    Temporal,
    Binary,
    List,
    Struct,
    Other,
}

impl TypeClass {
    pub fn from_type_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if lower.ends_with("[]") || has(&["list", "array"]) {
            Self::List
        } else if has(&["interval"]) {
            Self::Temporal
        } else if has(&["int"]) {
            Self::Integer
        } else if has(&["float", "double", "decimal", "numeric", "real"]) {
            Self::Float
        } else if has(&["char", "string", "text"]) {
            Self::Text
        } else if has(&["bool"]) {
            Self::Boolean
        } else if has(&["date", "time"]) {
            Self::Temporal
        } else if has(&["blob", "binary", "bytes"]) {
            Self::Binary
        } else if has(&["struct", "map", "object"]) {
            Self::Struct
        } else {
            Self::Other
        }
    }

    /// Theme colour name used for cells and schema badges of this class.
    pub fn theme_key(self) -> &'static str {
        match self {
            Self::Integer => "int_col",
            Self::Float => "float_col",
            Self::Text => "str_col",
            Self::Boolean => "bool_col",
            Self::Temporal => "temporal_col",
            Self::Binary => "binary_col",
            Self::List => "list_col",
            Self::Struct => "struct_col",
            Self::Other => "text_primary",
        }
    }
}
