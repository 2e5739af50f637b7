//! Shared CLI definitions for pqview.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::Path;

/// Which flavour of the interface to start in.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Browse a file and export it to another format
    #[default]
    Viewer,
    /// Inspect column names and types (export disabled)
    Schema,
    /// Open with the SQL editor focused
    Sql,
    /// Convert CSV, JSON or Excel to Parquet
    Convert,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Schema => "schema",
            Self::Sql => "sql",
            Self::Convert => "convert",
        }
    }

    /// Source formats the mode accepts from the intake prompt.
    pub fn accepts(self, format: SourceFormat) -> bool {
        match self {
            Self::Convert => !matches!(format, SourceFormat::Parquet),
            _ => true,
        }
    }
}

/// Input file format, detected from the extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SourceFormat {
    /// Parquet columnar format
    Parquet,
    /// Delimited text (.csv, .tsv, .txt)
    Csv,
    /// A JSON array of objects, or an object holding one
    Json,
    /// Excel / OpenDocument workbook (first sheet)
    Excel,
}

impl SourceFormat {
    /// Detect format from path extension. Returns None when extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "parquet" | "pq" => Some(Self::Parquet),
            "csv" | "tsv" | "txt" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Prefix used for engine table names of this source kind.
    pub fn table_prefix(self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Excel => "excel",
        }
    }
}

/// Output format for data exports
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Pretty-printed JSON array of objects
    #[default]
    Json,
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Excel workbook with a single "Data" sheet
    Excel,
    /// MySQL INSERT statements
    Mysql,
    /// PostgreSQL INSERT statements
    Postgres,
}

impl ExportFormat {
    pub const ALL: [Self; 6] = [
        Self::Json,
        Self::Csv,
        Self::Tsv,
        Self::Excel,
        Self::Mysql,
        Self::Postgres,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Csv => "CSV",
            Self::Tsv => "TSV",
            Self::Excel => "Excel",
            Self::Mysql => "MySQL",
            Self::Postgres => "PostgreSQL",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Excel => "xlsx",
            Self::Mysql | Self::Postgres => "sql",
        }
    }

    /// INSERT-statement formats need a table name.
    pub fn is_sql(self) -> bool {
        matches!(self, Self::Mysql | Self::Postgres)
    }

    /// Parse a config value such as "csv" or "postgres".
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "excel" | "xlsx" => Some(Self::Excel),
            "mysql" => Some(Self::Mysql),
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Compression codec for Parquet output
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ParquetCodec {
    /// Snappy - fast, moderate ratio
    #[default]
    Snappy,
    /// Zstandard - good ratio, still fast
    Zstd,
    /// Gzip - widely supported, slower
    Gzip,
    /// No compression
    Uncompressed,
}

impl ParquetCodec {
    pub const ALL: [Self; 4] = [Self::Snappy, Self::Zstd, Self::Gzip, Self::Uncompressed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snappy => "snappy",
            Self::Zstd => "zstd",
            Self::Gzip => "gzip",
            Self::Uncompressed => "uncompressed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "snappy" => Some(Self::Snappy),
            "zstd" => Some(Self::Zstd),
            "gzip" => Some(Self::Gzip),
            "uncompressed" | "none" => Some(Self::Uncompressed),
            _ => None,
        }
    }
}

/// Command-line arguments for pqview
#[derive(Clone, Parser, Debug, Default)]
#[command(
    name = "pqview",
    version,
    about = "View, query, export and convert tabular data in the terminal",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Path to the data file to open. When omitted, the intake prompt asks for one.
    #[arg(value_name = "PATH")]
    pub path: Option<std::path::PathBuf>,

    /// Interface flavour to start in
    #[arg(long = "mode", value_enum)]
    pub mode: Option<ViewMode>,

    /// Delimiter for delimited text: auto, comma, semicolon, tab, pipe, or a single character
    #[arg(long = "delimiter", value_name = "DELIM")]
    pub delimiter: Option<String>,

    /// Specify that the delimited file has no header row
    #[arg(long = "no-header", action)]
    pub no_header: bool,

    /// Treat this string as null when reading delimited text. Repeatable. Replaces the default list.
    #[arg(long = "null-value", value_name = "VAL")]
    pub null_value: Vec<String>,

    /// Read every delimited column as text (no type inference)
    #[arg(long = "all-varchar", action)]
    pub all_varchar: bool,

    /// Number of rows used to infer delimited column types (default: 1000)
    #[arg(long = "infer-schema-length", value_name = "N")]
    pub infer_schema_length: Option<usize>,

    /// Rows per page in the grid
    #[arg(long = "page-size", value_name = "N")]
    pub page_size: Option<usize>,

    /// Export format for --export-to and the default in the export dialog
    #[arg(long = "export-format", value_enum)]
    pub export_format: Option<ExportFormat>,

    /// Export the data to this path and exit without starting the interface
    #[arg(long = "export-to", value_name = "PATH")]
    pub export_to: Option<std::path::PathBuf>,

    /// Table name used in INSERT statements (default: derived from the export file name)
    #[arg(long = "table-name", value_name = "NAME")]
    pub table_name: Option<String>,

    /// With --export-to, export the result of this SQL query instead of the whole file. `{table}` stands for the loaded table
    #[arg(long = "query", value_name = "SQL", requires = "export_to")]
    pub query: Option<String>,

    /// Parquet compression codec for conversion
    #[arg(long = "compression", value_enum)]
    pub compression: Option<ParquetCodec>,

    /// Convert the file to Parquet inside this directory and exit
    #[arg(long = "convert-to", value_name = "DIR", conflicts_with = "export_to")]
    pub convert_to: Option<std::path::PathBuf>,

    /// Directory that exports and conversions are written to (default: current directory)
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<std::path::PathBuf>,

    /// Use the streaming engine when collecting results (default: auto-detect)
    #[arg(long = "streaming", value_name = "BOOL", value_parser = clap::value_parser!(bool))]
    pub streaming: Option<bool>,

    /// Enable debug mode to show operational information
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Clear all cache data and exit
    #[arg(long = "clear-cache", action)]
    pub clear_cache: bool,

    /// Generate default configuration file at ~/.config/pqview/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn value_placeholder(arg: &clap::Arg) -> String {
    arg.get_value_names()
        .map(|names| {
            names
                .iter()
                .map(|n| format!("<{}>", n.as_str()))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Render command-line options as markdown.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    out.push_str(&cmd.render_usage().to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_str();
        if id == "help" || id == "version" {
            continue;
        }

        let option_str = if arg.is_positional() {
            let placeholder = value_placeholder(arg);
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            let placeholder = if arg.get_action().takes_values() {
                value_placeholder(arg)
            } else {
                String::new()
            };
            if placeholder.is_empty() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_format_from_path() {
        assert_eq!(
            SourceFormat::from_path(Path::new("data.parquet")),
            Some(SourceFormat::Parquet)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("data.TSV")),
            Some(SourceFormat::Csv)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("book.xlsx")),
            Some(SourceFormat::Excel)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("rows.json")),
            Some(SourceFormat::Json)
        );
        assert_eq!(SourceFormat::from_path(Path::new("notes")), None);
        assert_eq!(SourceFormat::from_path(Path::new("image.png")), None);
    }

    #[test]
    fn test_convert_mode_rejects_parquet() {
        assert!(!ViewMode::Convert.accepts(SourceFormat::Parquet));
        assert!(ViewMode::Convert.accepts(SourceFormat::Excel));
        assert!(ViewMode::Viewer.accepts(SourceFormat::Parquet));
    }

    #[test]
    fn test_export_format_names() {
        assert_eq!(ExportFormat::from_name("PostgreSQL"), Some(ExportFormat::Postgres));
        assert_eq!(ExportFormat::from_name("xlsx"), Some(ExportFormat::Excel));
        assert_eq!(ExportFormat::from_name("yaml"), None);
        assert_eq!(ExportFormat::Mysql.extension(), "sql");
        assert!(ExportFormat::Postgres.is_sql());
        assert!(!ExportFormat::Tsv.is_sql());
    }

    #[test]
    fn test_parquet_codec_names() {
        for codec in ParquetCodec::ALL {
            assert_eq!(ParquetCodec::from_name(codec.as_str()), Some(codec));
        }
        assert_eq!(ParquetCodec::default(), ParquetCodec::Snappy);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "pqview",
            "data.csv",
            "--delimiter",
            ";",
            "--null-value",
            "NA",
            "--null-value",
            "-",
            "--export-to",
            "out.json",
        ])
        .unwrap();
        assert_eq!(args.path.as_deref(), Some(Path::new("data.csv")));
        assert_eq!(args.delimiter.as_deref(), Some(";"));
        assert_eq!(args.null_value, vec!["NA".to_string(), "-".to_string()]);
        assert!(args.export_to.is_some());
    }

    #[test]
    fn test_query_requires_export_to() {
        assert!(Args::try_parse_from(["pqview", "a.parquet", "--query", "SELECT 1"]).is_err());
    }

    #[test]
    fn test_render_options_markdown() {
        let md = render_options_markdown();
        assert!(md.contains("--export-to"));
        assert!(md.contains("--compression"));
        assert!(!md.contains("`--help`"));
    }
}
