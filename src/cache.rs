use color_eyre::Result;
use fs2::FileExt;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// History ids stored in the cache directory.
pub const SQL_HISTORY: &str = "sql";
pub const PATH_HISTORY: &str = "paths";

/// Registry of known cache files
const CACHE_FILES: &[&str] = &["sql_history.txt", "paths_history.txt"];

/// Manages cache directory and cache file operations
#[derive(Clone)]
pub struct CacheManager {
    pub(crate) cache_dir: PathBuf,
}

impl CacheManager {
    /// Create a new CacheManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine cache directory"))?
            .join(app_name);

        Ok(Self { cache_dir })
    }

    /// Cache manager rooted at `cache_dir` (tests, temp fallback)
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get path to a specific cache file
    pub fn cache_file(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    pub fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Clear a specific cache file
    pub fn clear_file(&self, filename: &str) -> Result<()> {
        let file_path = self.cache_file(filename);
        if file_path.exists() {
            fs::remove_file(&file_path)?;
        }
        Ok(())
    }

    /// Clear all registered cache files. The log file is left alone.
    pub fn clear_all(&self) -> Result<()> {
        for filename in CACHE_FILES {
            let file_path = self.cache_file(filename);
            if file_path.exists() {
                if let Err(e) = fs::remove_file(&file_path) {
                    eprintln!("Warning: Could not remove cache file {}: {}", filename, e);
                }
            }
        }

        Ok(())
    }

    fn history_file(&self, history_id: &str) -> PathBuf {
        self.cache_file(&format!("{}_history.txt", history_id))
    }

    /// Entries of a history, oldest first. Multi-line entries are unescaped.
    pub fn load_history(&self, history_id: &str) -> Result<Vec<String>> {
        let history_file = self.history_file(history_id);
        if !history_file.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&history_file)?);
        let mut history = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                history.push(unescape_history_line(&line));
            }
        }
        Ok(history)
    }

    /// Write the most recent `limit` entries under an exclusive lock.
    pub fn save_history(&self, history_id: &str, history: &[String], limit: usize) -> Result<()> {
        self.ensure_cache_dir()?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.history_file(history_id))?;

        FileExt::lock_exclusive(&file)?;
        let start = history.len().saturating_sub(limit);
        for entry in history.iter().skip(start) {
            writeln!(file, "{}", escape_history_line(entry))?;
        }
        file.flush()?;
        FileExt::unlock(&file)?;
        Ok(())
    }
}

/// One entry per line: backslashes and line breaks are escaped.
pub fn escape_history_line(entry: &str) -> String {
    entry
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "")
}

pub fn unescape_history_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
