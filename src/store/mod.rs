//! Persistence adapters.
//!
//! A store reads the whole history and writes the whole history; there is
//! no append.  Two formats are supported:
//!
//! * [`CsvStore`]: tabular, a `Tweet,Link` header row then one row per item.
//! * [`JsonStore`]: structured, an array of `{"Tweet": .., "Link": ..}`.
//!
//! Writes go to a temporary file in the target directory which is then
//! renamed over the old file, so a crash mid-write leaves the previous
//! contents intact.

mod csv;
mod json;

pub use self::csv::CsvStore;
pub use self::json::JsonStore;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tempfile::NamedTempFile;
use tracing::error;

use crate::error::StoreError;
use crate::model::Item;

/// Read-all / write-all access to a persisted item list.
pub trait Store {
    /// Load every stored item.  A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// [`StoreError::Format`] if the file exists but cannot be parsed,
    /// [`StoreError::Io`] if it cannot be read.
    fn load(&self) -> Result<Vec<Item>, StoreError>;

    /// Replace the stored items with `items`.
    fn save(&self, items: &[Item]) -> Result<(), StoreError>;

    /// Like [`load`](Store::load), but an unparseable file reads as empty.
    ///
    /// I/O errors still propagate: overwriting a file we could not read
    /// would lose its history.
    fn load_or_empty(&self) -> Result<Vec<Item>, StoreError> {
        match self.load() {
            Err(StoreError::Format { path, message }) => {
                error!(
                    stage = "load",
                    path = %path.display(),
                    %message,
                    "store is unparseable, treating it as empty; previously seen items may be re-added"
                );
                Ok(Vec::new())
            }
            other => other,
        }
    }
}

/// On-disk format of a store.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputFormat {
    Tabular,
    Structured,
}

impl OutputFormat {
    /// `.json` files are structured; everything else is tabular.
    pub fn infer(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Structured,
            _ => OutputFormat::Tabular,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tabular" | "csv" => Ok(OutputFormat::Tabular),
            "structured" | "json" => Ok(OutputFormat::Structured),
            other => Err(format!("unknown output format `{other}` (expected tabular or structured)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Tabular => write!(f, "tabular"),
            OutputFormat::Structured => write!(f, "structured"),
        }
    }
}

/// A store location plus its format.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub format: OutputFormat,
}

impl OutputTarget {
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Target whose format follows the file extension.
    pub fn inferred(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = OutputFormat::infer(&path);
        Self { path, format }
    }

    /// Open the matching adapter.
    pub fn open(&self) -> Box<dyn Store> {
        match self.format {
            OutputFormat::Tabular => Box::new(CsvStore::new(&self.path)),
            OutputFormat::Structured => Box::new(JsonStore::new(&self.path)),
        }
    }
}

/// Read a file, mapping "not found" to `None`.
fn read_existing(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Write `path` by filling a sibling temp file and renaming it into place.
fn replace_atomically<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), StoreError>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    write(tmp.as_file_mut())?;
    tmp.as_file_mut()
        .sync_all()
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    // The replacement keeps the mode of the file it replaces.
    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
    }
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
