//! Tabular store: one header row, then `content,link` per item.

use std::path::PathBuf;

use super::{read_existing, replace_atomically, Store};
use crate::error::StoreError;
use crate::model::Item;

/// Header row written at the top of every file.
const HEADER: [&str; 2] = ["Tweet", "Link"];

pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse file contents.  The first row is the header and is skipped
    /// whatever it says; rows are read positionally.
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Item>, StoreError> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let mut items = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| StoreError::format(&self.path, e))?;
            let (Some(content), Some(link)) = (record.get(0), record.get(1)) else {
                return Err(StoreError::format(
                    &self.path,
                    format!("row {} has {} field(s), expected 2", row + 2, record.len()),
                ));
            };
            items.push(Item::new(content, link));
        }
        Ok(items)
    }
}

impl Store for CsvStore {
    fn load(&self) -> Result<Vec<Item>, StoreError> {
        match read_existing(&self.path)? {
            Some(bytes) => self.parse(&bytes),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, items: &[Item]) -> Result<(), StoreError> {
        replace_atomically(&self.path, |out| {
            let mut writer = ::csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(out);
            let to_err = |e: ::csv::Error| StoreError::format(&self.path, e);

            writer.write_record(HEADER).map_err(to_err)?;
            for item in items {
                writer
                    .write_record([item.content.as_str(), item.link.as_str()])
                    .map_err(to_err)?;
            }
            writer
                .flush()
                .map_err(|e| StoreError::io(&self.path, e))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
