//! Structured store: a pretty-printed JSON array of items.

use std::path::PathBuf;

use super::{read_existing, replace_atomically, Store};
use crate::error::StoreError;
use crate::model::Item;

pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Store for JsonStore {
    fn load(&self) -> Result<Vec<Item>, StoreError> {
        let Some(bytes) = read_existing(&self.path)? else {
            return Ok(Vec::new());
        };
        // Blank file: nothing stored yet.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| StoreError::format(&self.path, e))
    }

    fn save(&self, items: &[Item]) -> Result<(), StoreError> {
        replace_atomically(&self.path, |out| {
            serde_json::to_writer_pretty(&mut *out, items)
                .map_err(|e| StoreError::format(&self.path, e))?;
            out.write_all(b"\n").map_err(|e| StoreError::io(&self.path, e))
        })
    }
}
