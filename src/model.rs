//! The record type shared by the collector, the merge engine and the stores.
//!
//! An [`Item`] is one scraped post: its text and its permalink.  The
//! permalink doubles as the identity key: two items with the same non-empty
//! link are the same post, whatever their text says.
//!
//! ## Serialized shape
//!
//! Both stores write the content field first and the link field second,
//! under the names `Tweet` and `Link`.  Existing files produced by earlier
//! runs use those names, so they are part of the on-disk contract.

use serde::{Deserialize, Serialize};

/// A single scraped post.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Text body of the post.  Empty if extraction failed.
    #[serde(rename = "Tweet")]
    pub content: String,

    /// Permalink of the post.  Empty if extraction failed; such items are
    /// never matched against stored items.
    #[serde(rename = "Link")]
    pub link: String,
}

impl Item {
    pub fn new(content: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link: link.into(),
        }
    }

    /// An item is worth evaluating only if at least one field survived
    /// extraction.
    pub fn is_valid(&self) -> bool {
        !self.content.is_empty() || !self.link.is_empty()
    }

    /// The deduplication key, or `None` when the link is empty.
    pub fn key(&self) -> Option<&str> {
        if self.link.is_empty() {
            None
        } else {
            Some(&self.link)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
