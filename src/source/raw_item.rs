//! Candidate posts as the source hands them over.
//!
//! A `RawItem` carries one extraction result per field.  Either field can
//! fail on its own; the collector turns the pair into an [`Item`] with the
//! failed field left empty and then applies the validity rule.

use tracing::debug;

use crate::error::ExtractionError;
use crate::model::Item;

/// Result of reading one field from a rendered post.
pub type Extracted = Result<String, ExtractionError>;

/// One candidate post, not yet validated or filtered.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawItem {
    pub text: Extracted,
    pub link: Extracted,
}

impl RawItem {
    pub fn new(text: Extracted, link: Extracted) -> Self {
        Self { text, link }
    }

    /// Both fields extracted successfully.
    #[cfg(test)]
    pub fn complete(text: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            text: Ok(text.into()),
            link: Ok(link.into()),
        }
    }

    /// Convert into an [`Item`], blanking any field that failed to extract.
    /// The result may be invalid; see [`Item::is_valid`].
    pub fn into_item(self) -> Item {
        Item {
            content: field_or_empty(self.text),
            link: field_or_empty(self.link),
        }
    }
}

fn field_or_empty(field: Extracted) -> String {
    field.unwrap_or_else(|err| {
        debug!(stage = "extract", error = %err, "field extraction failed, treating as empty");
        String::new()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
