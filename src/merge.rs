//! Merge engine.
//!
//! Reconciles a freshly collected batch with the stored history.  The
//! stored items are never reordered or dropped; new items are placed in
//! front of them as one block.
//!
//! The source lists posts newest-first, so the batch arrives newest-first
//! too.  The batch is walked in reverse before the duplicate check, which
//! puts the block in front of the store in oldest-of-the-batch-first order.

use std::collections::HashSet;

use crate::model::Item;

/// Merge `batch` (first-seen order) into `store`.
///
/// Batch items with an empty link, or whose link is already stored or was
/// already accepted earlier in this pass, are dropped.  Merging a batch
/// whose links are all stored returns `store` unchanged.
pub fn merge(batch: &[Item], store: Vec<Item>) -> Vec<Item> {
    let mut seen: HashSet<&str> = store.iter().filter_map(Item::key).collect();

    let mut accepted: Vec<Item> = Vec::new();
    for item in batch.iter().rev() {
        let Some(key) = item.key() else { continue };
        if seen.insert(key) {
            accepted.push(item.clone());
        }
    }

    if accepted.is_empty() {
        return store;
    }
    accepted.extend(store);
    accepted
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
