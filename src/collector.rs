//! Batch collector.
//!
//! Drives a [`Session`] to build one run's [`Batch`]: pull the visible
//! candidates, keep the ones that pass the keyword filter, ask the source
//! for more, and stop once the batch is full or the source stops growing.
//!
//! ```text
//!            ┌─────────────┐  batch full   ┌───────────┐
//!   start ─► │ COLLECTING  │ ────────────► │ SATURATED │
//!            └─────────────┘               └───────────┘
//!               │       │  no growth × N   ┌───────────┐
//!               │       └────────────────► │ EXHAUSTED │
//!               │  source error            └───────────┘
//!               └────────────────────────► INTERRUPTED
//! ```
//!
//! Every terminal state hands back what was gathered so far.

use std::collections::HashSet;
use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::SourceError;
use crate::filter::KeywordFilter;
use crate::model::Item;
use crate::source::{RawItem, Session};

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// The matching items found in one run, unique by link, in first-seen
/// order.
///
/// Items with an empty link cannot be told apart by link, so within a
/// batch they are keyed by their text instead.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    items: Vec<Item>,
    links: HashSet<String>,
    unlinked: HashSet<String>,
    limit: Option<usize>,
}

impl Batch {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch that refuses items beyond `limit`.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Build a batch from a sequence of candidates.
    #[cfg(test)]
    pub fn from_raw<I>(raw: I, filter: &KeywordFilter) -> Self
    where
        I: IntoIterator<Item = RawItem>,
    {
        let mut batch = Self::new();
        batch.absorb(raw, filter);
        batch
    }

    /// Add the candidates that are valid, match the filter and are not
    /// already present.  Returns how many were added.
    pub fn absorb<I>(&mut self, raw: I, filter: &KeywordFilter) -> usize
    where
        I: IntoIterator<Item = RawItem>,
    {
        let mut added = 0;
        for candidate in raw {
            if self.is_full() {
                break;
            }
            let item = candidate.into_item();
            if item.is_valid() && filter.matches(&item.content) && self.insert(item) {
                added += 1;
            }
        }
        added
    }

    fn insert(&mut self, item: Item) -> bool {
        let fresh = match item.key() {
            Some(link) => self.links.insert(link.to_string()),
            None => self.unlinked.insert(item.content.clone()),
        };
        if fresh {
            self.items.push(item);
        }
        fresh
    }

    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.items.len() >= limit)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[cfg(test)]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Bounds on one collection run.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CollectPolicy {
    /// Stop once this many matching items are collected.
    pub max_items: usize,
    /// Stop after this many consecutive reveals with no growth.
    pub max_stagnation: u32,
    /// Pause after each reveal before measuring growth.
    pub settle_delay: Duration,
    /// Budget for the first posts to appear.
    pub initial_wait: Duration,
}

impl Default for CollectPolicy {
    fn default() -> Self {
        Self {
            max_items: 100,
            max_stagnation: 5,
            settle_delay: Duration::from_millis(2000),
            initial_wait: Duration::from_secs(90),
        }
    }
}

/// Why collection stopped.
#[derive(Debug)]
pub enum CollectOutcome {
    /// The batch reached `max_items`.
    Saturated,
    /// The source stopped growing.
    Exhausted,
    /// The source failed mid-run; the partial batch is still usable.
    Interrupted(SourceError),
}

impl fmt::Display for CollectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectOutcome::Saturated => write!(f, "saturated"),
            CollectOutcome::Exhausted => write!(f, "exhausted"),
            CollectOutcome::Interrupted(e) => write!(f, "interrupted ({e})"),
        }
    }
}

/// Result of one collection run.
#[derive(Debug)]
pub struct Collected {
    pub batch: Batch,
    pub outcome: CollectOutcome,
    /// Number of snapshot passes taken.
    pub passes: u32,
}

pub struct Collector<'a> {
    policy: CollectPolicy,
    filter: &'a KeywordFilter,
}

impl<'a> Collector<'a> {
    pub fn new(policy: CollectPolicy, filter: &'a KeywordFilter) -> Self {
        Self { policy, filter }
    }

    /// Collect from a session that has already opened the profile.
    pub fn collect<S: Session + ?Sized>(&self, session: &mut S) -> Collected {
        let mut batch = Batch::with_limit(self.policy.max_items);
        let mut passes = 0;

        if !session.wait_for_initial_content(self.policy.initial_wait) {
            warn!(
                stage = "wait",
                timeout_secs = self.policy.initial_wait.as_secs(),
                "timed out waiting for initial content, proceeding with what is visible"
            );
        }

        let mut last_growth = match session.growth_signal() {
            Ok(g) => g,
            Err(e) => return interrupted(batch, passes, "growth", e),
        };
        let mut stagnation = 0u32;

        loop {
            passes += 1;
            let visible = match session.list_visible_items() {
                Ok(v) => v,
                Err(e) => return interrupted(batch, passes, "list", e),
            };
            let seen = visible.len();
            let added = batch.absorb(visible, self.filter);
            info!(stage = "collect", pass = passes, seen, added, total = batch.len(), "processed snapshot");

            if batch.is_full() {
                info!(stage = "collect", total = batch.len(), "batch full");
                return Collected {
                    batch,
                    outcome: CollectOutcome::Saturated,
                    passes,
                };
            }

            if let Err(e) = session.reveal_more() {
                return interrupted(batch, passes, "reveal", e);
            }
            if !self.policy.settle_delay.is_zero() {
                thread::sleep(self.policy.settle_delay);
            }

            let growth = match session.growth_signal() {
                Ok(g) => g,
                Err(e) => return interrupted(batch, passes, "growth", e),
            };
            if growth == last_growth {
                stagnation += 1;
                info!(stage = "collect", attempt = stagnation, max = self.policy.max_stagnation, "no growth after reveal");
            } else {
                stagnation = 0;
            }
            last_growth = growth;

            if stagnation >= self.policy.max_stagnation {
                // Pick up anything the final reveal rendered before stopping.
                let added = match session.list_visible_items() {
                    Ok(v) => batch.absorb(v, self.filter),
                    Err(e) => return interrupted(batch, passes, "list", e),
                };
                info!(stage = "collect", total = batch.len(), added, "source exhausted");
                let outcome = if batch.is_full() {
                    CollectOutcome::Saturated
                } else {
                    CollectOutcome::Exhausted
                };
                return Collected {
                    batch,
                    outcome,
                    passes,
                };
            }
        }
    }
}

fn interrupted(batch: Batch, passes: u32, stage: &'static str, error: SourceError) -> Collected {
    warn!(stage, error = %error, kept = batch.len(), "source failed during collection, keeping partial batch");
    Collected {
        batch,
        outcome: CollectOutcome::Interrupted(error),
        passes,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;

    fn raw(text: &str, link: &str) -> RawItem {
        RawItem::complete(text, link)
    }

    fn ml_filter() -> KeywordFilter {
        KeywordFilter::new(["Day", "ML"])
    }

    fn policy(max_items: usize, max_stagnation: u32) -> CollectPolicy {
        CollectPolicy {
            max_items,
            max_stagnation,
            settle_delay: Duration::ZERO,
            initial_wait: Duration::ZERO,
        }
    }

    /// A session that reveals one scripted page per `reveal_more` call and
    /// keeps every earlier page visible.
    struct ScriptedSession {
        pages: Vec<Vec<RawItem>>,
        shown: usize,
        reveals: u32,
        fail_on_reveal: Option<u32>,
    }

    impl ScriptedSession {
        fn new(pages: Vec<Vec<RawItem>>) -> Self {
            Self {
                pages,
                shown: 1,
                reveals: 0,
                fail_on_reveal: None,
            }
        }
    }

    impl Session for ScriptedSession {
        fn open(&mut self, _profile: &str) -> Result<(), SourceError> {
            Ok(())
        }
        fn wait_for_initial_content(&mut self, _timeout: Duration) -> bool {
            !self.pages.is_empty()
        }
        fn list_visible_items(&mut self) -> Result<Vec<RawItem>, SourceError> {
            Ok(self.pages.iter().take(self.shown).flatten().cloned().collect())
        }
        fn reveal_more(&mut self) -> Result<(), SourceError> {
            self.reveals += 1;
            if self.fail_on_reveal == Some(self.reveals) {
                return Err(SourceError::Unavailable("connection reset".into()));
            }
            self.shown = (self.shown + 1).min(self.pages.len());
            Ok(())
        }
        fn growth_signal(&mut self) -> Result<u64, SourceError> {
            Ok(self.pages.iter().take(self.shown).map(Vec::len).sum::<usize>() as u64)
        }
        fn close(&mut self) -> Result<(), SourceError> {
            Ok(())
        }
    }

    #[test]
    fn batch_dedupes_by_link() {
        let batch = Batch::from_raw(
            vec![raw("Day 1 of ML", "L1"), raw("Day 1 of ML (again)", "L1")],
            &ml_filter(),
        );
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.items()[0].content, "Day 1 of ML");
    }

    #[test]
    fn batch_skips_invalid_and_non_matching() {
        let batch = Batch::from_raw(
            vec![
                raw("Day 1 of ML", "L1"),
                raw("Day 1 of coding", "L2"),
                RawItem::new(
                    Err(ExtractionError::Missing("text")),
                    Err(ExtractionError::Missing("link")),
                ),
                RawItem::new(Err(ExtractionError::Missing("text")), Ok("L3".into())),
            ],
            &ml_filter(),
        );
        let links: Vec<_> = batch.items().iter().map(|i| i.link.as_str()).collect();
        assert_eq!(links, ["L1"]);
    }

    #[test]
    fn batch_keeps_unlinked_items_once() {
        let unlinked = || RawItem::new(Ok("Day 3 of ML".into()), Err(ExtractionError::Missing("link")));
        let batch = Batch::from_raw(vec![unlinked(), unlinked()], &ml_filter());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.items()[0].link, "");
    }

    #[test]
    fn stops_when_saturated() {
        let mut session = ScriptedSession::new(vec![vec![
            raw("Day 3 of ML", "L3"),
            raw("Day 2 of ML", "L2"),
            raw("Day 1 of ML", "L1"),
        ]]);
        let filter = ml_filter();
        let collected = Collector::new(policy(2, 5), &filter).collect(&mut session);

        assert!(matches!(collected.outcome, CollectOutcome::Saturated));
        assert_eq!(collected.batch.len(), 2);
        assert_eq!(session.reveals, 0);
    }

    #[test]
    fn stops_after_consecutive_stagnation() {
        let mut session = ScriptedSession::new(vec![vec![raw("Day 1 of ML", "L1")]]);
        let filter = ml_filter();
        let collected = Collector::new(policy(100, 2), &filter).collect(&mut session);

        assert!(matches!(collected.outcome, CollectOutcome::Exhausted));
        assert_eq!(session.reveals, 2);
        assert_eq!(collected.batch.len(), 1);
    }

    #[test]
    fn growth_resets_stagnation() {
        let mut session = ScriptedSession::new(vec![
            vec![raw("Day 3 of ML", "L3")],
            vec![raw("Day 2 of ML", "L2")],
            vec![raw("Day 1 of ML", "L1")],
        ]);
        let filter = ml_filter();
        let collected = Collector::new(policy(100, 2), &filter).collect(&mut session);

        assert!(matches!(collected.outcome, CollectOutcome::Exhausted));
        // Two growing reveals, then two flat ones.
        assert_eq!(session.reveals, 4);
        let links: Vec<_> = collected.batch.items().iter().map(|i| i.link.as_str()).collect();
        assert_eq!(links, ["L3", "L2", "L1"]);
    }

    #[test]
    fn source_failure_keeps_partial_batch() {
        let mut session = ScriptedSession::new(vec![
            vec![raw("Day 2 of ML", "L2")],
            vec![raw("Day 1 of ML", "L1")],
        ]);
        session.fail_on_reveal = Some(1);
        let filter = ml_filter();
        let collected = Collector::new(policy(100, 5), &filter).collect(&mut session);

        assert!(matches!(collected.outcome, CollectOutcome::Interrupted(_)));
        assert_eq!(collected.batch.len(), 1);
    }

    #[test]
    fn empty_source_is_exhausted_not_fatal() {
        let mut session = ScriptedSession::new(vec![]);
        let filter = ml_filter();
        let collected = Collector::new(policy(10, 1), &filter).collect(&mut session);

        assert!(matches!(collected.outcome, CollectOutcome::Exhausted));
        assert!(collected.batch.is_empty());
    }
}
