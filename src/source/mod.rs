//! Tweet source abstraction layer.
//!
//! This module defines the [`TweetSource`] and [`Session`] traits the
//! collector drives, the [`RawItem`] type they hand back, and the
//! [`SessionGuard`] that makes sure a session is closed on every exit path.
//! Concrete sources live in sub-modules (currently only [`feed`]).
//!
//! ## Ordering contract
//!
//! [`Session::list_visible_items`] must return candidates newest-first, in
//! the order the profile page renders them.  The merge engine relies on
//! this when it places a run's new items in front of the store.  A source
//! that cannot promise it needs a different merge order.
//!
//! ## Adding a new source
//!
//! 1. Create a new file in this directory (e.g. `webdriver.rs`).
//! 2. Implement [`TweetSource`] for a connector struct and [`Session`] for
//!    the live session it returns.
//! 3. Add `mod webdriver;` below and re-export the connector.
//! 4. Construct it in `main.rs` in place of [`FeedSource`].

mod feed;
mod guard;
mod raw_item;

pub use feed::FeedSource;
pub use guard::SessionGuard;
pub use raw_item::RawItem;

use std::time::Duration;

use secrecy::SecretString;

use crate::error::SourceError;

/// Login for the account the source signs in with.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Connector that can sign in and hand out a [`Session`].
pub trait TweetSource {
    type Session: Session;

    /// Human-readable label used in log lines.
    fn name(&self) -> &str;

    /// Sign in.  Fails with [`SourceError::Authentication`] if the login
    /// cannot complete within the source's session budget.
    fn establish_session(&self, credentials: &Credentials) -> Result<Self::Session, SourceError>;
}

/// A live, exclusively owned connection to the source.
///
/// Every call may block, bounded by the source's own timeouts.
pub trait Session {
    /// Navigate to the profile feed.
    fn open(&mut self, profile: &str) -> Result<(), SourceError>;

    /// Best effort wait for the first posts to render.  `false` means the
    /// budget ran out; whatever is visible can still be collected.
    fn wait_for_initial_content(&mut self, timeout: Duration) -> bool;

    /// Snapshot of the currently rendered candidates, newest first.
    fn list_visible_items(&mut self) -> Result<Vec<RawItem>, SourceError>;

    /// Ask the source to render more posts.
    fn reveal_more(&mut self) -> Result<(), SourceError>;

    /// A value that changes whenever more content became available.
    fn growth_signal(&mut self) -> Result<u64, SourceError>;

    /// Release the session.  Called exactly once, via [`SessionGuard`].
    fn close(&mut self) -> Result<(), SourceError>;
}
