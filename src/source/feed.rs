//! Feed-mirror tweet source.
//!
//! Reads a profile's RSS rendition from a feed mirror (a Nitter-style
//! front end that serves `{base}/{profile}/rss`).  Each page of the feed
//! plays the part of one screenful of the profile page: the first page is
//! what is "visible" after navigation, and [`Session::reveal_more`] fetches
//! the next older page through the mirror's pagination cursor.
//!
//! ## Pagination
//!
//! The mirror answers every feed request with a `Min-Id` header.  Passing
//! it back as `?cursor=<min-id>` yields the next page.  A missing or
//! repeated cursor means the feed is exhausted; the growth signal then
//! stops changing and the collector stagnates out.

use std::time::{Duration, Instant};

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use super::{Credentials, RawItem, Session, TweetSource};
use crate::error::{ExtractionError, SourceError};

/// Response header carrying the cursor for the next page.
const CURSOR_HEADER: &str = "min-id";

/// Pause between attempts while waiting for the first page.
const INITIAL_RETRY: Duration = Duration::from_secs(1);

/// A feed-mirror data source.
pub struct FeedSource {
    /// Mirror base URL, without trailing slash.
    base_url: String,
    /// Budget for each feed request.
    request_timeout: Duration,
    /// Budget for the sign-in probe.
    session_timeout: Duration,
}

impl FeedSource {
    /// Create a new feed source.
    ///
    /// # Arguments
    ///
    /// * `base_url`: mirror root, e.g. `https://nitter.example.org`.
    /// * `request_timeout`: per-request budget while collecting.
    /// * `session_timeout`: budget for establishing the session.
    pub fn new(base_url: &str, request_timeout: Duration, session_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
            session_timeout,
        }
    }

    /// Parse an already-fetched [`rss::Channel`] into [`RawItem`]s.
    ///
    /// This is a pure function (no I/O) so that tests can exercise the
    /// parsing logic without hitting the network.  The title carries the
    /// plain post text; the description (HTML) is only a fallback.
    pub fn parse_channel(channel: &rss::Channel) -> Vec<RawItem> {
        channel
            .items()
            .iter()
            .map(|item| {
                let text = non_empty(item.title())
                    .or_else(|| non_empty(item.description()))
                    .ok_or(ExtractionError::Missing("text"));

                let link = non_empty(item.link())
                    .or_else(|| non_empty(item.guid().map(|g| g.value())))
                    .ok_or(ExtractionError::Missing("link"))
                    .and_then(absolute_link);

                RawItem::new(text, link)
            })
            .collect()
    }
}

/// Permalinks must be absolute URLs; a bare guid is not one.
fn absolute_link(link: String) -> Result<String, ExtractionError> {
    match Url::parse(&link) {
        Ok(_) => Ok(link),
        Err(e) => Err(ExtractionError::Unreadable {
            field: "link",
            reason: format!("`{link}` is not an absolute URL: {e}"),
        }),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

impl TweetSource for FeedSource {
    type Session = FeedSession;

    fn name(&self) -> &str {
        &self.base_url
    }

    fn establish_session(&self, credentials: &Credentials) -> Result<FeedSession, SourceError> {
        let client = Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| SourceError::Authentication(e.to_string()))?;

        let resp = client
            .get(&self.base_url)
            .basic_auth(&credentials.username, Some(credentials.password.expose_secret()))
            .timeout(self.session_timeout)
            .send()
            .map_err(|e| SourceError::Authentication(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SourceError::Authentication(format!(
                "credentials rejected (status {})",
                status.as_u16()
            )));
        }
        if status.is_server_error() {
            return Err(SourceError::Authentication(format!(
                "mirror not ready (status {})",
                status.as_u16()
            )));
        }

        info!(stage = "login", source = %self.base_url, user = %credentials.username, "session established");
        Ok(FeedSession {
            client,
            base_url: self.base_url.clone(),
            username: credentials.username.clone(),
            password: SecretString::from(credentials.password.expose_secret().to_owned()),
            feed_url: None,
            items: Vec::new(),
            cursor: None,
            first_page_loaded: false,
        })
    }
}

/// A signed-in session against the mirror.
pub struct FeedSession {
    client: Client,
    base_url: String,
    username: String,
    password: SecretString,
    /// Set by [`Session::open`].
    feed_url: Option<String>,
    /// Every candidate loaded so far, newest first.
    items: Vec<RawItem>,
    /// Cursor for the next older page, if the mirror offered one.
    cursor: Option<String>,
    first_page_loaded: bool,
}

impl FeedSession {
    fn request(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
    }

    /// Fetch one page and append its items.  Returns how many were added.
    fn fetch_page(&mut self, cursor: Option<String>) -> Result<usize, SourceError> {
        let url = self
            .feed_url
            .clone()
            .ok_or_else(|| SourceError::Unavailable("no profile opened".into()))?;

        let mut req = self.request(&url);
        if let Some(c) = &cursor {
            req = req.query(&[("cursor", c.as_str())]);
        }
        let resp = req.send()?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let next = resp
            .headers()
            .get(CURSOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .filter(|next| Some(next) != cursor.as_ref());

        let body = resp.bytes()?;
        let channel = rss::Channel::read_from(body.as_ref())?;
        let page = FeedSource::parse_channel(&channel);
        let added = page.len();

        self.items.extend(page);
        self.cursor = next;
        self.first_page_loaded = true;
        debug!(stage = "fetch", url = %url, added, more = self.cursor.is_some(), "feed page loaded");
        Ok(added)
    }
}

impl Session for FeedSession {
    fn open(&mut self, profile: &str) -> Result<(), SourceError> {
        let profile = profile.trim_start_matches('@');
        let url = format!("{}/{}/rss", self.base_url, profile);
        info!(stage = "open", url = %url, "navigating to profile feed");
        self.feed_url = Some(url);
        self.items.clear();
        self.cursor = None;
        self.first_page_loaded = false;
        Ok(())
    }

    fn wait_for_initial_content(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.items.is_empty() {
                return true;
            }
            if self.feed_url.is_none() {
                return false;
            }
            match self.fetch_page(None) {
                Ok(n) if n > 0 => return true,
                Ok(_) => debug!(stage = "wait", "first page empty, retrying"),
                Err(e) => debug!(stage = "wait", error = %e, "first page not ready, retrying"),
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(INITIAL_RETRY.min(deadline - now));
        }
    }

    fn list_visible_items(&mut self) -> Result<Vec<RawItem>, SourceError> {
        Ok(self.items.clone())
    }

    fn reveal_more(&mut self) -> Result<(), SourceError> {
        if !self.first_page_loaded {
            self.fetch_page(None)?;
            return Ok(());
        }
        match self.cursor.take() {
            Some(cursor) => {
                self.fetch_page(Some(cursor))?;
            }
            None => debug!(stage = "reveal", "no further pages"),
        }
        Ok(())
    }

    fn growth_signal(&mut self) -> Result<u64, SourceError> {
        Ok(self.items.len() as u64)
    }

    fn close(&mut self) -> Result<(), SourceError> {
        if self.feed_url.take().is_none() {
            warn!(stage = "close", "closing a session that never opened a profile");
        }
        self.items.clear();
        self.cursor = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
