//! tweet-digest: collects keyword-matching posts from one profile and keeps
//! a newest-first history of them on disk.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐ RawItem ┌──────────────┐  Batch  ┌──────────┐  Vec<Item>  ┌──────────┐
//! │ source/   │ ──────► │ collector.rs │ ──────► │ merge.rs │ ──────────► │  store/  │
//! │ (session) │         │ (+filter.rs) │         │          │ ◄────────── │ csv/json │
//! └───────────┘         └──────────────┘         └──────────┘  load()     └──────────┘
//! ```
//!
//! * **`source/`**: the `TweetSource` / `Session` traits and the feed-mirror
//!   implementation, plus the guard that always closes the session.
//! * **`collector`**: pulls snapshots, filters, dedupes and decides when to stop.
//! * **`filter`**: the all-keywords, case-insensitive match.
//! * **`merge`**: folds a batch into stored history without reordering it.
//! * **`store/`**: whole-file CSV and JSON adapters with atomic replace.
//! * **`job`**: one run end to end; **`config`**: everything it needs.
//! * **`main`**: logging setup, config, run, exit status.
//!
//! Scheduling is left to the caller (cron, a systemd timer, CI).

mod collector;
mod config;
mod error;
mod filter;
mod job;
mod merge;
mod model;
mod source;
mod store;

use anyhow::{bail, Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use source::FeedSource;

/// Log filter used when `RUST_LOG` is unset or unparseable.
const DEFAULT_LOG_FILTER: &str = "tweet_digest=info";

/// `RUST_LOG` replaces the default filter entirely.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn main() -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let source = FeedSource::new(
        &config.feed_base_url,
        config.request_timeout,
        config.session_timeout,
    );

    let report = job::run(&config, &source)?;

    for out in &report.outputs {
        match &out.result {
            Ok(stats) => info!(
                path = %out.path.display(),
                format = %out.format,
                added = stats.added,
                total = stats.total,
                "output up to date"
            ),
            Err(e) => error!(path = %out.path.display(), error = %e, "output not updated"),
        }
    }
    info!(
        collected = report.collected,
        outcome = %report.outcome,
        "daily update completed"
    );

    if !report.all_outputs_saved() {
        bail!("one or more outputs could not be updated");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn default_filter_is_info() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn rust_log_can_raise_crate_verbosity() {
        let filter = log_filter(Some("tweet_digest=debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn bad_rust_log_falls_back_to_default() {
        let filter = log_filter(Some("tweet_digest=loud"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }
}
