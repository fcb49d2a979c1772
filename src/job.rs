//! One complete run: sign in, collect, release the session, then merge the
//! batch into every configured output.
//!
//! Only a failed sign-in aborts the run.  A source failure mid-collection
//! still merges what was gathered, and each output is merged and saved
//! independently so one bad file does not block the others.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::collector::{CollectOutcome, Collected, Collector};
use crate::config::Config;
use crate::error::{JobError, StoreError};
use crate::merge::merge;
use crate::model::Item;
use crate::source::{Session, SessionGuard, TweetSource};
use crate::store::{OutputFormat, OutputTarget};

/// What happened to one output file.
#[derive(Debug)]
pub struct OutputReport {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub result: Result<OutputStats, StoreError>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OutputStats {
    /// Items newly written by this run.
    pub added: usize,
    /// Items in the file after this run.
    pub total: usize,
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub collected: usize,
    pub outcome: CollectOutcome,
    pub outputs: Vec<OutputReport>,
}

impl RunReport {
    pub fn all_outputs_saved(&self) -> bool {
        self.outputs.iter().all(|o| o.result.is_ok())
    }
}

/// Run the job against `source` with `config`.
///
/// # Errors
///
/// Only [`JobError::Authentication`]; nothing is written in that case.
pub fn run<S: TweetSource>(config: &Config, source: &S) -> Result<RunReport, JobError> {
    let started_at = Utc::now();
    info!(stage = "start", profile = %config.profile, source = source.name(), "run started");

    let session = source
        .establish_session(&config.credentials)
        .map_err(|cause| {
            error!(stage = "login", source = source.name(), error = %cause, "could not establish session");
            JobError::Authentication {
                source_name: source.name().to_string(),
                cause,
            }
        })?;

    let mut guard = SessionGuard::new(session, source.name());
    let collected = match guard.open(&config.profile) {
        Ok(()) => Collector::new(config.policy, &config.keywords).collect(&mut *guard),
        Err(e) => {
            warn!(stage = "open", profile = %config.profile, error = %e, "could not open profile");
            Collected {
                batch: Default::default(),
                outcome: CollectOutcome::Interrupted(e),
                passes: 0,
            }
        }
    };
    if let Err(e) = guard.finish() {
        warn!(stage = "close", error = %e, "session did not close cleanly");
    }

    let batch = collected.batch.into_items();
    if batch.is_empty() {
        warn!(stage = "collect", "no matching items were found");
    } else {
        info!(
            stage = "collect",
            collected = batch.len(),
            passes = collected.passes,
            outcome = %collected.outcome,
            "collection finished"
        );
    }

    let outputs = config
        .outputs
        .iter()
        .map(|target| OutputReport {
            path: target.path.clone(),
            format: target.format,
            result: update_output(target, &batch),
        })
        .collect();

    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        collected: batch.len(),
        outcome: collected.outcome,
        outputs,
    };
    info!(
        stage = "done",
        elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
        ok = report.all_outputs_saved(),
        "run finished"
    );
    Ok(report)
}

/// Merge `batch` into one output and write it back.
fn update_output(target: &OutputTarget, batch: &[Item]) -> Result<OutputStats, StoreError> {
    let store = target.open();
    let existing = store.load_or_empty().map_err(|e| {
        error!(stage = "load", path = %target.path.display(), error = %e, "cannot read store, leaving it untouched");
        e
    })?;
    let before = existing.len();

    let merged = merge(batch, existing);
    let stats = OutputStats {
        added: merged.len() - before,
        total: merged.len(),
    };

    store.save(&merged).map_err(|e| {
        error!(stage = "save", path = %target.path.display(), error = %e, "failed to write store");
        e
    })?;
    info!(
        stage = "save",
        path = %target.path.display(),
        format = %target.format,
        added = stats.added,
        total = stats.total,
        "store updated"
    );
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
