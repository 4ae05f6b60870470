//! Diff engine and action executor for one sync run.
//!
//! The run is two phases with a clean seam between them:
//!   - [`plan`] is a pure function: it consumes the local and remote
//!     enumerations and classifies every path into a [`SyncDecision`]. Every
//!     local file yields exactly one decision; every remote-only object
//!     yields exactly one delete-or-skip decision depending on delete mode.
//!   - [`execute`] applies the decisions through an [`ObjectStore`],
//!     best-effort: a failed upload or delete is recorded on its
//!     [`ActionOutcome`] and the run continues. In dry-run mode no store
//!     call is made at all.
//!
//! # Change detection
//! A local file with a remote counterpart is re-uploaded when the sizes
//! differ, or (under the default `size-mtime` strategy) when the local mtime
//! is newer than the remote one by more than [`MTIME_TOLERANCE_SECS`]. Object
//! stores and filesystems do not share a clock, so an exact mtime comparison
//! would re-upload unchanged files after every run.
//!
//! # Error handling
//! [`execute`] never returns an error: per-file failures are data, surfaced
//! in the outcomes and counted by the reporter. Fatal conditions (failed
//! enumeration) are handled upstream by the caller.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::store::{ObjectStore, RemoteObject, StoreError};
use crate::walker::FileEntry;

/// Seconds of clock skew tolerated before an mtime difference forces an
/// upload.
pub const MTIME_TOLERANCE_SECS: i64 = 2;

/// How to decide whether an existing remote object is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Compare size, then mtime with clock-skew tolerance (default).
    SizeMtime,
    /// Compare size only; ignore mtimes entirely.
    SizeOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Upload,
    Skip,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    New,
    SizeChanged,
    TimeChanged,
    Unchanged,
    Orphaned,
}

/// One classified path: what to do with it and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncDecision {
    /// Key relative to the target prefix (equals the local relative path).
    pub key: String,
    /// Local source path; absent for remote-only objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<PathBuf>,
    /// Local mtime carried along for upload metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<i64>,
    pub action: Action,
    pub reason: Reason,
}

#[derive(Debug, Clone, Copy)]
pub struct PlanOptions {
    pub strategy: Strategy,
    /// Delete remote objects with no local counterpart.
    pub delete: bool,
}

/// A decision plus its execution result.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    #[serde(flatten)]
    pub decision: SyncDecision,
    pub dry_run: bool,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Classifies both enumerations into one decision per path.
pub fn plan(
    locals: &[FileEntry],
    remotes: &[RemoteObject],
    opts: &PlanOptions,
) -> Vec<SyncDecision> {
    let remote_by_key: BTreeMap<&str, &RemoteObject> =
        remotes.iter().map(|r| (r.key.as_str(), r)).collect();
    let local_keys: BTreeSet<&str> = locals.iter().map(|f| f.rel.as_str()).collect();

    let mut decisions = Vec::with_capacity(locals.len() + remotes.len());
    for file in locals {
        let (action, reason) = match remote_by_key.get(file.rel.as_str()) {
            None => (Action::Upload, Reason::New),
            Some(remote) => classify_pair(file, remote, opts.strategy),
        };
        decisions.push(SyncDecision {
            key: file.rel.clone(),
            local: Some(file.path.clone()),
            mtime: Some(file.mtime),
            action,
            reason,
        });
    }
    for remote in remotes {
        if local_keys.contains(remote.key.as_str()) {
            continue;
        }
        let action = if opts.delete { Action::Delete } else { Action::Skip };
        decisions.push(SyncDecision {
            key: remote.key.clone(),
            local: None,
            mtime: None,
            action,
            reason: Reason::Orphaned,
        });
    }
    info!(
        local = locals.len(),
        remote = remotes.len(),
        decisions = decisions.len(),
        "sync plan computed"
    );
    decisions
}

fn classify_pair(local: &FileEntry, remote: &RemoteObject, strategy: Strategy) -> (Action, Reason) {
    if local.size != remote.size {
        return (Action::Upload, Reason::SizeChanged);
    }
    if strategy == Strategy::SizeOnly {
        return (Action::Skip, Reason::Unchanged);
    }
    match remote.mtime {
        // No remote timestamp to compare against: treat as stale.
        None => (Action::Upload, Reason::TimeChanged),
        Some(remote_mtime) if local.mtime > remote_mtime + MTIME_TOLERANCE_SECS => {
            (Action::Upload, Reason::TimeChanged)
        }
        Some(_) => (Action::Skip, Reason::Unchanged),
    }
}

/// Applies every decision sequentially through the store.
///
/// Skips are passed through untouched; uploads and deletes call the store
/// unless `dry_run` is set. Failures never abort the loop.
pub async fn execute<S: ObjectStore>(
    store: &S,
    decisions: Vec<SyncDecision>,
    dry_run: bool,
) -> Vec<ActionOutcome> {
    let mut outcomes = Vec::with_capacity(decisions.len());
    for decision in decisions {
        let result = apply(store, &decision, dry_run).await;
        let (ok, error) = match result {
            Ok(()) => {
                debug!(key = %decision.key, action = ?decision.action, dry_run, "action applied");
                (true, None)
            }
            Err(e) => {
                error!(key = %decision.key, action = ?decision.action, error = %e, "action failed");
                (false, Some(e.to_string()))
            }
        };
        outcomes.push(ActionOutcome {
            decision,
            dry_run,
            ok,
            error,
        });
    }
    outcomes
}

async fn apply<S: ObjectStore>(
    store: &S,
    decision: &SyncDecision,
    dry_run: bool,
) -> Result<(), StoreError> {
    if dry_run {
        return Ok(());
    }
    match decision.action {
        Action::Skip => Ok(()),
        Action::Upload => match (&decision.local, decision.mtime) {
            (Some(local), Some(mtime)) => store.put_object(&decision.key, local, mtime).await,
            _ => Err("upload decision without a local source".into()),
        },
        Action::Delete => store.delete_object(&decision.key).await,
    }
}
