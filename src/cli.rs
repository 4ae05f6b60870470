//! CLI surface and orchestration.
//!
//! All business logic lives in [`walker`](crate::walker),
//! [`synchronise`](crate::synchronise) and [`report`](crate::report); this
//! module is argument exposure plus the glue that wires one run together.
//! [`run_sync`] is generic over [`ObjectStore`] so integration tests drive
//! the whole pipeline against a mock store.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::report::RunReport;
use crate::store::{ObjectStore, S3Store, S3Target};
use crate::synchronise::{execute, plan, PlanOptions, Strategy};
use crate::walker::{iter_files, ExcludeSet};

/// CLI for s3-backup: mirror a local directory tree to an S3 prefix.
#[derive(Parser)]
#[clap(
    name = "s3-backup",
    version,
    about = "Mirror a local directory tree to an S3 bucket prefix"
)]
pub struct Cli {
    /// AWS profile name (defaults to the standard credential chain).
    #[clap(long, global = true)]
    pub profile: Option<String>,

    /// AWS region override.
    #[clap(long, global = true)]
    pub region: Option<String>,

    /// Emit the run report as JSON instead of text.
    #[clap(long, global = true)]
    pub json: bool,

    /// Log level filter (trace, debug, info, warn, error).
    #[clap(long, global = true, default_value = "info")]
    pub log_level: String,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync a local folder to an S3 prefix.
    Sync {
        /// Local directory to upload.
        local_dir: PathBuf,

        /// S3 target like s3://bucket/prefix.
        s3_uri: String,

        /// Exclude pattern, repeatable (e.g. '*.log' or 'tmp/*').
        #[clap(long = "exclude")]
        excludes: Vec<String>,

        /// Show actions without uploading or deleting.
        #[clap(long)]
        dry_run: bool,

        /// Delete objects under the prefix that are not present locally.
        #[clap(long)]
        delete: bool,

        /// How to decide whether an existing object is stale.
        #[clap(long, value_enum, default_value_t = Strategy::SizeMtime)]
        strategy: Strategy,
    },
}

/// Per-run options for [`run_sync`], decoupled from clap.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub excludes: Vec<String>,
    pub dry_run: bool,
    pub delete: bool,
    pub strategy: Strategy,
}

/// Async CLI entrypoint, separate from `main` for programmatic invocation.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sync {
            local_dir,
            s3_uri,
            excludes,
            dry_run,
            delete,
            strategy,
        } => {
            let target = S3Target::parse(&s3_uri)?;
            // Validate the cheap, local half before touching AWS config.
            let local_root = local_dir.canonicalize().with_context(|| {
                format!(
                    "local_dir not found or not a directory: {}",
                    local_dir.display()
                )
            })?;
            let options = SyncOptions {
                excludes,
                dry_run,
                delete,
                strategy,
            };
            let store = S3Store::connect(
                target.clone(),
                cli.profile.as_deref(),
                cli.region.as_deref(),
            )
            .await;

            let report = run_sync(&store, &target, &local_root, &options).await?;
            if cli.json {
                println!("{}", report.render_json()?);
            } else {
                println!("{}", report.render_text());
            }
            if report.summary.failed > 0 {
                bail!("{} action(s) failed, see report", report.summary.failed);
            }
            Ok(())
        }
    }
}

/// Runs one full sync against any store: enumerate both sides, plan,
/// execute, summarise. Enumeration failures are fatal; per-file action
/// failures end up in the report.
pub async fn run_sync<S: ObjectStore>(
    store: &S,
    target: &S3Target,
    local_root: &Path,
    options: &SyncOptions,
) -> Result<RunReport> {
    let started = Instant::now();
    info!(local = %local_root.display(), target = %target, dry_run = options.dry_run, "starting sync");

    let excludes = ExcludeSet::new(&options.excludes)?;
    let locals = iter_files(local_root, &excludes)?;
    info!(files = locals.len(), "local enumeration complete");

    let remotes = store
        .list_objects()
        .await
        .map_err(|e| anyhow::anyhow!("failed to list {target}: {e}"))?;
    info!(objects = remotes.len(), "remote enumeration complete");

    let decisions = plan(
        &locals,
        &remotes,
        &PlanOptions {
            strategy: options.strategy,
            delete: options.delete,
        },
    );
    let outcomes = execute(store, decisions, options.dry_run).await;

    Ok(RunReport::new(
        target,
        local_root,
        options.dry_run,
        outcomes,
        started.elapsed(),
    ))
}
