//! Run summary aggregation and rendering (JSON or text).

use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::store::S3Target;
use crate::synchronise::{Action, ActionOutcome};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub cmd: &'static str,
    pub local_dir: String,
    pub bucket: String,
    pub prefix: String,
    pub dry_run: bool,
    pub uploaded: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub failed: usize,
    pub total_actions: usize,
    pub elapsed_secs: f64,
}

/// Full report for one run: the summary plus every mutating action.
///
/// Skip outcomes are counted in the summary but left out of `actions`, so
/// the JSON stays proportional to the work done rather than the tree size.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub actions: Vec<ActionOutcome>,
}

impl RunReport {
    pub fn new(
        target: &S3Target,
        local_dir: &Path,
        dry_run: bool,
        outcomes: Vec<ActionOutcome>,
        elapsed: Duration,
    ) -> Self {
        let mut uploaded = 0;
        let mut skipped = 0;
        let mut deleted = 0;
        let mut failed = 0;
        for outcome in &outcomes {
            if !outcome.ok {
                failed += 1;
                continue;
            }
            match outcome.decision.action {
                Action::Upload => uploaded += 1,
                Action::Skip => skipped += 1,
                Action::Delete => deleted += 1,
            }
        }
        let actions: Vec<ActionOutcome> = outcomes
            .into_iter()
            .filter(|o| o.decision.action != Action::Skip)
            .collect();
        RunReport {
            summary: RunSummary {
                cmd: "sync",
                local_dir: local_dir.display().to_string(),
                bucket: target.bucket.clone(),
                prefix: target.prefix.clone(),
                dry_run,
                uploaded,
                skipped,
                deleted,
                failed,
                total_actions: actions.len(),
                elapsed_secs: elapsed.as_secs_f64(),
            },
            actions,
        }
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let s = &self.summary;
        format!(
            "SYNC -> s3://{}/{}\nuploaded={} skipped={} deleted={} failed={} dry_run={}",
            s.bucket, s.prefix, s.uploaded, s.skipped, s.deleted, s.failed, s.dry_run
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synchronise::{Reason, SyncDecision};
    use std::path::PathBuf;

    fn outcome(key: &str, action: Action, ok: bool) -> ActionOutcome {
        ActionOutcome {
            decision: SyncDecision {
                key: key.to_string(),
                local: Some(PathBuf::from("/src").join(key)),
                mtime: Some(100),
                action,
                reason: Reason::New,
            },
            dry_run: false,
            ok,
            error: if ok { None } else { Some("boom".to_string()) },
        }
    }

    fn target() -> S3Target {
        S3Target::parse("s3://bucket/pre").unwrap()
    }

    #[test]
    fn summary_counts_by_action_and_failure() {
        let outcomes = vec![
            outcome("a.txt", Action::Upload, true),
            outcome("b.txt", Action::Upload, false),
            outcome("c.txt", Action::Skip, true),
            outcome("d.txt", Action::Delete, true),
        ];
        let report = RunReport::new(
            &target(),
            Path::new("/src"),
            false,
            outcomes,
            Duration::from_millis(1500),
        );
        let s = &report.summary;
        assert_eq!((s.uploaded, s.skipped, s.deleted, s.failed), (1, 1, 1, 1));
        // Skips are not listed as actions.
        assert_eq!(report.actions.len(), 3);
        assert_eq!(s.total_actions, 3);
        assert!(s.elapsed_secs > 1.0);
    }

    #[test]
    fn json_report_has_summary_and_action_fields() {
        let outcomes = vec![outcome("a.txt", Action::Upload, true)];
        let report = RunReport::new(
            &target(),
            Path::new("/src"),
            true,
            outcomes,
            Duration::from_secs(0),
        );
        let json = report.render_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["bucket"], "bucket");
        assert_eq!(value["summary"]["dry_run"], true);
        assert_eq!(value["summary"]["uploaded"], 1);
        assert_eq!(value["actions"][0]["key"], "a.txt");
        assert_eq!(value["actions"][0]["action"], "upload");
        assert_eq!(value["actions"][0]["reason"], "new");
        assert!(value["actions"][0].get("error").is_none());
    }

    #[test]
    fn text_report_is_one_line_summary() {
        let report = RunReport::new(
            &target(),
            Path::new("/src"),
            false,
            vec![],
            Duration::from_secs(0),
        );
        let text = report.render_text();
        assert!(text.starts_with("SYNC -> s3://bucket/pre"));
        assert!(text.contains("uploaded=0"));
        assert!(text.contains("dry_run=false"));
    }
}
