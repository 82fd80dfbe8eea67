use crate::error::{ScanError, ValidationError};
use crate::poller::{Completion, PollFailure, Poller, DEFAULT_POLL_INTERVAL};
use crate::providers::{status_page_url, ScannerApi};
use crate::report::{fetch_report, ArtifactStore, ReportArtifact};
use crate::request::{build, BuildProvenance, ScanInputs};
use crate::severity::{SeverityCounts, SeverityThreshold};
use crate::submit::submit;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Knobs that are not part of the scan inputs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub poll_interval: Duration,
    pub download_report: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            download_report: true,
        }
    }
}

/// Everything known about a run when it ended.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scan_id: Option<String>,
    pub status_url: Option<String>,
    pub threshold: Option<SeverityThreshold>,
    pub polls: u32,
    pub last_state: Option<String>,
    pub counts: Option<SeverityCounts>,
    pub completion: Option<Completion>,
    pub report: Option<ReportArtifact>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn started() -> Self {
        let now = Utc::now();
        Self {
            scan_id: None,
            status_url: None,
            threshold: None,
            polls: 0,
            last_state: None,
            counts: None,
            completion: None,
            report: None,
            started_at: now,
            finished_at: now,
        }
    }

    /// The `scan-message` step output.
    pub fn scan_message(&self) -> Option<String> {
        self.status_url
            .as_ref()
            .map(|url| format!("Scan details are available at {}", url))
    }

    pub fn elapsed_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Result of one orchestration run.
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub error: Option<ScanError>,
    /// Problems that did not change the outcome.
    pub warnings: Vec<String>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// 0 on success, otherwise the failure category's negative code.
    pub fn status_code(&self) -> i32 {
        self.error.as_ref().map_or(0, ScanError::status_code)
    }
}

/// Runs validate → submit → poll → report for one scan.
pub struct Orchestrator<'a, A: ScannerApi + ?Sized, S: ArtifactStore + ?Sized> {
    api: &'a A,
    store: &'a S,
    options: RunOptions,
}

impl<'a, A, S> Orchestrator<'a, A, S>
where
    A: ScannerApi + ?Sized,
    S: ArtifactStore + ?Sized,
{
    pub fn new(api: &'a A, store: &'a S, options: RunOptions) -> Self {
        Self {
            api,
            store,
            options,
        }
    }

    pub async fn run(&self, inputs: &ScanInputs, provenance: BuildProvenance) -> RunOutcome {
        let mut summary = RunSummary::started();
        let mut warnings = Vec::new();

        let error = self
            .execute(inputs, provenance, &mut summary, &mut warnings)
            .await
            .err();

        summary.finished_at = Utc::now();
        RunOutcome {
            summary,
            error,
            warnings,
        }
    }

    async fn execute(
        &self,
        inputs: &ScanInputs,
        provenance: BuildProvenance,
        summary: &mut RunSummary,
        warnings: &mut Vec<String>,
    ) -> Result<(), ScanError> {
        if inputs.base_url.is_empty() {
            return Err(ValidationError::MissingBaseUrl.into());
        }

        let submission = build(inputs, provenance)?;
        info!("Inputs are valid.");
        summary.threshold = Some(submission.threshold);

        let scan_id = submit(self.api, &submission).await?;
        let status_url = status_page_url(&inputs.base_url, &scan_id);
        info!(scan_id = %scan_id, "Scan details are available at {}", status_url);
        summary.scan_id = Some(scan_id.clone());
        summary.status_url = Some(status_url);

        let poll = Poller::with_interval(self.api, self.options.poll_interval)
            .run(
                &scan_id,
                &submission.credentials,
                submission.threshold,
                submission.wait_for_completion,
            )
            .await?;

        summary.polls = poll.polls;
        summary.last_state = Some(poll.last.state.to_string());
        summary.counts = poll.last.counts.counts().copied();
        summary.completion = poll.result.as_ref().ok().copied();

        let wants_report = matches!(
            poll.result,
            Ok(Completion::Complete) | Err(PollFailure::SeverityGate(_))
        );

        if self.options.download_report && wants_report {
            match fetch_report(self.api, self.store, &scan_id, &submission.credentials).await {
                Ok(artifact) => summary.report = Some(artifact),
                // The scan outcome takes precedence over a failed download.
                Err(err) if poll.result.is_err() => {
                    warn!(scan_id = %scan_id, "{}", err);
                    warnings.push(err.to_string());
                }
                Err(err) => return Err(err),
            }
        }

        match poll.result {
            Ok(Completion::Complete) => info!(scan_id = %scan_id, "Scan completed."),
            Ok(Completion::Detached) => info!(
                scan_id = %scan_id,
                "Not waiting for completion; scan continues on the scanner."
            ),
            Err(failure) => return Err(failure.into()),
        }

        info!("Done.");
        Ok(())
    }
}
