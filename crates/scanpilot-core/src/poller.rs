use crate::error::{LifecycleError, ScanError};
use crate::providers::ScannerApi;
use crate::request::Credentials;
use crate::severity::{evaluate, GateOutcome, SeverityThreshold};
use crate::task::{CountsSnapshot, ScanState, ScanTask};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay before every scan info request.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Severity gate verdict for one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateCheck {
    /// Gate disabled, or no counts to check yet.
    Skipped,
    Clean,
    Violation(String),
}

/// Check the latest counts against the threshold.
pub fn check_gate(task: &ScanTask, threshold: SeverityThreshold) -> GateCheck {
    if threshold == SeverityThreshold::None {
        return GateCheck::Skipped;
    }
    match &task.counts {
        CountsSnapshot::Available(counts) => match evaluate(counts, threshold) {
            GateOutcome::Pass => GateCheck::Clean,
            GateOutcome::Fail(message) => GateCheck::Violation(message),
        },
        CountsSnapshot::NotYetAvailable | CountsSnapshot::Malformed(_) => GateCheck::Skipped,
    }
}

/// How a poll loop that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Completion {
    /// The scanner reported `Complete`.
    Complete,
    /// The scan is still running remotely; waiting was not requested.
    Detached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollFailure {
    SeverityGate(String),
    Lifecycle(LifecycleError),
}

impl From<PollFailure> for ScanError {
    fn from(failure: PollFailure) -> Self {
        match failure {
            PollFailure::SeverityGate(message) => ScanError::SeverityGate(message),
            PollFailure::Lifecycle(err) => ScanError::Lifecycle(err),
        }
    }
}

/// Decision taken after each poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Continue,
    Succeed(Completion),
    Fail(PollFailure),
}

/// Combine the gate verdict with the lifecycle state.
///
/// A severity violation ends the run even while the scan is still in progress.
pub fn decide(gate: &GateCheck, state: &ScanState, wait_for_completion: bool) -> PollOutcome {
    if let GateCheck::Violation(message) = gate {
        return PollOutcome::Fail(PollFailure::SeverityGate(message.clone()));
    }

    match state {
        ScanState::Queued
        | ScanState::Scanning
        | ScanState::Archiving
        | ScanState::Delayed
        | ScanState::Pausing
        | ScanState::Paused
        | ScanState::Resuming => {
            if wait_for_completion {
                PollOutcome::Continue
            } else {
                PollOutcome::Succeed(Completion::Detached)
            }
        }
        ScanState::Complete => PollOutcome::Succeed(Completion::Complete),
        ScanState::Failed => PollOutcome::Fail(PollFailure::Lifecycle(LifecycleError::Failed)),
        ScanState::Cancelled => {
            PollOutcome::Fail(PollFailure::Lifecycle(LifecycleError::Cancelled))
        }
        ScanState::Unknown(raw) => PollOutcome::Fail(PollFailure::Lifecycle(
            LifecycleError::UnknownState(raw.clone()),
        )),
    }
}

/// Where a poll loop ended.
#[derive(Debug, Clone)]
pub struct PollReport {
    pub polls: u32,
    pub last: ScanTask,
    pub result: Result<Completion, PollFailure>,
}

/// Polls scan info on a fixed interval until the scan reaches a decision.
pub struct Poller<'a, A: ScannerApi + ?Sized> {
    api: &'a A,
    interval: Duration,
}

impl<'a, A: ScannerApi + ?Sized> Poller<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self::with_interval(api, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(api: &'a A, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Run the loop. Transport and parse failures end it with `Err`; they
    /// are not retried.
    pub async fn run(
        &self,
        scan_id: &str,
        credentials: &Credentials,
        threshold: SeverityThreshold,
        wait_for_completion: bool,
    ) -> Result<PollReport, ScanError> {
        let mut polls = 0u32;

        loop {
            tokio::time::sleep(self.interval).await;
            polls += 1;

            info!(scan_id, poll = polls, "Getting scan info...");
            let response = self
                .api
                .scan_info(scan_id, credentials)
                .await
                .map_err(|e| ScanError::transport("Error occurred during scan info retrieval", e))?;

            if !response.is_valid {
                return Err(ScanError::InfoRejected(
                    response.error_message.clone().unwrap_or_default(),
                ));
            }

            let task = response.into_task(scan_id);
            let gate = check_gate(&task, threshold);
            log_gate(&task, &gate, threshold);

            info!(scan_id = %task.scan_id, state = %task.state, "Scan status: {}", task.state);

            let result = match decide(&gate, &task.state, wait_for_completion) {
                PollOutcome::Continue => continue,
                PollOutcome::Succeed(completion) => Ok(completion),
                PollOutcome::Fail(failure) => Err(failure),
            };

            return Ok(PollReport {
                polls,
                last: task,
                result,
            });
        }
    }
}

fn log_gate(task: &ScanTask, gate: &GateCheck, threshold: SeverityThreshold) {
    match (gate, &task.counts) {
        (GateCheck::Skipped, _) if threshold == SeverityThreshold::None => {
            debug!("No vulnerability level check is performed.");
        }
        (GateCheck::Skipped, CountsSnapshot::Malformed(reason)) => {
            warn!(
                scan_id = %task.scan_id,
                %reason,
                "Severity counts are malformed; no vulnerability level check is performed."
            );
        }
        (GateCheck::Skipped, _) => {
            info!(
                scan_id = %task.scan_id,
                "Severity counts not yet available; no vulnerability level check is performed."
            );
        }
        (GateCheck::Clean, CountsSnapshot::Available(counts)) => {
            info!(
                critical = counts.critical,
                high = counts.high,
                medium = counts.medium,
                low = counts.low,
                best_practice = counts.best_practice,
                "No vulnerabilities found for the specified level: {}",
                threshold
            );
        }
        (GateCheck::Clean, _) => {}
        (GateCheck::Violation(message), _) => {
            warn!(scan_id = %task.scan_id, "{}", message);
        }
    }
}
