pub mod actions;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod providers;
pub mod redact;
pub mod report;
pub mod request;
pub mod severity;
pub mod submit;
pub mod task;

pub use error::{LifecycleError, ScanError, SubmissionError, ValidationError};
pub use orchestrator::{Orchestrator, RunOptions, RunOutcome, RunSummary};
pub use providers::{HttpScannerClient, ScannerApi};
pub use report::{ArtifactStore, LocalArtifactStore};
pub use request::{BuildProvenance, ScanInputs, ScanType};
pub use severity::{Severity, SeverityCounts, SeverityThreshold};
pub use task::{ScanState, ScanTask};
