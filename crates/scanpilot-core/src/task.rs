use crate::severity::SeverityCounts;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a remote scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanState {
    Queued,
    Scanning,
    Archiving,
    Delayed,
    Pausing,
    Paused,
    Resuming,
    Complete,
    Failed,
    Cancelled,
    /// A state string this client does not know about.
    Unknown(String),
}

impl ScanState {
    /// True while the scanner is still working on the scan.
    pub fn is_ongoing(&self) -> bool {
        match self {
            ScanState::Queued
            | ScanState::Scanning
            | ScanState::Archiving
            | ScanState::Delayed
            | ScanState::Pausing
            | ScanState::Paused
            | ScanState::Resuming => true,
            ScanState::Complete
            | ScanState::Failed
            | ScanState::Cancelled
            | ScanState::Unknown(_) => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ScanState::Queued => "Queued",
            ScanState::Scanning => "Scanning",
            ScanState::Archiving => "Archiving",
            ScanState::Delayed => "Delayed",
            ScanState::Pausing => "Pausing",
            ScanState::Paused => "Paused",
            ScanState::Resuming => "Resuming",
            ScanState::Complete => "Complete",
            ScanState::Failed => "Failed",
            ScanState::Cancelled => "Cancelled",
            ScanState::Unknown(s) => s.as_str(),
        }
    }
}

impl From<&str> for ScanState {
    fn from(s: &str) -> Self {
        match s {
            "Queued" => ScanState::Queued,
            "Scanning" => ScanState::Scanning,
            "Archiving" => ScanState::Archiving,
            "Delayed" => ScanState::Delayed,
            "Pausing" => ScanState::Pausing,
            "Paused" => ScanState::Paused,
            "Resuming" => ScanState::Resuming,
            "Complete" => ScanState::Complete,
            "Failed" => ScanState::Failed,
            "Cancelled" => ScanState::Cancelled,
            other => ScanState::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the latest poll said about vulnerability counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountsSnapshot {
    Available(SeverityCounts),
    /// The scanner has not produced counts yet.
    NotYetAvailable,
    /// Counts were present but could not be read.
    Malformed(String),
}

impl CountsSnapshot {
    pub fn counts(&self) -> Option<&SeverityCounts> {
        match self {
            CountsSnapshot::Available(c) => Some(c),
            _ => None,
        }
    }
}

/// One remote scan as seen by the most recent poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTask {
    pub scan_id: String,
    pub state: ScanState,
    pub counts: CountsSnapshot,
}
