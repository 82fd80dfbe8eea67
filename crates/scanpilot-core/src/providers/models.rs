use crate::severity::SeverityCounts;
use crate::task::{CountsSnapshot, ScanState, ScanTask};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body returned by `CreateFromPluginScanRequest`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateScanResponse {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub scan_task_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Body returned by `ScanInfoForPlugin`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInfoResponse {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub scan_task_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Kept untyped: it may be missing, null, or carry counts as strings.
    #[serde(default)]
    pub founded_severity_and_counts: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ScanInfoResponse {
    pub fn into_task(self, requested_id: &str) -> ScanTask {
        let counts = parse_counts(self.founded_severity_and_counts.as_ref());
        ScanTask {
            scan_id: self
                .scan_task_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| requested_id.to_string()),
            state: ScanState::from(self.state.as_deref().unwrap_or_default()),
            counts,
        }
    }
}

/// Interpret `FoundedSeverityAndCounts`.
///
/// Individual counts may be JSON numbers or numeric strings. A missing
/// count reads as zero.
pub fn parse_counts(raw: Option<&Value>) -> CountsSnapshot {
    let obj = match raw {
        None | Some(Value::Null) => return CountsSnapshot::NotYetAvailable,
        Some(Value::Object(obj)) => obj,
        Some(other) => {
            return CountsSnapshot::Malformed(format!("expected an object, got {}", other))
        }
    };

    match counts_from_object(obj) {
        Ok(counts) => CountsSnapshot::Available(counts),
        Err(reason) => CountsSnapshot::Malformed(reason),
    }
}

fn counts_from_object(obj: &Map<String, Value>) -> Result<SeverityCounts, String> {
    Ok(SeverityCounts {
        critical: read_count(obj, "Critical")?,
        high: read_count(obj, "High")?,
        medium: read_count(obj, "Medium")?,
        low: read_count(obj, "Low")?,
        best_practice: read_count(obj, "BestPractice")?,
    })
}

fn read_count(obj: &Map<String, Value>, key: &str) -> Result<u64, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| format!("{} is not a non-negative integer: {}", key, n)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("{} is not numeric: {:?}", key, s)),
        Some(other) => Err(format!("{} has unexpected type: {}", key, other)),
    }
}
