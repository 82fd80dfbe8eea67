use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Vulnerability severity as reported by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    BestPractice,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, most severe first.
    pub const DESCENDING: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::BestPractice,
    ];

    pub fn label(&self) -> &str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::BestPractice => "Best Practice",
        }
    }
}

/// The `fail-on-level` setting: the least severe level that still fails the build.
///
/// Every level is cumulative, so `Medium` fails on Critical, High and Medium
/// findings alike. `None` disables the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityThreshold {
    Critical,
    High,
    Medium,
    Low,
    BestPractice,
    None,
}

impl SeverityThreshold {
    /// The least severe level included in the gate, or `None` when disabled.
    pub fn floor(&self) -> Option<Severity> {
        match self {
            SeverityThreshold::Critical => Some(Severity::Critical),
            SeverityThreshold::High => Some(Severity::High),
            SeverityThreshold::Medium => Some(Severity::Medium),
            SeverityThreshold::Low => Some(Severity::Low),
            SeverityThreshold::BestPractice => Some(Severity::BestPractice),
            SeverityThreshold::None => None,
        }
    }

    /// Severities that fail the build under this threshold, most severe first.
    pub fn gated(&self) -> Vec<Severity> {
        match self.floor() {
            Some(floor) => Severity::DESCENDING
                .iter()
                .copied()
                .filter(|s| *s >= floor)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn includes(&self, severity: Severity) -> bool {
        self.floor().is_some_and(|floor| severity >= floor)
    }
}

impl fmt::Display for SeverityThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SeverityThreshold::Critical => "Critical",
            SeverityThreshold::High => "High",
            SeverityThreshold::Medium => "Medium",
            SeverityThreshold::Low => "Low",
            SeverityThreshold::BestPractice => "BestPractice",
            SeverityThreshold::None => "None",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized severity threshold '{0}'")]
pub struct UnknownThreshold(pub String);

impl FromStr for SeverityThreshold {
    type Err = UnknownThreshold;

    /// Accepts the variant names as well as the comma-list spelling the
    /// scanner's generated workflow scripts use (`Critical,High`, `DoNotFail`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Critical" => Ok(SeverityThreshold::Critical),
            "High" | "Critical,High" => Ok(SeverityThreshold::High),
            "Medium" | "Critical,High,Medium" => Ok(SeverityThreshold::Medium),
            "Low" | "Critical,High,Medium,Low" => Ok(SeverityThreshold::Low),
            "BestPractice" | "Critical,High,Medium,Low,Best Practice" => {
                Ok(SeverityThreshold::BestPractice)
            }
            "None" | "DoNotFail" => Ok(SeverityThreshold::None),
            other => Err(UnknownThreshold(other.to_string())),
        }
    }
}

/// Vulnerability tally for one scan, by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub best_practice: u64,
}

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::BestPractice => self.best_practice,
        }
    }

    pub fn total(&self) -> u64 {
        Severity::DESCENDING.iter().map(|s| self.get(*s)).sum()
    }
}

/// Result of checking a count snapshot against the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Pass,
    Fail(String),
}

impl GateOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, GateOutcome::Pass)
    }
}

/// Check `counts` against `threshold`.
pub fn evaluate(counts: &SeverityCounts, threshold: SeverityThreshold) -> GateOutcome {
    let gated = threshold.gated();
    let offending: Vec<Severity> = gated
        .iter()
        .copied()
        .filter(|s| counts.get(*s) > 0)
        .collect();

    if offending.is_empty() {
        return GateOutcome::Pass;
    }

    let scope = gated
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if i == 0 {
                s.label().to_string()
            } else {
                s.label().to_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(" or ");

    let details = offending
        .iter()
        .map(|s| format!("{}: {}", s.label(), counts.get(*s)))
        .collect::<Vec<_>>()
        .join(", ");

    GateOutcome::Fail(format!("{} vulnerabilities found: {}", scope, details))
}
