use thiserror::Error;

/// Bad or missing input, detected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Input {0} is empty.")]
    Empty(&'static str),
    #[error("Input {0} is not valid: {1}")]
    Invalid(&'static str, String),
    #[error("Base URL is missing. Please check your generated script.")]
    MissingBaseUrl,
}

impl ValidationError {
    /// Name of the offending input.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Empty(field) | ValidationError::Invalid(field, _) => field,
            ValidationError::MissingBaseUrl => "base-url",
        }
    }
}

/// Why the create-scan call did not yield a scan id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// No response was received at all.
    #[error("Error: {kind} Hostname: {host}")]
    Network { kind: String, host: String },
    /// The scanner answered but rejected the request.
    #[error("Scan could not be created. Check error message: {0}")]
    Application(String),
    #[error("Error: {0}")]
    Unknown(String),
}

/// The scan itself ended in a non-successful lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Scan failed.")]
    Failed,
    #[error("Scan was cancelled.")]
    Cancelled,
    #[error("Unknown scan state: {0}. Please contact support.")]
    UnknownState(String),
}

/// Every way a scan run can end unsuccessfully.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Scan ID is missing. Please contact support.")]
    MissingScanId,

    #[error("{0}")]
    SeverityGate(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Scan info could not be retrieved. Check error message: {0}")]
    InfoRejected(String),

    #[error("{context}: {source:#}")]
    Transport {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ScanError {
    pub fn transport(context: &'static str, source: anyhow::Error) -> Self {
        ScanError::Transport { context, source }
    }

    /// Status code reported for this failure category.
    pub fn status_code(&self) -> i32 {
        match self {
            ScanError::Validation(_) => -1,
            ScanError::Submission(SubmissionError::Network { .. }) => -2,
            ScanError::Submission(SubmissionError::Application(_)) => -3,
            ScanError::Submission(SubmissionError::Unknown(_)) => -4,
            ScanError::MissingScanId
            | ScanError::InfoRejected(_)
            | ScanError::Transport { .. } => -5,
            ScanError::SeverityGate(_) => -6,
            ScanError::Lifecycle(_) => -7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_distinct_per_category() {
        let errors = [
            ScanError::from(ValidationError::Empty("website-id")),
            ScanError::from(SubmissionError::Network {
                kind: "connect".to_string(),
                host: "scanner.invalid".to_string(),
            }),
            ScanError::from(SubmissionError::Application("bad".to_string())),
            ScanError::from(SubmissionError::Unknown("???".to_string())),
            ScanError::MissingScanId,
            ScanError::SeverityGate("Critical vulnerabilities found: Critical: 1".to_string()),
            ScanError::from(LifecycleError::Failed),
        ];
        let codes: Vec<i32> = errors.iter().map(|e| e.status_code()).collect();
        assert_eq!(codes, vec![-1, -2, -3, -4, -5, -6, -7]);
    }

    #[test]
    fn test_messages_name_the_field() {
        assert_eq!(
            ValidationError::Empty("api-token").to_string(),
            "Input api-token is empty."
        );
        assert_eq!(
            ValidationError::Invalid("scan-type", "Quick".to_string()).to_string(),
            "Input scan-type is not valid: Quick"
        );
        assert_eq!(
            LifecycleError::UnknownState("Exploding".to_string()).to_string(),
            "Unknown scan state: Exploding. Please contact support."
        );
    }
}
