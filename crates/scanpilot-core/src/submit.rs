use crate::error::{ScanError, SubmissionError};
use crate::providers::{CreateScanResponse, RawResponse, ScannerApi, TransportFailure};
use crate::redact::redact_credentials;
use crate::request::ScanSubmission;
use tracing::{debug, info};

/// Submit a scan request once. No retries: any failure is final for the run.
pub async fn submit<A: ScannerApi + ?Sized>(
    api: &A,
    submission: &ScanSubmission,
) -> Result<String, ScanError> {
    info!(
        website_id = %submission.website_id,
        scan_type = %submission.scan_type,
        "Requesting scan..."
    );

    let outcome = api
        .create_scan(&submission.form_fields(), &submission.credentials)
        .await;

    let redact = |text: &str| redact_credentials(text, &submission.credentials);
    let scan_id = classify(outcome).map_err(|err| match err {
        SubmissionError::Application(msg) => SubmissionError::Application(redact(&msg)),
        SubmissionError::Unknown(raw) => SubmissionError::Unknown(redact(&raw)),
        network => network,
    })?;

    match scan_id {
        Some(id) => {
            debug!(scan_id = %id, "scan created");
            Ok(id)
        }
        None => Err(ScanError::MissingScanId),
    }
}

/// Turn the create-scan exchange into a scan id or a submission error.
///
/// `Ok(None)` means the scanner accepted the request but sent no id.
pub fn classify(
    outcome: Result<RawResponse, TransportFailure>,
) -> Result<Option<String>, SubmissionError> {
    let response = match outcome {
        Ok(response) => response,
        Err(TransportFailure {
            status: Some(status),
            message,
            ..
        }) => {
            return Err(SubmissionError::Unknown(format!(
                "HTTP {} response could not be read: {}",
                status, message
            )))
        }
        Err(failure) => {
            return Err(SubmissionError::Network {
                kind: failure.kind,
                host: failure.host,
            })
        }
    };

    let parsed = serde_json::from_str::<CreateScanResponse>(&response.body).ok();

    if response.is_success() {
        return match parsed {
            Some(body) if body.is_valid => Ok(body.scan_task_id.filter(|id| !id.is_empty())),
            Some(body) => Err(SubmissionError::Application(application_message(
                body,
                &response.body,
            ))),
            None => Err(SubmissionError::Unknown(response.body)),
        };
    }

    if response.body.trim().is_empty() {
        return Err(SubmissionError::Unknown(format!(
            "HTTP {} with empty body",
            response.status
        )));
    }

    match parsed {
        Some(body) if body.is_valid => Err(SubmissionError::Unknown(format!(
            "HTTP {}: {}",
            response.status, response.body
        ))),
        Some(body) => Err(SubmissionError::Application(application_message(
            body,
            &response.body,
        ))),
        None => Err(SubmissionError::Application(response.body)),
    }
}

fn application_message(body: CreateScanResponse, raw: &str) -> String {
    body.error_message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| raw.to_string())
}
