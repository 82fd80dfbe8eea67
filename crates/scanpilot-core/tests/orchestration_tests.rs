use async_trait::async_trait;
use scanpilot_core::error::{LifecycleError, ScanError, SubmissionError, ValidationError};
use scanpilot_core::poller::Completion;
use scanpilot_core::providers::{
    RawResponse, ReportKind, ScanInfoResponse, ScannerApi, TransportFailure,
};
use scanpilot_core::request::Credentials;
use scanpilot_core::{
    BuildProvenance, LocalArtifactStore, Orchestrator, RunOptions, RunOutcome, ScanInputs,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory scanner that replays scripted responses.
struct ScriptedScanner {
    create: Mutex<Option<Result<RawResponse, TransportFailure>>>,
    infos: Mutex<VecDeque<anyhow::Result<ScanInfoResponse>>>,
    report: Mutex<Option<anyhow::Result<Vec<u8>>>>,
    create_calls: AtomicU32,
    info_calls: AtomicU32,
    report_calls: AtomicU32,
    last_form: Mutex<Vec<(String, String)>>,
}

impl ScriptedScanner {
    fn new(create: Result<RawResponse, TransportFailure>) -> Self {
        Self {
            create: Mutex::new(Some(create)),
            infos: Mutex::new(VecDeque::new()),
            report: Mutex::new(Some(Ok(b"<scan-report/>".to_vec()))),
            create_calls: AtomicU32::new(0),
            info_calls: AtomicU32::new(0),
            report_calls: AtomicU32::new(0),
            last_form: Mutex::new(Vec::new()),
        }
    }

    fn accepting(scan_id: &str) -> Self {
        Self::new(Ok(RawResponse {
            status: 200,
            body: json!({"IsValid": true, "ScanTaskId": scan_id}).to_string(),
        }))
    }

    fn with_infos(self, infos: Vec<anyhow::Result<ScanInfoResponse>>) -> Self {
        *self.infos.lock().unwrap() = infos.into();
        self
    }

    fn with_report(self, report: anyhow::Result<Vec<u8>>) -> Self {
        *self.report.lock().unwrap() = Some(report);
        self
    }

    fn polls(&self) -> u32 {
        self.info_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScannerApi for ScriptedScanner {
    async fn create_scan(
        &self,
        form: &[(String, String)],
        _credentials: &Credentials,
    ) -> Result<RawResponse, TransportFailure> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_form.lock().unwrap() = form.to_vec();
        self.create
            .lock()
            .unwrap()
            .take()
            .expect("create_scan called more than once")
    }

    async fn scan_info(
        &self,
        _scan_id: &str,
        _credentials: &Credentials,
    ) -> anyhow::Result<ScanInfoResponse> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.infos
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("scan info script exhausted")))
    }

    async fn scan_report(
        &self,
        _scan_id: &str,
        _kind: ReportKind,
        _credentials: &Credentials,
    ) -> anyhow::Result<Vec<u8>> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        self.report
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(anyhow::anyhow!("report already fetched")))
    }
}

fn info(state: &str, counts: Option<Value>) -> anyhow::Result<ScanInfoResponse> {
    Ok(ScanInfoResponse {
        is_valid: true,
        scan_task_id: Some("scan-1".to_string()),
        state: Some(state.to_string()),
        founded_severity_and_counts: counts,
        error_message: None,
    })
}

fn zero_counts() -> Value {
    json!({"Critical": 0, "High": 0, "Medium": 0, "Low": 0, "BestPractice": 0})
}

fn inputs(fail_on_level: &str, wait: &str) -> ScanInputs {
    ScanInputs {
        website_id: "site-1".to_string(),
        scan_type: "FullWithPrimaryProfile".to_string(),
        profile_id: String::new(),
        user_id: "user".to_string(),
        api_token: "tok-9f2c1e".to_string(),
        fail_on_level: fail_on_level.to_string(),
        wait_for_completion: wait.to_string(),
        base_url: "https://scanner.example.com".to_string(),
    }
}

fn options() -> RunOptions {
    RunOptions {
        poll_interval: Duration::ZERO,
        download_report: true,
    }
}

async fn run(api: &ScriptedScanner, dir: &Path, inputs: &ScanInputs) -> RunOutcome {
    let store = LocalArtifactStore::new(dir);
    Orchestrator::new(api, &store, options())
        .run(inputs, BuildProvenance::default())
        .await
}

// ─── Poll loop ───

#[tokio::test]
async fn test_polls_until_complete() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1").with_infos(vec![
        info("Queued", None),
        info("Scanning", None),
        info("Complete", None),
    ]);

    let outcome = run(&api, tmp.path(), &inputs("DoNotFail", "true")).await;

    assert!(outcome.is_success(), "unexpected error: {:?}", outcome.error);
    assert_eq!(outcome.status_code(), 0);
    assert_eq!(api.polls(), 3);
    assert_eq!(outcome.summary.polls, 3);
    assert_eq!(outcome.summary.completion, Some(Completion::Complete));
    assert_eq!(outcome.summary.scan_id.as_deref(), Some("scan-1"));
    assert_eq!(
        outcome.summary.scan_message().as_deref(),
        Some("Scan details are available at https://scanner.example.com/scans/status/scan-1")
    );

    let report = outcome.summary.report.expect("report should be stored");
    assert_eq!(report.name, "scan-result-scan-1-Crawled.Xml");
    assert_eq!(std::fs::read(&report.path).unwrap(), b"<scan-report/>");
}

#[tokio::test]
async fn test_severity_violation_fails_before_scan_finishes() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1").with_infos(vec![
        info("Scanning", Some(json!({"Critical": 1, "High": 0, "Medium": 0, "Low": 0, "BestPractice": 0}))),
        info("Complete", None),
    ]);

    let outcome = run(&api, tmp.path(), &inputs("Critical", "true")).await;

    assert_eq!(api.polls(), 1);
    assert_eq!(outcome.status_code(), -6);
    match outcome.error {
        Some(ScanError::SeverityGate(msg)) => {
            assert_eq!(msg, "Critical vulnerabilities found: Critical: 1")
        }
        other => panic!("expected severity gate failure, got {:?}", other),
    }
    // The report documents the findings that failed the build.
    assert!(outcome.summary.report.is_some());
}

#[tokio::test]
async fn test_no_wait_stops_after_one_poll() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1")
        .with_infos(vec![info("Queued", None), info("Complete", None)]);

    let outcome = run(&api, tmp.path(), &inputs("DoNotFail", "false")).await;

    assert!(outcome.is_success());
    assert_eq!(api.polls(), 1);
    assert_eq!(outcome.summary.completion, Some(Completion::Detached));
    assert_eq!(api.report_calls.load(Ordering::SeqCst), 0);
    assert!(outcome.summary.report.is_none());
}

#[tokio::test]
async fn test_clean_counts_keep_polling() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1").with_infos(vec![
        info("Queued", None),
        info("Scanning", Some(zero_counts())),
        info("Scanning", Some(json!({"Low": "4", "BestPractice": "9"}))),
        info("Complete", Some(json!({"Low": "4", "BestPractice": "9"}))),
    ]);

    let outcome = run(&api, tmp.path(), &inputs("Medium", "true")).await;

    assert!(outcome.is_success(), "unexpected error: {:?}", outcome.error);
    assert_eq!(api.polls(), 4);
    let counts = outcome.summary.counts.unwrap();
    assert_eq!(counts.low, 4);
    assert_eq!(counts.best_practice, 9);
}

#[tokio::test]
async fn test_malformed_counts_do_not_stop_the_loop() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1").with_infos(vec![
        info("Scanning", Some(json!("pending"))),
        info("Complete", Some(zero_counts())),
    ]);

    let outcome = run(&api, tmp.path(), &inputs("BestPractice", "true")).await;

    assert!(outcome.is_success());
    assert_eq!(api.polls(), 2);
}

#[tokio::test]
async fn test_lifecycle_failures() {
    for (state, expected) in [
        ("Failed", LifecycleError::Failed),
        ("Cancelled", LifecycleError::Cancelled),
        ("Melted", LifecycleError::UnknownState("Melted".to_string())),
    ] {
        let tmp = tempfile::tempdir().unwrap();
        let api = ScriptedScanner::accepting("scan-1")
            .with_infos(vec![info("Scanning", None), info(state, None)]);

        let outcome = run(&api, tmp.path(), &inputs("DoNotFail", "true")).await;

        assert_eq!(outcome.status_code(), -7, "state {}", state);
        match outcome.error {
            Some(ScanError::Lifecycle(err)) => assert_eq!(err, expected),
            other => panic!("expected lifecycle failure, got {:?}", other),
        }
        assert_eq!(api.report_calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_scan_info_transport_error_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1").with_infos(vec![
        info("Queued", None),
        Err(anyhow::anyhow!("connection reset")),
        info("Complete", None),
    ]);

    let outcome = run(&api, tmp.path(), &inputs("DoNotFail", "true")).await;

    assert_eq!(api.polls(), 2);
    assert_eq!(outcome.status_code(), -5);
    assert!(matches!(outcome.error, Some(ScanError::Transport { .. })));
}

#[tokio::test]
async fn test_rejected_scan_info_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1").with_infos(vec![Ok(ScanInfoResponse {
        is_valid: false,
        error_message: Some("Scan not found".to_string()),
        ..Default::default()
    })]);

    let outcome = run(&api, tmp.path(), &inputs("DoNotFail", "true")).await;

    match outcome.error {
        Some(ScanError::InfoRejected(msg)) => assert_eq!(msg, "Scan not found"),
        other => panic!("expected rejected scan info, got {:?}", other),
    }
}

// ─── Submission ───

#[tokio::test]
async fn test_validation_failure_makes_no_calls() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1");
    let mut bad = inputs("High", "true");
    bad.scan_type = "Incremental".to_string();

    let outcome = run(&api, tmp.path(), &bad).await;

    assert_eq!(outcome.status_code(), -1);
    assert!(matches!(
        outcome.error,
        Some(ScanError::Validation(ValidationError::Empty("profile-id")))
    ));
    assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(api.polls(), 0);
}

#[tokio::test]
async fn test_missing_base_url() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1");
    let mut no_url = inputs("High", "true");
    no_url.base_url = String::new();
    no_url.website_id = String::new();

    let outcome = run(&api, tmp.path(), &no_url).await;

    assert!(matches!(
        outcome.error,
        Some(ScanError::Validation(ValidationError::MissingBaseUrl))
    ));
    assert_eq!(
        outcome.error.unwrap().to_string(),
        "Base URL is missing. Please check your generated script."
    );
}

#[tokio::test]
async fn test_network_failure_on_submit() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::new(Err(TransportFailure {
        kind: "connect".to_string(),
        host: "scanner.example.com".to_string(),
        message: "connection refused".to_string(),
        status: None,
    }));

    let outcome = run(&api, tmp.path(), &inputs("High", "true")).await;

    assert_eq!(outcome.status_code(), -2);
    assert!(matches!(
        outcome.error,
        Some(ScanError::Submission(SubmissionError::Network { .. }))
    ));
    assert_eq!(api.polls(), 0);
    assert!(outcome.summary.scan_id.is_none());
}

#[tokio::test]
async fn test_application_error_on_submit() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::new(Ok(RawResponse {
        status: 400,
        body: json!({"IsValid": false, "ErrorMessage": "Website limit reached"}).to_string(),
    }));

    let outcome = run(&api, tmp.path(), &inputs("High", "true")).await;

    assert_eq!(outcome.status_code(), -3);
    assert_eq!(
        outcome.error.unwrap().to_string(),
        "Scan could not be created. Check error message: Website limit reached"
    );
}

#[tokio::test]
async fn test_application_error_body_is_redacted() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::new(Ok(RawResponse {
        status: 403,
        body: "Token tok-9f2c1e is not authorized".to_string(),
    }));

    let outcome = run(&api, tmp.path(), &inputs("High", "true")).await;

    let message = outcome.error.unwrap().to_string();
    assert!(message.contains("Token *** is not authorized"), "{}", message);
}

#[tokio::test]
async fn test_scanner_error_message_is_surfaced_verbatim() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::new(Ok(RawResponse {
        status: 200,
        body: json!({
            "IsValid": false,
            "ErrorMessage": "Invalid API token: please regenerate it in settings"
        })
        .to_string(),
    }));

    let outcome = run(&api, tmp.path(), &inputs("High", "true")).await;

    assert_eq!(outcome.status_code(), -3);
    assert_eq!(
        outcome.error.unwrap().to_string(),
        "Scan could not be created. Check error message: Invalid API token: please regenerate it in settings"
    );
}

#[tokio::test]
async fn test_missing_scan_id_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::new(Ok(RawResponse {
        status: 200,
        body: json!({"IsValid": true}).to_string(),
    }));

    let outcome = run(&api, tmp.path(), &inputs("High", "true")).await;

    assert_eq!(outcome.status_code(), -5);
    assert!(matches!(outcome.error, Some(ScanError::MissingScanId)));
    assert_eq!(api.polls(), 0);
}

#[tokio::test]
async fn test_submission_form_carries_provenance() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1").with_infos(vec![info("Complete", None)]);
    let store = LocalArtifactStore::new(tmp.path());
    let provenance = BuildProvenance {
        repository: "acme/shop".to_string(),
        commit_sha: "deadbeef".to_string(),
        run_number: "7".to_string(),
        run_url: "https://github.com/acme/shop/actions/runs/99".to_string(),
        actor: "octocat".to_string(),
    };

    let outcome = Orchestrator::new(&api, &store, options())
        .run(&inputs("DoNotFail", "true"), provenance)
        .await;
    assert!(outcome.is_success());

    let form = api.last_form.lock().unwrap().clone();
    let get = |key: &str| {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    assert_eq!(get("WebsiteId"), "site-1");
    assert_eq!(get("VcsCommitInfoModel[CiBuildId]"), "7");
    assert_eq!(
        get("VcsCommitInfoModel[CiBuildUrl]"),
        "https://github.com/acme/shop/actions/runs/99"
    );
    assert_eq!(get("VcsCommitInfoModel[IntegrationSystem]"), "GithubActions");
}

// ─── Report ───

#[tokio::test]
async fn test_report_failure_fails_successful_run() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1")
        .with_infos(vec![info("Complete", None)])
        .with_report(Err(anyhow::anyhow!("502 Bad Gateway")));

    let outcome = run(&api, tmp.path(), &inputs("DoNotFail", "true")).await;

    assert_eq!(outcome.status_code(), -5);
    assert!(outcome.summary.report.is_none());
}

#[tokio::test]
async fn test_report_failure_does_not_mask_gate_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1")
        .with_infos(vec![info("Scanning", Some(json!({"High": 2})))])
        .with_report(Err(anyhow::anyhow!("502 Bad Gateway")));

    let outcome = run(&api, tmp.path(), &inputs("High", "true")).await;

    assert_eq!(outcome.status_code(), -6);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("502 Bad Gateway"));
}

#[tokio::test]
async fn test_report_download_can_be_disabled() {
    let tmp = tempfile::tempdir().unwrap();
    let api = ScriptedScanner::accepting("scan-1").with_infos(vec![info("Complete", None)]);
    let store = LocalArtifactStore::new(tmp.path());
    let opts = RunOptions {
        download_report: false,
        ..options()
    };

    let outcome = Orchestrator::new(&api, &store, opts)
        .run(&inputs("DoNotFail", "true"), BuildProvenance::default())
        .await;

    assert!(outcome.is_success());
    assert_eq!(api.report_calls.load(Ordering::SeqCst), 0);
}
