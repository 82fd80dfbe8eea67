pub mod http;
pub mod models;

use crate::request::Credentials;
use async_trait::async_trait;

pub use http::HttpScannerClient;
pub use models::{CreateScanResponse, ScanInfoResponse};

pub const CREATE_SCAN_PATH: &str = "/api/1.0/scans/CreateFromPluginScanRequest";
pub const SCAN_INFO_PATH: &str = "/api/1.0/scans/ScanInfoForPlugin";
pub const SCAN_STATUS_API_PATH: &str = "/api/1.0/scans/status/";
pub const SCAN_REPORT_PATH: &str = "/api/1.0/scans/report";
/// Browser-facing status page, linked from the `scan-message` output.
pub const SCAN_STATUS_PAGE_PATH: &str = "/scans/status/";

/// Status and body of a response, kept raw so callers can classify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request that did not produce a readable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: String,
    pub host: String,
    pub message: String,
    /// Status of the response when one arrived but its body could not be read.
    /// `None` means no response at all (DNS, refused connection, timeout).
    pub status: Option<u16>,
}

/// Report flavour requested from the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportKind {
    pub report_type: &'static str,
    pub format: &'static str,
}

impl ReportKind {
    pub const CRAWLED_XML: ReportKind = ReportKind {
        report_type: "Crawled",
        format: "Xml",
    };

    pub fn artifact_name(&self, scan_id: &str) -> String {
        format!("scan-result-{}-{}.{}", scan_id, self.report_type, self.format)
    }
}

/// Calls the orchestrator makes against the scanner.
#[async_trait]
pub trait ScannerApi: Send + Sync {
    /// Submit a create-scan form. Any HTTP response, successful or not, is `Ok`.
    async fn create_scan(
        &self,
        form: &[(String, String)],
        credentials: &Credentials,
    ) -> Result<RawResponse, TransportFailure>;

    async fn scan_info(
        &self,
        scan_id: &str,
        credentials: &Credentials,
    ) -> anyhow::Result<ScanInfoResponse>;

    async fn scan_report(
        &self,
        scan_id: &str,
        kind: ReportKind,
        credentials: &Credentials,
    ) -> anyhow::Result<Vec<u8>>;
}

/// Form body for `ScanInfoForPlugin`: all vulnerability-state filters off.
pub fn scan_info_form(scan_id: &str) -> Vec<(String, String)> {
    const FILTERS: [&str; 9] = [
        "Present",
        "FixedUnconfirmed",
        "FixedConfirmed",
        "FixedCantRetest",
        "Revived",
        "Ignored",
        "Scanning",
        "AcceptedRisk",
        "FalsePositive",
    ];

    let mut form = vec![
        ("ScanId".to_string(), scan_id.to_string()),
        ("DoNotFail".to_string(), "false".to_string()),
        ("IsConfirmed".to_string(), "false".to_string()),
    ];
    form.extend(FILTERS.iter().map(|f| {
        (
            format!("IgnoredVulnerabilityStateFilters[{}]", f),
            "false".to_string(),
        )
    }));
    form
}

/// Link to the scanner's status page for a scan.
pub fn status_page_url(base_url: &str, scan_id: &str) -> String {
    format!(
        "{}{}{}",
        base_url.trim_end_matches('/'),
        SCAN_STATUS_PAGE_PATH,
        scan_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_name() {
        assert_eq!(
            ReportKind::CRAWLED_XML.artifact_name("abc-1"),
            "scan-result-abc-1-Crawled.Xml"
        );
    }

    #[test]
    fn test_scan_info_form_disables_all_filters() {
        let form = scan_info_form("scan-7");
        assert_eq!(form[0], ("ScanId".to_string(), "scan-7".to_string()));
        assert_eq!(form.len(), 12);
        assert!(form.iter().skip(1).all(|(_, v)| v == "false"));
        assert!(form
            .iter()
            .any(|(k, _)| k == "IgnoredVulnerabilityStateFilters[FalsePositive]"));
    }

    #[test]
    fn test_status_page_url() {
        assert_eq!(
            status_page_url("https://scanner.example.com/", "s1"),
            "https://scanner.example.com/scans/status/s1"
        );
    }
}
