use super::{
    scan_info_form, RawResponse, ReportKind, ScanInfoResponse, ScannerApi, TransportFailure,
    CREATE_SCAN_PATH, SCAN_INFO_PATH, SCAN_REPORT_PATH, SCAN_STATUS_API_PATH,
};
use crate::redact::redact_url;
use crate::request::Credentials;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;
use tracing::debug;

/// HTTP client for the scanner's plugin API.
pub struct HttpScannerClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScannerClient {
    /// Create a client rooted at `base_url` (e.g. `https://scanner.example.com`).
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_builder(base_url, reqwest::Client::builder())
    }

    fn from_builder(base_url: &str, builder: reqwest::ClientBuilder) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ScanPilot/", env!("CARGO_PKG_VERSION"))),
        );

        let client = builder
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn host(&self) -> String {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| redact_url(&self.base_url))
    }

    fn transport_failure(&self, err: &reqwest::Error) -> TransportFailure {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_request() {
            "request"
        } else if err.is_body() || err.is_decode() {
            "body"
        } else {
            "transport"
        };

        TransportFailure {
            kind: kind.to_string(),
            host: err
                .url()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| self.host()),
            message: err.to_string(),
            status: None,
        }
    }

    /// Raw body of the legacy `GET /api/1.0/scans/status/<id>` endpoint.
    pub async fn scan_status(&self, scan_id: &str, credentials: &Credentials) -> Result<String> {
        let url = self.url(&format!("{}{}", SCAN_STATUS_API_PATH, scan_id));
        debug!(url = %redact_url(&url), "fetching scan status");

        self.client
            .get(&url)
            .basic_auth(&credentials.user_id, Some(&credentials.api_token))
            .send()
            .await
            .context("Failed to fetch scan status")?
            .error_for_status()
            .context("Scanner API returned error")?
            .text()
            .await
            .context("Failed to read scan status response")
    }
}

#[async_trait]
impl ScannerApi for HttpScannerClient {
    async fn create_scan(
        &self,
        form: &[(String, String)],
        credentials: &Credentials,
    ) -> Result<RawResponse, TransportFailure> {
        let url = self.url(CREATE_SCAN_PATH);
        debug!(url = %redact_url(&url), "submitting scan request");

        let response = self
            .client
            .post(&url)
            .basic_auth(&credentials.user_id, Some(&credentials.api_token))
            .form(form)
            .send()
            .await
            .map_err(|e| self.transport_failure(&e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportFailure {
            status: Some(status),
            ..self.transport_failure(&e)
        })?;

        Ok(RawResponse { status, body })
    }

    async fn scan_info(
        &self,
        scan_id: &str,
        credentials: &Credentials,
    ) -> Result<ScanInfoResponse> {
        let url = self.url(SCAN_INFO_PATH);
        debug!(url = %redact_url(&url), scan_id, "fetching scan info");

        self.client
            .post(&url)
            .basic_auth(&credentials.user_id, Some(&credentials.api_token))
            .form(&scan_info_form(scan_id))
            .send()
            .await
            .context("Failed to fetch scan info")?
            .error_for_status()
            .context("Scanner API returned error")?
            .json()
            .await
            .context("Failed to parse scan info response")
    }

    async fn scan_report(
        &self,
        scan_id: &str,
        kind: ReportKind,
        credentials: &Credentials,
    ) -> Result<Vec<u8>> {
        let url = self.url(SCAN_REPORT_PATH);
        debug!(
            url = %redact_url(&url),
            scan_id,
            report_type = kind.report_type,
            format = kind.format,
            "fetching scan report"
        );

        let bytes = self
            .client
            .get(&url)
            .basic_auth(&credentials.user_id, Some(&credentials.api_token))
            .query(&[
                ("Id", scan_id),
                ("type", kind.report_type),
                ("format", kind.format),
            ])
            .send()
            .await
            .context("Failed to fetch scan report")?
            .error_for_status()
            .context("Scanner API returned error")?
            .bytes()
            .await
            .context("Failed to read scan report")?;

        Ok(bytes.to_vec())
    }
}
