use crate::error::ValidationError;
use crate::severity::{SeverityThreshold, UnknownThreshold};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const INTEGRATION_SYSTEM: &str = "GithubActions";
pub const VCS_NAME: &str = "Git";

/// Scan coverage mode requested from the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanType {
    Incremental,
    FullWithPrimaryProfile,
    FullWithSelectedProfile,
}

impl ScanType {
    pub fn as_str(&self) -> &str {
        match self {
            ScanType::Incremental => "Incremental",
            ScanType::FullWithPrimaryProfile => "FullWithPrimaryProfile",
            ScanType::FullWithSelectedProfile => "FullWithSelectedProfile",
        }
    }

    /// Incremental and selected-profile scans run against an explicit profile.
    pub fn needs_profile(&self) -> bool {
        match self {
            ScanType::Incremental | ScanType::FullWithSelectedProfile => true,
            ScanType::FullWithPrimaryProfile => false,
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized scan type '{0}'")]
pub struct UnknownScanType(pub String);

impl FromStr for ScanType {
    type Err = UnknownScanType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Incremental" => Ok(ScanType::Incremental),
            "FullWithPrimaryProfile" => Ok(ScanType::FullWithPrimaryProfile),
            "FullWithSelectedProfile" => Ok(ScanType::FullWithSelectedProfile),
            other => Err(UnknownScanType(other.to_string())),
        }
    }
}

/// Raw action inputs, exactly as the host environment supplied them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ScanInputs {
    #[serde(default)]
    pub website_id: String,
    #[serde(default)]
    pub scan_type: String,
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub fail_on_level: String,
    #[serde(default)]
    pub wait_for_completion: String,
    #[serde(default)]
    pub base_url: String,
}

/// CI metadata attached to every submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProvenance {
    pub repository: String,
    pub commit_sha: String,
    pub run_number: String,
    pub run_url: String,
    pub actor: String,
}

impl BuildProvenance {
    /// Build provenance from GitHub Actions variables looked up through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).unwrap_or_default();
        let repository = var("GITHUB_REPOSITORY");
        let run_url = format!(
            "{}/{}/actions/runs/{}",
            var("GITHUB_SERVER_URL"),
            repository,
            var("GITHUB_RUN_ID")
        );

        Self {
            commit_sha: var("GITHUB_SHA"),
            run_number: var("GITHUB_RUN_NUMBER"),
            actor: var("GITHUB_ACTOR"),
            repository,
            run_url,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: String,
    pub api_token: String,
}

/// A validated scan request, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSubmission {
    pub website_id: String,
    pub scan_type: ScanType,
    pub profile_id: Option<String>,
    pub provenance: BuildProvenance,
    pub credentials: Credentials,
    pub threshold: SeverityThreshold,
    pub wait_for_completion: bool,
}

impl ScanSubmission {
    /// Form fields for `CreateFromPluginScanRequest`, nested keys in bracket notation.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let p = &self.provenance;
        let mut fields = vec![
            (
                "ProfileId".to_string(),
                self.profile_id.clone().unwrap_or_default(),
            ),
            ("ScanType".to_string(), self.scan_type.to_string()),
            ("WebsiteId".to_string(), self.website_id.clone()),
        ];

        let vcs = [
            ("CiBuildConfigurationName", p.repository.as_str()),
            ("CiBuildHasChange", p.commit_sha.as_str()),
            ("CiBuildId", p.run_number.as_str()),
            ("CiBuildUrl", p.run_url.as_str()),
            ("Committer", p.actor.as_str()),
            ("IntegrationSystem", INTEGRATION_SYSTEM),
            ("VcsName", VCS_NAME),
            ("VcsVersion", p.commit_sha.as_str()),
        ];
        fields.extend(
            vcs.iter()
                .map(|(k, v)| (format!("VcsCommitInfoModel[{}]", k), v.to_string())),
        );

        fields
    }
}

/// Validate raw inputs and build a submission.
///
/// Checks run in a fixed order and the first failure is returned.
pub fn build(
    inputs: &ScanInputs,
    provenance: BuildProvenance,
) -> Result<ScanSubmission, ValidationError> {
    if inputs.website_id.is_empty() {
        return Err(ValidationError::Empty("website-id"));
    }
    if inputs.user_id.is_empty() {
        return Err(ValidationError::Empty("user-id"));
    }
    if inputs.api_token.is_empty() {
        return Err(ValidationError::Empty("api-token"));
    }
    if inputs.scan_type.is_empty() {
        return Err(ValidationError::Empty("scan-type"));
    }
    let scan_type: ScanType = inputs
        .scan_type
        .parse()
        .map_err(|UnknownScanType(raw)| ValidationError::Invalid("scan-type", raw))?;
    if inputs.fail_on_level.is_empty() {
        return Err(ValidationError::Empty("fail-on-level"));
    }
    let threshold: SeverityThreshold = inputs
        .fail_on_level
        .parse()
        .map_err(|UnknownThreshold(raw)| ValidationError::Invalid("fail-on-level", raw))?;
    if inputs.wait_for_completion.is_empty() {
        return Err(ValidationError::Empty("wait-for-completion"));
    }
    if scan_type.needs_profile() && inputs.profile_id.is_empty() {
        return Err(ValidationError::Empty("profile-id"));
    }

    let profile_id = if inputs.profile_id.is_empty() {
        None
    } else {
        Some(inputs.profile_id.clone())
    };

    Ok(ScanSubmission {
        website_id: inputs.website_id.clone(),
        scan_type,
        profile_id,
        provenance,
        credentials: Credentials {
            user_id: inputs.user_id.clone(),
            api_token: inputs.api_token.clone(),
        },
        threshold,
        // Only the literal "true" keeps the poller waiting.
        wait_for_completion: inputs.wait_for_completion == "true",
    })
}
