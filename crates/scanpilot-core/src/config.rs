use crate::request::ScanInputs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = ".scanpilot.toml";

/// Configuration loaded from `.scanpilot.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub inputs: ScanInputs,
    #[serde(default)]
    pub options: OptionsFile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OptionsFile {
    /// Seconds between scan info requests
    pub poll_interval_secs: Option<u64>,
    /// Directory the scan report is written to
    pub report_dir: Option<PathBuf>,
    /// Set to false to skip downloading the report
    pub download_report: Option<bool>,
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> anyhow::Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
    let config: ConfigFile = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;

    if !config.inputs.api_token.is_empty() {
        warn!(
            "api-token is set in '{}'; prefer passing it through a secret",
            path.display()
        );
    }
    Ok(config)
}

/// Load `explicit` if given, otherwise the default file when it exists.
pub fn discover_config(explicit: Option<&Path>) -> anyhow::Result<ConfigFile> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                debug!("Loading config from '{}'", default.display());
                load_config(default)
            } else {
                Ok(ConfigFile::default())
            }
        }
    }
}

impl ScanInputs {
    /// Fill every empty field from `fallback`.
    pub fn or(self, fallback: ScanInputs) -> ScanInputs {
        fn pick(primary: String, fallback: String) -> String {
            if primary.is_empty() {
                fallback
            } else {
                primary
            }
        }

        ScanInputs {
            website_id: pick(self.website_id, fallback.website_id),
            scan_type: pick(self.scan_type, fallback.scan_type),
            profile_id: pick(self.profile_id, fallback.profile_id),
            user_id: pick(self.user_id, fallback.user_id),
            api_token: pick(self.api_token, fallback.api_token),
            fail_on_level: pick(self.fail_on_level, fallback.fail_on_level),
            wait_for_completion: pick(self.wait_for_completion, fallback.wait_for_completion),
            base_url: pick(self.base_url, fallback.base_url),
        }
    }
}
