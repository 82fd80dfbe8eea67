//! GitHub Actions runner integration: step outputs and workflow commands.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;

/// What the runner exposes to a step.
#[derive(Debug, Clone, Default)]
pub struct ActionsEnv {
    /// True when running inside GitHub Actions.
    pub enabled: bool,
    /// File named by `GITHUB_OUTPUT`.
    pub output_file: Option<PathBuf>,
}

impl ActionsEnv {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            enabled: lookup("GITHUB_ACTIONS").as_deref() == Some("true"),
            output_file: lookup("GITHUB_OUTPUT")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Record a step output. Does nothing outside of Actions.
    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        let Some(path) = &self.output_file else {
            return Ok(());
        };

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open GITHUB_OUTPUT '{}'", path.display()))?;

        let entry = if value.contains('\n') {
            let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
            let delimiter = format!("scanpilot_{}", nanos);
            format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
        } else {
            format!("{name}={value}\n")
        };

        file.write_all(entry.as_bytes())
            .with_context(|| format!("Failed to write output '{}'", name))
    }

    /// `::error::` workflow command for `message`, if running under Actions.
    pub fn error_command(&self, message: &str) -> Option<String> {
        self.enabled.then(|| format!("::error::{}", escape_data(message)))
    }

    pub fn warning_command(&self, message: &str) -> Option<String> {
        self.enabled.then(|| format!("::warning::{}", escape_data(message)))
    }
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
