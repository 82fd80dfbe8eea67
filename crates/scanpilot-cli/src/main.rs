mod display;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use scanpilot_core::actions::ActionsEnv;
use scanpilot_core::config::{discover_config, ConfigFile};
use scanpilot_core::providers::ScannerApi;
use scanpilot_core::report::fetch_report;
use scanpilot_core::request::Credentials;
use scanpilot_core::{
    BuildProvenance, HttpScannerClient, LocalArtifactStore, Orchestrator, RunOptions, ScanInputs,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "scanpilot",
    version,
    about = "ScanPilot — run a web vulnerability scan from CI and gate the build on its findings",
    long_about = "Submit a scan to the vulnerability scanner, poll it until it finishes, fail the build when findings reach the configured severity, and download the scan report.\n\nInputs can be given as flags, as GitHub Actions inputs (INPUT_*), or in .scanpilot.toml."
)]
struct Cli {
    /// Show progress logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show debug logs
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a scan, wait for it and apply the severity gate
    Run {
        #[command(flatten)]
        inputs: InputArgs,

        /// Config file (defaults to .scanpilot.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seconds between scan status checks
        #[arg(long)]
        poll_interval_secs: Option<u64>,

        /// Directory the scan report is written to
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Do not download the scan report
        #[arg(long)]
        no_report: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the current state and vulnerability counts of a scan
    Status {
        /// Scan ID returned when the scan was created
        scan_id: String,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Print the raw response of the status endpoint
        #[arg(long)]
        raw: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Download the report of a scan
    Report {
        /// Scan ID returned when the scan was created
        scan_id: String,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Directory the scan report is written to
        #[arg(long, default_value = ".")]
        report_dir: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Scan inputs, named after the action's `with:` keys.
#[derive(Args)]
struct InputArgs {
    /// Website to scan
    #[arg(long, env = "INPUT_WEBSITE-ID")]
    website_id: Option<String>,

    /// Incremental, FullWithPrimaryProfile or FullWithSelectedProfile
    #[arg(long, env = "INPUT_SCAN-TYPE")]
    scan_type: Option<String>,

    /// Scan profile (required for Incremental and FullWithSelectedProfile)
    #[arg(long, env = "INPUT_PROFILE-ID")]
    profile_id: Option<String>,

    /// API user ID
    #[arg(long, env = "INPUT_USER-ID")]
    user_id: Option<String>,

    /// API token
    #[arg(long, env = "INPUT_API-TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Critical, High, Medium, Low, BestPractice or None (also DoNotFail)
    #[arg(long, env = "INPUT_FAIL-ON-LEVEL")]
    fail_on_level: Option<String>,

    /// "true" to keep polling until the scan finishes
    #[arg(long, env = "INPUT_WAIT-FOR-COMPLETION")]
    wait_for_completion: Option<String>,

    /// Scanner base URL
    #[arg(long, env = "INPUT_BASE-URL")]
    base_url: Option<String>,
}

impl InputArgs {
    fn into_inputs(self) -> ScanInputs {
        ScanInputs {
            website_id: self.website_id.unwrap_or_default(),
            scan_type: self.scan_type.unwrap_or_default(),
            profile_id: self.profile_id.unwrap_or_default(),
            user_id: self.user_id.unwrap_or_default(),
            api_token: self.api_token.unwrap_or_default(),
            fail_on_level: self.fail_on_level.unwrap_or_default(),
            wait_for_completion: self.wait_for_completion.unwrap_or_default(),
            base_url: self.base_url.unwrap_or_default(),
        }
    }
}

#[derive(Args)]
struct ConnectionArgs {
    /// Scanner base URL
    #[arg(long, env = "INPUT_BASE-URL")]
    base_url: String,

    /// API user ID
    #[arg(long, env = "INPUT_USER-ID")]
    user_id: String,

    /// API token
    #[arg(long, env = "INPUT_API-TOKEN", hide_env_values = true)]
    api_token: String,
}

impl ConnectionArgs {
    fn credentials(&self) -> Credentials {
        Credentials {
            user_id: self.user_id.clone(),
            api_token: self.api_token.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // A scan run reports its progress by default.
    let verbose = cli.verbose || matches!(cli.command, Commands::Run { .. });
    init_logging(verbose, cli.debug);

    let result = match cli.command {
        Commands::Run {
            inputs,
            config,
            poll_interval_secs,
            report_dir,
            no_report,
            format,
        } => {
            cmd_run(
                inputs,
                config,
                poll_interval_secs,
                report_dir,
                no_report,
                &format,
            )
            .await
        }
        Commands::Status {
            scan_id,
            connection,
            raw,
            format,
        } => cmd_status(&scan_id, &connection, raw, &format)
            .await
            .map(|_| 0),
        Commands::Report {
            scan_id,
            connection,
            report_dir,
        } => cmd_report(&scan_id, &connection, report_dir).await.map(|_| 0),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "scanpilot", &mut std::io::stdout());
            Ok(0)
        }
    };

    match result {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(code.unsigned_abs().min(255) as u8),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing; `RUST_LOG` overrides the flag-derived level.
fn init_logging(verbose: bool, debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    debug!("Logging initialized at level: {}", level);
}

/// Returns the run's status code (0 on success, negative on failure).
async fn cmd_run(
    args: InputArgs,
    config: Option<PathBuf>,
    poll_interval_secs: Option<u64>,
    report_dir: Option<PathBuf>,
    no_report: bool,
    format: &str,
) -> Result<i32> {
    let ConfigFile {
        inputs: file_inputs,
        options: file_options,
    } = discover_config(config.as_deref())?;
    let inputs = args.into_inputs().or(file_inputs);

    let options = RunOptions {
        poll_interval: Duration::from_secs(
            poll_interval_secs
                .or(file_options.poll_interval_secs)
                .unwrap_or(10),
        ),
        download_report: !no_report && file_options.download_report.unwrap_or(true),
    };
    let store = LocalArtifactStore::new(
        report_dir
            .or(file_options.report_dir)
            .unwrap_or_else(|| PathBuf::from(".")),
    );
    let client = HttpScannerClient::new(&inputs.base_url)?;
    let actions = ActionsEnv::from_env();

    let outcome = Orchestrator::new(&client, &store, options)
        .run(&inputs, BuildProvenance::from_env())
        .await;

    if let Some(id) = &outcome.summary.scan_id {
        actions.set_output("scan-id", id)?;
    }
    if let Some(message) = outcome.summary.scan_message() {
        actions.set_output("scan-message", &message)?;
    }
    if let Some(report) = &outcome.summary.report {
        actions.set_output("report-path", &report.path.display().to_string())?;
    }

    match format {
        "json" => {
            let json = serde_json::json!({
                "success": outcome.is_success(),
                "status_code": outcome.status_code(),
                "error": outcome.error.as_ref().map(|e| e.to_string()),
                "warnings": &outcome.warnings,
                "summary": &outcome.summary,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => display::print_run_outcome(&outcome),
    }
    display::annotate(&outcome, &actions);

    Ok(outcome.status_code())
}

async fn cmd_status(
    scan_id: &str,
    connection: &ConnectionArgs,
    raw: bool,
    format: &str,
) -> Result<()> {
    let client = HttpScannerClient::new(&connection.base_url)?;
    let credentials = connection.credentials();

    if raw {
        let body = client.scan_status(scan_id, &credentials).await?;
        println!("{}", body);
        return Ok(());
    }

    let info = client
        .scan_info(scan_id, &credentials)
        .await
        .context("Error occurred during scan info retrieval")?;
    if !info.is_valid {
        anyhow::bail!(
            "Scan info could not be retrieved. Check error message: {}",
            info.error_message.unwrap_or_default()
        );
    }
    let task = info.into_task(scan_id);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&task)?),
        _ => display::print_scan_task(&task),
    }
    Ok(())
}

async fn cmd_report(scan_id: &str, connection: &ConnectionArgs, report_dir: PathBuf) -> Result<()> {
    let client = HttpScannerClient::new(&connection.base_url)?;
    let store = LocalArtifactStore::new(report_dir);

    let report = fetch_report(&client, &store, scan_id, &connection.credentials()).await?;

    let actions = ActionsEnv::from_env();
    actions.set_output("report-path", &report.path.display().to_string())?;

    println!();
    display::print_report_saved(&report);
    println!();
    Ok(())
}
