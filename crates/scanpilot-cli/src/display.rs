use colored::*;
use scanpilot_core::actions::ActionsEnv;
use scanpilot_core::poller::Completion;
use scanpilot_core::report::ReportArtifact;
use scanpilot_core::task::CountsSnapshot;
use scanpilot_core::{RunOutcome, ScanError, ScanTask, Severity, SeverityCounts};

/// Print the result of a `run`.
pub fn print_run_outcome(outcome: &RunOutcome) {
    let summary = &outcome.summary;

    println!();
    println!(
        "{}",
        format!(" ScanPilot v{} — Scan Summary", env!("CARGO_PKG_VERSION")).bold()
    );
    println!();

    match &summary.scan_id {
        Some(id) => println!(" {} Scan ID: {}", "|-".dimmed(), id.cyan()),
        None => println!(" {} Scan ID: {}", "|-".dimmed(), "not created".dimmed()),
    }
    if let Some(url) = &summary.status_url {
        println!(" {} Details: {}", "|-".dimmed(), url.cyan());
    }
    if let Some(threshold) = summary.threshold {
        println!(" {} Fail on level: {}", "|-".dimmed(), threshold);
    }
    if summary.polls > 0 {
        println!(
            " {} Polls: {} over {}s",
            "|-".dimmed(),
            summary.polls,
            summary.elapsed_secs()
        );
    }
    if let Some(state) = &summary.last_state {
        println!(" {} Last state: {}", "|-".dimmed(), state.bold());
    }
    if let Some(counts) = &summary.counts {
        print_counts(counts);
    }
    if let Some(report) = &summary.report {
        print_report_saved(report);
    }
    println!();

    for warning in &outcome.warnings {
        println!(" {} {}", "WARN".yellow().bold(), warning);
    }

    match (&outcome.error, summary.completion) {
        (Some(err), _) => print_failure(err),
        (None, Some(Completion::Detached)) => println!(
            " {} Scan submitted; not waiting for completion.",
            "OK".green().bold()
        ),
        (None, _) => println!(" {} Scan completed.", "OK".green().bold()),
    }
    println!();
}

/// Print the failure message with its status code.
pub fn print_failure(err: &ScanError) {
    let tag = format!(" {} ", "FAILED").on_red().white().bold();
    println!(" {} {}", tag, err);
    println!("   {} Error code: {}", "|".dimmed(), err.status_code());
}

/// Emit workflow commands so failures show up as annotations in the run.
pub fn annotate(outcome: &RunOutcome, actions: &ActionsEnv) {
    for warning in &outcome.warnings {
        if let Some(cmd) = actions.warning_command(warning) {
            println!("{}", cmd);
        }
    }
    if let Some(err) = &outcome.error {
        if let Some(cmd) = actions.error_command(&err.to_string()) {
            println!("{}", cmd);
        }
    }
}

/// Print one scan info snapshot.
pub fn print_scan_task(task: &ScanTask) {
    println!();
    println!("{}", format!(" ScanPilot — Scan {}", task.scan_id).bold());
    println!();
    println!(" {} State: {}", "|-".dimmed(), state_colored(task));

    match &task.counts {
        CountsSnapshot::Available(counts) => print_counts(counts),
        CountsSnapshot::NotYetAvailable => println!(
            " {} Vulnerabilities: {}",
            "|-".dimmed(),
            "not yet available".dimmed()
        ),
        CountsSnapshot::Malformed(reason) => println!(
            " {} Vulnerabilities: {} ({})",
            "|-".dimmed(),
            "unreadable".yellow(),
            reason
        ),
    }
    println!();
}

pub fn print_report_saved(report: &ReportArtifact) {
    println!(
        " {} Report: {} ({} bytes)",
        "|-".dimmed(),
        report.path.display().to_string().green(),
        report.size_bytes
    );
}

fn state_colored(task: &ScanTask) -> String {
    let state = task.state.to_string();
    if task.state.is_ongoing() {
        state.cyan().to_string()
    } else if task.state == scanpilot_core::ScanState::Complete {
        state.green().bold().to_string()
    } else {
        state.red().bold().to_string()
    }
}

fn print_counts(counts: &SeverityCounts) {
    println!(" {} Vulnerabilities: {} total", "|-".dimmed(), counts.total());
    for severity in Severity::DESCENDING {
        let n = counts.get(severity);
        let value = if n == 0 {
            "0".dimmed().to_string()
        } else {
            match severity {
                Severity::Critical => n.to_string().red().bold().to_string(),
                Severity::High => n.to_string().yellow().bold().to_string(),
                Severity::Medium => n.to_string().yellow().to_string(),
                Severity::Low | Severity::BestPractice => n.to_string(),
            }
        };
        println!("   {} {:<14} {}", "|".dimmed(), severity.label(), value);
    }
}
