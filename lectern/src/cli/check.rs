// lectern/src/cli/check.rs
use clap::Args;
use colored::Colorize;
use lectern_common::config::Config;
use lectern_common::error::Result;
use lectern_common::model::ReconcileOutcome;
use lectern_core::shell::{self, WorkloadOutcome};
use lectern_core::{ReconcileOptions, Reconciler, SourceRegistry};
use lectern_net::GithubScanner;

use crate::progress;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Scan sources even if a fresh cached snapshot exists
    #[arg(long)]
    pub refresh: bool,
}

impl CheckArgs {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match run_scan(config, self.refresh).await? {
            WorkloadOutcome::Cancelled => {
                println!("{}", "Update check cancelled.".yellow());
                Ok(())
            }
            WorkloadOutcome::Completed(outcome) => {
                let outcome = outcome?;
                print_outcome(&outcome);
                Ok(())
            }
        }
    }
}

/// Runs one scan-and-reconcile pass through the execution shell, with
/// Ctrl-C wired to cancellation. Shared with `upgrade`.
pub(crate) async fn run_scan(
    config: &Config,
    force_refresh: bool,
) -> Result<WorkloadOutcome<Result<ReconcileOutcome>>> {
    let sources = SourceRegistry::new(config).load();
    let scanner = GithubScanner::new(config)?;
    let reconciler = Reconciler::new(config.clone(), scanner);
    let options = ReconcileOptions { force_refresh };

    let handle = shell::spawn(move |progress| async move {
        progress.set("Contacting sources...");
        reconciler.run(&sources, &options, &progress).await
    })?;

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    Ok(progress::watch(handle).await)
}

fn print_outcome(outcome: &ReconcileOutcome) {
    if outcome.is_empty() {
        if outcome.rate_limit_hit {
            println!(
                "{}",
                "Sources are rate limiting us; try again later.".yellow()
            );
        } else {
            println!("{}", "Everything is up to date.".green());
        }
        return;
    }

    if !outcome.patch_updates.is_empty() {
        println!("{}", "Patch updates available:".bold());
        for candidate in &outcome.patch_updates {
            let description = candidate
                .description
                .as_deref()
                .map(|text| format!(" — {text}"))
                .unwrap_or_default();
            println!(
                "  {} {} ({}){}",
                "•".blue(),
                candidate.local.name.bold(),
                candidate.source.slug(),
                description
            );
        }
    }
    if !outcome.plugin_updates.is_empty() {
        println!("{}", "Plugin updates available:".bold());
        for candidate in &outcome.plugin_updates {
            println!(
                "  {} {} {} {} {}",
                "•".blue(),
                candidate.plugin.name.bold(),
                candidate.plugin.version,
                "→".dimmed(),
                candidate.remote_version.green()
            );
        }
    }
    if outcome.rate_limit_hit {
        println!(
            "{}",
            "Some sources were rate limited; the list may be incomplete.".yellow()
        );
    }
    println!("Run {} to install.", "lectern upgrade".bold());
}
