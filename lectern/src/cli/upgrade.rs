// lectern/src/cli/upgrade.rs
use clap::Args;
use colored::Colorize;
use dialoguer::MultiSelect;
use lectern_common::config::Config;
use lectern_common::error::{LecternError, Result};
use lectern_common::model::{InstallReport, PluginUpdateCandidate, UpdateCandidate};
use lectern_core::install;
use lectern_core::shell::{self, WorkloadOutcome};
use lectern_net::GithubScanner;

use crate::cli::check;
use crate::progress;

#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Scan sources even if a fresh cached snapshot exists
    #[arg(long)]
    pub refresh: bool,

    /// Install every available update without asking
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl UpgradeArgs {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let outcome = match check::run_scan(config, self.refresh).await? {
            WorkloadOutcome::Cancelled => {
                println!("{}", "Update check cancelled.".yellow());
                return Ok(());
            }
            WorkloadOutcome::Completed(outcome) => outcome?,
        };

        if outcome.rate_limit_hit {
            println!(
                "{}",
                "Some sources were rate limited; the list may be incomplete.".yellow()
            );
        }
        if outcome.is_empty() {
            if !outcome.rate_limit_hit {
                println!("{}", "Everything is up to date.".green());
            }
            return Ok(());
        }

        let (patches, plugins) = if self.yes {
            (outcome.patch_updates, outcome.plugin_updates)
        } else {
            select_candidates(outcome.patch_updates, outcome.plugin_updates)?
        };
        if patches.is_empty() && plugins.is_empty() {
            println!("Nothing selected.");
            return Ok(());
        }

        // Install batches run to completion once started; no mid-batch
        // cancellation.
        let install_config = config.clone();
        let scanner = GithubScanner::new(config)?;
        let handle = shell::spawn(move |progress| async move {
            let mut report = InstallReport::default();
            report.merge(install::install_patches(
                &install_config,
                &patches,
                &progress,
            ));
            report.merge(
                install::install_plugins(&install_config, &scanner, &plugins, &progress).await,
            );
            report
        })?;

        match progress::watch(handle).await {
            WorkloadOutcome::Cancelled => {
                println!("{}", "Installation cancelled.".yellow());
                Ok(())
            }
            WorkloadOutcome::Completed(report) => {
                print_report(&report);
                Ok(())
            }
        }
    }
}

/// Hands the candidate list to the selection UI and returns the chosen
/// subset.
fn select_candidates(
    patches: Vec<UpdateCandidate>,
    plugins: Vec<PluginUpdateCandidate>,
) -> Result<(Vec<UpdateCandidate>, Vec<PluginUpdateCandidate>)> {
    let mut labels = Vec::with_capacity(patches.len() + plugins.len());
    for candidate in &patches {
        labels.push(format!(
            "patch  {} ({})",
            candidate.local.name,
            candidate.source.slug()
        ));
    }
    for candidate in &plugins {
        labels.push(format!(
            "plugin {} {} → {}",
            candidate.plugin.name, candidate.plugin.version, candidate.remote_version
        ));
    }

    let chosen = MultiSelect::new()
        .with_prompt("Select updates to install")
        .items(&labels)
        .defaults(&vec![true; labels.len()])
        .interact()
        .map_err(|e| LecternError::Generic(format!("Selection failed: {e}")))?;

    let mut chosen_patches = Vec::new();
    let mut chosen_plugins = Vec::new();
    for index in chosen {
        if index < patches.len() {
            chosen_patches.push(patches[index].clone());
        } else {
            chosen_plugins.push(plugins[index - patches.len()].clone());
        }
    }
    Ok((chosen_patches, chosen_plugins))
}

fn print_report(report: &InstallReport) {
    for name in &report.succeeded {
        println!("  {} {}", "✓".green(), name);
    }
    for name in &report.failed {
        println!("  {} {}", "✗".red(), name);
    }
    println!(
        "{} updated, {} failed.",
        report.succeeded.len().to_string().green(),
        report.failed.len().to_string().red()
    );
}
