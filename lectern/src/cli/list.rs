// lectern/src/cli/list.rs
use clap::Args;
use colored::Colorize;
use lectern_common::config::Config;
use lectern_common::error::Result;
use lectern_core::inventory;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Include plugins bundled with the host
    #[arg(long)]
    pub all: bool,
}

impl ListArgs {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let patches = inventory::scan_patches(config)?;
        let plugins = inventory::scan_plugins(config, self.all)?;

        if patches.is_empty() && plugins.is_empty() {
            println!("Nothing installed.");
            return Ok(());
        }

        if !patches.is_empty() {
            println!("{}", "Patches:".bold());
            let mut names: Vec<_> = patches.keys().collect();
            names.sort();
            for name in names {
                let artifact = &patches[name];
                println!(
                    "  {} {} ({} bytes, {})",
                    "•".blue(),
                    artifact.name.bold(),
                    artifact.size,
                    &artifact.md5[..8.min(artifact.md5.len())]
                );
            }
        }
        if !plugins.is_empty() {
            println!("{}", "Plugins:".bold());
            for plugin in &plugins {
                let description = plugin
                    .description
                    .as_deref()
                    .map(|text| format!(" — {text}"))
                    .unwrap_or_default();
                println!(
                    "  {} {} {}{}",
                    "•".blue(),
                    plugin.name.bold(),
                    plugin.version,
                    description
                );
            }
        }
        Ok(())
    }
}
