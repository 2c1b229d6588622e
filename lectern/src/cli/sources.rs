// lectern/src/cli/sources.rs
use clap::Args;
use colored::Colorize;
use lectern_common::config::Config;
use lectern_common::error::Result;
use lectern_common::model::Source;
use lectern_core::SourceRegistry;

#[derive(Args, Debug)]
pub struct SourcesArgs {}

impl SourcesArgs {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let registry = SourceRegistry::new(config);
        let merged = registry.load();
        let overrides = registry.load_overrides();

        println!("{}", "Patch sources:".bold());
        for source in &merged.patches {
            print_patch_source(source);
        }
        println!("{}", "Plugin sources:".bold());
        for source in &merged.plugins {
            print_plugin_source(source);
        }
        if !overrides.is_empty() {
            println!(
                "({} from {})",
                format!(
                    "{} user-defined",
                    overrides.patches.len() + overrides.plugins.len()
                ),
                config.sources_file().display()
            );
        }
        Ok(())
    }
}

fn print_patch_source(source: &Source) {
    let subpath = if source.subpath.is_empty() {
        String::new()
    } else {
        format!("/{}", source.subpath)
    };
    println!(
        "  {} {}@{}{}",
        "•".blue(),
        source.slug().bold(),
        source.branch,
        subpath
    );
}

fn print_plugin_source(source: &Source) {
    let filter = source
        .asset_match
        .as_deref()
        .map(|pattern| format!(" ({pattern})"))
        .unwrap_or_default();
    println!("  {} {}{}", "•".blue(), source.slug().bold(), filter);
}
