// lectern-core/src/registry.rs
// The source registry: built-in defaults merged with user overrides. The
// merged list is ordered (defaults first, overrides appended) and never
// de-duplicated: a source listed twice is scanned twice, which lets a user
// mirror a flaky default on purpose.
use std::fs;

use lectern_common::config::Config;
use lectern_common::error::Result;
use lectern_common::model::{Source, SourceList};
use tracing::{debug, warn};

/// Built-in default sources. Plain configuration data; user overrides are
/// appended after these.
pub fn default_sources() -> SourceList {
    SourceList {
        patches: vec![
            Source::patch("lectern-community", "patches", "main", "patches"),
            Source::patch("lectern-community", "patch-lab", "main", ""),
        ],
        plugins: vec![
            Source::plugin("lectern-community", "margin-notes.plugin", None),
            Source::plugin("lectern-community", "web-dictionary.plugin", None),
        ],
    }
}

pub struct SourceRegistry {
    config: Config,
}

impl SourceRegistry {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// The full ordered source list for this session: defaults first, then
    /// the user-supplied overrides.
    pub fn load(&self) -> SourceList {
        let mut merged = default_sources();
        let overrides = self.load_overrides();
        merged.patches.extend(overrides.patches);
        merged.plugins.extend(overrides.plugins);
        merged.stamp_kinds();
        merged
    }

    /// The user-supplied portion alone. An absent or malformed override file
    /// degrades to an empty list; it must never abort the registry load.
    pub fn load_overrides(&self) -> SourceList {
        let path = self.config.sources_file();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("No source overrides at {}", path.display());
                return SourceList::default();
            }
        };
        match serde_json::from_str::<SourceList>(&raw) {
            Ok(mut list) => {
                list.stamp_kinds();
                list
            }
            Err(e) => {
                warn!(
                    "Ignoring malformed source overrides at {}: {}",
                    path.display(),
                    e
                );
                SourceList::default()
            }
        }
    }

    /// Persists the user-supplied portion only.
    pub fn save_overrides(&self, overrides: &SourceList) -> Result<()> {
        let path = self.config.sources_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(overrides)?;
        fs::write(&path, json)?;
        debug!("Saved source overrides to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_root(dir.path().to_path_buf(), "1.0");
        (dir, config)
    }

    #[test]
    fn overrides_round_trip_preserving_order() {
        let (_dir, config) = test_config();
        let registry = SourceRegistry::new(&config);

        let mut overrides = SourceList {
            patches: vec![
                Source::patch("zoe", "z-patches", "main", "patches"),
                Source::patch("abe", "a-patches", "dev", ""),
            ],
            plugins: vec![Source::plugin("zoe", "night-mode.plugin", Some("*.zip"))],
        };
        overrides.stamp_kinds();

        registry.save_overrides(&overrides).unwrap();
        let reloaded = registry.load_overrides();
        assert_eq!(overrides, reloaded);

        // Byte-for-byte stable across a second save of the reloaded list.
        let first = serde_json::to_string_pretty(&overrides).unwrap();
        let second = serde_json::to_string_pretty(&reloaded).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn merged_list_appends_overrides_after_defaults() {
        let (_dir, config) = test_config();
        let registry = SourceRegistry::new(&config);
        let mut overrides = SourceList::default();
        overrides
            .patches
            .push(Source::patch("zoe", "z-patches", "main", "patches"));
        registry.save_overrides(&overrides).unwrap();

        let merged = registry.load();
        let defaults = default_sources();
        assert_eq!(merged.patches.len(), defaults.patches.len() + 1);
        assert_eq!(
            merged.patches.last().unwrap().slug(),
            "zoe/z-patches",
            "user sources come after the defaults"
        );
    }

    #[test]
    fn duplicate_sources_are_kept() {
        let (_dir, config) = test_config();
        let registry = SourceRegistry::new(&config);
        let duplicate = default_sources().patches[0].clone();
        let overrides = SourceList {
            patches: vec![duplicate.clone()],
            plugins: vec![],
        };
        registry.save_overrides(&overrides).unwrap();

        let merged = registry.load();
        let count = merged.patches.iter().filter(|s| **s == duplicate).count();
        assert_eq!(count, 2);
    }

    #[test]
    fn malformed_override_file_degrades_to_defaults() {
        let (_dir, config) = test_config();
        fs::create_dir_all(config.settings_dir()).unwrap();
        fs::write(config.sources_file(), "{ not json").unwrap();

        let registry = SourceRegistry::new(&config);
        assert!(registry.load_overrides().is_empty());
        assert_eq!(registry.load(), {
            let mut d = default_sources();
            d.stamp_kinds();
            d
        });
    }
}
