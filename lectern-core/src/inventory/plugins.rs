// lectern-core/src/inventory/plugins.rs
use lectern_common::config::{Config, BUNDLED_PLUGINS, PLUGIN_DIR_SUFFIX, PLUGIN_META_FILE};
use lectern_common::error::Result;
use lectern_common::model::InstalledPlugin;
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A descriptor's version field. Authors sometimes write `version = 1.0`
/// instead of a quoted string; the value is coerced to its string form
/// before any comparison.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum VersionField {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl VersionField {
    fn coerce(&self) -> String {
        match self {
            VersionField::Text(text) => text.clone(),
            VersionField::Integer(value) => value.to_string(),
            VersionField::Float(value) => {
                if value.fract() == 0.0 {
                    format!("{value:.1}")
                } else {
                    format!("{value}")
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct PluginMeta {
    name: Option<String>,
    display_name: Option<String>,
    version: Option<VersionField>,
    description: Option<String>,
}

/// Enumerates installed plugin bundles: directories with the plugin suffix
/// carrying a readable descriptor. Host-bundled plugins are excluded unless
/// explicitly requested.
pub fn scan_plugins(config: &Config, include_bundled: bool) -> Result<Vec<InstalledPlugin>> {
    let dir = config.plugins_dir();
    let mut installed = Vec::new();
    if !dir.is_dir() {
        debug!("Plugins directory {} does not exist", dir.display());
        return Ok(installed);
    }

    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error reading entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().to_string();
        if !dir_name.ends_with(PLUGIN_DIR_SUFFIX) {
            continue;
        }
        let meta_path = entry.path().join(PLUGIN_META_FILE);
        let raw = match std::fs::read_to_string(&meta_path) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("Skipping {} (no descriptor)", entry.path().display());
                continue;
            }
        };
        let meta: PluginMeta = match toml::from_str(&raw) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Skipping {}: bad descriptor: {}", meta_path.display(), e);
                continue;
            }
        };

        let fallback_name = dir_name
            .strip_suffix(PLUGIN_DIR_SUFFIX)
            .unwrap_or(&dir_name)
            .to_string();
        let name = meta.name.unwrap_or(fallback_name);
        if !include_bundled && BUNDLED_PLUGINS.contains(&name.as_str()) {
            debug!("Excluding bundled plugin {}", name);
            continue;
        }

        installed.push(InstalledPlugin {
            display_name: meta.display_name.unwrap_or_else(|| name.clone()),
            version: meta
                .version
                .map(|v| v.coerce())
                .unwrap_or_else(|| "0".to_string()),
            description: meta.description,
            path: entry.path().to_path_buf(),
            dir_name,
            name,
        });
    }
    debug!("Local inventory holds {} plugins", installed.len());
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn write_plugin(root: &Path, dir_name: &str, meta: &str) {
        let dir = root.join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(PLUGIN_META_FILE), meta).unwrap();
    }

    fn test_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_root(dir.path().to_path_buf(), "1.0");
        fs::create_dir_all(config.plugins_dir()).unwrap();
        (dir, config)
    }

    #[test]
    fn numeric_version_is_coerced_to_string() {
        let (_dir, config) = test_config();
        write_plugin(
            &config.plugins_dir(),
            "margin-notes.plugin",
            "name = \"margin-notes\"\nversion = 1.0\n",
        );

        let installed = scan_plugins(&config, false).unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].version, "1.0");
    }

    #[test]
    fn integer_version_is_coerced_to_string() {
        let (_dir, config) = test_config();
        write_plugin(
            &config.plugins_dir(),
            "margin-notes.plugin",
            "name = \"margin-notes\"\nversion = 2\n",
        );

        let installed = scan_plugins(&config, false).unwrap();
        assert_eq!(installed[0].version, "2");
    }

    #[test]
    fn directories_without_descriptor_are_skipped() {
        let (_dir, config) = test_config();
        fs::create_dir_all(config.plugins_dir().join("orphan.plugin")).unwrap();
        write_plugin(
            &config.plugins_dir(),
            "margin-notes.plugin",
            "name = \"margin-notes\"\nversion = \"0.3\"\n",
        );

        let installed = scan_plugins(&config, false).unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].name, "margin-notes");
    }

    #[test]
    fn bundled_plugins_are_excluded_by_default() {
        let (_dir, config) = test_config();
        write_plugin(
            &config.plugins_dir(),
            "dictionary.plugin",
            "name = \"dictionary\"\nversion = \"1.0\"\n",
        );

        assert!(scan_plugins(&config, false).unwrap().is_empty());
        assert_eq!(scan_plugins(&config, true).unwrap().len(), 1);
    }

    #[test]
    fn name_falls_back_to_directory_stem() {
        let (_dir, config) = test_config();
        write_plugin(
            &config.plugins_dir(),
            "night-mode.plugin",
            "version = \"0.1\"\n",
        );

        let installed = scan_plugins(&config, false).unwrap();
        assert_eq!(installed[0].name, "night-mode");
        assert_eq!(installed[0].dir_name, "night-mode.plugin");
    }
}
