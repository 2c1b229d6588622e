// lectern-common/src/config.rs
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::Result;

// Fallback host version if neither the environment nor the VERSION file
// provides one.
const DEFAULT_HOST_VERSION: &str = "1.0";

/// File extension of script patches.
pub const PATCH_EXTENSION: &str = "lua";
/// Suffix marking an artifact as disabled; disabled artifacts are invisible
/// to inventory and remote listings alike.
pub const DISABLED_SUFFIX: &str = ".disabled";
/// Suffix of the backup copy written before a patch is replaced.
pub const BACKUP_SUFFIX: &str = ".old";
/// Suffix of installed plugin bundle directories.
pub const PLUGIN_DIR_SUFFIX: &str = ".plugin";
/// Descriptor file every plugin bundle must carry.
pub const PLUGIN_META_FILE: &str = "plugin.toml";
/// Companion manifest a patch source may publish next to its patches.
pub const MANIFEST_FILE: &str = "updates.json";

/// Plugin names bundled with the host application. These ship with the host
/// and are excluded from inventory unless explicitly requested.
pub const BUNDLED_PLUGINS: &[&str] = &["dictionary", "gestures", "search", "statistics", "sync"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host_root: PathBuf,
    pub host_version: String,
    pub github_token: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading lectern configuration");

        let host_root = env::var("LECTERN_HOME")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("lectern")
            });
        debug!("Effective host root: {}", host_root.display());

        let host_version = env::var("LECTERN_HOST_VERSION")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                fs::read_to_string(host_root.join("VERSION"))
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_else(|| DEFAULT_HOST_VERSION.to_string());

        let github_token = env::var("LECTERN_GITHUB_TOKEN")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self {
            host_root,
            host_version,
            github_token,
        })
    }

    /// Construct a config rooted at an explicit directory. Used by tests and
    /// by callers embedding lectern into a host with a known layout.
    pub fn with_root(host_root: PathBuf, host_version: &str) -> Self {
        Self {
            host_root,
            host_version: host_version.to_string(),
            github_token: None,
        }
    }

    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    /// Directory holding installed script patches.
    pub fn patches_dir(&self) -> PathBuf {
        self.host_root.join("patches")
    }

    /// Directory holding installed plugin bundles.
    pub fn plugins_dir(&self) -> PathBuf {
        self.host_root.join("plugins")
    }

    pub fn settings_dir(&self) -> PathBuf {
        self.host_root.join("settings")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.host_root.join("cache")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.host_root.join("logs")
    }

    /// User-supplied source overrides, appended after the built-in defaults.
    pub fn sources_file(&self) -> PathBuf {
        self.settings_dir().join("update_sources.json")
    }

    /// Snapshot of the last successful remote scan.
    pub fn snapshot_file(&self) -> PathBuf {
        self.cache_dir().join("update_check.json")
    }

    /// User-editable per-artifact description overrides.
    pub fn descriptions_file(&self) -> PathBuf {
        self.settings_dir().join("patch_descriptions.json")
    }

    /// Artifact names excluded from the update-candidate set.
    pub fn ignore_file(&self) -> PathBuf {
        self.settings_dir().join("update_ignore.txt")
    }
}
