// lectern-common/src/model/artifact.rs
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::source::Source;

/// An artifact published by a patch source, as seen by the remote scanner.
/// The fingerprint is optional: a companion manifest may declare it, and the
/// reconciler computes it lazily otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArtifact {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    pub size: u64,
    pub download_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// An installed script patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    pub name: String,
    pub path: PathBuf,
    pub md5: String,
    pub size: u64,
}

/// An installed plugin bundle, read from its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    pub name: String,
    pub display_name: String,
    pub version: String,
    pub description: Option<String>,
    pub path: PathBuf,
    /// On-disk directory name, kept separately because matching against
    /// sources may fall back to it.
    pub dir_name: String,
}

/// Latest-release metadata for a plugin source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseInfo {
    pub tag: String,
    pub notes: Option<String>,
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub size: u64,
    pub download_url: String,
}

/// One entry of the persisted scan snapshot: the artifact plus the source
/// it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPatch {
    pub patch: RemoteArtifact,
    pub repo_config: Source,
}

/// A stale local patch paired with its newer remote counterpart. Created
/// during reconciliation, consumed by the installer, never persisted.
#[derive(Debug, Clone)]
pub struct UpdateCandidate {
    pub local: LocalArtifact,
    pub remote: RemoteArtifact,
    pub source: Source,
    /// Fetched remote content. Populated lazily, only once a difference was
    /// detected.
    pub repo_content: Option<Vec<u8>>,
    /// Fingerprint recorded at reconciliation time; the installer recomputes
    /// and must match it exactly.
    pub expected_md5: String,
    pub description: Option<String>,
}

/// An installed plugin paired with a strictly newer release.
#[derive(Debug, Clone)]
pub struct PluginUpdateCandidate {
    pub plugin: InstalledPlugin,
    pub source: Source,
    /// Release tag with any leading version-tag prefix stripped.
    pub remote_version: String,
    pub notes: Option<String>,
    pub asset: ReleaseAsset,
}

/// Everything one reconciliation pass produced.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub patch_updates: Vec<UpdateCandidate>,
    pub plugin_updates: Vec<PluginUpdateCandidate>,
    pub rate_limit_hit: bool,
}

impl ReconcileOutcome {
    pub fn is_empty(&self) -> bool {
        self.patch_updates.is_empty() && self.plugin_updates.is_empty()
    }
}

/// Per-batch installation outcome. Every item lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl InstallReport {
    pub fn record_success(&mut self, name: &str) {
        self.succeeded.push(name.to_string());
    }

    pub fn record_failure(&mut self, name: &str) {
        self.failed.push(name.to_string());
    }

    pub fn merge(&mut self, other: InstallReport) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }
}
