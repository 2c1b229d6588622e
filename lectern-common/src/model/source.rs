// lectern-common/src/model/source.rs
use serde::{Deserialize, Serialize};

fn default_branch() -> String {
    "main".to_string()
}

fn is_default_branch(branch: &str) -> bool {
    branch == "main"
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceKind {
    #[default]
    Patch,
    Plugin,
}

/// A configured remote location contributing candidate artifacts. Immutable
/// once loaded for a session; identity is (owner, repo, subpath).
///
/// The kind is not persisted: the override file and the built-in defaults
/// both group sources into separate `patches` / `plugins` lists, and the
/// registry stamps the kind on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(skip)]
    pub kind: SourceKind,
    pub owner: String,
    pub repo: String,
    /// Branch to list patch files from. Unused for plugin sources.
    #[serde(default = "default_branch", skip_serializing_if = "is_default_branch")]
    pub branch: String,
    /// Directory inside the repository holding the patches; empty means the
    /// repository root. Unused for plugin sources.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subpath: String,
    /// Glob filter selecting one release asset. Plugin sources only; when
    /// absent any `.zip` asset matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_match: Option<String>,
}

impl Source {
    pub fn patch(owner: &str, repo: &str, branch: &str, subpath: &str) -> Self {
        Self {
            kind: SourceKind::Patch,
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
            subpath: subpath.to_string(),
            asset_match: None,
        }
    }

    pub fn plugin(owner: &str, repo: &str, asset_match: Option<&str>) -> Self {
        Self {
            kind: SourceKind::Plugin,
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: default_branch(),
            subpath: String::new(),
            asset_match: asset_match.map(str::to_string),
        }
    }

    /// Human-readable coordinates, used in logs and progress text.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Deterministic fragment contributed to the scan cache key.
    pub fn key_fragment(&self) -> String {
        match self.kind {
            SourceKind::Patch => format!(
                "patch:{}/{}@{}/{}",
                self.owner, self.repo, self.branch, self.subpath
            ),
            SourceKind::Plugin => format!(
                "plugin:{}/{}?{}",
                self.owner,
                self.repo,
                self.asset_match.as_deref().unwrap_or("")
            ),
        }
    }
}

/// The full ordered set of configured sources. Doubles as the wire shape of
/// the user override file: `{ "patches": [...], "plugins": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceList {
    #[serde(default)]
    pub patches: Vec<Source>,
    #[serde(default)]
    pub plugins: Vec<Source>,
}

impl SourceList {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty() && self.plugins.is_empty()
    }

    /// Stamp the kind each list implies on its members. Called after any
    /// deserialization, since the kind itself is not persisted.
    pub fn stamp_kinds(&mut self) {
        for source in &mut self.patches {
            source.kind = SourceKind::Patch;
        }
        for source in &mut self.plugins {
            source.kind = SourceKind::Plugin;
        }
    }

    /// Deterministic serialization of the full ordered source list. Two
    /// configurations produce the same key iff they list the same sources in
    /// the same order.
    pub fn cache_key(&self) -> String {
        self.patches
            .iter()
            .chain(self.plugins.iter())
            .map(Source::key_fragment)
            .collect::<Vec<_>>()
            .join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_order_dependent() {
        let a = Source::patch("alice", "patches", "main", "patches");
        let b = Source::patch("bob", "patches", "main", "");
        let one = SourceList {
            patches: vec![a.clone(), b.clone()],
            plugins: vec![],
        };
        let two = SourceList {
            patches: vec![b, a],
            plugins: vec![],
        };
        assert_ne!(one.cache_key(), two.cache_key());
    }

    #[test]
    fn cache_key_covers_plugin_sources() {
        let base = SourceList {
            patches: vec![Source::patch("alice", "patches", "main", "patches")],
            plugins: vec![],
        };
        let mut extended = base.clone();
        extended
            .plugins
            .push(Source::plugin("carol", "reader-tools", Some("*.zip")));
        assert_ne!(base.cache_key(), extended.cache_key());
    }

    #[test]
    fn override_file_shape_round_trips() {
        let mut list = SourceList {
            patches: vec![Source::patch("alice", "patches", "dev", "patches")],
            plugins: vec![Source::plugin("carol", "reader-tools", Some("*.koplugin.zip"))],
        };
        let json = serde_json::to_string(&list).unwrap();
        let mut back: SourceList = serde_json::from_str(&json).unwrap();
        back.stamp_kinds();
        list.stamp_kinds();
        assert_eq!(list, back);
        assert_eq!(json, serde_json::to_string(&back).unwrap());
    }
}
