// lectern-core/src/inventory/patches.rs
use std::collections::HashMap;

use lectern_common::config::{Config, DISABLED_SUFFIX, PATCH_EXTENSION};
use lectern_common::error::Result;
use lectern_common::fingerprint;
use lectern_common::model::LocalArtifact;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Enumerates installed patches, keyed by name (filename minus extension).
/// Disabled entries are invisible; a missing patches directory is simply an
/// empty inventory.
pub fn scan_patches(config: &Config) -> Result<HashMap<String, LocalArtifact>> {
    let dir = config.patches_dir();
    let mut inventory = HashMap::new();
    if !dir.is_dir() {
        debug!("Patches directory {} does not exist", dir.display());
        return Ok(inventory);
    }

    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error reading entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().to_string();
        if !filename.ends_with(&format!(".{PATCH_EXTENSION}"))
            || filename.contains(DISABLED_SUFFIX)
        {
            continue;
        }
        let name = filename
            .strip_suffix(&format!(".{PATCH_EXTENSION}"))
            .unwrap_or(&filename)
            .to_string();

        let md5 = match fingerprint::md5_of_file(entry.path()) {
            Ok(md5) => md5,
            Err(e) => {
                warn!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

        inventory.insert(
            name.clone(),
            LocalArtifact {
                name,
                path: entry.path().to_path_buf(),
                md5,
                size,
            },
        );
    }
    debug!("Local inventory holds {} patches", inventory.len());
    Ok(inventory)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn scans_patches_and_skips_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_root(dir.path().to_path_buf(), "1.0");
        fs::create_dir_all(config.patches_dir()).unwrap();
        fs::write(config.patches_dir().join("2-fix-margins.lua"), "return 1\n").unwrap();
        fs::write(
            config.patches_dir().join("3-old-hack.lua.disabled"),
            "return 2\n",
        )
        .unwrap();
        fs::write(config.patches_dir().join("notes.txt"), "not a patch").unwrap();

        let inventory = scan_patches(&config).unwrap();
        assert_eq!(inventory.len(), 1);
        let artifact = &inventory["2-fix-margins"];
        assert_eq!(artifact.name, "2-fix-margins");
        assert_eq!(artifact.size, 9);
        assert_eq!(artifact.md5, fingerprint::md5_of_bytes(b"return 1\n"));
    }

    #[test]
    fn missing_directory_is_empty_inventory() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_root(dir.path().join("nowhere"), "1.0");
        assert!(scan_patches(&config).unwrap().is_empty());
    }
}
