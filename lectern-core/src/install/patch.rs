// lectern-core/src/install/patch.rs
// Patch installation: backup, temp-file materialization, integrity and
// compatibility gates, then an atomic replace. Items are independent; one
// failure never blocks the rest of the batch.
use std::fs;
use std::path::{Path, PathBuf};

use lectern_common::config::{Config, BACKUP_SUFFIX};
use lectern_common::error::{LecternError, Result};
use lectern_common::fingerprint;
use lectern_common::model::version;
use lectern_common::model::{InstallReport, UpdateCandidate};
use tracing::{debug, warn};

use crate::shell::ProgressSender;

/// Marker scanned for in the first lines of a patch: a comment declaring the
/// minimum host version the patch requires.
const COMPAT_MARKER: &str = "min-host-version:";
const COMPAT_SCAN_LINES: usize = 5;

/// Extracts the minimum-host-version requirement from the first few lines of
/// patch content, if one is declared.
pub(crate) fn required_host_version(content: &str) -> Option<String> {
    for line in content.lines().take(COMPAT_SCAN_LINES) {
        if let Some(index) = line.find(COMPAT_MARKER) {
            let rest = &line[index + COMPAT_MARKER.len()..];
            let token = rest
                .split_whitespace()
                .next()?
                .trim_matches(|c: char| !(c.is_ascii_digit() || c == '.'));
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    None
}

fn backup_path(dest: &Path) -> PathBuf {
    let filename = dest.file_name().unwrap_or_default().to_string_lossy();
    dest.with_file_name(format!("{filename}{BACKUP_SUFFIX}"))
}

fn temp_path(dest: &Path) -> PathBuf {
    let filename = dest.file_name().unwrap_or_default().to_string_lossy();
    dest.with_file_name(format!(".{filename}.tmp"))
}

fn install_one(config: &Config, candidate: &UpdateCandidate) -> Result<()> {
    let content = candidate.repo_content.as_deref().ok_or_else(|| {
        LecternError::InstallError(format!(
            "No fetched content for '{}'; reconciliation did not complete",
            candidate.local.name
        ))
    })?;
    let dest = &candidate.local.path;

    // Backup only if the destination currently exists.
    if dest.exists() {
        let backup = backup_path(dest);
        fs::copy(dest, &backup).map_err(|e| {
            LecternError::InstallError(format!(
                "Failed to back up {} to {}: {}",
                dest.display(),
                backup.display(),
                e
            ))
        })?;
        debug!("Backed up {} to {}", dest.display(), backup.display());
    }

    let temp = temp_path(dest);
    fs::write(&temp, content).map_err(|e| {
        LecternError::InstallError(format!("Failed to write {}: {}", temp.display(), e))
    })?;

    // Integrity gate: the materialized bytes must carry exactly the
    // fingerprint recorded during reconciliation.
    let actual = fingerprint::md5_of_file(&temp)?;
    if actual != candidate.expected_md5 {
        let _ = fs::remove_file(&temp);
        return Err(LecternError::ChecksumMismatch(format!(
            "'{}': expected {}, got {}",
            candidate.local.name, candidate.expected_md5, actual
        )));
    }

    // Compatibility gate: honor a declared minimum host version.
    let text = String::from_utf8_lossy(content);
    if let Some(required) = required_host_version(&text) {
        let host = version::normalize(&config.host_version);
        if version::is_newer(&required, &host) {
            let _ = fs::remove_file(&temp);
            return Err(LecternError::Incompatible(format!(
                "'{}' requires host version {} but {} is running",
                candidate.local.name, required, host
            )));
        }
    }

    fs::rename(&temp, dest).map_err(|e| {
        LecternError::InstallError(format!(
            "Failed to replace {} with {}: {}",
            dest.display(),
            temp.display(),
            e
        ))
    })?;
    debug!("Installed {}", dest.display());
    Ok(())
}

pub fn install_patches(
    config: &Config,
    candidates: &[UpdateCandidate],
    progress: &ProgressSender,
) -> InstallReport {
    let mut report = InstallReport::default();
    for candidate in candidates {
        progress.set(format!("Installing patch {}...", candidate.local.name));
        match install_one(config, candidate) {
            Ok(()) => report.record_success(&candidate.local.name),
            Err(e) => {
                warn!("Failed to install '{}': {}", candidate.local.name, e);
                report.record_failure(&candidate.local.name);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use lectern_common::model::{LocalArtifact, RemoteArtifact, Source};

    use super::*;

    fn candidate_for(config: &Config, name: &str, content: &[u8], expected_md5: &str) -> UpdateCandidate {
        let path = config.patches_dir().join(format!("{name}.lua"));
        UpdateCandidate {
            local: LocalArtifact {
                name: name.to_string(),
                path,
                md5: "stale".to_string(),
                size: 5,
            },
            remote: RemoteArtifact {
                name: name.to_string(),
                path: format!("patches/{name}.lua"),
                md5: Some(expected_md5.to_string()),
                size: content.len() as u64,
                download_url: format!("https://example.com/{name}.lua"),
                version: None,
                notes: None,
            },
            source: Source::patch("alice", "patches", "main", "patches"),
            repo_content: Some(content.to_vec()),
            expected_md5: expected_md5.to_string(),
            description: None,
        }
    }

    fn test_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_root(dir.path().to_path_buf(), "1.2");
        fs::create_dir_all(config.patches_dir()).unwrap();
        (dir, config)
    }

    #[test]
    fn integrity_mismatch_leaves_destination_unchanged() {
        let (_dir, config) = test_config();
        let good_body = b"return \"new\"\n";
        let good_md5 = fingerprint::md5_of_bytes(good_body);

        let bad = candidate_for(&config, "1-bad", b"tampered\n", "0000deadbeef0000");
        let good = candidate_for(&config, "2-good", good_body, &good_md5);
        fs::write(&bad.local.path, b"original-bad").unwrap();
        fs::write(&good.local.path, b"original-good").unwrap();

        let report = install_patches(
            &config,
            &[bad.clone(), good.clone()],
            &ProgressSender::detached(),
        );

        assert_eq!(report.failed, vec!["1-bad".to_string()]);
        assert_eq!(report.succeeded, vec!["2-good".to_string()]);
        // The failed item's destination is untouched and its temp removed;
        // the rest of the batch still proceeded.
        assert_eq!(fs::read(&bad.local.path).unwrap(), b"original-bad");
        assert!(!temp_path(&bad.local.path).exists());
        assert_eq!(fs::read(&good.local.path).unwrap(), good_body);
    }

    #[test]
    fn unmet_host_version_requirement_aborts_the_item() {
        let (_dir, config) = test_config();
        let body = b"-- min-host-version: 9.9\nreturn 1\n";
        let md5 = fingerprint::md5_of_bytes(body);
        let candidate = candidate_for(&config, "3-future", body, &md5);
        fs::write(&candidate.local.path, b"original").unwrap();

        let report = install_patches(&config, &[candidate.clone()], &ProgressSender::detached());

        assert_eq!(report.failed, vec!["3-future".to_string()]);
        assert_eq!(fs::read(&candidate.local.path).unwrap(), b"original");
        assert!(!temp_path(&candidate.local.path).exists());
    }

    #[test]
    fn successful_install_backs_up_and_replaces() {
        let (_dir, config) = test_config();
        let body = b"-- min-host-version: 1.1\nreturn \"new\"\n";
        let md5 = fingerprint::md5_of_bytes(body);
        let candidate = candidate_for(&config, "4-fine", body, &md5);
        fs::write(&candidate.local.path, b"old body").unwrap();

        let report = install_patches(&config, &[candidate.clone()], &ProgressSender::detached());

        assert_eq!(report.succeeded, vec!["4-fine".to_string()]);
        assert_eq!(fs::read(&candidate.local.path).unwrap(), body);
        let backup = backup_path(&candidate.local.path);
        assert_eq!(fs::read(&backup).unwrap(), b"old body");
    }

    #[test]
    fn fresh_destination_is_installed_without_backup() {
        let (_dir, config) = test_config();
        let body = b"return 1\n";
        let md5 = fingerprint::md5_of_bytes(body);
        let candidate = candidate_for(&config, "5-new", body, &md5);

        let report = install_patches(&config, &[candidate.clone()], &ProgressSender::detached());

        assert_eq!(report.succeeded, vec!["5-new".to_string()]);
        assert!(!backup_path(&candidate.local.path).exists());
    }

    #[test]
    fn marker_is_only_honored_in_leading_lines() {
        assert_eq!(
            required_host_version("-- min-host-version: 2.3\nreturn 1\n"),
            Some("2.3".to_string())
        );
        let buried = format!("{}-- min-host-version: 2.3\n", "return 1\n".repeat(COMPAT_SCAN_LINES));
        assert_eq!(required_host_version(&buried), None);
        assert_eq!(required_host_version("return 1\n"), None);
    }
}
