// lectern-core/src/install/plugin.rs
// Plugin installation: recursive backup of the installed directory, asset
// download to a cache-scoped temp path, destructive removal, extraction with
// the archive's root stripped. The backup must exist before the removal —
// once removal starts it is the sole recovery path.
use std::fs;
use std::path::{Path, PathBuf};

use lectern_common::config::Config;
use lectern_common::error::{LecternError, Result};
use lectern_common::model::{InstallReport, PluginUpdateCandidate};
use lectern_net::scanner::RemoteScanner;
use tracing::{debug, warn};

use crate::install::extract;
use crate::shell::ProgressSender;

const BACKUP_DIR_SUFFIX: &str = ".backup";

fn backup_dir(config: &Config, dir_name: &str) -> PathBuf {
    config.plugins_dir().join(format!("{dir_name}{BACKUP_DIR_SUFFIX}"))
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    let mut options = fs_extra::dir::CopyOptions::new();
    options.copy_inside = true;
    fs_extra::dir::copy(src, dest, &options).map_err(|e| {
        LecternError::InstallError(format!(
            "Failed to copy {} to {}: {}",
            src.display(),
            dest.display(),
            e
        ))
    })?;
    Ok(())
}

async fn install_one<S: RemoteScanner>(
    config: &Config,
    scanner: &S,
    candidate: &PluginUpdateCandidate,
) -> Result<()> {
    let installed_dir = &candidate.plugin.path;
    let backup = backup_dir(config, &candidate.plugin.dir_name);

    // Refresh the backup: drop any stale one, then copy the current install.
    if backup.exists() {
        fs::remove_dir_all(&backup).map_err(|e| {
            LecternError::InstallError(format!(
                "Failed to remove stale backup {}: {}",
                backup.display(),
                e
            ))
        })?;
    }
    copy_dir_recursive(installed_dir, &backup)?;
    debug!(
        "Backed up {} to {}",
        installed_dir.display(),
        backup.display()
    );

    let archive_path = config.cache_dir().join(&candidate.asset.name);
    fs::create_dir_all(config.cache_dir())?;
    scanner.download_asset(&candidate.asset, &archive_path).await?;

    // From here on the backup is the recovery path.
    let outcome = (|| -> Result<()> {
        fs::remove_dir_all(installed_dir).map_err(|e| {
            LecternError::InstallError(format!(
                "Failed to remove {}: {}",
                installed_dir.display(),
                e
            ))
        })?;
        extract::extract_plugin_bundle(&archive_path, installed_dir)
    })();

    // The temporary archive goes away regardless of outcome.
    if let Err(e) = fs::remove_file(&archive_path) {
        debug!(
            "Could not remove temporary archive {}: {}",
            archive_path.display(),
            e
        );
    }

    outcome
}

pub async fn install_plugins<S: RemoteScanner>(
    config: &Config,
    scanner: &S,
    candidates: &[PluginUpdateCandidate],
    progress: &ProgressSender,
) -> InstallReport {
    let mut report = InstallReport::default();
    for candidate in candidates {
        progress.set(format!(
            "Installing plugin {} {}...",
            candidate.plugin.name, candidate.remote_version
        ));
        match install_one(config, scanner, candidate).await {
            Ok(()) => report.record_success(&candidate.plugin.name),
            Err(e) => {
                warn!("Failed to install '{}': {}", candidate.plugin.name, e);
                report.record_failure(&candidate.plugin.name);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use lectern_common::model::{
        InstalledPlugin, ReleaseAsset, ReleaseInfo, RemoteArtifact, Source,
    };
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    /// Serves a prepared archive body instead of the network.
    struct StubDownloader {
        body: Vec<u8>,
    }

    impl RemoteScanner for StubDownloader {
        async fn list_patches(&self, _source: &Source) -> Result<Vec<RemoteArtifact>> {
            unreachable!("not used by the plugin installer")
        }

        async fn fetch_patch_body(&self, _artifact: &RemoteArtifact) -> Result<Vec<u8>> {
            unreachable!("not used by the plugin installer")
        }

        async fn latest_release(&self, _source: &Source) -> Result<ReleaseInfo> {
            unreachable!("not used by the plugin installer")
        }

        async fn download_asset(&self, _asset: &ReleaseAsset, dest: &Path) -> Result<()> {
            fs::write(dest, &self.body)?;
            Ok(())
        }
    }

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            for (name, body) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(body).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn installed_plugin(config: &Config) -> PluginUpdateCandidate {
        let dir = config.plugins_dir().join("margin-notes.plugin");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("plugin.toml"), "name = \"margin-notes\"\nversion = \"1.0\"\n").unwrap();
        fs::write(dir.join("main.lua"), "return { old = true }\n").unwrap();
        PluginUpdateCandidate {
            plugin: InstalledPlugin {
                name: "margin-notes".to_string(),
                display_name: "Margin Notes".to_string(),
                version: "1.0".to_string(),
                description: None,
                path: dir,
                dir_name: "margin-notes.plugin".to_string(),
            },
            source: Source::plugin("carol", "margin-notes.plugin", None),
            remote_version: "1.1.0".to_string(),
            notes: None,
            asset: ReleaseAsset {
                name: "margin-notes-v1.1.0.zip".to_string(),
                size: 0,
                download_url: "https://example.com/margin-notes-v1.1.0.zip".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn replaces_the_installed_directory_with_the_archive_contents() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_root(dir.path().to_path_buf(), "1.2");
        let candidate = installed_plugin(&config);
        let scanner = StubDownloader {
            body: zip_bytes(&[
                ("margin-notes.plugin/plugin.toml", b"name = \"margin-notes\"\nversion = \"1.1.0\"\n"),
                ("margin-notes.plugin/main.lua", b"return { new = true }\n"),
            ]),
        };

        let report = install_plugins(
            &config,
            &scanner,
            std::slice::from_ref(&candidate),
            &ProgressSender::detached(),
        )
        .await;

        assert_eq!(report.succeeded, vec!["margin-notes".to_string()]);
        let main = fs::read_to_string(candidate.plugin.path.join("main.lua")).unwrap();
        assert_eq!(main, "return { new = true }\n");
        // Backup of the previous install survives.
        let backup = backup_dir(&config, "margin-notes.plugin");
        assert_eq!(
            fs::read_to_string(backup.join("main.lua")).unwrap(),
            "return { old = true }\n"
        );
        // Temporary archive was cleaned up.
        assert!(!config.cache_dir().join(&candidate.asset.name).exists());
    }

    #[tokio::test]
    async fn bad_archive_shape_fails_but_keeps_the_backup() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_root(dir.path().to_path_buf(), "1.2");
        let candidate = installed_plugin(&config);
        let scanner = StubDownloader {
            body: zip_bytes(&[("a/x.lua", b"1"), ("b/y.lua", b"2")]),
        };

        let report = install_plugins(
            &config,
            &scanner,
            std::slice::from_ref(&candidate),
            &ProgressSender::detached(),
        )
        .await;

        assert_eq!(report.failed, vec!["margin-notes".to_string()]);
        let backup = backup_dir(&config, "margin-notes.plugin");
        assert!(backup.join("main.lua").is_file());
        assert!(!config.cache_dir().join(&candidate.asset.name).exists());
    }
}
