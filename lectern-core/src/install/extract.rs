// lectern-core/src/install/extract.rs
// Plugin bundles are zip archives expected to contain exactly one top-level
// directory whose contents become the installed plugin's contents. Anything
// else is an installation failure.
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use lectern_common::error::{LecternError, Result};
use tracing::{debug, error};
use zip::read::ZipArchive;

/// Inspects the archive's top level. Returns the single root directory, or
/// an archive-shape error when the layout is anything else.
fn require_single_root(archive_path: &Path) -> Result<PathBuf> {
    let file = File::open(archive_path).map_err(|e| {
        LecternError::Io(std::sync::Arc::new(io::Error::new(
            e.kind(),
            format!("Failed to open archive {}: {}", archive_path.display(), e),
        )))
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        LecternError::ArchiveShape(format!(
            "Failed to open ZIP {}: {}",
            archive_path.display(),
            e
        ))
    })?;

    let mut unique_roots = HashSet::new();
    let mut root_is_dir = false;
    let mut first_root: Option<PathBuf> = None;

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(|e| {
            LecternError::ArchiveShape(format!(
                "Error reading ZIP index {} in {}: {}",
                i,
                archive_path.display(),
                e
            ))
        })?;
        let entry_name = entry.name().to_string();
        let path = PathBuf::from(&entry_name);
        let mut components = path.components();
        let Some(first) = components.next() else {
            continue;
        };
        let Component::Normal(name) = first else {
            return Err(LecternError::ArchiveShape(format!(
                "Non-standard top-level component in {}",
                archive_path.display()
            )));
        };
        let root = PathBuf::from(name);
        if first_root.is_none() {
            first_root = Some(root.clone());
        }
        unique_roots.insert(root);
        if unique_roots.len() > 1 {
            return Err(LecternError::ArchiveShape(format!(
                "Archive {} has multiple top-level entries",
                archive_path.display()
            )));
        }
        // The root counts as a directory once any entry descends into it or
        // names it with a trailing slash.
        if components.next().is_some() || entry_name.ends_with('/') {
            root_is_dir = true;
        }
    }

    match first_root {
        Some(root) if root_is_dir => {
            debug!(
                "Archive {} has single root {}",
                archive_path.display(),
                root.display()
            );
            Ok(root)
        }
        Some(_) => Err(LecternError::ArchiveShape(format!(
            "Archive {} top-level entry is not a directory",
            archive_path.display()
        ))),
        None => Err(LecternError::ArchiveShape(format!(
            "Archive {} is empty",
            archive_path.display()
        ))),
    }
}

/// Extracts the archive into `target_dir` with the single top-level folder
/// stripped, so the folder's contents become `target_dir`'s contents.
pub fn extract_plugin_bundle(archive_path: &Path, target_dir: &Path) -> Result<()> {
    require_single_root(archive_path)?;
    extract_zip_archive(archive_path, target_dir, 1)
}

fn extract_zip_archive(
    archive_path: &Path,
    target_dir: &Path,
    strip_components: usize,
) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        LecternError::ArchiveShape(format!(
            "Failed to open ZIP {}: {}",
            archive_path.display(),
            e
        ))
    })?;
    debug!("Starting ZIP extraction for {}", archive_path.display());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            LecternError::ArchiveShape(format!(
                "Error reading ZIP index {} in {}: {}",
                i,
                archive_path.display(),
                e
            ))
        })?;

        let original_path = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                debug!("Skipping unsafe ZIP entry name {}", entry.name());
                continue;
            }
        };
        let stripped: Vec<Component<'_>> = original_path
            .components()
            .skip(strip_components)
            .collect();
        if stripped.is_empty() {
            continue;
        }

        let mut destination = target_dir.to_path_buf();
        for component in stripped {
            match component {
                Component::Normal(part) => destination.push(part),
                Component::CurDir => {}
                _ => {
                    error!(
                        "Disallowed component in ZIP path {}",
                        original_path.display()
                    );
                    return Err(LecternError::ArchiveShape(format!(
                        "Disallowed component in ZIP path {}",
                        original_path.display()
                    )));
                }
            }
        }
        if !destination.starts_with(target_dir) {
            return Err(LecternError::ArchiveShape(format!(
                "ZIP path traversal detected in {}",
                archive_path.display()
            )));
        }

        if entry.is_dir() {
            fs::create_dir_all(&destination)?;
            continue;
        }
        if let Some(parent) = destination.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut out = File::create(&destination)?;
        io::copy(&mut entry, &mut out)?;
    }
    debug!(
        "Extracted {} into {}",
        archive_path.display(),
        target_dir.display()
    );
    Ok(())
}
