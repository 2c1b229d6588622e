// lectern-net/src/filter.rs
// Release-asset selection. Source filters use glob syntax; the matcher is a
// regex, so the glob is translated: literal dots escaped, `*` becomes "any
// sequence", and the pattern is anchored to the end of the asset name.
use lectern_common::error::{LecternError, Result};
use lectern_common::model::{ReleaseAsset, ReleaseInfo};
use regex::Regex;

/// Fallback when a source configures no filter: any zip archive.
const DEFAULT_ASSET_PATTERN: &str = "*.zip";

pub fn asset_pattern(filter: Option<&str>) -> Result<Regex> {
    let glob = filter.unwrap_or(DEFAULT_ASSET_PATTERN);
    let mut pattern = String::with_capacity(glob.len() + 8);
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            _ => pattern.push_str(&regex::escape(&ch.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
        .map_err(|e| LecternError::Generic(format!("Invalid asset filter '{glob}': {e}")))
}

/// Picks the first asset of the release whose name matches the source's
/// filter pattern.
pub fn select_asset<'a>(
    release: &'a ReleaseInfo,
    filter: Option<&str>,
) -> Result<Option<&'a ReleaseAsset>> {
    let pattern = asset_pattern(filter)?;
    Ok(release
        .assets
        .iter()
        .find(|asset| pattern.is_match(&asset.name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_translation_matches_archives_only() {
        let pattern = asset_pattern(Some("*.koplugin.zip")).unwrap();
        assert!(pattern.is_match("readest-v1.2.0.koplugin.zip"));
        assert!(!pattern.is_match("readest-v1.2.0.AppImage"));
        // The dot is literal, not "any character".
        assert!(!pattern.is_match("readest-v1_2_0_kopluginXzip"));
    }

    #[test]
    fn default_pattern_accepts_any_archive() {
        let pattern = asset_pattern(None).unwrap();
        assert!(pattern.is_match("bundle-1.0.zip"));
        assert!(!pattern.is_match("bundle-1.0.tar.gz"));
    }

    #[test]
    fn pattern_is_anchored_to_end_of_string() {
        let pattern = asset_pattern(Some("*.zip")).unwrap();
        assert!(!pattern.is_match("bundle.zip.sha256"));
    }

    #[test]
    fn selects_first_matching_asset() {
        let release = ReleaseInfo {
            tag: "v1.2.0".to_string(),
            notes: None,
            assets: vec![
                ReleaseAsset {
                    name: "readest-v1.2.0.AppImage".to_string(),
                    size: 10,
                    download_url: "https://example.com/a".to_string(),
                },
                ReleaseAsset {
                    name: "readest-v1.2.0.koplugin.zip".to_string(),
                    size: 20,
                    download_url: "https://example.com/b".to_string(),
                },
            ],
        };
        let asset = select_asset(&release, Some("*.koplugin.zip")).unwrap();
        assert_eq!(asset.unwrap().name, "readest-v1.2.0.koplugin.zip");
        assert!(select_asset(&release, Some("*.exe")).unwrap().is_none());
    }
}
