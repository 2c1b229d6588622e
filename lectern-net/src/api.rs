// lectern-net/src/api.rs
// GitHub-shaped endpoints: repository content listings for patch sources and
// the single latest-release lookup for plugin sources.
use std::collections::HashMap;

use lectern_common::config::MANIFEST_FILE;
use lectern_common::error::{LecternError, Result};
use lectern_common::model::{ReleaseAsset, ReleaseInfo, Source};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::auth::ApiCredentials;
use crate::http;

const API_BASE_URL: &str = "https://api.github.com";
const RAW_BASE_URL: &str = "https://raw.githubusercontent.com";

/// One entry of a repository directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub download_url: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: String,
}

/// Per-artifact annotations a patch source may publish as a companion
/// manifest next to its patches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

pub type Manifest = HashMap<String, ManifestEntry>;

fn contents_url(source: &Source) -> String {
    let mut url = format!(
        "{}/repos/{}/{}/contents",
        API_BASE_URL, source.owner, source.repo
    );
    if !source.subpath.is_empty() {
        url.push('/');
        url.push_str(&source.subpath);
    }
    url.push_str(&format!("?ref={}", source.branch));
    url
}

fn manifest_url(source: &Source) -> String {
    let mut url = format!(
        "{}/{}/{}/{}",
        RAW_BASE_URL, source.owner, source.repo, source.branch
    );
    if !source.subpath.is_empty() {
        url.push('/');
        url.push_str(&source.subpath);
    }
    url.push('/');
    url.push_str(MANIFEST_FILE);
    url
}

fn latest_release_url(source: &Source) -> String {
    format!(
        "{}/repos/{}/{}/releases/latest",
        API_BASE_URL, source.owner, source.repo
    )
}

/// Lists the files available at a patch source's (owner, repo, branch,
/// subpath) coordinates. Directories and other non-file entries are dropped.
pub async fn list_contents(
    client: &Client,
    creds: &ApiCredentials,
    source: &Source,
) -> Result<Vec<ContentEntry>> {
    let url = contents_url(source);
    debug!("Listing contents of {} at {}", source.slug(), url);
    let body = http::fetch_text(client, creds, &url).await?;
    let entries: Vec<ContentEntry> = serde_json::from_str(&body)
        .map_err(|e| LecternError::Api(format!("Unexpected listing shape from {url}: {e}")))?;
    Ok(entries
        .into_iter()
        .filter(|entry| entry.entry_type == "file")
        .collect())
}

/// Fetches the companion manifest, if the source publishes one. Absence and
/// malformation both yield `None`: the manifest is an annotation layer, never
/// a prerequisite.
pub async fn fetch_manifest(
    client: &Client,
    creds: &ApiCredentials,
    source: &Source,
) -> Option<Manifest> {
    let url = manifest_url(source);
    match http::fetch_text(client, creds, &url).await {
        Ok(body) => match serde_json::from_str::<Manifest>(&body) {
            Ok(manifest) => {
                debug!(
                    "Companion manifest for {} lists {} artifacts",
                    source.slug(),
                    manifest.len()
                );
                Some(manifest)
            }
            Err(e) => {
                debug!("Ignoring malformed companion manifest at {}: {}", url, e);
                None
            }
        },
        Err(e) => {
            debug!("No companion manifest for {}: {}", source.slug(), e);
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    tag_name: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    assets: Vec<AssetPayload>,
}

#[derive(Debug, Deserialize)]
struct AssetPayload {
    name: String,
    size: u64,
    browser_download_url: String,
}

/// Fetches the latest release published by a plugin source.
pub async fn latest_release(
    client: &Client,
    creds: &ApiCredentials,
    source: &Source,
) -> Result<ReleaseInfo> {
    let url = latest_release_url(source);
    debug!("Fetching latest release of {} at {}", source.slug(), url);
    let body = http::fetch_text(client, creds, &url).await?;
    let payload: ReleasePayload = serde_json::from_str(&body)
        .map_err(|e| LecternError::Api(format!("Unexpected release shape from {url}: {e}")))?;
    Ok(ReleaseInfo {
        tag: payload.tag_name,
        notes: payload.body,
        assets: payload
            .assets
            .into_iter()
            .map(|asset| ReleaseAsset {
                name: asset.name,
                size: asset.size,
                download_url: asset.browser_download_url,
            })
            .collect(),
    })
}
