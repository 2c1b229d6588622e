// lectern-net/src/scanner.rs
use std::future::Future;
use std::path::Path;

use lectern_common::config::{Config, DISABLED_SUFFIX, PATCH_EXTENSION};
use lectern_common::error::{LecternError, Result};
use lectern_common::model::{ReleaseAsset, ReleaseInfo, RemoteArtifact, Source};
use reqwest::Client;
use tracing::debug;

use crate::api;
use crate::auth::ApiCredentials;
use crate::http;

/// The remote side of reconciliation. The reconciler and the plugin
/// installer are generic over this trait so tests can substitute canned
/// state for the network.
pub trait RemoteScanner {
    /// Lists the patch artifacts one source currently publishes.
    fn list_patches(
        &self,
        source: &Source,
    ) -> impl Future<Output = Result<Vec<RemoteArtifact>>> + Send;

    /// Fetches the body of one listed artifact.
    fn fetch_patch_body(
        &self,
        artifact: &RemoteArtifact,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Fetches the latest release a plugin source has published.
    fn latest_release(&self, source: &Source) -> impl Future<Output = Result<ReleaseInfo>> + Send;

    /// Downloads a release asset to `dest`.
    fn download_asset(
        &self,
        asset: &ReleaseAsset,
        dest: &Path,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Production scanner backed by the GitHub API.
#[derive(Debug, Clone)]
pub struct GithubScanner {
    client: Client,
    creds: ApiCredentials,
}

impl GithubScanner {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: http::build_http_client()?,
            creds: ApiCredentials::from_config(config),
        })
    }

    fn is_patch_file(name: &str) -> bool {
        name.ends_with(&format!(".{PATCH_EXTENSION}")) && !name.contains(DISABLED_SUFFIX)
    }

    fn artifact_name(filename: &str) -> String {
        filename
            .strip_suffix(&format!(".{PATCH_EXTENSION}"))
            .unwrap_or(filename)
            .to_string()
    }
}

impl RemoteScanner for GithubScanner {
    async fn list_patches(&self, source: &Source) -> Result<Vec<RemoteArtifact>> {
        let entries = api::list_contents(&self.client, &self.creds, source).await?;
        let manifest = api::fetch_manifest(&self.client, &self.creds, source).await;

        let mut artifacts = Vec::new();
        for entry in entries {
            if !Self::is_patch_file(&entry.name) {
                continue;
            }
            let Some(download_url) = entry.download_url else {
                debug!("Skipping {} (no download location)", entry.path);
                continue;
            };
            let name = Self::artifact_name(&entry.name);
            let annotation = manifest
                .as_ref()
                .and_then(|m| m.get(&entry.name).or_else(|| m.get(&name)));
            artifacts.push(RemoteArtifact {
                md5: annotation.and_then(|a| a.md5.clone()),
                notes: annotation.and_then(|a| a.description.clone()),
                name,
                path: entry.path,
                size: entry.size,
                download_url,
                version: None,
            });
        }
        debug!(
            "Source {} lists {} patch artifacts",
            source.slug(),
            artifacts.len()
        );
        Ok(artifacts)
    }

    async fn fetch_patch_body(&self, artifact: &RemoteArtifact) -> Result<Vec<u8>> {
        http::fetch_bytes(&self.client, &self.creds, &artifact.download_url)
            .await
            .map_err(|e| match e {
                LecternError::RateLimited(msg) => LecternError::RateLimited(msg),
                other => LecternError::DownloadError(
                    artifact.name.clone(),
                    artifact.download_url.clone(),
                    other.to_string(),
                ),
            })
    }

    async fn latest_release(&self, source: &Source) -> Result<ReleaseInfo> {
        api::latest_release(&self.client, &self.creds, source).await
    }

    async fn download_asset(&self, asset: &ReleaseAsset, dest: &Path) -> Result<()> {
        http::download_to_path(&self.client, &self.creds, &asset.download_url, dest).await
    }
}
