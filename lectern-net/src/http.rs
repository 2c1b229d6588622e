// lectern-net/src/http.rs
use std::fs;
use std::path::Path;
use std::time::Duration;

use lectern_common::error::{LecternError, Result};
use reqwest::header::{HeaderMap, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::auth::ApiCredentials;

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "lectern updater (Rust; +https://github.com/lectern-app/lectern)";

pub fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        USER_AGENT_STRING
            .parse()
            .map_err(|e| LecternError::Generic(format!("Invalid user agent header: {e}")))?,
    );
    headers.insert(
        ACCEPT,
        "*/*"
            .parse()
            .map_err(|e| LecternError::Generic(format!("Invalid accept header: {e}")))?,
    );
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| LecternError::Generic(format!("Failed to build HTTP client: {e}")))
}

pub fn validate_url(url_str: &str) -> Result<()> {
    let url = url::Url::parse(url_str)
        .map_err(|e| LecternError::Generic(format!("Failed to parse URL '{url_str}': {e}")))?;
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(LecternError::Generic(format!(
            "Invalid URL scheme for '{}': Must be https, but got '{}'",
            url_str,
            url.scheme()
        )))
    }
}

/// Classifies a non-success status. 403/429 means rate limiting, which the
/// caller abandons the source for without failing the overall pass.
fn status_error(url: &str, status: StatusCode) -> LecternError {
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        LecternError::RateLimited(format!("HTTP {status} for {url}"))
    } else if status == StatusCode::NOT_FOUND {
        LecternError::NotFound(format!("HTTP 404 for {url}"))
    } else {
        LecternError::Api(format!("HTTP {status} for {url}"))
    }
}

async fn send(client: &Client, creds: &ApiCredentials, url: &str) -> Result<Response> {
    validate_url(url)?;
    let response = creds.apply(client.get(url)).send().await.map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        LecternError::Http(std::sync::Arc::new(e))
    })?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);
    if !status.is_success() {
        return Err(status_error(url, status));
    }
    Ok(response)
}

pub async fn fetch_text(client: &Client, creds: &ApiCredentials, url: &str) -> Result<String> {
    let response = send(client, creds, url).await?;
    response
        .text()
        .await
        .map_err(|e| LecternError::Api(format!("Failed to read response body from {url}: {e}")))
}

pub async fn fetch_bytes(client: &Client, creds: &ApiCredentials, url: &str) -> Result<Vec<u8>> {
    let response = send(client, creds, url).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| LecternError::Api(format!("Failed to read response body from {url}: {e}")))?;
    Ok(bytes.to_vec())
}

/// Downloads `url` to `dest` through a sibling temp file, renaming only once
/// the body has been fully written.
pub async fn download_to_path(
    client: &Client,
    creds: &ApiCredentials,
    url: &str,
    dest: &Path,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            LecternError::InstallError(format!(
                "Failed to create download directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_filename = format!(
        ".{}.download",
        dest.file_name().unwrap_or_default().to_string_lossy()
    );
    let temp_path = dest.with_file_name(temp_filename);
    debug!("Downloading to temporary path: {}", temp_path.display());
    if temp_path.exists() {
        if let Err(e) = fs::remove_file(&temp_path) {
            tracing::warn!(
                "Could not remove existing temporary file {}: {}",
                temp_path.display(),
                e
            );
        }
    }

    let response = send(client, creds, url).await?;
    let content = response.bytes().await.map_err(|e| {
        LecternError::DownloadError(
            dest.file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            url.to_string(),
            format!("Failed to read response body: {e}"),
        )
    })?;

    let mut temp_file = TokioFile::create(&temp_path).await.map_err(|e| {
        LecternError::InstallError(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;
    temp_file.write_all(&content).await.map_err(|e| {
        LecternError::InstallError(format!(
            "Failed to write download to {}: {}",
            temp_path.display(),
            e
        ))
    })?;
    drop(temp_file);

    fs::rename(&temp_path, dest).map_err(|e| {
        LecternError::InstallError(format!(
            "Failed to move temp file {} to {}: {}",
            temp_path.display(),
            dest.display(),
            e
        ))
    })?;
    debug!("Download complete: {}", dest.display());
    Ok(())
}
