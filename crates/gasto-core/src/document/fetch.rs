//! Remote file download with size limits
//!
//! Files land in a named temporary file that is removed when the handle
//! drops, so no code path (success, size rejection, network error) leaves
//! stray files behind. The size ceiling is enforced twice: against the
//! declared Content-Length before the body is read, and against the running
//! byte count while streaming, since the header can lie or be absent.

use std::io::Write;
use std::path::Path;

use reqwest::Client;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};

const DEFAULT_MAX_DOWNLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// Downloads remote files into scoped temporary storage
#[derive(Clone)]
pub struct FileFetcher {
    http_client: Client,
    max_size: u64,
}

/// A downloaded file, removed from disk on drop
pub struct FetchedFile {
    file: NamedTempFile,
    file_name: Option<String>,
    content_type: Option<String>,
    size: u64,
}

impl FetchedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// File name derived from the URL path, if one was present
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Content-Type reported by the server
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl FileFetcher {
    /// Create a fetcher with the default 10 MB size ceiling
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
            max_size: DEFAULT_MAX_DOWNLOAD_SIZE,
        }
    }

    /// Create a fetcher with a custom size ceiling
    pub fn with_max_size(max_size: u64) -> Self {
        Self {
            http_client: Client::new(),
            max_size,
        }
    }

    /// Download a file to a temporary location
    pub async fn fetch(&self, url: &str) -> Result<FetchedFile> {
        info!(url, "Downloading file");

        let mut response = self.http_client.get(url).send().await?.error_for_status()?;

        if let Some(length) = response.content_length() {
            if length > self.max_size {
                return Err(Error::Input(format!(
                    "File size ({} bytes) exceeds maximum allowed size ({} bytes)",
                    length, self.max_size
                )));
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let file_name = file_name_from_url(url);

        let mut file = NamedTempFile::new()?;
        let mut downloaded: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            downloaded += chunk.len() as u64;
            if downloaded > self.max_size {
                return Err(Error::Input(format!(
                    "File size ({} bytes) exceeds maximum allowed size ({} bytes)",
                    downloaded, self.max_size
                )));
            }
            file.write_all(&chunk)?;
        }
        file.flush()?;

        debug!(bytes = downloaded, path = %file.path().display(), "Download complete");

        Ok(FetchedFile {
            file,
            file_name,
            content_type,
            size: downloaded,
        })
    }
}

impl Default for FileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Last path segment of the URL, without query or fragment
fn file_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let (_, path) = after_scheme.split_once('/')?;
    let name = path.trim_end_matches('/').rsplit('/').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
