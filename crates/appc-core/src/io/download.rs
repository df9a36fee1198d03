//! Blocking downloads from remote artifact repositories.
//!
//! Files are streamed into a `.part` sibling and renamed into place once
//! complete, so a half-finished download never looks like a cached artifact.
//! When the repository publishes a `.sha256` sidecar the content is verified
//! against it.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::USER_AGENT;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error fetching {url}: {message}")]
    Http { url: String, message: String },

    #[error("Unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Offline mode: refusing to fetch {0}")]
    Offline(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Hash mismatch for {url}: expected {expected}, got {actual}")]
    HashMismatch {
        url: String,
        expected: String,
        actual: String,
    },
}

/// HTTP access to remote repositories. An offline fetcher refuses every request.
#[derive(Debug, Clone)]
pub struct Fetcher {
    #[cfg(feature = "network")]
    client: Option<reqwest::blocking::Client>,
}

impl Fetcher {
    /// Build a fetcher. `offline` disables all network access.
    pub fn new(offline: bool) -> Result<Self, DownloadError> {
        #[cfg(feature = "network")]
        {
            let client = if offline {
                None
            } else {
                Some(
                    reqwest::blocking::Client::builder()
                        .user_agent(USER_AGENT)
                        .build()
                        .map_err(|e| DownloadError::Http {
                            url: String::new(),
                            message: e.to_string(),
                        })?,
                )
            };
            Ok(Self { client })
        }
        #[cfg(not(feature = "network"))]
        {
            let _ = (offline, USER_AGENT);
            Ok(Self {})
        }
    }

    /// A fetcher that never touches the network.
    pub fn offline() -> Self {
        Self {
            #[cfg(feature = "network")]
            client: None,
        }
    }

    /// Whether requests will actually be sent.
    pub fn is_online(&self) -> bool {
        #[cfg(feature = "network")]
        {
            self.client.is_some()
        }
        #[cfg(not(feature = "network"))]
        {
            false
        }
    }

    /// Fetch a URL into memory. A 404 yields `Ok(None)`.
    pub fn fetch_bytes(&self, url: &str) -> Result<Option<Vec<u8>>, DownloadError> {
        #[cfg(feature = "network")]
        {
            let Some(client) = &self.client else {
                return Err(DownloadError::Offline(url.to_string()));
            };
            tracing::debug!("GET {url}");
            let http_err = |e: reqwest::Error| DownloadError::Http {
                url: url.to_string(),
                message: e.to_string(),
            };
            let response = client.get(url).send().map_err(http_err)?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(DownloadError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            let bytes = response.bytes().map_err(http_err)?;
            Ok(Some(bytes.to_vec()))
        }
        #[cfg(not(feature = "network"))]
        {
            Err(DownloadError::Offline(url.to_string()))
        }
    }

    /// Download `url` to `dest`. Returns `Ok(false)` when the server has no
    /// such file.
    pub fn download(&self, url: &str, dest: &Path) -> Result<bool, DownloadError> {
        let Some(bytes) = self.fetch_bytes(url)? else {
            return Ok(false);
        };

        let actual = hex::encode(Sha256::digest(&bytes));
        if let Some(sidecar) = self.fetch_checksum(&format!("{url}.sha256"))? {
            if !sidecar.eq_ignore_ascii_case(&actual) {
                return Err(DownloadError::HashMismatch {
                    url: url.to_string(),
                    expected: sidecar,
                    actual,
                });
            }
        }

        write_atomically(dest, &bytes)?;
        tracing::debug!("Downloaded {url} ({} bytes, sha256 {actual})", bytes.len());
        Ok(true)
    }

    fn fetch_checksum(&self, url: &str) -> Result<Option<String>, DownloadError> {
        let bytes = match self.fetch_bytes(url) {
            Ok(Some(bytes)) => bytes,
            Ok(None) | Err(DownloadError::Status { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        // Sidecars are either the bare digest or "<digest>  <file name>".
        Ok(String::from_utf8_lossy(&bytes)
            .split_whitespace()
            .next()
            .map(str::to_string))
    }
}

/// Write `bytes` to `dest` via a `.part` file so readers never see a partial file.
pub fn write_atomically(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let part = part_path(dest);
    let result = (|| {
        let mut file = File::create(&part)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&part, dest)
    })();
    if result.is_err() {
        fs::remove_file(&part).ok();
    }
    result
}

/// The temporary sibling a file is written to before being renamed into place.
pub fn part_path(dest: &Path) -> std::path::PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
