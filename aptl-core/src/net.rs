use crate::{AptlConfig, AptlError, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Blocking fetcher for repository files. `http(s)://` goes through reqwest,
/// `file://` reads the local filesystem.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &AptlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("apt-local/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|source| AptlError::HttpClient { source })?;

        Ok(Fetcher { client })
    }

    /// Like `get`, but a missing file is `Ok(None)` instead of an error.
    pub fn get_optional(&self, url: &str) -> Result<Option<Vec<u8>>> {
        if let Some(path) = local_path(url) {
            return match fs::read(&path) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(source) => Err(AptlError::ReadFile { path, source }),
            };
        }

        tracing::debug!(url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| AptlError::Fetch {
                url: url.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => Err(AptlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }),
            _ => {
                let bytes = response.bytes().map_err(|source| AptlError::Fetch {
                    url: url.to_string(),
                    source,
                })?;
                Ok(Some(bytes.to_vec()))
            }
        }
    }

    pub fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.get_optional(url)?.ok_or_else(|| AptlError::HttpStatus {
            url: url.to_string(),
            status: StatusCode::NOT_FOUND.as_u16(),
        })
    }
}

fn local_path(url: &str) -> Option<PathBuf> {
    url.strip_prefix("file://")
        .or_else(|| url.strip_prefix("file:"))
        .map(PathBuf::from)
}
