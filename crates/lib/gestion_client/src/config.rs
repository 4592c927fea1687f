//! Client configuration.

use std::path::PathBuf;

use url::Url;

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Configuration for a [`Session`](crate::Session).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// API root without trailing slash (e.g. "http://localhost:8000/api").
    pub api_base_url: String,
    /// File holding the persisted credential pair.
    pub credentials_path: PathBuf,
}

impl ClientConfig {
    /// Validates the base URL and normalizes away a trailing slash.
    pub fn new(api_base_url: &str, credentials_path: PathBuf) -> ClientResult<Self> {
        let url = Url::parse(api_base_url)
            .map_err(|e| ClientError::Config(format!("invalid API URL '{api_base_url}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "unsupported API URL scheme: {}",
                url.scheme()
            )));
        }
        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            credentials_path,
        })
    }

    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                   | Default                                  |
    /// |----------------------------|------------------------------------------|
    /// | `GESTION_API_URL`          | `http://localhost:8000/api`              |
    /// | `GESTION_CREDENTIALS_PATH` | `<data dir>/gestion/credentials.json`    |
    pub fn from_env() -> ClientResult<Self> {
        let api_url = std::env::var("GESTION_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let credentials_path = std::env::var("GESTION_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_credentials_path());
        Self::new(&api_url, credentials_path)
    }

    /// Absolute URL for an API path such as `/projects/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}

/// Path to the persisted credentials file.
pub fn default_credentials_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gestion")
        .join("credentials.json")
}
