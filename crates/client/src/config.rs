use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::identity::{FileIdentityStore, IdentityError};
use crate::poller::{PollConfig, DEFAULT_POLL_INTERVAL};
use crate::transport::{ApiError, Transport};

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Generation requests upload whole slide decks; leave room for slow links.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {reason}")]
    InvalidUrl { var: &'static str, reason: String },

    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

/// Client configuration loaded from environment variables.
///
/// Every field has a default suitable for a lecture server running on the
/// same machine.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the lecture server.
    pub api_url: Url,
    /// Delay between two status queries.
    pub poll_interval: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Directory of the job state file. `None` means the platform's local
    /// data directory.
    pub state_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default                  |
    /// |-----------------------------------|--------------------------|
    /// | `LECTUREGEN_API_URL`              | `http://127.0.0.1:5000`  |
    /// | `LECTUREGEN_POLL_INTERVAL_MS`     | `1500`                   |
    /// | `LECTUREGEN_REQUEST_TIMEOUT_SECS` | `300`                    |
    /// | `LECTUREGEN_STATE_DIR`            | platform data dir        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    /// Unset and blank variables take their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = parse_url(
            "LECTUREGEN_API_URL",
            get("LECTUREGEN_API_URL").as_deref().unwrap_or(DEFAULT_API_URL),
        )?;

        let poll_interval = match get("LECTUREGEN_POLL_INTERVAL_MS") {
            Some(raw) => {
                Duration::from_millis(parse_positive("LECTUREGEN_POLL_INTERVAL_MS", &raw)?)
            }
            None => DEFAULT_POLL_INTERVAL,
        };

        let request_timeout_secs = match get("LECTUREGEN_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_positive("LECTUREGEN_REQUEST_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url,
            poll_interval,
            request_timeout: Duration::from_secs(request_timeout_secs),
            state_dir: get("LECTUREGEN_STATE_DIR").map(PathBuf::from),
        })
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: self.poll_interval,
        }
    }

    pub fn transport(&self) -> Result<Transport, ApiError> {
        Transport::new(self.api_url.clone(), self.request_timeout)
    }

    pub fn identity_store(&self) -> Result<FileIdentityStore, IdentityError> {
        match &self.state_dir {
            Some(dir) => Ok(FileIdentityStore::in_dir(dir)),
            None => FileIdentityStore::default_location(),
        }
    }
}

pub fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        var,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            var,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: raw.to_string(),
        }),
    }
}
