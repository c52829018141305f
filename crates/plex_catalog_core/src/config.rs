use std::fmt;
use std::time::Duration;

use url::Url;

use crate::errors::PlexError;

pub const ENV_URL: &str = "PLEX_URL";
pub const ENV_TOKEN: &str = "PLEX_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "PLEX_TIMEOUT_SECS";
pub const ENV_PAGE_SIZE: &str = "PLEX_PAGE_SIZE";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Connection settings for one run.
///
/// Built from the environment before any network traffic happens, so a
/// missing variable never costs a round trip.
#[derive(Clone)]
pub struct PlexConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
    pub page_size: u32,
}

impl PlexConfig {
    pub fn new(base_url: &str, token: &str) -> Result<Self, PlexError> {
        let base_url = base_url.trim();
        let token = token.trim();
        if base_url.is_empty() {
            return Err(PlexError::Config(format!("{ENV_URL} is empty")));
        }
        if token.is_empty() {
            return Err(PlexError::Config(format!("{ENV_TOKEN} is empty")));
        }
        let parsed = Url::parse(base_url)
            .map_err(|err| PlexError::Config(format!("{ENV_URL} is not a valid URL: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PlexError::Config(format!(
                "{ENV_URL} must use http or https, got {}",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, PlexError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_URL)
            .ok_or_else(|| PlexError::Config(format!("{ENV_URL} is not set")))?;
        let token = lookup(ENV_TOKEN)
            .ok_or_else(|| PlexError::Config(format!("{ENV_TOKEN} is not set")))?;
        let mut config = Self::new(&base_url, &token)?;

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = parse_positive(ENV_TIMEOUT_SECS, &raw)?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            let size = parse_positive(ENV_PAGE_SIZE, &raw)?;
            config.page_size = u32::try_from(size)
                .map_err(|_| PlexError::Config(format!("{ENV_PAGE_SIZE} is too large: {raw}")))?;
        }
        Ok(config)
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs.max(1));
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub timeout_secs: Option<u64>,
    pub page_size: Option<u32>,
}

impl ConfigOverrides {
    pub fn apply(&self, mut config: PlexConfig) -> PlexConfig {
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout_secs(secs);
        }
        if let Some(size) = self.page_size {
            config = config.with_page_size(size);
        }
        config
    }
}

/// Process environment lookup for [`PlexConfig::from_lookup`].
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// The token never appears in logs.
impl fmt::Debug for PlexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlexConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, PlexError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(PlexError::Config(format!(
            "{key} must be a positive integer, got {raw:?}"
        ))),
    }
}
