use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlexError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("could not reach the Plex server: {0}")]
    Connection(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("library not found: {0}")]
    NotFound(String),
    #[error("ambiguous library selection: {0}")]
    AmbiguousInput(String),
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl PlexError {
    /// One-line guidance shown under the error message by the binaries.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PlexError::Config(_) | PlexError::Connection(_) | PlexError::Auth(_) => {
                Some("Make sure PLEX_URL and PLEX_TOKEN are set correctly")
            }
            PlexError::NotFound(_) => Some("Run `plex_get libraries` to see available libraries"),
            PlexError::AmbiguousInput(_) => {
                Some("Use `plex_get items --help` for more information")
            }
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("library export failed: {0}")]
    Core(#[from] PlexError),
    #[error("export aborted: {0}")]
    Context(String),
}

impl ExportError {
    pub fn context<T: Into<String>>(self, message: T) -> Self {
        let message = message.into();
        match self {
            ExportError::Core(err) => ExportError::Context(format!("{message}: {err}")),
            ExportError::Context(existing) => {
                ExportError::Context(format!("{message}: {existing}"))
            }
        }
    }

    /// The underlying client error, if context has not flattened it.
    pub fn as_plex_error(&self) -> Option<&PlexError> {
        match self {
            ExportError::Core(err) => Some(err),
            ExportError::Context(_) => None,
        }
    }
}
