use std::{io, path::PathBuf};
use thiserror::Error;

/// The errors returned by the individual installation steps.
#[derive(Debug, Error)]
#[allow(clippy::module_name_repetitions)]
pub enum InstallerError {
    /// A request could not be sent, or the server answered the metadata request with a non-success
    /// status.
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// The version metadata document was not valid.
    #[error("failed to parse metadata from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("no version found in metadata at {0}")]
    NoVersionFound(String),

    #[error("download of {url} failed with status: {status}")]
    DownloadStatus { url: String, status: String },

    #[error("invalid proxy URL `{url}`: {message}")]
    InvalidProxyUrl { url: String, message: String },

    #[error("{action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("command `{command}` failed: {message}")]
    CommandExecution { command: String, message: String },
}

impl InstallerError {
    pub(crate) fn fetch(url: impl Into<String>, e: &reqwest::Error) -> Self {
        InstallerError::Fetch {
            url: url.into(),
            message: e.to_string(),
        }
    }

    pub(crate) fn filesystem(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        InstallerError::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}
