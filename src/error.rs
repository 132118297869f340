//! Error types shared by the harvest pipeline.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures raised by a [`Browser`](crate::browser::Browser) implementation.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error(transparent)]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("page did not finish loading within {0:?}")]
    LoadTimeout(Duration),

    #[error("could not navigate to {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("no element matches selector '{0}'")]
    ElementNotFound(String),
}

/// Why a single item was abandoned. None of these stop the run.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("no downloadable audio URL found on {detail_url}")]
    ExtractionMiss { detail_url: String },

    #[error("download of {source_url} not detected within {waited:?}")]
    DownloadTimeout { source_url: String, waited: Duration },

    #[error("could not rename {} to {}: {source}", .from.display(), .to.display())]
    RenameFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not list download directory: {0}")]
    Snapshot(#[source] io::Error),

    #[error("browser failure: {0}")]
    Browser(#[from] BrowserError),

    #[error("run cancelled")]
    Cancelled,
}

impl ItemError {
    /// Short label used in the CSV report.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::ExtractionMiss { .. } => "extraction-miss",
            ItemError::DownloadTimeout { .. } => "download-timeout",
            ItemError::RenameFailure { .. } => "rename-failure",
            ItemError::Snapshot(_) => "snapshot-failure",
            ItemError::Browser(_) => "browser-failure",
            ItemError::Cancelled => "cancelled",
        }
    }
}
