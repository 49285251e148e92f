use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ExtractError;

/// Everything that can abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unable to resolve the user's home directory")]
    HomeDirUnavailable,

    #[error("could not find or create {}: {source}", path.display())]
    InstallDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("release request failed: {0}")]
    ReleaseRequest(#[source] reqwest::Error),

    #[error("release metadata parse error: {0}")]
    ReleaseParse(#[source] serde_json::Error),

    /// The release exists but carries no asset with the expected extension.
    #[error("no {extension} asset found in release {tag}")]
    NoMatchingAsset { tag: String, extension: String },

    #[error("download request failed: {0}")]
    DownloadRequest(#[source] reqwest::Error),

    #[error("failed to create archive file {}: {source}", path.display())]
    DownloadCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download read error: {0}")]
    DownloadStream(#[source] reqwest::Error),

    #[error("failed to write archive {}: {source}", path.display())]
    DownloadWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("failed to record installed version at {}: {source}", path.display())]
    MarkerCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove archive {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// Coarse failure category used for the top-level message.
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::HomeDirUnavailable | SyncError::InstallDir { .. } => "environment",
            SyncError::ReleaseRequest(_)
            | SyncError::ReleaseParse(_)
            | SyncError::NoMatchingAsset { .. } => "resolution",
            SyncError::DownloadRequest(_)
            | SyncError::DownloadCreate { .. }
            | SyncError::DownloadStream(_)
            | SyncError::DownloadWrite { .. } => "transfer",
            SyncError::Extract(_) | SyncError::MarkerCreate { .. } => "extraction",
            SyncError::Cleanup { .. } => "cleanup",
        }
    }
}
