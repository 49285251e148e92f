use std::path::{Path, PathBuf};

use crate::archive;
use crate::release::{DEFAULT_API_BASE, DEFAULT_ARCHIVE_EXTENSION, RepoId};

/// Everything a sync run needs to know, resolved ahead of time.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub repo: RepoId,
    pub install_root: PathBuf,
    pub api_base: String,
    pub archive_extension: String,
}

impl SyncConfig {
    pub fn new(repo: RepoId, install_root: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            install_root: install_root.into(),
            api_base: DEFAULT_API_BASE.to_owned(),
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_owned(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_archive_extension(mut self, extension: impl Into<String>) -> Self {
        self.archive_extension = extension.into();
        self
    }

    /// Path whose existence means `tag` is installed. A rooted tag still
    /// lands under the install root.
    pub fn marker_path(&self, tag: &str) -> PathBuf {
        archive::join_entry_path(&self.install_root, Path::new(tag))
    }

    /// Where the archive for `tag` is downloaded before extraction.
    pub fn temp_archive_path(&self, tag: &str) -> PathBuf {
        self.install_root
            .join(format!("{}-{tag}{}", self.repo.name, self.archive_extension))
    }

    pub fn is_installed(&self, tag: &str) -> bool {
        path_exists(&self.marker_path(tag))
    }
}

fn path_exists(path: &Path) -> bool {
    // symlink_metadata so a dangling marker symlink still counts
    path.symlink_metadata().is_ok()
}

/// Terminal success states of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    AlreadyInstalled { tag: String },
    Installed { tag: String, asset_name: String },
}
