use std::fs::DirBuilder;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::SyncError;

/// Steam's per-user folder for custom compatibility tools.
pub const DEFAULT_INSTALL_DIR: &str = "~/.steam/steam/compatibilitytools.d";

/// Resolve the current user's home directory.
pub fn home_dir() -> Result<PathBuf, SyncError> {
    dirs::home_dir().ok_or(SyncError::HomeDirUnavailable)
}

/// Expand a leading `~/` against the user's home directory.
///
/// Paths without the prefix are returned unchanged and never touch the
/// environment.
pub fn expand_home(raw: &str) -> Result<PathBuf, SyncError> {
    match raw.strip_prefix("~/") {
        Some(rest) => Ok(home_dir()?.join(rest)),
        None if raw == "~" => home_dir(),
        None => Ok(PathBuf::from(raw)),
    }
}

/// Create the install root (owner rwx, group/other rx) unless it already exists.
pub fn ensure_install_root(root: &Path) -> Result<(), SyncError> {
    if root.is_dir() {
        return Ok(());
    }
    debug!("env: creating install root {}", root.display());
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(root).map_err(|source| SyncError::InstallDir {
        path: root.to_path_buf(),
        source,
    })
}
