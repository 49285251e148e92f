use std::fs::{self, DirBuilder, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::MultiGzDecoder;
use log::{debug, info, warn};
use tar::{Archive, EntryType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("tar.gz open error for {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a gzip stream", path.display())]
    Decompress { path: PathBuf },

    #[error("tar.gz entry error in {}: {source}", path.display())]
    Entries {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create file {}: {source}", path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Counts of what an extraction produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    pub directories: usize,
    pub files: usize,
    pub skipped: usize,
}

/// Unpack the gzip-compressed tar at `archive_path` into `dest`.
///
/// Entries are applied in stream order. Directories are created with their
/// parents, regular files are created or truncated, and every other entry
/// type (symlinks, hard links, devices, ...) is skipped.
///
/// Stored paths are joined onto `dest` as-is apart from dropping a leading
/// root: `..` segments are honoured, so a crafted archive can write outside
/// `dest`. Regular files do not get their parent directories created.
///
/// The first failure aborts; anything already written stays on disk.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<ExtractSummary, ExtractError> {
    info!(
        "archive: extracting {} into {}",
        archive_path.display(),
        dest.display()
    );
    let file = File::open(archive_path).map_err(|source| ExtractError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    // concatenated gzip members form one tar stream
    let decoder = MultiGzDecoder::new(file);
    if decoder.header().is_none() {
        return Err(ExtractError::Decompress {
            path: archive_path.to_path_buf(),
        });
    }

    let entries_err = |source: io::Error| ExtractError::Entries {
        path: archive_path.to_path_buf(),
        source,
    };

    let mut archive = Archive::new(decoder);
    let mut summary = ExtractSummary::default();
    for entry in archive.entries().map_err(entries_err)? {
        let mut entry = entry.map_err(entries_err)?;
        let stored = entry.path().map_err(entries_err)?.into_owned();
        let out_path = join_entry_path(dest, &stored);

        match entry.header().entry_type() {
            EntryType::Directory => {
                debug!("archive: dir {}", out_path.display());
                create_dir_tree(&out_path)?;
                summary.directories += 1;
            }
            EntryType::Regular => {
                debug!("archive: file {}", out_path.display());
                let mut out_file =
                    File::create(&out_path).map_err(|source| ExtractError::CreateFile {
                        path: out_path.clone(),
                        source,
                    })?;
                io::copy(&mut entry, &mut out_file).map_err(|source| ExtractError::Copy {
                    path: out_path.clone(),
                    source,
                })?;
                summary.files += 1;
            }
            other => {
                warn!(
                    "archive: skipping {} ({other:?} entries are not supported)",
                    stored.display()
                );
                summary.skipped += 1;
            }
        }
    }

    info!(
        "archive: extracted {} directories and {} files ({} skipped)",
        summary.directories, summary.files, summary.skipped
    );
    Ok(summary)
}

/// Join a stored entry path onto `dest`, ignoring any root or drive prefix.
pub fn join_entry_path(dest: &Path, stored: &Path) -> PathBuf {
    let mut out = dest.to_path_buf();
    for component in stored.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => out.push(".."),
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn create_dir_tree(path: &Path) -> Result<(), ExtractError> {
    if path.is_dir() {
        return Ok(());
    }
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o777);
    }
    builder.create(path).map_err(|source| ExtractError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove a downloaded archive once it has been unpacked.
pub fn remove_archive(path: &Path) -> io::Result<()> {
    debug!("archive: removing {}", path.display());
    fs::remove_file(path)
}
