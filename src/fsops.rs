// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Filesystem operations.
//!
//! Idempotent building blocks shared by the install and cleanup commands.
//! Removing something that does not exist is not an error, and creating a
//! symlink replaces whatever already sits at the target.

use ignore::WalkBuilder;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Outcome of removing a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Path existed and is now gone.
    Removed,

    /// Nothing existed at path.
    Missing,
}

/// Check if anything sits at path, including dangling symlinks.
pub fn occupied(path: impl AsRef<Path>) -> bool {
    path.as_ref().symlink_metadata().is_ok()
}

/// Remove file, symlink, or directory tree at path.
///
/// Symlinks are removed without touching what they point at. A permission
/// error triggers one retry after making the tree user writable.
///
/// # Errors
///
/// - Return [`FsError::Remove`] if path still cannot be removed.
#[instrument(skip(path), level = "debug")]
pub fn remove_path(path: impl AsRef<Path>) -> Result<Removal> {
    let path = path.as_ref();
    if !occupied(path) {
        return Ok(Removal::Missing);
    }

    match remove_once(path) {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::PermissionDenied => {
            debug!("permission denied removing {}, retrying", path.display());
            make_writable(path);
            remove_once(path).map_err(|source| FsError::Remove {
                path: path.into(),
                source,
            })?;
        }
        Err(source) => {
            return Err(FsError::Remove {
                path: path.into(),
                source,
            })
        }
    }

    debug!("removed {}", path.display());
    Ok(Removal::Removed)
}

fn remove_once(path: &Path) -> std::io::Result<()> {
    let metadata = path.symlink_metadata()?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn make_writable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let walker = WalkBuilder::new(path)
        .standard_filters(false)
        .follow_links(false)
        .build();
    for entry in walker.flatten() {
        let Ok(metadata) = entry.path().symlink_metadata() else {
            continue;
        };
        if metadata.file_type().is_symlink() {
            continue;
        }

        let mut permissions = metadata.permissions();
        let extra = if metadata.is_dir() { 0o700 } else { 0o600 };
        permissions.set_mode(permissions.mode() | extra);
        if let Err(error) = fs::set_permissions(entry.path(), permissions) {
            debug!("cannot fix permissions of {}: {error}", entry.path().display());
        }
    }
}

#[cfg(not(unix))]
fn make_writable(path: &Path) {
    let walker = WalkBuilder::new(path).standard_filters(false).build();
    for entry in walker.flatten() {
        if let Ok(metadata) = entry.path().metadata() {
            let mut permissions = metadata.permissions();
            permissions.set_readonly(false);
            let _ = fs::set_permissions(entry.path(), permissions);
        }
    }
}

/// Create directory and all of its parents.
///
/// # Errors
///
/// - Return [`FsError::CreateDir`] if directory cannot be created.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    mkdirp::mkdirp(path).map_err(|source| FsError::CreateDir {
        path: path.into(),
        source,
    })?;

    Ok(())
}

/// Replace whatever sits at `target` with a symlink to `source`.
///
/// Parent directories of `target` are created as needed.
///
/// # Errors
///
/// - Return [`FsError::CreateDir`] if parent directory cannot be created.
/// - Return [`FsError::Remove`] if existing target cannot be removed.
/// - Return [`FsError::Symlink`] if symlink cannot be created.
#[instrument(skip(source, target), level = "debug")]
pub fn create_symlink(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<()> {
    let (source, target) = (source.as_ref(), target.as_ref());
    if let Some(parent) = target.parent() {
        ensure_dir(parent)?;
    }

    remove_path(target)?;
    symlink(source, target).map_err(|source| FsError::Symlink {
        path: target.into(),
        source,
    })?;
    debug!("linked {} -> {}", target.display(), source.display());

    Ok(())
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}

/// State of a managed symlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing at target.
    Missing,

    /// Target is a symlink resolving to expected source.
    Linked,

    /// Target is a symlink resolving somewhere else.
    Elsewhere(PathBuf),

    /// Target is a real file.
    File,

    /// Target is a real directory.
    Directory,
}

/// Inspect target and compare it against expected source.
pub fn link_state(target: impl AsRef<Path>, source: impl AsRef<Path>) -> LinkState {
    let target = target.as_ref();
    let Ok(metadata) = target.symlink_metadata() else {
        return LinkState::Missing;
    };

    if !metadata.file_type().is_symlink() {
        return match metadata.is_dir() {
            true => LinkState::Directory,
            false => LinkState::File,
        };
    }

    let resolved = fs::canonicalize(target).ok();
    let expected = fs::canonicalize(source.as_ref()).ok();
    match (resolved, expected) {
        (Some(resolved), Some(expected)) if resolved == expected => LinkState::Linked,
        (Some(resolved), _) => LinkState::Elsewhere(resolved),
        (None, _) => LinkState::Elsewhere(fs::read_link(target).unwrap_or_default()),
    }
}

/// Total size in bytes of every file under path.
///
/// Unreadable entries are skipped. Symlinks are not followed.
pub fn dir_size(path: impl AsRef<Path>) -> u64 {
    WalkBuilder::new(path.as_ref())
        .standard_filters(false)
        .follow_links(false)
        .build()
        .flatten()
        .filter_map(|entry| entry.path().symlink_metadata().ok())
        .filter(|metadata| metadata.is_file())
        .map(|metadata| metadata.len())
        .sum()
}

/// Render byte count with a binary unit suffix.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    match unit {
        0 => format!("{bytes} B"),
        _ => format!("{size:.1} {}", UNITS[unit]),
    }
}

/// Recursively copy directory tree.
///
/// Symlinks inside the tree are recreated rather than followed.
///
/// # Errors
///
/// - Return [`FsError::Copy`] if any entry cannot be copied.
#[instrument(skip(from, to), level = "debug")]
pub fn copy_dir(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    ensure_dir(to)?;

    let walker = WalkBuilder::new(from)
        .standard_filters(false)
        .follow_links(false)
        .build();
    for entry in walker {
        let entry = entry.map_err(|error| FsError::Copy {
            path: from.into(),
            source: std::io::Error::other(error),
        })?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let destination = to.join(relative);
        let copied = match entry.file_type() {
            Some(kind) if kind.is_dir() => ensure_dir(&destination),
            Some(kind) if kind.is_symlink() => fs::read_link(entry.path())
                .and_then(|link| symlink(&link, &destination))
                .map_err(|source| FsError::Copy {
                    path: entry.path().into(),
                    source,
                }),
            _ => fs::copy(entry.path(), &destination)
                .map(|_| ())
                .map_err(|source| FsError::Copy {
                    path: entry.path().into(),
                    source,
                }),
        };
        copied?;
    }
    debug!("copied {} to {}", from.display(), to.display());

    Ok(())
}

/// Filesystem error types.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Path could not be removed.
    #[error("failed to remove {path:?}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory could not be created.
    #[error("failed to create directory {path:?}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Symlink could not be created.
    #[error("failed to create symlink {path:?}")]
    Symlink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entry could not be copied.
    #[error("failed to copy {path:?}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Friendly result alias :3
pub type Result<T, E = FsError> = std::result::Result<T, E>;
