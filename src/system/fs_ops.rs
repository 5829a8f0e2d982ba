// src/system/fs_ops.rs

//! Copy, move, link and remove operations with overwrite-replace semantics.
//!
//! None of these are atomic: an overwrite deletes the destination first, so an
//! interrupted call can leave the destination gone and not yet replaced.

use crate::core::console::{self, quoted};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors from the filesystem operations.
#[derive(Error, Debug)]
pub enum FsError {
    /// Nothing usable exists at `path`.
    #[error("Path '{}' does not exist.", .path.display())]
    NotFound { path: PathBuf },
    /// `path` is occupied and the caller asked not to replace it.
    #[error("Path '{}' already exists.", .path.display())]
    AlreadyExists { path: PathBuf },
    /// A filesystem call failed while doing `op` on `path`.
    #[error("Could not {op} '{}': {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Walking a source tree for a recursive copy failed.
    #[error("Failed to walk directory tree: {0}")]
    Walk(#[from] walkdir::Error),
}

type FsResult<T> = Result<T, FsError>;

/// What [`link_with`] does when something already exists at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkPolicy {
    /// Leave the existing entry alone and report success.
    #[default]
    Skip,
    /// Delete the existing entry and create the link.
    Replace,
    /// Report [`FsError::AlreadyExists`].
    Fail,
}

fn io_error(op: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> FsError {
    let path = path.to_path_buf();
    move |source| FsError::Io { op, path, source }
}

/// Whether anything, including a dangling symlink, is present at `path`.
fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// A copy or move source must resolve to a real entry; a dangling link does not.
fn require_source(src: &Path) -> FsResult<()> {
    if src.exists() {
        Ok(())
    } else {
        Err(FsError::NotFound {
            path: src.to_path_buf(),
        })
    }
}

fn require_exists(path: &Path) -> FsResult<()> {
    if entry_exists(path) {
        Ok(())
    } else {
        Err(FsError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Where a file lands: inside `dest` when `dest` is a directory, else `dest` itself.
fn resolve_file_dest(src: &Path, dest: &Path) -> PathBuf {
    match src.file_name() {
        Some(name) if dest.is_dir() => dest.join(name),
        _ => dest.to_path_buf(),
    }
}

/// Deletes whatever is at `path` without following a final symlink.
fn remove_entry(path: &Path) -> FsResult<()> {
    let metadata = fs::symlink_metadata(path).map_err(io_error("inspect", path))?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(io_error("remove directory", path))
    } else {
        fs::remove_file(path).map_err(io_error("remove file", path))
    }
}

fn copy_tree(src: &Path, dest: &Path) -> FsResult<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_error("create directory", &target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(io_error("copy to", &target))?;
        }
    }
    Ok(())
}

// --- Operations ---

/// Copies `src` to `dest`.
///
/// A directory replaces whatever was at `dest` with a full recursive copy (no
/// merging). A file is copied into `dest` when `dest` is a directory, and any
/// file already at the resolved destination is deleted first.
pub fn copy(src: &Path, dest: &Path) -> FsResult<()> {
    console::echo(format!("$ cp {} {}", quoted(src), quoted(dest)));
    require_source(src)?;

    if src.is_dir() {
        if entry_exists(dest) {
            remove_entry(dest)?;
        }
        copy_tree(src, dest)
    } else {
        let dest_path = resolve_file_dest(src, dest);
        if entry_exists(&dest_path) {
            fs::remove_file(&dest_path).map_err(io_error("remove file", &dest_path))?;
        }
        fs::copy(src, &dest_path).map_err(io_error("copy to", &dest_path))?;
        Ok(())
    }
}

/// Moves `src` to `dest`, using the same destination rules as [`copy`].
///
/// An existing `dest` is cleared before the move; the move itself is a rename,
/// falling back to copy-then-delete only when `src` and `dest` are on different
/// filesystems.
pub fn move_path(src: &Path, dest: &Path) -> FsResult<()> {
    console::echo(format!("$ mv {} {}", quoted(src), quoted(dest)));
    require_source(src)?;

    let dest_path = if src.is_dir() {
        if entry_exists(dest) {
            remove_entry(dest)?;
        }
        dest.to_path_buf()
    } else {
        let dest_path = resolve_file_dest(src, dest);
        if entry_exists(&dest_path) {
            fs::remove_file(&dest_path).map_err(io_error("remove file", &dest_path))?;
        }
        dest_path
    };

    match fs::rename(src, &dest_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            log::debug!(
                "Rename across filesystems failed, copying '{}' instead.",
                src.display()
            );
            if src.is_dir() {
                copy_tree(src, &dest_path)?;
            } else {
                fs::copy(src, &dest_path).map_err(io_error("copy to", &dest_path))?;
            }
            remove_entry(src)
        }
        Err(e) => Err(io_error("move to", &dest_path)(e)),
    }
}

/// Creates a symlink at `dest` pointing to `src`.
///
/// If anything already exists at `dest` (a dangling link included) nothing is
/// done and the call succeeds. Use [`link_with`] to pick another behavior.
pub fn link(src: &Path, dest: &Path) -> FsResult<()> {
    link_with(src, dest, LinkPolicy::Skip)
}

/// Creates a symlink at `dest` pointing to `src`, resolving an existing `dest`
/// according to `policy`.
pub fn link_with(src: &Path, dest: &Path, policy: LinkPolicy) -> FsResult<()> {
    console::echo(format!("$ ln -s {} {}", quoted(src), quoted(dest)));
    if entry_exists(dest) {
        match policy {
            LinkPolicy::Skip => {
                log::debug!("'{}' already exists, not linking.", dest.display());
                return Ok(());
            }
            LinkPolicy::Fail => {
                return Err(FsError::AlreadyExists {
                    path: dest.to_path_buf(),
                });
            }
            LinkPolicy::Replace => remove_entry(dest)?,
        }
    }
    create_symlink(src, dest).map_err(io_error("create symlink at", dest))
}

#[cfg(unix)]
fn create_symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dest)
}

#[cfg(windows)]
fn create_symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dest)
    } else {
        std::os::windows::fs::symlink_file(src, dest)
    }
}

/// Deletes a file, or a directory and everything below it.
pub fn remove(path: &Path) -> FsResult<()> {
    console::echo(format!("$ rm {}", quoted(path)));
    require_exists(path)?;
    remove_entry(path)
}

/// Creates `path` and any missing parents. Does nothing when `path` exists,
/// whatever kind of entry it is.
pub fn ensure_dir(path: &Path) -> FsResult<()> {
    if path.exists() {
        return Ok(());
    }
    console::echo(format!("$ mkdir -p {}", quoted(path)));
    fs::create_dir_all(path).map_err(io_error("create directory", path))
}
