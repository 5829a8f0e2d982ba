// src/system/scoped.rs

//! Temporary changes to process-wide state: the working directory and the
//! standard output/error descriptors.
//!
//! Every change is undone when the scope ends, including when the body returns
//! early or panics. The state is shared by the whole process, so these helpers
//! must only be used from one thread at a time.

use crate::core::console;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from entering a scoped state change.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// The current working directory could not be determined.
    #[error("Could not read the current working directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    /// Switching into `path` failed.
    #[error("Could not change directory to '{}': {source}", .path.display())]
    ChangeDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// `/dev/null` could not be opened.
    #[error("Could not open the null device: {0}")]
    NullDevice(#[source] std::io::Error),
    /// Duplicating or redirecting fds 1 and 2 failed.
    #[error("Could not redirect standard streams: {0}")]
    Redirect(#[source] std::io::Error),
}

// --- Working Directory ---

/// Holds the working directory changed until dropped, then switches back to
/// the directory that was current when it was acquired.
#[derive(Debug)]
pub struct CwdGuard {
    restore: scopeguard::ScopeGuard<PathBuf, fn(PathBuf)>,
}

impl CwdGuard {
    /// Changes the working directory to `path`.
    ///
    /// A relative `path` is resolved against the directory current at the call.
    pub fn acquire(path: &Path) -> Result<Self, ScopeError> {
        console::echo(format!("$ cd {}", path.display()));
        let original = std::env::current_dir().map_err(ScopeError::CurrentDir)?;
        std::env::set_current_dir(path).map_err(|source| ScopeError::ChangeDir {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            restore: scopeguard::guard(original, restore_cwd as fn(PathBuf)),
        })
    }

    /// The directory restored when the guard is dropped.
    pub fn original(&self) -> &Path {
        &self.restore
    }
}

fn restore_cwd(original: PathBuf) {
    if let Err(e) = std::env::set_current_dir(&original) {
        log::warn!(
            "Failed to restore working directory '{}': {}",
            original.display(),
            e
        );
    }
}

/// Runs `body` with `path` as the working directory, then switches back.
///
/// A relative `path` is resolved against the directory current at the call.
pub fn with_cwd<R>(path: &Path, body: impl FnOnce() -> R) -> Result<R, ScopeError> {
    let _guard = CwdGuard::acquire(path)?;
    Ok(body())
}

// --- Output Suppression ---

/// Holds stdout and stderr redirected to the null device until dropped.
#[cfg(unix)]
#[derive(Debug)]
pub struct QuietGuard {
    saved_stdout: std::os::fd::RawFd,
    saved_stderr: std::os::fd::RawFd,
    null_device: std::fs::File,
}

#[cfg(unix)]
impl QuietGuard {
    /// Redirects fds 1 and 2 to `/dev/null`. Child processes spawned while the
    /// guard is alive inherit the redirection.
    pub fn acquire() -> Result<Self, ScopeError> {
        use nix::unistd::{close, dup, dup2};
        use std::io::Write;
        use std::os::fd::AsRawFd;

        let null = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/null")
            .map_err(ScopeError::NullDevice)?;

        let stdout_fd = std::io::stdout().as_raw_fd();
        let stderr_fd = std::io::stderr().as_raw_fd();
        let _ = std::io::stdout().flush();

        let saved_stdout = dup(stdout_fd).map_err(redirect_error)?;
        let saved_stderr = match dup(stderr_fd) {
            Ok(fd) => fd,
            Err(e) => {
                let _ = close(saved_stdout);
                return Err(redirect_error(e));
            }
        };

        // From here on, dropping the guard undoes whatever part of the
        // redirection succeeded.
        let guard = Self {
            saved_stdout,
            saved_stderr,
            null_device: null,
        };
        dup2(guard.null_device.as_raw_fd(), stdout_fd).map_err(redirect_error)?;
        dup2(guard.null_device.as_raw_fd(), stderr_fd).map_err(redirect_error)?;
        Ok(guard)
    }
}

#[cfg(unix)]
fn redirect_error(errno: nix::errno::Errno) -> ScopeError {
    ScopeError::Redirect(errno.into())
}

#[cfg(unix)]
impl Drop for QuietGuard {
    fn drop(&mut self) {
        use nix::unistd::{close, dup2};
        use std::io::Write;
        use std::os::fd::AsRawFd;

        let _ = std::io::stdout().flush();
        let restored = [
            (self.saved_stdout, std::io::stdout().as_raw_fd()),
            (self.saved_stderr, std::io::stderr().as_raw_fd()),
        ];
        for (saved, target) in restored {
            if let Err(e) = dup2(saved, target) {
                log::warn!("Failed to restore fd {}: {}", target, e);
            }
            let _ = close(saved);
        }
    }
}

/// Runs `body` with stdout and stderr pointed at the null device.
#[cfg(unix)]
pub fn with_suppressed_output<R>(body: impl FnOnce() -> R) -> Result<R, ScopeError> {
    let _guard = QuietGuard::acquire()?;
    Ok(body())
}
