// src/core/paths.rs

//! Where a workspace lives on disk.

use crate::constants::{
    BUILD_ROOT_DIR, HASH_STORE_DIR, PRODUCT_ENV_DIR, SCRATCH_DIR, TEMPLATES_DIR, TOOL_ENV_DIR,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from resolving workspace paths.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform reported no home directory for the current user.
    #[error("Could not find the user's home directory.")]
    HomeDirNotFound,
    /// `~` or a `$VAR` in the path could not be expanded.
    #[error("Failed to expand path '{path}': {message}")]
    Expansion { path: String, message: String },
}

/// The conventional locations of a build tree, all under `~/.mrover`.
///
/// Collaborating tools look for these exact paths, so they are derived from the
/// home directory alone and never change after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    /// `~/.mrover`
    pub build_root: PathBuf,
    /// `~/.mrover/build_env`
    pub product_env: PathBuf,
    /// `~/.mrover/jarvis_env`
    pub tool_env: PathBuf,
    /// `~/.mrover/project_hashes`
    pub hash_store: PathBuf,
    /// `~/.mrover/scratch`
    pub scratch_dir: PathBuf,
}

impl WorkspaceLayout {
    /// Derives the layout from the current user's home directory.
    pub fn for_current_user() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeDirNotFound)?;
        Ok(Self::under_home(&home))
    }

    /// Derives the layout from an explicit home directory.
    pub fn under_home(home: &Path) -> Self {
        let build_root = home.join(BUILD_ROOT_DIR);
        Self {
            product_env: build_root.join(PRODUCT_ENV_DIR),
            tool_env: build_root.join(TOOL_ENV_DIR),
            hash_store: build_root.join(HASH_STORE_DIR),
            scratch_dir: build_root.join(SCRATCH_DIR),
            build_root,
        }
    }
}

/// The template directory of a project: `<root>/jarvis_files/templates`.
pub fn templates_dir(project_root: &Path) -> PathBuf {
    TEMPLATES_DIR
        .iter()
        .fold(project_root.to_path_buf(), |path, part| path.join(part))
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_user_path(path: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(path).map_err(|e| PathError::Expansion {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
