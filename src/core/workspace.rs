// src/core/workspace.rs

//! The per-project [`Workspace`]: build tree, environments and templates.

use crate::{
    constants::PYTHON_CANDIDATES,
    core::{
        paths::{self, PathError, WorkspaceLayout},
        template::{TemplateError, TemplateLoader},
    },
    system::{
        executor::{self, ExecOptions, ExecutionError, ExecutionResult},
        fs_ops::{self, FsError},
    },
};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from [`Workspace`] operations.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// The project root or home directory could not be resolved.
    #[error(transparent)]
    Path(#[from] PathError),
    /// A template could not be loaded, rendered or written.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// A command, such as venv creation, failed.
    #[error(transparent)]
    Exec(#[from] ExecutionError),
    /// A filesystem operation failed.
    #[error(transparent)]
    Fs(#[from] FsError),
    /// No interpreter to create a virtual environment with.
    #[error("No Python interpreter found on PATH (tried {}).", PYTHON_CANDIDATES.join(", "))]
    PythonNotFound,
}

/// The build tree of one project: where its environments, hashes and scratch
/// files live, plus access to its templates.
///
/// Created once per invocation. Its paths never change; [`Workspace::clean`]
/// only affects the filesystem.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    layout: WorkspaceLayout,
    templates: TemplateLoader,
}

impl Workspace {
    /// Creates the workspace for `root_dir` using the current user's home
    /// directory. `~` and `$VARS` in `root_dir` are expanded. No I/O happens here.
    pub fn new(root_dir: &str) -> Result<Self, WorkspaceError> {
        let root = paths::expand_user_path(root_dir)?;
        let layout = WorkspaceLayout::for_current_user()?;
        Ok(Self::from_parts(root, layout))
    }

    /// Creates the workspace for `root` with the build tree under `home`.
    pub fn with_home(root: impl Into<PathBuf>, home: &Path) -> Self {
        Self::from_parts(root.into(), WorkspaceLayout::under_home(home))
    }

    fn from_parts(root: PathBuf, layout: WorkspaceLayout) -> Self {
        let templates = TemplateLoader::new(paths::templates_dir(&root));
        Self {
            root,
            layout,
            templates,
        }
    }

    // --- Accessors ---

    /// The project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `~/.mrover`, the parent of everything below.
    pub fn build_root(&self) -> &Path {
        &self.layout.build_root
    }

    /// The virtual environment the built product runs in.
    pub fn product_env(&self) -> &Path {
        &self.layout.product_env
    }

    /// The virtual environment jarvis's own tools run in.
    pub fn tool_env(&self) -> &Path {
        &self.layout.tool_env
    }

    /// Per-project content hashes used to skip unchanged builds.
    pub fn hash_store(&self) -> &Path {
        &self.layout.hash_store
    }

    /// Staging area for intermediate build files.
    pub fn scratch_dir(&self) -> &Path {
        &self.layout.scratch_dir
    }

    /// A named subdirectory of the scratch area. Nothing is created.
    pub fn scratch_dir_for(&self, name: &str) -> PathBuf {
        self.layout.scratch_dir.join(name)
    }

    /// The loader for `<root>/jarvis_files/templates`.
    pub fn templates(&self) -> &TemplateLoader {
        &self.templates
    }

    // --- Templates ---

    /// Renders template `name` with `variables` and writes it to `dest_file`,
    /// replacing any previous content.
    ///
    /// `variables` must serialize to a map, e.g. a struct or a `json!({...})`.
    pub fn render_template<V: Serialize>(
        &self,
        name: &str,
        dest_file: &Path,
        variables: &V,
    ) -> Result<(), WorkspaceError> {
        let template = self.templates.get_template(name)?;
        let variables = match serde_json::to_value(variables) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(TemplateError::Render {
                    name: name.to_string(),
                    message: format!("variables must be a map, got {}", json_kind(&other)),
                }
                .into());
            }
            Err(e) => {
                return Err(TemplateError::Render {
                    name: name.to_string(),
                    message: format!("variables could not be serialized: {}", e),
                }
                .into());
            }
        };

        let rendered = template.render(&variables)?;
        log::debug!("Writing template '{}' to '{}'", name, dest_file.display());
        fs::write(dest_file, rendered).map_err(|source| TemplateError::Io {
            path: dest_file.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    // --- Virtual Environments ---

    /// Creates the product environment unless a directory is already there.
    pub fn ensure_product_env(&self) -> Result<(), WorkspaceError> {
        ensure_env(&self.layout.product_env)
    }

    /// Creates the tool environment unless a directory is already there.
    pub fn ensure_tool_env(&self) -> Result<(), WorkspaceError> {
        ensure_env(&self.layout.tool_env)
    }

    /// Runs `args` inside the product environment.
    ///
    /// Failures are logged and returned; callers that only want a best-effort
    /// run can discard the result.
    pub fn product_exec<S: AsRef<str>>(
        &self,
        args: &[S],
        options: ExecOptions,
    ) -> Result<ExecutionResult, ExecutionError> {
        exec_logged(&self.layout.product_env, args, options)
    }

    /// Runs `args` inside the tool environment. Same contract as
    /// [`Workspace::product_exec`].
    pub fn tool_exec<S: AsRef<str>>(
        &self,
        args: &[S],
        options: ExecOptions,
    ) -> Result<ExecutionResult, ExecutionError> {
        exec_logged(&self.layout.tool_env, args, options)
    }

    // --- Cleanup ---

    /// Removes the product environment and the hash store.
    ///
    /// Both removals are attempted. Paths that are already gone are skipped;
    /// the first other failure is returned.
    pub fn clean(&self) -> Result<(), WorkspaceError> {
        let mut first_error = None;
        for path in [&self.layout.product_env, &self.layout.hash_store] {
            match fs_ops::remove(path) {
                Ok(()) => {}
                Err(FsError::NotFound { .. }) => {
                    log::debug!("'{}' does not exist, nothing to clean.", path.display());
                }
                Err(e) => {
                    log::warn!("Failed to clean '{}': {}", path.display(), e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

fn exec_logged<S: AsRef<str>>(
    env_path: &Path,
    args: &[S],
    options: ExecOptions,
) -> Result<ExecutionResult, ExecutionError> {
    let result = executor::run_in_env(env_path, args, options);
    if let Err(e) = &result {
        log::warn!("Command in '{}' failed: {}", env_path.display(), e);
    }
    result
}

/// Creates a virtual environment at `env_path` with pip bootstrapped, unless a
/// directory already exists there.
fn ensure_env(env_path: &Path) -> Result<(), WorkspaceError> {
    if env_path.is_dir() {
        log::debug!("Environment '{}' already exists.", env_path.display());
        return Ok(());
    }
    if let Some(parent) = env_path.parent() {
        fs_ops::ensure_dir(parent)?;
    }

    let python = find_python()?;
    let python = python.to_string_lossy();
    let env_arg = env_path.to_string_lossy();
    executor::run_argv(
        &[&*python, "-m", "venv", "--symlinks", &*env_arg],
        ExecOptions::default(),
    )?;
    Ok(())
}

fn find_python() -> Result<PathBuf, WorkspaceError> {
    PYTHON_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or(WorkspaceError::PythonNotFound)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}
