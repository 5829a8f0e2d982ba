// src/constants.rs

//! Names that make up the on-disk layout shared with collaborating tooling.
//! Changing any of these breaks compatibility with existing build trees.

/// The build root, relative to the user's home directory (`~/.mrover`).
pub const BUILD_ROOT_DIR: &str = ".mrover";

/// The product virtual environment (inside the build root).
pub const PRODUCT_ENV_DIR: &str = "build_env";

/// The tool's own virtual environment (inside the build root).
pub const TOOL_ENV_DIR: &str = "jarvis_env";

/// The hash store location (inside the build root). Its format is owned elsewhere.
pub const HASH_STORE_DIR: &str = "project_hashes";

/// Intermediate build artifacts (inside the build root).
pub const SCRATCH_DIR: &str = "scratch";

/// Path components of the template directory, relative to the project root.
pub const TEMPLATES_DIR: [&str; 2] = ["jarvis_files", "templates"];

/// The executable directory of a virtual environment on this platform.
#[cfg(windows)]
pub const VENV_BIN_DIR: &str = "Scripts";
/// The executable directory of a virtual environment on this platform.
#[cfg(not(windows))]
pub const VENV_BIN_DIR: &str = "bin";

/// Interpreters tried, in order, when a virtual environment has to be created.
pub const PYTHON_CANDIDATES: [&str; 2] = ["python3", "python"];
