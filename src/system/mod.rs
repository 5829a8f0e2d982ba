//! # System Interaction Layer
//!
//! Thin wrappers over the operating system, each announcing itself on the
//! diagnostics stream before acting.
//!
//! ## Modules
//!
//! - **`executor`**: Runs commands from an argv, through the platform shell, or
//!   with a virtual environment's executables first on `PATH`. Output can be
//!   inherited or captured, and a non-zero exit can be an error or a value.
//! - **`fs_ops`**: Copy, move, link, remove and ensure-directory operations with
//!   overwrite-replace semantics.
//! - **`scoped`**: Scoped changes of the working directory and of the standard
//!   output/error descriptors, undone on every exit path.

pub mod executor;
pub mod fs_ops;
pub mod scoped;
