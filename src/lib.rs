//! Process, filesystem and workspace utilities for the `jarvis` build tool.
//!
//! Every operation here is a blocking pass-through to the operating system
//! that first prints the equivalent shell command as a dimmed diagnostic line.
//!
//! The helpers in [`system::scoped`] change process-wide state (working
//! directory, standard streams) for the duration of a call. They are meant for
//! single-threaded use; running them from several threads at once is not
//! supported.

pub mod constants;
pub mod core;
pub mod system;

pub use crate::core::workspace::{Workspace, WorkspaceError};
pub use crate::system::executor::{ExecOptions, ExecutionError, ExecutionResult};
