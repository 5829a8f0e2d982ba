// src/core/mod.rs

//! Workspace-level building blocks: paths, templates and console output.

pub mod console;
pub mod paths;
pub mod template;
pub mod workspace;
