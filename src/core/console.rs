// src/core/console.rs

//! The diagnostics stream every operation announces itself on.

use colored::Colorize;
use std::path::Path;

/// Prints a dimmed diagnostic line to stdout and mirrors it to the debug log.
///
/// Every operation in this crate announces itself through here before it acts,
/// using the shell command a user would have typed to do the same thing.
pub fn echo(line: impl AsRef<str>) {
    let line = line.as_ref();
    log::debug!("{}", line);
    println!("{}", line.dimmed());
}

/// Formats a path the way the diagnostic lines quote it: `"path"`.
pub fn quoted(path: &Path) -> String {
    format!("\"{}\"", dunce::simplified(path).display())
}

/// Joins an argv into a single line that could be pasted back into a shell.
pub fn join_argv<S: AsRef<str>>(args: &[S]) -> String {
    let parts: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
    shlex::try_join(parts.iter().copied()).unwrap_or_else(|_| parts.join(" "))
}
