// src/system/executor.rs

//! Blocking process execution, directly from an argv, through the platform
//! shell, or inside a virtual environment.

use crate::{constants::VENV_BIN_DIR, core::console};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, ExitStatus, Output, Stdio};
use thiserror::Error;

/// Errors from running a command.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The argv or shell command line was empty.
    #[error("No command specified to run.")]
    EmptyCommand,
    /// The process could not be started.
    #[error("Command '{command}' could not be executed: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The process exited unsuccessfully while `check` was set.
    #[error("Command '{command}' {}.", describe_code(.code))]
    CommandFailed { code: Option<i32>, command: String },
    /// The venv directory cannot be placed on `PATH`.
    #[error("Could not build a search path containing '{dir}': {source}")]
    SearchPath {
        dir: PathBuf,
        #[source]
        source: std::env::JoinPathsError,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

impl ExecutionError {
    /// The exit code of a failed command, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => *code,
            _ => None,
        }
    }
}

/// How a command is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Fail with [`ExecutionError::CommandFailed`] on a non-zero exit.
    pub check: bool,
    /// Buffer stdout/stderr instead of inheriting the caller's streams.
    pub capture: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            check: true,
            capture: false,
        }
    }
}

impl ExecOptions {
    /// Sets whether a non-zero exit is an error.
    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    /// Sets whether output is captured.
    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }
}

/// The outcome of one finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Present only when the command ran with `capture`.
    pub stdout: Option<Vec<u8>>,
    /// Present only when the command ran with `capture`.
    pub stderr: Option<Vec<u8>>,
}

impl ExecutionResult {
    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Captured stdout decoded lossily, or an empty string when not captured.
    pub fn stdout_lossy(&self) -> String {
        self.stdout
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            stdout: None,
            stderr: None,
        }
    }

    fn from_output(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: Some(output.stdout),
            stderr: Some(output.stderr),
        }
    }
}

// --- Public Entry Points ---

/// Spawns `args[0]` with the remaining arguments, without any shell interpretation.
pub fn run_argv<S: AsRef<str>>(
    args: &[S],
    options: ExecOptions,
) -> Result<ExecutionResult, ExecutionError> {
    let (program, rest) = args.split_first().ok_or(ExecutionError::EmptyCommand)?;
    let display = console::join_argv(args);
    console::echo(format!("exec {}", display));

    let mut command = StdCommand::new(program.as_ref());
    command.args(rest.iter().map(|arg| arg.as_ref()));
    finish(command, display, options)
}

/// Runs `command_line` through the platform shell, so pipes, redirections and
/// globs behave as they would when typed.
pub fn run_shell(
    command_line: &str,
    options: ExecOptions,
) -> Result<ExecutionResult, ExecutionError> {
    if command_line.trim().is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }
    console::echo(format!("$ {}", command_line));

    let mut command = if cfg!(target_os = "windows") {
        let mut cmd = StdCommand::new("cmd");
        cmd.arg("/C");
        cmd
    } else {
        let mut cmd = StdCommand::new("sh");
        cmd.arg("-c");
        cmd
    };
    command.arg(command_line);
    finish(command, command_line.to_string(), options)
}

/// Runs `args` with the virtual environment at `env_path` activated.
///
/// The environment's executable directory is put in front of `PATH` for the
/// child only: `PATH` is also what resolves `args[0]`, so commands installed in
/// the environment shadow global ones. The `PATH` of the current process is never
/// modified, on success or failure alike.
pub fn run_in_env<S: AsRef<str>>(
    env_path: &Path,
    args: &[S],
    options: ExecOptions,
) -> Result<ExecutionResult, ExecutionError> {
    let (program, rest) = args.split_first().ok_or(ExecutionError::EmptyCommand)?;
    console::echo("Activating venv...");

    let bin_dir = env_bin_dir(env_path);
    let search_path = prepend_to_search_path(&bin_dir, std::env::var_os("PATH"))?;
    log::debug!("Search path for venv command: {:?}", search_path);

    let display = console::join_argv(args);
    console::echo(format!("exec {}", display));

    let mut command = StdCommand::new(program.as_ref());
    command
        .args(rest.iter().map(|arg| arg.as_ref()))
        .env("PATH", &search_path);
    finish(command, display, options)
}

// --- Helpers ---

/// The directory holding a virtual environment's executables.
pub fn env_bin_dir(env_path: &Path) -> PathBuf {
    env_path.join(VENV_BIN_DIR)
}

/// Builds a search path with `dir` first, followed by every entry of `current`.
pub fn prepend_to_search_path(
    dir: &Path,
    current: Option<OsString>,
) -> Result<OsString, ExecutionError> {
    let mut entries = vec![dir.to_path_buf()];
    if let Some(current) = current {
        entries.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(entries).map_err(|source| ExecutionError::SearchPath {
        dir: dir.to_path_buf(),
        source,
    })
}

/// Spawns the prepared command, waits for it, and applies the exit-code check.
fn finish(
    mut command: StdCommand,
    display: String,
    options: ExecOptions,
) -> Result<ExecutionResult, ExecutionError> {
    let result = if options.capture {
        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map(ExecutionResult::from_output)
    } else {
        command
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map(ExecutionResult::from_status)
    }
    .map_err(|source| ExecutionError::Spawn {
        command: display.clone(),
        source,
    })?;

    if options.check && !result.success() {
        return Err(ExecutionError::CommandFailed {
            code: result.code,
            command: display,
        });
    }
    if !result.success() {
        log::debug!("'{}' exited with {:?}, ignored.", display, result.code);
    }
    Ok(result)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_run_argv_false_fails_when_checked() {
        let err = run_argv(&["false"], ExecOptions::default()).unwrap_err();
        assert!(matches!(err, ExecutionError::CommandFailed { code: Some(1), .. }));
        assert_eq!(err.exit_code(), Some(1));
    }

    #[test]
    fn test_run_argv_false_returns_code_when_unchecked() {
        let result = run_argv(&["false"], ExecOptions::default().check(false)).unwrap();
        assert_eq!(result.code, Some(1));
        assert!(!result.success());
        assert!(result.stdout.is_none());
    }

    #[test]
    fn test_run_argv_does_not_interpret_shell_syntax() {
        let options = ExecOptions::default().capture(true);
        let result = run_argv(&["echo", "a | b", "$HOME"], options).unwrap();
        assert_eq!(result.stdout_lossy(), "a | b $HOME\n");
    }

    #[test]
    fn test_run_argv_rejects_empty_argv() {
        let empty: [&str; 0] = [];
        let err = run_argv(&empty, ExecOptions::default()).unwrap_err();
        assert!(matches!(err, ExecutionError::EmptyCommand));
    }

    #[test]
    fn test_run_argv_missing_program_is_spawn_error() {
        let err = run_argv(&["jarvis-no-such-program-xyz"], ExecOptions::default()).unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));
    }

    #[test]
    fn test_run_shell_supports_pipes_and_captures_both_streams() {
        let options = ExecOptions::default().capture(true);
        let result = run_shell("printf 'b\\na\\n' | sort; echo oops >&2", options).unwrap();
        assert!(result.success());
        assert_eq!(result.stdout_lossy(), "a\nb\n");
        assert_eq!(result.stderr.as_deref(), Some(&b"oops\n"[..]));
    }

    #[test]
    fn test_run_shell_exit_code_is_reported() {
        let err = run_shell("exit 3", ExecOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), Some(3));

        let result = run_shell("exit 3", ExecOptions::default().check(false)).unwrap();
        assert_eq!(result.code, Some(3));
    }

    #[test]
    fn test_prepend_to_search_path_puts_dir_first() {
        let joined = prepend_to_search_path(
            Path::new("/env/bin"),
            Some(OsString::from("/usr/bin:/bin")),
        )
        .unwrap();
        assert_eq!(joined, OsString::from("/env/bin:/usr/bin:/bin"));

        let alone = prepend_to_search_path(Path::new("/env/bin"), None).unwrap();
        assert_eq!(alone, OsString::from("/env/bin"));
    }

    #[test]
    fn test_run_in_env_resolves_program_from_env_and_keeps_process_path() {
        // --- Setup ---
        let env_dir = tempdir().unwrap();
        let bin_dir = env_bin_dir(env_dir.path());
        fs::create_dir_all(&bin_dir).unwrap();
        std::os::unix::fs::symlink("/bin/sh", bin_dir.join("jarvis-venv-shell")).unwrap();
        let path_before = std::env::var_os("PATH");

        // --- Execute ---
        let options = ExecOptions::default().capture(true);
        let args = ["jarvis-venv-shell", "-c", "echo \"venv:$PATH\""];
        let result = run_in_env(env_dir.path(), &args, options).unwrap();

        // --- Assert ---
        let out = result.stdout_lossy();
        let expected_prefix = format!("venv:{}", bin_dir.display());
        assert!(out.starts_with(&expected_prefix), "unexpected output: {}", out);
        assert_eq!(std::env::var_os("PATH"), path_before);
    }

    #[test]
    fn test_run_in_env_failure_keeps_process_path() {
        let env_dir = tempdir().unwrap();
        let path_before = std::env::var_os("PATH");

        let err = run_in_env(env_dir.path(), &["false"], ExecOptions::default()).unwrap_err();

        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(std::env::var_os("PATH"), path_before);
    }
}
