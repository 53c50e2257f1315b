//! External command execution with captured output.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use cifuzz_core::CommandResult;
use tokio::process::Command;

use crate::ExecutorError;

/// Runs external commands and captures their output.
///
/// Every call spawns exactly one process and waits for it. There is no retry
/// and no timeout; the CI caller bounds the overall run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Run `args[0]` with the remaining arguments in `cwd` (or the current
    /// directory) and capture stdout, stderr and the exit code.
    ///
    /// Non-zero exits are returned as a normal [`CommandResult`] unless
    /// `strict` is set.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Spawn`] if `args` is empty or the process cannot
    /// be started. With `strict`, returns [`ExecutorError::CommandFailed`] if
    /// the process exits non-zero or writes anything to stderr.
    pub async fn execute<S: AsRef<OsStr>>(
        &self,
        args: &[S],
        cwd: Option<&Path>,
        strict: bool,
    ) -> Result<CommandResult, ExecutorError> {
        let command_line = render_command(args);
        let Some((program, rest)) = args.split_first() else {
            return Err(ExecutorError::Spawn {
                command: command_line,
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            });
        };

        let mut command = Command::new(program);
        command
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        tracing::debug!(command = %command_line, cwd = ?cwd, "executing command");

        let output = command.output().await.map_err(|source| ExecutorError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let result = CommandResult::new(
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
            output.status.code().unwrap_or(-1),
        );

        if strict && (!result.success() || !output.stderr.is_empty()) {
            return Err(ExecutorError::CommandFailed {
                command: command_line,
                output: format!("{}{}", result.output, result.stderr),
                exit_code: result.exit_code,
            });
        }

        Ok(result)
    }
}

/// Render an argument vector for logs and error messages.
pub(crate) fn render_command<S: AsRef<OsStr>>(args: &[S]) -> String {
    args.iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_captures_stdout_and_exit_code() {
        let result = CommandExecutor::new()
            .execute(&["sh", "-c", "echo hello"], None, true)
            .await;
        let result = match result {
            Ok(r) => r,
            Err(e) => panic!("echo failed: {e}"),
        };
        assert_eq!(result.output, "hello\n");
        assert_eq!(result.exit_code, 0);
        assert!(result.success());
    }

    #[tokio::test]
    async fn execute_non_strict_returns_failure_as_result() {
        let result = CommandExecutor::new()
            .execute(&["sh", "-c", "echo partial; exit 3"], None, false)
            .await;
        let result = match result {
            Ok(r) => r,
            Err(e) => panic!("non-strict execution must not error: {e}"),
        };
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.output, "partial\n");
    }

    #[tokio::test]
    async fn execute_strict_rejects_non_zero_exit() {
        let result = CommandExecutor::new()
            .execute(&["sh", "-c", "echo out; exit 2"], None, true)
            .await;
        match result {
            Err(ExecutorError::CommandFailed { command, output, exit_code }) => {
                assert_eq!(exit_code, 2);
                assert!(command.starts_with("sh -c"), "command must be recorded: {command}");
                assert!(output.contains("out"), "output must be recorded: {output}");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_strict_rejects_stderr_output() {
        let result = CommandExecutor::new()
            .execute(&["sh", "-c", "echo warn >&2"], None, true)
            .await;
        assert!(
            matches!(result, Err(ExecutorError::CommandFailed { exit_code: 0, .. })),
            "stderr output must fail strict mode even on exit 0"
        );
    }

    #[tokio::test]
    async fn execute_runs_in_requested_directory() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("tempdir: {e}"),
        };
        let result = CommandExecutor::new()
            .execute(&["pwd"], Some(dir.path()), true)
            .await;
        let result = match result {
            Ok(r) => r,
            Err(e) => panic!("pwd failed: {e}"),
        };
        let reported = std::path::PathBuf::from(result.output.trim());
        let expected = match dir.path().canonicalize() {
            Ok(p) => p,
            Err(e) => panic!("canonicalize: {e}"),
        };
        assert_eq!(reported.canonicalize().ok(), Some(expected));
    }

    #[tokio::test]
    async fn execute_missing_binary_is_spawn_error() {
        let result = CommandExecutor::new()
            .execute(&["cifuzz-definitely-not-a-binary"], None, false)
            .await;
        assert!(matches!(result, Err(ExecutorError::Spawn { .. })));
    }

    #[tokio::test]
    async fn execute_empty_command_is_spawn_error() {
        let empty: [&str; 0] = [];
        let result = CommandExecutor::new().execute(&empty, None, false).await;
        assert!(matches!(result, Err(ExecutorError::Spawn { .. })));
    }

    #[test]
    fn render_command_joins_with_spaces() {
        assert_eq!(render_command(&["git", "checkout", "-f", "abc"]), "git checkout -f abc");
    }
}
