use serde::{Deserialize, Serialize};

/// Captured result of one external command invocation.
///
/// Created once per process run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct CommandResult {
    /// Standard output, decoded as lossy UTF-8.
    pub output: String,
    /// Standard error, kept for diagnostics only.
    pub stderr: String,
    /// Process exit code; `-1` when the process was terminated by a signal.
    pub exit_code: i32,
}

impl CommandResult {
    #[must_use]
    pub fn new(output: String, stderr: String, exit_code: i32) -> Self {
        Self { output, stderr, exit_code }
    }

    /// Returns `true` if the process exited with code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
