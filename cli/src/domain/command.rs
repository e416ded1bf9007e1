//! Outcome of one remote command execution.

/// Captured output and exit status of a single remote command.
///
/// `stdout` and `stderr` are `None` when the stream produced no bytes at all,
/// which keeps "no output" distinguishable from output that happened to be
/// whitespace. The exit status is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_status: i32,
}

impl CommandResult {
    /// Build a result from raw stream buffers.
    #[must_use]
    pub fn from_streams(stdout: Vec<u8>, stderr: Vec<u8>, exit_status: i32) -> Self {
        Self {
            stdout: non_empty(stdout),
            stderr: non_empty(stderr),
            exit_status,
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    /// Stdout as a borrowed str, empty when the stream was silent.
    #[must_use]
    pub fn stdout_str(&self) -> &str {
        self.stdout.as_deref().unwrap_or_default()
    }

    /// Stderr as a borrowed str, empty when the stream was silent.
    #[must_use]
    pub fn stderr_str(&self) -> &str {
        self.stderr.as_deref().unwrap_or_default()
    }
}

fn non_empty(buf: Vec<u8>) -> Option<String> {
    if buf.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&buf).into_owned())
    }
}
