use std::fmt;

/// Placeholder shown for the stdout buffer before the child says anything.
pub const NO_MESSAGE: &str = "(no message)";
/// Placeholder shown for the stderr buffer before the child complains.
pub const NO_ERROR: &str = "(no error)";

/// Lifecycle state of the supervised child.
///
/// `Error` is only entered when a spawn fails; the supervisor does not
/// recover from it on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
	Stopped,
	Running,
	Error,
}

impl SupervisorState {
	pub fn is_running(&self) -> bool {
		matches!(self, SupervisorState::Running)
	}
}

impl fmt::Display for SupervisorState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SupervisorState::Stopped => write!(f, "stopped"),
			SupervisorState::Running => write!(f, "running"),
			SupervisorState::Error => write!(f, "error"),
		}
	}
}

/// Which of the child's output streams a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
	Stdout,
	Stderr,
}

impl fmt::Display for StreamSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StreamSource::Stdout => write!(f, "stdout"),
			StreamSource::Stderr => write!(f, "stderr"),
		}
	}
}

/// One complete line read from a child stream, trailing newline stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLine {
	pub source: StreamSource,
	pub line: String,
}

/// Read-only view of the supervisor for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
	pub state: SupervisorState,
	pub command_line: String,
	pub last_log_line: String,
	pub last_err_line: String,
	pub status_message: String,
}
