use crate::supervisor::{Supervisor, SupervisorConfig, ToggleOutcome};
use crate::types::StatusSnapshot;

/// The narrow boundary a presentation layer talks to.
///
/// Reads go through [`snapshot`](SupervisorFacade::snapshot); the only
/// mutations are the command-line editor and the two commands. The caller's
/// refresh cadence drives [`tick`](SupervisorFacade::tick) — nothing updates
/// between ticks.
pub struct SupervisorFacade {
	supervisor: Supervisor,
}

impl SupervisorFacade {
	pub fn new(config: SupervisorConfig) -> Self {
		Self {
			supervisor: Supervisor::new(config),
		}
	}

	pub fn snapshot(&self) -> StatusSnapshot {
		let s = &self.supervisor;
		StatusSnapshot {
			state: s.state(),
			command_line: s.command_line().to_string(),
			last_log_line: s.last_log_line().to_string(),
			last_err_line: s.last_err_line().to_string(),
			status_message: s.status_message().to_string(),
		}
	}

	/// Applies to the next start; a running child is unaffected.
	pub fn set_command_line(&mut self, command: impl Into<String>) {
		self.supervisor.set_command_line(command);
	}

	pub async fn tick(&mut self) {
		self.supervisor.tick().await;
	}

	pub async fn toggle(&mut self) -> ToggleOutcome {
		self.supervisor.toggle().await
	}

	/// Stop the child if one is running. The caller is expected to exit
	/// afterwards.
	pub async fn request_shutdown(&mut self) {
		self.supervisor.stop().await;
	}
}
