use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use crate::mux::StreamMultiplexer;
use crate::types::{StreamLine, StreamSource, SupervisorState, NO_ERROR, NO_MESSAGE};

/// Example invocation of the companion blink daemon; the flags are opaque to
/// the supervisor.
pub const DEFAULT_COMMAND: &str =
	"blinkd -r -c blink/iocactus-test.blink -l /dev/stdout -p /dev/null";

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
	/// Shell command line the child is spawned from. Editable between runs;
	/// a running child keeps the command it was spawned with.
	pub command_line: String,
	/// Shell that interprets the command line.
	pub shell: String,
	/// Bound on the multiplexer wait inside a single `tick`. Keep it well
	/// under the caller's refresh cadence.
	pub poll_wait: Duration,
	/// How long `stop` waits after SIGTERM before escalating to SIGKILL.
	pub term_grace: Duration,
}

impl Default for SupervisorConfig {
	fn default() -> Self {
		Self {
			command_line: DEFAULT_COMMAND.to_string(),
			shell: "sh".to_string(),
			poll_wait: Duration::from_millis(50),
			term_grace: Duration::from_secs(3),
		}
	}
}

/// What a `toggle` resolved to, so a front-end can react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
	Started,
	Stopped,
	SpawnFailed,
	/// Toggled while in the error state: the supervisor has nothing left to
	/// try and asks the embedding program to exit. The library never calls
	/// `process::exit` itself.
	ShutdownRequested,
}

/// Owns the child process handle and drives the
/// stopped/running/error lifecycle.
///
/// Invariant: the handle is present exactly while the state is `Running`.
/// A failed spawn leaves `Error` with no handle.
pub struct Supervisor {
	shell: String,
	poll_wait: Duration,
	term_grace: Duration,
	command_line: String,
	state: SupervisorState,
	child: Option<tokio::process::Child>,
	mux: StreamMultiplexer,
	last_log_line: String,
	last_err_line: String,
	status_message: String,
}

impl Supervisor {
	pub fn new(config: SupervisorConfig) -> Self {
		Self {
			shell: config.shell,
			poll_wait: config.poll_wait,
			term_grace: config.term_grace,
			command_line: config.command_line,
			state: SupervisorState::Stopped,
			child: None,
			mux: StreamMultiplexer::new(),
			last_log_line: NO_MESSAGE.to_string(),
			last_err_line: NO_ERROR.to_string(),
			status_message: NO_MESSAGE.to_string(),
		}
	}

	pub fn state(&self) -> SupervisorState {
		self.state
	}

	pub fn command_line(&self) -> &str {
		&self.command_line
	}

	/// Takes effect on the next `start`.
	pub fn set_command_line(&mut self, command: impl Into<String>) {
		self.command_line = command.into();
	}

	pub fn last_log_line(&self) -> &str {
		&self.last_log_line
	}

	pub fn last_err_line(&self) -> &str {
		&self.last_err_line
	}

	pub fn status_message(&self) -> &str {
		&self.status_message
	}

	/// Spawn the configured command through the shell, capturing stdout and
	/// stderr. No-op unless currently stopped.
	pub fn start(&mut self) {
		if self.state != SupervisorState::Stopped {
			return;
		}

		self.status_message = "starting...".to_string();

		// The previous run's pipes must be out of the readiness set before
		// the new child's pipes take their slots.
		self.mux.clear();
		self.last_log_line = NO_MESSAGE.to_string();
		self.last_err_line = NO_ERROR.to_string();

		let mut cmd = Command::new(&self.shell);
		cmd.args(["-c", &self.command_line])
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.process_group(0);

		let mut child = match cmd.spawn() {
			Ok(c) => c,
			Err(e) => {
				warn!("failed to spawn '{}': {}", self.command_line, e);
				self.state = SupervisorState::Error;
				self.status_message = format!("spawn failed: {}", e);
				return;
			}
		};

		if let Some(stdout) = child.stdout.take() {
			self.mux.register(StreamSource::Stdout, stdout);
		}
		if let Some(stderr) = child.stderr.take() {
			self.mux.register(StreamSource::Stderr, stderr);
		}

		info!("started child (pid {:?}): {}", child.id(), self.command_line);
		self.child = Some(child);
		self.state = SupervisorState::Running;
		self.status_message = "started".to_string();
	}

	/// Ask the child to terminate and wait for it, escalating to SIGKILL
	/// after the grace period. No-op unless currently running.
	///
	/// This awaits inline on the control loop; the display freezes for at
	/// most `term_grace` plus the kill round-trip.
	pub async fn stop(&mut self) {
		if self.state != SupervisorState::Running {
			return;
		}
		let Some(mut child) = self.child.take() else {
			self.state = SupervisorState::Stopped;
			return;
		};

		if let Some(pid) = child.id() {
			use nix::sys::signal::{kill, Signal};
			use nix::unistd::Pid;

			self.status_message = format!("kill({}, SIGTERM)", pid);
			match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
				Ok(()) => info!("sent SIGTERM to {}", pid),
				Err(nix::errno::Errno::ESRCH) => {
					// Already gone; wait() below still reaps the status.
					self.status_message = format!("kill({}, SIGTERM): no such process", pid);
				}
				Err(e) => {
					warn!("SIGTERM to {} failed: {}", pid, e);
					self.status_message = format!("kill({}, SIGTERM): {}", pid, e);
				}
			}
		}

		self.status_message = "waiting...".to_string();
		let waited = match tokio::time::timeout(self.term_grace, child.wait()).await {
			Ok(res) => res,
			Err(_) => {
				warn!(
					"child ignored SIGTERM for {:?}, sending SIGKILL",
					self.term_grace
				);
				if let Err(e) = child.start_kill() {
					warn!("SIGKILL failed: {}", e);
				}
				child.wait().await
			}
		};

		match waited {
			Ok(status) => {
				self.status_message = format_exit(status);
				info!("child exited: {}", self.status_message);
			}
			Err(e) => {
				warn!("wait for child failed: {}", e);
				self.status_message = format!("wait failed: {}", e);
			}
		}

		self.mux.clear();
		self.state = SupervisorState::Stopped;
	}

	/// The single user-facing command: start when stopped, stop when
	/// running, give up when errored.
	pub async fn toggle(&mut self) -> ToggleOutcome {
		match self.state {
			SupervisorState::Stopped => {
				self.start();
				match self.state {
					SupervisorState::Running => ToggleOutcome::Started,
					_ => ToggleOutcome::SpawnFailed,
				}
			}
			SupervisorState::Running => {
				self.stop().await;
				ToggleOutcome::Stopped
			}
			SupervisorState::Error => ToggleOutcome::ShutdownRequested,
		}
	}

	/// One cooperative step: drain ready output lines into the buffers,
	/// then notice a child that exited on its own.
	///
	/// Idempotent no-op while no child is held. Must be re-invoked on a
	/// steady cadence; this is the only way output is observed.
	pub async fn tick(&mut self) {
		if self.child.is_none() {
			return;
		}

		let lines = self.mux.poll(self.poll_wait).await;
		let quiet = lines.is_empty();
		for StreamLine { source, line } in lines {
			match source {
				StreamSource::Stdout => self.last_log_line = line,
				StreamSource::Stderr => self.last_err_line = line,
			}
		}

		// Reap only on a quiet tick so pipe-buffered output is drained
		// before the exit shows up in the state.
		if quiet {
			let exited = match self.child.as_mut() {
				Some(child) => match child.try_wait() {
					Ok(done) => done,
					Err(e) => {
						warn!("try_wait failed: {}", e);
						None
					}
				},
				None => None,
			};
			if let Some(status) = exited {
				self.status_message = format_exit(status);
				info!("child exited on its own: {}", self.status_message);
				self.mux.clear();
				self.child = None;
				self.state = SupervisorState::Stopped;
			}
		}
	}
}

fn format_exit(status: ExitStatus) -> String {
	use std::os::unix::process::ExitStatusExt;

	match status.code() {
		Some(code) => format!("exit status {}", code),
		None => match status.signal() {
			Some(sig) => format!("signal {}", sig),
			None => "exit status unknown".to_string(),
		},
	}
}
