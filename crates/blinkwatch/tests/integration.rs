use std::time::Duration;

use tokio::io::AsyncWriteExt;

use blinkwatch::facade::SupervisorFacade;
use blinkwatch::mux::StreamMultiplexer;
use blinkwatch::supervisor::{Supervisor, SupervisorConfig, ToggleOutcome};
use blinkwatch::types::*;

fn test_config(command: &str) -> SupervisorConfig {
	SupervisorConfig {
		command_line: command.to_string(),
		poll_wait: Duration::from_millis(20),
		term_grace: Duration::from_secs(3),
		..SupervisorConfig::default()
	}
}

async fn tick_until(sup: &mut Supervisor, pred: impl Fn(&Supervisor) -> bool) -> bool {
	for _ in 0..200 {
		sup.tick().await;
		if pred(sup) {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	false
}

// --- Types ---

#[test]
fn state_is_running() {
	assert!(SupervisorState::Running.is_running());
	assert!(!SupervisorState::Stopped.is_running());
	assert!(!SupervisorState::Error.is_running());
}

#[test]
fn state_display() {
	assert_eq!(SupervisorState::Stopped.to_string(), "stopped");
	assert_eq!(SupervisorState::Running.to_string(), "running");
	assert_eq!(SupervisorState::Error.to_string(), "error");
}

// --- Multiplexer ---

#[tokio::test]
async fn mux_empty_poll_returns_immediately() {
	let mut mux = StreamMultiplexer::new();
	let begin = std::time::Instant::now();
	assert!(mux.poll(Duration::from_secs(5)).await.is_empty());
	assert!(begin.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn mux_one_line_per_stream_per_poll() {
	let mut mux = StreamMultiplexer::new();
	let (mut out_tx, out_rx) = tokio::io::duplex(256);
	let (mut err_tx, err_rx) = tokio::io::duplex(256);
	mux.register(StreamSource::Stdout, out_rx);
	mux.register(StreamSource::Stderr, err_rx);

	out_tx.write_all(b"first\nsecond\n").await.unwrap();
	err_tx.write_all(b"oops\n").await.unwrap();
	// Let the duplex buffers become readable before polling.
	tokio::time::sleep(Duration::from_millis(20)).await;

	let mut lines = mux.poll(Duration::from_millis(100)).await;
	lines.sort_by_key(|l| l.source == StreamSource::Stderr);
	assert_eq!(lines.len(), 2);
	assert_eq!(lines[0], StreamLine { source: StreamSource::Stdout, line: "first".into() });
	assert_eq!(lines[1], StreamLine { source: StreamSource::Stderr, line: "oops".into() });

	// "second" stayed buffered for the next poll.
	let lines = mux.poll(Duration::from_millis(100)).await;
	assert_eq!(lines.len(), 1);
	assert_eq!(lines[0].line, "second");
}

#[tokio::test]
async fn mux_eof_unregisters_stream() {
	let mut mux = StreamMultiplexer::new();
	let (out_tx, out_rx) = tokio::io::duplex(256);
	mux.register(StreamSource::Stdout, out_rx);
	drop(out_tx);

	assert!(mux.poll(Duration::from_millis(100)).await.is_empty());
	assert!(mux.is_empty());
}

#[tokio::test]
async fn mux_poll_respects_bound() {
	let mut mux = StreamMultiplexer::new();
	let (_out_tx, out_rx) = tokio::io::duplex(256);
	mux.register(StreamSource::Stdout, out_rx);

	let begin = std::time::Instant::now();
	assert!(mux.poll(Duration::from_millis(50)).await.is_empty());
	let elapsed = begin.elapsed();
	assert!(elapsed >= Duration::from_millis(40), "returned too early: {:?}", elapsed);
	assert!(elapsed < Duration::from_secs(2), "blocked too long: {:?}", elapsed);
}

#[tokio::test]
async fn mux_register_replaces_previous_stream() {
	let mut mux = StreamMultiplexer::new();
	let (mut old_tx, old_rx) = tokio::io::duplex(256);
	mux.register(StreamSource::Stdout, old_rx);
	old_tx.write_all(b"stale\n").await.unwrap();

	let (mut new_tx, new_rx) = tokio::io::duplex(256);
	mux.register(StreamSource::Stdout, new_rx);
	new_tx.write_all(b"fresh\n").await.unwrap();

	let lines = mux.poll(Duration::from_millis(100)).await;
	assert_eq!(lines.len(), 1);
	assert_eq!(lines[0].line, "fresh");
}

// --- Supervisor: toggle lifecycle ---

#[tokio::test]
async fn toggle_cycles_between_stopped_and_running() {
	let mut sup = Supervisor::new(test_config("sleep 60"));
	assert_eq!(sup.state(), SupervisorState::Stopped);

	assert_eq!(sup.toggle().await, ToggleOutcome::Started);
	assert_eq!(sup.state(), SupervisorState::Running);
	assert_eq!(sup.status_message(), "started");

	assert_eq!(sup.toggle().await, ToggleOutcome::Stopped);
	assert_eq!(sup.state(), SupervisorState::Stopped);
	// sleep dies from the polite signal.
	assert_eq!(sup.status_message(), "signal 15");
}

#[tokio::test]
async fn tick_when_stopped_is_noop() {
	let mut sup = Supervisor::new(test_config("sleep 60"));
	for _ in 0..5 {
		sup.tick().await;
	}
	assert_eq!(sup.state(), SupervisorState::Stopped);
	assert_eq!(sup.last_log_line(), NO_MESSAGE);
	assert_eq!(sup.last_err_line(), NO_ERROR);
}

#[tokio::test]
async fn start_while_running_is_noop() {
	let mut sup = Supervisor::new(test_config("sleep 60"));
	sup.start();
	assert_eq!(sup.state(), SupervisorState::Running);
	sup.start();
	assert_eq!(sup.state(), SupervisorState::Running);
	sup.stop().await;
}

// --- Supervisor: output capture ---

#[tokio::test]
async fn echo_round_trip_on_stdout() {
	let mut sup = Supervisor::new(test_config("echo hello"));
	sup.start();

	assert!(tick_until(&mut sup, |s| s.last_log_line() == "hello").await);
	assert_eq!(sup.last_err_line(), NO_ERROR);

	// With the output drained, further ticks notice the exit and reap.
	assert!(tick_until(&mut sup, |s| s.state() == SupervisorState::Stopped).await);
	assert_eq!(sup.status_message(), "exit status 0");
}

#[tokio::test]
async fn stderr_lands_in_error_buffer() {
	let mut sup = Supervisor::new(test_config("echo oops 1>&2"));
	sup.start();

	assert!(tick_until(&mut sup, |s| s.last_err_line() == "oops").await);
	assert_eq!(sup.last_log_line(), NO_MESSAGE);
}

#[tokio::test]
async fn start_resets_buffers_to_placeholders() {
	let mut sup = Supervisor::new(test_config("echo hello"));
	sup.start();
	assert!(tick_until(&mut sup, |s| s.last_log_line() == "hello").await);
	assert!(tick_until(&mut sup, |s| s.state() == SupervisorState::Stopped).await);

	sup.set_command_line("sleep 60");
	sup.start();
	assert_eq!(sup.last_log_line(), NO_MESSAGE);
	assert_eq!(sup.last_err_line(), NO_ERROR);
	sup.stop().await;
}

#[tokio::test]
async fn restart_never_sees_previous_child_output() {
	let mut sup = Supervisor::new(test_config("echo first"));
	sup.start();
	assert!(tick_until(&mut sup, |s| s.last_log_line() == "first").await);
	assert!(tick_until(&mut sup, |s| s.state() == SupervisorState::Stopped).await);

	sup.set_command_line("echo second");
	sup.start();
	assert!(tick_until(&mut sup, |s| s.last_log_line() == "second").await);
	assert!(tick_until(&mut sup, |s| s.state() == SupervisorState::Stopped).await);
	assert_eq!(sup.last_log_line(), "second");
}

// --- Supervisor: termination protocol ---

#[tokio::test]
async fn stop_records_exit_code_from_term_handler() {
	let mut sup = Supervisor::new(test_config("trap 'exit 7' TERM; while :; do sleep 1; done"));
	sup.start();
	tokio::time::sleep(Duration::from_millis(200)).await;

	sup.stop().await;
	assert_eq!(sup.state(), SupervisorState::Stopped);
	assert_eq!(sup.status_message(), "exit status 7");
}

#[tokio::test]
async fn stop_escalates_to_sigkill_when_term_is_ignored() {
	let mut config = test_config("trap '' TERM; while :; do sleep 1; done");
	config.term_grace = Duration::from_secs(1);
	let mut sup = Supervisor::new(config);
	sup.start();
	tokio::time::sleep(Duration::from_millis(200)).await;

	sup.stop().await;
	assert_eq!(sup.state(), SupervisorState::Stopped);
	assert_eq!(sup.status_message(), "signal 9");
}

// --- Supervisor: spawn failure ---

#[tokio::test]
async fn bad_shell_transitions_to_error() {
	let mut config = test_config("echo hello");
	config.shell = "/nonexistent/blinkwatch-test-shell".to_string();
	let mut sup = Supervisor::new(config);

	sup.start();
	assert_eq!(sup.state(), SupervisorState::Error);
	assert!(sup.status_message().starts_with("spawn failed"));
	assert_eq!(sup.command_line(), "echo hello");

	// The error state is a dead end; toggling asks the host to exit.
	assert_eq!(sup.toggle().await, ToggleOutcome::ShutdownRequested);
}

// --- Facade ---

#[tokio::test]
async fn facade_exposes_supervisor_fields() {
	let mut facade = SupervisorFacade::new(test_config("echo hi"));

	let snap = facade.snapshot();
	assert_eq!(snap.state, SupervisorState::Stopped);
	assert_eq!(snap.command_line, "echo hi");
	assert_eq!(snap.last_log_line, NO_MESSAGE);
	assert_eq!(snap.last_err_line, NO_ERROR);

	assert_eq!(facade.toggle().await, ToggleOutcome::Started);
	let mut seen = false;
	for _ in 0..200 {
		facade.tick().await;
		if facade.snapshot().last_log_line == "hi" {
			seen = true;
			break;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	assert!(seen);

	facade.set_command_line("sleep 60");
	assert_eq!(facade.snapshot().command_line, "sleep 60");

	facade.request_shutdown().await;
	assert_ne!(facade.snapshot().state, SupervisorState::Running);
}
