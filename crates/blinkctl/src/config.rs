use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use blinkwatch::supervisor::{SupervisorConfig, DEFAULT_COMMAND};

// ── Config file (~/.config/blinkctl/config.toml) ─────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Shell command line for the supervised daemon.
	#[serde(default = "default_command")]
	pub command: String,
	#[serde(default = "default_shell")]
	pub shell: String,
	/// Display refresh cadence in milliseconds; each refresh drives one tick.
	#[serde(default = "default_refresh_ms")]
	pub refresh_ms: u64,
	/// Bounded stream-poll wait inside a tick, milliseconds. Keep it under
	/// refresh_ms or the loop falls behind its own cadence.
	#[serde(default = "default_poll_ms")]
	pub poll_ms: u64,
	/// Seconds between SIGTERM and the SIGKILL escalation on stop.
	#[serde(default = "default_grace_secs")]
	pub grace_secs: u64,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			command: default_command(),
			shell: default_shell(),
			refresh_ms: default_refresh_ms(),
			poll_ms: default_poll_ms(),
			grace_secs: default_grace_secs(),
		}
	}
}

fn default_command() -> String { DEFAULT_COMMAND.to_string() }
fn default_shell() -> String { "sh".to_string() }
fn default_refresh_ms() -> u64 { 100 }
fn default_poll_ms() -> u64 { 50 }
fn default_grace_secs() -> u64 { 3 }

impl Config {
	pub fn supervisor(&self) -> SupervisorConfig {
		SupervisorConfig {
			command_line: self.command.clone(),
			shell: self.shell.clone(),
			poll_wait: Duration::from_millis(self.poll_ms),
			term_grace: Duration::from_secs(self.grace_secs),
		}
	}

	pub fn refresh(&self) -> Duration {
		Duration::from_millis(self.refresh_ms)
	}
}

/// Load the config, falling back to defaults when the file is missing or
/// malformed. A bad file is reported but never fatal.
pub fn load(path: Option<&Path>) -> Config {
	let path = match path {
		Some(p) => p.to_path_buf(),
		None => default_path(),
	};
	match std::fs::read_to_string(&path) {
		Ok(text) => match toml::from_str(&text) {
			Ok(config) => config,
			Err(e) => {
				eprintln!("bad config {}: {}", path.display(), e);
				Config::default()
			}
		},
		Err(_) => Config::default(),
	}
}

fn default_path() -> PathBuf {
	let base = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
		.unwrap_or_else(|| PathBuf::from("."));
	base.join("blinkctl").join("config.toml")
}
