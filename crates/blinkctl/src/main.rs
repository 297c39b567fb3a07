mod config;

use std::path::PathBuf;

use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use blinkwatch::{StatusSnapshot, SupervisorFacade, SupervisorState, ToggleOutcome};

fn main() {
	let args: Vec<String> = std::env::args().skip(1).collect();

	let mut config_path: Option<PathBuf> = None;
	let mut command: Option<String> = None;

	let mut i = 0;
	while i < args.len() {
		match args[i].as_str() {
			"help" | "--help" | "-h" => {
				print_usage();
				return;
			}
			"version" | "--version" | "-V" => {
				println!("blinkctl {}", env!("CARGO_PKG_VERSION"));
				return;
			}
			"-c" | "--config" => {
				i += 1;
				match args.get(i) {
					Some(p) => config_path = Some(PathBuf::from(p)),
					None => {
						eprintln!("{} needs a path", "--config".bold());
						std::process::exit(1);
					}
				}
			}
			"--command" => {
				i += 1;
				match args.get(i) {
					Some(c) => command = Some(c.clone()),
					None => {
						eprintln!("{} needs a command line", "--command".bold());
						std::process::exit(1);
					}
				}
			}
			other => {
				eprintln!("unknown argument: {}", other);
				eprintln!("run 'blinkctl help' for usage");
				std::process::exit(1);
			}
		}
		i += 1;
	}

	tracing_subscriber::fmt().with_writer(std::io::stderr).init();

	let mut config = config::load(config_path.as_deref());
	if let Some(command) = command {
		config.command = command;
	}

	// One cooperative control loop, so a single-threaded runtime is enough.
	let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
		Ok(rt) => rt,
		Err(e) => {
			eprintln!("error: {}", e);
			std::process::exit(1);
		}
	};
	runtime.block_on(run(config));
}

fn print_usage() {
	eprintln!(
		"{} {} — control panel for a supervised blink daemon",
		"blinkctl".bold(),
		env!("CARGO_PKG_VERSION")
	);
	eprintln!();
	eprintln!("usage: {} [options]", "blinkctl".bold());
	eprintln!();
	eprintln!("{}", "options".cyan().bold());
	eprintln!("  {} <path>      Config file (default ~/.config/blinkctl/config.toml)", "-c, --config".bold());
	eprintln!("  {} <cmd>      Command line to supervise (overrides config)", "--command".bold());
	eprintln!();
	eprintln!("{}", "interactive commands".cyan().bold());
	eprintln!("  {}        Start or stop the daemon (Kill mode after an error)", "Enter, t".bold());
	eprintln!("  {}     Replace the command line for the next start", "c <cmd>".bold());
	eprintln!("  {}   Stop the daemon if running, then exit", "q, Ctrl-C".bold());
}

async fn run(config: config::Config) {
	let mut facade = SupervisorFacade::new(config.supervisor());

	eprintln!("command: {}", facade.snapshot().command_line);
	eprintln!("press Enter to start/stop, 'q' to quit");

	let mut ticker = tokio::time::interval(config.refresh());
	ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
	let mut input = BufReader::new(tokio::io::stdin()).lines();
	let mut input_open = true;
	let mut shown = String::new();

	loop {
		tokio::select! {
			_ = ticker.tick() => {
				facade.tick().await;
				render(&facade.snapshot(), &mut shown);
			}
			line = input.next_line(), if input_open => {
				match line {
					Ok(Some(text)) => {
						if !handle_command(&mut facade, text.trim()).await {
							break;
						}
					}
					// stdin closed: keep ticking, control via Ctrl-C only.
					Ok(None) | Err(_) => input_open = false,
				}
			}
			_ = tokio::signal::ctrl_c() => {
				facade.request_shutdown().await;
				break;
			}
		}
	}

	eprintln!("{}", facade.snapshot().status_message);
}

/// Returns false when the loop should exit.
async fn handle_command(facade: &mut SupervisorFacade, command: &str) -> bool {
	match command {
		"" | "t" | "toggle" => match facade.toggle().await {
			ToggleOutcome::ShutdownRequested => {
				facade.request_shutdown().await;
				return false;
			}
			ToggleOutcome::SpawnFailed => {
				eprintln!("{}: {}", "spawn failed".red(), facade.snapshot().status_message);
			}
			ToggleOutcome::Started | ToggleOutcome::Stopped => {}
		},
		"q" | "quit" => {
			facade.request_shutdown().await;
			return false;
		}
		other => {
			if let Some(rest) = other.strip_prefix("c ") {
				facade.set_command_line(rest.trim());
				eprintln!("command: {}", facade.snapshot().command_line);
			} else {
				eprintln!("commands: Enter/t toggle, c <command line>, q quit");
			}
		}
	}
	true
}

fn render(snapshot: &StatusSnapshot, shown: &mut String) {
	let state = match snapshot.state {
		SupervisorState::Running => format!("{}", "running".green().bold()),
		SupervisorState::Stopped => format!("{}", "stopped".yellow().bold()),
		SupervisorState::Error => format!("{}", "error".red().bold()),
	};
	let line = format!(
		"[{}] {} | log: {} | err: {}",
		state, snapshot.status_message, snapshot.last_log_line, snapshot.last_err_line
	);
	if line != *shown {
		println!("{}", line);
		*shown = line;
	}
}
