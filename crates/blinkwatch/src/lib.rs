//! # blinkwatch
//!
//! Supervisor for a single long-running child process.
//!
//! Spawn a shell command with piped stdout/stderr, watch both streams
//! without blocking, and stop the child with SIGTERM (SIGKILL after a grace
//! period). Everything runs on one cooperative control loop: call
//! [`Supervisor::tick`] on a steady cadence and read the observable fields
//! between ticks. There are no background tasks.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use blinkwatch::{Supervisor, SupervisorConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut sup = Supervisor::new(SupervisorConfig {
//!     command_line: "echo hello".into(),
//!     ..SupervisorConfig::default()
//! });
//!
//! sup.start();
//! for _ in 0..10 {
//!     sup.tick().await;
//! }
//! println!("{}", sup.last_log_line());
//! sup.stop().await;
//! # }
//! ```
//!
//! Presentation layers should talk to [`SupervisorFacade`] instead of the
//! supervisor directly: it exposes a read-only [`StatusSnapshot`] plus the
//! two commands (`toggle`, `request_shutdown`) a front-end needs.

pub mod types;
pub mod mux;
pub mod supervisor;
pub mod facade;

pub use types::{StatusSnapshot, StreamLine, StreamSource, SupervisorState};
pub use mux::StreamMultiplexer;
pub use supervisor::{Supervisor, SupervisorConfig, ToggleOutcome, DEFAULT_COMMAND};
pub use facade::SupervisorFacade;
