use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::warn;

use crate::types::{StreamLine, StreamSource};

type LineStream = Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;

/// Bounded readiness polling over a child's stdout and stderr.
///
/// One reader slot per [`StreamSource`]; registering a source again replaces
/// whatever was there. `poll` hands back at most one line per registered
/// stream and never waits longer than its budget, so the caller's tick loop
/// stays responsive. End-of-stream drops the reader from the set — a dead
/// descriptor must not keep reporting readiness.
#[derive(Default)]
pub struct StreamMultiplexer {
	stdout: Option<LineStream>,
	stderr: Option<LineStream>,
}

impl StreamMultiplexer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(
		&mut self,
		source: StreamSource,
		reader: impl AsyncRead + Send + Unpin + 'static,
	) {
		let boxed: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
		let lines = BufReader::new(boxed).lines();
		match source {
			StreamSource::Stdout => self.stdout = Some(lines),
			StreamSource::Stderr => self.stderr = Some(lines),
		}
	}

	pub fn unregister(&mut self, source: StreamSource) {
		match source {
			StreamSource::Stdout => self.stdout = None,
			StreamSource::Stderr => self.stderr = None,
		}
	}

	/// Drop both readers. Must run before a new child's pipes are registered
	/// so the old child's descriptors never linger in the readiness set.
	pub fn clear(&mut self) {
		self.stdout = None;
		self.stderr = None;
	}

	pub fn is_empty(&self) -> bool {
		self.stdout.is_none() && self.stderr.is_none()
	}

	/// Collect the lines readable within `wait`.
	///
	/// Each registered stream contributes at most one line per call. A read
	/// error counts as "no line this tick" and unregisters the stream, same
	/// as end-of-stream. Returns immediately when nothing is registered.
	pub async fn poll(&mut self, wait: Duration) -> Vec<StreamLine> {
		let mut lines = Vec::new();
		if self.is_empty() {
			return lines;
		}

		let deadline = tokio::time::Instant::now() + wait;
		let mut stdout_seen = false;
		let mut stderr_seen = false;

		loop {
			let stdout_open = self.stdout.is_some() && !stdout_seen;
			let stderr_open = self.stderr.is_some() && !stderr_seen;
			if !stdout_open && !stderr_open {
				return lines;
			}

			// Once something arrived, only pick up lines that are already
			// buffered instead of waiting out the rest of the budget.
			let cutoff = if lines.is_empty() {
				deadline
			} else {
				tokio::time::Instant::now()
			};

			// Biased so a line that is already buffered beats an elapsed
			// cutoff during the drain pass.
			let (source, read) = tokio::select! {
				biased;
				read = next_line(self.stdout.as_mut()), if stdout_open => (StreamSource::Stdout, read),
				read = next_line(self.stderr.as_mut()), if stderr_open => (StreamSource::Stderr, read),
				_ = tokio::time::sleep_until(cutoff) => return lines,
			};

			match read {
				Ok(Some(line)) => {
					match source {
						StreamSource::Stdout => stdout_seen = true,
						StreamSource::Stderr => stderr_seen = true,
					}
					lines.push(StreamLine { source, line });
				}
				Ok(None) => {
					self.unregister(source);
				}
				Err(e) => {
					warn!("read error on {}: {}", source, e);
					self.unregister(source);
				}
			}
		}
	}
}

async fn next_line(stream: Option<&mut LineStream>) -> std::io::Result<Option<String>> {
	match stream {
		Some(lines) => lines.next_line().await,
		// Unregistered slots are guarded out of the select above.
		None => std::future::pending().await,
	}
}
