//! Subscriber setup for the host process.
//!
//! Every event goes to stderr because stdout carries the NDJSON front-end.
//! `RUST_LOG` replaces the verbosity-derived filter entirely.

use tracing_subscriber::EnvFilter;

/// Filter directives for a `-v` count.
///
/// Quiet runs hide per-frame routing, one `-v` shows host lifecycle events but
/// keeps the router at warnings, and anything higher opens up debug output.
pub fn default_filter(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "warn,pagebridge.router=off",
		1 => "info,pagebridge.router=warn",
		_ => "debug",
	}
}

pub fn init_logging(verbosity: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.compact()
		.init();
}

#[cfg(test)]
mod tests {
	use std::io;
	use std::sync::{Arc, Mutex};

	use super::*;

	#[derive(Clone, Default)]
	struct Capture(Arc<Mutex<Vec<u8>>>);

	impl io::Write for Capture {
		fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
			self.0.lock().unwrap().extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> io::Result<()> {
			Ok(())
		}
	}

	fn emit_at(verbosity: u8) -> String {
		let capture = Capture::default();
		let writer = capture.clone();
		let subscriber = tracing_subscriber::fmt()
			.with_env_filter(EnvFilter::new(default_filter(verbosity)))
			.with_writer(move || writer.clone())
			.with_ansi(false)
			.finish();

		tracing::subscriber::with_default(subscriber, || {
			tracing::info!(target: "pagebridge.router", "browser connected");
			tracing::warn!(target: "pagebridge.router", "pong not sent");
			tracing::info!(target: "pagebridge.serve", "stdin closed");
		});

		let bytes = capture.0.lock().unwrap().clone();
		String::from_utf8(bytes).unwrap()
	}

	#[test]
	fn test_quiet_silences_router() {
		let out = emit_at(0);
		assert!(!out.contains("pong not sent"), "{out}");
		assert!(!out.contains("stdin closed"), "{out}");
	}

	#[test]
	fn test_single_verbose_keeps_router_at_warn() {
		let out = emit_at(1);
		assert!(!out.contains("browser connected"), "{out}");
		assert!(out.contains("pong not sent"), "{out}");
		assert!(out.contains("stdin closed"), "{out}");
	}

	#[test]
	fn test_debug_shows_everything() {
		let out = emit_at(2);
		assert!(out.contains("browser connected"), "{out}");
		assert!(out.contains("pagebridge.router"), "{out}");
	}
}
