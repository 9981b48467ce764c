//! Structured logging setup shared by every binary.

use tracing_subscriber::EnvFilter;

/// Install a `tracing_subscriber` fmt layer on stderr. Reads `PMGR_LOG`, falling back
/// to `RUST_LOG`, defaulting to `info` if neither is set — so log output never mixes
/// with a command's own stdout protocol output.
pub fn init() {
	let filter = EnvFilter::try_from_env("PMGR_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
