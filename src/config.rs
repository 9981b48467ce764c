//! Environment-driven configuration.
//!
//! Mirrors the fixed `PATH`/`FIFO_NAME` constants of a single-deployment shell, but
//! resolved at runtime so more than one supervisor (e.g. under test) can run side by
//! side without colliding on one shared FIFO.

use std::env;
use std::path::PathBuf;

const DEFAULT_FIFO_PATH: &str = "tmp";
const DEFAULT_BIN_DIR: &str = "./bin/";
const DEFAULT_FIFO_MODE: u32 = 0o600;

/// Resolved configuration for a single supervisor (and the helpers it spawns).
#[derive(Clone, Debug)]
pub struct Config {
	/// Path to the FIFO used as the shared message bus.
	pub fifo_path: PathBuf,
	/// Directory prepended to `PATH` so helper binaries resolve by bare name.
	pub bin_dir: PathBuf,
	/// Permission bits requested when creating the FIFO.
	pub fifo_mode: u32,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			fifo_path: PathBuf::from(DEFAULT_FIFO_PATH),
			bin_dir: PathBuf::from(DEFAULT_BIN_DIR),
			fifo_mode: DEFAULT_FIFO_MODE,
		}
	}
}

impl Config {
	/// Resolve configuration from the environment, falling back to documented defaults.
	pub fn from_env() -> Self {
		let mut config = Self::default();
		if let Some(path) = env::var_os("PMGR_FIFO_PATH") {
			config.fifo_path = PathBuf::from(path);
		}
		if let Some(dir) = env::var_os("PMGR_BIN_DIR") {
			config.bin_dir = PathBuf::from(dir);
		}
		if let Ok(mode) = env::var("PMGR_FIFO_MODE") {
			if let Ok(mode) = u32::from_str_radix(mode.trim_start_matches("0o"), 8) {
				config.fifo_mode = mode;
			}
		}
		config
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = Config::default();
		assert_eq!(config.fifo_path, PathBuf::from("tmp"));
		assert_eq!(config.bin_dir, PathBuf::from("./bin/"));
		assert_eq!(config.fifo_mode, 0o600);
	}

	#[test]
	fn overrides_from_env() {
		env::set_var("PMGR_FIFO_PATH", "/tmp/example-bus");
		env::set_var("PMGR_FIFO_MODE", "0o640");
		let config = Config::from_env();
		assert_eq!(config.fifo_path, PathBuf::from("/tmp/example-bus"));
		assert_eq!(config.fifo_mode, 0o640);
		env::remove_var("PMGR_FIFO_PATH");
		env::remove_var("PMGR_FIFO_MODE");
	}
}
