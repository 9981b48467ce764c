//! `phelp` — print usage information and list available commands.

use anyhow::{Context, Result};
use pmgr::config::Config;
use std::os::unix::fs::PermissionsExt;

fn main() -> Result<()> {
	pmgr::logging::init();

	let config = Config::from_env();

	println!("Usage:");
	println!(" pmanager [FILE]");
	println!(" Execute commands from standard input or [FILE].");
	println!(" To show help about a command, you can use the -h option.");
	println!();
	println!("Commands:");

	let entries = std::fs::read_dir(&config.bin_dir)
		.with_context(|| format!("failed to read directory contents at {}", config.bin_dir.display()))?;
	for entry in entries {
		let entry = entry.context("failed to read directory entry")?;
		let metadata = entry.metadata().context("failed to stat directory entry")?;
		if metadata.is_file() && metadata.permissions().mode() & 0o111 != 0 {
			println!(" {}", entry.file_name().to_string_lossy());
		}
	}

	Ok(())
}
