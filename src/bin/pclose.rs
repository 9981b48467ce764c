//! `pclose <NAME>` — close the process named `<NAME>`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use nix::unistd::getppid;
use pmgr::bus::Bus;
use pmgr::config::Config;
use pmgr::helpers;
use std::process::Command;

#[derive(Parser, Debug)]
#[command(name = "pclose", about = "Close process with name <NAME>.")]
struct Args {
	/// Name of the process to close.
	name: String,
}

fn main() -> Result<()> {
	pmgr::logging::init();

	let args = Args::parse();
	let config = Config::from_env();
	let bus = Bus::open(&config.fifo_path, config.fifo_mode).context("failed to open FIFO")?;

	// Shell out to `pinfo` rather than querying the bus directly: it's the single
	// source of truth for "does this name exist and what's its pid".
	let output = Command::new("pinfo")
		.arg("--pid-pmanager")
		.arg(getppid().to_string())
		.arg("--pid-only")
		.arg(&args.name)
		.output()
		.context("failed to obtain information about process")?;
	if !output.status.success() {
		bail!("process not found");
	}
	let pid_str = String::from_utf8_lossy(&output.stdout);
	let pid: i32 = pid_str
		.trim()
		.parse()
		.context("failed to obtain information about process")?;
	let pid = nix::unistd::Pid::from_raw(pid);

	println!("Sending SIGTERM to {pid}...");
	helpers::terminate_and_wait(&bus, pid).context("failed to send SIGTERM")?;

	Ok(())
}
