//! `plist` — list all processes started by the shell.

use anyhow::{Context, Result};
use clap::Parser;
use nix::unistd::{getpid, getppid};
use pmgr::bus::Bus;
use pmgr::config::Config;
use pmgr::helpers;

#[derive(Parser, Debug)]
#[command(name = "plist", about = "List all processes started by the shell.")]
struct Args {}

fn main() -> Result<()> {
	pmgr::logging::init();

	let _args = Args::parse();
	let config = Config::from_env();
	let bus = Bus::open(&config.fifo_path, config.fifo_mode).context("failed to open FIFO")?;

	let nodes = helpers::collect_list(&bus, getppid(), getpid(), "pmanager")?;

	println!("{:<6} {:<6} {:<20}\n", "PID", "PPID", "NAME");
	for node in &nodes {
		println!("{:<6} {:<6} {:<20}", node.pid, node.ppid, node.name);
	}

	Ok(())
}
