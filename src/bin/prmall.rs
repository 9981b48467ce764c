//! `prmall <NAME>` — close the process named `<NAME>`, including its children.

use anyhow::{bail, Context, Result};
use clap::Parser;
use nix::unistd::{getpid, getppid};
use pmgr::bus::Bus;
use pmgr::config::Config;
use pmgr::helpers;

#[derive(Parser, Debug)]
#[command(name = "prmall", about = "Close process with name <NAME>, including its children.")]
struct Args {
	/// Name of the subtree's root process.
	name: String,
}

fn main() -> Result<()> {
	pmgr::logging::init();

	let args = Args::parse();
	let config = Config::from_env();
	let bus = Bus::open(&config.fifo_path, config.fifo_mode).context("failed to open FIFO")?;
	let pid_pmanager = getppid();

	let nodes = helpers::collect_list(&bus, pid_pmanager, getpid(), &args.name)?;
	let root = match helpers::tree_from_list(nodes) {
		Some(root) => root,
		None => bail!("process not found"),
	};

	helpers::terminate_tree(&bus, &root, pid_pmanager)?;

	Ok(())
}
