//! `ptree` — show a tree of processes started by the shell.

use anyhow::{bail, Context, Result};
use clap::Parser;
use nix::unistd::{getpid, getppid};
use pmgr::bus::Bus;
use pmgr::config::Config;
use pmgr::helpers;

#[derive(Parser, Debug)]
#[command(name = "ptree", about = "Show a tree or processes started by the shell.")]
struct Args {}

fn main() -> Result<()> {
	pmgr::logging::init();

	let _args = Args::parse();
	let config = Config::from_env();
	let bus = Bus::open(&config.fifo_path, config.fifo_mode).context("failed to open FIFO")?;

	let nodes = helpers::collect_list(&bus, getppid(), getpid(), "pmanager")?;
	match helpers::tree_from_list(nodes) {
		Some(root) => print!("{}", root.print_tree()),
		None => bail!("process not found"),
	}

	Ok(())
}
