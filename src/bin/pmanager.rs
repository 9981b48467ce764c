//! `pmanager [SCRIPT]` — the supervisor. With no argument, reads commands from
//! standard input with a `> ` prompt; with one argument, executes that file.

use anyhow::{Context, Result};
use clap::Parser;
use pmgr::config::Config;
use pmgr::supervisor::Supervisor;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pmanager", about = "Execute commands from standard input or a file.")]
struct Args {
	/// File to read commands from; standard input is used if omitted.
	script: Option<PathBuf>,
}

fn main() -> Result<()> {
	pmgr::logging::init();

	let args = Args::parse();
	let mut supervisor = Supervisor::start(Config::from_env()).context("failed to start supervisor")?;

	match args.script {
		None => supervisor.run(BufReader::new(io::stdin()), true)?,
		Some(path) => {
			let file = File::open(&path).with_context(|| format!("cannot open \"{}\" for reading", path.display()))?;
			supervisor.run(BufReader::new(file), false)?;
		}
	}

	Ok(())
}
