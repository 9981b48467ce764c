//! `pinfo [OPTIONS] <NAME>` — show information about the process named `<NAME>`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use nix::unistd::{getpid, getppid, Pid};
use pmgr::bus::Bus;
use pmgr::config::Config;
use pmgr::helpers;

#[derive(Parser, Debug)]
#[command(name = "pinfo", about = "Show information about process with name <NAME>.")]
struct Args {
	/// Name of the process to look up.
	name: String,
	/// Use this pid as the supervisor's pid instead of this process's OS parent.
	#[arg(short = 'm', long = "pid-pmanager")]
	pid_pmanager: Option<i32>,
	/// Print only the pid of the process.
	#[arg(short = 'p', long = "pid-only")]
	pid_only: bool,
}

fn main() -> Result<()> {
	pmgr::logging::init();

	let args = Args::parse();
	let config = Config::from_env();
	let bus = Bus::open(&config.fifo_path, config.fifo_mode).context("failed to open FIFO")?;
	let pid_pmanager = args.pid_pmanager.map(Pid::from_raw).unwrap_or_else(getppid);

	match helpers::request_info(&bus, pid_pmanager, getpid(), &args.name)? {
		None => bail!("process not found"),
		Some(node) => {
			if args.pid_only {
				println!("{}", node.pid);
			} else {
				println!("Name : {}\nPID  : {}\nPPID : {}", node.name, node.pid, node.ppid);
			}
		}
	}

	Ok(())
}
