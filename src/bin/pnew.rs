//! `pnew <NAME>` — start a new named process.

use anyhow::{bail, Context, Result};
use clap::Parser;
use nix::sys::signal::{self, Signal};
use nix::unistd::getppid;
use pmgr::agent::ChildAgent;
use pmgr::bus::Bus;
use pmgr::config::Config;
use pmgr::fork::{self, ForkResult};
use pmgr::helpers;
use pmgr::message::{Kind, Message};
use pmgr::tree::{self, Node};

#[derive(Parser, Debug)]
#[command(name = "pnew", about = "Start a new process with name <NAME>.")]
struct Args {
	/// Name for the new process; must be unique across the live tree.
	name: String,
}

fn main() -> Result<()> {
	pmgr::logging::init();

	let args = Args::parse();
	if !tree::validate_name(&args.name) {
		bail!("invalid process name \"{}\": must not contain ':' or ';'", args.name);
	}
	let config = Config::from_env();
	let bus = Bus::open(&config.fifo_path, config.fifo_mode).context("failed to open FIFO")?;
	let pid_pmanager = getppid();
	let my_pid = nix::unistd::getpid();

	if helpers::request_info(&bus, pid_pmanager, my_pid, &args.name)?.is_some() {
		bail!("a process with name \"{}\" already exists", args.name);
	}

	match fork::fork() {
		Err(()) => bail!("failed to fork process"),
		Ok(ForkResult::Child) => {
			ChildAgent::new(bus, pid_pmanager, args.name)
				.context("failed to set up child process")?
				.run();
		}
		Ok(ForkResult::Parent(child)) => {
			// The node's logical parent is pmanager, not pnew itself — pnew is a
			// launcher that exits immediately after registration, while the tree
			// mirrors the shell's intended ownership, not pnew's transient OS parentage.
			let node = Node::new(child.pid, pid_pmanager, args.name.clone());
			bus.send(pid_pmanager, &Message::new(my_pid, Kind::Add, Some(node.to_str())))?;
			let result = bus.wait(Some(pid_pmanager))?;
			if result.kind != Kind::Ok {
				eprintln!(
					"Error: failed to add process in pmanager. Sending SIGTERM to {}...",
					child.pid
				);
				let _ = signal::kill(child.pid, Signal::SIGTERM);
				let _ = bus.wait(Some(child.pid));
				bail!("failed to start process \"{}\"", args.name);
			}
			println!("Process \"{}\" successfully started.", args.name);
		}
	}

	Ok(())
}
