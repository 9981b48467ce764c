//! The supervisor: owns the process tree, dispatches bus messages, runs the
//! read-eval command loop, and tears the fleet down on exit.

use crate::bus::Bus;
use crate::config::Config;
use crate::error::BusError;
use crate::fork::{self, ForkResult};
use crate::message::{Kind, Message};
use crate::tree::Node;
use anyhow::{bail, Context, Result};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::wait::waitpid;
use nix::unistd::{getpid, getppid, Pid};
use std::io::{self, BufRead, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set by the `SIGTERM`/`SIGINT` handler; observed between commands and between
/// serviced bus messages, since a signal handler can't safely drive the shutdown
/// sequence itself (closing the bus, walking the tree) from within the handler.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_terminate_signal(_signum: libc::c_int) {
	SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// The root process: owns the bus, the tree, and the command dispatch loop.
pub struct Supervisor {
	bus: Bus,
	pid: Pid,
	root: Node,
	config: Config,
}

impl Supervisor {
	/// Create the FIFO, open the bus, build the root tree node, and install the
	/// terminate-signal handler. Call once per process.
	pub fn start(config: Config) -> Result<Self> {
		// Every helper and child-agent binary is exec'd by bare name; this makes that
		// resolve without each of them separately knowing the configured bin dir.
		std::env::set_var("PATH", &config.bin_dir);
		let pid = getpid();
		let bus = Bus::open(&config.fifo_path, config.fifo_mode)
			.context("failed to set up process communication")?;
		install_terminate_handler().context("failed to set signal handlers")?;
		let root = Node::new(pid, getppid(), "pmanager");
		tracing::info!(pid = pid.as_raw(), "supervisor started");
		Ok(Self {
			bus,
			pid,
			root,
			config,
		})
	}

	/// Run the read-eval loop against `input` until EOF, `quit`, or a terminate
	/// signal. `interactive` controls whether a prompt and banner are printed.
	pub fn run(&mut self, mut input: impl BufRead, interactive: bool) -> Result<()> {
		if interactive {
			println!("Welcome to CustomShell!\n");
			println!("Type \"phelp\" for information.");
		}
		let mut line = String::new();
		loop {
			if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
				break;
			}
			if interactive {
				print!("> ");
				io::stdout().flush().ok();
			}
			line.clear();
			let bytes_read = input.read_line(&mut line).context("reading command")?;
			if bytes_read == 0 {
				break;
			}
			let tokens: Vec<&str> = line.split_whitespace().collect();
			if tokens.is_empty() {
				continue;
			}
			if tokens[0] == "quit" {
				break;
			}
			match self.exec_command(tokens[0], &tokens) {
				Ok(()) => {}
				Err(err) => eprintln!("Error: {err}"),
			}
		}
		self.shutdown();
		Ok(())
	}

	/// Fork and exec `command` with `argv`, servicing bus traffic until it exits.
	fn exec_command(&mut self, command: &str, argv: &[&str]) -> Result<()> {
		let path = self.config.bin_dir.join(command);
		if !is_executable(&path) {
			bail!("command not found");
		}
		match fork::fork() {
			Err(()) => bail!("failed to fork process"),
			Ok(ForkResult::Child) => {
				let err = Command::new(&path).args(&argv[1..]).exec();
				eprintln!("Error: failed to exec program: {err}");
				std::process::exit(1);
			}
			Ok(ForkResult::Parent(child)) => {
				loop {
					if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
						let _ = child.signal(Signal::SIGTERM);
						let _ = waitpid(child.pid, None);
						break;
					}
					if self.bus.has_unread() {
						match self.bus.read_any() {
							Ok(msg) => self.handle(msg),
							Err(err) => tracing::error!(%err, "failed to read bus message"),
						}
					}
					if child.try_wait()?.is_some() {
						break;
					}
				}
				Ok(())
			}
		}
	}

	/// Dispatch one bus message to its handler, logging (but not propagating) any
	/// failure to reply — a reply failure is never fatal to the supervisor loop.
	fn handle(&mut self, msg: Message) {
		tracing::trace!(sender = msg.sender_pid.as_raw(), kind = %msg.kind, "received bus frame");
		let result = match msg.kind {
			Kind::Add => self.handle_add(&msg),
			Kind::Info => self.handle_info(&msg),
			Kind::Remove => self.handle_remove(&msg),
			Kind::List => self.handle_list(&msg),
			other => {
				tracing::warn!(?other, "unrecognized message type");
				self.bus
					.reply_err(msg.sender_pid, self.pid, "unrecognized message type")
			}
		};
		if let Err(err) = result {
			tracing::error!(%err, "failed to send reply");
		}
	}

	fn handle_add(&mut self, msg: &Message) -> Result<(), BusError> {
		let payload = msg.payload.as_deref().unwrap_or_default();
		let parsed = Node::from_str(payload);
		let added = parsed.and_then(|node| self.root.add(&node).map(|()| node));
		match added {
			Ok(node) => {
				tracing::debug!(name = %node.name, pid = node.pid.as_raw(), "added process to tree");
				self.bus.reply_ok(msg.sender_pid, self.pid, None)
			}
			Err(err) => {
				tracing::warn!(%err, "failed to add process to tree");
				self.bus.send(msg.sender_pid, &Message::new(self.pid, Kind::Err, None))
			}
		}
	}

	fn handle_info(&mut self, msg: &Message) -> Result<(), BusError> {
		let name = msg.payload.as_deref().unwrap_or_default();
		match self.root.find_by_name(name) {
			Some(node) => {
				self.bus
					.send(msg.sender_pid, &Message::new(self.pid, Kind::Info, Some(node.to_str())))
			}
			None => self.bus.reply_err(msg.sender_pid, self.pid, "process not found"),
		}
	}

	fn handle_remove(&mut self, msg: &Message) -> Result<(), BusError> {
		// The message sender is assumed to be the process requesting its own removal.
		match self.root.remove(msg.sender_pid) {
			Ok(()) => {
				tracing::info!(pid = msg.sender_pid.as_raw(), "process removed from tree");
				self.bus.reply_ok(msg.sender_pid, self.pid, None)
			}
			Err(err) => {
				tracing::warn!(%err, "failed to remove process from tree; maybe it has children?");
				self.bus
					.reply_err(msg.sender_pid, self.pid, "failed to remove process from tree")
			}
		}
	}

	fn handle_list(&mut self, msg: &Message) -> Result<(), BusError> {
		let name = msg.payload.as_deref().unwrap_or_default();
		let nodes = match self.root.find_by_name(name) {
			Some(start) => start.enumerate(),
			None => return self.bus.reply_err(msg.sender_pid, self.pid, "process not found"),
		};
		tracing::debug!(count = nodes.len(), "starting LIST stream");
		for node in &nodes {
			self.bus
				.send(msg.sender_pid, &Message::new(self.pid, Kind::Info, Some(node.to_str())))?;
			// Wait for the caller's acknowledgement before sending the next frame.
			self.bus.wait(Some(msg.sender_pid))?;
		}
		self.bus.reply_ok(msg.sender_pid, self.pid, None)
	}

	/// Kill every remaining process bottom-up, then tear down the bus.
	fn shutdown(&mut self) {
		tracing::info!("shutting down, killing remaining processes...");
		println!("Killing remaining processes...");
		if let Err(err) = self.exec_command("prmall", &["prmall", "pmanager"]) {
			eprintln!("Failed to kill remaining processes: {err}");
		}
		println!("Exiting...");
	}
}

fn install_terminate_handler() -> nix::Result<()> {
	let action = SigAction::new(
		SigHandler::Handler(on_terminate_signal),
		SaFlags::empty(),
		SigSet::empty(),
	);
	unsafe {
		signal::sigaction(Signal::SIGTERM, &action)?;
		signal::sigaction(Signal::SIGINT, &action)?;
	}
	Ok(())
}

fn is_executable(path: &Path) -> bool {
	std::fs::metadata(path)
		.map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
		.unwrap_or(false)
}
