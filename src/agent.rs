//! The child agent: the idle loop run by every user-started process.
//!
//! Idles on signals; the only request it answers is SPAWN (fork a clone of itself);
//! a terminate signal drives its own deregistration-then-exit protocol. Its own
//! forked clones are reaped with a `SIGCHLD` handler independent of the logical tree.

use crate::bus::Bus;
use crate::error::ProtocolError;
use crate::fork::{self, ForkResult};
use crate::message::{Kind, Message};
use crate::tree::Node;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::{getpid, Pid};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

static SIGTERM_FLAG: AtomicBool = AtomicBool::new(false);
static SIGTERM_SENDER: AtomicI32 = AtomicI32::new(-1);

extern "C" fn on_sigterm(_signum: libc::c_int, info: *mut libc::siginfo_t, _ctx: *mut libc::c_void) {
	let sender = unsafe { (*info).si_pid() };
	SIGTERM_SENDER.store(sender, Ordering::SeqCst);
	SIGTERM_FLAG.store(true, Ordering::SeqCst);
}

extern "C" fn on_sigchld(_signum: libc::c_int) {
	unsafe {
		libc::wait(std::ptr::null_mut());
	}
}

/// Per-process state for a user-started process.
pub struct ChildAgent {
	bus: Bus,
	pid: Pid,
	supervisor: Pid,
	name: String,
	clone_count: u32,
}

impl ChildAgent {
	/// Adopt `name`, remember the supervisor's pid, and install the `SIGTERM`/`SIGCHLD`
	/// handlers. Call once per process, before entering [`ChildAgent::run`].
	pub fn new(bus: Bus, supervisor: Pid, name: impl Into<String>) -> nix::Result<Self> {
		install_signal_handlers()?;
		Ok(Self {
			bus,
			pid: getpid(),
			supervisor,
			name: name.into(),
			clone_count: 0,
		})
	}

	/// The name this process currently answers to (changes across a clone).
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Suspend until a signal arrives, handle it, and repeat. Only returns by calling
	/// `std::process::exit` from within a successful termination.
	pub fn run(&mut self) -> ! {
		loop {
			crate::bus::suspend_until_signalled();
			if SIGTERM_FLAG.load(Ordering::SeqCst) {
				self.terminate_self();
			}
			if self.bus.has_unread() {
				match self.bus.read_any() {
					Ok(msg) if msg.kind == Kind::Spawn => self.spawn(msg.sender_pid),
					Ok(_) => {}
					Err(err) => tracing::error!(%err, "failed to read bus message"),
				}
			}
		}
	}

	/// Handle a SPAWN request: probe for a free clone name, fork, and register the
	/// newborn with the supervisor. `caller` is released (sent OK) last, regardless
	/// of outcome, so it never blocks indefinitely on a failed clonation.
	fn spawn(&mut self, caller: Pid) {
		tracing::info!(name = %self.name, "clonation request received");
		let candidate = format!("{}_{}", self.name, self.clone_count + 1);

		match self.probe_duplicate(&candidate) {
			Ok(true) => {
				tracing::warn!(name = %candidate, "a process with this name already exists, clonation aborted");
				let _ = self.bus.reply_ok(caller, self.pid, None);
				return;
			}
			Ok(false) => {}
			Err(err) => {
				tracing::error!(%err, "unable to check for duplicates, clonation aborted");
				let _ = self.bus.reply_ok(caller, self.pid, None);
				return;
			}
		}

		match fork::fork() {
			Err(()) => {
				tracing::error!(name = %self.name, "failed to fork");
				let _ = self.bus.reply_ok(caller, self.pid, None);
			}
			Ok(ForkResult::Child) => {
				// We're the clone: reset the clone count and adopt the new name, then
				// fall back into the idle loop under the new identity.
				self.clone_count = 0;
				self.name = candidate;
			}
			Ok(ForkResult::Parent(child)) => {
				let node = Node::new(child.pid, self.pid, candidate.clone());
				match self.register_with_supervisor(&node) {
					Ok(()) => {
						self.clone_count += 1;
						tracing::info!(name = %candidate, "process successfully created");
					}
					Err(err) => {
						tracing::error!(%err, "failed to register clone, killing it");
						let _ = child.signal(Signal::SIGTERM);
					}
				}
				let _ = self.bus.reply_ok(caller, self.pid, None);
			}
		}
	}

	fn probe_duplicate(&self, candidate: &str) -> Result<bool, ProtocolError> {
		self.bus
			.send(self.supervisor, &Message::new(self.pid, Kind::Info, Some(candidate.to_owned())))?;
		let reply = self.bus.wait(Some(self.supervisor))?;
		Ok(reply.kind == Kind::Info)
	}

	fn register_with_supervisor(&self, node: &Node) -> Result<(), ProtocolError> {
		self.bus
			.send(self.supervisor, &Message::new(self.pid, Kind::Add, Some(node.to_str())))?;
		let reply = self.bus.wait(Some(self.supervisor))?;
		if reply.kind == Kind::Ok {
			Ok(())
		} else {
			Err(ProtocolError::UnexpectedReply {
				expected: "OK",
				got: reply.kind,
			})
		}
	}

	/// Ask the supervisor to deregister this process, then either exit (success) or
	/// reset and keep running (failure — this node still has children). Whoever sent
	/// the terminate signal is always released last, regardless of outcome.
	fn terminate_self(&mut self) {
		let sender = Pid::from_raw(SIGTERM_SENDER.load(Ordering::SeqCst));

		if let Err(err) = self.bus.send(self.supervisor, &Message::new(self.pid, Kind::Remove, None)) {
			tracing::error!(%err, "failed to send message");
			let _ = self.bus.reply_ok(sender, self.pid, None);
			SIGTERM_FLAG.store(false, Ordering::SeqCst);
			return;
		}

		let response = match self.bus.wait(Some(self.supervisor)) {
			Ok(msg) => msg,
			Err(err) => {
				tracing::error!(%err, "failed to read response");
				let _ = self.bus.reply_ok(sender, self.pid, None);
				SIGTERM_FLAG.store(false, Ordering::SeqCst);
				return;
			}
		};

		let success = match response.kind {
			Kind::Ok => {
				println!("{}: Killing myself...", self.name);
				true
			}
			Kind::Err => {
				tracing::warn!(name = %self.name, "failed to kill myself, maybe I have children?");
				false
			}
			other => {
				tracing::warn!(?other, "unexpected message");
				false
			}
		};

		let _ = self.bus.reply_ok(sender, self.pid, None);

		if success {
			std::process::exit(0);
		}
		SIGTERM_FLAG.store(false, Ordering::SeqCst);
	}
}

fn install_signal_handlers() -> nix::Result<()> {
	let chld_action = SigAction::new(SigHandler::Handler(on_sigchld), SaFlags::empty(), SigSet::empty());
	let term_action = SigAction::new(
		SigHandler::SigAction(on_sigterm),
		SaFlags::SA_SIGINFO,
		SigSet::empty(),
	);
	unsafe {
		signal::sigaction(Signal::SIGCHLD, &chld_action)?;
		signal::sigaction(Signal::SIGTERM, &term_action)?;
	}
	Ok(())
}
