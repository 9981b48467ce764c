//! The shared FIFO message bus and its nudge-signal inbox.
//!
//! One named pipe is opened by every process taking part in the tree. Sending a
//! message means writing a frame to the pipe and then signalling the recipient so it
//! knows to go read it; waiting for a message means blocking on that signal rather
//! than polling the pipe.

use crate::error::BusError;
use crate::message::{Kind, Message};
use nix::fcntl::{open, OFlag};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{mkfifo, Pid};
use std::os::unix::io::RawFd;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// The signal used to nudge a peer that a frame is waiting for it on the bus.
const NUDGE_SIGNAL: Signal = Signal::SIGUSR1;

/// Set by the nudge handler; cleared once a frame addressed to the waiter is read.
static UNREAD: AtomicBool = AtomicBool::new(false);
/// The pid of whoever last raised the nudge signal, or -1 if none is pending.
static SENDER: AtomicI32 = AtomicI32::new(-1);

extern "C" fn on_nudge(_signum: libc::c_int, info: *mut libc::siginfo_t, _ctx: *mut libc::c_void) {
	// Signal-safe: atomic stores only, no allocation, no locking.
	let sender = unsafe { (*info).si_pid() };
	SENDER.store(sender, Ordering::SeqCst);
	UNREAD.store(true, Ordering::SeqCst);
}

fn unread() -> bool {
	UNREAD.load(Ordering::SeqCst)
}

fn sender() -> Pid {
	Pid::from_raw(SENDER.load(Ordering::SeqCst))
}

fn clear_unread() {
	UNREAD.store(false, Ordering::SeqCst);
	SENDER.store(-1, Ordering::SeqCst);
}

/// A process's handle onto the shared bus: the FIFO fd, plus the installed nudge handler.
pub struct Bus {
	fd: RawFd,
}

impl Bus {
	/// Create the FIFO at `path` if it doesn't already exist, open it for read/write, and
	/// install the nudge-signal handler. Every process that joins the tree calls this once.
	pub fn open(path: &Path, mode: u32) -> Result<Self, BusError> {
		if !path.exists() {
			mkfifo(path, Mode::from_bits_truncate(mode)).map_err(BusError::Open)?;
		}
		let fd = open(path, OFlag::O_RDWR | OFlag::O_NONBLOCK, Mode::empty()).map_err(BusError::Open)?;
		install_nudge_handler()?;
		Ok(Self { fd })
	}

	/// Encode and write `message` to the bus, then nudge `to` so it knows to read it.
	pub fn send(&self, to: Pid, message: &Message) -> Result<(), BusError> {
		let frame = message.encode()?;
		let n = unsafe { libc::write(self.fd, frame.as_ptr() as *const libc::c_void, frame.len()) };
		if n < 0 {
			return Err(BusError::Write(nix::Error::last()));
		}
		signal::kill(to, NUDGE_SIGNAL).map_err(|_| BusError::Nudge(to))?;
		Ok(())
	}

	/// Read one `\0`-terminated frame from the bus, one byte at a time, and decode it.
	/// Blocks unless the fd was opened non-blocking.
	pub fn read_message(&self) -> Result<Message, BusError> {
		let mut buf = Vec::new();
		let mut byte: libc::c_char = 0;
		loop {
			let n = unsafe {
				libc::read(self.fd, &mut byte as *mut libc::c_char as *mut libc::c_void, 1)
			};
			if n <= 0 {
				return Err(BusError::Malformed);
			}
			if byte == 0 {
				break;
			}
			buf.push(byte as u8);
		}
		Message::decode(&buf)
	}

	/// Block until a nudge from `from` (or, if `from` is `None`, from anyone) has been
	/// recorded, then read and return the waiting frame. Mirrors the source's
	/// `sigsuspend`-based `message_wait`.
	pub fn wait(&self, from: Option<Pid>) -> Result<Message, BusError> {
		let empty = SigSet::empty();
		loop {
			if unread() && (from.is_none() || from == Some(sender())) {
				break;
			}
			empty.suspend().ok();
		}
		let message = self.read_message()?;
		clear_unread();
		Ok(message)
	}

	/// True if a nudge has been recorded and not yet consumed by [`Bus::wait`].
	pub fn has_unread(&self) -> bool {
		unread()
	}

	/// Read and discard the next frame without matching it against a sender. Used by the
	/// supervisor's LIST replies, which arrive out of band from whichever helper is waiting.
	pub fn read_any(&self) -> Result<Message, BusError> {
		let message = self.read_message()?;
		clear_unread();
		Ok(message)
	}

	/// Convenience: send an `OK` with an optional payload.
	pub fn reply_ok(&self, to: Pid, from: Pid, payload: Option<String>) -> Result<(), BusError> {
		self.send(to, &Message::new(from, Kind::Ok, payload))
	}

	/// Convenience: send an `ERR` with a human-readable reason.
	pub fn reply_err(&self, to: Pid, from: Pid, reason: impl Into<String>) -> Result<(), BusError> {
		self.send(to, &Message::new(from, Kind::Err, Some(reason.into())))
	}
}

impl Drop for Bus {
	fn drop(&mut self) {
		unsafe {
			libc::close(self.fd);
		}
	}
}

fn install_nudge_handler() -> Result<(), BusError> {
	let action = SigAction::new(
		SigHandler::SigAction(on_nudge),
		SaFlags::SA_SIGINFO,
		SigSet::empty(),
	);
	unsafe { signal::sigaction(NUDGE_SIGNAL, &action) }.map_err(BusError::SignalSetup)?;
	Ok(())
}

/// Resolve the pid that most recently nudged us, for handlers that want to reply to
/// whoever just woke them without going through [`Bus::wait`]'s matching.
pub fn last_sender() -> Option<Pid> {
	let raw = SENDER.load(Ordering::SeqCst);
	if raw < 0 {
		None
	} else {
		Some(Pid::from_raw(raw))
	}
}

/// Block the calling thread until a signal arrives, without consuming it as a bus message.
/// Used by the supervisor's idle loop, which also wants to wake on `SIGCHLD`.
pub fn suspend_until_signalled() {
	SigSet::empty().suspend().ok();
}
