//! A thin `fork()` wrapper used to spawn child agents and command helpers.
//!
//! Trimmed down from a polyfill that also handled FreeBSD process descriptors and
//! orphan/double-fork detection: this tree never runs on FreeBSD and every forked
//! process is meant to stay a direct child of its forker, tracked in the tree.

use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// A handle to a just-forked child process.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ChildHandle {
	/// The child's pid.
	pub pid: Pid,
}

impl ChildHandle {
	/// Send `sig` to the child.
	pub fn signal(&self, sig: Signal) -> nix::Result<()> {
		signal::kill(self.pid, sig)
	}

	/// Non-blocking reap: `Ok(None)` if the child is still alive, `Ok(Some(_))` once it
	/// has exited or been killed.
	pub fn try_wait(&self) -> nix::Result<Option<WaitStatus>> {
		match waitpid(self.pid, Some(WaitPidFlag::WNOHANG))? {
			WaitStatus::StillAlive => Ok(None),
			status => Ok(Some(status)),
		}
	}
}

/// Outcome of [`fork`].
#[derive(Debug)]
pub enum ForkResult {
	/// Returned in the parent, with a handle to the new child.
	Parent(ChildHandle),
	/// Returned in the child.
	Child,
}

/// Fork the calling process.
pub fn fork() -> Result<ForkResult, ()> {
	let pid = unsafe { libc::fork() };
	if pid < 0 {
		Err(())
	} else if pid > 0 {
		Ok(ForkResult::Parent(ChildHandle {
			pid: Pid::from_raw(pid),
		}))
	} else {
		Ok(ForkResult::Child)
	}
}
