//! Typed error hierarchy for the bus, tree and protocol layers.

use crate::message::Kind;
use thiserror::Error;

/// Failures arising from the shared message bus: opening/creating the FIFO,
/// installing signal handlers, encoding/writing a frame, or nudging a peer.
#[derive(Error, Debug)]
pub enum BusError {
	/// Creating or opening the FIFO failed.
	#[error("failed to open FIFO: {0}")]
	Open(#[source] nix::Error),
	/// Installing the nudge-signal handler failed.
	#[error("failed to set up process communication: {0}")]
	SignalSetup(#[source] nix::Error),
	/// A frame could not be encoded (e.g. a payload containing the `:` delimiter).
	#[error("failed to encode message")]
	Encode,
	/// Writing the frame to the pipe failed.
	#[error("failed to write message: {0}")]
	Write(#[source] nix::Error),
	/// Signalling the receiver that a frame is waiting failed.
	#[error("failed to nudge {0}")]
	Nudge(nix::unistd::Pid),
	/// A frame was read but did not parse as `<pid>:<kind>:<payload>`.
	#[error("malformed frame on bus")]
	Malformed,
}

/// Failures arising from mutating or querying the process tree.
#[derive(Error, Debug)]
pub enum TreeError {
	/// `add` found no node whose pid matches the new node's `ppid`.
	#[error("no parent process found for ppid {0}")]
	NoSuchParent(nix::unistd::Pid),
	/// `remove` or a lookup found no node with the given pid/name.
	#[error("process not found")]
	NotFound,
	/// `remove` was attempted on a node that still has children.
	#[error("failed to remove process from tree")]
	NotLeaf,
	/// `from_str` was given a string that didn't parse as `<pid>;<ppid>;<name>`.
	#[error("failed to parse process string")]
	Parse,
	/// `add` rejected a node whose name collides with an existing live name.
	#[error("a process with name \"{0}\" already exists")]
	DuplicateName(String),
}

/// Failures in the request/response protocol layered over the bus.
#[derive(Error, Debug)]
pub enum ProtocolError {
	/// The bus itself failed.
	#[error(transparent)]
	Bus(#[from] BusError),
	/// The tree rejected an operation.
	#[error(transparent)]
	Tree(#[from] TreeError),
	/// A reply of a different kind than expected was received.
	#[error("unexpected reply: expected {expected}, got {got:?}")]
	UnexpectedReply {
		/// Human-readable name of the kind that was expected.
		expected: &'static str,
		/// The kind that was actually received.
		got: Kind,
	},
	/// The peer replied with ERR and a human-readable payload.
	#[error("{0}")]
	Remote(String),
	/// A name was rejected before any message was even sent (e.g. contains `:` or `;`).
	#[error("invalid process name \"{0}\": must not contain ':' or ';'")]
	InvalidName(String),
}
