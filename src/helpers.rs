//! Shared request/response patterns used by the short-lived command binaries
//! (`pnew`, `pinfo`, `pclose`, `plist`, `ptree`, `prmall`).

use crate::bus::Bus;
use crate::error::ProtocolError;
use crate::message::{Kind, Message};
use crate::tree::Node;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// Ask the supervisor for the node named `name`. `Ok(None)` means it doesn't exist;
/// any other failure means the supervisor itself errored or the bus broke.
pub fn request_info(bus: &Bus, supervisor: Pid, my_pid: Pid, name: &str) -> Result<Option<Node>, ProtocolError> {
	bus.send(supervisor, &Message::new(my_pid, Kind::Info, Some(name.to_owned())))?;
	let reply = bus.wait(Some(supervisor))?;
	match reply.kind {
		Kind::Info => {
			let payload = reply.payload.unwrap_or_default();
			Ok(Some(Node::from_str(&payload)?))
		}
		Kind::Err => Ok(None),
		other => Err(ProtocolError::UnexpectedReply {
			expected: "INFO or ERR",
			got: other,
		}),
	}
}

/// Drive a full LIST exchange to completion, acknowledging each INFO frame and
/// collecting the stream into a pre-order `Vec<Node>`.
pub fn collect_list(bus: &Bus, supervisor: Pid, my_pid: Pid, name: &str) -> Result<Vec<Node>, ProtocolError> {
	bus.send(supervisor, &Message::new(my_pid, Kind::List, Some(name.to_owned())))?;
	let mut nodes = Vec::new();
	loop {
		let reply = bus.wait(Some(supervisor))?;
		match reply.kind {
			Kind::Info => {
				let payload = reply.payload.unwrap_or_default();
				nodes.push(Node::from_str(&payload)?);
				bus.reply_ok(supervisor, my_pid, None)?;
			}
			Kind::Ok => break,
			Kind::Err => {
				return Err(ProtocolError::Remote(
					reply.payload.unwrap_or_else(|| "process not found".to_owned()),
				))
			}
			other => {
				return Err(ProtocolError::UnexpectedReply {
					expected: "INFO or OK",
					got: other,
				})
			}
		}
	}
	Ok(nodes)
}

/// Fold a pre-order stream of flat `Node`s (as produced by [`collect_list`]) into a
/// single local tree, the way `ptree`/`prmall` rebuild hierarchy from a flat LIST.
pub fn tree_from_list(nodes: Vec<Node>) -> Option<Node> {
	let mut nodes = nodes.into_iter();
	let mut root = nodes.next()?;
	for node in nodes {
		// Root-of-the-snapshot is always first (pre-order), so every later node's
		// parent has already been added.
		let _ = root.add(&node);
	}
	Some(root)
}

/// Send `SIGTERM` to `pid` and wait for its own termination protocol to answer.
/// The target's `terminate_self` is responsible for replying OK/ERR on the bus.
pub fn terminate_and_wait(bus: &Bus, pid: Pid) -> Result<(), ProtocolError> {
	signal::kill(pid, Signal::SIGTERM).map_err(|_| crate::error::BusError::Nudge(pid))?;
	let _ = bus.wait(Some(pid))?;
	Ok(())
}

/// Send `SIGTERM` to every process in `node`'s subtree, children before parent, so
/// the leaf-only-removal invariant is never violated. `skip` (the supervisor's own
/// pid) is never signalled.
pub fn terminate_tree(bus: &Bus, node: &Node, skip: Pid) -> Result<(), ProtocolError> {
	for child in &node.children {
		terminate_tree(bus, child, skip)?;
	}
	if node.pid != skip {
		println!("Sending SIGTERM to {}...", node.pid);
		terminate_and_wait(bus, node.pid)?;
	}
	Ok(())
}
