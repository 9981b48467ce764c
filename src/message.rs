//! Bus frame encoding: `"<sender_pid>:<kind>:<payload>\0"`.

use crate::error::BusError;
use nix::unistd::Pid;
use std::fmt;

/// The literal payload string used when a message carries no content.
const NULL_PAYLOAD: &str = "NULL";

/// One of the seven message kinds that can travel over the bus.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Kind {
	/// Register a new node with the supervisor.
	Add,
	/// Deregister the sender's own node.
	Remove,
	/// Request information about a node by name.
	Info,
	/// A request failed; payload is a human-readable reason.
	Err,
	/// A request succeeded; payload is the requested content, or absent.
	Ok,
	/// Request a streamed enumeration of a subtree.
	List,
	/// Ask a child agent to fork a clone of itself.
	Spawn,
}

impl Kind {
	/// The single-character wire code for this kind.
	pub fn code(self) -> char {
		match self {
			Kind::Add => 'a',
			Kind::Remove => 'r',
			Kind::Info => 'i',
			Kind::Err => 'e',
			Kind::Ok => 's',
			Kind::List => 'l',
			Kind::Spawn => 'p',
		}
	}

	/// Parse a single-character wire code back into a `Kind`.
	pub fn from_code(code: &str) -> Option<Self> {
		match code {
			"a" => Some(Kind::Add),
			"r" => Some(Kind::Remove),
			"i" => Some(Kind::Info),
			"e" => Some(Kind::Err),
			"s" => Some(Kind::Ok),
			"l" => Some(Kind::List),
			"p" => Some(Kind::Spawn),
			_ => None,
		}
	}
}

impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Kind::Add => "ADD",
			Kind::Remove => "REMOVE",
			Kind::Info => "INFO",
			Kind::Err => "ERR",
			Kind::Ok => "OK",
			Kind::List => "LIST",
			Kind::Spawn => "SPAWN",
		};
		f.write_str(name)
	}
}

/// A single message exchanged between processes over the bus.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
	/// The pid of the process that sent this message.
	pub sender_pid: Pid,
	/// The kind of this message.
	pub kind: Kind,
	/// The content of this message, or `None` for an empty payload.
	pub payload: Option<String>,
}

impl Message {
	/// Construct a new message.
	pub fn new(sender_pid: Pid, kind: Kind, payload: Option<String>) -> Self {
		Self {
			sender_pid,
			kind,
			payload,
		}
	}

	/// Encode this message as a `\0`-terminated frame, ready to be written to the bus.
	pub fn encode(&self) -> Result<Vec<u8>, BusError> {
		let payload = self.payload.as_deref().unwrap_or(NULL_PAYLOAD);
		if payload.contains(':') {
			return Err(BusError::Encode);
		}
		let mut frame = format!("{}:{}:{}", self.sender_pid, self.kind.code(), payload).into_bytes();
		frame.push(0);
		Ok(frame)
	}

	/// Parse a frame (without its trailing `\0`) into a `Message`.
	pub fn decode(frame: &[u8]) -> Result<Self, BusError> {
		let text = std::str::from_utf8(frame).map_err(|_| BusError::Malformed)?;
		let mut fields = text.splitn(3, ':');
		let (pid, kind, payload) = match (fields.next(), fields.next(), fields.next()) {
			(Some(pid), Some(kind), Some(payload)) => (pid, kind, payload),
			_ => return Err(BusError::Malformed),
		};
		let sender_pid = pid
			.parse::<i32>()
			.map(Pid::from_raw)
			.map_err(|_| BusError::Malformed)?;
		let kind = Kind::from_code(kind).ok_or(BusError::Malformed)?;
		let payload = if payload == NULL_PAYLOAD {
			None
		} else {
			Some(payload.to_owned())
		};
		Ok(Self {
			sender_pid,
			kind,
			payload,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_with_payload() {
		let msg = Message::new(Pid::from_raw(42), Kind::Info, Some("alpha".to_owned()));
		let frame = msg.encode().unwrap();
		assert_eq!(&frame, b"42:i:alpha\0");
		let decoded = Message::decode(&frame[..frame.len() - 1]).unwrap();
		assert_eq!(decoded, msg);
	}

	#[test]
	fn round_trips_without_payload() {
		let msg = Message::new(Pid::from_raw(7), Kind::Ok, None);
		let frame = msg.encode().unwrap();
		assert_eq!(&frame, b"7:s:NULL\0");
		let decoded = Message::decode(&frame[..frame.len() - 1]).unwrap();
		assert_eq!(decoded, msg);
	}

	#[test]
	fn rejects_payload_with_colon() {
		let msg = Message::new(Pid::from_raw(1), Kind::Err, Some("bad:payload".to_owned()));
		assert!(matches!(msg.encode(), Err(BusError::Encode)));
	}

	#[test]
	fn rejects_malformed_frame() {
		assert!(matches!(
			Message::decode(b"not-a-frame"),
			Err(BusError::Malformed)
		));
		assert!(matches!(Message::decode(b"1:z:x"), Err(BusError::Malformed)));
		assert!(matches!(Message::decode(b"nope:i:x"), Err(BusError::Malformed)));
	}
}
