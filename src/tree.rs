//! The in-memory process tree owned exclusively by the supervisor.

use crate::error::TreeError;
use nix::unistd::Pid;

/// A single process in the tree: its pid, its parent's pid, its unique name,
/// and the subtree of processes it owns.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
	/// The process id of this node.
	pub pid: Pid,
	/// The process id of this node's parent.
	pub ppid: Pid,
	/// The name of this node, unique across the live tree.
	pub name: String,
	/// The children of this node, in insertion order.
	pub children: Vec<Node>,
}

impl Node {
	/// Allocate a new, childless node.
	pub fn new(pid: Pid, ppid: Pid, name: impl Into<String>) -> Self {
		Self {
			pid,
			ppid,
			name: name.into(),
			children: Vec::new(),
		}
	}

	/// Pre-order search for a node with the given pid.
	pub fn find_by_pid(&self, pid: Pid) -> Option<&Node> {
		if self.pid == pid {
			return Some(self);
		}
		self.children.iter().find_map(|child| child.find_by_pid(pid))
	}

	/// Pre-order search for a node with the given pid, returning a mutable reference.
	pub fn find_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Node> {
		if self.pid == pid {
			return Some(self);
		}
		self.children
			.iter_mut()
			.find_map(|child| child.find_by_pid_mut(pid))
	}

	/// Pre-order search for a node with the given name.
	pub fn find_by_name(&self, name: &str) -> Option<&Node> {
		if self.name == name {
			return Some(self);
		}
		self.children
			.iter()
			.find_map(|child| child.find_by_name(name))
	}

	/// Add `node` as a child of the existing node in this subtree whose pid
	/// equals `node.ppid`. Rejects a colliding name (closes the duplicate-name
	/// check race described in the design notes) or a missing parent.
	pub fn add(&mut self, node: &Node) -> Result<(), TreeError> {
		if self.find_by_name(&node.name).is_some() {
			return Err(TreeError::DuplicateName(node.name.clone()));
		}
		let ppid = node.ppid;
		let parent = self
			.find_by_pid_mut(ppid)
			.ok_or(TreeError::NoSuchParent(ppid))?;
		parent
			.children
			.push(Node::new(node.pid, node.ppid, node.name.clone()));
		Ok(())
	}

	/// Remove a *leaf* node with the given pid from this subtree.
	pub fn remove(&mut self, pid: Pid) -> Result<(), TreeError> {
		let (ppid, is_leaf) = {
			let node = self.find_by_pid(pid).ok_or(TreeError::NotFound)?;
			(node.ppid, node.children.is_empty())
		};
		if !is_leaf {
			return Err(TreeError::NotLeaf);
		}
		let parent = self.find_by_pid_mut(ppid).ok_or(TreeError::NotFound)?;
		let index = parent
			.children
			.iter()
			.position(|child| child.pid == pid)
			.ok_or(TreeError::NotFound)?;
		let _ = parent.children.remove(index);
		Ok(())
	}

	/// Pre-order snapshot of this subtree: copies, so callers can't mutate the live tree.
	pub fn enumerate(&self) -> Vec<Node> {
		let mut out = Vec::new();
		self.enumerate_into(&mut out);
		out
	}

	fn enumerate_into(&self, out: &mut Vec<Node>) {
		out.push(Node::new(self.pid, self.ppid, self.name.clone()));
		for child in &self.children {
			child.enumerate_into(out);
		}
	}

	/// Serialize as `<pid>;<ppid>;<name>`.
	pub fn to_str(&self) -> String {
		format!("{};{};{}", self.pid, self.ppid, self.name)
	}

	/// Parse the `<pid>;<ppid>;<name>` representation produced by [`Node::to_str`].
	pub fn from_str(s: &str) -> Result<Node, TreeError> {
		let mut fields = s.splitn(3, ';');
		match (fields.next(), fields.next(), fields.next()) {
			(Some(pid), Some(ppid), Some(name)) if !name.is_empty() => {
				let pid = pid.parse::<i32>().map(Pid::from_raw).map_err(|_| TreeError::Parse)?;
				let ppid = ppid
					.parse::<i32>()
					.map(Pid::from_raw)
					.map_err(|_| TreeError::Parse)?;
				Ok(Node::new(pid, ppid, name))
			}
			_ => Err(TreeError::Parse),
		}
	}

	/// Depth-indented rendering of this subtree's names (ASCII; glyphs are a UI concern).
	pub fn print_tree(&self) -> String {
		let mut out = String::new();
		self.print_tree_rec(&mut out, 0);
		out.push('\n');
		out
	}

	fn print_tree_rec(&self, out: &mut String, depth: usize) {
		for _ in 0..depth {
			out.push('\t');
		}
		if depth == 0 {
			out.push_str(&self.name);
		} else {
			out.push_str("`- ");
			out.push_str(&self.name);
		}
		for child in &self.children {
			out.push('\n');
			child.print_tree_rec(out, depth + 1);
		}
	}
}

/// A name must not contain the frame/payload delimiters, or parsing would be ambiguous.
pub fn validate_name(name: &str) -> bool {
	!name.is_empty() && !name.contains(':') && !name.contains(';')
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pid(n: i32) -> Pid {
		Pid::from_raw(n)
	}

	#[test]
	fn add_and_find() {
		let mut root = Node::new(pid(1), pid(0), "pmanager");
		root.add(&Node::new(pid(2), pid(1), "alpha")).unwrap();
		assert!(root.find_by_pid(pid(2)).is_some());
		assert!(root.find_by_name("alpha").is_some());
		assert!(root.find_by_name("missing").is_none());
	}

	#[test]
	fn add_rejects_duplicate_name() {
		let mut root = Node::new(pid(1), pid(0), "pmanager");
		root.add(&Node::new(pid(2), pid(1), "alpha")).unwrap();
		let err = root.add(&Node::new(pid(3), pid(1), "alpha")).unwrap_err();
		assert!(matches!(err, TreeError::DuplicateName(name) if name == "alpha"));
	}

	#[test]
	fn add_rejects_missing_parent() {
		let mut root = Node::new(pid(1), pid(0), "pmanager");
		let err = root.add(&Node::new(pid(2), pid(99), "alpha")).unwrap_err();
		assert!(matches!(err, TreeError::NoSuchParent(p) if p == pid(99)));
	}

	#[test]
	fn remove_requires_leaf() {
		let mut root = Node::new(pid(1), pid(0), "pmanager");
		root.add(&Node::new(pid(2), pid(1), "alpha")).unwrap();
		root.add(&Node::new(pid(3), pid(2), "alpha_1")).unwrap();
		assert!(matches!(root.remove(pid(2)), Err(TreeError::NotLeaf)));
		root.remove(pid(3)).unwrap();
		root.remove(pid(2)).unwrap();
		assert!(root.find_by_pid(pid(2)).is_none());
		assert!(root.children.is_empty());
	}

	#[test]
	fn remove_missing_fails() {
		let mut root = Node::new(pid(1), pid(0), "pmanager");
		assert!(matches!(root.remove(pid(42)), Err(TreeError::NotFound)));
	}

	#[test]
	fn to_str_from_str_round_trip() {
		let node = Node::new(pid(123), pid(1), "alpha");
		let encoded = node.to_str();
		assert_eq!(encoded, "123;1;alpha");
		let decoded = Node::from_str(&encoded).unwrap();
		assert_eq!(decoded, node);
	}

	#[test]
	fn from_str_rejects_malformed() {
		assert!(Node::from_str("not-enough-fields").is_err());
		assert!(Node::from_str("1;2;").is_err());
	}

	#[test]
	fn enumerate_is_preorder_copy() {
		let mut root = Node::new(pid(1), pid(0), "pmanager");
		root.add(&Node::new(pid(2), pid(1), "alpha")).unwrap();
		root.add(&Node::new(pid(3), pid(2), "alpha_1")).unwrap();
		root.add(&Node::new(pid(4), pid(2), "alpha_2")).unwrap();
		let names: Vec<_> = root.enumerate().into_iter().map(|n| n.name).collect();
		assert_eq!(names, vec!["pmanager", "alpha", "alpha_1", "alpha_2"]);
	}

	#[test]
	fn print_tree_indents_by_depth() {
		let mut root = Node::new(pid(1), pid(0), "a");
		root.add(&Node::new(pid(2), pid(1), "b")).unwrap();
		root.add(&Node::new(pid(3), pid(1), "c")).unwrap();
		assert_eq!(root.print_tree(), "a\n\t`- b\n\t`- c\n");
	}

	#[test]
	fn validates_names() {
		assert!(validate_name("alpha"));
		assert!(!validate_name(""));
		assert!(!validate_name("al:pha"));
		assert!(!validate_name("al;pha"));
	}
}
