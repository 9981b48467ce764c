//! Drives a forked supervisor and a forked child agent over a real FIFO,
//! acting as a bus peer exactly as `pnew`/`pclose` would. Exercises the SPAWN
//! protocol directly, since no command helper sends SPAWN itself — only a
//! child agent's own clones do.

#![cfg(unix)]

use nix::sys::wait::waitpid;
use nix::unistd::{self, Pid};
use pmgr::agent::ChildAgent;
use pmgr::bus::Bus;
use pmgr::config::Config;
use pmgr::fork::{self, ForkResult};
use pmgr::helpers;
use pmgr::message::{Kind, Message};
use pmgr::tree::Node;
use std::io::{BufReader, Cursor};
use std::time::Duration;

fn test_config(name: &str) -> Config {
	let mut config = Config::default();
	config.fifo_path = std::env::temp_dir().join(format!("pmgr-test-{}-{}", std::process::id(), name));
	let _ = std::fs::remove_file(&config.fifo_path);
	// Only `sleep` is exec'd by the supervisor in this test, to open its
	// bus-servicing window without depending on this crate's own binaries.
	config.bin_dir = std::path::PathBuf::from("/bin");
	config
}

/// Forks a supervisor that keeps a `sleep <secs>` command alive (servicing the
/// bus the whole time), then quits. Returns its pid.
fn spawn_supervisor(config: Config, secs: &str) -> Pid {
	match fork::fork().expect("fork supervisor") {
		ForkResult::Child => {
			let mut supervisor = pmgr::supervisor::Supervisor::start(config).expect("start supervisor");
			let script = format!("sleep {secs}\nquit\n");
			let _ = supervisor.run(BufReader::new(Cursor::new(script)), false);
			std::process::exit(0);
		}
		ForkResult::Parent(child) => child.pid,
	}
}

#[test]
fn spawn_clones_are_registered_under_the_cloning_process() {
	let config = test_config("spawn_clone");
	let supervisor_pid = spawn_supervisor(config.clone(), "5");
	std::thread::sleep(Duration::from_millis(200));

	let bus = Bus::open(&config.fifo_path, config.fifo_mode).expect("open bus");
	let my_pid = unistd::getpid();

	let alpha_pid = match fork::fork().expect("fork alpha") {
		ForkResult::Child => {
			let agent_bus = Bus::open(&config.fifo_path, config.fifo_mode).expect("alpha open bus");
			ChildAgent::new(agent_bus, supervisor_pid, "alpha")
				.expect("start alpha agent")
				.run();
		}
		ForkResult::Parent(child) => child.pid,
	};

	// Register alpha with the supervisor, the way `pnew`'s parent branch does.
	let alpha_node = Node::new(alpha_pid, supervisor_pid, "alpha");
	bus.send(supervisor_pid, &Message::new(my_pid, Kind::Add, Some(alpha_node.to_str())))
		.expect("send ADD");
	let reply = bus.wait(Some(supervisor_pid)).expect("wait ADD reply");
	assert_eq!(reply.kind, Kind::Ok, "alpha should have registered cleanly");

	// Ask alpha to clone itself twice.
	for _ in 0..2 {
		bus.send(alpha_pid, &Message::new(my_pid, Kind::Spawn, None))
			.expect("send SPAWN");
		let ack = bus.wait(Some(alpha_pid)).expect("wait SPAWN ack");
		assert_eq!(ack.kind, Kind::Ok);
	}

	let clone_names = ["alpha_1", "alpha_2"];
	let mut clone_pids = Vec::new();
	for name in clone_names {
		let info = helpers::request_info(&bus, supervisor_pid, my_pid, name)
			.expect("request INFO")
			.unwrap_or_else(|| panic!("{name} was not registered"));
		assert_eq!(info.ppid, alpha_pid, "{name} should be parented under alpha");
		clone_pids.push(info.pid);
	}

	// Tear down leaves first, then alpha, so the leaf-only-removal invariant holds.
	for pid in clone_pids {
		helpers::terminate_and_wait(&bus, pid).expect("terminate clone");
	}
	helpers::terminate_and_wait(&bus, alpha_pid).expect("terminate alpha");

	let _ = waitpid(alpha_pid, None);
	let _ = waitpid(supervisor_pid, None);
	let _ = std::fs::remove_file(&config.fifo_path);
}
