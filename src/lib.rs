//! A small interactive shell that supervises a dynamic tree of named, long-lived
//! user processes over a single shared message bus.
//!
//! `pmgr` = "process manager". Every participant — the supervisor, every
//! user-started child, and every short-lived command helper — opens the same FIFO
//! and cooperates over a tiny request/response protocol (ADD, REMOVE, INFO, LIST,
//! SPAWN) framed as `"<sender_pid>:<kind>:<payload>\0"`.

#![warn(missing_debug_implementations, unused_import_braces, unused_qualifications)]

pub mod agent;
pub mod bus;
pub mod config;
pub mod error;
pub mod fork;
pub mod helpers;
pub mod logging;
pub mod message;
pub mod supervisor;
pub mod tree;
