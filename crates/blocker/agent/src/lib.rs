//! Blocker Agent
//!
//! Host integration for the blocker engine on macOS: configuration, focus history from
//! `lsappinfo`, the enforcement notice, and the daemon control socket.

pub mod config;
pub mod ipc;
pub mod lists;
pub mod lsappinfo;
pub mod notice;

pub use config::Config;
