//! Execution of shell-level task actions
//!
//! Actions declared in taskfiles run external commands; this module provides
//! the single place where processes are spawned, environment is set up and
//! exit statuses become errors.

pub mod command;

pub use command::CommandRunner;
