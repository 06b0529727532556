//! Configuration parsing for Harrow taskfiles
//!
//! Taskfiles are YAML documents declaring a namespace, task entries and
//! further imports. Parsing is pure; turning entries into registry
//! definitions happens in the import loader.

pub mod tasks;

pub use tasks::{parse_taskfile, Command, TaskEntry, TaskfileConfig};
