//! Harrow Core Library
//!
//! Core library for the Harrow task runner: a dependency-driven runner
//! where named tasks declare prerequisites and action blocks, and invoking
//! a task executes its transitive prerequisite closure exactly once per
//! task, in dependency order.
//!
//! ## Architecture
//!
//! - [`runner`] - High-level entry point owning registry and imports
//! - [`registry`] - Task registry with scope-aware name resolution
//! - [`task`] - Task model, scopes, argument bundles, target parsing
//! - [`invoke`] - Sequential depth-first invocation engine
//! - [`parallel`] - Computation-tree scheduler over a bounded worker pool
//! - [`import`] - Deferred loading of taskfile sources
//! - [`configs`] - Taskfile schema and parsing
//! - [`execution`] - Shell command execution behind taskfile actions
//! - [`types`] - Common error types and type aliases
//!
//! ## Usage
//!
//! ```rust,no_run
//! use harrow_core::runner::{Runner, RunnerConfig};
//!
//! # async fn example() -> harrow_core::types::HarrowResult<()> {
//! let mut runner = Runner::new(RunnerConfig { jobs: 1 });
//! runner.load_taskfile("harrow.yml")?;
//! runner.run_targets(&["test".to_string()]).await?;
//! # Ok(())
//! # }
//! ```

pub mod configs;
pub mod execution;
pub mod import;
pub mod invoke;
pub mod parallel;
pub mod registry;
pub mod runner;
pub mod task;
pub mod types;

// Re-export the main types for easier usage
pub use runner::{Runner, RunnerConfig};
pub use types::{HarrowError, HarrowResult};
