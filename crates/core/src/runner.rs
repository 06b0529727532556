//! High-level runner interface
//!
//! [`Runner`] is the primary entry point: it owns the task registry and the
//! import pipeline and selects an execution strategy from its configured
//! worker count. It is an explicitly owned value, never a process global,
//! so independent runs (and tests) cannot leak state into each other.
//!
//! ## Example
//!
//! ```rust,no_run
//! use harrow_core::runner::{Runner, RunnerConfig};
//!
//! # async fn example() -> harrow_core::types::HarrowResult<()> {
//! let mut runner = Runner::new(RunnerConfig { jobs: 4 });
//! runner.load_taskfile("harrow.yml")?;
//! runner.run_targets(&["all".to_string()]).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::import::{ImportLoader, SourceLoader};
use crate::invoke::invoke_target;
use crate::parallel::invoke_parallel;
use crate::registry::{TaskDef, TaskRegistry};
use crate::task::Task;
use crate::types::HarrowResult;

/// Configuration for a runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Worker count; 1 selects the sequential engine
    pub jobs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig { jobs: 1 }
    }
}

/// Owns the registry and the import pipeline, runs targets
pub struct Runner {
    registry: TaskRegistry,
    imports: ImportLoader,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Runner {
            registry: TaskRegistry::new(),
            imports: ImportLoader::new(),
            config: RunnerConfig {
                jobs: config.jobs.max(1),
            },
        }
    }

    /// Define a task programmatically (taskfiles go through the import
    /// pipeline instead)
    pub fn define(&mut self, def: TaskDef) -> Arc<Task> {
        self.registry.define(def)
    }

    /// Queue a source location for loading
    pub fn add_import(&mut self, location: impl Into<String>) {
        self.imports.add_import(location);
    }

    /// Register a loader for a file extension
    pub fn register_loader(&mut self, extension: &str, loader: Box<dyn SourceLoader>) {
        self.imports.register_loader(extension, loader);
    }

    /// Drain all pending imports into the registry
    pub fn load_pending(&mut self) -> HarrowResult<()> {
        self.imports.load_pending(&mut self.registry)
    }

    /// Queue one location and drain the whole queue
    pub fn load_taskfile(&mut self, location: impl Into<String>) -> HarrowResult<()> {
        self.add_import(location);
        self.load_pending()
    }

    /// Invoke the given target strings, each optionally carrying bracketed
    /// arguments. With one worker the targets run depth-first in order;
    /// with more they are scheduled as one computation graph.
    pub async fn run_targets(&mut self, targets: &[String]) -> HarrowResult<()> {
        if self.config.jobs > 1 {
            debug!(jobs = self.config.jobs, "running targets in parallel");
            invoke_parallel(&self.registry, targets, self.config.jobs).await
        } else {
            debug!("running targets sequentially");
            for target in targets {
                invoke_target(&self.registry, target)?;
            }
            Ok(())
        }
    }

    /// All registered tasks, sorted by name, for listing and description
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        self.registry.tasks()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn sequential_and_parallel_share_invocation_state() {
        let mut runner = Runner::new(RunnerConfig { jobs: 1 });
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        runner.define(TaskDef::new("compile").action(move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        runner.run_targets(&["compile".to_string()]).await.unwrap();
        runner.run_targets(&["compile".to_string()]).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn independent_runners_do_not_share_state() {
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let mut runner = Runner::new(RunnerConfig::default());
            let c = counter.clone();
            runner.define(TaskDef::new("compile").action(move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
            runner.run_targets(&["compile".to_string()]).await.unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_jobs_is_clamped_to_sequential() {
        let mut runner = Runner::new(RunnerConfig { jobs: 0 });
        runner.define(TaskDef::new("noop"));
        runner.run_targets(&["noop".to_string()]).await.unwrap();
    }
}
