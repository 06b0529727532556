//! Sequential invocation engine.
//!
//! Depth-first, memoized traversal: a task's prerequisites are invoked in
//! declaration order before its own actions run, and every task executes at
//! most once per process. The invoked flag is set *before* recursing, so a
//! task reachable through a cycle or a diamond is treated as already
//! satisfied rather than as an error.

use std::sync::Arc;

use tracing::debug;

use crate::registry::TaskRegistry;
use crate::task::{parse_target, Task, TaskArgs};
use crate::types::{HarrowError, HarrowResult};

/// Parse a requested target string (`name[arg1, arg2]`) and invoke it.
///
/// The bare name must exist in the registry; bracketed values are bound to
/// the task's declared parameters.
pub fn invoke_target(registry: &TaskRegistry, target: &str) -> HarrowResult<()> {
    let (name, values) = parse_target(target);
    let task = registry.get(&name)?;
    let args = task.bind_args(values);
    invoke(registry, &task, &args)
}

/// Invoke `task`: prerequisites first (with empty arguments — prerequisites
/// never inherit the parent's bundle), then the task's own actions in
/// declaration order with `args`.
pub fn invoke(registry: &TaskRegistry, task: &Arc<Task>, args: &TaskArgs) -> HarrowResult<()> {
    if !task.mark_invoked() {
        debug!(task = task.name(), "already invoked, skipping");
        return Ok(());
    }

    debug!(task = task.name(), "invoking");
    for prereq in task.prerequisites() {
        let child = registry
            .lookup(&prereq, Some(task.scope()))
            .ok_or_else(|| HarrowError::Resolution {
                task: task.name().to_string(),
                name: prereq.clone(),
            })?;
        invoke(registry, &child, &TaskArgs::empty()).map_err(|err| err.with_frame(task.name()))?;
    }

    execute(task, args)
}

/// Run the task's action blocks in declaration order
fn execute(task: &Task, args: &TaskArgs) -> HarrowResult<()> {
    for action in task.actions() {
        action.call(task, args).map_err(|source| HarrowError::Action {
            task: task.name().to_string(),
            chain: vec![task.name().to_string()],
            source,
        })?;
    }
    Ok(())
}
