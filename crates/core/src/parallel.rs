//! Parallel computation-tree scheduler
//!
//! Active when the configured worker count is greater than one. The
//! requested targets and their transitive prerequisite closure become a
//! synthetic node graph (see [`graph`]) executed by a bounded worker pool
//! (see [`scheduler`]). Unlike the sequential engine, the action blocks of
//! a single task carry no ordering edges between themselves and may run
//! concurrently; that asymmetry is documented behavior, not an accident.

pub(crate) mod graph;
pub(crate) mod scheduler;

use crate::registry::TaskRegistry;
use crate::task::parse_target;
use crate::types::HarrowResult;

/// Invoke `targets` (each optionally carrying bracketed arguments) across a
/// pool of `workers` workers, honoring dependency order.
pub async fn invoke_parallel(
    registry: &TaskRegistry,
    targets: &[String],
    workers: usize,
) -> HarrowResult<()> {
    let mut requests = Vec::with_capacity(targets.len());
    for target in targets {
        let (name, values) = parse_target(target);
        let task = registry.get(&name)?;
        let args = task.bind_args(values);
        requests.push((task, args));
    }

    let comp = graph::build(registry, &requests)?;
    scheduler::run(comp, workers.max(1)).await
}
