//! Bounded worker-pool execution of a computation graph.
//!
//! A node is dispatched only once every child has completed; structural
//! nodes (no function) complete on the spot. The first recorded failure
//! becomes the terminal result: in-flight work drains naturally, nothing
//! new is dispatched, nothing is interrupted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use petgraph::prelude::*;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::graph::CompGraph;
use crate::types::{HarrowError, HarrowResult};

pub(crate) async fn run(comp: CompGraph, workers: usize) -> HarrowResult<()> {
    let CompGraph { mut graph, root } = comp;

    // Uncompleted-children count per node; nodes at zero are ready
    let mut pending: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|node| (node, graph.neighbors_directed(node, Outgoing).count()))
        .collect();
    let mut completed: HashSet<NodeIndex> = HashSet::new();
    let mut ready: Vec<NodeIndex> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| *node)
        .collect();

    let permits = Arc::new(Semaphore::new(workers));
    let mut running = JoinSet::new();
    let mut failure: Option<HarrowError> = None;

    loop {
        while let Some(index) = ready.pop() {
            if failure.is_some() {
                // No new dispatch past the first failure
                continue;
            }
            match graph[index].func.take() {
                None => {
                    // Structural node: completes as soon as it is ready
                    complete(&graph, index, &mut pending, &mut completed, &mut ready)?;
                }
                Some(func) => {
                    debug!(node = graph[index].id.as_str(), "dispatching");
                    let permits = permits.clone();
                    running.spawn(async move {
                        let _permit = permits.acquire_owned().await;
                        (index, tokio::task::spawn_blocking(func).await)
                    });
                }
            }
        }

        if completed.contains(&root) {
            debug!("computation root completed");
            return Ok(());
        }

        match running.join_next().await {
            Some(Ok((index, Ok(Ok(()))))) => {
                debug!(node = graph[index].id.as_str(), "completed");
                complete(&graph, index, &mut pending, &mut completed, &mut ready)?;
            }
            Some(Ok((index, Ok(Err(err))))) => {
                warn!(node = graph[index].id.as_str(), error = %err, "node failed");
                failure.get_or_insert(err);
            }
            Some(Ok((index, Err(join_err)))) => {
                let task = graph[index]
                    .task
                    .clone()
                    .unwrap_or_else(|| graph[index].id.clone());
                warn!(node = graph[index].id.as_str(), "node panicked");
                failure.get_or_insert(HarrowError::Action {
                    task: task.clone(),
                    chain: vec![task],
                    source: anyhow::anyhow!("action panicked: {}", join_err),
                });
            }
            Some(Err(join_err)) => {
                failure.get_or_insert(HarrowError::Scheduling(format!(
                    "worker task failed: {}",
                    join_err
                )));
            }
            None => {
                // Nothing running and the root did not complete
                return Err(match failure {
                    Some(err) => err,
                    None => HarrowError::Scheduling(
                        "computation stalled with no runnable node".to_string(),
                    ),
                });
            }
        }
    }
}

/// Mark `index` complete and release any dependent whose children are now
/// all done.
fn complete(
    graph: &DiGraph<super::graph::CompNode, ()>,
    index: NodeIndex,
    pending: &mut HashMap<NodeIndex, usize>,
    completed: &mut HashSet<NodeIndex>,
    ready: &mut Vec<NodeIndex>,
) -> HarrowResult<()> {
    if !completed.insert(index) {
        return Err(HarrowError::Scheduling(format!(
            "node '{}' completed twice",
            graph[index].id
        )));
    }

    for dependent in graph.neighbors_directed(index, Incoming) {
        let count = pending.get_mut(&dependent).ok_or_else(|| {
            HarrowError::Scheduling(format!("unknown dependent of node '{}'", graph[index].id))
        })?;
        if *count == 0 {
            return Err(HarrowError::Scheduling(format!(
                "node '{}' released dependent '{}' below zero",
                graph[index].id, graph[dependent].id
            )));
        }
        *count -= 1;
        if *count == 0 {
            ready.push(dependent);
        }
    }

    Ok(())
}
