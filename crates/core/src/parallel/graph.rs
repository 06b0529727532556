//! Computation-tree construction for the parallel scheduler.
//!
//! A requested task set is translated into a synthetic node graph: one
//! aggregation node per task, one sub-node per action block, and a single
//! root gathering the top-level targets. Edges point from a node to the
//! children that must complete before it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use petgraph::algo::kosaraju_scc;
use petgraph::prelude::*;
use tracing::trace;

use crate::registry::TaskRegistry;
use crate::task::{Task, TaskArgs};
use crate::types::{HarrowError, HarrowResult};

/// Unit of work carried by a schedulable node. Return values are discarded;
/// only success or failure matters.
pub(crate) type NodeFn = Box<dyn FnOnce() -> HarrowResult<()> + Send + 'static>;

pub(crate) struct CompNode {
    /// Unique synthetic or task-derived identifier
    pub id: String,
    /// Owning task, for diagnostics; the root has none
    pub task: Option<String>,
    /// Nodes without a function are purely structural: they complete as
    /// soon as all their children have
    pub func: Option<NodeFn>,
}

pub(crate) struct CompGraph {
    /// Edge `a -> b` means `b` must complete before `a` may run
    pub graph: DiGraph<CompNode, ()>,
    pub root: NodeIndex,
}

impl std::fmt::Debug for CompGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompGraph")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("root", &self.root)
            .finish()
    }
}

/// Generates synthetic sub-node ids from a task-name stem and a counter,
/// skipping anything already taken by a real task or an earlier node.
struct NodeIdGen {
    next: u64,
}

impl NodeIdGen {
    fn new() -> Self {
        NodeIdGen { next: 0 }
    }

    fn gensym(&mut self, stem: &str, taken: &mut HashSet<String>) -> String {
        loop {
            let id = format!("{}~{}", stem, self.next);
            self.next += 1;
            if taken.insert(id.clone()) {
                return id;
            }
        }
    }
}

/// Build the computation graph for `requests` plus the transitive
/// prerequisite closure of every requested task.
///
/// Tasks that were already invoked earlier in the process are treated as
/// satisfied and excluded. Every task collected here is marked invoked, so
/// its actions cannot run again later under either engine.
pub(crate) fn build(
    registry: &TaskRegistry,
    requests: &[(Arc<Task>, TaskArgs)],
) -> HarrowResult<CompGraph> {
    // Collect the parallel task set, resolving prerequisite references
    // against each task's own scope. Resolution failure here is fatal.
    let mut entries: Vec<(Arc<Task>, TaskArgs)> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(Arc<Task>, TaskArgs)> = requests.iter().cloned().collect();

    while let Some((task, args)) = queue.pop_front() {
        if visited.contains(task.name()) {
            continue;
        }
        if !task.mark_invoked() {
            // Already invoked before this build: satisfied, not scheduled
            continue;
        }
        visited.insert(task.name().to_string());
        for prereq in task.prerequisites() {
            let child = registry
                .lookup(&prereq, Some(task.scope()))
                .ok_or_else(|| HarrowError::Resolution {
                    task: task.name().to_string(),
                    name: prereq.clone(),
                })?;
            queue.push_back((child, TaskArgs::empty()));
        }
        entries.push((task, args));
    }

    let mut graph = DiGraph::<CompNode, ()>::new();
    let mut taken: HashSet<String> = visited.clone();
    let mut idgen = NodeIdGen::new();

    // One aggregation node per task, keyed by the task's own name
    let mut task_nodes: HashMap<String, NodeIndex> = HashMap::new();
    for (task, _) in &entries {
        let index = graph.add_node(CompNode {
            id: task.name().to_string(),
            task: Some(task.name().to_string()),
            func: None,
        });
        task_nodes.insert(task.name().to_string(), index);
    }

    // Synthetic root whose children are the top-level targets
    let root = graph.add_node(CompNode {
        id: idgen.gensym("root", &mut taken),
        task: None,
        func: None,
    });
    for (task, _) in requests {
        if let Some(&index) = task_nodes.get(task.name()) {
            graph.update_edge(root, index, ());
        }
    }

    // Explode each task into one sub-node per action. All sub-nodes of one
    // task share the task's prerequisite set and carry no ordering edges
    // between themselves, so sibling actions may run concurrently. This
    // asymmetry with the sequential engine is deliberate and kept.
    for (task, args) in &entries {
        let task_node = task_nodes[task.name()];
        let prereq_nodes: Vec<NodeIndex> = task
            .prerequisites()
            .iter()
            .filter_map(|prereq| registry.lookup(prereq, Some(task.scope())))
            .filter_map(|child| task_nodes.get(child.name()).copied())
            .collect();

        let actions = task.actions();
        if actions.is_empty() {
            // An aggregation-only task still gates on its prerequisites
            for &prereq in &prereq_nodes {
                graph.update_edge(task_node, prereq, ());
            }
            continue;
        }

        for action in actions {
            let id = idgen.gensym(task.name(), &mut taken);
            trace!(task = task.name(), node = id.as_str(), "adding action sub-node");

            let owner = task.clone();
            let bound_args = args.clone();
            let func: NodeFn = Box::new(move || {
                action
                    .call(&owner, &bound_args)
                    .map_err(|source| HarrowError::Action {
                        task: owner.name().to_string(),
                        chain: vec![owner.name().to_string()],
                        source,
                    })
            });

            let sub = graph.add_node(CompNode {
                id,
                task: Some(task.name().to_string()),
                func: Some(func),
            });
            graph.update_edge(task_node, sub, ());
            for &prereq in &prereq_nodes {
                graph.update_edge(sub, prereq, ());
            }
        }
    }

    detect_cycles(&graph)?;

    Ok(CompGraph { graph, root })
}

/// A topological order must exist; the invoked-flag memoization that
/// collapses cycles sequentially cannot help a dependency-counting
/// scheduler, so cycles are rejected up front.
fn detect_cycles(graph: &DiGraph<CompNode, ()>) -> HarrowResult<()> {
    let mut cycles: Vec<Vec<String>> = kosaraju_scc(graph)
        .into_iter()
        .filter_map(|component| {
            if component.len() > 1 {
                let mut cycle: Vec<String> = component
                    .iter()
                    .map(|&node| graph[node].id.clone())
                    .collect();
                cycle.sort();
                Some(cycle)
            } else {
                None
            }
        })
        .collect();

    if cycles.is_empty() {
        return Ok(());
    }

    cycles.sort();
    let message = cycles
        .into_iter()
        .map(|cycle| cycle.join(" -> "))
        .collect::<Vec<_>>()
        .join("; ");
    Err(HarrowError::Scheduling(format!(
        "circular dependency detected: {}",
        message
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TaskDef;

    #[test]
    fn gensym_never_repeats_and_avoids_taken_names() {
        let mut taken: HashSet<String> = HashSet::new();
        taken.insert("compile~0".to_string());

        let mut idgen = NodeIdGen::new();
        let mut ids = HashSet::new();
        for stem in ["compile", "compile", "compile~1", "test"] {
            let id = idgen.gensym(stem, &mut taken);
            assert_ne!(id, "compile~0");
            assert!(ids.insert(id), "duplicate synthetic id generated");
        }
    }

    #[test]
    fn sub_node_ids_are_unique_across_prefix_sharing_tasks() {
        let mut registry = TaskRegistry::new();
        registry.define(
            TaskDef::new("build")
                .action(|_, _| Ok(()))
                .action(|_, _| Ok(())),
        );
        registry.define(TaskDef::new("build-fast").action(|_, _| Ok(())));
        registry.define(
            TaskDef::new("all")
                .prerequisite("build")
                .prerequisite("build-fast"),
        );

        let task = registry.get("all").unwrap();
        let comp = build(&registry, &[(task, TaskArgs::empty())]).unwrap();

        let mut seen = HashSet::new();
        for node in comp.graph.node_weights() {
            assert!(seen.insert(node.id.clone()), "duplicate node id {}", node.id);
        }
    }

    #[test]
    fn functionless_nodes_are_structural_only() {
        let mut registry = TaskRegistry::new();
        registry.define(TaskDef::new("compile").action(|_, _| Ok(())));
        registry.define(TaskDef::new("all").prerequisite("compile"));

        let task = registry.get("all").unwrap();
        let comp = build(&registry, &[(task, TaskArgs::empty())]).unwrap();

        // root, "all", "compile" carry no function; the single action
        // sub-node of compile does
        let with_func = comp
            .graph
            .node_weights()
            .filter(|node| node.func.is_some())
            .count();
        assert_eq!(with_func, 1);
        assert!(comp.graph[comp.root].func.is_none());
    }

    #[test]
    fn unresolved_prerequisite_fails_the_build() {
        let mut registry = TaskRegistry::new();
        registry.define(TaskDef::new("all").prerequisite("ghost"));

        let task = registry.get("all").unwrap();
        let err = build(&registry, &[(task, TaskArgs::empty())]).unwrap_err();
        assert!(matches!(err, HarrowError::Resolution { .. }));
    }

    #[test]
    fn cyclic_graph_is_rejected() {
        let mut registry = TaskRegistry::new();
        registry.define(TaskDef::new("a").prerequisite("b").action(|_, _| Ok(())));
        registry.define(TaskDef::new("b").prerequisite("a").action(|_, _| Ok(())));

        let task = registry.get("a").unwrap();
        let err = build(&registry, &[(task, TaskArgs::empty())]).unwrap_err();
        assert!(matches!(err, HarrowError::Scheduling(_)));
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn already_invoked_tasks_are_excluded() {
        let mut registry = TaskRegistry::new();
        registry.define(TaskDef::new("compile").action(|_, _| Ok(())));
        registry.define(TaskDef::new("all").prerequisite("compile"));

        let compile = registry.get("compile").unwrap();
        assert!(compile.mark_invoked());

        let task = registry.get("all").unwrap();
        let comp = build(&registry, &[(task, TaskArgs::empty())]).unwrap();

        assert!(comp
            .graph
            .node_weights()
            .all(|node| node.id != "compile"));
    }
}
