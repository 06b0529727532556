//! Task registry keyed by qualified name, with scope-aware lookup.
//!
//! The registry is an explicitly owned value passed to the engines rather
//! than a process-global, so independent runs (and tests) never share state.
//! It is append-only for the duration of a run: redefining a task merges
//! prerequisites and actions into the existing entry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::task::{Action, Scope, Task};
use crate::types::{HarrowError, HarrowResult};

/// Everything a single `define` call contributes to a task
pub struct TaskDef {
    pub name: String,
    pub scope: Scope,
    pub prerequisites: Vec<String>,
    pub actions: Vec<Action>,
    pub params: Vec<String>,
    pub description: Option<String>,
}

impl TaskDef {
    pub fn new(name: impl Into<String>) -> Self {
        TaskDef {
            name: name.into(),
            scope: Scope::root(),
            prerequisites: Vec::new(),
            actions: Vec::new(),
            params: Vec::new(),
            description: None,
        }
    }

    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn prerequisite(mut self, name: impl Into<String>) -> Self {
        self.prerequisites.push(name.into());
        self
    }

    pub fn action<F>(mut self, func: F) -> Self
    where
        F: Fn(&Task, &crate::task::TaskArgs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.actions.push(Action::new(func));
        self
    }

    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// All defined tasks, keyed by qualified name
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        TaskRegistry::default()
    }

    /// Create a task, or merge into the existing task of the same qualified
    /// name. Returns the (possibly pre-existing) task.
    pub fn define(&mut self, def: TaskDef) -> Arc<Task> {
        let qualified = def.scope.qualify(&def.name);
        let task = self
            .tasks
            .entry(qualified.clone())
            .or_insert_with(|| Arc::new(Task::new(qualified, def.scope)))
            .clone();
        task.merge(def.prerequisites, def.actions, def.params, def.description);
        task
    }

    /// Resolve `name` as seen from `scope`.
    ///
    /// Resolution order: exact qualified match, then each enclosing scope
    /// from innermost to outermost, then the unqualified global name.
    /// Absence is a normal outcome.
    pub fn lookup(&self, name: &str, scope: Option<&Scope>) -> Option<Arc<Task>> {
        if let Some(task) = self.tasks.get(name) {
            return Some(task.clone());
        }
        if let Some(scope) = scope {
            for candidate in scope.candidates(name) {
                if let Some(task) = self.tasks.get(&candidate) {
                    return Some(task.clone());
                }
            }
        }
        None
    }

    /// The task registered under exactly `name`, or a "no such task" error.
    /// Used where the caller requires the task to exist, e.g. top-level
    /// invocation targets.
    pub fn get(&self, name: &str) -> HarrowResult<Arc<Task>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| HarrowError::UnknownTask(name.to_string()))
    }

    /// All registered tasks, sorted by qualified name
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        let mut tasks: Vec<_> = self.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.name().cmp(b.name()));
        tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_qualifies_name_with_scope() {
        let mut registry = TaskRegistry::new();
        let task = registry.define(TaskDef::new("compile").in_scope(Scope::new(["build"])));
        assert_eq!(task.name(), "build:compile");
    }

    #[test]
    fn redefinition_merges_instead_of_replacing() {
        let mut registry = TaskRegistry::new();
        registry.define(TaskDef::new("compile").prerequisite("deps"));
        registry.define(TaskDef::new("compile").prerequisite("codegen").action(|_, _| Ok(())));

        let task = registry.get("compile").unwrap();
        assert_eq!(task.prerequisites(), vec!["deps", "codegen"]);
        assert_eq!(task.actions().len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_prefers_innermost_scope() {
        let mut registry = TaskRegistry::new();
        registry.define(TaskDef::new("compile"));
        registry.define(TaskDef::new("compile").in_scope(Scope::new(["build"])));
        registry.define(TaskDef::new("compile").in_scope(Scope::new(["build", "linux"])));

        let inner = Scope::new(["build", "linux"]);
        let found = registry.lookup("compile", Some(&inner)).unwrap();
        assert_eq!(found.name(), "build:linux:compile");

        let outer = Scope::new(["build"]);
        let found = registry.lookup("compile", Some(&outer)).unwrap();
        assert_eq!(found.name(), "build:compile");
    }

    #[test]
    fn lookup_falls_back_to_global() {
        let mut registry = TaskRegistry::new();
        registry.define(TaskDef::new("clean"));

        let scope = Scope::new(["build", "linux"]);
        let found = registry.lookup("clean", Some(&scope)).unwrap();
        assert_eq!(found.name(), "clean");
    }

    #[test]
    fn lookup_exact_qualified_name_wins() {
        let mut registry = TaskRegistry::new();
        registry.define(TaskDef::new("compile").in_scope(Scope::new(["build"])));

        let found = registry.lookup("build:compile", None).unwrap();
        assert_eq!(found.name(), "build:compile");
    }

    #[test]
    fn get_unknown_task_is_an_error() {
        let registry = TaskRegistry::new();
        let err = registry.get("missing").unwrap_err();
        assert!(err.to_string().contains("no such task"));
    }

    #[test]
    fn tasks_are_enumerated_sorted() {
        let mut registry = TaskRegistry::new();
        registry.define(TaskDef::new("test"));
        registry.define(TaskDef::new("compile"));
        registry.define(TaskDef::new("all"));

        let names: Vec<_> = registry.tasks().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["all", "compile", "test"]);
    }
}
