//! Task model: named units of work with prerequisites and action blocks.
//!
//! Tasks are shared between the sequential and parallel engines, so the
//! mutable pieces (prerequisite/action lists grown by redefinition, the
//! invoked flag) live behind interior mutability while the identity (name,
//! scope) stays plain.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Separator between namespace segments in a qualified task name
pub const SCOPE_SEPARATOR: &str = ":";

/// Ordered namespace segments active at a task's declaration site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    segments: Vec<String>,
}

impl Scope {
    /// The global (top-level) scope
    pub fn root() -> Self {
        Scope::default()
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Scope {
            segments: segments.into_iter().map(|s| s.into()).collect(),
        }
    }

    /// A copy of this scope extended with one more namespace segment
    pub fn push(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Scope { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Qualified name of `local` declared in this scope
    pub fn qualify(&self, local: &str) -> String {
        if self.segments.is_empty() {
            local.to_string()
        } else {
            format!("{}{}{}", self.segments.join(SCOPE_SEPARATOR), SCOPE_SEPARATOR, local)
        }
    }

    /// Lookup candidates for `name` seen from this scope, innermost
    /// enclosing scope first, ending with the unqualified global name.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(self.segments.len() + 1);
        for depth in (1..=self.segments.len()).rev() {
            let prefix = self.segments[..depth].join(SCOPE_SEPARATOR);
            out.push(format!("{}{}{}", prefix, SCOPE_SEPARATOR, name));
        }
        out.push(name.to_string());
        out
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(SCOPE_SEPARATOR))
    }
}

/// Positional argument values bound to a task's declared parameter names
#[derive(Debug, Clone, Default)]
pub struct TaskArgs {
    names: Vec<String>,
    values: Vec<String>,
}

impl TaskArgs {
    /// Empty argument bundle, used for prerequisite invocations
    pub fn empty() -> Self {
        TaskArgs::default()
    }

    /// Bind positional `values` to declared parameter `names` in order
    pub fn bind(names: &[String], values: Vec<String>) -> Self {
        TaskArgs {
            names: names.to_vec(),
            values,
        }
    }

    /// Value of the parameter called `name`, if one was bound
    pub fn get(&self, name: &str) -> Option<&str> {
        let position = self.names.iter().position(|n| n == name)?;
        self.values.get(position).map(String::as_str)
    }

    /// Value at `position`, regardless of declared names
    pub fn position(&self, position: usize) -> Option<&str> {
        self.values.get(position).map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One executable block attached to a task
#[derive(Clone)]
pub struct Action {
    func: Arc<dyn Fn(&Task, &TaskArgs) -> anyhow::Result<()> + Send + Sync>,
}

impl Action {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Task, &TaskArgs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Action {
            func: Arc::new(func),
        }
    }

    pub fn call(&self, task: &Task, args: &TaskArgs) -> anyhow::Result<()> {
        (self.func)(task, args)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}

/// Mutable portion of a task, grown by redefinition
#[derive(Default)]
struct TaskInner {
    prerequisites: Vec<String>,
    actions: Vec<Action>,
    params: Vec<String>,
    description: Option<String>,
}

/// A named unit of work with prerequisites and ordered action blocks
pub struct Task {
    name: String,
    scope: Scope,
    inner: RwLock<TaskInner>,
    invoked: AtomicBool,
}

impl Task {
    pub(crate) fn new(name: String, scope: Scope) -> Self {
        Task {
            name,
            scope,
            inner: RwLock::new(TaskInner::default()),
            invoked: AtomicBool::new(false),
        }
    }

    /// Fully qualified name (namespace path plus local name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scope active when the task was declared
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn prerequisites(&self) -> Vec<String> {
        self.read().prerequisites.clone()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.read().actions.clone()
    }

    pub fn has_actions(&self) -> bool {
        !self.read().actions.is_empty()
    }

    pub fn params(&self) -> Vec<String> {
        self.read().params.clone()
    }

    pub fn description(&self) -> Option<String> {
        self.read().description.clone()
    }

    /// Bind positional values to this task's declared parameters
    pub fn bind_args(&self, values: Vec<String>) -> TaskArgs {
        TaskArgs::bind(&self.read().params, values)
    }

    pub fn is_invoked(&self) -> bool {
        self.invoked.load(Ordering::SeqCst)
    }

    /// Set the invoked flag; returns true if this call was the first to set
    /// it. The flag is set before any prerequisite or action runs, which is
    /// what collapses cyclic and diamond dependency chains into no-ops.
    pub(crate) fn mark_invoked(&self) -> bool {
        !self.invoked.swap(true, Ordering::SeqCst)
    }

    /// Append prerequisites and actions from a redefinition of the same
    /// name. Accumulation is append-only; the invoked flag is untouched.
    pub(crate) fn merge(
        &self,
        prerequisites: Vec<String>,
        actions: Vec<Action>,
        params: Vec<String>,
        description: Option<String>,
    ) {
        let mut inner = self.write();
        inner.prerequisites.extend(prerequisites);
        inner.actions.extend(actions);
        if !params.is_empty() {
            inner.params = params;
        }
        if description.is_some() {
            inner.description = description;
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TaskInner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, TaskInner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("prerequisites", &inner.prerequisites)
            .field("actions", &inner.actions.len())
            .field("invoked", &self.is_invoked())
            .finish()
    }
}

/// Split a requested target string of the form `name[arg1, arg2]` into the
/// bare task name and its positional argument list.
///
/// A string without a bracket suffix has no arguments. Malformed bracket
/// nesting is fail-soft: the whole string is treated as the bare name.
pub fn parse_target(input: &str) -> (String, Vec<String>) {
    let input = input.trim();

    let open = match input.find('[') {
        Some(index) => index,
        None => return (input.to_string(), Vec::new()),
    };

    if !input.ends_with(']') {
        return (input.to_string(), Vec::new());
    }

    let body = &input[open + 1..input.len() - 1];
    if body.contains('[') || body.contains(']') {
        // Nested brackets are not an argument list
        return (input.to_string(), Vec::new());
    }

    let name = input[..open].trim().to_string();
    if body.trim().is_empty() {
        return (name, Vec::new());
    }

    let args = body.split(',').map(|arg| arg.trim().to_string()).collect();
    (name, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_target_with_arguments() {
        let (name, args) = parse_target("deploy[staging,us-east]");
        assert_eq!(name, "deploy");
        assert_eq!(args, vec!["staging", "us-east"]);
    }

    #[test]
    fn parse_target_trims_whitespace() {
        let (name, args) = parse_target("  deploy[ staging , us-east ]  ");
        assert_eq!(name, "deploy");
        assert_eq!(args, vec!["staging", "us-east"]);
    }

    #[test]
    fn parse_target_without_brackets() {
        let (name, args) = parse_target("compile");
        assert_eq!(name, "compile");
        assert!(args.is_empty());
    }

    #[test]
    fn parse_target_empty_brackets() {
        let (name, args) = parse_target("compile[]");
        assert_eq!(name, "compile");
        assert!(args.is_empty());
    }

    #[test]
    fn parse_target_malformed_is_fail_soft() {
        let (name, args) = parse_target("odd[na[me]");
        assert_eq!(name, "odd[na[me]");
        assert!(args.is_empty());

        let (name, args) = parse_target("unclosed[a,b");
        assert_eq!(name, "unclosed[a,b");
        assert!(args.is_empty());
    }

    #[test]
    fn scope_candidates_innermost_first() {
        let scope = Scope::new(["build", "linux"]);
        assert_eq!(
            scope.candidates("compile"),
            vec!["build:linux:compile", "build:compile", "compile"]
        );
    }

    #[test]
    fn scope_qualify() {
        assert_eq!(Scope::root().qualify("compile"), "compile");
        assert_eq!(Scope::new(["build"]).qualify("compile"), "build:compile");
    }

    #[test]
    fn mark_invoked_is_one_shot() {
        let task = Task::new("compile".to_string(), Scope::root());
        assert!(task.mark_invoked());
        assert!(!task.mark_invoked());
        assert!(task.is_invoked());
    }

    #[test]
    fn merge_accumulates_in_order() {
        let task = Task::new("compile".to_string(), Scope::root());
        task.merge(vec!["a".to_string()], vec![], vec![], None);
        task.merge(
            vec!["b".to_string()],
            vec![Action::new(|_, _| Ok(()))],
            vec![],
            Some("builds things".to_string()),
        );
        assert_eq!(task.prerequisites(), vec!["a", "b"]);
        assert_eq!(task.actions().len(), 1);
        assert_eq!(task.description().as_deref(), Some("builds things"));
    }

    #[test]
    fn task_args_bind_by_name_and_position() {
        let names = vec!["env".to_string(), "region".to_string()];
        let args = TaskArgs::bind(&names, vec!["staging".to_string(), "us-east".to_string()]);
        assert_eq!(args.get("env"), Some("staging"));
        assert_eq!(args.get("region"), Some("us-east"));
        assert_eq!(args.position(1), Some("us-east"));
        assert_eq!(args.get("missing"), None);
    }
}
