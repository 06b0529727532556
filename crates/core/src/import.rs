//! Import pipeline: deferred loading of taskfile sources.
//!
//! Locations are queued and drained FIFO before any scheduling happens.
//! Each location loads at most once per process; loaders may queue further
//! imports while loading, and those are drained within the same
//! `load_pending` call (breadth-first over the queue, not recursion).

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use tracing::debug;

use crate::configs::tasks::{parse_taskfile, Command};
use crate::execution::CommandRunner;
use crate::invoke;
use crate::registry::{TaskDef, TaskRegistry};
use crate::task::{Scope, TaskArgs, SCOPE_SEPARATOR};
use crate::types::{HarrowError, HarrowResult};

/// Pending and already-processed import locations.
///
/// Handed to loaders so a taskfile can declare imports of its own; those
/// land at the back of the same queue.
#[derive(Debug, Default)]
pub struct ImportQueue {
    pending: VecDeque<String>,
    imported: HashSet<String>,
}

impl ImportQueue {
    /// Queue a location. Duplicates are filtered at processing time, not
    /// here.
    pub fn add(&mut self, location: impl Into<String>) {
        self.pending.push_back(location.into());
    }

    fn next(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    fn is_imported(&self, location: &str) -> bool {
        self.imported.contains(location)
    }

    fn mark_imported(&mut self, location: String) {
        self.imported.insert(location);
    }
}

/// Loads one source location into the registry
pub trait SourceLoader: Send + Sync {
    fn load(
        &self,
        location: &Path,
        registry: &mut TaskRegistry,
        queue: &mut ImportQueue,
    ) -> anyhow::Result<()>;
}

/// Dispatches queued imports to extension-keyed loaders
pub struct ImportLoader {
    queue: ImportQueue,
    loaders: HashMap<String, Box<dyn SourceLoader>>,
    default_loader: Box<dyn SourceLoader>,
}

impl Default for ImportLoader {
    fn default() -> Self {
        ImportLoader {
            queue: ImportQueue::default(),
            loaders: HashMap::new(),
            default_loader: Box::new(YamlTaskLoader),
        }
    }
}

impl ImportLoader {
    pub fn new() -> Self {
        ImportLoader::default()
    }

    /// Register a loader for an extension. The extension is normalized to
    /// start with a `.`, so both `"yml"` and `".yml"` are accepted.
    pub fn register_loader(&mut self, extension: &str, loader: Box<dyn SourceLoader>) {
        self.loaders.insert(normalize_extension(extension), loader);
    }

    /// Replace the loader used when no registered extension matches
    pub fn set_default_loader(&mut self, loader: Box<dyn SourceLoader>) {
        self.default_loader = loader;
    }

    /// Queue a location for the next `load_pending` call
    pub fn add_import(&mut self, location: impl Into<String>) {
        self.queue.add(location);
    }

    /// Drain the pending queue, loading each not-yet-imported location.
    ///
    /// If a task is registered under a name equal to the location, it is
    /// invoked first, so a task can generate the very file being imported.
    pub fn load_pending(&mut self, registry: &mut TaskRegistry) -> HarrowResult<()> {
        while let Some(location) = self.queue.next() {
            if self.queue.is_imported(&location) {
                debug!(location = %location, "already imported, skipping");
                continue;
            }

            if let Some(producer) = registry.lookup(&location, None) {
                debug!(location = %location, task = producer.name(), "invoking producer task before import");
                invoke::invoke(registry, &producer, &TaskArgs::empty())?;
            }

            let loader = match location_extension(&location) {
                Some(ext) => self.loaders.get(&ext).unwrap_or(&self.default_loader),
                None => &self.default_loader,
            };

            debug!(location = %location, "loading");
            loader
                .load(Path::new(&location), registry, &mut self.queue)
                .map_err(|source| HarrowError::Import {
                    location: location.clone(),
                    source,
                })?;

            self.queue.mark_imported(location);
        }
        Ok(())
    }
}

fn normalize_extension(extension: &str) -> String {
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    }
}

fn location_extension(location: &str) -> Option<String> {
    Path::new(location)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
}

/// The built-in loader for YAML taskfiles, also the default loader
pub struct YamlTaskLoader;

impl SourceLoader for YamlTaskLoader {
    fn load(
        &self,
        location: &Path,
        registry: &mut TaskRegistry,
        queue: &mut ImportQueue,
    ) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(location)?;
        let config = parse_taskfile(&content)?;

        let scope = match &config.namespace {
            Some(namespace) => Scope::new(namespace.split(SCOPE_SEPARATOR)),
            None => Scope::root(),
        };

        // Relative imports resolve against the importing file's directory
        let base_dir = location.parent().unwrap_or_else(|| Path::new("."));
        for import in config.imports.unwrap_or_default() {
            let resolved = resolve_location(base_dir, &import);
            queue.add(resolved);
        }

        let runner = CommandRunner::new(base_dir.to_path_buf());
        for entry in config.tasks {
            let mut def = TaskDef::new(entry.name).in_scope(scope.clone());
            for prereq in entry.prerequisites.unwrap_or_default() {
                def = def.prerequisite(prereq);
            }
            for param in entry.params.unwrap_or_default() {
                def = def.param(param);
            }
            if let Some(description) = entry.description {
                def = def.describe(description);
            }
            match entry.command {
                Some(Command::Single(cmd)) => {
                    let runner = runner.clone();
                    def = def.action(move |task, args| runner.run_shell(&cmd, task, args));
                }
                Some(Command::Argv(argv)) => {
                    let runner = runner.clone();
                    def = def.action(move |task, args| runner.run_argv(&argv, task, args));
                }
                None => {}
            }
            for cmd in entry.commands.unwrap_or_default() {
                let runner = runner.clone();
                def = def.action(move |task, args| runner.run_shell(&cmd, task, args));
            }
            registry.define(def);
        }

        Ok(())
    }
}

fn resolve_location(base_dir: &Path, import: &str) -> String {
    let path = Path::new(import);
    if path.is_absolute() {
        import.to_string()
    } else {
        base_dir.join(path).to_string_lossy().into_owned()
    }
}
