use thiserror::Error;

/// The main error type for Harrow operations
#[derive(Debug, Error)]
pub enum HarrowError {
    #[error("no such task: '{0}'")]
    UnknownTask(String),

    #[error("cannot resolve prerequisite '{name}' of task '{task}'")]
    Resolution { task: String, name: String },

    #[error("task '{task}' failed: {source}")]
    Action {
        task: String,
        /// Invocation chain, innermost task first. Each enclosing invoke
        /// frame appends its own task name while the error bubbles up.
        chain: Vec<String>,
        #[source]
        source: anyhow::Error,
    },

    #[error("import of '{location}' failed: {source}")]
    Import {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("scheduler invariant violated: {0}")]
    Scheduling(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl HarrowError {
    /// Record `task` as an enclosing frame of a failing invocation.
    ///
    /// Only action failures carry a chain; every other kind passes through
    /// untouched.
    pub fn with_frame(mut self, task: &str) -> Self {
        if let HarrowError::Action { chain, .. } = &mut self {
            chain.push(task.to_string());
        }
        self
    }

    /// The invocation chain of an action failure, innermost task first.
    pub fn chain(&self) -> &[String] {
        match self {
            HarrowError::Action { chain, .. } => chain,
            _ => &[],
        }
    }
}

/// Result type alias for Harrow operations
pub type HarrowResult<T> = Result<T, HarrowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_frame_grows_action_chain() {
        let err = HarrowError::Action {
            task: "compile".to_string(),
            chain: vec!["compile".to_string()],
            source: anyhow::anyhow!("boom"),
        };
        let err = err.with_frame("test").with_frame("all");
        assert_eq!(err.chain(), &["compile", "test", "all"]);
    }

    #[test]
    fn with_frame_leaves_other_kinds_alone() {
        let err = HarrowError::UnknownTask("deploy".to_string()).with_frame("all");
        assert!(err.chain().is_empty());
        assert!(err.to_string().contains("deploy"));
    }
}
