use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::HarrowResult;

/// A task's command: either one shell line or an executable with arguments
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Command {
    Single(String),
    Argv(Vec<String>),
}

/// One task entry in a taskfile
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskEntry {
    pub name: String,
    pub description: Option<String>,
    pub prerequisites: Option<Vec<String>>,
    /// Declared positional parameter names, bound to bracketed target
    /// arguments in order
    pub params: Option<Vec<String>>,
    /// A single command, one action block
    pub command: Option<Command>,
    /// Several shell commands, one action block each
    pub commands: Option<Vec<String>>,
}

/// A whole taskfile
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskfileConfig {
    /// Namespace applied to every task in this file, `:`-separated for
    /// nesting
    pub namespace: Option<String>,
    pub description: Option<String>,
    pub tasks: Vec<TaskEntry>,
    /// Further source locations to enqueue for import
    pub imports: Option<Vec<String>>,
}

pub fn parse_taskfile(yaml_str: &str) -> HarrowResult<TaskfileConfig> {
    let config: TaskfileConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_taskfile() {
        let yaml = r#"
namespace: build
imports:
  - generated.yml
tasks:
  - name: compile
    description: Compile the project
    prerequisites: [deps]
    params: [profile]
    command: cargo build
  - name: package
    commands:
      - tar -czf out.tgz target
      - sha256sum out.tgz
"#;
        let config = parse_taskfile(yaml).unwrap();
        assert_eq!(config.namespace.as_deref(), Some("build"));
        assert_eq!(config.imports.as_deref(), Some(&["generated.yml".to_string()][..]));
        assert_eq!(config.tasks.len(), 2);
        assert!(matches!(config.tasks[0].command, Some(Command::Single(_))));
        assert_eq!(config.tasks[1].commands.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn argv_commands_parse_from_a_sequence() {
        let yaml = r#"
tasks:
  - name: release
    command: ["./scripts/release.sh", "--fast"]
"#;
        let config = parse_taskfile(yaml).unwrap();
        match &config.tasks[0].command {
            Some(Command::Argv(argv)) => assert_eq!(argv.len(), 2),
            other => panic!("expected argv command, got {:?}", other),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = r#"
tasks:
  - name: compile
    retries: 3
"#;
        assert!(parse_taskfile(yaml).is_err());
    }
}
