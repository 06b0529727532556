//! Command execution utilities
//!
//! A unified interface for running the shell commands behind taskfile
//! actions: consistent working directory, environment and exit-status
//! handling.

use std::path::PathBuf;
use std::process::Command;

use anyhow::anyhow;

use crate::task::{Task, TaskArgs};

/// Runs shell commands and argv-style commands on behalf of task actions
#[derive(Debug, Clone)]
pub struct CommandRunner {
    workdir: PathBuf,
}

impl CommandRunner {
    pub fn new(workdir: PathBuf) -> Self {
        Self { workdir }
    }

    /// Execute a command with common setup and error handling
    fn run(&self, command: &mut Command, task: &Task, args: &TaskArgs) -> anyhow::Result<()> {
        command.current_dir(&self.workdir);
        command.env("HARROW_TASK", task.name());
        for (i, value) in args.values().iter().enumerate() {
            command.env(format!("HARROW_ARG_{}", i), value);
        }

        let status = command
            .status()
            .map_err(|e| anyhow!("failed to spawn command for task '{}': {}", task.name(), e))?;

        if !status.success() {
            return Err(anyhow!(
                "command for task '{}' exited with status {}",
                task.name(),
                status.code().unwrap_or(-1)
            ));
        }

        Ok(())
    }

    /// Execute a single shell command line
    pub fn run_shell(&self, cmd: &str, task: &Task, args: &TaskArgs) -> anyhow::Result<()> {
        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd);
        self.run(&mut command, task, args)
    }

    /// Execute an executable with explicit arguments
    pub fn run_argv(&self, argv: &[String], task: &Task, args: &TaskArgs) -> anyhow::Result<()> {
        let program = argv
            .first()
            .ok_or_else(|| anyhow!("empty command for task '{}'", task.name()))?;
        let mut command = Command::new(program);
        command.args(&argv[1..]);
        self.run(&mut command, task, args)
    }
}
