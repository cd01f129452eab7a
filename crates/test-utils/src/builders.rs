#![allow(dead_code)]

use std::path::PathBuf;

use dirflow::config::{
    ConfigFile, RawConfigFile, RecursiveWatchConfig, TaskConfig, WorkflowConfig,
};
use dirflow::types::ConcurrencyMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.pipeline.name = name.to_string();
        self
    }

    pub fn watch(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pipeline.watch.push(dir.into());
        self
    }

    pub fn recursive(mut self, dir: impl Into<PathBuf>, ignore_hidden: bool) -> Self {
        self.config.pipeline.recursive.push(RecursiveWatchConfig {
            path: dir.into(),
            ignore_hidden,
        });
        self
    }

    pub fn with_workflow(mut self, name: &str, workflow: WorkflowConfig) -> Self {
        self.config.workflow.insert(name.to_string(), workflow);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `WorkflowConfig`.
pub struct WorkflowConfigBuilder {
    workflow: WorkflowConfig,
}

impl WorkflowConfigBuilder {
    pub fn new(pattern: &str) -> Self {
        Self {
            workflow: WorkflowConfig {
                patterns: vec![pattern.to_string()],
                ..WorkflowConfig::default()
            },
        }
    }

    pub fn glob(mut self, glob: &str) -> Self {
        self.workflow.globs.push(glob.to_string());
        self
    }

    pub fn op(mut self, op: &str) -> Self {
        self.workflow.ops.push(op.to_string());
        self
    }

    pub fn concurrent(mut self) -> Self {
        self.workflow.concurrency = ConcurrencyMode::Concurrent;
        self
    }

    pub fn shell(mut self, cmd: &str, args: &[&str]) -> Self {
        self.workflow.tasks.push(TaskConfig::Shell {
            cmd: cmd.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            ext: None,
        });
        self
    }

    pub fn task(mut self, task: TaskConfig) -> Self {
        self.workflow.tasks.push(task);
        self
    }

    pub fn build(self) -> WorkflowConfig {
        self.workflow
    }
}
