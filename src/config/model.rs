// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{ConcurrencyMode, WatcherKind};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [pipeline]
/// name = "site"
/// watch = ["src"]
///
/// [[pipeline.recursive]]
/// path = "assets"
///
/// [workflow.css]
/// patterns = ['\.scss$']
///
/// [[workflow.css.task]]
/// kind = "shell"
/// cmd = "sassc"
/// ext = "css"
/// ```
///
/// Deserialization only checks shape; see [`ConfigFile`] for the validated
/// form.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// All workflows from `[workflow.<name>]`, keyed by name. Workflows are
    /// registered in key order.
    #[serde(default)]
    pub workflow: BTreeMap<String, WorkflowConfig>,
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub pipeline: PipelineSection,
    pub workflow: BTreeMap<String, WorkflowConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        pipeline: PipelineSection,
        workflow: BTreeMap<String, WorkflowConfig>,
    ) -> Self {
        Self { pipeline, workflow }
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_pipeline_name")]
    pub name: String,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub watcher: WatcherKind,

    /// Batch window in milliseconds.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Directories watched non-recursively.
    #[serde(default)]
    pub watch: Vec<PathBuf>,

    #[serde(default)]
    pub recursive: Vec<RecursiveWatchConfig>,
}

fn default_pipeline_name() -> String {
    crate::pipeline::UNNAMED.to_string()
}

fn default_latency_ms() -> u64 {
    300
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            name: default_pipeline_name(),
            verbose: false,
            watcher: WatcherKind::default(),
            latency_ms: default_latency_ms(),
            watch: Vec::new(),
            recursive: Vec::new(),
        }
    }
}

/// One `[[pipeline.recursive]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RecursiveWatchConfig {
    pub path: PathBuf,

    #[serde(default = "default_ignore_hidden")]
    pub ignore_hidden: bool,
}

fn default_ignore_hidden() -> bool {
    true
}

/// `[workflow.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub concurrency: ConcurrencyMode,

    /// Operation names (`create`, `write`, ...). Empty means the default set.
    #[serde(default)]
    pub ops: Vec<String>,

    /// Regular expressions matched against the full event path.
    #[serde(default)]
    pub patterns: Vec<String>,

    #[serde(default)]
    pub globs: Vec<String>,

    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskConfig>,
}

/// One `[[workflow.<name>.task]]` entry, tagged by `kind`.
///
/// `ext`, where present, replaces the source extension to form the task's
/// target; without it the target is the source itself.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskConfig {
    Shell {
        cmd: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        ext: Option<String>,
    },
    Cat {
        #[serde(default)]
        ext: Option<String>,
    },
    /// Needs `ext`: copying a file onto itself is rejected.
    Copy {
        #[serde(default)]
        ext: Option<String>,
    },
    Move {
        #[serde(default)]
        ext: Option<String>,
    },
    Remove {
        #[serde(default)]
        ext: Option<String>,
    },
    Mkdir {
        #[serde(default)]
        ext: Option<String>,
    },
    Restart {
        cmd: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl TaskConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            TaskConfig::Shell { .. } => "shell",
            TaskConfig::Cat { .. } => "cat",
            TaskConfig::Copy { .. } => "copy",
            TaskConfig::Move { .. } => "move",
            TaskConfig::Remove { .. } => "remove",
            TaskConfig::Mkdir { .. } => "mkdir",
            TaskConfig::Restart { .. } => "restart",
        }
    }
}
