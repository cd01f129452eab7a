// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig, WorkflowConfig};
use crate::errors::{DirflowError, Result};
use crate::types::Op;
use crate::workflow::PathMatcher;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DirflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.pipeline, raw.workflow))
    }
}

pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_workflows(cfg)?;
    validate_pipeline_section(cfg)?;
    for (name, workflow) in cfg.workflow.iter() {
        validate_workflow(name, workflow)?;
    }
    Ok(())
}

fn ensure_has_workflows(cfg: &RawConfigFile) -> Result<()> {
    if cfg.workflow.is_empty() {
        return Err(DirflowError::ConfigError(
            "config must contain at least one [workflow.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_pipeline_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.latency_ms == 0 {
        return Err(DirflowError::ConfigError(
            "[pipeline].latency_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    for entry in &cfg.pipeline.recursive {
        if entry.path.as_os_str().is_empty() {
            return Err(DirflowError::ConfigError(
                "[[pipeline.recursive]] entry has an empty path".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_workflow(name: &str, wf: &WorkflowConfig) -> Result<()> {
    if wf.patterns.is_empty() && wf.globs.is_empty() {
        return Err(DirflowError::ConfigError(format!(
            "workflow '{name}' needs at least one entry in `patterns` or `globs`"
        )));
    }

    // Compile once here so bad patterns are reported at load time.
    let mut matcher = PathMatcher::new();
    for pattern in &wf.patterns {
        matcher.add_regex(pattern)?;
    }
    for glob in &wf.globs {
        matcher.add_glob(glob)?;
    }

    parse_ops(&wf.ops).map_err(|msg| {
        DirflowError::ConfigError(format!("workflow '{name}': {msg}"))
    })?;

    for (index, task) in wf.tasks.iter().enumerate() {
        validate_task(name, index, task)?;
    }
    Ok(())
}

fn validate_task(workflow: &str, index: usize, task: &TaskConfig) -> Result<()> {
    let problem = match task {
        TaskConfig::Shell { cmd, .. } | TaskConfig::Restart { cmd, .. }
            if cmd.trim().is_empty() =>
        {
            Some("`cmd` must not be empty")
        }
        TaskConfig::Copy { ext: None } | TaskConfig::Move { ext: None } => {
            Some("`ext` is required (the target would be the source itself)")
        }
        _ => None,
    };
    match problem {
        Some(problem) => Err(DirflowError::ConfigError(format!(
            "workflow '{workflow}' task #{index} ({}): {problem}",
            task.kind()
        ))),
        None => Ok(()),
    }
}

/// Fold operation names into a set. An empty list yields the empty set,
/// which workflows treat as "use the default".
pub fn parse_ops(names: &[String]) -> std::result::Result<Op, String> {
    names.iter().try_fold(Op::empty(), |acc, name| {
        name.parse::<Op>().map(|op| acc | op)
    })
}
