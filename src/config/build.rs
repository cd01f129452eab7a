// src/config/build.rs

//! Turn a validated [`ConfigFile`] into a ready-to-start [`Pipeline`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::model::{ConfigFile, PipelineSection, TaskConfig, WorkflowConfig};
use crate::config::validate::parse_ops;
use crate::errors::{DirflowError, Result};
use crate::exec::{cat_task, copy_task, mkdir_task, move_task, remove_task, RestartTask, ShellTask};
use crate::path::{ext_transformer, identity, Transformer};
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::workflow::{Tasker, Workflow};

/// Options from `[pipeline]`; `verbose` from the CLI wins when set.
pub fn pipeline_options(section: &PipelineSection, verbose_override: bool) -> PipelineOptions {
    PipelineOptions {
        verbose: verbose_override || section.verbose,
        batch_latency: Duration::from_millis(section.latency_ms),
        watcher_kind: section.watcher,
        ..PipelineOptions::default()
    }
}

pub fn build_pipeline(cfg: &ConfigFile, verbose_override: bool) -> Result<Pipeline> {
    let pipeline = Pipeline::new(
        cfg.pipeline.name.clone(),
        pipeline_options(&cfg.pipeline, verbose_override),
    );
    register(&pipeline, cfg)?;
    Ok(pipeline)
}

/// Register the config's watches and workflows on an existing pipeline.
pub fn register(pipeline: &Pipeline, cfg: &ConfigFile) -> Result<()> {
    for dir in &cfg.pipeline.watch {
        pipeline.watch(dir)?;
    }
    for entry in &cfg.pipeline.recursive {
        pipeline.watch_recursive(&entry.path, entry.ignore_hidden)?;
    }
    for (name, wf) in &cfg.workflow {
        pipeline.add_workflow(build_workflow(name, wf)?);
    }
    info!(
        pipeline = %pipeline.name(),
        watches = pipeline.watches().len(),
        workflows = pipeline.workflow_count(),
        "pipeline configured"
    );
    Ok(())
}

pub fn build_workflow(name: &str, cfg: &WorkflowConfig) -> Result<Workflow> {
    let ops = parse_ops(&cfg.ops)
        .map_err(|msg| DirflowError::ConfigError(format!("workflow '{name}': {msg}")))?;

    let mut workflow = Workflow::new(name, &cfg.patterns)?
        .with_ops(ops)
        .with_concurrency(cfg.concurrency);
    for glob in &cfg.globs {
        workflow.add_glob(glob)?;
    }
    for task in &cfg.tasks {
        workflow.add_shared_task(build_task(task));
    }
    debug!(workflow = %name, tasks = workflow.task_count(), ops = %workflow.ops(), "workflow built");
    Ok(workflow)
}

pub fn build_task(cfg: &TaskConfig) -> Arc<dyn Tasker> {
    match cfg {
        TaskConfig::Shell { cmd, args, ext } => {
            Arc::new(ShellTask::new(cmd.clone(), args.clone()).with_transform(transformer(ext)))
        }
        TaskConfig::Cat { ext } => Arc::new(cat_task(transformer(ext))),
        TaskConfig::Copy { ext } => Arc::new(copy_task(transformer(ext))),
        TaskConfig::Move { ext } => Arc::new(move_task(transformer(ext))),
        TaskConfig::Remove { ext } => Arc::new(remove_task(transformer(ext))),
        TaskConfig::Mkdir { ext } => Arc::new(mkdir_task(transformer(ext))),
        TaskConfig::Restart { cmd, args } => Arc::new(RestartTask::new(cmd.clone(), args.clone())),
    }
}

fn transformer(ext: &Option<String>) -> Transformer {
    match ext {
        Some(ext) => ext_transformer(ext.clone()),
        None => identity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RawConfigFile;
    use crate::types::{ConcurrencyMode, Op};
    use crate::workflow::Workflower;
    use std::path::Path;

    fn config(src: &str) -> ConfigFile {
        let raw: RawConfigFile = toml::from_str(src).unwrap();
        ConfigFile::try_from(raw).unwrap()
    }

    #[test]
    fn workflow_honours_ops_globs_and_concurrency() {
        let cfg = config(
            r#"
[workflow.assets]
concurrency = "concurrent"
ops = ["create"]
patterns = ['\.scss$']
globs = ["**/*.sass"]

[[workflow.assets.task]]
kind = "shell"
cmd = "sassc"
ext = "css"

[[workflow.assets.task]]
kind = "remove"
"#,
        );
        let wf = build_workflow("assets", &cfg.workflow["assets"]).unwrap();

        assert_eq!(wf.ops(), Op::CREATE);
        assert_eq!(wf.concurrency(), ConcurrencyMode::Concurrent);
        assert_eq!(wf.task_count(), 2);
        assert!(wf.matches(Path::new("/web/a.scss"), Op::CREATE));
        assert!(wf.matches(Path::new("/web/deep/b.sass"), Op::CREATE));
        assert!(!wf.matches(Path::new("/web/a.scss"), Op::WRITE));
    }

    #[test]
    fn cli_verbose_overrides_file() {
        let section = PipelineSection::default();
        assert!(pipeline_options(&section, true).verbose);
        assert!(!pipeline_options(&section, false).verbose);
        assert_eq!(
            pipeline_options(&section, false).batch_latency,
            Duration::from_millis(300)
        );
    }
}
