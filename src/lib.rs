// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod path;
pub mod pipeline;
pub mod types;
pub mod watch;
pub mod workflow;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{build_pipeline, load_and_validate, ConfigFile, TaskConfig};

pub use crate::errors::DirflowError;
pub use crate::pipeline::PipelineOptions;
pub use crate::types::{Event, Op};
pub use crate::workflow::{Workflow, Workflower};

/// High-level entry point used by `main.rs`: load the config, build the
/// pipeline, stop it on Ctrl-C and run it until then.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let pipeline = Arc::new(build_pipeline(&cfg, args.verbose)?);

    {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received, stopping pipeline");
            if let Err(e) = pipeline.stop() {
                warn!(error = %e, "stop after Ctrl+C failed");
            }
        });
    }

    pipeline.start().await?;
    Ok(())
}

fn print_dry_run(cfg: &ConfigFile) {
    let p = &cfg.pipeline;
    println!("dirflow dry-run");
    println!("  pipeline.name = {}", p.name);
    println!("  pipeline.watcher = {:?}", p.watcher);
    println!("  pipeline.latency_ms = {}", p.latency_ms);
    if !p.watch.is_empty() {
        println!("  pipeline.watch = {:?}", p.watch);
    }
    for entry in &p.recursive {
        println!(
            "  pipeline.recursive = {} (ignore_hidden: {})",
            entry.path.display(),
            entry.ignore_hidden
        );
    }
    println!();

    println!("workflows ({}):", cfg.workflow.len());
    for (name, wf) in cfg.workflow.iter() {
        println!("  - {name} ({:?})", wf.concurrency);
        if !wf.ops.is_empty() {
            println!("      ops: {:?}", wf.ops);
        }
        if !wf.patterns.is_empty() {
            println!("      patterns: {:?}", wf.patterns);
        }
        if !wf.globs.is_empty() {
            println!("      globs: {:?}", wf.globs);
        }
        for task in &wf.tasks {
            match task {
                TaskConfig::Shell { cmd, args, .. } | TaskConfig::Restart { cmd, args } => {
                    println!("      {}: {cmd} {}", task.kind(), args.join(" "));
                }
                other => println!("      {}", other.kind()),
            }
        }
    }

    debug!("dry-run complete (no watching)");
}
