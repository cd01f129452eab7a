// src/pipeline/dispatch.rs

//! Consumer that matches events against workflows and runs them.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::exec::OutputSink;
use crate::types::Event;
use crate::workflow::{TaskInfo, Workflower};

/// Sinks and flags handed to every execution context.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub out: OutputSink,
    pub err: OutputSink,
    pub verbose: bool,
}

/// Offer one event to every workflow, in registration order. Each match
/// gets a fresh [`TaskInfo`] seeded with the event path. Returns the number
/// of workflows triggered.
pub async fn dispatch_event(
    workflows: &[Arc<dyn Workflower>],
    event: &Event,
    ctx: &DispatchContext,
) -> usize {
    let mut triggered = 0;
    for workflow in workflows {
        if !workflow.matches(&event.path, event.op) {
            continue;
        }
        debug!(workflow = %workflow.name(), %event, "workflow matched");
        let info = TaskInfo::new(
            event.path.clone(),
            ctx.out.clone(),
            ctx.err.clone(),
            ctx.verbose,
        );
        workflow.run(info).await;
        triggered += 1;
    }
    triggered
}

pub(crate) async fn dispatch_workflows(
    workflows: Arc<[Arc<dyn Workflower>]>,
    ctx: DispatchContext,
    mut events: mpsc::Receiver<Event>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = shutdown.changed() => break,
        };

        // A sequential workflow in flight is abandoned on stop.
        tokio::select! {
            _ = dispatch_event(&workflows, &event, &ctx) => {}
            _ = shutdown.changed() => break,
        }
    }
    debug!("workflow dispatcher finished");
}
