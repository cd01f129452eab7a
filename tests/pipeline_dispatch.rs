// tests/pipeline_dispatch.rs

mod common;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use common::{wait_until, with_timeout, Harness, RecordingTask};
use dirflow::fs::mock::MockFileSystem;
use dirflow::path::ext_transformer;
use dirflow::types::{ConcurrencyMode, Event, Op};
use dirflow::workflow::Workflow;

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_dir("/proj/src");
    fs
}

#[tokio::test]
async fn events_reach_matching_workflows_only() {
    let h = Harness::new(project());
    h.pipeline.watch("src").unwrap();

    let txt = RecordingTask::new();
    let md = RecordingTask::new();
    h.pipeline
        .add_workflow(Workflow::new("txt", [r"\.txt$"]).unwrap().with_task(txt.clone()));
    h.pipeline.add_workflow(
        Workflow::new("md", [r"\.md$"])
            .unwrap()
            .with_ops(Op::CREATE)
            .with_task(md.clone()),
    );

    let runner = h.start().await;
    h.watcher
        .emit(vec![
            Event::new("/proj/src/a.txt", Op::WRITE),
            Event::new("/proj/src/b.md", Op::WRITE),
            Event::new("/proj/src/c.txt", Op::CHMOD),
        ])
        .await;
    h.watcher
        .emit(vec![Event::new("/proj/src/d.md", Op::CREATE)])
        .await;

    let (t, m) = (txt.clone(), md.clone());
    wait_until(move || t.calls() == 1 && m.calls() == 1).await;

    h.pipeline.stop().unwrap();
    with_timeout(runner).await.unwrap().unwrap();

    assert_eq!(txt.sources(), vec![PathBuf::from("/proj/src/a.txt")]);
    assert_eq!(md.sources(), vec![PathBuf::from("/proj/src/d.md")]);
}

#[tokio::test]
async fn one_event_can_trigger_several_workflows_in_order() {
    let h = Harness::new(project());
    let first = RecordingTask::new();
    let second = RecordingTask::new();
    h.pipeline
        .add_workflow(Workflow::new("all", [r".*"]).unwrap().with_task(first.clone()));
    h.pipeline
        .add_workflow(Workflow::new("rs", [r"\.rs$"]).unwrap().with_task(second.clone()));

    let triggered = h
        .pipeline
        .dispatch(&Event::new("/proj/src/lib.rs", Op::CREATE))
        .await;

    assert_eq!(triggered, 2);
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
}

#[tokio::test]
async fn failing_task_aborts_the_rest_of_the_chain() {
    let h = Harness::new(project());
    let compile = RecordingTask::new().with_transform(ext_transformer("o"));
    let link = RecordingTask::new().failing();
    let package = RecordingTask::new();
    h.pipeline.add_workflow(
        Workflow::new("build", [r"\.c$"])
            .unwrap()
            .with_task(compile.clone())
            .with_task(link.clone())
            .with_task(package.clone()),
    );

    h.pipeline
        .dispatch(&Event::new("/proj/src/main.c", Op::WRITE))
        .await;

    assert_eq!(compile.sources(), vec![PathBuf::from("/proj/src/main.c")]);
    assert_eq!(link.sources(), vec![PathBuf::from("/proj/src/main.o")]);
    assert_eq!(package.calls(), 0);

    let errors = h.err.contents();
    assert!(errors.contains("Workflow did not complete for /proj/src/main.o"));
}

#[tokio::test]
async fn verbose_runs_print_a_banner() {
    let h = Harness::verbose(project());
    h.pipeline
        .add_workflow(Workflow::new("txt", [r"\.txt$"]).unwrap().with_task(RecordingTask::new()));

    h.pipeline
        .dispatch(&Event::new("/proj/src/a.txt", Op::WRITE))
        .await;

    assert!(h
        .out
        .contents()
        .contains("> Running workflow txt for /proj/src/a.txt"));
}

#[tokio::test]
async fn concurrent_workflows_do_not_block_dispatch() {
    let h = Harness::new(project());
    let slow = RecordingTask::new().with_delay(Duration::from_secs(1));
    h.pipeline.add_workflow(
        Workflow::new("slow", [r".*"])
            .unwrap()
            .with_concurrency(ConcurrencyMode::Concurrent)
            .with_task(slow.clone()),
    );

    let begin = Instant::now();
    h.pipeline.dispatch(&Event::new("/proj/src/a", Op::WRITE)).await;
    h.pipeline.dispatch(&Event::new("/proj/src/b", Op::WRITE)).await;
    assert!(begin.elapsed() < Duration::from_millis(500));

    let done = slow.clone();
    wait_until(move || done.completed() == 2).await;
    assert_eq!(slow.calls(), 2);
}

#[tokio::test]
async fn sequential_workflows_block_dispatch() {
    let h = Harness::new(project());
    let slow = RecordingTask::new().with_delay(Duration::from_millis(200));
    h.pipeline
        .add_workflow(Workflow::new("slow", [r".*"]).unwrap().with_task(slow.clone()));

    h.pipeline.dispatch(&Event::new("/proj/src/a", Op::WRITE)).await;
    assert_eq!(slow.completed(), 1);
}
