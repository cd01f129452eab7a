// tests/config_loading.rs

use std::fs;
use std::io::Write;

use dirflow::config::{build_pipeline, load_and_validate, TaskConfig};
use dirflow::errors::DirflowError;
use dirflow::types::{ConcurrencyMode, WatcherKind};
use dirflow_test_utils::builders::{ConfigFileBuilder, WorkflowConfigBuilder};
use tempfile::NamedTempFile;

#[test]
fn full_config_round_trips_into_a_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("assets/img")).unwrap();
    fs::create_dir_all(root.join("assets/.git")).unwrap();

    let config_path = root.join("Dirflow.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[pipeline]
name = "site"
watcher = "portable"
latency_ms = 100
watch = ["{src}"]

[[pipeline.recursive]]
path = "{assets}"

[workflow.css]
concurrency = "concurrent"
ops = ["create", "write"]
patterns = ['\.scss$']

[[workflow.css.task]]
kind = "shell"
cmd = "sassc"
args = ["--style", "compressed"]
ext = "css"

[workflow.cleanup]
globs = ["**/*.tmp"]

[[workflow.cleanup.task]]
kind = "remove"
"#,
            src = root.join("src").display(),
            assets = root.join("assets").display(),
        ),
    )
    .unwrap();

    let cfg = load_and_validate(&config_path).unwrap();
    assert_eq!(cfg.pipeline.name, "site");
    assert_eq!(cfg.pipeline.watcher, WatcherKind::Portable);
    assert!(cfg.pipeline.recursive[0].ignore_hidden);
    assert_eq!(cfg.workflow["css"].concurrency, ConcurrencyMode::Concurrent);
    assert_eq!(
        cfg.workflow["css"].tasks[0],
        TaskConfig::Shell {
            cmd: "sassc".to_string(),
            args: vec!["--style".to_string(), "compressed".to_string()],
            ext: Some("css".to_string()),
        }
    );

    let pipeline = build_pipeline(&cfg, false).unwrap();
    assert_eq!(pipeline.name(), "site");
    assert_eq!(pipeline.workflow_count(), 2);
    assert_eq!(
        pipeline.watches(),
        vec![root.join("src"), root.join("assets"), root.join("assets/img")]
    );
}

#[test]
fn unknown_task_kind_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[workflow.a]
patterns = ['x']

[[workflow.a.task]]
kind = "go"
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(DirflowError::TomlError(_)) => {}
        other => panic!("Expected TomlError, got: {:?}", other),
    }
}

#[test]
fn shell_task_without_command_is_a_config_error() {
    let raw = ConfigFileBuilder::new()
        .with_workflow("a", WorkflowConfigBuilder::new("x").shell("  ", &[]).build())
        .raw();

    match dirflow::config::ConfigFile::try_from(raw) {
        Err(DirflowError::ConfigError(msg)) => {
            assert!(msg.contains("shell"));
            assert!(msg.contains("cmd"));
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn missing_watch_directory_fails_the_build() {
    let cfg = ConfigFileBuilder::new()
        .watch("/definitely/not/here")
        .with_workflow("a", WorkflowConfigBuilder::new("x").build())
        .build();

    let err = build_pipeline(&cfg, false).unwrap_err();
    assert!(matches!(err, DirflowError::PathNotFound(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_and_validate("/no/such/Dirflow.toml").unwrap_err();
    assert!(matches!(err, DirflowError::IoError(_)));
}
