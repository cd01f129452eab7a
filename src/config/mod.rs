// src/config/mod.rs

//! Configuration for the `dirflow` binary.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a file from disk.
//! - `validate.rs`: semantic checks (`RawConfigFile` -> `ConfigFile`).
//! - `build.rs`: turning a validated config into a [`Pipeline`](crate::pipeline::Pipeline).

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::{build_pipeline, build_task, build_workflow};
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, PipelineSection, RawConfigFile, RecursiveWatchConfig, TaskConfig, WorkflowConfig,
};
pub use validate::{parse_ops, validate_config};
