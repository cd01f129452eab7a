// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dirflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dirflow",
    version,
    about = "Watch directories and run workflows on matching file changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Dirflow.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DIRFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the pipeline, but don't watch anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print watch activity and workflow banners (overrides the config).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["dirflow"]).unwrap();
        assert_eq!(args.config, "Dirflow.toml");
        assert!(!args.dry_run);
        assert!(!args.verbose);
        assert!(args.log_level.is_none());
    }

    #[test]
    fn flags() {
        let args = CliArgs::try_parse_from([
            "dirflow",
            "--config",
            "site.toml",
            "--log-level",
            "debug",
            "--dry-run",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.config, "site.toml");
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.dry_run && args.verbose);
    }
}
