// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::TaskId;

/// Command-line arguments for `pinchy-live`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pinchy-live",
    version,
    about = "Follow live task runs, logs and notifications of a Pinchy server.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `pinchy-live.toml` in the current working directory. A
    /// missing file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "pinchy-live.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PINCHY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Open a live session until Ctrl-C.
    Watch {
        /// Open the log view of this task.
        #[arg(long, value_name = "ID")]
        task: Option<TaskId>,

        /// Reload the subscription list whenever a sync completes.
        #[arg(long)]
        subscriptions: bool,
    },

    /// Start a task and follow its log until the run is over.
    Run {
        #[arg(value_name = "TASK_ID")]
        task_id: TaskId,
    },

    /// Ask a task to stop, forcing it if it keeps running.
    Stop {
        #[arg(value_name = "TASK_ID")]
        task_id: TaskId,
    },

    /// Describe a cron expression and estimate its next occurrence.
    Cron {
        /// Five-field expression, e.g. "*/15 * * * *".
        #[arg(value_name = "EXPR")]
        expr: String,

        /// Reference time (`YYYY-MM-DD HH:MM:SS`); defaults to local now.
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
    },
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

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
