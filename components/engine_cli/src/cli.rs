//! Command-line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Type checker, runner and debugger for compiled teaching-language programs
#[derive(Debug, Parser)]
#[command(name = "corten-vm", version, about)]
pub struct Cli {
    /// Log filter (`error`, `warn`, `info`, `debug`, `trace` or a full
    /// `RUST_LOG` directive); overrides `RUST_LOG`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a declaration file and report diagnostics and types
    Check {
        /// JSON array of module declarations
        file: PathBuf,
    },

    /// Validate an engine config file and print the effective settings
    Config {
        /// JSON config file; defaults are printed when omitted
        file: Option<PathBuf>,
    },

    /// Run a program bundle to completion
    Run {
        /// JSON bundle with `modules` and a `main` program
        file: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Run a program bundle under the interactive debugger
    Debug {
        /// JSON bundle with `modules` and a `main` program
        file: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Engine settings shared by `run` and `debug`
#[derive(Debug, Clone, Default, clap::Args)]
pub struct EngineArgs {
    /// JSON engine config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Execution speed in steps per second; unlimited when omitted
    #[arg(short, long)]
    pub speed: Option<u32>,
}
