//! Command-line front end for the engine
//!
//! Loads JSON declaration files and program bundles, and exposes the
//! resolver, the VM and the debugger from a terminal.
//!
//! # Overview
//!
//! - `check`: resolve declarations, print diagnostics and a type summary
//! - `config`: validate an engine config file
//! - `run`: run a program bundle to completion
//! - `debug`: run a bundle under an interactive debugger console

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod console;
pub mod error;
pub mod repl;
pub mod runtime;

pub use cli::{Cli, Command, EngineArgs};
pub use console::ConsoleHost;
pub use error::{CliError, CliResult};
pub use runtime::{load_config, Bundle, CheckReport, Runtime};
