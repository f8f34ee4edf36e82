//! Error types for the CLI

use core_types::RuntimeError;
use interpreter::EngineError;

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// File I/O error
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed declaration, bundle or config file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Resolution reported errors; nothing was run
    #[error("{0} resolution error(s)")]
    Resolution(usize),

    /// The engine refused an operation
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// The program faulted
    #[error("{0}")]
    Runtime(RuntimeError),

    /// Debugger console error
    #[error("Console error: {0}")]
    Console(String),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
