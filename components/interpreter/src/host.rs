//! The host side of the engine: console, input and external operations.

use core_types::{SourcePosition, Value};

/// Services the embedding environment provides to the engine.
///
/// Only `print` is mandatory; a host without an editor or input field can
/// ignore the rest.
pub trait Host {
    /// Write to the console
    fn print(&mut self, text: &str, newline: bool);

    /// Highlight the statement the engine halted at
    fn show_program_pointer(&mut self, _module: Option<&str>, _position: Option<SourcePosition>) {}

    /// Ask the user for input; answer with `VM::resolve_input`
    fn request_input(&mut self, _prompt: &str) {}

    /// Start an external operation; answer with `VM::resolve_external`
    fn external_call(&mut self, _arguments: Vec<Value>) {}
}

/// Host writing to standard output
#[derive(Debug, Default)]
pub struct StdoutHost;

impl Host for StdoutHost {
    fn print(&mut self, text: &str, newline: bool) {
        if newline {
            println!("{}", text);
        } else {
            print!("{}", text);
        }
    }

    fn request_input(&mut self, prompt: &str) {
        tracing::info!(prompt, "input requested");
    }
}

/// Host that records every interaction, for tests and headless runs
#[derive(Debug, Default)]
pub struct RecordingHost {
    /// Everything printed
    pub output: String,
    /// Prompts of input requests
    pub prompts: Vec<String>,
    /// Positions reported through `show_program_pointer`
    pub pointers: Vec<Option<SourcePosition>>,
    /// Arguments of external calls
    pub external_calls: Vec<Vec<Value>>,
}

impl RecordingHost {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Printed lines
    pub fn lines(&self) -> Vec<&str> {
        self.output.lines().collect()
    }
}

impl Host for RecordingHost {
    fn print(&mut self, text: &str, newline: bool) {
        self.output.push_str(text);
        if newline {
            self.output.push('\n');
        }
    }

    fn show_program_pointer(&mut self, _module: Option<&str>, position: Option<SourcePosition>) {
        self.pointers.push(position);
    }

    fn request_input(&mut self, prompt: &str) {
        self.prompts.push(prompt.to_string());
    }

    fn external_call(&mut self, arguments: Vec<Value>) {
        self.external_calls.push(arguments);
    }
}
