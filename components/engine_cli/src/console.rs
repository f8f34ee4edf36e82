//! Terminal host for `run` and `debug`

use core_types::{SourcePosition, Value};
use interpreter::Host;
use std::io::Write;

/// Host printing to standard output.
///
/// Halts and input prompts are shown inline; external calls have no
/// backing service and are only logged.
#[derive(Debug, Default)]
pub struct ConsoleHost;

impl Host for ConsoleHost {
    fn print(&mut self, text: &str, newline: bool) {
        if newline {
            println!("{}", text);
        } else {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
    }

    fn show_program_pointer(&mut self, module: Option<&str>, position: Option<SourcePosition>) {
        println!("{}", describe_location(module, position));
    }

    fn request_input(&mut self, prompt: &str) {
        print!("{} ", prompt);
        let _ = std::io::stdout().flush();
    }

    fn external_call(&mut self, arguments: Vec<Value>) {
        tracing::warn!(?arguments, "external call without a backing service");
    }
}

/// `stopped at Main.java 12:5` style location line
pub fn describe_location(module: Option<&str>, position: Option<SourcePosition>) -> String {
    match (module, position) {
        (Some(module), Some(pos)) => format!("stopped at {} {}", module, pos),
        (None, Some(pos)) => format!("stopped at {}", pos),
        (Some(module), None) => format!("stopped in {}", module),
        (None, None) => "not running".to_string(),
    }
}
