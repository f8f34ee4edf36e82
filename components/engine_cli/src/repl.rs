//! Interactive debugger console

use crate::console::describe_location;
use crate::error::{CliError, CliResult};
use crate::runtime::Runtime;
use interpreter::{EngineState, Host, VM};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// A parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugCommand {
    /// Start or continue running
    Continue,
    /// Step into calls
    StepInto,
    /// Step over calls
    StepOver,
    /// Run until the current method returns
    StepOut,
    /// Toggle a breakpoint on a main program line
    Break(u32),
    /// Remove a breakpoint from a main program line
    Clear(u32),
    /// Show the locals of the current frame
    Locals,
    /// Show where execution stopped
    Where,
    /// Restart from the beginning
    Restart,
    /// Show the command list
    Help,
    /// Leave the console
    Quit,
}

impl DebugCommand {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or("");
        let line_argument = |word: Option<&str>| {
            word.and_then(|w| w.parse::<u32>().ok())
                .ok_or_else(|| format!("'{}' needs a line number", command))
        };
        Ok(match command {
            "c" | "continue" | "r" | "run" => DebugCommand::Continue,
            "s" | "step" => DebugCommand::StepInto,
            "n" | "next" => DebugCommand::StepOver,
            "o" | "out" => DebugCommand::StepOut,
            "b" | "break" => DebugCommand::Break(line_argument(words.next())?),
            "d" | "delete" => DebugCommand::Clear(line_argument(words.next())?),
            "l" | "locals" => DebugCommand::Locals,
            "w" | "where" => DebugCommand::Where,
            "restart" => DebugCommand::Restart,
            "h" | "help" => DebugCommand::Help,
            "q" | "quit" | "exit" => DebugCommand::Quit,
            other => return Err(format!("Unknown command: {}", other)),
        })
    }
}

/// Run the debugger console on a loaded VM
pub fn run_debugger<H: Host>(runtime: &Runtime, vm: &mut VM<H>) -> CliResult<()> {
    let mut editor = DefaultEditor::new()
        .map_err(|e| CliError::Console(format!("Failed to initialize editor: {}", e)))?;

    println!("Corten VM debugger. Type 'help' for commands.");

    loop {
        let line = match editor.readline("(dbg) ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(CliError::Console(format!("Readline error: {}", err))),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());

        let command = match DebugCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };
        if command == DebugCommand::Quit {
            break;
        }

        match execute(runtime, vm, &mut editor, command) {
            Ok(()) => {}
            Err(CliError::Runtime(error)) => println!("{}", error),
            Err(err) => println!("Error: {}", err),
        }
    }
    Ok(())
}

fn execute<H: Host>(
    runtime: &Runtime,
    vm: &mut VM<H>,
    editor: &mut DefaultEditor,
    command: DebugCommand,
) -> CliResult<()> {
    match command {
        DebugCommand::Continue => {
            if vm.state() == EngineState::Paused {
                vm.resume()?;
            } else {
                vm.start()?;
            }
        }
        DebugCommand::StepInto => vm.step_into()?,
        DebugCommand::StepOver => vm.step_over()?,
        DebugCommand::StepOut => vm.step_out()?,
        DebugCommand::Restart => {
            vm.stop();
            vm.start()?;
        }
        DebugCommand::Break(line) | DebugCommand::Clear(line) => {
            let enabled = matches!(command, DebugCommand::Break(_));
            let found = vm
                .main_program()
                .is_some_and(|main| main.set_breakpoint_at_line(line, enabled));
            if !found {
                println!("No statement on line {}", line);
            }
            return Ok(());
        }
        DebugCommand::Locals => {
            for (slot, value) in vm.frame().iter().enumerate() {
                println!("  #{} = {}", slot, vm.display(value));
            }
            return Ok(());
        }
        DebugCommand::Where => {
            let (module, position) = vm.program_pointer();
            println!("{}", describe_location(module.as_deref(), position));
            return Ok(());
        }
        DebugCommand::Help => {
            print_help();
            return Ok(());
        }
        DebugCommand::Quit => return Ok(()),
    }

    let mut read_input = || -> CliResult<String> {
        editor
            .readline("")
            .map_err(|e| CliError::Console(format!("Readline error: {}", e)))
    };
    if runtime.drive(vm, &mut read_input)? == EngineState::Done {
        println!("Program finished");
    }
    Ok(())
}

fn print_help() {
    println!("Debugger commands:");
    println!("  c, continue     Start or continue running");
    println!("  s, step         Step into calls");
    println!("  n, next         Step over calls");
    println!("  o, out          Run until the current method returns");
    println!("  b, break LINE   Set a breakpoint on a main program line");
    println!("  d, delete LINE  Remove a breakpoint");
    println!("  l, locals       Show the current frame");
    println!("  w, where        Show where execution stopped");
    println!("  restart         Run again from the beginning");
    println!("  q, quit         Leave the debugger");
}
