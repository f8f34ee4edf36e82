//! Runtime orchestration for the CLI
//!
//! The Runtime ties the components together:
//! - Resolver for declaration files
//! - VM for running program bundles
//! - Engine config loading and overrides

use crate::cli::EngineArgs;
use crate::error::{CliError, CliResult};
use bytecode_system::Program;
use interpreter::{EngineConfig, EngineState, Host, VM};
use resolver::ast::ModuleDecl;
use resolver::{resolve, Resolution};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufRead;
use std::path::Path;
use std::time::{Duration, Instant};
use type_model::TypeKind;

/// A runnable program: the declarations plus the main program.
///
/// Method bodies and initializers travel inside the declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bundle {
    /// Declared modules, in load order
    #[serde(default)]
    pub modules: Vec<ModuleDecl>,
    /// The main program
    pub main: Program,
}

/// Outcome of `check`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// One line per diagnostic, in module and stage order
    pub diagnostics: Vec<String>,
    /// One line per declared type and generic variant
    pub types: Vec<String>,
    /// Number of error-severity diagnostics
    pub error_count: usize,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.diagnostics {
            writeln!(f, "{}", line)?;
        }
        writeln!(f, "Types:")?;
        for line in &self.types {
            writeln!(f, "  {}", line)?;
        }
        write!(
            f,
            "{} error(s), {} warning(s)",
            self.error_count,
            self.diagnostics.len() - self.error_count
        )
    }
}

/// Read an engine config file; `None` yields the defaults
pub fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(EngineConfig::from_json(&text)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Main runtime driving resolution and execution
#[derive(Debug, Clone, Default)]
pub struct Runtime {
    config: EngineConfig,
}

impl Runtime {
    /// Create a runtime with the given engine config
    ///
    /// # Example
    /// ```
    /// use engine_cli::Runtime;
    /// use interpreter::EngineConfig;
    ///
    /// let runtime = Runtime::new(EngineConfig::default());
    /// assert_eq!(runtime.config().max_call_depth, 10_000);
    /// ```
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Create a runtime from `--config`/`--speed`
    pub fn from_args(args: &EngineArgs) -> CliResult<Self> {
        let mut config = load_config(args.config.as_deref())?;
        if args.speed.is_some() {
            config.steps_per_second = args.speed;
        }
        Ok(Self::new(config))
    }

    /// Effective engine config
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve a JSON declaration file
    pub fn check_file(path: &Path) -> CliResult<CheckReport> {
        let text = std::fs::read_to_string(path)?;
        let modules: Vec<ModuleDecl> = serde_json::from_str(&text)?;
        Ok(Self::check(modules))
    }

    /// Resolve declarations and summarize the result
    pub fn check(modules: Vec<ModuleDecl>) -> CheckReport {
        let resolution = resolve(modules);
        CheckReport {
            diagnostics: diagnostic_lines(&resolution),
            types: type_lines(&resolution),
            error_count: resolution.diagnostics.error_count(),
        }
    }

    /// Read a JSON program bundle
    pub fn load_bundle(path: &Path) -> CliResult<Bundle> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Resolve a bundle and load its main program into a fresh VM.
    ///
    /// Resolution errors are printed to stderr and nothing is loaded.
    pub fn instantiate<H: Host>(&self, bundle: Bundle, host: H) -> CliResult<VM<H>> {
        let resolution = resolve(bundle.modules);
        if resolution.has_errors() {
            for line in diagnostic_lines(&resolution) {
                eprintln!("{}", line);
            }
            return Err(CliError::Resolution(resolution.diagnostics.error_count()));
        }
        let mut vm = VM::new(resolution.table, host, self.config.clone());
        vm.set_module_names(resolution.module_names);
        vm.load_main(bundle.main)?;
        Ok(vm)
    }

    /// Start the loaded program and drive it to the end
    pub fn run_to_end<H: Host>(&self, vm: &mut VM<H>, input: &mut dyn BufRead) -> CliResult<()> {
        vm.start()?;
        let mut read_line = || -> CliResult<String> {
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Err(CliError::Console(
                    "input closed while the program waits for input".to_string(),
                ));
            }
            Ok(line.trim_end_matches(['\r', '\n']).to_string())
        };
        loop {
            match self.drive(vm, &mut read_line)? {
                EngineState::Paused => vm.resume()?,
                _ => return Ok(()),
            }
        }
    }

    /// Tick the VM at the configured period until it stops running.
    ///
    /// Input requests are answered from `input`; external calls resolve to
    /// null. Returns the state the VM halted in; a fault becomes
    /// [`CliError::Runtime`].
    pub fn drive<H: Host>(
        &self,
        vm: &mut VM<H>,
        input: &mut dyn FnMut() -> CliResult<String>,
    ) -> CliResult<EngineState> {
        let period = Duration::from_millis(self.config.tick_period_ms);
        loop {
            let started = Instant::now();
            match vm.tick() {
                EngineState::Running => {
                    if let Some(rest) = period.checked_sub(started.elapsed()) {
                        std::thread::sleep(rest);
                    }
                }
                EngineState::WaitingForInput => {
                    let line = input()?;
                    vm.resolve_input(line)?;
                }
                EngineState::WaitingForDb => {
                    tracing::warn!("external call resolved with null");
                    vm.resolve_external(None)?;
                }
                EngineState::Error => {
                    return match vm.last_error() {
                        Some(error) => Err(CliError::Runtime(error.clone())),
                        None => Ok(EngineState::Error),
                    };
                }
                state => return Ok(state),
            }
        }
    }
}

fn diagnostic_lines(resolution: &Resolution) -> Vec<String> {
    resolution
        .diagnostics
        .iter()
        .map(|(module, _, diagnostic)| {
            let module = resolution
                .module_names
                .get(module.index())
                .map_or("<unknown>", String::as_str);
            let severity = if diagnostic.is_error() { "error" } else { "warning" };
            format!(
                "{} {}: {}: {}",
                module, diagnostic.position, severity, diagnostic.message
            )
        })
        .collect()
}

fn type_lines(resolution: &Resolution) -> Vec<String> {
    let table = &resolution.table;
    table
        .type_ids()
        .filter(|&id| table.get(id).module.is_some())
        .filter_map(|id| {
            let kind = match &table.get(id).kind {
                TypeKind::Klass(_) => "class",
                TypeKind::Interface(_) => "interface",
                TypeKind::Enum(_) => "enum",
                _ => return None,
            };
            let statics = table
                .static_class_of(id)
                .map_or(0, |twin| table.attributes_of(twin).len());
            Some(format!(
                "{} {}: {} attribute(s), {} static attribute(s), {} method(s)",
                kind,
                table.identifier(id),
                table.attributes_of(id).len(),
                statics,
                table.methods_of(id).len()
            ))
        })
        .collect()
}
