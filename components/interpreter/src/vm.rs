//! Virtual Machine for program execution
//!
//! Owns everything a run needs: the type table, the heap, the execution
//! context and the scheduling state. Programs advance only when the host
//! calls [`VM::tick`] (or [`VM::run_until_halt`] in headless use).

use bytecode_system::Program;
use core_types::{HeapId, MethodId, RuntimeError, SourcePosition, StackFrame, TypeId, Value};
use rustc_hash::FxHashMap;
use scheduler::{CallbackQueue, ListenerId, ListenerRegistry, Ticker, TimerId, TimerRegistry};
use std::rc::Rc;
use std::time::Instant;
use type_model::{MethodBody, TypeKind, TypeTable};

use crate::call_frame::{Activation, AfterReturn, CallOrigin, ProgramStackElement};
use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::error::{EngineError, Fault, FaultResult};
use crate::heap::Heap;
use crate::host::Host;
use crate::natives::{HeapView, NativeBridge};

/// Engine life cycle.
///
/// `NotInitialized → Running ⇄ Paused → Done | Error`; the two waiting
/// states are entered mid-statement and left back into the state that was
/// active before the suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No run started, or stopped
    NotInitialized,
    /// Executing on ticks
    Running,
    /// Halted by the debugger
    Paused,
    /// Main program finished and nothing is pending
    Done,
    /// A runtime fault ended the run
    Error,
    /// Waiting for `resolve_input`
    WaitingForInput,
    /// Waiting for `resolve_external`
    WaitingForDb,
}

/// A program run on behalf of the host: listener, timer or completion
/// handler
#[derive(Debug, Clone, PartialEq)]
pub struct Callback {
    /// Method to run
    pub method: MethodId,
    /// Receiver for instance methods
    pub receiver: Option<Value>,
    /// Arguments after the receiver
    pub arguments: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunMode {
    Continuous,
    StepInto,
    /// Halt at the next step boundary once `depth` drops to zero or below
    StepOver { depth: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepEnd {
    StepFinished,
    Breakpoint,
    ProgramEnd,
    Suspended,
}

/// Virtual Machine executing one module set
///
/// # Examples
///
/// ```
/// use bytecode_system::{Program, StatementKind};
/// use core_types::Value;
/// use interpreter::{EngineConfig, EngineState, RecordingHost, VM};
/// use type_model::TypeTable;
///
/// let mut main = Program::new("main");
/// main.emit(StatementKind::PushConstant(Value::String("hello".into())));
/// main.emit(StatementKind::Print { newline: true, with_value: true });
///
/// let mut vm = VM::new(TypeTable::new(), RecordingHost::new(), EngineConfig::default());
/// vm.load_main(main).unwrap();
/// vm.start().unwrap();
/// assert_eq!(vm.run_until_halt(100), EngineState::Done);
/// assert_eq!(vm.host().output, "hello\n");
/// ```
pub struct VM<H: Host> {
    pub(crate) table: TypeTable,
    pub(crate) host: H,
    pub(crate) config: EngineConfig,
    pub(crate) ctx: ExecutionContext,
    pub(crate) heap: Heap,
    /// Static slots keyed by class (not by its static twin)
    pub(crate) statics: FxHashMap<TypeId, Vec<Value>>,
    pub(crate) enum_values: FxHashMap<TypeId, HeapId>,
    pub(crate) dispatch_cache: FxHashMap<(TypeId, MethodId), MethodId>,
    pub(crate) state: EngineState,
    pub(crate) state_before_suspend: EngineState,
    pub(crate) run_mode: RunMode,
    pub(crate) skip_breakpoint_once: bool,
    pub(crate) breakpoints_enabled: bool,
    pub(crate) pending_external_result: bool,
    main: Option<Rc<Program>>,
    module_names: Vec<String>,
    callbacks: CallbackQueue<Callback>,
    timers: TimerRegistry<Callback>,
    listeners: ListenerRegistry<Callback>,
    ticker: Ticker,
    epoch: Instant,
    last_error: Option<RuntimeError>,
}

impl<H: Host> VM<H> {
    /// Create a VM over a resolved type table
    pub fn new(table: TypeTable, host: H, config: EngineConfig) -> Self {
        Self {
            table,
            host,
            ticker: config.ticker(),
            config,
            ctx: ExecutionContext::new(),
            heap: Heap::new(),
            statics: FxHashMap::default(),
            enum_values: FxHashMap::default(),
            dispatch_cache: FxHashMap::default(),
            state: EngineState::NotInitialized,
            state_before_suspend: EngineState::Running,
            run_mode: RunMode::Continuous,
            skip_breakpoint_once: false,
            breakpoints_enabled: true,
            pending_external_result: false,
            main: None,
            module_names: Vec::new(),
            callbacks: CallbackQueue::new(),
            timers: TimerRegistry::new(),
            listeners: ListenerRegistry::new(),
            epoch: Instant::now(),
            last_error: None,
        }
    }

    /// Module names used in stack traces, indexed by `ModuleId`
    pub fn set_module_names(&mut self, names: Vec<String>) {
        self.module_names = names;
    }

    /// Set the main program
    pub fn load_main(&mut self, program: Program) -> Result<(), EngineError> {
        program.validate()?;
        self.main = Some(Rc::new(program));
        Ok(())
    }

    /// The main program
    pub fn main_program(&self) -> Option<&Rc<Program>> {
        self.main.as_ref()
    }

    /// Current state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The fault that ended the last run
    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    /// Type table
    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    /// Host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Operand stack, bottom first
    pub fn stack(&self) -> &[Value] {
        &self.ctx.stack
    }

    /// Static slots of a class
    pub fn statics(&self, class: TypeId) -> Option<&[Value]> {
        self.statics.get(&class).map(Vec::as_slice)
    }

    /// Ordinal-indexed constant array of an enum
    pub fn enum_values(&self, enum_type: TypeId) -> Option<HeapId> {
        self.enum_values.get(&enum_type).copied()
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Change the execution speed; `None` runs at full speed
    pub fn set_speed(&mut self, steps_per_second: Option<u32>) {
        self.config.steps_per_second = steps_per_second;
        self.ticker.set_speed(steps_per_second);
    }

    /// String conversion of a value, as `print` shows it
    pub fn display(&self, value: &Value) -> String {
        self.view().display(value)
    }

    pub(crate) fn view(&self) -> HeapView<'_> {
        HeapView {
            table: &self.table,
            heap: &self.heap,
            enum_values: &self.enum_values,
        }
    }

    pub(crate) fn bridge(&mut self) -> NativeBridge<'_> {
        NativeBridge {
            table: &self.table,
            heap: &mut self.heap,
            host: &mut self.host,
            enum_values: &self.enum_values,
        }
    }

    pub(crate) fn set_state(&mut self, state: EngineState) {
        if self.state != state {
            tracing::info!(from = ?self.state, to = ?state, "engine state");
            self.state = state;
        }
    }

    // ========================================================================
    // Life cycle
    // ========================================================================

    /// Start the main program.
    ///
    /// Static initializers and enum constants are scheduled above the main
    /// program so they all complete before its first statement.
    #[tracing::instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), EngineError> {
        let main = self.main.clone().ok_or(EngineError::NoMainProgram)?;
        self.reset();
        self.ctx.program_stack.push(ProgramStackElement::scheduled(
            Activation::new(main, CallOrigin::Outside),
            Vec::new(),
        ));
        self.initialize_statics();
        self.schedule_static_initialization();
        self.epoch = Instant::now();
        self.set_state(EngineState::Running);
        self.resume_next();
        Ok(())
    }

    /// Hard reset: discards stacks, heap, timers, listeners and queued
    /// callbacks
    pub fn stop(&mut self) {
        self.reset();
        self.set_state(EngineState::NotInitialized);
    }

    fn reset(&mut self) {
        self.ctx = ExecutionContext::new();
        self.heap.clear();
        self.statics.clear();
        self.enum_values.clear();
        self.dispatch_cache.clear();
        self.callbacks.clear();
        self.timers.clear();
        self.listeners.clear();
        self.last_error = None;
        self.run_mode = RunMode::Continuous;
        self.skip_breakpoint_once = false;
        self.pending_external_result = false;
    }

    fn initialize_statics(&mut self) {
        for id in self.table.type_ids() {
            let TypeKind::StaticClass(twin) = &self.table.get(id).kind else {
                continue;
            };
            let mut slots = vec![Value::Null; twin.number_of_attributes];
            for &attribute in self.table.attributes_of(id) {
                let attribute = self.table.attribute(attribute);
                if let Some(slot) = attribute.index.and_then(|i| slots.get_mut(i)) {
                    *slot = self.table.default_value(attribute.type_id);
                }
            }
            self.statics.insert(twin.klass, slots);
        }

        let enums: Vec<TypeId> = self
            .table
            .type_ids()
            .filter(|&id| matches!(self.table.get(id).kind, TypeKind::Enum(_)))
            .collect();
        for enum_type in enums {
            let count = self
                .table
                .get(enum_type)
                .as_klass()
                .and_then(|k| k.enum_info.as_ref())
                .map_or(0, |info| info.constants.len());
            let constants = (0..count)
                .map(|_| Value::Object(self.heap.alloc_instance(&self.table, enum_type)))
                .collect();
            let values = self.heap.alloc_array(enum_type, constants);
            self.enum_values.insert(enum_type, values);
        }
    }

    /// Push static initializers and enum constant construction, in reverse
    /// so that the first declared class initializes first
    fn schedule_static_initialization(&mut self) {
        let classes: Vec<TypeId> = self
            .table
            .type_ids()
            .filter(|&id| {
                let ty = self.table.get(id);
                ty.as_klass().is_some() && ty.generic_origin().is_none()
            })
            .collect();

        for &class in classes.iter().rev() {
            let static_initializer = self
                .table
                .static_class_of(class)
                .and_then(|twin| self.table.get(twin).as_static_class())
                .and_then(|twin| twin.static_initializer.clone());
            if let Some(program) = static_initializer {
                self.ctx.program_stack.push(ProgramStackElement::scheduled(
                    Activation::new(program, CallOrigin::Outside),
                    Vec::new(),
                ));
            }

            let Some(values) = self.enum_values.get(&class).copied() else {
                continue;
            };
            let constants = match self.heap.array(values) {
                Ok(array) => array.elements.clone(),
                Err(_) => continue,
            };
            let calls: Vec<Option<Rc<Program>>> = self
                .table
                .get(class)
                .as_klass()
                .and_then(|k| k.enum_info.as_ref())
                .map(|info| info.constants.iter().map(|c| c.constructor_call.clone()).collect())
                .unwrap_or_default();

            for (constant, call) in constants.into_iter().zip(calls).rev() {
                if let Some(program) = call {
                    self.ctx.program_stack.push(ProgramStackElement::scheduled(
                        Activation::new(program, CallOrigin::Outside),
                        vec![constant.clone()],
                    ));
                }
                if let Value::Object(id) = constant {
                    self.schedule_initializers(class, id, CallOrigin::Outside, None);
                }
            }
        }
    }

    /// Push the attribute initializers of `class` and its bases for a new
    /// instance; the root class's initializer ends up on top.
    pub(crate) fn schedule_initializers(
        &mut self,
        class: TypeId,
        object: HeapId,
        origin: CallOrigin,
        call_site: Option<SourcePosition>,
    ) {
        for ty in self.table.class_chain(class) {
            let Some(program) = self
                .table
                .get(ty)
                .as_klass()
                .and_then(|k| k.attribute_initializer.clone())
            else {
                continue;
            };
            let mut activation = Activation::new(program, origin);
            activation.call_site = call_site;
            self.ctx.program_stack.push(ProgramStackElement::scheduled(
                activation,
                vec![Value::Object(object)],
            ));
        }
    }

    // ========================================================================
    // Program stack
    // ========================================================================

    /// Make the top of the program stack current.
    ///
    /// Scheduled programs get their frame pushed here; suspended ones
    /// continue where they left off.
    pub(crate) fn resume_next(&mut self) {
        let Some(element) = self.ctx.program_stack.pop() else {
            self.ctx.current = None;
            return;
        };
        let mut activation = element.activation;
        if let Some(frame) = element.pending_frame {
            activation.frame_base = self.ctx.stack.len();
            self.ctx.stack.extend(frame);
            let reserved = activation.program.reserved_locals;
            self.ctx
                .stack
                .resize(self.ctx.stack.len() + reserved, Value::Null);
            self.enter_activation();
        }
        self.ctx.current = Some(activation);
    }

    /// End the running activation: drop its frame, leave `return_value` on
    /// the caller's stack and continue with the next program.
    pub(crate) fn finish_activation(&mut self, return_value: Option<Value>) {
        let Some(activation) = self.ctx.current.take() else {
            return;
        };
        self.ctx.stack.truncate(activation.frame_base);
        let returned = return_value.is_some();
        if let Some(value) = return_value {
            self.ctx.push(value);
        }
        self.leave_activation();
        if let Some(AfterReturn::FinishCallback) = activation.after_return {
            if returned {
                self.ctx.stack.pop();
            }
            self.callbacks.release();
        }
        self.resume_next();
    }

    pub(crate) fn enter_activation(&mut self) {
        if let RunMode::StepOver { depth } = &mut self.run_mode {
            *depth += 1;
        }
    }

    fn leave_activation(&mut self) {
        if let RunMode::StepOver { depth } = &mut self.run_mode {
            *depth -= 1;
        }
    }

    // ========================================================================
    // Run loop
    // ========================================================================

    /// Execute statements until a step boundary, the end of all programs,
    /// a breakpoint, a suspension or a fault
    pub(crate) fn next_step(&mut self) -> FaultResult<StepEnd> {
        loop {
            if self.state != EngineState::Running {
                return Ok(StepEnd::Suspended);
            }
            let Some(activation) = self.ctx.current.as_ref() else {
                return Ok(StepEnd::ProgramEnd);
            };
            let program = Rc::clone(&activation.program);
            let position = activation.position;
            let Some(statement) = program.get(position) else {
                self.finish_activation(None);
                continue;
            };
            if self.breakpoints_enabled && statement.has_breakpoint() && !self.skip_breakpoint_once
            {
                return Ok(StepEnd::Breakpoint);
            }
            self.skip_breakpoint_once = false;

            tracing::trace!(program = %program.label, position, kind = ?statement.kind, "execute");
            self.execute_node(statement)?;

            if statement.step_finished {
                return Ok(StepEnd::StepFinished);
            }
        }
    }

    fn should_halt_after_step(&self) -> bool {
        match self.run_mode {
            RunMode::Continuous => false,
            RunMode::StepInto => true,
            RunMode::StepOver { depth } => depth <= 0,
        }
    }

    /// Run one host tick: fire due timers, then execute within the tick's
    /// wall-clock budget and step allowance.
    pub fn tick(&mut self) -> EngineState {
        let started = Instant::now();
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        self.fire_timers(now_ms);
        if self.state == EngineState::Running {
            let allowance = self.ticker.step_allowance();
            self.run(allowance, Some(started));
        }
        self.state
    }

    /// Execute up to `max_steps` steps without a time budget
    pub fn run_until_halt(&mut self, max_steps: usize) -> EngineState {
        self.run(Some(max_steps), None);
        self.state
    }

    fn run(&mut self, max_steps: Option<usize>, started: Option<Instant>) {
        let mut steps = 0;
        while self.state == EngineState::Running {
            if max_steps.is_some_and(|max| steps >= max) {
                break;
            }
            if started.is_some_and(|s| self.ticker.budget_exhausted(s)) {
                break;
            }
            if let Err(fault) = self.schedule_callback() {
                self.fail(fault);
                break;
            }
            if self.ctx.current.is_none() {
                if !(self.config.keep_alive_for_callbacks && self.has_event_sources()) {
                    self.set_state(EngineState::Done);
                }
                break;
            }
            match self.next_step() {
                Ok(StepEnd::StepFinished) => {
                    steps += 1;
                    if self.should_halt_after_step() {
                        self.halt();
                    }
                }
                Ok(StepEnd::Breakpoint) => self.halt(),
                Ok(StepEnd::ProgramEnd) => {}
                Ok(StepEnd::Suspended) => break,
                Err(fault) => self.fail(fault),
            }
        }
    }

    /// Pause and show where execution stopped
    pub(crate) fn halt(&mut self) {
        self.run_mode = RunMode::Continuous;
        self.set_state(EngineState::Paused);
        let (module, position) = self.program_pointer();
        self.host.show_program_pointer(module.as_deref(), position);
    }

    /// Module name and source position of the next statement
    pub fn program_pointer(&self) -> (Option<String>, Option<SourcePosition>) {
        match &self.ctx.current {
            Some(activation) => (
                self.module_name(&activation.program),
                activation.current_position(),
            ),
            None => (None, None),
        }
    }

    fn module_name(&self, program: &Program) -> Option<String> {
        program
            .module
            .and_then(|m| self.module_names.get(m.index()))
            .cloned()
    }

    // ========================================================================
    // Faults
    // ========================================================================

    pub(crate) fn runtime_error(&self, fault: &Fault) -> RuntimeError {
        let mut stack = Vec::new();
        let mut source_position = None;
        if let Some(current) = &self.ctx.current {
            source_position = current.current_position();
            stack.push(self.stack_frame(current, current.position));
            if current.origin == CallOrigin::UserCode {
                let suspended = self
                    .ctx
                    .program_stack
                    .iter()
                    .rev()
                    .filter(|e| !e.is_scheduled());
                for element in suspended {
                    let activation = &element.activation;
                    // suspended activations point past their call statement
                    stack.push(self.stack_frame(activation, activation.position.saturating_sub(1)));
                    if activation.origin == CallOrigin::Outside {
                        break;
                    }
                }
            }
        }
        RuntimeError {
            message: fault.to_string(),
            stack,
            source_position,
        }
    }

    fn stack_frame(&self, activation: &Activation, statement: usize) -> StackFrame {
        let method_name = activation.method.map(|m| {
            let method = self.table.method(m);
            format!(
                "{}.{}",
                self.table.identifier(method.declaring_type),
                method.identifier
            )
        });
        StackFrame {
            method_name,
            module_name: self.module_name(&activation.program),
            position: activation.program.position_at(statement),
        }
    }

    fn fail(&mut self, fault: Fault) {
        let error = self.runtime_error(&fault);
        tracing::warn!(message = %error.message, frames = error.stack.len(), "runtime fault");
        self.last_error = Some(error);
        self.set_state(EngineState::Error);
    }

    // ========================================================================
    // Suspension
    // ========================================================================

    pub(crate) fn suspend(&mut self, state: EngineState) {
        self.state_before_suspend = self.state;
        self.set_state(state);
    }

    /// Supply the input requested by a `ReadInput` statement
    pub fn resolve_input(&mut self, text: impl Into<String>) -> Result<(), EngineError> {
        if self.state != EngineState::WaitingForInput {
            return Err(EngineError::InvalidState {
                operation: "resolve input",
                state: self.state,
            });
        }
        self.ctx.push(Value::String(text.into()));
        self.set_state(self.state_before_suspend);
        Ok(())
    }

    /// Complete the operation started by an `ExternalCall` statement
    pub fn resolve_external(&mut self, result: Option<Value>) -> Result<(), EngineError> {
        if self.state != EngineState::WaitingForDb {
            return Err(EngineError::InvalidState {
                operation: "resolve external call",
                state: self.state,
            });
        }
        if self.pending_external_result {
            self.ctx.push(result.unwrap_or(Value::Null));
            self.pending_external_result = false;
        }
        self.set_state(self.state_before_suspend);
        Ok(())
    }

    // ========================================================================
    // Callbacks and timers
    // ========================================================================

    /// Queue a callback program; it runs at the next step boundary once no
    /// other callback is running
    pub fn enqueue_callback(&mut self, method: MethodId, receiver: Option<Value>, arguments: Vec<Value>) {
        self.callbacks.enqueue(Callback {
            method,
            receiver,
            arguments,
        });
    }

    /// Register a repeating timer calling `method` every `interval_ms`
    pub fn register_timer(&mut self, interval_ms: u64, method: MethodId, receiver: Option<Value>) -> TimerId {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        self.timers.register(
            interval_ms,
            Callback {
                method,
                receiver,
                arguments: Vec::new(),
            },
            now_ms,
        )
    }

    /// Remove a timer
    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    /// Register `method` to be called with the event arguments whenever
    /// the host emits `event`
    pub fn register_listener(
        &mut self,
        event: impl Into<String>,
        method: MethodId,
        receiver: Option<Value>,
    ) -> ListenerId {
        self.listeners.register(
            event,
            Callback {
                method,
                receiver,
                arguments: Vec::new(),
            },
        )
    }

    /// Remove a listener
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Queue one callback per listener of `event`; returns how many
    pub fn emit_event(&mut self, event: &str, arguments: Vec<Value>) -> usize {
        if !matches!(self.state, EngineState::Running | EngineState::Paused) {
            return 0;
        }
        let listeners = self.listeners.matching(event);
        let count = listeners.len();
        for mut callback in listeners {
            callback.arguments = arguments.clone();
            self.callbacks.enqueue(callback);
        }
        count
    }

    fn has_event_sources(&self) -> bool {
        !self.timers.is_empty() || !self.listeners.is_empty()
    }

    /// Queue the callbacks of every timer due at `now_ms` (milliseconds
    /// since `start`)
    pub fn fire_timers(&mut self, now_ms: u64) {
        if !matches!(self.state, EngineState::Running | EngineState::Paused) {
            return;
        }
        for callback in self.timers.due(now_ms) {
            self.callbacks.enqueue(callback);
        }
    }

    /// Start the next queued callback if the callback slot is free.
    ///
    /// An idle engine, or one running a top-level program, runs it right
    /// away with the running activation suspended beneath it. During a
    /// nested call it waits in the slot right above the top-level program,
    /// so the call chain returns first.
    fn schedule_callback(&mut self) -> FaultResult<()> {
        if self.run_mode != RunMode::Continuous && self.ctx.current.is_some() {
            return Ok(());
        }
        let Some(callback) = self.callbacks.claim() else {
            return Ok(());
        };
        tracing::debug!(method = callback.method.index(), "callback");

        let method = self.table.method(callback.method);
        if callback.receiver.is_none() && !method.is_static {
            self.callbacks.release();
            return Err(Fault::NullPointer(format!(
                "callback {} needs a receiver",
                self.table.signature(callback.method)
            )));
        }

        let mut frame = Vec::with_capacity(callback.arguments.len() + 1);
        let mut target = callback.method;
        if let Some(receiver) = callback.receiver {
            target = self.dispatch_target(callback.method, &receiver)?;
            frame.push(receiver);
        }
        frame.extend(callback.arguments);

        let body = self.table.method(target).body.clone();
        match body {
            MethodBody::Interpreted(program) => {
                let mut activation = Activation::new(program, CallOrigin::Outside);
                activation.method = Some(target);
                activation.after_return = Some(AfterReturn::FinishCallback);
                let element = ProgramStackElement::scheduled(activation, frame);
                if let Some(slot) = self.reserved_callback_position() {
                    self.ctx.program_stack.insert(slot, element);
                    return Ok(());
                }
                if let Some(current) = self.ctx.current.take() {
                    self.ctx
                        .program_stack
                        .push(ProgramStackElement::suspended(current));
                }
                self.ctx.program_stack.push(element);
                self.resume_next();
                Ok(())
            }
            MethodBody::Native(native) => {
                let result = native.invoke(&mut self.bridge(), &frame);
                self.callbacks.release();
                result.map(|_| ()).map_err(Fault::Native)
            }
            MethodBody::Abstract => {
                self.callbacks.release();
                Err(Fault::AbstractMethod(self.table.signature(target)))
            }
        }
    }

    /// Program stack index just above the suspended top-level program, when
    /// the running activation is nested inside one
    fn reserved_callback_position(&self) -> Option<usize> {
        let current = self.ctx.current.as_ref()?;
        if current.origin == CallOrigin::Outside {
            return None;
        }
        self.ctx
            .program_stack
            .iter()
            .rposition(|e| !e.is_scheduled() && e.activation.origin == CallOrigin::Outside)
            .map(|index| index + 1)
    }

    /// Method actually run for `method` on `receiver`: the override with
    /// the same signature in the receiver's class, if any
    pub(crate) fn dispatch_target(&mut self, method: MethodId, receiver: &Value) -> FaultResult<MethodId> {
        let descriptor = self.table.method(method);
        if descriptor.is_static || descriptor.is_constructor || !descriptor.is_virtual {
            return Ok(method);
        }
        let Value::Object(id) = receiver else {
            return Ok(method);
        };
        let class = self.heap.object(*id)?.class;
        if let Some(&target) = self.dispatch_cache.get(&(class, method)) {
            return Ok(target);
        }
        let signature = self.table.signature(method);
        let target = self
            .table
            .find_method_by_signature(class, &signature)
            .unwrap_or(method);
        self.dispatch_cache.insert((class, method), target);
        Ok(target)
    }

    // ========================================================================
    // Nested evaluation
    // ========================================================================

    /// Run `program` to completion in a fresh execution context, with
    /// `frame` as its first locals, and return the value it leaves.
    ///
    /// The suspended run (stacks, state, debugger mode) is restored
    /// afterwards whatever the outcome; the heap is shared.
    pub fn evaluate(&mut self, program: Program, frame: Vec<Value>) -> Result<Option<Value>, RuntimeError> {
        let saved_ctx = std::mem::take(&mut self.ctx);
        let saved_state = self.state;
        let saved_mode = self.run_mode;
        let saved_skip = self.skip_breakpoint_once;
        let saved_breakpoints = self.breakpoints_enabled;

        self.state = EngineState::Running;
        self.run_mode = RunMode::Continuous;
        self.breakpoints_enabled = false;
        self.ctx.program_stack.push(ProgramStackElement::scheduled(
            Activation::new(Rc::new(program), CallOrigin::Outside),
            frame,
        ));
        self.resume_next();

        let result = loop {
            match self.next_step() {
                Ok(StepEnd::ProgramEnd) => break Ok(self.ctx.stack.last().cloned()),
                Ok(StepEnd::StepFinished) | Ok(StepEnd::Breakpoint) => {}
                Ok(StepEnd::Suspended) => {
                    break Err(RuntimeError {
                        message: "evaluation cannot wait for input or external calls".to_string(),
                        stack: Vec::new(),
                        source_position: None,
                    })
                }
                Err(fault) => break Err(self.runtime_error(&fault)),
            }
        };

        self.ctx = saved_ctx;
        self.state = saved_state;
        self.run_mode = saved_mode;
        self.skip_breakpoint_once = saved_skip;
        self.breakpoints_enabled = saved_breakpoints;
        result
    }
}
