// File: src/interpreter/mod.rs
//
// The Push interpreter.
// Execution works by repeatedly popping the exec stack and dispatching on
// the popped value's type: literals go to their typed stack, names resolve
// through the binding map, code lists expand leftmost-on-top back onto the
// exec stack, and instructions invoke their registered handler. Iteration
// and recursion are not host loops — the combinator instructions build
// fresh code at runtime and push it onto exec, which is what makes Push
// programs self-modifying under genetic programming.
//
// One interpreter is one unit of concurrency: the runner wraps each in a
// Mutex (that Mutex is the execution lock), while the interrupt flag is a
// shared atomic so other threads can stop a run without taking the lock.

pub mod code;
mod heap;
pub mod instructions;
mod names;
pub mod random;
mod stack;
mod value;

pub use heap::{Heap, GC_INTERVAL};
pub use instructions::InstrId;
pub use names::{Name, NamePool};
pub use stack::Stack;
pub use value::{PushType, Val, Value};

use crate::errors::PushError;
use ahash::AHashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Interrupt flag value reserved for "kill": the runner will not
/// reschedule an interpreter killed with it.
pub const INTERRUPT_KILL: i64 = -1;

/// Identifies one of the six stacks
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StackId {
    Bool,
    Code,
    Exec,
    Int,
    Name,
    Real,
}

impl StackId {
    pub const ALL: [StackId; 6] = [
        StackId::Bool,
        StackId::Code,
        StackId::Exec,
        StackId::Int,
        StackId::Name,
        StackId::Real,
    ];

    /// The stack's name in serialized state documents
    pub fn title(&self) -> &'static str {
        match self {
            StackId::Bool => "boolean",
            StackId::Code => "code",
            StackId::Exec => "exec",
            StackId::Int => "integer",
            StackId::Name => "name",
            StackId::Real => "real",
        }
    }

    pub fn from_title(title: &str) -> Option<StackId> {
        StackId::ALL.iter().copied().find(|id| id.title() == title)
    }
}

/// The six stacks of an interpreter
#[derive(Debug, Default)]
pub struct Stacks {
    pub boolean: Stack,
    pub code: Stack,
    pub exec: Stack,
    pub integer: Stack,
    pub name: Stack,
    pub real: Stack,
}

impl Stacks {
    pub fn get(&self, id: StackId) -> &Stack {
        match id {
            StackId::Bool => &self.boolean,
            StackId::Code => &self.code,
            StackId::Exec => &self.exec,
            StackId::Int => &self.integer,
            StackId::Name => &self.name,
            StackId::Real => &self.real,
        }
    }

    pub fn get_mut(&mut self, id: StackId) -> &mut Stack {
        match id {
            StackId::Bool => &mut self.boolean,
            StackId::Code => &mut self.code,
            StackId::Exec => &mut self.exec,
            StackId::Int => &mut self.integer,
            StackId::Name => &mut self.name,
            StackId::Real => &mut self.real,
        }
    }
}

/// Hook invoked after every step
pub type StepHook = Arc<dyn Fn(&mut Interpreter) + Send + Sync>;

/// Handler invoked when a positive interrupt flag halts execution
pub type InterruptHandler = Arc<dyn Fn(&mut Interpreter, i64) + Send + Sync>;

/// Cloneable handle that can set an interpreter's interrupt flag from any
/// thread, without taking the execution lock
#[derive(Clone, Debug)]
pub struct InterruptHandle(Arc<AtomicI64>);

impl InterruptHandle {
    pub fn set(&self, flag: i64) {
        self.0.store(flag, Ordering::SeqCst);
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Interpreter {
    pub heap: Heap,
    pub stacks: Stacks,
    pub bindings: AHashMap<Name, Val>,
    pub config: AHashMap<Name, Val>,
    pub names: NamePool,
    instructions: instructions::Registry,
    pub(crate) rng: StdRng,
    interrupt: Arc<AtomicI64>,
    interrupt_handler: Option<InterruptHandler>,
    step_hook: Option<StepHook>,
    steps: u64,
}

impl Interpreter {
    /// New interpreter with the default configuration and the default
    /// instruction set installed
    pub fn new() -> Self {
        Self::build(StdRng::from_entropy())
    }

    /// New interpreter with a deterministic random number generator
    pub fn with_seed(seed: u64) -> Self {
        Self::build(StdRng::seed_from_u64(seed))
    }

    fn build(rng: StdRng) -> Self {
        let mut vm = Interpreter {
            heap: Heap::new(),
            stacks: Stacks::default(),
            bindings: AHashMap::new(),
            config: AHashMap::new(),
            names: NamePool::new(),
            instructions: instructions::Registry::new(),
            rng,
            interrupt: Arc::new(AtomicI64::new(0)),
            interrupt_handler: None,
            step_hook: None,
            steps: 0,
        };
        vm.default_config();
        instructions::install_default(&mut vm);
        vm
    }

    fn default_config(&mut self) {
        self.set_config_int("MIN-RANDOM-INT", -100);
        self.set_config_int("MAX-RANDOM-INT", 100);
        self.set_config_real("MIN-RANDOM-REAL", 0.0);
        self.set_config_real("MAX-RANDOM-REAL", 1.0);
        self.set_config_int("MIN-RANDOM-NAME-LENGTH", 2);
        self.set_config_int("MAX-RANDOM-NAME-LENGTH", 16);
        self.set_config_int("MAX-POINTS-IN-RANDOM-EXPRESSIONS", 100);
        self.set_config_real("NEW-ERC-NAME-PROBABILITY", 0.5);
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    // ---- names, bindings, configuration ----

    pub fn intern(&mut self, s: &str) -> Name {
        self.names.intern(s)
    }

    /// Bind a name to a value; rebinding overwrites. Binding a name to
    /// another name is refused, since looking it up would push the bound
    /// name back onto exec forever.
    pub fn define(&mut self, name: Name, val: Val) {
        if matches!(self.heap.get(val), Value::Name(_)) {
            return;
        }
        self.bindings.insert(name, val);
    }

    pub fn undef(&mut self, name: Name) {
        self.bindings.remove(&name);
    }

    pub fn lookup(&self, name: Name) -> Option<Val> {
        self.bindings.get(&name).copied()
    }

    pub fn config_set(&mut self, key: &str, val: Val) {
        let k = self.intern(key);
        self.config.insert(k, val);
    }

    pub fn config_get(&self, key: &str) -> Option<Val> {
        let k = self.names.lookup(key)?;
        self.config.get(&k).copied()
    }

    pub fn config_int(&self, key: &str) -> Option<i64> {
        self.config_get(key).and_then(|v| self.heap.get(v).as_int())
    }

    pub fn config_real(&self, key: &str) -> Option<f64> {
        self.config_get(key).and_then(|v| self.heap.get(v).as_real())
    }

    pub fn set_config_int(&mut self, key: &str, value: i64) {
        let v = self.heap.alloc(Value::Int(value));
        self.config_set(key, v);
    }

    pub fn set_config_real(&mut self, key: &str, value: f64) {
        let v = self.heap.alloc(Value::Real(value));
        self.config_set(key, v);
    }

    // ---- instruction registry ----

    /// Register an instruction under a name; re-registering a name
    /// replaces its handler but keeps the handle. Host state goes into
    /// the closure's captures.
    pub fn register<F>(&mut self, name: &str, func: F) -> InstrId
    where
        F: Fn(&mut Interpreter) + Send + Sync + 'static,
    {
        self.instructions.insert(name, Arc::new(func))
    }

    pub fn instr_lookup(&self, name: &str) -> Option<InstrId> {
        self.instructions.lookup(name)
    }

    pub fn instr_name(&self, id: InstrId) -> &str {
        self.instructions.name(id)
    }

    pub fn instr_count(&self) -> usize {
        self.instructions.len()
    }

    /// Every registered instruction, in registration order
    pub fn instr_ids(&self) -> impl Iterator<Item = InstrId> {
        (0..self.instructions.len() as u32).map(InstrId)
    }

    pub fn call_instr(&mut self, id: InstrId) {
        if let Some(func) = self.instructions.handler(id) {
            func(self);
        }
    }

    /// Instruction value by name; degrades to `None` (a no-op when
    /// executed) if the instruction is not registered
    pub(crate) fn instr_val(&mut self, name: &str) -> Val {
        match self.instr_lookup(name) {
            Some(id) => self.heap.alloc(Value::Instr(id)),
            None => self.heap.alloc(Value::None),
        }
    }

    // ---- execution ----

    /// Dispatch a single value as the execution loop would
    pub fn execute_value(&mut self, val: Val) {
        match self.heap.get(val).clone() {
            Value::Bool(_) => self.stacks.boolean.push(val),
            Value::Int(_) => self.stacks.integer.push(val),
            Value::Real(_) => self.stacks.real.push(val),
            Value::Code(children) => {
                // reverse order, so the leftmost child executes first
                for &child in children.iter().rev() {
                    self.stacks.exec.push(child);
                }
            }
            Value::Instr(id) => self.call_instr(id),
            Value::Name(n) => match self.lookup(n) {
                Some(bound) => self.stacks.exec.push(bound),
                None => self.stacks.name.push(val),
            },
            Value::None => {}
        }
    }

    /// Do one single step. Returns true iff another step should occur.
    /// Does not clear the interrupt flag; `run` does that once up front.
    pub fn step(&mut self) -> bool {
        let popped = self.stacks.exec.pop();
        if let Some(val) = popped {
            self.execute_value(val);
        }

        self.steps += 1;
        self.collect(false);

        if let Some(hook) = self.step_hook.clone() {
            hook(self);
        }

        let flag = self.interrupt.load(Ordering::SeqCst);
        if flag != 0 {
            if flag > 0 {
                if let Some(handler) = self.interrupt_handler.clone() {
                    handler(self, flag);
                }
            }
            return false;
        }

        popped.is_some()
    }

    /// Run until the exec stack is empty, the step budget is consumed
    /// (0 = unbounded) or an interrupt fires. Returns the number of steps
    /// performed. The caller-side Mutex around the interpreter is the
    /// execution lock; `&mut self` guarantees exclusive access here.
    pub fn run(&mut self, max_steps: u64) -> u64 {
        self.interrupt.store(0, Ordering::SeqCst);
        let mut performed = 0;
        while (max_steps == 0 || performed < max_steps) && self.step() {
            performed += 1;
        }
        performed
    }

    pub fn done(&self) -> bool {
        self.stacks.exec.is_empty()
    }

    /// Request that the current run stop at the next step boundary
    pub fn interrupt(&self, flag: i64) {
        self.interrupt.store(flag, Ordering::SeqCst);
    }

    pub fn interrupt_flag(&self) -> i64 {
        self.interrupt.load(Ordering::SeqCst)
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle(self.interrupt.clone())
    }

    pub fn set_interrupt_handler(&mut self, handler: Option<InterruptHandler>) {
        self.interrupt_handler = handler;
    }

    pub fn set_step_hook(&mut self, hook: Option<StepHook>) {
        self.step_hook = hook;
    }

    /// Empty the six stacks and remove all bindings (configuration and
    /// registered instructions are kept)
    pub fn flush(&mut self) {
        for id in StackId::ALL {
            self.stacks.get_mut(id).flush();
        }
        self.bindings.clear();
    }

    // ---- garbage collection ----

    /// Run a collection cycle. Unforced cycles only mark and sweep every
    /// `GC_INTERVAL` steps; `step` calls this after every dispatch.
    pub fn collect(&mut self, force: bool) {
        if !self.heap.begin_cycle(force) {
            return;
        }
        for id in StackId::ALL {
            for &v in self.stacks.get(id).items() {
                self.heap.mark(v);
            }
        }
        for &v in self.bindings.values() {
            self.heap.mark(v);
        }
        for &v in self.config.values() {
            self.heap.mark(v);
        }
        self.heap.sweep();
    }

    // ---- typed stack helpers ----

    pub fn push_bool(&mut self, b: bool) {
        let v = self.heap.alloc(Value::Bool(b));
        self.stacks.boolean.push(v);
    }

    pub fn push_int(&mut self, i: i64) {
        let v = self.heap.alloc(Value::Int(i));
        self.stacks.integer.push(v);
    }

    pub fn push_real(&mut self, r: f64) {
        let v = self.heap.alloc(Value::Real(r));
        self.stacks.real.push(v);
    }

    pub fn push_name(&mut self, n: Name) {
        let v = self.heap.alloc(Value::Name(n));
        self.stacks.name.push(v);
    }

    pub fn alloc_code(&mut self, children: Vec<Val>) -> Val {
        self.heap.alloc(Value::Code(children))
    }

    /// Integer at depth `n` of the integer stack, without popping
    pub fn int_at(&self, n: usize) -> Option<i64> {
        self.stacks.integer.peek_nth(n).and_then(|v| self.heap.get(v).as_int())
    }

    pub fn real_at(&self, n: usize) -> Option<f64> {
        self.stacks.real.peek_nth(n).and_then(|v| self.heap.get(v).as_real())
    }

    pub fn bool_at(&self, n: usize) -> Option<bool> {
        self.stacks.boolean.peek_nth(n).and_then(|v| self.heap.get(v).as_bool())
    }

    /// Coerce a value to a code list: a list is returned as-is, anything
    /// else is wrapped into a fresh single-element list
    pub fn make_code(&mut self, v: Val) -> Val {
        if self.heap.is_code(v) {
            v
        } else {
            self.heap.alloc(Value::Code(vec![v]))
        }
    }

    /// Pop the code stack and coerce the result to a list
    pub fn pop_code_list(&mut self) -> Option<Val> {
        let v = self.stacks.code.pop()?;
        Some(self.make_code(v))
    }

    // ---- cross-interpreter transfer ----

    /// Deep-copy a value owned by another interpreter into this one,
    /// re-interning names and re-resolving instruction handles. Used by
    /// crossover to move subtrees between programs; an instruction the
    /// recipient does not know becomes `None` with a warning.
    pub fn adopt_value(&mut self, src: &Interpreter, val: Val) -> Val {
        let adopted = match src.heap.get(val).clone() {
            Value::Name(n) => Value::Name(self.intern(src.names.resolve(n))),
            Value::Instr(id) => {
                let name = src.instr_name(id).to_string();
                match self.instr_lookup(&name) {
                    Some(local) => Value::Instr(local),
                    None => {
                        crate::errors::warn(&format!("unknown instruction: {}", name));
                        Value::None
                    }
                }
            }
            Value::Code(children) => {
                Value::Code(children.iter().map(|&c| self.adopt_value(src, c)).collect())
            }
            other => other,
        };
        self.heap.alloc(adopted)
    }

    // ---- diagnostics ----

    /// Render a value as a Push expression, e.g. `( 1 2.5 TRUE INT.+ )`
    pub fn display_value(&self, val: Val) -> String {
        match self.heap.get(val) {
            Value::None => "NONE".to_string(),
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Real(r) => format!("{:?}", r),
            Value::Name(n) => self.names.resolve(*n).to_string(),
            Value::Instr(id) => self.instr_name(*id).to_string(),
            Value::Code(children) => {
                let mut out = String::from("(");
                for &child in children {
                    out.push(' ');
                    out.push_str(&self.display_value(child));
                }
                out.push_str(" )");
                out
            }
        }
    }

    // ---- state serialization ----

    /// Serialize the stacks, bindings and configuration to XML
    pub fn dump_state(&self) -> Result<String, PushError> {
        crate::serialize::dump_state(self)
    }

    /// Load a serialized state into this interpreter, appending below any
    /// existing stack content. On error the interpreter is unchanged.
    pub fn load_state(&mut self, xml: &str) -> Result<(), PushError> {
        crate::serialize::load_state(self, xml)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("exec_depth", &self.stacks.exec.len())
            .field("bindings", &self.bindings.len())
            .field("instructions", &self.instructions.len())
            .field("live_values", &self.heap.live_count())
            .field("steps", &self.steps)
            .finish()
    }
}
