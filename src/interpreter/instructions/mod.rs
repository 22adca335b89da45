// File: src/interpreter/instructions/mod.rs
//
// The default instruction set and the per-interpreter registry.
// Instructions are registered under dotted uppercase names (BOOL.AND,
// CODE.DO*RANGE, EXEC.Y, ...). Every instruction is a total function of
// interpreter state: one that lacks operands is a no-op that leaves every
// stack untouched. Polymorphic entries (DUP, SWAP, YANK, ...) share one
// handler parameterized by the target stack.

mod arithmetic;
mod code_ops;
mod exec_ops;
mod logic;
mod name_ops;
mod stack_ops;

use super::{Interpreter, StackId};
use ahash::AHashMap;
use std::sync::Arc;

/// Handle to a registered instruction, unique within one interpreter
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct InstrId(pub(crate) u32);

/// An instruction handler. Host state is captured by the closure.
pub type InstrFn = Arc<dyn Fn(&mut Interpreter) + Send + Sync>;

struct InstrDef {
    name: String,
    func: InstrFn,
}

/// Name-keyed instruction registry
pub(crate) struct Registry {
    defs: Vec<InstrDef>,
    index: AHashMap<String, InstrId>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry { defs: Vec::new(), index: AHashMap::new() }
    }

    pub(crate) fn insert(&mut self, name: &str, func: InstrFn) -> InstrId {
        if let Some(&id) = self.index.get(name) {
            self.defs[id.0 as usize].func = func;
            return id;
        }
        let id = InstrId(self.defs.len() as u32);
        self.defs.push(InstrDef { name: name.to_string(), func });
        self.index.insert(name.to_string(), id);
        id
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<InstrId> {
        self.index.get(name).copied()
    }

    pub(crate) fn name(&self, id: InstrId) -> &str {
        self.defs.get(id.0 as usize).map(|d| d.name.as_str()).unwrap_or("?")
    }

    pub(crate) fn handler(&self, id: InstrId) -> Option<InstrFn> {
        self.defs.get(id.0 as usize).map(|d| d.func.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.defs.len()
    }
}

enum Entry {
    Plain(fn(&mut Interpreter)),
    Poly(fn(&mut Interpreter, StackId), StackId),
}

use self::Entry::{Plain, Poly};
use super::StackId::{Bool, Code, Exec, Int, Name, Real};

/// The builtin default instruction set
static DIS: &[(&str, Entry)] = &[
    // BOOL
    ("BOOL.=", Poly(stack_ops::equal, Bool)),
    ("BOOL.AND", Plain(logic::and)),
    ("BOOL.DEFINE", Poly(stack_ops::define, Bool)),
    ("BOOL.DUP", Poly(stack_ops::dup, Bool)),
    ("BOOL.FLUSH", Poly(stack_ops::flush, Bool)),
    ("BOOL.FROMINT", Plain(logic::from_int)),
    ("BOOL.FROMREAL", Plain(logic::from_real)),
    ("BOOL.NOT", Plain(logic::not)),
    ("BOOL.OR", Plain(logic::or)),
    ("BOOL.POP", Poly(stack_ops::pop, Bool)),
    ("BOOL.RAND", Plain(logic::rand)),
    ("BOOL.ROT", Poly(stack_ops::rot, Bool)),
    ("BOOL.SHOVE", Poly(stack_ops::shove, Bool)),
    ("BOOL.STACKDEPTH", Poly(stack_ops::stackdepth, Bool)),
    ("BOOL.SWAP", Poly(stack_ops::swap, Bool)),
    ("BOOL.YANK", Poly(stack_ops::yank, Bool)),
    ("BOOL.YANKDUP", Poly(stack_ops::yankdup, Bool)),
    // CODE
    ("CODE.=", Poly(stack_ops::equal, Code)),
    ("CODE.APPEND", Plain(code_ops::append)),
    ("CODE.ATOM", Plain(code_ops::atom)),
    ("CODE.CAR", Plain(code_ops::car)),
    ("CODE.CDR", Plain(code_ops::cdr)),
    ("CODE.CONS", Plain(code_ops::cons)),
    ("CODE.CONTAINER", Plain(code_ops::container)),
    ("CODE.CONTAINS", Plain(code_ops::contains)),
    ("CODE.DEFINE", Poly(stack_ops::define, Code)),
    ("CODE.DEFINITION", Plain(code_ops::definition)),
    ("CODE.DISCREPANCY", Plain(code_ops::discrepancy)),
    ("CODE.DO", Plain(code_ops::do_)),
    ("CODE.DO*", Plain(code_ops::do_star)),
    ("CODE.DO*COUNT", Plain(code_ops::do_count)),
    ("CODE.DO*RANGE", Plain(code_ops::do_range)),
    ("CODE.DO*TIMES", Plain(code_ops::do_times)),
    ("CODE.DUP", Poly(stack_ops::dup, Code)),
    ("CODE.EXTRACT", Plain(code_ops::extract)),
    ("CODE.FLUSH", Poly(stack_ops::flush, Code)),
    ("CODE.FROMBOOL", Plain(code_ops::from_bool)),
    ("CODE.FROMINT", Plain(code_ops::from_int)),
    ("CODE.FROMNAME", Plain(code_ops::from_name)),
    ("CODE.FROMREAL", Plain(code_ops::from_real)),
    ("CODE.IF", Plain(code_ops::if_)),
    ("CODE.INSERT", Plain(code_ops::insert)),
    ("CODE.INSTRUCTIONS", Plain(code_ops::instructions)),
    ("CODE.LENGTH", Plain(code_ops::length)),
    ("CODE.LIST", Plain(code_ops::list)),
    ("CODE.MEMBER", Plain(code_ops::member)),
    ("CODE.NOOP", Plain(code_ops::noop)),
    ("CODE.NTH", Plain(code_ops::nth)),
    ("CODE.NTHCDR", Plain(code_ops::nthcdr)),
    ("CODE.NULL", Plain(code_ops::null)),
    ("CODE.POP", Poly(stack_ops::pop, Code)),
    ("CODE.POSITION", Plain(code_ops::position)),
    ("CODE.QUOTE", Plain(code_ops::quote)),
    ("CODE.RAND", Plain(code_ops::rand)),
    ("CODE.ROT", Poly(stack_ops::rot, Code)),
    ("CODE.SHOVE", Poly(stack_ops::shove, Code)),
    ("CODE.SIZE", Plain(code_ops::size)),
    ("CODE.STACKDEPTH", Poly(stack_ops::stackdepth, Code)),
    ("CODE.SWAP", Poly(stack_ops::swap, Code)),
    ("CODE.YANK", Poly(stack_ops::yank, Code)),
    ("CODE.YANKDUP", Poly(stack_ops::yankdup, Code)),
    // EXEC
    ("EXEC.=", Poly(stack_ops::equal, Exec)),
    ("EXEC.DEFINE", Poly(stack_ops::define, Exec)),
    ("EXEC.DO*COUNT", Plain(exec_ops::do_count)),
    ("EXEC.DO*RANGE", Plain(exec_ops::do_range)),
    ("EXEC.DO*TIMES", Plain(exec_ops::do_times)),
    ("EXEC.DUP", Poly(stack_ops::dup, Exec)),
    ("EXEC.FLUSH", Poly(stack_ops::flush, Exec)),
    ("EXEC.IF", Plain(exec_ops::if_)),
    ("EXEC.K", Plain(exec_ops::k)),
    ("EXEC.POP", Poly(stack_ops::pop, Exec)),
    ("EXEC.ROT", Poly(stack_ops::rot, Exec)),
    ("EXEC.S", Plain(exec_ops::s)),
    ("EXEC.SHOVE", Poly(stack_ops::shove, Exec)),
    ("EXEC.STACKDEPTH", Poly(stack_ops::stackdepth, Exec)),
    ("EXEC.SWAP", Poly(stack_ops::swap, Exec)),
    ("EXEC.Y", Plain(exec_ops::y)),
    ("EXEC.YANK", Poly(stack_ops::yank, Exec)),
    ("EXEC.YANKDUP", Poly(stack_ops::yankdup, Exec)),
    // INT
    ("INT.%", Plain(arithmetic::int_mod)),
    ("INT.*", Plain(arithmetic::int_mul)),
    ("INT.+", Plain(arithmetic::int_add)),
    ("INT.-", Plain(arithmetic::int_sub)),
    ("INT./", Plain(arithmetic::int_div)),
    ("INT.=", Poly(stack_ops::equal, Int)),
    ("INT.DEFINE", Poly(stack_ops::define, Int)),
    ("INT.DUP", Poly(stack_ops::dup, Int)),
    ("INT.FLUSH", Poly(stack_ops::flush, Int)),
    ("INT.FROMBOOL", Plain(arithmetic::int_from_bool)),
    ("INT.FROMREAL", Plain(arithmetic::int_from_real)),
    ("INT.GREATER", Plain(arithmetic::int_greater)),
    ("INT.LESS", Plain(arithmetic::int_less)),
    ("INT.MAX", Plain(arithmetic::int_max)),
    ("INT.MIN", Plain(arithmetic::int_min)),
    ("INT.POP", Poly(stack_ops::pop, Int)),
    ("INT.RAND", Plain(arithmetic::int_rand)),
    ("INT.ROT", Poly(stack_ops::rot, Int)),
    ("INT.SHOVE", Poly(stack_ops::shove, Int)),
    ("INT.STACKDEPTH", Poly(stack_ops::stackdepth, Int)),
    ("INT.SWAP", Poly(stack_ops::swap, Int)),
    ("INT.YANK", Poly(stack_ops::yank, Int)),
    ("INT.YANKDUP", Poly(stack_ops::yankdup, Int)),
    // NAME
    ("NAME.=", Poly(stack_ops::equal, Name)),
    ("NAME.DUP", Poly(stack_ops::dup, Name)),
    ("NAME.FLUSH", Poly(stack_ops::flush, Name)),
    ("NAME.POP", Poly(stack_ops::pop, Name)),
    ("NAME.QUOTE", Plain(name_ops::quote)),
    ("NAME.RAND", Plain(name_ops::rand)),
    ("NAME.RANDBOUNDNAME", Plain(name_ops::rand_bound_name)),
    ("NAME.ROT", Poly(stack_ops::rot, Name)),
    ("NAME.SHOVE", Poly(stack_ops::shove, Name)),
    ("NAME.STACKDEPTH", Poly(stack_ops::stackdepth, Name)),
    ("NAME.SWAP", Poly(stack_ops::swap, Name)),
    ("NAME.YANK", Poly(stack_ops::yank, Name)),
    ("NAME.YANKDUP", Poly(stack_ops::yankdup, Name)),
    // REAL
    ("REAL.%", Plain(arithmetic::real_mod)),
    ("REAL.*", Plain(arithmetic::real_mul)),
    ("REAL.+", Plain(arithmetic::real_add)),
    ("REAL.-", Plain(arithmetic::real_sub)),
    ("REAL./", Plain(arithmetic::real_div)),
    ("REAL.=", Poly(stack_ops::equal, Real)),
    ("REAL.COS", Plain(arithmetic::real_cos)),
    ("REAL.DEFINE", Poly(stack_ops::define, Real)),
    ("REAL.DUP", Poly(stack_ops::dup, Real)),
    ("REAL.EXP", Plain(arithmetic::real_exp)),
    ("REAL.FLUSH", Poly(stack_ops::flush, Real)),
    ("REAL.FROMBOOL", Plain(arithmetic::real_from_bool)),
    ("REAL.FROMINT", Plain(arithmetic::real_from_int)),
    ("REAL.GREATER", Plain(arithmetic::real_greater)),
    ("REAL.LESS", Plain(arithmetic::real_less)),
    ("REAL.LOG", Plain(arithmetic::real_log)),
    ("REAL.MAX", Plain(arithmetic::real_max)),
    ("REAL.MIN", Plain(arithmetic::real_min)),
    ("REAL.POP", Poly(stack_ops::pop, Real)),
    ("REAL.RAND", Plain(arithmetic::real_rand)),
    ("REAL.ROT", Poly(stack_ops::rot, Real)),
    ("REAL.SHOVE", Poly(stack_ops::shove, Real)),
    ("REAL.SIN", Plain(arithmetic::real_sin)),
    ("REAL.STACKDEPTH", Poly(stack_ops::stackdepth, Real)),
    ("REAL.SWAP", Poly(stack_ops::swap, Real)),
    ("REAL.TAN", Plain(arithmetic::real_tan)),
    ("REAL.YANK", Poly(stack_ops::yank, Real)),
    ("REAL.YANKDUP", Poly(stack_ops::yankdup, Real)),
];

/// Register the default instruction set on an interpreter
pub fn install_default(vm: &mut Interpreter) {
    for &(name, ref entry) in DIS {
        match entry {
            Plain(func) => {
                let func = *func;
                vm.register(name, move |vm| func(vm));
            }
            Poly(func, stack) => {
                let (func, stack) = (*func, *stack);
                vm.register(name, move |vm| func(vm, stack));
            }
        }
    }
}
