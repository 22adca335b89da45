// File: src/interpreter/random.rs
//
// Random Push values, the raw material of evolution.
// Generation works against a shared size budget measured in points: every
// produced value consumes one, and a code value hands the remainder (or a
// uniform share of it) to its children. Numeric ranges, name lengths and
// the fresh-vs-bound name split all come from the interpreter's
// configuration.

use super::{InstrId, Interpreter, Name, PushType, Val, Value};
use crate::errors::warn;
use rand::Rng;

/// Generate a random value of `kind` (or a uniformly random concrete type
/// when `None`), decrementing `budget` by the number of points produced.
/// With `force_size` a code value spends the whole remaining budget on its
/// children instead of a uniform share.
pub fn random_value(
    vm: &mut Interpreter,
    kind: Option<PushType>,
    budget: &mut i64,
    force_size: bool,
) -> Val {
    if *budget < 1 {
        *budget = 1;
    }
    let kind = match kind {
        Some(k) => k,
        None => PushType::ALL[vm.rng.gen_range(0..PushType::ALL.len())],
    };
    *budget -= 1;

    let value = match kind {
        PushType::Bool => Value::Bool(vm.rng.gen_bool(0.5)),
        PushType::Code => Value::Code(random_code(vm, budget, force_size)),
        PushType::Int => Value::Int(random_int(vm)),
        PushType::Instr => match random_instr(vm) {
            Some(id) => Value::Instr(id),
            None => Value::None,
        },
        PushType::Name => Value::Name(random_erc_name(vm)),
        PushType::Real => Value::Real(random_real(vm)),
    };
    vm.heap.alloc(value)
}

/// Children for a random code list, consuming from the shared budget
fn random_code(vm: &mut Interpreter, budget: &mut i64, force_size: bool) -> Vec<Val> {
    let mut this_size = if force_size || *budget == 0 {
        *budget
    } else {
        vm.rng.gen_range(0..*budget)
    };
    *budget -= this_size;

    let mut children = Vec::new();
    while this_size > 0 {
        children.push(random_value(vm, None, &mut this_size, false));
    }
    children
}

fn random_int(vm: &mut Interpreter) -> i64 {
    let min = vm.config_int("MIN-RANDOM-INT").unwrap_or(-100);
    let max = vm.config_int("MAX-RANDOM-INT").unwrap_or(100);
    if min < max {
        vm.rng.gen_range(min..max)
    } else {
        min
    }
}

fn random_real(vm: &mut Interpreter) -> f64 {
    let min = vm.config_real("MIN-RANDOM-REAL").unwrap_or(0.0);
    let max = vm.config_real("MAX-RANDOM-REAL").unwrap_or(1.0);
    if min < max {
        vm.rng.gen_range(min..max)
    } else {
        min
    }
}

fn random_instr(vm: &mut Interpreter) -> Option<InstrId> {
    let count = vm.instr_count();
    if count == 0 {
        return None;
    }
    let i = vm.rng.gen_range(0..count);
    vm.instr_ids().nth(i)
}

/// A fresh random name: uppercase ASCII letters, length drawn from the
/// configured range
pub fn random_name(vm: &mut Interpreter) -> Name {
    let min = vm.config_int("MIN-RANDOM-NAME-LENGTH").unwrap_or(2).max(1);
    let max = vm.config_int("MAX-RANDOM-NAME-LENGTH").unwrap_or(16);
    let length = if min < max { vm.rng.gen_range(min..max) } else { min };

    let mut buf = String::with_capacity(length as usize);
    for _ in 0..length {
        buf.push(vm.rng.gen_range(b'A'..=b'Z') as char);
    }
    vm.intern(&buf)
}

/// A uniformly drawn currently-bound name, or a fresh random name when no
/// bindings exist
pub fn random_bound_name(vm: &mut Interpreter) -> Name {
    if vm.bindings.is_empty() {
        return random_name(vm);
    }
    let i = vm.rng.gen_range(0..vm.bindings.len());
    match vm.bindings.keys().nth(i).copied() {
        Some(name) => name,
        None => random_name(vm),
    }
}

/// Name for an ephemeral random constant: fresh with the configured
/// probability, otherwise drawn from the current bindings
fn random_erc_name(vm: &mut Interpreter) -> Name {
    match vm.config_real("NEW-ERC-NAME-PROBABILITY") {
        Some(p) => {
            if vm.rng.gen::<f64>() < p {
                random_name(vm)
            } else {
                random_bound_name(vm)
            }
        }
        None => {
            warn("configuration value 'NEW-ERC-NAME-PROBABILITY' is not a real number");
            random_name(vm)
        }
    }
}
