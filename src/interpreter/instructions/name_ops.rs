// File: src/interpreter/instructions/name_ops.rs
//
// Name-stack instructions.

use super::super::Interpreter;
use crate::interpreter::random::{random_bound_name, random_name};

/// NAME.QUOTE — move the next exec item onto the name stack, but only if
/// it is a name; anything else is put back
pub(crate) fn quote(vm: &mut Interpreter) {
    let Some(v) = vm.stacks.exec.pop() else {
        return;
    };
    if vm.heap.get(v).as_name().is_some() {
        vm.stacks.name.push(v);
    } else {
        vm.stacks.exec.push(v);
    }
}

/// NAME.RAND — push a fresh random name
pub(crate) fn rand(vm: &mut Interpreter) {
    let name = random_name(vm);
    vm.push_name(name);
}

/// NAME.RANDBOUNDNAME — push a currently-bound name drawn uniformly, or a
/// fresh random name when nothing is bound
pub(crate) fn rand_bound_name(vm: &mut Interpreter) {
    let name = random_bound_name(vm);
    vm.push_name(name);
}
