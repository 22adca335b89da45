// File: src/interpreter/instructions/logic.rs
//
// Boolean instructions.

use super::super::{Interpreter, PushType};
use crate::interpreter::random::random_value;

pub(crate) fn and(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.bool_at(0), vm.bool_at(1)) else {
        return;
    };
    vm.stacks.boolean.pop();
    vm.stacks.boolean.pop();
    vm.push_bool(a && b);
}

pub(crate) fn or(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.bool_at(0), vm.bool_at(1)) else {
        return;
    };
    vm.stacks.boolean.pop();
    vm.stacks.boolean.pop();
    vm.push_bool(a || b);
}

pub(crate) fn not(vm: &mut Interpreter) {
    let Some(a) = vm.bool_at(0) else {
        return;
    };
    vm.stacks.boolean.pop();
    vm.push_bool(!a);
}

pub(crate) fn from_int(vm: &mut Interpreter) {
    let Some(i) = vm.int_at(0) else {
        return;
    };
    vm.stacks.integer.pop();
    vm.push_bool(i != 0);
}

pub(crate) fn from_real(vm: &mut Interpreter) {
    let Some(r) = vm.real_at(0) else {
        return;
    };
    vm.stacks.real.pop();
    vm.push_bool(r != 0.0);
}

pub(crate) fn rand(vm: &mut Interpreter) {
    let mut budget = 1;
    let v = random_value(vm, Some(PushType::Bool), &mut budget, false);
    vm.stacks.boolean.push(v);
}
