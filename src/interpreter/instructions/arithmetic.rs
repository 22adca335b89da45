// File: src/interpreter/instructions/arithmetic.rs
//
// Integer and real arithmetic. Binary operators compute `second op top`.
// Division or modulus by zero is a no-op that leaves every stack
// untouched; the modulus follows the mathematical (positive-result) sign
// convention. Integer arithmetic wraps on overflow — randomly generated
// programs multiply whatever they find.

use super::super::{Interpreter, PushType};
use crate::interpreter::random::random_value;

// ---- INT ----

pub(crate) fn int_add(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.int_at(0), vm.int_at(1)) else {
        return;
    };
    vm.stacks.integer.pop();
    vm.stacks.integer.pop();
    vm.push_int(b.wrapping_add(a));
}

pub(crate) fn int_sub(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.int_at(0), vm.int_at(1)) else {
        return;
    };
    vm.stacks.integer.pop();
    vm.stacks.integer.pop();
    vm.push_int(b.wrapping_sub(a));
}

pub(crate) fn int_mul(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.int_at(0), vm.int_at(1)) else {
        return;
    };
    vm.stacks.integer.pop();
    vm.stacks.integer.pop();
    vm.push_int(b.wrapping_mul(a));
}

pub(crate) fn int_div(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.int_at(0), vm.int_at(1)) else {
        return;
    };
    if a == 0 {
        return;
    }
    vm.stacks.integer.pop();
    vm.stacks.integer.pop();
    vm.push_int(b.wrapping_div(a));
}

pub(crate) fn int_mod(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.int_at(0), vm.int_at(1)) else {
        return;
    };
    if a == 0 {
        return;
    }
    vm.stacks.integer.pop();
    vm.stacks.integer.pop();
    vm.push_int(b.checked_rem_euclid(a).unwrap_or(0));
}

pub(crate) fn int_less(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.int_at(0), vm.int_at(1)) else {
        return;
    };
    vm.stacks.integer.pop();
    vm.stacks.integer.pop();
    vm.push_bool(b < a);
}

pub(crate) fn int_greater(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.int_at(0), vm.int_at(1)) else {
        return;
    };
    vm.stacks.integer.pop();
    vm.stacks.integer.pop();
    vm.push_bool(b > a);
}

pub(crate) fn int_min(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.int_at(0), vm.int_at(1)) else {
        return;
    };
    vm.stacks.integer.pop();
    vm.stacks.integer.pop();
    vm.push_int(a.min(b));
}

pub(crate) fn int_max(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.int_at(0), vm.int_at(1)) else {
        return;
    };
    vm.stacks.integer.pop();
    vm.stacks.integer.pop();
    vm.push_int(a.max(b));
}

pub(crate) fn int_from_bool(vm: &mut Interpreter) {
    let Some(b) = vm.bool_at(0) else {
        return;
    };
    vm.stacks.boolean.pop();
    vm.push_int(if b { 1 } else { 0 });
}

pub(crate) fn int_from_real(vm: &mut Interpreter) {
    let Some(r) = vm.real_at(0) else {
        return;
    };
    vm.stacks.real.pop();
    vm.push_int(r as i64);
}

pub(crate) fn int_rand(vm: &mut Interpreter) {
    let mut budget = 1;
    let v = random_value(vm, Some(PushType::Int), &mut budget, false);
    vm.stacks.integer.push(v);
}

// ---- REAL ----

pub(crate) fn real_add(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.real_at(0), vm.real_at(1)) else {
        return;
    };
    vm.stacks.real.pop();
    vm.stacks.real.pop();
    vm.push_real(b + a);
}

pub(crate) fn real_sub(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.real_at(0), vm.real_at(1)) else {
        return;
    };
    vm.stacks.real.pop();
    vm.stacks.real.pop();
    vm.push_real(b - a);
}

pub(crate) fn real_mul(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.real_at(0), vm.real_at(1)) else {
        return;
    };
    vm.stacks.real.pop();
    vm.stacks.real.pop();
    vm.push_real(b * a);
}

pub(crate) fn real_div(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.real_at(0), vm.real_at(1)) else {
        return;
    };
    if a == 0.0 {
        return;
    }
    vm.stacks.real.pop();
    vm.stacks.real.pop();
    vm.push_real(b / a);
}

pub(crate) fn real_mod(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.real_at(0), vm.real_at(1)) else {
        return;
    };
    if a == 0.0 {
        return;
    }
    vm.stacks.real.pop();
    vm.stacks.real.pop();
    vm.push_real(b.rem_euclid(a));
}

pub(crate) fn real_less(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.real_at(0), vm.real_at(1)) else {
        return;
    };
    vm.stacks.real.pop();
    vm.stacks.real.pop();
    vm.push_bool(b < a);
}

pub(crate) fn real_greater(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.real_at(0), vm.real_at(1)) else {
        return;
    };
    vm.stacks.real.pop();
    vm.stacks.real.pop();
    vm.push_bool(b > a);
}

pub(crate) fn real_min(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.real_at(0), vm.real_at(1)) else {
        return;
    };
    vm.stacks.real.pop();
    vm.stacks.real.pop();
    vm.push_real(a.min(b));
}

pub(crate) fn real_max(vm: &mut Interpreter) {
    let (Some(a), Some(b)) = (vm.real_at(0), vm.real_at(1)) else {
        return;
    };
    vm.stacks.real.pop();
    vm.stacks.real.pop();
    vm.push_real(a.max(b));
}

pub(crate) fn real_sin(vm: &mut Interpreter) {
    let Some(r) = vm.real_at(0) else {
        return;
    };
    vm.stacks.real.pop();
    vm.push_real(r.sin());
}

pub(crate) fn real_cos(vm: &mut Interpreter) {
    let Some(r) = vm.real_at(0) else {
        return;
    };
    vm.stacks.real.pop();
    vm.push_real(r.cos());
}

pub(crate) fn real_tan(vm: &mut Interpreter) {
    let Some(r) = vm.real_at(0) else {
        return;
    };
    vm.stacks.real.pop();
    vm.push_real(r.tan());
}

pub(crate) fn real_exp(vm: &mut Interpreter) {
    let Some(r) = vm.real_at(0) else {
        return;
    };
    vm.stacks.real.pop();
    vm.push_real(r.exp());
}

pub(crate) fn real_log(vm: &mut Interpreter) {
    let Some(r) = vm.real_at(0) else {
        return;
    };
    vm.stacks.real.pop();
    vm.push_real(r.ln());
}

pub(crate) fn real_from_bool(vm: &mut Interpreter) {
    let Some(b) = vm.bool_at(0) else {
        return;
    };
    vm.stacks.boolean.pop();
    vm.push_real(if b { 1.0 } else { 0.0 });
}

pub(crate) fn real_from_int(vm: &mut Interpreter) {
    let Some(i) = vm.int_at(0) else {
        return;
    };
    vm.stacks.integer.pop();
    vm.push_real(i as f64);
}

pub(crate) fn real_rand(vm: &mut Interpreter) {
    let mut budget = 1;
    let v = random_value(vm, Some(PushType::Real), &mut budget, false);
    vm.stacks.real.push(v);
}
