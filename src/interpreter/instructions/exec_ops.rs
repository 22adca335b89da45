// File: src/interpreter/instructions/exec_ops.rs
//
// Combinators over the exec stack. DO*RANGE/DO*TIMES/DO*COUNT mirror the
// code-stack family but take their body directly from exec, so the
// re-injected continuation places the recursive instruction before the
// body; S, K and Y are the classic combinators acting on pending work.

use super::super::{Interpreter, Value};

/// EXEC.DO*COUNT — loop the next exec item n times with the index
/// visible, expanding to ( 0 n-1 EXEC.DO*RANGE body )
pub(crate) fn do_count(vm: &mut Interpreter) {
    if vm.stacks.exec.is_empty() || vm.stacks.integer.is_empty() {
        return;
    }
    let Some(n) = vm.int_at(0) else {
        return;
    };
    let Some(body) = vm.stacks.exec.pop() else {
        return;
    };
    vm.stacks.integer.pop();
    if n <= 0 {
        return;
    }
    let zero = vm.heap.alloc(Value::Int(0));
    let last = vm.heap.alloc(Value::Int(n - 1));
    let do_range = vm.instr_val("EXEC.DO*RANGE");
    let expansion = vm.alloc_code(vec![zero, last, do_range, body]);
    vm.stacks.exec.push(expansion);
}

/// EXEC.DO*RANGE — one loop iteration over the next exec item
pub(crate) fn do_range(vm: &mut Interpreter) {
    if vm.stacks.exec.is_empty() || vm.stacks.integer.len() < 2 {
        return;
    }
    let (Some(dest), Some(current)) = (vm.int_at(0), vm.int_at(1)) else {
        return;
    };
    let Some(body) = vm.stacks.exec.pop() else {
        return;
    };
    let Some(dest_val) = vm.stacks.integer.pop() else {
        return;
    };
    let Some(current_val) = vm.stacks.integer.pop() else {
        vm.stacks.integer.push(dest_val);
        return;
    };

    vm.stacks.integer.push(current_val);

    if dest != current {
        let step = if dest > current { 1 } else { -1 };
        let next = vm.heap.alloc(Value::Int(current.wrapping_add(step)));
        let recurse = vm.instr_val("EXEC.DO*RANGE");
        let continuation = vm.alloc_code(vec![dest_val, next, recurse, body]);
        vm.stacks.exec.push(continuation);
    }
    vm.stacks.exec.push(body);
}

/// EXEC.DO*TIMES — loop the next exec item n times, discarding the index
/// by prefixing the body with INT.POP
pub(crate) fn do_times(vm: &mut Interpreter) {
    if vm.stacks.exec.is_empty() || vm.stacks.integer.is_empty() {
        return;
    }
    let Some(n) = vm.int_at(0) else {
        return;
    };
    let Some(raw_body) = vm.stacks.exec.pop() else {
        return;
    };
    let body = vm.make_code(raw_body);
    vm.stacks.integer.pop();
    if n <= 0 {
        return;
    }
    let int_pop = vm.instr_val("INT.POP");
    let mut body_children =
        vm.heap.code_children(body).map(|c| c.to_vec()).unwrap_or_default();
    body_children.insert(0, int_pop);
    let popped_body = vm.alloc_code(body_children);

    let zero = vm.heap.alloc(Value::Int(0));
    let last = vm.heap.alloc(Value::Int(n - 1));
    let do_range = vm.instr_val("EXEC.DO*RANGE");
    let expansion = vm.alloc_code(vec![zero, last, do_range, popped_body]);
    vm.stacks.exec.push(expansion);
}

/// EXEC.IF — keep the first pending item when the popped boolean is true,
/// the second when false
pub(crate) fn if_(vm: &mut Interpreter) {
    if vm.stacks.exec.len() < 2 || vm.stacks.boolean.is_empty() {
        return;
    }
    let Some(cond_val) = vm.stacks.boolean.pop() else {
        return;
    };
    let cond = vm.heap.get(cond_val).as_bool().unwrap_or(false);
    // discard the branch that is not taken
    vm.stacks.exec.pop_nth(if cond { 1 } else { 0 });
}

/// EXEC.K — discard the second pending item, keeping the top
pub(crate) fn k(vm: &mut Interpreter) {
    vm.stacks.exec.pop_nth(1);
}

/// EXEC.S — pop a, b, c; push ( b c ), then c, then a, so the eventual
/// execution order is a, c, ( b c )
pub(crate) fn s(vm: &mut Interpreter) {
    if vm.stacks.exec.len() < 3 {
        return;
    }
    let (Some(a), Some(b), Some(c)) =
        (vm.stacks.exec.pop(), vm.stacks.exec.pop(), vm.stacks.exec.pop())
    else {
        return;
    };
    let bc = vm.alloc_code(vec![b, c]);
    vm.stacks.exec.push(bc);
    vm.stacks.exec.push(c);
    vm.stacks.exec.push(a);
}

/// EXEC.Y — insert ( EXEC.Y top ) beneath the top pending item, yielding
/// a self-replicating fixed-point combinator
pub(crate) fn y(vm: &mut Interpreter) {
    let Some(top) = vm.stacks.exec.peek() else {
        return;
    };
    let y_instr = vm.instr_val("EXEC.Y");
    let replica = vm.alloc_code(vec![y_instr, top]);
    vm.stacks.exec.push_nth(1, replica);
}
