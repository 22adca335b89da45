// File: src/interpreter/instructions/code_ops.rs
//
// Instructions over the code stack, including the DO* combinator family.
// The combinators implement iteration by constructing code at runtime and
// pushing it onto the exec stack — there are no host loops here.

use super::super::{code, Interpreter, PushType, Value};
use crate::interpreter::random::random_value;

/// CODE.APPEND — pop two (coerced to lists), push their concatenation
pub(crate) fn append(vm: &mut Interpreter) {
    if vm.stacks.code.len() < 2 {
        return;
    }
    let (Some(a), Some(b)) = (vm.pop_code_list(), vm.pop_code_list()) else {
        return;
    };
    let joined = code::concat(&mut vm.heap, a, b);
    vm.stacks.code.push(joined);
}

/// CODE.ATOM — true iff the top is not a code list
pub(crate) fn atom(vm: &mut Interpreter) {
    let Some(v) = vm.stacks.code.pop() else {
        return;
    };
    let is_atom = !vm.heap.is_code(v);
    vm.push_bool(is_atom);
}

/// CODE.CAR — first element of the top list; a non-list is left as-is
pub(crate) fn car(vm: &mut Interpreter) {
    let Some(v) = vm.stacks.code.pop() else {
        return;
    };
    match vm.heap.code_children(v) {
        Some(children) => {
            if let Some(&head) = children.first() {
                vm.stacks.code.push(head);
            }
        }
        None => vm.stacks.code.push(v),
    }
}

/// CODE.CDR — the top list without its first element; a non-list becomes
/// the empty list
pub(crate) fn cdr(vm: &mut Interpreter) {
    let Some(v) = vm.stacks.code.pop() else {
        return;
    };
    let rest: Vec<_> = match vm.heap.code_children(v) {
        Some(children) => children.iter().skip(1).copied().collect(),
        None => Vec::new(),
    };
    let rest = vm.alloc_code(rest);
    vm.stacks.code.push(rest);
}

/// CODE.CONS — prepend the second item onto the top list
pub(crate) fn cons(vm: &mut Interpreter) {
    if vm.stacks.code.len() < 2 {
        return;
    }
    let Some(list) = vm.pop_code_list() else {
        return;
    };
    let Some(head) = vm.stacks.code.pop() else {
        return;
    };
    let mut children = vm.heap.code_children(list).map(|c| c.to_vec()).unwrap_or_default();
    children.insert(0, head);
    let consed = vm.alloc_code(children);
    vm.stacks.code.push(consed);
}

/// CODE.CONTAINER — smallest sub-list of the top item containing the
/// second item; the empty list when there is none
pub(crate) fn container(vm: &mut Interpreter) {
    if vm.stacks.code.len() < 2 {
        return;
    }
    let Some(haystack) = vm.pop_code_list() else {
        return;
    };
    let Some(needle) = vm.stacks.code.pop() else {
        return;
    };
    match code::container(&vm.heap, haystack, needle) {
        Some(found) => vm.stacks.code.push(found),
        None => {
            let empty = vm.alloc_code(Vec::new());
            vm.stacks.code.push(empty);
        }
    }
}

/// CODE.CONTAINS — true iff the top item contains the second anywhere
pub(crate) fn contains(vm: &mut Interpreter) {
    if vm.stacks.code.len() < 2 {
        return;
    }
    let Some(haystack) = vm.pop_code_list() else {
        return;
    };
    let Some(needle) = vm.stacks.code.pop() else {
        return;
    };
    let found = code::contains(&vm.heap, haystack, needle);
    vm.push_bool(found);
}

/// CODE.DEFINITION — push the binding of the top name, if any
pub(crate) fn definition(vm: &mut Interpreter) {
    let Some(name_val) = vm.stacks.name.pop() else {
        return;
    };
    let Some(name) = vm.heap.get(name_val).as_name() else {
        return;
    };
    if let Some(bound) = vm.lookup(name) {
        vm.stacks.code.push(bound);
    }
}

/// CODE.DISCREPANCY — structural distance of the top two items, onto the
/// integer stack
pub(crate) fn discrepancy(vm: &mut Interpreter) {
    if vm.stacks.code.len() < 2 {
        return;
    }
    let (Some(a), Some(b)) = (vm.pop_code_list(), vm.pop_code_list()) else {
        return;
    };
    let d = code::discrepancy(&vm.heap, a, b);
    vm.push_int(d);
}

/// CODE.DO — execute the top of the code stack, popping it afterwards
pub(crate) fn do_(vm: &mut Interpreter) {
    let Some(top) = vm.stacks.code.peek() else {
        return;
    };
    // CODE.POP runs after the code itself has been executed
    let pop_instr = vm.instr_val("CODE.POP");
    vm.stacks.exec.push(pop_instr);
    vm.stacks.exec.push(top);
}

/// CODE.DO* — pop the top of the code stack and execute it
pub(crate) fn do_star(vm: &mut Interpreter) {
    let Some(top) = vm.pop_code_list() else {
        return;
    };
    vm.stacks.exec.push(top);
}

/// CODE.DO*COUNT — loop the popped body n times with the index visible,
/// by expanding to ( 0 n-1 CODE.QUOTE body CODE.DO*RANGE )
pub(crate) fn do_count(vm: &mut Interpreter) {
    if vm.stacks.code.is_empty() || vm.stacks.integer.is_empty() {
        return;
    }
    let Some(n) = vm.int_at(0) else {
        return;
    };
    let Some(body) = vm.stacks.code.pop() else {
        return;
    };
    vm.stacks.integer.pop();
    if n <= 0 {
        return;
    }
    let zero = vm.heap.alloc(Value::Int(0));
    let last = vm.heap.alloc(Value::Int(n - 1));
    let quote = vm.instr_val("CODE.QUOTE");
    let do_range = vm.instr_val("CODE.DO*RANGE");
    let expansion = vm.alloc_code(vec![zero, last, quote, body, do_range]);
    vm.stacks.exec.push(expansion);
}

/// CODE.DO*RANGE — one loop iteration: push the current index back, run
/// the body, and re-inject a recursive call with the index stepped toward
/// the destination
pub(crate) fn do_range(vm: &mut Interpreter) {
    if vm.stacks.code.is_empty() || vm.stacks.integer.len() < 2 {
        return;
    }
    let (Some(dest), Some(current)) = (vm.int_at(0), vm.int_at(1)) else {
        return;
    };
    let Some(body) = vm.stacks.code.pop() else {
        return;
    };
    let Some(dest_val) = vm.stacks.integer.pop() else {
        return;
    };
    let Some(current_val) = vm.stacks.integer.pop() else {
        vm.stacks.integer.push(dest_val);
        return;
    };

    // the loop body sees the current index
    vm.stacks.integer.push(current_val);

    if dest != current {
        let step = if dest > current { 1 } else { -1 };
        let next = vm.heap.alloc(Value::Int(current.wrapping_add(step)));
        let quote = vm.instr_val("CODE.QUOTE");
        let recurse = vm.instr_val("CODE.DO*RANGE");
        let continuation = vm.alloc_code(vec![dest_val, next, quote, body, recurse]);
        vm.stacks.exec.push(continuation);
    }
    vm.stacks.exec.push(body);
}

/// CODE.DO*TIMES — loop the popped body n times with the index discarded:
/// the body is prefixed with INT.POP and fed through DO*RANGE
pub(crate) fn do_times(vm: &mut Interpreter) {
    if vm.stacks.code.is_empty() || vm.stacks.integer.is_empty() {
        return;
    }
    let Some(n) = vm.int_at(0) else {
        return;
    };
    let Some(body) = vm.pop_code_list() else {
        return;
    };
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
    let quote = vm.instr_val("CODE.QUOTE");
    let do_range = vm.instr_val("CODE.DO*RANGE");
    let expansion = vm.alloc_code(vec![zero, last, quote, popped_body, do_range]);
    vm.stacks.exec.push(expansion);
}

/// CODE.EXTRACT — subtree of the top item at the preorder point given by
/// the top integer, reduced modulo the point count
pub(crate) fn extract(vm: &mut Interpreter) {
    if vm.stacks.code.is_empty() || vm.stacks.integer.is_empty() {
        return;
    }
    let Some(n) = vm.int_at(0) else {
        return;
    };
    let Some(tree) = vm.stacks.code.pop() else {
        return;
    };
    vm.stacks.integer.pop();
    let sub = code::extract(&vm.heap, tree, n);
    vm.stacks.code.push(sub);
}

/// CODE.INSERT — replace the point addressed by the top integer in the
/// top item with the second item
pub(crate) fn insert(vm: &mut Interpreter) {
    if vm.stacks.code.len() < 2 || vm.stacks.integer.is_empty() {
        return;
    }
    let Some(n) = vm.int_at(0) else {
        return;
    };
    let Some(tree) = vm.pop_code_list() else {
        return;
    };
    let Some(replacement) = vm.stacks.code.pop() else {
        return;
    };
    vm.stacks.integer.pop();
    let rebuilt = code::replace(&mut vm.heap, tree, n, replacement);
    vm.stacks.code.push(rebuilt);
}

/// CODE.INSTRUCTIONS — push a list of every registered instruction
pub(crate) fn instructions(vm: &mut Interpreter) {
    let ids: Vec<_> = vm.instr_ids().collect();
    let children: Vec<_> = ids.into_iter().map(|id| vm.heap.alloc(Value::Instr(id))).collect();
    let list = vm.alloc_code(children);
    vm.stacks.code.push(list);
}

/// CODE.LENGTH — number of direct children of the top item
pub(crate) fn length(vm: &mut Interpreter) {
    let Some(list) = vm.pop_code_list() else {
        return;
    };
    let len = vm.heap.code_children(list).map(|c| c.len()).unwrap_or(0) as i64;
    vm.push_int(len);
}

/// CODE.LIST — a fresh list of the top two items
pub(crate) fn list(vm: &mut Interpreter) {
    if vm.stacks.code.len() < 2 {
        return;
    }
    let (Some(a), Some(b)) = (vm.stacks.code.pop(), vm.stacks.code.pop()) else {
        return;
    };
    let listed = vm.alloc_code(vec![a, b]);
    vm.stacks.code.push(listed);
}

/// CODE.MEMBER — true iff the second item equals a direct child of the top
pub(crate) fn member(vm: &mut Interpreter) {
    if vm.stacks.code.len() < 2 {
        return;
    }
    let Some(list) = vm.pop_code_list() else {
        return;
    };
    let Some(needle) = vm.stacks.code.pop() else {
        return;
    };
    let found = code::index_of(&vm.heap, list, needle).is_some();
    vm.push_bool(found);
}

/// CODE.NOOP — does nothing, usefully
pub(crate) fn noop(_vm: &mut Interpreter) {}

/// CODE.NTH — child of the top item at the index given by the top
/// integer, reduced modulo the length
pub(crate) fn nth(vm: &mut Interpreter) {
    if vm.stacks.code.is_empty() || vm.stacks.integer.is_empty() {
        return;
    }
    let Some(n) = vm.int_at(0) else {
        return;
    };
    vm.stacks.integer.pop();
    let Some(list) = vm.pop_code_list() else {
        return;
    };
    let children = vm.heap.code_children(list).map(|c| c.to_vec()).unwrap_or_default();
    if children.is_empty() {
        return;
    }
    let idx = n.rem_euclid(children.len() as i64) as usize;
    vm.stacks.code.push(children[idx]);
}

/// CODE.NTHCDR — the top item without its first n children
pub(crate) fn nthcdr(vm: &mut Interpreter) {
    if vm.stacks.code.is_empty() || vm.stacks.integer.is_empty() {
        return;
    }
    let Some(n) = vm.int_at(0) else {
        return;
    };
    vm.stacks.integer.pop();
    let Some(list) = vm.pop_code_list() else {
        return;
    };
    let children = vm.heap.code_children(list).map(|c| c.to_vec()).unwrap_or_default();
    if children.is_empty() {
        vm.stacks.code.push(list);
        return;
    }
    let idx = n.rem_euclid(children.len() as i64) as usize;
    if idx == 0 {
        vm.stacks.code.push(list);
    } else {
        let suffix = vm.alloc_code(children[idx..].to_vec());
        vm.stacks.code.push(suffix);
    }
}

/// CODE.NULL — true iff the top item is the empty list
pub(crate) fn null(vm: &mut Interpreter) {
    let Some(v) = vm.stacks.code.pop() else {
        return;
    };
    let is_empty_list = vm.heap.code_children(v).map(|c| c.is_empty()).unwrap_or(false);
    vm.push_bool(is_empty_list);
}

/// CODE.POSITION — index of the second item among the top item's direct
/// children, -1 when absent, onto the integer stack
pub(crate) fn position(vm: &mut Interpreter) {
    if vm.stacks.code.len() < 2 {
        return;
    }
    let Some(list) = vm.pop_code_list() else {
        return;
    };
    let Some(needle) = vm.stacks.code.pop() else {
        return;
    };
    let idx = code::index_of(&vm.heap, list, needle).map(|i| i as i64).unwrap_or(-1);
    vm.push_int(idx);
}

/// CODE.QUOTE — move the next exec item onto the code stack unexecuted
pub(crate) fn quote(vm: &mut Interpreter) {
    let Some(v) = vm.stacks.exec.pop() else {
        return;
    };
    vm.stacks.code.push(v);
}

/// CODE.RAND — random code of up to the popped number of points, clamped
/// by MAX-POINTS-IN-RANDOM-EXPRESSIONS
pub(crate) fn rand(vm: &mut Interpreter) {
    let Some(n) = vm.int_at(0) else {
        return;
    };
    vm.stacks.integer.pop();
    let mut budget = n;
    if let Some(max_points) = vm.config_int("MAX-POINTS-IN-RANDOM-EXPRESSIONS") {
        if max_points < budget {
            budget = max_points;
        }
    }
    let kind = if budget == 1 { None } else { Some(PushType::Code) };
    let v = random_value(vm, kind, &mut budget, true);
    vm.stacks.code.push(v);
}

/// CODE.SIZE — point count of the top item, onto the integer stack
pub(crate) fn size(vm: &mut Interpreter) {
    let Some(v) = vm.stacks.code.pop() else {
        return;
    };
    let points = code::size(&vm.heap, v);
    vm.push_int(points);
}

/// CODE.FROMBOOL — move the top boolean onto the code stack
pub(crate) fn from_bool(vm: &mut Interpreter) {
    if let Some(v) = vm.stacks.boolean.pop() {
        vm.stacks.code.push(v);
    }
}

/// CODE.FROMINT — move the top integer onto the code stack
pub(crate) fn from_int(vm: &mut Interpreter) {
    if let Some(v) = vm.stacks.integer.pop() {
        vm.stacks.code.push(v);
    }
}

/// CODE.FROMNAME — move the top name onto the code stack
pub(crate) fn from_name(vm: &mut Interpreter) {
    if let Some(v) = vm.stacks.name.pop() {
        vm.stacks.code.push(v);
    }
}

/// CODE.FROMREAL — move the top real onto the code stack
pub(crate) fn from_real(vm: &mut Interpreter) {
    if let Some(v) = vm.stacks.real.pop() {
        vm.stacks.code.push(v);
    }
}

/// CODE.IF — pop two code items and a boolean; execute the second popped
/// when true, the first popped when false
pub(crate) fn if_(vm: &mut Interpreter) {
    if vm.stacks.code.len() < 2 || vm.stacks.boolean.is_empty() {
        return;
    }
    let (Some(first), Some(second)) = (vm.stacks.code.pop(), vm.stacks.code.pop()) else {
        return;
    };
    let Some(cond_val) = vm.stacks.boolean.pop() else {
        return;
    };
    let cond = vm.heap.get(cond_val).as_bool().unwrap_or(false);
    vm.stacks.exec.push(if cond { second } else { first });
}
