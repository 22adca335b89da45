// File: src/interpreter/instructions/stack_ops.rs
//
// Polymorphic stack manipulation: one handler per operation, shared by all
// six stacks. The target stack arrives as the dispatch parameter.

use super::super::{Interpreter, StackId};

/// T.= — pop two, push structural equality onto the boolean stack
pub(crate) fn equal(vm: &mut Interpreter, id: StackId) {
    if vm.stacks.get(id).len() < 2 {
        return;
    }
    let stack = vm.stacks.get_mut(id);
    let (Some(a), Some(b)) = (stack.pop(), stack.pop()) else {
        return;
    };
    let eq = vm.heap.equal(a, b);
    vm.push_bool(eq);
}

/// T.DEFINE — pop a value and a name, bind name -> value
pub(crate) fn define(vm: &mut Interpreter, id: StackId) {
    if vm.stacks.get(id).is_empty() || vm.stacks.name.is_empty() {
        return;
    }
    let Some(val) = vm.stacks.get_mut(id).pop() else {
        return;
    };
    let Some(name_val) = vm.stacks.name.pop() else {
        return;
    };
    if let Some(name) = vm.heap.get(name_val).as_name() {
        vm.define(name, val);
    }
}

/// T.DUP — push another reference to the top item
pub(crate) fn dup(vm: &mut Interpreter, id: StackId) {
    let stack = vm.stacks.get_mut(id);
    if let Some(top) = stack.peek() {
        stack.push(top);
    }
}

/// T.FLUSH — empty the stack
pub(crate) fn flush(vm: &mut Interpreter, id: StackId) {
    vm.stacks.get_mut(id).flush();
}

/// T.POP — discard the top item
pub(crate) fn pop(vm: &mut Interpreter, id: StackId) {
    vm.stacks.get_mut(id).pop();
}

/// T.ROT — rotate the top three so the third becomes the top
pub(crate) fn rot(vm: &mut Interpreter, id: StackId) {
    let stack = vm.stacks.get_mut(id);
    if stack.len() < 3 {
        return;
    }
    if let Some(third) = stack.pop_nth(2) {
        stack.push(third);
    }
}

/// T.SHOVE — pop an item and a depth from the integer stack, insert the
/// item at that depth (negative depths land on top, deep ones at the
/// bottom)
pub(crate) fn shove(vm: &mut Interpreter, id: StackId) {
    // when shoving the integer stack itself, the item sits above the depth
    let needed = if id == StackId::Int { 2 } else { 1 };
    if vm.stacks.get(id).len() < needed || vm.stacks.integer.is_empty() {
        return;
    }
    let Some(item) = vm.stacks.get_mut(id).pop() else {
        return;
    };
    let Some(depth_val) = vm.stacks.integer.pop() else {
        vm.stacks.get_mut(id).push(item);
        return;
    };
    let Some(n) = vm.heap.get(depth_val).as_int() else {
        vm.stacks.integer.push(depth_val);
        vm.stacks.get_mut(id).push(item);
        return;
    };
    vm.stacks.get_mut(id).push_nth(n.max(0) as usize, item);
}

/// T.STACKDEPTH — push the stack's length onto the integer stack
pub(crate) fn stackdepth(vm: &mut Interpreter, id: StackId) {
    let depth = vm.stacks.get(id).len() as i64;
    vm.push_int(depth);
}

/// T.SWAP — swap the top two items
pub(crate) fn swap(vm: &mut Interpreter, id: StackId) {
    let stack = vm.stacks.get_mut(id);
    if stack.len() < 2 {
        return;
    }
    if let Some(top) = stack.pop() {
        stack.push_nth(1, top);
    }
}

/// T.YANK — pop a depth from the integer stack, pull the item at that
/// depth to the top. An invalid depth restores the index, leaving every
/// stack as it was.
pub(crate) fn yank(vm: &mut Interpreter, id: StackId) {
    let Some(depth_val) = vm.stacks.integer.pop() else {
        return;
    };
    let Some(n) = vm.heap.get(depth_val).as_int() else {
        vm.stacks.integer.push(depth_val);
        return;
    };
    let item = if n >= 0 { vm.stacks.get_mut(id).pop_nth(n as usize) } else { None };
    match item {
        Some(v) => vm.stacks.get_mut(id).push(v),
        None => vm.stacks.integer.push(depth_val),
    }
}

/// T.YANKDUP — pop a depth from the integer stack, push a reference to the
/// item at that depth
pub(crate) fn yankdup(vm: &mut Interpreter, id: StackId) {
    let Some(depth_val) = vm.stacks.integer.pop() else {
        return;
    };
    let Some(n) = vm.heap.get(depth_val).as_int() else {
        vm.stacks.integer.push(depth_val);
        return;
    };
    let item = if n >= 0 { vm.stacks.get(id).peek_nth(n as usize) } else { None };
    match item {
        Some(v) => vm.stacks.get_mut(id).push(v),
        None => vm.stacks.integer.push(depth_val),
    }
}
