// Integration tests for the Push interpreter
//
// These tests drive complete programs through the execution loop and
// check the resulting stack states. Covered here:
// - dispatch of literals, names, code lists and instructions
// - the polymorphic stack operators and their underflow behavior
// - arithmetic, including the positive-result modulus and zero divisors
// - the DO*RANGE / DO*TIMES / DO*COUNT combinator family
// - EXEC.S / EXEC.K / EXEC.Y and conditional execution
// - code-tree operators (container, extract, insert, size, ...)
// - garbage collection liveness across long runs

use pushvm::interpreter::{code, Interpreter, StackId, Val, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn int(vm: &mut Interpreter, i: i64) -> Val {
    vm.heap.alloc(Value::Int(i))
}

fn real(vm: &mut Interpreter, r: f64) -> Val {
    vm.heap.alloc(Value::Real(r))
}

fn boolean(vm: &mut Interpreter, b: bool) -> Val {
    vm.heap.alloc(Value::Bool(b))
}

fn instr(vm: &mut Interpreter, name: &str) -> Val {
    let id = vm.instr_lookup(name).unwrap_or_else(|| panic!("missing instruction {}", name));
    vm.heap.alloc(Value::Instr(id))
}

/// Push a program (as a code list) onto exec and run it to completion
fn run_program(vm: &mut Interpreter, children: Vec<Val>) -> u64 {
    let program = vm.alloc_code(children);
    vm.stacks.exec.push(program);
    vm.run(0)
}

fn int_stack(vm: &Interpreter) -> Vec<i64> {
    // bottom to top
    let mut out: Vec<i64> = vm
        .stacks
        .integer
        .iter_top_down()
        .map(|&v| vm.heap.get(v).as_int().expect("non-int on integer stack"))
        .collect();
    out.reverse();
    out
}

fn snapshot(vm: &Interpreter) -> Vec<String> {
    StackId::ALL
        .iter()
        .map(|&id| {
            vm.stacks
                .get(id)
                .iter_top_down()
                .map(|&v| vm.display_value(v))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

#[test]
fn test_literal_dispatch_two_plus_three() {
    let mut vm = Interpreter::with_seed(1);
    let two = int(&mut vm, 2);
    let three = int(&mut vm, 3);
    let add = instr(&mut vm, "INT.+");
    run_program(&mut vm, vec![two, three, add]);

    assert_eq!(vm.int_at(0), Some(5));
    assert_eq!(vm.stacks.integer.len(), 1);
    for id in [StackId::Bool, StackId::Code, StackId::Exec, StackId::Name, StackId::Real] {
        assert!(vm.stacks.get(id).is_empty(), "{} stack not empty", id.title());
    }
}

#[test]
fn test_code_lists_expand_leftmost_first() {
    let mut vm = Interpreter::with_seed(1);
    let a = int(&mut vm, 1);
    let b = int(&mut vm, 2);
    let inner = vm.alloc_code(vec![a, b]);
    let c = int(&mut vm, 3);
    run_program(&mut vm, vec![inner, c]);

    // 1 executed first, 3 last
    assert_eq!(int_stack(&vm), vec![1, 2, 3]);
}

#[test]
fn test_step_on_empty_exec_is_done() {
    let mut vm = Interpreter::with_seed(1);
    assert!(vm.done());
    assert!(!vm.step());
    assert_eq!(vm.run(0), 0);
}

#[test]
fn test_unbound_name_lands_on_name_stack() {
    let mut vm = Interpreter::with_seed(1);
    let name = vm.intern("UNBOUND");
    let name_val = vm.heap.alloc(Value::Name(name));
    run_program(&mut vm, vec![name_val]);

    assert_eq!(vm.stacks.name.len(), 1);
    let top = vm.stacks.name.peek().unwrap();
    assert_eq!(vm.heap.get(top).as_name(), Some(name));
}

#[test]
fn test_bound_name_executes_its_definition() {
    let mut vm = Interpreter::with_seed(1);
    let two = int(&mut vm, 2);
    let three = int(&mut vm, 3);
    let add = instr(&mut vm, "INT.+");
    let body = vm.alloc_code(vec![two, three, add]);
    let name = vm.intern("ADDER");
    vm.define(name, body);

    let name_val = vm.heap.alloc(Value::Name(name));
    run_program(&mut vm, vec![name_val]);
    assert_eq!(vm.int_at(0), Some(5));
}

#[test]
fn test_define_refuses_name_to_name_binding() {
    let mut vm = Interpreter::with_seed(1);
    let target = vm.intern("TARGET");
    let other = vm.intern("OTHER");
    let other_val = vm.heap.alloc(Value::Name(other));
    vm.define(target, other_val);
    assert!(vm.lookup(target).is_none());

    let five = int(&mut vm, 5);
    vm.define(target, five);
    assert!(vm.lookup(target).is_some());
    vm.undef(target);
    assert!(vm.lookup(target).is_none());
}

#[test]
fn test_typed_define_instruction() {
    let mut vm = Interpreter::with_seed(1);
    // FIVE is unbound, so it lands on the name stack; INT.DEFINE binds it
    let name = vm.intern("FIVE");
    let name_val = vm.heap.alloc(Value::Name(name));
    let five = int(&mut vm, 5);
    let define = instr(&mut vm, "INT.DEFINE");
    run_program(&mut vm, vec![name_val, five, define]);

    let bound = vm.lookup(name).expect("FIVE should be bound");
    assert_eq!(vm.heap.get(bound).as_int(), Some(5));
    assert!(vm.stacks.integer.is_empty());
    assert!(vm.stacks.name.is_empty());
}

// ---- polymorphic stack manipulation ----

#[test]
fn test_dup_swap_rot() {
    let mut vm = Interpreter::with_seed(1);
    let (a, b, c) = (int(&mut vm, 1), int(&mut vm, 2), int(&mut vm, 3));
    let dup = instr(&mut vm, "INT.DUP");
    run_program(&mut vm, vec![a, b, c, dup]);
    assert_eq!(int_stack(&vm), vec![1, 2, 3, 3]);

    vm.flush();
    let (a, b, c) = (int(&mut vm, 1), int(&mut vm, 2), int(&mut vm, 3));
    let swap = instr(&mut vm, "INT.SWAP");
    run_program(&mut vm, vec![a, b, c, swap]);
    assert_eq!(int_stack(&vm), vec![1, 3, 2]);

    vm.flush();
    let (a, b, c) = (int(&mut vm, 1), int(&mut vm, 2), int(&mut vm, 3));
    let rot = instr(&mut vm, "INT.ROT");
    run_program(&mut vm, vec![a, b, c, rot]);
    assert_eq!(int_stack(&vm), vec![2, 3, 1]);
}

#[test]
fn test_shove_yank_yankdup() {
    let mut vm = Interpreter::with_seed(1);
    // shove the top item (9) to depth 2 of [1 2 3]; the depth sits below it
    let items: Vec<Val> = vec![1, 2, 3, 2, 9].into_iter().map(|i| int(&mut vm, i)).collect();
    let shove = instr(&mut vm, "INT.SHOVE");
    run_program(&mut vm, {
        let mut p = items.clone();
        p.push(shove);
        p
    });
    assert_eq!(int_stack(&vm), vec![1, 9, 2, 3]);

    vm.flush();
    let items: Vec<Val> = vec![10, 20, 30, 2].into_iter().map(|i| int(&mut vm, i)).collect();
    let yank = instr(&mut vm, "INT.YANK");
    run_program(&mut vm, {
        let mut p = items;
        p.push(yank);
        p
    });
    assert_eq!(int_stack(&vm), vec![20, 30, 10]);

    vm.flush();
    let items: Vec<Val> = vec![10, 20, 30, 2].into_iter().map(|i| int(&mut vm, i)).collect();
    let yankdup = instr(&mut vm, "INT.YANKDUP");
    run_program(&mut vm, {
        let mut p = items;
        p.push(yankdup);
        p
    });
    assert_eq!(int_stack(&vm), vec![10, 20, 30, 10]);
}

#[test]
fn test_yank_with_invalid_depth_restores_the_index() {
    let mut vm = Interpreter::with_seed(1);
    let items: Vec<Val> = vec![10, 20, 99].into_iter().map(|i| int(&mut vm, i)).collect();
    let yank = instr(&mut vm, "INT.YANK");
    run_program(&mut vm, {
        let mut p = items;
        p.push(yank);
        p
    });
    // depth 99 does not exist; the index is pushed back
    assert_eq!(int_stack(&vm), vec![10, 20, 99]);
}

#[test]
fn test_stackdepth_and_flush() {
    let mut vm = Interpreter::with_seed(1);
    let a = boolean(&mut vm, true);
    let b = boolean(&mut vm, false);
    let depth = instr(&mut vm, "BOOL.STACKDEPTH");
    run_program(&mut vm, vec![a, b, depth]);
    assert_eq!(vm.int_at(0), Some(2));

    let flush = instr(&mut vm, "BOOL.FLUSH");
    run_program(&mut vm, vec![flush]);
    assert!(vm.stacks.boolean.is_empty());
}

#[test]
fn test_structural_equality_instruction() {
    let mut vm = Interpreter::with_seed(1);
    let a1 = int(&mut vm, 1);
    let a2 = int(&mut vm, 2);
    let list_a = vm.alloc_code(vec![a1, a2]);
    let b1 = int(&mut vm, 1);
    let b2 = int(&mut vm, 2);
    let list_b = vm.alloc_code(vec![b1, b2]);

    vm.stacks.code.push(list_a);
    vm.stacks.code.push(list_b);
    let eq = instr(&mut vm, "CODE.=");
    run_program(&mut vm, vec![eq]);
    assert_eq!(vm.bool_at(0), Some(true));
}

#[test]
fn test_equality_is_reflexive_and_symmetric() {
    let mut vm = Interpreter::with_seed(7);
    let mut budget = 30;
    let v = pushvm::interpreter::random::random_value(&mut vm, None, &mut budget, true);
    let w = {
        let mut budget = 30;
        pushvm::interpreter::random::random_value(&mut vm, None, &mut budget, true)
    };
    assert!(vm.heap.equal(v, v));
    assert!(vm.heap.equal(w, w));
    assert_eq!(vm.heap.equal(v, w), vm.heap.equal(w, v));
}

// ---- underflow: every operand-poor instruction is a strict no-op ----

#[test]
fn test_underflow_leaves_all_stacks_identical() {
    let ops = [
        "INT.+", "INT.-", "INT.*", "INT./", "INT.%", "INT.LESS", "INT.GREATER", "INT.MIN",
        "INT.MAX", "INT.SWAP", "INT.ROT", "INT.SHOVE", "INT.YANK", "INT.YANKDUP", "BOOL.AND",
        "BOOL.OR", "BOOL.NOT", "REAL.+", "REAL./", "REAL.%", "CODE.APPEND", "CODE.CONS",
        "CODE.LIST", "CODE.MEMBER", "CODE.CONTAINER", "CODE.IF", "CODE.DO", "CODE.DO*RANGE",
        "CODE.DO*TIMES", "CODE.DO*COUNT", "EXEC.IF", "EXEC.S", "CODE.INSERT", "CODE.NTH",
        "NAME.=", "INT.DEFINE",
    ];
    // completely empty stacks
    for name in ops {
        let mut vm = Interpreter::with_seed(1);
        let before = snapshot(&vm);
        let id = vm.instr_lookup(name).unwrap();
        vm.call_instr(id);
        assert_eq!(before, snapshot(&vm), "{} changed state on empty stacks", name);
    }

    // one integer is not enough for a binary integer operator
    for name in ["INT.+", "INT.-", "INT.*", "INT./", "INT.%", "INT.SWAP"] {
        let mut vm = Interpreter::with_seed(1);
        let seven = int(&mut vm, 7);
        vm.stacks.integer.push(seven);
        let before = snapshot(&vm);
        let id = vm.instr_lookup(name).unwrap();
        vm.call_instr(id);
        assert_eq!(before, snapshot(&vm), "{} changed state with one operand", name);
    }

    // a body without two indices is not enough for DO*RANGE
    let mut vm = Interpreter::with_seed(1);
    let body = {
        let one = int(&mut vm, 1);
        vm.alloc_code(vec![one])
    };
    vm.stacks.code.push(body);
    let five = int(&mut vm, 5);
    vm.stacks.integer.push(five);
    let before = snapshot(&vm);
    let id = vm.instr_lookup("CODE.DO*RANGE").unwrap();
    vm.call_instr(id);
    assert_eq!(before, snapshot(&vm));
}

// ---- arithmetic ----

#[test]
fn test_division_and_modulus_by_zero_are_no_ops() {
    let mut vm = Interpreter::with_seed(1);
    let five = int(&mut vm, 5);
    let zero = int(&mut vm, 0);
    vm.stacks.integer.push(five);
    vm.stacks.integer.push(zero);
    let before = snapshot(&vm);
    for name in ["INT./", "INT.%"] {
        let id = vm.instr_lookup(name).unwrap();
        vm.call_instr(id);
        assert_eq!(before, snapshot(&vm), "{} with zero divisor must not touch stacks", name);
    }

    let mut vm = Interpreter::with_seed(1);
    let a = real(&mut vm, 5.0);
    let b = real(&mut vm, 0.0);
    vm.stacks.real.push(a);
    vm.stacks.real.push(b);
    let before = snapshot(&vm);
    for name in ["REAL./", "REAL.%"] {
        let id = vm.instr_lookup(name).unwrap();
        vm.call_instr(id);
        assert_eq!(before, snapshot(&vm), "{} with zero divisor must not touch stacks", name);
    }
}

#[test]
fn test_modulus_uses_positive_result_convention() {
    for (a, m, expected) in [(-7i64, 3i64, 2i64), (7, 3, 1), (-7, -3, 2), (7, -3, 1)] {
        let mut vm = Interpreter::with_seed(1);
        let av = int(&mut vm, a);
        let mv = int(&mut vm, m);
        let op = instr(&mut vm, "INT.%");
        run_program(&mut vm, vec![av, mv, op]);
        let got = vm.int_at(0).unwrap();
        assert_eq!(got, expected);
        // the result always lands in [0, |m|)
        assert!((0..m.abs()).contains(&got));
    }

    let mut vm = Interpreter::with_seed(1);
    let av = real(&mut vm, -7.5);
    let mv = real(&mut vm, 2.0);
    let op = instr(&mut vm, "REAL.%");
    run_program(&mut vm, vec![av, mv, op]);
    let got = vm.real_at(0).unwrap();
    assert!((got - 0.5).abs() < 1e-12);
}

#[test]
fn test_binary_operators_compute_second_op_top() {
    let mut vm = Interpreter::with_seed(1);
    let a = int(&mut vm, 10);
    let b = int(&mut vm, 3);
    let sub = instr(&mut vm, "INT.-");
    run_program(&mut vm, vec![a, b, sub]);
    assert_eq!(vm.int_at(0), Some(7));

    vm.flush();
    let a = int(&mut vm, 10);
    let b = int(&mut vm, 3);
    let div = instr(&mut vm, "INT./");
    run_program(&mut vm, vec![a, b, div]);
    assert_eq!(vm.int_at(0), Some(3));

    vm.flush();
    let a = int(&mut vm, 2);
    let b = int(&mut vm, 5);
    let less = instr(&mut vm, "INT.LESS");
    run_program(&mut vm, vec![a, b, less]);
    // 2 < 5 with 2 the second item
    assert_eq!(vm.bool_at(0), Some(true));
}

#[test]
fn test_conversions() {
    let mut vm = Interpreter::with_seed(1);
    let t = boolean(&mut vm, true);
    let to_int = instr(&mut vm, "INT.FROMBOOL");
    run_program(&mut vm, vec![t, to_int]);
    assert_eq!(vm.int_at(0), Some(1));

    vm.flush();
    let r = real(&mut vm, 3.9);
    let to_int = instr(&mut vm, "INT.FROMREAL");
    run_program(&mut vm, vec![r, to_int]);
    assert_eq!(vm.int_at(0), Some(3));

    vm.flush();
    let i = int(&mut vm, 4);
    let to_real = instr(&mut vm, "REAL.FROMINT");
    run_program(&mut vm, vec![i, to_real]);
    assert_eq!(vm.real_at(0), Some(4.0));

    vm.flush();
    let z = int(&mut vm, 0);
    let to_bool = instr(&mut vm, "BOOL.FROMINT");
    run_program(&mut vm, vec![z, to_bool]);
    assert_eq!(vm.bool_at(0), Some(false));
}

// ---- combinators ----

#[test]
fn test_code_do_times_with_dup_body() {
    // DO*TIMES with body (INT.DUP) starting from int [1]:
    // three iterations leave [1, 1, 1, 1]
    let mut vm = Interpreter::with_seed(1);
    let one = int(&mut vm, 1);
    vm.stacks.integer.push(one);

    let quote = instr(&mut vm, "CODE.QUOTE");
    let dup = instr(&mut vm, "INT.DUP");
    let body = vm.alloc_code(vec![dup]);
    let three = int(&mut vm, 3);
    let do_times = instr(&mut vm, "CODE.DO*TIMES");
    run_program(&mut vm, vec![quote, body, three, do_times]);

    assert_eq!(int_stack(&vm), vec![1, 1, 1, 1]);
}

#[test]
fn test_code_do_range_sums_the_indices() {
    // from current 0 to destination 3 with body (INT.+) over a stack of
    // zeros: the indices 0..=3 are each consumed once, so the top ends
    // at 0+1+2+3 = 6
    let mut vm = Interpreter::with_seed(1);
    for _ in 0..6 {
        let zero = int(&mut vm, 0);
        vm.stacks.integer.push(zero);
    }
    let quote = instr(&mut vm, "CODE.QUOTE");
    let add = instr(&mut vm, "INT.+");
    let body = vm.alloc_code(vec![add]);
    let current = int(&mut vm, 0);
    let dest = int(&mut vm, 3);
    let do_range = instr(&mut vm, "CODE.DO*RANGE");
    run_program(&mut vm, vec![quote, body, current, dest, do_range]);

    assert_eq!(vm.int_at(0), Some(6));
}

#[test]
fn test_exec_do_times_discards_the_index() {
    let mut vm = Interpreter::with_seed(1);
    let four = int(&mut vm, 4);
    let seven = int(&mut vm, 7);
    let do_times = instr(&mut vm, "EXEC.DO*TIMES");
    // EXEC.DO*TIMES pops the count, then loops the next exec item
    run_program(&mut vm, vec![four, do_times, seven]);
    assert_eq!(int_stack(&vm), vec![7, 7, 7, 7]);
}

#[test]
fn test_exec_do_count_keeps_the_index() {
    let mut vm = Interpreter::with_seed(1);
    let three = int(&mut vm, 3);
    let do_count = instr(&mut vm, "EXEC.DO*COUNT");
    let noop = instr(&mut vm, "CODE.NOOP");
    run_program(&mut vm, vec![three, do_count, noop]);
    // every index in 0..3 remains on the integer stack exactly once (the
    // recursive expansion visits them out of order)
    let mut left = int_stack(&vm);
    left.sort_unstable();
    assert_eq!(left, vec![0, 1, 2]);
}

#[test]
fn test_do_count_with_nonpositive_count_consumes_operands() {
    let mut vm = Interpreter::with_seed(1);
    let zero = int(&mut vm, 0);
    let body = {
        let one = int(&mut vm, 1);
        vm.alloc_code(vec![one])
    };
    vm.stacks.code.push(body);
    vm.stacks.integer.push(zero);
    let id = vm.instr_lookup("CODE.DO*COUNT").unwrap();
    vm.call_instr(id);
    assert!(vm.stacks.code.is_empty());
    assert!(vm.stacks.integer.is_empty());
    assert!(vm.stacks.exec.is_empty());
}

#[test]
fn test_code_if_picks_the_second_when_true() {
    for (cond, expected) in [(true, 2), (false, 1)] {
        let mut vm = Interpreter::with_seed(1);
        let quote = instr(&mut vm, "CODE.QUOTE");
        let second = int(&mut vm, 2);
        let quote2 = instr(&mut vm, "CODE.QUOTE");
        let first = int(&mut vm, 1);
        let cond_val = boolean(&mut vm, cond);
        let if_ = instr(&mut vm, "CODE.IF");
        run_program(&mut vm, vec![quote, second, quote2, first, cond_val, if_]);
        assert_eq!(vm.int_at(0), Some(expected));
        assert_eq!(vm.stacks.integer.len(), 1);
    }
}

#[test]
fn test_exec_if_discards_the_branch_not_taken() {
    for (cond, expected) in [(true, 1), (false, 2)] {
        let mut vm = Interpreter::with_seed(1);
        let cond_val = boolean(&mut vm, cond);
        let if_ = instr(&mut vm, "EXEC.IF");
        let first = int(&mut vm, 1);
        let second = int(&mut vm, 2);
        run_program(&mut vm, vec![cond_val, if_, first, second]);
        assert_eq!(int_stack(&vm), vec![expected]);
    }
}

#[test]
fn test_exec_k_and_s() {
    let mut vm = Interpreter::with_seed(1);
    let k = instr(&mut vm, "EXEC.K");
    let one = int(&mut vm, 1);
    let two = int(&mut vm, 2);
    run_program(&mut vm, vec![k, one, two]);
    assert_eq!(int_stack(&vm), vec![1]);

    vm.flush();
    let s = instr(&mut vm, "EXEC.S");
    let a = int(&mut vm, 1);
    let b = int(&mut vm, 2);
    let c = int(&mut vm, 3);
    run_program(&mut vm, vec![s, a, b, c]);
    // execution order a, c, (b c)
    assert_eq!(int_stack(&vm), vec![1, 3, 2, 3]);
}

#[test]
fn test_exec_y_is_stopped_by_the_step_budget() {
    let mut vm = Interpreter::with_seed(1);
    let y = instr(&mut vm, "EXEC.Y");
    let one = int(&mut vm, 1);
    let program = vm.alloc_code(vec![y, one]);
    vm.stacks.exec.push(program);

    let performed = vm.run(200);
    assert_eq!(performed, 200);
    assert!(!vm.done(), "the fixed-point combinator should still be re-injecting itself");
    assert!(vm.stacks.integer.len() > 10);
}

#[test]
fn test_exec_y_with_a_self_consuming_body_terminates() {
    let mut vm = Interpreter::with_seed(1);
    let y = instr(&mut vm, "EXEC.Y");
    let pop = instr(&mut vm, "EXEC.POP");
    let body = vm.alloc_code(vec![pop]);
    let program = vm.alloc_code(vec![y, body]);
    vm.stacks.exec.push(program);

    let performed = vm.run(100);
    assert!(performed < 100);
    assert!(vm.done());
}

#[test]
fn test_code_do_executes_then_pops() {
    let mut vm = Interpreter::with_seed(1);
    let five = int(&mut vm, 5);
    let body = vm.alloc_code(vec![five]);
    vm.stacks.code.push(body);
    let do_ = instr(&mut vm, "CODE.DO");
    run_program(&mut vm, vec![do_]);
    assert_eq!(vm.int_at(0), Some(5));
    assert!(vm.stacks.code.is_empty());
}

// ---- code-tree operators ----

#[test]
fn test_code_quote_moves_unexecuted() {
    let mut vm = Interpreter::with_seed(1);
    let quote = instr(&mut vm, "CODE.QUOTE");
    let add = instr(&mut vm, "INT.+");
    run_program(&mut vm, vec![quote, add]);
    assert!(vm.stacks.integer.is_empty());
    assert_eq!(vm.stacks.code.len(), 1);
    let top = vm.stacks.code.peek().unwrap();
    assert_eq!(vm.display_value(top), "INT.+");
}

#[test]
fn test_car_cdr_cons() {
    let mut vm = Interpreter::with_seed(1);
    let a = int(&mut vm, 1);
    let b = int(&mut vm, 2);
    let list = vm.alloc_code(vec![a, b]);
    vm.stacks.code.push(list);
    let car = instr(&mut vm, "CODE.CAR");
    run_program(&mut vm, vec![car]);
    assert_eq!(vm.display_value(vm.stacks.code.peek().unwrap()), "1");

    let mut vm = Interpreter::with_seed(1);
    let a = int(&mut vm, 1);
    let b = int(&mut vm, 2);
    let list = vm.alloc_code(vec![a, b]);
    vm.stacks.code.push(list);
    let cdr = instr(&mut vm, "CODE.CDR");
    run_program(&mut vm, vec![cdr]);
    assert_eq!(vm.display_value(vm.stacks.code.peek().unwrap()), "( 2 )");

    let mut vm = Interpreter::with_seed(1);
    let x = int(&mut vm, 0);
    let a = int(&mut vm, 1);
    let b = int(&mut vm, 2);
    let list = vm.alloc_code(vec![a, b]);
    vm.stacks.code.push(x);
    vm.stacks.code.push(list);
    let cons = instr(&mut vm, "CODE.CONS");
    run_program(&mut vm, vec![cons]);
    assert_eq!(vm.display_value(vm.stacks.code.peek().unwrap()), "( 0 1 2 )");
}

#[test]
fn test_atom_and_null() {
    let mut vm = Interpreter::with_seed(1);
    let five = int(&mut vm, 5);
    vm.stacks.code.push(five);
    let atom = instr(&mut vm, "CODE.ATOM");
    run_program(&mut vm, vec![atom]);
    assert_eq!(vm.bool_at(0), Some(true));

    let list = vm.alloc_code(vec![]);
    vm.stacks.code.push(list);
    let atom = instr(&mut vm, "CODE.ATOM");
    run_program(&mut vm, vec![atom]);
    assert_eq!(vm.bool_at(0), Some(false));

    let empty = vm.alloc_code(vec![]);
    vm.stacks.code.push(empty);
    let null = instr(&mut vm, "CODE.NULL");
    run_program(&mut vm, vec![null]);
    assert_eq!(vm.bool_at(0), Some(true));
}

#[test]
fn test_container_instruction_finds_the_smallest_enclosure() {
    // ( B ( C ( A ) ) ) with needle ( A ) has container ( C ( A ) )
    let mut vm = Interpreter::with_seed(1);
    let a = int(&mut vm, 0);
    let a_list = vm.alloc_code(vec![a]);
    let b = int(&mut vm, 1);
    let c = int(&mut vm, 2);
    let c_list = vm.alloc_code(vec![c, a_list]);
    let haystack = vm.alloc_code(vec![b, c_list]);

    let needle_inner = int(&mut vm, 0);
    let needle = vm.alloc_code(vec![needle_inner]);

    vm.stacks.code.push(needle);
    vm.stacks.code.push(haystack);
    let container = instr(&mut vm, "CODE.CONTAINER");
    run_program(&mut vm, vec![container]);
    assert_eq!(vm.display_value(vm.stacks.code.peek().unwrap()), "( 2 ( 0 ) )");

    // no container: the empty list is pushed
    let mut vm = Interpreter::with_seed(1);
    let x = int(&mut vm, 1);
    let haystack = vm.alloc_code(vec![x]);
    let needle = int(&mut vm, 99);
    vm.stacks.code.push(needle);
    vm.stacks.code.push(haystack);
    let container = instr(&mut vm, "CODE.CONTAINER");
    run_program(&mut vm, vec![container]);
    assert_eq!(vm.display_value(vm.stacks.code.peek().unwrap()), "( )");
}

#[test]
fn test_extract_and_insert_round_trip() {
    let mut vm = Interpreter::with_seed(1);
    let one = int(&mut vm, 1);
    let two = int(&mut vm, 2);
    let three = int(&mut vm, 3);
    let inner = vm.alloc_code(vec![two, three]);
    let tree = vm.alloc_code(vec![one, inner]);

    // extract point 3 -> the 2 inside the nested list
    vm.stacks.code.push(tree);
    let p = int(&mut vm, 3);
    vm.stacks.integer.push(p);
    let extract = instr(&mut vm, "CODE.EXTRACT");
    run_program(&mut vm, vec![extract]);
    let popped = vm.stacks.code.pop().unwrap();
    assert_eq!(vm.display_value(popped), "2");

    // insert 9 at point 3
    let nine = int(&mut vm, 9);
    vm.stacks.code.push(nine);
    vm.stacks.code.push(tree);
    let p = int(&mut vm, 3);
    vm.stacks.integer.push(p);
    let insert = instr(&mut vm, "CODE.INSERT");
    run_program(&mut vm, vec![insert]);
    let popped = vm.stacks.code.pop().unwrap();
    assert_eq!(vm.display_value(popped), "( 1 ( 9 3 ) )");
}

#[test]
fn test_size_length_nth_nthcdr_position_member() {
    let mut vm = Interpreter::with_seed(1);
    let one = int(&mut vm, 1);
    let two = int(&mut vm, 2);
    let three = int(&mut vm, 3);
    let inner = vm.alloc_code(vec![two, three]);
    let tree = vm.alloc_code(vec![one, inner]);

    vm.stacks.code.push(tree);
    let size = instr(&mut vm, "CODE.SIZE");
    run_program(&mut vm, vec![size]);
    assert_eq!(vm.int_at(0), Some(5));

    vm.flush();
    let one = int(&mut vm, 1);
    let two = int(&mut vm, 2);
    let list = vm.alloc_code(vec![one, two]);
    vm.stacks.code.push(list);
    let length = instr(&mut vm, "CODE.LENGTH");
    run_program(&mut vm, vec![length]);
    assert_eq!(vm.int_at(0), Some(2));

    vm.flush();
    let vals: Vec<Val> = vec![10, 20, 30].into_iter().map(|i| int(&mut vm, i)).collect();
    let list = vm.alloc_code(vals);
    vm.stacks.code.push(list);
    let idx = int(&mut vm, 4); // 4 mod 3 = 1
    vm.stacks.integer.push(idx);
    let nth = instr(&mut vm, "CODE.NTH");
    run_program(&mut vm, vec![nth]);
    let popped = vm.stacks.code.pop().unwrap();
    assert_eq!(vm.display_value(popped), "20");

    vm.flush();
    let vals: Vec<Val> = vec![10, 20, 30].into_iter().map(|i| int(&mut vm, i)).collect();
    let list = vm.alloc_code(vals);
    vm.stacks.code.push(list);
    let idx = int(&mut vm, 1);
    vm.stacks.integer.push(idx);
    let nthcdr = instr(&mut vm, "CODE.NTHCDR");
    run_program(&mut vm, vec![nthcdr]);
    let popped = vm.stacks.code.pop().unwrap();
    assert_eq!(vm.display_value(popped), "( 20 30 )");

    vm.flush();
    let needle = int(&mut vm, 20);
    let vals: Vec<Val> = vec![10, 20, 30].into_iter().map(|i| int(&mut vm, i)).collect();
    let list = vm.alloc_code(vals);
    vm.stacks.code.push(needle);
    vm.stacks.code.push(list);
    let position = instr(&mut vm, "CODE.POSITION");
    run_program(&mut vm, vec![position]);
    assert_eq!(vm.int_at(0), Some(1));

    vm.flush();
    let needle = int(&mut vm, 42);
    let vals: Vec<Val> = vec![10, 20, 30].into_iter().map(|i| int(&mut vm, i)).collect();
    let list = vm.alloc_code(vals);
    vm.stacks.code.push(needle);
    vm.stacks.code.push(list);
    let position = instr(&mut vm, "CODE.POSITION");
    run_program(&mut vm, vec![position]);
    assert_eq!(vm.int_at(0), Some(-1));

    vm.flush();
    let needle = int(&mut vm, 30);
    let vals: Vec<Val> = vec![10, 20, 30].into_iter().map(|i| int(&mut vm, i)).collect();
    let list = vm.alloc_code(vals);
    vm.stacks.code.push(needle);
    vm.stacks.code.push(list);
    let member = instr(&mut vm, "CODE.MEMBER");
    run_program(&mut vm, vec![member]);
    assert_eq!(vm.bool_at(0), Some(true));
}

#[test]
fn test_append_concat_sizes() {
    let mut vm = Interpreter::with_seed(1);
    let a1 = int(&mut vm, 1);
    let a = vm.alloc_code(vec![a1]);
    let b1 = int(&mut vm, 2);
    let b2 = int(&mut vm, 3);
    let b = vm.alloc_code(vec![b1, b2]);
    let size_a = code::size(&vm.heap, a);
    let size_b = code::size(&vm.heap, b);

    vm.stacks.code.push(b);
    vm.stacks.code.push(a);
    let append = instr(&mut vm, "CODE.APPEND");
    run_program(&mut vm, vec![append]);
    let joined = vm.stacks.code.pop().unwrap();
    assert_eq!(vm.display_value(joined), "( 1 2 3 )");
    assert_eq!(code::size(&vm.heap, joined), size_a + size_b - 1);
}

#[test]
fn test_instructions_lists_the_whole_registry() {
    let mut vm = Interpreter::with_seed(1);
    let instructions = instr(&mut vm, "CODE.INSTRUCTIONS");
    run_program(&mut vm, vec![instructions]);
    let list = vm.stacks.code.pop().unwrap();
    let children = vm.heap.code_children(list).unwrap();
    assert_eq!(children.len(), vm.instr_count());
    assert!(vm.instr_count() > 130, "default instruction set looks truncated");
}

#[test]
fn test_definition_pushes_the_binding() {
    let mut vm = Interpreter::with_seed(1);
    let body = {
        let one = int(&mut vm, 1);
        vm.alloc_code(vec![one])
    };
    let name = vm.intern("THING");
    vm.define(name, body);
    let name_val = vm.heap.alloc(Value::Name(name));
    vm.stacks.name.push(name_val);
    let definition = instr(&mut vm, "CODE.DEFINITION");
    run_program(&mut vm, vec![definition]);
    let popped = vm.stacks.code.pop().unwrap();
    assert_eq!(vm.display_value(popped), "( 1 )");
}

#[test]
fn test_name_quote_only_takes_names() {
    let mut vm = Interpreter::with_seed(1);
    let quote = instr(&mut vm, "NAME.QUOTE");
    let name = vm.intern("SOMETHING");
    let name_val = vm.heap.alloc(Value::Name(name));
    // the name would normally land on the name stack anyway; bind it so
    // executing it unquoted would have expanded instead
    let body = int(&mut vm, 5);
    vm.define(name, body);
    run_program(&mut vm, vec![quote, name_val]);
    assert_eq!(vm.stacks.name.len(), 1);
    assert!(vm.stacks.integer.is_empty());

    // a non-name is pushed back and executes normally
    let mut vm = Interpreter::with_seed(1);
    let quote = instr(&mut vm, "NAME.QUOTE");
    let five = int(&mut vm, 5);
    run_program(&mut vm, vec![quote, five]);
    assert!(vm.stacks.name.is_empty());
    assert_eq!(vm.int_at(0), Some(5));
}

#[test]
fn test_rand_instructions_respect_configuration() {
    let mut vm = Interpreter::with_seed(99);
    vm.set_config_int("MIN-RANDOM-INT", 10);
    vm.set_config_int("MAX-RANDOM-INT", 20);
    for _ in 0..20 {
        let rand = instr(&mut vm, "INT.RAND");
        run_program(&mut vm, vec![rand]);
        let got = vm.int_at(0).unwrap();
        assert!((10..20).contains(&got), "{} outside configured range", got);
        vm.flush();
    }

    vm.set_config_real("MIN-RANDOM-REAL", 2.0);
    vm.set_config_real("MAX-RANDOM-REAL", 3.0);
    let rand = instr(&mut vm, "REAL.RAND");
    run_program(&mut vm, vec![rand]);
    let got = vm.real_at(0).unwrap();
    assert!((2.0..3.0).contains(&got));

    let rand = instr(&mut vm, "NAME.RAND");
    run_program(&mut vm, vec![rand]);
    let top = vm.stacks.name.pop().unwrap();
    let name = vm.heap.get(top).as_name().unwrap();
    let text = vm.names.resolve(name).to_string();
    assert!((2..16).contains(&(text.len() as i64)));
    assert!(text.chars().all(|c| c.is_ascii_uppercase()));
}

#[test]
fn test_code_rand_clamps_to_max_points() {
    let mut vm = Interpreter::with_seed(5);
    vm.set_config_int("MAX-POINTS-IN-RANDOM-EXPRESSIONS", 10);
    for _ in 0..10 {
        let bound = int(&mut vm, 1000);
        vm.stacks.integer.push(bound);
        let rand = instr(&mut vm, "CODE.RAND");
        run_program(&mut vm, vec![rand]);
        let tree = vm.stacks.code.pop().unwrap();
        assert!(code::size(&vm.heap, tree) <= 10);
    }
}

// ---- garbage collection and hooks ----

#[test]
fn test_long_runs_do_not_accumulate_garbage() {
    let mut vm = Interpreter::with_seed(3);
    // 400 iterations of INT.RAND: far more than one GC interval's worth
    // of transient values
    let count = int(&mut vm, 400);
    let do_times = instr(&mut vm, "EXEC.DO*TIMES");
    let rand = instr(&mut vm, "INT.RAND");
    let pop = instr(&mut vm, "INT.POP");
    let body = vm.alloc_code(vec![rand, pop]);
    run_program(&mut vm, vec![count, do_times, body]);

    assert!(vm.stacks.integer.is_empty());
    vm.collect(true);
    // what survives is the configuration plus interned structures
    assert!(
        vm.heap.live_count() < 64,
        "heap holds {} live values after a full collection",
        vm.heap.live_count()
    );
    // configuration is a root and must have survived every sweep
    assert_eq!(vm.config_int("MAX-POINTS-IN-RANDOM-EXPRESSIONS"), Some(100));
}

#[test]
fn test_forced_collection_keeps_stack_contents() {
    let mut vm = Interpreter::with_seed(1);
    let a = int(&mut vm, 1);
    let b = int(&mut vm, 2);
    let list = vm.alloc_code(vec![a, b]);
    vm.stacks.code.push(list);
    vm.collect(true);
    assert_eq!(vm.display_value(vm.stacks.code.peek().unwrap()), "( 1 2 )");
}

#[test]
fn test_step_hook_and_interrupt_handler() {
    let mut vm = Interpreter::with_seed(1);
    let steps_seen = Arc::new(AtomicUsize::new(0));

    let counter = steps_seen.clone();
    vm.set_step_hook(Some(Arc::new(move |vm: &mut Interpreter| {
        if counter.fetch_add(1, Ordering::SeqCst) + 1 == 5 {
            vm.interrupt(7);
        }
    })));
    vm.set_interrupt_handler(Some(Arc::new(|vm: &mut Interpreter, flag: i64| {
        vm.push_int(flag);
    })));

    let y = instr(&mut vm, "EXEC.Y");
    let noop = instr(&mut vm, "CODE.NOOP");
    let body = vm.alloc_code(vec![noop]);
    let program = vm.alloc_code(vec![y, body]);
    vm.stacks.exec.push(program);

    let performed = vm.run(0);
    assert_eq!(performed, 4, "the interrupted step does not count as performed");
    assert_eq!(steps_seen.load(Ordering::SeqCst), 5);
    assert_eq!(vm.int_at(0), Some(7));
    assert_eq!(vm.interrupt_flag(), 7);

    // a fresh run clears the flag
    let again = vm.run(3);
    assert!(again <= 3);
}

#[test]
fn test_adopt_value_re_interns_names_and_instructions() {
    let mut donor = Interpreter::with_seed(1);
    let mut recipient = Interpreter::with_seed(2);

    let name = donor.intern("SHARED");
    let name_val = donor.heap.alloc(Value::Name(name));
    let add = instr(&mut donor, "INT.+");
    let five = int(&mut donor, 5);
    let tree = donor.alloc_code(vec![name_val, add, five]);

    let adopted = recipient.adopt_value(&donor, tree);
    assert_eq!(recipient.display_value(adopted), donor.display_value(tree));
    // the adopted name resolves through the recipient's pool
    let children = recipient.heap.code_children(adopted).unwrap().to_vec();
    let adopted_name = recipient.heap.get(children[0]).as_name().unwrap();
    assert_eq!(recipient.names.resolve(adopted_name), "SHARED");
}
