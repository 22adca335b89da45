// Integration tests for XML state serialization
//
// Round-trips through dump_state/load_state, streaming parse of nested
// code, error behavior on malformed documents and the unknown-instruction
// warning path.

use pushvm::interpreter::{Interpreter, StackId, Val, Value};

fn int(vm: &mut Interpreter, i: i64) -> Val {
    vm.heap.alloc(Value::Int(i))
}

fn stacks_rendered(vm: &Interpreter) -> Vec<String> {
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
fn test_round_trip_nested_code() {
    let mut vm = Interpreter::with_seed(1);
    // ( 1 ( 2 3 ) 4 ) on the code stack
    let one = int(&mut vm, 1);
    let two = int(&mut vm, 2);
    let three = int(&mut vm, 3);
    let four = int(&mut vm, 4);
    let inner = vm.alloc_code(vec![two, three]);
    let tree = vm.alloc_code(vec![one, inner, four]);
    vm.stacks.code.push(tree);

    let five = int(&mut vm, 5);
    vm.stacks.integer.push(five);
    let t = vm.heap.alloc(Value::Bool(true));
    vm.stacks.boolean.push(t);
    let add = {
        let id = vm.instr_lookup("INT.+").unwrap();
        vm.heap.alloc(Value::Instr(id))
    };
    vm.stacks.exec.push(add);

    let xml = vm.dump_state().expect("dump failed");

    let mut restored = Interpreter::with_seed(2);
    restored.load_state(&xml).expect("load failed");

    assert_eq!(stacks_rendered(&vm), stacks_rendered(&restored));

    // structural equality of the restored tree, not just rendering
    let restored_tree = restored.stacks.code.peek().unwrap();
    assert_eq!(restored.display_value(restored_tree), "( 1 ( 2 3 ) 4 )");
    let children = restored.heap.code_children(restored_tree).unwrap();
    assert_eq!(children.len(), 3);
}

#[test]
fn test_round_trip_bindings_and_config() {
    let mut vm = Interpreter::with_seed(1);
    let body = {
        let a = int(&mut vm, 10);
        let b = int(&mut vm, 20);
        vm.alloc_code(vec![a, b])
    };
    let name = vm.intern("ROUTINE");
    vm.define(name, body);
    vm.set_config_int("MAX-POINTS-IN-RANDOM-EXPRESSIONS", 55);
    vm.set_config_real("NEW-ERC-NAME-PROBABILITY", 0.25);

    let xml = vm.dump_state().expect("dump failed");
    let mut restored = Interpreter::with_seed(2);
    restored.load_state(&xml).expect("load failed");

    let restored_name = restored.names.lookup("ROUTINE").expect("name not interned");
    let bound = restored.lookup(restored_name).expect("binding lost");
    assert_eq!(restored.display_value(bound), "( 10 20 )");
    assert_eq!(restored.config_int("MAX-POINTS-IN-RANDOM-EXPRESSIONS"), Some(55));
    assert_eq!(restored.config_real("NEW-ERC-NAME-PROBABILITY"), Some(0.25));
}

#[test]
fn test_round_trip_preserves_real_precision() {
    let mut vm = Interpreter::with_seed(1);
    let r = vm.heap.alloc(Value::Real(0.1 + 0.2));
    vm.stacks.real.push(r);
    let n = vm.heap.alloc(Value::Real(-1234.5));
    vm.stacks.real.push(n);

    let xml = vm.dump_state().expect("dump failed");
    let mut restored = Interpreter::with_seed(2);
    restored.load_state(&xml).expect("load failed");

    assert_eq!(restored.real_at(0), Some(-1234.5));
    assert_eq!(restored.real_at(1), Some(0.1 + 0.2));
}

#[test]
fn test_loaded_stack_content_appends_below_existing() {
    let mut vm = Interpreter::with_seed(1);
    let a = int(&mut vm, 1);
    vm.stacks.integer.push(a);
    let xml = vm.dump_state().expect("dump failed");

    let mut target = Interpreter::with_seed(2);
    let existing = int(&mut target, 99);
    target.stacks.integer.push(existing);
    target.load_state(&xml).expect("load failed");

    // existing top stays on top; loaded content sits below
    assert_eq!(target.int_at(0), Some(99));
    assert_eq!(target.int_at(1), Some(1));
}

#[test]
fn test_malformed_document_leaves_interpreter_untouched() {
    let cases = [
        r#"<state><stack name="integer"><int value="notanumber"/></stack></state>"#,
        r#"<state><stack name="integer"><int value="1"/>"#,
        r#"<state><stack name="code"><code><int value="1"/></stack></state>"#,
        r#"<state><stack name="real"><real/></stack></state>"#,
    ];
    for xml in cases {
        let mut vm = Interpreter::with_seed(1);
        let before = stacks_rendered(&vm);
        let result = vm.load_state(xml);
        assert!(result.is_err(), "expected an error for {:?}", xml);
        assert_eq!(before, stacks_rendered(&vm), "state changed for {:?}", xml);
        assert!(vm.stacks.integer.is_empty());
    }
}

#[test]
fn test_unknown_instruction_is_skipped_with_a_warning() {
    std::env::set_var("PUSHVM_QUIET", "1");
    let xml = r#"<state>
  <stack name="exec">
    <instr name="FAKE.INSTRUCTION"/>
    <int value="7"/>
  </stack>
</state>"#;
    let mut vm = Interpreter::with_seed(1);
    vm.load_state(xml).expect("unknown instructions are not fatal");
    assert_eq!(vm.stacks.exec.len(), 1);
    vm.run(0);
    assert_eq!(vm.int_at(0), Some(7));
}

#[test]
fn test_instruction_values_round_trip_by_name() {
    let mut vm = Interpreter::with_seed(1);
    let two = int(&mut vm, 2);
    let three = int(&mut vm, 3);
    let add = {
        let id = vm.instr_lookup("INT.+").unwrap();
        vm.heap.alloc(Value::Instr(id))
    };
    let program = vm.alloc_code(vec![two, three, add]);
    vm.stacks.exec.push(program);

    let xml = vm.dump_state().expect("dump failed");
    let mut restored = Interpreter::with_seed(2);
    restored.load_state(&xml).expect("load failed");
    restored.run(0);
    assert_eq!(restored.int_at(0), Some(5));
}

#[test]
fn test_deeply_nested_code_parses_streaming() {
    // 40 levels of nesting exercises the open-list stack
    let mut xml = String::from(r#"<state><stack name="code">"#);
    for _ in 0..40 {
        xml.push_str("<code>");
    }
    xml.push_str(r#"<int value="1"/>"#);
    for _ in 0..40 {
        xml.push_str("</code>");
    }
    xml.push_str("</stack></state>");

    let mut vm = Interpreter::with_seed(1);
    vm.load_state(&xml).expect("load failed");
    let mut v = vm.stacks.code.peek().unwrap();
    for _ in 0..40 {
        let children = vm.heap.code_children(v).expect("expected nesting");
        assert_eq!(children.len(), 1);
        v = children[0];
    }
    assert_eq!(vm.heap.get(v).as_int(), Some(1));
}

#[test]
fn test_dump_skips_instruction_valued_bindings() {
    let mut vm = Interpreter::with_seed(1);
    let name = vm.intern("OP");
    let add = {
        let id = vm.instr_lookup("INT.+").unwrap();
        vm.heap.alloc(Value::Instr(id))
    };
    vm.define(name, add);
    let xml = vm.dump_state().expect("dump failed");
    assert!(!xml.contains("<binding name=\"OP\""));
}
