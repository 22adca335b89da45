// File: src/serialize.rs
//
// XML serialization of interpreter state.
// A state document carries the configuration, the bindings and the six
// stacks; values nest arbitrarily through <code> elements, so reading is
// a streaming event loop with an explicit stack of open lists rather than
// a recursive descent. Loading stages everything first and applies it
// only when the whole document parsed — a malformed document leaves the
// interpreter exactly as it was.
//
// Element vocabulary:
//   <state>
//     <config name="...">value</config>
//     <binding name="...">value</binding>
//     <stack name="boolean|code|exec|integer|name|real">value*</stack>
//   </state>
// where a value is one of <none/>, <bool value=""/>, <int value=""/>,
// <real value=""/>, <name value=""/>, <instr name=""/>, <code>value*</code>.

use crate::errors::{warn, PushError};
use crate::interpreter::{Interpreter, Name, StackId, Val, Value};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

/// Serialize the interpreter's configuration, bindings and stacks
pub fn dump_state(vm: &Interpreter) -> Result<String, PushError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    writer.write_event(Event::Start(BytesStart::new("state")))?;

    // dictionaries are written in sorted order so output is reproducible
    let mut config: Vec<_> = vm.config.iter().map(|(&n, &v)| (vm.names.resolve(n), v)).collect();
    config.sort_by(|a, b| a.0.cmp(b.0));
    for (name, val) in config {
        write_dict_entry(&mut writer, vm, "config", name, val)?;
    }

    let mut bindings: Vec<_> =
        vm.bindings.iter().map(|(&n, &v)| (vm.names.resolve(n), v)).collect();
    bindings.sort_by(|a, b| a.0.cmp(b.0));
    for (name, val) in bindings {
        write_dict_entry(&mut writer, vm, "binding", name, val)?;
    }

    for id in StackId::ALL {
        let mut start = BytesStart::new("stack");
        start.push_attribute(("name", id.title()));
        writer.write_event(Event::Start(start))?;
        for &val in vm.stacks.get(id).iter_top_down() {
            write_value(&mut writer, vm, val)?;
        }
        writer.write_event(Event::End(BytesEnd::new("stack")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("state")))?;
    let bytes = writer.into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn write_dict_entry(
    writer: &mut Writer<Vec<u8>>,
    vm: &Interpreter,
    tag: &str,
    name: &str,
    val: Val,
) -> Result<(), PushError> {
    // instruction-valued entries are not portable between registries
    if matches!(vm.heap.get(val), Value::Instr(_)) {
        return Ok(());
    }
    let mut start = BytesStart::new(tag);
    start.push_attribute(("name", name));
    writer.write_event(Event::Start(start))?;
    write_value(writer, vm, val)?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_value(
    writer: &mut Writer<Vec<u8>>,
    vm: &Interpreter,
    val: Val,
) -> Result<(), PushError> {
    match vm.heap.get(val) {
        Value::None => {
            writer.write_event(Event::Empty(BytesStart::new("none")))?;
        }
        Value::Bool(b) => {
            let mut e = BytesStart::new("bool");
            e.push_attribute(("value", if *b { "true" } else { "false" }));
            writer.write_event(Event::Empty(e))?;
        }
        Value::Int(i) => {
            let mut e = BytesStart::new("int");
            e.push_attribute(("value", i.to_string().as_str()));
            writer.write_event(Event::Empty(e))?;
        }
        Value::Real(r) => {
            let mut e = BytesStart::new("real");
            e.push_attribute(("value", format!("{:?}", r).as_str()));
            writer.write_event(Event::Empty(e))?;
        }
        Value::Name(n) => {
            let mut e = BytesStart::new("name");
            e.push_attribute(("value", vm.names.resolve(*n)));
            writer.write_event(Event::Empty(e))?;
        }
        Value::Instr(id) => {
            let mut e = BytesStart::new("instr");
            e.push_attribute(("name", vm.instr_name(*id)));
            writer.write_event(Event::Empty(e))?;
        }
        Value::Code(children) => {
            writer.write_event(Event::Start(BytesStart::new("code")))?;
            for &child in children {
                write_value(writer, vm, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new("code")))?;
        }
    }
    Ok(())
}

/// Load a serialized state into the interpreter. Parsed stack content is
/// appended below any existing content; bindings and configuration
/// entries overwrite. On error the interpreter is left untouched.
pub fn load_state(vm: &mut Interpreter, xml: &str) -> Result<(), PushError> {
    let mut reader = Reader::from_str(xml);
    let mut loader = Loader::new(vm);
    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                loader.depth += 1;
                loader.start_tag(&e)?;
            }
            Ok(Event::Empty(e)) => {
                loader.start_tag(&e)?;
                loader.end_tag(e.name().as_ref());
            }
            Ok(Event::End(e)) => {
                loader.depth -= 1;
                loader.end_tag(e.name().as_ref());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(PushError::from(err).at(position)),
        }
    }
    loader.apply()
}

struct Loader<'a> {
    vm: &'a mut Interpreter,
    stacks: [Vec<Val>; 6],
    bindings: Vec<(Name, Val)>,
    config: Vec<(Name, Val)>,
    open_lists: Vec<Vec<Val>>,
    current_stack: Option<usize>,
    current_binding: Option<Name>,
    current_config: Option<Name>,
    depth: i64,
}

impl<'a> Loader<'a> {
    fn new(vm: &'a mut Interpreter) -> Self {
        Loader {
            vm,
            stacks: Default::default(),
            bindings: Vec::new(),
            config: Vec::new(),
            open_lists: Vec::new(),
            current_stack: None,
            current_binding: None,
            current_config: None,
            depth: 0,
        }
    }

    fn start_tag(&mut self, e: &BytesStart) -> Result<(), PushError> {
        match e.name().as_ref() {
            b"state" => {}
            b"stack" => {
                let name = require_attr(e, "name")?;
                match StackId::from_title(&name) {
                    Some(id) => {
                        self.current_stack =
                            StackId::ALL.iter().position(|&other| other == id);
                    }
                    None => warn(&format!("unknown stack: {}", name)),
                }
            }
            b"binding" => {
                let name = require_attr(e, "name")?;
                self.current_binding = Some(self.vm.intern(&name));
            }
            b"config" => {
                let name = require_attr(e, "name")?;
                self.current_config = Some(self.vm.intern(&name));
            }
            b"none" => {
                let v = self.vm.heap.alloc(Value::None);
                self.add_value(v);
            }
            b"bool" => {
                let raw = require_attr(e, "value")?;
                let v = self.vm.heap.alloc(Value::Bool(raw.eq_ignore_ascii_case("true")));
                self.add_value(v);
            }
            b"int" => {
                let raw = require_attr(e, "value")?;
                let parsed: i64 = raw.trim().parse()?;
                let v = self.vm.heap.alloc(Value::Int(parsed));
                self.add_value(v);
            }
            b"real" => {
                let raw = require_attr(e, "value")?;
                let parsed: f64 = raw.trim().parse()?;
                let v = self.vm.heap.alloc(Value::Real(parsed));
                self.add_value(v);
            }
            b"name" => {
                let raw = require_attr(e, "value")?;
                let name = self.vm.intern(&raw);
                let v = self.vm.heap.alloc(Value::Name(name));
                self.add_value(v);
            }
            b"instr" => {
                let raw = require_attr(e, "name")?;
                match self.vm.instr_lookup(&raw) {
                    Some(id) => {
                        let v = self.vm.heap.alloc(Value::Instr(id));
                        self.add_value(v);
                    }
                    None => warn(&format!("unknown instruction: {}", raw)),
                }
            }
            b"code" => self.open_lists.push(Vec::new()),
            other => {
                warn(&format!("unknown element: {}", String::from_utf8_lossy(other)));
            }
        }
        Ok(())
    }

    fn end_tag(&mut self, tag: &[u8]) {
        match tag {
            b"stack" => self.current_stack = None,
            b"binding" => self.current_binding = None,
            b"config" => self.current_config = None,
            b"code" => {
                if let Some(children) = self.open_lists.pop() {
                    let v = self.vm.heap.alloc(Value::Code(children));
                    self.add_value(v);
                }
            }
            _ => {}
        }
    }

    fn add_value(&mut self, val: Val) {
        if let Some(list) = self.open_lists.last_mut() {
            list.push(val);
        } else if let Some(i) = self.current_stack {
            self.stacks[i].push(val);
        } else if let Some(name) = self.current_binding {
            self.bindings.push((name, val));
        } else if let Some(name) = self.current_config {
            self.config.push((name, val));
        } else {
            warn("found a value outside of any stack, binding or config");
        }
    }

    fn apply(self) -> Result<(), PushError> {
        if self.depth != 0 {
            return Err(PushError::parse("unexpected end of document"));
        }
        if !self.open_lists.is_empty() {
            return Err(PushError::parse("unterminated <code> element"));
        }
        // document order is top-first; inserting each below the previous
        // appends the loaded content beneath whatever is already there
        for (i, vals) in self.stacks.into_iter().enumerate() {
            let stack = self.vm.stacks.get_mut(StackId::ALL[i]);
            for v in vals {
                stack.push_bottom(v);
            }
        }
        for (name, val) in self.bindings {
            self.vm.define(name, val);
        }
        for (name, val) in self.config {
            self.vm.config.insert(name, val);
        }
        Ok(())
    }
}

fn require_attr(e: &BytesStart, key: &str) -> Result<String, PushError> {
    match e.try_get_attribute(key)? {
        Some(attr) => Ok(attr.unescape_value()?.into_owned()),
        None => Err(PushError::parse(format!(
            "<{}> is missing the '{}' attribute",
            String::from_utf8_lossy(e.name().as_ref()),
            key
        ))),
    }
}
