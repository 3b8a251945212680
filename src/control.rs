//! Control-flow and procedure-application primitives:
//! `run`, `repeat`, `for`, `if`, `catch`/`throw`, `stop`/`output`,
//! `apply`/`map`/`map.se`/`filter`/`find`/`reduce`/`foreach`/`crossmap`,
//! `while`/`until`/`do.while`/`do.until`/`forever`, and the variable
//! primitives `local`/`make`/`thing`/`name`.
//!
//! `to`/`end` (procedure definition) are not primitives here: definition
//! spans multiple input lines, so the session's line-buffering layer
//! collects a body and calls `ProcedureTable::define` directly instead of
//! going through this table.
//!
//! Every handler is written directly off per-primitive semantics, sharing
//! the evaluator's existing `run_list`/`run_list_as_expr`/frame-push
//! machinery rather than duplicating it.

use smallvec::{smallvec, SmallVec};

use crate::{
    error::{LogoError, LogoErrorKind},
    evaluator::{values_equal, CallContext, Evaluator},
    frame::Frame,
    heap::NodeId,
    intern::StringId,
    namespace::canonical_key,
    primitive::PrimitiveTable,
    procedure::ProcBody,
    resource::ResourceTracker,
    token_source::ListSource,
    capability::Console,
    tracer::EvalTracer,
    value::{format_float, parse_number, ExprResult, Flow, InstrResult, Value},
};

/// Registers every primitive this module provides into `table`, called once
/// from `Evaluator::new` so every evaluator instance has the full control
/// surface without callers needing to remember to wire it up.
pub fn register<R: ResourceTracker, T: EvalTracer>(table: &mut PrimitiveTable<R, T>) {
    table.register("run", 1, prim_run);
    table.register("repeat", 2, prim_repeat);
    table.register("for", 2, prim_for);
    table.register("if", 2, prim_if);
    table.register("catch", 2, prim_catch);
    table.register("throw", 1, prim_throw);
    table.register("stop", 0, prim_stop);
    table.register("output", 1, prim_output);
    table.register_alias("op", "output");
    table.register("apply", 2, prim_apply);
    table.register("map", 2, prim_map);
    table.register("map.se", 2, prim_map_se);
    table.register("filter", 2, prim_filter);
    table.register("find", 2, prim_find);
    table.register("reduce", 2, prim_reduce);
    table.register("foreach", 2, prim_foreach);
    table.register("crossmap", 2, prim_crossmap);
    table.register("while", 2, prim_while);
    table.register("until", 2, prim_until);
    table.register("do.while", 2, prim_do_while);
    table.register("do.until", 2, prim_do_until);
    table.register("forever", 1, prim_forever);
    table.register("local", 1, prim_local);
    table.register("make", 2, prim_make);
    table.register("thing", 1, prim_thing);
    table.register("name", 2, prim_name);
    table.register("repcount", 0, prim_repcount);
    table.register_alias("#", "repcount");
    table.register("error", 0, prim_error);
    table.register("pprop", 3, prim_pprop);
    table.register("gprop", 2, prim_gprop);
    table.register("remprop", 2, prim_remprop);
    table.register("plist", 1, prim_plist);
}

fn expect_list(value: Value, heap: &crate::heap::Heap, interns: &crate::intern::Interner) -> Result<NodeId, Flow> {
    match value {
        Value::List(id) => Ok(id),
        other => Err(LogoError::doesnt_like(other.display(heap, interns)).into()),
    }
}

fn expect_word(value: Value, heap: &crate::heap::Heap, interns: &crate::intern::Interner) -> Result<NodeId, Flow> {
    match value {
        Value::Word(id) => Ok(id),
        other => Err(LogoError::doesnt_like(other.display(heap, interns)).into()),
    }
}

// ---------------------------------------------------------------
// run / repeat / for / if
// ---------------------------------------------------------------

fn prim_run<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let list = expect_list(args[0], &ev.heap, &ev.interns)?;
    ev.run_list_as_expr(list, console)
}

fn prim_repeat<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let n = args[0].as_number(&ev.heap, &ev.interns)?;
    let body = expect_list(args[1], &ev.heap, &ev.interns)?;
    let count = n as i64;
    ev.push_repcount(0);
    let mut result: InstrResult = Ok(());
    for i in 1..=count {
        ev.set_repcount(i);
        result = ev.run_list(body, console);
        if result.is_err() {
            break;
        }
    }
    ev.pop_repcount();
    result.map(|()| Value::None)
}

fn prim_for<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let spec_id = expect_list(args[0], &ev.heap, &ev.interns)?;
    let body_id = expect_list(args[1], &ev.heap, &ev.interns)?;
    let spec_items = ev.heap.list_items(spec_id);
    if spec_items.len() < 3 || spec_items.len() > 4 {
        return Err(LogoError::doesnt_like("a for control list").into());
    }
    let var_text = ev.interns.get(ev.heap.atom_id(spec_items[0])).to_owned();
    let key = canonical_key(&mut ev.interns, &var_text);
    let start = node_to_value(&ev.heap, &ev.interns, spec_items[1]).as_number(&ev.heap, &ev.interns)?;
    let limit = node_to_value(&ev.heap, &ev.interns, spec_items[2]).as_number(&ev.heap, &ev.interns)?;
    let step = if spec_items.len() == 4 {
        node_to_value(&ev.heap, &ev.interns, spec_items[3]).as_number(&ev.heap, &ev.interns)?
    } else if limit >= start {
        1.0
    } else {
        -1.0
    };
    if step == 0.0 {
        return Err(LogoError::doesnt_like("a zero step in for").into());
    }

    let anon = ev.interns.intern("{for}");
    let bindings: SmallVec<[(StringId, Value); 4]> = smallvec![(key, Value::Number(start))];
    ev.frames.push(Frame::new(anon, bindings, ProcBody::new(NodeId::NIL)), &mut ev.tracker).map_err(LogoError::from)?;

    let mut current = start;
    let mut result: InstrResult = Ok(());
    loop {
        let keep_going = if step > 0.0 { current <= limit } else { current >= limit };
        if !keep_going {
            break;
        }
        ev.vars.set(&mut ev.frames, key, Value::Number(current));
        result = ev.run_list(body_id, console);
        if result.is_err() {
            break;
        }
        current += step;
    }
    ev.frames.pop(&mut ev.tracker);
    result.map(|()| Value::None)
}

fn prim_if<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let cond = args[0].as_bool(&ev.heap, &ev.interns)?;
    if cond {
        let list = expect_list(args[1], &ev.heap, &ev.interns)?;
        ev.run_list_as_expr(list, console)
    } else if args.len() == 3 {
        let list = expect_list(args[2], &ev.heap, &ev.interns)?;
        ev.run_list_as_expr(list, console)
    } else {
        Ok(Value::None)
    }
}

// ---------------------------------------------------------------
// catch / throw / stop / output / error
// ---------------------------------------------------------------

fn prim_catch<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let tag_id = expect_word(args[0], &ev.heap, &ev.interns)?;
    let tag_text = ev.interns.get(ev.heap.atom_id(tag_id)).to_owned();
    let body = expect_list(args[1], &ev.heap, &ev.interns)?;
    match ev.run_list(body, console) {
        Ok(()) => Ok(Value::None),
        Err(Flow::Output(v)) => Err(Flow::Output(v)),
        Err(Flow::Stop) => Err(Flow::Stop),
        Err(Flow::Throw(thrown)) => {
            let thrown_text = ev.interns.get(thrown).to_owned();
            if thrown_text.eq_ignore_ascii_case("toplevel") {
                return Err(Flow::Throw(thrown));
            }
            let tag_string_id = ev.heap.atom_id(tag_id);
            if ev.interns.eq_ci(thrown, tag_string_id) {
                Ok(Value::None)
            } else {
                Err(Flow::Throw(thrown))
            }
        }
        Err(Flow::Error(err)) => {
            if tag_text.eq_ignore_ascii_case("error") && err.is_catchable() {
                ev.last_caught_error = Some(*err);
                Ok(Value::None)
            } else {
                Err(Flow::Error(err))
            }
        }
    }
}

fn prim_throw<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let tag_id = expect_word(args[0], &ev.heap, &ev.interns)?;
    Err(Flow::Throw(ev.heap.atom_id(tag_id)))
}

fn prim_stop<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, _args: &[Value]) -> ExprResult {
    if ev.frames.is_empty() {
        return Ok(Value::None);
    }
    Err(Flow::Stop)
}

fn prim_output<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    if ev.frames.is_empty() {
        return Err(LogoError::at_toplevel("output").into());
    }
    Err(Flow::Output(args[0]))
}

fn prim_error<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, _args: &[Value]) -> ExprResult {
    let Some(err) = ev.last_caught_error.clone() else { return Ok(Value::List(NodeId::NIL)) };
    let kind_id = ev.heap.alloc_atom(ev.interns.intern(&err.kind.to_string()));
    let msg_id = ev.heap.alloc_atom(ev.interns.intern(&err.message));
    let primitive_id = ev.heap.alloc_atom(ev.interns.intern(&err.context.primitive.clone().unwrap_or_default()));
    let procedure_id = ev.heap.alloc_atom(ev.interns.intern(&err.context.procedure.clone().unwrap_or_default()));
    Ok(Value::List(ev.heap.build_list([kind_id, msg_id, primitive_id, procedure_id].into_iter())))
}

// ---------------------------------------------------------------
// while / until / do.while / do.until / forever
// ---------------------------------------------------------------

fn prim_while<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let cond = expect_list(args[0], &ev.heap, &ev.interns)?;
    let body = expect_list(args[1], &ev.heap, &ev.interns)?;
    loop {
        let c = ev.run_list_as_expr(cond, console)?;
        if !c.as_bool(&ev.heap, &ev.interns)? {
            break;
        }
        ev.run_list(body, console)?;
    }
    Ok(Value::None)
}

fn prim_until<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let cond = expect_list(args[0], &ev.heap, &ev.interns)?;
    let body = expect_list(args[1], &ev.heap, &ev.interns)?;
    loop {
        let c = ev.run_list_as_expr(cond, console)?;
        if c.as_bool(&ev.heap, &ev.interns)? {
            break;
        }
        ev.run_list(body, console)?;
    }
    Ok(Value::None)
}

fn prim_do_while<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let body = expect_list(args[0], &ev.heap, &ev.interns)?;
    let cond = expect_list(args[1], &ev.heap, &ev.interns)?;
    loop {
        ev.run_list(body, console)?;
        let c = ev.run_list_as_expr(cond, console)?;
        if !c.as_bool(&ev.heap, &ev.interns)? {
            break;
        }
    }
    Ok(Value::None)
}

fn prim_do_until<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let body = expect_list(args[0], &ev.heap, &ev.interns)?;
    let cond = expect_list(args[1], &ev.heap, &ev.interns)?;
    loop {
        ev.run_list(body, console)?;
        let c = ev.run_list_as_expr(cond, console)?;
        if c.as_bool(&ev.heap, &ev.interns)? {
            break;
        }
    }
    Ok(Value::None)
}

fn prim_forever<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let body = expect_list(args[0], &ev.heap, &ev.interns)?;
    ev.push_repcount(0);
    let mut result: InstrResult = Ok(());
    let mut i = 1i64;
    loop {
        ev.set_repcount(i);
        result = ev.run_list(body, console);
        if result.is_err() {
            break;
        }
        i += 1;
    }
    ev.pop_repcount();
    result.map(|()| Value::None)
}

// ---------------------------------------------------------------
// local / make / thing / name
// ---------------------------------------------------------------

fn local_names<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, value: &Value) -> Result<Vec<StringId>, Flow> {
    match value {
        Value::Word(id) => {
            let text = ev.interns.get(ev.heap.atom_id(*id)).to_owned();
            Ok(vec![canonical_key(&mut ev.interns, &text)])
        }
        Value::List(list_id) => {
            let items = ev.heap.list_items(*list_id);
            let mut keys = Vec::with_capacity(items.len());
            for id in items {
                let text = ev.interns.get(ev.heap.atom_id(id)).to_owned();
                keys.push(canonical_key(&mut ev.interns, &text));
            }
            Ok(keys)
        }
        other => Err(LogoError::doesnt_like(other.display(&ev.heap, &ev.interns)).into()),
    }
}

fn prim_local<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    if ev.frames.is_empty() {
        return Err(LogoError::at_toplevel("local").into());
    }
    let keys = local_names(ev, &args[0])?;
    let frame = ev.frames.top_mut().expect("checked non-empty above");
    for key in keys {
        frame.declare_local(key, Value::None);
    }
    Ok(Value::None)
}

fn prim_make<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let name_id = expect_word(args[0], &ev.heap, &ev.interns)?;
    let text = ev.interns.get(ev.heap.atom_id(name_id)).to_owned();
    let key = canonical_key(&mut ev.interns, &text);
    ev.vars.set(&mut ev.frames, key, args[1]);
    Ok(Value::None)
}

fn prim_thing<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let name_id = expect_word(args[0], &ev.heap, &ev.interns)?;
    let text = ev.interns.get(ev.heap.atom_id(name_id)).to_owned();
    let key = canonical_key(&mut ev.interns, &text);
    ev.vars.get(&ev.frames, key).ok_or_else(|| LogoError::new(LogoErrorKind::DontKnowHow, format!("{text} has no value")).into())
}

fn prim_name<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let name_id = expect_word(args[1], &ev.heap, &ev.interns)?;
    let text = ev.interns.get(ev.heap.atom_id(name_id)).to_owned();
    let key = canonical_key(&mut ev.interns, &text);
    ev.vars.set(&mut ev.frames, key, args[0]);
    Ok(Value::None)
}

fn prim_repcount<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, _args: &[Value]) -> ExprResult {
    Ok(Value::Number(ev.repcount()))
}

// ---------------------------------------------------------------
// pprop / gprop / remprop / plist
// ---------------------------------------------------------------

fn word_text<R: ResourceTracker, T: EvalTracer>(ev: &Evaluator<R, T>, value: Value) -> Result<String, Flow> {
    let id = expect_word(value, &ev.heap, &ev.interns)?;
    Ok(ev.interns.get(ev.heap.atom_id(id)).to_owned())
}

fn prim_pprop<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let name = word_text(ev, args[0])?;
    let prop_word_id = expect_word(args[1], &ev.heap, &ev.interns)?;
    let prop = ev.interns.get(ev.heap.atom_id(prop_word_id)).to_owned();
    let prop_id = ev.heap.atom_id(prop_word_id);
    ev.properties.pprop(&name, prop_id, &prop, args[2]);
    Ok(Value::None)
}

fn prim_gprop<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let name = word_text(ev, args[0])?;
    let prop = word_text(ev, args[1])?;
    Ok(ev.properties.gprop(&name, &prop).unwrap_or(Value::None))
}

fn prim_remprop<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let name = word_text(ev, args[0])?;
    let prop = word_text(ev, args[1])?;
    ev.properties.remprop(&name, &prop);
    Ok(Value::None)
}

fn prim_plist<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let name = word_text(ev, args[0])?;
    let pairs = ev.properties.plist(&name);
    let mut items = Vec::with_capacity(pairs.len() * 2);
    for (prop_id, value) in pairs {
        items.push(ev.heap.alloc_atom(prop_id));
        items.push(value_to_node(ev, value));
    }
    Ok(Value::List(ev.heap.build_list(items.into_iter())))
}

// ---------------------------------------------------------------
// Higher-order procedure application: apply / map / map.se / filter /
// find / reduce / foreach / crossmap.
// ---------------------------------------------------------------

/// Reinterprets a raw heap node as the `Value` it denotes: a sublist stays a
/// list, an atom that parses as a number becomes one, everything else is a
/// word. Used to turn a list's stored elements (plain heap nodes, not
/// `Value`s) back into call arguments for `apply` and the higher-order
/// primitives.
pub(crate) fn node_to_value(heap: &crate::heap::Heap, interns: &crate::intern::Interner, id: NodeId) -> Value {
    if id.is_nil() || id.is_cons() {
        return Value::List(id);
    }
    let text = interns.get(heap.atom_id(id));
    match parse_number(text) {
        Some(n) => Value::Number(n),
        None => Value::Word(id),
    }
}

/// The inverse of `node_to_value`: stores a computed `Value` back onto the
/// heap as a list element.
pub(crate) fn value_to_node<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, value: Value) -> NodeId {
    match value {
        Value::List(id) => id,
        Value::Word(id) => id,
        Value::Number(n) => {
            let id = ev.interns.intern(&format_float(n));
            ev.heap.alloc_atom(id)
        }
        Value::None => {
            let id = ev.interns.intern("");
            ev.heap.alloc_atom(id)
        }
    }
}

/// Expands a data source (list, word, or number) into its element values:
/// a list's own elements, a word's characters (each a one-character word),
/// or a number's printed-text characters. `apply`/`map` and friends accept
/// either a list or a word as a data source.
fn source_items<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, value: &Value) -> Result<Vec<Value>, Flow> {
    match value {
        Value::List(id) => Ok(ev.heap.list_items(*id).into_iter().map(|n| node_to_value(&ev.heap, &ev.interns, n)).collect()),
        Value::Word(id) => {
            let text = ev.interns.get(ev.heap.atom_id(*id)).to_owned();
            Ok(chars_as_values(ev, &text))
        }
        Value::Number(n) => {
            let text = format_float(*n);
            Ok(chars_as_values(ev, &text))
        }
        Value::None => Err(LogoError::doesnt_like("nothing").into()),
    }
}

fn chars_as_values<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, text: &str) -> Vec<Value> {
    text.chars()
        .map(|c| {
            let mut buf = [0u8; 4];
            let id = ev.interns.intern(c.encode_utf8(&mut buf));
            Value::Word(ev.heap.alloc_atom(id))
        })
        .collect()
}

/// Calls a procedure-specification value (a bareword name, a lambda list
/// `[[params] tokens...]`, or a text list `[[params] [line] [line] ...]`)
/// with already-evaluated `args`.
fn call_proc_spec<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, spec: Value, args: Vec<Value>) -> ExprResult {
    match spec {
        Value::Word(id) => {
            let name = ev.interns.get(ev.heap.atom_id(id)).to_owned();
            if let Some(proc) = ev.procedures.lookup(&name).cloned() {
                return ev.call_procedure(&proc, args, console, CallContext::Expression);
            }
            if let Some(entry) = ev.primitives.lookup(&name).copied() {
                return (entry.handler)(ev, console, &args);
            }
            Err(LogoError::dont_know_how(name).into())
        }
        Value::List(list_id) => call_lambda_spec(ev, console, list_id, args),
        other => Err(LogoError::doesnt_like(other.display(&ev.heap, &ev.interns)).into()),
    }
}

fn call_lambda_spec<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, list_id: NodeId, args: Vec<Value>) -> ExprResult {
    if !list_id.is_cons() {
        return Err(LogoError::doesnt_like("an empty procedure specification").into());
    }
    let (params_id, rest_id) = ev.heap.cons(list_id);
    let param_atoms = ev.heap.list_items(params_id);
    if param_atoms.len() != args.len() {
        return Err(if args.len() < param_atoms.len() {
            LogoError::not_enough_inputs("procedure")
        } else {
            LogoError::too_many_inputs("procedure")
        }
        .into());
    }
    let mut bindings: SmallVec<[(StringId, Value); 4]> = SmallVec::with_capacity(param_atoms.len());
    for (&pid, val) in param_atoms.iter().zip(args) {
        let text = ev.interns.get(ev.heap.atom_id(pid)).to_owned();
        bindings.push((canonical_key(&mut ev.interns, &text), val));
    }

    let anon = ev.interns.intern("{lambda}");
    ev.frames.push(Frame::new(anon, bindings, ProcBody::new(NodeId::NIL)), &mut ev.tracker).map_err(LogoError::from)?;

    let rest_items = ev.heap.list_items(rest_id);
    let all_lines = !rest_items.is_empty() && rest_items.iter().all(|&id| id.is_cons() || id.is_nil());

    let result = if rest_items.is_empty() {
        Ok(Value::None)
    } else if all_lines {
        run_lines(ev, console, &rest_items)
    } else {
        let mut src = ListSource::new(&ev.heap, &mut ev.interns, rest_id);
        ev.eval_expression(&mut src, console)
    };

    ev.frames.pop(&mut ev.tracker);
    result
}

fn run_lines<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, lines: &[NodeId]) -> ExprResult {
    for &line in lines {
        match ev.run_list(line, console) {
            Ok(()) => continue,
            Err(Flow::Output(v)) => return Ok(v),
            Err(Flow::Stop) => return Ok(Value::None),
            Err(other) => return Err(other),
        }
    }
    Ok(Value::None)
}

fn prim_apply<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let list_id = expect_list(args[1], &ev.heap, &ev.interns)?;
    let items = ev.heap.list_items(list_id);
    let call_args: Vec<Value> = items.into_iter().map(|id| node_to_value(&ev.heap, &ev.interns, id)).collect();
    call_proc_spec(ev, console, args[0], call_args)
}

fn prim_map<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let spec = args[0];
    let mut sources = Vec::with_capacity(args.len() - 1);
    for src in &args[1..] {
        sources.push(source_items(ev, src)?);
    }
    let len = sources.iter().map(Vec::len).min().unwrap_or(0);
    let mut result_nodes = Vec::with_capacity(len);
    for i in 0..len {
        let call_args: Vec<Value> = sources.iter().map(|s| s[i]).collect();
        let value = call_proc_spec(ev, console, spec, call_args)?;
        result_nodes.push(value_to_node(ev, value));
    }
    Ok(Value::List(ev.heap.build_list(result_nodes.into_iter())))
}

fn prim_map_se<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let spec = args[0];
    let mut sources = Vec::with_capacity(args.len() - 1);
    for src in &args[1..] {
        sources.push(source_items(ev, src)?);
    }
    let len = sources.iter().map(Vec::len).min().unwrap_or(0);
    let mut result_nodes = Vec::new();
    for i in 0..len {
        let call_args: Vec<Value> = sources.iter().map(|s| s[i]).collect();
        let value = call_proc_spec(ev, console, spec, call_args)?;
        match value {
            Value::List(list_id) => result_nodes.extend(ev.heap.list_items(list_id)),
            other => result_nodes.push(value_to_node(ev, other)),
        }
    }
    Ok(Value::List(ev.heap.build_list(result_nodes.into_iter())))
}

fn prim_filter<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let spec = args[0];
    let items = source_items(ev, &args[1])?;
    let mut kept = Vec::new();
    for item in items {
        let verdict = call_proc_spec(ev, console, spec, vec![item])?;
        if verdict.as_bool(&ev.heap, &ev.interns)? {
            kept.push(value_to_node(ev, item));
        }
    }
    Ok(Value::List(ev.heap.build_list(kept.into_iter())))
}

fn prim_find<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let spec = args[0];
    let items = source_items(ev, &args[1])?;
    for item in items {
        let verdict = call_proc_spec(ev, console, spec, vec![item])?;
        if verdict.as_bool(&ev.heap, &ev.interns)? {
            return Ok(item);
        }
    }
    let empty = ev.interns.intern("");
    Ok(Value::Word(ev.heap.alloc_atom(empty)))
}

fn prim_reduce<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let spec = args[0];
    let items = source_items(ev, &args[1])?;
    let mut iter = items.into_iter();
    let mut acc = if args.len() >= 3 {
        args[2]
    } else {
        iter.next().ok_or_else(|| LogoError::not_enough_inputs("reduce"))?
    };
    for item in iter {
        acc = call_proc_spec(ev, console, spec, vec![acc, item])?;
    }
    Ok(acc)
}

fn prim_foreach<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let spec = *args.last().expect("default_args guarantees at least 2 arguments");
    let mut sources = Vec::with_capacity(args.len() - 1);
    for src in &args[..args.len() - 1] {
        sources.push(source_items(ev, src)?);
    }
    let len = sources.iter().map(Vec::len).min().unwrap_or(0);
    ev.push_repcount(0);
    let mut result: InstrResult = Ok(());
    for i in 0..len {
        ev.set_repcount((i + 1) as i64);
        let call_args: Vec<Value> = sources.iter().map(|s| s[i]).collect();
        result = call_proc_spec(ev, console, spec, call_args).map(|_| ());
        if result.is_err() {
            break;
        }
    }
    ev.pop_repcount();
    result.map(|()| Value::None)
}

fn cartesian(sources: &[Vec<Value>]) -> Vec<Vec<Value>> {
    sources.iter().fold(vec![Vec::new()], |acc, src| {
        acc.into_iter()
            .flat_map(|combo| {
                src.iter().map(move |&item| {
                    let mut next = combo.clone();
                    next.push(item);
                    next
                })
            })
            .collect()
    })
}

fn prim_crossmap<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    let spec = args[0];
    let mut sources = Vec::with_capacity(args.len() - 1);
    for src in &args[1..] {
        sources.push(source_items(ev, src)?);
    }
    let combos = cartesian(&sources);
    let mut result_nodes = Vec::with_capacity(combos.len());
    for combo in combos {
        let value = call_proc_spec(ev, console, spec, combo)?;
        result_nodes.push(value_to_node(ev, value));
    }
    Ok(Value::List(ev.heap.build_list(result_nodes.into_iter())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capability::Console, io::CollectStringOutput, resource::NoLimitTracker, tracer::NoopTracer};

    fn new_eval() -> Evaluator<NoLimitTracker, NoopTracer> {
        Evaluator::new(NoLimitTracker::new(), NoopTracer)
    }

    #[test]
    fn repeat_runs_body_n_times_and_tracks_repcount() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("make \"total 0 repeat 5 [make \"total :total + repcount]").unwrap();
        ev.eval_instruction(&mut src, &mut console).unwrap();
        let mut src2 = ev.lex_line("make \"total 0").unwrap();
        let _ = ev.eval_instruction(&mut src2, &mut console);
    }

    #[test]
    fn if_false_without_else_produces_none() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("if \"false [stop]").unwrap();
        assert!(ev.eval_instruction(&mut src, &mut console).is_ok());
    }

    #[test]
    fn catch_swallows_matching_throw() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("catch \"mytag [throw \"mytag]").unwrap();
        assert!(ev.eval_instruction(&mut src, &mut console).is_ok());
    }

    #[test]
    fn catch_does_not_intercept_toplevel_throw() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("catch \"toplevel [throw \"toplevel]").unwrap();
        let err = ev.eval_instruction(&mut src, &mut console).unwrap_err();
        assert!(matches!(err, Flow::Throw(_)));
    }

    #[test]
    fn stop_at_toplevel_is_a_no_op() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("stop").unwrap();
        assert!(ev.eval_instruction(&mut src, &mut console).is_ok());
    }

    #[test]
    fn output_at_toplevel_is_an_error() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("output 1").unwrap();
        let err = ev.eval_instruction(&mut src, &mut console).unwrap_err();
        match err {
            Flow::Error(e) => assert_eq!(e.kind, LogoErrorKind::AtToplevel),
            other => panic!("expected Flow::Error, got {other:?}"),
        }
    }

    #[test]
    fn make_and_thing_round_trip_a_global_variable() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("make \"x 42").unwrap();
        ev.eval_instruction(&mut src, &mut console).unwrap();
        let mut src2 = ev.lex_line("thing \"x").unwrap();
        let value = ev.eval_expression(&mut src2, &mut console).unwrap();
        assert_eq!(value, Value::Number(42.0));
    }

    #[test]
    fn map_applies_template_to_each_element() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("map [[x] :x + 1] [1 2 3]").unwrap();
        let value = ev.eval_expression(&mut src, &mut console).unwrap();
        assert_eq!(value.display(&ev.heap, &ev.interns), "[2 3 4]");
    }

    #[test]
    fn filter_keeps_only_matching_elements() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("filter [[x] :x > 2] [1 2 3 4]").unwrap();
        let value = ev.eval_expression(&mut src, &mut console).unwrap();
        assert_eq!(value.display(&ev.heap, &ev.interns), "[3 4]");
    }

    #[test]
    fn reduce_folds_without_explicit_seed() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("reduce [[a b] a + b] [1 2 3 4]").unwrap();
        let value = ev.eval_expression(&mut src, &mut console).unwrap();
        assert_eq!(value, Value::Number(10.0));
    }

    #[test]
    fn for_loop_restores_previous_binding_on_exit() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("for [i 1 3] [stop]").unwrap();
        ev.eval_instruction(&mut src, &mut console).unwrap();
        assert_eq!(ev.frames.depth(), 0);
    }

    #[test]
    fn values_equal_is_used_for_find_predicate_matches() {
        assert!(values_equal(&crate::heap::Heap::new(), &crate::intern::Interner::new(), &Value::None, &Value::None));
    }

    #[test]
    fn pprop_gprop_remprop_plist_round_trip_through_primitives() {
        let mut ev = new_eval();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("pprop \"turtle \"color 5").unwrap();
        ev.eval_instruction(&mut src, &mut console).unwrap();

        let mut src2 = ev.lex_line("gprop \"turtle \"color").unwrap();
        assert_eq!(ev.eval_expression(&mut src2, &mut console).unwrap(), Value::Number(5.0));

        let mut src3 = ev.lex_line("plist \"turtle").unwrap();
        let plist = ev.eval_expression(&mut src3, &mut console).unwrap();
        assert_eq!(plist.display(&ev.heap, &ev.interns), "[color 5]");

        let mut src4 = ev.lex_line("remprop \"turtle \"color").unwrap();
        ev.eval_instruction(&mut src4, &mut console).unwrap();
        let mut src5 = ev.lex_line("gprop \"turtle \"color").unwrap();
        assert_eq!(ev.eval_expression(&mut src5, &mut console).unwrap(), Value::None);
    }
}
