//! Word/list data primitives and the minimal output surface:
//! `first`, `last`, `butfirst`, `butlast`, `item`, `fput`, `lput`,
//! `sentence`/`se`, `word`, `list`, `count`, `emptyp`, `wordp`, `listp`,
//! `numberp`, `equalp`, and `pr`/`print`/`type`.
//!
//! This table is written directly off testable properties (list length
//! preservation under `fput`/`lput`, sentence flattening, the
//! `first`/`last`/`item` boundary cases) and Logo's "numbers are
//! self-quoting words" coercion rule, reusing `control.rs`'s
//! `node_to_value`/`value_to_node` conversions rather than duplicating
//! them.

use crate::{
    control::{node_to_value, value_to_node},
    error::LogoError,
    evaluator::{values_equal, Evaluator},
    heap::NodeId,
    primitive::PrimitiveTable,
    resource::ResourceTracker,
    capability::Console,
    tracer::EvalTracer,
    value::{format_float, ExprResult, Value},
};

/// Registers every primitive this module provides, called once from
/// `Evaluator::new` alongside `control::register`.
pub fn register<R: ResourceTracker, T: EvalTracer>(table: &mut PrimitiveTable<R, T>) {
    table.register("first", 1, prim_first);
    table.register("last", 1, prim_last);
    table.register("butfirst", 1, prim_butfirst);
    table.register_alias("bf", "butfirst");
    table.register("butlast", 1, prim_butlast);
    table.register_alias("bl", "butlast");
    table.register("item", 2, prim_item);
    table.register("fput", 2, prim_fput);
    table.register("lput", 2, prim_lput);
    table.register("sentence", 2, prim_sentence);
    table.register_alias("se", "sentence");
    table.register("word", 2, prim_word);
    table.register("list", 2, prim_list);
    table.register("count", 1, prim_count);
    table.register("emptyp", 1, prim_emptyp);
    table.register_alias("empty?", "emptyp");
    table.register("wordp", 1, prim_wordp);
    table.register_alias("word?", "wordp");
    table.register("listp", 1, prim_listp);
    table.register_alias("list?", "listp");
    table.register("numberp", 1, prim_numberp);
    table.register_alias("number?", "numberp");
    table.register("equalp", 2, prim_equalp);
    table.register_alias("equal?", "equalp");
    table.register("pr", 1, prim_print);
    table.register_alias("print", "pr");
    table.register("type", 1, prim_type);
}

/// A data source's text for character-level indexing: a word's own text, or
/// a number's printed text.
fn as_text<R: ResourceTracker, T: EvalTracer>(ev: &Evaluator<R, T>, value: &Value) -> Option<String> {
    match value {
        Value::Word(id) => Some(ev.interns.get(ev.heap.atom_id(*id)).to_owned()),
        Value::Number(n) => Some(format_float(*n)),
        _ => None,
    }
}

fn one_char_word<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, c: char) -> Value {
    let mut buf = [0u8; 4];
    let id = ev.interns.intern(c.encode_utf8(&mut buf));
    Value::Word(ev.heap.alloc_atom(id))
}

// ---------------------------------------------------------------
// first / last / butfirst / butlast ( boundary cases)
// ---------------------------------------------------------------

fn prim_first<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    match &args[0] {
        Value::List(id) => {
            if id.is_nil() {
                return Err(LogoError::too_few_items_list("first []").into());
            }
            Ok(node_to_value(&ev.heap, &ev.interns, ev.heap.car(*id)))
        }
        other => {
            let text = as_text(ev, other).ok_or_else(|| LogoError::doesnt_like(other.display(&ev.heap, &ev.interns)))?;
            let c = text.chars().next().ok_or_else(|| LogoError::too_few_items("first \"\""))?;
            Ok(one_char_word(ev, c))
        }
    }
}

fn prim_last<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    match &args[0] {
        Value::List(id) => {
            if id.is_nil() {
                return Err(LogoError::too_few_items_list("last []").into());
            }
            let items = ev.heap.list_items(*id);
            let last = *items.last().expect("non-nil list has at least one item");
            Ok(node_to_value(&ev.heap, &ev.interns, last))
        }
        other => {
            let text = as_text(ev, other).ok_or_else(|| LogoError::doesnt_like(other.display(&ev.heap, &ev.interns)))?;
            let c = text.chars().next_back().ok_or_else(|| LogoError::too_few_items("last \"\""))?;
            Ok(one_char_word(ev, c))
        }
    }
}

fn prim_butfirst<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    match &args[0] {
        Value::List(id) => {
            if id.is_nil() {
                return Err(LogoError::too_few_items_list("butfirst []").into());
            }
            Ok(Value::List(ev.heap.cdr(*id)))
        }
        other => {
            let text = as_text(ev, other).ok_or_else(|| LogoError::doesnt_like(other.display(&ev.heap, &ev.interns)))?;
            if text.is_empty() {
                return Err(LogoError::too_few_items("butfirst \"\"").into());
            }
            let rest: String = text.chars().skip(1).collect();
            let id = ev.interns.intern(&rest);
            Ok(Value::Word(ev.heap.alloc_atom(id)))
        }
    }
}

fn prim_butlast<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    match &args[0] {
        Value::List(id) => {
            if id.is_nil() {
                return Err(LogoError::too_few_items_list("butlast []").into());
            }
            let items = ev.heap.list_items(*id);
            let kept = &items[..items.len() - 1];
            Ok(Value::List(ev.heap.build_list(kept.iter().copied())))
        }
        other => {
            let text = as_text(ev, other).ok_or_else(|| LogoError::doesnt_like(other.display(&ev.heap, &ev.interns)))?;
            if text.is_empty() {
                return Err(LogoError::too_few_items("butlast \"\"").into());
            }
            let kept: String = text.chars().take(text.chars().count() - 1).collect();
            let id = ev.interns.intern(&kept);
            Ok(Value::Word(ev.heap.alloc_atom(id)))
        }
    }
}

// ---------------------------------------------------------------
// item
// ---------------------------------------------------------------

fn prim_item<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let index = args[0].as_number(&ev.heap, &ev.interns)?;
    if index < 1.0 {
        return Err(LogoError::doesnt_like(args[0].display(&ev.heap, &ev.interns)).into());
    }
    let n = index as usize;
    match &args[1] {
        Value::List(id) => {
            let items = ev.heap.list_items(*id);
            let node = items.get(n - 1).copied().ok_or_else(|| LogoError::too_few_items_list("item"))?;
            Ok(node_to_value(&ev.heap, &ev.interns, node))
        }
        other => {
            let text = as_text(ev, other).ok_or_else(|| LogoError::doesnt_like(other.display(&ev.heap, &ev.interns)))?;
            let c = text.chars().nth(n - 1).ok_or_else(|| LogoError::too_few_items("item"))?;
            Ok(one_char_word(ev, c))
        }
    }
}

// ---------------------------------------------------------------
// fput / lput
// ---------------------------------------------------------------

fn prim_fput<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let list_id = match args[1] {
        Value::List(id) => id,
        other => return Err(LogoError::doesnt_like(other.display(&ev.heap, &ev.interns)).into()),
    };
    let item_node = value_to_node(ev, args[0]);
    Ok(Value::List(ev.heap.alloc_cons(item_node, list_id)))
}

fn prim_lput<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let list_id = match args[1] {
        Value::List(id) => id,
        other => return Err(LogoError::doesnt_like(other.display(&ev.heap, &ev.interns)).into()),
    };
    let mut items = ev.heap.list_items(list_id);
    let item_node = value_to_node(ev, args[0]);
    items.push(item_node);
    Ok(Value::List(ev.heap.build_list(items.into_iter())))
}

// ---------------------------------------------------------------
// sentence/se, word, list
// ---------------------------------------------------------------

/// Pushes `value` into `out`, flattening one level of list-ness the way
/// `sentence` does: a list's own elements are spliced in, a word or number
/// counts as a single item.
fn sentence_push<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, out: &mut Vec<NodeId>, value: Value) {
    match value {
        Value::List(id) => out.extend(ev.heap.list_items(id)),
        other => out.push(value_to_node(ev, other)),
    }
}

fn prim_sentence<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let mut items = Vec::new();
    for &arg in args {
        sentence_push(ev, &mut items, arg);
    }
    Ok(Value::List(ev.heap.build_list(items.into_iter())))
}

fn prim_word<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let mut text = String::new();
    for arg in args {
        let piece = as_text(ev, arg).ok_or_else(|| LogoError::doesnt_like(arg.display(&ev.heap, &ev.interns)))?;
        text.push_str(&piece);
    }
    let id = ev.interns.intern(&text);
    Ok(Value::Word(ev.heap.alloc_atom(id)))
}

fn prim_list<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let items: Vec<NodeId> = args.iter().map(|&v| value_to_node(ev, v)).collect();
    Ok(Value::List(ev.heap.build_list(items.into_iter())))
}

// ---------------------------------------------------------------
// count, emptyp, wordp, listp, numberp, equalp
// ---------------------------------------------------------------

fn prim_count<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let n = match &args[0] {
        Value::List(id) => ev.heap.list_len(*id),
        other => as_text(ev, other).ok_or_else(|| LogoError::doesnt_like(other.display(&ev.heap, &ev.interns)))?.chars().count(),
    };
    Ok(Value::Number(n as f32))
}

fn prim_emptyp<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let empty = match &args[0] {
        Value::List(id) => id.is_nil(),
        other => as_text(ev, other).ok_or_else(|| LogoError::doesnt_like(other.display(&ev.heap, &ev.interns)))?.is_empty(),
    };
    Ok(ev.bool_value(empty))
}

fn prim_wordp<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    Ok(ev.bool_value(matches!(args[0], Value::Word(_) | Value::Number(_))))
}

fn prim_listp<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    Ok(ev.bool_value(args[0].is_list()))
}

fn prim_numberp<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let is_number = match &args[0] {
        Value::Number(_) => true,
        Value::Word(id) => crate::value::parse_number(ev.interns.get(ev.heap.atom_id(*id))).is_some(),
        _ => false,
    };
    Ok(ev.bool_value(is_number))
}

fn prim_equalp<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, _console: &mut Console, args: &[Value]) -> ExprResult {
    let equal = values_equal(&ev.heap, &ev.interns, &args[0], &args[1]);
    Ok(ev.bool_value(equal))
}

// ---------------------------------------------------------------
// pr / print / type: routed through the Console output-stream capability
// ---------------------------------------------------------------

fn prim_print<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    console.output.write(&args[0].display(&ev.heap, &ev.interns));
    console.output.write("\n");
    Ok(Value::None)
}

fn prim_type<R: ResourceTracker, T: EvalTracer>(ev: &mut Evaluator<R, T>, console: &mut Console, args: &[Value]) -> ExprResult {
    console.output.write(&args[0].display(&ev.heap, &ev.interns));
    Ok(Value::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::LogoErrorKind, io::CollectStringOutput, resource::NoLimitTracker, tracer::NoopTracer};

    fn new_ev() -> Evaluator<NoLimitTracker, NoopTracer> {
        Evaluator::new(NoLimitTracker::new(), NoopTracer)
    }

    fn word(ev: &mut Evaluator<NoLimitTracker, NoopTracer>, s: &str) -> Value {
        let id = ev.interns.intern(s);
        Value::Word(ev.heap.alloc_atom(id))
    }

    fn list_of(ev: &mut Evaluator<NoLimitTracker, NoopTracer>, words: &[&str]) -> Value {
        let nodes: Vec<NodeId> = words.iter().map(|w| {
            let id = ev.interns.intern(w);
            ev.heap.alloc_atom(id)
        }).collect();
        Value::List(ev.heap.build_list(nodes.into_iter()))
    }

    #[test]
    fn first_and_last_of_word() {
        let mut ev = new_ev();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let w = word(&mut ev, "hello");
        assert_eq!(prim_first(&mut ev, &mut console, &[w]).unwrap().display(&ev.heap, &ev.interns), "h");
        assert_eq!(prim_last(&mut ev, &mut console, &[w]).unwrap().display(&ev.heap, &ev.interns), "o");
    }

    #[test]
    fn first_of_empty_list_is_too_few_items() {
        let mut ev = new_ev();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let empty = Value::List(NodeId::NIL);
        let err = prim_first(&mut ev, &mut console, &[empty]).unwrap_err();
        match err {
            crate::value::Flow::Error(e) => assert_eq!(e.kind, LogoErrorKind::TooFewItemsList),
            other => panic!("expected Flow::Error, got {other:?}"),
        }
    }

    #[test]
    fn item_one_of_empty_list_is_too_few_items() {
        let mut ev = new_ev();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let empty = Value::List(NodeId::NIL);
        let err = prim_item(&mut ev, &mut console, &[Value::Number(1.0), empty]).unwrap_err();
        match err {
            crate::value::Flow::Error(e) => assert_eq!(e.kind, LogoErrorKind::TooFewItemsList),
            other => panic!("expected Flow::Error, got {other:?}"),
        }
    }

    #[test]
    fn fput_and_lput_preserve_length_plus_one() {
        let mut ev = new_ev();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let list = list_of(&mut ev, &["a", "b", "c"]);
        let x = word(&mut ev, "x");
        let before = ev.heap.list_len(match list { Value::List(id) => id, _ => unreachable!() });
        let fput_result = prim_fput(&mut ev, &mut console, &[x, list]).unwrap();
        let Value::List(id) = fput_result else { panic!("expected list") };
        assert_eq!(ev.heap.list_len(id), before + 1);

        let list2 = list_of(&mut ev, &["a", "b", "c"]);
        let y = word(&mut ev, "y");
        let lput_result = prim_lput(&mut ev, &mut console, &[y, list2]).unwrap();
        let Value::List(id2) = lput_result else { panic!("expected list") };
        assert_eq!(ev.heap.list_len(id2), before + 1);
    }

    #[test]
    fn sentence_flattens_one_level() {
        let mut ev = new_ev();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let a = list_of(&mut ev, &["a", "b"]);
        let b = list_of(&mut ev, &["c"]);
        let result = prim_sentence(&mut ev, &mut console, &[a, b]).unwrap();
        let Value::List(id) = result else { panic!("expected list") };
        assert_eq!(ev.heap.list_len(id), 3);
    }

    #[test]
    fn sentence_counts_nonlist_as_one() {
        let mut ev = new_ev();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let a = word(&mut ev, "a");
        let b = list_of(&mut ev, &["c", "d"]);
        let result = prim_sentence(&mut ev, &mut console, &[a, b]).unwrap();
        let Value::List(id) = result else { panic!("expected list") };
        assert_eq!(ev.heap.list_len(id), 3);
    }

    #[test]
    fn word_concatenates_text() {
        let mut ev = new_ev();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let a = word(&mut ev, "foo");
        let b = word(&mut ev, "bar");
        let result = prim_word(&mut ev, &mut console, &[a, b]).unwrap();
        assert_eq!(result.display(&ev.heap, &ev.interns), "foobar");
    }

    #[test]
    fn equalp_is_case_insensitive_for_words() {
        let mut ev = new_ev();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let a = word(&mut ev, "Hello");
        let b = word(&mut ev, "hello");
        let result = prim_equalp(&mut ev, &mut console, &[a, b]).unwrap();
        assert_eq!(result.display(&ev.heap, &ev.interns), "true");
    }

    #[test]
    fn numberp_recognises_numeric_words() {
        let mut ev = new_ev();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let n = word(&mut ev, "42");
        let result = prim_numberp(&mut ev, &mut console, &[n]).unwrap();
        assert_eq!(result.display(&ev.heap, &ev.interns), "true");
        let w = word(&mut ev, "abc");
        let result2 = prim_numberp(&mut ev, &mut console, &[w]).unwrap();
        assert_eq!(result2.display(&ev.heap, &ev.interns), "false");
    }

    #[test]
    fn print_appends_trailing_newline_type_does_not() {
        let mut ev = new_ev();
        let mut out = CollectStringOutput::new();
        {
            let mut console = Console::new(&mut out);
            let w = word(&mut ev, "hi");
            prim_print(&mut ev, &mut console, &[w]).unwrap();
        }
        assert_eq!(out.output(), "hi\n");

        let mut out2 = CollectStringOutput::new();
        {
            let mut console = Console::new(&mut out2);
            let w = word(&mut ev, "hi");
            prim_type(&mut ev, &mut console, &[w]).unwrap();
        }
        assert_eq!(out2.output(), "hi");
    }
}
