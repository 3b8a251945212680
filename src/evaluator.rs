//! The evaluator: a Pratt-style recursive-descent interpreter driven
//! directly off a [`TokenSource`], with procedure call frames, tail-call
//! optimisation, and non-local control flow. Tree-walking rather than a
//! bytecode VM, with first-hop error-attribution and the zero-cost
//! tracer-hook trait from [`tracer`] wired through every dispatch point.

use smallvec::SmallVec;

use crate::{
    capability::Console,
    error::{LogoError, LogoErrorKind},
    frame::{Frame, FrameStack},
    heap::{Heap, NodeId},
    intern::{fold_case, Interner, StringId},
    namespace::{canonical_key, Variables},
    primitive::PrimitiveTable,
    procedure::{Procedure, ProcedureTable},
    properties::PropertyLists,
    resource::ResourceTracker,
    token_source::{ListSource, Tok, TokenSource},
    tracer::EvalTracer,
    value::{format_float, parse_number, ExprResult, Flow, InstrResult, Value},
};

/// One binary operator recognised by the precedence table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

/// Whether an operator belongs to the "comparisons don't chain" family
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Compare,
    Other,
}

/// `(binding power, operator, kind)` for a symbolic token that can continue
/// a binary expression, or `None` if the token doesn't start one. `or`/`and`
/// are barewords and are matched separately via [`word_binding_power`].
fn binding_power(tok: Tok) -> Option<(u8, BinOp, OpKind)> {
    match tok {
        Tok::Eq => Some((3, BinOp::Eq, OpKind::Compare)),
        Tok::NotEq => Some((3, BinOp::NotEq, OpKind::Compare)),
        Tok::Lt => Some((4, BinOp::Lt, OpKind::Compare)),
        Tok::Le => Some((4, BinOp::Le, OpKind::Compare)),
        Tok::Gt => Some((4, BinOp::Gt, OpKind::Compare)),
        Tok::Ge => Some((4, BinOp::Ge, OpKind::Compare)),
        Tok::Plus => Some((5, BinOp::Add, OpKind::Other)),
        Tok::Minus => Some((5, BinOp::Sub, OpKind::Other)),
        Tok::Star => Some((6, BinOp::Mul, OpKind::Other)),
        Tok::Slash => Some((6, BinOp::Div, OpKind::Other)),
        _ => None,
    }
}

/// `or`/`and` are spelled as barewords (level 1/2), so they're matched on
/// the word's interned text rather than on a dedicated token kind.
fn word_binding_power(text: &str) -> Option<(u8, BinOp, OpKind)> {
    if text.eq_ignore_ascii_case("or") {
        Some((1, BinOp::Or, OpKind::Other))
    } else if text.eq_ignore_ascii_case("and") {
        Some((2, BinOp::And, OpKind::Other))
    } else {
        None
    }
}

const UNARY_MINUS_BP: u8 = 7;

/// Whether a procedure call's result will be used as a value (so running
/// off the end of its body without `output`ing is an error) or discarded
/// as a top-level instruction (so a bare `stop`, or simply falling off the
/// end, just ends the call), "Instruction boundary" vs. level 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallContext {
    Command,
    Expression,
}

/// The evaluator (component J). Owns every piece of per-session mutable
/// state named in: the heap, interner, variable/property/
/// procedure stores, the primitive registry, and the frame stack. Generic
/// over a [`ResourceTracker`] and an [`EvalTracer`] so a production build
/// monomorphizes tracing away entirely while an embedded host
/// swaps in a budget-enforcing tracker at zero extra indirection.
pub struct Evaluator<R: ResourceTracker, T: EvalTracer> {
    pub heap: Heap,
    pub interns: Interner,
    pub vars: Variables,
    pub procedures: ProcedureTable,
    pub properties: PropertyLists,
    pub primitives: PrimitiveTable<R, T>,
    pub frames: FrameStack,
    pub tracker: R,
    pub tracer: T,
    /// The error most recently swallowed by `catch "error`, readable
    /// by the `error` primitive. Evaluator-owned rather than global, since
    /// there is no other place per-session interpreter state can live.
    pub last_caught_error: Option<LogoError>,
    /// Active `repeat`/`forever`/`for` counters, innermost last. Dynamic
    /// across procedure-call boundaries (unlike `test_result`, which is
    /// per-frame): `repcount` inside a called procedure still sees an
    /// enclosing caller's loop. `for` restores the previous value on exit
    ///, which is why this lives on the evaluator and not on `Frame`
    /// — a loop at top level has no frame to own it at all.
    repcount_stack: SmallVec<[i64; 4]>,
    /// Cached atom handles for the words `true`/`false`, allocated once so
    /// every boolean-producing operator doesn't re-intern them.
    true_atom: NodeId,
    false_atom: NodeId,
}

impl<R: ResourceTracker, T: EvalTracer> Evaluator<R, T> {
    pub fn new(tracker: R, tracer: T) -> Self {
        let mut heap = Heap::new();
        let mut interns = Interner::new();
        let true_atom = heap.alloc_atom(interns.intern("true"));
        let false_atom = heap.alloc_atom(interns.intern("false"));
        let mut primitives = PrimitiveTable::new();
        crate::control::register(&mut primitives);
        crate::data_primitives::register(&mut primitives);
        Self {
            heap,
            interns,
            vars: Variables::new(),
            procedures: ProcedureTable::new(),
            properties: PropertyLists::new(),
            primitives,
            frames: FrameStack::new(),
            tracker,
            tracer,
            last_caught_error: None,
            repcount_stack: SmallVec::new(),
            true_atom,
            false_atom,
        }
    }

    pub(crate) fn bool_value(&self, b: bool) -> Value {
        Value::Word(if b { self.true_atom } else { self.false_atom })
    }

    /// The `repcount` primitive's value: the innermost active loop counter,
    /// or `-1` if no `repeat`/`forever`/`for` is currently running.
    #[must_use]
    pub fn repcount(&self) -> f32 {
        self.repcount_stack.last().copied().map_or(-1.0, |n| n as f32)
    }

    pub fn push_repcount(&mut self, value: i64) {
        self.repcount_stack.push(value);
    }

    pub fn set_repcount(&mut self, value: i64) {
        if let Some(top) = self.repcount_stack.last_mut() {
            *top = value;
        }
    }

    pub fn pop_repcount(&mut self) {
        self.repcount_stack.pop();
    }

    /// Case-folds `name` for display/lookup purposes.
    #[must_use]
    pub fn canonical(&self, name: &str) -> String {
        fold_case(name)
    }

    // ---------------------------------------------------------------
    // Entry points
    // ---------------------------------------------------------------

    /// Reads one full instruction (a call plus its arguments) from `src`
    /// and runs it, discarding any value it produces.
    pub fn eval_instruction(&mut self, src: &mut dyn TokenSource, console: &mut Console) -> InstrResult {
        self.tracker.check_time().map_err(LogoError::from)?;
        match src.advance() {
            Tok::Eof => {}
            Tok::Word(id) => {
                let name = self.interns.get(id).to_owned();
                self.tracer.on_instruction(&name, self.frames.depth());
                self.dispatch_call(&name, src, console, false, CallContext::Command)?;
            }
            Tok::LeftParen => {
                if let Tok::Word(id) = src.peek() {
                    src.advance();
                    let name = self.interns.get(id).to_owned();
                    self.dispatch_call(&name, src, console, true, CallContext::Command)?;
                    self.expect_right_paren(src)?;
                } else {
                    return Err(LogoError::doesnt_like("( at start of instruction").into());
                }
            }
            other => return Err(LogoError::doesnt_like(format!("{other:?}")).into()),
        }
        Ok(())
    }

    /// Reads one operand-yielding expression from `src` and returns its
    /// value.
    pub fn eval_expression(&mut self, src: &mut dyn TokenSource, console: &mut Console) -> ExprResult {
        self.tracker.check_time().map_err(LogoError::from)?;
        self.parse_expr(src, console, 1)
    }

    /// Runs every instruction in `list` in sequence (the `run` primitive's
    /// command form, and the machinery every control-flow primitive
    /// recurses through). Propagates `STOP`/`OUTPUT`/`THROW`/`ERROR`
    /// immediately; returns `Ok(())` if every instruction ran to
    /// completion.
    pub fn run_list(&mut self, list: NodeId, console: &mut Console) -> InstrResult {
        let mut src = ListSource::new(&self.heap, &mut self.interns, list);
        while src.peek() != Tok::Eof {
            self.eval_instruction(&mut src, console)?;
        }
        Ok(())
    }

    /// Runs `list` as a single expression-yielding unit: if it produces an
    /// `OUTPUT`, that value is the result; otherwise `NONE`. This is the
    /// expression form `run` and friends call into.
    pub fn run_list_as_expr(&mut self, list: NodeId, console: &mut Console) -> ExprResult {
        match self.run_list(list, console) {
            Ok(()) => Ok(Value::None),
            Err(Flow::Output(v)) => Ok(v),
            Err(Flow::Stop) => Ok(Value::None),
            Err(other) => Err(other),
        }
    }

    // ---------------------------------------------------------------
    // Pratt parser
    // ---------------------------------------------------------------

    /// Parses and evaluates one full binary-operator expression at or
    /// above `min_bp` (precedence levels 1-6), built on a primary/call
    /// parse at the bottom (level 7-8).
    fn parse_expr(&mut self, src: &mut dyn TokenSource, console: &mut Console, min_bp: u8) -> ExprResult {
        let mut lhs = self.parse_prefix(src, console)?;
        loop {
            let candidate = match src.peek() {
                Tok::Word(id) => {
                    let text = self.interns.get(id).to_owned();
                    word_binding_power(&text)
                }
                other => binding_power(other),
            };
            let Some((bp, op, kind)) = candidate else { break };
            if bp < min_bp {
                break;
            }
            src.advance();
            let rhs = self.parse_expr(src, console, bp + 1)?;
            lhs = self.apply_binop(op, lhs, rhs)?;
            if kind == OpKind::Compare {
                let next_is_compare = match src.peek() {
                    Tok::Word(_) => false,
                    other => matches!(binding_power(other), Some((_, _, OpKind::Compare))),
                };
                if next_is_compare {
                    return Err(LogoError::doesnt_like("a chained comparison").into());
                }
            }
        }
        Ok(lhs)
    }

    /// Parses a primary expression: unary minus, a call (bareword head),
    /// `:name`, a quoted word, a number, `(...)`, or `[...]` ( level 7-8).
    fn parse_prefix(&mut self, src: &mut dyn TokenSource, console: &mut Console) -> ExprResult {
        match src.advance() {
            Tok::Minus => {
                let operand = self.parse_expr(src, console, UNARY_MINUS_BP)?;
                let n = operand.as_number(&self.heap, &self.interns)?;
                Ok(Value::number(-n)?)
            }
            Tok::Number(n) => Ok(Value::Number(n)),
            Tok::QuotedWord(id) => Ok(Value::Word(self.heap.alloc_atom(id))),
            Tok::ColonName(id) => {
                let text = self.interns.get(id).to_owned();
                let key = canonical_key(&mut self.interns, &text);
                self.vars.get(&self.frames, key).ok_or_else(|| LogoError::dont_know_how(format!(":{text}")).into())
            }
            Tok::ListLiteral(id) => Ok(Value::List(id)),
            Tok::LeftBracket => Ok(Value::List(self.parse_list_literal(src)?)),
            Tok::LeftParen => {
                // A head word right after `(` is a greedy variadic call;
                // anything else is a plain grouping.
                if let Tok::Word(id) = src.peek() {
                    src.advance();
                    let name = self.interns.get(id).to_owned();
                    let value = self.dispatch_call(&name, src, console, true, CallContext::Expression)?;
                    self.expect_right_paren(src)?;
                    Ok(value)
                } else {
                    let value = self.parse_expr(src, console, 1)?;
                    self.expect_right_paren(src)?;
                    Ok(value)
                }
            }
            Tok::Word(id) => {
                let name = self.interns.get(id).to_owned();
                self.dispatch_call(&name, src, console, false, CallContext::Expression)
            }
            other => Err(LogoError::doesnt_like(format!("{other:?}")).into()),
        }
    }

    fn expect_right_paren(&mut self, src: &mut dyn TokenSource) -> Result<(), Flow> {
        if src.advance() == Tok::RightParen {
            Ok(())
        } else {
            Err(LogoError::doesnt_like("missing close paren").into())
        }
    }

    fn apply_binop(&self, op: BinOp, lhs: Value, rhs: Value) -> ExprResult {
        let heap = &self.heap;
        let interns = &self.interns;
        match op {
            BinOp::Or => Ok(self.bool_value(lhs.as_bool(heap, interns)? || rhs.as_bool(heap, interns)?)),
            BinOp::And => Ok(self.bool_value(lhs.as_bool(heap, interns)? && rhs.as_bool(heap, interns)?)),
            BinOp::Eq => Ok(self.bool_value(values_equal(heap, interns, &lhs, &rhs))),
            BinOp::NotEq => Ok(self.bool_value(!values_equal(heap, interns, &lhs, &rhs))),
            BinOp::Lt => Ok(self.bool_value(lhs.as_number(heap, interns)? < rhs.as_number(heap, interns)?)),
            BinOp::Le => Ok(self.bool_value(lhs.as_number(heap, interns)? <= rhs.as_number(heap, interns)?)),
            BinOp::Gt => Ok(self.bool_value(lhs.as_number(heap, interns)? > rhs.as_number(heap, interns)?)),
            BinOp::Ge => Ok(self.bool_value(lhs.as_number(heap, interns)? >= rhs.as_number(heap, interns)?)),
            BinOp::Add => Ok(Value::number(lhs.as_number(heap, interns)? + rhs.as_number(heap, interns)?)?),
            BinOp::Sub => Ok(Value::number(lhs.as_number(heap, interns)? - rhs.as_number(heap, interns)?)?),
            BinOp::Mul => Ok(Value::number(lhs.as_number(heap, interns)? * rhs.as_number(heap, interns)?)?),
            BinOp::Div => {
                let divisor = rhs.as_number(heap, interns)?;
                if divisor == 0.0 {
                    return Err(LogoError::doesnt_like("division by zero").into());
                }
                Ok(Value::number(lhs.as_number(heap, interns)? / divisor)?)
            }
        }
    }

    /// Converts one already-advanced token into the heap node it denotes as
    /// a list element, re-marking quoted words/colon names/operators with
    /// their original prefix character so that running the list as code
    /// later (via [`ListSource`]) reinterprets them identically to how they
    /// were first lexed. `Eof`/`RightBracket` are loop-terminators handled
    /// by callers, not valid list items, so they're rejected here.
    fn list_item_node(&mut self, tok: Tok, src: &mut dyn TokenSource) -> Result<NodeId, LogoError> {
        match tok {
            Tok::LeftBracket => self.parse_list_literal(src),
            Tok::Word(id) => Ok(self.heap.alloc_atom(id)),
            Tok::Number(n) => {
                let id = self.interns.intern(&format_float(n));
                Ok(self.heap.alloc_atom(id))
            }
            Tok::QuotedWord(id) => {
                let text = format!("\"{}", self.interns.get(id));
                let id = self.interns.intern(&text);
                Ok(self.heap.alloc_atom(id))
            }
            Tok::ColonName(id) => {
                let text = format!(":{}", self.interns.get(id));
                let id = self.interns.intern(&text);
                Ok(self.heap.alloc_atom(id))
            }
            Tok::ListLiteral(id) => Ok(id),
            other => {
                let text = operator_text(other).ok_or_else(|| LogoError::new(LogoErrorKind::DoesntLikeInput, "unexpected token in list"))?;
                let id = self.interns.intern(text);
                Ok(self.heap.alloc_atom(id))
            }
        }
    }

    /// Builds a list literal's cons structure from bracket-balanced tokens
    ///.
    fn parse_list_literal(&mut self, src: &mut dyn TokenSource) -> Result<NodeId, LogoError> {
        let mut items = Vec::new();
        loop {
            match src.advance() {
                Tok::RightBracket => break,
                Tok::Eof => return Err(LogoError::new(LogoErrorKind::DoesntLikeInput, "unterminated list literal")),
                tok => items.push(self.list_item_node(tok, src)?),
            }
        }
        Ok(self.heap.build_list(items.into_iter()))
    }

    /// Builds one procedure-definition body line's list of instruction
    /// tokens, running to `Eof` instead of a closing bracket: a `to`/`end`
    /// body line is itself list-shaped, just without the enclosing brackets
    /// of a list literal. Used by the session layer while collecting a
    /// multi-line `to`/`end` definition.
    pub(crate) fn parse_line_as_list(&mut self, src: &mut dyn TokenSource) -> Result<NodeId, LogoError> {
        let mut items = Vec::new();
        loop {
            match src.advance() {
                Tok::Eof => break,
                Tok::RightBracket => return Err(LogoError::new(LogoErrorKind::DoesntLikeInput, "unmatched ] in procedure body")),
                tok => items.push(self.list_item_node(tok, src)?),
            }
        }
        Ok(self.heap.build_list(items.into_iter()))
    }

    // ---------------------------------------------------------------
    // Call dispatch
    // ---------------------------------------------------------------

    /// Shared entry for "a bareword used as a call": collects arguments per
    /// default arity (or greedily if `greedy`, i.e. parenthesized form),
    /// then dispatches to a user procedure or a primitive. Procedures are
    /// checked before primitives, so a user definition can shadow a
    /// built-in name.
    fn dispatch_call(&mut self, name: &str, src: &mut dyn TokenSource, console: &mut Console, greedy: bool, ctx: CallContext) -> ExprResult {
        if let Some(proc) = self.procedures.lookup(name).cloned() {
            let args = self.collect_args(src, console, proc.params.len(), greedy, name)?;
            return self.call_procedure(&proc, args, console, ctx);
        }
        if let Some(entry) = self.primitives.lookup(name).copied() {
            let args = self.collect_args(src, console, entry.default_args, greedy, name)?;
            self.tracer.on_primitive(entry.name);
            return (entry.handler)(self, console, &args).map_err(|flow| attribute_primitive(flow, entry.name));
        }
        Err(LogoError::dont_know_how(name).into())
    }

    /// Reads exactly `count` expressions, or — when `greedy` — expressions
    /// until the matching `)`.
    fn collect_args(&mut self, src: &mut dyn TokenSource, console: &mut Console, count: usize, greedy: bool, name: &str) -> Result<Vec<Value>, Flow> {
        if greedy {
            let mut args = Vec::new();
            while src.peek() != Tok::RightParen && src.peek() != Tok::Eof {
                args.push(self.eval_expression(src, console)?);
            }
            Ok(args)
        } else {
            let mut args = Vec::with_capacity(count);
            for _ in 0..count {
                if src.peek() == Tok::Eof {
                    return Err(LogoError::not_enough_inputs(name).into());
                }
                args.push(self.eval_expression(src, console)?);
            }
            Ok(args)
        }
    }

    /// Calls a user procedure: pushes a frame, runs its body, and
    /// interprets the frame's terminal `Flow` according to `ctx`.
    /// `proc.params` are assumed already canonical (case-folded) interned
    /// keys, set that way by the `to`/`end` definition handler, so no
    /// per-call re-folding is needed.
    pub fn call_procedure(&mut self, proc: &Procedure, args: Vec<Value>, console: &mut Console, ctx: CallContext) -> ExprResult {
        if args.len() != proc.params.len() {
            return Err(if args.len() < proc.params.len() {
                LogoError::not_enough_inputs(self.interns.get(proc.name).to_owned())
            } else {
                LogoError::too_many_inputs(self.interns.get(proc.name).to_owned())
            }
            .into());
        }
        let bindings: SmallVec<[(StringId, Value); 4]> = proc.params.iter().copied().zip(args).collect();

        self.frames.push(Frame::new(proc.name, bindings, proc.body), &mut self.tracker).map_err(LogoError::from)?;
        self.tracer.on_call(self.interns.get(proc.name), self.frames.depth());

        let result = self.run_frame_body(console);

        self.frames.pop(&mut self.tracker);
        self.tracer.on_return(self.interns.get(proc.name), self.frames.depth());

        match result {
            Ok(value) => Ok(value),
            Err(Flow::Stop) if ctx == CallContext::Command => Ok(Value::None),
            Err(Flow::Stop) => Err(LogoError::no_output(self.interns.get(proc.name).to_owned()).into()),
            Err(Flow::Error(err)) => Err(Flow::Error(Box::new(err.with_procedure(self.interns.get(proc.name).to_owned())))),
            Err(other) => Err(other),
        }
    }

    /// Runs the top frame's body lines until it outputs, stops, hits a
    /// tail call (handled in place, TCO), or exhausts its lines.
    fn run_frame_body(&mut self, console: &mut Console) -> ExprResult {
        loop {
            let Some(frame) = self.frames.top() else { return Ok(Value::None) };
            let line_count = frame.body.line_count(&self.heap);
            if frame.line >= line_count {
                return Ok(Value::None);
            }
            let is_last_line = frame.line + 1 == line_count;
            let line_id = frame.body.line(&self.heap, frame.line).expect("line index checked above");
            let mut src = ListSource::new(&self.heap, &mut self.interns, line_id);

            'line: loop {
                if src.peek() == Tok::Eof {
                    break 'line;
                }
                if is_last_line {
                    if let Tok::Word(id) = src.peek() {
                        let name = self.interns.get(id).to_owned();
                        if let Some(proc) = self.procedures.lookup(&name).cloned() {
                            src.advance();
                            let args = self.collect_args(&mut src, console, proc.params.len(), false, &name)?;
                            if src.peek() == Tok::Eof {
                                return self.tail_call(proc, args, console);
                            }
                            self.call_procedure(&proc, args, console, CallContext::Command)?;
                            continue 'line;
                        }
                    }
                }
                self.eval_instruction(&mut src, console)?;
            }
            self.frames.top_mut().expect("frame still present").line += 1;
        }
    }

    /// Replaces the current frame in place instead of pushing a new one
    /// ( TCO): self- and mutual-tail-recursion run in constant
    /// frame-stack space.
    fn tail_call(&mut self, proc: Procedure, args: Vec<Value>, console: &mut Console) -> ExprResult {
        if args.len() != proc.params.len() {
            return Err(if args.len() < proc.params.len() {
                LogoError::not_enough_inputs(self.interns.get(proc.name).to_owned())
            } else {
                LogoError::too_many_inputs(self.interns.get(proc.name).to_owned())
            }
            .into());
        }
        let bindings: SmallVec<[(StringId, Value); 4]> = proc.params.iter().copied().zip(args).collect();
        self.tracer.on_tail_call(self.interns.get(proc.name), self.frames.depth());
        self.frames.replace_top_for_tail_call(proc.name, bindings, proc.body, &mut self.tracker);
        match self.run_frame_body(console) {
            Ok(value) => Ok(value),
            Err(Flow::Error(err)) => Err(Flow::Error(Box::new(err.with_procedure(self.interns.get(proc.name).to_owned())))),
            other => other,
        }
    }

    // ---------------------------------------------------------------
    // Shared helpers used by control.rs / data_primitives.rs
    // ---------------------------------------------------------------

    /// Parses one whole source line into a token source ready for
    /// `eval_instruction`/`eval_expression` (used by the session layer to
    /// feed top-level REPL input through the same machinery as
    /// list-as-code).
    ///
    /// # Errors
    /// `ERROR(LEX)` on an invalid token.
    pub fn lex_line(&mut self, source: &str) -> Result<crate::token_source::LexerSource, LogoError> {
        crate::token_source::LexerSource::new(source, &mut self.interns)
    }
}

fn operator_text(tok: Tok) -> Option<&'static str> {
    Some(match tok {
        Tok::LeftParen => "(",
        Tok::RightParen => ")",
        Tok::Plus => "+",
        Tok::Minus => "-",
        Tok::Star => "*",
        Tok::Slash => "/",
        Tok::Eq => "=",
        Tok::NotEq => "<>",
        Tok::Lt => "<",
        Tok::Gt => ">",
        Tok::Le => "<=",
        Tok::Ge => ">=",
        _ => return None,
    })
}

/// Attaches first-hop primitive-name context to an escaping error.
fn attribute_primitive(flow: Flow, name: &str) -> Flow {
    match flow {
        Flow::Error(err) => Flow::Error(Box::new(err.with_primitive(name.to_owned()))),
        other => other,
    }
}

/// Structural equality used by `=`/`<>` and `equalp`. No
/// cycle detection: evaluation never produces cons cycles through the
/// exposed primitives.
#[must_use]
pub fn values_equal(heap: &Heap, interns: &Interner, a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Word(x), Value::Word(y)) => interns.eq_ci(heap.atom_id(*x), heap.atom_id(*y)),
        (Value::Number(_), Value::Word(_)) | (Value::Word(_), Value::Number(_)) => {
            let (num, word) = if matches!(a, Value::Number(_)) { (a, b) } else { (b, a) };
            let Value::Number(n) = num else { unreachable!() };
            let Value::Word(w) = word else { unreachable!() };
            parse_number(interns.get(heap.atom_id(*w))).is_some_and(|parsed| parsed == *n)
        }
        (Value::List(x), Value::List(y)) => lists_equal(heap, interns, *x, *y),
        _ => false,
    }
}

fn lists_equal(heap: &Heap, interns: &Interner, mut a: NodeId, mut b: NodeId) -> bool {
    loop {
        match (a.is_cons(), b.is_cons()) {
            (false, false) => return a.is_nil() && b.is_nil(),
            (true, true) => {
                let (car_a, cdr_a) = heap.cons(a);
                let (car_b, cdr_b) = heap.cons(b);
                let car_is_sublist_a = car_a.is_cons() || car_a.is_nil();
                let car_is_sublist_b = car_b.is_cons() || car_b.is_nil();
                let car_eq = match (car_is_sublist_a, car_is_sublist_b) {
                    (true, true) => lists_equal(heap, interns, car_a, car_b),
                    (false, false) => interns.eq_ci(heap.atom_id(car_a), heap.atom_id(car_b)),
                    _ => false,
                };
                if !car_eq {
                    return false;
                }
                a = cdr_a;
                b = cdr_b;
            }
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capability::Console, io::CollectStringOutput, resource::NoLimitTracker, tracer::NoopTracer};

    #[test]
    fn arithmetic_precedence_without_parens() {
        let mut ev = Evaluator::new(NoLimitTracker::new(), NoopTracer);
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("2 + 3 * 4").unwrap();
        let value = ev.eval_expression(&mut src, &mut console).unwrap();
        assert_eq!(value, Value::Number(14.0));
    }

    #[test]
    fn comparisons_do_not_chain() {
        let mut ev = Evaluator::new(NoLimitTracker::new(), NoopTracer);
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("1 < 2 < 3").unwrap();
        assert!(ev.eval_expression(&mut src, &mut console).is_err());
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiplication() {
        let mut ev = Evaluator::new(NoLimitTracker::new(), NoopTracer);
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("-2 * 3").unwrap();
        let value = ev.eval_expression(&mut src, &mut console).unwrap();
        assert_eq!(value, Value::Number(-6.0));
    }

    #[test]
    fn or_and_and_are_lower_precedence_than_comparisons() {
        let mut ev = Evaluator::new(NoLimitTracker::new(), NoopTracer);
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("1 < 2 and 3 < 4").unwrap();
        let value = ev.eval_expression(&mut src, &mut console).unwrap();
        assert_eq!(value.display(&ev.heap, &ev.interns), "true");
    }

    #[test]
    fn list_literal_round_trips_through_retokenize() {
        let mut ev = Evaluator::new(NoLimitTracker::new(), NoopTracer);
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("[\"a :b + 1]").unwrap();
        let value = ev.eval_expression(&mut src, &mut console).unwrap();
        let Value::List(list) = value else { panic!("expected a list") };
        let mut run_src = ListSource::new(&ev.heap, &mut ev.interns, list);
        assert!(matches!(run_src.advance(), Tok::QuotedWord(_)));
        assert!(matches!(run_src.advance(), Tok::ColonName(_)));
        assert_eq!(run_src.advance(), Tok::Plus);
        assert_eq!(run_src.advance(), Tok::Number(1.0));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let mut ev = Evaluator::new(NoLimitTracker::new(), NoopTracer);
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("5 / 0").unwrap();
        assert!(ev.eval_expression(&mut src, &mut console).is_err());
    }

    #[test]
    fn dont_know_how_reports_unknown_call() {
        let mut ev = Evaluator::new(NoLimitTracker::new(), NoopTracer);
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let mut src = ev.lex_line("frobnicate 1 2").unwrap();
        let err = ev.eval_instruction(&mut src, &mut console).unwrap_err();
        match err {
            Flow::Error(e) => assert_eq!(e.kind, LogoErrorKind::DontKnowHow),
            other => panic!("expected Flow::Error, got {other:?}"),
        }
    }
}
