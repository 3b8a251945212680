//! The REPL session layer: one persistent interpreter session
//! spanning many [`Session::execute`] calls, plus the `to`/`end` multi-line
//! definition buffering the evaluator itself deliberately does not do.
//! `to NAME :p1 :p2 … / body / end` is parsed by this line-buffering layer;
//! the evaluator only ever receives a whole definition as name, params,
//! body-lines.
//!
//! A persistent session object owns interpreter state across calls, with a
//! `SessionSnapshot` (serde + postcard) for save/load. Single-workspace
//! shape — no multi-session registry, since nothing here names a reason to
//! run more than one workspace per process.

use crate::{
    capability::Console,
    error::{LogoError, LogoErrorKind},
    evaluator::Evaluator,
    heap::NodeId,
    intern::StringId,
    repl_error::SessionError,
    resource::ResourceTracker,
    token_source::{Tok, TokenSource},
    tracer::EvalTracer,
    value::Flow,
};

/// A `to`/`end` definition in progress: the header has been read, and
/// zero or more body lines have been buffered, but `end` hasn't arrived
/// yet.
#[derive(Debug)]
struct PendingDefinition {
    name: String,
    params: Vec<StringId>,
    lines: Vec<NodeId>,
}

/// What happened after feeding one line to [`Session::execute`].
#[derive(Debug, PartialEq, Eq)]
pub enum SessionProgress {
    /// The line ran to completion (or, for `throw "toplevel`, unwound to
    /// here by design); the session is ready for the next line.
    Complete,
    /// The line opened or continued a `to`/`end` definition. More lines
    /// are needed before anything runs; feed them to `execute` in turn.
    Paused,
}

/// One REPL session: an [`Evaluator`] plus the `to`/`end` buffering state
/// that lives above it.
pub struct Session<R: ResourceTracker, T: EvalTracer> {
    pub evaluator: Evaluator<R, T>,
    pending: Option<PendingDefinition>,
}

impl<R: ResourceTracker, T: EvalTracer> Session<R, T> {
    #[must_use]
    pub fn new(tracker: R, tracer: T) -> Self {
        Self { evaluator: Evaluator::new(tracker, tracer), pending: None }
    }

    /// True while a `to`/`end` definition is being collected.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pending.is_some()
    }

    /// Feeds one line of source to the session.
    ///
    /// While a `to`/`end` definition is open, every line is either `end`
    /// (which closes it) or another body line (buffered verbatim); no
    /// other input is accepted until it closes. Otherwise a line starting
    /// with the bareword `to` opens a new definition, and anything else
    /// runs as a single instruction.
    pub fn execute(&mut self, line: &str, console: &mut Console) -> Result<SessionProgress, SessionError> {
        let mut src = self.evaluator.lex_line(line)?;

        if self.pending.is_some() {
            return self.feed_pending(&mut src);
        }

        if let Tok::Word(id) = src.peek() {
            if self.evaluator.interns.get(id).eq_ignore_ascii_case("to") {
                src.advance();
                return self.start_definition(&mut src);
            }
        }

        match self.evaluator.eval_instruction(&mut src, console) {
            Ok(()) => Ok(SessionProgress::Complete),
            Err(Flow::Throw(tag)) if self.evaluator.interns.get(tag).eq_ignore_ascii_case("toplevel") => Ok(SessionProgress::Complete),
            Err(Flow::Throw(tag)) => Err(SessionError::Logo(LogoError::no_catch(self.evaluator.interns.get(tag).to_owned()))),
            Err(Flow::Stop | Flow::Output(_)) => Ok(SessionProgress::Complete),
            Err(Flow::Error(err)) => Err(SessionError::Logo(*err)),
        }
    }

    /// Reads a `to NAME :p1 :p2 …` header already past the `to` keyword.
    fn start_definition(&mut self, src: &mut dyn TokenSource) -> Result<SessionProgress, SessionError> {
        let name = match src.advance() {
            Tok::Word(id) => self.evaluator.interns.get(id).to_owned(),
            other => return Err(SessionError::Logo(LogoError::new(LogoErrorKind::DoesntLikeInput, format!("to: expected a procedure name, found {other:?}")))),
        };
        let mut params = Vec::new();
        loop {
            match src.advance() {
                Tok::Eof => break,
                Tok::ColonName(id) => params.push(id),
                other => return Err(SessionError::Logo(LogoError::new(LogoErrorKind::DoesntLikeInput, format!("to: expected a :parameter, found {other:?}")))),
            }
        }
        self.pending = Some(PendingDefinition { name, params, lines: Vec::new() });
        Ok(SessionProgress::Paused)
    }

    /// Reads one more line of an in-progress definition: either the
    /// closing `end`, or a body line to buffer.
    fn feed_pending(&mut self, src: &mut dyn TokenSource) -> Result<SessionProgress, SessionError> {
        if let Tok::Word(id) = src.peek() {
            if self.evaluator.interns.get(id).eq_ignore_ascii_case("end") {
                let end_tok_pos = src.save();
                src.advance();
                if src.peek() == Tok::Eof {
                    return self.finish_definition();
                }
                src.restore(end_tok_pos);
            }
        }
        let line = self.evaluator.parse_line_as_list(src)?;
        if let Some(pending) = self.pending.as_mut() {
            pending.lines.push(line);
        }
        Ok(SessionProgress::Paused)
    }

    fn finish_definition(&mut self) -> Result<SessionProgress, SessionError> {
        let pending = self.pending.take().expect("finish_definition only called while pending");
        let body_list = self.evaluator.heap.build_list(pending.lines.into_iter());
        self.evaluator.procedures.define(&pending.name, pending.params, crate::procedure::ProcBody::new(body_list), &mut self.evaluator.interns);
        Ok(SessionProgress::Complete)
    }

    /// Abandons an in-progress `to`/`end` definition (e.g. the host's
    /// editor was cancelled). A no-op if nothing is pending.
    pub fn abandon_pending(&mut self) {
        self.pending = None;
    }

    /// Snapshots every procedure, property list, and global variable for
    /// later restoration. Heap internals and any in-progress
    /// `to`/`end` definition are intentionally excluded.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let procedures = self
            .evaluator
            .procedures
            .names()
            .filter_map(|id| self.evaluator.procedures.lookup(self.evaluator.interns.get(id)))
            .map(|proc| ProcedureSnapshot {
                name: self.evaluator.interns.get(proc.name).to_owned(),
                params: proc.params.iter().map(|id| self.evaluator.interns.get(*id).to_owned()).collect(),
                body_lines: (0..proc.body.line_count(&self.evaluator.heap))
                    .map(|i| {
                        let line = proc.body.line(&self.evaluator.heap, i).expect("index within line_count");
                        self.evaluator
                            .heap
                            .list_items(line)
                            .iter()
                            .map(|node| if node.is_cons() || node.is_nil() { crate::value::Value::List(*node).display(&self.evaluator.heap, &self.evaluator.interns) } else { crate::value::Value::Word(*node).display(&self.evaluator.heap, &self.evaluator.interns) })
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect(),
            })
            .collect();
        SessionSnapshot { procedures, properties: self.evaluator.properties.snapshot_all(&self.evaluator.heap, &self.evaluator.interns), globals: self.evaluator.vars.snapshot_globals(&self.evaluator.heap, &self.evaluator.interns) }
    }
}

/// One procedure's definition, printed form (re-parsed through the normal
/// `to`/`end` path on load rather than carrying heap handles, which are
/// not stable across a dump/load boundary).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProcedureSnapshot {
    pub name: String,
    pub params: Vec<String>,
    pub body_lines: Vec<String>,
}

/// A portable, serializable record of a session's procedures, property
/// lists, and global variables. Deliberately excludes heap
/// internals and any definition-in-progress: neither is meaningful once
/// restored into a different process.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SessionSnapshot {
    pub procedures: Vec<ProcedureSnapshot>,
    pub properties: Vec<(String, Vec<(String, String)>)>,
    pub globals: Vec<(String, String)>,
}

impl SessionSnapshot {
    /// Serializes this snapshot with `postcard`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{io::CollectStringOutput, resource::NoLimitTracker, tracer::NoopTracer};

    fn new_session() -> Session<NoLimitTracker, NoopTracer> {
        Session::new(NoLimitTracker::new(), NoopTracer)
    }

    #[test]
    fn simple_instruction_completes_immediately() {
        let mut session = new_session();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        assert_eq!(session.execute("make \"a 1", &mut console).unwrap(), SessionProgress::Complete);
        assert!(!session.is_paused());
    }

    #[test]
    fn to_end_defines_a_callable_procedure() {
        let mut session = new_session();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        assert_eq!(session.execute("to square :x", &mut console).unwrap(), SessionProgress::Paused);
        assert!(session.is_paused());
        assert_eq!(session.execute("output :x * :x", &mut console).unwrap(), SessionProgress::Paused);
        assert_eq!(session.execute("end", &mut console).unwrap(), SessionProgress::Complete);
        assert!(!session.is_paused());
        assert!(session.evaluator.procedures.is_defined("square"));

        assert_eq!(session.execute("make \"result square 5", &mut console).unwrap(), SessionProgress::Complete);
        let result_name = session.evaluator.interns.find_ci("result").unwrap();
        let value = session.evaluator.vars.get(&session.evaluator.frames, result_name).unwrap();
        assert_eq!(value.as_number(&session.evaluator.heap, &session.evaluator.interns).unwrap(), 25.0);
    }

    #[test]
    fn uncaught_throw_becomes_no_catch_error() {
        let mut session = new_session();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let err = session.execute("throw \"missing", &mut console).unwrap_err();
        match err {
            SessionError::Logo(e) => assert_eq!(e.kind, LogoErrorKind::NoCatch),
            SessionError::Resource(_) => panic!("expected a Logo error"),
        }
    }

    #[test]
    fn throw_toplevel_unwinds_without_erroring() {
        let mut session = new_session();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        assert_eq!(session.execute("throw \"toplevel", &mut console).unwrap(), SessionProgress::Complete);
    }

    #[test]
    fn snapshot_round_trips_through_postcard() {
        let mut session = new_session();
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        session.execute("make \"a 42", &mut console).unwrap();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.globals, vec![("a".to_owned(), "42".to_owned())]);
        let bytes = snapshot.to_bytes().unwrap();
        let restored = SessionSnapshot::from_bytes(&bytes).unwrap();
        assert_eq!(restored.globals, snapshot.globals);
    }
}
