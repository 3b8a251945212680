//! The primitive registry: a fixed-capacity table of
//! `(name, default_args, handler)` triples with case-insensitive linear
//! lookup, aliases sharing a handler, looked up by the evaluator whenever a
//! call's head word doesn't name a user procedure.
//!
//! Mirrors `procedure.rs`'s "plain data describing a callable" shape, but
//! for the fixed set of builtins every session starts with rather than
//! user-defined procedures. A linear table rather than a hash map: the
//! set is small, on the order of a couple hundred entries, so the constant
//! factors of a `Vec` scan win over hashing.

use crate::{capability::Console, evaluator::Evaluator, resource::ResourceTracker, tracer::EvalTracer, value::{ExprResult, Value}};

/// A primitive's handler: given the evaluator (so it can recurse into
/// `run_list`/variable access/frame push for control-flow primitives), the
/// console, and the already-evaluated argument values, produces a result.
///
/// Command-form primitives return `Ok(Value::None)`; expression-form ones
/// return their computed value. Both use the same signature, matching
/// single handler contract.
pub type PrimitiveFn<R, T> = fn(&mut Evaluator<R, T>, &mut Console, &[Value]) -> ExprResult;

pub struct PrimitiveEntry<R: ResourceTracker, T: EvalTracer> {
    pub name: &'static str,
    pub default_args: usize,
    pub handler: PrimitiveFn<R, T>,
}

impl<R: ResourceTracker, T: EvalTracer> Clone for PrimitiveEntry<R, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: ResourceTracker, T: EvalTracer> Copy for PrimitiveEntry<R, T> {}

/// Case-insensitive linear table. Small enough in practice that a
/// hash map buys nothing; the registration order also determines the
/// (irrelevant) order `ProcedureTable`-like introspection would see.
pub struct PrimitiveTable<R: ResourceTracker, T: EvalTracer> {
    entries: Vec<PrimitiveEntry<R, T>>,
}

impl<R: ResourceTracker, T: EvalTracer> Default for PrimitiveTable<R, T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<R: ResourceTracker, T: EvalTracer> PrimitiveTable<R, T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, default_args: usize, handler: PrimitiveFn<R, T>) {
        self.entries.push(PrimitiveEntry { name, default_args, handler });
    }

    /// Registers `alias` sharing `target`'s handler and default arity;
    /// aliases never carry a distinct default arity of their own.
    ///
    /// # Panics
    /// Panics if `target` hasn't been registered yet — a programming error
    /// in the registration order, not a runtime condition.
    pub fn register_alias(&mut self, alias: &'static str, target: &str) {
        let found = self.lookup(target).unwrap_or_else(|| panic!("alias target '{target}' not registered"));
        let entry = found.clone();
        self.entries.push(PrimitiveEntry { name: alias, ..entry });
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&PrimitiveEntry<R, T>> {
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
