//! User-defined procedures.
//!
//! A procedure is plain data produced by an earlier definition step,
//! stored by name, and consumed by the evaluator at call time: a flat
//! parameter list and a line-structured body. No closures, no captured
//! cells, no async/generator split, since `to`/`end` procedures have none
//! of that machinery.

use ahash::AHashMap;

use crate::{
    heap::{Heap, NodeId},
    intern::{fold_case, Interner, StringId},
};

/// A procedure body: a list of "line" lists, each itself a list of
/// instruction tokens (atoms/sublists), per the glossary's "procedure
/// text". Wrapped rather than a bare `NodeId` so call sites read as
/// "the body", not "some heap handle".
#[derive(Debug, Clone, Copy)]
pub struct ProcBody {
    pub lines: NodeId,
}

impl ProcBody {
    #[must_use]
    pub fn new(lines: NodeId) -> Self {
        Self { lines }
    }

    /// Returns the nth line (0-based) as a `NodeId` list of instruction
    /// tokens, or `None` past the last line.
    #[must_use]
    pub fn line(&self, heap: &Heap, index: usize) -> Option<NodeId> {
        heap.list_items(self.lines).get(index).copied()
    }

    #[must_use]
    pub fn line_count(&self, heap: &Heap) -> usize {
        heap.list_len(self.lines)
    }
}

/// A user-defined procedure (`to NAME :p1 :p2 ... / body / end`).
#[derive(Debug, Clone)]
pub struct Procedure {
    pub name: StringId,
    pub params: Vec<StringId>,
    pub body: ProcBody,
}

/// Case-insensitive procedure table. Redefinition replaces the
/// existing entry outright; there is no overload resolution.
#[derive(Debug, Default)]
pub struct ProcedureTable {
    by_name: AHashMap<String, Procedure>,
}

impl ProcedureTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, params: Vec<StringId>, body: ProcBody, interns: &mut Interner) {
        let id = interns.intern(name);
        self.by_name.insert(fold_case(name), Procedure { name: id, params, body });
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Procedure> {
        self.by_name.get(&fold_case(name))
    }

    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.by_name.contains_key(&fold_case(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Procedure> {
        self.by_name.remove(&fold_case(name))
    }

    pub fn names(&self) -> impl Iterator<Item = StringId> + '_ {
        self.by_name.values().map(|proc| proc.name)
    }
}
