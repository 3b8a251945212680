//! The shared node store: interned atoms and cons cells, addressed by small
//! handles.
//!
//! Two node kinds live in one arena so that a single handle type (`NodeId`)
//! can address either: an atom (an interned word, stored in the interner —
//! see `intern.rs` — and referenced here only by `StringId`) or a cons cell
//! (`car`/`cdr`, each itself a `NodeId`). `NodeId::NIL` is a reserved,
//! distinguished handle that is neither an atom nor a cons.
//!
//! There is no reference counting: Logo list-building primitives only ever
//! grow the heap (`fput`/`lput`/`sentence` cons new cells; `sentence`
//! additionally mutates a tail `cdr` in place when flattening). Reclamation,
//! if ever needed, is an explicit mark-and-compact pass driven by external
//! root providers (variables, frames, properties, procedures) rather than
//! automatic GC — see `mark_roots`/`compact`.

use ahash::AHashSet;
use smallvec::SmallVec;

use crate::intern::StringId;

/// A node handle: encodes (type-tag, index) in 32 bits.
///
/// The low bit distinguishes atoms from cons cells; the remaining bits are
/// the arena slot index. `NodeId::NIL` is the reserved empty-list handle and
/// compares unequal to every atom or cons handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct NodeId(u32);

const TAG_BIT: u32 = 1;
const NIL_SENTINEL: u32 = u32::MAX;

impl NodeId {
    /// The reserved handle for the empty list. Distinct from any atom or cons.
    pub const NIL: Self = Self(NIL_SENTINEL);

    fn atom(index: usize) -> Self {
        Self((index as u32) << 1)
    }

    fn cons(index: usize) -> Self {
        Self(((index as u32) << 1) | TAG_BIT)
    }

    #[must_use]
    pub fn is_nil(self) -> bool {
        self == Self::NIL
    }

    #[must_use]
    pub fn is_cons(self) -> bool {
        !self.is_nil() && (self.0 & TAG_BIT) == TAG_BIT
    }

    #[must_use]
    pub fn is_atom(self) -> bool {
        !self.is_nil() && (self.0 & TAG_BIT) == 0
    }

    fn index(self) -> usize {
        debug_assert!(!self.is_nil());
        (self.0 >> 1) as usize
    }
}

/// One heap-resident node.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub enum HeapNode {
    /// An interned word. The `StringId` is looked up in `Interns` for the
    /// actual bytes; this keeps heap nodes a fixed, small size.
    Atom(StringId),
    /// An ordered pair. `cdr` is either `NodeId::NIL` or another cons handle.
    Cons { car: NodeId, cdr: NodeId },
}

/// Snapshot of heap occupancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    pub live_atoms: usize,
    pub live_cons: usize,
    pub free_slots: usize,
    pub total_slots: usize,
}

/// The process-wide (or session-wide) node arena.
///
/// Atoms and cons cells live in separate backing vectors even though they
/// share one handle space, so that atom lookups never have to branch on
/// node kind. Freed slots (after a `compact`) are recycled via free lists
/// before the backing vectors grow.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Heap {
    atoms: Vec<Option<StringId>>,
    cons: Vec<Option<(NodeId, NodeId)>>,
    atom_free: Vec<u32>,
    cons_free: Vec<u32>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates (or reuses a freed slot for) an atom node.
    pub fn alloc_atom(&mut self, id: StringId) -> NodeId {
        if let Some(slot) = self.atom_free.pop() {
            let idx = slot as usize;
            self.atoms[idx] = Some(id);
            return NodeId::atom(idx);
        }
        let idx = self.atoms.len();
        self.atoms.push(Some(id));
        NodeId::atom(idx)
    }

    /// Allocates (or reuses a freed slot for) a cons cell.
    pub fn alloc_cons(&mut self, car: NodeId, cdr: NodeId) -> NodeId {
        debug_assert!(cdr.is_nil() || cdr.is_cons(), "cdr must be NIL or a cons handle");
        if let Some(slot) = self.cons_free.pop() {
            let idx = slot as usize;
            self.cons[idx] = Some((car, cdr));
            return NodeId::cons(idx);
        }
        let idx = self.cons.len();
        self.cons.push(Some((car, cdr)));
        NodeId::cons(idx)
    }

    /// Returns the interned string id an atom handle refers to.
    ///
    /// # Panics
    /// Panics if `id` is not a live atom handle — a sign of a dangling or
    /// wrongly-tagged `NodeId`, which indicates an interpreter bug.
    #[must_use]
    pub fn atom_id(&self, id: NodeId) -> StringId {
        assert!(id.is_atom(), "NodeId is not an atom handle");
        self.atoms[id.index()].expect("atom handle points at a freed slot")
    }

    /// Returns `(car, cdr)` for a cons handle.
    ///
    /// # Panics
    /// Panics if `id` is not a live cons handle.
    #[must_use]
    pub fn cons(&self, id: NodeId) -> (NodeId, NodeId) {
        assert!(id.is_cons(), "NodeId is not a cons handle");
        self.cons[id.index()].expect("cons handle points at a freed slot")
    }

    #[must_use]
    pub fn car(&self, id: NodeId) -> NodeId {
        self.cons(id).0
    }

    #[must_use]
    pub fn cdr(&self, id: NodeId) -> NodeId {
        self.cons(id).1
    }

    /// Overwrites the `cdr` field of an existing cons cell in place.
    ///
    /// This is the one mutation the heap supports, needed for the
    /// tail-append pattern `lput`/`sentence` use to build a result list
    /// without re-consing the whole prefix.
    ///
    /// # Panics
    /// Panics if `id` is not a live cons handle.
    pub fn set_cdr(&mut self, id: NodeId, new_cdr: NodeId) {
        assert!(id.is_cons(), "NodeId is not a cons handle");
        let slot = self.cons[id.index()].as_mut().expect("cons handle points at a freed slot");
        slot.1 = new_cdr;
    }

    /// Returns the number of list elements reachable from `id` (0 for
    /// `NodeId::NIL`, otherwise walks the cons spine).
    ///
    /// Does not detect cycles: notes evaluation never produces
    /// cons cycles through the exposed primitives, so an unbounded walk is
    /// acceptable under that restriction.
    #[must_use]
    pub fn list_len(&self, mut id: NodeId) -> usize {
        let mut n = 0;
        while id.is_cons() {
            n += 1;
            id = self.cdr(id);
        }
        n
    }

    /// Builds a proper list from a sequence of element handles, tail first.
    #[must_use]
    pub fn build_list(&mut self, items: impl DoubleEndedIterator<Item = NodeId>) -> NodeId {
        let mut tail = NodeId::NIL;
        for item in items.rev() {
            tail = self.alloc_cons(item, tail);
        }
        tail
    }

    /// Collects a list's elements into a vector, in order.
    #[must_use]
    pub fn list_items(&self, mut id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.list_len(id));
        while id.is_cons() {
            let (car, cdr) = self.cons(id);
            out.push(car);
            id = cdr;
        }
        out
    }

    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let live_atoms = self.atoms.iter().filter(|a| a.is_some()).count();
        let live_cons = self.cons.iter().filter(|c| c.is_some()).count();
        HeapStats {
            live_atoms,
            live_cons,
            free_slots: self.atom_free.len() + self.cons_free.len(),
            total_slots: self.atoms.len() + self.cons.len(),
        }
    }

    /// Marks every node reachable from `roots` and frees everything else.
    ///
    /// This is the "explicit mark-roots protocol"/ allows in
    /// place of automatic GC: callers (the evaluator session) are
    /// responsible for supplying every live root — global/frame variable
    /// bindings, property-list values, procedure bodies, and any pending
    /// pause buffers — before calling this. Nothing calls it automatically.
    pub fn compact(&mut self, roots: impl IntoIterator<Item = NodeId>) {
        let mut seen: AHashSet<NodeId> = AHashSet::default();
        let mut stack: SmallVec<[NodeId; 32]> = SmallVec::new();
        stack.extend(roots);
        while let Some(id) = stack.pop() {
            if id.is_nil() || !seen.insert(id) {
                continue;
            }
            if id.is_cons() {
                let (car, cdr) = self.cons(id);
                stack.push(car);
                stack.push(cdr);
            }
        }
        self.atom_free.clear();
        self.cons_free.clear();
        for (idx, slot) in self.atoms.iter_mut().enumerate() {
            if slot.is_some() && !seen.contains(&NodeId::atom(idx)) {
                *slot = None;
                self.atom_free.push(idx as u32);
            }
        }
        for (idx, slot) in self.cons.iter_mut().enumerate() {
            if slot.is_some() && !seen.contains(&NodeId::cons(idx)) {
                *slot = None;
                self.cons_free.push(idx as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;

    #[test]
    fn nil_is_distinct_from_every_node() {
        let mut heap = Heap::new();
        let mut interns = Interner::new();
        let id = interns.intern("x");
        let atom = heap.alloc_atom(id);
        let cons = heap.alloc_cons(atom, NodeId::NIL);
        assert_ne!(atom, NodeId::NIL);
        assert_ne!(cons, NodeId::NIL);
        assert!(NodeId::NIL.is_nil());
        assert!(!atom.is_nil());
    }

    #[test]
    fn list_length_preservation_fput_lput() {
        let mut heap = Heap::new();
        let mut interns = Interner::new();
        let a = heap.alloc_atom(interns.intern("a"));
        let b = heap.alloc_atom(interns.intern("b"));
        let c = heap.alloc_atom(interns.intern("c"));
        let list = heap.build_list([a, b, c].into_iter());
        assert_eq!(heap.list_len(list), 3);

        let fput = heap.alloc_cons(a, list);
        assert_eq!(heap.list_len(fput), 4);

        // lput: append by walking to the tail and consing on NIL, then
        // splicing via set_cdr to avoid re-consing the prefix.
        let new_tail = heap.alloc_cons(a, NodeId::NIL);
        let items = heap.list_items(list);
        let mut rebuilt = new_tail;
        for item in items.into_iter().rev() {
            rebuilt = heap.alloc_cons(item, rebuilt);
        }
        assert_eq!(heap.list_len(rebuilt), 4);
    }

    #[test]
    fn compact_keeps_only_reachable_nodes() {
        let mut heap = Heap::new();
        let mut interns = Interner::new();
        let kept = heap.alloc_atom(interns.intern("kept"));
        let _garbage = heap.alloc_atom(interns.intern("garbage"));
        let list = heap.build_list([kept].into_iter());
        let before = heap.stats();
        assert_eq!(before.live_atoms, 2);

        heap.compact([list]);
        let after = heap.stats();
        assert_eq!(after.live_atoms, 1);
        assert_eq!(after.free_slots, 1);
    }
}
