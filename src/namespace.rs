//! Scoped variable bindings.
//!
//! Owns binding-resolution logic; individual frames own their own
//! storage. Logo's dynamic scoping means `get`/`set` scan the active
//! call-frame chain outward before falling back to the global table,
//! rather than resolving to a fixed slot at definition time — a single
//! flat hash table would lose shadowing semantics entirely.
//!
//! Binding keys are the *canonical* (case-folded) interned spelling of a
//! variable name, obtained via [`canonical_key`] — not the case-preserving
//! atom a `Word` value would use. This keeps `:Foo` and `:foo` resolving to
//! one binding without needing a second string comparison at every lookup.

use ahash::AHashMap;

use crate::{
    frame::{Frame, FrameStack},
    intern::{fold_case, Interner, StringId},
    value::Value,
};

/// Interns the case-folded spelling of a variable name, giving a stable
/// key shared by every case variant of that name.
#[must_use]
pub fn canonical_key(interns: &mut Interner, name: &str) -> StringId {
    interns.intern(&fold_case(name))
}

/// The global (workspace-level) variable table.
#[derive(Debug, Default)]
pub struct Variables {
    global: AHashMap<StringId, Value>,
}

impl Variables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `key`: the dynamic chain of active frames, innermost
    /// first, then the global table. Never coerces the stored value
    /// ( invariant).
    #[must_use]
    pub fn get(&self, frames: &FrameStack, key: StringId) -> Option<Value> {
        for frame in frames.as_slice().iter().rev() {
            if let Some(v) = frame.lookup(key) {
                return Some(v);
            }
        }
        self.global.get(&key).copied()
    }

    /// Assigns `key` in the nearest enclosing scope that already holds it
    /// (innermost frame outward, then global); creates it in global if no
    /// scope already holds it (`make`,).
    pub fn set(&mut self, frames: &mut FrameStack, key: StringId, value: Value) {
        for frame in frames.frames_mut().iter_mut().rev() {
            if frame.try_assign(key, value) {
                return;
            }
        }
        self.global.insert(key, value);
    }

    /// Declares a new local binding (initially `Value::None`) in the
    /// current (innermost) frame, shadowing any outer binding with the
    /// same key for the remainder of this activation (`local`,).
    pub fn declare_local(&self, frame: &mut Frame, key: StringId) {
        frame.declare_local(key, Value::None);
    }

    /// True if `key` is bound in global scope or anywhere on `frames`'
    /// dynamic chain (`thing`'s existence check,).
    #[must_use]
    pub fn is_bound(&self, frames: &FrameStack, key: StringId) -> bool {
        self.get(frames, key).is_some()
    }

    /// Every global binding's canonical name and printed value, for session
    /// snapshotting. Frame-local bindings aren't included — they
    /// don't outlive the call that created them, so there's nothing to
    /// persist.
    #[must_use]
    pub fn snapshot_globals(&self, heap: &crate::heap::Heap, interns: &Interner) -> Vec<(String, String)> {
        self.global.iter().map(|(key, value)| (interns.get(*key).to_owned(), value.display(heap, interns))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        heap::NodeId,
        procedure::ProcBody,
    };
    use smallvec::SmallVec;

    #[test]
    fn empty_lookup_is_none() {
        let mut interns = Interner::new();
        let vars = Variables::new();
        let frames = FrameStack::new();
        let key = canonical_key(&mut interns, "a");
        assert_eq!(vars.get(&frames, key), None);
    }

    #[test]
    fn set_creates_global_when_no_frame_holds_name() {
        let mut interns = Interner::new();
        let mut vars = Variables::new();
        let mut frames = FrameStack::new();
        let key = canonical_key(&mut interns, "a");
        vars.set(&mut frames, key, Value::Number(1.0));
        assert_eq!(vars.get(&frames, key), Some(Value::Number(1.0)));
    }

    #[test]
    fn dynamic_scope_sees_callers_local() {
        let mut interns = Interner::new();
        let mut vars = Variables::new();
        let mut frames = FrameStack::new();
        let mut tracker = crate::resource::NoLimitTracker::new();
        let a = canonical_key(&mut interns, "a");
        let f = interns.intern("f");
        let g = interns.intern("g");
        let body = ProcBody::new(NodeId::NIL);

        // f's frame declares a local "a", then calls g (a nested frame).
        let mut f_frame = crate::frame::Frame::new(f, SmallVec::new(), body.clone());
        vars.declare_local(&mut f_frame, a);
        frames.push(f_frame, &mut tracker).unwrap();
        vars.set(&mut frames, a, Value::Number(99.0));

        frames.push(crate::frame::Frame::new(g, SmallVec::new(), body), &mut tracker).unwrap();
        assert_eq!(vars.get(&frames, a), Some(Value::Number(99.0)));
    }
}
