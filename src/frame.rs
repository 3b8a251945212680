//! The call-frame stack: procedure activation records.
//!
//! Spec.md describes a word-addressed bump arena with O(1) push and
//! rewind-on-pop. This crate models that discipline with a `Vec<Frame>`
//! stack instead of raw byte offsets: pushing a frame is the arena's bump
//! allocation, popping truncates back to the pre-call top, and a tail call
//! resets the top frame in place rather than growing the stack — the same
//! externally observable behaviour without pointer
//! arithmetic, which buys nothing here since frames are Rust values, not
//! bytes shared with unrelated data.

use smallvec::SmallVec;

use crate::{
    intern::StringId,
    procedure::ProcBody,
    resource::{ResourceError, ResourceTracker},
    value::Value,
};

/// Rough per-frame byte cost used against the 256 KB budget:
/// a handful of machine words per binding plus frame bookkeeping.
const BYTES_PER_BINDING: usize = 32;
const FRAME_OVERHEAD_BYTES: usize = 64;

/// One procedure activation record.
///
/// `bindings` is the frame's own association list: dynamic scoping means a
/// single flat hash per frame would lose shadowing semantics, so a
/// `local` inside this frame shadows anything bound earlier in the same
/// frame by simply being looked up last-to-first.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Name of the procedure this frame is running, for error attribution
    /// and `test` bookkeeping.
    pub proc_name: StringId,
    pub bindings: SmallVec<[(StringId, Value); 4]>,
    /// The procedure body being executed and the current line/instruction
    /// cursor within it, reassigned in place on a tail call.
    pub body: ProcBody,
    pub line: usize,
    /// Per-procedure `test`/`iftrue`/`iffalse` result, scoped per-procedure
    /// and reset on entry.
    pub test_result: Option<bool>,
}

impl Frame {
    #[must_use]
    pub fn new(proc_name: StringId, bindings: SmallVec<[(StringId, Value); 4]>, body: ProcBody) -> Self {
        Self { proc_name, bindings, body, line: 0, test_result: None }
    }

    /// Looks up `name` in this frame's own bindings only (most recently
    /// declared local wins), not the enclosing dynamic chain.
    #[must_use]
    pub fn lookup(&self, name: StringId) -> Option<Value> {
        self.bindings.iter().rev().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Assigns `name` in this frame's own bindings if already present here,
    /// returning whether it found a slot to assign into.
    pub fn try_assign(&mut self, name: StringId, value: Value) -> bool {
        if let Some(slot) = self.bindings.iter_mut().rev().find(|(n, _)| *n == name) {
            slot.1 = value;
            true
        } else {
            false
        }
    }

    /// Declares a new local binding, shadowing any existing one with the
    /// same name in this frame (`local "name`,).
    pub fn declare_local(&mut self, name: StringId, value: Value) {
        self.bindings.push((name, value));
    }

    #[must_use]
    fn approx_bytes(&self) -> usize {
        FRAME_OVERHEAD_BYTES + self.bindings.len() * BYTES_PER_BINDING
    }
}

/// The LIFO stack of active frames.
#[derive(Debug, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    #[must_use]
    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Frame] {
        &self.frames
    }

    #[must_use]
    pub fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    /// Pushes a new activation, checking recursion depth and the 256 KB
    /// budget against `tracker` first.
    pub fn push(&mut self, frame: Frame, tracker: &mut impl ResourceTracker) -> Result<(), ResourceError> {
        tracker.check_recursion_depth(self.frames.len())?;
        let bytes = frame.approx_bytes();
        tracker.on_allocate(|| bytes)?;
        self.frames.push(frame);
        Ok(())
    }

    /// Pops and returns the top activation (arena rewind), releasing its
    /// bindings back to `tracker`.
    pub fn pop(&mut self, tracker: &mut impl ResourceTracker) -> Option<Frame> {
        let frame = self.frames.pop()?;
        let bytes = frame.approx_bytes();
        tracker.on_free(|| bytes);
        Some(frame)
    }

    /// Replaces the top frame in place for a tail call ( TCO): no
    /// push, no stack growth, so repeated self-tail-recursion runs in
    /// constant frame-stack space.
    pub fn replace_top_for_tail_call(&mut self, proc_name: StringId, bindings: SmallVec<[(StringId, Value); 4]>, body: ProcBody, tracker: &mut impl ResourceTracker) {
        if let Some(top) = self.frames.last_mut() {
            let old_bytes = top.approx_bytes();
            top.proc_name = proc_name;
            top.bindings = bindings;
            top.body = body;
            top.line = 0;
            top.test_result = None;
            let new_bytes = top.approx_bytes();
            if new_bytes > old_bytes {
                let _ = tracker.on_allocate(|| new_bytes - old_bytes);
            } else {
                tracker.on_free(|| old_bytes - new_bytes);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{intern::Interner, procedure::ProcBody, resource::NoLimitTracker};

    #[test]
    fn push_pop_restores_depth() {
        let mut stack = FrameStack::new();
        let mut tracker = NoLimitTracker::new();
        let mut interns = Interner::new();
        let name = interns.intern("square");
        let body = ProcBody::new(crate::heap::NodeId::NIL);

        stack.push(Frame::new(name, SmallVec::new(), body.clone()), &mut tracker).unwrap();
        assert_eq!(stack.depth(), 1);
        stack.pop(&mut tracker);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn tail_call_does_not_grow_depth() {
        let mut stack = FrameStack::new();
        let mut tracker = NoLimitTracker::new();
        let mut interns = Interner::new();
        let name = interns.intern("loop");
        let body = ProcBody::new(crate::heap::NodeId::NIL);
        stack.push(Frame::new(name, SmallVec::new(), body.clone()), &mut tracker).unwrap();
        for _ in 0..1_000_000 {
            stack.replace_top_for_tail_call(name, SmallVec::new(), body.clone(), &mut tracker);
        }
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn local_declared_later_shadows_earlier_binding() {
        let mut interns = Interner::new();
        let name = interns.intern("a");
        let body = ProcBody::new(crate::heap::NodeId::NIL);
        let mut frame = Frame::new(interns.intern("f"), SmallVec::new(), body);
        frame.declare_local(name, Value::Number(1.0));
        frame.declare_local(name, Value::Number(2.0));
        assert_eq!(frame.lookup(name), Some(Value::Number(2.0)));
    }
}
