//! Core language engine for an interactive Logo interpreter: lexer, heap,
//! value model, evaluator, and procedure/primitive registries, plus the
//! session layer a REPL or embedded host drives it through.
//!
//! The crate has no notion of a terminal, turtle canvas, or file system of
//! its own — those are consumed through the capability traits in
//! [`capability`], so the same evaluator runs headless in a test harness or
//! behind a real display driver on a device.

// first to include the node-tag arithmetic every other module builds on
mod heap;

pub mod capability;
mod control;
mod data_primitives;
pub mod error;
mod evaluator;
mod frame;
mod intern;
pub mod io;
mod lexer;
mod namespace;
mod primitive;
mod procedure;
mod properties;
mod repl_error;
pub mod resource;
pub mod session;
mod token_source;
pub mod tracer;
mod value;

pub use crate::{
    capability::{Console, EditOutcome, EditorCapability, FenceMode, FileCapability, HardwareCapability, InputCapability, OutputCapability, PenState, ReadOutcome, TextScreenCapability, TurtleCapability},
    error::{ErrorContext, LogoError, LogoErrorKind},
    evaluator::Evaluator,
    frame::{Frame, FrameStack},
    heap::{Heap, HeapStats, NodeId},
    intern::{fold_case, Interner, StringId},
    io::{CollectStringOutput, NullOutput, StdOutput},
    namespace::Variables,
    primitive::{PrimitiveEntry, PrimitiveTable},
    procedure::{ProcBody, Procedure, ProcedureTable},
    properties::PropertyLists,
    repl_error::SessionError,
    resource::{LimitedTracker, NoLimitTracker, ResourceError, ResourceLimits, ResourceTracker, DEFAULT_MAX_RECURSION_DEPTH},
    session::{ProcedureSnapshot, Session, SessionProgress, SessionSnapshot},
    tracer::{EvalTracer, NoopTracer, StderrTracer},
    value::{ExprResult, Flow, InstrResult, Value},
};
