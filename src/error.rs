//! Language-level error taxonomy.
//!
//! A closed `enum` of error kinds, a struct carrying the kind plus a
//! rendered message, and first-hop attribution of the enclosing
//! primitive/procedure name. Only the first hop is kept rather than a
//! full call-stack chain, since Logo error messages report only the
//! immediately enclosing caller, not a full traceback.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// The closed set of error kinds a Logo primitive or the evaluator itself
/// can raise. The discriminant is an internal implementation detail,
/// not a stable wire format — only the kind name is part of the contract
/// ( Open Questions, "error code numeric assignments").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, serde::Serialize, serde::Deserialize)]
pub enum LogoErrorKind {
    /// No primitive or procedure with this name exists.
    DontKnowHow,
    /// A primitive was given an input it cannot accept (wrong shape/type).
    DoesntLikeInput,
    /// A condition expression evaluated to something other than `true`/`false`.
    NotBool,
    /// A primitive/procedure call supplied fewer inputs than its minimum arity.
    NotEnoughInputs,
    /// A primitive/procedure call supplied more inputs than its maximum arity
    /// without parenthesized variadic form.
    TooManyInputs,
    /// `first`/`butfirst`/etc. applied to an empty word.
    TooFewItems,
    /// `first`/`butfirst`/etc. applied to an empty list.
    TooFewItemsList,
    /// `throw` with a tag that no enclosing `catch` declares.
    NoCatch,
    /// `catch`/`throw` label lookup failed for an internal reason distinct
    /// from `NoCatch` (reserved for future label-table diagnostics).
    CantFindLabel,
    /// A resource limit (heap, frame-stack, instruction budget) was exceeded.
    OutOfSpace,
    /// The user-break signal was observed at an instruction boundary.
    Stopped,
    /// `stop`/`output` used outside of a procedure body.
    AtToplevel,
    /// A turtle-geometry operation would leave the configured drawing bounds.
    TurtleBounds,
    /// A capability-gated operation was called with no backend installed
    /// for that capability.
    UnsupportedOnDevice,
    /// Execution was cooperatively suspended by a break signal; not a
    /// user-visible error, but carried through the same channel so callers
    /// that only look at `Result::Err` still observe it.
    Pausing,
}

impl LogoErrorKind {
    /// Whether a `catch` with a matching tag (or the `error` tag) can
    /// intercept an error of this kind. Resource-limit and pause signals
    /// are uncatchable: they enforce sandbox limits and must not be
    /// interceptable by user code.
    #[must_use]
    pub fn is_catchable(self) -> bool {
        !matches!(self, Self::OutOfSpace | Self::Pausing)
    }
}

/// One enclosing-context hop recorded the first time an error crosses a
/// primitive or procedure boundary. Only the first hop of each kind is
/// kept — later hops propagating the same error leave it alone ("first
/// raise wins" frame attribution).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ErrorContext {
    pub primitive: Option<String>,
    pub procedure: Option<String>,
}

/// A Logo runtime error: a kind, a rendered message, and first-hop context.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogoError {
    pub kind: LogoErrorKind,
    pub message: String,
    pub context: ErrorContext,
}

impl LogoError {
    #[must_use]
    pub fn new(kind: LogoErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), context: ErrorContext::default() }
    }

    #[must_use]
    pub fn dont_know_how(name: impl fmt::Display) -> Self {
        Self::new(LogoErrorKind::DontKnowHow, format!("I don't know how to {name}"))
    }

    #[must_use]
    pub fn doesnt_like(shown: impl fmt::Display) -> Self {
        Self::new(LogoErrorKind::DoesntLikeInput, format!("doesn't like {shown} as input"))
    }

    #[must_use]
    pub fn not_bool(shown: impl fmt::Display) -> Self {
        Self::new(LogoErrorKind::NotBool, format!("{shown} is not TRUE or FALSE"))
    }

    #[must_use]
    pub fn not_enough_inputs(name: impl fmt::Display) -> Self {
        Self::new(LogoErrorKind::NotEnoughInputs, format!("not enough inputs to {name}"))
    }

    #[must_use]
    pub fn too_many_inputs(name: impl fmt::Display) -> Self {
        Self::new(LogoErrorKind::TooManyInputs, format!("too many inputs to {name}"))
    }

    #[must_use]
    pub fn too_few_items(shown: impl fmt::Display) -> Self {
        Self::new(LogoErrorKind::TooFewItems, format!("{shown} doesn't have enough items"))
    }

    #[must_use]
    pub fn too_few_items_list(shown: impl fmt::Display) -> Self {
        Self::new(LogoErrorKind::TooFewItemsList, format!("{shown} doesn't have enough items"))
    }

    #[must_use]
    pub fn no_catch(tag: impl fmt::Display) -> Self {
        Self::new(LogoErrorKind::NoCatch, format!("Can't find catch tag {tag}"))
    }

    #[must_use]
    pub fn out_of_space() -> Self {
        Self::new(LogoErrorKind::OutOfSpace, "out of space")
    }

    #[must_use]
    pub fn stopped() -> Self {
        Self::new(LogoErrorKind::Stopped, "stopped")
    }

    #[must_use]
    pub fn no_output(name: impl fmt::Display) -> Self {
        Self::new(LogoErrorKind::DoesntLikeInput, format!("{name} did not output"))
    }

    #[must_use]
    pub fn at_toplevel(name: impl fmt::Display) -> Self {
        Self::new(LogoErrorKind::AtToplevel, format!("can't use {name} outside of a procedure"))
    }

    #[must_use]
    pub fn turtle_bounds() -> Self {
        Self::new(LogoErrorKind::TurtleBounds, "turtle out of bounds")
    }

    #[must_use]
    pub fn unsupported_on_device(what: impl fmt::Display) -> Self {
        Self::new(LogoErrorKind::UnsupportedOnDevice, format!("{what} is not supported on this device"))
    }

    #[must_use]
    pub fn pausing() -> Self {
        Self::new(LogoErrorKind::Pausing, "paused")
    }

    /// Records the first enclosing primitive name, if none is recorded yet
    /// (first-hop attribution,/).
    #[must_use]
    pub fn with_primitive(mut self, name: impl Into<String>) -> Self {
        if self.context.primitive.is_none() {
            self.context.primitive = Some(name.into());
        }
        self
    }

    /// Records the first enclosing procedure name, if none is recorded yet.
    #[must_use]
    pub fn with_procedure(mut self, name: impl Into<String>) -> Self {
        if self.context.procedure.is_none() {
            self.context.procedure = Some(name.into());
        }
        self
    }

    #[must_use]
    pub fn is_catchable(&self) -> bool {
        self.kind.is_catchable()
    }
}

impl fmt::Display for LogoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(proc) = &self.context.procedure {
            write!(f, " in {proc}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LogoError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_hop_wins() {
        let err = LogoError::dont_know_how("frobnicate")
            .with_procedure("outer")
            .with_procedure("inner");
        assert_eq!(err.context.procedure.as_deref(), Some("outer"));
    }

    #[test]
    fn resource_limits_are_uncatchable() {
        assert!(!LogoError::out_of_space().is_catchable());
        assert!(!LogoError::pausing().is_catchable());
        assert!(LogoError::dont_know_how("x").is_catchable());
    }
}
