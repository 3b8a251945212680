//! Session-level error type: wraps the two ways a line fed to a
//! [`crate::session::Session`] can fail, so callers can distinguish a
//! resource-limit signal from ordinary language failure without string
//! matching.
//!
//! A small enum separating pipeline stages, scoped to this crate's actual
//! sources of failure — there's no separate compile stage here,
//! `LogoError` already folds "doesn't parse as a call" into the same
//! taxonomy as a runtime type error.

use std::fmt;

use crate::{error::LogoError, resource::ResourceError};

/// Error type for session execution.
#[derive(Debug, Clone)]
pub enum SessionError {
    /// A Logo-level error: bad input, unknown primitive, uncaught `throw`,
    /// a lex failure, or any other member of [`crate::error::LogoErrorKind`].
    Logo(LogoError),
    /// A resource limit was exceeded while executing the line.
    Resource(ResourceError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logo(error) => write!(f, "{error}"),
            Self::Resource(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<LogoError> for SessionError {
    fn from(error: LogoError) -> Self {
        Self::Logo(error)
    }
}

impl From<ResourceError> for SessionError {
    fn from(error: ResourceError) -> Self {
        Self::Resource(error)
    }
}
