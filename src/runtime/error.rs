//! Setup-time error types.

use crate::models::ModelKind;
use std::error::Error;
use std::fmt::{self, Display};

///
/// A registry lookup failed: no constructor is registered under the
/// requested name.
///
#[derive(Debug, Clone)]
pub struct CreationError {
    kind: ModelKind,
    name: String,
}

impl CreationError {
    pub(crate) fn unknown(kind: ModelKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
        }
    }

    /// Returns the kind of model the lookup failed for.
    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Returns the name that was looked up.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for CreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no {} registered under the name '{}'",
            self.kind, self.name
        )
    }
}

impl Error for CreationError {}

///
/// A node behavior rejected the simulation configuration in
/// [`check_requirements`](crate::node::Node::check_requirements).
///
#[derive(Debug, Clone)]
pub struct RequirementError {
    reason: String,
}

impl RequirementError {
    /// Creates the error with a human-readable reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Display for RequirementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node requirements not met: {}", self.reason)
    }
}

impl Error for RequirementError {}

///
/// Any error that can abort simulation setup.
///
#[derive(Debug)]
pub enum RuntimeError {
    /// A registry lookup failed.
    Creation(CreationError),
    /// A node rejected the configuration.
    Requirement(RequirementError),
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creation(e) => Display::fmt(e, f),
            Self::Requirement(e) => Display::fmt(e, f),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Creation(e) => Some(e),
            Self::Requirement(e) => Some(e),
        }
    }
}

impl From<CreationError> for RuntimeError {
    fn from(e: CreationError) -> Self {
        Self::Creation(e)
    }
}

impl From<RequirementError> for RuntimeError {
    fn from(e: RequirementError) -> Self {
        Self::Requirement(e)
    }
}
