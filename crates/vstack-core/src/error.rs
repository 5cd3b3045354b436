#![forbid(unsafe_code)]

//! Error taxonomy.
//!
//! Only configuration problems surface as `Err`. Geometry problems degrade to
//! a hidden menu with bounded retries, and [`HostError`]s raised during
//! cleanup are logged and swallowed.

use thiserror::Error;

use crate::event::ElementId;

pub type Result<T> = std::result::Result<T, StackError>;

/// Fatal configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("a dynamic container is already attached to this stack context")]
    DuplicateContainer,

    #[error("the document has no overlay container element")]
    MissingContainer,

    #[error("no dynamic container is attached; attach a DynamicContainer before pushing overlays")]
    MissingDynamicContainer,

    #[error("invalid setting `{field}`: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

impl StackError {
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field,
            reason: reason.into(),
        }
    }
}

/// Failures of document mutations performed through the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("element {0:?} is no longer attached to the document")]
    ElementDetached(ElementId),

    #[error("host rejected the operation: {0}")]
    Rejected(String),
}
