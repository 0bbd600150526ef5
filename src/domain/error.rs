use thiserror::Error;

/// Raised when renderer configuration, localization strings or render input
/// fail validation. Always fatal; callers are expected to fix the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid `{field}`: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    pub fn empty(field: &'static str) -> Self {
        Self::new(field, "must not be empty")
    }

    pub fn missing(field: &'static str) -> Self {
        Self::new(field, "must be provided")
    }
}
