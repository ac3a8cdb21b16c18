use thiserror::Error;

/// Failure conditions raised by the analytics engine.
///
/// None of these are fatal to a caller: argument and computation errors are
/// recovered at the call boundary (clamping, `share_or_zero`,
/// `percent_change_or_none`) and load failures are recovered by the loader
/// substituting the fallback dataset.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("division undefined: {0} is zero")]
    DivisionUndefined(&'static str),

    #[error("failed loading {resource}: {reason}")]
    DataLoadFailure { resource: String, reason: String },
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn load(resource: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::DataLoadFailure {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
