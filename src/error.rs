use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// The caller's filter configuration or signal shape is unusable.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested filter cannot be realised in stable form.
    #[error("Filter design failed: {0}")]
    FilterDesign(String),
}

impl FilterError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        FilterError::InvalidParameter(reason.into())
    }

    pub(crate) fn design(reason: impl Into<String>) -> Self {
        FilterError::FilterDesign(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
