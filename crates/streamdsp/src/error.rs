//! Error types for the streamdsp pipeline.

pub type Result<T> = std::result::Result<T, DspError>;

/// Errors surfaced by stage and supervisor construction.
///
/// Per the pipeline's real-time contract, `DspError` is only ever produced by
/// `new`/`validate`/`set_sample_rate`-style init paths. `read()` never returns
/// one; a short upstream read surfaces as a short frame count instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DspError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl DspError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unsupported_configuration(msg: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}
