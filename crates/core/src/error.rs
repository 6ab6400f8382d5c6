use thiserror::Error;

/// Failure taxonomy for one assist request.
///
/// `Validation` is client-correctable (HTTP 400). `Configuration` and
/// `Upstream` are server faults (HTTP 500); the underlying upstream cause
/// is logged server-side and never echoed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssistError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Upstream(String),
}

impl AssistError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
