pub use paykit_core::errors::{StatusCode, StatusError};

/// Why a payment flow or readiness check failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// A `{statusCode, statusMessage}` failure, as merchants receive it.
    #[error(transparent)]
    Status(#[from] StatusError),
    /// The result came over a channel that is not origin verified and secure.
    #[error("channel mismatch")]
    ChannelMismatch,
    /// Exchanging an encrypted redirect payload failed.
    #[error("redirect decryption failed: {0}")]
    Redirect(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl PaymentError {
    pub fn developer_error(message: impl Into<String>) -> Self {
        PaymentError::Status(StatusError::developer_error(message))
    }

    pub fn canceled() -> Self {
        PaymentError::Status(StatusError::canceled())
    }

    pub fn status_code(&self) -> Option<&StatusCode> {
        match self {
            PaymentError::Status(error) => Some(&error.status_code),
            _ => None,
        }
    }
}

/// Errors a client call reports synchronously.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("This method can only be called one at a time.")]
    LoadInProgress,
    #[error(transparent)]
    Options(#[from] paykit_core::errors::Error),
}
