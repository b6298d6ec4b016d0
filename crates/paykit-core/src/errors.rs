use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Error types for paykit core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// JSON serialization/deserialization errors.
    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Endpoint construction errors.
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Client options rejected by validation.
    #[error("{0}")]
    InvalidOptions(String),
}

/// A specialized `Result` type for paykit core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Status codes surfaced to merchants when a flow fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatusCode {
    DeveloperError,
    Canceled,
    InternalError,
    BuyerAccountError,
    MerchantAccountError,
    UnsupportedApiVersion,
    /// Any code outside the known set, kept verbatim.
    Other(String),
}

impl StatusCode {
    pub fn as_str(&self) -> &str {
        match self {
            StatusCode::DeveloperError => "DEVELOPER_ERROR",
            StatusCode::Canceled => "CANCELED",
            StatusCode::InternalError => "INTERNAL_ERROR",
            StatusCode::BuyerAccountError => "BUYER_ACCOUNT_ERROR",
            StatusCode::MerchantAccountError => "MERCHANT_ACCOUNT_ERROR",
            StatusCode::UnsupportedApiVersion => "UNSUPPORTED_API_VERSION",
            StatusCode::Other(code) => code,
        }
    }

    /// Codes the hosted surface may report back verbatim. Everything else
    /// coming out of a failed activity is reported as [`StatusCode::Canceled`].
    pub fn passes_through_activity(&self) -> bool {
        matches!(
            self,
            StatusCode::DeveloperError | StatusCode::MerchantAccountError
        )
    }
}

impl From<&str> for StatusCode {
    fn from(value: &str) -> Self {
        match value {
            "DEVELOPER_ERROR" => StatusCode::DeveloperError,
            "CANCELED" => StatusCode::Canceled,
            "INTERNAL_ERROR" => StatusCode::InternalError,
            "BUYER_ACCOUNT_ERROR" => StatusCode::BuyerAccountError,
            "MERCHANT_ACCOUNT_ERROR" => StatusCode::MerchantAccountError,
            "UNSUPPORTED_API_VERSION" => StatusCode::UnsupportedApiVersion,
            other => StatusCode::Other(other.to_string()),
        }
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StatusCode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(StatusCode::from(s.as_str()))
    }
}

/// The `{statusCode, statusMessage}` object a failed call rejects with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{status_code}: {}", .status_message.as_deref().unwrap_or("no message"))]
pub struct StatusError {
    pub status_code: StatusCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl StatusError {
    pub fn new(status_code: StatusCode, status_message: impl Into<String>) -> Self {
        StatusError {
            status_code,
            status_message: Some(status_message.into()),
        }
    }

    pub fn developer_error(message: impl Into<String>) -> Self {
        StatusError::new(StatusCode::DeveloperError, message)
    }

    pub fn canceled() -> Self {
        StatusError {
            status_code: StatusCode::Canceled,
            status_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_status_code_round_trips_unknown_codes() {
        let code: StatusCode = serde_json::from_value(json!("SOMETHING_NEW")).unwrap();
        assert_eq!(code, StatusCode::Other("SOMETHING_NEW".to_string()));
        assert_eq!(serde_json::to_value(&code).unwrap(), json!("SOMETHING_NEW"));
    }

    #[test]
    fn test_status_error_wire_shape() {
        let err = StatusError::developer_error("transactionInfo must be set!");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({
                "statusCode": "DEVELOPER_ERROR",
                "statusMessage": "transactionInfo must be set!"
            })
        );
        assert_eq!(
            serde_json::to_value(StatusError::canceled()).unwrap(),
            json!({ "statusCode": "CANCELED" })
        );
    }

    #[test]
    fn test_only_developer_and_merchant_errors_pass_through() {
        assert!(StatusCode::DeveloperError.passes_through_activity());
        assert!(StatusCode::MerchantAccountError.passes_through_activity());
        assert!(!StatusCode::InternalError.passes_through_activity());
        assert!(!StatusCode::Other("BUYER_ACCOUNT_ERROR_X".into()).passes_through_activity());
    }
}
