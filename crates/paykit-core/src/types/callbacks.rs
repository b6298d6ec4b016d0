use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{OTHER_ERROR_REASON, callback_intent},
    types::{AnyJson, JsonObject, TransactionInfo},
};

/// Data the hosted surface sends when the buyer changes something mid-flow.
#[derive(Builder, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntermediatePaymentData {
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_trigger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<AnyJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_option_data: Option<AnyJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_data: Option<AnyJson>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: JsonObject,
}

impl IntermediatePaymentData {
    /// Intent reported when a partial callback times out.
    pub fn timeout_intent(&self) -> &'static str {
        match self.callback_trigger.as_deref() {
            Some(callback_intent::PAYMENT_AUTHORIZATION) => callback_intent::PAYMENT_AUTHORIZATION,
            Some(callback_intent::SHIPPING_ADDRESS) => callback_intent::SHIPPING_ADDRESS,
            Some(callback_intent::SHIPPING_OPTION) => callback_intent::SHIPPING_OPTION,
            _ => callback_intent::UNKNOWN_INTENT,
        }
    }
}

/// Error object returned to the hosted surface from a callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDataError {
    pub reason: String,
    pub intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// What a developer callback rejects with. Every field is optional; missing
/// ones are filled in when the error is forwarded.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("callback rejected: {}", .message.as_deref().unwrap_or("no message"))]
pub struct CallbackError {
    #[builder(into)]
    pub reason: Option<String>,
    #[builder(into)]
    pub intent: Option<String>,
    #[builder(into)]
    pub message: Option<String>,
}

impl CallbackError {
    /// Completes the error with `OTHER_ERROR` and the given intent.
    pub fn into_payment_data_error(self, default_intent: &str) -> PaymentDataError {
        PaymentDataError {
            reason: self.reason.unwrap_or_else(|| OTHER_ERROR_REASON.to_string()),
            intent: self.intent.unwrap_or_else(|| default_intent.to_string()),
            message: self.message,
        }
    }
}

/// Returned from `onPaymentDataChanged`.
#[derive(Builder, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDataRequestUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_transaction_info: Option<TransactionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_shipping_option_parameters: Option<AnyJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PaymentDataError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    Success,
    Error,
}

/// Returned from `onPaymentAuthorized`.
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAuthorizationResult {
    pub transaction_state: TransactionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PaymentDataError>,
}

/// Which developer callbacks are registered on a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisteredCallbacks {
    pub on_payment_authorized: bool,
    pub on_payment_data_changed: bool,
}
