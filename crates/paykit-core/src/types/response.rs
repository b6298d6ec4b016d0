use serde::{Deserialize, Serialize};

use crate::{telemetry::BuyFlowActivityMode, types::JsonObject};

/// Payment data handed back by the hosted surface. Its content is opaque to
/// the client apart from an optional in-band `error` object.
pub type PaymentData = JsonObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsReadyToPayResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_present: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_mode: Option<BuyFlowActivityMode>,
}

impl IsReadyToPayResponse {
    pub fn new(result: bool) -> Self {
        IsReadyToPayResponse {
            result,
            ..Default::default()
        }
    }

    pub fn with_payment_method_present(mut self, present: bool) -> Self {
        self.payment_method_present = Some(present);
        self
    }
}
