//! Protocol constants shared with the hosted payment surface.

use std::time::Duration;

/// Default time a developer callback gets before the flow moves on.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

pub const REQUEST_TIMEOUT_MESSAGE: &str = "REQUEST_TIMEOUT";

pub const OTHER_ERROR_REASON: &str = "OTHER_ERROR";

pub const CALLBACK_DATA_RESPONSE_TYPE: &str = "paymentDataCallbackResponse";

pub const PAYMENT_AUTHORIZATION_RESPONSE_TYPE: &str = "paymentAuthorizationResponse";

/// Payment method identifier understood by the native payment-request API.
pub const PAYMENT_METHOD_IDENTIFIER: &str = "https://google.com/pay";

pub const ESTIMATED_TOTAL_LABEL: &str = "Estimated Total Price";

pub const DEFAULT_CURRENCY: &str = "USD";

/// Request id used for every activity opened towards the hosting page.
pub const ACTIVITY_REQUEST_ID: &str = "GPAY";

pub const POPUP_TARGET: &str = "gp-js-popup";

pub const REDIRECT_TARGET: &str = "_top";

pub const POPUP_WIDTH: u32 = 600;

pub const POPUP_HEIGHT: u32 = 600;

pub const IFRAME_SHOW_UP_DURATION: Duration = Duration::from_millis(250);

pub const IFRAME_CLOSE_DURATION: Duration = Duration::from_millis(250);

/// Height the iframe opens at before the hosted page reports its own.
pub const IFRAME_INITIAL_HEIGHT: &str = "280px";

pub const IFRAME_SMOOTH_HEIGHT_TRANSITION: &str = "height 250ms";

/// Prefix the activity layer puts in front of serialized error payloads.
pub const ERROR_PREFIX: &str = "Error: ";

pub const TRUSTED_DOMAIN_SUFFIX: &str = ".google.com";

pub const REDIRECT_ENCRYPTED_CALLBACK_DATA: &str = "redirectEncryptedCallbackData";

pub const READY_TO_PAY: &str = "READY_TO_PAY";

pub mod payment_method {
    pub const CARD: &str = "CARD";
    pub const TOKENIZED_CARD: &str = "TOKENIZED_CARD";
    pub const UPI: &str = "UPI";

    pub const ALL: [&str; 3] = [CARD, TOKENIZED_CARD, UPI];
}

pub mod auth_method {
    pub const CRYPTOGRAM_3DS: &str = "CRYPTOGRAM_3DS";
    pub const PAN_ONLY: &str = "PAN_ONLY";

    pub const ALL: [&str; 2] = [CRYPTOGRAM_3DS, PAN_ONLY];
}

pub mod total_price_status {
    pub const ESTIMATED: &str = "ESTIMATED";
    pub const FINAL: &str = "FINAL";
    pub const NOT_CURRENTLY_KNOWN: &str = "NOT_CURRENTLY_KNOWN";

    pub const ALL: [&str; 3] = [ESTIMATED, FINAL, NOT_CURRENTLY_KNOWN];
}

pub mod callback_intent {
    pub const PAYMENT_AUTHORIZATION: &str = "PAYMENT_AUTHORIZATION";
    pub const SHIPPING_ADDRESS: &str = "SHIPPING_ADDRESS";
    pub const SHIPPING_OPTION: &str = "SHIPPING_OPTION";
    pub const OFFER: &str = "OFFER";
    pub const PAYMENT_METHOD: &str = "PAYMENT_METHOD";
    pub const UNKNOWN_INTENT: &str = "UNKNOWN_INTENT";

    /// Intents that require an `onPaymentDataChanged` handler.
    pub const PAYMENT_DATA_CHANGED: [&str; 2] = [SHIPPING_ADDRESS, SHIPPING_OPTION];
}

/// `type` tags of messages sent by the hosted surface over an activity port.
pub mod message_type {
    pub const PARTIAL_PAYMENT_DATA_CALLBACK: &str = "partialPaymentDataCallback";
    pub const FULL_PAYMENT_DATA_CALLBACK: &str = "fullPaymentDataCallback";
    pub const RESIZE: &str = "resize";
}

/// Response keys of pay frame round trips.
pub mod frame_response {
    pub const IS_READY_TO_PAY_RESPONSE: &str = "isReadyToPayResponse";
    pub const IS_READY_TO_PAY_ERROR: &str = "isReadyToPayError";
    pub const CAN_MAKE_PAYMENT_FOR_PAYMENT_HANDLER_RESPONSE: &str =
        "canMakePaymentForPaymentHandlerResponse";
}
