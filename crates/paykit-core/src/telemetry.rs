//! Numeric tags understood by the pay frame logging endpoint.
//!
//! Every enum here serializes as its integer code.

use serde::{Deserialize, Serialize};

use crate::errors::StatusCode;

macro_rules! serialize_as_code {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Serialize for $ty {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    serializer.serialize_u8(*self as u8)
                }
            }
        )*
    };
}

serialize_as_code!(
    PostMessageEventType,
    BuyFlowActivityMode,
    BuyFlowActivityReason,
    BuyFlowMode,
    MerchantCallbackTrigger,
    PublicErrorCode,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PostMessageEventType {
    LogIsReadyToPayApi = 0,
    LogLoadPaymentDataApi = 1,
    LogRenderButton = 2,
    LogButtonClick = 5,
    IsReadyToPay = 6,
    LogInitializePaymentsClient = 9,
    CanMakePaymentForPaymentHandler = 11,
    LogIsReadyToPayCalled = 12,
    LogPayFrameRequested = 15,
    LogPayFrameLoaded = 16,
    LogPayFrameLoadedWithAllJs = 17,
    LogOnPaymentDataChangedDeveloperTimeout = 26,
    LogOnPaymentAuthorizedDeveloperTimeout = 27,
}

/// Transport a buy flow runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BuyFlowActivityMode {
    #[default]
    Unknown = 0,
    Iframe = 1,
    Popup = 2,
    Redirect = 3,
    AndroidNative = 4,
    PaymentHandler = 5,
}

impl BuyFlowActivityMode {
    /// Whether the mode is served by the platform payment-request API.
    pub fn is_native(&self) -> bool {
        matches!(
            self,
            BuyFlowActivityMode::AndroidNative | BuyFlowActivityMode::PaymentHandler
        )
    }
}

impl TryFrom<u8> for BuyFlowActivityMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BuyFlowActivityMode::Unknown),
            1 => Ok(BuyFlowActivityMode::Iframe),
            2 => Ok(BuyFlowActivityMode::Popup),
            3 => Ok(BuyFlowActivityMode::Redirect),
            4 => Ok(BuyFlowActivityMode::AndroidNative),
            5 => Ok(BuyFlowActivityMode::PaymentHandler),
            other => Err(other),
        }
    }
}

impl<'de> Deserialize<'de> for BuyFlowActivityMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = u8::deserialize(deserializer)?;
        BuyFlowActivityMode::try_from(v).map_err(|v| {
            serde::de::Error::custom(format!("Unknown buy flow activity mode: {v}"))
        })
    }
}

/// Why a given [`BuyFlowActivityMode`] was picked.
///
/// Codes below 33 are request based, the rest come from the user agent or
/// client configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BuyFlowActivityReason {
    Unknown = 0,
    Callbacks = 1,
    UpiMethod = 2,
    NativeDisabled = 3,
    PhNoResponse = 4,
    PhSwg = 5,
    V1OnlyTokenized = 6,
    V1 = 7,
    V2ThreeDs = 8,
    V2PanOnly = 9,
    NoLaunchPh = 33,
    NonAndroidOrNoPr = 34,
    BrowserNoPr = 35,
    ChromeNoPh = 36,
    Mobile = 37,
    UseIframe = 38,
    NoLaunchPhDu = 39,
    PayjsCanMakePaymentFalse = 40,
    NoPr = 41,
    ClankDuDisabled = 42,
    UseClankDuIfSupported = 96,
    ChromePhDuReady = 97,
    ChromePhReady = 98,
    FallThrough = 99,
}

/// Presentation of the buy flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BuyFlowMode {
    #[default]
    PayWithGoogle = 5,
    SubscribeWithGoogle = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MerchantCallbackTrigger {
    UnknownTrigger = 0,
    Initialize = 1,
    PaymentAuthorization = 2,
    ShippingAddress = 3,
    ShippingOption = 4,
    Offer = 5,
}

impl MerchantCallbackTrigger {
    /// Maps the `callbackTrigger` of a mid-flow request, falling back to
    /// [`MerchantCallbackTrigger::UnknownTrigger`].
    pub fn from_trigger(trigger: Option<&str>) -> Self {
        match trigger {
            Some("INITIALIZE") => MerchantCallbackTrigger::Initialize,
            Some("PAYMENT_AUTHORIZATION") => MerchantCallbackTrigger::PaymentAuthorization,
            Some("SHIPPING_ADDRESS") => MerchantCallbackTrigger::ShippingAddress,
            Some("SHIPPING_OPTION") => MerchantCallbackTrigger::ShippingOption,
            Some("OFFER") => MerchantCallbackTrigger::Offer,
            _ => MerchantCallbackTrigger::UnknownTrigger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PublicErrorCode {
    UnknownErrorType = 0,
    InternalError = 1,
    DeveloperError = 2,
    BuyerAccountError = 3,
    MerchantAccountError = 4,
    UnsupportedApiVersion = 5,
    BuyerCancel = 6,
}

impl PublicErrorCode {
    pub fn from_status(status: &StatusCode) -> Self {
        match status {
            StatusCode::InternalError => PublicErrorCode::InternalError,
            StatusCode::DeveloperError => PublicErrorCode::DeveloperError,
            StatusCode::BuyerAccountError => PublicErrorCode::BuyerAccountError,
            StatusCode::MerchantAccountError => PublicErrorCode::MerchantAccountError,
            StatusCode::UnsupportedApiVersion => PublicErrorCode::UnsupportedApiVersion,
            StatusCode::Other(code) if code == "BUYER_CANCEL" => PublicErrorCode::BuyerCancel,
            _ => PublicErrorCode::UnknownErrorType,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_codes_serialize_as_integers() {
        let value = serde_json::to_value(vec![
            BuyFlowActivityReason::Mobile,
            BuyFlowActivityReason::FallThrough,
        ])
        .unwrap();
        assert_eq!(value, json!([37, 99]));
        assert_eq!(
            serde_json::to_value(PostMessageEventType::LogOnPaymentAuthorizedDeveloperTimeout)
                .unwrap(),
            json!(27)
        );
    }

    #[test]
    fn test_unmapped_status_falls_back_to_unknown() {
        assert_eq!(
            PublicErrorCode::from_status(&StatusCode::Other("NOPE".into())),
            PublicErrorCode::UnknownErrorType
        );
        assert_eq!(
            PublicErrorCode::from_status(&StatusCode::Canceled),
            PublicErrorCode::UnknownErrorType
        );
        assert_eq!(
            PublicErrorCode::from_status(&StatusCode::MerchantAccountError),
            PublicErrorCode::MerchantAccountError
        );
    }

    #[test]
    fn test_callback_trigger_lookup() {
        assert_eq!(
            MerchantCallbackTrigger::from_trigger(Some("SHIPPING_OPTION")),
            MerchantCallbackTrigger::ShippingOption
        );
        assert_eq!(
            MerchantCallbackTrigger::from_trigger(Some("SOMETHING_ELSE")),
            MerchantCallbackTrigger::UnknownTrigger
        );
        assert_eq!(
            MerchantCallbackTrigger::from_trigger(None),
            MerchantCallbackTrigger::UnknownTrigger
        );
    }
}
