use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{auth_method, payment_method},
    types::{AnyJson, Environment, JsonObject, common::non_empty},
};

/// Parameters of an allowed payment method.
///
/// Card fields are typed, everything else (UPI payee data, tokenization
/// specs, ...) is kept in `extra` and forwarded untouched.
#[derive(Builder, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_auth_methods: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_card_networks: Option<Vec<String>>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: JsonObject,
}

impl PaymentMethodParameters {
    /// A non-empty string parameter from `extra`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra
            .get(key)
            .and_then(AnyJson::as_str)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Builder, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    #[builder(into)]
    pub method_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<PaymentMethodParameters>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: JsonObject,
}

/// An entry of `allowedPaymentMethods`: a bare method name in version 1
/// requests, an object in version 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowedPaymentMethod {
    Legacy(String),
    Method(PaymentMethod),
}

impl AllowedPaymentMethod {
    pub fn method_type(&self) -> &str {
        match self {
            AllowedPaymentMethod::Legacy(name) => name,
            AllowedPaymentMethod::Method(method) => &method.method_type,
        }
    }

    pub fn as_method(&self) -> Option<&PaymentMethod> {
        match self {
            AllowedPaymentMethod::Method(method) => Some(method),
            AllowedPaymentMethod::Legacy(_) => None,
        }
    }
}

impl From<PaymentMethod> for AllowedPaymentMethod {
    fn from(method: PaymentMethod) -> Self {
        AllowedPaymentMethod::Method(method)
    }
}

impl From<&str> for AllowedPaymentMethod {
    fn from(name: &str) -> Self {
        AllowedPaymentMethod::Legacy(name.to_string())
    }
}

#[derive(Builder, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price_status: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_note: Option<String>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: JsonObject,
}

impl TransactionInfo {
    pub fn currency_code(&self) -> Option<&str> {
        non_empty(self.currency_code.as_ref())
    }

    pub fn total_price_status(&self) -> Option<&str> {
        non_empty(self.total_price_status.as_ref())
    }

    pub fn total_price(&self) -> Option<&str> {
        non_empty(self.total_price.as_ref())
    }
}

#[derive(Builder, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantInfo {
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    /// Integrator library name and version, echoed into telemetry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_info: Option<AnyJson>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: JsonObject,
}

/// Subscription purchase parameters.
#[derive(Builder, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwgParameters {
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku_id: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_id: Option<String>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: JsonObject,
}

/// Internal parameters (`i`) shared between the client and the hosted surface.
#[derive(Builder, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalParameters {
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub using_pay_js: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_native: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_container_center: Option<bool>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordination_token: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_party_merchant_identifier: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_key: Option<String>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: JsonObject,
}

impl InternalParameters {
    /// Fills every unset field from `defaults`. Fields already present win.
    pub fn fill_from(&mut self, defaults: &InternalParameters) {
        fn fill<T: Clone>(slot: &mut Option<T>, default: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(default);
            }
        }
        fill(&mut self.google_transaction_id, &defaults.google_transaction_id);
        fill(&mut self.using_pay_js, &defaults.using_pay_js);
        fill(&mut self.start_time_ms, &defaults.start_time_ms);
        fill(&mut self.disable_native, &defaults.disable_native);
        fill(&mut self.render_container_center, &defaults.render_container_center);
        fill(&mut self.coordination_token, &defaults.coordination_token);
        fill(
            &mut self.first_party_merchant_identifier,
            &defaults.first_party_merchant_identifier,
        );
        fill(&mut self.redirect_key, &defaults.redirect_key);
        for (key, value) in &defaults.extra {
            self.extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// Shared view over the two request kinds that carry payment methods.
pub trait PaymentMethodsRequest {
    fn api_version(&self) -> Option<u32>;

    fn allowed_payment_methods(&self) -> Option<&[AllowedPaymentMethod]>;

    fn internal_params(&self) -> Option<&InternalParameters>;

    fn is_v2(&self) -> bool {
        self.api_version().unwrap_or(0) >= 2
    }

    /// First object-form method of the given type.
    fn find_payment_method(&self, method_type: &str) -> Option<&PaymentMethod> {
        self.allowed_payment_methods()?
            .iter()
            .filter_map(AllowedPaymentMethod::as_method)
            .find(|m| m.method_type == method_type)
    }

    /// The UPI method of a version 2 request, if listed.
    fn upi_payment_method(&self) -> Option<&PaymentMethod> {
        if !self.is_v2() {
            return None;
        }
        self.find_payment_method(payment_method::UPI)
    }

    fn card_auth_methods(&self) -> Option<&[String]> {
        self.find_payment_method(payment_method::CARD)?
            .parameters
            .as_ref()?
            .allowed_auth_methods
            .as_deref()
    }

    /// Whether a version 2 request accepts cards with the given auth method.
    fn supports_card_auth_method(&self, auth_method: &str) -> bool {
        self.is_v2()
            && self
                .card_auth_methods()
                .is_some_and(|methods| methods.iter().any(|m| m == auth_method))
    }

    /// Whether the merchant only accepts tokenized cards.
    fn supports_only_tokenized_cards(&self) -> bool {
        if self.is_v2()
            && self
                .card_auth_methods()
                .is_some_and(|m| m.len() == 1 && m[0] == auth_method::CRYPTOGRAM_3DS)
        {
            return true;
        }
        matches!(
            self.allowed_payment_methods(),
            Some([AllowedPaymentMethod::Legacy(name)]) if name == payment_method::TOKENIZED_CARD
        )
    }

    /// `i.disableNative` is set to `true`.
    fn is_native_disabled(&self) -> bool {
        self.internal_params()
            .and_then(|i| i.disable_native)
            .unwrap_or(false)
    }
}

#[derive(Builder, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsReadyToPayRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version_minor: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_payment_methods: Option<Vec<AllowedPaymentMethod>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_payment_method_required: Option<bool>,
    /// Ask the client to report which activity mode it would use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_mode_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_info: Option<MerchantInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i: Option<InternalParameters>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: JsonObject,
}

impl IsReadyToPayRequest {
    pub fn existing_payment_method_required(&self) -> bool {
        self.existing_payment_method_required.unwrap_or(false)
    }
}

impl PaymentMethodsRequest for IsReadyToPayRequest {
    fn api_version(&self) -> Option<u32> {
        self.api_version
    }

    fn allowed_payment_methods(&self) -> Option<&[AllowedPaymentMethod]> {
        self.allowed_payment_methods.as_deref()
    }

    fn internal_params(&self) -> Option<&InternalParameters> {
        self.i.as_ref()
    }
}

#[derive(Builder, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDataRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version_minor: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_info: Option<MerchantInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_payment_methods: Option<Vec<AllowedPaymentMethod>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_info: Option<TransactionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_intents: Option<Vec<String>>,
    /// Present on subscription purchases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swg: Option<SwgParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_redirect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i: Option<InternalParameters>,
    #[serde(flatten)]
    #[builder(default)]
    pub extra: JsonObject,
}

impl PaymentDataRequest {
    pub fn is_subscription(&self) -> bool {
        self.swg.is_some()
    }

    pub fn force_redirect(&self) -> bool {
        self.force_redirect.unwrap_or(false)
    }

    pub fn has_callback_intent(&self, intent: &str) -> bool {
        self.callback_intents
            .as_ref()
            .is_some_and(|intents| intents.iter().any(|i| i == intent))
    }

    pub fn render_container_center(&self) -> bool {
        self.i
            .as_ref()
            .and_then(|i| i.render_container_center)
            .unwrap_or(false)
    }

    /// Internal parameters, created empty if missing.
    pub fn internal_params_mut(&mut self) -> &mut InternalParameters {
        self.i.get_or_insert_with(InternalParameters::default)
    }

    /// Defaults `apiVersion` to 1 unless the request is a subscription.
    pub fn default_api_version(&mut self) {
        if !self.is_subscription() && self.api_version.unwrap_or(0) == 0 {
            self.api_version = Some(1);
        }
    }

    /// Whether two requests describe the same purchase, ignoring `i`.
    pub fn same_purchase_as(&self, other: &PaymentDataRequest) -> bool {
        let strip = |r: &PaymentDataRequest| PaymentDataRequest {
            i: None,
            environment: None,
            ..r.clone()
        };
        strip(self) == strip(other)
    }
}

impl PaymentMethodsRequest for PaymentDataRequest {
    fn api_version(&self) -> Option<u32> {
        self.api_version
    }

    fn allowed_payment_methods(&self) -> Option<&[AllowedPaymentMethod]> {
        self.allowed_payment_methods.as_deref()
    }

    fn internal_params(&self) -> Option<&InternalParameters> {
        self.i.as_ref()
    }
}
