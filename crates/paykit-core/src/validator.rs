//! Request and option validation.
//!
//! Every function reports the first rule a request breaks. Rule order is
//! fixed because merchants match on the messages.

use crate::{
    constants::{
        TRUSTED_DOMAIN_SUFFIX, auth_method, callback_intent, payment_method, total_price_status,
    },
    errors::Error,
    toggles::FeatureToggles,
    types::{
        AllowedPaymentMethod, Environment, IsReadyToPayRequest, PaymentDataRequest,
        PaymentMethodsRequest, RegisteredCallbacks, SwgParameters,
    },
};

/// A rule violation, carrying the message shown to the developer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        ValidationError(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

pub type ValidationResult = Result<(), ValidationError>;

/// Parses the client `environment` option, defaulting to TEST.
pub fn validate_environment(environment: Option<&str>) -> crate::errors::Result<Environment> {
    match environment.filter(|e| !e.is_empty()) {
        None => Ok(Environment::Test),
        Some(value) => value.parse().map_err(|_| {
            Error::InvalidOptions(
                "Parameter environment in PaymentsClientOptions can optionally be set to \
                 PRODUCTION, otherwise it defaults to TEST."
                    .to_string(),
            )
        }),
    }
}

/// `is_secure_context` is `None` when the browser cannot tell, which passes.
pub fn validate_secure_context(
    hostname: &str,
    is_secure_context: Option<bool>,
    local_bypass: bool,
) -> ValidationResult {
    if local_bypass && hostname.ends_with(TRUSTED_DOMAIN_SUFFIX) {
        return Ok(());
    }
    match is_secure_context {
        Some(false) => Err(ValidationError::new(
            "Google Pay APIs should be called in secure context!",
        )),
        _ => Ok(()),
    }
}

pub fn validate_is_ready_to_pay_request(
    request: &IsReadyToPayRequest,
    toggles: &FeatureToggles,
) -> ValidationResult {
    if !toggles.upi_validation && request.upi_payment_method().is_some() {
        return Err(ValidationError::new("UPI not supported"));
    }
    if request.is_v2() {
        if request.api_version_minor.is_none() {
            return Err(ValidationError::new("apiVersionMinor must be set!"));
        }
        let methods = match request.allowed_payment_methods.as_deref() {
            Some(methods) if !methods.is_empty() => methods,
            _ => {
                return Err(ValidationError::new(
                    "for v2 allowedPaymentMethods must be set to an array containing a list of \
                     accepted payment methods",
                ));
            }
        };
        for method in methods {
            if method.method_type() != payment_method::CARD {
                continue;
            }
            let Some(parameters) = method.as_method().and_then(|m| m.parameters.as_ref()) else {
                return Err(ValidationError::new(
                    "Field parameters must be setup in each allowedPaymentMethod",
                ));
            };
            if parameters
                .allowed_card_networks
                .as_ref()
                .is_none_or(Vec::is_empty)
            {
                return Err(ValidationError::new(
                    "allowedCardNetworks must be setup in parameters for type CARD",
                ));
            }
            let auth_methods_valid = parameters.allowed_auth_methods.as_ref().is_some_and(|m| {
                !m.is_empty() && m.iter().all(|a| auth_method::ALL.contains(&a.as_str()))
            });
            if !auth_methods_valid {
                return Err(ValidationError::new(
                    "allowedAuthMethods must be setup in parameters for type 'CARD'  and must \
                     contain 'CRYPTOGRAM_3DS' and/or 'PAN_ONLY'",
                ));
            }
        }
        return Ok(());
    }
    let v1_valid = request
        .allowed_payment_methods
        .as_deref()
        .is_some_and(|methods| {
            !methods.is_empty()
                && methods.iter().all(|m| {
                    matches!(m, AllowedPaymentMethod::Legacy(name)
                        if payment_method::ALL.contains(&name.as_str()))
                })
        });
    if !v1_valid {
        return Err(ValidationError::new(
            "allowedPaymentMethods must be set to an array containing 'CARD' and/or \
             'TOKENIZED_CARD'!",
        ));
    }
    Ok(())
}

pub fn validate_payment_data_request(
    request: &PaymentDataRequest,
    toggles: &FeatureToggles,
) -> ValidationResult {
    if !toggles.upi_validation && request.upi_payment_method().is_some() {
        return Err(ValidationError::new("UPI not supported"));
    }
    if let Some(swg) = &request.swg {
        return validate_swg_parameters(Some(swg));
    }
    let Some(info) = &request.transaction_info else {
        return Err(ValidationError::new("transactionInfo must be set!"));
    };
    if info.currency_code().is_none() {
        return Err(ValidationError::new(
            "currencyCode in transactionInfo must be set!",
        ));
    }
    let status = match info.total_price_status() {
        Some(status) if total_price_status::ALL.contains(&status) => status,
        _ => {
            return Err(ValidationError::new(
                "totalPriceStatus in transactionInfo must be set to one of NOT_CURRENTLY_KNOWN, \
                 ESTIMATED or FINAL!",
            ));
        }
    };
    if status != total_price_status::NOT_CURRENTLY_KNOWN && info.total_price().is_none() {
        return Err(ValidationError::new(
            "totalPrice in transactionInfo must be set when totalPriceStatus is ESTIMATED or \
             FINAL!",
        ));
    }

    if let Some(upi) = request.upi_payment_method() {
        let Some(parameters) = &upi.parameters else {
            return Err(ValidationError::new(
                "parameters must be set in allowedPaymentMethod!",
            ));
        };
        for key in [
            "payeeVpa",
            "payeeName",
            "referenceUrl",
            "mcc",
            "transactionReferenceId",
        ] {
            if parameters.get_str(key).is_none() {
                return Err(ValidationError(format!(
                    "{key} in allowedPaymentMethod parameters must be set!"
                )));
            }
        }
        if info.currency_code() != Some("INR") {
            return Err(ValidationError::new(
                "currencyCode in transactionInfo must be set to INR!",
            ));
        }
        if status != total_price_status::FINAL {
            return Err(ValidationError::new(
                "totalPriceStatus in transactionInfo must be set to FINAL!",
            ));
        }
        if info
            .transaction_note
            .as_deref()
            .is_none_or(str::is_empty)
        {
            return Err(ValidationError::new(
                "transactionNote in transactionInfo must be set!",
            ));
        }
    }
    Ok(())
}

pub fn validate_swg_parameters(swg: Option<&SwgParameters>) -> ValidationResult {
    let Some(swg) = swg else {
        return Err(ValidationError::new("Swg parameters must be provided"));
    };
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
    if !present(&swg.sku_id) || !present(&swg.publication_id) {
        return Err(ValidationError::new(
            "Both skuId and publicationId must be provided",
        ));
    }
    Ok(())
}

/// Checks that the declared callback intents match the registered handlers.
pub fn validate_callback_parameters(
    request: &PaymentDataRequest,
    callbacks: Option<RegisteredCallbacks>,
    toggles: &FeatureToggles,
) -> ValidationResult {
    if request.callback_intents.is_some() && callbacks.is_none() {
        return Err(ValidationError::new("paymentDataCallbacks must be set"));
    }
    let callbacks = callbacks.unwrap_or_default();
    if request.has_callback_intent(callback_intent::PAYMENT_AUTHORIZATION)
        != callbacks.on_payment_authorized
    {
        return Err(ValidationError::new(
            "Both PAYMENT_AUTHORIZATION intent and onPaymentAuthorized must be set",
        ));
    }
    let mut supported = callback_intent::PAYMENT_DATA_CHANGED.to_vec();
    if toggles.offer_callback_intent {
        supported.push(callback_intent::OFFER);
    }
    if toggles.payment_method_callback_intent {
        supported.push(callback_intent::PAYMENT_METHOD);
    }
    let wants_data_changed = supported
        .iter()
        .any(|intent| request.has_callback_intent(intent));
    if wants_data_changed != callbacks.on_payment_data_changed {
        return Err(ValidationError(format!(
            "onPaymentDataChanged callback must be set if any of {} callback intent is set.",
            supported.join(",")
        )));
    }
    Ok(())
}
