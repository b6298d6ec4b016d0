//! Merchant facing clients.
//!
//! [`PaymentsAsyncClient`] reports load results through a handler passed at
//! construction. [`PaymentsClient`] wraps it into one future per call.

mod async_client;
mod facade;

use std::time::Duration;

use bon::Builder;
use paykit_core::{
    constants::DEFAULT_REQUEST_TIMEOUT,
    toggles::FeatureToggles,
    types::{Environment, InternalParameters, MerchantInfo},
    validator::validate_environment,
};

use crate::callbacks::PaymentDataCallbacks;

pub use async_client::PaymentsAsyncClient;
pub use facade::{PaymentsClient, PendingPayment};

/// Options a client is created with.
#[derive(Builder, Debug, Clone)]
pub struct PaymentsClientOptions {
    /// `TEST` when unset. See [`validate_environment`].
    #[builder(into)]
    pub environment: Option<String>,
    pub merchant_info: Option<MerchantInfo>,
    /// Internal parameters applied to every request of the client.
    pub i: Option<InternalParameters>,
    pub payment_data_callbacks: Option<PaymentDataCallbacks>,
    /// Time a developer callback gets before the flow moves on.
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub callback_timeout: Duration,
    #[builder(default)]
    pub toggles: FeatureToggles,
}

impl Default for PaymentsClientOptions {
    fn default() -> Self {
        PaymentsClientOptions::builder().build()
    }
}

impl PaymentsClientOptions {
    /// Fills unset fields from the page init params.
    pub fn merged_over(mut self, init: Option<PaymentsClientOptions>) -> Self {
        let Some(init) = init else {
            return self;
        };
        self.environment = self.environment.or(init.environment);
        self.merchant_info = self.merchant_info.or(init.merchant_info);
        self.i = self.i.or(init.i);
        self.payment_data_callbacks = self.payment_data_callbacks.or(init.payment_data_callbacks);
        self
    }

    /// Checks the options and resolves the environment.
    pub fn validate(&self) -> paykit_core::errors::Result<Environment> {
        validate_environment(self.environment.as_deref())
    }

    pub(crate) fn merchant_id(&self) -> Option<&str> {
        self.merchant_info
            .as_ref()
            .and_then(|m| m.merchant_id.as_deref())
    }

    pub(crate) fn redirect_key(&self) -> Option<String> {
        self.i.as_ref().and_then(|i| i.redirect_key.clone())
    }
}
