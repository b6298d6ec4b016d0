//! State shared by every client on one page.

use std::sync::{Arc, OnceLock};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use paykit_core::{
    constants::{DEFAULT_CURRENCY, ESTIMATED_TOTAL_LABEL, PAYMENT_METHOD_IDENTIFIER},
    types::{AnyJson, Environment},
};
use parking_lot::Mutex;
use serde_json::json;

use crate::{
    client::PaymentsClientOptions,
    ports::PaymentRequestApi,
    telemetry::{TelemetryChannel, now_ms},
};

/// Page lifetime context: the transaction id, the pay frame channel, the
/// last native readiness answer and the nominal "can make payment" probe.
///
/// The transaction id is assigned once. Later clients reuse it even if they
/// were configured with a different environment.
pub struct PageContext {
    transaction_id: OnceLock<String>,
    origin_time_ms: i64,
    telemetry: Arc<TelemetryChannel>,
    readiness_cache: Mutex<Option<bool>>,
    nominal_probe: Mutex<Option<Shared<BoxFuture<'static, bool>>>>,
    nominal_result: Arc<Mutex<Option<bool>>>,
    init_params: Mutex<Option<PaymentsClientOptions>>,
}

impl Default for PageContext {
    fn default() -> Self {
        PageContext::new()
    }
}

impl PageContext {
    pub fn new() -> Self {
        let origin_time_ms = now_ms();
        let telemetry = TelemetryChannel::new();
        telemetry.set_origin_time_ms(origin_time_ms);
        PageContext {
            transaction_id: OnceLock::new(),
            origin_time_ms,
            telemetry: Arc::new(telemetry),
            readiness_cache: Mutex::new(None),
            nominal_probe: Mutex::new(None),
            nominal_result: Arc::new(Mutex::new(None)),
            init_params: Mutex::new(None),
        }
    }

    /// Options the page declared before any client was created. Explicit
    /// client options are merged over them.
    pub fn with_init_params(self, options: PaymentsClientOptions) -> Self {
        *self.init_params.lock() = Some(options);
        self
    }

    pub fn init_params(&self) -> Option<PaymentsClientOptions> {
        self.init_params.lock().clone()
    }

    pub fn telemetry(&self) -> &Arc<TelemetryChannel> {
        &self.telemetry
    }

    pub fn origin_time_ms(&self) -> i64 {
        self.origin_time_ms
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.get().map(String::as_str)
    }

    /// Returns the page transaction id, creating it with `init` on first use.
    pub fn transaction_id_or_init(&self, init: impl FnOnce() -> String) -> &str {
        self.transaction_id.get_or_init(init)
    }

    pub fn cached_readiness(&self) -> Option<bool> {
        *self.readiness_cache.lock()
    }

    pub fn cache_readiness(&self, result: bool) {
        *self.readiness_cache.lock() = Some(result);
    }

    /// Requests the hidden pay frame using the page init params. The
    /// environment defaults to PRODUCTION here.
    pub fn load_pay_frame(&self, page_origin: &str) {
        let init = self.init_params();
        let environment = init
            .as_ref()
            .and_then(|o| o.environment.as_deref())
            .and_then(|e| e.parse().ok())
            .unwrap_or(Environment::Production);
        let merchant_id = init
            .as_ref()
            .and_then(|o| o.merchant_info.as_ref())
            .and_then(|m| m.merchant_id.clone());
        self.telemetry
            .load(environment, page_origin, merchant_id.as_deref());
    }

    /// Starts the nominal "can make payment" probe once per page.
    ///
    /// A browser without the payment-request API, or one that refuses to
    /// build the nominal request, answers `false`.
    pub fn start_nominal_probe(&self, api: Option<&Arc<dyn PaymentRequestApi>>) {
        let mut slot = self.nominal_probe.lock();
        if slot.is_some() {
            return;
        }
        let probe = match api.map(|api| api.create(nominal_method_data(), nominal_details())) {
            Some(Ok(request)) => request
                .can_make_payment()
                .map(|result| result.unwrap_or(false))
                .boxed(),
            _ => futures::future::ready(false).boxed(),
        };
        let result_slot = self.nominal_result.clone();
        let shared = async move {
            let result = probe.await;
            *result_slot.lock() = Some(result);
            result
        }
        .boxed()
        .shared();
        *slot = Some(shared.clone());
        drop(slot);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(shared);
        }
    }

    /// Resolves with the nominal probe's answer, `false` if it never started.
    pub fn can_make_payment(&self) -> BoxFuture<'static, bool> {
        match self.nominal_probe.lock().clone() {
            Some(probe) => probe.boxed(),
            None => futures::future::ready(false).boxed(),
        }
    }

    /// The nominal probe's answer if it already settled.
    pub fn nominal_result(&self) -> Option<bool> {
        *self.nominal_result.lock()
    }
}

fn nominal_method_data() -> AnyJson {
    json!([{
        "supportedMethods": [PAYMENT_METHOD_IDENTIFIER],
        "data": {
            "apiVersion": 2,
            "apiVersionMinor": 0,
            "allowedPaymentMethods": [{
                "type": "CARD",
                "parameters": {
                    "allowedAuthMethods": ["PAN_ONLY", "CRYPTOGRAM_3DS"],
                    "allowedCardNetworks": ["VISA", "MASTERCARD"],
                },
            }],
        },
    }])
}

fn nominal_details() -> AnyJson {
    json!({
        "total": {
            "label": ESTIMATED_TOTAL_LABEL,
            "amount": { "currency": DEFAULT_CURRENCY, "value": "10" },
        },
    })
}
