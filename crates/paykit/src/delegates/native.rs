use std::{sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture};
use paykit_core::{
    constants::{
        DEFAULT_CURRENCY, DEFAULT_REQUEST_TIMEOUT, ESTIMATED_TOTAL_LABEL, PAYMENT_METHOD_IDENTIFIER,
        payment_method,
    },
    errors::{StatusCode, StatusError},
    types::{
        AnyJson, Environment, IsReadyToPayRequest, IsReadyToPayResponse, JsonObject,
        PaymentDataRequest, PaymentMethodsRequest,
    },
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;

use super::{FlowId, PaymentResult, PaymentsClientDelegate, ResultHandler, spawn};
use crate::{
    callbacks::{CallbackOrchestrator, PaymentDataCallbacks, ResponseShape},
    errors::PaymentError,
    page::PageContext,
    ports::{NativeError, NativePaymentRequest, PaymentRequestApi},
    telemetry::is_truthy,
};

/// Serves buy flows through the browser payment-request API.
pub struct PaymentRequestDelegate {
    environment: Environment,
    api: Option<Arc<dyn PaymentRequestApi>>,
    page: Arc<PageContext>,
    timeout: Duration,
    callbacks: Mutex<Option<PaymentDataCallbacks>>,
    handler: Mutex<Option<ResultHandler>>,
}

impl PaymentRequestDelegate {
    pub fn new(
        environment: Environment,
        api: Option<Arc<dyn PaymentRequestApi>>,
        page: Arc<PageContext>,
    ) -> Self {
        PaymentRequestDelegate {
            environment,
            api,
            page,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            callbacks: Mutex::new(None),
            handler: Mutex::new(None),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the native request around a copy of the merchant request.
    ///
    /// The total is required by the API but never displayed, so it falls
    /// back to `0 USD`.
    fn create_payment_request<R: Serialize>(
        &self,
        request: &R,
        environment: Option<Environment>,
        currency_code: Option<&str>,
        total_price: Option<&str>,
    ) -> Result<Arc<dyn NativePaymentRequest>, NativeError> {
        let api = self
            .api
            .as_ref()
            .ok_or_else(|| NativeError("PaymentRequest is not available".to_string()))?;

        let mut data = match serde_json::to_value(request) {
            Ok(AnyJson::Object(map)) => map,
            _ => JsonObject::new(),
        };
        if !data.get("apiVersion").is_some_and(is_truthy) {
            data.insert("apiVersion".to_string(), json!(1));
        }
        if data.get("swg").is_some_and(is_truthy) {
            data.insert(
                "allowedPaymentMethods".to_string(),
                json!([payment_method::CARD]),
            );
        }
        if environment == Some(Environment::Test) {
            data.insert("environment".to_string(), json!(Environment::Test));
        }

        let method_data = json!([{
            "supportedMethods": [PAYMENT_METHOD_IDENTIFIER],
            "data": data,
        }]);
        let details = json!({
            "total": {
                "label": ESTIMATED_TOTAL_LABEL,
                "amount": {
                    "currency": currency_code.unwrap_or(DEFAULT_CURRENCY),
                    "value": total_price.unwrap_or("0"),
                },
            },
        });
        api.create(method_data, details)
    }

    fn orchestrator(&self) -> CallbackOrchestrator {
        CallbackOrchestrator::new(
            self.callbacks.lock().clone().unwrap_or_default(),
            self.timeout,
            self.page.telemetry().clone(),
        )
    }

    fn deliver(handler: Option<ResultHandler>, flow: FlowId, result: PaymentResult) {
        match handler {
            Some(handler) => handler(Some(flow), result),
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Dropping payment result: no result handler registered");
            }
        }
    }
}

impl PaymentsClientDelegate for PaymentRequestDelegate {
    fn is_ready_to_pay(
        &self,
        request: IsReadyToPayRequest,
    ) -> BoxFuture<'static, Result<IsReadyToPayResponse, PaymentError>> {
        let native = self.create_payment_request(&request, None, None, None);
        let page = self.page.clone();
        let wants_presence = request.is_v2() && request.existing_payment_method_required();
        async move {
            let probe = native.map(|native| {
                if native.supports_has_enrolled_instrument() {
                    native.has_enrolled_instrument()
                } else {
                    native.can_make_payment()
                }
            });
            let outcome = match probe {
                Ok(probe) => probe.await,
                Err(error) => Err(error),
            };
            match outcome {
                Ok(result) => {
                    page.cache_readiness(result);
                    let response = IsReadyToPayResponse::new(result);
                    Ok(if wants_presence {
                        response.with_payment_method_present(result)
                    } else {
                        response
                    })
                }
                Err(_error) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(error = %_error, "Native readiness probe failed, using cached answer");
                    Ok(IsReadyToPayResponse::new(
                        page.cached_readiness().unwrap_or(false),
                    ))
                }
            }
        }
        .boxed()
    }

    fn prefetch_payment_data(&self, request: PaymentDataRequest) {
        // Building the request is enough to warm up the payment app.
        let transaction = request.transaction_info.as_ref();
        let _ = self.create_payment_request(
            &request,
            Some(self.environment),
            transaction.and_then(|t| t.currency_code()),
            transaction.and_then(|t| t.total_price()),
        );
    }

    fn load_payment_data(
        &self,
        flow: FlowId,
        request: PaymentDataRequest,
    ) -> Result<(), PaymentError> {
        let transaction = request.transaction_info.as_ref();
        let native = self
            .create_payment_request(
                &request,
                Some(self.environment),
                transaction.and_then(|t| t.currency_code()),
                transaction.and_then(|t| t.total_price()),
            )
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let orchestrator = self.orchestrator();
        native.on_payment_method_change(Arc::new(move |details| {
            orchestrator.dispatch_method_change(details, ResponseShape::PaymentHandler)
        }));

        let handler = self.handler.lock().clone();
        spawn(async move {
            let result = match native.show().await {
                Ok(response) => {
                    response.complete();
                    let details = response.details();
                    if details.get("statusCode").is_some_and(is_truthy) {
                        let mut wrapped = JsonObject::new();
                        wrapped.insert("error".to_string(), AnyJson::Object(details));
                        Ok(wrapped)
                    } else {
                        Ok(details)
                    }
                }
                Err(error) => Err(PaymentError::Status(StatusError::new(
                    StatusCode::Canceled,
                    error.to_string(),
                ))),
            };
            Self::deliver(handler, flow, result);
        })?;
        Ok(())
    }

    fn register_payment_data_callbacks(&self, callbacks: PaymentDataCallbacks) {
        *self.callbacks.lock() = Some(callbacks);
    }

    fn on_result(&self, handler: ResultHandler) {
        *self.handler.lock() = Some(handler);
    }
}
