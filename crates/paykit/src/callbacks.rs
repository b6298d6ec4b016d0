//! Developer callbacks invoked while the buyer is still in the flow.
//!
//! A handler races against the configured timeout. Whichever settles first
//! decides the response; the loser keeps running and its result is dropped.

use std::{future::Future, sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture};
use paykit_core::{
    constants::{
        CALLBACK_DATA_RESPONSE_TYPE, OTHER_ERROR_REASON, PAYMENT_AUTHORIZATION_RESPONSE_TYPE,
        PAYMENT_METHOD_IDENTIFIER, REQUEST_TIMEOUT_MESSAGE, callback_intent,
    },
    telemetry::{MerchantCallbackTrigger, PostMessageEventType},
    types::{
        AnyJson, CallbackError, IntermediatePaymentData, JsonObject, PaymentData,
        RegisteredCallbacks,
    },
};
use serde::Serialize;
use serde_json::json;

use crate::telemetry::{EventRecord, MerchantCallbackInfo, TelemetryChannel};

type CallbackFuture = BoxFuture<'static, Result<AnyJson, CallbackError>>;

pub type PaymentAuthorizedHandler = Arc<dyn Fn(PaymentData) -> CallbackFuture + Send + Sync>;

pub type PaymentDataChangedHandler =
    Arc<dyn Fn(IntermediatePaymentData) -> CallbackFuture + Send + Sync>;

/// Handlers registered through `paymentDataCallbacks`.
///
/// Handlers may return any serializable value, usually a
/// [`PaymentAuthorizationResult`](paykit_core::types::PaymentAuthorizationResult)
/// or a [`PaymentDataRequestUpdate`](paykit_core::types::PaymentDataRequestUpdate).
#[derive(Clone, Default)]
pub struct PaymentDataCallbacks {
    on_payment_authorized: Option<PaymentAuthorizedHandler>,
    on_payment_data_changed: Option<PaymentDataChangedHandler>,
}

impl std::fmt::Debug for PaymentDataCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentDataCallbacks")
            .field("on_payment_authorized", &self.on_payment_authorized.is_some())
            .field(
                "on_payment_data_changed",
                &self.on_payment_data_changed.is_some(),
            )
            .finish()
    }
}

impl PaymentDataCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_payment_authorized<F, Fut, T>(mut self, handler: F) -> Self
    where
        F: Fn(PaymentData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CallbackError>> + Send + 'static,
        T: Serialize,
    {
        self.on_payment_authorized = Some(Arc::new(move |data| to_json(handler(data))));
        self
    }

    pub fn on_payment_data_changed<F, Fut, T>(mut self, handler: F) -> Self
    where
        F: Fn(IntermediatePaymentData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CallbackError>> + Send + 'static,
        T: Serialize,
    {
        self.on_payment_data_changed = Some(Arc::new(move |data| to_json(handler(data))));
        self
    }

    pub fn registered(&self) -> RegisteredCallbacks {
        RegisteredCallbacks {
            on_payment_authorized: self.on_payment_authorized.is_some(),
            on_payment_data_changed: self.on_payment_data_changed.is_some(),
        }
    }
}

fn to_json<Fut, T>(future: Fut) -> CallbackFuture
where
    Fut: Future<Output = Result<T, CallbackError>> + Send + 'static,
    T: Serialize,
{
    async move {
        let value = future.await?;
        serde_json::to_value(value).map_err(|e| CallbackError {
            message: Some(e.to_string()),
            ..Default::default()
        })
    }
    .boxed()
}

/// Wire shape of a callback response, picked by the transport consuming it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{type, data}` posted back over an activity port.
    WebActivity,
    /// A payment details update handed to the native payment request.
    PaymentHandler,
}

impl ResponseShape {
    pub fn shape(&self, response_type: &str, data: AnyJson) -> AnyJson {
        match self {
            ResponseShape::WebActivity => json!({ "type": response_type, "data": data }),
            ResponseShape::PaymentHandler => {
                let mut data = data;
                // Older hosted pages reject an explicit null error.
                if let Some(object) = data.as_object_mut() {
                    if object.get("error").is_some_and(AnyJson::is_null) {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Please remove null fields in callback returns.");
                        object.remove("error");
                    }
                }
                json!({
                    "modifiers": [{
                        "supportedMethods": [PAYMENT_METHOD_IDENTIFIER],
                        "data": data,
                    }]
                })
            }
        }
    }
}

enum Outcome {
    Settled(AnyJson),
    Rejected(CallbackError),
    TimedOut(CallbackError),
}

/// Runs developer callbacks for one client.
#[derive(Clone)]
pub struct CallbackOrchestrator {
    callbacks: PaymentDataCallbacks,
    timeout: Duration,
    telemetry: Arc<TelemetryChannel>,
}

impl CallbackOrchestrator {
    pub fn new(
        callbacks: PaymentDataCallbacks,
        timeout: Duration,
        telemetry: Arc<TelemetryChannel>,
    ) -> Self {
        CallbackOrchestrator {
            callbacks,
            timeout,
            telemetry,
        }
    }

    pub fn callbacks(&self) -> &PaymentDataCallbacks {
        &self.callbacks
    }

    /// Calls `onPaymentAuthorized` and shapes its answer.
    pub fn full(&self, data: PaymentData, shape: ResponseShape) -> BoxFuture<'static, AnyJson> {
        let handler = self
            .callbacks
            .on_payment_authorized
            .as_ref()
            .map(|handler| handler(data));
        let race = self.race(handler, callback_intent::PAYMENT_AUTHORIZATION);
        let telemetry = self.telemetry.clone();
        async move {
            let data = match race.await {
                Outcome::Settled(value) => value,
                outcome => failure(
                    outcome,
                    &telemetry,
                    PostMessageEventType::LogOnPaymentAuthorizedDeveloperTimeout,
                    MerchantCallbackTrigger::PaymentAuthorization,
                    callback_intent::PAYMENT_AUTHORIZATION,
                ),
            };
            shape.shape(PAYMENT_AUTHORIZATION_RESPONSE_TYPE, data)
        }
        .boxed()
    }

    /// Calls `onPaymentDataChanged` and shapes its answer.
    pub fn partial(
        &self,
        data: IntermediatePaymentData,
        shape: ResponseShape,
    ) -> BoxFuture<'static, AnyJson> {
        let trigger = MerchantCallbackTrigger::from_trigger(data.callback_trigger.as_deref());
        let default_intent = data
            .callback_trigger
            .clone()
            .unwrap_or_else(|| callback_intent::UNKNOWN_INTENT.to_string());
        let timeout_intent = data.timeout_intent();
        let handler = self
            .callbacks
            .on_payment_data_changed
            .as_ref()
            .map(|handler| handler(data));
        let race = self.race(handler, timeout_intent);
        let telemetry = self.telemetry.clone();
        async move {
            let data = match race.await {
                Outcome::Settled(value) => value,
                outcome => failure(
                    outcome,
                    &telemetry,
                    PostMessageEventType::LogOnPaymentDataChangedDeveloperTimeout,
                    trigger,
                    &default_intent,
                ),
            };
            shape.shape(CALLBACK_DATA_RESPONSE_TYPE, data)
        }
        .boxed()
    }

    /// Routes a native payment method change: messages carrying a
    /// `callbackTrigger` are partial updates, the rest authorize the payment.
    pub fn dispatch_method_change(
        &self,
        details: JsonObject,
        shape: ResponseShape,
    ) -> BoxFuture<'static, AnyJson> {
        let has_trigger = details
            .get("callbackTrigger")
            .and_then(AnyJson::as_str)
            .is_some_and(|t| !t.is_empty());
        if !has_trigger {
            return self.full(details, shape);
        }
        match serde_json::from_value::<IntermediatePaymentData>(AnyJson::Object(details)) {
            Ok(data) => self.partial(data, shape),
            Err(_) => self.partial(IntermediatePaymentData::default(), shape),
        }
    }

    fn race(
        &self,
        handler: Option<CallbackFuture>,
        timeout_intent: &'static str,
    ) -> BoxFuture<'static, Outcome> {
        let timeout = self.timeout;
        async move {
            let Some(handler) = handler else {
                return Outcome::Rejected(CallbackError::default());
            };
            let task = tokio::spawn(handler);
            tokio::select! {
                biased;
                joined = task => match joined {
                    Ok(Ok(value)) => Outcome::Settled(value),
                    Ok(Err(error)) => Outcome::Rejected(error),
                    Err(join_error) => Outcome::Rejected(CallbackError {
                        message: Some(join_error.to_string()),
                        ..Default::default()
                    }),
                },
                _ = tokio::time::sleep(timeout) => Outcome::TimedOut(CallbackError {
                    reason: Some(OTHER_ERROR_REASON.to_string()),
                    intent: Some(timeout_intent.to_string()),
                    message: Some(REQUEST_TIMEOUT_MESSAGE.to_string()),
                }),
            }
        }
        .boxed()
    }
}

fn failure(
    outcome: Outcome,
    telemetry: &TelemetryChannel,
    timeout_event: PostMessageEventType,
    trigger: MerchantCallbackTrigger,
    default_intent: &str,
) -> AnyJson {
    #[cfg(feature = "tracing")]
    tracing::error!(
        "DEVELOPER_ERROR in loadPaymentData: An error occurred in call back, please try to \
         avoid this by setting structured error in callback response"
    );
    let error = match outcome {
        Outcome::TimedOut(error) => {
            telemetry.post_record(
                EventRecord::builder()
                    .event_type(timeout_event)
                    .merchant_callback_info(MerchantCallbackInfo {
                        callback_trigger: trigger,
                    })
                    .build(),
            );
            error
        }
        Outcome::Rejected(error) => error,
        Outcome::Settled(value) => return value,
    };
    json!({ "error": error.into_payment_data_error(default_intent) })
}
