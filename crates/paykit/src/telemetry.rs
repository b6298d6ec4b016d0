//! The pay frame channel: buffered, fire-and-forget event records plus
//! request/response round trips over the same frame.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use bon::Builder;
use paykit_core::{
    constants::frame_response,
    telemetry::{
        BuyFlowActivityMode, BuyFlowActivityReason, BuyFlowMode, MerchantCallbackTrigger,
        PostMessageEventType, PublicErrorCode,
    },
    types::{AnyJson, ButtonInfo, Environment, IsReadyToPayRequest, IsReadyToPayResponse, JsonObject},
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::ports::EventSink;

/// Current time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantCallbackInfo {
    pub callback_trigger: MerchantCallbackTrigger,
}

/// One logging record. Unset fields are left out of the posted message.
#[derive(Builder, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_type: PostMessageEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_latency_start_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_flow_activity_reason: Option<Vec<BuyFlowActivityReason>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PublicErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_info: Option<AnyJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_info: Option<ButtonInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_flow_mode: Option<BuyFlowMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ready_to_pay_api_response: Option<IsReadyToPayResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ready_to_pay_request: Option<IsReadyToPayRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_callback_info: Option<MerchantCallbackInfo>,
}

impl EventRecord {
    pub fn into_message(self) -> JsonObject {
        match serde_json::to_value(self) {
            Ok(AnyJson::Object(map)) => map,
            _ => JsonObject::new(),
        }
    }
}

struct Waiter {
    response_types: Vec<String>,
    handler: Box<dyn FnOnce(JsonObject) + Send>,
}

struct ChannelState {
    sink: Option<Arc<dyn EventSink>>,
    buffer: Vec<JsonObject>,
    mode: Option<BuyFlowActivityMode>,
    transaction_id: Option<String>,
    origin_time_ms: i64,
    waiters: Vec<Waiter>,
    frame_url: Option<String>,
}

/// Channel to the hidden pay frame.
///
/// Messages posted before [`TelemetryChannel::attach`] are buffered and
/// flushed in order once the frame is up. Every message is wrapped in the
/// `{buyFlowActivityMode, googleTransactionId, originTimeMs}` envelope at the
/// time it is actually posted.
pub struct TelemetryChannel {
    state: Mutex<ChannelState>,
    payment_handler_available: Arc<AtomicBool>,
    debug_logging: AtomicBool,
}

impl Default for TelemetryChannel {
    fn default() -> Self {
        TelemetryChannel::new()
    }
}

impl TelemetryChannel {
    pub fn new() -> Self {
        TelemetryChannel {
            state: Mutex::new(ChannelState {
                sink: None,
                buffer: Vec::new(),
                mode: None,
                transaction_id: None,
                origin_time_ms: now_ms(),
                waiters: Vec::new(),
                frame_url: None,
            }),
            payment_handler_available: Arc::new(AtomicBool::new(false)),
            debug_logging: AtomicBool::new(false),
        }
    }

    pub fn set_debug_logging(&self, enabled: bool) {
        self.debug_logging.store(enabled, Ordering::Relaxed);
    }

    pub fn set_buy_flow_activity_mode(&self, mode: BuyFlowActivityMode) {
        self.state.lock().mode = Some(mode);
    }

    pub fn buy_flow_activity_mode(&self) -> Option<BuyFlowActivityMode> {
        self.state.lock().mode
    }

    pub fn set_transaction_id(&self, transaction_id: impl Into<String>) {
        self.state.lock().transaction_id = Some(transaction_id.into());
    }

    pub fn set_origin_time_ms(&self, origin_time_ms: i64) {
        self.state.lock().origin_time_ms = origin_time_ms;
    }

    /// URL the embedder should load the hidden frame from, once requested.
    pub fn frame_url(&self) -> Option<String> {
        self.state.lock().frame_url.clone()
    }

    /// Whether the pay frame reported that a payment handler can be used.
    pub fn can_make_payment_for_payment_handler(&self) -> bool {
        self.payment_handler_available.load(Ordering::Relaxed)
    }

    pub fn buffered(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Requests the pay frame. Only the first call has an effect.
    pub fn load(&self, environment: Environment, page_origin: &str, merchant_id: Option<&str>) {
        {
            let mut state = self.state.lock();
            if state.frame_url.is_some() {
                return;
            }
            state.frame_url = Some(environment.payframe_url(page_origin, merchant_id));
        }
        self.post_record(
            EventRecord::builder()
                .event_type(PostMessageEventType::LogPayFrameRequested)
                .client_latency_start_ms(now_ms())
                .build(),
        );

        let available = self.payment_handler_available.clone();
        let key = frame_response::CAN_MAKE_PAYMENT_FOR_PAYMENT_HANDLER_RESPONSE;
        self.register_waiter(
            &[key],
            Box::new(move |response| {
                let value = response.get(key).is_some_and(is_truthy);
                available.store(value, Ordering::Relaxed);
            }),
        );
        self.post(message_with_type(
            PostMessageEventType::CanMakePaymentForPaymentHandler,
            JsonObject::new(),
        ));
    }

    /// The frame finished loading: logs the load and flushes the buffer.
    pub fn attach(&self, sink: Arc<dyn EventSink>) {
        let pending = {
            let mut state = self.state.lock();
            for event_type in [
                PostMessageEventType::LogPayFrameLoadedWithAllJs,
                PostMessageEventType::LogPayFrameLoaded,
            ] {
                state.buffer.push(
                    EventRecord::builder()
                        .event_type(event_type)
                        .client_latency_start_ms(now_ms())
                        .build()
                        .into_message(),
                );
            }
            state.sink = Some(sink.clone());
            std::mem::take(&mut state.buffer)
                .into_iter()
                .map(|message| envelope(&state, message))
                .collect::<Vec<_>>()
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(count = pending.len(), "Flushing buffered pay frame messages");
        for message in pending {
            sink.post_message(message);
        }
    }

    pub fn post_record(&self, record: EventRecord) {
        self.post(record.into_message());
    }

    /// Posts a raw message, or buffers it while the frame is not attached.
    pub fn post(&self, message: JsonObject) {
        #[cfg(feature = "tracing")]
        if self.debug_logging.load(Ordering::Relaxed) {
            tracing::debug!(message = %AnyJson::Object(message.clone()), "Pay frame message");
        }
        let target = {
            let mut state = self.state.lock();
            match state.sink.clone() {
                None => {
                    state.buffer.push(message);
                    None
                }
                Some(sink) => Some((sink, envelope(&state, message))),
            }
        };
        if let Some((sink, message)) = target {
            sink.post_message(message);
        }
    }

    /// Posts `{eventType, ...data}` and resolves with the first frame
    /// message carrying a truthy value under one of `response_types`.
    pub fn send_and_wait(
        &self,
        event_type: PostMessageEventType,
        data: JsonObject,
        response_types: &[&str],
    ) -> oneshot::Receiver<JsonObject> {
        let (tx, rx) = oneshot::channel();
        self.register_waiter(
            response_types,
            Box::new(move |response| {
                let _ = tx.send(response);
            }),
        );
        self.post(message_with_type(event_type, data));
        rx
    }

    /// Hands a message received from the pay frame to the first matching
    /// waiter. Returns whether one matched.
    pub fn deliver(&self, message: &JsonObject) -> bool {
        let waiter = {
            let mut state = self.state.lock();
            let position = state.waiters.iter().position(|w| {
                w.response_types
                    .iter()
                    .any(|key| message.get(key).is_some_and(is_truthy))
            });
            position.map(|index| state.waiters.remove(index))
        };
        match waiter {
            Some(waiter) => {
                (waiter.handler)(message.clone());
                true
            }
            None => false,
        }
    }

    fn register_waiter(&self, response_types: &[&str], handler: Box<dyn FnOnce(JsonObject) + Send>) {
        self.state.lock().waiters.push(Waiter {
            response_types: response_types.iter().map(|s| s.to_string()).collect(),
            handler,
        });
    }
}

fn message_with_type(event_type: PostMessageEventType, data: JsonObject) -> JsonObject {
    let mut message = JsonObject::new();
    message.insert("eventType".to_string(), serde_json::json!(event_type));
    for (key, value) in data {
        message.insert(key, value);
    }
    message
}

fn envelope(state: &ChannelState, message: JsonObject) -> JsonObject {
    let mut wrapped = JsonObject::new();
    wrapped.insert(
        "buyFlowActivityMode".to_string(),
        serde_json::json!(state.mode),
    );
    wrapped.insert(
        "googleTransactionId".to_string(),
        serde_json::json!(state.transaction_id),
    );
    wrapped.insert(
        "originTimeMs".to_string(),
        serde_json::json!(state.origin_time_ms),
    );
    for (key, value) in message {
        wrapped.insert(key, value);
    }
    wrapped
}

/// JavaScript truthiness of a JSON value.
pub(crate) fn is_truthy(value: &AnyJson) -> bool {
    match value {
        AnyJson::Null => false,
        AnyJson::Bool(b) => *b,
        AnyJson::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        AnyJson::String(s) => !s.is_empty(),
        AnyJson::Array(_) | AnyJson::Object(_) => true,
    }
}
