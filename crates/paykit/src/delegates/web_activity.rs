use std::{
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures::{FutureExt, future::BoxFuture};
use paykit_core::{
    constants::{
        ACTIVITY_REQUEST_ID, DEFAULT_REQUEST_TIMEOUT, ERROR_PREFIX, IFRAME_CLOSE_DURATION,
        IFRAME_INITIAL_HEIGHT, IFRAME_SHOW_UP_DURATION, IFRAME_SMOOTH_HEIGHT_TRANSITION,
        POPUP_HEIGHT, POPUP_TARGET, POPUP_WIDTH, READY_TO_PAY, REDIRECT_ENCRYPTED_CALLBACK_DATA,
        REDIRECT_TARGET, frame_response, message_type,
    },
    errors::{StatusCode, StatusError},
    telemetry::{BuyFlowActivityMode, PostMessageEventType},
    toggles::FeatureToggles,
    types::{
        AnyJson, Environment, IntermediatePaymentData, IsReadyToPayRequest,
        IsReadyToPayResponse, JsonObject, PaymentData, PaymentDataRequest, PaymentMethodsRequest,
    },
};
use parking_lot::Mutex;
use tokio::{sync::oneshot, task::JoinHandle, time::Instant};
use url::Url;

use super::{FlowId, PaymentResult, PaymentsClientDelegate, ResultHandler, spawn};
use crate::{
    callbacks::{CallbackOrchestrator, PaymentDataCallbacks, ResponseShape},
    decrypt::RedirectDecryptor,
    errors::PaymentError,
    platform::{BrowserEnvironment, Platform},
    ports::{
        ActivityOpenOptions, ActivityPort, ActivityPorts, ActivityResult, OverlayFrame,
        OverlayHost, PortError,
    },
    telemetry::{TelemetryChannel, is_truthy, now_ms},
};

/// Browsers whose embedded views cannot host the popup flow.
const POPUP_BLOCKED_TOKENS: [&str; 4] = ["FxiOS", "Instagram", "FB_IAB", "AndroidMapsWebView"];

const SUPPORTED_BROWSER_TOKENS: [&str; 3] = ["Chrome", "Firefox", "Safari"];

/// Serves buy flows through the hosted page: in a popup, a full page
/// redirect or an iframe on the merchant page.
#[derive(Clone)]
pub struct WebActivityDelegate {
    inner: Arc<Inner>,
}

struct Inner {
    environment: Environment,
    use_iframe: bool,
    redirect_key: Option<String>,
    browser: BrowserEnvironment,
    activities: Arc<dyn ActivityPorts>,
    overlay: Arc<dyn OverlayHost>,
    decryptor: Option<Arc<dyn RedirectDecryptor>>,
    telemetry: Arc<TelemetryChannel>,
    toggles: FeatureToggles,
    timeout: Mutex<Duration>,
    callbacks: Mutex<Option<PaymentDataCallbacks>>,
    handler: Mutex<Option<ResultHandler>>,
    prefetched: Mutex<Option<Prefetched>>,
    /// The frame of the latest iframe load.
    active: Mutex<Option<Arc<FrameSession>>>,
    /// The load the open popup or redirect answers. Windows share one
    /// target, so only the latest can still report.
    window_flow: Mutex<Option<FlowId>>,
}

/// An iframe opened ahead of `load_payment_data`.
struct Prefetched {
    session: Arc<FrameSession>,
    request: PaymentDataRequest,
    task: JoinHandle<PaymentResult>,
}

#[derive(Default)]
struct ResizeState {
    enabled: bool,
    saved: Option<(String, String)>,
    live_since: Option<Instant>,
}

/// One injected checkout frame and the port connected to it.
struct FrameSession {
    frame: Arc<dyn OverlayFrame>,
    port: Mutex<Option<Arc<dyn ActivityPort>>>,
    /// Set once the flow produced data or was dismissed. The first wins.
    settled: AtomicBool,
    /// Set once the frame is shown and a history entry pushed for it.
    shown: AtomicBool,
    dismiss: Mutex<Option<oneshot::Sender<()>>>,
    resize: Mutex<ResizeState>,
}

impl WebActivityDelegate {
    pub fn new(
        environment: Environment,
        platform: &Platform,
        use_iframe: bool,
        redirect_key: Option<String>,
        toggles: FeatureToggles,
    ) -> Self {
        WebActivityDelegate {
            inner: Arc::new(Inner {
                environment,
                use_iframe,
                redirect_key: redirect_key.filter(|k| !k.is_empty()),
                browser: platform.browser.clone(),
                activities: platform.activities.clone(),
                overlay: platform.overlay.clone(),
                decryptor: platform.redirect_decryptor(),
                telemetry: platform.page.telemetry().clone(),
                toggles,
                timeout: Mutex::new(DEFAULT_REQUEST_TIMEOUT),
                callbacks: Mutex::new(None),
                handler: Mutex::new(None),
                prefetched: Mutex::new(None),
                active: Mutex::new(None),
                window_flow: Mutex::new(None),
            }),
        }
    }

    pub fn with_request_timeout(self, timeout: Duration) -> Self {
        *self.inner.timeout.lock() = timeout;
        self
    }

    pub fn uses_iframe(&self) -> bool {
        self.inner.use_iframe
    }
}

impl Inner {
    fn orchestrator(&self) -> CallbackOrchestrator {
        CallbackOrchestrator::new(
            self.callbacks.lock().clone().unwrap_or_default(),
            *self.timeout.lock(),
            self.telemetry.clone(),
        )
    }

    fn has_callbacks(&self) -> bool {
        self.callbacks.lock().is_some()
    }

    fn deliver(&self, flow: Option<FlowId>, result: PaymentResult) {
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => handler(flow, result),
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Dropping payment result: no result handler registered");
            }
        }
    }

    /// Applies the defaults every hosted flow expects.
    fn prepare(&self, request: &mut PaymentDataRequest) {
        request.default_api_version();
        request.environment = Some(self.environment);
        let i = request.internal_params_mut();
        if i.start_time_ms.is_none() {
            i.start_time_ms = Some(now_ms());
        }
    }

    fn open_options(request: &PaymentDataRequest) -> ActivityOpenOptions {
        ActivityOpenOptions::builder()
            .width(POPUP_WIDTH)
            .height(POPUP_HEIGHT)
            .disable_redirect_fallback(!request.force_redirect() && !request.is_subscription())
            .build()
    }

    fn is_ready_to_pay(
        &self,
        mut request: IsReadyToPayRequest,
    ) -> BoxFuture<'static, Result<IsReadyToPayResponse, PaymentError>> {
        if request.supports_only_tokenized_cards() {
            return futures::future::ready(Ok(IsReadyToPayResponse::new(false))).boxed();
        }
        let browser = &self.browser;
        let ios_gsa =
            browser.user_agent_mentions("GSA/") && browser.user_agent_mentions("Safari");
        let ios_opa =
            browser.user_agent_mentions("OPA/") && browser.user_agent_mentions("AppleWebKit");
        let blocked = ios_gsa
            || ios_opa
            || POPUP_BLOCKED_TOKENS
                .iter()
                .any(|token| browser.user_agent_mentions(token));
        if blocked && !self.use_iframe {
            return futures::future::ready(Ok(IsReadyToPayResponse::new(false))).boxed();
        }

        let mut additional_browser = false;
        if self.toggles.additional_browser_support {
            if browser.user_agent_mentions("UCMini") {
                return futures::future::ready(Ok(IsReadyToPayResponse::new(false))).boxed();
            }
            additional_browser =
                browser.user_agent_mentions("OPT") || browser.user_agent_mentions("UCBrowser");
        }
        let supported = SUPPORTED_BROWSER_TOKENS
            .iter()
            .any(|token| browser.user_agent_mentions(token))
            || additional_browser
            || ios_opa;

        if !(supported && request.is_v2() && request.existing_payment_method_required()) {
            return futures::future::ready(Ok(IsReadyToPayResponse::new(supported))).boxed();
        }

        request.environment = Some(self.environment);
        let data = match serde_json::to_value(&request) {
            Ok(AnyJson::Object(map)) => map,
            _ => JsonObject::new(),
        };
        let response = self.telemetry.send_and_wait(
            PostMessageEventType::IsReadyToPay,
            data,
            &[
                frame_response::IS_READY_TO_PAY_RESPONSE,
                frame_response::IS_READY_TO_PAY_ERROR,
            ],
        );
        async move {
            let message = response
                .await
                .map_err(|e| PaymentError::Transport(e.to_string()))?;
            if let Some(error) = message
                .get(frame_response::IS_READY_TO_PAY_ERROR)
                .filter(|e| is_truthy(e))
            {
                let cause = match error {
                    AnyJson::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return Err(PaymentError::developer_error(format!(
                    "Ready to pay error. Cause : {cause}"
                )));
            }
            let present = message
                .get(frame_response::IS_READY_TO_PAY_RESPONSE)
                .and_then(AnyJson::as_str)
                == Some(READY_TO_PAY);
            Ok(IsReadyToPayResponse::new(supported).with_payment_method_present(present))
        }
        .boxed()
    }

    fn inject_frame(self: &Arc<Self>, request: &PaymentDataRequest) -> Arc<FrameSession> {
        let frame = self.overlay.inject_iframe(request.render_container_center());
        let weak_frame = Arc::downgrade(&frame);
        let overlay = self.overlay.clone();
        frame.on_container_click(Arc::new(move || {
            if weak_frame.upgrade().is_some_and(|f| f.is_attached()) {
                overlay.history_back();
            }
        }));
        frame.set_visible(false);
        frame.set_height("0px");
        frame.set_transition(&close_transition(IFRAME_SHOW_UP_DURATION));
        Arc::new(FrameSession {
            frame,
            port: Mutex::new(None),
            settled: AtomicBool::new(false),
            shown: AtomicBool::new(false),
            dismiss: Mutex::new(None),
            resize: Mutex::new(ResizeState::default()),
        })
    }

    /// Connects `session` to the hosted page and resolves with its result.
    fn open_iframe(
        self: &Arc<Self>,
        session: Arc<FrameSession>,
        mut request: PaymentDataRequest,
    ) -> BoxFuture<'static, PaymentResult> {
        self.prepare(&mut request);
        let coordination_token = request
            .i
            .as_ref()
            .and_then(|i| i.coordination_token.clone())
            .unwrap_or_default();
        let url = self
            .environment
            .iframe_url(&self.browser.location_origin, &coordination_token);
        let args = serde_json::to_value(&request).unwrap_or(AnyJson::Null);
        let opening = self
            .activities
            .open_iframe(session.frame.clone(), &url, args);
        let inner = self.clone();
        async move {
            let port = match opening.await {
                Ok(port) => port,
                Err(error) => {
                    inner.settle_frame(&session);
                    return Err(normalize_activity_error(&error));
                }
            };
            *session.port.lock() = Some(port.clone());
            port.on_message(inner.relay(Arc::downgrade(&port), Some(Arc::downgrade(&session))));

            let accepted = port.accept_result().await;
            inner.settle_frame(&session);
            match accepted {
                Ok(result) => inner.gate_result(result).await,
                Err(error) => Err(normalize_activity_error(&error)),
            }
        }
        .boxed()
    }

    fn show_with_animation(&self, session: &Arc<FrameSession>, center: bool) {
        session.frame.set_visible(true);
        let session = session.clone();
        let _ = spawn(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            if session.settled.load(Ordering::SeqCst) {
                return;
            }
            session.frame.set_height(IFRAME_INITIAL_HEIGHT);
            if center {
                session.frame.activate_center();
            }
            tokio::time::sleep(IFRAME_SHOW_UP_DURATION).await;
            let mut resize = session.resize.lock();
            resize.enabled = true;
            if let Some((height, transition)) = resize.saved.take() {
                session.frame.set_transition(&transition);
                session.frame.set_height(&height);
            }
        });
    }

    /// Tears the frame down once the flow ended on its own. No-op after a
    /// dismissal.
    fn settle_frame(&self, session: &Arc<FrameSession>) {
        if session.settled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.remove_frame(session);
        // Pops the entry pushed when the frame was shown.
        if session.shown.load(Ordering::SeqCst) {
            self.overlay.history_back();
        }
    }

    fn remove_frame(&self, session: &Arc<FrameSession>) {
        session
            .frame
            .set_transition(&close_transition(IFRAME_CLOSE_DURATION));
        session.frame.set_height("0px");
        let frame = session.frame.clone();
        let _ = spawn(async move {
            tokio::time::sleep(IFRAME_CLOSE_DURATION).await;
            if frame.is_attached() {
                frame.detach();
            }
        });
    }

    /// Ends a frame whose load was superseded. Returns whether its history
    /// entry is still on the stack.
    fn abandon(&self, session: &Arc<FrameSession>) -> bool {
        if session.settled.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(dismiss) = session.dismiss.lock().take() {
            let _ = dismiss.send(());
        }
        self.remove_frame(session);
        if let Some(port) = session.port.lock().as_ref() {
            port.disconnect();
        }
        session.shown.load(Ordering::SeqCst)
    }

    /// Back button or container click while the frame is up.
    fn dismiss(&self, session: &Arc<FrameSession>) {
        if !session.frame.is_attached() || session.settled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(dismiss) = session.dismiss.lock().take() {
            let _ = dismiss.send(());
        }
        self.remove_frame(session);
        if let Some(port) = session.port.lock().as_ref() {
            port.disconnect();
        }
    }

    /// Listener for messages the hosted page sends over `port`.
    fn relay(
        self: &Arc<Self>,
        port: Weak<dyn ActivityPort>,
        session: Option<Weak<FrameSession>>,
    ) -> Arc<dyn Fn(JsonObject) + Send + Sync> {
        let orchestrator = self.orchestrator();
        Arc::new(move |payload: JsonObject| {
            let kind = payload.get("type").and_then(AnyJson::as_str).unwrap_or_default();
            let data = payload.get("data").cloned().unwrap_or(AnyJson::Null);
            let response = match kind {
                message_type::PARTIAL_PAYMENT_DATA_CALLBACK => {
                    let data: IntermediatePaymentData =
                        serde_json::from_value(data).unwrap_or_default();
                    orchestrator.partial(data, ResponseShape::WebActivity)
                }
                message_type::FULL_PAYMENT_DATA_CALLBACK => {
                    let data: PaymentData = match data {
                        AnyJson::Object(map) => map,
                        _ => JsonObject::new(),
                    };
                    orchestrator.full(data, ResponseShape::WebActivity)
                }
                message_type::RESIZE => {
                    if let Some(session) = session.as_ref().and_then(Weak::upgrade) {
                        session.handle_resize(&payload);
                    }
                    return;
                }
                _ => return,
            };
            let port = port.clone();
            let _ = spawn(async move {
                let response = response.await;
                if let Some(port) = port.upgrade() {
                    port.message(response);
                }
            });
        })
    }

    /// Checks where a result came from and decrypts redirect payloads.
    fn gate_result(self: &Arc<Self>, result: ActivityResult) -> BoxFuture<'static, PaymentResult> {
        let inner = self.clone();
        async move {
            if inner.environment != Environment::Tin
                && result.origin != inner.environment.origin()
            {
                return Err(PaymentError::ChannelMismatch);
            }
            let data = match result.data {
                AnyJson::Object(map) => map,
                _ => JsonObject::new(),
            };
            let encrypted = data
                .get(REDIRECT_ENCRYPTED_CALLBACK_DATA)
                .filter(|v| is_truthy(v))
                .cloned();
            if let Some(encrypted) = encrypted {
                inner
                    .telemetry
                    .set_buy_flow_activity_mode(BuyFlowActivityMode::Redirect);
                let payload = match encrypted {
                    AnyJson::String(s) => s,
                    other => other.to_string(),
                };
                let decrypted = inner.decrypt(payload).await?;
                let mut merged = data;
                merged.remove(REDIRECT_ENCRYPTED_CALLBACK_DATA);
                for (key, value) in decrypted {
                    merged.insert(key, value);
                }
                return Ok(merged);
            }
            if !result.origin_verified || !result.secure_channel {
                return Err(PaymentError::ChannelMismatch);
            }
            Ok(data)
        }
        .boxed()
    }

    async fn decrypt(&self, payload: String) -> Result<JsonObject, PaymentError> {
        let decryptor = self
            .decryptor
            .clone()
            .ok_or_else(|| PaymentError::Redirect("no redirect decryptor configured".into()))?;
        let page_origin = Url::parse(&self.browser.location_origin)
            .or_else(|_| Url::parse(self.environment.origin()))
            .map_err(|e| PaymentError::Redirect(e.to_string()))?;
        let url = self
            .environment
            .decryption_url(&page_origin, self.redirect_key.as_deref())
            .map_err(|e| PaymentError::Redirect(e.to_string()))?;
        decryptor
            .decrypt(url, payload)
            .await
            .map_err(|e| PaymentError::Redirect(e.to_string()))
    }

    fn load_in_iframe(
        self: &Arc<Self>,
        flow: FlowId,
        request: PaymentDataRequest,
    ) -> Result<(), PaymentError> {
        self.telemetry
            .set_buy_flow_activity_mode(BuyFlowActivityMode::Iframe);

        let prefetched = self.prefetched.lock().take();
        let (session, data) = match prefetched {
            Some(prefetched)
                if prefetched.request.same_purchase_as(&request)
                    && !prefetched.session.settled.load(Ordering::SeqCst)
                    && !prefetched.task.is_finished() =>
            {
                let task = prefetched.task;
                let data = async move {
                    task.await
                        .unwrap_or_else(|e| Err(PaymentError::Transport(e.to_string())))
                }
                .boxed();
                (prefetched.session, data)
            }
            stale => {
                if let Some(stale) = stale {
                    stale.discard();
                }
                let session = self.inject_frame(&request);
                let data = self.open_iframe(session.clone(), request.clone());
                (session, data)
            }
        };

        let (dismiss_tx, dismiss_rx) = oneshot::channel();
        *session.dismiss.lock() = Some(dismiss_tx);

        let previous = self.active.lock().replace(session.clone());
        let inherits_entry = previous.is_some_and(|previous| self.abandon(&previous));
        self.show_with_animation(&session, request.render_container_center());
        if !inherits_entry {
            self.overlay.push_history_state();
        }
        session.shown.store(true, Ordering::SeqCst);
        let weak_inner = Arc::downgrade(self);
        let weak_session = Arc::downgrade(&session);
        self.overlay.on_pop_state(Box::new(move || {
            if let (Some(inner), Some(session)) = (weak_inner.upgrade(), weak_session.upgrade()) {
                inner.dismiss(&session);
            }
        }));

        let inner = self.clone();
        spawn(async move {
            let result = tokio::select! {
                biased;
                result = data => result,
                Ok(()) = dismiss_rx => Err(PaymentError::canceled()),
            };
            drop(session);
            inner.deliver(Some(flow), result);
        })?;
        Ok(())
    }

    fn load_in_window(
        self: &Arc<Self>,
        flow: FlowId,
        request: PaymentDataRequest,
    ) -> Result<(), PaymentError> {
        let redirect = request.force_redirect();
        self.telemetry.set_buy_flow_activity_mode(if redirect {
            BuyFlowActivityMode::Redirect
        } else {
            BuyFlowActivityMode::Popup
        });

        let target = if redirect { REDIRECT_TARGET } else { POPUP_TARGET };
        let args = serde_json::to_value(&request).unwrap_or(AnyJson::Null);
        let opening = self.activities.open_with_messaging(
            ACTIVITY_REQUEST_ID,
            &self.environment.hosting_page_url(),
            target,
            args,
            Self::open_options(&request),
        );
        *self.window_flow.lock() = Some(flow);
        let inner = self.clone();
        spawn(async move {
            let port = match opening.await {
                Ok(port) => port,
                Err(error) => {
                    let flow = inner.window_flow.lock().take();
                    inner.deliver(flow, Err(PaymentError::Transport(error.message)));
                    return;
                }
            };
            inner.overlay.show_graypane(Some(&port));
            if inner.toggles.close_popup_on_unload {
                let weak_port = Arc::downgrade(&port);
                inner.overlay.on_before_unload(Box::new(move || {
                    if let Some(port) = weak_port.upgrade() {
                        port.close_target();
                    }
                }));
            }
            port.on_message(inner.relay(Arc::downgrade(&port), None));
        })?;
        Ok(())
    }

    /// Result of a popup or redirect activity.
    fn on_activity_result(self: &Arc<Self>, port: Arc<dyn ActivityPort>) {
        self.overlay.hide_graypane();
        let flow = self.window_flow.lock().take();
        let inner = self.clone();
        let spawned = spawn(async move {
            let result = match port.accept_result().await {
                Ok(result) => inner.gate_result(result).await,
                Err(error) => Err(normalize_activity_error(&error)),
            };
            inner.deliver(flow, result);
        });
        if let Err(_error) = spawned {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_error, "Dropping activity result");
        }
    }
}

impl Prefetched {
    fn discard(self) {
        self.task.abort();
        if self.session.frame.is_attached() {
            self.session.frame.detach();
        }
    }
}

impl FrameSession {
    /// Resize messages wait until the show animation is over. The first
    /// live resizes get an extra height transition.
    fn handle_resize(&self, payload: &JsonObject) {
        let height = payload
            .get("height")
            .map(json_to_css)
            .unwrap_or_default();
        let transition = payload
            .get("transition")
            .map(json_to_css)
            .unwrap_or_default();

        let mut resize = self.resize.lock();
        if !resize.enabled {
            resize.saved = Some((height, transition));
            return;
        }
        let now = Instant::now();
        let since = *resize.live_since.get_or_insert(now);
        if now < since + IFRAME_SHOW_UP_DURATION {
            self.frame
                .set_transition(&format!("{transition}, {IFRAME_SMOOTH_HEIGHT_TRANSITION}"));
        } else {
            self.frame.set_transition(&transition);
        }
        self.frame.set_height(&height);
    }
}

fn json_to_css(value: &AnyJson) -> String {
    match value {
        AnyJson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn close_transition(duration: Duration) -> String {
    format!("all {}ms ease 0s", duration.as_millis())
}

/// Maps an activity failure to what the merchant sees.
///
/// The activity layer reports `Error: {json}`. Only DEVELOPER_ERROR and
/// MERCHANT_ACCOUNT_ERROR survive; everything else, including messages
/// that are not JSON, becomes CANCELED.
pub fn normalize_activity_error(error: &PortError) -> PaymentError {
    let body = error
        .message
        .get(ERROR_PREFIX.len()..)
        .unwrap_or_default();
    let parsed = serde_json::from_str::<StatusError>(body).ok();
    match parsed {
        Some(status) if status.status_code.passes_through_activity() => PaymentError::Status(status),
        _ => PaymentError::Status(StatusError {
            status_code: StatusCode::Canceled,
            status_message: None,
        }),
    }
}

impl PaymentsClientDelegate for WebActivityDelegate {
    fn is_ready_to_pay(
        &self,
        request: IsReadyToPayRequest,
    ) -> BoxFuture<'static, Result<IsReadyToPayResponse, PaymentError>> {
        self.inner.is_ready_to_pay(request)
    }

    /// Only iframe clients prefetch.
    fn prefetch_payment_data(&self, request: PaymentDataRequest) {
        let inner = &self.inner;
        if !inner.use_iframe {
            return;
        }
        let session = inner.inject_frame(&request);
        let data = inner.open_iframe(session.clone(), request.clone());
        let task = match spawn(data) {
            Ok(task) => task,
            Err(_error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_error, "Skipping prefetch");
                session.frame.detach();
                return;
            }
        };
        let replaced = inner.prefetched.lock().replace(Prefetched {
            session,
            request,
            task,
        });
        if let Some(replaced) = replaced {
            replaced.discard();
        }
    }

    fn load_payment_data(
        &self,
        flow: FlowId,
        mut request: PaymentDataRequest,
    ) -> Result<(), PaymentError> {
        let inner = &self.inner;
        request.default_api_version();
        if request.force_redirect() && inner.has_callbacks() {
            return Err(PaymentError::developer_error(
                "Callback is not supported in redirect mode",
            ));
        }
        inner.prepare(&mut request);
        if inner.use_iframe {
            inner.load_in_iframe(flow, request)
        } else {
            inner.load_in_window(flow, request)
        }
    }

    fn register_payment_data_callbacks(&self, callbacks: PaymentDataCallbacks) {
        *self.inner.callbacks.lock() = Some(callbacks);
    }

    /// Only the first handler is kept.
    fn on_result(&self, handler: ResultHandler) {
        {
            let mut slot = self.inner.handler.lock();
            if slot.is_some() {
                return;
            }
            *slot = Some(handler);
        }
        let weak = Arc::downgrade(&self.inner);
        self.inner.activities.on_result(
            ACTIVITY_REQUEST_ID,
            Arc::new(move |port| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_activity_result(port);
                }
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_allow_listed_codes() {
        let error = PortError::new(
            r#"Error: {"statusCode":"DEVELOPER_ERROR","statusMessage":"bad merchant id"}"#,
        );
        assert_eq!(
            normalize_activity_error(&error),
            PaymentError::developer_error("bad merchant id")
        );

        let error = PortError::new(r#"Error: {"statusCode":"MERCHANT_ACCOUNT_ERROR"}"#);
        assert_eq!(
            normalize_activity_error(&error).status_code(),
            Some(&StatusCode::MerchantAccountError)
        );
    }

    #[test]
    fn test_normalize_downgrades_everything_else() {
        for message in [
            r#"Error: {"statusCode":"INTERNAL_ERROR","statusMessage":"boom"}"#,
            "Error: not json at all",
            "AbortError",
            "",
        ] {
            assert_eq!(
                normalize_activity_error(&PortError::new(message)),
                PaymentError::canceled(),
                "{message}"
            );
        }
    }

    #[test]
    fn test_close_transition() {
        assert_eq!(
            close_transition(IFRAME_CLOSE_DURATION),
            "all 250ms ease 0s"
        );
    }
}
