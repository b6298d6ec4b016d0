#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use futures::{FutureExt, future::BoxFuture};
use parking_lot::Mutex;
use paykit::{
    page::PageContext,
    platform::{BrowserEnvironment, GOOGLE_VENDOR, Platform},
    ports::{
        ActivityOpenOptions, ActivityPort, ActivityPorts, ActivityResult, ActivityResultHandler,
        EventSink, MessageHandler, MethodChangeHandler, NativeError, NativePaymentRequest,
        NativePaymentResponse, OverlayFrame, OverlayHost, PaymentRequestApi, PortError,
    },
    types::{AnyJson, JsonObject, PaymentDataRequest},
};
use serde_json::json;
use tokio::sync::oneshot;

pub const DESKTOP_FIREFOX: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";
pub const DESKTOP_CHROME: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const ANDROID_CHROME: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
pub const IPHONE_SAFARI: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

pub const MERCHANT_ORIGIN: &str = "https://shop.example";

pub fn browser(user_agent: &str) -> BrowserEnvironment {
    let chrome = user_agent.contains("Chrome/");
    BrowserEnvironment::builder()
        .user_agent(user_agent)
        .vendor(if chrome { GOOGLE_VENDOR } else { "" })
        .payment_request_available(chrome)
        .hostname("shop.example")
        .location_origin(MERCHANT_ORIGIN)
        .is_secure_context(true)
        .build()
}

pub fn v2_request() -> PaymentDataRequest {
    serde_json::from_value(json!({
        "apiVersion": 2,
        "apiVersionMinor": 0,
        "merchantInfo": {"merchantId": "01234567890123456789"},
        "allowedPaymentMethods": [{
            "type": "CARD",
            "parameters": {
                "allowedAuthMethods": ["PAN_ONLY", "CRYPTOGRAM_3DS"],
                "allowedCardNetworks": ["VISA", "MASTERCARD"]
            }
        }],
        "transactionInfo": {
            "currencyCode": "EUR",
            "totalPriceStatus": "FINAL",
            "totalPrice": "12.00"
        }
    }))
    .unwrap()
}

pub fn object(value: AnyJson) -> JsonObject {
    match value {
        AnyJson::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// A port whose result the test decides.
#[derive(Default)]
pub struct FakePort {
    result_tx: Mutex<Option<oneshot::Sender<Result<ActivityResult, PortError>>>>,
    result_rx: Mutex<Option<oneshot::Receiver<Result<ActivityResult, PortError>>>>,
    handler: Mutex<Option<MessageHandler>>,
    pub sent: Mutex<Vec<AnyJson>>,
    pub disconnected: AtomicBool,
    pub closed: AtomicBool,
}

impl FakePort {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = oneshot::channel();
        Arc::new(FakePort {
            result_tx: Mutex::new(Some(tx)),
            result_rx: Mutex::new(Some(rx)),
            ..Default::default()
        })
    }

    pub fn finish(&self, result: Result<ActivityResult, PortError>) {
        if let Some(tx) = self.result_tx.lock().take() {
            let _ = tx.send(result);
        }
    }

    /// Simulates a message from the hosted surface.
    pub fn receive(&self, message: AnyJson) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(object(message));
        }
    }

    pub fn sent(&self) -> Vec<AnyJson> {
        self.sent.lock().clone()
    }
}

impl ActivityPort for FakePort {
    fn accept_result(&self) -> BoxFuture<'static, Result<ActivityResult, PortError>> {
        let rx = self.result_rx.lock().take();
        async move {
            match rx {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(PortError::new("Error: port closed"))),
                None => Err(PortError::new("Error: result already accepted")),
            }
        }
        .boxed()
    }

    fn message(&self, payload: AnyJson) {
        self.sent.lock().push(payload);
    }

    fn on_message(&self, handler: MessageHandler) {
        *self.handler.lock() = Some(handler);
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        self.result_tx.lock().take();
    }

    fn close_target(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Opened {
    pub url: String,
    pub target: String,
    pub args: AnyJson,
    pub options: Option<ActivityOpenOptions>,
}

#[derive(Default)]
pub struct FakeActivities {
    pub opened: Mutex<Vec<Opened>>,
    pub ports: Mutex<Vec<Arc<FakePort>>>,
    result_handler: Mutex<Option<ActivityResultHandler>>,
    pub fail_open: AtomicBool,
}

impl FakeActivities {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeActivities::default())
    }

    pub fn opened(&self) -> Vec<Opened> {
        self.opened.lock().clone()
    }

    pub fn last_port(&self) -> Option<Arc<FakePort>> {
        self.ports.lock().last().cloned()
    }

    /// Finishes the popup activity and hands its port to the result handler,
    /// the way the activity layer does when the popup closes.
    pub fn complete(&self, result: Result<ActivityResult, PortError>) {
        let port = self.last_port().unwrap_or_else(FakePort::new);
        port.finish(result);
        let handler = self.result_handler.lock().clone();
        if let Some(handler) = handler {
            handler(port as Arc<dyn ActivityPort>);
        }
    }

    fn open(&self, opened: Opened) -> BoxFuture<'static, Result<Arc<dyn ActivityPort>, PortError>> {
        self.opened.lock().push(opened);
        if self.fail_open.load(Ordering::SeqCst) {
            return futures::future::ready(Err(PortError::new("popup blocked"))).boxed();
        }
        let port = FakePort::new();
        self.ports.lock().push(port.clone());
        futures::future::ready(Ok(port as Arc<dyn ActivityPort>)).boxed()
    }
}

impl ActivityPorts for FakeActivities {
    fn open_with_messaging(
        &self,
        _request_id: &str,
        url: &str,
        target: &str,
        args: AnyJson,
        options: ActivityOpenOptions,
    ) -> BoxFuture<'static, Result<Arc<dyn ActivityPort>, PortError>> {
        self.open(Opened {
            url: url.to_string(),
            target: target.to_string(),
            args,
            options: Some(options),
        })
    }

    fn open_iframe(
        &self,
        _frame: Arc<dyn OverlayFrame>,
        url: &str,
        args: AnyJson,
    ) -> BoxFuture<'static, Result<Arc<dyn ActivityPort>, PortError>> {
        self.open(Opened {
            url: url.to_string(),
            target: "iframe".to_string(),
            args,
            options: None,
        })
    }

    fn on_result(&self, _request_id: &str, handler: ActivityResultHandler) {
        *self.result_handler.lock() = Some(handler);
    }
}

pub struct FakeFrame {
    pub center: bool,
    pub visible: AtomicBool,
    pub attached: AtomicBool,
    pub centered: AtomicBool,
    pub heights: Mutex<Vec<String>>,
    pub transitions: Mutex<Vec<String>>,
    click: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl FakeFrame {
    pub fn height(&self) -> Option<String> {
        self.heights.lock().last().cloned()
    }

    pub fn click_container(&self) {
        let click = self.click.lock().clone();
        if let Some(click) = click {
            click();
        }
    }
}

impl OverlayFrame for FakeFrame {
    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    fn set_height(&self, height: &str) {
        self.heights.lock().push(height.to_string());
    }

    fn set_transition(&self, transition: &str) {
        self.transitions.lock().push(transition.to_string());
    }

    fn activate_center(&self) {
        self.centered.store(true, Ordering::SeqCst);
    }

    fn on_container_click(&self, handler: Arc<dyn Fn() + Send + Sync>) {
        *self.click.lock() = Some(handler);
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

/// Page UI where `history_back` fires the pending `popstate` handler.
#[derive(Default)]
pub struct FakeOverlay {
    pub frames: Mutex<Vec<Arc<FakeFrame>>>,
    pub pushed: AtomicUsize,
    pub backs: AtomicUsize,
    pop_state: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    before_unload: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    pub graypane: AtomicBool,
}

impl FakeOverlay {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeOverlay::default())
    }

    pub fn last_frame(&self) -> Option<Arc<FakeFrame>> {
        self.frames.lock().last().cloned()
    }

    /// The buyer pressed the browser back button.
    pub fn press_back(&self) {
        let handler = self.pop_state.lock().take();
        if let Some(handler) = handler {
            handler();
        }
    }

    pub fn unload(&self) {
        let handler = self.before_unload.lock().take();
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl OverlayHost for FakeOverlay {
    fn inject_iframe(&self, center: bool) -> Arc<dyn OverlayFrame> {
        let frame = Arc::new(FakeFrame {
            center,
            visible: AtomicBool::new(false),
            attached: AtomicBool::new(true),
            centered: AtomicBool::new(false),
            heights: Mutex::new(Vec::new()),
            transitions: Mutex::new(Vec::new()),
            click: Mutex::new(None),
        });
        self.frames.lock().push(frame.clone());
        frame
    }

    fn push_history_state(&self) {
        self.pushed.fetch_add(1, Ordering::SeqCst);
    }

    fn history_back(&self) {
        self.backs.fetch_add(1, Ordering::SeqCst);
        self.press_back();
    }

    fn on_pop_state(&self, handler: Box<dyn FnOnce() + Send>) {
        *self.pop_state.lock() = Some(handler);
    }

    fn show_graypane(&self, _target: Option<&Arc<dyn ActivityPort>>) {
        self.graypane.store(true, Ordering::SeqCst);
    }

    fn hide_graypane(&self) {
        self.graypane.store(false, Ordering::SeqCst);
    }

    fn on_before_unload(&self, handler: Box<dyn FnOnce() + Send>) {
        *self.before_unload.lock() = Some(handler);
    }
}

/// Scripted payment-request API.
pub struct FakePaymentRequestApi {
    pub enrolled: Result<bool, NativeError>,
    pub has_enrolled_instrument: bool,
    pub nominal: bool,
    pub show_result: Mutex<Option<Result<JsonObject, NativeError>>>,
    pub fail_create: AtomicBool,
    pub created: Mutex<Vec<(AnyJson, AnyJson)>>,
    pub completed: Arc<AtomicUsize>,
    pub method_change: Arc<Mutex<Option<MethodChangeHandler>>>,
}

impl Default for FakePaymentRequestApi {
    fn default() -> Self {
        FakePaymentRequestApi {
            enrolled: Ok(true),
            has_enrolled_instrument: true,
            nominal: true,
            show_result: Mutex::new(None),
            fail_create: AtomicBool::new(false),
            created: Mutex::new(Vec::new()),
            completed: Arc::new(AtomicUsize::new(0)),
            method_change: Arc::new(Mutex::new(None)),
        }
    }
}

impl FakePaymentRequestApi {
    /// Method data of every request built so far, the nominal probe excluded.
    pub fn requests(&self) -> Vec<(AnyJson, AnyJson)> {
        self.created
            .lock()
            .iter()
            .filter(|(_, details)| details["total"]["amount"]["value"] != "10")
            .cloned()
            .collect()
    }
}

struct FakeNativeRequest {
    enrolled: Result<bool, NativeError>,
    has_enrolled_instrument: bool,
    can_make_payment: bool,
    show_result: Option<Result<JsonObject, NativeError>>,
    completed: Arc<AtomicUsize>,
    method_change: Arc<Mutex<Option<MethodChangeHandler>>>,
}

struct FakeNativeResponse {
    details: JsonObject,
    completed: Arc<AtomicUsize>,
}

impl NativePaymentResponse for FakeNativeResponse {
    fn details(&self) -> JsonObject {
        self.details.clone()
    }

    fn complete(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl NativePaymentRequest for FakeNativeRequest {
    fn supports_has_enrolled_instrument(&self) -> bool {
        self.has_enrolled_instrument
    }

    fn has_enrolled_instrument(&self) -> BoxFuture<'static, Result<bool, NativeError>> {
        futures::future::ready(self.enrolled.clone()).boxed()
    }

    fn can_make_payment(&self) -> BoxFuture<'static, Result<bool, NativeError>> {
        futures::future::ready(Ok(self.can_make_payment)).boxed()
    }

    fn on_payment_method_change(&self, handler: MethodChangeHandler) {
        *self.method_change.lock() = Some(handler);
    }

    fn show(&self) -> BoxFuture<'static, Result<Box<dyn NativePaymentResponse>, NativeError>> {
        let completed = self.completed.clone();
        let result = self
            .show_result
            .clone()
            .unwrap_or_else(|| Err(NativeError("AbortError".into())));
        async move {
            result.map(|details| {
                Box::new(FakeNativeResponse { details, completed }) as Box<dyn NativePaymentResponse>
            })
        }
        .boxed()
    }
}

impl PaymentRequestApi for FakePaymentRequestApi {
    fn create(
        &self,
        method_data: AnyJson,
        details: AnyJson,
    ) -> Result<Arc<dyn NativePaymentRequest>, NativeError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(NativeError("TypeError".into()));
        }
        let nominal = details["total"]["amount"]["value"] == "10";
        self.created.lock().push((method_data, details));
        Ok(Arc::new(FakeNativeRequest {
            enrolled: self.enrolled.clone(),
            has_enrolled_instrument: self.has_enrolled_instrument,
            can_make_payment: if nominal { self.nominal } else { true },
            show_result: self.show_result.lock().clone(),
            completed: self.completed.clone(),
            method_change: self.method_change.clone(),
        }))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<JsonObject>>,
}

impl RecordingSink {
    pub fn event_types(&self) -> Vec<u64> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| m.get("eventType").and_then(AnyJson::as_u64))
            .collect()
    }

    pub fn with_event_type(&self, event_type: u64) -> Vec<JsonObject> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.get("eventType").and_then(AnyJson::as_u64) == Some(event_type))
            .cloned()
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn post_message(&self, message: JsonObject) {
        self.messages.lock().push(message);
    }
}

/// Collaborators of one test page.
pub struct Harness {
    pub activities: Arc<FakeActivities>,
    pub overlay: Arc<FakeOverlay>,
    pub native: Option<Arc<FakePaymentRequestApi>>,
    pub sink: Arc<RecordingSink>,
    pub page: Arc<PageContext>,
    pub browser: BrowserEnvironment,
}

impl Harness {
    pub fn new(browser: BrowserEnvironment) -> Self {
        Self::with_native(browser, None)
    }

    pub fn with_native(browser: BrowserEnvironment, native: Option<FakePaymentRequestApi>) -> Self {
        let page = Arc::new(PageContext::new());
        let sink = Arc::new(RecordingSink::default());
        page.telemetry().attach(sink.clone());
        Harness {
            activities: FakeActivities::new(),
            overlay: FakeOverlay::new(),
            native: native.map(Arc::new),
            sink,
            page,
            browser,
        }
    }

    pub fn platform(&self) -> Platform {
        Platform::builder()
            .browser(self.browser.clone())
            .activities(self.activities.clone())
            .overlay(self.overlay.clone())
            .maybe_payment_request(
                self.native
                    .clone()
                    .map(|api| api as Arc<dyn PaymentRequestApi>),
            )
            .page(self.page.clone())
            .build()
    }
}

/// Lets spawned tasks run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
