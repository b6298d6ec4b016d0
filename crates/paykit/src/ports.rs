//! Collaborator traits for the browser facilities the client drives.
//!
//! The client never touches a DOM, a window or the network directly (apart
//! from the redirect decryptor). Embedders implement these traits over the
//! real page; the test suite implements them with recording fakes.

use std::sync::Arc;

use bon::Builder;
use futures::future::BoxFuture;
use paykit_core::types::{AnyJson, ButtonStyle, JsonObject};
use serde::Serialize;

/// Failure reported by the activity layer. `message` is what the hosted
/// surface put on the wire, usually `Error: {json}`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PortError {
    pub message: String,
}

impl PortError {
    pub fn new(message: impl Into<String>) -> Self {
        PortError {
            message: message.into(),
        }
    }
}

/// The terminal message of an activity.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityResult {
    /// Origin of the window that produced the result.
    pub origin: String,
    pub origin_verified: bool,
    pub secure_channel: bool,
    pub data: AnyJson,
}

pub type MessageHandler = Arc<dyn Fn(JsonObject) + Send + Sync>;

/// One open messaging channel to the hosted surface.
pub trait ActivityPort: Send + Sync {
    fn accept_result(&self) -> BoxFuture<'static, Result<ActivityResult, PortError>>;

    fn message(&self, payload: AnyJson);

    /// Registers the listener for messages sent by the hosted surface.
    /// Messages are delivered in receipt order.
    fn on_message(&self, handler: MessageHandler);

    fn disconnect(&self);

    /// Closes the target window, for ports that own one.
    fn close_target(&self) {}
}

#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityOpenOptions {
    pub width: u32,
    pub height: u32,
    #[builder(default)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disable_redirect_fallback: bool,
}

pub type ActivityResultHandler = Arc<dyn Fn(Arc<dyn ActivityPort>) + Send + Sync>;

/// Opens activities towards the hosted surface.
pub trait ActivityPorts: Send + Sync {
    /// Opens `url` in a popup (or navigates `_top`) and connects to it.
    fn open_with_messaging(
        &self,
        request_id: &str,
        url: &str,
        target: &str,
        args: AnyJson,
        options: ActivityOpenOptions,
    ) -> BoxFuture<'static, Result<Arc<dyn ActivityPort>, PortError>>;

    /// Loads `url` into an injected frame and connects to it.
    fn open_iframe(
        &self,
        frame: Arc<dyn OverlayFrame>,
        url: &str,
        args: AnyJson,
    ) -> BoxFuture<'static, Result<Arc<dyn ActivityPort>, PortError>>;

    /// Called with a port whenever an activity with `request_id` finishes,
    /// including results that arrive on page load after a redirect.
    fn on_result(&self, request_id: &str, handler: ActivityResultHandler);
}

/// An injected container with a checkout frame in it.
pub trait OverlayFrame: Send + Sync {
    fn set_visible(&self, visible: bool);

    fn set_height(&self, height: &str);

    fn set_transition(&self, transition: &str);

    /// Applies the active style of a centered container.
    fn activate_center(&self);

    fn on_container_click(&self, handler: Arc<dyn Fn() + Send + Sync>);

    fn is_attached(&self) -> bool;

    fn detach(&self);
}

/// Page level UI: frame injection, history and the dimming pane.
pub trait OverlayHost: Send + Sync {
    fn inject_iframe(&self, center: bool) -> Arc<dyn OverlayFrame>;

    fn push_history_state(&self);

    fn history_back(&self);

    /// Runs `handler` on the next `popstate`.
    fn on_pop_state(&self, handler: Box<dyn FnOnce() + Send>);

    /// Dims the page while `target` is open.
    fn show_graypane(&self, target: Option<&Arc<dyn ActivityPort>>);

    fn hide_graypane(&self);

    fn on_before_unload(&self, handler: Box<dyn FnOnce() + Send>);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct NativeError(pub String);

pub type MethodChangeHandler = Arc<dyn Fn(JsonObject) -> BoxFuture<'static, AnyJson> + Send + Sync>;

/// The browser payment-request API.
pub trait PaymentRequestApi: Send + Sync {
    /// `new PaymentRequest(methodData, details)`.
    fn create(
        &self,
        method_data: AnyJson,
        details: AnyJson,
    ) -> Result<Arc<dyn NativePaymentRequest>, NativeError>;
}

pub trait NativePaymentRequest: Send + Sync {
    /// Older browsers only offer `canMakePayment`.
    fn supports_has_enrolled_instrument(&self) -> bool;

    fn has_enrolled_instrument(&self) -> BoxFuture<'static, Result<bool, NativeError>>;

    fn can_make_payment(&self) -> BoxFuture<'static, Result<bool, NativeError>>;

    /// The handler's output is passed to `updateWith`.
    fn on_payment_method_change(&self, handler: MethodChangeHandler);

    fn show(&self) -> BoxFuture<'static, Result<Box<dyn NativePaymentResponse>, NativeError>>;
}

pub trait NativePaymentResponse: Send {
    fn details(&self) -> JsonObject;

    /// `complete('success')`, dismissing any remaining UI.
    fn complete(&self);
}

/// Builds the clickable button element.
pub trait ButtonRenderer {
    type Element;

    fn render(
        &self,
        style: ButtonStyle,
        merchant_id: &str,
        on_click: Arc<dyn Fn() + Send + Sync>,
    ) -> Self::Element;
}

/// The hidden pay frame that receives telemetry.
pub trait EventSink: Send + Sync {
    fn post_message(&self, message: JsonObject);
}
