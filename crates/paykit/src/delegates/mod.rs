//! Transports that carry a buy flow to the hosted payment surface.
//!
//! A delegate never returns a flow's outcome from `load_payment_data`: the
//! outcome is handed to the handler registered with `on_result`, so one
//! client sees exactly one result whichever delegate served the call.

use std::{future::Future, sync::Arc};

use futures::future::BoxFuture;
use paykit_core::types::{IsReadyToPayRequest, IsReadyToPayResponse, PaymentData, PaymentDataRequest};
use tokio::task::JoinHandle;

use crate::{callbacks::PaymentDataCallbacks, errors::PaymentError};

mod native;
mod web_activity;

pub use native::PaymentRequestDelegate;
pub use web_activity::{WebActivityDelegate, normalize_activity_error};

/// Terminal outcome of one buy flow.
pub type PaymentResult = Result<PaymentData, PaymentError>;

/// Identifies one `load_payment_data` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowId(pub u64);

/// Receives terminal results. The flow is `None` when the result is not
/// tied to a load started on this page, such as a redirect coming back.
pub type ResultHandler = Arc<dyn Fn(Option<FlowId>, PaymentResult) + Send + Sync>;

pub trait PaymentsClientDelegate: Send + Sync {
    fn is_ready_to_pay(
        &self,
        request: IsReadyToPayRequest,
    ) -> BoxFuture<'static, Result<IsReadyToPayResponse, PaymentError>>;

    /// Best effort warm up for a later `load_payment_data` with the same
    /// request.
    fn prefetch_payment_data(&self, request: PaymentDataRequest);

    /// Starts `flow`. Its result reaches the handler tagged with `flow`. An
    /// `Err` means the flow never started and no result will follow.
    fn load_payment_data(
        &self,
        flow: FlowId,
        request: PaymentDataRequest,
    ) -> Result<(), PaymentError>;

    fn register_payment_data_callbacks(&self, callbacks: PaymentDataCallbacks);

    fn on_result(&self, handler: ResultHandler);
}

/// Spawns on the ambient tokio runtime.
pub(crate) fn spawn<F>(future: F) -> Result<JoinHandle<F::Output>, PaymentError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::runtime::Handle::try_current()
        .map(|handle| handle.spawn(future))
        .map_err(|e| PaymentError::Transport(e.to_string()))
}
