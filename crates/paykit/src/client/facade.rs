use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use paykit_core::types::{
    ButtonOptions, IsReadyToPayRequest, IsReadyToPayResponse, PaymentData, PaymentDataRequest,
};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{PaymentsAsyncClient, PaymentsClientOptions};
use crate::{
    delegates::{FlowId, PaymentResult, ResultHandler},
    errors::{ClientError, PaymentError},
    platform::Platform,
    ports::ButtonRenderer,
};

/// The call waiting for a result and the flow it started.
struct InFlight {
    flow: FlowId,
    sender: oneshot::Sender<PaymentResult>,
}

type PendingSlot = Arc<Mutex<Option<InFlight>>>;

/// The payment client merchants use.
///
/// Only one [`PaymentsClient::load_payment_data`] call may be in flight at
/// a time.
pub struct PaymentsClient {
    client: PaymentsAsyncClient,
    pending: PendingSlot,
}

/// Resolves with the outcome of one `load_payment_data` call.
#[derive(Debug)]
pub struct PendingPayment {
    receiver: oneshot::Receiver<PaymentResult>,
}

impl Future for PendingPayment {
    type Output = Result<PaymentData, PaymentError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|result| {
            result.unwrap_or_else(|_| Err(PaymentError::Transport("payments client dropped".into())))
        })
    }
}

impl PaymentsClient {
    /// Creates a client that uses native, popup or redirect flows.
    ///
    /// Page init params registered on the platform's page context fill any
    /// option left unset.
    pub fn new(options: PaymentsClientOptions, platform: Platform) -> Result<Self, ClientError> {
        Self::build(options, platform, false)
    }

    /// Creates a client that runs every flow in an iframe on the page.
    pub fn with_iframe(
        options: PaymentsClientOptions,
        platform: Platform,
    ) -> Result<Self, ClientError> {
        Self::build(options, platform, true)
    }

    fn build(
        options: PaymentsClientOptions,
        platform: Platform,
        use_iframe: bool,
    ) -> Result<Self, ClientError> {
        let options = options.merged_over(platform.page.init_params());
        let pending: PendingSlot = Arc::new(Mutex::new(None));
        let slot = pending.clone();
        let on_payment_response: ResultHandler = Arc::new(move |flow, result| {
            let in_flight = {
                let mut slot = slot.lock();
                // Untagged results come back from a redirect and answer
                // whatever load is waiting.
                let owns = slot
                    .as_ref()
                    .is_some_and(|in_flight| flow.is_none_or(|flow| flow == in_flight.flow));
                if owns {
                    slot.take()
                } else {
                    None
                }
            };
            match in_flight {
                Some(in_flight) => {
                    let _ = in_flight.sender.send(result);
                }
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(?flow, "Dropping payment result: no matching load in flight");
                }
            }
        });
        let client = PaymentsAsyncClient::new(options, platform, use_iframe, on_payment_response)?;
        Ok(PaymentsClient { client, pending })
    }

    /// The underlying client.
    pub fn async_client(&self) -> &PaymentsAsyncClient {
        &self.client
    }

    pub async fn is_ready_to_pay(
        &self,
        request: IsReadyToPayRequest,
    ) -> Result<IsReadyToPayResponse, PaymentError> {
        self.client.is_ready_to_pay(request).await
    }

    /// Best effort. Pass the same request to
    /// [`PaymentsClient::load_payment_data`] to benefit from it.
    pub fn prefetch_payment_data(&self, request: PaymentDataRequest) {
        self.client.prefetch_payment_data(request);
    }

    /// Starts a buy flow.
    ///
    /// Fails with [`ClientError::LoadInProgress`] while an earlier call has
    /// not settled. The slot is free again as soon as the earlier result is
    /// delivered or its [`PendingPayment`] is dropped. A dropped call's flow
    /// may still finish; its result is discarded.
    pub fn load_payment_data(
        &self,
        request: PaymentDataRequest,
    ) -> Result<PendingPayment, ClientError> {
        let (sender, receiver) = oneshot::channel();
        let flow = self.client.next_flow_id();
        {
            let mut slot = self.pending.lock();
            if slot
                .as_ref()
                .is_some_and(|in_flight| !in_flight.sender.is_closed())
            {
                return Err(ClientError::LoadInProgress);
            }
            *slot = Some(InFlight { flow, sender });
        }
        self.client.start_flow(flow, request);
        Ok(PendingPayment { receiver })
    }

    pub fn create_button<R: ButtonRenderer>(
        &self,
        renderer: &R,
        options: ButtonOptions,
        on_click: impl Fn() + Send + Sync + 'static,
    ) -> R::Element {
        self.client.create_button(renderer, options, on_click)
    }
}
