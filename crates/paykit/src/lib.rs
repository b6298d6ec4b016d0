//! Paykit: the payment client runtime.
//!
//! [`PaymentsClient`] decides per browser and per request how a checkout
//! reaches the hosted payment surface (native payment request, popup, iframe
//! or full page redirect), drives the exchange to a single result and reports
//! every step to the pay frame.
//!
//! Browser facilities are reached through the collaborator traits in
//! [`ports`]; bundle implementations of them into a [`platform::Platform`]
//! to build a client.
//!
//! ```ignore
//! let client = PaymentsClient::new(
//!     PaymentsClientOptions::builder().environment("TEST").build(),
//!     platform,
//! )?;
//! let data = client.load_payment_data(request)?.await?;
//! ```

pub mod callbacks;
pub mod client;
pub mod decrypt;
pub mod delegates;
pub mod errors;
pub mod page;
pub mod platform;
pub mod ports;
pub mod selector;
pub mod telemetry;

pub use paykit_core::{constants, context, telemetry as codes, toggles, types, validator};

pub use client::{PaymentsAsyncClient, PaymentsClient, PaymentsClientOptions, PendingPayment};
pub use errors::{ClientError, PaymentError};
