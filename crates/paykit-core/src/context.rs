//! Per-session identifiers shared by every call a client makes.

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::types::Environment;

/// Hosts allowed to supply their own `googleTransactionId`.
pub const TRUSTED_DOMAINS: [&str; 6] = [
    "actions.google.com",
    "amp-actions.sandbox.google.com",
    "amp-actions-staging.sandbox.google.com",
    "amp-actions-autopush.sandbox.google.com",
    "payments.developers.google.com",
    "payments.google.com",
];

pub fn is_trusted_domain(hostname: &str) -> bool {
    TRUSTED_DOMAINS.contains(&hostname)
}

/// A fresh transaction id of the form `<uuid>.<ENVIRONMENT>`.
pub fn create_transaction_id(environment: Environment) -> String {
    format!("{}.{}", uuid::Uuid::new_v4(), environment)
}

/// Picks the transaction id for a page: the supplied one when the page is a
/// trusted embedder, a generated one otherwise.
pub fn resolve_transaction_id(
    hostname: &str,
    supplied: Option<&str>,
    environment: Environment,
) -> String {
    match supplied.filter(|id| !id.is_empty()) {
        Some(id) if is_trusted_domain(hostname) => id.to_string(),
        _ => create_transaction_id(environment),
    }
}

#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionContext {
    #[builder(into)]
    pub transaction_id: String,
    /// Empty when the merchant did not provide one.
    #[builder(into, default)]
    pub merchant_id: String,
    #[builder(default)]
    pub environment: Environment,
    /// Epoch milliseconds at which the page started the session.
    pub origin_time_ms: i64,
}
