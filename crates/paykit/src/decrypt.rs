//! Exchange of encrypted redirect payloads for cleartext payment data.

use futures::future::BoxFuture;
use paykit_core::types::{AnyJson, JsonObject};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[cfg(feature = "decrypt-client")]
    #[error("HTTP request error: {0}")]
    HttpRequestError(#[from] reqwest::Error),
    #[error("Serialization/Deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Decryption response is not a JSON object")]
    NotAnObject,
}

/// Posts the encrypted payload to the decryption endpoint and returns the
/// decrypted fields.
pub trait RedirectDecryptor: Send + Sync {
    fn decrypt(&self, url: Url, payload: String) -> BoxFuture<'static, Result<JsonObject, DecryptError>>;
}

pub(crate) fn into_object(value: AnyJson) -> Result<JsonObject, DecryptError> {
    match value {
        AnyJson::Object(map) => Ok(map),
        _ => Err(DecryptError::NotAnObject),
    }
}

#[cfg(feature = "decrypt-client")]
pub use http_client::HttpRedirectDecryptor;

#[cfg(feature = "decrypt-client")]
mod http_client {
    use futures::FutureExt;
    use http::{HeaderMap, HeaderName, HeaderValue, header::CONTENT_TYPE};

    use super::*;

    /// Decrypts over HTTP with `reqwest`.
    ///
    /// The body is parsed whatever the status code; the endpoint reports
    /// failures in the JSON itself.
    #[derive(Debug, Clone)]
    pub struct HttpRedirectDecryptor {
        pub client: reqwest::Client,
        pub headers: HeaderMap,
    }

    impl Default for HttpRedirectDecryptor {
        fn default() -> Self {
            HttpRedirectDecryptor::new()
        }
    }

    impl HttpRedirectDecryptor {
        pub fn new() -> Self {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain;charset=UTF-8"));
            HttpRedirectDecryptor {
                client: reqwest::Client::new(),
                headers,
            }
        }

        pub fn with_client(mut self, client: reqwest::Client) -> Self {
            self.client = client;
            self
        }

        pub fn header(mut self, key: &HeaderName, value: &HeaderValue) -> Self {
            self.headers.insert(key, value.to_owned());
            self
        }
    }

    impl RedirectDecryptor for HttpRedirectDecryptor {
        fn decrypt(
            &self,
            url: Url,
            payload: String,
        ) -> BoxFuture<'static, Result<JsonObject, DecryptError>> {
            let client = self.client.clone();
            let headers = self.headers.clone();
            async move {
                #[cfg(feature = "tracing")]
                tracing::debug!(%url, "Decrypting redirect payload");
                let body = client
                    .post(url)
                    .headers(headers)
                    .body(payload)
                    .send()
                    .await?
                    .text()
                    .await?;
                into_object(serde_json::from_str(&body)?)
            }
            .boxed()
        }
    }
}
