//! What the client knows about the browser it runs in.

use std::sync::{Arc, LazyLock};

use bon::Builder;
use regex::Regex;

use crate::{
    decrypt::RedirectDecryptor,
    page::PageContext,
    ports::{ActivityPorts, OverlayHost, PaymentRequestApi},
};

static MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Android|iPhone|iPad|iPod|BlackBerry|IEMobile").expect("Invalid regex pattern")
});
static ANDROID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Android").expect("Invalid regex pattern"));
static CHROME_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Chrome/([0-9]+)\.").expect("Invalid regex pattern"));

/// Vendor string reported by Google Chrome.
pub const GOOGLE_VENDOR: &str = "Google Inc.";

/// Navigator and location facts used for capability probes.
#[derive(Builder, Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserEnvironment {
    #[builder(into, default)]
    pub user_agent: String,
    #[builder(into, default)]
    pub vendor: String,
    /// Whether the payment-request API exists in this browser.
    #[builder(default)]
    pub payment_request_available: bool,
    #[builder(into, default)]
    pub hostname: String,
    /// `window.location.origin`.
    #[builder(into, default)]
    pub location_origin: String,
    /// `None` when the browser does not report it.
    pub is_secure_context: Option<bool>,
}

impl BrowserEnvironment {
    pub fn is_mobile(&self) -> bool {
        MOBILE_RE.is_match(&self.user_agent)
    }

    pub fn is_android(&self) -> bool {
        ANDROID_RE.is_match(&self.user_agent)
    }

    pub fn chrome_version(&self) -> Option<u32> {
        CHROME_VERSION_RE
            .captures(&self.user_agent)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    pub fn is_google_vendor(&self) -> bool {
        self.vendor == GOOGLE_VENDOR
    }

    /// Whether `needle` occurs anywhere in the user agent.
    pub fn user_agent_contains(&self, needle: &str) -> bool {
        self.user_agent.contains(needle)
    }

    /// Whether `needle` occurs in the user agent past its first character.
    /// Browser tokens never open a user agent string.
    pub fn user_agent_mentions(&self, needle: &str) -> bool {
        self.user_agent.find(needle).is_some_and(|index| index > 0)
    }
}

/// Browser collaborators a client is built on.
///
/// Clients on the same page should share one [`PageContext`].
#[derive(Builder, Clone)]
pub struct Platform {
    #[builder(default)]
    pub browser: BrowserEnvironment,
    pub activities: Arc<dyn ActivityPorts>,
    pub overlay: Arc<dyn OverlayHost>,
    /// The payment-request API object, when the browser exposes one.
    pub payment_request: Option<Arc<dyn PaymentRequestApi>>,
    /// Falls back to the HTTP decryptor when the `decrypt-client` feature is on.
    pub decryptor: Option<Arc<dyn RedirectDecryptor>>,
    #[builder(default = Arc::new(PageContext::new()))]
    pub page: Arc<PageContext>,
}

impl Platform {
    pub(crate) fn redirect_decryptor(&self) -> Option<Arc<dyn RedirectDecryptor>> {
        #[cfg(feature = "decrypt-client")]
        {
            Some(self.decryptor.clone().unwrap_or_else(|| {
                Arc::new(crate::decrypt::HttpRedirectDecryptor::new()) as Arc<dyn RedirectDecryptor>
            }))
        }
        #[cfg(not(feature = "decrypt-client"))]
        {
            self.decryptor.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESKTOP_CHROME: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const ANDROID_CHROME: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/95.0.4638.74 Mobile Safari/537.36";

    #[test]
    fn test_user_agent_probes() {
        let desktop = BrowserEnvironment::builder()
            .user_agent(DESKTOP_CHROME)
            .vendor(GOOGLE_VENDOR)
            .build();
        assert!(!desktop.is_mobile());
        assert!(!desktop.is_android());
        assert_eq!(desktop.chrome_version(), Some(120));
        assert!(desktop.is_google_vendor());

        let android = BrowserEnvironment::builder().user_agent(ANDROID_CHROME).build();
        assert!(android.is_mobile());
        assert!(android.is_android());
        assert_eq!(android.chrome_version(), Some(95));
        assert!(!android.is_google_vendor());
    }

    #[test]
    fn test_mentions_skips_leading_token() {
        let browser = BrowserEnvironment::builder()
            .user_agent("Chrome/1. Mozilla")
            .build();
        assert!(!browser.user_agent_mentions("Chrome"));
        assert!(browser.user_agent_contains("Chrome"));
        assert!(browser.user_agent_mentions("Mozilla"));
    }
}
