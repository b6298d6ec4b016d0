//! Picks the transport a buy flow runs over.

use paykit_core::{
    telemetry::{BuyFlowActivityMode, BuyFlowActivityReason},
    toggles::FeatureToggles,
    types::{PaymentDataRequest, PaymentMethodsRequest},
};
use parking_lot::Mutex;

use crate::platform::BrowserEnvironment;

/// Chrome release that shipped payment handlers on desktop.
const MIN_CHROME_PAYMENT_HANDLER: u32 = 70;
/// First Chrome that skips the payment sheet for a single method.
const MIN_CHROME_PAYMENT_REQUEST: u32 = 59;
/// First Android Chrome with dynamic price updates.
const MIN_CHROME_DYNAMIC_UPDATE: u32 = 92;

/// Decides the activity mode once per client, from the browser and client
/// configuration, and refines it per request.
///
/// `reasons` records every decision in order. Per request decisions go to a
/// copy supplied by the caller; the base list never changes after
/// construction.
#[derive(Debug)]
pub struct ActivityModeSelector {
    reasons: Vec<BuyFlowActivityReason>,
    supports_payment_handler: bool,
    supports_payment_request: bool,
    mode: Mutex<BuyFlowActivityMode>,
    toggles: FeatureToggles,
}

impl ActivityModeSelector {
    pub fn new(
        browser: &BrowserEnvironment,
        has_callbacks: bool,
        use_iframe: bool,
        toggles: FeatureToggles,
    ) -> Self {
        let mut reasons = Vec::new();
        let supports_payment_handler = payment_handler_support(browser, has_callbacks, &mut reasons);
        let supports_payment_request = payment_request_support(
            browser,
            has_callbacks,
            supports_payment_handler,
            &toggles,
            &mut reasons,
        );

        let mode = if use_iframe {
            reasons = vec![BuyFlowActivityReason::UseIframe];
            BuyFlowActivityMode::Iframe
        } else if supports_payment_request && supports_payment_handler {
            BuyFlowActivityMode::PaymentHandler
        } else if supports_payment_request {
            BuyFlowActivityMode::AndroidNative
        } else {
            BuyFlowActivityMode::Popup
        };
        if has_callbacks {
            reasons.push(BuyFlowActivityReason::Callbacks);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(?mode, ?reasons, "Selected buy flow activity mode");

        ActivityModeSelector {
            reasons,
            supports_payment_handler,
            supports_payment_request,
            mode: Mutex::new(mode),
            toggles,
        }
    }

    /// A copy of the construction time reasons.
    pub fn reasons(&self) -> Vec<BuyFlowActivityReason> {
        self.reasons.clone()
    }

    pub fn mode(&self) -> BuyFlowActivityMode {
        *self.mode.lock()
    }

    pub fn supports_payment_handler(&self) -> bool {
        self.supports_payment_handler
    }

    pub fn supports_payment_request(&self) -> bool {
        self.supports_payment_request
    }

    /// Mode for one payment data request. Popup and iframe clients never
    /// move to a native mode; native clients fall back to popup when the
    /// request or the nominal probe rules native out.
    ///
    /// `nominal` is the settled nominal "can make payment" answer, `None`
    /// while the probe is still running.
    pub fn mode_per_request(
        &self,
        request: &PaymentDataRequest,
        nominal: Option<bool>,
        reasons: &mut Vec<BuyFlowActivityReason>,
    ) -> BuyFlowActivityMode {
        let mode = self.mode();
        if matches!(
            mode,
            BuyFlowActivityMode::Popup | BuyFlowActivityMode::Iframe
        ) {
            return mode;
        }
        if request.is_native_disabled() {
            reasons.push(BuyFlowActivityReason::NativeDisabled);
            return BuyFlowActivityMode::Popup;
        }
        let probe_applies = self.supports_payment_handler
            || (self.toggles.android_can_make_payment_check && self.supports_payment_request);
        if !nominal.unwrap_or(false) && probe_applies {
            reasons.push(BuyFlowActivityReason::PayjsCanMakePaymentFalse);
            return BuyFlowActivityMode::Popup;
        }
        if self.supports_payment_handler && request.is_subscription() {
            reasons.push(BuyFlowActivityReason::PhSwg);
            return BuyFlowActivityMode::Popup;
        }
        mode
    }

    /// Moves a payment handler client to popup for good.
    pub fn downgrade_payment_handler(&self) {
        let mut mode = self.mode.lock();
        if *mode == BuyFlowActivityMode::PaymentHandler {
            *mode = BuyFlowActivityMode::Popup;
        }
    }
}

fn payment_handler_support(
    browser: &BrowserEnvironment,
    has_callbacks: bool,
    reasons: &mut Vec<BuyFlowActivityReason>,
) -> bool {
    if browser.is_mobile() {
        reasons.push(BuyFlowActivityReason::Mobile);
        return false;
    }
    let chrome_supports = browser.payment_request_available
        && browser
            .chrome_version()
            .is_some_and(|v| v >= MIN_CHROME_PAYMENT_HANDLER)
        && browser.is_google_vendor();
    if !chrome_supports {
        reasons.push(BuyFlowActivityReason::ChromeNoPh);
        return false;
    }
    reasons.push(BuyFlowActivityReason::ChromePhReady);
    if has_callbacks {
        reasons.push(BuyFlowActivityReason::ChromePhDuReady);
    }
    true
}

fn payment_request_support(
    browser: &BrowserEnvironment,
    has_callbacks: bool,
    supports_payment_handler: bool,
    toggles: &FeatureToggles,
    reasons: &mut Vec<BuyFlowActivityReason>,
) -> bool {
    if !browser.payment_request_available {
        reasons.push(BuyFlowActivityReason::NoPr);
        return false;
    }
    // These send a Chrome user agent but cannot serve the native flow.
    if ["OPR/", "OPT/", "SamsungBrowser/"]
        .iter()
        .any(|token| browser.user_agent_contains(token))
    {
        reasons.push(BuyFlowActivityReason::BrowserNoPr);
        return false;
    }
    if supports_payment_handler {
        return true;
    }
    if toggles.native_disabled {
        reasons.push(BuyFlowActivityReason::NativeDisabled);
        return false;
    }

    let chrome_version = browser.chrome_version();
    let chrome_supports = browser.is_android()
        && browser.is_google_vendor()
        && chrome_version.is_some_and(|v| v >= MIN_CHROME_PAYMENT_REQUEST);
    if !chrome_supports {
        reasons.push(BuyFlowActivityReason::NonAndroidOrNoPr);
        return false;
    }
    if !has_callbacks {
        return true;
    }
    if chrome_version.is_none_or(|v| v < MIN_CHROME_DYNAMIC_UPDATE) {
        return false;
    }
    reasons.push(BuyFlowActivityReason::UseClankDuIfSupported);
    if !toggles.clank_dynamic_update {
        reasons.push(BuyFlowActivityReason::ClankDuDisabled);
        return false;
    }
    true
}
