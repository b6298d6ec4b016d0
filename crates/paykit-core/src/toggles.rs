use bon::Builder;

/// Switches for behavior that is still experimental or rolled out per build.
///
/// Everything except `local_secure_bypass` defaults to off.
#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureToggles {
    /// Accept UPI payment methods and enforce their extra request rules.
    /// When off, any request listing UPI is rejected.
    #[builder(default)]
    pub upi_validation: bool,
    /// `OFFER` callback intent requires `onPaymentDataChanged`.
    #[builder(default)]
    pub offer_callback_intent: bool,
    /// `PAYMENT_METHOD` callback intent requires `onPaymentDataChanged`.
    #[builder(default)]
    pub payment_method_callback_intent: bool,
    /// Treat Opera Touch and UCBrowser as popup capable, and UCMini as not.
    #[builder(default)]
    pub additional_browser_support: bool,
    /// Disable the native payment-request path for every request.
    #[builder(default)]
    pub native_disabled: bool,
    /// Allow native dynamic price updates on Android Chrome 92+.
    #[builder(default)]
    pub clank_dynamic_update: bool,
    /// Downgrade Android native to popup when the nominal probe is false.
    #[builder(default)]
    pub android_can_make_payment_check: bool,
    /// Only ask the native delegate for readiness in ANDROID_NATIVE mode.
    #[builder(default)]
    pub native_ready_to_pay_android_only: bool,
    /// Close the popup when the merchant page unloads.
    #[builder(default)]
    pub close_popup_on_unload: bool,
    /// Skip the secure-context check on `*.google.com` hosts.
    #[builder(default = true)]
    pub local_secure_bypass: bool,
    /// Log every telemetry record before it is posted.
    #[builder(default)]
    pub debug_logging: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        FeatureToggles::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let toggles = FeatureToggles::default();
        assert!(!toggles.upi_validation);
        assert!(!toggles.native_disabled);
        assert!(!toggles.clank_dynamic_update);
        assert!(toggles.local_secure_bypass);
    }
}
