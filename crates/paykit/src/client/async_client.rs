use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use paykit_core::{
    constants::{auth_method, payment_method},
    context::{is_trusted_domain, resolve_transaction_id},
    errors::{StatusCode, StatusError},
    telemetry::{
        BuyFlowActivityMode, BuyFlowActivityReason, BuyFlowMode, PostMessageEventType,
        PublicErrorCode,
    },
    types::{
        AllowedPaymentMethod, AnyJson, ButtonInfo, ButtonOptions, Environment,
        InternalParameters, IsReadyToPayRequest, IsReadyToPayResponse, JsonObject,
        PaymentDataRequest, PaymentMethodsRequest,
    },
    validator::{
        ValidationError, validate_callback_parameters, validate_is_ready_to_pay_request,
        validate_payment_data_request, validate_secure_context,
    },
};
use parking_lot::Mutex;

use super::PaymentsClientOptions;
use crate::{
    delegates::{
        FlowId, PaymentRequestDelegate, PaymentResult, PaymentsClientDelegate, ResultHandler,
        WebActivityDelegate,
    },
    errors::{ClientError, PaymentError},
    page::PageContext,
    platform::{BrowserEnvironment, Platform},
    ports::ButtonRenderer,
    selector::ActivityModeSelector,
    telemetry::{EventRecord, TelemetryChannel, is_truthy, now_ms},
};

/// Payment client that hands load results to a handler instead of returning
/// them.
///
/// Whichever delegate serves a load, its result goes through the same
/// handler, so a result always reaches the caller exactly once per flow.
#[derive(Clone)]
pub struct PaymentsAsyncClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    options: PaymentsClientOptions,
    environment: Environment,
    transaction_id: String,
    browser: BrowserEnvironment,
    page: Arc<PageContext>,
    telemetry: Arc<TelemetryChannel>,
    selector: ActivityModeSelector,
    /// The native delegate on native capable browsers, the web one otherwise.
    delegate: Arc<dyn PaymentsClientDelegate>,
    web: Arc<dyn PaymentsClientDelegate>,
    on_payment_response: ResultHandler,
    merchant_id: Mutex<String>,
    buy_flow_mode: Mutex<BuyFlowMode>,
    button_info: Mutex<Option<ButtonInfo>>,
    load_started_ms: Mutex<Option<i64>>,
    next_flow: AtomicU64,
}

impl PaymentsAsyncClient {
    /// Creates a client on `platform`. `on_payment_response` receives the
    /// outcome of every [`PaymentsAsyncClient::load_payment_data`] call,
    /// tagged with the flow the call returned.
    pub fn new(
        options: PaymentsClientOptions,
        platform: Platform,
        use_iframe: bool,
        on_payment_response: ResultHandler,
    ) -> Result<Self, ClientError> {
        let environment = options.validate()?;
        let page = platform.page.clone();
        let telemetry = page.telemetry().clone();
        let toggles = options.toggles;
        telemetry.set_debug_logging(toggles.debug_logging);
        page.load_pay_frame(&platform.browser.location_origin);

        let supplied_id = options
            .i
            .as_ref()
            .and_then(|i| i.google_transaction_id.as_deref());
        let transaction_id = page
            .transaction_id_or_init(|| {
                resolve_transaction_id(&platform.browser.hostname, supplied_id, environment)
            })
            .to_string();

        let callbacks = options.payment_data_callbacks.clone();
        let selector = ActivityModeSelector::new(
            &platform.browser,
            callbacks.is_some(),
            use_iframe,
            toggles,
        );
        page.start_nominal_probe(platform.payment_request.as_ref());

        let web: Arc<dyn PaymentsClientDelegate> = Arc::new(
            WebActivityDelegate::new(
                environment,
                &platform,
                use_iframe,
                options.redirect_key(),
                toggles,
            )
            .with_request_timeout(options.callback_timeout),
        );
        let delegate: Arc<dyn PaymentsClientDelegate> = if selector.mode().is_native() {
            Arc::new(
                PaymentRequestDelegate::new(
                    environment,
                    platform.payment_request.clone(),
                    page.clone(),
                )
                .with_request_timeout(options.callback_timeout),
            )
        } else {
            web.clone()
        };
        if let Some(callbacks) = callbacks {
            delegate.register_payment_data_callbacks(callbacks.clone());
            // Native clients may still fall back to the web delegate per request.
            web.register_payment_data_callbacks(callbacks);
        }

        let inner = Arc::new(ClientInner {
            merchant_id: Mutex::new(options.merchant_id().unwrap_or_default().to_string()),
            options,
            environment,
            transaction_id,
            browser: platform.browser.clone(),
            page,
            telemetry,
            selector,
            delegate,
            web,
            on_payment_response,
            buy_flow_mode: Mutex::new(BuyFlowMode::PayWithGoogle),
            button_info: Mutex::new(None),
            load_started_ms: Mutex::new(None),
            next_flow: AtomicU64::new(1),
        });

        let weak = Arc::downgrade(&inner);
        let handler: ResultHandler = Arc::new(move |flow, result| {
            if let Some(inner) = weak.upgrade() {
                inner.on_result(flow, result);
            }
        });
        inner.web.on_result(handler.clone());
        inner.delegate.on_result(handler);

        inner
            .telemetry
            .set_buy_flow_activity_mode(inner.selector.mode());
        inner
            .telemetry
            .set_transaction_id(inner.transaction_id.clone());
        inner.telemetry.post_record(
            EventRecord::builder()
                .event_type(PostMessageEventType::LogInitializePaymentsClient)
                .client_latency_start_ms(now_ms())
                .buy_flow_activity_reason(inner.selector.reasons())
                .maybe_software_info(inner.software_info())
                .build(),
        );

        #[cfg(feature = "tracing")]
        tracing::debug!(
            environment = %inner.environment,
            mode = ?inner.selector.mode(),
            "Payments client initialized"
        );

        Ok(PaymentsAsyncClient { inner })
    }

    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    pub fn transaction_id(&self) -> &str {
        &self.inner.transaction_id
    }

    /// The mode picked for this browser at construction.
    pub fn activity_mode(&self) -> BuyFlowActivityMode {
        self.inner.selector.mode()
    }

    pub fn activity_reasons(&self) -> Vec<BuyFlowActivityReason> {
        self.inner.selector.reasons()
    }

    /// Checks whether the buyer can pay with the given methods.
    ///
    /// Client level `environment`, `merchantInfo` and `i` fill the request
    /// where it leaves them unset.
    pub async fn is_ready_to_pay(
        &self,
        request: IsReadyToPayRequest,
    ) -> Result<IsReadyToPayResponse, PaymentError> {
        let inner = &self.inner;
        let request = inner.merge_readiness_request(request);
        *inner.merchant_id.lock() = request
            .merchant_info
            .as_ref()
            .and_then(|m| m.merchant_id.clone())
            .unwrap_or_default();

        let start_ms = now_ms();
        inner.telemetry.post_record(
            EventRecord::builder()
                .event_type(PostMessageEventType::LogIsReadyToPayCalled)
                .client_latency_start_ms(start_ms)
                .buy_flow_activity_reason(inner.selector.reasons())
                .maybe_software_info(inner.software_info())
                .build(),
        );

        let validation = inner.validate_secure_context().and_then(|()| {
            validate_is_ready_to_pay_request(&request, &inner.options.toggles)
        });
        if let Err(error) = validation {
            log_developer_error("isReadyToPay", error.message());
            inner.telemetry.post_record(
                EventRecord::builder()
                    .event_type(PostMessageEventType::LogIsReadyToPayApi)
                    .buy_flow_activity_reason(inner.selector.reasons())
                    .error(PublicErrorCode::DeveloperError)
                    .maybe_software_info(inner.software_info())
                    .build(),
            );
            return Err(PaymentError::developer_error(error.message()));
        }

        let mut reasons = inner.selector.reasons();
        let mut result = inner.readiness(&request, &mut reasons).await;
        if request.activity_mode_required == Some(true) {
            let can_make_payment = inner.page.can_make_payment().await;
            if let Ok(response) = result.as_mut() {
                if !can_make_payment {
                    reasons.push(BuyFlowActivityReason::PayjsCanMakePaymentFalse);
                    inner.selector.downgrade_payment_handler();
                }
                response.activity_mode = Some(inner.selector.mode());
            }
        }

        let record = EventRecord::builder()
            .event_type(PostMessageEventType::LogIsReadyToPayApi)
            .buy_flow_activity_reason(reasons)
            .maybe_software_info(inner.software_info())
            .is_ready_to_pay_request(request);
        let record = match &result {
            Ok(response) => record
                .client_latency_start_ms(start_ms)
                .is_ready_to_pay_api_response(*response)
                .build(),
            Err(error) => record
                .error(
                    error
                        .status_code()
                        .map_or(PublicErrorCode::InternalError, PublicErrorCode::from_status),
                )
                .build(),
        };
        inner.telemetry.post_record(record);
        result
    }

    /// Warms up the flow for `request`. Invalid requests are only logged.
    pub fn prefetch_payment_data(&self, mut request: PaymentDataRequest) {
        let inner = &self.inner;
        let validation = inner.validate_secure_context().and_then(|()| {
            validate_payment_data_request(&request, &inner.options.toggles)
        });
        if let Err(error) = validation {
            log_developer_error("prefetchPaymentData", error.message());
            return;
        }
        inner.assign_internal_params(&mut request);
        if inner.selector.supports_payment_request() && !request.is_native_disabled() {
            inner.delegate.prefetch_payment_data(request);
        } else {
            inner.web.prefetch_payment_data(request);
        }
    }

    /// Starts a buy flow. The outcome goes to the response handler, including
    /// validation failures.
    pub fn load_payment_data(&self, request: PaymentDataRequest) -> FlowId {
        let flow = self.next_flow_id();
        self.start_flow(flow, request);
        flow
    }

    pub(crate) fn next_flow_id(&self) -> FlowId {
        FlowId(self.inner.next_flow.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn start_flow(&self, flow: FlowId, mut request: PaymentDataRequest) {
        let inner = &self.inner;
        let mut reasons = inner.selector.reasons();

        let validation = inner.validate_secure_context().and_then(|()| {
            validate_payment_data_request(&request, &inner.options.toggles)
        });
        *inner.buy_flow_mode.lock() = if request.is_subscription() {
            BuyFlowMode::SubscribeWithGoogle
        } else {
            BuyFlowMode::PayWithGoogle
        };
        // Another client on the page may have changed the shared mode.
        inner
            .telemetry
            .set_buy_flow_activity_mode(inner.selector.mode());
        if let Err(error) = validation {
            inner.reject_load(flow, error);
            inner.post_button_click(&reasons);
            return;
        }

        let callbacks = inner.options.payment_data_callbacks.as_ref();
        if callbacks.is_some() || request.callback_intents.is_some() {
            let registered = callbacks.map(|c| c.registered());
            if let Err(error) =
                validate_callback_parameters(&request, registered, &inner.options.toggles)
            {
                inner.reject_load(flow, error);
                inner.post_button_click(&reasons);
                return;
            }
        }

        *inner.load_started_ms.lock() = Some(now_ms());
        let mode =
            inner
                .selector
                .mode_per_request(&request, inner.page.nominal_result(), &mut reasons);
        let delegate = if mode.is_native() {
            &inner.delegate
        } else {
            &inner.web
        };
        if mode != inner.selector.mode() {
            inner.telemetry.set_buy_flow_activity_mode(mode);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(?mode, ?reasons, "Loading payment data");

        inner.assign_internal_params(&mut request);
        inner.post_button_click(&reasons);
        if let Err(error) = delegate.load_payment_data(flow, request) {
            inner.on_result(Some(flow), Err(error));
        }
    }

    /// Renders a payment button through `renderer`.
    pub fn create_button<R: ButtonRenderer>(
        &self,
        renderer: &R,
        options: ButtonOptions,
        on_click: impl Fn() + Send + Sync + 'static,
    ) -> R::Element {
        let inner = &self.inner;
        let button_info = ButtonInfo::from(&options);
        *inner.button_info.lock() = Some(button_info);
        let merchant_id = inner.merchant_id.lock().clone();
        let element = renderer.render(options.style(), &merchant_id, Arc::new(on_click));
        inner.telemetry.post_record(
            EventRecord::builder()
                .event_type(PostMessageEventType::LogRenderButton)
                .client_latency_start_ms(now_ms())
                .buy_flow_activity_reason(inner.selector.reasons())
                .maybe_software_info(inner.software_info())
                .button_info(button_info)
                .build(),
        );
        element
    }

    /// Handles a `message` event posted to the merchant page.
    ///
    /// Embedders on trusted domains forward their own records as
    /// `{name: "logPaymentData", data}`.
    pub fn handle_page_message(&self, message: &JsonObject) {
        if !is_trusted_domain(&self.inner.browser.hostname) {
            return;
        }
        if message.get("name").and_then(AnyJson::as_str) != Some("logPaymentData") {
            return;
        }
        if let Some(AnyJson::Object(data)) = message.get("data") {
            self.inner.telemetry.post(data.clone());
        }
    }
}

impl ClientInner {
    fn software_info(&self) -> Option<AnyJson> {
        self.options
            .merchant_info
            .as_ref()
            .and_then(|m| m.software_info.clone())
    }

    fn validate_secure_context(&self) -> Result<(), ValidationError> {
        validate_secure_context(
            &self.browser.hostname,
            self.browser.is_secure_context,
            self.options.toggles.local_secure_bypass,
        )
    }

    fn merge_readiness_request(&self, mut request: IsReadyToPayRequest) -> IsReadyToPayRequest {
        if request.environment.is_none() && self.options.environment.is_some() {
            request.environment = Some(self.environment);
        }
        if request.merchant_info.is_none() {
            request.merchant_info = self.options.merchant_info.clone();
        }
        if request.i.is_none() {
            request.i = self.options.i.clone();
        }
        request
    }

    fn checks_native_readiness(&self, request: &IsReadyToPayRequest) -> bool {
        if request.is_native_disabled() {
            return false;
        }
        if self.options.toggles.native_ready_to_pay_android_only {
            self.selector.mode() == BuyFlowActivityMode::AndroidNative
        } else {
            self.selector.supports_payment_request()
        }
    }

    async fn readiness(
        &self,
        request: &IsReadyToPayRequest,
        reasons: &mut Vec<BuyFlowActivityReason>,
    ) -> Result<IsReadyToPayResponse, PaymentError> {
        if !self.checks_native_readiness(request) {
            return self.web.is_ready_to_pay(request.clone()).await;
        }
        if request.is_v2() {
            return self.readiness_v2(request, reasons).await;
        }

        let web = self.web.is_ready_to_pay(request.clone());
        let native = self.delegate.is_ready_to_pay(request.clone());
        if request.supports_only_tokenized_cards() && !self.selector.supports_payment_handler() {
            reasons.push(BuyFlowActivityReason::V1OnlyTokenized);
            return native.await;
        }
        reasons.push(BuyFlowActivityReason::V1);
        native.await?;
        web.await
    }

    /// Version 2 readiness on native capable browsers. The native API is
    /// only asked about tokenized cards since it always accepts PAN_ONLY.
    async fn readiness_v2(
        &self,
        request: &IsReadyToPayRequest,
        reasons: &mut Vec<BuyFlowActivityReason>,
    ) -> Result<IsReadyToPayResponse, PaymentError> {
        let fallback = if request.existing_payment_method_required() {
            IsReadyToPayResponse::new(false).with_payment_method_present(false)
        } else {
            IsReadyToPayResponse::new(false)
        };

        let native = if request.supports_card_auth_method(auth_method::CRYPTOGRAM_3DS) {
            reasons.push(BuyFlowActivityReason::V2ThreeDs);
            Some(self.delegate.is_ready_to_pay(tokenized_only(request)))
        } else {
            None
        };
        let web = if request.supports_card_auth_method(auth_method::PAN_ONLY) {
            reasons.push(BuyFlowActivityReason::V2PanOnly);
            Some(self.web.is_ready_to_pay(request.clone()))
        } else {
            None
        };

        let native_result = match native {
            Some(native) => native.await?,
            None => fallback,
        };
        // Payment handler browsers only refresh the cached native answer.
        if self.selector.supports_payment_handler() {
            reasons.push(BuyFlowActivityReason::FallThrough);
        } else if native_result.result {
            return Ok(native_result);
        }
        match web {
            Some(web) => web.await,
            None => Ok(fallback),
        }
    }

    fn assign_internal_params(&self, request: &mut PaymentDataRequest) {
        let defaults = InternalParameters::builder()
            .google_transaction_id(self.transaction_id.clone())
            .using_pay_js(true)
            .build();
        let i = request.internal_params_mut();
        i.fill_from(&defaults);
        // Only client options may name a first party merchant.
        i.first_party_merchant_identifier = self
            .options
            .i
            .as_ref()
            .and_then(|i| i.first_party_merchant_identifier.clone());
    }

    fn post_button_click(&self, reasons: &[BuyFlowActivityReason]) {
        let reasons = if reasons.is_empty() {
            vec![BuyFlowActivityReason::FallThrough]
        } else {
            reasons.to_vec()
        };
        self.telemetry.post_record(
            EventRecord::builder()
                .event_type(PostMessageEventType::LogButtonClick)
                .buy_flow_activity_reason(reasons)
                .maybe_software_info(self.software_info())
                .maybe_button_info(*self.button_info.lock())
                .build(),
        );
    }

    fn reject_load(&self, flow: FlowId, error: ValidationError) {
        self.telemetry.post_record(
            EventRecord::builder()
                .event_type(PostMessageEventType::LogLoadPaymentDataApi)
                .error(PublicErrorCode::DeveloperError)
                .buy_flow_mode(*self.buy_flow_mode.lock())
                .maybe_software_info(self.software_info())
                .maybe_button_info(*self.button_info.lock())
                .build(),
        );
        log_developer_error("loadPaymentData", error.message());
        (self.on_payment_response)(
            Some(flow),
            Err(PaymentError::developer_error(error.message())),
        );
    }

    /// Terminal result of a delegate flow.
    fn on_result(&self, flow: Option<FlowId>, result: PaymentResult) {
        let result = result.and_then(|data| match in_band_error(&data) {
            Some(error) => {
                log_developer_error(
                    "loadPaymentData",
                    error.status_message.as_deref().unwrap_or_default(),
                );
                Err(PaymentError::Status(error))
            }
            None => Ok(data),
        });

        let record = EventRecord::builder()
            .event_type(PostMessageEventType::LogLoadPaymentDataApi)
            .buy_flow_mode(*self.buy_flow_mode.lock())
            .buy_flow_activity_reason(self.selector.reasons())
            .maybe_software_info(self.software_info())
            .maybe_button_info(*self.button_info.lock());
        let record = match &result {
            Ok(_) => record
                .maybe_client_latency_start_ms(*self.load_started_ms.lock())
                .build(),
            Err(error) => {
                // Buyers closing the window leave no usable code.
                let code = error
                    .status_code()
                    .map(PublicErrorCode::from_status)
                    .filter(|code| *code != PublicErrorCode::UnknownErrorType)
                    .unwrap_or(PublicErrorCode::BuyerCancel);
                record.error(code).build()
            }
        };
        self.telemetry.post_record(record);

        (self.on_payment_response)(flow, result);
    }
}

/// The `error` object a successful transport may still carry.
fn in_band_error(data: &JsonObject) -> Option<StatusError> {
    let error = data.get("error").filter(|e| is_truthy(e))?;
    let status_code = error
        .get("statusCode")
        .and_then(AnyJson::as_str)
        .map_or(StatusCode::InternalError, StatusCode::from);
    let status_message = error
        .get("statusMessage")
        .and_then(AnyJson::as_str)
        .map(str::to_string);
    Some(StatusError {
        status_code,
        status_message,
    })
}

/// Narrows CARD methods to CRYPTOGRAM_3DS.
fn tokenized_only(request: &IsReadyToPayRequest) -> IsReadyToPayRequest {
    let mut request = request.clone();
    for method in request.allowed_payment_methods.iter_mut().flatten() {
        if let AllowedPaymentMethod::Method(method) = method {
            if method.method_type == payment_method::CARD {
                method
                    .parameters
                    .get_or_insert_with(Default::default)
                    .allowed_auth_methods = Some(vec![auth_method::CRYPTOGRAM_3DS.to_string()]);
            }
        }
    }
    request
}

fn log_developer_error(_api_name: &str, _message: &str) {
    #[cfg(feature = "tracing")]
    tracing::error!("DEVELOPER_ERROR in {_api_name} : {_message}");
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_in_band_error() {
        let data: JsonObject = serde_json::from_value(json!({
            "error": {"statusCode": "BUYER_ACCOUNT_ERROR", "statusMessage": "closed"}
        }))
        .unwrap();
        assert_eq!(
            in_band_error(&data),
            Some(StatusError::new(StatusCode::BuyerAccountError, "closed"))
        );

        let data: JsonObject = serde_json::from_value(json!({"error": {}})).unwrap();
        assert_eq!(
            in_band_error(&data).map(|e| e.status_code),
            Some(StatusCode::InternalError)
        );

        let data: JsonObject =
            serde_json::from_value(json!({"error": null, "paymentMethodData": {}})).unwrap();
        assert_eq!(in_band_error(&data), None);
    }

    #[test]
    fn test_tokenized_only_rewrites_card_methods() {
        let request: IsReadyToPayRequest = serde_json::from_value(json!({
            "apiVersion": 2,
            "apiVersionMinor": 0,
            "allowedPaymentMethods": [
                {"type": "CARD", "parameters": {
                    "allowedAuthMethods": ["PAN_ONLY", "CRYPTOGRAM_3DS"],
                    "allowedCardNetworks": ["VISA"]
                }},
                {"type": "PAYPAL", "parameters": {"allowedAuthMethods": ["PAN_ONLY"]}}
            ]
        }))
        .unwrap();
        let narrowed = serde_json::to_value(tokenized_only(&request)).unwrap();
        assert_eq!(
            narrowed["allowedPaymentMethods"][0]["parameters"]["allowedAuthMethods"],
            json!(["CRYPTOGRAM_3DS"])
        );
        assert_eq!(
            narrowed["allowedPaymentMethods"][1]["parameters"]["allowedAuthMethods"],
            json!(["PAN_ONLY"])
        );
        assert!(request.supports_card_auth_method(auth_method::PAN_ONLY));
    }
}
