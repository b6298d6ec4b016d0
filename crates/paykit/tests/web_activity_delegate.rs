mod common;

use std::{sync::atomic::Ordering, time::Duration};

use common::{DESKTOP_FIREFOX, Harness, browser, object, settle, v2_request};
use futures::FutureExt;
use paykit::{
    PaymentError, PaymentsClient, PaymentsClientOptions,
    codes::BuyFlowActivityMode,
    ports::ActivityResult,
    types::{IsReadyToPayRequest, IsReadyToPayResponse},
};
use serde_json::json;

const INSTAGRAM_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148 Safari/604.1 Instagram 300.0.0.0";

fn hosted_result() -> ActivityResult {
    ActivityResult {
        origin: "https://pay.google.com".to_string(),
        origin_verified: true,
        secure_channel: true,
        data: json!({"paymentMethodData": {"tokenizationData": {"token": "tok"}}}),
    }
}

fn iframe_client(harness: &Harness) -> PaymentsClient {
    PaymentsClient::with_iframe(PaymentsClientOptions::default(), harness.platform()).unwrap()
}

fn readiness_request(existing_required: bool) -> IsReadyToPayRequest {
    serde_json::from_value(json!({
        "apiVersion": 2,
        "apiVersionMinor": 0,
        "existingPaymentMethodRequired": existing_required,
        "allowedPaymentMethods": [{
            "type": "CARD",
            "parameters": {
                "allowedAuthMethods": ["PAN_ONLY"],
                "allowedCardNetworks": ["VISA"]
            }
        }]
    }))
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_iframe_flow_shows_frame_and_cleans_up() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    let client = iframe_client(&harness);
    assert_eq!(client.async_client().activity_mode(), BuyFlowActivityMode::Iframe);

    let pending = client.load_payment_data(v2_request()).unwrap();
    settle().await;

    let opened = harness.activities.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].target, "iframe");
    assert_eq!(
        opened[0].url,
        "https://pay.google.com/gp/p/ui/pay?origin=https://shop.example&coordination_token="
    );
    let frame = harness.overlay.last_frame().unwrap();
    assert!(frame.visible.load(Ordering::SeqCst));
    assert_eq!(frame.height().as_deref(), Some("0px"));
    assert_eq!(harness.overlay.pushed.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(frame.height().as_deref(), Some("280px"));
    assert!(!frame.centered.load(Ordering::SeqCst));

    harness.activities.last_port().unwrap().finish(Ok(hosted_result()));
    let data = pending.await.unwrap();
    assert_eq!(data["paymentMethodData"]["tokenizationData"]["token"], "tok");

    assert_eq!(harness.overlay.backs.load(Ordering::SeqCst), 1);
    assert_eq!(frame.height().as_deref(), Some("0px"));
    assert_eq!(
        frame.transitions.lock().last().map(String::as_str),
        Some("all 250ms ease 0s")
    );
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!frame.attached.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_back_button_cancels_the_flow() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    let client = iframe_client(&harness);

    let pending = client.load_payment_data(v2_request()).unwrap();
    settle().await;
    harness.overlay.press_back();

    assert_eq!(pending.await.unwrap_err(), PaymentError::canceled());
    let port = harness.activities.last_port().unwrap();
    assert!(port.disconnected.load(Ordering::SeqCst));
    // The browser already went back.
    assert_eq!(harness.overlay.backs.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!harness.overlay.last_frame().unwrap().attached.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_container_click_goes_back_and_cancels() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    let client = iframe_client(&harness);

    let pending = client.load_payment_data(v2_request()).unwrap();
    settle().await;
    harness.overlay.last_frame().unwrap().click_container();

    assert_eq!(pending.await.unwrap_err(), PaymentError::canceled());
    assert_eq!(harness.overlay.backs.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resize_waits_for_show_animation() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    let client = iframe_client(&harness);

    let _pending = client.load_payment_data(v2_request()).unwrap();
    settle().await;
    let frame = harness.overlay.last_frame().unwrap();
    let port = harness.activities.last_port().unwrap();

    port.receive(json!({"type": "resize", "height": "400px", "transition": "height 0.3s"}));
    port.receive(json!({"type": "resize", "height": "420px", "transition": "height 0.3s"}));
    assert_eq!(frame.height().as_deref(), Some("0px"));

    // Only the last saved resize is applied once the frame is up.
    tokio::time::sleep(Duration::from_millis(260)).await;
    assert_eq!(
        *frame.heights.lock(),
        vec!["0px".to_string(), "280px".to_string(), "420px".to_string()]
    );
    assert_eq!(
        frame.transitions.lock().last().map(String::as_str),
        Some("height 0.3s")
    );

    port.receive(json!({"type": "resize", "height": 500, "transition": "height 0.2s"}));
    assert_eq!(frame.height().as_deref(), Some("500"));
    assert_eq!(
        frame.transitions.lock().last().map(String::as_str),
        Some("height 0.2s, height 250ms")
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    port.receive(json!({"type": "resize", "height": "450px", "transition": "height 0.2s"}));
    assert_eq!(frame.height().as_deref(), Some("450px"));
    assert_eq!(
        frame.transitions.lock().last().map(String::as_str),
        Some("height 0.2s")
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_iframe_open_removes_frame() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    harness.activities.fail_open.store(true, Ordering::SeqCst);
    let client = iframe_client(&harness);

    let err = client.load_payment_data(v2_request()).unwrap().await.unwrap_err();
    assert_eq!(err, PaymentError::canceled());

    let frame = harness.overlay.last_frame().unwrap();
    assert_eq!(harness.overlay.pushed.load(Ordering::SeqCst), 1);
    assert_eq!(harness.overlay.backs.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!frame.attached.load(Ordering::SeqCst));
    assert_eq!(frame.height().as_deref(), Some("0px"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_prefetch_is_replaced_on_load() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    let client = iframe_client(&harness);

    harness.activities.fail_open.store(true, Ordering::SeqCst);
    client.prefetch_payment_data(v2_request());
    settle().await;
    let failed = harness.overlay.last_frame().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!failed.attached.load(Ordering::SeqCst));
    // The frame was never shown, so the page history is untouched.
    assert_eq!(harness.overlay.backs.load(Ordering::SeqCst), 0);

    harness.activities.fail_open.store(false, Ordering::SeqCst);
    let pending = client.load_payment_data(v2_request()).unwrap();
    settle().await;
    assert_eq!(harness.overlay.frames.lock().len(), 2);
    assert_eq!(harness.activities.opened().len(), 2);

    harness.activities.last_port().unwrap().finish(Ok(hosted_result()));
    assert!(pending.await.is_ok());
    assert_eq!(harness.overlay.pushed.load(Ordering::SeqCst), 1);
    assert_eq!(harness.overlay.backs.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_load_does_not_answer_the_next_one() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    let client = iframe_client(&harness);

    let first = client.load_payment_data(v2_request()).unwrap();
    settle().await;
    let first_port = harness.activities.last_port().unwrap();
    let first_frame = harness.overlay.last_frame().unwrap();
    drop(first);

    let mut request = v2_request();
    request.transaction_info.as_mut().unwrap().total_price = Some("99.00".to_string());
    let mut second = client.load_payment_data(request).unwrap();
    settle().await;
    assert!(first_port.disconnected.load(Ordering::SeqCst));

    first_port.finish(Ok(ActivityResult {
        data: json!({"from": "first flow"}),
        ..hosted_result()
    }));
    settle().await;
    assert!((&mut second).now_or_never().is_none());
    // The newer frame took over the history entry.
    assert_eq!(harness.overlay.pushed.load(Ordering::SeqCst), 1);

    harness.activities.last_port().unwrap().finish(Ok(hosted_result()));
    let data = second.await.unwrap();
    assert_eq!(data["paymentMethodData"]["tokenizationData"]["token"], "tok");
    assert_eq!(harness.overlay.backs.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!first_frame.attached.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_prefetched_frame_is_reused_for_the_same_purchase() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    let client = iframe_client(&harness);

    client.prefetch_payment_data(v2_request());
    settle().await;
    assert_eq!(harness.activities.opened().len(), 1);
    let frame = harness.overlay.last_frame().unwrap();
    assert!(!frame.visible.load(Ordering::SeqCst));

    let pending = client.load_payment_data(v2_request()).unwrap();
    settle().await;
    assert_eq!(harness.activities.opened().len(), 1);
    assert_eq!(harness.overlay.frames.lock().len(), 1);
    assert!(frame.visible.load(Ordering::SeqCst));

    harness.activities.last_port().unwrap().finish(Ok(hosted_result()));
    assert!(pending.await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_stale_prefetch_is_discarded() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    let client = iframe_client(&harness);

    client.prefetch_payment_data(v2_request());
    settle().await;
    let stale = harness.overlay.last_frame().unwrap();

    let mut request = v2_request();
    request.transaction_info.as_mut().unwrap().total_price = Some("15.00".to_string());
    let pending = client.load_payment_data(request).unwrap();
    settle().await;

    assert!(!stale.attached.load(Ordering::SeqCst));
    assert_eq!(harness.overlay.frames.lock().len(), 2);
    assert_eq!(harness.activities.opened().len(), 2);

    harness.activities.last_port().unwrap().finish(Ok(hosted_result()));
    assert!(pending.await.is_ok());
}

#[tokio::test]
async fn test_readiness_round_trip_with_pay_frame() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    let client = PaymentsClient::new(PaymentsClientOptions::default(), harness.platform()).unwrap();

    let (response, delivered) = tokio::join!(client.is_ready_to_pay(readiness_request(true)), async {
        settle().await;
        harness
            .page
            .telemetry()
            .deliver(&object(json!({"isReadyToPayResponse": "READY_TO_PAY"})))
    });
    assert!(delivered);
    assert_eq!(
        response.unwrap(),
        IsReadyToPayResponse::new(true).with_payment_method_present(true)
    );

    let asked = harness.sink.with_event_type(6);
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0]["environment"], "TEST");
    assert_eq!(asked[0]["existingPaymentMethodRequired"], true);
}

#[tokio::test]
async fn test_readiness_error_from_pay_frame() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    let client = PaymentsClient::new(PaymentsClientOptions::default(), harness.platform()).unwrap();

    let (response, _) = tokio::join!(client.is_ready_to_pay(readiness_request(true)), async {
        settle().await;
        harness
            .page
            .telemetry()
            .deliver(&object(json!({"isReadyToPayError": "merchant unknown"})))
    });
    assert_eq!(
        response.unwrap_err(),
        PaymentError::developer_error("Ready to pay error. Cause : merchant unknown")
    );
}

#[tokio::test]
async fn test_in_app_browsers_are_not_ready() {
    let harness = Harness::new(browser(INSTAGRAM_IPHONE));
    let client = PaymentsClient::new(PaymentsClientOptions::default(), harness.platform()).unwrap();
    let response = client.is_ready_to_pay(readiness_request(false)).await.unwrap();
    assert!(!response.result);

    // The iframe flow does not need a popup.
    let harness = Harness::new(browser(INSTAGRAM_IPHONE));
    let client = iframe_client(&harness);
    let response = client.is_ready_to_pay(readiness_request(false)).await.unwrap();
    assert!(response.result);
}

#[tokio::test]
async fn test_tokenized_only_requests_are_not_ready_on_the_web() {
    let harness = Harness::new(browser(DESKTOP_FIREFOX));
    let client = PaymentsClient::new(PaymentsClientOptions::default(), harness.platform()).unwrap();
    let request: IsReadyToPayRequest = serde_json::from_value(json!({
        "apiVersion": 2,
        "apiVersionMinor": 0,
        "allowedPaymentMethods": [{
            "type": "CARD",
            "parameters": {
                "allowedAuthMethods": ["CRYPTOGRAM_3DS"],
                "allowedCardNetworks": ["VISA"]
            }
        }]
    }))
    .unwrap();
    assert!(!client.is_ready_to_pay(request).await.unwrap().result);
}
