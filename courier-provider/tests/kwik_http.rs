use axum::{http::StatusCode, routing::post, Json, Router};
use courier_core::{DeliveryProvider, DeliverySettings, DeliveryStatusHint, DispatchData, EstimateRequest, Location, Parcel};
use courier_provider::{KwikConfig, KwikProvider};
use serde_json::{json, Value};
use uuid::Uuid;

/// Serves `router` on an ephemeral local port and returns its base URL.
async fn spawn_kwik(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn provider(base_url: &str) -> KwikProvider {
    KwikProvider::new(KwikConfig::new("sk_test_123", "merchant-1").with_base_url(base_url)).unwrap()
}

fn settings() -> DeliverySettings {
    let mut settings = DeliverySettings::new(Uuid::new_v4());
    settings.pickup_name = Some("Mama Put Foods".to_string());
    settings.pickup_phone = Some("08099999999".to_string());
    settings.pickup_address_line1 = Some("1 Marina".to_string());
    settings.pickup_city = Some("Lagos".to_string());
    settings
}

fn dispatch_data() -> DispatchData {
    DispatchData {
        order_id: Uuid::new_v4(),
        order_number: "1001".to_string(),
        recipient_name: "Ada Obi".to_string(),
        recipient_phone: "08012345678".to_string(),
        address_line1: "5 Bode Thomas St".to_string(),
        address_city: "Surulere".to_string(),
        parcel_description: "Order #1001".to_string(),
    }
}

#[tokio::test]
async fn test_insufficient_funds_is_classified() {
    let router = Router::new().route(
        "/v1/tasks",
        post(|| async {
            (StatusCode::PAYMENT_REQUIRED, r#"{"message":"insufficient funds in merchant wallet"}"#)
        }),
    );
    let base_url = spawn_kwik(router).await;

    let result = provider(&base_url).dispatch(&dispatch_data(), &settings()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("INSUFFICIENT_FUNDS"));
    assert_eq!(result.status_hint, DeliveryStatusHint::Failed);
    assert!(result.raw_response.is_some());
}

#[tokio::test]
async fn test_generic_rejection_keeps_body() {
    let router = Router::new().route(
        "/v1/tasks",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream unavailable") }),
    );
    let base_url = spawn_kwik(router).await;

    let result = provider(&base_url).dispatch(&dispatch_data(), &settings()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Kwik API Error: 502 - upstream unavailable"));
}

#[tokio::test]
async fn test_successful_dispatch_sends_payload_and_extracts_tracking() {
    let router = Router::new().route(
        "/v1/tasks",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["delivery"]["address"], "5 Bode Thomas St");
            assert_eq!(body["pickup"]["address"], "1 Marina");
            Json(json!({
                "status": 200,
                "data": {"job_id": 77881, "result_tracking_link": "https://track.kwik.delivery/77881"}
            }))
        }),
    );
    let base_url = spawn_kwik(router).await;

    let result = provider(&base_url).dispatch(&dispatch_data(), &settings()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.provider_job_id.as_deref(), Some("77881"));
    assert_eq!(result.tracking_url.as_deref(), Some("https://track.kwik.delivery/77881"));
    assert_eq!(result.status_hint, DeliveryStatusHint::TrackingAvailable);
}

#[tokio::test]
async fn test_error_envelope_on_http_200() {
    let router = Router::new().route(
        "/v1/tasks",
        post(|| async { Json(json!({"status": 402, "message": "Insufficient balance"})) }),
    );
    let base_url = spawn_kwik(router).await;

    let result = provider(&base_url).dispatch(&dispatch_data(), &settings()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("INSUFFICIENT_FUNDS"));
}

#[tokio::test]
async fn test_cancel_already_delivered_is_a_failure_result() {
    let router = Router::new().route(
        "/v1/tasks/{job_id}/cancel",
        post(|| async { (StatusCode::CONFLICT, "Task has already been delivered") }),
    );
    let base_url = spawn_kwik(router).await;

    let result = provider(&base_url).cancel("77881").await.unwrap();

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("ALREADY_DELIVERED"));
}

#[tokio::test]
async fn test_estimate_quote() {
    let router = Router::new().route(
        "/v1/tasks/estimate",
        post(|| async { Json(json!({"data": {"estimated_price": "2500.50", "currency": "NGN", "eta_minutes": 45}})) }),
    );
    let base_url = spawn_kwik(router).await;

    let request = EstimateRequest {
        origin: Location { name: None, phone: None, address_line1: "1 Marina".to_string(), city: Some("Lagos".to_string()) },
        destination: Location { name: None, phone: None, address_line1: "5 Bode Thomas St".to_string(), city: Some("Lagos".to_string()) },
        parcel: Parcel { description: "Shoes".to_string(), weight_kg: Some(1.5) },
    };
    let estimate = provider(&base_url).get_estimate(&request).await.unwrap();

    assert!(estimate.success);
    assert_eq!(estimate.amount_minor, Some(250050));
    assert_eq!(estimate.currency.as_deref(), Some("NGN"));
    assert_eq!(estimate.eta_minutes, Some(45));
}

#[tokio::test]
async fn test_unreachable_host_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = provider(&format!("http://{}", addr)).dispatch(&dispatch_data(), &settings()).await;

    assert!(matches!(result, Err(courier_core::ProviderError::Transport(_))));
}

#[tokio::test]
async fn test_plain_text_success_is_a_decode_error() {
    let router = Router::new()
        .route("/v1/tasks", post(|| async { (StatusCode::OK, "OK") }))
        .route("/v1/tasks/estimate", post(|| async { (StatusCode::OK, "<html>maintenance</html>") }));
    let base_url = spawn_kwik(router).await;

    let result = provider(&base_url).dispatch(&dispatch_data(), &settings()).await;
    assert!(matches!(result, Err(courier_core::ProviderError::Decode(_))));

    let request = EstimateRequest {
        origin: Location { name: None, phone: None, address_line1: "1 Marina".to_string(), city: None },
        destination: Location { name: None, phone: None, address_line1: "5 Bode Thomas St".to_string(), city: None },
        parcel: Parcel { description: "Shoes".to_string(), weight_kg: None },
    };
    let estimate = provider(&base_url).get_estimate(&request).await;
    assert!(matches!(estimate, Err(courier_core::ProviderError::Decode(_))));
}

#[tokio::test]
async fn test_cancel_escapes_job_id_in_path() {
    let router = Router::new().route(
        "/v1/tasks/{job_id}/cancel",
        post(|axum::extract::Path(job_id): axum::extract::Path<String>| async move {
            assert_eq!(job_id, "J 1/2");
            Json(json!({"status": 200}))
        }),
    );
    let base_url = spawn_kwik(router).await;

    let result = provider(&base_url).cancel("J 1/2").await.unwrap();

    assert!(result.success);
}
