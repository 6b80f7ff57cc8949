use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod dispatch;
pub mod error;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderName::from_static(dispatch::IDEMPOTENCY_KEY_HEADER),
        ]);

    Router::new()
        .route("/health", get(dispatch::health))
        .route("/v1/orders/{order_id}/dispatch", post(dispatch::dispatch_order))
        .route("/v1/orders/{order_id}/shipment/cancel", post(dispatch::cancel_shipment))
        .route("/v1/delivery/estimate", post(dispatch::estimate_delivery))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
