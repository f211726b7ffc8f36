//! HTTP handlers and the router tying them to paths.

pub mod buyers;
pub mod documents;
pub mod properties;
pub mod receipts;
pub mod subdivisions;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::application::state::AppState;
use crate::auth::require_auth;
use crate::rate_limit::rate_limit_middleware;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/properties",
            get(properties::list_properties).post(properties::create_property),
        )
        .route(
            "/properties/:id",
            get(properties::get_property)
                .put(properties::update_property)
                .delete(properties::delete_property),
        )
        .route("/properties/:id/sale", post(properties::sell_property))
        .route(
            "/properties/:id/payments",
            get(properties::list_property_payments).post(properties::record_property_payment),
        )
        .route(
            "/properties/:id/subdivisions",
            get(properties::list_subdivisions).post(properties::create_subdivision),
        )
        .route(
            "/subdivisions/:id",
            get(subdivisions::get_subdivision)
                .put(subdivisions::update_subdivision)
                .delete(subdivisions::delete_subdivision),
        )
        .route("/subdivisions/:id/sale", post(subdivisions::sell_subdivision))
        .route("/subdivisions/:id/hold", post(subdivisions::place_hold))
        .route("/subdivisions/:id/recall", post(subdivisions::recall_subdivision))
        .route("/subdivisions/:id/recalls", get(subdivisions::recall_history))
        .route(
            "/subdivisions/:id/payments",
            get(subdivisions::list_lot_payments).post(subdivisions::record_lot_payment),
        )
        .route(
            "/subdivisions/:id/interest-quote",
            get(subdivisions::interest_quote),
        )
        .route("/payments/:id", delete(receipts::delete_payment))
        .route("/payments/:id/receipt", post(receipts::payment_receipt))
        .route("/receipts/:id/print", get(receipts::print_receipt))
        .route(
            "/receipts/:id/emails",
            get(receipts::receipt_emails).post(receipts::send_receipt),
        )
        .route("/buyers", get(buyers::list_buyers).post(buyers::create_buyer))
        .route("/buyers/:id", get(buyers::get_buyer).put(buyers::update_buyer))
        .route(
            "/documents",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route("/documents/count", get(documents::count_documents))
        .route(
            "/documents/:id",
            put(documents::replace_document).delete(documents::delete_document),
        )
        .route("/documents/:id/url", get(documents::document_url))
        .route("/search/subdivisions", get(subdivisions::search_subdivisions))
        .route("/dashboard/stats", get(buyers::dashboard_stats))
        .route(
            "/settings/interest-rate",
            get(buyers::get_interest_rate).put(buyers::set_interest_rate),
        )
        // Layers run bottom-up: the key is checked before the per-user quota.
        .route_layer(from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .route_layer(from_fn_with_state(state.api_keys.clone(), require_auth));

    let public = Router::new()
        .route("/health", get(health_check))
        .route("/files/*path", get(documents::download_file));

    let max_upload = state.config.max_upload_bytes;

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
