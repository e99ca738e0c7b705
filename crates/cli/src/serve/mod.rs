//! `krishi serve` -- HTTP JSON API over the ledger, trails and price table.
//!
//! Endpoints:
//! - GET  /health                - Server status
//! - POST /auth/signup           - Create an account and profile
//! - POST /auth/signin           - Start a session, returns a bearer token
//! - POST /auth/signout          - End the bearer session
//! - GET  /me                    - Profile of the bearer session
//! - PUT  /me                    - Update that profile (role is fixed)
//! - POST /harvests              - Record a harvest (farmers)
//! - POST /purchases             - Record a purchase (distributors)
//! - POST /sales                 - Record a sale (retailers)
//! - GET  /records/{id}          - One stage record
//! - GET  /actors/{id}/records   - Records authored by an actor
//! - GET  /actors/{id}/summary   - Dashboard totals for an actor
//! - GET  /trace/{code}          - Provenance trail for a lookup code
//! - GET  /prices                - Whole price table
//! - GET  /prices/search?q=      - Commodity name suggestions
//! - GET  /prices/{name}         - Reference prices for one commodity
//!
//! Routes marked for an actor role, plus `/me` and `/auth/signout`, need an
//! `Authorization: Bearer <token>` header. All responses are JSON.

mod handlers;
mod middleware;
mod state;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use krishi_core::Stage;
use krishi_storage::RecordStore;
use krishi_trace::seed_demo;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use self::handlers::{
    handle_actor_records, handle_actor_summary, handle_get_me, handle_get_record,
    handle_health, handle_list_prices, handle_not_found, handle_price, handle_record_harvest,
    handle_record_purchase, handle_record_sale, handle_search_prices, handle_signin,
    handle_signout, handle_signup, handle_trace, handle_update_me,
};
use self::middleware::session_middleware;
use self::state::AppState;
use crate::backend::open_backend;

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build the router over `state`.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    let authenticated = Router::new()
        .route("/auth/signout", post(handle_signout))
        .route("/me", get(handle_get_me).put(handle_update_me))
        .route("/harvests", post(handle_record_harvest))
        .route("/purchases", post(handle_record_purchase))
        .route("/sales", post(handle_record_sale))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .route("/health", get(handle_health))
        .route("/auth/signup", post(handle_signup))
        .route("/auth/signin", post(handle_signin))
        .route("/records/{id}", get(handle_get_record))
        .route("/actors/{id}/records", get(handle_actor_records))
        .route("/actors/{id}/summary", get(handle_actor_summary))
        .route("/trace/{code}", get(handle_trace))
        .route("/prices", get(handle_list_prices))
        .route("/prices/search", get(handle_search_prices))
        .route("/prices/{name}", get(handle_price))
        .merge(authenticated)
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Open the backend and serve the API on `port` until Ctrl+C.
pub async fn start_server(
    port: u16,
    data: Option<PathBuf>,
    prices: Option<PathBuf>,
    seed: bool,
) -> Result<(), Box<dyn Error>> {
    let backend = open_backend(data.as_deref(), prices.as_deref()).await?;

    if seed {
        if backend.ledger.store().count_by_stage(Stage::Harvest).await? == 0 {
            let demo = seed_demo(&backend.ledger, &backend.auth).await?;
            tracing::info!(
                accounts = demo.actors.len(),
                records = demo.records.len(),
                "loaded demo dataset"
            );
        } else {
            tracing::warn!("store already holds records; skipping demo dataset");
        }
    }

    let app = router(Arc::new(AppState::new(backend)));

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("krishi listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
