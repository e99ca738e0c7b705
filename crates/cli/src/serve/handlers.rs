//! HTTP route handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use krishi_storage::{get_profile, update_profile, ProfileUpdate};
use krishi_trace::{
    resolve_trail_with_holders, AuthProvider, HarvestInput, LookupInput, PurchaseInput,
    SaleInput, SignupProfile, TraceError,
};
use serde::Deserialize;

use super::json_error;
use super::state::{AppState, CurrentSession};

/// Map a domain error to its HTTP status and a JSON error body.
fn error_response(err: TraceError) -> Response {
    let status = match &err {
        TraceError::Validation(_) | TraceError::ScanUnavailable => StatusCode::BAD_REQUEST,
        TraceError::UnknownUpstreamReference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TraceError::NotFound { .. } => StatusCode::NOT_FOUND,
        TraceError::Authentication(_) => StatusCode::UNAUTHORIZED,
        TraceError::RoleNotPermitted { .. } => StatusCode::FORBIDDEN,
        TraceError::CorruptChain { .. } | TraceError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    json_error(status, &err.to_string()).into_response()
}

/// Unwrap a JSON body, answering malformed input with a 400 JSON error.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, &e.body_text()).into_response())
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    });
    (StatusCode::OK, Json(response))
}

// ── Accounts ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct SignupRequest {
    email: String,
    password: String,
    #[serde(flatten)]
    profile: SignupProfile,
}

#[derive(Deserialize)]
pub(crate) struct SigninRequest {
    email: String,
    password: String,
}

/// POST /auth/signup
pub(crate) async fn handle_signup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Response {
    let req = match body(payload) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    match state
        .auth
        .sign_up(&req.email, &req.password, req.profile)
        .await
    {
        Ok(actor) => (StatusCode::CREATED, Json(actor)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /auth/signin
pub(crate) async fn handle_signin(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Response {
    let req = match body(payload) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let session = match state.auth.sign_in(&req.email, &req.password).await {
        Ok(session) => session,
        Err(e) => return error_response(e),
    };
    // The profile may legitimately be absent; the session is still valid.
    let profile = match get_profile(&state.documents, &session.identity.uid).await {
        Ok(profile) => profile,
        Err(e) => return error_response(e.into()),
    };
    let response = serde_json::json!({
        "token": session.token,
        "uid": session.identity.uid,
        "email": session.identity.email,
        "profile": profile,
    });
    (StatusCode::OK, Json(response)).into_response()
}

/// POST /auth/signout
pub(crate) async fn handle_signout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
) -> Response {
    match state.auth.sign_out(&session.token).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "signed_out": true })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /me
pub(crate) async fn handle_get_me(Extension(session): Extension<CurrentSession>) -> Response {
    (StatusCode::OK, Json(session.actor)).into_response()
}

/// PUT /me
pub(crate) async fn handle_update_me(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Response {
    let update = match body(payload) {
        Ok(update) => update,
        Err(resp) => return resp,
    };
    match update_profile(&state.documents, &session.actor.uid, update).await {
        Ok(actor) => (StatusCode::OK, Json(actor)).into_response(),
        Err(e) => error_response(e.into()),
    }
}

// ── Stage recording ──────────────────────────────────────────────────────────

/// POST /harvests
pub(crate) async fn handle_record_harvest(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
    payload: Result<Json<HarvestInput>, JsonRejection>,
) -> Response {
    let input = match body(payload) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state.ledger.record_harvest(&session.actor, input).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /purchases
pub(crate) async fn handle_record_purchase(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
    payload: Result<Json<PurchaseInput>, JsonRejection>,
) -> Response {
    let input = match body(payload) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state.ledger.record_purchase(&session.actor, input).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /sales
pub(crate) async fn handle_record_sale(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
    payload: Result<Json<SaleInput>, JsonRejection>,
) -> Response {
    let input = match body(payload) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state.ledger.record_sale(&session.actor, input).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => error_response(e),
    }
}

// ── Reads ────────────────────────────────────────────────────────────────────

/// GET /records/{id}
pub(crate) async fn handle_get_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.ledger.record(&id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /actors/{id}/records
pub(crate) async fn handle_actor_records(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.ledger.records_for(&id).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /actors/{id}/summary
pub(crate) async fn handle_actor_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.ledger.summary(&id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /trace/{code}
pub(crate) async fn handle_trace(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Response {
    let code = match LookupInput::from(code.as_str()).into_code() {
        Ok(code) => code,
        Err(e) => return error_response(e),
    };
    let trail =
        match resolve_trail_with_holders(state.ledger.store(), &state.documents, &code).await {
            Ok(trail) => trail,
            Err(e) => return error_response(e),
        };
    let response = serde_json::json!({
        "lookup_code": &trail.lookup_code,
        "commodity_name": trail.commodity_name(),
        "current_location": trail.current_location(),
        "steps": &trail.steps,
    });
    (StatusCode::OK, Json(response)).into_response()
}

// ── Prices ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct SearchParams {
    #[serde(default)]
    q: String,
}

/// GET /prices
pub(crate) async fn handle_list_prices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.ledger.prices().entries().to_vec()))
}

/// GET /prices/search?q=
pub(crate) async fn handle_search_prices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let results = state.ledger.prices().search(&params.q);
    let response = serde_json::json!({ "query": params.q, "results": results });
    (StatusCode::OK, Json(response))
}

/// GET /prices/{name}
pub(crate) async fn handle_price(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    let Some(reference) = state.ledger.prices().lookup(&name) else {
        return json_error(
            StatusCode::NOT_FOUND,
            &format!("no price reference for '{}'", name.trim()),
        )
        .into_response();
    };
    let mut value = match serde_json::to_value(reference) {
        Ok(value) => value,
        Err(e) => {
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response()
        }
    };
    value["suggested_price_per_kg"] = serde_json::json!(reference.suggested_price_per_kg());
    (StatusCode::OK, Json(value)).into_response()
}
