//! HTTP middleware: bearer-session authentication.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use krishi_storage::get_profile;
use krishi_trace::AuthProvider;

use super::state::{AppState, CurrentSession};

/// Resolve `Authorization: Bearer <token>` to the caller's profile.
///
/// Missing or unknown tokens get 401. A live session whose account has no
/// profile also gets 401, since no role can be checked for it.
pub(crate) async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    let Some(token) = token else {
        return super::json_error(StatusCode::UNAUTHORIZED, "authentication required")
            .into_response();
    };

    let Some(identity) = state.auth.identity(&token).await else {
        return super::json_error(StatusCode::UNAUTHORIZED, "invalid or expired session")
            .into_response();
    };

    let actor = match get_profile(&state.documents, &identity.uid).await {
        Ok(Some(actor)) => actor,
        Ok(None) => {
            tracing::warn!(uid = %identity.uid, "session without profile");
            return super::json_error(StatusCode::UNAUTHORIZED, "no profile for this account")
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "profile lookup failed");
            return super::json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
                .into_response();
        }
    };

    request
        .extensions_mut()
        .insert(CurrentSession { token, actor });
    next.run(request).await
}
