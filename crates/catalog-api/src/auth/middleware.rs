//! Session guard for protected routes
//!
//! Reads the bearer token from the Authorization header, admits the request
//! through [`AuthService::authenticate`](super::service::AuthService::authenticate)
//! and adds the resulting [`AuthenticatedUser`] to request extensions.

use super::service::AuthenticatedUser;
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Bearer token carried by the request
///
/// The scheme is matched case-insensitively. A missing header, a header that
/// is not valid ASCII or one with another scheme all yield an empty token,
/// which then fails to decode.
pub fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .unwrap_or("")
}

/// Middleware that requires a live session token
///
/// # Usage
///
/// ```ignore
/// use axum::{Router, routing::get, middleware};
/// use catalog_api::auth::middleware::session_guard;
///
/// let protected = Router::new()
///     .route("/users", get(list_users))
///     .route_layer(middleware::from_fn_with_state(state.clone(), session_guard));
/// ```
///
/// In handlers, extract the user:
///
/// ```ignore
/// async fn handler(Extension(user): Extension<AuthenticatedUser>) -> String {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub async fn session_guard(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).to_string();

    let user: AuthenticatedUser = match state.auth.authenticate(&token).await {
        Ok(user) => user,
        Err(AppError::Unauthorized(reason)) => {
            audit_log(&AuditEvent::SessionRejected {
                reason: reason.message().to_string(),
                path: request.uri().path().to_string(),
                client: ClientInfo::from_headers(request.headers()),
            });
            state.metrics.record_auth("session", "rejected");
            return Err(AppError::Unauthorized(reason));
        }
        Err(e) => return Err(e),
    };

    state.metrics.record_auth("session", "admitted");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
