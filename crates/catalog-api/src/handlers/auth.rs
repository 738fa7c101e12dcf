//! Authentication API handlers
//!
//! Provides the public `/signup` and `/signin` endpoints. Both answer with a
//! bearer token on success.
//!
//! Author: hephaex@gmail.com

use crate::audit::ClientInfo;
use crate::auth::{SigninRequest, SignupRequest, TokenResponse};
use crate::error::{AppError, AppJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// Register a new identity
///
/// Fields are trimmed and the email lowercased before validation.
///
/// # Request Body
///
/// * `email` - Valid email address (unique)
/// * `username` - 6 to 15 characters (unique)
/// * `password` - 6 to 30 characters
///
/// # Responses
///
/// * `200 OK` - Identity created, returns a session token
/// * `400 Bad Request` - Every violated field constraint
/// * `422 Unprocessable Entity` - Username or email already taken
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    post,
    path = "/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Identity created", body = TokenResponse),
        (status = 400, description = "Invalid input", body = crate::error::ValidationErrorBody),
        (status = 422, description = "Username or email taken", body = crate::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody),
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    AppJson(request): AppJson<SignupRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    match state.auth.signup(request, &client).await {
        Ok(token) => {
            state.metrics.record_auth("signup", "created");
            Ok(Json(token))
        }
        Err(e) => {
            state.metrics.record_auth("signup", "rejected");
            Err(e)
        }
    }
}

/// Sign in with username and password
///
/// An unknown username and a wrong password get the same response.
///
/// # Responses
///
/// * `200 OK` - Returns a session token
/// * `422 Unprocessable Entity` - Credentials not accepted
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    post,
    path = "/signin",
    tag = "auth",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signin successful", body = TokenResponse),
        (status = 422, description = "Credentials not accepted", body = crate::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody),
    )
)]
pub async fn signin_handler(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    AppJson(request): AppJson<SigninRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    match state.auth.signin(request, &client).await {
        Ok(token) => {
            state.metrics.record_auth("signin", "issued");
            Ok(Json(token))
        }
        Err(e) => {
            state.metrics.record_auth("signin", "denied");
            Err(e)
        }
    }
}
