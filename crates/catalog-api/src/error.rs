//! API error handling
//!
//! Every failure leaves the server as JSON: `{"error": "..."}`, or
//! `{"errors": [...]}` for signup validation.
//!
//! Author: hephaex@gmail.com

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Generic denial for any failed signin
pub const SIGNIN_DENIED: &str = "Unable to log in. Please check and try again.";

/// Signup conflict with an existing username or email
pub const IDENTITY_TAKEN: &str =
    "This username or email is already taken. Please check and try again.";

/// Error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// One violated input constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    /// Offending field name
    pub param: String,
    /// Human-readable message
    pub msg: String,
}

/// Validation failure response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorBody {
    pub errors: Vec<FieldError>,
}

/// Why the session guard turned a request away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    /// Missing, malformed or wrongly signed token
    InvalidToken,
    /// More than an hour since issue
    Expired,
    /// The token's subject has been removed
    IdentityMissing,
}

impl SessionRejection {
    pub fn message(&self) -> &'static str {
        match self {
            SessionRejection::InvalidToken => "Invalid token",
            SessionRejection::Expired => "Token expired",
            SessionRejection::IdentityMissing => "User no longer exists",
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    Validation(Vec<FieldError>),
    DuplicateIdentity,
    UnknownUser,
    InvalidCredentials,
    Unauthorized(SessionRejection),
    NotFound(String),
    BadRequest(String),
    Internal(String),
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(errors) => {
                return (StatusCode::BAD_REQUEST, Json(ValidationErrorBody { errors }))
                    .into_response();
            }
            AppError::DuplicateIdentity => {
                (StatusCode::UNPROCESSABLE_ENTITY, IDENTITY_TAKEN.to_string())
            }
            AppError::UnknownUser | AppError::InvalidCredentials => {
                (StatusCode::UNPROCESSABLE_ENTITY, SIGNIN_DENIED.to_string())
            }
            AppError::Unauthorized(reason) => {
                (StatusCode::UNAUTHORIZED, reason.message().to_string())
            }
            AppError::NotFound(resource) => (StatusCode::NOT_FOUND, format!("{resource} not found")),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                )
            }
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

impl From<catalog_core::CatalogError> for AppError {
    fn from(err: catalog_core::CatalogError) -> Self {
        use catalog_core::CatalogError;

        match err {
            CatalogError::NotFound(resource) => AppError::NotFound(resource),
            CatalogError::InvalidReference(msg) => {
                AppError::BadRequest(format!("Invalid reference: {msg}"))
            }
            CatalogError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the JSON error shape
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Query` extractor whose rejections use the JSON error shape
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// `Path` extractor whose rejections use the JSON error shape
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
