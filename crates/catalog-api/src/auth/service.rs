//! Authentication service layer
//!
//! Provides the business logic behind `/signup`, `/signin` and the session
//! guard. Every store, hashing or codec failure is returned to the caller
//! immediately; nothing is retried.

use super::jwt::{
    decode_session_token, encode_session_token, now_unix, JwtConfig, JwtError, SessionClaims,
};
use super::password::{hash_password_with_config, verify_password, PasswordConfig};
use super::repository::{
    CredentialStore, Identity, NewIdentity, RepositoryError, DEFAULT_ADMINTYPE, DEFAULT_USERTYPE,
};
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::error::{AppError, FieldError, SessionRejection};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

const EMAIL_MESSAGE: &str = "Must be a valid email address";

/// User registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct SignupRequest {
    #[validate(
        email(message = "Must be a valid email address"),
        length(max = 255, message = "Must be a valid email address"),
        custom(function = "email_domain_has_tld")
    )]
    pub email: String,
    #[validate(length(min = 6, max = 15, message = "Username must be 6 to 15 characters long"))]
    pub username: String,
    #[validate(length(min = 6, max = 30, message = "Password must be 6 to 30 characters long"))]
    pub password: String,
}

impl SignupRequest {
    /// Trim every field and lowercase the email
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            username: self.username.trim().to_string(),
            password: self.password.trim().to_string(),
        }
    }

    /// Normalize, then collect every field violation
    pub fn check(self) -> Result<Self, Vec<FieldError>> {
        let request = self.normalized();
        match request.validate() {
            Ok(()) => Ok(request),
            Err(errors) => {
                let mut fields: Vec<FieldError> = errors
                    .field_errors()
                    .into_iter()
                    .flat_map(|(field, errs)| {
                        let param = field.to_string();
                        errs.iter().map(move |e| FieldError {
                            param: param.clone(),
                            msg: e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| "Invalid value".to_string()),
                        })
                    })
                    .collect();
                fields.sort_by_key(|f| field_order(&f.param));
                Err(fields)
            }
        }
    }
}

/// Reject dotless domains such as `a@localhost`
///
/// Malformed labels and addresses without an `@` are left to the `email`
/// rule, so each bad address reports once.
fn email_domain_has_tld(email: &str) -> Result<(), ValidationError> {
    match email.rsplit_once('@') {
        Some((_, domain)) if !domain.contains('.') => {}
        _ => return Ok(()),
    }
    let mut err = ValidationError::new("email_domain");
    err.message = Some(Cow::Borrowed(EMAIL_MESSAGE));
    Err(err)
}

fn field_order(param: &str) -> usize {
    match param {
        "email" => 0,
        "username" => 1,
        "password" => 2,
        _ => 3,
    }
}

/// User login request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

/// Successful signup/signin response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Identity admitted by the session guard
///
/// Added to request extensions; extract it in handlers with
/// `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub username: String,
    pub usertype: i32,
    pub admintype: i32,
    /// Issue time of the presented token (Unix seconds)
    pub issued_at: i64,
}

impl AuthenticatedUser {
    /// Whether the identity carries any privilege tag
    pub fn is_admin(&self) -> bool {
        self.admintype > 0
    }
}

/// Authentication service
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    jwt_config: JwtConfig,
    password_config: PasswordConfig,
    /// Hash verified on the unknown-username path so both signin failures
    /// cost one Argon2 run
    decoy_hash: Option<String>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        store: Arc<dyn CredentialStore>,
        jwt_config: JwtConfig,
        password_config: PasswordConfig,
    ) -> Self {
        let decoy_hash = match hash_password_with_config("decoy-password", &password_config) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::warn!(error = %e, "failed to prepare decoy password hash");
                None
            }
        };

        Self {
            store,
            jwt_config,
            password_config,
            decoy_hash,
        }
    }

    /// Register a new identity and issue its first token
    ///
    /// Fails with `Validation` (all field errors), `DuplicateIdentity`
    /// (lookup hit or UNIQUE violation on insert), or a store/internal error.
    /// No row is written on any failure path.
    pub async fn signup(
        &self,
        request: SignupRequest,
        client: &ClientInfo,
    ) -> Result<TokenResponse, AppError> {
        let request = match request.check() {
            Ok(request) => request,
            Err(errors) => {
                audit_log(&AuditEvent::SignupFailure {
                    username: None,
                    reason: "validation failed".to_string(),
                    client: client.clone(),
                });
                return Err(AppError::Validation(errors));
            }
        };

        let existing = self
            .store
            .find_by_username_or_email(&request.username, &request.email)
            .await
            .map_err(store_error)?;

        if existing.is_some() {
            audit_log(&AuditEvent::SignupFailure {
                username: Some(request.username),
                reason: "username or email taken".to_string(),
                client: client.clone(),
            });
            return Err(AppError::DuplicateIdentity);
        }

        let password_hash = hash_password_with_config(&request.password, &self.password_config)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let identity = self
            .store
            .insert(&NewIdentity {
                username: request.username.clone(),
                email: request.email,
                password_hash,
                usertype: DEFAULT_USERTYPE,
                admintype: DEFAULT_ADMINTYPE,
            })
            .await
            .map_err(|e| {
                if matches!(e, RepositoryError::Duplicate) {
                    audit_log(&AuditEvent::SignupFailure {
                        username: Some(request.username.clone()),
                        reason: "unique constraint on insert".to_string(),
                        client: client.clone(),
                    });
                }
                store_error(e)
            })?;

        audit_log(&AuditEvent::SignupSuccess {
            user_id: identity.user_id,
            username: identity.username.clone(),
            client: client.clone(),
        });

        self.issue_token(&identity)
    }

    /// Verify credentials and issue a token
    ///
    /// `UnknownUser` and `InvalidCredentials` stay distinct here and in the
    /// audit log; the HTTP layer renders both identically.
    pub async fn signin(
        &self,
        request: SigninRequest,
        client: &ClientInfo,
    ) -> Result<TokenResponse, AppError> {
        let username = request.username.trim();
        let password = request.password.trim();

        let Some(identity) = self
            .store
            .find_by_username(username)
            .await
            .map_err(store_error)?
        else {
            if let Some(decoy) = &self.decoy_hash {
                let _ = verify_password(password, decoy);
            }
            audit_log(&AuditEvent::SigninFailure {
                username: username.to_string(),
                reason: "unknown username".to_string(),
                client: client.clone(),
            });
            return Err(AppError::UnknownUser);
        };

        let password_valid = verify_password(password, &identity.password_hash)
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {e}")))?;

        if !password_valid {
            audit_log(&AuditEvent::SigninFailure {
                username: identity.username,
                reason: "password mismatch".to_string(),
                client: client.clone(),
            });
            return Err(AppError::InvalidCredentials);
        }

        audit_log(&AuditEvent::SigninSuccess {
            user_id: identity.user_id,
            username: identity.username.clone(),
            client: client.clone(),
        });

        self.issue_token(&identity)
    }

    /// Admit or reject a bearer token
    ///
    /// Decodes the token, checks its age against the current time and
    /// re-reads the referenced identity, which must still exist.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let now = now_unix().map_err(|e| AppError::Internal(e.to_string()))?;
        self.authenticate_at(token, now).await
    }

    /// [`authenticate`](Self::authenticate) against an explicit clock
    pub async fn authenticate_at(
        &self,
        token: &str,
        now: i64,
    ) -> Result<AuthenticatedUser, AppError> {
        let claims = decode_session_token(&self.jwt_config, token)
            .map_err(|_| AppError::Unauthorized(SessionRejection::InvalidToken))?;

        claims.check_age(now).map_err(|e| match e {
            JwtError::ExpiredToken => AppError::Unauthorized(SessionRejection::Expired),
            _ => AppError::Unauthorized(SessionRejection::InvalidToken),
        })?;

        let identity = self
            .store
            .find_by_id(claims.sub)
            .await
            .map_err(store_error)?
            .ok_or(AppError::Unauthorized(SessionRejection::IdentityMissing))?;

        Ok(AuthenticatedUser {
            user_id: identity.user_id,
            username: identity.username,
            usertype: identity.usertype,
            admintype: identity.admintype,
            issued_at: claims.iat,
        })
    }

    fn issue_token(&self, identity: &Identity) -> Result<TokenResponse, AppError> {
        let token = SessionClaims::new(identity.user_id, identity.usertype, identity.admintype)
            .and_then(|claims| encode_session_token(&self.jwt_config, &claims))
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {e}")))?;

        Ok(TokenResponse { token })
    }
}

fn store_error(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::Duplicate => AppError::DuplicateIdentity,
        RepositoryError::DatabaseError(msg) => AppError::Database(msg),
    }
}
