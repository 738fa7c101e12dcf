//! Authentication module
//!
//! - Password hashing with Argon2
//! - Session token encoding and decoding
//! - Credential store for identity records
//! - Signup/signin business logic
//! - Session guard middleware for protected routes

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod repository;
pub mod service;

pub use jwt::{decode_session_token, encode_session_token, JwtConfig, SessionClaims};
pub use middleware::{bearer_token, session_guard};
pub use password::{hash_password, verify_password, PasswordConfig};
pub use repository::{CredentialStore, PgCredentialStore, RepositoryError, UserPublic};
pub use service::{AuthService, AuthenticatedUser, SigninRequest, SignupRequest, TokenResponse};

#[cfg(any(test, feature = "test-utils"))]
pub use repository::MemoryCredentialStore;
