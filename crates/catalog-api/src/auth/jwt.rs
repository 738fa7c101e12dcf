//! Session token encoding and decoding
//!
//! Session tokens are HS256-signed JWTs carrying the subject id, the issue
//! time and a snapshot of the identity's role tags. They are signed, not
//! encrypted: the claims are readable by the client but any change to them
//! breaks the signature.
//!
//! Expiry is not enforced while decoding. A token lives exactly
//! [`SESSION_TTL_SECS`] after `iat`, which the session guard checks with
//! [`SessionClaims::check_age`].

use catalog_core::AuthConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Lifetime of a session token, counted from `iat`
pub const SESSION_TTL_SECS: i64 = 60 * 60;

/// Tolerated clock drift for tokens stamped slightly in the future
const CLOCK_SKEW_SECS: i64 = 60;

/// Claims embedded in every session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - identity id
    pub sub: i32,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Privilege tag at issuance
    pub admintype: i32,
    /// Role tag at issuance
    pub usertype: i32,
}

impl SessionClaims {
    /// Claims for `sub` stamped with the current time
    pub fn new(sub: i32, usertype: i32, admintype: i32) -> Result<Self, JwtError> {
        Ok(Self {
            sub,
            iat: now_unix()?,
            admintype,
            usertype,
        })
    }

    /// Check the token age against `now` (Unix seconds)
    pub fn check_age(&self, now: i64) -> Result<(), JwtError> {
        let elapsed = now - self.iat;
        if elapsed > SESSION_TTL_SECS {
            return Err(JwtError::ExpiredToken);
        }
        if elapsed < -CLOCK_SKEW_SECS {
            return Err(JwtError::IssuedInFuture);
        }
        Ok(())
    }
}

/// Token encoding and decoding errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Token issued in the future")]
    IssuedInFuture,

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// Signing configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.clone())
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Current time as Unix seconds
pub fn now_unix() -> Result<i64, JwtError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64)
}

/// Encode claims into a signed bearer token
///
/// # Example
///
/// ```no_run
/// use catalog_api::auth::jwt::{encode_session_token, JwtConfig, SessionClaims};
///
/// let config = JwtConfig::new("change-me");
/// let claims = SessionClaims::new(1, 1, 0).unwrap();
/// let token = encode_session_token(&config, &claims).expect("Failed to encode token");
/// ```
pub fn encode_session_token(config: &JwtConfig, claims: &SessionClaims) -> Result<String, JwtError> {
    let token = encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Decode a bearer token, verifying its signature
///
/// Fails with [`JwtError::InvalidSignature`] when the token was not signed
/// with `config.secret` and [`JwtError::InvalidToken`] for anything that is
/// not a well-formed token with the expected claims.
pub fn decode_session_token(config: &JwtConfig, token: &str) -> Result<SessionClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig::new("test-secret")
    }

    #[test]
    fn test_encode_and_decode_token() {
        let claims = SessionClaims::new(42, 1, 0).unwrap();
        let token = encode_session_token(&config(), &claims).expect("Failed to encode token");

        let decoded = decode_session_token(&config(), &token).expect("Failed to decode token");

        assert_eq!(decoded, claims);
        assert!(decoded.check_age(now_unix().unwrap()).is_ok());
    }

    #[test]
    fn test_invalid_token() {
        assert!(matches!(
            decode_session_token(&config(), "invalid.token.here"),
            Err(JwtError::InvalidToken)
        ));
        assert!(matches!(
            decode_session_token(&config(), ""),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let claims = SessionClaims::new(1, 1, 0).unwrap();
        let token = encode_session_token(&JwtConfig::new("secret1"), &claims).unwrap();

        let result = decode_session_token(&JwtConfig::new("secret2"), &token);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let claims = SessionClaims::new(7, 1, 0).unwrap();
        let token = encode_session_token(&config(), &claims).unwrap();

        // Re-sign nothing: swap in a payload claiming admin rights
        let forged_claims = SessionClaims {
            admintype: 1,
            ..claims
        };
        let forged = encode_session_token(&JwtConfig::new("attacker"), &forged_claims).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        let tampered = parts.join(".");

        assert!(decode_session_token(&config(), &tampered).is_err());
    }

    #[test]
    fn test_flipped_byte_is_rejected() {
        let claims = SessionClaims::new(7, 1, 0).unwrap();
        let token = encode_session_token(&config(), &claims).unwrap();

        let payload_start = token.find('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        bytes[payload_start + 2] = if bytes[payload_start + 2] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(decode_session_token(&config(), &tampered).is_err());
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let now = now_unix().unwrap();
        let claims = SessionClaims {
            sub: 3,
            iat: now - SESSION_TTL_SECS - 1,
            admintype: 0,
            usertype: 1,
        };
        let token = encode_session_token(&config(), &claims).unwrap();

        let decoded = decode_session_token(&config(), &token).unwrap();
        assert!(matches!(decoded.check_age(now), Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_age_boundaries() {
        let claims = SessionClaims {
            sub: 1,
            iat: 1_000_000,
            admintype: 0,
            usertype: 1,
        };

        assert!(claims.check_age(1_000_000).is_ok());
        assert!(claims.check_age(1_000_000 + SESSION_TTL_SECS).is_ok());
        assert!(matches!(
            claims.check_age(1_000_000 + SESSION_TTL_SECS + 1),
            Err(JwtError::ExpiredToken)
        ));
        assert!(claims.check_age(1_000_000 - CLOCK_SKEW_SECS).is_ok());
        assert!(matches!(
            claims.check_age(1_000_000 - CLOCK_SKEW_SECS - 1),
            Err(JwtError::IssuedInFuture)
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        assert!(!format!("{:?}", config()).contains("test-secret"));
    }
}
