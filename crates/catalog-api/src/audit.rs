//! Security audit logging for authentication events
//!
//! Signup, signin and session-guard decisions are logged at INFO level with
//! the "audit" target, so they can be filtered and routed separately from
//! application logs (`RUST_LOG=audit=info`).
//!
//! Author: hephaex@gmail.com

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::info;

/// Client details taken from request headers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// New identity created
    SignupSuccess {
        user_id: i32,
        username: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Signup rejected (validation, duplicate)
    SignupFailure {
        username: Option<String>,
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Token issued on signin
    SigninSuccess {
        user_id: i32,
        username: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Signin rejected; the reason is only ever visible here
    SigninFailure {
        username: String,
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Protected request turned away by the session guard
    SessionRejected {
        reason: String,
        path: String,
        #[serde(flatten)]
        client: ClientInfo,
    },
}

/// Log a security audit event with structured fields
///
/// The whole event is also serialized to JSON in the `event` field for
/// log aggregators.
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::SignupSuccess {
            user_id,
            username,
            client,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                username = %username,
                ip_address = ?client.ip_address,
                "Signup successful"
            );
        }
        AuditEvent::SignupFailure {
            username,
            reason,
            client,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                username = ?username,
                reason = %reason,
                ip_address = ?client.ip_address,
                "Signup failed"
            );
        }
        AuditEvent::SigninSuccess {
            user_id,
            username,
            client,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                username = %username,
                ip_address = ?client.ip_address,
                "Signin successful"
            );
        }
        AuditEvent::SigninFailure {
            username,
            reason,
            client,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                username = %username,
                reason = %reason,
                ip_address = ?client.ip_address,
                "Signin failed"
            );
        }
        AuditEvent::SessionRejected {
            reason,
            path,
            client,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                reason = %reason,
                path = %path,
                ip_address = ?client.ip_address,
                "Session rejected"
            );
        }
    }
}

/// Extract IP address from request headers
///
/// Checks X-Forwarded-For, then X-Real-IP.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    // Take the first IP in the chain (client IP)
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
