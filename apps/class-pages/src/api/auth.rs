//! # Authentication Module
//!
//! Derives the `Caller` of every request from its API key.
//!
//! ## Rules
//!
//! - No key configured: every caller is privileged
//! - `Authorization: Bearer <key>` matching the key: privileged
//! - No `Authorization` header: standard caller, limited to the page views
//! - A header with the wrong key: 401
//!
//! Configuration handlers, reads and writes alike, reject standard callers
//! with 403.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use class_pages_core::Caller;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// The configured key, shared with the middleware.
pub type ApiKey = Option<Arc<str>>;

/// Compare a provided key against the expected one in constant time.
///
/// Both keys are padded to the same length so `ct_eq` always runs over the
/// same number of bytes.
#[must_use]
pub fn key_matches(provided: &str, expected: &str) -> bool {
    let provided_bytes = provided.as_bytes();
    let expected_bytes = expected.as_bytes();

    let max_len = provided_bytes.len().max(expected_bytes.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided_bytes.len()].copy_from_slice(provided_bytes);
    padded_expected[..expected_bytes.len()].copy_from_slice(expected_bytes);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided_bytes.len() == expected_bytes.len()
}

/// Resolve the caller for a request with the given `Authorization` header.
///
/// `None` means the header carries the wrong key.
#[must_use]
pub fn resolve_caller(expected: Option<&str>, authorization: Option<&str>) -> Option<Caller> {
    let Some(expected) = expected else {
        return Some(Caller::Privileged);
    };
    match authorization {
        None => Some(Caller::Standard),
        Some(value) => {
            let provided = value.strip_prefix("Bearer ").unwrap_or(value);
            key_matches(provided, expected).then_some(Caller::Privileged)
        }
    }
}

/// Caller resolution middleware. Inserts an `Extension<Caller>`.
///
/// `/health` is always allowed and always standard.
pub async fn caller_middleware(
    State(api_key): State<ApiKey>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if request.uri().path() == "/health" {
        request.extensions_mut().insert(Caller::Standard);
        return Ok(next.run(request).await);
    }

    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match resolve_caller(api_key.as_deref(), authorization) {
        Some(caller) => {
            request.extensions_mut().insert(caller);
            Ok(next.run(request).await)
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_api_key",
                "Authentication failed: invalid API key"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
