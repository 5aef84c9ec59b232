// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication for the gateway.
//!
//! When no token is configured, all authenticated routes are rejected
//! (fail-closed); the serve command refuses to start the gateway in that
//! state. SSE routes cannot send an Authorization header from EventSource,
//! so they also accept the token as a `token` query parameter.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Authentication configuration for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` rejects every authenticated request.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl AuthConfig {
    /// Validate a raw token value (from a header or query parameter).
    pub fn token_matches(&self, candidate: Option<&str>) -> bool {
        match (&self.bearer_token, candidate) {
            (Some(expected), Some(candidate)) => expected == candidate,
            _ => false,
        }
    }
}

/// Middleware validating `Authorization: Bearer <token>`.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.bearer_token.is_none() {
        tracing::error!("gateway has no auth configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let header_token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if auth.token_matches(header_token) {
        return Ok(next.run(request).await);
    }

    Err(StatusCode::UNAUTHORIZED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_matches_requires_both_sides() {
        let unconfigured = AuthConfig { bearer_token: None };
        assert!(!unconfigured.token_matches(Some("anything")));

        let configured = AuthConfig {
            bearer_token: Some("secret".to_string()),
        };
        assert!(configured.token_matches(Some("secret")));
        assert!(!configured.token_matches(Some("wrong")));
        assert!(!configured.token_matches(None));
    }

    #[test]
    fn auth_config_debug_redacts_token() {
        let config = AuthConfig {
            bearer_token: Some("secret-token".to_string()),
        };
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[redacted]"));
    }
}
