//! Admin authentication for the management API
//!
//! Admin requests carry a bearer token issued by an external identity
//! provider. Verified tokens are cached for a short window so every admin
//! request does not round-trip to the provider.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::util::now_millis;

use crate::state::AppState;

const SESSION_TTL_MILLIS: i64 = 5 * 60 * 1000;

/// Cache of verified admin tokens, token -> valid-until (unix millis)
#[derive(Clone, Default)]
pub struct SessionCache {
    inner: Arc<DashMap<String, i64>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the token was verified recently enough.
    pub fn check(&self, token: &str) -> bool {
        match self.inner.get(token) {
            Some(valid_until) => *valid_until > now_millis(),
            None => false,
        }
    }

    pub fn insert(&self, token: &str) {
        self.inner
            .insert(token.to_owned(), now_millis() + SESSION_TTL_MILLIS);
    }

    /// Drop expired entries
    pub fn cleanup(&self) {
        let now = now_millis();
        self.inner.retain(|_, valid_until| *valid_until > now);
    }
}

/// Middleware that verifies the admin bearer token
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::not_authenticated().into_response())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::new(ErrorCode::TokenInvalid).into_response())?;

    if !state.sessions.check(token) {
        verify_with_provider(&state, token).await?;
        state.sessions.insert(token);
    }

    Ok(next.run(request).await)
}

/// Ask the identity provider whether the token belongs to an admin.
async fn verify_with_provider(state: &AppState, token: &str) -> Result<(), Response> {
    let resp = state
        .http
        .post(&state.identity_provider_url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Identity provider unreachable: {e}");
            AppError::transient("Authentication service unavailable").into_response()
        })?;

    if !resp.status().is_success() {
        tracing::debug!(status = %resp.status(), "Admin token rejected");
        return Err(AppError::new(ErrorCode::TokenInvalid).into_response());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_miss_for_unknown_token() {
        let cache = SessionCache::new();
        assert!(!cache.check("tok"));
    }

    #[test]
    fn test_cache_hit_after_insert() {
        let cache = SessionCache::new();
        cache.insert("tok");
        assert!(cache.check("tok"));
        assert!(!cache.check("other"));
    }

    #[test]
    fn test_cleanup_drops_expired() {
        let cache = SessionCache::new();
        cache.inner.insert("old".into(), now_millis() - 1);
        cache.insert("fresh");
        cache.cleanup();
        assert!(!cache.check("old"));
        assert!(cache.check("fresh"));
        assert_eq!(cache.inner.len(), 1);
    }
}
