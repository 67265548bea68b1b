//! Caller identity.
//!
//! The orchestrator only needs to know "the caller is user U". Tokens are
//! kept as SHA-256 hashes, never in plaintext.

use std::collections::HashMap;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use sha2::{Digest, Sha256};
use tracing::debug;

use webtask_core::UserId;

use crate::http::responses::ApiError;
use crate::state::AppState;

/// Resolves the authenticated user of a request.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self, headers: &HeaderMap) -> Option<UserId>;
}

/// Hash a token using SHA-256.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Bearer tokens from configuration.
#[derive(Debug, Default)]
pub struct StaticTokenIdentity {
    /// Token hash -> user.
    users: HashMap<String, UserId>,
}

impl StaticTokenIdentity {
    pub fn new<I, U, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (U, T)>,
        U: Into<String>,
        T: AsRef<str>,
    {
        let users = tokens
            .into_iter()
            .map(|(user, token)| (hash_token(token.as_ref()), UserId::new(user)))
            .collect();
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl IdentityProvider for StaticTokenIdentity {
    fn current_user(&self, headers: &HeaderMap) -> Option<UserId> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            return None;
        }
        self.users.get(&hash_token(token)).cloned()
    }
}

/// Extractor for the authenticated caller. Rejects with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserId);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match state.identity.current_user(&parts.headers) {
            Some(user) => Ok(Self(user)),
            None => {
                debug!(path = %parts.uri.path(), "Rejected unauthenticated request");
                Err(ApiError::unauthorized())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_hash_token() {
        let hash = hash_token("secret");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("secret"));
        assert_ne!(hash, hash_token("other"));
    }

    #[test]
    fn test_resolves_bearer_token() {
        let identity = StaticTokenIdentity::new([("alice", "a-token"), ("bob", "b-token")]);
        assert_eq!(identity.len(), 2);

        assert_eq!(
            identity.current_user(&headers("Bearer a-token")),
            Some(UserId::new("alice"))
        );
        assert_eq!(
            identity.current_user(&headers("Bearer b-token")),
            Some(UserId::new("bob"))
        );
    }

    #[test]
    fn test_rejects_bad_credentials() {
        let identity = StaticTokenIdentity::new([("alice", "a-token")]);

        assert_eq!(identity.current_user(&HeaderMap::new()), None);
        assert_eq!(identity.current_user(&headers("Bearer wrong")), None);
        assert_eq!(identity.current_user(&headers("a-token")), None);
        assert_eq!(identity.current_user(&headers("Bearer ")), None);
    }
}
