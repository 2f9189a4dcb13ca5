//! Resolution of the calling user for API requests.
//!
//! The middleware runs an [`ApiAuthorization`] once per request and stores
//! the resulting [`AuthorizedData`] as a request extension. Handlers decide
//! for themselves what an unauthorized request means.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::error;

use super::AppState;
use crate::db::{Store, User};

/// Result of API authorization. `user` is `None` when the request is anonymous
/// or the credentials did not resolve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizedData {
    pub user: Option<User>,
    /// Name of the client the credentials were issued to.
    pub source: Option<String>,
    /// Opaque client payload, passed through to responses as-is.
    pub source_data: Option<serde_json::Value>,
}

#[async_trait]
pub trait ApiAuthorization: Send + Sync {
    async fn authorize(&self, headers: &HeaderMap) -> AuthorizedData;
}

/// Resolves `Authorization: Bearer <token>` against stored access tokens.
pub struct BearerTokenAuthorization {
    store: Store,
}

impl BearerTokenAuthorization {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl ApiAuthorization for BearerTokenAuthorization {
    async fn authorize(&self, headers: &HeaderMap) -> AuthorizedData {
        let Some(token) = bearer_token(headers) else {
            return AuthorizedData::default();
        };

        match self.store.resolve_access_token(token).await {
            Ok(Some((token, user))) => AuthorizedData {
                user: Some(user),
                source: token.source,
                source_data: token.source_data,
            },
            Ok(None) => AuthorizedData::default(),
            Err(e) => {
                error!(error = %e, "Failed to resolve access token");
                AuthorizedData::default()
            }
        }
    }
}

pub async fn authorization_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let data = state.authorization.authorize(request.headers()).await;

    if let Some(user) = &data.user {
        tracing::Span::current().record("user_id", user.id);
    }

    request.extensions_mut().insert(data);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc123 "));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert("Authorization", HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
