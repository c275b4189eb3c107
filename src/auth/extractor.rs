// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated requests.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(ctx): Auth) -> impl IntoResponse {
//!     // ctx.identity is the stored UserIdentity
//! }
//! ```
//!
//! Behind [`require_auth`](super::require_auth) the context is already in the
//! request extensions and is reused. Otherwise the extractor resolves the
//! token itself and caches the result in the extensions.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthContext, AuthRejection};
use crate::state::AppState;

/// Extractor for authenticated requests.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_me(Auth(ctx): Auth) -> Json<UserMeResponse> {
///     // ctx.identity.id is the caller's user id
///     // ctx.strategy tells which token type was presented
/// }
/// ```
pub struct Auth(pub AuthContext);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already resolved the request
        if let Some(context) = parts.extensions.get::<AuthContext>().cloned() {
            return Ok(Auth(context));
        }

        let context = state.auth.resolve(&parts.headers).await?;
        parts.extensions.insert(context.clone());
        Ok(Auth(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{self, StubProvider};
    use crate::auth::AuthStrategy;
    use crate::storage::{IdentityStore, UserDatabase};
    use axum::http::{header::AUTHORIZATION, Request};
    use std::sync::Arc;

    fn state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = UserDatabase::open(&dir.path().join("identities.redb")).unwrap();
        let store: Arc<dyn IdentityStore> = Arc::new(db);
        let provider = StubProvider::default().with_token("fb-token", "uid-1", None);
        (AppState::new(testing::resolver(provider, store.clone()), store), dir)
    }

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_rejects() {
        let (state, _dir) = state();
        let mut parts = parts(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.err(), Some(AuthRejection::NoToken));
    }

    #[tokio::test]
    async fn resolves_and_caches_context() {
        let (state, _dir) = state();
        let mut parts = parts(Some("Bearer fb-token"));

        let Auth(ctx) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(ctx.strategy, AuthStrategy::ManagedProvider);

        let cached = parts.extensions.get::<AuthContext>().unwrap();
        assert_eq!(cached.identity.id, ctx.identity.id);
    }

    #[tokio::test]
    async fn reuses_context_from_extensions() {
        let (state, _dir) = state();
        let mut first = parts(Some("Bearer fb-token"));
        let Auth(ctx) = Auth::from_request_parts(&mut first, &state).await.unwrap();

        // No Authorization header: only the extension can satisfy the extractor
        let mut second = parts(None);
        second.extensions.insert(ctx.clone());
        let Auth(reused) = Auth::from_request_parts(&mut second, &state).await.unwrap();
        assert_eq!(reused.identity.id, ctx.identity.id);
    }
}
