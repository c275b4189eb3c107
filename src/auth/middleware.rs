// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applied to the protected router subtree. On success the resolved
//! [`AuthContext`](super::AuthContext) is inserted into the request extensions
//! for handlers and the [`Auth`](super::Auth) extractor; on failure the request
//! is answered with 401 and never reaches the handler.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/users/me", get(handler))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Resolve the bearer token and attach the identity to the request.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match state.auth.resolve(request.headers()).await {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{self, StubProvider};
    use crate::auth::AuthContext;
    use crate::storage::UserDatabase;
    use axum::{
        body::{to_bytes, Body},
        extract::Extension,
        http::{header::AUTHORIZATION, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn whoami(Extension(ctx): Extension<AuthContext>) -> String {
        ctx.identity.firebase_uid.unwrap_or_default()
    }

    fn app() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = UserDatabase::open(&dir.path().join("identities.redb")).unwrap();
        let store: Arc<dyn crate::storage::IdentityStore> = Arc::new(db);
        let provider = StubProvider::default().with_token("fb-token", "uid-1", None);
        let state = AppState::new(testing::resolver(provider, store.clone()), store);

        let router = Router::new()
            .route("/whoami", get(whoami))
            .route_layer(from_fn_with_state(state.clone(), require_auth))
            .with_state(state);
        (router, dir)
    }

    #[tokio::test]
    async fn attaches_context_for_valid_token() {
        let (app, _dir) = app();
        let request = Request::builder()
            .uri("/whoami")
            .header(AUTHORIZATION, "Bearer fb-token")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"uid-1");
    }

    #[tokio::test]
    async fn rejects_missing_token() {
        let (app, _dir) = app();
        let request = Request::builder().uri("/whoami").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"message":"No token provided"}"#);
    }

    #[tokio::test]
    async fn rejects_invalid_token() {
        let (app, _dir) = app();
        let request = Request::builder()
            .uri("/whoami")
            .header(AUTHORIZATION, "Bearer nope")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"message":"Invalid token"}"#);
    }
}
