// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles for the authentication seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{http::StatusCode, routing::get, Router};
use jsonwebtoken::errors::Error as JwtError;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use super::claims::{ManagedProviderClaims, RawClaims, SelfIssuedClaims, VerifiedIdToken};
use super::error::ProviderError;
use super::identity::IdentityResolver;
use super::provider::IdentityProvider;
use super::resolver::AuthResolver;
use super::self_issued::{HmacSessionVerifier, SessionTokenVerifier};
use crate::config::JwtSecret;
use crate::storage::{
    IdentityStore, NewUserIdentity, StoreError, StoreResult, UserFilter, UserIdentity,
};

pub const TEST_SECRET: &str = "test-secret";

/// Provider that accepts a fixed set of opaque tokens.
#[derive(Default)]
pub struct StubProvider {
    tokens: HashMap<String, ManagedProviderClaims>,
}

impl StubProvider {
    pub fn with_token(mut self, token: &str, uid: &str, email: Option<&str>) -> Self {
        self.tokens.insert(
            token.to_string(),
            ManagedProviderClaims {
                uid: uid.to_string(),
                email: email.map(str::to_string),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdToken, ProviderError> {
        let claims = self
            .tokens
            .get(token)
            .cloned()
            .ok_or(ProviderError::InvalidSignature)?;
        let mut payload = RawClaims::new();
        payload.insert("sub".to_string(), json!(claims.uid));
        if let Some(email) = &claims.email {
            payload.insert("email".to_string(), json!(email));
        }
        Ok(VerifiedIdToken { claims, payload })
    }
}

/// Session verifier that counts how often it is consulted.
pub struct CountingVerifier {
    inner: HmacSessionVerifier,
    calls: Arc<AtomicUsize>,
}

impl CountingVerifier {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let verifier = Self {
            inner: HmacSessionVerifier::new(&JwtSecret::new(TEST_SECRET)),
            calls: calls.clone(),
        };
        (verifier, calls)
    }
}

impl SessionTokenVerifier for CountingVerifier {
    fn verify(&self, token: &str) -> Result<SelfIssuedClaims, JwtError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(token)
    }
}

/// Store where every operation fails.
pub struct UnavailableStore;

#[async_trait]
impl IdentityStore for UnavailableStore {
    async fn find_one(&self, _filter: &UserFilter) -> StoreResult<Option<UserIdentity>> {
        Err(StoreError::Blocking("store offline".to_string()))
    }

    async fn create(&self, _user: NewUserIdentity) -> StoreResult<UserIdentity> {
        Err(StoreError::Blocking("store offline".to_string()))
    }

    async fn set_firebase_uid(&self, _id: &str, _uid: &str) -> StoreResult<UserIdentity> {
        Err(StoreError::Blocking("store offline".to_string()))
    }

    async fn ping(&self) -> StoreResult<()> {
        Err(StoreError::Blocking("store offline".to_string()))
    }
}

/// Store where nobody is ever found yet every create conflicts.
pub struct ConflictingStore;

#[async_trait]
impl IdentityStore for ConflictingStore {
    async fn find_one(&self, _filter: &UserFilter) -> StoreResult<Option<UserIdentity>> {
        Ok(None)
    }

    async fn create(&self, _user: NewUserIdentity) -> StoreResult<UserIdentity> {
        Err(StoreError::Conflict {
            field: "firebase_uid",
        })
    }

    async fn set_firebase_uid(&self, id: &str, _uid: &str) -> StoreResult<UserIdentity> {
        Err(StoreError::NotFound(format!("User {id}")))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Local JWKS endpoint that counts requests and always answers 500.
///
/// Returns the endpoint URL and the request counter.
pub async fn counting_jwks_endpoint() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/jwks.json",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}/jwks.json"), hits)
}

/// Sign a legacy session token with [`TEST_SECRET`].
pub fn session_token(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("signing succeeds")
}

/// Resolver wired to the given provider and store with a [`TEST_SECRET`] verifier.
pub fn resolver(provider: StubProvider, store: Arc<dyn IdentityStore>) -> AuthResolver {
    AuthResolver::new(
        Arc::new(provider),
        Arc::new(HmacSessionVerifier::new(&JwtSecret::new(TEST_SECRET))),
        IdentityResolver::new(store),
    )
}
