// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dual-strategy bearer token resolution.
//!
//! 1. Extract the bearer token; none means [`AuthRejection::NoToken`].
//! 2. Managed provider: verify with Firebase, then find, link or provision the
//!    identity. Success ends resolution.
//! 3. Self-issued: verify the HMAC session token and load the referenced
//!    identity by id. It is attempted only when step 2 failed for any reason,
//!    including store errors.
//! 4. Both failed: log the cause and reject with [`AuthRejection::InvalidToken`].
//!
//! The detailed cause never reaches the caller.

use std::sync::Arc;

use axum::http::HeaderMap;

use super::claims::{AuthContext, AuthStrategy, RawClaims};
use super::error::{AuthError, AuthRejection};
use super::identity::IdentityResolver;
use super::provider::IdentityProvider;
use super::self_issued::SessionTokenVerifier;
use super::token::{bearer_from_headers, BearerToken};
use crate::storage::UserIdentity;

/// Both strategies' failures for one token.
#[derive(Debug)]
pub struct ResolutionFailure {
    pub managed_provider: AuthError,
    pub self_issued: AuthError,
}

impl ResolutionFailure {
    /// Cause reported in logs: the self-issued failure, the last one attempted.
    pub fn cause(&self) -> &AuthError {
        &self.self_issued
    }

    fn involves_store(&self) -> bool {
        matches!(self.managed_provider, AuthError::StoreUnavailable(_))
            || matches!(self.self_issued, AuthError::StoreUnavailable(_))
    }
}

/// Resolves bearer tokens to identities.
///
/// Holds no per-request state and is shared across requests.
#[derive(Clone)]
pub struct AuthResolver {
    provider: Arc<dyn IdentityProvider>,
    sessions: Arc<dyn SessionTokenVerifier>,
    identities: IdentityResolver,
}

impl AuthResolver {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        sessions: Arc<dyn SessionTokenVerifier>,
        identities: IdentityResolver,
    ) -> Self {
        Self {
            provider,
            sessions,
            identities,
        }
    }

    /// Resolve the request's `Authorization` header.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<AuthContext, AuthRejection> {
        let Some(token) = bearer_from_headers(headers) else {
            tracing::debug!(error_code = AuthError::NoCredential.error_code(), "no bearer token");
            return Err(AuthRejection::NoToken);
        };

        let fingerprint = token.fingerprint();
        match self.authenticate(token).await {
            Ok(context) => {
                tracing::debug!(
                    user_id = %context.identity.id,
                    strategy = context.strategy.as_str(),
                    token_fingerprint = %fingerprint,
                    "request authenticated"
                );
                Ok(context)
            }
            Err(failure) => {
                let cause = failure.cause();
                if failure.involves_store() {
                    tracing::error!(
                        error_code = cause.error_code(),
                        error = %cause,
                        provider_error_code = failure.managed_provider.error_code(),
                        provider_error = %failure.managed_provider,
                        token_fingerprint = %fingerprint,
                        "Failed to verify token"
                    );
                } else {
                    tracing::warn!(
                        error_code = cause.error_code(),
                        error = %cause,
                        provider_error_code = failure.managed_provider.error_code(),
                        token_fingerprint = %fingerprint,
                        "Failed to verify token"
                    );
                }
                Err(AuthRejection::InvalidToken)
            }
        }
    }

    /// Try the managed provider, then the self-issued strategy.
    pub async fn authenticate(&self, token: BearerToken) -> Result<AuthContext, ResolutionFailure> {
        let managed_provider = match self.via_managed_provider(&token).await {
            Ok((identity, claims)) => {
                return Ok(AuthContext {
                    raw_token: token,
                    identity,
                    claims: Some(claims),
                    strategy: AuthStrategy::ManagedProvider,
                })
            }
            Err(e) => {
                tracing::debug!(error_code = e.error_code(), error = %e, "managed provider rejected token");
                e
            }
        };

        match self.via_self_issued(&token).await {
            Ok((identity, claims)) => Ok(AuthContext {
                raw_token: token,
                identity,
                claims: Some(claims),
                strategy: AuthStrategy::SelfIssued,
            }),
            Err(self_issued) => Err(ResolutionFailure {
                managed_provider,
                self_issued,
            }),
        }
    }

    async fn via_managed_provider(
        &self,
        token: &BearerToken,
    ) -> Result<(UserIdentity, RawClaims), AuthError> {
        let verified = self.provider.verify_id_token(token.as_str()).await?;
        let filter = IdentityResolver::provider_filter(&verified.claims);
        let identity = self
            .identities
            .find_or_create_by_provider_claims(&filter, &verified.claims)
            .await?;
        Ok((identity, verified.payload))
    }

    async fn via_self_issued(
        &self,
        token: &BearerToken,
    ) -> Result<(UserIdentity, RawClaims), AuthError> {
        let claims = self
            .sessions
            .verify(token.as_str())
            .map_err(AuthError::SelfIssuedVerificationFailed)?;
        let filter = claims.user_id_filter().ok_or(AuthError::ClaimsIncomplete)?;
        let identity = self
            .identities
            .find_by_id(&filter)
            .await?
            .ok_or_else(|| AuthError::IdentityNotFound(filter.key()))?;
        Ok((identity, claims.0))
    }
}
