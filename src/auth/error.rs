// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! [`AuthError`] and [`ProviderError`] describe why a strategy failed and are
//! only ever logged. Callers see an [`AuthRejection`], which carries no detail
//! beyond whether a credential was present.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::StoreError;

/// Failure verifying a token with the managed identity provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("token is malformed")]
    MalformedToken,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    TokenExpired,
    #[error("token is not yet valid")]
    TokenNotYetValid,
    #[error("token issuer is invalid")]
    InvalidIssuer,
    #[error("token audience is invalid")]
    InvalidAudience,
    #[error("token has no subject")]
    MissingSubject,
    #[error("token algorithm is not accepted")]
    UnsupportedAlgorithm,
    #[error("no matching key found in JWKS")]
    NoMatchingKey,
    #[error("failed to fetch JWKS: {0}")]
    JwksFetch(String),
    #[error("invalid key in JWKS: {0}")]
    InvalidKey(String),
}

impl From<jsonwebtoken::errors::Error> for ProviderError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => ProviderError::TokenExpired,
            ErrorKind::InvalidSignature => ProviderError::InvalidSignature,
            ErrorKind::InvalidIssuer => ProviderError::InvalidIssuer,
            ErrorKind::InvalidAudience => ProviderError::InvalidAudience,
            ErrorKind::ImmatureSignature => ProviderError::TokenNotYetValid,
            ErrorKind::InvalidAlgorithm => ProviderError::UnsupportedAlgorithm,
            _ => ProviderError::MalformedToken,
        }
    }
}

/// Why a single authentication strategy failed.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Nothing extractable from the Authorization header
    #[error("no bearer credential provided")]
    NoCredential,

    /// Firebase rejected the token or could not be reached
    #[error("provider verification failed: {0}")]
    ProviderVerificationFailed(#[source] ProviderError),

    /// Bad signature or expiry on a self-issued token
    #[error("self-issued token verification failed: {0}")]
    SelfIssuedVerificationFailed(#[source] jsonwebtoken::errors::Error),

    /// Self-issued payload carries no usable user id
    #[error("missing user id in token payload")]
    ClaimsIncomplete,

    /// Self-issued payload references a user that does not exist
    #[error("no user found for id {0}")]
    IdentityNotFound(String),

    /// Identity store failed during lookup or provisioning
    #[error("identity store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// Provisioning lost a race but the winning record could not be read back
    #[error("identity could not be resolved: {0}")]
    IdentityUnresolved(#[source] StoreError),
}

impl AuthError {
    /// Stable code for structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NoCredential => "no_credential",
            AuthError::ProviderVerificationFailed(_) => "provider_verification_failed",
            AuthError::SelfIssuedVerificationFailed(_) => "self_issued_verification_failed",
            AuthError::ClaimsIncomplete => "claims_incomplete",
            AuthError::IdentityNotFound(_) => "identity_not_found",
            AuthError::StoreUnavailable(_) => "store_unavailable",
            AuthError::IdentityUnresolved(_) => "identity_unresolved",
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(e: ProviderError) -> Self {
        AuthError::ProviderVerificationFailed(e)
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => AuthError::IdentityUnresolved(e),
            e => AuthError::StoreUnavailable(e),
        }
    }
}

/// The only authentication outcomes visible to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No extractable bearer credential
    NoToken,
    /// Every strategy failed
    InvalidToken,
}

#[derive(Serialize)]
struct RejectionBody {
    message: &'static str,
}

impl AuthRejection {
    pub fn message(&self) -> &'static str {
        match self {
            AuthRejection::NoToken => "No token provided",
            AuthRejection::InvalidToken => "Invalid token",
        }
    }
}

impl std::fmt::Display for AuthRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = Json(RejectionBody {
            message: self.message(),
        });
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}
