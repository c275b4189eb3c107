// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Managed identity provider (Firebase Authentication).
//!
//! Firebase ID tokens are RS256 JWTs signed by Google. A token is accepted
//! when:
//!
//! - the header names a `kid` present in the securetoken JWKS
//! - `iss` is `https://securetoken.google.com/<project>`
//! - `aud` is the project id
//! - `exp`, `iat` and `auth_time` are consistent with the current time
//! - `sub` is a non-empty string (the Firebase uid)

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::Value;

use super::claims::{ManagedProviderClaims, RawClaims, VerifiedIdToken};
use super::error::ProviderError;
use super::jwks::JwksManager;

/// Clock skew tolerated on time-based claims, in seconds.
pub const PROVIDER_LEEWAY_SECS: u64 = 60;

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Verifies ID tokens issued by a managed identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdToken, ProviderError>;
}

/// Firebase ID token verifier backed by a cached JWKS.
#[derive(Clone)]
pub struct FirebaseProvider {
    project_id: String,
    issuer: String,
    jwks: JwksManager,
}

impl FirebaseProvider {
    pub fn new(project_id: impl Into<String>, jwks: JwksManager) -> Self {
        let project_id = project_id.into();
        Self {
            issuer: format!("{ISSUER_PREFIX}{project_id}"),
            project_id,
            jwks,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = PROVIDER_LEEWAY_SECS;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.project_id]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }
}

#[async_trait]
impl IdentityProvider for FirebaseProvider {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdToken, ProviderError> {
        let header = decode_header(token).map_err(|_| ProviderError::MalformedToken)?;
        if header.alg != Algorithm::RS256 {
            return Err(ProviderError::UnsupportedAlgorithm);
        }
        let kid = header.kid.ok_or(ProviderError::NoMatchingKey)?;

        let (key, _) = self.jwks.get_decoding_key(&kid).await?;
        let data = decode::<RawClaims>(token, &key, &self.validation())?;
        let payload = data.claims;

        check_not_in_future(&payload, "iat")?;
        check_not_in_future(&payload, "auth_time")?;

        let uid = payload
            .get("sub")
            .and_then(Value::as_str)
            .filter(|sub| !sub.is_empty())
            .ok_or(ProviderError::MissingSubject)?
            .to_string();
        let email = payload
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(VerifiedIdToken {
            claims: ManagedProviderClaims { uid, email },
            payload,
        })
    }
}

/// Reject a timestamp claim set later than now plus leeway.
fn check_not_in_future(payload: &RawClaims, claim: &str) -> Result<(), ProviderError> {
    let Some(value) = payload.get(claim) else {
        return Ok(());
    };
    let ts = value.as_u64().ok_or(ProviderError::MalformedToken)?;
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    if ts > now + PROVIDER_LEEWAY_SECS {
        return Err(ProviderError::TokenNotYetValid);
    }
    Ok(())
}
