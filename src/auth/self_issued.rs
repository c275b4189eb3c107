// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legacy self-issued session tokens.
//!
//! These are HMAC-signed JWTs minted by the previous login flow. Only the
//! signature is mandatory; `exp` and `nbf` are enforced when present, with no
//! leeway.

use jsonwebtoken::errors::Error as JwtError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use super::claims::{RawClaims, SelfIssuedClaims};
use crate::config::JwtSecret;

/// Verifies self-issued session tokens.
pub trait SessionTokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<SelfIssuedClaims, JwtError>;
}

/// HS256/HS384/HS512 verifier keyed by the configured secret.
pub struct HmacSessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl HmacSessionVerifier {
    pub fn new(secret: &JwtSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl SessionTokenVerifier for HmacSessionVerifier {
    fn verify(&self, token: &str) -> Result<SelfIssuedClaims, JwtError> {
        let data = decode::<RawClaims>(token, &self.key, &self.validation)?;
        Ok(SelfIssuedClaims(data.claims))
    }
}
