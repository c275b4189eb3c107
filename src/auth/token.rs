// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer credential extraction.

use std::fmt;

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
use sha2::{Digest, Sha256};

const BEARER_PREFIX: &str = "bearer ";

/// Number of hex characters of the SHA-256 digest used in logs.
const FINGERPRINT_LEN: usize = 12;

/// Non-empty credential taken from an `Authorization: Bearer` header.
///
/// `Debug` is redacted; use [`BearerToken::fingerprint`] to correlate tokens
/// in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 prefix identifying this token without revealing it.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..FINGERPRINT_LEN / 2])
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken({})", self.fingerprint())
    }
}

/// Extract the bearer credential from a raw header value.
///
/// The value must be visible ASCII and, once trimmed, start with `Bearer `
/// (scheme matched case-insensitively) followed by a non-blank token. Any
/// other shape yields `None`.
pub fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<BearerToken> {
    let raw = value?.to_str().ok()?.trim();

    let scheme = raw.get(..BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }

    let token = raw[BEARER_PREFIX.len()..].trim();
    if token.is_empty() {
        None
    } else {
        Some(BearerToken(token.to_string()))
    }
}

/// [`extract_bearer_token`] applied to the request's `Authorization` header.
pub fn bearer_from_headers(headers: &HeaderMap) -> Option<BearerToken> {
    extract_bearer_token(headers.get(AUTHORIZATION))
}

#[cfg(test)]
impl BearerToken {
    pub(crate) fn for_tests(token: &str) -> Self {
        BearerToken(token.to_string())
    }
}
