// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token authentication for the invoicing API during the migration
//! from self-issued session tokens to Firebase Authentication.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. Server tries the token as a Firebase ID token:
//!    - verifies signature against the securetoken JWKS, plus issuer, audience
//!      and expiry
//!    - finds the user by Firebase uid or email, linking or provisioning as
//!      needed
//! 3. Otherwise, server tries it as a legacy HMAC session token:
//!    - verifies signature (and expiry when present)
//!    - loads the user named by `sub`, `_id` or `id`
//! 4. The resolved [`AuthContext`] is attached to the request
//!
//! ## Security
//!
//! - Callers only ever see "No token provided" or "Invalid token"
//! - Tokens are never logged; a short SHA-256 fingerprint is used instead
//! - JWKS is fetched over HTTPS and cached
//! - Clock skew tolerance is 60 seconds for Firebase tokens, none for legacy tokens

pub mod claims;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod jwks;
pub mod middleware;
pub mod provider;
pub mod resolver;
pub mod roles;
pub mod self_issued;
pub mod token;

#[cfg(test)]
pub(crate) mod test_keys;
#[cfg(test)]
pub(crate) mod testing;

pub use claims::{AuthContext, AuthStrategy, ManagedProviderClaims, RawClaims, SelfIssuedClaims};
pub use error::{AuthError, AuthRejection, ProviderError};
pub use extractor::Auth;
pub use identity::IdentityResolver;
pub use jwks::JwksManager;
pub use middleware::require_auth;
pub use provider::{FirebaseProvider, IdentityProvider};
pub use resolver::{AuthResolver, ResolutionFailure};
pub use roles::Role;
pub use self_issued::{HmacSessionVerifier, SessionTokenVerifier};
pub use token::{extract_bearer_token, BearerToken};
