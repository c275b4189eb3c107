// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified claims and the per-request authentication context.

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::token::BearerToken;
use crate::storage::{UserIdFilter, UserIdentity};

/// Decoded JWT payload, kept verbatim for downstream handlers.
pub type RawClaims = Map<String, Value>;

/// Normalized claims from a Firebase ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedProviderClaims {
    /// Firebase uid (the token's `sub`)
    pub uid: String,
    /// Email as asserted by the provider, not yet normalized
    pub email: Option<String>,
}

/// Result of a successful provider verification.
#[derive(Debug, Clone)]
pub struct VerifiedIdToken {
    pub claims: ManagedProviderClaims,
    pub payload: RawClaims,
}

/// Accessor for one candidate user-id field of a self-issued payload.
type IdAccessor = fn(&RawClaims) -> Option<&Value>;

/// User-id fields of a self-issued payload, in precedence order.
const USER_ID_ACCESSORS: [IdAccessor; 3] = [subject_field, internal_id_field, id_field];

fn subject_field(payload: &RawClaims) -> Option<&Value> {
    payload.get("sub")
}

fn internal_id_field(payload: &RawClaims) -> Option<&Value> {
    payload.get("_id")
}

fn id_field(payload: &RawClaims) -> Option<&Value> {
    payload.get("id")
}

/// Payload of a verified self-issued token.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfIssuedClaims(pub RawClaims);

impl SelfIssuedClaims {
    /// First non-null user-id field, in precedence order.
    pub fn user_id_value(&self) -> Option<&Value> {
        USER_ID_ACCESSORS
            .iter()
            .filter_map(|accessor| accessor(&self.0))
            .find(|value| !value.is_null())
    }

    /// Lookup filter for the referenced user.
    ///
    /// Strings are trimmed and numbers used in decimal form. A blank string or
    /// any other JSON type yields `None`; later fields are not consulted once a
    /// non-null one is found.
    pub fn user_id_filter(&self) -> Option<UserIdFilter> {
        let raw = match self.user_id_value()? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };

        if raw.is_empty() {
            None
        } else {
            Some(UserIdFilter::from_raw(&raw))
        }
    }
}

/// Strategy that authenticated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// Firebase ID token
    ManagedProvider,
    /// Legacy self-issued JWT
    SelfIssued,
}

impl AuthStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStrategy::ManagedProvider => "managed_provider",
            AuthStrategy::SelfIssued => "self_issued",
        }
    }
}

/// Identity attached to an authenticated request.
///
/// Built once per request and stored in the request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub raw_token: BearerToken,
    pub identity: UserIdentity,
    /// Decoded payload of whichever token authenticated the request
    pub claims: Option<RawClaims>,
    pub strategy: AuthStrategy,
}
