// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted user identity records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;

/// Canonical persisted user record.
///
/// `id` is either a [`RecordId`](super::RecordId) rendered as hex (records
/// created by this service) or an opaque key carried over from the legacy
/// user table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    /// Firebase uid; unique across all records when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,
    /// Lowercased, trimmed email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a record about to be created. The store assigns `id` and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserIdentity {
    pub firebase_uid: Option<String>,
    pub email: Option<String>,
    pub role: Role,
}

impl NewUserIdentity {
    /// A least-privileged record for a first-seen provider identity.
    pub fn customer(firebase_uid: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            firebase_uid: Some(firebase_uid.into()),
            email: email.and_then(normalize_email),
            role: Role::Customer,
        }
    }
}

/// Trim and lowercase an email; blank input yields `None`.
pub fn normalize_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
