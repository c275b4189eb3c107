// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles.
//!
//! Authentication only attaches the stored role to the request; it never
//! changes it. New identities start as `Customer`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role stored on a user identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Invoice recipient; the default for provisioned identities
    Customer,
    /// Back-office staff
    Admin,
}

impl Default for Role {
    /// Default role is Customer (least privilege).
    fn default() -> Self {
        Role::Customer
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}
