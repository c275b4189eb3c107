// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthResolver, JwksManager};
use crate::storage::IdentityStore;

/// Shared application state.
///
/// Everything here is safe to share across requests; nothing is per-request.
#[derive(Clone)]
pub struct AppState {
    /// Bearer token resolution
    pub auth: AuthResolver,
    /// Identity store, also probed by readiness checks
    pub identities: Arc<dyn IdentityStore>,
    /// Provider key cache, when the Firebase provider is configured
    pub jwks: Option<JwksManager>,
}

impl AppState {
    pub fn new(auth: AuthResolver, identities: Arc<dyn IdentityStore>) -> Self {
        Self {
            auth,
            identities,
            jwks: None,
        }
    }

    pub fn with_jwks(mut self, jwks: JwksManager) -> Self {
        self.jwks = Some(jwks);
        self
    }
}
