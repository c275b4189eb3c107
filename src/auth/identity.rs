// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mapping verified claims to stored user identities.
//!
//! ## Provisioning
//!
//! A provider-authenticated caller is matched by Firebase uid first, then by
//! normalized email. An email match without a uid is linked in place so the
//! record keeps its id. No match creates a new `Customer` identity.
//!
//! Concurrent first logins for the same uid race on the store's unique index.
//! The loser sees [`StoreError::Conflict`] and re-reads the winner's record,
//! so every caller converges on one identity.

use std::sync::Arc;

use super::claims::ManagedProviderClaims;
use crate::storage::{
    normalize_email, IdentityStore, NewUserIdentity, StoreError, StoreResult, UserFilter,
    UserIdFilter, UserIdentity,
};

/// Identity lookups and just-in-time provisioning on top of an [`IdentityStore`].
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Lookup for a provider-authenticated caller: uid, then normalized email.
    pub fn provider_filter(claims: &ManagedProviderClaims) -> UserFilter {
        let by_uid = UserFilter::FirebaseUid(claims.uid.clone());
        match claims.email.as_deref().and_then(normalize_email) {
            Some(email) => UserFilter::AnyOf(vec![by_uid, UserFilter::Email(email)]),
            None => by_uid,
        }
    }

    /// Return the identity matching `filter`, linking or creating as needed.
    pub async fn find_or_create_by_provider_claims(
        &self,
        filter: &UserFilter,
        claims: &ManagedProviderClaims,
    ) -> StoreResult<UserIdentity> {
        match self.store.find_one(filter).await? {
            Some(user) if user.firebase_uid.is_none() => {
                match self.store.set_firebase_uid(&user.id, &claims.uid).await {
                    Ok(linked) => {
                        tracing::info!(user_id = %linked.id, "linked firebase uid to existing user");
                        Ok(linked)
                    }
                    Err(StoreError::Conflict { .. }) => self.refetch_by_uid(&claims.uid).await,
                    Err(e) => Err(e),
                }
            }
            Some(user) => Ok(user),
            None => {
                let new_user = NewUserIdentity::customer(&claims.uid, claims.email.as_deref());
                match self.store.create(new_user).await {
                    Ok(created) => {
                        tracing::info!(user_id = %created.id, "provisioned user identity");
                        Ok(created)
                    }
                    Err(StoreError::Conflict { .. }) => self.refetch_by_uid(&claims.uid).await,
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Lookup by primary key.
    pub async fn find_by_id(&self, filter: &UserIdFilter) -> StoreResult<Option<UserIdentity>> {
        self.store.find_one(&UserFilter::Id(filter.clone())).await
    }

    async fn refetch_by_uid(&self, uid: &str) -> StoreResult<UserIdentity> {
        tracing::debug!("firebase uid claimed concurrently; re-reading");
        self.store
            .find_one(&UserFilter::FirebaseUid(uid.to_string()))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user with firebase uid {uid}")))
    }
}
