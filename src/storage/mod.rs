// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Storage
//!
//! Persistent user identities, consumed by authentication through the small
//! [`IdentityStore`] contract: look one record up, create one, or fill in its
//! Firebase uid.
//!
//! ## Uniqueness
//!
//! At most one record may carry a given `firebase_uid`. Implementations MUST
//! enforce this inside the same atomic write that creates or patches the
//! record, and report a violation as [`StoreError::Conflict`]. Callers
//! provisioning identities rely on this: they create, and on conflict re-fetch
//! by uid, so concurrent first sightings of one identity converge on a single
//! record without any application-level lock.

use async_trait::async_trait;

pub mod error;
pub mod record_id;
pub mod user_database;
pub mod users;

pub use error::{StoreError, StoreResult};
pub use record_id::RecordId;
pub use user_database::UserDatabase;
pub use users::{normalize_email, NewUserIdentity, UserIdentity};

/// Lookup of a record by its primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdFilter {
    /// Store-native id; matched by its canonical lowercase hex form.
    Record(RecordId),
    /// Any other key, matched verbatim.
    Opaque(String),
}

impl UserIdFilter {
    /// Classify a raw id: 24-hex strings become [`UserIdFilter::Record`].
    pub fn from_raw(raw: &str) -> Self {
        match RecordId::parse(raw) {
            Some(id) => UserIdFilter::Record(id),
            None => UserIdFilter::Opaque(raw.to_string()),
        }
    }

    /// Primary key this filter matches.
    pub fn key(&self) -> String {
        match self {
            UserIdFilter::Record(id) => id.to_string(),
            UserIdFilter::Opaque(key) => key.clone(),
        }
    }
}

/// Query accepted by [`IdentityStore::find_one`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    Id(UserIdFilter),
    FirebaseUid(String),
    /// Exact match on the stored (normalized) email.
    Email(String),
    /// First clause, in order, that matches a record wins.
    AnyOf(Vec<UserFilter>),
}

impl UserFilter {
    /// Leaf clauses in evaluation order, with nested `AnyOf` flattened.
    pub fn clauses(&self) -> Vec<&UserFilter> {
        match self {
            UserFilter::AnyOf(filters) => filters.iter().flat_map(|f| f.clauses()).collect(),
            leaf => vec![leaf],
        }
    }
}

/// Persistent user identity store.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Return the first record matching `filter`.
    async fn find_one(&self, filter: &UserFilter) -> StoreResult<Option<UserIdentity>>;

    /// Insert a new record.
    ///
    /// Fails with [`StoreError::Conflict`] when `firebase_uid` is already taken.
    async fn create(&self, user: NewUserIdentity) -> StoreResult<UserIdentity>;

    /// Fill in the Firebase uid of record `id` if it has none.
    ///
    /// A record that already carries a uid is returned unchanged. Fails with
    /// [`StoreError::Conflict`] when another record holds `firebase_uid`, and
    /// [`StoreError::NotFound`] when `id` does not exist.
    async fn set_firebase_uid(&self, id: &str, firebase_uid: &str) -> StoreResult<UserIdentity>;

    /// Cheap availability check for readiness probes.
    async fn ping(&self) -> StoreResult<()>;
}
