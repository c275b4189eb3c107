// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded identity database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: record id → serialized UserIdentity
//! - `users_by_firebase_uid`: firebase uid → record id (unique)
//! - `users_by_email`: normalized email → record ids (multimap)
//!
//! Index entries are written in the same write transaction as the record.
//! redb serializes write transactions, so the uniqueness check on
//! `users_by_firebase_uid` and the insert that follows cannot interleave with
//! another writer.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use redb::{
    Database, MultimapTableDefinition, ReadableDatabase, ReadableMultimapTable, ReadableTable,
    ReadableTableMetadata, TableDefinition,
};

use super::{
    normalize_email, IdentityStore, NewUserIdentity, RecordId, StoreError, StoreResult,
    UserFilter, UserIdentity,
};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: record id → serialized UserIdentity (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique index: firebase uid → record id.
const USERS_BY_FIREBASE_UID: TableDefinition<&str, &str> =
    TableDefinition::new("users_by_firebase_uid");

/// Index: normalized email → record ids.
const USERS_BY_EMAIL: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("users_by_email");

// =============================================================================
// UserDatabase
// =============================================================================

/// Embedded ACID identity store.
///
/// Cheap to clone; clones share the underlying database handle.
#[derive(Clone)]
pub struct UserDatabase {
    db: Arc<Database>,
}

impl UserDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERS_BY_FIREBASE_UID)?;
            let _ = write_txn.open_multimap_table(USERS_BY_EMAIL)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Number of stored records.
    pub fn count_users(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        Ok(table.len()?)
    }

    /// Insert a fully-formed record, keeping its id.
    ///
    /// Used to load records carried over from the legacy user table, whose ids
    /// may be opaque strings rather than [`RecordId`]s. The email is stored
    /// normalized so provider logins can match it.
    pub fn import(&self, user: &UserIdentity) -> StoreResult<()> {
        let user = &UserIdentity {
            email: user.email.as_deref().and_then(normalize_email),
            ..user.clone()
        };
        let write_txn = self.db.begin_write()?;
        let result = (|| -> StoreResult<()> {
            let mut users = write_txn.open_table(USERS)?;
            let mut by_uid = write_txn.open_table(USERS_BY_FIREBASE_UID)?;
            let mut by_email = write_txn.open_multimap_table(USERS_BY_EMAIL)?;

            if users.get(user.id.as_str())?.is_some() {
                return Err(StoreError::Conflict { field: "id" });
            }
            if let Some(uid) = &user.firebase_uid {
                if by_uid.get(uid.as_str())?.is_some() {
                    return Err(StoreError::Conflict {
                        field: "firebase_uid",
                    });
                }
                by_uid.insert(uid.as_str(), user.id.as_str())?;
            }
            if let Some(email) = &user.email {
                by_email.insert(email.as_str(), user.id.as_str())?;
            }

            let json = serde_json::to_vec(user)?;
            users.insert(user.id.as_str(), json.as_slice())?;
            Ok(())
        })();

        finish(write_txn, result)
    }

    fn find_one_blocking(&self, filter: &UserFilter) -> StoreResult<Option<UserIdentity>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        let by_uid = read_txn.open_table(USERS_BY_FIREBASE_UID)?;
        let by_email = read_txn.open_multimap_table(USERS_BY_EMAIL)?;

        for clause in filter.clauses() {
            let id = match clause {
                UserFilter::Id(id) => Some(id.key()),
                UserFilter::FirebaseUid(uid) => {
                    by_uid.get(uid.as_str())?.map(|v| v.value().to_string())
                }
                UserFilter::Email(email) => match by_email.get(email.as_str())?.next() {
                    Some(entry) => Some(entry?.value().to_string()),
                    None => None,
                },
                UserFilter::AnyOf(_) => None,
            };

            let Some(id) = id else { continue };
            if let Some(value) = users.get(id.as_str())? {
                let user: UserIdentity = serde_json::from_slice(value.value())?;
                return Ok(Some(user));
            }
        }

        Ok(None)
    }

    fn create_blocking(&self, new_user: NewUserIdentity) -> StoreResult<UserIdentity> {
        self.insert_new_blocking(RecordId::new(), new_user)
    }

    /// Insert a new record under `id`, which must not be taken.
    fn insert_new_blocking(&self, id: RecordId, new_user: NewUserIdentity) -> StoreResult<UserIdentity> {
        let id = id.to_string();
        let write_txn = self.db.begin_write()?;
        let result = (|| -> StoreResult<UserIdentity> {
            let mut users = write_txn.open_table(USERS)?;
            let mut by_uid = write_txn.open_table(USERS_BY_FIREBASE_UID)?;
            let mut by_email = write_txn.open_multimap_table(USERS_BY_EMAIL)?;

            if users.get(id.as_str())?.is_some() {
                return Err(StoreError::Conflict { field: "id" });
            }
            if let Some(uid) = &new_user.firebase_uid {
                if by_uid.get(uid.as_str())?.is_some() {
                    return Err(StoreError::Conflict {
                        field: "firebase_uid",
                    });
                }
            }

            let now = Utc::now();
            let user = UserIdentity {
                id,
                firebase_uid: new_user.firebase_uid,
                email: new_user.email,
                role: new_user.role,
                created_at: now,
                updated_at: now,
            };

            let json = serde_json::to_vec(&user)?;
            users.insert(user.id.as_str(), json.as_slice())?;
            if let Some(uid) = &user.firebase_uid {
                by_uid.insert(uid.as_str(), user.id.as_str())?;
            }
            if let Some(email) = &user.email {
                by_email.insert(email.as_str(), user.id.as_str())?;
            }

            Ok(user)
        })();

        finish(write_txn, result)
    }

    fn set_firebase_uid_blocking(&self, id: &str, firebase_uid: &str) -> StoreResult<UserIdentity> {
        let write_txn = self.db.begin_write()?;
        let result = (|| -> StoreResult<UserIdentity> {
            let mut users = write_txn.open_table(USERS)?;
            let mut by_uid = write_txn.open_table(USERS_BY_FIREBASE_UID)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = users
                    .get(id)?
                    .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;
                existing.value().to_vec()
            };
            let mut user: UserIdentity = serde_json::from_slice(&existing_bytes)?;

            if user.firebase_uid.is_some() {
                return Ok(user);
            }

            let holder = by_uid.get(firebase_uid)?.map(|v| v.value().to_string());
            if holder.is_some_and(|holder| holder != id) {
                return Err(StoreError::Conflict {
                    field: "firebase_uid",
                });
            }

            user.firebase_uid = Some(firebase_uid.to_string());
            user.updated_at = Utc::now();

            let json = serde_json::to_vec(&user)?;
            users.insert(id, json.as_slice())?;
            by_uid.insert(firebase_uid, id)?;

            Ok(user)
        })();

        finish(write_txn, result)
    }

    fn ping_blocking(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}

/// Commit on success, abort on failure.
fn finish<T>(write_txn: redb::WriteTransaction, result: StoreResult<T>) -> StoreResult<T> {
    match result {
        Ok(value) => {
            write_txn.commit()?;
            Ok(value)
        }
        Err(e) => {
            write_txn.abort()?;
            Err(e)
        }
    }
}

// redb is synchronous; every call is moved onto the blocking pool. A caller that
// is dropped mid-call leaves the blocking task to finish its transaction.
#[async_trait]
impl IdentityStore for UserDatabase {
    async fn find_one(&self, filter: &UserFilter) -> StoreResult<Option<UserIdentity>> {
        let db = self.clone();
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || db.find_one_blocking(&filter)).await?
    }

    async fn create(&self, user: NewUserIdentity) -> StoreResult<UserIdentity> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.create_blocking(user)).await?
    }

    async fn set_firebase_uid(&self, id: &str, firebase_uid: &str) -> StoreResult<UserIdentity> {
        let db = self.clone();
        let id = id.to_string();
        let firebase_uid = firebase_uid.to_string();
        tokio::task::spawn_blocking(move || db.set_firebase_uid_blocking(&id, &firebase_uid))
            .await?
    }

    async fn ping(&self) -> StoreResult<()> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.ping_blocking()).await?
    }
}

// =============================================================================
// Tests
// =============================================================================
