// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Native record identifiers.
//!
//! A record id is 12 bytes rendered as 24 lowercase hex characters:
//! 4 bytes of big-endian creation time (Unix seconds) followed by 8 random
//! bytes. Records imported from the legacy system may instead carry an
//! arbitrary string key; see [`UserIdFilter`](super::UserIdFilter).

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const RECORD_ID_LEN: usize = 12;

/// Store-native 12-byte record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId([u8; RECORD_ID_LEN]);

impl RecordId {
    /// Generate a fresh id for a record created now.
    pub fn new() -> Self {
        let mut bytes = [0u8; RECORD_ID_LEN];
        let seconds = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        // v4 fixes the version nibble in byte 6 and the variant bits in byte 8
        let random = Uuid::new_v4();
        let random = random.as_bytes();
        bytes[4..10].copy_from_slice(&random[..6]);
        bytes[10..].copy_from_slice(&random[9..11]);
        Self(bytes)
    }

    /// Parse a 24-character hex string (either case).
    ///
    /// Returns `None` for anything else, including surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != RECORD_ID_LEN * 2 {
            return None;
        }
        let bytes = hex::decode(s).ok()?;
        bytes.try_into().ok().map(Self)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for RecordId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RecordId::parse(&value).ok_or_else(|| format!("invalid record id: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_24_lowercase_hex() {
        let id = RecordId::new();
        let rendered = id.to_string();
        assert_eq!(rendered.len(), 24);
        assert!(rendered
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(RecordId::parse(&rendered), Some(id));
    }

    #[test]
    fn parse_accepts_uppercase_and_normalizes() {
        let id = RecordId::parse("65A1B2C3D4E5F60718293A4B").unwrap();
        assert_eq!(id.to_string(), "65a1b2c3d4e5f60718293a4b");
    }

    #[test]
    fn parse_rejects_other_shapes() {
        assert!(RecordId::parse("").is_none());
        assert!(RecordId::parse("user-42").is_none());
        assert!(RecordId::parse("65a1b2c3d4e5f60718293a4").is_none());
        assert!(RecordId::parse("65a1b2c3d4e5f60718293a4bz").is_none());
        assert!(RecordId::parse("zza1b2c3d4e5f60718293a4b").is_none());
    }

    #[test]
    fn new_ids_start_with_creation_seconds() {
        let before = Utc::now().timestamp() as u32;
        let rendered = RecordId::new().to_string();
        let prefix = u32::from_str_radix(&rendered[..8], 16).unwrap();
        assert!(prefix >= before);
    }

    #[test]
    fn new_ids_are_distinct_within_one_second() {
        let ids: std::collections::HashSet<RecordId> = (0..1000).map(|_| RecordId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = RecordId::parse("65a1b2c3d4e5f60718293a4b").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"65a1b2c3d4e5f60718293a4b\"");
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
