//! Audit trail and managed encryption keys.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::stats::LabelCount;
use crate::domain::types::{
    AuditLogId, CompanyId, EncryptionKeyId, Label, Title, UserId, string_enum,
};

/// Cipher every managed key is generated for.
pub const KEY_ALGORITHM: &str = "chacha20poly1305";
/// Active keys older than this (since creation or last rotation) are due.
pub const ROTATION_PERIOD_DAYS: i64 = 90;
/// Window of the dashboard activity breakdown.
pub const ACTIVITY_WINDOW_DAYS: i64 = 30;

string_enum!(KeyStatus {
    Active => "active",
    Revoked => "revoked",
});

/// Actions written by key management.
pub mod actions {
    pub const KEY_CREATED: &str = "key.created";
    pub const KEY_ROTATED: &str = "key.rotated";
    pub const KEY_REVOKED: &str = "key.revoked";
}

pub const ENTITY_ENCRYPTION_KEY: &str = "encryption_key";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i32>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub action: Label,
    pub entity_type: Label,
    pub entity_id: Option<i32>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

/// Key metadata. The wrapped material never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptionKey {
    pub id: EncryptionKeyId,
    pub company_id: CompanyId,
    pub name: String,
    pub algorithm: String,
    #[serde(skip)]
    pub wrapped_key: String,
    pub version: i32,
    pub status: KeyStatus,
    pub created_at: NaiveDateTime,
    pub rotated_at: Option<NaiveDateTime>,
}

impl EncryptionKey {
    pub fn is_active(&self) -> bool {
        self.status == KeyStatus::Active
    }

    pub fn rotation_due(&self, now: NaiveDateTime) -> bool {
        let last = self.rotated_at.unwrap_or(self.created_at);
        self.is_active() && last <= rotation_cutoff(now)
    }
}

/// Keys last rotated at or before this instant are due for rotation.
pub fn rotation_cutoff(now: NaiveDateTime) -> NaiveDateTime {
    now - Duration::days(ROTATION_PERIOD_DAYS)
}

#[derive(Debug, Clone)]
pub struct NewEncryptionKey {
    pub company_id: CompanyId,
    pub name: Title,
    pub wrapped_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityDashboard {
    pub events_by_action: Vec<LabelCount>,
    /// Labels are user ids.
    pub top_users: Vec<LabelCount>,
    pub active_keys: i64,
    pub rotation_due: i64,
}

/// Result of an encrypt or decrypt call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CipherOutput {
    pub key_id: EncryptionKeyId,
    pub version: i32,
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key(created: NaiveDateTime, rotated: Option<NaiveDateTime>, status: KeyStatus) -> EncryptionKey {
        EncryptionKey {
            id: EncryptionKeyId::new(1).unwrap(),
            company_id: CompanyId::new(1).unwrap(),
            name: "payroll".into(),
            algorithm: KEY_ALGORITHM.into(),
            wrapped_key: "wrapped".into(),
            version: 1,
            status,
            created_at: created,
            rotated_at: rotated,
        }
    }

    fn day(m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn rotation_counts_from_last_rotation() {
        let now = day(6, 1);
        assert!(key(day(1, 1), None, KeyStatus::Active).rotation_due(now));
        assert!(!key(day(1, 1), Some(day(5, 1)), KeyStatus::Active).rotation_due(now));
        assert!(!key(day(1, 1), None, KeyStatus::Revoked).rotation_due(now));
    }

    #[test]
    fn wrapped_material_is_not_serialized() {
        let json = serde_json::to_value(key(day(1, 1), None, KeyStatus::Active)).unwrap();
        assert!(json.get("wrapped_key").is_none());
        assert_eq!(json["status"], "active");
    }
}
