use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::security_features::{
    AuditLog as DomainAuditLog, EncryptionKey as DomainEncryptionKey, KEY_ALGORITHM,
    NewAuditLog as DomainNewAuditLog, NewEncryptionKey as DomainNewEncryptionKey,
};
use crate::domain::types::{AuditLogId, CompanyId, EncryptionKeyId, TypeConstraintError, UserId};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::audit_logs)]
pub struct AuditLog {
    pub id: i32,
    pub company_id: i32,
    pub user_id: i32,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i32>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::audit_logs)]
pub struct NewAuditLog<'a> {
    pub company_id: i32,
    pub user_id: i32,
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: Option<i32>,
    pub details: Option<&'a str>,
    pub ip_address: Option<&'a str>,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::encryption_keys)]
pub struct EncryptionKey {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub algorithm: String,
    pub wrapped_key: String,
    pub version: i32,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub rotated_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::encryption_keys)]
pub struct NewEncryptionKey<'a> {
    pub company_id: i32,
    pub name: &'a str,
    pub algorithm: &'a str,
    pub wrapped_key: &'a str,
}

impl TryFrom<AuditLog> for DomainAuditLog {
    type Error = TypeConstraintError;

    fn try_from(log: AuditLog) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AuditLogId::new(log.id)?,
            company_id: CompanyId::new(log.company_id)?,
            user_id: UserId::new(log.user_id)?,
            action: log.action,
            entity_type: log.entity_type,
            entity_id: log.entity_id,
            details: log.details,
            ip_address: log.ip_address,
            created_at: log.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewAuditLog> for NewAuditLog<'a> {
    fn from(log: &'a DomainNewAuditLog) -> Self {
        Self {
            company_id: log.company_id.get(),
            user_id: log.user_id.get(),
            action: log.action.as_str(),
            entity_type: log.entity_type.as_str(),
            entity_id: log.entity_id,
            details: log.details.as_deref(),
            ip_address: log.ip_address.as_deref(),
        }
    }
}

impl TryFrom<EncryptionKey> for DomainEncryptionKey {
    type Error = TypeConstraintError;

    fn try_from(key: EncryptionKey) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EncryptionKeyId::new(key.id)?,
            company_id: CompanyId::new(key.company_id)?,
            name: key.name,
            algorithm: key.algorithm,
            wrapped_key: key.wrapped_key,
            version: key.version,
            status: key.status.parse()?,
            created_at: key.created_at,
            rotated_at: key.rotated_at,
        })
    }
}

impl<'a> From<&'a DomainNewEncryptionKey> for NewEncryptionKey<'a> {
    fn from(key: &'a DomainNewEncryptionKey) -> Self {
        Self {
            company_id: key.company_id.get(),
            name: key.name.as_str(),
            algorithm: KEY_ALGORITHM,
            wrapped_key: &key.wrapped_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::security_features::KeyStatus;
    use crate::domain::types::Title;
    use chrono::NaiveDate;

    #[test]
    fn unknown_key_status_is_rejected() {
        let row = EncryptionKey {
            id: 1,
            company_id: 1,
            name: "payroll".into(),
            algorithm: KEY_ALGORITHM.into(),
            wrapped_key: "abc".into(),
            version: 2,
            status: "destroyed".into(),
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            rotated_at: None,
        };
        assert!(DomainEncryptionKey::try_from(row.clone()).is_err());

        let key = DomainEncryptionKey::try_from(EncryptionKey {
            status: "active".into(),
            ..row
        })
        .unwrap();
        assert_eq!(key.status, KeyStatus::Active);
        assert_eq!(key.version, 2);
    }

    #[test]
    fn new_key_uses_fixed_algorithm() {
        let key = DomainNewEncryptionKey {
            company_id: CompanyId::new(1).unwrap(),
            name: Title::new("payroll").unwrap(),
            wrapped_key: "wrapped".into(),
        };
        let insertable = NewEncryptionKey::from(&key);
        assert_eq!(insertable.algorithm, "chacha20poly1305");
        assert_eq!(insertable.name, "payroll");
    }
}
