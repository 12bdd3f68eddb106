//! Audit trail queries and encryption key management.
//!
//! Every key write appends an audit entry. A failed audit insert is logged
//! but does not undo the key change it describes.

use chrono::{Duration, Utc};

use crate::crypto::Encryption;
use crate::domain::security_features::{
    ACTIVITY_WINDOW_DAYS, AuditLog, CipherOutput, ENTITY_ENCRYPTION_KEY, EncryptionKey,
    NewAuditLog, SecurityDashboard, actions, rotation_cutoff,
};
use crate::domain::types::{EncryptionKeyId, Label};
use crate::dto::security_features::{AuditLogListPageData, SecurityDashboardPageData};
use crate::forms::security_features::{
    AuditLogFilter, AuditLogFilterQuery, DecryptForm, EncryptForm, EncryptionKeyForm,
    cipher_input,
};
use crate::models::auth::AuthenticatedUser;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated, Pagination};
use crate::repository::{AuditLogListQuery, SecurityFeaturesReader, SecurityFeaturesWriter};
use crate::routes::{check_role, ensure_role};
use crate::services::{ServiceError, ServiceResult, write_csv};
use crate::{SECURITY_MANAGE, SECURITY_VIEW};

const TOP_USERS: i64 = 5;

pub fn load_dashboard<R>(
    repo: &R,
    user: &AuthenticatedUser,
) -> ServiceResult<SecurityDashboardPageData>
where
    R: SecurityFeaturesReader + ?Sized,
{
    ensure_role(user, SECURITY_VIEW)?;

    let company_id = user.company_id()?;
    let now = Utc::now().naive_utc();
    let since = now - Duration::days(ACTIVITY_WINDOW_DAYS);

    let dashboard = SecurityDashboard {
        events_by_action: repo.audit_events_by_action(company_id, since).map_err(|err| {
            log::error!("Failed to aggregate audit events: {err}");
            err
        })?,
        top_users: repo.most_active_users(company_id, since, TOP_USERS)?,
        active_keys: repo.count_active_keys(company_id)?,
        rotation_due: repo.count_keys_due_for_rotation(company_id, rotation_cutoff(now))?,
    };

    Ok(SecurityDashboardPageData {
        dashboard,
        keys: repo.list_encryption_keys(company_id)?,
        can_manage: check_role(SECURITY_MANAGE, &user.roles),
    })
}

fn audit_query(user: &AuthenticatedUser, filter: &AuditLogFilter) -> ServiceResult<AuditLogListQuery> {
    let mut query = AuditLogListQuery::new(user.company_id()?).range(filter.range);
    if let Some(action) = &filter.action {
        query = query.action(action.clone());
    }
    if let Some(entity_type) = &filter.entity_type {
        query = query.entity_type(entity_type.clone());
    }
    if let Some(user_id) = filter.user_id {
        query = query.user(user_id);
    }
    Ok(query)
}

pub fn list_audit_logs<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: AuditLogFilterQuery,
) -> ServiceResult<AuditLogListPageData>
where
    R: SecurityFeaturesReader + ?Sized,
{
    ensure_role(user, SECURITY_VIEW)?;

    let filter = AuditLogFilter::try_from(query)?;
    let list_query = audit_query(user, &filter)?.paginate(filter.page, DEFAULT_ITEMS_PER_PAGE);

    let (total, logs) = repo.list_audit_logs(list_query).map_err(|err| {
        log::error!("Failed to list audit logs: {err}");
        err
    })?;

    Ok(AuditLogListPageData {
        logs: Paginated::new(logs, Pagination::new(filter.page, DEFAULT_ITEMS_PER_PAGE), total),
    })
}

pub fn export_audit_logs_csv<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: AuditLogFilterQuery,
) -> ServiceResult<String>
where
    R: SecurityFeaturesReader + ?Sized,
{
    ensure_role(user, SECURITY_VIEW)?;

    let filter = AuditLogFilter::try_from(query)?;
    let logs = repo.all_audit_logs(audit_query(user, &filter)?)?;

    let header: Vec<String> = [
        "id",
        "created_at",
        "user_id",
        "action",
        "entity_type",
        "entity_id",
        "details",
        "ip_address",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();

    let records = logs.iter().map(|log| {
        vec![
            log.id.to_string(),
            log.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            log.user_id.to_string(),
            log.action.clone(),
            log.entity_type.clone(),
            log.entity_id.map(|id| id.to_string()).unwrap_or_default(),
            log.details.clone().unwrap_or_default(),
            log.ip_address.clone().unwrap_or_default(),
        ]
    });

    write_csv(&header, records)
}

/// Appends one entry to the company's audit trail.
pub fn record_audit_event<R>(
    repo: &R,
    user: &AuthenticatedUser,
    action: &str,
    entity_type: &str,
    entity_id: Option<i32>,
    details: Option<serde_json::Value>,
    ip_address: Option<&str>,
) -> ServiceResult<AuditLog>
where
    R: SecurityFeaturesWriter + ?Sized,
{
    let entry = NewAuditLog {
        company_id: user.company_id()?,
        user_id: user.user_id()?,
        action: Label::new(action)?,
        entity_type: Label::new(entity_type)?,
        entity_id,
        details: details.map(|d| d.to_string()),
        ip_address: ip_address.map(str::to_string),
    };

    Ok(repo.record_audit_log(&entry)?)
}

fn audit_key_change<R>(
    repo: &R,
    user: &AuthenticatedUser,
    action: &str,
    key: &EncryptionKey,
    ip_address: Option<&str>,
) where
    R: SecurityFeaturesWriter + ?Sized,
{
    let details = serde_json::json!({ "name": key.name, "version": key.version });
    if let Err(err) = record_audit_event(
        repo,
        user,
        action,
        ENTITY_ENCRYPTION_KEY,
        Some(key.id.get()),
        Some(details),
        ip_address,
    ) {
        log::error!("Failed to audit {action} for key {}: {err}", key.id);
    }
}

pub fn create_encryption_key<R>(
    repo: &R,
    encryption: &Encryption,
    user: &AuthenticatedUser,
    form: EncryptionKeyForm,
    ip_address: Option<&str>,
) -> ServiceResult<EncryptionKey>
where
    R: SecurityFeaturesWriter + ?Sized,
{
    ensure_role(user, SECURITY_MANAGE)?;

    let wrapped_key = encryption.generate_wrapped_key()?;
    let new_key = form.into_domain(user.company_id()?, wrapped_key)?;

    let key = repo.create_encryption_key(&new_key).map_err(|err| {
        log::error!("Failed to create encryption key: {err}");
        err
    })?;

    log::info!("Created encryption key {} ({})", key.id, key.name);
    audit_key_change(repo, user, actions::KEY_CREATED, &key, ip_address);
    Ok(key)
}

fn managed_key<R>(
    repo: &R,
    user: &AuthenticatedUser,
    key_id: i32,
) -> ServiceResult<EncryptionKey>
where
    R: SecurityFeaturesReader + ?Sized,
{
    repo.get_encryption_key(EncryptionKeyId::new(key_id)?, user.company_id()?)?
        .ok_or(ServiceError::NotFound)
}

fn active_key<R>(repo: &R, user: &AuthenticatedUser, key_id: i32) -> ServiceResult<EncryptionKey>
where
    R: SecurityFeaturesReader + ?Sized,
{
    let key = managed_key(repo, user, key_id)?;
    if !key.is_active() {
        return Err(ServiceError::Conflict(format!(
            "encryption key `{}` is {}",
            key.name, key.status
        )));
    }
    Ok(key)
}

pub fn rotate_encryption_key<R>(
    repo: &R,
    encryption: &Encryption,
    user: &AuthenticatedUser,
    key_id: i32,
    ip_address: Option<&str>,
) -> ServiceResult<EncryptionKey>
where
    R: SecurityFeaturesReader + SecurityFeaturesWriter + ?Sized,
{
    ensure_role(user, SECURITY_MANAGE)?;

    let key = active_key(repo, user, key_id)?;
    let wrapped_key = encryption.generate_wrapped_key()?;
    let rotated = repo
        .rotate_encryption_key(key.id, key.company_id, &wrapped_key, Utc::now().naive_utc())
        .map_err(|err| {
            log::error!("Failed to rotate encryption key {key_id}: {err}");
            err
        })?;

    log::info!(
        "Rotated encryption key {} to version {}",
        rotated.id,
        rotated.version
    );
    audit_key_change(repo, user, actions::KEY_ROTATED, &rotated, ip_address);
    Ok(rotated)
}

pub fn revoke_encryption_key<R>(
    repo: &R,
    user: &AuthenticatedUser,
    key_id: i32,
    ip_address: Option<&str>,
) -> ServiceResult<EncryptionKey>
where
    R: SecurityFeaturesReader + SecurityFeaturesWriter + ?Sized,
{
    ensure_role(user, SECURITY_MANAGE)?;

    let key = active_key(repo, user, key_id)?;
    let revoked = repo
        .revoke_encryption_key(key.id, key.company_id)
        .map_err(|err| {
            log::error!("Failed to revoke encryption key {key_id}: {err}");
            err
        })?;

    log::info!("Revoked encryption key {}", revoked.id);
    audit_key_change(repo, user, actions::KEY_REVOKED, &revoked, ip_address);
    Ok(revoked)
}

pub fn encrypt<R>(
    repo: &R,
    encryption: &Encryption,
    user: &AuthenticatedUser,
    key_id: i32,
    form: EncryptForm,
) -> ServiceResult<CipherOutput>
where
    R: SecurityFeaturesReader + ?Sized,
{
    ensure_role(user, SECURITY_MANAGE)?;

    let plaintext = cipher_input(&form.plaintext)?;
    let key = active_key(repo, user, key_id)?;
    let output = encryption.encrypt(&key.wrapped_key, plaintext.as_bytes())?;

    Ok(CipherOutput {
        key_id: key.id,
        version: key.version,
        output,
    })
}

pub fn decrypt<R>(
    repo: &R,
    encryption: &Encryption,
    user: &AuthenticatedUser,
    key_id: i32,
    form: DecryptForm,
) -> ServiceResult<CipherOutput>
where
    R: SecurityFeaturesReader + ?Sized,
{
    ensure_role(user, SECURITY_MANAGE)?;

    let ciphertext = cipher_input(form.ciphertext.trim())?;
    let key = active_key(repo, user, key_id)?;
    let bytes = encryption.decrypt(&key.wrapped_key, ciphertext)?;
    let output = String::from_utf8(bytes)
        .map_err(|_| ServiceError::Form("decrypted data is not valid UTF-8".into()))?;

    Ok(CipherOutput {
        key_id: key.id,
        version: key.version,
        output,
    })
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::security_features::{KEY_ALGORITHM, KeyStatus};
    use crate::domain::types::{AuditLogId, CompanyId, UserId};
    use crate::repository::errors::RepositoryError;
    use crate::repository::mock::MockRepository;
    use chrono::NaiveDate;

    fn officer() -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "3".into(),
            email: "sec@example.com".into(),
            name: "Security".into(),
            company_id: 8,
            roles: vec![SECURITY_VIEW.to_string(), SECURITY_MANAGE.to_string()],
            exp: 0,
        }
    }

    fn encryption() -> Encryption {
        Encryption::from_secret("test-secret")
    }

    fn stored_key(wrapped_key: String, status: KeyStatus) -> EncryptionKey {
        EncryptionKey {
            id: EncryptionKeyId::new(4).unwrap(),
            company_id: CompanyId::new(8).unwrap(),
            name: "payroll".into(),
            algorithm: KEY_ALGORITHM.into(),
            wrapped_key,
            version: 1,
            status,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            rotated_at: None,
        }
    }

    fn audit_row() -> AuditLog {
        AuditLog {
            id: AuditLogId::new(1).unwrap(),
            company_id: CompanyId::new(8).unwrap(),
            user_id: UserId::new(3).unwrap(),
            action: actions::KEY_CREATED.into(),
            entity_type: ENTITY_ENCRYPTION_KEY.into(),
            entity_id: Some(4),
            details: None,
            ip_address: None,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn creating_a_key_writes_an_audit_entry() {
        let mut repo = MockRepository::new();
        repo.expect_create_encryption_key()
            .returning(|key| Ok(stored_key(key.wrapped_key.clone(), KeyStatus::Active)));
        repo.expect_record_audit_log()
            .withf(|entry| {
                entry.action.as_str() == actions::KEY_CREATED
                    && entry.entity_id == Some(4)
                    && entry.ip_address.as_deref() == Some("10.0.0.1")
            })
            .times(1)
            .returning(|_| Ok(audit_row()));

        let key = create_encryption_key(
            &repo,
            &encryption(),
            &officer(),
            EncryptionKeyForm {
                name: "Payroll".into(),
            },
            Some("10.0.0.1"),
        )
        .unwrap();

        assert!(key.is_active());
    }

    #[test]
    fn duplicate_key_name_conflicts() {
        let mut repo = MockRepository::new();
        repo.expect_create_encryption_key()
            .returning(|_| Err(RepositoryError::ConstraintViolation("UNIQUE".into())));
        repo.expect_record_audit_log().times(0);

        let result = create_encryption_key(
            &repo,
            &encryption(),
            &officer(),
            EncryptionKeyForm {
                name: "payroll".into(),
            },
            None,
        );

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn encrypt_then_decrypt_with_stored_key() {
        let crypto = encryption();
        let wrapped = crypto.generate_wrapped_key().unwrap();
        let mut repo = MockRepository::new();
        repo.expect_get_encryption_key()
            .returning(move |_, _| Ok(Some(stored_key(wrapped.clone(), KeyStatus::Active))));

        let sealed = encrypt(
            &repo,
            &crypto,
            &officer(),
            4,
            EncryptForm {
                plaintext: "salary: 100".into(),
            },
        )
        .unwrap();
        let opened = decrypt(
            &repo,
            &crypto,
            &officer(),
            4,
            DecryptForm {
                ciphertext: sealed.output,
            },
        )
        .unwrap();

        assert_eq!(opened.output, "salary: 100");
    }

    #[test]
    fn tampered_ciphertext_is_a_form_error() {
        let crypto = encryption();
        let wrapped = crypto.generate_wrapped_key().unwrap();
        let mut repo = MockRepository::new();
        repo.expect_get_encryption_key()
            .returning(move |_, _| Ok(Some(stored_key(wrapped.clone(), KeyStatus::Active))));

        let result = decrypt(
            &repo,
            &crypto,
            &officer(),
            4,
            DecryptForm {
                ciphertext: "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".into(),
            },
        );

        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn revoked_key_cannot_encrypt() {
        let mut repo = MockRepository::new();
        repo.expect_get_encryption_key()
            .returning(|_, _| Ok(Some(stored_key("w".into(), KeyStatus::Revoked))));

        let result = encrypt(
            &repo,
            &encryption(),
            &officer(),
            4,
            EncryptForm {
                plaintext: "x".into(),
            },
        );

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn rotation_requires_active_key() {
        let mut repo = MockRepository::new();
        repo.expect_get_encryption_key()
            .returning(|_, _| Ok(Some(stored_key("w".into(), KeyStatus::Revoked))));
        repo.expect_rotate_encryption_key().times(0);

        let result = rotate_encryption_key(&repo, &encryption(), &officer(), 4, None);

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn viewer_cannot_decrypt() {
        let repo = MockRepository::new();
        let mut user = officer();
        user.roles = vec![SECURITY_VIEW.to_string()];

        let result = decrypt(
            &repo,
            &encryption(),
            &user,
            4,
            DecryptForm {
                ciphertext: "abc".into(),
            },
        );

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }
}
