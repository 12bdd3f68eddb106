use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::domain::security_features::{
    AuditLog, EncryptionKey, KeyStatus, NewAuditLog, NewEncryptionKey,
};
use crate::domain::stats::LabelCount;
use crate::domain::types::{CompanyId, EncryptionKeyId};
use crate::models::security_features::{
    AuditLog as DbAuditLog, EncryptionKey as DbEncryptionKey, NewAuditLog as DbNewAuditLog,
    NewEncryptionKey as DbNewEncryptionKey,
};
use crate::models::stats::{CountRow, LabelCountRow};
use crate::query::{Op, WhereClause};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{
    AuditLogListQuery, DieselRepository, SecurityFeaturesReader, SecurityFeaturesWriter,
};

type BoxedAuditQuery<'a> = crate::schema::audit_logs::BoxedQuery<'a, Sqlite>;

fn filtered_audit_logs(query: &AuditLogListQuery) -> BoxedAuditQuery<'_> {
    use crate::schema::audit_logs;

    let mut items = audit_logs::table
        .filter(audit_logs::company_id.eq(query.company_id.get()))
        .into_boxed::<Sqlite>();

    if let Some(action) = &query.action {
        items = items.filter(audit_logs::action.eq(action.as_str()));
    }
    if let Some(entity_type) = &query.entity_type {
        items = items.filter(audit_logs::entity_type.eq(entity_type.as_str()));
    }
    if let Some(user_id) = query.user_id {
        items = items.filter(audit_logs::user_id.eq(user_id.get()));
    }
    if let Some(start) = query.range.start() {
        items = items.filter(audit_logs::created_at.ge(start));
    }
    if let Some(end) = query.range.end_exclusive() {
        items = items.filter(audit_logs::created_at.lt(end));
    }
    items
}

fn convert_logs(rows: Vec<DbAuditLog>) -> RepositoryResult<Vec<AuditLog>> {
    rows.into_iter()
        .map(|row| AuditLog::try_from(row).map_err(RepositoryError::from))
        .collect()
}

impl SecurityFeaturesReader for DieselRepository {
    fn list_audit_logs(
        &self,
        query: AuditLogListQuery,
    ) -> RepositoryResult<(usize, Vec<AuditLog>)> {
        use crate::schema::audit_logs;

        let mut conn = self.conn()?;

        let total = filtered_audit_logs(&query)
            .count()
            .get_result::<i64>(&mut conn)? as usize;

        let rows = filtered_audit_logs(&query)
            .order((audit_logs::created_at.desc(), audit_logs::id.desc()))
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbAuditLog>(&mut conn)?;

        Ok((total, convert_logs(rows)?))
    }

    fn all_audit_logs(&self, query: AuditLogListQuery) -> RepositoryResult<Vec<AuditLog>> {
        use crate::schema::audit_logs;

        let mut conn = self.conn()?;
        let rows = filtered_audit_logs(&query)
            .order((audit_logs::created_at.desc(), audit_logs::id.desc()))
            .load::<DbAuditLog>(&mut conn)?;

        convert_logs(rows)
    }

    fn audit_events_by_action(
        &self,
        company_id: CompanyId,
        since: NaiveDateTime,
    ) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .and("created_at", Op::Gte, since)
            .query(
                "SELECT action AS label, COUNT(*) AS count FROM audit_logs",
                " GROUP BY action ORDER BY count DESC, label",
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn most_active_users(
        &self,
        company_id: CompanyId,
        since: NaiveDateTime,
        limit: i64,
    ) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .and("created_at", Op::Gte, since)
            .query(
                "SELECT CAST(user_id AS TEXT) AS label, COUNT(*) AS count FROM audit_logs",
                &format!(" GROUP BY user_id ORDER BY count DESC, user_id LIMIT {limit}"),
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn list_encryption_keys(&self, company_id: CompanyId) -> RepositoryResult<Vec<EncryptionKey>> {
        use crate::schema::encryption_keys;

        let mut conn = self.conn()?;
        encryption_keys::table
            .filter(encryption_keys::company_id.eq(company_id.get()))
            .order(encryption_keys::name.asc())
            .load::<DbEncryptionKey>(&mut conn)?
            .into_iter()
            .map(|key| EncryptionKey::try_from(key).map_err(RepositoryError::from))
            .collect()
    }

    fn get_encryption_key(
        &self,
        id: EncryptionKeyId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<EncryptionKey>> {
        use crate::schema::encryption_keys;

        let mut conn = self.conn()?;
        let key = encryption_keys::table
            .filter(encryption_keys::id.eq(id.get()))
            .filter(encryption_keys::company_id.eq(company_id.get()))
            .first::<DbEncryptionKey>(&mut conn)
            .optional()?;

        key.map(EncryptionKey::try_from).transpose().map_err(Into::into)
    }

    fn count_active_keys(&self, company_id: CompanyId) -> RepositoryResult<i64> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .and("status", Op::Eq, KeyStatus::Active.as_str())
            .query("SELECT COUNT(*) AS count FROM encryption_keys", "")
            .get_result::<CountRow>(&mut conn)?;

        Ok(row.count)
    }

    fn count_keys_due_for_rotation(
        &self,
        company_id: CompanyId,
        cutoff: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .and("status", Op::Eq, KeyStatus::Active.as_str())
            .and("COALESCE(rotated_at, created_at)", Op::Lte, cutoff)
            .query("SELECT COUNT(*) AS count FROM encryption_keys", "")
            .get_result::<CountRow>(&mut conn)?;

        Ok(row.count)
    }
}

impl SecurityFeaturesWriter for DieselRepository {
    fn record_audit_log(&self, entry: &NewAuditLog) -> RepositoryResult<AuditLog> {
        use crate::schema::audit_logs;

        let mut conn = self.conn()?;
        let insertable: DbNewAuditLog = entry.into();
        let created = diesel::insert_into(audit_logs::table)
            .values(&insertable)
            .get_result::<DbAuditLog>(&mut conn)?;

        Ok(AuditLog::try_from(created)?)
    }

    fn create_encryption_key(&self, key: &NewEncryptionKey) -> RepositoryResult<EncryptionKey> {
        use crate::schema::encryption_keys;

        let mut conn = self.conn()?;
        let insertable: DbNewEncryptionKey = key.into();
        let created = diesel::insert_into(encryption_keys::table)
            .values(&insertable)
            .get_result::<DbEncryptionKey>(&mut conn)?;

        Ok(EncryptionKey::try_from(created)?)
    }

    fn rotate_encryption_key(
        &self,
        id: EncryptionKeyId,
        company_id: CompanyId,
        wrapped_key: &str,
        rotated_at: NaiveDateTime,
    ) -> RepositoryResult<EncryptionKey> {
        use crate::schema::encryption_keys;

        let mut conn = self.conn()?;
        let updated = diesel::update(
            encryption_keys::table
                .filter(encryption_keys::id.eq(id.get()))
                .filter(encryption_keys::company_id.eq(company_id.get()))
                .filter(encryption_keys::status.eq(KeyStatus::Active.as_str())),
        )
        .set((
            encryption_keys::wrapped_key.eq(wrapped_key),
            encryption_keys::version.eq(encryption_keys::version + 1),
            encryption_keys::rotated_at.eq(Some(rotated_at)),
        ))
        .get_result::<DbEncryptionKey>(&mut conn)
        .optional()?
        .ok_or_else(|| RepositoryError::Conflict("only active keys can be rotated".into()))?;

        Ok(EncryptionKey::try_from(updated)?)
    }

    fn revoke_encryption_key(
        &self,
        id: EncryptionKeyId,
        company_id: CompanyId,
    ) -> RepositoryResult<EncryptionKey> {
        use crate::schema::encryption_keys;

        let mut conn = self.conn()?;
        let updated = diesel::update(
            encryption_keys::table
                .filter(encryption_keys::id.eq(id.get()))
                .filter(encryption_keys::company_id.eq(company_id.get()))
                .filter(encryption_keys::status.eq(KeyStatus::Active.as_str())),
        )
        .set(encryption_keys::status.eq(KeyStatus::Revoked.as_str()))
        .get_result::<DbEncryptionKey>(&mut conn)
        .optional()?
        .ok_or_else(|| RepositoryError::Conflict("encryption key is already revoked".into()))?;

        Ok(EncryptionKey::try_from(updated)?)
    }
}
