use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::domain::quality_management::{
    AuditStatus, Capa, CapaStatus, NewCapa, NewQualityAudit, NewQualityCheck, NonConformance,
    NonConformanceStatus, QualityAudit, QualityCheck, QualitySummary, RecordedCheck,
};
use crate::domain::stats::LabelCount;
use crate::domain::types::{AuditId, CapaId, CompanyId, NonConformanceId};
use crate::models::quality_management::{
    Capa as DbCapa, NewCapa as DbNewCapa, NewNonConformance as DbNewNonConformance,
    NewQualityAudit as DbNewQualityAudit, NewQualityCheck as DbNewQualityCheck,
    NonConformance as DbNonConformance, QualityAudit as DbQualityAudit,
    QualityCheck as DbQualityCheck, QualityTotalsRow,
};
use crate::models::stats::{CountRow, LabelCountRow};
use crate::query::{DateRange, Op, WhereClause};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{
    DieselRepository, NonConformanceListQuery, QualityCheckListQuery, QualityManagementReader,
    QualityManagementWriter,
};

impl QualityManagementReader for DieselRepository {
    fn list_quality_checks(
        &self,
        query: QualityCheckListQuery,
    ) -> RepositoryResult<(usize, Vec<QualityCheck>)> {
        use crate::schema::quality_checks;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = quality_checks::table
                .filter(quality_checks::company_id.eq(query.company_id.get()))
                .into_boxed::<Sqlite>();

            if let Some(result) = query.result {
                items = items.filter(quality_checks::result.eq(result.as_str()));
            }
            if let Some(check_type) = &query.check_type {
                items = items.filter(quality_checks::check_type.eq(check_type.clone()));
            }
            if let Some(start) = query.range.start() {
                items = items.filter(quality_checks::checked_at.ge(start));
            }
            if let Some(end) = query.range.end_exclusive() {
                items = items.filter(quality_checks::checked_at.lt(end));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let checks = query_builder()
            .order((quality_checks::checked_at.desc(), quality_checks::id.desc()))
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbQualityCheck>(&mut conn)?
            .into_iter()
            .map(|c| QualityCheck::try_from(c).map_err(RepositoryError::from))
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok((total, checks))
    }

    fn quality_summary(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<QualitySummary> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .date_range("checked_at", range)
            .query(
                "SELECT COUNT(*) AS total, \
                 COALESCE(SUM(CASE WHEN result = 'pass' THEN 1 ELSE 0 END), 0) AS passed, \
                 COALESCE(SUM(CASE WHEN result = 'fail' THEN 1 ELSE 0 END), 0) AS failed, \
                 COALESCE(SUM(sample_size), 0) AS samples, \
                 COALESCE(SUM(defects_found), 0) AS defects \
                 FROM quality_checks",
                "",
            )
            .get_result::<QualityTotalsRow>(&mut conn)?;

        Ok(row.into())
    }

    fn open_non_conformances_by_severity(
        &self,
        company_id: CompanyId,
    ) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .and("status", Op::Eq, NonConformanceStatus::Open.as_str())
            .query(
                "SELECT severity AS label, COUNT(*) AS count FROM non_conformances",
                " GROUP BY severity ORDER BY count DESC, label",
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn list_non_conformances(
        &self,
        query: NonConformanceListQuery,
    ) -> RepositoryResult<(usize, Vec<NonConformance>)> {
        use crate::schema::non_conformances;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = non_conformances::table
                .filter(non_conformances::company_id.eq(query.company_id.get()))
                .into_boxed::<Sqlite>();

            if let Some(status) = query.status {
                items = items.filter(non_conformances::status.eq(status.as_str()));
            }
            if let Some(severity) = query.severity {
                items = items.filter(non_conformances::severity.eq(severity.as_str()));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let items = query_builder()
            .order((
                non_conformances::created_at.desc(),
                non_conformances::id.desc(),
            ))
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbNonConformance>(&mut conn)?
            .into_iter()
            .map(|nc| NonConformance::try_from(nc).map_err(RepositoryError::from))
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok((total, items))
    }

    fn get_non_conformance(
        &self,
        id: NonConformanceId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<NonConformance>> {
        use crate::schema::non_conformances;

        let mut conn = self.conn()?;
        let nc = non_conformances::table
            .filter(non_conformances::id.eq(id.get()))
            .filter(non_conformances::company_id.eq(company_id.get()))
            .first::<DbNonConformance>(&mut conn)
            .optional()?;

        nc.map(NonConformance::try_from)
            .transpose()
            .map_err(Into::into)
    }

    fn list_audits(&self, company_id: CompanyId) -> RepositoryResult<Vec<QualityAudit>> {
        use crate::schema::quality_audits;

        let mut conn = self.conn()?;
        quality_audits::table
            .filter(quality_audits::company_id.eq(company_id.get()))
            .order((quality_audits::scheduled_date.desc(), quality_audits::id.desc()))
            .load::<DbQualityAudit>(&mut conn)?
            .into_iter()
            .map(|a| QualityAudit::try_from(a).map_err(RepositoryError::from))
            .collect()
    }

    fn upcoming_audits(
        &self,
        company_id: CompanyId,
        today: NaiveDate,
        limit: i64,
    ) -> RepositoryResult<Vec<QualityAudit>> {
        use crate::schema::quality_audits;

        let mut conn = self.conn()?;
        quality_audits::table
            .filter(quality_audits::company_id.eq(company_id.get()))
            .filter(quality_audits::status.eq(AuditStatus::Scheduled.as_str()))
            .filter(quality_audits::scheduled_date.ge(today))
            .order((quality_audits::scheduled_date.asc(), quality_audits::id.asc()))
            .limit(limit)
            .load::<DbQualityAudit>(&mut conn)?
            .into_iter()
            .map(|a| QualityAudit::try_from(a).map_err(RepositoryError::from))
            .collect()
    }

    fn get_audit(
        &self,
        id: AuditId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<QualityAudit>> {
        use crate::schema::quality_audits;

        let mut conn = self.conn()?;
        let audit = quality_audits::table
            .filter(quality_audits::id.eq(id.get()))
            .filter(quality_audits::company_id.eq(company_id.get()))
            .first::<DbQualityAudit>(&mut conn)
            .optional()?;

        audit
            .map(QualityAudit::try_from)
            .transpose()
            .map_err(Into::into)
    }

    fn list_capas(&self, company_id: CompanyId) -> RepositoryResult<Vec<Capa>> {
        use crate::schema::capas;

        let mut conn = self.conn()?;
        capas::table
            .filter(capas::company_id.eq(company_id.get()))
            .order((capas::due_date.asc(), capas::id.asc()))
            .load::<DbCapa>(&mut conn)?
            .into_iter()
            .map(|c| Capa::try_from(c).map_err(RepositoryError::from))
            .collect()
    }

    fn get_capa(&self, id: CapaId, company_id: CompanyId) -> RepositoryResult<Option<Capa>> {
        use crate::schema::capas;

        let mut conn = self.conn()?;
        let capa = capas::table
            .filter(capas::id.eq(id.get()))
            .filter(capas::company_id.eq(company_id.get()))
            .first::<DbCapa>(&mut conn)
            .optional()?;

        capa.map(Capa::try_from).transpose().map_err(Into::into)
    }

    fn count_overdue_capas(
        &self,
        company_id: CompanyId,
        today: NaiveDate,
    ) -> RepositoryResult<i64> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .and("due_date", Op::Lt, today)
            .and_raw("status IN ('open', 'in_progress')")
            .query("SELECT COUNT(*) AS count FROM capas", "")
            .get_result::<CountRow>(&mut conn)?;

        Ok(row.count)
    }
}

impl QualityManagementWriter for DieselRepository {
    fn create_quality_check(&self, check: &NewQualityCheck) -> RepositoryResult<RecordedCheck> {
        use crate::schema::{non_conformances, quality_checks};

        let mut conn = self.conn()?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let created = diesel::insert_into(quality_checks::table)
                .values(&DbNewQualityCheck {
                    company_id: check.company_id.get(),
                    work_order_id: check.work_order_id.map(|id| id.get()),
                    check_type: check.check_type.as_str(),
                    inspector_id: check.inspector_id.get(),
                    result: check.result.as_str(),
                    sample_size: check.sample_size,
                    defects_found: check.defects_found,
                    notes: check.notes.as_ref().map(|n| n.as_str()),
                })
                .get_result::<DbQualityCheck>(conn)?;

            let non_conformance = match &check.finding {
                Some(finding) => {
                    let nc = diesel::insert_into(non_conformances::table)
                        .values(&DbNewNonConformance {
                            company_id: check.company_id.get(),
                            quality_check_id: Some(created.id),
                            severity: finding.severity.as_str(),
                            description: finding.description.as_str(),
                        })
                        .get_result::<DbNonConformance>(conn)?;
                    Some(NonConformance::try_from(nc)?)
                }
                None => None,
            };

            Ok(RecordedCheck {
                check: QualityCheck::try_from(created)?,
                non_conformance,
            })
        })
    }

    fn close_non_conformance(
        &self,
        id: NonConformanceId,
        company_id: CompanyId,
        closed_at: NaiveDateTime,
    ) -> RepositoryResult<NonConformance> {
        use crate::schema::non_conformances;

        let mut conn = self.conn()?;
        let updated = diesel::update(
            non_conformances::table
                .filter(non_conformances::id.eq(id.get()))
                .filter(non_conformances::company_id.eq(company_id.get()))
                .filter(non_conformances::status.eq(NonConformanceStatus::Open.as_str())),
        )
        .set((
            non_conformances::status.eq(NonConformanceStatus::Closed.as_str()),
            non_conformances::closed_at.eq(closed_at),
        ))
        .get_result::<DbNonConformance>(&mut conn)
        .optional()?
        .ok_or_else(|| RepositoryError::Conflict("non-conformance is already closed".into()))?;

        Ok(NonConformance::try_from(updated)?)
    }

    fn create_audit(&self, audit: &NewQualityAudit) -> RepositoryResult<QualityAudit> {
        use crate::schema::quality_audits;

        let mut conn = self.conn()?;
        let insertable: DbNewQualityAudit = audit.into();
        let created = diesel::insert_into(quality_audits::table)
            .values(&insertable)
            .get_result::<DbQualityAudit>(&mut conn)?;

        Ok(QualityAudit::try_from(created)?)
    }

    fn complete_audit(
        &self,
        id: AuditId,
        company_id: CompanyId,
        findings: Option<&str>,
        completed_at: NaiveDateTime,
    ) -> RepositoryResult<QualityAudit> {
        use crate::schema::quality_audits;

        let mut conn = self.conn()?;
        let updated = diesel::update(
            quality_audits::table
                .filter(quality_audits::id.eq(id.get()))
                .filter(quality_audits::company_id.eq(company_id.get()))
                .filter(quality_audits::status.eq(AuditStatus::Scheduled.as_str())),
        )
        .set((
            quality_audits::status.eq(AuditStatus::Completed.as_str()),
            quality_audits::findings.eq(findings),
            quality_audits::completed_at.eq(completed_at),
        ))
        .get_result::<DbQualityAudit>(&mut conn)
        .optional()?
        .ok_or_else(|| RepositoryError::Conflict("audit is already completed".into()))?;

        Ok(QualityAudit::try_from(updated)?)
    }

    fn create_capa(&self, capa: &NewCapa) -> RepositoryResult<Capa> {
        use crate::schema::capas;

        let mut conn = self.conn()?;
        let insertable: DbNewCapa = capa.into();
        let created = diesel::insert_into(capas::table)
            .values(&insertable)
            .get_result::<DbCapa>(&mut conn)?;

        Ok(Capa::try_from(created)?)
    }

    fn update_capa_status(
        &self,
        id: CapaId,
        company_id: CompanyId,
        from: CapaStatus,
        to: CapaStatus,
    ) -> RepositoryResult<Capa> {
        use crate::schema::capas;

        let mut conn = self.conn()?;
        let updated = diesel::update(
            capas::table
                .filter(capas::id.eq(id.get()))
                .filter(capas::company_id.eq(company_id.get()))
                .filter(capas::status.eq(from.as_str())),
        )
        .set(capas::status.eq(to.as_str()))
        .get_result::<DbCapa>(&mut conn)
        .optional()?
        .ok_or_else(|| RepositoryError::Conflict(format!("CAPA is no longer {from}")))?;

        Ok(Capa::try_from(updated)?)
    }
}
