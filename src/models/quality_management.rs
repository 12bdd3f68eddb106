use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::domain::quality_management::{
    Capa as DomainCapa, NewCapa as DomainNewCapa, NewQualityAudit as DomainNewQualityAudit,
    NonConformance as DomainNonConformance, QualityAudit as DomainQualityAudit,
    QualityCheck as DomainQualityCheck, QualitySummary,
};
use crate::domain::types::{
    AuditId, CapaId, CompanyId, NonConformanceId, QualityCheckId, TypeConstraintError, UserId,
    WorkOrderId,
};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::quality_checks)]
pub struct QualityCheck {
    pub id: i32,
    pub company_id: i32,
    pub work_order_id: Option<i32>,
    pub check_type: String,
    pub inspector_id: i32,
    pub result: String,
    pub sample_size: i32,
    pub defects_found: i32,
    pub notes: Option<String>,
    pub checked_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::quality_checks)]
pub struct NewQualityCheck<'a> {
    pub company_id: i32,
    pub work_order_id: Option<i32>,
    pub check_type: &'a str,
    pub inspector_id: i32,
    pub result: &'a str,
    pub sample_size: i32,
    pub defects_found: i32,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::non_conformances)]
pub struct NonConformance {
    pub id: i32,
    pub company_id: i32,
    pub quality_check_id: Option<i32>,
    pub severity: String,
    pub description: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::non_conformances)]
pub struct NewNonConformance<'a> {
    pub company_id: i32,
    pub quality_check_id: Option<i32>,
    pub severity: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::quality_audits)]
pub struct QualityAudit {
    pub id: i32,
    pub company_id: i32,
    pub title: String,
    pub audit_type: String,
    pub auditor: String,
    pub scheduled_date: NaiveDate,
    pub status: String,
    pub findings: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::quality_audits)]
pub struct NewQualityAudit<'a> {
    pub company_id: i32,
    pub title: &'a str,
    pub audit_type: &'a str,
    pub auditor: &'a str,
    pub scheduled_date: NaiveDate,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::capas)]
pub struct Capa {
    pub id: i32,
    pub company_id: i32,
    pub non_conformance_id: i32,
    pub action_type: String,
    pub description: String,
    pub owner: String,
    pub due_date: NaiveDate,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::capas)]
pub struct NewCapa<'a> {
    pub company_id: i32,
    pub non_conformance_id: i32,
    pub action_type: &'a str,
    pub description: &'a str,
    pub owner: &'a str,
    pub due_date: NaiveDate,
}

#[derive(Debug, QueryableByName)]
pub struct QualityTotalsRow {
    #[diesel(sql_type = BigInt)]
    pub total: i64,
    #[diesel(sql_type = BigInt)]
    pub passed: i64,
    #[diesel(sql_type = BigInt)]
    pub failed: i64,
    #[diesel(sql_type = BigInt)]
    pub samples: i64,
    #[diesel(sql_type = BigInt)]
    pub defects: i64,
}

impl From<QualityTotalsRow> for QualitySummary {
    fn from(row: QualityTotalsRow) -> Self {
        QualitySummary::from_totals(row.total, row.passed, row.failed, row.samples, row.defects)
    }
}

impl TryFrom<QualityCheck> for DomainQualityCheck {
    type Error = TypeConstraintError;

    fn try_from(check: QualityCheck) -> Result<Self, Self::Error> {
        Ok(Self {
            id: QualityCheckId::new(check.id)?,
            company_id: CompanyId::new(check.company_id)?,
            work_order_id: check.work_order_id.map(WorkOrderId::new).transpose()?,
            check_type: check.check_type,
            inspector_id: UserId::new(check.inspector_id)?,
            result: check.result.parse()?,
            sample_size: check.sample_size,
            defects_found: check.defects_found,
            notes: check.notes,
            checked_at: check.checked_at,
        })
    }
}

impl TryFrom<NonConformance> for DomainNonConformance {
    type Error = TypeConstraintError;

    fn try_from(nc: NonConformance) -> Result<Self, Self::Error> {
        Ok(Self {
            id: NonConformanceId::new(nc.id)?,
            company_id: CompanyId::new(nc.company_id)?,
            quality_check_id: nc.quality_check_id.map(QualityCheckId::new).transpose()?,
            severity: nc.severity.parse()?,
            description: nc.description,
            status: nc.status.parse()?,
            created_at: nc.created_at,
            closed_at: nc.closed_at,
        })
    }
}

impl TryFrom<QualityAudit> for DomainQualityAudit {
    type Error = TypeConstraintError;

    fn try_from(audit: QualityAudit) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AuditId::new(audit.id)?,
            company_id: CompanyId::new(audit.company_id)?,
            title: audit.title,
            audit_type: audit.audit_type,
            auditor: audit.auditor,
            scheduled_date: audit.scheduled_date,
            status: audit.status.parse()?,
            findings: audit.findings,
            completed_at: audit.completed_at,
        })
    }
}

impl<'a> From<&'a DomainNewQualityAudit> for NewQualityAudit<'a> {
    fn from(audit: &'a DomainNewQualityAudit) -> Self {
        Self {
            company_id: audit.company_id.get(),
            title: audit.title.as_str(),
            audit_type: audit.audit_type.as_str(),
            auditor: audit.auditor.as_str(),
            scheduled_date: audit.scheduled_date,
        }
    }
}

impl TryFrom<Capa> for DomainCapa {
    type Error = TypeConstraintError;

    fn try_from(capa: Capa) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CapaId::new(capa.id)?,
            company_id: CompanyId::new(capa.company_id)?,
            non_conformance_id: NonConformanceId::new(capa.non_conformance_id)?,
            action_type: capa.action_type.parse()?,
            description: capa.description,
            owner: capa.owner,
            due_date: capa.due_date,
            status: capa.status.parse()?,
            created_at: capa.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewCapa> for NewCapa<'a> {
    fn from(capa: &'a DomainNewCapa) -> Self {
        Self {
            company_id: capa.company_id.get(),
            non_conformance_id: capa.non_conformance_id.get(),
            action_type: capa.action_type.as_str(),
            description: capa.description.as_str(),
            owner: capa.owner.as_str(),
            due_date: capa.due_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quality_management::{CheckResult, Severity};

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn check_without_work_order_converts() {
        let check = DomainQualityCheck::try_from(QualityCheck {
            id: 1,
            company_id: 1,
            work_order_id: None,
            check_type: "visual".into(),
            inspector_id: 4,
            result: "fail".into(),
            sample_size: 20,
            defects_found: 3,
            notes: None,
            checked_at: at(),
        })
        .unwrap();
        assert_eq!(check.result, CheckResult::Fail);
        assert!(check.work_order_id.is_none());
    }

    #[test]
    fn unknown_severity_is_rejected() {
        let row = NonConformance {
            id: 1,
            company_id: 1,
            quality_check_id: Some(2),
            severity: "catastrophic".into(),
            description: "Cracked housing".into(),
            status: "open".into(),
            created_at: at(),
            closed_at: None,
        };
        assert!(DomainNonConformance::try_from(row).is_err());
        assert_eq!("major".parse::<Severity>().unwrap(), Severity::Major);
    }

    #[test]
    fn totals_row_becomes_summary() {
        let summary = QualitySummary::from(QualityTotalsRow {
            total: 4,
            passed: 3,
            failed: 1,
            samples: 200,
            defects: 4,
        });
        assert_eq!(summary.pass_rate, Some(75.0));
        assert_eq!(summary.defect_rate, Some(2.0));
    }
}
