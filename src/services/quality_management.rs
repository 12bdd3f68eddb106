//! Inspections and the non-conformance → CAPA follow-up chain.

use chrono::Utc;

use crate::domain::quality_management::{
    AuditStatus, Capa, CapaStatus, NonConformance, NonConformanceStatus, QualityAudit,
    QualityDashboard, RecordedCheck,
};
use crate::domain::types::{AuditId, CapaId, NonConformanceId, SanitizedText};
use crate::dto::quality_management::{
    AuditListPageData, NonConformanceListPageData, QualityCheckListPageData,
    QualityDashboardPageData,
};
use crate::forms::DateFilterQuery;
use crate::forms::quality_management::{
    AuditForm, AuditPayload, CapaForm, CapaPayload, CapaStatusForm, CompleteAuditForm,
    NonConformanceFilter, NonConformanceFilterQuery, QualityCheckFilter,
    QualityCheckFilterQuery, QualityCheckForm, QualityCheckPayload,
};
use crate::models::auth::AuthenticatedUser;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated, Pagination};
use crate::query::DateRange;
use crate::repository::{
    ManufacturingReader, NonConformanceListQuery, QualityCheckListQuery,
    QualityManagementReader, QualityManagementWriter,
};
use crate::routes::{check_role, ensure_role};
use crate::services::{ServiceError, ServiceResult};
use crate::{QUALITY_MANAGE, QUALITY_VIEW};

const UPCOMING_AUDITS: i64 = 5;

pub fn load_dashboard<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: &DateFilterQuery,
) -> ServiceResult<QualityDashboardPageData>
where
    R: QualityManagementReader + ?Sized,
{
    ensure_role(user, QUALITY_VIEW)?;

    let company_id = user.company_id()?;
    let range = DateRange::try_from(query)?;
    let today = Utc::now().date_naive();

    let dashboard = QualityDashboard {
        summary: repo.quality_summary(company_id, &range).map_err(|err| {
            log::error!("Failed to summarize quality checks: {err}");
            err
        })?,
        open_by_severity: repo.open_non_conformances_by_severity(company_id)?,
        upcoming_audits: repo.upcoming_audits(company_id, today, UPCOMING_AUDITS)?,
        overdue_capas: repo.count_overdue_capas(company_id, today)?,
    };

    Ok(QualityDashboardPageData { dashboard, range })
}

pub fn list_quality_checks<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: QualityCheckFilterQuery,
) -> ServiceResult<QualityCheckListPageData>
where
    R: QualityManagementReader + ?Sized,
{
    ensure_role(user, QUALITY_VIEW)?;

    let filter = QualityCheckFilter::try_from(query)?;
    let mut list_query = QualityCheckListQuery::new(user.company_id()?)
        .range(filter.range)
        .paginate(filter.page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(result) = filter.result {
        list_query = list_query.result(result);
    }
    if let Some(check_type) = filter.check_type {
        list_query = list_query.check_type(check_type);
    }

    let (total, checks) = repo.list_quality_checks(list_query).map_err(|err| {
        log::error!("Failed to list quality checks: {err}");
        err
    })?;

    Ok(QualityCheckListPageData {
        checks: Paginated::new(
            checks,
            Pagination::new(filter.page, DEFAULT_ITEMS_PER_PAGE),
            total,
        ),
        can_edit: check_role(QUALITY_MANAGE, &user.roles),
    })
}

/// Records an inspection. A failing result opens a non-conformance.
pub fn create_quality_check<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: QualityCheckForm,
) -> ServiceResult<RecordedCheck>
where
    R: QualityManagementWriter + ManufacturingReader + ?Sized,
{
    ensure_role(user, QUALITY_MANAGE)?;

    let payload = QualityCheckPayload::try_from(form)?;
    let company_id = user.company_id()?;

    if let Some(work_order_id) = payload.work_order_id {
        if repo.get_work_order(work_order_id, company_id)?.is_none() {
            return Err(ServiceError::Form("work order not found".into()));
        }
    }

    let recorded = repo
        .create_quality_check(&payload.into_domain(company_id, user.user_id()?))
        .map_err(|err| {
            log::error!("Failed to record quality check: {err}");
            err
        })?;

    if let Some(nc) = &recorded.non_conformance {
        log::info!(
            "Quality check {} failed, opened {} non-conformance {}",
            recorded.check.id,
            nc.severity,
            nc.id
        );
    }
    Ok(recorded)
}

pub fn list_non_conformances<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: NonConformanceFilterQuery,
) -> ServiceResult<NonConformanceListPageData>
where
    R: QualityManagementReader + ?Sized,
{
    ensure_role(user, QUALITY_VIEW)?;

    let company_id = user.company_id()?;
    let filter = NonConformanceFilter::try_from(query)?;
    let mut list_query = NonConformanceListQuery::new(company_id)
        .paginate(filter.page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(status) = filter.status {
        list_query = list_query.status(status);
    }
    if let Some(severity) = filter.severity {
        list_query = list_query.severity(severity);
    }

    let (total, items) = repo.list_non_conformances(list_query).map_err(|err| {
        log::error!("Failed to list non-conformances: {err}");
        err
    })?;

    Ok(NonConformanceListPageData {
        non_conformances: Paginated::new(
            items,
            Pagination::new(filter.page, DEFAULT_ITEMS_PER_PAGE),
            total,
        ),
        capas: repo.list_capas(company_id)?,
        can_edit: check_role(QUALITY_MANAGE, &user.roles),
    })
}

pub fn close_non_conformance<R>(
    repo: &R,
    user: &AuthenticatedUser,
    non_conformance_id: i32,
) -> ServiceResult<NonConformance>
where
    R: QualityManagementReader + QualityManagementWriter + ?Sized,
{
    ensure_role(user, QUALITY_MANAGE)?;

    let company_id = user.company_id()?;
    let nc = repo
        .get_non_conformance(NonConformanceId::new(non_conformance_id)?, company_id)?
        .ok_or(ServiceError::NotFound)?;

    if nc.status != NonConformanceStatus::Open {
        return Err(ServiceError::Conflict(
            "non-conformance is already closed".into(),
        ));
    }

    let closed = repo.close_non_conformance(nc.id, company_id, Utc::now().naive_utc())?;
    log::info!("Closed non-conformance {}", closed.id);
    Ok(closed)
}

pub fn list_audits<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<AuditListPageData>
where
    R: QualityManagementReader + ?Sized,
{
    ensure_role(user, QUALITY_VIEW)?;

    let audits = repo.list_audits(user.company_id()?)?;
    Ok(AuditListPageData {
        audits,
        can_edit: check_role(QUALITY_MANAGE, &user.roles),
    })
}

pub fn schedule_audit<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: AuditForm,
) -> ServiceResult<QualityAudit>
where
    R: QualityManagementWriter + ?Sized,
{
    ensure_role(user, QUALITY_MANAGE)?;

    let payload = AuditPayload::try_from(form)?;
    if payload.scheduled_date < Utc::now().date_naive() {
        return Err(ServiceError::Form(
            "audit date must not be in the past".into(),
        ));
    }

    let audit = repo
        .create_audit(&payload.into_domain(user.company_id()?))
        .map_err(|err| {
            log::error!("Failed to schedule audit: {err}");
            err
        })?;
    Ok(audit)
}

pub fn complete_audit<R>(
    repo: &R,
    user: &AuthenticatedUser,
    audit_id: i32,
    form: CompleteAuditForm,
) -> ServiceResult<QualityAudit>
where
    R: QualityManagementReader + QualityManagementWriter + ?Sized,
{
    ensure_role(user, QUALITY_MANAGE)?;

    let company_id = user.company_id()?;
    let audit = repo
        .get_audit(AuditId::new(audit_id)?, company_id)?
        .ok_or(ServiceError::NotFound)?;

    if audit.status != AuditStatus::Scheduled {
        return Err(ServiceError::Conflict("audit is already completed".into()));
    }

    let findings = SanitizedText::optional(form.findings);
    let completed = repo.complete_audit(
        audit.id,
        company_id,
        findings.as_ref().map(SanitizedText::as_str),
        Utc::now().naive_utc(),
    )?;

    log::info!("Completed audit {}", completed.id);
    Ok(completed)
}

pub fn create_capa<R>(repo: &R, user: &AuthenticatedUser, form: CapaForm) -> ServiceResult<Capa>
where
    R: QualityManagementReader + QualityManagementWriter + ?Sized,
{
    ensure_role(user, QUALITY_MANAGE)?;

    let payload = CapaPayload::try_from(form)?;
    let company_id = user.company_id()?;

    if repo
        .get_non_conformance(payload.non_conformance_id, company_id)?
        .is_none()
    {
        return Err(ServiceError::Form("non-conformance not found".into()));
    }

    let capa = repo
        .create_capa(&payload.into_domain(company_id))
        .map_err(|err| {
            log::error!("Failed to create CAPA: {err}");
            err
        })?;
    Ok(capa)
}

pub fn update_capa_status<R>(
    repo: &R,
    user: &AuthenticatedUser,
    capa_id: i32,
    form: CapaStatusForm,
) -> ServiceResult<Capa>
where
    R: QualityManagementReader + QualityManagementWriter + ?Sized,
{
    ensure_role(user, QUALITY_MANAGE)?;

    let next = CapaStatus::try_from(form)?;
    let company_id = user.company_id()?;
    let capa = repo
        .get_capa(CapaId::new(capa_id)?, company_id)?
        .ok_or(ServiceError::NotFound)?;

    if !capa.status.can_transition_to(next) {
        return Err(ServiceError::Conflict(format!(
            "cannot move a CAPA from {} to {next}",
            capa.status
        )));
    }

    let updated = repo.update_capa_status(capa.id, company_id, capa.status, next)?;
    log::info!("CAPA {} is now {next}", updated.id);
    Ok(updated)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::quality_management::{
        CapaActionType, CheckResult, QualityCheck, QualitySummary, Severity,
    };
    use crate::domain::types::{CompanyId, QualityCheckId, UserId};
    use crate::repository::mock::MockRepository;
    use chrono::NaiveDate;

    fn inspector() -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "11".into(),
            email: "qa@example.com".into(),
            name: "QA".into(),
            company_id: 5,
            roles: vec![QUALITY_VIEW.to_string(), QUALITY_MANAGE.to_string()],
            exp: 0,
        }
    }

    fn at() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 5)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn failing_form() -> QualityCheckForm {
        QualityCheckForm {
            work_order_id: None,
            check_type: "dimensional".into(),
            result: "fail".into(),
            sample_size: 10,
            defects_found: 3,
            notes: None,
            severity: Some("major".into()),
            description: None,
        }
    }

    fn recorded(with_nc: bool) -> RecordedCheck {
        RecordedCheck {
            check: QualityCheck {
                id: QualityCheckId::new(1).unwrap(),
                company_id: CompanyId::new(5).unwrap(),
                work_order_id: None,
                check_type: "dimensional".into(),
                inspector_id: UserId::new(11).unwrap(),
                result: CheckResult::Fail,
                sample_size: 10,
                defects_found: 3,
                notes: None,
                checked_at: at(),
            },
            non_conformance: with_nc.then(|| non_conformance(NonConformanceStatus::Open)),
        }
    }

    fn non_conformance(status: NonConformanceStatus) -> NonConformance {
        NonConformance {
            id: NonConformanceId::new(7).unwrap(),
            company_id: CompanyId::new(5).unwrap(),
            quality_check_id: Some(QualityCheckId::new(1).unwrap()),
            severity: Severity::Major,
            description: "Failed dimensional inspection".into(),
            status,
            created_at: at(),
            closed_at: None,
        }
    }

    fn capa(status: CapaStatus) -> Capa {
        Capa {
            id: CapaId::new(2).unwrap(),
            company_id: CompanyId::new(5).unwrap(),
            non_conformance_id: NonConformanceId::new(7).unwrap(),
            action_type: CapaActionType::Corrective,
            description: "Recalibrate gauge".into(),
            owner: "Metrology".into(),
            due_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            status,
            created_at: at(),
        }
    }

    #[test]
    fn failing_check_carries_finding_to_repository() {
        let mut repo = MockRepository::new();
        repo.expect_create_quality_check()
            .withf(|check| {
                check
                    .finding
                    .as_ref()
                    .is_some_and(|f| f.severity == Severity::Major)
                    && check.inspector_id.get() == 11
            })
            .times(1)
            .returning(|_| Ok(recorded(true)));

        let result = create_quality_check(&repo, &inspector(), failing_form()).unwrap();

        assert!(result.non_conformance.is_some());
    }

    #[test]
    fn foreign_work_order_is_rejected() {
        let mut repo = MockRepository::new();
        repo.expect_get_work_order().returning(|_, _| Ok(None));
        repo.expect_create_quality_check().times(0);

        let mut form = failing_form();
        form.work_order_id = Some("44".into());
        let result = create_quality_check(&repo, &inspector(), form);

        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn closing_a_closed_non_conformance_conflicts() {
        let mut repo = MockRepository::new();
        repo.expect_get_non_conformance()
            .returning(|_, _| Ok(Some(non_conformance(NonConformanceStatus::Closed))));
        repo.expect_close_non_conformance().times(0);

        let result = close_non_conformance(&repo, &inspector(), 7);

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn audit_in_the_past_is_rejected() {
        let mut repo = MockRepository::new();
        repo.expect_create_audit().times(0);

        let result = schedule_audit(
            &repo,
            &inspector(),
            AuditForm {
                title: "Supplier audit".into(),
                audit_type: "supplier".into(),
                auditor: "J. Smith".into(),
                scheduled_date: "2001-01-01".into(),
            },
        );

        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn capa_for_missing_non_conformance_is_rejected() {
        let mut repo = MockRepository::new();
        repo.expect_get_non_conformance().returning(|_, _| Ok(None));
        repo.expect_create_capa().times(0);

        let result = create_capa(
            &repo,
            &inspector(),
            CapaForm {
                non_conformance_id: 99,
                action_type: "preventive".into(),
                description: "Add poka-yoke fixture".into(),
                owner: "Engineering".into(),
                due_date: "2030-01-01".into(),
            },
        );

        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn capa_cannot_skip_in_progress() {
        let mut repo = MockRepository::new();
        repo.expect_get_capa()
            .returning(|_, _| Ok(Some(capa(CapaStatus::Open))));
        repo.expect_update_capa_status().times(0);

        let result = update_capa_status(
            &repo,
            &inspector(),
            2,
            CapaStatusForm {
                status: "completed".into(),
            },
        );

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn dashboard_collects_all_widgets() {
        let mut repo = MockRepository::new();
        repo.expect_quality_summary()
            .returning(|_, _| Ok(QualitySummary::from_totals(10, 9, 1, 500, 5)));
        repo.expect_open_non_conformances_by_severity()
            .returning(|_| Ok(vec![]));
        repo.expect_upcoming_audits()
            .withf(|_, _, limit| *limit == UPCOMING_AUDITS)
            .returning(|_, _, _| Ok(vec![]));
        repo.expect_count_overdue_capas().returning(|_, _| Ok(1));

        let data = load_dashboard(&repo, &inspector(), &DateFilterQuery::default()).unwrap();

        assert_eq!(data.dashboard.summary.pass_rate, Some(90.0));
        assert_eq!(data.dashboard.summary.defect_rate, Some(1.0));
        assert_eq!(data.dashboard.overdue_capas, 1);
    }
}
