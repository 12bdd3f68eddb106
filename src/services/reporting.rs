//! Saved reports, their schedules and personal dashboards.

use chrono::{NaiveDateTime, Utc};

use crate::domain::reporting::{Dashboard, Report, ReportResult, ReportSchedule, ReportingDashboard};
use crate::domain::types::{ReportId, Title};
use crate::domain::user_experience::NewNotification;
use crate::dto::reporting::{DispatchSummary, ReportListPageData, ReportingDashboardPageData};
use crate::forms::DateFilterQuery;
use crate::forms::reporting::{
    DashboardForm, DashboardPayload, ReportFilter, ReportFilterQuery, ReportForm, ReportPayload,
    ScheduleForm, SchedulePayload,
};
use crate::models::auth::AuthenticatedUser;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated, Pagination};
use crate::query::DateRange;
use crate::repository::{ReportListQuery, ReportingReader, ReportingWriter, UserExperienceWriter};
use crate::routes::{check_role, ensure_role};
use crate::services::{ServiceError, ServiceResult, user_experience, write_csv};
use crate::{REPORTING_MANAGE, REPORTING_VIEW};

pub fn load_dashboard<R>(
    repo: &R,
    user: &AuthenticatedUser,
) -> ServiceResult<ReportingDashboardPageData>
where
    R: ReportingReader + ?Sized,
{
    ensure_role(user, REPORTING_VIEW)?;

    let company_id = user.company_id()?;
    let now = Utc::now().naive_utc();

    let dashboard = ReportingDashboard {
        by_category: repo.report_counts_by_category(company_id).map_err(|err| {
            log::error!("Failed to count reports: {err}");
            err
        })?,
        active_schedules: repo.count_active_schedules(company_id)?,
        due_now: repo.count_due_schedules(company_id, now)?,
    };

    Ok(ReportingDashboardPageData {
        dashboard,
        schedules: repo.list_schedules(company_id)?,
        dashboards: repo.list_dashboards(company_id, user.user_id()?)?,
    })
}

pub fn list_reports<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: ReportFilterQuery,
) -> ServiceResult<ReportListPageData>
where
    R: ReportingReader + ?Sized,
{
    ensure_role(user, REPORTING_VIEW)?;

    let filter = ReportFilter::from(query);
    let mut list_query =
        ReportListQuery::new(user.company_id()?).paginate(filter.page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(category) = filter.category {
        list_query = list_query.category(category);
    }
    if let Some(search) = filter.search {
        list_query = list_query.search(search);
    }

    let (total, reports) = repo.list_reports(list_query).map_err(|err| {
        log::error!("Failed to list reports: {err}");
        err
    })?;

    Ok(ReportListPageData {
        reports: Paginated::new(
            reports,
            Pagination::new(filter.page, DEFAULT_ITEMS_PER_PAGE),
            total,
        ),
        can_edit: check_role(REPORTING_MANAGE, &user.roles),
    })
}

pub fn create_report<R>(repo: &R, user: &AuthenticatedUser, form: ReportForm) -> ServiceResult<Report>
where
    R: ReportingWriter + ?Sized,
{
    ensure_role(user, REPORTING_MANAGE)?;

    let payload = ReportPayload::try_from(form)?;
    let report = repo
        .create_report(&payload.into_domain(user.company_id()?, user.user_id()?))
        .map_err(|err| {
            log::error!("Failed to create report: {err}");
            err
        })?;

    Ok(report)
}

pub fn run_report<R>(
    repo: &R,
    user: &AuthenticatedUser,
    report_id: i32,
    query: &DateFilterQuery,
) -> ServiceResult<Option<ReportResult>>
where
    R: ReportingReader + ?Sized,
{
    ensure_role(user, REPORTING_VIEW)?;

    let company_id = user.company_id()?;
    let range = DateRange::try_from(query)?;
    let Some(report) = repo.get_report(ReportId::new(report_id)?, company_id)? else {
        return Ok(None);
    };

    let rows = repo
        .run_report_query(report.kind, company_id, &range)
        .map_err(|err| {
            log::error!("Failed to run report {report_id}: {err}");
            err
        })?;

    Ok(Some(ReportResult::new(report, rows, range)))
}

pub fn export_report_csv<R>(
    repo: &R,
    user: &AuthenticatedUser,
    report_id: i32,
    query: &DateFilterQuery,
) -> ServiceResult<String>
where
    R: ReportingReader + ?Sized,
{
    let result = run_report(repo, user, report_id, query)?.ok_or(ServiceError::NotFound)?;

    let records = result.rows.iter().map(|row| {
        vec![
            row.label.clone(),
            row.value.map(|v| format!("{v:.2}")).unwrap_or_default(),
        ]
    });

    write_csv(&result.columns, records)
}

pub fn schedule_report<R>(
    repo: &R,
    user: &AuthenticatedUser,
    report_id: i32,
    form: ScheduleForm,
) -> ServiceResult<ReportSchedule>
where
    R: ReportingReader + ReportingWriter + ?Sized,
{
    ensure_role(user, REPORTING_MANAGE)?;

    let company_id = user.company_id()?;
    let payload = SchedulePayload::try_from(form)?;
    let report = repo
        .get_report(ReportId::new(report_id)?, company_id)?
        .ok_or(ServiceError::NotFound)?;

    let now = Utc::now().naive_utc();
    let schedule = repo
        .create_schedule(&payload.into_domain(company_id, report.id, now))
        .map_err(|err| {
            log::error!("Failed to schedule report {report_id}: {err}");
            err
        })?;

    log::info!(
        "Scheduled report {} {} starting {}",
        report.id,
        schedule.frequency,
        schedule.next_run
    );
    Ok(schedule)
}

pub fn list_schedules<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Vec<ReportSchedule>>
where
    R: ReportingReader + ?Sized,
{
    ensure_role(user, REPORTING_VIEW)?;

    Ok(repo.list_schedules(user.company_id()?)?)
}

/// Dashboards belong to the signed-in user, so viewing is enough to save one.
pub fn save_dashboard<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: DashboardForm,
) -> ServiceResult<Dashboard>
where
    R: ReportingWriter + ?Sized,
{
    ensure_role(user, REPORTING_VIEW)?;

    let payload = DashboardPayload::try_from(form)?;
    let dashboard = repo
        .save_dashboard(
            &payload.into_domain(user.company_id()?, user.user_id()?),
            Utc::now().naive_utc(),
        )
        .map_err(|err| {
            log::error!("Failed to save dashboard: {err}");
            err
        })?;

    Ok(dashboard)
}

pub fn list_dashboards<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Vec<Dashboard>>
where
    R: ReportingReader + ?Sized,
{
    ensure_role(user, REPORTING_VIEW)?;

    Ok(repo.list_dashboards(user.company_id()?, user.user_id()?)?)
}

/// Active schedules of every company that are due at `now`.
pub fn due_schedules<R>(repo: &R, now: NaiveDateTime) -> ServiceResult<Vec<ReportSchedule>>
where
    R: ReportingReader + ?Sized,
{
    Ok(repo.due_schedules(now)?)
}

/// Records a run at `now` and moves `next_run` past it.
pub fn mark_schedule_run<R>(
    repo: &R,
    schedule: &ReportSchedule,
    now: NaiveDateTime,
) -> ServiceResult<ReportSchedule>
where
    R: ReportingWriter + ?Sized,
{
    let next_run = schedule.following_run(now);
    Ok(repo.mark_schedule_run(schedule.id, now, next_run)?)
}

fn dispatch_one<R>(repo: &R, schedule: &ReportSchedule, now: NaiveDateTime) -> ServiceResult<()>
where
    R: ReportingReader + ReportingWriter + UserExperienceWriter + ?Sized,
{
    let report = repo
        .get_report(schedule.report_id, schedule.company_id)?
        .ok_or(ServiceError::NotFound)?;

    let range = DateRange::new(
        Some(schedule.frequency.rewind(now).date()),
        Some(now.date()),
    );
    let rows = repo.run_report_query(report.kind, schedule.company_id, &range)?;

    let notification = NewNotification {
        company_id: schedule.company_id,
        user_id: report.created_by,
        title: Title::new(format!("Scheduled report: {}", report.name))?,
        body: format!(
            "{} run for {} to {} returned {} rows.",
            schedule.frequency,
            range.from.map(|d| d.to_string()).unwrap_or_default(),
            now.date(),
            rows.len()
        ),
        link: Some(format!("/reporting/reports/{}", report.id)),
    };
    user_experience::create_notification(repo, &notification)?;

    mark_schedule_run(repo, schedule, now)?;
    Ok(())
}

/// Runs every due schedule once. A failing schedule is logged and skipped.
pub fn dispatch_due_schedules<R>(repo: &R, now: NaiveDateTime) -> ServiceResult<DispatchSummary>
where
    R: ReportingReader + ReportingWriter + UserExperienceWriter + ?Sized,
{
    let mut summary = DispatchSummary::default();

    for schedule in due_schedules(repo, now)? {
        match dispatch_one(repo, &schedule, now) {
            Ok(()) => summary.dispatched += 1,
            Err(err) => {
                log::error!("Failed to dispatch schedule {}: {err}", schedule.id);
                summary.failed += 1;
            }
        }
    }

    if summary.dispatched > 0 || summary.failed > 0 {
        log::info!(
            "Dispatched {} schedules, {} failed",
            summary.dispatched,
            summary.failed
        );
    }
    Ok(summary)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::reporting::{Frequency, ReportKind};
    use crate::domain::stats::LabelValue;
    use crate::domain::types::{CompanyId, NotificationId, ScheduleId, UserId};
    use crate::domain::user_experience::Notification;
    use crate::repository::errors::RepositoryError;
    use crate::repository::mock::MockRepository;
    use chrono::NaiveDate;

    fn analyst() -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "7".into(),
            email: "analyst@example.com".into(),
            name: "Analyst".into(),
            company_id: 2,
            roles: vec![REPORTING_VIEW.to_string(), REPORTING_MANAGE.to_string()],
            exp: 0,
        }
    }

    fn at(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn report(id: i32) -> Report {
        Report {
            id: ReportId::new(id).unwrap(),
            company_id: CompanyId::new(2).unwrap(),
            name: "Spend".into(),
            category: "finance".into(),
            kind: ReportKind::PurchaseSpendByVendor,
            created_by: UserId::new(7).unwrap(),
            created_at: at(1),
        }
    }

    fn schedule(id: i32, report_id: i32) -> ReportSchedule {
        ReportSchedule {
            id: ScheduleId::new(id).unwrap(),
            company_id: CompanyId::new(2).unwrap(),
            report_id: ReportId::new(report_id).unwrap(),
            frequency: Frequency::Weekly,
            recipients: vec!["ops@example.com".into()],
            next_run: at(3),
            last_run: None,
            active: true,
        }
    }

    fn notification() -> Notification {
        Notification {
            id: NotificationId::new(1).unwrap(),
            company_id: CompanyId::new(2).unwrap(),
            user_id: UserId::new(7).unwrap(),
            title: "Scheduled report: Spend".into(),
            body: String::new(),
            link: None,
            read_at: None,
            created_at: at(10),
        }
    }

    #[test]
    fn missing_report_runs_to_none() {
        let mut repo = MockRepository::new();
        repo.expect_get_report().returning(|_, _| Ok(None));
        repo.expect_run_report_query().times(0);

        let result = run_report(&repo, &analyst(), 4, &DateFilterQuery::default()).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn csv_export_uses_report_columns() {
        let mut repo = MockRepository::new();
        repo.expect_get_report().returning(|id, _| Ok(Some(report(id.get()))));
        repo.expect_run_report_query().returning(|_, _, _| {
            Ok(vec![
                LabelValue {
                    label: "Acme".into(),
                    value: Some(1250.5),
                },
                LabelValue {
                    label: "Globex".into(),
                    value: None,
                },
            ])
        });

        let csv = export_report_csv(&repo, &analyst(), 1, &DateFilterQuery::default()).unwrap();

        assert_eq!(csv, "Vendor,Spend\nAcme,1250.50\nGlobex,\n");
    }

    #[test]
    fn exporting_missing_report_is_not_found() {
        let mut repo = MockRepository::new();
        repo.expect_get_report().returning(|_, _| Ok(None));

        let result = export_report_csv(&repo, &analyst(), 1, &DateFilterQuery::default());

        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[test]
    fn scheduling_requires_existing_report() {
        let mut repo = MockRepository::new();
        repo.expect_get_report().returning(|_, _| Ok(None));
        repo.expect_create_schedule().times(0);

        let result = schedule_report(
            &repo,
            &analyst(),
            5,
            ScheduleForm {
                frequency: "daily".into(),
                recipients: "ops@example.com".into(),
            },
        );

        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[test]
    fn viewer_cannot_create_reports() {
        let repo = MockRepository::new();
        let mut user = analyst();
        user.roles = vec![REPORTING_VIEW.to_string()];

        let result = create_report(
            &repo,
            &user,
            ReportForm {
                name: "Spend".into(),
                category: "finance".into(),
                kind: "purchase_spend_by_vendor".into(),
            },
        );

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn mark_run_skips_to_first_future_period() {
        let mut repo = MockRepository::new();
        repo.expect_mark_schedule_run()
            .withf(|_, last, next| *last == at(20) && *next == at(24))
            .times(1)
            .returning(|_, last, next| {
                let mut updated = schedule(1, 1);
                updated.last_run = Some(last);
                updated.next_run = next;
                Ok(updated)
            });

        let updated = mark_schedule_run(&repo, &schedule(1, 1), at(20)).unwrap();

        assert_eq!(updated.next_run, at(24));
    }

    #[test]
    fn dispatcher_notifies_author_and_continues_after_failures() {
        let mut repo = MockRepository::new();
        repo.expect_due_schedules()
            .returning(|_| Ok(vec![schedule(1, 1), schedule(2, 99)]));
        repo.expect_get_report().returning(|id, _| {
            if id.get() == 99 {
                Err(RepositoryError::DatabaseError("locked".into()))
            } else {
                Ok(Some(report(id.get())))
            }
        });
        repo.expect_run_report_query().returning(|_, _, range| {
            assert_eq!(range.from, NaiveDate::from_ymd_opt(2025, 3, 3));
            Ok(vec![LabelValue {
                label: "Acme".into(),
                value: Some(10.0),
            }])
        });
        repo.expect_create_notification()
            .withf(|n| n.user_id.get() == 7 && n.body.contains("1 rows"))
            .times(1)
            .returning(|_| Ok(notification()));
        repo.expect_mark_schedule_run()
            .times(1)
            .returning(|_, _, _| Ok(schedule(1, 1)));

        let summary = dispatch_due_schedules(&repo, at(10)).unwrap();

        assert_eq!(
            summary,
            DispatchSummary {
                dispatched: 1,
                failed: 1
            }
        );
    }
}
