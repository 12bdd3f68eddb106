use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sqlite::Sqlite;

use crate::domain::reporting::{
    Dashboard, NewReport, NewReportSchedule, Report, ReportKind, ReportSchedule, SaveDashboard,
};
use crate::domain::stats::{LabelCount, LabelValue};
use crate::domain::types::{CompanyId, ReportId, ScheduleId, UserId};
use crate::models::reporting::{
    Dashboard as DbDashboard, NewReport as DbNewReport, NewReportSchedule as DbNewReportSchedule,
    Report as DbReport, ReportSchedule as DbReportSchedule, SaveDashboard as DbSaveDashboard,
    join_recipients,
};
use crate::models::stats::{CountRow, LabelCountRow, LabelValueRow};
use crate::query::{DateRange, Op, WhereClause};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{DieselRepository, ReportListQuery, ReportingReader, ReportingWriter};

/// The aggregate statement behind each report kind, scoped to one company.
fn report_statement(
    kind: ReportKind,
    company_id: CompanyId,
    range: &DateRange,
) -> BoxedSqlQuery<'static, Sqlite, SqlQuery> {
    match kind {
        ReportKind::WorkOrdersByStatus => WhereClause::scoped("company_id", company_id)
            .date_range("created_at", range)
            .query(
                "SELECT status AS label, CAST(COUNT(*) AS REAL) AS value FROM work_orders",
                " GROUP BY status ORDER BY value DESC, label",
            ),
        ReportKind::PurchaseSpendByVendor => WhereClause::scoped("po.company_id", company_id)
            .day_range("po.order_date", range)
            .and_raw("po.status <> 'cancelled'")
            .query(
                "SELECT v.name AS label, SUM(po.total_amount) AS value \
                 FROM purchase_orders po JOIN vendors v ON v.id = po.vendor_id",
                " GROUP BY v.id, v.name ORDER BY value DESC, label",
            ),
        ReportKind::QualityDefectRateByCheckType => {
            WhereClause::scoped("company_id", company_id)
                .date_range("checked_at", range)
                .query(
                    "SELECT check_type AS label, \
                     SUM(defects_found) * 100.0 / NULLIF(SUM(sample_size), 0) AS value \
                     FROM quality_checks",
                    " GROUP BY check_type ORDER BY label",
                )
        }
        ReportKind::ApiCallsByDay => WhereClause::scoped("company_id", company_id)
            .date_range("created_at", range)
            .query(
                "SELECT date(created_at) AS label, CAST(COUNT(*) AS REAL) AS value FROM api_usage",
                " GROUP BY date(created_at) ORDER BY label",
            ),
        ReportKind::FeedbackRatingByCategory => WhereClause::scoped("company_id", company_id)
            .date_range("created_at", range)
            .query(
                "SELECT category AS label, AVG(rating) AS value FROM feedback",
                " GROUP BY category ORDER BY label",
            ),
        ReportKind::AuditEventsByAction => WhereClause::scoped("company_id", company_id)
            .date_range("created_at", range)
            .query(
                "SELECT action AS label, CAST(COUNT(*) AS REAL) AS value FROM audit_logs",
                " GROUP BY action ORDER BY value DESC, label",
            ),
    }
}

impl ReportingReader for DieselRepository {
    fn list_reports(&self, query: ReportListQuery) -> RepositoryResult<(usize, Vec<Report>)> {
        use crate::schema::reports;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = reports::table
                .filter(reports::company_id.eq(query.company_id.get()))
                .into_boxed::<Sqlite>();

            if let Some(category) = &query.category {
                items = items.filter(reports::category.eq(category.clone()));
            }
            if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                items = items.filter(reports::name.like(format!("%{term}%")));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let items = query_builder()
            .order((reports::created_at.desc(), reports::id.desc()))
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbReport>(&mut conn)?
            .into_iter()
            .map(|r| Report::try_from(r).map_err(RepositoryError::from))
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok((total, items))
    }

    fn get_report(
        &self,
        id: ReportId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<Report>> {
        use crate::schema::reports;

        let mut conn = self.conn()?;
        let report = reports::table
            .filter(reports::id.eq(id.get()))
            .filter(reports::company_id.eq(company_id.get()))
            .first::<DbReport>(&mut conn)
            .optional()?;

        report.map(Report::try_from).transpose().map_err(Into::into)
    }

    fn run_report_query(
        &self,
        kind: ReportKind,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<Vec<LabelValue>> {
        let mut conn = self.conn()?;
        let rows = report_statement(kind, company_id, range).load::<LabelValueRow>(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn report_counts_by_category(
        &self,
        company_id: CompanyId,
    ) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .query(
                "SELECT category AS label, COUNT(*) AS count FROM reports",
                " GROUP BY category ORDER BY count DESC, label",
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn list_schedules(&self, company_id: CompanyId) -> RepositoryResult<Vec<ReportSchedule>> {
        use crate::schema::report_schedules;

        let mut conn = self.conn()?;
        report_schedules::table
            .filter(report_schedules::company_id.eq(company_id.get()))
            .order((report_schedules::next_run.asc(), report_schedules::id.asc()))
            .load::<DbReportSchedule>(&mut conn)?
            .into_iter()
            .map(|s| ReportSchedule::try_from(s).map_err(RepositoryError::from))
            .collect()
    }

    fn count_active_schedules(&self, company_id: CompanyId) -> RepositoryResult<i64> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .and("active", Op::Eq, true)
            .query("SELECT COUNT(*) AS count FROM report_schedules", "")
            .get_result::<CountRow>(&mut conn)?;

        Ok(row.count)
    }

    fn count_due_schedules(
        &self,
        company_id: CompanyId,
        now: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .and("active", Op::Eq, true)
            .and("next_run", Op::Lte, now)
            .query("SELECT COUNT(*) AS count FROM report_schedules", "")
            .get_result::<CountRow>(&mut conn)?;

        Ok(row.count)
    }

    fn due_schedules(&self, now: NaiveDateTime) -> RepositoryResult<Vec<ReportSchedule>> {
        use crate::schema::report_schedules;

        let mut conn = self.conn()?;
        report_schedules::table
            .filter(report_schedules::active.eq(true))
            .filter(report_schedules::next_run.le(now))
            .order((report_schedules::next_run.asc(), report_schedules::id.asc()))
            .load::<DbReportSchedule>(&mut conn)?
            .into_iter()
            .map(|s| ReportSchedule::try_from(s).map_err(RepositoryError::from))
            .collect()
    }

    fn list_dashboards(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> RepositoryResult<Vec<Dashboard>> {
        use crate::schema::dashboards;

        let mut conn = self.conn()?;
        dashboards::table
            .filter(dashboards::company_id.eq(company_id.get()))
            .filter(dashboards::user_id.eq(user_id.get()))
            .order(dashboards::name.asc())
            .load::<DbDashboard>(&mut conn)?
            .into_iter()
            .map(|d| Dashboard::try_from(d).map_err(RepositoryError::from))
            .collect()
    }
}

impl ReportingWriter for DieselRepository {
    fn create_report(&self, report: &NewReport) -> RepositoryResult<Report> {
        use crate::schema::reports;

        let mut conn = self.conn()?;
        let insertable: DbNewReport = report.into();
        let created = diesel::insert_into(reports::table)
            .values(&insertable)
            .get_result::<DbReport>(&mut conn)?;

        Ok(Report::try_from(created)?)
    }

    fn create_schedule(&self, schedule: &NewReportSchedule) -> RepositoryResult<ReportSchedule> {
        use crate::schema::report_schedules;

        let mut conn = self.conn()?;
        let created = diesel::insert_into(report_schedules::table)
            .values(&DbNewReportSchedule {
                company_id: schedule.company_id.get(),
                report_id: schedule.report_id.get(),
                frequency: schedule.frequency.as_str(),
                recipients: join_recipients(schedule.recipients.iter().map(|e| e.as_str())),
                next_run: schedule.next_run,
            })
            .get_result::<DbReportSchedule>(&mut conn)?;

        Ok(ReportSchedule::try_from(created)?)
    }

    fn mark_schedule_run(
        &self,
        id: ScheduleId,
        last_run: NaiveDateTime,
        next_run: NaiveDateTime,
    ) -> RepositoryResult<ReportSchedule> {
        use crate::schema::report_schedules;

        let mut conn = self.conn()?;
        let updated = diesel::update(report_schedules::table.find(id.get()))
            .set((
                report_schedules::last_run.eq(Some(last_run)),
                report_schedules::next_run.eq(next_run),
            ))
            .get_result::<DbReportSchedule>(&mut conn)?;

        Ok(ReportSchedule::try_from(updated)?)
    }

    fn save_dashboard(
        &self,
        dashboard: &SaveDashboard,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<Dashboard> {
        use crate::schema::dashboards;

        let mut conn = self.conn()?;
        let row = DbSaveDashboard {
            company_id: dashboard.company_id.get(),
            user_id: dashboard.user_id.get(),
            name: dashboard.name.as_str(),
            layout: serde_json::to_string(&dashboard.layout)?,
            updated_at,
        };

        let saved = diesel::insert_into(dashboards::table)
            .values(&row)
            .on_conflict((dashboards::company_id, dashboards::user_id, dashboards::name))
            .do_update()
            .set((
                dashboards::layout.eq(&row.layout),
                dashboards::updated_at.eq(row.updated_at),
            ))
            .get_result::<DbDashboard>(&mut conn)?;

        Ok(Dashboard::try_from(saved)?)
    }
}
