use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::reporting::{
    Dashboard as DomainDashboard, NewReport as DomainNewReport, Report as DomainReport,
    ReportSchedule as DomainReportSchedule,
};
use crate::domain::types::{
    CompanyId, DashboardId, ReportId, ScheduleId, TypeConstraintError, UserId,
};

/// Recipients are persisted as one comma-separated column.
pub fn join_recipients<'a>(emails: impl IntoIterator<Item = &'a str>) -> String {
    emails.into_iter().collect::<Vec<_>>().join(",")
}

pub fn split_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::reports)]
pub struct Report {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub category: String,
    pub kind: String,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::reports)]
pub struct NewReport<'a> {
    pub company_id: i32,
    pub name: &'a str,
    pub category: &'a str,
    pub kind: &'a str,
    pub created_by: i32,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::report_schedules)]
pub struct ReportSchedule {
    pub id: i32,
    pub company_id: i32,
    pub report_id: i32,
    pub frequency: String,
    pub recipients: String,
    pub next_run: NaiveDateTime,
    pub last_run: Option<NaiveDateTime>,
    pub active: bool,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::report_schedules)]
pub struct NewReportSchedule<'a> {
    pub company_id: i32,
    pub report_id: i32,
    pub frequency: &'a str,
    pub recipients: String,
    pub next_run: NaiveDateTime,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::dashboards)]
pub struct Dashboard {
    pub id: i32,
    pub company_id: i32,
    pub user_id: i32,
    pub name: String,
    pub layout: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::dashboards)]
pub struct SaveDashboard<'a> {
    pub company_id: i32,
    pub user_id: i32,
    pub name: &'a str,
    pub layout: String,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<Report> for DomainReport {
    type Error = TypeConstraintError;

    fn try_from(report: Report) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReportId::new(report.id)?,
            company_id: CompanyId::new(report.company_id)?,
            name: report.name,
            category: report.category,
            kind: report.kind.parse()?,
            created_by: UserId::new(report.created_by)?,
            created_at: report.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewReport> for NewReport<'a> {
    fn from(report: &'a DomainNewReport) -> Self {
        Self {
            company_id: report.company_id.get(),
            name: report.name.as_str(),
            category: report.category.as_str(),
            kind: report.kind.as_str(),
            created_by: report.created_by.get(),
        }
    }
}

impl TryFrom<ReportSchedule> for DomainReportSchedule {
    type Error = TypeConstraintError;

    fn try_from(schedule: ReportSchedule) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ScheduleId::new(schedule.id)?,
            company_id: CompanyId::new(schedule.company_id)?,
            report_id: ReportId::new(schedule.report_id)?,
            frequency: schedule.frequency.parse()?,
            recipients: split_recipients(&schedule.recipients),
            next_run: schedule.next_run,
            last_run: schedule.last_run,
            active: schedule.active,
        })
    }
}

impl TryFrom<Dashboard> for DomainDashboard {
    type Error = TypeConstraintError;

    fn try_from(dashboard: Dashboard) -> Result<Self, Self::Error> {
        let layout = serde_json::from_str(&dashboard.layout)
            .map_err(|err| TypeConstraintError::InvalidValue(format!("dashboard layout: {err}")))?;
        Ok(Self {
            id: DashboardId::new(dashboard.id)?,
            company_id: CompanyId::new(dashboard.company_id)?,
            user_id: UserId::new(dashboard.user_id)?,
            name: dashboard.name,
            layout,
            updated_at: dashboard.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn recipients_are_split_and_trimmed() {
        assert_eq!(
            split_recipients("a@example.com, b@example.com,,"),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
        assert_eq!(
            join_recipients(["a@example.com", "b@example.com"]),
            "a@example.com,b@example.com"
        );
    }

    #[test]
    fn schedule_row_converts() {
        let schedule = DomainReportSchedule::try_from(ReportSchedule {
            id: 1,
            company_id: 2,
            report_id: 3,
            frequency: "weekly".into(),
            recipients: "ops@example.com".into(),
            next_run: at(),
            last_run: None,
            active: true,
        })
        .unwrap();
        assert_eq!(schedule.recipients.len(), 1);
    }

    #[test]
    fn corrupt_layout_is_rejected() {
        let row = Dashboard {
            id: 1,
            company_id: 1,
            user_id: 1,
            name: "Ops".into(),
            layout: "{not json".into(),
            updated_at: at(),
        };
        assert!(DomainDashboard::try_from(row).is_err());
    }
}
