//! Saved reports, their delivery schedules and personal dashboards.

use chrono::{Days, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::stats::{LabelCount, LabelValue};
use crate::domain::types::{
    CompanyId, DashboardId, Email, Label, ReportId, ScheduleId, Title, UserId, string_enum,
};
use crate::query::DateRange;

string_enum!(ReportKind {
    WorkOrdersByStatus => "work_orders_by_status",
    PurchaseSpendByVendor => "purchase_spend_by_vendor",
    QualityDefectRateByCheckType => "quality_defect_rate_by_check_type",
    ApiCallsByDay => "api_calls_by_day",
    FeedbackRatingByCategory => "feedback_rating_by_category",
    AuditEventsByAction => "audit_events_by_action",
});

impl ReportKind {
    /// Headers of the two result columns.
    pub fn columns(self) -> [&'static str; 2] {
        match self {
            ReportKind::WorkOrdersByStatus => ["Status", "Work orders"],
            ReportKind::PurchaseSpendByVendor => ["Vendor", "Spend"],
            ReportKind::QualityDefectRateByCheckType => ["Check type", "Defect rate (%)"],
            ReportKind::ApiCallsByDay => ["Day", "Calls"],
            ReportKind::FeedbackRatingByCategory => ["Category", "Average rating"],
            ReportKind::AuditEventsByAction => ["Action", "Events"],
        }
    }
}

string_enum!(Frequency {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
});

impl Frequency {
    /// One period after `at`. Month steps clamp to the last day of the month.
    pub fn advance(self, at: NaiveDateTime) -> NaiveDateTime {
        let next = match self {
            Frequency::Daily => at.checked_add_days(Days::new(1)),
            Frequency::Weekly => at.checked_add_days(Days::new(7)),
            Frequency::Monthly => at.checked_add_months(Months::new(1)),
        };
        next.unwrap_or(NaiveDateTime::MAX)
    }

    /// One period before `at`.
    pub fn rewind(self, at: NaiveDateTime) -> NaiveDateTime {
        let previous = match self {
            Frequency::Daily => at.checked_sub_days(Days::new(1)),
            Frequency::Weekly => at.checked_sub_days(Days::new(7)),
            Frequency::Monthly => at.checked_sub_months(Months::new(1)),
        };
        previous.unwrap_or(NaiveDateTime::MIN)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub company_id: CompanyId,
    pub name: String,
    pub category: String,
    pub kind: ReportKind,
    pub created_by: UserId,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub company_id: CompanyId,
    pub name: Title,
    pub category: Label,
    pub kind: ReportKind,
    pub created_by: UserId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResult {
    pub report: Report,
    pub columns: Vec<String>,
    pub rows: Vec<LabelValue>,
    pub range: DateRange,
}

impl ReportResult {
    pub fn new(report: Report, rows: Vec<LabelValue>, range: DateRange) -> Self {
        let columns = report.kind.columns().iter().map(|c| c.to_string()).collect();
        Self {
            report,
            columns,
            rows,
            range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSchedule {
    pub id: ScheduleId,
    pub company_id: CompanyId,
    pub report_id: ReportId,
    pub frequency: Frequency,
    pub recipients: Vec<String>,
    pub next_run: NaiveDateTime,
    pub last_run: Option<NaiveDateTime>,
    pub active: bool,
}

impl ReportSchedule {
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.active && self.next_run <= now
    }

    /// First run strictly after `now`, stepping from the current `next_run`.
    pub fn following_run(&self, now: NaiveDateTime) -> NaiveDateTime {
        let mut next = self.next_run;
        while next <= now {
            let advanced = self.frequency.advance(next);
            if advanced <= next {
                break;
            }
            next = advanced;
        }
        next
    }
}

#[derive(Debug, Clone)]
pub struct NewReportSchedule {
    pub company_id: CompanyId,
    pub report_id: ReportId,
    pub frequency: Frequency,
    pub recipients: Vec<Email>,
    pub next_run: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: DashboardId,
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub name: String,
    pub layout: serde_json::Value,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct SaveDashboard {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub name: Title,
    /// Always a JSON object or array.
    pub layout: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportingDashboard {
    pub by_category: Vec<LabelCount>,
    pub active_schedules: i64,
    pub due_now: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    #[test]
    fn monthly_advance_clamps_to_month_end() {
        assert_eq!(Frequency::Monthly.advance(at(2025, 1, 31)), at(2025, 2, 28));
        assert_eq!(Frequency::Monthly.advance(at(2024, 1, 31)), at(2024, 2, 29));
        assert_eq!(Frequency::Weekly.advance(at(2025, 1, 31)), at(2025, 2, 7));
        assert_eq!(Frequency::Daily.advance(at(2025, 12, 31)), at(2026, 1, 1));
    }

    #[test]
    fn following_run_skips_missed_periods() {
        let schedule = ReportSchedule {
            id: ScheduleId::new(1).unwrap(),
            company_id: CompanyId::new(1).unwrap(),
            report_id: ReportId::new(1).unwrap(),
            frequency: Frequency::Daily,
            recipients: vec!["ops@example.com".into()],
            next_run: at(2025, 3, 1),
            last_run: None,
            active: true,
        };
        let now = at(2025, 3, 4);
        assert!(schedule.is_due(now));
        assert_eq!(schedule.following_run(now), at(2025, 3, 5));
    }

    #[test]
    fn every_kind_has_two_columns() {
        for kind in ReportKind::ALL {
            assert!(kind.columns().iter().all(|c| !c.is_empty()));
        }
    }
}
