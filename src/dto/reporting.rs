use serde::Serialize;

use crate::domain::reporting::{Dashboard, Report, ReportSchedule, ReportingDashboard};
use crate::pagination::Paginated;

#[derive(Debug, Serialize)]
pub struct ReportingDashboardPageData {
    pub dashboard: ReportingDashboard,
    pub schedules: Vec<ReportSchedule>,
    pub dashboards: Vec<Dashboard>,
}

#[derive(Debug, Serialize)]
pub struct ReportListPageData {
    pub reports: Paginated<Report>,
    pub can_edit: bool,
}

/// Outcome of one dispatcher pass.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub failed: usize,
}
