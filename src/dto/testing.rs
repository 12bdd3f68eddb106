use serde::Serialize;

use crate::domain::testing::{TestRun, TestingDashboard};
use crate::pagination::Paginated;

#[derive(Debug, Serialize)]
pub struct TestingDashboardPageData {
    pub dashboard: TestingDashboard,
    pub can_run: bool,
}

#[derive(Debug, Serialize)]
pub struct TestRunListPageData {
    pub runs: Paginated<TestRun>,
    pub can_run: bool,
}
