//! Recorded test runs. Results are produced by a [`TestExecutor`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{CompanyId, Label, TestRunId, Title, UserId, percentage, string_enum};

string_enum!(TestType {
    Integration => "integration",
    Security => "security",
    Performance => "performance",
    Accessibility => "accessibility",
});

string_enum!(TestRunStatus {
    Passed => "passed",
    Failed => "failed",
});

/// Counts and type-specific details of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: i32,
    pub failed: i32,
    pub duration_ms: i32,
    pub details: serde_json::Value,
}

impl TestOutcome {
    pub fn status(&self) -> TestRunStatus {
        if self.failed == 0 {
            TestRunStatus::Passed
        } else {
            TestRunStatus::Failed
        }
    }
}

/// Produces an outcome for a test of the given type against `target`.
pub trait TestExecutor {
    fn execute(&self, test_type: TestType, target: &str) -> TestOutcome;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    pub id: TestRunId,
    pub company_id: CompanyId,
    pub test_type: TestType,
    pub name: String,
    pub target: String,
    pub status: TestRunStatus,
    pub passed: i32,
    pub failed: i32,
    pub duration_ms: i32,
    pub details: serde_json::Value,
    pub created_by: UserId,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTestRun {
    pub company_id: CompanyId,
    pub test_type: TestType,
    pub name: Title,
    pub target: Label,
    pub created_by: UserId,
    pub outcome: TestOutcome,
}

/// Per-type aggregate for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestTypeStats {
    pub test_type: String,
    pub runs: i64,
    pub passed_runs: i64,
    pub pass_rate: Option<f64>,
    pub avg_duration_ms: Option<f64>,
}

impl TestTypeStats {
    pub fn new(test_type: String, runs: i64, passed_runs: i64, avg_duration_ms: Option<f64>) -> Self {
        Self {
            test_type,
            runs,
            passed_runs,
            pass_rate: percentage(passed_runs as f64, runs as f64),
            avg_duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestingDashboard {
    pub by_type: Vec<TestTypeStats>,
    pub total_runs: i64,
    pub pass_rate: Option<f64>,
    pub avg_duration_ms: Option<f64>,
    pub recent: Vec<TestRun>,
}

impl TestingDashboard {
    pub fn new(by_type: Vec<TestTypeStats>, recent: Vec<TestRun>) -> Self {
        let total_runs: i64 = by_type.iter().map(|s| s.runs).sum();
        let passed: i64 = by_type.iter().map(|s| s.passed_runs).sum();
        let weighted: f64 = by_type
            .iter()
            .filter_map(|s| s.avg_duration_ms.map(|avg| avg * s.runs as f64))
            .sum();
        let avg_duration_ms = (total_runs > 0).then(|| weighted / total_runs as f64);

        Self {
            by_type,
            total_runs,
            pass_rate: percentage(passed as f64, total_runs as f64),
            avg_duration_ms,
            recent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_failure_fails_the_run() {
        let outcome = TestOutcome {
            passed: 10,
            failed: 1,
            duration_ms: 100,
            details: serde_json::json!({}),
        };
        assert_eq!(outcome.status(), TestRunStatus::Failed);
        assert_eq!(
            TestOutcome { failed: 0, ..outcome }.status(),
            TestRunStatus::Passed
        );
    }

    #[test]
    fn dashboard_weights_duration_by_runs() {
        let dashboard = TestingDashboard::new(
            vec![
                TestTypeStats::new("integration".into(), 3, 3, Some(100.0)),
                TestTypeStats::new("security".into(), 1, 0, Some(500.0)),
            ],
            vec![],
        );
        assert_eq!(dashboard.total_runs, 4);
        assert_eq!(dashboard.pass_rate, Some(75.0));
        assert_eq!(dashboard.avg_duration_ms, Some(200.0));
        assert_eq!(dashboard.by_type[1].pass_rate, Some(0.0));
    }

    #[test]
    fn empty_dashboard_has_no_rates() {
        let dashboard = TestingDashboard::new(vec![], vec![]);
        assert_eq!(dashboard.pass_rate, None);
        assert_eq!(dashboard.avg_duration_ms, None);
    }
}
