use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Nullable, Text};

use crate::domain::testing::{TestRun as DomainTestRun, TestTypeStats};
use crate::domain::types::{CompanyId, TestRunId, TypeConstraintError, UserId};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::test_runs)]
pub struct TestRun {
    pub id: i32,
    pub company_id: i32,
    pub test_type: String,
    pub name: String,
    pub target: String,
    pub status: String,
    pub passed: i32,
    pub failed: i32,
    pub duration_ms: i32,
    pub details: String,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::test_runs)]
pub struct NewTestRun<'a> {
    pub company_id: i32,
    pub test_type: &'a str,
    pub name: &'a str,
    pub target: &'a str,
    pub status: &'a str,
    pub passed: i32,
    pub failed: i32,
    pub duration_ms: i32,
    pub details: String,
    pub created_by: i32,
}

#[derive(Debug, QueryableByName)]
pub struct TestTypeStatsRow {
    #[diesel(sql_type = Text)]
    pub test_type: String,
    #[diesel(sql_type = BigInt)]
    pub runs: i64,
    #[diesel(sql_type = BigInt)]
    pub passed_runs: i64,
    #[diesel(sql_type = Nullable<Double>)]
    pub avg_duration_ms: Option<f64>,
}

impl TryFrom<TestRun> for DomainTestRun {
    type Error = TypeConstraintError;

    fn try_from(run: TestRun) -> Result<Self, Self::Error> {
        let details = serde_json::from_str(&run.details)
            .map_err(|err| TypeConstraintError::InvalidValue(format!("test run details: {err}")))?;
        Ok(Self {
            id: TestRunId::new(run.id)?,
            company_id: CompanyId::new(run.company_id)?,
            test_type: run.test_type.parse()?,
            name: run.name,
            target: run.target,
            status: run.status.parse()?,
            passed: run.passed,
            failed: run.failed,
            duration_ms: run.duration_ms,
            details,
            created_by: UserId::new(run.created_by)?,
            created_at: run.created_at,
        })
    }
}

impl From<TestTypeStatsRow> for TestTypeStats {
    fn from(row: TestTypeStatsRow) -> Self {
        TestTypeStats::new(row.test_type, row.runs, row.passed_runs, row.avg_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::{TestRunStatus, TestType};
    use chrono::NaiveDate;

    fn row(details: &str) -> TestRun {
        TestRun {
            id: 1,
            company_id: 1,
            test_type: "security".into(),
            name: "Nightly scan".into(),
            target: "https://erp.example.com".into(),
            status: "failed".into(),
            passed: 20,
            failed: 2,
            duration_ms: 4200,
            details: details.into(),
            created_by: 5,
            created_at: NaiveDate::from_ymd_opt(2025, 5, 1)
                .unwrap()
                .and_hms_opt(3, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn details_are_parsed() {
        let run = DomainTestRun::try_from(row(r#"{"simulated": true}"#)).unwrap();
        assert_eq!(run.test_type, TestType::Security);
        assert_eq!(run.status, TestRunStatus::Failed);
        assert_eq!(run.details["simulated"], true);
    }

    #[test]
    fn corrupt_details_are_rejected() {
        assert!(DomainTestRun::try_from(row("nope")).is_err());
    }

    #[test]
    fn stats_row_computes_pass_rate() {
        let stats = TestTypeStats::from(TestTypeStatsRow {
            test_type: "integration".into(),
            runs: 4,
            passed_runs: 1,
            avg_duration_ms: Some(1000.0),
        });
        assert_eq!(stats.pass_rate, Some(25.0));
    }
}
