//! Test runs and the simulated executor that fabricates their results.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use crate::domain::testing::{TestExecutor, TestOutcome, TestRun, TestType, TestingDashboard};
use crate::domain::types::TestRunId;
use crate::dto::testing::{TestRunListPageData, TestingDashboardPageData};
use crate::forms::testing::{RunTestForm, RunTestPayload, TestRunFilter, TestRunFilterQuery};
use crate::models::auth::AuthenticatedUser;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated, Pagination};
use crate::repository::{TestRunListQuery, TestingReader, TestingWriter};
use crate::routes::{check_role, ensure_role};
use crate::services::ServiceResult;
use crate::{TESTING_MANAGE, TESTING_VIEW};

const RECENT_RUNS: i64 = 10;

/// Fabricates plausible results without touching the target.
/// Every outcome carries `"simulated": true` in its details.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedExecutor {
    seed: Option<u64>,
}

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reproducible results for a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl TestExecutor for SimulatedExecutor {
    fn execute(&self, test_type: TestType, target: &str) -> TestOutcome {
        match self.seed {
            Some(seed) => simulate(&mut StdRng::seed_from_u64(seed), test_type, target),
            None => simulate(&mut rand::rng(), test_type, target),
        }
    }
}

fn simulate<R: Rng + ?Sized>(rng: &mut R, test_type: TestType, target: &str) -> TestOutcome {
    match test_type {
        TestType::Integration => {
            let total: i32 = rng.random_range(20..=60);
            let failed: i32 = if rng.random_bool(0.7) {
                0
            } else {
                rng.random_range(1..=3)
            };
            TestOutcome {
                passed: total - failed,
                failed,
                duration_ms: rng.random_range(2_000..=30_000),
                details: json!({
                    "simulated": true,
                    "target": target,
                    "total": total,
                }),
            }
        }
        TestType::Security => {
            let critical: i32 = rng.random_range(0..=1);
            let high: i32 = rng.random_range(0..=2);
            let medium: i32 = rng.random_range(0..=4);
            let low: i32 = rng.random_range(0..=6);
            let checks: i32 = 40;
            let failed = critical + high;
            TestOutcome {
                passed: checks - failed,
                failed,
                duration_ms: rng.random_range(5_000..=60_000),
                details: json!({
                    "simulated": true,
                    "target": target,
                    "findings": {
                        "critical": critical,
                        "high": high,
                        "medium": medium,
                        "low": low,
                    },
                }),
            }
        }
        TestType::Performance => {
            let p50: f64 = rng.random_range(20.0..120.0);
            let p95 = p50 * rng.random_range(1.5..3.0);
            let p99 = p95 * rng.random_range(1.1..1.5);
            let throughput: f64 = rng.random_range(50.0..500.0);
            let error_rate: f64 = rng.random_range(0.0..2.0);
            let checks = [p95 <= 300.0, error_rate < 1.0, throughput >= 100.0];
            let passed = checks.iter().filter(|ok| **ok).count() as i32;
            TestOutcome {
                passed,
                failed: checks.len() as i32 - passed,
                duration_ms: rng.random_range(30_000..=120_000),
                details: json!({
                    "simulated": true,
                    "target": target,
                    "latency_ms": { "p50": p50.round(), "p95": p95.round(), "p99": p99.round() },
                    "throughput_rps": throughput.round(),
                    "error_rate_pct": (error_rate * 100.0).round() / 100.0,
                }),
            }
        }
        TestType::Accessibility => {
            let level_a: i32 = rng.random_range(0..=2);
            let level_aa: i32 = rng.random_range(0..=4);
            let level_aaa: i32 = rng.random_range(0..=6);
            let rules: i32 = 50;
            let failed = level_a + level_aa;
            TestOutcome {
                passed: rules - failed,
                failed,
                duration_ms: rng.random_range(1_000..=15_000),
                details: json!({
                    "simulated": true,
                    "target": target,
                    "violations": { "A": level_a, "AA": level_aa, "AAA": level_aaa },
                }),
            }
        }
    }
}

pub fn load_dashboard<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<TestingDashboardPageData>
where
    R: TestingReader + ?Sized,
{
    ensure_role(user, TESTING_VIEW)?;

    let company_id = user.company_id()?;
    let by_type = repo.test_type_stats(company_id).map_err(|err| {
        log::error!("Failed to aggregate test runs: {err}");
        err
    })?;
    let recent = repo.recent_test_runs(company_id, RECENT_RUNS)?;

    Ok(TestingDashboardPageData {
        dashboard: TestingDashboard::new(by_type, recent),
        can_run: check_role(TESTING_MANAGE, &user.roles),
    })
}

pub fn list_test_runs<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: TestRunFilterQuery,
) -> ServiceResult<TestRunListPageData>
where
    R: TestingReader + ?Sized,
{
    ensure_role(user, TESTING_VIEW)?;

    let filter = TestRunFilter::try_from(query)?;
    let mut list_query =
        TestRunListQuery::new(user.company_id()?).paginate(filter.page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(test_type) = filter.test_type {
        list_query = list_query.test_type(test_type);
    }
    if let Some(status) = filter.status {
        list_query = list_query.status(status);
    }

    let (total, runs) = repo.list_test_runs(list_query).map_err(|err| {
        log::error!("Failed to list test runs: {err}");
        err
    })?;

    Ok(TestRunListPageData {
        runs: Paginated::new(runs, Pagination::new(filter.page, DEFAULT_ITEMS_PER_PAGE), total),
        can_run: check_role(TESTING_MANAGE, &user.roles),
    })
}

pub fn get_test_run<R>(
    repo: &R,
    user: &AuthenticatedUser,
    run_id: i32,
) -> ServiceResult<Option<TestRun>>
where
    R: TestingReader + ?Sized,
{
    ensure_role(user, TESTING_VIEW)?;

    Ok(repo.get_test_run(TestRunId::new(run_id)?, user.company_id()?)?)
}

pub fn run_test<R, E>(
    repo: &R,
    executor: &E,
    user: &AuthenticatedUser,
    form: RunTestForm,
) -> ServiceResult<TestRun>
where
    R: TestingWriter + ?Sized,
    E: TestExecutor + ?Sized,
{
    ensure_role(user, TESTING_MANAGE)?;

    let payload = RunTestPayload::try_from(form)?;
    let outcome = executor.execute(payload.test_type, payload.target.as_str());
    let run = repo
        .create_test_run(&payload.into_domain(user.company_id()?, user.user_id()?, outcome))
        .map_err(|err| {
            log::error!("Failed to record test run: {err}");
            err
        })?;

    log::info!(
        "Recorded {} test run {}: {} ({} passed, {} failed)",
        run.test_type,
        run.id,
        run.status,
        run.passed,
        run.failed
    );
    Ok(run)
}

#[cfg(test)]
mod executor_tests {
    use super::*;
    use crate::domain::testing::TestRunStatus;

    #[test]
    fn every_outcome_is_marked_simulated() {
        let executor = SimulatedExecutor::new();
        for test_type in TestType::ALL {
            let outcome = executor.execute(*test_type, "https://erp.example.com");
            assert_eq!(outcome.details["simulated"], true);
            assert!(outcome.passed >= 0 && outcome.failed >= 0);
            assert!(outcome.duration_ms > 0);
        }
    }

    #[test]
    fn seeded_executor_is_reproducible() {
        let a = SimulatedExecutor::seeded(7).execute(TestType::Performance, "api");
        let b = SimulatedExecutor::seeded(7).execute(TestType::Performance, "api");
        assert_eq!(a, b);
    }

    #[test]
    fn security_failures_are_critical_and_high_findings() {
        let outcome = SimulatedExecutor::seeded(11).execute(TestType::Security, "api");
        let findings = &outcome.details["findings"];
        let blocking = findings["critical"].as_i64().unwrap() + findings["high"].as_i64().unwrap();
        assert_eq!(outcome.failed as i64, blocking);
        assert_eq!(outcome.status() == TestRunStatus::Passed, blocking == 0);
    }
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::testing::TestRunStatus;
    use crate::domain::types::{CompanyId, UserId};
    use crate::repository::mock::MockRepository;
    use crate::services::ServiceError;
    use chrono::NaiveDate;

    struct FixedExecutor(TestOutcome);

    impl TestExecutor for FixedExecutor {
        fn execute(&self, _: TestType, _: &str) -> TestOutcome {
            self.0.clone()
        }
    }

    fn tester() -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "9".into(),
            email: "qa@example.com".into(),
            name: "QA".into(),
            company_id: 4,
            roles: vec![TESTING_VIEW.to_string(), TESTING_MANAGE.to_string()],
            exp: 0,
        }
    }

    fn form() -> RunTestForm {
        RunTestForm {
            test_type: "integration".into(),
            name: "Checkout flow".into(),
            target: "orders-service".into(),
        }
    }

    #[test]
    fn run_is_persisted_with_executor_outcome() {
        let executor = FixedExecutor(TestOutcome {
            passed: 30,
            failed: 2,
            duration_ms: 1500,
            details: json!({ "simulated": true }),
        });
        let mut repo = MockRepository::new();
        repo.expect_create_test_run()
            .withf(|run| {
                run.outcome.failed == 2
                    && run.test_type == TestType::Integration
                    && run.created_by.get() == 9
            })
            .times(1)
            .returning(|run| {
                Ok(TestRun {
                    id: TestRunId::new(1).unwrap(),
                    company_id: CompanyId::new(4).unwrap(),
                    test_type: run.test_type,
                    name: run.name.to_string(),
                    target: run.target.to_string(),
                    status: run.outcome.status(),
                    passed: run.outcome.passed,
                    failed: run.outcome.failed,
                    duration_ms: run.outcome.duration_ms,
                    details: run.outcome.details.clone(),
                    created_by: UserId::new(9).unwrap(),
                    created_at: NaiveDate::from_ymd_opt(2025, 6, 1)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap(),
                })
            });

        let run = run_test(&repo, &executor, &tester(), form()).unwrap();

        assert_eq!(run.status, TestRunStatus::Failed);
    }

    #[test]
    fn viewer_cannot_run_tests() {
        let repo = MockRepository::new();
        let mut user = tester();
        user.roles = vec![TESTING_VIEW.to_string()];

        let result = run_test(&repo, &SimulatedExecutor::new(), &user, form());

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn missing_run_is_none() {
        let mut repo = MockRepository::new();
        repo.expect_get_test_run().returning(|_, _| Ok(None));

        assert!(get_test_run(&repo, &tester(), 5).unwrap().is_none());
    }
}
