use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::domain::testing::{NewTestRun, TestRun, TestRunStatus, TestTypeStats};
use crate::domain::types::{CompanyId, TestRunId};
use crate::models::testing::{
    NewTestRun as DbNewTestRun, TestRun as DbTestRun, TestTypeStatsRow,
};
use crate::query::WhereClause;
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{DieselRepository, TestRunListQuery, TestingReader, TestingWriter};

fn convert_runs(rows: Vec<DbTestRun>) -> RepositoryResult<Vec<TestRun>> {
    rows.into_iter()
        .map(|row| TestRun::try_from(row).map_err(RepositoryError::from))
        .collect()
}

impl TestingReader for DieselRepository {
    fn list_test_runs(&self, query: TestRunListQuery) -> RepositoryResult<(usize, Vec<TestRun>)> {
        use crate::schema::test_runs;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = test_runs::table
                .filter(test_runs::company_id.eq(query.company_id.get()))
                .into_boxed::<Sqlite>();

            if let Some(test_type) = query.test_type {
                items = items.filter(test_runs::test_type.eq(test_type.as_str()));
            }
            if let Some(status) = query.status {
                items = items.filter(test_runs::status.eq(status.as_str()));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let rows = query_builder()
            .order((test_runs::created_at.desc(), test_runs::id.desc()))
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbTestRun>(&mut conn)?;

        Ok((total, convert_runs(rows)?))
    }

    fn get_test_run(
        &self,
        id: TestRunId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<TestRun>> {
        use crate::schema::test_runs;

        let mut conn = self.conn()?;
        let run = test_runs::table
            .filter(test_runs::id.eq(id.get()))
            .filter(test_runs::company_id.eq(company_id.get()))
            .first::<DbTestRun>(&mut conn)
            .optional()?;

        run.map(TestRun::try_from).transpose().map_err(Into::into)
    }

    fn test_type_stats(&self, company_id: CompanyId) -> RepositoryResult<Vec<TestTypeStats>> {
        let mut conn = self.conn()?;
        let passed = TestRunStatus::Passed.as_str();
        let rows = WhereClause::scoped("company_id", company_id)
            .query(
                &format!(
                    "SELECT test_type, COUNT(*) AS runs, \
                     SUM(CASE WHEN status = '{passed}' THEN 1 ELSE 0 END) AS passed_runs, \
                     AVG(duration_ms) AS avg_duration_ms FROM test_runs"
                ),
                " GROUP BY test_type ORDER BY test_type",
            )
            .load::<TestTypeStatsRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn recent_test_runs(
        &self,
        company_id: CompanyId,
        limit: i64,
    ) -> RepositoryResult<Vec<TestRun>> {
        use crate::schema::test_runs;

        let mut conn = self.conn()?;
        let rows = test_runs::table
            .filter(test_runs::company_id.eq(company_id.get()))
            .order((test_runs::created_at.desc(), test_runs::id.desc()))
            .limit(limit)
            .load::<DbTestRun>(&mut conn)?;

        convert_runs(rows)
    }
}

impl TestingWriter for DieselRepository {
    fn create_test_run(&self, run: &NewTestRun) -> RepositoryResult<TestRun> {
        use crate::schema::test_runs;

        let mut conn = self.conn()?;
        let insertable = DbNewTestRun {
            company_id: run.company_id.get(),
            test_type: run.test_type.as_str(),
            name: run.name.as_str(),
            target: run.target.as_str(),
            status: run.outcome.status().as_str(),
            passed: run.outcome.passed,
            failed: run.outcome.failed,
            duration_ms: run.outcome.duration_ms,
            details: serde_json::to_string(&run.outcome.details)?,
            created_by: run.created_by.get(),
        };
        let created = diesel::insert_into(test_runs::table)
            .values(&insertable)
            .get_result::<DbTestRun>(&mut conn)?;

        Ok(TestRun::try_from(created)?)
    }
}
