use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::domain::documentation::{NewTutorial, Tutorial, TutorialStats, UpdateTutorial};
use crate::domain::stats::LabelCount;
use crate::domain::types::{CompanyId, TutorialId, UserId};
use crate::models::documentation::{
    NewTutorial as DbNewTutorial, NewTutorialProgress, Tutorial as DbTutorial,
    TutorialStatsRow, UpdateTutorial as DbUpdateTutorial,
};
use crate::models::stats::LabelCountRow;
use crate::query::WhereClause;
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{
    DieselRepository, DocumentationReader, DocumentationWriter, TutorialListQuery,
};

fn into_tutorials(rows: Vec<DbTutorial>) -> RepositoryResult<Vec<Tutorial>> {
    rows.into_iter()
        .map(|t| Tutorial::try_from(t).map_err(RepositoryError::from))
        .collect()
}

impl DocumentationReader for DieselRepository {
    fn list_tutorials(&self, query: TutorialListQuery) -> RepositoryResult<(usize, Vec<Tutorial>)> {
        use crate::schema::tutorials;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = tutorials::table
                .filter(tutorials::company_id.eq(query.company_id.get()))
                .into_boxed::<Sqlite>();

            if query.published_only {
                items = items.filter(tutorials::published.eq(true));
            }
            if let Some(category) = &query.category {
                items = items.filter(tutorials::category.eq(category.clone()));
            }
            if let Some(difficulty) = query.difficulty {
                items = items.filter(tutorials::difficulty.eq(difficulty.as_str()));
            }
            if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                let pattern = format!("%{term}%");
                items = items.filter(
                    tutorials::title
                        .like(pattern.clone())
                        .or(tutorials::content.like(pattern)),
                );
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let rows = query_builder()
            .order(tutorials::updated_at.desc())
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbTutorial>(&mut conn)?;

        Ok((total, into_tutorials(rows)?))
    }

    fn get_tutorial(
        &self,
        id: TutorialId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<Tutorial>> {
        use crate::schema::tutorials;

        let mut conn = self.conn()?;
        let tutorial = tutorials::table
            .filter(tutorials::id.eq(id.get()))
            .filter(tutorials::company_id.eq(company_id.get()))
            .first::<DbTutorial>(&mut conn)
            .optional()?;

        tutorial.map(Tutorial::try_from).transpose().map_err(Into::into)
    }

    fn tutorial_completion(
        &self,
        id: TutorialId,
        user_id: UserId,
    ) -> RepositoryResult<Option<NaiveDateTime>> {
        use crate::schema::tutorial_progress;

        let mut conn = self.conn()?;
        let completed_at = tutorial_progress::table
            .filter(tutorial_progress::tutorial_id.eq(id.get()))
            .filter(tutorial_progress::user_id.eq(user_id.get()))
            .select(tutorial_progress::completed_at)
            .first::<NaiveDateTime>(&mut conn)
            .optional()?;

        Ok(completed_at)
    }

    fn tutorial_counts_by_category(
        &self,
        company_id: CompanyId,
    ) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .query(
                "SELECT category AS label, COUNT(*) AS count FROM tutorials",
                " GROUP BY category ORDER BY count DESC, label",
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn tutorial_stats(&self, company_id: CompanyId) -> RepositoryResult<TutorialStats> {
        use crate::schema::tutorial_progress;

        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .query(
                "SELECT \
                 COALESCE(SUM(CASE WHEN published THEN 1 ELSE 0 END), 0) AS published, \
                 COALESCE(SUM(CASE WHEN published THEN 0 ELSE 1 END), 0) AS drafts, \
                 COALESCE(SUM(view_count), 0) AS total_views \
                 FROM tutorials",
                "",
            )
            .get_result::<TutorialStatsRow>(&mut conn)?;

        let completions = tutorial_progress::table
            .filter(tutorial_progress::company_id.eq(company_id.get()))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(TutorialStats {
            published: row.published,
            drafts: row.drafts,
            total_views: row.total_views,
            completions,
        })
    }

    fn most_viewed_tutorials(
        &self,
        company_id: CompanyId,
        limit: i64,
    ) -> RepositoryResult<Vec<Tutorial>> {
        use crate::schema::tutorials;

        let mut conn = self.conn()?;
        let rows = tutorials::table
            .filter(tutorials::company_id.eq(company_id.get()))
            .order((tutorials::view_count.desc(), tutorials::id.asc()))
            .limit(limit)
            .load::<DbTutorial>(&mut conn)?;

        into_tutorials(rows)
    }
}

impl DocumentationWriter for DieselRepository {
    fn create_tutorial(&self, tutorial: &NewTutorial) -> RepositoryResult<Tutorial> {
        use crate::schema::tutorials;

        let mut conn = self.conn()?;
        let insertable: DbNewTutorial = tutorial.into();
        let created = diesel::insert_into(tutorials::table)
            .values(&insertable)
            .get_result::<DbTutorial>(&mut conn)?;

        Ok(Tutorial::try_from(created)?)
    }

    fn update_tutorial(
        &self,
        id: TutorialId,
        company_id: CompanyId,
        update: &UpdateTutorial,
    ) -> RepositoryResult<Tutorial> {
        use crate::schema::tutorials;

        let mut conn = self.conn()?;
        let changeset: DbUpdateTutorial = update.into();
        let updated = diesel::update(
            tutorials::table
                .filter(tutorials::id.eq(id.get()))
                .filter(tutorials::company_id.eq(company_id.get())),
        )
        .set(&changeset)
        .get_result::<DbTutorial>(&mut conn)?;

        Ok(Tutorial::try_from(updated)?)
    }

    fn increment_tutorial_views(
        &self,
        id: TutorialId,
        company_id: CompanyId,
    ) -> RepositoryResult<()> {
        use crate::schema::tutorials;

        let mut conn = self.conn()?;
        diesel::update(
            tutorials::table
                .filter(tutorials::id.eq(id.get()))
                .filter(tutorials::company_id.eq(company_id.get())),
        )
        .set(tutorials::view_count.eq(tutorials::view_count + 1))
        .execute(&mut conn)?;

        Ok(())
    }

    fn complete_tutorial(
        &self,
        id: TutorialId,
        user_id: UserId,
        company_id: CompanyId,
        completed_at: NaiveDateTime,
    ) -> RepositoryResult<NaiveDateTime> {
        use crate::schema::tutorial_progress;

        let mut conn = self.conn()?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::insert_into(tutorial_progress::table)
                .values(&NewTutorialProgress {
                    tutorial_id: id.get(),
                    user_id: user_id.get(),
                    company_id: company_id.get(),
                    completed_at,
                })
                .on_conflict_do_nothing()
                .execute(conn)?;

            tutorial_progress::table
                .filter(tutorial_progress::tutorial_id.eq(id.get()))
                .filter(tutorial_progress::user_id.eq(user_id.get()))
                .select(tutorial_progress::completed_at)
                .first::<NaiveDateTime>(conn)
        })
        .map_err(Into::into)
    }
}
