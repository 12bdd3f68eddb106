use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::domain::api_marketplace::{
    Api, ApiKey, ApiKeyStatus, Application, NewApi, NewApiKey, NewApiUsage, NewApplication,
    UsageSummary,
};
use crate::domain::stats::LabelCount;
use crate::domain::types::{ApiId, ApiKeyId, ApplicationId, CompanyId, UserId};
use crate::models::api_marketplace::{
    Api as DbApi, ApiKey as DbApiKey, Application as DbApplication, NewApi as DbNewApi,
    NewApiKey as DbNewApiKey, NewApiUsage as DbNewApiUsage,
    NewApplication as DbNewApplication, UsageSummaryRow,
};
use crate::models::stats::LabelCountRow;
use crate::query::{DateRange, WhereClause};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{
    ApiListQuery, ApiMarketplaceReader, ApiMarketplaceWriter, DieselRepository,
};

impl ApiMarketplaceReader for DieselRepository {
    fn list_apis(&self, query: ApiListQuery) -> RepositoryResult<(usize, Vec<Api>)> {
        use crate::schema::apis;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = apis::table
                .filter(apis::company_id.eq(query.company_id.get()))
                .into_boxed::<Sqlite>();

            if let Some(status) = query.status {
                items = items.filter(apis::status.eq(status.as_str()));
            }
            if let Some(category) = &query.category {
                items = items.filter(apis::category.eq(category.clone()));
            }
            if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                let pattern = format!("%{term}%");
                items = items.filter(
                    apis::name
                        .like(pattern.clone())
                        .or(apis::description.like(pattern)),
                );
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let items = query_builder()
            .order((apis::name.asc(), apis::id.asc()))
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbApi>(&mut conn)?
            .into_iter()
            .map(Api::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((total, items))
    }

    fn get_api(&self, id: ApiId, company_id: CompanyId) -> RepositoryResult<Option<Api>> {
        use crate::schema::apis;

        let mut conn = self.conn()?;
        let api = apis::table
            .filter(apis::id.eq(id.get()))
            .filter(apis::company_id.eq(company_id.get()))
            .first::<DbApi>(&mut conn)
            .optional()?;

        api.map(Api::try_from).transpose().map_err(Into::into)
    }

    fn get_application(
        &self,
        id: ApplicationId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<Application>> {
        use crate::schema::applications;

        let mut conn = self.conn()?;
        let application = applications::table
            .filter(applications::id.eq(id.get()))
            .filter(applications::company_id.eq(company_id.get()))
            .first::<DbApplication>(&mut conn)
            .optional()?;

        application
            .map(Application::try_from)
            .transpose()
            .map_err(Into::into)
    }

    fn list_applications(
        &self,
        company_id: CompanyId,
        developer_id: Option<UserId>,
    ) -> RepositoryResult<Vec<Application>> {
        use crate::schema::applications;

        let mut conn = self.conn()?;
        let mut items = applications::table
            .filter(applications::company_id.eq(company_id.get()))
            .into_boxed::<Sqlite>();
        if let Some(developer_id) = developer_id {
            items = items.filter(applications::developer_id.eq(developer_id.get()));
        }

        items
            .order(applications::created_at.desc())
            .load::<DbApplication>(&mut conn)?
            .into_iter()
            .map(|a| Application::try_from(a).map_err(RepositoryError::from))
            .collect()
    }

    fn list_api_keys(
        &self,
        application_id: ApplicationId,
        company_id: CompanyId,
    ) -> RepositoryResult<Vec<ApiKey>> {
        use crate::schema::api_keys;

        let mut conn = self.conn()?;
        api_keys::table
            .filter(api_keys::application_id.eq(application_id.get()))
            .filter(api_keys::company_id.eq(company_id.get()))
            .order(api_keys::created_at.desc())
            .load::<DbApiKey>(&mut conn)?
            .into_iter()
            .map(|k| ApiKey::try_from(k).map_err(RepositoryError::from))
            .collect()
    }

    fn get_api_key(&self, id: ApiKeyId, company_id: CompanyId) -> RepositoryResult<Option<ApiKey>> {
        use crate::schema::api_keys;

        let mut conn = self.conn()?;
        let key = api_keys::table
            .filter(api_keys::id.eq(id.get()))
            .filter(api_keys::company_id.eq(company_id.get()))
            .first::<DbApiKey>(&mut conn)
            .optional()?;

        key.map(ApiKey::try_from).transpose().map_err(Into::into)
    }

    fn find_api_key_by_hash(&self, key_hash: &str) -> RepositoryResult<Option<ApiKey>> {
        use crate::schema::api_keys;

        let mut conn = self.conn()?;
        let key = api_keys::table
            .filter(api_keys::key_hash.eq(key_hash))
            .first::<DbApiKey>(&mut conn)
            .optional()?;

        key.map(ApiKey::try_from).transpose().map_err(Into::into)
    }

    fn api_counts_by_status(&self, company_id: CompanyId) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .query(
                "SELECT status AS label, COUNT(*) AS count FROM apis",
                " GROUP BY status ORDER BY count DESC, label",
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn api_counts_by_category(&self, company_id: CompanyId) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .query(
                "SELECT category AS label, COUNT(*) AS count FROM apis",
                " GROUP BY category ORDER BY count DESC, label",
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn usage_summary(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<UsageSummary> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .date_range("created_at", range)
            .query(
                "SELECT COUNT(*) AS total_calls, \
                 CAST(AVG(response_time_ms) AS REAL) AS avg_response_ms, \
                 CAST(SUM(CASE WHEN status_code >= 400 THEN 1 ELSE 0 END) AS REAL) \
                 / NULLIF(COUNT(*), 0) * 100 AS error_rate \
                 FROM api_usage",
                "",
            )
            .get_result::<UsageSummaryRow>(&mut conn)?;

        Ok(row.into())
    }

    fn top_apis_by_calls(
        &self,
        company_id: CompanyId,
        range: &DateRange,
        limit: i64,
    ) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("u.company_id", company_id)
            .date_range("u.created_at", range)
            .query(
                "SELECT a.name AS label, COUNT(*) AS count \
                 FROM api_usage u JOIN apis a ON a.id = u.api_id",
                &format!(" GROUP BY a.id, a.name ORDER BY count DESC, label LIMIT {limit}"),
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

impl ApiMarketplaceWriter for DieselRepository {
    fn create_api(&self, api: &NewApi) -> RepositoryResult<Api> {
        use crate::schema::apis;

        let mut conn = self.conn()?;
        let insertable: DbNewApi = api.into();
        let created = diesel::insert_into(apis::table)
            .values(&insertable)
            .get_result::<DbApi>(&mut conn)?;

        Ok(Api::try_from(created)?)
    }

    fn create_application(&self, application: &NewApplication) -> RepositoryResult<Application> {
        use crate::schema::applications;

        let mut conn = self.conn()?;
        let insertable: DbNewApplication = application.into();
        let created = diesel::insert_into(applications::table)
            .values(&insertable)
            .get_result::<DbApplication>(&mut conn)?;

        Ok(Application::try_from(created)?)
    }

    fn create_api_key(&self, key: &NewApiKey) -> RepositoryResult<ApiKey> {
        use crate::schema::api_keys;

        let mut conn = self.conn()?;
        let insertable: DbNewApiKey = key.into();
        let created = diesel::insert_into(api_keys::table)
            .values(&insertable)
            .get_result::<DbApiKey>(&mut conn)?;

        Ok(ApiKey::try_from(created)?)
    }

    fn revoke_api_key(
        &self,
        id: ApiKeyId,
        company_id: CompanyId,
        revoked_at: NaiveDateTime,
    ) -> RepositoryResult<ApiKey> {
        use crate::schema::api_keys;

        let mut conn = self.conn()?;
        let updated = diesel::update(
            api_keys::table
                .filter(api_keys::id.eq(id.get()))
                .filter(api_keys::company_id.eq(company_id.get()))
                .filter(api_keys::status.eq(ApiKeyStatus::Active.as_str())),
        )
        .set((
            api_keys::status.eq(ApiKeyStatus::Revoked.as_str()),
            api_keys::revoked_at.eq(Some(revoked_at)),
        ))
        .get_result::<DbApiKey>(&mut conn)
        .optional()?
        .ok_or_else(|| RepositoryError::Conflict("API key is already revoked".into()))?;

        Ok(ApiKey::try_from(updated)?)
    }

    fn record_api_usage(&self, usage: &NewApiUsage) -> RepositoryResult<()> {
        use crate::schema::api_usage;

        let mut conn = self.conn()?;
        let insertable: DbNewApiUsage = usage.into();
        diesel::insert_into(api_usage::table)
            .values(&insertable)
            .execute(&mut conn)?;

        Ok(())
    }
}
