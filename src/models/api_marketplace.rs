//! Diesel models for the API marketplace tables.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Nullable};

use crate::domain::api_marketplace::{
    Api as DomainApi, ApiKey as DomainApiKey, Application as DomainApplication,
    NewApi as DomainNewApi, NewApiKey as DomainNewApiKey, NewApiUsage as DomainNewApiUsage,
    NewApplication as DomainNewApplication, UsageSummary,
};
use crate::domain::types::{
    ApiId, ApiKeyId, ApplicationId, CompanyId, TypeConstraintError, UserId,
};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::apis)]
pub struct Api {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub category: String,
    pub version: String,
    pub status: String,
    pub price: f64,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::apis)]
pub struct NewApi<'a> {
    pub company_id: i32,
    pub name: &'a str,
    pub category: &'a str,
    pub version: &'a str,
    pub status: &'a str,
    pub price: f64,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::applications)]
pub struct Application {
    pub id: i32,
    pub company_id: i32,
    pub developer_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::applications)]
pub struct NewApplication<'a> {
    pub company_id: i32,
    pub developer_id: i32,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub status: &'a str,
}

#[derive(Debug, Clone, Identifiable, Queryable, Associations)]
#[diesel(belongs_to(Application, foreign_key = application_id))]
#[diesel(table_name = crate::schema::api_keys)]
pub struct ApiKey {
    pub id: i32,
    pub company_id: i32,
    pub application_id: i32,
    pub key_prefix: String,
    pub key_hash: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::api_keys)]
pub struct NewApiKey<'a> {
    pub company_id: i32,
    pub application_id: i32,
    pub key_prefix: &'a str,
    pub key_hash: &'a str,
    pub status: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::api_usage)]
pub struct NewApiUsage {
    pub company_id: i32,
    pub api_id: i32,
    pub application_id: i32,
    pub status_code: i32,
    pub response_time_ms: i32,
}

#[derive(Debug, QueryableByName)]
pub struct UsageSummaryRow {
    #[diesel(sql_type = BigInt)]
    pub total_calls: i64,
    #[diesel(sql_type = Nullable<Double>)]
    pub avg_response_ms: Option<f64>,
    #[diesel(sql_type = Nullable<Double>)]
    pub error_rate: Option<f64>,
}

impl TryFrom<Api> for DomainApi {
    type Error = TypeConstraintError;

    fn try_from(api: Api) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ApiId::new(api.id)?,
            company_id: CompanyId::new(api.company_id)?,
            name: api.name,
            category: api.category,
            version: api.version,
            status: api.status.parse()?,
            price: api.price,
            description: api.description,
            created_at: api.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewApi> for NewApi<'a> {
    fn from(api: &'a DomainNewApi) -> Self {
        Self {
            company_id: api.company_id.get(),
            name: api.name.as_str(),
            category: api.category.as_str(),
            version: api.version.as_str(),
            status: "active",
            price: api.price,
            description: api.description.as_ref().map(|d| d.as_str()),
        }
    }
}

impl TryFrom<Application> for DomainApplication {
    type Error = TypeConstraintError;

    fn try_from(app: Application) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ApplicationId::new(app.id)?,
            company_id: CompanyId::new(app.company_id)?,
            developer_id: UserId::new(app.developer_id)?,
            name: app.name,
            description: app.description,
            status: app.status.parse()?,
            created_at: app.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewApplication> for NewApplication<'a> {
    fn from(app: &'a DomainNewApplication) -> Self {
        Self {
            company_id: app.company_id.get(),
            developer_id: app.developer_id.get(),
            name: app.name.as_str(),
            description: app.description.as_ref().map(|d| d.as_str()),
            status: "active",
        }
    }
}

impl TryFrom<ApiKey> for DomainApiKey {
    type Error = TypeConstraintError;

    fn try_from(key: ApiKey) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ApiKeyId::new(key.id)?,
            company_id: CompanyId::new(key.company_id)?,
            application_id: ApplicationId::new(key.application_id)?,
            key_prefix: key.key_prefix,
            status: key.status.parse()?,
            created_at: key.created_at,
            revoked_at: key.revoked_at,
        })
    }
}

impl<'a> From<&'a DomainNewApiKey> for NewApiKey<'a> {
    fn from(key: &'a DomainNewApiKey) -> Self {
        Self {
            company_id: key.company_id.get(),
            application_id: key.application_id.get(),
            key_prefix: key.key_prefix.as_str(),
            key_hash: key.key_hash.as_str(),
            status: "active",
        }
    }
}

impl From<&DomainNewApiUsage> for NewApiUsage {
    fn from(usage: &DomainNewApiUsage) -> Self {
        Self {
            company_id: usage.company_id.get(),
            api_id: usage.api_id.get(),
            application_id: usage.application_id.get(),
            status_code: usage.status_code,
            response_time_ms: usage.response_time_ms,
        }
    }
}

impl From<UsageSummaryRow> for UsageSummary {
    fn from(row: UsageSummaryRow) -> Self {
        Self {
            total_calls: row.total_calls,
            avg_response_ms: row.avg_response_ms,
            error_rate: row.error_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_marketplace::ApiStatus;
    use crate::domain::types::{Label, Title, VersionTag};
    use chrono::Utc;

    #[test]
    fn api_row_converts_to_domain() {
        let now = Utc::now().naive_utc();
        let row = Api {
            id: 1,
            company_id: 2,
            name: "Orders".into(),
            category: "sales".into(),
            version: "v1".into(),
            status: "deprecated".into(),
            price: 9.5,
            description: None,
            created_at: now,
        };
        let api = DomainApi::try_from(row).expect("valid api row");
        assert_eq!(api.status, ApiStatus::Deprecated);
        assert_eq!(api.company_id.get(), 2);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let row = Application {
            id: 1,
            company_id: 1,
            developer_id: 1,
            name: "App".into(),
            description: None,
            status: "exploded".into(),
            created_at: Utc::now().naive_utc(),
        };
        assert!(DomainApplication::try_from(row).is_err());
    }

    #[test]
    fn new_api_defaults_to_active() {
        let domain = DomainNewApi {
            company_id: CompanyId::new(3).unwrap(),
            name: Title::new("Inventory").unwrap(),
            category: Label::new("logistics").unwrap(),
            version: VersionTag::new("2.0").unwrap(),
            price: 0.0,
            description: None,
        };
        let insertable: NewApi = (&domain).into();
        assert_eq!(insertable.status, "active");
        assert_eq!(insertable.company_id, 3);
        assert_eq!(insertable.description, None);
    }
}
