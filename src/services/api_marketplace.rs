//! Services behind the API marketplace: catalogue, developer applications,
//! key issuance and usage metering.

use chrono::Utc;

use crate::crypto::{self, api_key_prefix, hash_api_key};
use crate::domain::api_marketplace::{
    Api, ApiKey, ApiKeyStatus, ApiMarketplaceDashboard, Application, ApplicationStatus,
    IssuedApiKey, NewApiKey, NewApiUsage,
};
use crate::domain::types::{ApiKeyId, ApplicationId};
use crate::dto::api_marketplace::{
    ApiCatalogPageData, ApiDashboardPageData, ApplicationWithKeys, ApplicationsPageData,
};
use crate::forms::DateFilterQuery;
use crate::forms::api_marketplace::{
    ApiFilter, ApiFilterQuery, PublishApiForm, PublishApiPayload, RecordUsagePayload,
    RecordUsageRequest, RegisterApplicationForm, RegisterApplicationPayload,
};
use crate::models::auth::AuthenticatedUser;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated, Pagination};
use crate::query::DateRange;
use crate::repository::{ApiListQuery, ApiMarketplaceReader, ApiMarketplaceWriter};
use crate::routes::{check_role, ensure_role};
use crate::services::{ServiceError, ServiceResult};
use crate::{API_MARKETPLACE_MANAGE, API_MARKETPLACE_VIEW};

const TOP_APIS: i64 = 5;

pub fn load_dashboard<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: &DateFilterQuery,
) -> ServiceResult<ApiDashboardPageData>
where
    R: ApiMarketplaceReader + ?Sized,
{
    ensure_role(user, API_MARKETPLACE_VIEW)?;

    let company_id = user.company_id()?;
    let range = DateRange::try_from(query)?;

    let dashboard = ApiMarketplaceDashboard {
        apis_by_status: repo.api_counts_by_status(company_id)?,
        apis_by_category: repo.api_counts_by_category(company_id)?,
        usage: repo.usage_summary(company_id, &range).map_err(|err| {
            log::error!("Failed to summarize API usage: {err}");
            err
        })?,
        top_apis: repo.top_apis_by_calls(company_id, &range, TOP_APIS)?,
    };

    Ok(ApiDashboardPageData { dashboard, range })
}

pub fn list_apis<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: ApiFilterQuery,
) -> ServiceResult<ApiCatalogPageData>
where
    R: ApiMarketplaceReader + ?Sized,
{
    ensure_role(user, API_MARKETPLACE_VIEW)?;

    let company_id = user.company_id()?;
    let filter = ApiFilter::try_from(query)?;

    let mut list_query =
        ApiListQuery::new(company_id).paginate(filter.page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(status) = filter.status {
        list_query = list_query.status(status);
    }
    if let Some(category) = filter.category {
        list_query = list_query.category(category);
    }
    if let Some(search) = filter.search {
        list_query = list_query.search(search);
    }

    let (total, apis) = repo.list_apis(list_query).map_err(|err| {
        log::error!("Failed to list APIs: {err}");
        err
    })?;

    let categories = repo
        .api_counts_by_category(company_id)?
        .into_iter()
        .map(|c| c.label)
        .collect();

    Ok(ApiCatalogPageData {
        apis: Paginated::new(
            apis,
            Pagination::new(filter.page, DEFAULT_ITEMS_PER_PAGE),
            total,
        ),
        categories,
    })
}

pub fn publish_api<R>(repo: &R, user: &AuthenticatedUser, form: PublishApiForm) -> ServiceResult<Api>
where
    R: ApiMarketplaceWriter + ?Sized,
{
    ensure_role(user, API_MARKETPLACE_MANAGE)?;

    let payload = PublishApiPayload::try_from(form)?;
    let company_id = user.company_id()?;

    let api = repo
        .create_api(&payload.into_domain(company_id))
        .map_err(|err| {
            log::error!("Failed to publish API: {err}");
            err
        })?;

    log::info!("Published API {} ({}) for company {company_id}", api.name, api.id);

    Ok(api)
}

pub fn register_application<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: RegisterApplicationForm,
) -> ServiceResult<Application>
where
    R: ApiMarketplaceWriter + ?Sized,
{
    ensure_role(user, API_MARKETPLACE_VIEW)?;

    let payload = RegisterApplicationPayload::try_from(form)?;
    let company_id = user.company_id()?;
    let developer_id = user.user_id()?;

    let application = repo
        .create_application(&payload.into_domain(company_id, developer_id))
        .map_err(|err| {
            log::error!("Failed to register application: {err}");
            err
        })?;

    Ok(application)
}

/// Developers see their own applications, managers see the whole company's.
pub fn list_applications<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<ApplicationsPageData>
where
    R: ApiMarketplaceReader + ?Sized,
{
    ensure_role(user, API_MARKETPLACE_VIEW)?;

    let company_id = user.company_id()?;
    let developer_id = if check_role(API_MARKETPLACE_MANAGE, &user.roles) {
        None
    } else {
        Some(user.user_id()?)
    };

    let applications = repo
        .list_applications(company_id, developer_id)?
        .into_iter()
        .map(|application| -> ServiceResult<ApplicationWithKeys> {
            let keys = repo.list_api_keys(application.id, company_id)?;
            Ok(ApplicationWithKeys { application, keys })
        })
        .collect::<ServiceResult<Vec<_>>>()?;

    Ok(ApplicationsPageData { applications })
}

/// Loads an application the user may administer.
fn owned_application<R>(
    repo: &R,
    user: &AuthenticatedUser,
    application_id: ApplicationId,
) -> ServiceResult<Application>
where
    R: ApiMarketplaceReader + ?Sized,
{
    let application = repo
        .get_application(application_id, user.company_id()?)?
        .ok_or(ServiceError::NotFound)?;

    if !check_role(API_MARKETPLACE_MANAGE, &user.roles)
        && application.developer_id != user.user_id()?
    {
        return Err(ServiceError::NotFound);
    }

    Ok(application)
}

/// Issues a new key. The plaintext is returned once and only its hash is kept.
pub fn generate_api_key<R>(
    repo: &R,
    user: &AuthenticatedUser,
    application_id: i32,
) -> ServiceResult<IssuedApiKey>
where
    R: ApiMarketplaceReader + ApiMarketplaceWriter + ?Sized,
{
    ensure_role(user, API_MARKETPLACE_VIEW)?;

    let application = owned_application(repo, user, ApplicationId::new(application_id)?)?;
    if application.status != ApplicationStatus::Active {
        return Err(ServiceError::Conflict(
            "keys can only be issued for active applications".into(),
        ));
    }

    let plaintext = crypto::generate_api_key();
    let new_key = NewApiKey {
        company_id: application.company_id,
        application_id: application.id,
        key_prefix: api_key_prefix(&plaintext),
        key_hash: hash_api_key(&plaintext),
    };

    let key = repo.create_api_key(&new_key).map_err(|err| {
        log::error!("Failed to store API key: {err}");
        err
    })?;

    log::info!(
        "Issued API key {} for application {}",
        key.key_prefix,
        application.id
    );

    Ok(IssuedApiKey { key, plaintext })
}

pub fn revoke_api_key<R>(repo: &R, user: &AuthenticatedUser, key_id: i32) -> ServiceResult<ApiKey>
where
    R: ApiMarketplaceReader + ApiMarketplaceWriter + ?Sized,
{
    ensure_role(user, API_MARKETPLACE_VIEW)?;

    let company_id = user.company_id()?;
    let key = repo
        .get_api_key(ApiKeyId::new(key_id)?, company_id)?
        .ok_or(ServiceError::NotFound)?;
    owned_application(repo, user, key.application_id)?;

    if key.status == ApiKeyStatus::Revoked {
        return Err(ServiceError::Conflict("API key is already revoked".into()));
    }

    let revoked = repo.revoke_api_key(key.id, company_id, Utc::now().naive_utc())?;
    log::info!("Revoked API key {}", revoked.key_prefix);

    Ok(revoked)
}

/// Meters one call authenticated by the plaintext key instead of a session.
pub fn record_usage<R>(repo: &R, request: RecordUsageRequest) -> ServiceResult<()>
where
    R: ApiMarketplaceReader + ApiMarketplaceWriter + ?Sized,
{
    let payload = RecordUsagePayload::try_from(request)?;

    let key = repo
        .find_api_key_by_hash(&hash_api_key(&payload.api_key))?
        .filter(|key| key.status == ApiKeyStatus::Active)
        .ok_or(ServiceError::Unauthorized)?;

    let api = repo
        .get_api(payload.api_id, key.company_id)?
        .ok_or(ServiceError::Unauthorized)?;

    repo.record_api_usage(&NewApiUsage {
        company_id: key.company_id,
        api_id: api.id,
        application_id: key.application_id,
        status_code: payload.status_code,
        response_time_ms: payload.response_time_ms,
    })
    .map_err(|err| {
        log::error!("Failed to record API usage: {err}");
        err
    })?;

    Ok(())
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::ADMIN_ROLE;
    use crate::domain::api_marketplace::{ApiStatus, UsageSummary};
    use crate::domain::types::{ApiId, CompanyId, UserId};
    use crate::repository::mock::MockRepository;
    use chrono::Utc;

    fn user_with(sub: &str, roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            sub: sub.to_string(),
            email: "dev@example.com".to_string(),
            name: "Dev".to_string(),
            company_id: 10,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: 0,
        }
    }

    fn developer() -> AuthenticatedUser {
        user_with("5", &[API_MARKETPLACE_VIEW])
    }

    fn application(developer: i32, status: ApplicationStatus) -> Application {
        Application {
            id: ApplicationId::new(3).unwrap(),
            company_id: CompanyId::new(10).unwrap(),
            developer_id: UserId::new(developer).unwrap(),
            name: "Shop".into(),
            description: None,
            status,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn api_key(status: ApiKeyStatus) -> ApiKey {
        ApiKey {
            id: ApiKeyId::new(8).unwrap(),
            company_id: CompanyId::new(10).unwrap(),
            application_id: ApplicationId::new(3).unwrap(),
            key_prefix: "erp_abcdefgh".into(),
            status,
            created_at: Utc::now().naive_utc(),
            revoked_at: None,
        }
    }

    #[test]
    fn publishing_requires_manage_permission() {
        let mut repo = MockRepository::new();
        repo.expect_create_api().times(0);
        let form = PublishApiForm {
            name: "Orders".into(),
            category: "sales".into(),
            version: "1".into(),
            price: 1.0,
            description: None,
        };

        let result = publish_api(&repo, &developer(), form);

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn dashboard_passes_range_and_company() {
        let mut repo = MockRepository::new();
        repo.expect_api_counts_by_status()
            .returning(|_| Ok(vec![]));
        repo.expect_api_counts_by_category()
            .returning(|_| Ok(vec![]));
        repo.expect_usage_summary()
            .withf(|company, range| company.get() == 10 && range.from.is_some())
            .times(1)
            .returning(|_, _| Ok(UsageSummary::default()));
        repo.expect_top_apis_by_calls()
            .withf(|_, _, limit| *limit == 5)
            .returning(|_, _, _| Ok(vec![]));
        let query = DateFilterQuery {
            date_from: Some("2025-01-01".into()),
            date_to: None,
        };

        let data = load_dashboard(&repo, &developer(), &query).expect("dashboard");

        assert_eq!(data.dashboard.usage.total_calls, 0);
        assert_eq!(data.dashboard.usage.error_rate, None);
    }

    #[test]
    fn generated_key_stores_only_hash_and_prefix() {
        let mut repo = MockRepository::new();
        repo.expect_get_application()
            .returning(|_, _| Ok(Some(application(5, ApplicationStatus::Active))));
        repo.expect_create_api_key()
            .withf(|key| key.key_prefix.len() == 12 && key.key_hash.len() == 64)
            .times(1)
            .returning(|key| {
                Ok(ApiKey {
                    key_prefix: key.key_prefix.clone(),
                    ..api_key(ApiKeyStatus::Active)
                })
            });

        let issued = generate_api_key(&repo, &developer(), 3).expect("key issued");

        assert!(issued.plaintext.starts_with("erp_"));
        assert_eq!(issued.plaintext.len(), 40);
        assert!(issued.plaintext.starts_with(&issued.key.key_prefix));
    }

    #[test]
    fn other_developers_application_is_not_found() {
        let mut repo = MockRepository::new();
        repo.expect_get_application()
            .returning(|_, _| Ok(Some(application(99, ApplicationStatus::Active))));
        repo.expect_create_api_key().times(0);

        let result = generate_api_key(&repo, &developer(), 3);

        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[test]
    fn suspended_application_cannot_get_keys() {
        let mut repo = MockRepository::new();
        repo.expect_get_application()
            .returning(|_, _| Ok(Some(application(5, ApplicationStatus::Suspended))));
        repo.expect_create_api_key().times(0);

        let admin = user_with("1", &[ADMIN_ROLE]);
        let result = generate_api_key(&repo, &admin, 3);

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn revoking_twice_is_a_conflict() {
        let mut repo = MockRepository::new();
        repo.expect_get_api_key()
            .returning(|_, _| Ok(Some(api_key(ApiKeyStatus::Revoked))));
        repo.expect_get_application()
            .returning(|_, _| Ok(Some(application(5, ApplicationStatus::Active))));
        repo.expect_revoke_api_key().times(0);

        let result = revoke_api_key(&repo, &developer(), 8);

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn usage_with_unknown_key_is_unauthorized() {
        let mut repo = MockRepository::new();
        repo.expect_find_api_key_by_hash().returning(|_| Ok(None));
        repo.expect_record_api_usage().times(0);

        let result = record_usage(
            &repo,
            RecordUsageRequest {
                api_key: "erp_nope".into(),
                api_id: 1,
                status_code: 200,
                response_time_ms: 12,
            },
        );

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn usage_for_an_api_outside_the_keys_company_is_unauthorized() {
        let mut repo = MockRepository::new();
        repo.expect_find_api_key_by_hash()
            .returning(|_| Ok(Some(api_key(ApiKeyStatus::Active))));
        repo.expect_get_api()
            .withf(|id, company| id.get() == 77 && company.get() == 10)
            .returning(|_, _| Ok(None));
        repo.expect_record_api_usage().times(0);

        let result = record_usage(
            &repo,
            RecordUsageRequest {
                api_key: "erp_anything".into(),
                api_id: 77,
                status_code: 200,
                response_time_ms: 5,
            },
        );

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn usage_is_recorded_under_the_keys_company() {
        let mut repo = MockRepository::new();
        repo.expect_find_api_key_by_hash()
            .returning(|_| Ok(Some(api_key(ApiKeyStatus::Active))));
        repo.expect_get_api()
            .withf(|_, company| company.get() == 10)
            .returning(|id, company| {
                Ok(Some(Api {
                    id,
                    company_id: company,
                    name: "Orders".into(),
                    category: "sales".into(),
                    version: "1".into(),
                    status: ApiStatus::Active,
                    price: 0.0,
                    description: None,
                    created_at: Utc::now().naive_utc(),
                }))
            });
        repo.expect_record_api_usage()
            .withf(|usage| {
                usage.company_id.get() == 10
                    && usage.api_id == ApiId::new(4).unwrap()
                    && usage.status_code == 503
            })
            .times(1)
            .returning(|_| Ok(()));

        record_usage(
            &repo,
            RecordUsageRequest {
                api_key: "erp_anything".into(),
                api_id: 4,
                status_code: 503,
                response_time_ms: 80,
            },
        )
        .expect("usage recorded");
    }
}
