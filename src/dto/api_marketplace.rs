//! DTOs rendered by the API marketplace pages.

use serde::Serialize;

use crate::domain::api_marketplace::{Api, ApiKey, ApiMarketplaceDashboard, Application};
use crate::pagination::Paginated;
use crate::query::DateRange;

#[derive(Debug, Serialize)]
pub struct ApiDashboardPageData {
    pub dashboard: ApiMarketplaceDashboard,
    pub range: DateRange,
}

#[derive(Debug, Serialize)]
pub struct ApiCatalogPageData {
    pub apis: Paginated<Api>,
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationWithKeys {
    pub application: Application,
    pub keys: Vec<ApiKey>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationsPageData {
    pub applications: Vec<ApplicationWithKeys>,
}
