//! APIs published to the marketplace, developer applications and their keys.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::stats::LabelCount;
use crate::domain::types::{
    ApiId, ApiKeyId, ApplicationId, CompanyId, Label, SanitizedText, Title, UserId, VersionTag,
    string_enum,
};

string_enum!(ApiStatus {
    Active => "active",
    Deprecated => "deprecated",
    Retired => "retired",
});

string_enum!(ApplicationStatus {
    Active => "active",
    Suspended => "suspended",
});

string_enum!(ApiKeyStatus {
    Active => "active",
    Revoked => "revoked",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Api {
    pub id: ApiId,
    pub company_id: CompanyId,
    pub name: String,
    pub category: String,
    pub version: String,
    pub status: ApiStatus,
    pub price: f64,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewApi {
    pub company_id: CompanyId,
    pub name: Title,
    pub category: Label,
    pub version: VersionTag,
    pub price: f64,
    pub description: Option<SanitizedText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub company_id: CompanyId,
    pub developer_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub company_id: CompanyId,
    pub developer_id: UserId,
    pub name: Title,
    pub description: Option<SanitizedText>,
}

/// Issued key metadata. The plaintext key is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub company_id: CompanyId,
    pub application_id: ApplicationId,
    pub key_prefix: String,
    pub status: ApiKeyStatus,
    pub created_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub company_id: CompanyId,
    pub application_id: ApplicationId,
    pub key_prefix: String,
    pub key_hash: String,
}

/// A freshly generated key, returned to the caller exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedApiKey {
    pub key: ApiKey,
    pub plaintext: String,
}

#[derive(Debug, Clone)]
pub struct NewApiUsage {
    pub company_id: CompanyId,
    pub api_id: ApiId,
    pub application_id: ApplicationId,
    pub status_code: i32,
    pub response_time_ms: i32,
}

/// Call statistics over a date range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_calls: i64,
    pub avg_response_ms: Option<f64>,
    /// Share of calls answered with a status code of 400 or above, in percent.
    pub error_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiMarketplaceDashboard {
    pub apis_by_status: Vec<LabelCount>,
    pub apis_by_category: Vec<LabelCount>,
    pub usage: UsageSummary,
    pub top_apis: Vec<LabelCount>,
}
