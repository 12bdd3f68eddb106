//! Forms for publishing APIs, registering applications and reporting usage.

use serde::Deserialize;
use validator::Validate;

use crate::domain::api_marketplace::{ApiStatus, NewApi, NewApplication};
use crate::domain::types::{ApiId, CompanyId, Label, SanitizedText, Title, UserId, VersionTag};
use crate::forms::{FormError, non_blank};

#[derive(Debug, Deserialize, Validate)]
pub struct PublishApiForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(length(min = 1, max = 50))]
    pub version: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub description: Option<String>,
}

pub struct PublishApiPayload {
    pub name: Title,
    pub category: Label,
    pub version: VersionTag,
    pub price: f64,
    pub description: Option<SanitizedText>,
}

impl TryFrom<PublishApiForm> for PublishApiPayload {
    type Error = FormError;

    fn try_from(form: PublishApiForm) -> Result<Self, Self::Error> {
        form.validate()?;
        if !form.price.is_finite() {
            return Err(FormError::Rule("price must be a number".into()));
        }
        Ok(Self {
            name: Title::new(form.name)?,
            category: Label::new(form.category.to_lowercase())?,
            version: VersionTag::new(form.version)?,
            price: form.price,
            description: SanitizedText::optional(form.description),
        })
    }
}

impl PublishApiPayload {
    pub fn into_domain(self, company_id: CompanyId) -> NewApi {
        NewApi {
            company_id,
            name: self.name,
            category: self.category,
            version: self.version,
            price: self.price,
            description: self.description,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterApplicationForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
}

pub struct RegisterApplicationPayload {
    pub name: Title,
    pub description: Option<SanitizedText>,
}

impl TryFrom<RegisterApplicationForm> for RegisterApplicationPayload {
    type Error = FormError;

    fn try_from(form: RegisterApplicationForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(Self {
            name: Title::new(form.name)?,
            description: SanitizedText::optional(form.description),
        })
    }
}

impl RegisterApplicationPayload {
    pub fn into_domain(self, company_id: CompanyId, developer_id: UserId) -> NewApplication {
        NewApplication {
            company_id,
            developer_id,
            name: self.name,
            description: self.description,
        }
    }
}

/// Query string of the API catalogue.
#[derive(Debug, Default, Deserialize)]
pub struct ApiFilterQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
}

pub struct ApiFilter {
    pub status: Option<ApiStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: usize,
}

impl TryFrom<ApiFilterQuery> for ApiFilter {
    type Error = FormError;

    fn try_from(query: ApiFilterQuery) -> Result<Self, Self::Error> {
        let status = non_blank(query.status)
            .map(|s| s.parse::<ApiStatus>())
            .transpose()?;
        Ok(Self {
            status,
            category: non_blank(query.category),
            search: non_blank(query.search),
            page: query.page.unwrap_or(1),
        })
    }
}

/// JSON body posted by API gateways for every metered call.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordUsageRequest {
    #[validate(length(min = 1))]
    pub api_key: String,
    pub api_id: i32,
    #[validate(range(min = 100, max = 599))]
    pub status_code: i32,
    #[validate(range(min = 0))]
    pub response_time_ms: i32,
}

pub struct RecordUsagePayload {
    pub api_key: String,
    pub api_id: ApiId,
    pub status_code: i32,
    pub response_time_ms: i32,
}

impl TryFrom<RecordUsageRequest> for RecordUsagePayload {
    type Error = FormError;

    fn try_from(request: RecordUsageRequest) -> Result<Self, Self::Error> {
        request.validate()?;
        Ok(Self {
            api_key: request.api_key.trim().to_string(),
            api_id: ApiId::new(request.api_id)?,
            status_code: request.status_code,
            response_time_ms: request.response_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish_form(price: f64) -> PublishApiForm {
        PublishApiForm {
            name: "Orders".into(),
            category: "Sales".into(),
            version: "v1".into(),
            price,
            description: Some("<script>x</script>Order feed".into()),
        }
    }

    #[test]
    fn publish_form_sanitizes_and_normalizes() {
        let payload = PublishApiPayload::try_from(publish_form(0.0)).unwrap();
        assert_eq!(payload.category.as_str(), "sales");
        assert_eq!(
            payload.description.as_ref().map(|d| d.as_str()),
            Some("Order feed")
        );
    }

    #[test]
    fn negative_price_is_rejected() {
        assert!(PublishApiPayload::try_from(publish_form(-1.0)).is_err());
    }

    #[test]
    fn filter_rejects_unknown_status() {
        let query = ApiFilterQuery {
            status: Some("gone".into()),
            ..Default::default()
        };
        assert!(ApiFilter::try_from(query).is_err());
    }

    #[test]
    fn usage_requires_http_status_code() {
        let request = RecordUsageRequest {
            api_key: "erp_x".into(),
            api_id: 1,
            status_code: 42,
            response_time_ms: 10,
        };
        assert!(RecordUsagePayload::try_from(request).is_err());
    }
}
