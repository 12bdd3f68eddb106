use serde::Deserialize;
use validator::Validate;

use crate::domain::security_features::NewEncryptionKey;
use crate::domain::types::{CompanyId, Title, UserId};
use crate::forms::{FormError, non_blank};
use crate::query::DateRange;

/// Upper bound on a single encrypt/decrypt payload.
pub const MAX_CIPHER_INPUT: usize = 64 * 1024;

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogFilterQuery {
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub user_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug)]
pub struct AuditLogFilter {
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub user_id: Option<UserId>,
    pub range: DateRange,
    pub page: usize,
}

impl TryFrom<AuditLogFilterQuery> for AuditLogFilter {
    type Error = FormError;

    fn try_from(query: AuditLogFilterQuery) -> Result<Self, Self::Error> {
        let range = DateRange::parse(query.date_from.as_deref(), query.date_to.as_deref());
        if range.is_inverted() {
            return Err(FormError::InvertedDateRange);
        }
        let user_id = non_blank(query.user_id)
            .map(|raw| {
                raw.parse::<i32>()
                    .map_err(|_| FormError::Rule(format!("invalid user `{raw}`")))
                    .and_then(|id| UserId::new(id).map_err(FormError::from))
            })
            .transpose()?;

        Ok(Self {
            action: non_blank(query.action),
            entity_type: non_blank(query.entity_type),
            user_id,
            range,
            page: query.page.unwrap_or(1),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct EncryptionKeyForm {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

impl EncryptionKeyForm {
    /// Key names are case-insensitive within a company.
    pub fn into_domain(
        self,
        company_id: CompanyId,
        wrapped_key: String,
    ) -> Result<NewEncryptionKey, FormError> {
        self.validate()?;
        Ok(NewEncryptionKey {
            company_id,
            name: Title::new(self.name.to_lowercase())?,
            wrapped_key,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct EncryptForm {
    pub plaintext: String,
}

#[derive(Debug, Deserialize)]
pub struct DecryptForm {
    pub ciphertext: String,
}

/// Rejects empty and oversized cipher input.
pub fn cipher_input(value: &str) -> Result<&str, FormError> {
    if value.is_empty() {
        return Err(FormError::Rule("input must not be empty".into()));
    }
    if value.len() > MAX_CIPHER_INPUT {
        return Err(FormError::Rule(format!(
            "input exceeds {MAX_CIPHER_INPUT} bytes"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn audit_filter_parses_user_and_range() {
        let filter = AuditLogFilter::try_from(AuditLogFilterQuery {
            action: Some("key.created".into()),
            user_id: Some("12".into()),
            date_from: Some("2025-01-01".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.user_id, Some(UserId::new(12).unwrap()));
        assert_eq!(filter.range.from, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(filter.page, 1);
    }

    #[test]
    fn audit_filter_rejects_bad_user() {
        let query = AuditLogFilterQuery {
            user_id: Some("abc".into()),
            ..Default::default()
        };
        assert!(AuditLogFilter::try_from(query).is_err());
    }

    #[test]
    fn key_names_are_lowercased() {
        let key = EncryptionKeyForm {
            name: "Payroll".into(),
        }
        .into_domain(CompanyId::new(1).unwrap(), "wrapped".into())
        .unwrap();
        assert_eq!(key.name.as_str(), "payroll");

        let blank = EncryptionKeyForm { name: "".into() };
        assert!(blank.into_domain(CompanyId::new(1).unwrap(), "w".into()).is_err());
    }

    #[test]
    fn cipher_input_bounds() {
        assert!(cipher_input("").is_err());
        assert!(cipher_input("secret").is_ok());
        assert!(cipher_input(&"x".repeat(MAX_CIPHER_INPUT + 1)).is_err());
    }
}
