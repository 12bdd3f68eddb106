//! Form definitions backing the ERP routes.
//!
//! Each raw form deserialized from the request is converted into a payload
//! of validated domain values through `TryFrom`.

use thiserror::Error;
use validator::ValidationErrors;

use crate::domain::types::{Label, TypeConstraintError};
use crate::query::DateRange;

pub mod api_marketplace;
pub mod documentation;
pub mod form_manager;
pub mod manufacturing;
pub mod procurement;
pub mod quality_management;
pub mod reporting;
pub mod security_features;
pub mod testing;
pub mod user_experience;

#[derive(Debug, Error)]
/// Errors that can occur when processing form data.
pub enum FormError {
    #[error("validation errors: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Invalid(#[from] TypeConstraintError),

    #[error("invalid email address")]
    InvalidEmail,

    #[error("invalid phone number")]
    InvalidPhoneNumber,

    #[error("invalid date `{0}`")]
    InvalidDate(String),

    #[error("date_from must not be after date_to")]
    InvertedDateRange,

    #[error("{0}")]
    Rule(String),
}

/// Query string filters shared by the list pages.
#[derive(Debug, Default, serde::Deserialize)]
pub struct DateFilterQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl TryFrom<&DateFilterQuery> for DateRange {
    type Error = FormError;

    fn try_from(query: &DateFilterQuery) -> Result<Self, Self::Error> {
        let range = DateRange::parse(query.date_from.as_deref(), query.date_to.as_deref());
        if range.is_inverted() {
            return Err(FormError::InvertedDateRange);
        }
        Ok(range)
    }
}

/// Parses a required `YYYY-MM-DD` form value.
pub fn parse_date(value: &str) -> Result<chrono::NaiveDate, FormError> {
    chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| FormError::InvalidDate(value.to_string()))
}

/// Parses an optional `YYYY-MM-DD` form value, treating blanks as absent.
pub fn parse_optional_date(value: Option<&str>) -> Result<Option<chrono::NaiveDate>, FormError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_date(v).map(Some),
        None => Ok(None),
    }
}

/// An HTML checkbox is present only when ticked.
pub fn checkbox(value: &Option<String>) -> bool {
    matches!(value.as_deref().map(str::trim), Some(v) if !matches!(v, "" | "0" | "false" | "off"))
}

/// Blank strings from HTML inputs become `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Decodes an urlencoded body that may repeat keys for list inputs.
pub fn parse_html_form<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, FormError> {
    serde_html_form::from_bytes(body).map_err(|err| FormError::Rule(format!("malformed form: {err}")))
}

/// One row of a line-item table (BOM components, purchase order lines).
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub description: Label,
    pub quantity: f64,
    pub unit_price: f64,
}

/// Zips parallel `name[]`, `quantity[]` and `price[]` inputs into rows.
///
/// Fully blank rows are skipped. Quantities must be positive and prices
/// non-negative.
pub fn parse_line_items(
    names: &[String],
    quantities: &[String],
    prices: &[String],
) -> Result<Vec<LineItem>, FormError> {
    let rows = names.len().max(quantities.len()).max(prices.len());
    let cell = |values: &[String], i: usize| {
        values.get(i).map(|v| v.trim().to_string()).unwrap_or_default()
    };

    let mut items = Vec::new();
    for i in 0..rows {
        let (name, quantity, price) = (cell(names, i), cell(quantities, i), cell(prices, i));
        if name.is_empty() && quantity.is_empty() && price.is_empty() {
            continue;
        }
        let line = i + 1;
        let quantity = quantity
            .parse::<f64>()
            .ok()
            .filter(|q| q.is_finite() && *q > 0.0)
            .ok_or_else(|| FormError::Rule(format!("line {line}: quantity must be greater than 0")))?;
        let unit_price = if price.is_empty() {
            0.0
        } else {
            price
                .parse::<f64>()
                .ok()
                .filter(|p| p.is_finite() && *p >= 0.0)
                .ok_or_else(|| FormError::Rule(format!("line {line}: price must not be negative")))?
        };
        items.push(LineItem {
            description: Label::new(name)
                .map_err(|_| FormError::Rule(format!("line {line}: name is required")))?,
            quantity,
            unit_price,
        });
    }

    if items.is_empty() {
        return Err(FormError::Rule("at least one line item is required".into()));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn line_items_skip_blank_rows() {
        let items = parse_line_items(
            &strings(&["Bolt", "", "Nut"]),
            &strings(&["4", "", "2.5"]),
            &strings(&["0.25", "", ""]),
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].unit_price, 0.25);
        assert_eq!(items[1].unit_price, 0.0);
    }

    #[test]
    fn line_items_validate_quantities() {
        assert!(parse_line_items(&strings(&["Bolt"]), &strings(&["0"]), &strings(&["1"])).is_err());
        assert!(parse_line_items(&strings(&["Bolt"]), &strings(&["1"]), &strings(&["-1"])).is_err());
        assert!(parse_line_items(&strings(&["", ""]), &strings(&[]), &strings(&[])).is_err());
    }

    #[test]
    fn repeated_keys_decode_into_lists() {
        #[derive(serde::Deserialize)]
        struct Lines {
            name: Vec<String>,
        }
        let lines: Lines = parse_html_form(b"name=a&name=b").unwrap();
        assert_eq!(lines.name, vec!["a", "b"]);
    }

    #[test]
    fn inverted_date_filter_is_rejected() {
        let query = DateFilterQuery {
            date_from: Some("2025-02-01".into()),
            date_to: Some("2025-01-01".into()),
        };
        assert!(matches!(
            DateRange::try_from(&query),
            Err(FormError::InvertedDateRange)
        ));
    }

    #[test]
    fn malformed_dates_are_ignored_in_filters() {
        let query = DateFilterQuery {
            date_from: Some("yesterday".into()),
            date_to: None,
        };
        assert_eq!(DateRange::try_from(&query).unwrap(), DateRange::default());
    }

    #[test]
    fn checkbox_values() {
        assert!(checkbox(&Some("on".into())));
        assert!(checkbox(&Some("true".into())));
        assert!(!checkbox(&Some("false".into())));
        assert!(!checkbox(&None));
    }

    #[test]
    fn optional_date_treats_blank_as_none() {
        assert_eq!(parse_optional_date(Some("  ")).unwrap(), None);
        assert!(parse_optional_date(Some("2025-13-01")).is_err());
    }
}
