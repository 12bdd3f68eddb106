use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::domain::procurement::{
    MAX_VENDOR_RATING, NewPurchaseOrder, NewPurchaseOrderItem, NewVendor, PurchaseOrderStatus,
};
use crate::domain::types::{CompanyId, Email, PhoneNumber, Title, VendorId};
use crate::forms::{FormError, non_blank, parse_line_items, parse_optional_date};
use crate::query::DateRange;

#[derive(Debug, Deserialize, Validate)]
pub struct VendorForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub rating: i32,
}

pub struct VendorPayload {
    pub name: Title,
    pub email: Option<Email>,
    pub phone: Option<PhoneNumber>,
    pub rating: i32,
}

impl TryFrom<VendorForm> for VendorPayload {
    type Error = FormError;

    fn try_from(form: VendorForm) -> Result<Self, Self::Error> {
        form.validate()?;
        if !(0..=MAX_VENDOR_RATING).contains(&form.rating) {
            return Err(FormError::Rule(format!(
                "rating must be between 0 and {MAX_VENDOR_RATING}"
            )));
        }
        let email = non_blank(form.email)
            .map(|e| Email::new(e).map_err(|_| FormError::InvalidEmail))
            .transpose()?;
        let phone = non_blank(form.phone)
            .map(|p| PhoneNumber::new(p).map_err(|_| FormError::InvalidPhoneNumber))
            .transpose()?;
        Ok(Self {
            name: Title::new(form.name)?,
            email,
            phone,
            rating: form.rating,
        })
    }
}

impl VendorPayload {
    pub fn into_domain(self, company_id: CompanyId) -> NewVendor {
        NewVendor {
            company_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            rating: self.rating,
        }
    }
}

/// Purchase order with parallel `description`, `quantity` and `unit_price`
/// inputs, one per line.
#[derive(Debug, Default, Deserialize)]
pub struct PurchaseOrderForm {
    pub vendor_id: i32,
    pub expected_date: Option<String>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub quantity: Vec<String>,
    #[serde(default)]
    pub unit_price: Vec<String>,
}

pub struct PurchaseOrderPayload {
    pub vendor_id: VendorId,
    pub expected_date: Option<NaiveDate>,
    pub items: Vec<NewPurchaseOrderItem>,
}

impl TryFrom<PurchaseOrderForm> for PurchaseOrderPayload {
    type Error = FormError;

    fn try_from(form: PurchaseOrderForm) -> Result<Self, Self::Error> {
        let items = parse_line_items(&form.description, &form.quantity, &form.unit_price)?
            .into_iter()
            .map(|line| NewPurchaseOrderItem {
                description: line.description,
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();
        Ok(Self {
            vendor_id: VendorId::new(form.vendor_id)?,
            expected_date: parse_optional_date(form.expected_date.as_deref())?,
            items,
        })
    }
}

impl PurchaseOrderPayload {
    pub fn into_domain(self, company_id: CompanyId, order_date: NaiveDate) -> NewPurchaseOrder {
        NewPurchaseOrder {
            company_id,
            vendor_id: self.vendor_id,
            order_date,
            expected_date: self.expected_date,
            items: self.items,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VendorSearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseOrderFilterQuery {
    pub status: Option<String>,
    pub vendor_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
}

pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub vendor_id: Option<VendorId>,
    pub range: DateRange,
    pub search: Option<String>,
    pub page: usize,
}

impl TryFrom<PurchaseOrderFilterQuery> for PurchaseOrderFilter {
    type Error = FormError;

    fn try_from(query: PurchaseOrderFilterQuery) -> Result<Self, Self::Error> {
        let range = DateRange::parse(query.date_from.as_deref(), query.date_to.as_deref());
        if range.is_inverted() {
            return Err(FormError::InvertedDateRange);
        }
        let vendor_id = non_blank(query.vendor_id)
            .map(|raw| {
                raw.parse::<i32>()
                    .map_err(|_| FormError::Rule(format!("invalid vendor `{raw}`")))
                    .and_then(|id| VendorId::new(id).map_err(FormError::from))
            })
            .transpose()?;
        Ok(Self {
            status: non_blank(query.status)
                .map(|s| s.parse::<PurchaseOrderStatus>())
                .transpose()?,
            vendor_id,
            range,
            search: non_blank(query.search),
            page: query.page.unwrap_or(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor_form() -> VendorForm {
        VendorForm {
            name: "Acme Supply".into(),
            email: Some(" Sales@Acme.example ".into()),
            phone: Some("+1 415 555 0100".into()),
            rating: 4,
        }
    }

    #[test]
    fn vendor_phone_is_normalized() {
        let payload = VendorPayload::try_from(vendor_form()).unwrap();
        assert_eq!(payload.phone.unwrap().as_str(), "+14155550100");
    }

    #[test]
    fn vendor_rating_is_bounded() {
        let mut form = vendor_form();
        form.rating = 6;
        assert!(VendorPayload::try_from(form).is_err());
    }

    #[test]
    fn vendor_email_must_be_valid() {
        let mut form = vendor_form();
        form.email = Some("not-an-email".into());
        assert!(matches!(
            VendorPayload::try_from(form),
            Err(FormError::InvalidEmail)
        ));
    }

    #[test]
    fn blank_contact_fields_are_absent() {
        let mut form = vendor_form();
        form.email = Some("  ".into());
        form.phone = None;
        let payload = VendorPayload::try_from(form).unwrap();
        assert!(payload.email.is_none());
        assert!(payload.phone.is_none());
    }

    #[test]
    fn purchase_order_needs_lines() {
        let form = PurchaseOrderForm {
            vendor_id: 3,
            ..Default::default()
        };
        assert!(PurchaseOrderPayload::try_from(form).is_err());
    }

    #[test]
    fn purchase_order_lines_are_collected() {
        let form = PurchaseOrderForm {
            vendor_id: 3,
            expected_date: Some("2025-08-01".into()),
            description: vec!["Bolts".into(), "".into()],
            quantity: vec!["100".into(), "".into()],
            unit_price: vec!["0.25".into(), "".into()],
        };
        let payload = PurchaseOrderPayload::try_from(form).unwrap();
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.expected_date, NaiveDate::from_ymd_opt(2025, 8, 1));
    }

    #[test]
    fn filter_parses_vendor_and_status() {
        let filter = PurchaseOrderFilter::try_from(PurchaseOrderFilterQuery {
            status: Some("approved".into()),
            vendor_id: Some("4".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.status, Some(PurchaseOrderStatus::Approved));
        assert_eq!(filter.vendor_id.map(VendorId::get), Some(4));
        assert_eq!(filter.page, 1);
    }
}
