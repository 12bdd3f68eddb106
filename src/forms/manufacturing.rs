use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::domain::manufacturing::{
    NewBillOfMaterials, NewBomItem, NewWorkOrder, WorkOrderStatus,
};
use crate::domain::types::{BomId, CompanyId, Title, VersionTag};
use crate::forms::{FormError, non_blank, parse_line_items, parse_optional_date};
use crate::query::DateRange;

#[derive(Debug, Deserialize, Validate)]
pub struct WorkOrderForm {
    #[validate(length(min = 1, max = 255))]
    pub product_name: String,
    pub bom_id: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub due_date: Option<String>,
}

pub struct WorkOrderPayload {
    pub product_name: Title,
    pub bom_id: Option<BomId>,
    pub quantity: i32,
    pub due_date: Option<NaiveDate>,
}

impl TryFrom<WorkOrderForm> for WorkOrderPayload {
    type Error = FormError;

    fn try_from(form: WorkOrderForm) -> Result<Self, Self::Error> {
        form.validate()?;
        let bom_id = non_blank(form.bom_id)
            .map(|raw| {
                raw.parse::<i32>()
                    .map_err(|_| FormError::Rule(format!("invalid bill of materials `{raw}`")))
                    .and_then(|id| BomId::new(id).map_err(FormError::from))
            })
            .transpose()?;
        Ok(Self {
            product_name: Title::new(form.product_name)?,
            bom_id,
            quantity: form.quantity,
            due_date: parse_optional_date(form.due_date.as_deref())?,
        })
    }
}

impl WorkOrderPayload {
    pub fn into_domain(self, company_id: CompanyId) -> NewWorkOrder {
        NewWorkOrder {
            company_id,
            product_name: self.product_name,
            bom_id: self.bom_id,
            quantity: self.quantity,
            due_date: self.due_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductionForm {
    #[serde(default)]
    pub completed: i32,
    #[serde(default)]
    pub scrapped: i32,
}

#[derive(Debug, Deserialize)]
pub struct WorkOrderStatusForm {
    pub status: String,
}

impl TryFrom<WorkOrderStatusForm> for WorkOrderStatus {
    type Error = FormError;

    fn try_from(form: WorkOrderStatusForm) -> Result<Self, Self::Error> {
        Ok(form.status.parse()?)
    }
}

/// Bill of materials with parallel `component_name`, `quantity` and
/// `unit_cost` inputs, one per row.
#[derive(Debug, Default, Deserialize)]
pub struct BomForm {
    pub product_name: String,
    pub version: String,
    #[serde(default)]
    pub component_name: Vec<String>,
    #[serde(default)]
    pub quantity: Vec<String>,
    #[serde(default)]
    pub unit_cost: Vec<String>,
}

pub struct BomPayload {
    pub product_name: Title,
    pub version: VersionTag,
    pub items: Vec<NewBomItem>,
}

impl TryFrom<BomForm> for BomPayload {
    type Error = FormError;

    fn try_from(form: BomForm) -> Result<Self, Self::Error> {
        let items = parse_line_items(&form.component_name, &form.quantity, &form.unit_cost)?
            .into_iter()
            .map(|line| NewBomItem {
                component_name: line.description,
                quantity: line.quantity,
                unit_cost: line.unit_price,
            })
            .collect();
        Ok(Self {
            product_name: Title::new(form.product_name)?,
            version: VersionTag::new(form.version)?,
            items,
        })
    }
}

impl BomPayload {
    pub fn into_domain(self, company_id: CompanyId) -> NewBillOfMaterials {
        NewBillOfMaterials {
            company_id,
            product_name: self.product_name,
            version: self.version,
            items: self.items,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkOrderFilterQuery {
    pub status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
}

pub struct WorkOrderFilter {
    pub status: Option<WorkOrderStatus>,
    pub range: DateRange,
    pub search: Option<String>,
    pub page: usize,
}

impl TryFrom<WorkOrderFilterQuery> for WorkOrderFilter {
    type Error = FormError;

    fn try_from(query: WorkOrderFilterQuery) -> Result<Self, Self::Error> {
        let range = DateRange::parse(query.date_from.as_deref(), query.date_to.as_deref());
        if range.is_inverted() {
            return Err(FormError::InvertedDateRange);
        }
        Ok(Self {
            status: non_blank(query.status)
                .map(|s| s.parse::<WorkOrderStatus>())
                .transpose()?,
            range,
            search: non_blank(query.search),
            page: query.page.unwrap_or(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_must_be_positive() {
        let form = WorkOrderForm {
            product_name: "Pump".into(),
            bom_id: None,
            quantity: 0,
            due_date: None,
        };
        assert!(WorkOrderPayload::try_from(form).is_err());
    }

    #[test]
    fn due_date_and_bom_are_parsed() {
        let form = WorkOrderForm {
            product_name: "Pump".into(),
            bom_id: Some("3".into()),
            quantity: 5,
            due_date: Some("2025-07-01".into()),
        };
        let payload = WorkOrderPayload::try_from(form).unwrap();
        assert_eq!(payload.bom_id.map(BomId::get), Some(3));
        assert_eq!(payload.due_date, NaiveDate::from_ymd_opt(2025, 7, 1));
    }

    #[test]
    fn bom_requires_items() {
        let form = BomForm {
            product_name: "Pump".into(),
            version: "A".into(),
            ..Default::default()
        };
        assert!(BomPayload::try_from(form).is_err());
    }

    #[test]
    fn bom_items_are_collected() {
        let form = BomForm {
            product_name: "Pump".into(),
            version: "A".into(),
            component_name: vec!["Housing".into(), "Seal".into()],
            quantity: vec!["1".into(), "2".into()],
            unit_cost: vec!["40".into(), "2.5".into()],
        };
        let payload = BomPayload::try_from(form).unwrap();
        assert_eq!(payload.items.len(), 2);
        assert_eq!(payload.items[1].unit_cost, 2.5);
    }

    #[test]
    fn inverted_filter_range_is_rejected() {
        let query = WorkOrderFilterQuery {
            date_from: Some("2025-05-02".into()),
            date_to: Some("2025-05-01".into()),
            ..Default::default()
        };
        assert!(WorkOrderFilter::try_from(query).is_err());
    }
}
