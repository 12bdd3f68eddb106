use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::domain::manufacturing::{
    BillOfMaterials as DomainBillOfMaterials, BomItem as DomainBomItem,
    NewWorkOrder as DomainNewWorkOrder, ProductionSummary, WorkOrder as DomainWorkOrder,
};
use crate::domain::types::{BomId, CompanyId, TypeConstraintError, WorkOrderId};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::work_orders)]
pub struct WorkOrder {
    pub id: i32,
    pub company_id: i32,
    pub order_number: String,
    pub product_name: String,
    pub bom_id: Option<i32>,
    pub quantity: i32,
    pub completed_quantity: i32,
    pub scrap_quantity: i32,
    pub status: String,
    pub due_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::work_orders)]
pub struct NewWorkOrder<'a> {
    pub company_id: i32,
    pub product_name: &'a str,
    pub bom_id: Option<i32>,
    pub quantity: i32,
    pub status: &'a str,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::bills_of_materials)]
pub struct BillOfMaterials {
    pub id: i32,
    pub company_id: i32,
    pub product_name: String,
    pub version: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::bills_of_materials)]
pub struct NewBillOfMaterials<'a> {
    pub company_id: i32,
    pub product_name: &'a str,
    pub version: &'a str,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::bom_items)]
pub struct BomItem {
    pub id: i32,
    pub bom_id: i32,
    pub component_name: String,
    pub quantity: f64,
    pub unit_cost: f64,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::bom_items)]
pub struct NewBomItem<'a> {
    pub bom_id: i32,
    pub component_name: &'a str,
    pub quantity: f64,
    pub unit_cost: f64,
}

#[derive(Debug, QueryableByName)]
pub struct ProductionTotalsRow {
    #[diesel(sql_type = BigInt)]
    pub planned: i64,
    #[diesel(sql_type = BigInt)]
    pub completed: i64,
    #[diesel(sql_type = BigInt)]
    pub scrapped: i64,
}

impl TryFrom<WorkOrder> for DomainWorkOrder {
    type Error = TypeConstraintError;

    fn try_from(order: WorkOrder) -> Result<Self, Self::Error> {
        Ok(Self {
            id: WorkOrderId::new(order.id)?,
            company_id: CompanyId::new(order.company_id)?,
            order_number: order.order_number,
            product_name: order.product_name,
            bom_id: order.bom_id.map(BomId::new).transpose()?,
            quantity: order.quantity,
            completed_quantity: order.completed_quantity,
            scrap_quantity: order.scrap_quantity,
            status: order.status.parse()?,
            due_date: order.due_date,
            created_at: order.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewWorkOrder> for NewWorkOrder<'a> {
    fn from(order: &'a DomainNewWorkOrder) -> Self {
        Self {
            company_id: order.company_id.get(),
            product_name: order.product_name.as_str(),
            bom_id: order.bom_id.map(BomId::get),
            quantity: order.quantity,
            status: "planned",
            due_date: order.due_date,
        }
    }
}

impl TryFrom<BillOfMaterials> for DomainBillOfMaterials {
    type Error = TypeConstraintError;

    fn try_from(bom: BillOfMaterials) -> Result<Self, Self::Error> {
        Ok(Self {
            id: BomId::new(bom.id)?,
            company_id: CompanyId::new(bom.company_id)?,
            product_name: bom.product_name,
            version: bom.version,
            status: bom.status.parse()?,
            created_at: bom.created_at,
        })
    }
}

impl TryFrom<BomItem> for DomainBomItem {
    type Error = TypeConstraintError;

    fn try_from(item: BomItem) -> Result<Self, Self::Error> {
        Ok(Self {
            id: item.id,
            bom_id: BomId::new(item.bom_id)?,
            component_name: item.component_name,
            quantity: item.quantity,
            unit_cost: item.unit_cost,
        })
    }
}

impl From<ProductionTotalsRow> for ProductionSummary {
    fn from(row: ProductionTotalsRow) -> Self {
        ProductionSummary::from_totals(row.planned, row.completed, row.scrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::manufacturing::WorkOrderStatus;

    #[test]
    fn work_order_row_converts() {
        let row = WorkOrder {
            id: 3,
            company_id: 1,
            order_number: "WO-20250101-3".into(),
            product_name: "Pump".into(),
            bom_id: Some(2),
            quantity: 10,
            completed_quantity: 0,
            scrap_quantity: 0,
            status: "on_hold".into(),
            due_date: None,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        let order = DomainWorkOrder::try_from(row).unwrap();
        assert_eq!(order.status, WorkOrderStatus::OnHold);
        assert_eq!(order.bom_id.map(BomId::get), Some(2));
    }

    #[test]
    fn empty_totals_have_no_rates() {
        let summary = ProductionSummary::from(ProductionTotalsRow {
            planned: 0,
            completed: 0,
            scrapped: 0,
        });
        assert_eq!(summary.completion_rate, None);
        assert_eq!(summary.scrap_rate, None);
    }
}
