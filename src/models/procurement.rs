use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Nullable, Text};

use crate::domain::procurement::{
    DeliveryStats, NewVendor as DomainNewVendor, PurchaseOrder as DomainPurchaseOrder,
    PurchaseOrderItem as DomainPurchaseOrderItem, SpendByStatus, Vendor as DomainVendor,
    VendorOrderStats,
};
use crate::domain::types::{CompanyId, PurchaseOrderId, TypeConstraintError, VendorId};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::vendors)]
pub struct Vendor {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub rating: i32,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::vendors)]
pub struct NewVendor<'a> {
    pub company_id: i32,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub rating: i32,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::purchase_orders)]
pub struct PurchaseOrder {
    pub id: i32,
    pub company_id: i32,
    pub vendor_id: i32,
    pub po_number: String,
    pub status: String,
    pub total_amount: f64,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    pub received_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::purchase_orders)]
pub struct NewPurchaseOrder {
    pub company_id: i32,
    pub vendor_id: i32,
    pub total_amount: f64,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::purchase_order_items)]
pub struct PurchaseOrderItem {
    pub id: i32,
    pub purchase_order_id: i32,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::purchase_order_items)]
pub struct NewPurchaseOrderItem<'a> {
    pub purchase_order_id: i32,
    pub description: &'a str,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, QueryableByName)]
pub struct SpendByStatusRow {
    #[diesel(sql_type = Text)]
    pub status: String,
    #[diesel(sql_type = BigInt)]
    pub orders: i64,
    #[diesel(sql_type = Double)]
    pub spend: f64,
}

#[derive(Debug, QueryableByName)]
pub struct DeliveryStatsRow {
    #[diesel(sql_type = BigInt)]
    pub received: i64,
    #[diesel(sql_type = BigInt)]
    pub on_time: i64,
}

#[derive(Debug, QueryableByName)]
pub struct VendorOrderStatsRow {
    #[diesel(sql_type = BigInt)]
    pub orders: i64,
    #[diesel(sql_type = Double)]
    pub total_spend: f64,
    #[diesel(sql_type = BigInt)]
    pub received: i64,
    #[diesel(sql_type = BigInt)]
    pub on_time: i64,
    #[diesel(sql_type = Nullable<Double>)]
    pub avg_lead_time_days: Option<f64>,
}

impl TryFrom<Vendor> for DomainVendor {
    type Error = TypeConstraintError;

    fn try_from(vendor: Vendor) -> Result<Self, Self::Error> {
        Ok(Self {
            id: VendorId::new(vendor.id)?,
            company_id: CompanyId::new(vendor.company_id)?,
            name: vendor.name,
            email: vendor.email,
            phone: vendor.phone,
            rating: vendor.rating,
            status: vendor.status.parse()?,
            created_at: vendor.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewVendor> for NewVendor<'a> {
    fn from(vendor: &'a DomainNewVendor) -> Self {
        Self {
            company_id: vendor.company_id.get(),
            name: vendor.name.as_str(),
            email: vendor.email.as_ref().map(|e| e.as_str()),
            phone: vendor.phone.as_ref().map(|p| p.as_str()),
            rating: vendor.rating,
        }
    }
}

impl TryFrom<PurchaseOrder> for DomainPurchaseOrder {
    type Error = TypeConstraintError;

    fn try_from(order: PurchaseOrder) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PurchaseOrderId::new(order.id)?,
            company_id: CompanyId::new(order.company_id)?,
            vendor_id: VendorId::new(order.vendor_id)?,
            po_number: order.po_number,
            status: order.status.parse()?,
            total_amount: order.total_amount,
            order_date: order.order_date,
            expected_date: order.expected_date,
            received_date: order.received_date,
            created_at: order.created_at,
        })
    }
}

impl TryFrom<PurchaseOrderItem> for DomainPurchaseOrderItem {
    type Error = TypeConstraintError;

    fn try_from(item: PurchaseOrderItem) -> Result<Self, Self::Error> {
        Ok(Self {
            id: item.id,
            purchase_order_id: PurchaseOrderId::new(item.purchase_order_id)?,
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
    }
}

impl From<SpendByStatusRow> for SpendByStatus {
    fn from(row: SpendByStatusRow) -> Self {
        Self {
            status: row.status,
            orders: row.orders,
            spend: row.spend,
        }
    }
}

impl From<DeliveryStatsRow> for DeliveryStats {
    fn from(row: DeliveryStatsRow) -> Self {
        Self {
            received: row.received,
            on_time: row.on_time,
        }
    }
}

impl From<VendorOrderStatsRow> for VendorOrderStats {
    fn from(row: VendorOrderStatsRow) -> Self {
        Self {
            orders: row.orders,
            total_spend: row.total_spend,
            delivery: DeliveryStats {
                received: row.received,
                on_time: row.on_time,
            },
            avg_lead_time_days: row.avg_lead_time_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_status_is_parsed() {
        let row = Vendor {
            id: 1,
            company_id: 2,
            name: "Acme".into(),
            email: None,
            phone: Some("+14155550100".into()),
            rating: 4,
            status: "retired".into(),
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        assert!(DomainVendor::try_from(row).is_err());
    }

    #[test]
    fn vendor_stats_row_keeps_delivery_counts() {
        let stats = VendorOrderStats::from(VendorOrderStatsRow {
            orders: 5,
            total_spend: 900.0,
            received: 2,
            on_time: 1,
            avg_lead_time_days: Some(6.5),
        });
        assert_eq!(stats.delivery.on_time_rate(), Some(50.0));
        assert_eq!(stats.avg_lead_time_days, Some(6.5));
    }
}
