//! Vendors and purchase orders.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::stats::LabelValue;
use crate::domain::types::{
    CompanyId, Email, Label, PhoneNumber, PurchaseOrderId, Title, VendorId, percentage,
    string_enum,
};

pub const MAX_VENDOR_RATING: i32 = 5;

string_enum!(VendorStatus {
    Active => "active",
    Inactive => "inactive",
});

string_enum!(PurchaseOrderStatus {
    Draft => "draft",
    Approved => "approved",
    Received => "received",
    Cancelled => "cancelled",
});

impl PurchaseOrderStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        use PurchaseOrderStatus::*;
        matches!(
            (self, next),
            (Draft, Approved) | (Draft | Approved, Cancelled) | (Approved, Received)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub company_id: CompanyId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub rating: i32,
    pub status: VendorStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewVendor {
    pub company_id: CompanyId,
    pub name: Title,
    pub email: Option<Email>,
    pub phone: Option<PhoneNumber>,
    pub rating: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub company_id: CompanyId,
    pub vendor_id: VendorId,
    pub po_number: String,
    pub status: PurchaseOrderStatus,
    pub total_amount: f64,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    pub received_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub id: i32,
    pub purchase_order_id: PurchaseOrderId,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseOrderDetail {
    pub order: PurchaseOrder,
    pub vendor_name: String,
    pub items: Vec<PurchaseOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewPurchaseOrderItem {
    pub description: Label,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone)]
pub struct NewPurchaseOrder {
    pub company_id: CompanyId,
    pub vendor_id: VendorId,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    pub items: Vec<NewPurchaseOrderItem>,
}

impl NewPurchaseOrder {
    /// Σ quantity × unit price.
    pub fn total_amount(&self) -> f64 {
        self.items.iter().map(|i| i.quantity * i.unit_price).sum()
    }
}

/// `PO-<YYYYMMDD>-<id>`.
pub fn purchase_order_number(order_date: NaiveDate, id: PurchaseOrderId) -> String {
    format!("PO-{}-{id}", order_date.format("%Y%m%d"))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendByStatus {
    pub status: String,
    pub orders: i64,
    pub spend: f64,
}

/// Received orders and how many of them arrived by the expected date.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeliveryStats {
    pub received: i64,
    pub on_time: i64,
}

impl DeliveryStats {
    pub fn on_time_rate(&self) -> Option<f64> {
        percentage(self.on_time as f64, self.received as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorOrderStats {
    pub orders: i64,
    pub total_spend: f64,
    pub delivery: DeliveryStats,
    pub avg_lead_time_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorPerformance {
    pub vendor: Vendor,
    pub orders: i64,
    pub total_spend: f64,
    pub on_time_rate: Option<f64>,
    pub avg_lead_time_days: Option<f64>,
}

impl VendorPerformance {
    pub fn new(vendor: Vendor, stats: VendorOrderStats) -> Self {
        Self {
            vendor,
            orders: stats.orders,
            total_spend: stats.total_spend,
            on_time_rate: stats.delivery.on_time_rate(),
            avg_lead_time_days: stats.avg_lead_time_days,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcurementDashboard {
    pub by_status: Vec<SpendByStatus>,
    pub active_vendors: i64,
    pub on_time_rate: Option<f64>,
    pub top_vendors: Vec<LabelValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_order_workflow() {
        use PurchaseOrderStatus::*;
        assert!(Draft.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Received));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(!Draft.can_transition_to(Received));
        assert!(!Received.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Approved));
    }

    #[test]
    fn total_amount_sums_lines() {
        let line = |q: f64, p: f64| NewPurchaseOrderItem {
            description: Label::new("Steel").unwrap(),
            quantity: q,
            unit_price: p,
        };
        let order = NewPurchaseOrder {
            company_id: CompanyId::new(1).unwrap(),
            vendor_id: VendorId::new(1).unwrap(),
            order_date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            expected_date: None,
            items: vec![line(10.0, 2.5), line(1.0, 100.0)],
        };
        assert_eq!(order.total_amount(), 125.0);
    }

    #[test]
    fn po_number_format() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        assert_eq!(
            purchase_order_number(date, PurchaseOrderId::new(17).unwrap()),
            "PO-20250402-17"
        );
    }

    #[test]
    fn on_time_rate_without_receipts_is_none() {
        assert_eq!(DeliveryStats::default().on_time_rate(), None);
        let stats = DeliveryStats {
            received: 4,
            on_time: 3,
        };
        assert_eq!(stats.on_time_rate(), Some(75.0));
    }
}
