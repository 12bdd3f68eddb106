use serde::Serialize;

use crate::domain::procurement::{ProcurementDashboard, PurchaseOrder, Vendor};
use crate::pagination::Paginated;
use crate::query::DateRange;

#[derive(Debug, Serialize)]
pub struct ProcurementDashboardPageData {
    pub dashboard: ProcurementDashboard,
    pub range: DateRange,
}

#[derive(Debug, Serialize)]
pub struct PurchaseOrderListPageData {
    pub purchase_orders: Paginated<PurchaseOrder>,
    pub vendors: Vec<Vendor>,
    pub can_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct VendorListPageData {
    pub vendors: Vec<Vendor>,
    pub search: Option<String>,
    pub can_edit: bool,
}
