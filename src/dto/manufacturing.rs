use serde::Serialize;

use crate::domain::manufacturing::{BillOfMaterials, ManufacturingDashboard, WorkOrder};
use crate::pagination::Paginated;
use crate::query::DateRange;

#[derive(Debug, Serialize)]
pub struct ManufacturingDashboardPageData {
    pub dashboard: ManufacturingDashboard,
    pub range: DateRange,
}

#[derive(Debug, Serialize)]
pub struct WorkOrderListPageData {
    pub work_orders: Paginated<WorkOrder>,
    pub boms: Vec<BillOfMaterials>,
    pub can_edit: bool,
}
