//! Work orders, bills of materials and production accounting.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::stats::LabelCount;
use crate::domain::types::{
    BomId, CompanyId, Label, Title, VersionTag, WorkOrderId, percentage, string_enum,
};

string_enum!(WorkOrderStatus {
    Planned => "planned",
    InProgress => "in_progress",
    OnHold => "on_hold",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl WorkOrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Manual status changes a planner may make.
    pub fn can_transition_to(self, next: Self) -> bool {
        use WorkOrderStatus::*;
        match (self, next) {
            (Planned, InProgress) => true,
            (Planned | InProgress, OnHold) => true,
            (OnHold, InProgress) => true,
            (InProgress, Completed) => true,
            (current, Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }
}

string_enum!(BomStatus {
    Active => "active",
    Obsolete => "obsolete",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub company_id: CompanyId,
    pub order_number: String,
    pub product_name: String,
    pub bom_id: Option<BomId>,
    pub quantity: i32,
    pub completed_quantity: i32,
    pub scrap_quantity: i32,
    pub status: WorkOrderStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

/// Quantities and status after a production report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionUpdate {
    pub completed_quantity: i32,
    pub scrap_quantity: i32,
    pub status: WorkOrderStatus,
}

impl WorkOrder {
    /// Accumulates reported output. A planned order starts on its first
    /// report and completes once the planned quantity is reached.
    pub fn apply_production(
        &self,
        completed: i32,
        scrapped: i32,
    ) -> Result<ProductionUpdate, String> {
        if self.status.is_terminal() || self.status == WorkOrderStatus::OnHold {
            return Err(format!(
                "cannot record production on a {} work order",
                self.status
            ));
        }
        if completed < 0 || scrapped < 0 {
            return Err("quantities must not be negative".into());
        }
        if completed == 0 && scrapped == 0 {
            return Err("report at least one completed or scrapped unit".into());
        }

        let completed_quantity = self.completed_quantity.saturating_add(completed);
        let scrap_quantity = self.scrap_quantity.saturating_add(scrapped);
        let status = if completed_quantity >= self.quantity {
            WorkOrderStatus::Completed
        } else {
            WorkOrderStatus::InProgress
        };

        Ok(ProductionUpdate {
            completed_quantity,
            scrap_quantity,
            status,
        })
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_terminal() && self.due_date.is_some_and(|due| due < today)
    }
}

/// `WO-<YYYYMMDD>-<id>`.
pub fn work_order_number(created: NaiveDate, id: WorkOrderId) -> String {
    format!("WO-{}-{id}", created.format("%Y%m%d"))
}

#[derive(Debug, Clone)]
pub struct NewWorkOrder {
    pub company_id: CompanyId,
    pub product_name: Title,
    pub bom_id: Option<BomId>,
    pub quantity: i32,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillOfMaterials {
    pub id: BomId,
    pub company_id: CompanyId,
    pub product_name: String,
    pub version: String,
    pub status: BomStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomItem {
    pub id: i32,
    pub bom_id: BomId,
    pub component_name: String,
    pub quantity: f64,
    pub unit_cost: f64,
}

impl BomItem {
    pub fn line_cost(&self) -> f64 {
        self.quantity * self.unit_cost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BomDetail {
    pub bom: BillOfMaterials,
    pub items: Vec<BomItem>,
    /// Σ quantity × unit cost over all items.
    pub total_cost: f64,
}

impl BomDetail {
    pub fn new(bom: BillOfMaterials, items: Vec<BomItem>) -> Self {
        let total_cost = items.iter().map(BomItem::line_cost).sum();
        Self {
            bom,
            items,
            total_cost,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBomItem {
    pub component_name: Label,
    pub quantity: f64,
    pub unit_cost: f64,
}

#[derive(Debug, Clone)]
pub struct NewBillOfMaterials {
    pub company_id: CompanyId,
    pub product_name: Title,
    pub version: VersionTag,
    pub items: Vec<NewBomItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductionSummary {
    pub planned: i64,
    pub completed: i64,
    pub scrapped: i64,
    pub completion_rate: Option<f64>,
    pub scrap_rate: Option<f64>,
}

impl ProductionSummary {
    pub fn from_totals(planned: i64, completed: i64, scrapped: i64) -> Self {
        Self {
            planned,
            completed,
            scrapped,
            completion_rate: percentage(completed as f64, planned as f64),
            scrap_rate: percentage(scrapped as f64, (completed + scrapped) as f64),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManufacturingDashboard {
    pub by_status: Vec<LabelCount>,
    pub production: ProductionSummary,
    pub overdue: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: WorkOrderStatus, quantity: i32, completed: i32) -> WorkOrder {
        WorkOrder {
            id: WorkOrderId::new(12).unwrap(),
            company_id: CompanyId::new(1).unwrap(),
            order_number: "WO-20250101-12".into(),
            product_name: "Gearbox".into(),
            bom_id: None,
            quantity,
            completed_quantity: completed,
            scrap_quantity: 0,
            status,
            due_date: NaiveDate::from_ymd_opt(2025, 1, 10),
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn transitions_follow_the_workflow() {
        use WorkOrderStatus::*;
        assert!(Planned.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(OnHold));
        assert!(OnHold.can_transition_to(InProgress));
        assert!(OnHold.can_transition_to(Cancelled));
        assert!(!Planned.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(InProgress));
    }

    #[test]
    fn first_report_starts_the_order() {
        let update = order(WorkOrderStatus::Planned, 10, 0)
            .apply_production(4, 1)
            .unwrap();
        assert_eq!(update.status, WorkOrderStatus::InProgress);
        assert_eq!(update.completed_quantity, 4);
        assert_eq!(update.scrap_quantity, 1);
    }

    #[test]
    fn reaching_quantity_completes_the_order() {
        let update = order(WorkOrderStatus::InProgress, 10, 8)
            .apply_production(3, 0)
            .unwrap();
        assert_eq!(update.status, WorkOrderStatus::Completed);
        assert_eq!(update.completed_quantity, 11);
    }

    #[test]
    fn invalid_reports_are_rejected() {
        let open = order(WorkOrderStatus::InProgress, 10, 0);
        assert!(open.apply_production(0, 0).is_err());
        assert!(open.apply_production(-1, 2).is_err());
        assert!(
            order(WorkOrderStatus::Completed, 10, 10)
                .apply_production(1, 0)
                .is_err()
        );
    }

    #[test]
    fn paused_and_closed_orders_reject_production() {
        for status in [
            WorkOrderStatus::OnHold,
            WorkOrderStatus::Cancelled,
            WorkOrderStatus::Completed,
        ] {
            let err = order(status, 10, 2).apply_production(1, 0).unwrap_err();
            assert!(err.contains(status.as_str()));
        }
    }

    #[test]
    fn overdue_ignores_finished_orders() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        assert!(order(WorkOrderStatus::InProgress, 5, 0).is_overdue(today));
        assert!(!order(WorkOrderStatus::Completed, 5, 5).is_overdue(today));
    }

    #[test]
    fn summary_rates() {
        let summary = ProductionSummary::from_totals(200, 150, 50);
        assert_eq!(summary.completion_rate, Some(75.0));
        assert_eq!(summary.scrap_rate, Some(25.0));
        assert_eq!(ProductionSummary::from_totals(0, 0, 0).completion_rate, None);
    }

    #[test]
    fn bom_cost_rolls_up() {
        let bom = BillOfMaterials {
            id: BomId::new(1).unwrap(),
            company_id: CompanyId::new(1).unwrap(),
            product_name: "Gearbox".into(),
            version: "A".into(),
            status: BomStatus::Active,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        let item = |qty: f64, cost: f64| BomItem {
            id: 1,
            bom_id: bom.id,
            component_name: "Bolt".into(),
            quantity: qty,
            unit_cost: cost,
        };
        let detail = BomDetail::new(bom.clone(), vec![item(4.0, 0.5), item(2.0, 10.0)]);
        assert_eq!(detail.total_cost, 22.0);
    }

    #[test]
    fn order_number_format() {
        let created = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(
            work_order_number(created, WorkOrderId::new(42).unwrap()),
            "WO-20250309-42"
        );
    }
}
