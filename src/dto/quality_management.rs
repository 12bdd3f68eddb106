use serde::Serialize;

use crate::domain::quality_management::{
    Capa, NonConformance, QualityAudit, QualityCheck, QualityDashboard,
};
use crate::pagination::Paginated;
use crate::query::DateRange;

#[derive(Debug, Serialize)]
pub struct QualityDashboardPageData {
    pub dashboard: QualityDashboard,
    pub range: DateRange,
}

#[derive(Debug, Serialize)]
pub struct QualityCheckListPageData {
    pub checks: Paginated<QualityCheck>,
    pub can_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct NonConformanceListPageData {
    pub non_conformances: Paginated<NonConformance>,
    pub capas: Vec<Capa>,
    pub can_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct AuditListPageData {
    pub audits: Vec<QualityAudit>,
    pub can_edit: bool,
}
