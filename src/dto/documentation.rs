use serde::Serialize;

use crate::domain::documentation::{DocumentationDashboard, Tutorial};
use crate::pagination::Paginated;

#[derive(Debug, Serialize)]
pub struct TutorialListPageData {
    pub tutorials: Paginated<Tutorial>,
    pub can_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct DocumentationDashboardPageData {
    pub dashboard: DocumentationDashboard,
}
