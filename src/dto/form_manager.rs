use serde::Serialize;

use crate::domain::form_manager::{Form, FormDetail, FormManagerDashboard, FormSubmission};
use crate::pagination::Paginated;

#[derive(Debug, Serialize)]
pub struct FormDashboardPageData {
    pub dashboard: FormManagerDashboard,
}

#[derive(Debug, Serialize)]
pub struct FormListPageData {
    pub forms: Paginated<Form>,
    pub can_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmissionsPageData {
    pub detail: FormDetail,
    pub submissions: Paginated<FormSubmission>,
}
