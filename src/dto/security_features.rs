use serde::Serialize;

use crate::domain::security_features::{AuditLog, EncryptionKey, SecurityDashboard};
use crate::pagination::Paginated;

#[derive(Debug, Serialize)]
pub struct SecurityDashboardPageData {
    pub dashboard: SecurityDashboard,
    pub keys: Vec<EncryptionKey>,
    pub can_manage: bool,
}

#[derive(Debug, Serialize)]
pub struct AuditLogListPageData {
    pub logs: Paginated<AuditLog>,
}
