use serde::Serialize;

use crate::domain::user_experience::{Feedback, Notification, UserPreferences, UxDashboard};
use crate::pagination::Paginated;

#[derive(Debug, Serialize)]
pub struct UxDashboardPageData {
    pub dashboard: UxDashboard,
    pub preferences: UserPreferences,
    pub can_manage: bool,
}

#[derive(Debug, Serialize)]
pub struct FeedbackListPageData {
    pub feedback: Paginated<Feedback>,
    pub can_manage: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationListPageData {
    pub notifications: Paginated<Notification>,
    pub unread: i64,
}
