//! Feedback, in-app notifications and per-user preferences.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::stats::LabelCount;
use crate::domain::types::{
    CompanyId, FeedbackId, Label, NotificationId, SanitizedText, Title, TypeConstraintError,
    UserId, string_enum,
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;
pub const DEFAULT_LANGUAGE: &str = "en";

string_enum!(FeedbackStatus {
    New => "new",
    Reviewed => "reviewed",
    Resolved => "resolved",
});

string_enum!(Theme {
    Light => "light",
    Dark => "dark",
    System => "system",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub category: String,
    pub rating: i32,
    pub message: String,
    pub status: FeedbackStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub category: Label,
    pub rating: i32,
    pub message: SanitizedText,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedbackSummary {
    pub total: i64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub read_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub title: Title,
    pub body: String,
    pub link: Option<String>,
}

/// Two lowercase ASCII letters, e.g. `en` or `de`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
        let code = value.into().trim().to_ascii_lowercase();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_lowercase()) {
            Ok(Self(code))
        } else {
            Err(TypeConstraintError::InvalidValue(format!(
                "language must be a 2-letter code, got `{code}`"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub theme: Theme,
    pub language: LanguageCode,
    pub notifications_enabled: bool,
    /// `None` until the user saves preferences for the first time.
    pub updated_at: Option<NaiveDateTime>,
}

impl UserPreferences {
    pub fn defaults(company_id: CompanyId, user_id: UserId) -> Self {
        Self {
            company_id,
            user_id,
            theme: Theme::Light,
            language: LanguageCode(DEFAULT_LANGUAGE.to_string()),
            notifications_enabled: true,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UxDashboard {
    pub feedback: FeedbackSummary,
    pub by_category: Vec<LabelCount>,
    pub by_status: Vec<LabelCount>,
    pub unread_notifications: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes_are_two_letters() {
        assert_eq!(LanguageCode::new(" DE ").unwrap().as_str(), "de");
        assert!(LanguageCode::new("eng").is_err());
        assert!(LanguageCode::new("e1").is_err());
        assert!(LanguageCode::new("").is_err());
    }

    #[test]
    fn defaults_are_light_english_enabled() {
        let prefs = UserPreferences::defaults(CompanyId::new(1).unwrap(), UserId::new(2).unwrap());
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.language.as_str(), "en");
        assert!(prefs.notifications_enabled);
        assert!(prefs.updated_at.is_none());
    }
}
