use serde::Deserialize;
use validator::Validate;

use crate::domain::types::{CompanyId, Label, SanitizedText, UserId};
use crate::domain::user_experience::{
    FeedbackStatus, LanguageCode, MAX_RATING, MIN_RATING, NewFeedback, Theme, UserPreferences,
};
use crate::forms::{FormError, checkbox, non_blank};

#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackForm {
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub rating: i32,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

pub struct FeedbackPayload {
    pub category: Label,
    pub rating: i32,
    pub message: SanitizedText,
}

impl TryFrom<FeedbackForm> for FeedbackPayload {
    type Error = FormError;

    fn try_from(form: FeedbackForm) -> Result<Self, Self::Error> {
        form.validate()?;
        if !(MIN_RATING..=MAX_RATING).contains(&form.rating) {
            return Err(FormError::Rule(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
        Ok(Self {
            category: Label::new(form.category.trim().to_lowercase())?,
            rating: form.rating,
            message: SanitizedText::new(form.message)?,
        })
    }
}

impl FeedbackPayload {
    pub fn into_domain(self, company_id: CompanyId, user_id: UserId) -> NewFeedback {
        NewFeedback {
            company_id,
            user_id,
            category: self.category,
            rating: self.rating,
            message: self.message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedbackStatusForm {
    pub status: String,
}

impl TryFrom<FeedbackStatusForm> for FeedbackStatus {
    type Error = FormError;

    fn try_from(form: FeedbackStatusForm) -> Result<Self, Self::Error> {
        Ok(form.status.trim().parse()?)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackFilterQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    pub page: Option<usize>,
}

pub struct FeedbackFilter {
    pub category: Option<String>,
    pub status: Option<FeedbackStatus>,
    pub page: usize,
}

impl TryFrom<FeedbackFilterQuery> for FeedbackFilter {
    type Error = FormError;

    fn try_from(query: FeedbackFilterQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            category: non_blank(query.category).map(|c| c.to_lowercase()),
            status: non_blank(query.status)
                .map(|s| s.parse::<FeedbackStatus>())
                .transpose()?,
            page: query.page.unwrap_or(1),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub unread_only: Option<String>,
    pub page: Option<usize>,
}

impl NotificationQuery {
    pub fn unread_only(&self) -> bool {
        checkbox(&self.unread_only)
    }

    pub fn page(&self) -> usize {
        self.page.unwrap_or(1)
    }
}

#[derive(Debug, Deserialize)]
pub struct PreferencesForm {
    pub theme: String,
    pub language: String,
    /// Checkbox; absent when unticked.
    pub notifications_enabled: Option<String>,
}

impl PreferencesForm {
    pub fn into_domain(
        self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> Result<UserPreferences, FormError> {
        Ok(UserPreferences {
            company_id,
            user_id,
            theme: self.theme.trim().parse::<Theme>()?,
            language: LanguageCode::new(self.language)?,
            notifications_enabled: checkbox(&self.notifications_enabled),
            updated_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback(rating: i32) -> FeedbackForm {
        FeedbackForm {
            category: " UI ".into(),
            rating,
            message: "The <b>dashboard</b> is slow".into(),
        }
    }

    #[test]
    fn rating_outside_range_is_rejected() {
        assert!(FeedbackPayload::try_from(feedback(0)).is_err());
        assert!(FeedbackPayload::try_from(feedback(6)).is_err());
    }

    #[test]
    fn feedback_category_is_normalized() {
        let payload = FeedbackPayload::try_from(feedback(5)).unwrap();
        assert_eq!(payload.category.as_str(), "ui");
        assert_eq!(payload.rating, 5);
    }

    #[test]
    fn unticked_checkbox_disables_notifications() {
        let prefs = PreferencesForm {
            theme: "dark".into(),
            language: "FR".into(),
            notifications_enabled: None,
        }
        .into_domain(CompanyId::new(1).unwrap(), UserId::new(1).unwrap())
        .unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.language.as_str(), "fr");
        assert!(!prefs.notifications_enabled);
    }

    #[test]
    fn unknown_theme_is_rejected() {
        let result = PreferencesForm {
            theme: "neon".into(),
            language: "en".into(),
            notifications_enabled: Some("on".into()),
        }
        .into_domain(CompanyId::new(1).unwrap(), UserId::new(1).unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn status_form_parses_known_statuses() {
        let status = FeedbackStatus::try_from(FeedbackStatusForm {
            status: "resolved".into(),
        })
        .unwrap();
        assert_eq!(status, FeedbackStatus::Resolved);
    }
}
