use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Nullable};

use crate::domain::types::{CompanyId, FeedbackId, NotificationId, TypeConstraintError, UserId};
use crate::domain::user_experience::{
    Feedback as DomainFeedback, FeedbackSummary, LanguageCode, NewFeedback as DomainNewFeedback,
    NewNotification as DomainNewNotification, Notification as DomainNotification,
    UserPreferences as DomainUserPreferences,
};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::feedback)]
pub struct Feedback {
    pub id: i32,
    pub company_id: i32,
    pub user_id: i32,
    pub category: String,
    pub rating: i32,
    pub message: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::feedback)]
pub struct NewFeedback<'a> {
    pub company_id: i32,
    pub user_id: i32,
    pub category: &'a str,
    pub rating: i32,
    pub message: &'a str,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::notifications)]
pub struct Notification {
    pub id: i32,
    pub company_id: i32,
    pub user_id: i32,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub read_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::notifications)]
pub struct NewNotification<'a> {
    pub company_id: i32,
    pub user_id: i32,
    pub title: &'a str,
    pub body: &'a str,
    pub link: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::user_preferences)]
pub struct UserPreferences {
    pub company_id: i32,
    pub user_id: i32,
    pub theme: String,
    pub language: String,
    pub notifications_enabled: bool,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, QueryableByName)]
pub struct FeedbackSummaryRow {
    #[diesel(sql_type = BigInt)]
    pub total: i64,
    #[diesel(sql_type = Nullable<Double>)]
    pub average_rating: Option<f64>,
}

impl TryFrom<Feedback> for DomainFeedback {
    type Error = TypeConstraintError;

    fn try_from(feedback: Feedback) -> Result<Self, Self::Error> {
        Ok(Self {
            id: FeedbackId::new(feedback.id)?,
            company_id: CompanyId::new(feedback.company_id)?,
            user_id: UserId::new(feedback.user_id)?,
            category: feedback.category,
            rating: feedback.rating,
            message: feedback.message,
            status: feedback.status.parse()?,
            created_at: feedback.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewFeedback> for NewFeedback<'a> {
    fn from(feedback: &'a DomainNewFeedback) -> Self {
        Self {
            company_id: feedback.company_id.get(),
            user_id: feedback.user_id.get(),
            category: feedback.category.as_str(),
            rating: feedback.rating,
            message: feedback.message.as_str(),
        }
    }
}

impl TryFrom<Notification> for DomainNotification {
    type Error = TypeConstraintError;

    fn try_from(notification: Notification) -> Result<Self, Self::Error> {
        Ok(Self {
            id: NotificationId::new(notification.id)?,
            company_id: CompanyId::new(notification.company_id)?,
            user_id: UserId::new(notification.user_id)?,
            title: notification.title,
            body: notification.body,
            link: notification.link,
            read_at: notification.read_at,
            created_at: notification.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewNotification> for NewNotification<'a> {
    fn from(notification: &'a DomainNewNotification) -> Self {
        Self {
            company_id: notification.company_id.get(),
            user_id: notification.user_id.get(),
            title: notification.title.as_str(),
            body: &notification.body,
            link: notification.link.as_deref(),
        }
    }
}

impl TryFrom<UserPreferences> for DomainUserPreferences {
    type Error = TypeConstraintError;

    fn try_from(prefs: UserPreferences) -> Result<Self, Self::Error> {
        Ok(Self {
            company_id: CompanyId::new(prefs.company_id)?,
            user_id: UserId::new(prefs.user_id)?,
            theme: prefs.theme.parse()?,
            language: LanguageCode::new(prefs.language)?,
            notifications_enabled: prefs.notifications_enabled,
            updated_at: Some(prefs.updated_at),
        })
    }
}

impl UserPreferences {
    pub fn from_domain(prefs: &DomainUserPreferences, updated_at: NaiveDateTime) -> Self {
        Self {
            company_id: prefs.company_id.get(),
            user_id: prefs.user_id.get(),
            theme: prefs.theme.as_str().to_string(),
            language: prefs.language.as_str().to_string(),
            notifications_enabled: prefs.notifications_enabled,
            updated_at,
        }
    }
}

impl From<FeedbackSummaryRow> for FeedbackSummary {
    fn from(row: FeedbackSummaryRow) -> Self {
        Self {
            total: row.total,
            average_rating: row.average_rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user_experience::{FeedbackStatus, Theme};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn stored_preferences_round_trip() {
        let stored = UserPreferences {
            company_id: 1,
            user_id: 2,
            theme: "dark".into(),
            language: "de".into(),
            notifications_enabled: false,
            updated_at: at(),
        };
        let prefs = DomainUserPreferences::try_from(stored).unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.updated_at, Some(at()));

        let row = UserPreferences::from_domain(&prefs, at());
        assert_eq!(row.theme, "dark");
        assert_eq!(row.language, "de");
    }

    #[test]
    fn feedback_status_is_parsed() {
        let feedback = DomainFeedback::try_from(Feedback {
            id: 1,
            company_id: 1,
            user_id: 1,
            category: "ui".into(),
            rating: 4,
            message: "Nice".into(),
            status: "reviewed".into(),
            created_at: at(),
        })
        .unwrap();
        assert_eq!(feedback.status, FeedbackStatus::Reviewed);
    }
}
