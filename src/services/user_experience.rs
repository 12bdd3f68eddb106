use chrono::{NaiveDateTime, Utc};

use crate::domain::types::{FeedbackId, NotificationId};
use crate::domain::user_experience::{
    Feedback, FeedbackStatus, NewNotification, Notification, UserPreferences, UxDashboard,
};
use crate::dto::user_experience::{
    FeedbackListPageData, NotificationListPageData, UxDashboardPageData,
};
use crate::forms::user_experience::{
    FeedbackFilter, FeedbackFilterQuery, FeedbackForm, FeedbackPayload, FeedbackStatusForm,
    NotificationQuery, PreferencesForm,
};
use crate::models::auth::AuthenticatedUser;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated, Pagination};
use crate::repository::{
    FeedbackListQuery, NotificationListQuery, UserExperienceReader, UserExperienceWriter,
};
use crate::routes::{check_role, ensure_role};
use crate::services::{ServiceError, ServiceResult};
use crate::{UX_MANAGE, UX_VIEW};

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn load_dashboard<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<UxDashboardPageData>
where
    R: UserExperienceReader + ?Sized,
{
    ensure_role(user, UX_VIEW)?;

    let company_id = user.company_id()?;
    let user_id = user.user_id()?;
    let feedback = repo.feedback_summary(company_id).map_err(|err| {
        log::error!("Failed to summarise feedback: {err}");
        err
    })?;
    let dashboard = UxDashboard {
        feedback,
        by_category: repo.feedback_counts_by_category(company_id)?,
        by_status: repo.feedback_counts_by_status(company_id)?,
        unread_notifications: repo.count_unread_notifications(company_id, user_id)?,
    };
    let preferences = repo
        .get_preferences(company_id, user_id)?
        .unwrap_or_else(|| UserPreferences::defaults(company_id, user_id));

    Ok(UxDashboardPageData {
        dashboard,
        preferences,
        can_manage: check_role(UX_MANAGE, &user.roles),
    })
}

/// Anyone who can see the module may leave feedback.
pub fn submit_feedback<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: FeedbackForm,
) -> ServiceResult<Feedback>
where
    R: UserExperienceWriter + ?Sized,
{
    ensure_role(user, UX_VIEW)?;

    let payload = FeedbackPayload::try_from(form)?;
    let feedback = repo
        .create_feedback(&payload.into_domain(user.company_id()?, user.user_id()?))
        .map_err(|err| {
            log::error!("Failed to save feedback: {err}");
            err
        })?;

    log::info!(
        "Feedback {} submitted ({}, rating {})",
        feedback.id,
        feedback.category,
        feedback.rating
    );
    Ok(feedback)
}

pub fn list_feedback<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: FeedbackFilterQuery,
) -> ServiceResult<FeedbackListPageData>
where
    R: UserExperienceReader + ?Sized,
{
    ensure_role(user, UX_VIEW)?;

    let filter = FeedbackFilter::try_from(query)?;
    let mut list_query =
        FeedbackListQuery::new(user.company_id()?).paginate(filter.page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(category) = filter.category {
        list_query = list_query.category(category);
    }
    if let Some(status) = filter.status {
        list_query = list_query.status(status);
    }

    let (total, items) = repo.list_feedback(list_query).map_err(|err| {
        log::error!("Failed to list feedback: {err}");
        err
    })?;

    Ok(FeedbackListPageData {
        feedback: Paginated::new(items, Pagination::new(filter.page, DEFAULT_ITEMS_PER_PAGE), total),
        can_manage: check_role(UX_MANAGE, &user.roles),
    })
}

pub fn update_feedback_status<R>(
    repo: &R,
    user: &AuthenticatedUser,
    feedback_id: i32,
    form: FeedbackStatusForm,
) -> ServiceResult<Feedback>
where
    R: UserExperienceReader + UserExperienceWriter + ?Sized,
{
    ensure_role(user, UX_MANAGE)?;

    let company_id = user.company_id()?;
    let feedback_id = FeedbackId::new(feedback_id)?;
    let status = FeedbackStatus::try_from(form)?;

    let existing = repo
        .get_feedback(feedback_id, company_id)?
        .ok_or(ServiceError::NotFound)?;
    if existing.status == status {
        return Ok(existing);
    }

    let updated = repo
        .update_feedback_status(feedback_id, company_id, status)
        .map_err(|err| {
            log::error!("Failed to update feedback {feedback_id}: {err}");
            err
        })?;

    log::info!(
        "Feedback {} moved from {} to {}",
        updated.id,
        existing.status,
        updated.status
    );
    Ok(updated)
}

pub fn list_notifications<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: NotificationQuery,
) -> ServiceResult<NotificationListPageData>
where
    R: UserExperienceReader + ?Sized,
{
    ensure_role(user, UX_VIEW)?;

    let company_id = user.company_id()?;
    let user_id = user.user_id()?;
    let page = query.page();
    let list_query = NotificationListQuery::new(company_id, user_id)
        .unread_only(query.unread_only())
        .paginate(page, DEFAULT_ITEMS_PER_PAGE);

    let (total, items) = repo.list_notifications(list_query).map_err(|err| {
        log::error!("Failed to list notifications: {err}");
        err
    })?;

    Ok(NotificationListPageData {
        notifications: Paginated::new(items, Pagination::new(page, DEFAULT_ITEMS_PER_PAGE), total),
        unread: repo.count_unread_notifications(company_id, user_id)?,
    })
}

/// Stores a notification for a user. Used by the schedule dispatcher,
/// which has no caller identity to check.
pub fn create_notification<R>(
    repo: &R,
    notification: &NewNotification,
) -> ServiceResult<Notification>
where
    R: UserExperienceWriter + ?Sized,
{
    let created = repo.create_notification(notification).map_err(|err| {
        log::error!(
            "Failed to notify user {} of company {}: {err}",
            notification.user_id,
            notification.company_id
        );
        err
    })?;

    log::info!("Notification {} sent to user {}", created.id, created.user_id);
    Ok(created)
}

pub fn mark_notification_read<R>(
    repo: &R,
    user: &AuthenticatedUser,
    notification_id: i32,
) -> ServiceResult<Notification>
where
    R: UserExperienceWriter + ?Sized,
{
    ensure_role(user, UX_VIEW)?;

    repo.mark_notification_read(
        NotificationId::new(notification_id)?,
        user.company_id()?,
        user.user_id()?,
        now(),
    )?
    .ok_or(ServiceError::NotFound)
}

pub fn mark_all_read<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<usize>
where
    R: UserExperienceWriter + ?Sized,
{
    ensure_role(user, UX_VIEW)?;

    let updated = repo.mark_all_notifications_read(user.company_id()?, user.user_id()?, now())?;
    log::info!("Marked {updated} notifications read for user {}", user.sub);
    Ok(updated)
}

pub fn get_preferences<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<UserPreferences>
where
    R: UserExperienceReader + ?Sized,
{
    ensure_role(user, UX_VIEW)?;

    let company_id = user.company_id()?;
    let user_id = user.user_id()?;
    Ok(repo
        .get_preferences(company_id, user_id)?
        .unwrap_or_else(|| UserPreferences::defaults(company_id, user_id)))
}

pub fn save_preferences<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: PreferencesForm,
) -> ServiceResult<UserPreferences>
where
    R: UserExperienceWriter + ?Sized,
{
    ensure_role(user, UX_VIEW)?;

    let preferences = form.into_domain(user.company_id()?, user.user_id()?)?;
    let saved = repo.save_preferences(&preferences, now()).map_err(|err| {
        log::error!("Failed to save preferences for user {}: {err}", user.sub);
        err
    })?;
    Ok(saved)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::types::{CompanyId, UserId};
    use crate::domain::user_experience::{FeedbackSummary, Theme};
    use crate::repository::mock::MockRepository;
    use chrono::NaiveDate;

    fn member(roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "3".into(),
            email: "member@example.com".into(),
            name: "Member".into(),
            company_id: 2,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: 0,
        }
    }

    fn created_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn stored_feedback(status: FeedbackStatus) -> Feedback {
        Feedback {
            id: FeedbackId::new(10).unwrap(),
            company_id: CompanyId::new(2).unwrap(),
            user_id: UserId::new(3).unwrap(),
            category: "ui".into(),
            rating: 4,
            message: "Looks good".into(),
            status,
            created_at: created_at(),
        }
    }

    #[test]
    fn viewer_can_submit_feedback() {
        let mut repo = MockRepository::new();
        repo.expect_create_feedback()
            .withf(|f| f.rating == 4 && f.category.as_str() == "ui" && f.user_id.get() == 3)
            .times(1)
            .returning(|_| Ok(stored_feedback(FeedbackStatus::New)));

        let form = FeedbackForm {
            category: "UI".into(),
            rating: 4,
            message: "Looks good".into(),
        };
        let feedback = submit_feedback(&repo, &member(&[UX_VIEW]), form).unwrap();

        assert_eq!(feedback.status, FeedbackStatus::New);
    }

    #[test]
    fn viewer_cannot_change_feedback_status() {
        let repo = MockRepository::new();
        let form = FeedbackStatusForm {
            status: "resolved".into(),
        };

        let result = update_feedback_status(&repo, &member(&[UX_VIEW]), 10, form);

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn unknown_feedback_is_not_found() {
        let mut repo = MockRepository::new();
        repo.expect_get_feedback().returning(|_, _| Ok(None));
        let form = FeedbackStatusForm {
            status: "reviewed".into(),
        };

        let result = update_feedback_status(&repo, &member(&[UX_VIEW, UX_MANAGE]), 10, form);

        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[test]
    fn status_change_is_persisted() {
        let mut repo = MockRepository::new();
        repo.expect_get_feedback()
            .returning(|_, _| Ok(Some(stored_feedback(FeedbackStatus::New))));
        repo.expect_update_feedback_status()
            .withf(|_, _, status| *status == FeedbackStatus::Reviewed)
            .times(1)
            .returning(|_, _, status| Ok(stored_feedback(status)));
        let form = FeedbackStatusForm {
            status: "reviewed".into(),
        };

        let updated =
            update_feedback_status(&repo, &member(&[UX_VIEW, UX_MANAGE]), 10, form).unwrap();

        assert_eq!(updated.status, FeedbackStatus::Reviewed);
    }

    #[test]
    fn foreign_notification_is_not_found() {
        let mut repo = MockRepository::new();
        repo.expect_mark_notification_read()
            .withf(|_, company, user, _| company.get() == 2 && user.get() == 3)
            .returning(|_, _, _, _| Ok(None));

        let result = mark_notification_read(&repo, &member(&[UX_VIEW]), 99);

        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[test]
    fn missing_preferences_fall_back_to_defaults() {
        let mut repo = MockRepository::new();
        repo.expect_get_preferences().returning(|_, _| Ok(None));

        let prefs = get_preferences(&repo, &member(&[UX_VIEW])).unwrap();

        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.language.as_str(), "en");
        assert!(prefs.notifications_enabled);
    }

    #[test]
    fn dashboard_counts_only_own_unread_notifications() {
        let mut repo = MockRepository::new();
        repo.expect_feedback_summary().returning(|_| {
            Ok(FeedbackSummary {
                total: 4,
                average_rating: Some(3.5),
            })
        });
        repo.expect_feedback_counts_by_category()
            .returning(|_| Ok(vec![]));
        repo.expect_feedback_counts_by_status()
            .returning(|_| Ok(vec![]));
        repo.expect_count_unread_notifications()
            .withf(|company, user| company.get() == 2 && user.get() == 3)
            .returning(|_, _| Ok(2));
        repo.expect_get_preferences().returning(|_, _| Ok(None));

        let data = load_dashboard(&repo, &member(&[UX_VIEW])).unwrap();

        assert_eq!(data.dashboard.unread_notifications, 2);
        assert_eq!(data.dashboard.feedback.total, 4);
        assert!(!data.can_manage);
    }
}
