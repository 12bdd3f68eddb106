use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::domain::stats::LabelCount;
use crate::domain::types::{CompanyId, FeedbackId, NotificationId, UserId};
use crate::domain::user_experience::{
    Feedback, FeedbackStatus, FeedbackSummary, NewFeedback, NewNotification, Notification,
    UserPreferences,
};
use crate::models::stats::{CountRow, LabelCountRow};
use crate::models::user_experience::{
    Feedback as DbFeedback, FeedbackSummaryRow, NewFeedback as DbNewFeedback,
    NewNotification as DbNewNotification, Notification as DbNotification,
    UserPreferences as DbUserPreferences,
};
use crate::query::{Op, WhereClause};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{
    DieselRepository, FeedbackListQuery, NotificationListQuery, UserExperienceReader,
    UserExperienceWriter,
};

impl UserExperienceReader for DieselRepository {
    fn list_feedback(&self, query: FeedbackListQuery) -> RepositoryResult<(usize, Vec<Feedback>)> {
        use crate::schema::feedback;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = feedback::table
                .filter(feedback::company_id.eq(query.company_id.get()))
                .into_boxed::<Sqlite>();

            if let Some(category) = &query.category {
                items = items.filter(feedback::category.eq(category.clone()));
            }
            if let Some(status) = query.status {
                items = items.filter(feedback::status.eq(status.as_str()));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let rows = query_builder()
            .order((feedback::created_at.desc(), feedback::id.desc()))
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbFeedback>(&mut conn)?;

        let items = rows
            .into_iter()
            .map(|row| Feedback::try_from(row).map_err(RepositoryError::from))
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok((total, items))
    }

    fn get_feedback(
        &self,
        id: FeedbackId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<Feedback>> {
        use crate::schema::feedback;

        let mut conn = self.conn()?;
        let row = feedback::table
            .filter(feedback::id.eq(id.get()))
            .filter(feedback::company_id.eq(company_id.get()))
            .first::<DbFeedback>(&mut conn)
            .optional()?;

        row.map(Feedback::try_from).transpose().map_err(Into::into)
    }

    fn feedback_summary(&self, company_id: CompanyId) -> RepositoryResult<FeedbackSummary> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .query(
                "SELECT COUNT(*) AS total, AVG(rating) AS average_rating FROM feedback",
                "",
            )
            .get_result::<FeedbackSummaryRow>(&mut conn)?;

        Ok(row.into())
    }

    fn feedback_counts_by_category(
        &self,
        company_id: CompanyId,
    ) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .query(
                "SELECT category AS label, COUNT(*) AS count FROM feedback",
                " GROUP BY category ORDER BY count DESC, label",
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn feedback_counts_by_status(
        &self,
        company_id: CompanyId,
    ) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .query(
                "SELECT status AS label, COUNT(*) AS count FROM feedback",
                " GROUP BY status ORDER BY count DESC, label",
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn list_notifications(
        &self,
        query: NotificationListQuery,
    ) -> RepositoryResult<(usize, Vec<Notification>)> {
        use crate::schema::notifications;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = notifications::table
                .filter(notifications::company_id.eq(query.company_id.get()))
                .filter(notifications::user_id.eq(query.user_id.get()))
                .into_boxed::<Sqlite>();

            if query.unread_only {
                items = items.filter(notifications::read_at.is_null());
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let rows = query_builder()
            .order((notifications::created_at.desc(), notifications::id.desc()))
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbNotification>(&mut conn)?;

        let items = rows
            .into_iter()
            .map(|row| Notification::try_from(row).map_err(RepositoryError::from))
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok((total, items))
    }

    fn count_unread_notifications(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> RepositoryResult<i64> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .and("user_id", Op::Eq, user_id.get())
            .and_raw("read_at IS NULL")
            .query("SELECT COUNT(*) AS count FROM notifications", "")
            .get_result::<CountRow>(&mut conn)?;

        Ok(row.count)
    }

    fn get_preferences(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> RepositoryResult<Option<UserPreferences>> {
        use crate::schema::user_preferences;

        let mut conn = self.conn()?;
        let row = user_preferences::table
            .find((company_id.get(), user_id.get()))
            .first::<DbUserPreferences>(&mut conn)
            .optional()?;

        row.map(UserPreferences::try_from)
            .transpose()
            .map_err(Into::into)
    }
}

impl UserExperienceWriter for DieselRepository {
    fn create_feedback(&self, new_feedback: &NewFeedback) -> RepositoryResult<Feedback> {
        use crate::schema::feedback;

        let mut conn = self.conn()?;
        let created = diesel::insert_into(feedback::table)
            .values(&DbNewFeedback::from(new_feedback))
            .get_result::<DbFeedback>(&mut conn)?;

        Ok(Feedback::try_from(created)?)
    }

    fn update_feedback_status(
        &self,
        id: FeedbackId,
        company_id: CompanyId,
        status: FeedbackStatus,
    ) -> RepositoryResult<Feedback> {
        use crate::schema::feedback;

        let mut conn = self.conn()?;
        let target = feedback::table
            .filter(feedback::id.eq(id.get()))
            .filter(feedback::company_id.eq(company_id.get()));
        let updated = diesel::update(target)
            .set(feedback::status.eq(status.as_str()))
            .get_result::<DbFeedback>(&mut conn)?;

        Ok(Feedback::try_from(updated)?)
    }

    fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> RepositoryResult<Notification> {
        use crate::schema::notifications;

        let mut conn = self.conn()?;
        let created = diesel::insert_into(notifications::table)
            .values(&DbNewNotification::from(notification))
            .get_result::<DbNotification>(&mut conn)?;

        Ok(Notification::try_from(created)?)
    }

    fn mark_notification_read(
        &self,
        id: NotificationId,
        company_id: CompanyId,
        user_id: UserId,
        read_at: NaiveDateTime,
    ) -> RepositoryResult<Option<Notification>> {
        use crate::schema::notifications;

        let mut conn = self.conn()?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let existing = notifications::table
                .filter(notifications::id.eq(id.get()))
                .filter(notifications::company_id.eq(company_id.get()))
                .filter(notifications::user_id.eq(user_id.get()))
                .first::<DbNotification>(conn)
                .optional()?;

            let Some(existing) = existing else {
                return Ok(None);
            };
            // The first read time is kept.
            if existing.read_at.is_some() {
                return Ok(Some(Notification::try_from(existing)?));
            }

            let updated = diesel::update(notifications::table.find(existing.id))
                .set(notifications::read_at.eq(Some(read_at)))
                .get_result::<DbNotification>(conn)?;

            Ok(Some(Notification::try_from(updated)?))
        })
    }

    fn mark_all_notifications_read(
        &self,
        company_id: CompanyId,
        user_id: UserId,
        read_at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        use crate::schema::notifications;

        let mut conn = self.conn()?;
        let updated = diesel::update(
            notifications::table
                .filter(notifications::company_id.eq(company_id.get()))
                .filter(notifications::user_id.eq(user_id.get()))
                .filter(notifications::read_at.is_null()),
        )
        .set(notifications::read_at.eq(Some(read_at)))
        .execute(&mut conn)?;

        Ok(updated)
    }

    fn save_preferences(
        &self,
        preferences: &UserPreferences,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<UserPreferences> {
        use crate::schema::user_preferences;

        let mut conn = self.conn()?;
        let row = DbUserPreferences::from_domain(preferences, updated_at);
        let saved = diesel::insert_into(user_preferences::table)
            .values(&row)
            .on_conflict((user_preferences::company_id, user_preferences::user_id))
            .do_update()
            .set((
                user_preferences::theme.eq(&row.theme),
                user_preferences::language.eq(&row.language),
                user_preferences::notifications_enabled.eq(row.notifications_enabled),
                user_preferences::updated_at.eq(row.updated_at),
            ))
            .get_result::<DbUserPreferences>(&mut conn)?;

        Ok(UserPreferences::try_from(saved)?)
    }
}
