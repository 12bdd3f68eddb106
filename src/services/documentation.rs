//! Tutorial authoring and reading.

use chrono::{NaiveDateTime, Utc};

use crate::domain::documentation::{DocumentationDashboard, Tutorial, TutorialDetail};
use crate::domain::types::TutorialId;
use crate::dto::documentation::{DocumentationDashboardPageData, TutorialListPageData};
use crate::forms::documentation::{
    TutorialFilter, TutorialFilterQuery, TutorialForm, TutorialPayload,
};
use crate::models::auth::AuthenticatedUser;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated, Pagination};
use crate::repository::{DocumentationReader, DocumentationWriter, TutorialListQuery};
use crate::routes::{check_role, ensure_role};
use crate::services::{ServiceError, ServiceResult};
use crate::{DOCUMENTATION_MANAGE, DOCUMENTATION_VIEW};

const MOST_VIEWED: i64 = 5;

pub fn load_dashboard<R>(
    repo: &R,
    user: &AuthenticatedUser,
) -> ServiceResult<DocumentationDashboardPageData>
where
    R: DocumentationReader + ?Sized,
{
    ensure_role(user, DOCUMENTATION_VIEW)?;

    let company_id = user.company_id()?;

    let dashboard = DocumentationDashboard {
        by_category: repo.tutorial_counts_by_category(company_id)?,
        stats: repo.tutorial_stats(company_id).map_err(|err| {
            log::error!("Failed to load tutorial stats: {err}");
            err
        })?,
        most_viewed: repo.most_viewed_tutorials(company_id, MOST_VIEWED)?,
    };

    Ok(DocumentationDashboardPageData { dashboard })
}

/// Readers without edit rights only see published tutorials.
pub fn list_tutorials<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: TutorialFilterQuery,
) -> ServiceResult<TutorialListPageData>
where
    R: DocumentationReader + ?Sized,
{
    ensure_role(user, DOCUMENTATION_VIEW)?;

    let company_id = user.company_id()?;
    let filter = TutorialFilter::try_from(query)?;
    let can_edit = check_role(DOCUMENTATION_MANAGE, &user.roles);

    let mut list_query =
        TutorialListQuery::new(company_id).paginate(filter.page, DEFAULT_ITEMS_PER_PAGE);
    if !can_edit {
        list_query = list_query.published_only();
    }
    if let Some(category) = filter.category {
        list_query = list_query.category(category);
    }
    if let Some(difficulty) = filter.difficulty {
        list_query = list_query.difficulty(difficulty);
    }
    if let Some(search) = filter.search {
        list_query = list_query.search(search);
    }

    let (total, tutorials) = repo.list_tutorials(list_query).map_err(|err| {
        log::error!("Failed to list tutorials: {err}");
        err
    })?;

    Ok(TutorialListPageData {
        tutorials: Paginated::new(
            tutorials,
            Pagination::new(filter.page, DEFAULT_ITEMS_PER_PAGE),
            total,
        ),
        can_edit,
    })
}

/// Returns `None` for missing tutorials, other companies' tutorials and
/// drafts the reader may not see. A successful read counts as a view.
pub fn get_tutorial<R>(
    repo: &R,
    user: &AuthenticatedUser,
    tutorial_id: i32,
) -> ServiceResult<Option<TutorialDetail>>
where
    R: DocumentationReader + DocumentationWriter + ?Sized,
{
    ensure_role(user, DOCUMENTATION_VIEW)?;

    let company_id = user.company_id()?;
    let tutorial_id = TutorialId::new(tutorial_id)?;

    let Some(mut tutorial) = repo.get_tutorial(tutorial_id, company_id)? else {
        return Ok(None);
    };
    if !tutorial.published && !check_role(DOCUMENTATION_MANAGE, &user.roles) {
        return Ok(None);
    }

    repo.increment_tutorial_views(tutorial.id, company_id)?;
    tutorial.view_count += 1;

    let completed_at = repo.tutorial_completion(tutorial.id, user.user_id()?)?;

    Ok(Some(TutorialDetail {
        tutorial,
        completed_at,
    }))
}

pub fn create_tutorial<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: TutorialForm,
) -> ServiceResult<Tutorial>
where
    R: DocumentationWriter + ?Sized,
{
    ensure_role(user, DOCUMENTATION_MANAGE)?;

    let payload = TutorialPayload::try_from(form)?;
    let new_tutorial = payload.into_new(user.company_id()?, user.user_id()?);

    repo.create_tutorial(&new_tutorial).map_err(|err| {
        log::error!("Failed to create tutorial: {err}");
        ServiceError::from(err)
    })
}

pub fn update_tutorial<R>(
    repo: &R,
    user: &AuthenticatedUser,
    tutorial_id: i32,
    form: TutorialForm,
) -> ServiceResult<Tutorial>
where
    R: DocumentationReader + DocumentationWriter + ?Sized,
{
    ensure_role(user, DOCUMENTATION_MANAGE)?;

    let payload = TutorialPayload::try_from(form)?;
    let company_id = user.company_id()?;
    let tutorial_id = TutorialId::new(tutorial_id)?;

    repo.get_tutorial(tutorial_id, company_id)?
        .ok_or(ServiceError::NotFound)?;

    let update = payload.into_update(Utc::now().naive_utc());
    repo.update_tutorial(tutorial_id, company_id, &update)
        .map_err(|err| {
            log::error!("Failed to update tutorial {tutorial_id}: {err}");
            ServiceError::from(err)
        })
}

/// Marks the tutorial as completed. Repeating it keeps the first timestamp.
pub fn complete_tutorial<R>(
    repo: &R,
    user: &AuthenticatedUser,
    tutorial_id: i32,
) -> ServiceResult<NaiveDateTime>
where
    R: DocumentationReader + DocumentationWriter + ?Sized,
{
    ensure_role(user, DOCUMENTATION_VIEW)?;

    let company_id = user.company_id()?;
    let tutorial = repo
        .get_tutorial(TutorialId::new(tutorial_id)?, company_id)?
        .filter(|t| t.published || check_role(DOCUMENTATION_MANAGE, &user.roles))
        .ok_or(ServiceError::NotFound)?;

    let completed_at = repo.complete_tutorial(
        tutorial.id,
        user.user_id()?,
        company_id,
        Utc::now().naive_utc(),
    )?;

    Ok(completed_at)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::documentation::{TutorialDifficulty, TutorialStats};
    use crate::domain::types::{CompanyId, UserId};
    use chrono::NaiveDate;

    use crate::repository::mock::MockRepository;

    fn reader() -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "4".into(),
            email: "reader@example.com".into(),
            name: "Reader".into(),
            company_id: 2,
            roles: vec![DOCUMENTATION_VIEW.to_string()],
            exp: 0,
        }
    }

    fn tutorial(published: bool) -> Tutorial {
        let at = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Tutorial {
            id: TutorialId::new(7).unwrap(),
            company_id: CompanyId::new(2).unwrap(),
            title: "Cycle counting".into(),
            category: "warehouse".into(),
            difficulty: TutorialDifficulty::Beginner,
            content: "<p>Count</p>".into(),
            published,
            view_count: 3,
            created_by: UserId::new(1).unwrap(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn readers_only_list_published_tutorials() {
        let mut repo = MockRepository::new();
        repo.expect_list_tutorials()
            .withf(|query| query.published_only && query.company_id.get() == 2)
            .times(1)
            .returning(|_| Ok((0, vec![])));

        let data = list_tutorials(&repo, &reader(), TutorialFilterQuery::default()).unwrap();

        assert!(!data.can_edit);
    }

    #[test]
    fn drafts_are_hidden_from_readers() {
        let mut repo = MockRepository::new();
        repo.expect_get_tutorial()
            .returning(|_, _| Ok(Some(tutorial(false))));
        repo.expect_increment_tutorial_views().times(0);

        let result = get_tutorial(&repo, &reader(), 7).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn reading_counts_a_view_and_reports_completion() {
        let mut repo = MockRepository::new();
        repo.expect_get_tutorial()
            .returning(|_, _| Ok(Some(tutorial(true))));
        repo.expect_increment_tutorial_views()
            .times(1)
            .returning(|_, _| Ok(()));
        repo.expect_tutorial_completion()
            .withf(|_, user| user.get() == 4)
            .returning(|_, _| Ok(None));

        let detail = get_tutorial(&repo, &reader(), 7).unwrap().unwrap();

        assert_eq!(detail.tutorial.view_count, 4);
        assert!(detail.completed_at.is_none());
    }

    #[test]
    fn missing_tutorial_is_none() {
        let mut repo = MockRepository::new();
        repo.expect_get_tutorial().returning(|_, _| Ok(None));

        assert!(get_tutorial(&repo, &reader(), 99).unwrap().is_none());
    }

    #[test]
    fn creating_requires_manage_permission() {
        let mut repo = MockRepository::new();
        repo.expect_create_tutorial().times(0);
        let form = TutorialForm {
            title: "T".into(),
            category: "c".into(),
            difficulty: "beginner".into(),
            content: "body".into(),
            published: None,
        };

        let result = create_tutorial(&repo, &reader(), form);

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn completion_returns_stored_timestamp() {
        let first = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let mut repo = MockRepository::new();
        repo.expect_get_tutorial()
            .returning(|_, _| Ok(Some(tutorial(true))));
        repo.expect_complete_tutorial()
            .times(1)
            .returning(move |_, _, _, _| Ok(first));

        assert_eq!(complete_tutorial(&repo, &reader(), 7).unwrap(), first);
    }

    #[test]
    fn dashboard_collects_stats() {
        let mut repo = MockRepository::new();
        repo.expect_tutorial_counts_by_category()
            .returning(|_| Ok(vec![]));
        repo.expect_tutorial_stats().returning(|_| {
            Ok(TutorialStats {
                published: 2,
                drafts: 1,
                total_views: 10,
                completions: 4,
            })
        });
        repo.expect_most_viewed_tutorials()
            .withf(|_, limit| *limit == 5)
            .returning(|_, _| Ok(vec![tutorial(true)]));

        let data = load_dashboard(&repo, &reader()).unwrap();

        assert_eq!(data.dashboard.stats.total_views, 10);
        assert_eq!(data.dashboard.most_viewed.len(), 1);
    }
}
