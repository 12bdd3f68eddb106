//! Form builder: definitions, fields, submissions and exports.

use std::collections::HashMap;

use chrono::{Duration, Utc};

use crate::domain::form_manager::{
    Form, FormDetail, FormField, FormManagerDashboard, FormStatus, FormSubmission,
    NewFormSubmission, validate_submission,
};
use crate::domain::types::FormId;
use crate::dto::form_manager::{FormDashboardPageData, FormListPageData, SubmissionsPageData};
use crate::forms::form_manager::{
    AddFieldForm, AddFieldPayload, CreateFormForm, CreateFormPayload, FormFilter,
    FormFilterQuery, FormStatusForm,
};
use crate::models::auth::AuthenticatedUser;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated, Pagination};
use crate::repository::{FormListQuery, FormManagerReader, FormManagerWriter};
use crate::routes::{check_role, ensure_role};
use crate::services::{ServiceError, ServiceResult, write_csv};
use crate::{FORM_MANAGER_MANAGE, FORM_MANAGER_VIEW};

const TOP_FORMS: i64 = 5;
const RECENT_DAYS: i64 = 30;

pub fn load_dashboard<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<FormDashboardPageData>
where
    R: FormManagerReader + ?Sized,
{
    ensure_role(user, FORM_MANAGER_VIEW)?;

    let company_id = user.company_id()?;
    let since = Utc::now().naive_utc() - Duration::days(RECENT_DAYS);

    let dashboard = FormManagerDashboard {
        by_status: repo.form_counts_by_status(company_id)?,
        submissions_last_30_days: repo.count_submissions_since(company_id, since)?,
        top_forms: repo
            .top_forms_by_submissions(company_id, TOP_FORMS)
            .map_err(|err| {
                log::error!("Failed to rank forms: {err}");
                err
            })?,
    };

    Ok(FormDashboardPageData { dashboard })
}

pub fn list_forms<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: FormFilterQuery,
) -> ServiceResult<FormListPageData>
where
    R: FormManagerReader + ?Sized,
{
    ensure_role(user, FORM_MANAGER_VIEW)?;

    let company_id = user.company_id()?;
    let filter = FormFilter::try_from(query)?;

    let mut list_query =
        FormListQuery::new(company_id).paginate(filter.page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(status) = filter.status {
        list_query = list_query.status(status);
    }
    if let Some(category) = filter.category {
        list_query = list_query.category(category);
    }
    if let Some(search) = filter.search {
        list_query = list_query.search(search);
    }

    let (total, forms) = repo.list_forms(list_query).map_err(|err| {
        log::error!("Failed to list forms: {err}");
        err
    })?;

    Ok(FormListPageData {
        forms: Paginated::new(
            forms,
            Pagination::new(filter.page, DEFAULT_ITEMS_PER_PAGE),
            total,
        ),
        can_edit: check_role(FORM_MANAGER_MANAGE, &user.roles),
    })
}

/// `None` when the form does not exist in the caller's company.
pub fn get_form<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form_id: i32,
) -> ServiceResult<Option<FormDetail>>
where
    R: FormManagerReader + ?Sized,
{
    ensure_role(user, FORM_MANAGER_VIEW)?;

    let detail = repo.get_form_detail(FormId::new(form_id)?, user.company_id()?)?;
    Ok(detail)
}

pub fn create_form<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: CreateFormForm,
) -> ServiceResult<FormDetail>
where
    R: FormManagerReader + FormManagerWriter + ?Sized,
{
    ensure_role(user, FORM_MANAGER_MANAGE)?;

    let payload = CreateFormPayload::try_from(form)?;
    let company_id = user.company_id()?;

    if let Some(template_id) = payload.template_id {
        if repo.get_form(template_id, company_id)?.is_none() {
            return Err(ServiceError::Form("template form not found".into()));
        }
    }

    let new_form = payload.into_domain(company_id, user.user_id()?);
    let detail = repo.create_form(&new_form).map_err(|err| {
        log::error!("Failed to create form: {err}");
        ServiceError::from(err)
    })?;

    log::info!(
        "Created form {} with {} fields for company {company_id}",
        detail.form.id,
        detail.fields.len()
    );

    Ok(detail)
}

pub fn add_field<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form_id: i32,
    form: AddFieldForm,
) -> ServiceResult<FormField>
where
    R: FormManagerReader + FormManagerWriter + ?Sized,
{
    ensure_role(user, FORM_MANAGER_MANAGE)?;

    let payload = AddFieldPayload::try_from(form)?;
    let target = repo
        .get_form(FormId::new(form_id)?, user.company_id()?)?
        .ok_or(ServiceError::NotFound)?;

    let field = repo
        .add_form_field(&payload.into_domain(target.id))
        .map_err(|err| {
            log::error!("Failed to add field to form {}: {err}", target.id);
            err
        })?;

    Ok(field)
}

pub fn update_status<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form_id: i32,
    form: FormStatusForm,
) -> ServiceResult<Form>
where
    R: FormManagerReader + FormManagerWriter + ?Sized,
{
    ensure_role(user, FORM_MANAGER_MANAGE)?;

    let status = FormStatus::try_from(form)?;
    let company_id = user.company_id()?;
    let target = repo
        .get_form(FormId::new(form_id)?, company_id)?
        .ok_or(ServiceError::NotFound)?;

    let updated =
        repo.update_form_status(target.id, company_id, status, Utc::now().naive_utc())?;
    Ok(updated)
}

pub fn delete_form<R>(repo: &R, user: &AuthenticatedUser, form_id: i32) -> ServiceResult<()>
where
    R: FormManagerWriter + ?Sized,
{
    ensure_role(user, FORM_MANAGER_MANAGE)?;

    let form_id = FormId::new(form_id)?;
    let company_id = user.company_id()?;
    repo.delete_form(form_id, company_id).map_err(|err| {
        log::error!("Failed to delete form {form_id}: {err}");
        ServiceError::from(err)
    })?;

    log::info!("Deleted form {form_id} of company {company_id}");
    Ok(())
}

/// Stores one submission of a published form.
///
/// `values` are the raw inputs keyed by `field_<id>`.
pub fn submit_form<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form_id: i32,
    values: HashMap<String, String>,
) -> ServiceResult<FormSubmission>
where
    R: FormManagerReader + FormManagerWriter + ?Sized,
{
    ensure_role(user, FORM_MANAGER_VIEW)?;

    let company_id = user.company_id()?;
    let user_id = user.user_id()?;
    let detail = repo
        .get_form_detail(FormId::new(form_id)?, company_id)?
        .ok_or(ServiceError::NotFound)?;

    if detail.form.status != FormStatus::Published {
        return Err(ServiceError::Conflict(
            "form is not accepting submissions".into(),
        ));
    }

    let data = validate_submission(&detail.fields, &values).map_err(ServiceError::Form)?;

    if !detail.settings.allow_multiple && repo.has_submitted(detail.form.id, user_id)? {
        return Err(ServiceError::Conflict(
            "you have already submitted this form".into(),
        ));
    }

    let submission = repo
        .create_submission(&NewFormSubmission {
            form_id: detail.form.id,
            company_id,
            submitted_by: user_id,
            data,
        })
        .map_err(|err| {
            log::error!("Failed to store submission for form {}: {err}", detail.form.id);
            err
        })?;

    Ok(submission)
}

pub fn list_submissions<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form_id: i32,
    page: usize,
) -> ServiceResult<SubmissionsPageData>
where
    R: FormManagerReader + ?Sized,
{
    ensure_role(user, FORM_MANAGER_VIEW)?;

    let company_id = user.company_id()?;
    let detail = repo
        .get_form_detail(FormId::new(form_id)?, company_id)?
        .ok_or(ServiceError::NotFound)?;

    let pagination = Pagination::new(page, DEFAULT_ITEMS_PER_PAGE);
    let (total, submissions) =
        repo.list_submissions(detail.form.id, company_id, pagination)?;

    Ok(SubmissionsPageData {
        detail,
        submissions: Paginated::new(submissions, pagination, total),
    })
}

/// One column per field label followed by `submitted_by` and `created_at`.
pub fn export_submissions_csv<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form_id: i32,
) -> ServiceResult<String>
where
    R: FormManagerReader + ?Sized,
{
    ensure_role(user, FORM_MANAGER_VIEW)?;

    let company_id = user.company_id()?;
    let detail = repo
        .get_form_detail(FormId::new(form_id)?, company_id)?
        .ok_or(ServiceError::NotFound)?;
    let submissions = repo.all_submissions(detail.form.id, company_id)?;

    let mut header: Vec<String> = detail.fields.iter().map(|f| f.label.clone()).collect();
    header.push("submitted_by".into());
    header.push("created_at".into());

    let records = submissions.iter().map(|submission| {
        let mut record: Vec<String> = detail
            .fields
            .iter()
            .map(|f| submission.data.get(&f.label).cloned().unwrap_or_default())
            .collect();
        record.push(submission.submitted_by.to_string());
        record.push(submission.created_at.format("%Y-%m-%d %H:%M:%S").to_string());
        record
    });

    write_csv(&header, records)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::form_manager::{FieldType, FormSettings};
    use crate::domain::types::{CompanyId, FormFieldId, SubmissionId, UserId};
    use crate::repository::mock::MockRepository;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn member() -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "6".into(),
            email: "member@example.com".into(),
            name: "Member".into(),
            company_id: 3,
            roles: vec![FORM_MANAGER_VIEW.to_string()],
            exp: 0,
        }
    }

    fn manager() -> AuthenticatedUser {
        AuthenticatedUser {
            roles: vec![FORM_MANAGER_VIEW.to_string(), FORM_MANAGER_MANAGE.to_string()],
            ..member()
        }
    }

    fn at() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    fn detail(status: FormStatus, allow_multiple: bool) -> FormDetail {
        let form_id = FormId::new(4).unwrap();
        FormDetail {
            form: Form {
                id: form_id,
                company_id: CompanyId::new(3).unwrap(),
                name: "Incident".into(),
                description: None,
                category: "safety".into(),
                status,
                created_by: UserId::new(1).unwrap(),
                created_at: at(),
                updated_at: at(),
            },
            settings: FormSettings {
                allow_multiple,
                ..FormSettings::defaults(form_id)
            },
            fields: vec![
                FormField {
                    id: FormFieldId::new(1).unwrap(),
                    form_id,
                    label: "Where".into(),
                    field_type: FieldType::Text,
                    required: true,
                    position: 1,
                },
                FormField {
                    id: FormFieldId::new(2).unwrap(),
                    form_id,
                    label: "Injured".into(),
                    field_type: FieldType::Checkbox,
                    required: false,
                    position: 2,
                },
            ],
        }
    }

    fn values(where_: &str) -> HashMap<String, String> {
        HashMap::from([("field_1".to_string(), where_.to_string())])
    }

    fn stored(data: BTreeMap<String, String>) -> FormSubmission {
        FormSubmission {
            id: SubmissionId::new(9).unwrap(),
            form_id: FormId::new(4).unwrap(),
            company_id: CompanyId::new(3).unwrap(),
            submitted_by: UserId::new(6).unwrap(),
            data,
            created_at: at(),
        }
    }

    #[test]
    fn draft_forms_reject_submissions() {
        let mut repo = MockRepository::new();
        repo.expect_get_form_detail()
            .returning(|_, _| Ok(Some(detail(FormStatus::Draft, true))));
        repo.expect_create_submission().times(0);

        let result = submit_form(&repo, &member(), 4, values("Dock 2"));

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn missing_required_value_is_a_form_error() {
        let mut repo = MockRepository::new();
        repo.expect_get_form_detail()
            .returning(|_, _| Ok(Some(detail(FormStatus::Published, true))));
        repo.expect_create_submission().times(0);

        let result = submit_form(&repo, &member(), 4, values(" "));

        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn second_submission_conflicts_when_single_use() {
        let mut repo = MockRepository::new();
        repo.expect_get_form_detail()
            .returning(|_, _| Ok(Some(detail(FormStatus::Published, false))));
        repo.expect_has_submitted()
            .withf(|_, user| user.get() == 6)
            .returning(|_, _| Ok(true));
        repo.expect_create_submission().times(0);

        let result = submit_form(&repo, &member(), 4, values("Dock 2"));

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn submission_is_keyed_by_label() {
        let mut repo = MockRepository::new();
        repo.expect_get_form_detail()
            .returning(|_, _| Ok(Some(detail(FormStatus::Published, true))));
        repo.expect_create_submission()
            .withf(|s| s.data["Where"] == "Dock 2" && s.data["Injured"] == "false")
            .times(1)
            .returning(|s| Ok(stored(s.data.clone())));

        let submission = submit_form(&repo, &member(), 4, values("Dock 2")).unwrap();

        assert_eq!(submission.data.len(), 2);
    }

    #[test]
    fn foreign_template_is_rejected_before_insert() {
        let mut repo = MockRepository::new();
        repo.expect_get_form().returning(|_, _| Ok(None));
        repo.expect_create_form().times(0);
        let form = CreateFormForm {
            name: "Copy".into(),
            description: None,
            category: "safety".into(),
            allow_multiple: Some("on".into()),
            notify_email: None,
            success_message: None,
            template_id: Some("77".into()),
        };

        let result = create_form(&repo, &manager(), form);

        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn members_cannot_delete_forms() {
        let mut repo = MockRepository::new();
        repo.expect_delete_form().times(0);

        assert!(matches!(
            delete_form(&repo, &member(), 4),
            Err(ServiceError::Unauthorized)
        ));
    }

    #[test]
    fn csv_export_has_label_columns() {
        let mut repo = MockRepository::new();
        repo.expect_get_form_detail()
            .returning(|_, _| Ok(Some(detail(FormStatus::Published, true))));
        repo.expect_all_submissions().returning(|_, _| {
            Ok(vec![stored(BTreeMap::from([
                ("Where".to_string(), "Dock 2".to_string()),
                ("Injured".to_string(), "false".to_string()),
            ]))])
        });

        let csv = export_submissions_csv(&repo, &member(), 4).unwrap();

        assert_eq!(
            csv,
            "Where,Injured,submitted_by,created_at\nDock 2,false,6,2025-06-01 12:30:00\n"
        );
    }
}
