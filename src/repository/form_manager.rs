use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::domain::form_manager::{
    Form, FormDetail, FormField, FormSettings, FormStatus, FormSubmission, NewForm,
    NewFormField, NewFormSubmission,
};
use crate::domain::stats::LabelCount;
use crate::domain::types::{CompanyId, FormId, UserId};
use crate::models::form_manager::{
    Form as DbForm, FormField as DbFormField, FormSettings as DbFormSettings,
    FormSubmission as DbFormSubmission, NewForm as DbNewForm, NewFormField as DbNewFormField,
    NewFormSubmission as DbNewFormSubmission,
};
use crate::models::stats::LabelCountRow;
use crate::pagination::Pagination;
use crate::query::WhereClause;
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{DieselRepository, FormListQuery, FormManagerReader, FormManagerWriter};

fn into_submissions(rows: Vec<DbFormSubmission>) -> RepositoryResult<Vec<FormSubmission>> {
    rows.into_iter()
        .map(|s| FormSubmission::try_from(s).map_err(RepositoryError::from))
        .collect()
}

fn load_fields(conn: &mut SqliteConnection, form_id: i32) -> RepositoryResult<Vec<FormField>> {
    use crate::schema::form_fields;

    form_fields::table
        .filter(form_fields::form_id.eq(form_id))
        .order((form_fields::position.asc(), form_fields::id.asc()))
        .load::<DbFormField>(conn)?
        .into_iter()
        .map(|f| FormField::try_from(f).map_err(RepositoryError::from))
        .collect()
}

fn load_settings(conn: &mut SqliteConnection, form_id: FormId) -> RepositoryResult<FormSettings> {
    use crate::schema::form_settings;

    let settings = form_settings::table
        .filter(form_settings::form_id.eq(form_id.get()))
        .first::<DbFormSettings>(conn)
        .optional()?;

    match settings {
        Some(settings) => Ok(FormSettings::try_from(settings)?),
        None => Ok(FormSettings::defaults(form_id)),
    }
}

impl FormManagerReader for DieselRepository {
    fn list_forms(&self, query: FormListQuery) -> RepositoryResult<(usize, Vec<Form>)> {
        use crate::schema::forms;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = forms::table
                .filter(forms::company_id.eq(query.company_id.get()))
                .into_boxed::<Sqlite>();

            if let Some(status) = query.status {
                items = items.filter(forms::status.eq(status.as_str()));
            }
            if let Some(category) = &query.category {
                items = items.filter(forms::category.eq(category.clone()));
            }
            if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                let pattern = format!("%{term}%");
                items = items.filter(
                    forms::name
                        .like(pattern.clone())
                        .or(forms::description.like(pattern)),
                );
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let rows = query_builder()
            .order(forms::updated_at.desc())
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbForm>(&mut conn)?;

        let forms = rows
            .into_iter()
            .map(|f| Form::try_from(f).map_err(RepositoryError::from))
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok((total, forms))
    }

    fn get_form(&self, id: FormId, company_id: CompanyId) -> RepositoryResult<Option<Form>> {
        use crate::schema::forms;

        let mut conn = self.conn()?;
        let form = forms::table
            .filter(forms::id.eq(id.get()))
            .filter(forms::company_id.eq(company_id.get()))
            .first::<DbForm>(&mut conn)
            .optional()?;

        form.map(Form::try_from).transpose().map_err(Into::into)
    }

    fn get_form_detail(
        &self,
        id: FormId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<FormDetail>> {
        use crate::schema::forms;

        let mut conn = self.conn()?;
        let Some(form) = forms::table
            .filter(forms::id.eq(id.get()))
            .filter(forms::company_id.eq(company_id.get()))
            .first::<DbForm>(&mut conn)
            .optional()?
        else {
            return Ok(None);
        };

        let fields = load_fields(&mut conn, form.id)?;
        let settings = load_settings(&mut conn, id)?;

        Ok(Some(FormDetail {
            form: Form::try_from(form)?,
            settings,
            fields,
        }))
    }

    fn has_submitted(&self, form_id: FormId, user_id: UserId) -> RepositoryResult<bool> {
        use crate::schema::form_submissions;

        let mut conn = self.conn()?;
        let count = form_submissions::table
            .filter(form_submissions::form_id.eq(form_id.get()))
            .filter(form_submissions::submitted_by.eq(user_id.get()))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count > 0)
    }

    fn list_submissions(
        &self,
        form_id: FormId,
        company_id: CompanyId,
        pagination: Pagination,
    ) -> RepositoryResult<(usize, Vec<FormSubmission>)> {
        use crate::schema::form_submissions;

        let mut conn = self.conn()?;

        let query_builder = || {
            form_submissions::table
                .filter(form_submissions::form_id.eq(form_id.get()))
                .filter(form_submissions::company_id.eq(company_id.get()))
                .into_boxed::<Sqlite>()
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let rows = query_builder()
            .order((form_submissions::created_at.desc(), form_submissions::id.desc()))
            .offset(pagination.offset())
            .limit(pagination.limit())
            .load::<DbFormSubmission>(&mut conn)?;

        Ok((total, into_submissions(rows)?))
    }

    fn all_submissions(
        &self,
        form_id: FormId,
        company_id: CompanyId,
    ) -> RepositoryResult<Vec<FormSubmission>> {
        use crate::schema::form_submissions;

        let mut conn = self.conn()?;
        let rows = form_submissions::table
            .filter(form_submissions::form_id.eq(form_id.get()))
            .filter(form_submissions::company_id.eq(company_id.get()))
            .order(form_submissions::id.asc())
            .load::<DbFormSubmission>(&mut conn)?;

        into_submissions(rows)
    }

    fn form_counts_by_status(&self, company_id: CompanyId) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .query(
                "SELECT status AS label, COUNT(*) AS count FROM forms",
                " GROUP BY status ORDER BY count DESC, label",
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn count_submissions_since(
        &self,
        company_id: CompanyId,
        since: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        use crate::schema::form_submissions;

        let mut conn = self.conn()?;
        let count = form_submissions::table
            .filter(form_submissions::company_id.eq(company_id.get()))
            .filter(form_submissions::created_at.ge(since))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count)
    }

    fn top_forms_by_submissions(
        &self,
        company_id: CompanyId,
        limit: i64,
    ) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("f.company_id", company_id)
            .query(
                "SELECT f.name AS label, COUNT(s.id) AS count \
                 FROM forms f JOIN form_submissions s ON s.form_id = f.id",
                &format!(" GROUP BY f.id, f.name ORDER BY count DESC, label LIMIT {limit}"),
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

impl FormManagerWriter for DieselRepository {
    fn create_form(&self, form: &NewForm) -> RepositoryResult<FormDetail> {
        use crate::schema::{form_fields, form_settings, forms};

        let mut conn = self.conn()?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let insertable: DbNewForm = form.into();
            let created = diesel::insert_into(forms::table)
                .values(&insertable)
                .get_result::<DbForm>(conn)?;

            diesel::insert_into(form_settings::table)
                .values(&DbFormSettings::for_new_form(created.id, form))
                .execute(conn)?;

            if let Some(template_id) = form.template_id {
                let template = forms::table
                    .filter(forms::id.eq(template_id.get()))
                    .filter(forms::company_id.eq(form.company_id.get()))
                    .select(forms::id)
                    .first::<i32>(conn)
                    .optional()?
                    .ok_or(RepositoryError::NotFound)?;

                let template_fields = form_fields::table
                    .filter(form_fields::form_id.eq(template))
                    .order((form_fields::position.asc(), form_fields::id.asc()))
                    .load::<DbFormField>(conn)?;

                let copies = template_fields
                    .iter()
                    .map(|field| DbNewFormField {
                        form_id: created.id,
                        label: &field.label,
                        field_type: &field.field_type,
                        required: field.required,
                        position: field.position,
                    })
                    .collect::<Vec<_>>();

                if !copies.is_empty() {
                    diesel::insert_into(form_fields::table)
                        .values(&copies)
                        .execute(conn)?;
                }
            }

            let form_id = FormId::new(created.id)?;
            let fields = load_fields(conn, created.id)?;
            let settings = load_settings(conn, form_id)?;

            Ok(FormDetail {
                form: Form::try_from(created)?,
                settings,
                fields,
            })
        })
    }

    fn add_form_field(&self, field: &NewFormField) -> RepositoryResult<FormField> {
        use crate::schema::form_fields;

        let mut conn = self.conn()?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let last = form_fields::table
                .filter(form_fields::form_id.eq(field.form_id.get()))
                .select(diesel::dsl::max(form_fields::position))
                .first::<Option<i32>>(conn)?;

            let created = diesel::insert_into(form_fields::table)
                .values(&DbNewFormField {
                    form_id: field.form_id.get(),
                    label: field.label.as_str(),
                    field_type: field.field_type.as_str(),
                    required: field.required,
                    position: last.unwrap_or(0) + 1,
                })
                .get_result::<DbFormField>(conn)?;

            Ok(FormField::try_from(created)?)
        })
    }

    fn update_form_status(
        &self,
        id: FormId,
        company_id: CompanyId,
        status: FormStatus,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<Form> {
        use crate::schema::forms;

        let mut conn = self.conn()?;
        let updated = diesel::update(
            forms::table
                .filter(forms::id.eq(id.get()))
                .filter(forms::company_id.eq(company_id.get())),
        )
        .set((
            forms::status.eq(status.as_str()),
            forms::updated_at.eq(updated_at),
        ))
        .get_result::<DbForm>(&mut conn)?;

        Ok(Form::try_from(updated)?)
    }

    fn delete_form(&self, id: FormId, company_id: CompanyId) -> RepositoryResult<()> {
        use crate::schema::{form_fields, form_settings, form_submissions, forms};

        let mut conn = self.conn()?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let form_id = forms::table
                .filter(forms::id.eq(id.get()))
                .filter(forms::company_id.eq(company_id.get()))
                .select(forms::id)
                .first::<i32>(conn)
                .optional()?
                .ok_or(RepositoryError::NotFound)?;

            diesel::delete(form_submissions::table.filter(form_submissions::form_id.eq(form_id)))
                .execute(conn)?;
            diesel::delete(form_fields::table.filter(form_fields::form_id.eq(form_id)))
                .execute(conn)?;
            diesel::delete(form_settings::table.filter(form_settings::form_id.eq(form_id)))
                .execute(conn)?;
            diesel::delete(forms::table.filter(forms::id.eq(form_id))).execute(conn)?;

            Ok(())
        })
    }

    fn create_submission(
        &self,
        submission: &NewFormSubmission,
    ) -> RepositoryResult<FormSubmission> {
        use crate::schema::form_submissions;

        let mut conn = self.conn()?;
        let created = diesel::insert_into(form_submissions::table)
            .values(&DbNewFormSubmission {
                form_id: submission.form_id.get(),
                company_id: submission.company_id.get(),
                submitted_by: submission.submitted_by.get(),
                data: serde_json::to_string(&submission.data)?,
            })
            .get_result::<DbFormSubmission>(&mut conn)?;

        Ok(FormSubmission::try_from(created)?)
    }
}
