use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::form_manager::{
    Form as DomainForm, FormField as DomainFormField, FormSettings as DomainFormSettings,
    FormSubmission as DomainFormSubmission, NewForm as DomainNewForm,
};
use crate::domain::types::{
    CompanyId, FormFieldId, FormId, SubmissionId, TypeConstraintError, UserId,
};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::forms)]
pub struct Form {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub status: String,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::forms)]
pub struct NewForm<'a> {
    pub company_id: i32,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub category: &'a str,
    pub status: &'a str,
    pub created_by: i32,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::form_settings)]
pub struct FormSettings {
    pub form_id: i32,
    pub allow_multiple: bool,
    pub notify_email: Option<String>,
    pub success_message: Option<String>,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::form_fields)]
pub struct FormField {
    pub id: i32,
    pub form_id: i32,
    pub label: String,
    pub field_type: String,
    pub required: bool,
    pub position: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::form_fields)]
pub struct NewFormField<'a> {
    pub form_id: i32,
    pub label: &'a str,
    pub field_type: &'a str,
    pub required: bool,
    pub position: i32,
}

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::form_submissions)]
pub struct FormSubmission {
    pub id: i32,
    pub form_id: i32,
    pub company_id: i32,
    pub submitted_by: i32,
    pub data: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::form_submissions)]
pub struct NewFormSubmission {
    pub form_id: i32,
    pub company_id: i32,
    pub submitted_by: i32,
    pub data: String,
}

impl TryFrom<Form> for DomainForm {
    type Error = TypeConstraintError;

    fn try_from(form: Form) -> Result<Self, Self::Error> {
        Ok(Self {
            id: FormId::new(form.id)?,
            company_id: CompanyId::new(form.company_id)?,
            name: form.name,
            description: form.description,
            category: form.category,
            status: form.status.parse()?,
            created_by: UserId::new(form.created_by)?,
            created_at: form.created_at,
            updated_at: form.updated_at,
        })
    }
}

impl<'a> From<&'a DomainNewForm> for NewForm<'a> {
    fn from(form: &'a DomainNewForm) -> Self {
        Self {
            company_id: form.company_id.get(),
            name: form.name.as_str(),
            description: form.description.as_ref().map(|d| d.as_str()),
            category: form.category.as_str(),
            status: "draft",
            created_by: form.created_by.get(),
        }
    }
}

impl FormSettings {
    pub fn for_new_form(form_id: i32, form: &DomainNewForm) -> Self {
        Self {
            form_id,
            allow_multiple: form.allow_multiple,
            notify_email: form.notify_email.as_ref().map(|e| e.as_str().to_string()),
            success_message: form
                .success_message
                .as_ref()
                .map(|m| m.as_str().to_string()),
        }
    }
}

impl TryFrom<FormSettings> for DomainFormSettings {
    type Error = TypeConstraintError;

    fn try_from(settings: FormSettings) -> Result<Self, Self::Error> {
        Ok(Self {
            form_id: FormId::new(settings.form_id)?,
            allow_multiple: settings.allow_multiple,
            notify_email: settings.notify_email,
            success_message: settings.success_message,
        })
    }
}

impl TryFrom<FormField> for DomainFormField {
    type Error = TypeConstraintError;

    fn try_from(field: FormField) -> Result<Self, Self::Error> {
        Ok(Self {
            id: FormFieldId::new(field.id)?,
            form_id: FormId::new(field.form_id)?,
            label: field.label,
            field_type: field.field_type.parse()?,
            required: field.required,
            position: field.position,
        })
    }
}

impl TryFrom<FormSubmission> for DomainFormSubmission {
    type Error = TypeConstraintError;

    fn try_from(submission: FormSubmission) -> Result<Self, Self::Error> {
        let data = serde_json::from_str::<BTreeMap<String, String>>(&submission.data)
            .map_err(|_| TypeConstraintError::InvalidValue(submission.data.clone()))?;
        Ok(Self {
            id: SubmissionId::new(submission.id)?,
            form_id: FormId::new(submission.form_id)?,
            company_id: CompanyId::new(submission.company_id)?,
            submitted_by: UserId::new(submission.submitted_by)?,
            data,
            created_at: submission.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, 3)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn submission_data_is_decoded_from_json() {
        let row = FormSubmission {
            id: 1,
            form_id: 2,
            company_id: 3,
            submitted_by: 4,
            data: r#"{"Name":"Ada","Qty":"3"}"#.into(),
            created_at: at(),
        };
        let submission = DomainFormSubmission::try_from(row).unwrap();
        assert_eq!(submission.data["Name"], "Ada");
        assert_eq!(submission.data.len(), 2);
    }

    #[test]
    fn corrupt_submission_data_is_rejected() {
        let row = FormSubmission {
            id: 1,
            form_id: 2,
            company_id: 3,
            submitted_by: 4,
            data: "not json".into(),
            created_at: at(),
        };
        assert!(DomainFormSubmission::try_from(row).is_err());
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        let row = FormField {
            id: 1,
            form_id: 1,
            label: "Colour".into(),
            field_type: "colour-picker".into(),
            required: false,
            position: 1,
        };
        assert!(DomainFormField::try_from(row).is_err());
    }
}
