use serde::Deserialize;
use validator::Validate;

use crate::domain::form_manager::{FieldType, FormStatus, NewForm, NewFormField};
use crate::domain::types::{CompanyId, Email, FormId, Label, SanitizedText, Title, UserId};
use crate::forms::{FormError, checkbox, non_blank};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFormForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub allow_multiple: Option<String>,
    pub notify_email: Option<String>,
    pub success_message: Option<String>,
    /// Id of an existing form whose fields are copied.
    pub template_id: Option<String>,
}

pub struct CreateFormPayload {
    pub name: Title,
    pub description: Option<SanitizedText>,
    pub category: Label,
    pub allow_multiple: bool,
    pub notify_email: Option<Email>,
    pub success_message: Option<SanitizedText>,
    pub template_id: Option<FormId>,
}

impl TryFrom<CreateFormForm> for CreateFormPayload {
    type Error = FormError;

    fn try_from(form: CreateFormForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let notify_email = non_blank(form.notify_email)
            .map(|email| Email::new(email).map_err(|_| FormError::InvalidEmail))
            .transpose()?;

        let template_id = non_blank(form.template_id)
            .map(|raw| {
                raw.parse::<i32>()
                    .map_err(|_| FormError::Rule(format!("invalid template `{raw}`")))
                    .and_then(|id| FormId::new(id).map_err(FormError::from))
            })
            .transpose()?;

        Ok(Self {
            name: Title::new(form.name)?,
            description: SanitizedText::optional(form.description),
            category: Label::new(form.category.to_lowercase())?,
            allow_multiple: checkbox(&form.allow_multiple),
            notify_email,
            success_message: SanitizedText::optional(form.success_message),
            template_id,
        })
    }
}

impl CreateFormPayload {
    pub fn into_domain(self, company_id: CompanyId, created_by: UserId) -> NewForm {
        NewForm {
            company_id,
            name: self.name,
            description: self.description,
            category: self.category,
            created_by,
            allow_multiple: self.allow_multiple,
            notify_email: self.notify_email,
            success_message: self.success_message,
            template_id: self.template_id,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddFieldForm {
    #[validate(length(min = 1, max = 255))]
    pub label: String,
    pub field_type: String,
    pub required: Option<String>,
}

pub struct AddFieldPayload {
    pub label: Label,
    pub field_type: FieldType,
    pub required: bool,
}

impl TryFrom<AddFieldForm> for AddFieldPayload {
    type Error = FormError;

    fn try_from(form: AddFieldForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(Self {
            label: Label::new(form.label)?,
            field_type: form.field_type.parse()?,
            required: checkbox(&form.required),
        })
    }
}

impl AddFieldPayload {
    pub fn into_domain(self, form_id: FormId) -> NewFormField {
        NewFormField {
            form_id,
            label: self.label,
            field_type: self.field_type,
            required: self.required,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FormStatusForm {
    pub status: String,
}

impl TryFrom<FormStatusForm> for FormStatus {
    type Error = FormError;

    fn try_from(form: FormStatusForm) -> Result<Self, Self::Error> {
        Ok(form.status.parse()?)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FormFilterQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
}

pub struct FormFilter {
    pub status: Option<FormStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: usize,
}

impl TryFrom<FormFilterQuery> for FormFilter {
    type Error = FormError;

    fn try_from(query: FormFilterQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            status: non_blank(query.status)
                .map(|s| s.parse::<FormStatus>())
                .transpose()?,
            category: non_blank(query.category),
            search: non_blank(query.search),
            page: query.page.unwrap_or(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_form() -> CreateFormForm {
        CreateFormForm {
            name: "Supplier onboarding".into(),
            description: Some("<b>New</b> vendors".into()),
            category: "Procurement".into(),
            allow_multiple: None,
            notify_email: Some("  ".into()),
            success_message: None,
            template_id: Some("".into()),
        }
    }

    #[test]
    fn blank_optionals_are_absent() {
        let payload = CreateFormPayload::try_from(create_form()).unwrap();
        assert!(payload.notify_email.is_none());
        assert!(payload.template_id.is_none());
        assert!(!payload.allow_multiple);
        assert_eq!(payload.category.as_str(), "procurement");
    }

    #[test]
    fn notify_email_is_validated() {
        let mut form = create_form();
        form.notify_email = Some("not-an-email".into());
        assert!(matches!(
            CreateFormPayload::try_from(form),
            Err(FormError::InvalidEmail)
        ));
    }

    #[test]
    fn template_id_must_be_a_positive_number() {
        let mut form = create_form();
        form.template_id = Some("abc".into());
        assert!(CreateFormPayload::try_from(form).is_err());

        let mut form = create_form();
        form.template_id = Some("0".into());
        assert!(CreateFormPayload::try_from(form).is_err());

        let mut form = create_form();
        form.template_id = Some("12".into());
        let payload = CreateFormPayload::try_from(form).unwrap();
        assert_eq!(payload.template_id.map(FormId::get), Some(12));
    }

    #[test]
    fn field_type_must_be_known() {
        let form = AddFieldForm {
            label: "Rating".into(),
            field_type: "slider".into(),
            required: Some("on".into()),
        };
        assert!(AddFieldPayload::try_from(form).is_err());
    }

    #[test]
    fn status_filter_is_parsed() {
        let filter = FormFilter::try_from(FormFilterQuery {
            status: Some("published".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.status, Some(FormStatus::Published));
        assert_eq!(filter.page, 1);
    }
}
