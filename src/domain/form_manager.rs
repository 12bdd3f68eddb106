//! Form definitions, their fields and collected submissions.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::stats::LabelCount;
use crate::domain::types::{
    CompanyId, Email, FormFieldId, FormId, Label, SanitizedText, SubmissionId, Title, UserId,
    string_enum,
};

string_enum!(FormStatus {
    Draft => "draft",
    Published => "published",
    Archived => "archived",
});

string_enum!(FieldType {
    Text => "text",
    Textarea => "textarea",
    Number => "number",
    Email => "email",
    Date => "date",
    Checkbox => "checkbox",
    Select => "select",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: FormId,
    pub company_id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub status: FormStatus,
    pub created_by: UserId,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSettings {
    pub form_id: FormId,
    pub allow_multiple: bool,
    pub notify_email: Option<String>,
    pub success_message: Option<String>,
}

impl FormSettings {
    /// Settings assumed for forms created before settings existed.
    pub fn defaults(form_id: FormId) -> Self {
        Self {
            form_id,
            allow_multiple: true,
            notify_email: None,
            success_message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: FormFieldId,
    pub form_id: FormId,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub position: i32,
}

impl FormField {
    /// Name of the HTML input carrying this field's value.
    pub fn input_name(&self) -> String {
        format!("field_{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormDetail {
    pub form: Form,
    pub settings: FormSettings,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone)]
pub struct NewForm {
    pub company_id: CompanyId,
    pub name: Title,
    pub description: Option<SanitizedText>,
    pub category: Label,
    pub created_by: UserId,
    pub allow_multiple: bool,
    pub notify_email: Option<Email>,
    pub success_message: Option<SanitizedText>,
    /// Form whose fields are copied into the new one.
    pub template_id: Option<FormId>,
}

#[derive(Debug, Clone)]
pub struct NewFormField {
    pub form_id: FormId,
    pub label: Label,
    pub field_type: FieldType,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub id: SubmissionId,
    pub form_id: FormId,
    pub company_id: CompanyId,
    pub submitted_by: UserId,
    /// Submitted values keyed by field label.
    pub data: BTreeMap<String, String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewFormSubmission {
    pub form_id: FormId,
    pub company_id: CompanyId,
    pub submitted_by: UserId,
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormManagerDashboard {
    pub by_status: Vec<LabelCount>,
    pub submissions_last_30_days: i64,
    pub top_forms: Vec<LabelCount>,
}

/// Checks raw input values (keyed by [`FormField::input_name`]) against the
/// field definitions and returns them keyed by label.
pub fn validate_submission(
    fields: &[FormField],
    values: &HashMap<String, String>,
) -> Result<BTreeMap<String, String>, String> {
    let mut data = BTreeMap::new();

    for field in fields {
        let value = values
            .get(&field.input_name())
            .map(|v| v.trim())
            .unwrap_or_default();

        if value.is_empty() {
            if field.required {
                return Err(format!("`{}` is required", field.label));
            }
            if field.field_type == FieldType::Checkbox {
                data.insert(field.label.clone(), "false".to_string());
            }
            continue;
        }

        let normalized = match field.field_type {
            FieldType::Number => value
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(|_| value.to_string())
                .ok_or_else(|| format!("`{}` must be a number", field.label))?,
            FieldType::Email => Email::new(value)
                .map(Email::into_inner)
                .map_err(|_| format!("`{}` must be an email address", field.label))?,
            FieldType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|d| d.to_string())
                .map_err(|_| format!("`{}` must be a date (YYYY-MM-DD)", field.label))?,
            FieldType::Checkbox => "true".to_string(),
            FieldType::Text | FieldType::Textarea | FieldType::Select => value.to_string(),
        };
        data.insert(field.label.clone(), normalized);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: i32, label: &str, field_type: FieldType, required: bool) -> FormField {
        FormField {
            id: FormFieldId::new(id).unwrap(),
            form_id: FormId::new(1).unwrap(),
            label: label.to_string(),
            field_type,
            required,
            position: id,
        }
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn required_fields_must_be_present() {
        let fields = vec![field(1, "Name", FieldType::Text, true)];
        let err = validate_submission(&fields, &values(&[("field_1", "  ")])).unwrap_err();
        assert!(err.contains("Name"));
    }

    #[test]
    fn typed_fields_are_parsed() {
        let fields = vec![
            field(1, "Qty", FieldType::Number, false),
            field(2, "Mail", FieldType::Email, false),
            field(3, "When", FieldType::Date, false),
        ];
        assert!(validate_submission(&fields, &values(&[("field_1", "ten")])).is_err());
        assert!(validate_submission(&fields, &values(&[("field_2", "nope")])).is_err());
        assert!(validate_submission(&fields, &values(&[("field_3", "31/12/2025")])).is_err());

        let data = validate_submission(
            &fields,
            &values(&[
                ("field_1", "12.5"),
                ("field_2", "Buyer@Example.com"),
                ("field_3", "2025-12-31"),
            ]),
        )
        .unwrap();
        assert_eq!(data["Qty"], "12.5");
        assert_eq!(data["Mail"], "buyer@example.com");
        assert_eq!(data["When"], "2025-12-31");
    }

    #[test]
    fn unchecked_checkbox_is_false_and_unknown_inputs_are_dropped() {
        let fields = vec![field(1, "Agree", FieldType::Checkbox, false)];
        let data = validate_submission(&fields, &values(&[("other", "x")])).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data["Agree"], "false");
    }

    #[test]
    fn text_values_are_stored_verbatim() {
        let fields = vec![
            field(1, "Name", FieldType::Text, true),
            field(2, "Notes", FieldType::Textarea, false),
        ];
        let data = validate_submission(
            &fields,
            &values(&[
                ("field_1", "  John Smith & Sons "),
                ("field_2", "a/b = \"c\" <b>"),
            ]),
        )
        .unwrap();
        assert_eq!(data["Name"], "John Smith & Sons");
        assert_eq!(data["Notes"], "a/b = \"c\" <b>");
    }
}
