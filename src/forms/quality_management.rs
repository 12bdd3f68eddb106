use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::domain::quality_management::{
    CapaActionType, CapaStatus, CheckResult, Finding, NewCapa, NewQualityAudit, NewQualityCheck,
    NonConformanceStatus, Severity, validate_sample,
};
use crate::domain::types::{
    CompanyId, Label, NonConformanceId, SanitizedText, Title, UserId, WorkOrderId,
};
use crate::forms::{FormError, non_blank, parse_date};
use crate::query::DateRange;

#[derive(Debug, Deserialize, Validate)]
pub struct QualityCheckForm {
    pub work_order_id: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub check_type: String,
    pub result: String,
    pub sample_size: i32,
    #[serde(default)]
    pub defects_found: i32,
    pub notes: Option<String>,
    /// Only used when the check fails.
    pub severity: Option<String>,
    pub description: Option<String>,
}

pub struct QualityCheckPayload {
    pub work_order_id: Option<WorkOrderId>,
    pub check_type: Label,
    pub result: CheckResult,
    pub sample_size: i32,
    pub defects_found: i32,
    pub notes: Option<SanitizedText>,
    pub finding: Option<Finding>,
}

impl TryFrom<QualityCheckForm> for QualityCheckPayload {
    type Error = FormError;

    fn try_from(form: QualityCheckForm) -> Result<Self, Self::Error> {
        form.validate()?;
        validate_sample(form.sample_size, form.defects_found).map_err(FormError::Rule)?;

        let work_order_id = non_blank(form.work_order_id)
            .map(|raw| {
                raw.parse::<i32>()
                    .map_err(|_| FormError::Rule(format!("invalid work order `{raw}`")))
                    .and_then(|id| WorkOrderId::new(id).map_err(FormError::from))
            })
            .transpose()?;
        let check_type = Label::new(form.check_type.to_lowercase())?;
        let result = form.result.parse::<CheckResult>()?;
        let notes = SanitizedText::optional(form.notes);

        let finding = if result == CheckResult::Fail {
            let severity = non_blank(form.severity)
                .map(|s| s.parse::<Severity>())
                .transpose()?
                .unwrap_or(Severity::Minor);
            let description = match SanitizedText::optional(form.description) {
                Some(description) => description,
                None => match &notes {
                    Some(notes) => notes.clone(),
                    None => SanitizedText::new(format!("Failed {check_type} inspection"))?,
                },
            };
            Some(Finding {
                severity,
                description,
            })
        } else {
            None
        };

        Ok(Self {
            work_order_id,
            check_type,
            result,
            sample_size: form.sample_size,
            defects_found: form.defects_found,
            notes,
            finding,
        })
    }
}

impl QualityCheckPayload {
    pub fn into_domain(self, company_id: CompanyId, inspector_id: UserId) -> NewQualityCheck {
        NewQualityCheck {
            company_id,
            work_order_id: self.work_order_id,
            check_type: self.check_type,
            inspector_id,
            result: self.result,
            sample_size: self.sample_size,
            defects_found: self.defects_found,
            notes: self.notes,
            finding: self.finding,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct QualityCheckFilterQuery {
    pub result: Option<String>,
    pub check_type: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<usize>,
}

pub struct QualityCheckFilter {
    pub result: Option<CheckResult>,
    pub check_type: Option<String>,
    pub range: DateRange,
    pub page: usize,
}

impl TryFrom<QualityCheckFilterQuery> for QualityCheckFilter {
    type Error = FormError;

    fn try_from(query: QualityCheckFilterQuery) -> Result<Self, Self::Error> {
        let range = DateRange::parse(query.date_from.as_deref(), query.date_to.as_deref());
        if range.is_inverted() {
            return Err(FormError::InvertedDateRange);
        }
        Ok(Self {
            result: non_blank(query.result)
                .map(|r| r.parse::<CheckResult>())
                .transpose()?,
            check_type: non_blank(query.check_type).map(|t| t.to_lowercase()),
            range,
            page: query.page.unwrap_or(1),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NonConformanceFilterQuery {
    pub status: Option<String>,
    pub severity: Option<String>,
    pub page: Option<usize>,
}

pub struct NonConformanceFilter {
    pub status: Option<NonConformanceStatus>,
    pub severity: Option<Severity>,
    pub page: usize,
}

impl TryFrom<NonConformanceFilterQuery> for NonConformanceFilter {
    type Error = FormError;

    fn try_from(query: NonConformanceFilterQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            status: non_blank(query.status)
                .map(|s| s.parse::<NonConformanceStatus>())
                .transpose()?,
            severity: non_blank(query.severity)
                .map(|s| s.parse::<Severity>())
                .transpose()?,
            page: query.page.unwrap_or(1),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AuditForm {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub audit_type: String,
    #[validate(length(min = 1, max = 255))]
    pub auditor: String,
    pub scheduled_date: String,
}

pub struct AuditPayload {
    pub title: Title,
    pub audit_type: Label,
    pub auditor: Title,
    pub scheduled_date: NaiveDate,
}

impl TryFrom<AuditForm> for AuditPayload {
    type Error = FormError;

    fn try_from(form: AuditForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(Self {
            title: Title::new(form.title)?,
            audit_type: Label::new(form.audit_type.to_lowercase())?,
            auditor: Title::new(form.auditor)?,
            scheduled_date: parse_date(&form.scheduled_date)?,
        })
    }
}

impl AuditPayload {
    pub fn into_domain(self, company_id: CompanyId) -> NewQualityAudit {
        NewQualityAudit {
            company_id,
            title: self.title,
            audit_type: self.audit_type,
            auditor: self.auditor,
            scheduled_date: self.scheduled_date,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteAuditForm {
    pub findings: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CapaForm {
    pub non_conformance_id: i32,
    pub action_type: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1, max = 255))]
    pub owner: String,
    pub due_date: String,
}

pub struct CapaPayload {
    pub non_conformance_id: NonConformanceId,
    pub action_type: CapaActionType,
    pub description: SanitizedText,
    pub owner: Title,
    pub due_date: NaiveDate,
}

impl TryFrom<CapaForm> for CapaPayload {
    type Error = FormError;

    fn try_from(form: CapaForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(Self {
            non_conformance_id: NonConformanceId::new(form.non_conformance_id)?,
            action_type: form.action_type.parse()?,
            description: SanitizedText::new(form.description)?,
            owner: Title::new(form.owner)?,
            due_date: parse_date(&form.due_date)?,
        })
    }
}

impl CapaPayload {
    pub fn into_domain(self, company_id: CompanyId) -> NewCapa {
        NewCapa {
            company_id,
            non_conformance_id: self.non_conformance_id,
            action_type: self.action_type,
            description: self.description,
            owner: self.owner,
            due_date: self.due_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CapaStatusForm {
    pub status: String,
}

impl TryFrom<CapaStatusForm> for CapaStatus {
    type Error = FormError;

    fn try_from(form: CapaStatusForm) -> Result<Self, Self::Error> {
        Ok(form.status.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_form(result: &str) -> QualityCheckForm {
        QualityCheckForm {
            work_order_id: Some("12".into()),
            check_type: "Visual".into(),
            result: result.into(),
            sample_size: 50,
            defects_found: 4,
            notes: None,
            severity: None,
            description: None,
        }
    }

    #[test]
    fn passing_check_has_no_finding() {
        let payload = QualityCheckPayload::try_from(check_form("pass")).unwrap();
        assert!(payload.finding.is_none());
        assert_eq!(payload.check_type.as_str(), "visual");
        assert_eq!(payload.work_order_id.map(WorkOrderId::get), Some(12));
    }

    #[test]
    fn failing_check_defaults_to_minor_finding() {
        let payload = QualityCheckPayload::try_from(check_form("fail")).unwrap();
        let finding = payload.finding.unwrap();
        assert_eq!(finding.severity, Severity::Minor);
        assert_eq!(finding.description.as_str(), "Failed visual inspection");
    }

    #[test]
    fn failing_check_keeps_given_severity() {
        let mut form = check_form("fail");
        form.severity = Some("critical".into());
        form.description = Some("Seal leaks under pressure".into());
        let finding = QualityCheckPayload::try_from(form).unwrap().finding.unwrap();
        assert_eq!(finding.severity, Severity::Critical);
        assert_eq!(finding.description.as_str(), "Seal leaks under pressure");
    }

    #[test]
    fn defects_cannot_exceed_sample() {
        let mut form = check_form("pass");
        form.defects_found = 51;
        assert!(QualityCheckPayload::try_from(form).is_err());
    }

    #[test]
    fn unknown_result_is_rejected() {
        assert!(QualityCheckPayload::try_from(check_form("maybe")).is_err());
    }

    #[test]
    fn capa_requires_due_date() {
        let form = CapaForm {
            non_conformance_id: 3,
            action_type: "corrective".into(),
            description: "Retrain operators".into(),
            owner: "Line lead".into(),
            due_date: "".into(),
        };
        assert!(CapaPayload::try_from(form).is_err());
    }
}
