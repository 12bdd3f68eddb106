use chrono::NaiveDateTime;
use serde::Deserialize;
use validator::Validate;

use crate::domain::reporting::{Frequency, NewReport, NewReportSchedule, ReportKind, SaveDashboard};
use crate::domain::types::{CompanyId, Email, Label, ReportId, Title, UserId};
use crate::forms::{FormError, non_blank};

#[derive(Debug, Deserialize, Validate)]
pub struct ReportForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub kind: String,
}

pub struct ReportPayload {
    pub name: Title,
    pub category: Label,
    pub kind: ReportKind,
}

impl TryFrom<ReportForm> for ReportPayload {
    type Error = FormError;

    fn try_from(form: ReportForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(Self {
            name: Title::new(form.name)?,
            category: Label::new(form.category.to_lowercase())?,
            kind: form.kind.parse()?,
        })
    }
}

impl ReportPayload {
    pub fn into_domain(self, company_id: CompanyId, created_by: UserId) -> NewReport {
        NewReport {
            company_id,
            name: self.name,
            category: self.category,
            kind: self.kind,
            created_by,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportFilterQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
}

pub struct ReportFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: usize,
}

impl From<ReportFilterQuery> for ReportFilter {
    fn from(query: ReportFilterQuery) -> Self {
        Self {
            category: non_blank(query.category).map(|c| c.to_lowercase()),
            search: non_blank(query.search),
            page: query.page.unwrap_or(1),
        }
    }
}

/// Splits a comma-separated recipient list, requiring at least one valid address.
pub fn parse_recipients(raw: &str) -> Result<Vec<Email>, FormError> {
    let recipients = raw
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| Email::new(r).map_err(|_| FormError::Rule(format!("invalid recipient `{r}`"))))
        .collect::<Result<Vec<_>, _>>()?;
    if recipients.is_empty() {
        return Err(FormError::Rule("at least one recipient is required".into()));
    }
    Ok(recipients)
}

#[derive(Debug, Deserialize)]
pub struct ScheduleForm {
    pub frequency: String,
    pub recipients: String,
}

pub struct SchedulePayload {
    pub frequency: Frequency,
    pub recipients: Vec<Email>,
}

impl TryFrom<ScheduleForm> for SchedulePayload {
    type Error = FormError;

    fn try_from(form: ScheduleForm) -> Result<Self, Self::Error> {
        Ok(Self {
            frequency: form.frequency.parse()?,
            recipients: parse_recipients(&form.recipients)?,
        })
    }
}

impl SchedulePayload {
    /// The first run is one period after `now`.
    pub fn into_domain(
        self,
        company_id: CompanyId,
        report_id: ReportId,
        now: NaiveDateTime,
    ) -> NewReportSchedule {
        NewReportSchedule {
            company_id,
            report_id,
            frequency: self.frequency,
            recipients: self.recipients,
            next_run: self.frequency.advance(now),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct DashboardForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub layout: String,
}

pub struct DashboardPayload {
    pub name: Title,
    pub layout: serde_json::Value,
}

impl TryFrom<DashboardForm> for DashboardPayload {
    type Error = FormError;

    fn try_from(form: DashboardForm) -> Result<Self, Self::Error> {
        form.validate()?;
        let layout: serde_json::Value = serde_json::from_str(&form.layout)
            .map_err(|err| FormError::Rule(format!("layout is not valid JSON: {err}")))?;
        if !(layout.is_object() || layout.is_array()) {
            return Err(FormError::Rule(
                "layout must be a JSON object or array".into(),
            ));
        }
        Ok(Self {
            name: Title::new(form.name)?,
            layout,
        })
    }
}

impl DashboardPayload {
    pub fn into_domain(self, company_id: CompanyId, user_id: UserId) -> SaveDashboard {
        SaveDashboard {
            company_id,
            user_id,
            name: self.name,
            layout: self.layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn recipients_require_valid_addresses() {
        assert_eq!(
            parse_recipients("ops@example.com, CFO@Example.com").unwrap().len(),
            2
        );
        assert!(parse_recipients("ops@example.com, nope").is_err());
        assert!(parse_recipients(" , ").is_err());
    }

    #[test]
    fn monthly_schedule_starts_next_month() {
        let payload = SchedulePayload::try_from(ScheduleForm {
            frequency: "monthly".into(),
            recipients: "ops@example.com".into(),
        })
        .unwrap();
        let now = NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let schedule =
            payload.into_domain(CompanyId::new(1).unwrap(), ReportId::new(1).unwrap(), now);
        assert_eq!(
            schedule.next_run,
            NaiveDate::from_ymd_opt(2025, 2, 28)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn unknown_frequency_is_rejected() {
        let form = ScheduleForm {
            frequency: "hourly".into(),
            recipients: "ops@example.com".into(),
        };
        assert!(SchedulePayload::try_from(form).is_err());
    }

    #[test]
    fn dashboard_layout_must_be_structured() {
        let form = |layout: &str| DashboardForm {
            name: "Ops".into(),
            layout: layout.into(),
        };
        assert!(DashboardPayload::try_from(form(r#"{"widgets": []}"#)).is_ok());
        assert!(DashboardPayload::try_from(form("[1, 2]")).is_ok());
        assert!(DashboardPayload::try_from(form("42")).is_err());
        assert!(DashboardPayload::try_from(form("{broken")).is_err());
    }

    #[test]
    fn report_kind_is_checked() {
        let form = ReportForm {
            name: "Spend".into(),
            category: "Finance".into(),
            kind: "purchase_spend_by_vendor".into(),
        };
        let payload = ReportPayload::try_from(form).unwrap();
        assert_eq!(payload.kind, ReportKind::PurchaseSpendByVendor);
        assert_eq!(payload.category.as_str(), "finance");
    }
}
