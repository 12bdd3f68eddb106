use serde::Deserialize;
use validator::Validate;

use crate::domain::testing::{NewTestRun, TestOutcome, TestRunStatus, TestType};
use crate::domain::types::{CompanyId, Label, Title, UserId};
use crate::forms::{FormError, non_blank};

#[derive(Debug, Deserialize, Validate)]
pub struct RunTestForm {
    pub test_type: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// URL, service name or module under test.
    #[validate(length(min = 1, max = 500))]
    pub target: String,
}

pub struct RunTestPayload {
    pub test_type: TestType,
    pub name: Title,
    pub target: Label,
}

impl TryFrom<RunTestForm> for RunTestPayload {
    type Error = FormError;

    fn try_from(form: RunTestForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(Self {
            test_type: form.test_type.parse()?,
            name: Title::new(form.name)?,
            target: Label::new(form.target)?,
        })
    }
}

impl RunTestPayload {
    pub fn into_domain(
        self,
        company_id: CompanyId,
        created_by: UserId,
        outcome: TestOutcome,
    ) -> NewTestRun {
        NewTestRun {
            company_id,
            test_type: self.test_type,
            name: self.name,
            target: self.target,
            created_by,
            outcome,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TestRunFilterQuery {
    pub test_type: Option<String>,
    pub status: Option<String>,
    pub page: Option<usize>,
}

pub struct TestRunFilter {
    pub test_type: Option<TestType>,
    pub status: Option<TestRunStatus>,
    pub page: usize,
}

impl TryFrom<TestRunFilterQuery> for TestRunFilter {
    type Error = FormError;

    fn try_from(query: TestRunFilterQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            test_type: non_blank(query.test_type)
                .map(|t| t.parse::<TestType>())
                .transpose()?,
            status: non_blank(query.status)
                .map(|s| s.parse::<TestRunStatus>())
                .transpose()?,
            page: query.page.unwrap_or(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_test_type_is_rejected() {
        let form = RunTestForm {
            test_type: "chaos".into(),
            name: "Monkey".into(),
            target: "api".into(),
        };
        assert!(RunTestPayload::try_from(form).is_err());
    }

    #[test]
    fn filter_ignores_blank_values() {
        let filter = TestRunFilter::try_from(TestRunFilterQuery {
            test_type: Some(" ".into()),
            status: Some("failed".into()),
            page: Some(2),
        })
        .unwrap();
        assert_eq!(filter.test_type, None);
        assert_eq!(filter.status, Some(TestRunStatus::Failed));
        assert_eq!(filter.page, 2);
    }
}
