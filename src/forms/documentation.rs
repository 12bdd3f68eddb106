use chrono::NaiveDateTime;
use serde::Deserialize;
use validator::Validate;

use crate::domain::documentation::{NewTutorial, TutorialDifficulty, UpdateTutorial};
use crate::domain::types::{CompanyId, Label, SanitizedText, Title, UserId};
use crate::forms::{FormError, checkbox, non_blank};

#[derive(Debug, Deserialize, Validate)]
pub struct TutorialForm {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub difficulty: String,
    #[validate(length(min = 1))]
    pub content: String,
    pub published: Option<String>,
}

pub struct TutorialPayload {
    pub title: Title,
    pub category: Label,
    pub difficulty: TutorialDifficulty,
    pub content: SanitizedText,
    pub published: bool,
}

impl TryFrom<TutorialForm> for TutorialPayload {
    type Error = FormError;

    fn try_from(form: TutorialForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(Self {
            title: Title::new(form.title)?,
            category: Label::new(form.category.to_lowercase())?,
            difficulty: form.difficulty.parse()?,
            content: SanitizedText::new(form.content)?,
            published: checkbox(&form.published),
        })
    }
}

impl TutorialPayload {
    pub fn into_new(self, company_id: CompanyId, created_by: UserId) -> NewTutorial {
        NewTutorial {
            company_id,
            title: self.title,
            category: self.category,
            difficulty: self.difficulty,
            content: self.content,
            published: self.published,
            created_by,
        }
    }

    pub fn into_update(self, updated_at: NaiveDateTime) -> UpdateTutorial {
        UpdateTutorial {
            title: self.title,
            category: self.category,
            difficulty: self.difficulty,
            content: self.content,
            published: self.published,
            updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TutorialFilterQuery {
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
}

pub struct TutorialFilter {
    pub category: Option<String>,
    pub difficulty: Option<TutorialDifficulty>,
    pub search: Option<String>,
    pub page: usize,
}

impl TryFrom<TutorialFilterQuery> for TutorialFilter {
    type Error = FormError;

    fn try_from(query: TutorialFilterQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            category: non_blank(query.category),
            difficulty: non_blank(query.difficulty)
                .map(|d| d.parse::<TutorialDifficulty>())
                .transpose()?,
            search: non_blank(query.search),
            page: query.page.unwrap_or(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_sanitized() {
        let form = TutorialForm {
            title: "Receiving goods".into(),
            category: "Warehouse".into(),
            difficulty: "beginner".into(),
            content: "<p onclick=\"x()\">Scan the label</p>".into(),
            published: Some("on".into()),
        };
        let payload = TutorialPayload::try_from(form).unwrap();
        assert_eq!(payload.content.as_str(), "<p>Scan the label</p>");
        assert_eq!(payload.category.as_str(), "warehouse");
        assert!(payload.published);
    }

    #[test]
    fn unknown_difficulty_is_rejected() {
        let form = TutorialForm {
            title: "T".into(),
            category: "c".into(),
            difficulty: "expert".into(),
            content: "body".into(),
            published: None,
        };
        assert!(TutorialPayload::try_from(form).is_err());
    }
}
