//! Tutorials and per-user completion tracking.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::stats::LabelCount;
use crate::domain::types::{CompanyId, Label, SanitizedText, Title, TutorialId, UserId, string_enum};

string_enum!(TutorialDifficulty {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tutorial {
    pub id: TutorialId,
    pub company_id: CompanyId,
    pub title: String,
    pub category: String,
    pub difficulty: TutorialDifficulty,
    pub content: String,
    pub published: bool,
    pub view_count: i32,
    pub created_by: UserId,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTutorial {
    pub company_id: CompanyId,
    pub title: Title,
    pub category: Label,
    pub difficulty: TutorialDifficulty,
    pub content: SanitizedText,
    pub published: bool,
    pub created_by: UserId,
}

#[derive(Debug, Clone)]
pub struct UpdateTutorial {
    pub title: Title,
    pub category: Label,
    pub difficulty: TutorialDifficulty,
    pub content: SanitizedText,
    pub published: bool,
    pub updated_at: NaiveDateTime,
}

/// A tutorial as seen by one reader.
#[derive(Debug, Clone, Serialize)]
pub struct TutorialDetail {
    pub tutorial: Tutorial,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TutorialStats {
    pub published: i64,
    pub drafts: i64,
    pub total_views: i64,
    pub completions: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentationDashboard {
    pub by_category: Vec<LabelCount>,
    pub stats: TutorialStats,
    pub most_viewed: Vec<Tutorial>,
}
