use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::domain::documentation::{
    NewTutorial as DomainNewTutorial, Tutorial as DomainTutorial,
    UpdateTutorial as DomainUpdateTutorial,
};
use crate::domain::types::{CompanyId, TutorialId, TypeConstraintError, UserId};

#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::tutorials)]
pub struct Tutorial {
    pub id: i32,
    pub company_id: i32,
    pub title: String,
    pub category: String,
    pub difficulty: String,
    pub content: String,
    pub published: bool,
    pub view_count: i32,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::tutorials)]
pub struct NewTutorial<'a> {
    pub company_id: i32,
    pub title: &'a str,
    pub category: &'a str,
    pub difficulty: &'a str,
    pub content: &'a str,
    pub published: bool,
    pub created_by: i32,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::tutorials)]
pub struct UpdateTutorial<'a> {
    pub title: &'a str,
    pub category: &'a str,
    pub difficulty: &'a str,
    pub content: &'a str,
    pub published: bool,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::tutorial_progress)]
pub struct NewTutorialProgress {
    pub tutorial_id: i32,
    pub user_id: i32,
    pub company_id: i32,
    pub completed_at: NaiveDateTime,
}

#[derive(Debug, QueryableByName)]
pub struct TutorialStatsRow {
    #[diesel(sql_type = BigInt)]
    pub published: i64,
    #[diesel(sql_type = BigInt)]
    pub drafts: i64,
    #[diesel(sql_type = BigInt)]
    pub total_views: i64,
}

impl TryFrom<Tutorial> for DomainTutorial {
    type Error = TypeConstraintError;

    fn try_from(tutorial: Tutorial) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TutorialId::new(tutorial.id)?,
            company_id: CompanyId::new(tutorial.company_id)?,
            title: tutorial.title,
            category: tutorial.category,
            difficulty: tutorial.difficulty.parse()?,
            content: tutorial.content,
            published: tutorial.published,
            view_count: tutorial.view_count,
            created_by: UserId::new(tutorial.created_by)?,
            created_at: tutorial.created_at,
            updated_at: tutorial.updated_at,
        })
    }
}

impl<'a> From<&'a DomainNewTutorial> for NewTutorial<'a> {
    fn from(tutorial: &'a DomainNewTutorial) -> Self {
        Self {
            company_id: tutorial.company_id.get(),
            title: tutorial.title.as_str(),
            category: tutorial.category.as_str(),
            difficulty: tutorial.difficulty.as_str(),
            content: tutorial.content.as_str(),
            published: tutorial.published,
            created_by: tutorial.created_by.get(),
        }
    }
}

impl<'a> From<&'a DomainUpdateTutorial> for UpdateTutorial<'a> {
    fn from(update: &'a DomainUpdateTutorial) -> Self {
        Self {
            title: update.title.as_str(),
            category: update.category.as_str(),
            difficulty: update.difficulty.as_str(),
            content: update.content.as_str(),
            published: update.published,
            updated_at: update.updated_at,
        }
    }
}
