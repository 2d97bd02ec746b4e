//! Question entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Question kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    /// Exactly one option per answer.
    #[sea_orm(string_value = "single")]
    Single,
    /// One or more options per answer.
    #[sea_orm(string_value = "multiple")]
    Multiple,
    /// Free-text answer.
    #[sea_orm(string_value = "subjective")]
    Subjective,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub survey_id: String,

    pub kind: QuestionKind,

    pub content: String,

    /// Creation order within the survey.
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::survey::Entity",
        from = "Column::SurveyId",
        to = "super::survey::Column::Id",
        on_delete = "Cascade"
    )]
    Survey,

    #[sea_orm(has_many = "super::question_option::Entity")]
    Option,

    #[sea_orm(has_many = "super::answer::Entity")]
    Answer,
}

impl Related<super::survey::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Survey.def()
    }
}

impl Related<super::question_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Option.def()
    }
}

impl Related<super::answer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Answer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
