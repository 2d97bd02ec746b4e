//! Survey entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "survey")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Whether responder identity is masked in results.
    pub is_anonymous: bool,

    /// Voting closes at this instant. At most 14 days after creation.
    pub deadline: DateTimeWithTimeZone,

    /// Estimated completion time in seconds.
    pub estimated_time: i32,

    #[sea_orm(indexed)]
    pub author_id: String,

    /// Set when the report threshold is reached.
    #[sea_orm(default_value = false)]
    pub is_hidden: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Uuid",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(has_many = "super::question::Entity")]
    Question,

    #[sea_orm(has_many = "super::target_constraint::Entity")]
    TargetConstraint,

    #[sea_orm(has_many = "super::response::Entity")]
    Response,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl Related<super::target_constraint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TargetConstraint.def()
    }
}

impl Related<super::response::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Response.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
