//! Target constraint entity.
//!
//! A survey may restrict who can respond. Constraints are evaluated with
//! OR semantics; an `all` constraint admits everyone and cannot be
//! combined with other kinds.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Target constraint kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    #[sea_orm(string_value = "all")]
    All,
    #[sea_orm(string_value = "department")]
    Department,
    #[sea_orm(string_value = "student_id_prefix")]
    StudentIdPrefix,
    #[sea_orm(string_value = "nickname")]
    Nickname,
    #[sea_orm(string_value = "uuid")]
    Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "target_constraint")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub survey_id: String,

    pub kind: TargetKind,

    /// Match value. Required for every kind except `all`.
    #[sea_orm(nullable)]
    pub value: Option<String>,
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
}

impl Related<super::survey::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Survey.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
