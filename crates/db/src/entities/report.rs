//! Report entity.
//!
//! Unique per (reporter, target kind, target id); duplicate reports are
//! rejected at the service layer and by the index.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report target kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportTargetKind {
    #[sea_orm(string_value = "survey")]
    Survey,
    #[sea_orm(string_value = "comment")]
    Comment,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub reporter_id: String,

    pub target_kind: ReportTargetKind,

    #[sea_orm(indexed)]
    pub target_id: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReporterId",
        to = "super::user::Column::Uuid",
        on_delete = "Cascade"
    )]
    Reporter,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reporter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
