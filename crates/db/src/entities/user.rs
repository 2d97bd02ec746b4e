//! User entity.
//!
//! Users are provisioned from the campus identity provider; the primary
//! key is the IdP-issued subject identifier.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    /// IdP subject identifier.
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: String,

    #[sea_orm(nullable)]
    pub email: Option<String>,

    /// Legal name as reported by the IdP.
    pub name: String,

    /// Profile picture URL.
    #[sea_orm(nullable)]
    pub picture: Option<String>,

    /// Display nickname. NULL until the user completes profile setup.
    #[sea_orm(nullable)]
    pub nickname: Option<String>,

    #[sea_orm(nullable)]
    pub department: Option<String>,

    #[sea_orm(nullable)]
    pub student_id: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::survey::Entity")]
    Survey,

    #[sea_orm(has_many = "super::response::Entity")]
    Response,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::survey::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Survey.def()
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
