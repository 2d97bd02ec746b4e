//! Refresh session entity.
//!
//! One row per issued refresh token, keyed by a one-way hash. The raw
//! token is never stored. A session is consumed (revoked) the first
//! time the token is presented for rotation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "refresh_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub user_id: String,

    /// SHA-256 hex digest of the raw refresh token.
    #[sea_orm(unique)]
    pub token_hash: String,

    pub expires_at: DateTimeWithTimeZone,

    /// Set when the token is used or the user logs out.
    #[sea_orm(nullable)]
    pub revoked_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Uuid",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
