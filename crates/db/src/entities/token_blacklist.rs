//! Token blacklist entity.
//!
//! Access tokens are stateless; explicit revocation (logout) records the
//! token's `jti` here until its natural expiry. Expired rows are pruned
//! opportunistically.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "token_blacklist")]
pub struct Model {
    /// Token identifier claim of the revoked access token.
    #[sea_orm(primary_key, auto_increment = false)]
    pub jti: String,

    pub expires_at: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
