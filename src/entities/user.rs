//! User entity - staff accounts.
//!
//! Owners, admins and teachers belong to exactly one school. Superadmins have
//! no school and operate the platform console.

use super::enums::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier, also the id forwarded by the identity provider
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning school, `None` only for superadmins
    pub school_id: Option<i64>,
    /// Login email, stored lower-cased
    #[sea_orm(unique)]
    pub email: String,
    /// Name shown in attendance and purchase records
    pub display_name: String,
    /// Staff role
    pub role: Role,
    /// Soft deactivation flag
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each staff user belongs to one school
    #[sea_orm(
        belongs_to = "super::school::Entity",
        from = "Column::SchoolId",
        to = "super::school::Column::Id"
    )]
    School,
}

impl Related<super::school::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::School.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
