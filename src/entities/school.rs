//! School entity - the tenant root.
//!
//! Every other table carries a `school_id`. A school owns its plan tier,
//! quotas and feature flags; deactivating it blocks staff access without
//! removing data.

use super::enums::PlanTier;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// School database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "schools")]
pub struct Model {
    /// Unique identifier for the school
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name of the school
    pub name: String,
    /// Contact address shown in the admin console
    pub contact_email: Option<String>,
    /// Subscription tier
    pub plan: PlanTier,
    /// Maximum number of active students
    pub max_students: i32,
    /// Maximum number of non-deleted courses
    pub max_courses: i32,
    /// Maximum number of active staff users
    pub max_staff: i32,
    /// Whether the reporting endpoints are available
    pub reports_enabled: bool,
    /// Whether purchases may carry a discount
    pub discounts_enabled: bool,
    /// Soft deactivation flag
    pub is_active: bool,
    /// When the school was created
    pub created_at: DateTimeUtc,
    /// When the school was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between School and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One school has many staff users
    #[sea_orm(has_many = "super::user::Entity")]
    Users,
    /// One school has many students
    #[sea_orm(has_many = "super::student::Entity")]
    Students,
    /// One school has many courses
    #[sea_orm(has_many = "super::course::Entity")]
    Courses,
    /// One school has many credit packages
    #[sea_orm(has_many = "super::credit_package::Entity")]
    CreditPackages,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Courses.def()
    }
}

impl Related<super::credit_package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditPackages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
