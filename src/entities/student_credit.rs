//! Student credit entity - a purchased instance of a package.
//!
//! Counters: `remaining_credits = total_credits + bonus_credits - used_credits`
//! plus any manual adjustment, which is folded into `bonus_credits`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student credit database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_credits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub student_id: i64,
    pub package_id: i64,
    /// Package name at the time of purchase
    pub package_name: String,
    /// Credits bought
    pub total_credits: i32,
    /// Bonus credits granted, including manual adjustments
    pub bonus_credits: i32,
    /// Credits consumed by attendance
    pub used_credits: i32,
    /// Credits still available
    pub remaining_credits: i32,
    pub purchased_at: DateTimeUtc,
    /// `None` means the credits never expire
    pub expires_at: Option<DateTimeUtc>,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between StudentCredit and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each credit belongs to one student
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
    /// Each credit was bought from one package
    #[sea_orm(
        belongs_to = "super::credit_package::Entity",
        from = "Column::PackageId",
        to = "super::credit_package::Column::Id"
    )]
    CreditPackage,
    /// One credit is consumed by many attendances
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendances,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::credit_package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditPackage.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
