//! Credit package entity - a purchasable bundle of credits.
//!
//! A package targets courses in one of three ways: universal (every course),
//! an explicit list stored in `package_courses`, or the legacy single
//! `course_id`. Resolution lives in `core::package::applies_to_course`.

use super::enums::ValidityType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Credit package database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_packages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Credits granted by the purchase
    pub credits: i32,
    /// Extra credits granted on top of `credits`
    pub bonus_credits: i32,
    /// List price
    pub price: f64,
    /// Expiry policy applied when the package is bought
    pub validity: ValidityType,
    /// Number of days or months for `Days`/`Months` validity
    pub validity_value: Option<i32>,
    /// Last usable date for `FixedDate` validity
    pub valid_until: Option<Date>,
    /// Usable in every course of the school
    pub is_universal: bool,
    /// Legacy single-course target
    pub course_id: Option<i64>,
    /// Soft delete flag - inactive packages cannot be purchased
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between CreditPackage and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each package belongs to one school
    #[sea_orm(
        belongs_to = "super::school::Entity",
        from = "Column::SchoolId",
        to = "super::school::Column::Id"
    )]
    School,
    /// Explicit list of applicable courses
    #[sea_orm(has_many = "super::package_course::Entity")]
    PackageCourses,
}

impl Related<super::school::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::School.def()
    }
}

impl Related<super::package_course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackageCourses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
