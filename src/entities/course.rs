//! Course entity - the school catalog.
//!
//! Courses are never removed; `is_deleted` hides them while keeping attendance
//! history intact.

use super::enums::{CourseCategory, CourseStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Course database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    /// Course name, copied onto attendance rows at check-in
    pub name: String,
    pub description: Option<String>,
    pub category: CourseCategory,
    pub status: CourseStatus,
    /// Credits deducted per attendance
    pub credits_per_session: i32,
    /// Staff user who usually teaches the course
    pub teacher_id: Option<i64>,
    /// Soft delete flag
    pub is_deleted: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Course and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each course belongs to one school
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
