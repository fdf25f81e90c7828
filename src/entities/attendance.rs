//! Attendance entity - one check-in that consumed credits.
//!
//! Student and course names are copied at write time so history survives
//! renames and soft deletes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Attendance database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub student_id: i64,
    pub course_id: i64,
    /// Credit the session was charged to
    pub student_credit_id: i64,
    pub student_name: String,
    pub course_name: String,
    pub credits_used: i32,
    pub note: Option<String>,
    /// Staff user who recorded the check-in
    pub recorded_by: Option<i64>,
    pub checked_in_at: DateTimeUtc,
}

/// Defines relationships between Attendance and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each attendance is charged to one student credit
    #[sea_orm(
        belongs_to = "super::student_credit::Entity",
        from = "Column::StudentCreditId",
        to = "super::student_credit::Column::Id"
    )]
    StudentCredit,
}

impl Related<super::student_credit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentCredit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
