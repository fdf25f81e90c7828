//! Purchase entity - the payment record behind a student credit.

use super::enums::PaymentMethod;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub student_id: i64,
    pub package_id: i64,
    /// Credit row created by this purchase
    pub student_credit_id: i64,
    /// Package list price at purchase time
    pub original_price: f64,
    pub discount_amount: f64,
    /// `max(0, original_price - discount_amount)`
    pub final_price: f64,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
    /// Staff user who recorded the sale
    pub purchased_by: Option<i64>,
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Purchase and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each purchase created one student credit
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
