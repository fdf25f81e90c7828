//! Package/course link - one row per course in a package's applicable list.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "package_courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub package_id: i64,
    pub course_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::credit_package::Entity",
        from = "Column::PackageId",
        to = "super::credit_package::Column::Id"
    )]
    CreditPackage,
}

impl Related<super::credit_package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditPackage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
