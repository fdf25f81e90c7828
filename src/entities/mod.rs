//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod attendance;
pub mod course;
pub mod credit_package;
pub mod enums;
pub mod package_course;
pub mod purchase;
pub mod school;
pub mod student;
pub mod student_credit;
pub mod user;

// Re-export specific types to avoid conflicts
pub use attendance::{Column as AttendanceColumn, Entity as Attendance, Model as AttendanceModel};
pub use course::{Column as CourseColumn, Entity as Course, Model as CourseModel};
pub use credit_package::{
    Column as CreditPackageColumn, Entity as CreditPackage, Model as CreditPackageModel,
};
pub use enums::{CourseCategory, CourseStatus, PaymentMethod, PlanTier, Role, ValidityType};
pub use package_course::{
    Column as PackageCourseColumn, Entity as PackageCourse, Model as PackageCourseModel,
};
pub use purchase::{Column as PurchaseColumn, Entity as Purchase, Model as PurchaseModel};
pub use school::{Column as SchoolColumn, Entity as School, Model as SchoolModel};
pub use student::{Column as StudentColumn, Entity as Student, Model as StudentModel};
pub use student_credit::{
    Column as StudentCreditColumn, Entity as StudentCredit, Model as StudentCreditModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
