//! Shared test utilities for `ClassCredits`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::AppConfig,
    core::{
        attendance::{self, CheckInReceipt, CheckInRequest},
        course::{self, CourseInput},
        credit::{self, PurchaseReceipt, PurchaseRequest},
        package::{self, PackageDetails, PackageInput},
        school, student, user,
    },
    entities::{self, CourseCategory, PaymentMethod, PlanTier, Role, ValidityType},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test school on the built-in `pro` plan.
///
/// # Defaults
/// * `contact_email`: None
/// * quotas: 500 students, 100 courses, 20 staff
/// * reports and discounts enabled
pub async fn create_test_school(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::school::Model> {
    school::create_school(
        db,
        &AppConfig::default(),
        name.to_string(),
        None,
        PlanTier::Pro,
    )
    .await
}

/// Creates an active staff user. The display name is the part of the email before `@`.
pub async fn create_test_user(
    db: &DatabaseConnection,
    school_id: i64,
    email: &str,
    role: Role,
) -> Result<entities::user::Model> {
    let display_name = email.split('@').next().unwrap_or(email);
    user::create_user(db, school_id, email, display_name, role).await
}

/// Creates an active student with only a name.
pub async fn create_test_student(
    db: &DatabaseConnection,
    school_id: i64,
    name: &str,
) -> Result<entities::student::Model> {
    student::create_student(
        db,
        school_id,
        student::StudentInput {
            name: name.to_string(),
            ..Default::default()
        },
    )
    .await
}

/// Creates an active course costing 1 credit per session.
pub async fn create_test_course(
    db: &DatabaseConnection,
    school_id: i64,
    name: &str,
    category: CourseCategory,
) -> Result<entities::course::Model> {
    course::create_course(
        db,
        school_id,
        CourseInput {
            name: name.to_string(),
            description: None,
            category,
            status: None,
            credits_per_session: None,
            teacher_id: None,
        },
    )
    .await
}

fn test_package_input(name: &str, credits: i32) -> PackageInput {
    PackageInput {
        name: name.to_string(),
        description: None,
        credits,
        bonus_credits: 0,
        price: 10.0 * f64::from(credits),
        validity: ValidityType::Unlimited,
        validity_value: None,
        valid_until: None,
        is_universal: false,
        applicable_course_ids: Vec::new(),
        course_id: None,
    }
}

/// Creates an unlimited universal package priced at 10.0 per credit.
pub async fn create_universal_package(
    db: &DatabaseConnection,
    school_id: i64,
    credits: i32,
) -> Result<PackageDetails> {
    let input = PackageInput {
        is_universal: true,
        ..test_package_input(&format!("Universal {credits}"), credits)
    };
    package::create_package(db, school_id, input).await
}

/// Creates an unlimited package usable only for `course_ids`, priced at 10.0 per credit.
pub async fn create_course_list_package(
    db: &DatabaseConnection,
    school_id: i64,
    course_ids: &[i64],
    credits: i32,
) -> Result<PackageDetails> {
    let input = PackageInput {
        applicable_course_ids: course_ids.to_vec(),
        ..test_package_input(&format!("Courses {credits}"), credits)
    };
    package::create_package(db, school_id, input).await
}

/// Sells a package at full price, paid in cash.
pub async fn purchase_test_package(
    db: &DatabaseConnection,
    school_id: i64,
    student_id: i64,
    package_id: i64,
) -> Result<PurchaseReceipt> {
    credit::purchase_package(
        db,
        school_id,
        student_id,
        PurchaseRequest {
            package_id,
            discount_amount: 0.0,
            payment_method: PaymentMethod::Cash,
            note: None,
        },
        None,
    )
    .await
}

/// Checks a student in now, letting the credit be picked automatically.
pub async fn check_in_test_student(
    db: &DatabaseConnection,
    school_id: i64,
    student_id: i64,
    course_id: i64,
) -> Result<CheckInReceipt> {
    attendance::check_in(
        db,
        school_id,
        CheckInRequest {
            student_id,
            course_id,
            credit_id: None,
            note: None,
            checked_in_at: None,
        },
        None,
    )
    .await
}
