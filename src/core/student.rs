//! Student business logic - the school roster.
//!
//! Students are soft-deleted: deactivation hides them from the roster and frees a
//! slot in the plan quota, while their credits and attendance history stay intact.

use crate::{
    core::school::{self, QuotaResource},
    entities::{Student, student},
    errors::{Error, Result},
};
use sea_orm::{
    QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func},
};
use serde::Deserialize;

/// Fields accepted when creating or updating a student.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl StudentInput {
    fn validated_name(&self) -> Result<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::validation("Student name cannot be empty"));
        }
        Ok(name.to_string())
    }
}

/// Adds a student to the roster, enforcing the school's student quota.
pub async fn create_student(
    db: &DatabaseConnection,
    school_id: i64,
    input: StudentInput,
) -> Result<student::Model> {
    let name = input.validated_name()?;

    let txn = db.begin().await?;
    let school = school::require_school(&txn, school_id).await?;
    school::ensure_capacity(&txn, &school, QuotaResource::Students).await?;

    let now = chrono::Utc::now();
    let student = student::ActiveModel {
        school_id: Set(school_id),
        name: Set(name),
        email: Set(clean(input.email)),
        phone: Set(clean(input.phone)),
        guardian_name: Set(clean(input.guardian_name)),
        notes: Set(clean(input.notes)),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(student)
}

/// Retrieves a student of the school, active or not.
pub async fn get_student<C>(
    db: &C,
    school_id: i64,
    student_id: i64,
) -> Result<Option<student::Model>>
where
    C: ConnectionTrait,
{
    Student::find_by_id(student_id)
        .filter(student::Column::SchoolId.eq(school_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves an active student of the school or fails with `NotFound`.
pub async fn require_active_student<C>(
    db: &C,
    school_id: i64,
    student_id: i64,
) -> Result<student::Model>
where
    C: ConnectionTrait,
{
    get_student(db, school_id, student_id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| Error::not_found("Student", student_id))
}

/// Lists students ordered by name. `search` matches any part of the name, ignoring case.
pub async fn list_students(
    db: &DatabaseConnection,
    school_id: i64,
    search: Option<&str>,
    include_inactive: bool,
) -> Result<Vec<student::Model>> {
    let mut query = Student::find().filter(student::Column::SchoolId.eq(school_id));
    if !include_inactive {
        query = query.filter(student::Column::IsActive.eq(true));
    }
    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        query = query.filter(
            Expr::expr(Func::lower(Expr::col((Student, student::Column::Name))))
                .like(format!("%{}%", term.to_lowercase())),
        );
    }
    query
        .order_by_asc(student::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces a student's profile fields.
pub async fn update_student(
    db: &DatabaseConnection,
    school_id: i64,
    student_id: i64,
    input: StudentInput,
) -> Result<student::Model> {
    let name = input.validated_name()?;
    let student = get_student(db, school_id, student_id)
        .await?
        .ok_or_else(|| Error::not_found("Student", student_id))?;

    let mut active: student::ActiveModel = student.into();
    active.name = Set(name);
    active.email = Set(clean(input.email));
    active.phone = Set(clean(input.phone));
    active.guardian_name = Set(clean(input.guardian_name));
    active.notes = Set(clean(input.notes));
    active.updated_at = Set(chrono::Utc::now());

    active.update(db).await.map_err(Into::into)
}

/// Soft-deletes a student.
pub async fn deactivate_student(
    db: &DatabaseConnection,
    school_id: i64,
    student_id: i64,
) -> Result<student::Model> {
    let student = require_active_student(db, school_id, student_id).await?;

    let mut active: student::ActiveModel = student.into();
    active.is_active = Set(false);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Brings a deactivated student back, subject to the student quota.
pub async fn reactivate_student(
    db: &DatabaseConnection,
    school_id: i64,
    student_id: i64,
) -> Result<student::Model> {
    let txn = db.begin().await?;
    let student = get_student(&txn, school_id, student_id)
        .await?
        .ok_or_else(|| Error::not_found("Student", student_id))?;
    if student.is_active {
        return Ok(student);
    }

    let school = school::require_school(&txn, school_id).await?;
    school::ensure_capacity(&txn, &school, QuotaResource::Students).await?;

    let mut active: student::ActiveModel = student.into();
    active.is_active = Set(true);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::school::SchoolOverrides;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_student_trims_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Roster School").await?;

        let student = create_student(
            &db,
            school.id,
            StudentInput {
                name: "  Grace Hopper ".to_string(),
                email: Some("   ".to_string()),
                phone: Some(" 555-0100 ".to_string()),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(student.name, "Grace Hopper");
        assert_eq!(student.email, None);
        assert_eq!(student.phone.as_deref(), Some("555-0100"));
        assert!(student.is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_student_requires_name() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Roster School").await?;
        let result = create_student(&db, school.id, StudentInput::default()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_students_search_and_soft_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Roster School").await?;
        let alan = create_test_student(&db, school.id, "Alan Turing").await?;
        create_test_student(&db, school.id, "Ada Lovelace").await?;
        create_test_student(&db, school.id, "Alonzo Church").await?;

        let all = list_students(&db, school.id, None, false).await?;
        let names: Vec<&str> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Ada Lovelace", "Alan Turing", "Alonzo Church"]);

        let matches = list_students(&db, school.id, Some("al"), false).await?;
        assert_eq!(matches.len(), 2);
        let shouted = list_students(&db, school.id, Some("  CHURCH "), false).await?;
        assert_eq!(shouted.len(), 1);
        assert_eq!(shouted[0].name, "Alonzo Church");

        deactivate_student(&db, school.id, alan.id).await?;
        assert_eq!(list_students(&db, school.id, None, false).await?.len(), 2);
        assert_eq!(list_students(&db, school.id, None, true).await?.len(), 3);

        let again = deactivate_student(&db, school.id, alan.id).await;
        assert!(matches!(again, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_reactivate_respects_quota() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Roster School").await?;
        school::apply_overrides(
            &db,
            school.id,
            SchoolOverrides {
                max_students: Some(1),
                ..Default::default()
            },
        )
        .await?;

        let first = create_test_student(&db, school.id, "First").await?;
        deactivate_student(&db, school.id, first.id).await?;
        create_test_student(&db, school.id, "Second").await?;

        let result = reactivate_student(&db, school.id, first.id).await;
        assert!(matches!(result, Err(Error::QuotaExceeded { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_student_other_school() -> Result<()> {
        let db = setup_test_db().await?;
        let home = create_test_school(&db, "Home").await?;
        let away = create_test_school(&db, "Away").await?;
        let student = create_test_student(&db, home.id, "Local").await?;

        let input = StudentInput {
            name: "Renamed".to_string(),
            ..Default::default()
        };
        let result = update_student(&db, away.id, student.id, input.clone()).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        let updated = update_student(&db, home.id, student.id, input).await?;
        assert_eq!(updated.name, "Renamed");
        Ok(())
    }
}
