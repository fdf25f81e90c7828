//! Course business logic - the school catalog.
//!
//! Provides functions for creating, listing, updating and soft-deleting courses.
//! Only `active`, non-deleted courses accept check-ins.

use crate::{
    core::school::{self, QuotaResource},
    entities::{Course, CourseCategory, CourseStatus, User, course, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;

/// Fields accepted when creating or updating a course.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: CourseCategory,
    #[serde(default)]
    pub status: Option<CourseStatus>,
    #[serde(default)]
    pub credits_per_session: Option<i32>,
    #[serde(default)]
    pub teacher_id: Option<i64>,
}

/// Optional catalog filters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CourseFilter {
    pub status: Option<CourseStatus>,
    pub category: Option<CourseCategory>,
}

async fn validate_input<C>(db: &C, school_id: i64, input: &CourseInput) -> Result<(String, i32)>
where
    C: ConnectionTrait,
{
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::validation("Course name cannot be empty"));
    }

    let credits_per_session = input.credits_per_session.unwrap_or(1);
    if credits_per_session < 1 {
        return Err(Error::validation(
            "Credits per session must be at least 1",
        ));
    }

    if let Some(teacher_id) = input.teacher_id {
        User::find_by_id(teacher_id)
            .filter(user::Column::SchoolId.eq(school_id))
            .filter(user::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Teacher", teacher_id))?;
    }

    Ok((name.to_string(), credits_per_session))
}

/// Adds a course to the catalog, enforcing the school's course quota.
pub async fn create_course(
    db: &DatabaseConnection,
    school_id: i64,
    input: CourseInput,
) -> Result<course::Model> {
    let txn = db.begin().await?;
    let (name, credits_per_session) = validate_input(&txn, school_id, &input).await?;

    let school = school::require_school(&txn, school_id).await?;
    school::ensure_capacity(&txn, &school, QuotaResource::Courses).await?;

    let now = chrono::Utc::now();
    let course = course::ActiveModel {
        school_id: Set(school_id),
        name: Set(name),
        description: Set(input.description.filter(|d| !d.trim().is_empty())),
        category: Set(input.category),
        status: Set(input.status.unwrap_or(CourseStatus::Active)),
        credits_per_session: Set(credits_per_session),
        teacher_id: Set(input.teacher_id),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(course)
}

/// Retrieves a non-deleted course of the school.
pub async fn get_course<C>(db: &C, school_id: i64, course_id: i64) -> Result<Option<course::Model>>
where
    C: ConnectionTrait,
{
    Course::find_by_id(course_id)
        .filter(course::Column::SchoolId.eq(school_id))
        .filter(course::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a non-deleted course or fails with `NotFound`.
pub async fn require_course<C>(db: &C, school_id: i64, course_id: i64) -> Result<course::Model>
where
    C: ConnectionTrait,
{
    get_course(db, school_id, course_id)
        .await?
        .ok_or_else(|| Error::not_found("Course", course_id))
}

/// Lists non-deleted courses ordered by name.
pub async fn list_courses(
    db: &DatabaseConnection,
    school_id: i64,
    filter: CourseFilter,
) -> Result<Vec<course::Model>> {
    let mut query = Course::find()
        .filter(course::Column::SchoolId.eq(school_id))
        .filter(course::Column::IsDeleted.eq(false));
    if let Some(status) = filter.status {
        query = query.filter(course::Column::Status.eq(status));
    }
    if let Some(category) = filter.category {
        query = query.filter(course::Column::Category.eq(category));
    }
    query
        .order_by_asc(course::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces a course's fields. A missing status keeps the current one.
pub async fn update_course(
    db: &DatabaseConnection,
    school_id: i64,
    course_id: i64,
    input: CourseInput,
) -> Result<course::Model> {
    let (name, credits_per_session) = validate_input(db, school_id, &input).await?;
    let course = require_course(db, school_id, course_id).await?;

    let mut active: course::ActiveModel = course.into();
    active.name = Set(name);
    active.description = Set(input.description.filter(|d| !d.trim().is_empty()));
    active.category = Set(input.category);
    if let Some(status) = input.status {
        active.status = Set(status);
    }
    active.credits_per_session = Set(credits_per_session);
    active.teacher_id = Set(input.teacher_id);
    active.updated_at = Set(chrono::Utc::now());

    active.update(db).await.map_err(Into::into)
}

/// Soft-deletes a course. Attendance history keeps the denormalized name.
pub async fn delete_course(
    db: &DatabaseConnection,
    school_id: i64,
    course_id: i64,
) -> Result<course::Model> {
    let course = require_course(db, school_id, course_id).await?;

    let mut active: course::ActiveModel = course.into();
    active.is_deleted = Set(true);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Role;
    use crate::test_utils::*;

    fn input(name: &str, category: CourseCategory) -> CourseInput {
        CourseInput {
            name: name.to_string(),
            description: None,
            category,
            status: None,
            credits_per_session: None,
            teacher_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_course_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Catalog School").await?;

        let course = create_course(&db, school.id, input("Piano", CourseCategory::Art)).await?;
        assert_eq!(course.status, CourseStatus::Active);
        assert_eq!(course.credits_per_session, 1);
        assert!(!course.is_deleted);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_course_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Catalog School").await?;

        let empty = create_course(&db, school.id, input("  ", CourseCategory::Art)).await;
        assert!(matches!(empty, Err(Error::Validation { .. })));

        let mut zero = input("Judo", CourseCategory::Sport);
        zero.credits_per_session = Some(0);
        let zero = create_course(&db, school.id, zero).await;
        assert!(matches!(zero, Err(Error::Validation { .. })));

        let mut stranger = input("Judo", CourseCategory::Sport);
        stranger.teacher_id = Some(999);
        let stranger = create_course(&db, school.id, stranger).await;
        assert!(matches!(stranger, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_course_with_teacher() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Catalog School").await?;
        let teacher = create_test_user(&db, school.id, "coach@test.dev", Role::Teacher).await?;

        let mut with_teacher = input("Swimming", CourseCategory::Sport);
        with_teacher.teacher_id = Some(teacher.id);
        let course = create_course(&db, school.id, with_teacher).await?;
        assert_eq!(course.teacher_id, Some(teacher.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_courses_filters() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Catalog School").await?;
        create_course(&db, school.id, input("Math", CourseCategory::Academic)).await?;
        create_course(&db, school.id, input("Tennis", CourseCategory::Sport)).await?;
        let mut archived = input("Latin", CourseCategory::Language);
        archived.status = Some(CourseStatus::Archived);
        create_course(&db, school.id, archived).await?;

        let all = list_courses(&db, school.id, CourseFilter::default()).await?;
        assert_eq!(all.len(), 3);

        let active = list_courses(
            &db,
            school.id,
            CourseFilter {
                status: Some(CourseStatus::Active),
                category: None,
            },
        )
        .await?;
        assert_eq!(active.len(), 2);

        let sport = list_courses(
            &db,
            school.id,
            CourseFilter {
                status: None,
                category: Some(CourseCategory::Sport),
            },
        )
        .await?;
        assert_eq!(sport.len(), 1);
        assert_eq!(sport[0].name, "Tennis");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_soft_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Catalog School").await?;
        let course = create_course(&db, school.id, input("Chess", CourseCategory::Other)).await?;

        let mut change = input("Chess Club", CourseCategory::Other);
        change.credits_per_session = Some(2);
        change.status = Some(CourseStatus::Inactive);
        let updated = update_course(&db, school.id, course.id, change).await?;
        assert_eq!(updated.name, "Chess Club");
        assert_eq!(updated.credits_per_session, 2);
        assert_eq!(updated.status, CourseStatus::Inactive);

        delete_course(&db, school.id, course.id).await?;
        assert!(get_course(&db, school.id, course.id).await?.is_none());
        assert!(
            list_courses(&db, school.id, CourseFilter::default())
                .await?
                .is_empty()
        );
        Ok(())
    }
}
