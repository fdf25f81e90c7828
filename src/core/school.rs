//! School business logic - tenant lifecycle, plan quotas and feature flags.
//!
//! Schools are created by the platform superadmin. A school's plan tier decides its
//! quotas and feature flags; the superadmin may override either afterwards.
//! Deleting a school removes every scoped row in batches and is best-effort:
//! a failure midway leaves the school partially deleted and reports how far it got.

use crate::{
    config::AppConfig,
    entities::{
        Attendance, Course, CreditPackage, PackageCourse, PlanTier, Purchase, School, Student,
        StudentCredit, User, attendance, course, credit_package, package_course, purchase,
        school, student, student_credit, user,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// Largest number of rows removed by a single `DELETE` during cascade deletion.
pub const DELETE_BATCH_SIZE: u64 = 500;

/// Resources limited by a school's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaResource {
    /// Active students
    Students,
    /// Non-deleted courses
    Courses,
    /// Active staff users
    Staff,
}

impl QuotaResource {
    const fn name(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Courses => "courses",
            Self::Staff => "staff",
        }
    }
}

/// Plan-gated features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Revenue, attendance and credit reports
    Reports,
    /// Discounts on purchases
    Discounts,
}

/// Editable profile fields of a school.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolProfile {
    pub name: Option<String>,
    pub contact_email: Option<String>,
}

/// Superadmin overrides of plan-derived limits. `None` keeps the current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolOverrides {
    pub max_students: Option<i32>,
    pub max_courses: Option<i32>,
    pub max_staff: Option<i32>,
    pub reports_enabled: Option<bool>,
    pub discounts_enabled: Option<bool>,
}

/// Rows removed from one table during cascade deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDeletion {
    pub table: &'static str,
    pub rows: u64,
}

/// Outcome of [`delete_school`].
#[derive(Debug, Clone, Serialize)]
pub struct DeletionReport {
    pub school_id: i64,
    pub tables: Vec<TableDeletion>,
    pub total_rows: u64,
}

/// Creates a school with the quotas and features of `plan`.
///
/// # Errors
/// Returns an error if the name is empty or the insert fails.
pub async fn create_school(
    db: &DatabaseConnection,
    config: &AppConfig,
    name: String,
    contact_email: Option<String>,
    plan: PlanTier,
) -> Result<school::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("School name cannot be empty"));
    }

    let limits = config.plan(plan);
    let now = chrono::Utc::now();

    let school = school::ActiveModel {
        name: Set(name.trim().to_string()),
        contact_email: Set(normalize_optional(contact_email)),
        plan: Set(plan),
        max_students: Set(limits.max_students),
        max_courses: Set(limits.max_courses),
        max_staff: Set(limits.max_staff),
        reports_enabled: Set(limits.reports_enabled),
        discounts_enabled: Set(limits.discounts_enabled),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(school_id = school.id, plan = ?plan, "Created school");
    Ok(school)
}

/// Retrieves a school by id, returning None if it does not exist.
pub async fn get_school<C>(db: &C, school_id: i64) -> Result<Option<school::Model>>
where
    C: ConnectionTrait,
{
    School::find_by_id(school_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a school by id or fails with `NotFound`.
pub async fn require_school<C>(db: &C, school_id: i64) -> Result<school::Model>
where
    C: ConnectionTrait,
{
    get_school(db, school_id)
        .await?
        .ok_or_else(|| Error::not_found("School", school_id))
}

/// Lists schools ordered by name.
pub async fn list_schools(
    db: &DatabaseConnection,
    include_inactive: bool,
) -> Result<Vec<school::Model>> {
    let mut query = School::find();
    if !include_inactive {
        query = query.filter(school::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(school::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Updates name and contact email.
pub async fn update_school_profile(
    db: &DatabaseConnection,
    school_id: i64,
    profile: SchoolProfile,
) -> Result<school::Model> {
    let school = require_school(db, school_id).await?;
    let mut active: school::ActiveModel = school.into();

    if let Some(name) = profile.name {
        if name.trim().is_empty() {
            return Err(Error::validation("School name cannot be empty"));
        }
        active.name = Set(name.trim().to_string());
    }
    if profile.contact_email.is_some() {
        active.contact_email = Set(normalize_optional(profile.contact_email));
    }
    active.updated_at = Set(chrono::Utc::now());

    active.update(db).await.map_err(Into::into)
}

/// Moves a school to another plan tier and resets its limits to that tier.
pub async fn change_plan(
    db: &DatabaseConnection,
    config: &AppConfig,
    school_id: i64,
    plan: PlanTier,
) -> Result<school::Model> {
    let school = require_school(db, school_id).await?;
    let limits = config.plan(plan);

    let mut active: school::ActiveModel = school.into();
    active.plan = Set(plan);
    active.max_students = Set(limits.max_students);
    active.max_courses = Set(limits.max_courses);
    active.max_staff = Set(limits.max_staff);
    active.reports_enabled = Set(limits.reports_enabled);
    active.discounts_enabled = Set(limits.discounts_enabled);
    active.updated_at = Set(chrono::Utc::now());

    let updated = active.update(db).await?;
    tracing::info!(school_id, plan = ?plan, "Changed school plan");
    Ok(updated)
}

/// Applies superadmin overrides on top of the current limits.
pub async fn apply_overrides(
    db: &DatabaseConnection,
    school_id: i64,
    overrides: SchoolOverrides,
) -> Result<school::Model> {
    for limit in [
        overrides.max_students,
        overrides.max_courses,
        overrides.max_staff,
    ]
    .into_iter()
    .flatten()
    {
        if limit < 0 {
            return Err(Error::validation("Quota limits cannot be negative"));
        }
    }

    let school = require_school(db, school_id).await?;
    let mut active: school::ActiveModel = school.into();

    if let Some(value) = overrides.max_students {
        active.max_students = Set(value);
    }
    if let Some(value) = overrides.max_courses {
        active.max_courses = Set(value);
    }
    if let Some(value) = overrides.max_staff {
        active.max_staff = Set(value);
    }
    if let Some(value) = overrides.reports_enabled {
        active.reports_enabled = Set(value);
    }
    if let Some(value) = overrides.discounts_enabled {
        active.discounts_enabled = Set(value);
    }
    active.updated_at = Set(chrono::Utc::now());

    active.update(db).await.map_err(Into::into)
}

/// Activates or deactivates a school without touching its data.
pub async fn set_school_active(
    db: &DatabaseConnection,
    school_id: i64,
    is_active: bool,
) -> Result<school::Model> {
    let school = require_school(db, school_id).await?;
    let mut active: school::ActiveModel = school.into();
    active.is_active = Set(is_active);
    active.updated_at = Set(chrono::Utc::now());

    let updated = active.update(db).await?;
    tracing::info!(school_id, is_active, "Changed school activation");
    Ok(updated)
}

/// Fails with `QuotaExceeded` when the school already uses its full allowance of `resource`.
pub async fn ensure_capacity<C>(
    db: &C,
    school: &school::Model,
    resource: QuotaResource,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let (limit, used) = match resource {
        QuotaResource::Students => (
            school.max_students,
            Student::find()
                .filter(student::Column::SchoolId.eq(school.id))
                .filter(student::Column::IsActive.eq(true))
                .count(db)
                .await?,
        ),
        QuotaResource::Courses => (
            school.max_courses,
            Course::find()
                .filter(course::Column::SchoolId.eq(school.id))
                .filter(course::Column::IsDeleted.eq(false))
                .count(db)
                .await?,
        ),
        QuotaResource::Staff => (
            school.max_staff,
            User::find()
                .filter(user::Column::SchoolId.eq(school.id))
                .filter(user::Column::IsActive.eq(true))
                .count(db)
                .await?,
        ),
    };

    if used >= u64::try_from(limit).unwrap_or(0) {
        return Err(Error::QuotaExceeded {
            resource: resource.name(),
            limit,
        });
    }
    Ok(())
}

/// Fails with `FeatureDisabled` unless the school's plan includes `feature`.
pub fn ensure_feature(school: &school::Model, feature: Feature) -> Result<()> {
    match feature {
        Feature::Reports if !school.reports_enabled => {
            Err(Error::FeatureDisabled { feature: "reports" })
        }
        Feature::Discounts if !school.discounts_enabled => {
            Err(Error::FeatureDisabled {
                feature: "discounts",
            })
        }
        _ => Ok(()),
    }
}

/// Deletes a school and all of its rows, children before parents.
///
/// Each table is emptied in batches of [`DELETE_BATCH_SIZE`]. Nothing is rolled
/// back on failure: the error carries the table that failed and the number of rows
/// already removed.
pub async fn delete_school(db: &DatabaseConnection, school_id: i64) -> Result<DeletionReport> {
    require_school(db, school_id).await?;

    let mut report = DeletionReport {
        school_id,
        tables: Vec::new(),
        total_rows: 0,
    };

    record_step(
        &mut report,
        "attendance",
        delete_scoped_rows::<Attendance>(
            db,
            attendance::Column::Id,
            attendance::Column::SchoolId,
            school_id,
        )
        .await,
    )?;
    record_step(
        &mut report,
        "purchases",
        delete_scoped_rows::<Purchase>(
            db,
            purchase::Column::Id,
            purchase::Column::SchoolId,
            school_id,
        )
        .await,
    )?;
    record_step(
        &mut report,
        "student_credits",
        delete_scoped_rows::<StudentCredit>(
            db,
            student_credit::Column::Id,
            student_credit::Column::SchoolId,
            school_id,
        )
        .await,
    )?;
    record_step(
        &mut report,
        "package_courses",
        delete_scoped_rows::<PackageCourse>(
            db,
            package_course::Column::Id,
            package_course::Column::SchoolId,
            school_id,
        )
        .await,
    )?;
    record_step(
        &mut report,
        "credit_packages",
        delete_scoped_rows::<CreditPackage>(
            db,
            credit_package::Column::Id,
            credit_package::Column::SchoolId,
            school_id,
        )
        .await,
    )?;
    record_step(
        &mut report,
        "courses",
        delete_scoped_rows::<Course>(db, course::Column::Id, course::Column::SchoolId, school_id)
            .await,
    )?;
    record_step(
        &mut report,
        "students",
        delete_scoped_rows::<Student>(
            db,
            student::Column::Id,
            student::Column::SchoolId,
            school_id,
        )
        .await,
    )?;
    record_step(
        &mut report,
        "users",
        delete_scoped_rows::<User>(db, user::Column::Id, user::Column::SchoolId, school_id).await,
    )?;

    School::delete_by_id(school_id)
        .exec(db)
        .await
        .map_err(|source| Error::PartialDeletion {
            table: "schools",
            deleted_rows: report.total_rows,
            source,
        })?;

    tracing::info!(school_id, total_rows = report.total_rows, "Deleted school");
    Ok(report)
}

fn record_step(
    report: &mut DeletionReport,
    table: &'static str,
    outcome: std::result::Result<u64, (u64, DbErr)>,
) -> Result<()> {
    match outcome {
        Ok(rows) => {
            report.total_rows += rows;
            report.tables.push(TableDeletion { table, rows });
            Ok(())
        }
        Err((rows, source)) => {
            let deleted_rows = report.total_rows + rows;
            tracing::error!(
                school_id = report.school_id,
                table,
                deleted_rows,
                error = %source,
                "School deletion stopped"
            );
            Err(Error::PartialDeletion {
                table,
                deleted_rows,
                source,
            })
        }
    }
}

/// Removes every row of `E` belonging to `school_id`, [`DELETE_BATCH_SIZE`] rows at a time.
///
/// On failure returns the rows removed so far alongside the database error.
async fn delete_scoped_rows<E>(
    db: &DatabaseConnection,
    id_column: E::Column,
    school_column: E::Column,
    school_id: i64,
) -> std::result::Result<u64, (u64, DbErr)>
where
    E: EntityTrait,
{
    let mut deleted = 0;
    loop {
        let ids: Vec<i64> = E::find()
            .select_only()
            .column(id_column)
            .filter(school_column.eq(school_id))
            .limit(DELETE_BATCH_SIZE)
            .into_tuple()
            .all(db)
            .await
            .map_err(|e| (deleted, e))?;

        if ids.is_empty() {
            return Ok(deleted);
        }

        let result = E::delete_many()
            .filter(id_column.is_in(ids))
            .exec(db)
            .await
            .map_err(|e| (deleted, e))?;

        if result.rows_affected == 0 {
            return Ok(deleted);
        }
        deleted += result.rows_affected;
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
