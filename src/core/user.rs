//! Staff user business logic - accounts, roles and capabilities.
//!
//! Identity (passwords, tokens, resets) belongs to the external identity provider;
//! this module only tracks which school a user works for and what their role allows.

use crate::{
    core::school::{self, QuotaResource},
    entities::{Role, User, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Edit the school profile
    ManageSchool,
    /// Create, re-role and deactivate staff
    ManageStaff,
    /// Create and edit courses and packages
    ManageCatalog,
    /// Create and edit students
    ManageStudents,
    /// Record purchases and adjust credits
    SellCredits,
    /// Record and undo check-ins
    RecordAttendance,
    /// Read reports
    ViewReports,
    /// Read roster, catalog, credits and attendance
    ViewRoster,
}

/// Whether `role` may perform `capability` inside its own school.
#[must_use]
pub const fn role_allows(role: Role, capability: Capability) -> bool {
    match role {
        Role::Superadmin | Role::Owner => true,
        Role::Admin => !matches!(capability, Capability::ManageSchool | Capability::ManageStaff),
        Role::Teacher => matches!(
            capability,
            Capability::RecordAttendance | Capability::ViewRoster
        ),
    }
}

/// Creates a staff user for a school.
///
/// # Errors
/// Returns an error if:
/// - The role is `Superadmin` (only created at bootstrap)
/// - The email or display name is invalid
/// - The school does not exist, is inactive or has no staff capacity left
/// - The email is already registered
pub async fn create_user(
    db: &DatabaseConnection,
    school_id: i64,
    email: &str,
    display_name: &str,
    role: Role,
) -> Result<user::Model> {
    if role == Role::Superadmin {
        return Err(Error::validation(
            "Superadmin accounts cannot belong to a school",
        ));
    }
    let email = normalize_email(email)?;
    if display_name.trim().is_empty() {
        return Err(Error::validation("Display name cannot be empty"));
    }

    let txn = db.begin().await?;

    let school = school::require_school(&txn, school_id).await?;
    if !school.is_active {
        return Err(Error::Forbidden {
            message: "School is deactivated".to_string(),
        });
    }
    school::ensure_capacity(&txn, &school, QuotaResource::Staff).await?;

    if find_by_email(&txn, &email).await?.is_some() {
        return Err(Error::Conflict {
            message: format!("Email {email} is already registered"),
        });
    }

    let now = chrono::Utc::now();
    let user = user::ActiveModel {
        school_id: Set(Some(school_id)),
        email: Set(email),
        display_name: Set(display_name.trim().to_string()),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(school_id, user_id = user.id, role = ?role, "Created staff user");
    Ok(user)
}

/// Returns the superadmin with `email`, creating it when missing.
///
/// Used at start-up from the bootstrap section of config.toml.
pub async fn ensure_superadmin(
    db: &DatabaseConnection,
    email: &str,
    display_name: &str,
) -> Result<user::Model> {
    let email = normalize_email(email)?;

    if let Some(existing) = find_by_email(db, &email).await? {
        if existing.role != Role::Superadmin {
            return Err(Error::Conflict {
                message: format!("{email} is already registered as a school user"),
            });
        }
        return Ok(existing);
    }

    let now = chrono::Utc::now();
    let user = user::ActiveModel {
        school_id: Set(None),
        email: Set(email),
        display_name: Set(display_name.trim().to_string()),
        role: Set(Role::Superadmin),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = user.id, "Created superadmin");
    Ok(user)
}

/// Retrieves a user by id.
pub async fn get_user(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by email (case-insensitive).
pub async fn find_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists the staff of a school, ordered by display name.
pub async fn list_users(
    db: &DatabaseConnection,
    school_id: i64,
    include_inactive: bool,
) -> Result<Vec<user::Model>> {
    let mut query = User::find().filter(user::Column::SchoolId.eq(school_id));
    if !include_inactive {
        query = query.filter(user::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(user::Column::DisplayName)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn require_school_user<C>(db: &C, school_id: i64, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .filter(user::Column::SchoolId.eq(school_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))
}

async fn active_owner_count<C>(db: &C, school_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::SchoolId.eq(school_id))
        .filter(user::Column::Role.eq(Role::Owner))
        .filter(user::Column::IsActive.eq(true))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Changes a staff member's role. A school always keeps at least one active owner.
pub async fn change_role(
    db: &DatabaseConnection,
    school_id: i64,
    user_id: i64,
    role: Role,
) -> Result<user::Model> {
    if role == Role::Superadmin {
        return Err(Error::validation(
            "Superadmin accounts cannot belong to a school",
        ));
    }

    let txn = db.begin().await?;
    let user = require_school_user(&txn, school_id, user_id).await?;

    if user.role == Role::Owner
        && role != Role::Owner
        && user.is_active
        && active_owner_count(&txn, school_id).await? <= 1
    {
        return Err(Error::validation("A school must keep at least one owner"));
    }

    let mut active: user::ActiveModel = user.into();
    active.role = Set(role);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Deactivates a staff member. The last active owner cannot be deactivated.
pub async fn deactivate_user(
    db: &DatabaseConnection,
    school_id: i64,
    user_id: i64,
) -> Result<user::Model> {
    let txn = db.begin().await?;
    let user = require_school_user(&txn, school_id, user_id).await?;

    if user.role == Role::Owner && user.is_active && active_owner_count(&txn, school_id).await? <= 1
    {
        return Err(Error::validation("A school must keep at least one owner"));
    }

    let mut active: user::ActiveModel = user.into();
    active.is_active = Set(false);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    tracing::info!(school_id, user_id, "Deactivated staff user");
    Ok(updated)
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(email)
    } else {
        Err(Error::validation(format!("Invalid email address: {email}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::school::SchoolOverrides;
    use crate::test_utils::*;

    #[test]
    fn test_role_capabilities() {
        assert!(role_allows(Role::Owner, Capability::ManageStaff));
        assert!(role_allows(Role::Admin, Capability::SellCredits));
        assert!(!role_allows(Role::Admin, Capability::ManageStaff));
        assert!(!role_allows(Role::Admin, Capability::ManageSchool));
        assert!(role_allows(Role::Teacher, Capability::RecordAttendance));
        assert!(!role_allows(Role::Teacher, Capability::SellCredits));
        assert!(!role_allows(Role::Teacher, Capability::ViewReports));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Jane.Doe@School.TEST ").ok(),
            Some("jane.doe@school.test".to_string())
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@school.test").is_err());
        assert!(normalize_email("jane@localhost").is_err());
    }

    #[tokio::test]
    async fn test_create_user_lowercases_and_rejects_duplicates() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Staff School").await?;

        let user = create_user(&db, school.id, "Teacher@Test.DEV", "Tess", Role::Teacher).await?;
        assert_eq!(user.email, "teacher@test.dev");
        assert_eq!(user.school_id, Some(school.id));

        let duplicate = create_user(&db, school.id, "teacher@test.dev", "Tess 2", Role::Admin).await;
        assert!(matches!(duplicate, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_rejects_superadmin_role() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Staff School").await?;
        let result = create_user(&db, school.id, "root@test.dev", "Root", Role::Superadmin).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_staff_quota() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Small Staff").await?;
        school::apply_overrides(
            &db,
            school.id,
            SchoolOverrides {
                max_staff: Some(1),
                ..Default::default()
            },
        )
        .await?;

        create_user(&db, school.id, "one@test.dev", "One", Role::Owner).await?;
        let result = create_user(&db, school.id, "two@test.dev", "Two", Role::Teacher).await;
        assert!(matches!(
            result,
            Err(Error::QuotaExceeded {
                resource: "staff",
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_last_owner_is_protected() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Owner School").await?;
        let owner = create_test_user(&db, school.id, "owner@test.dev", Role::Owner).await?;

        let demote = change_role(&db, school.id, owner.id, Role::Admin).await;
        assert!(matches!(demote, Err(Error::Validation { .. })));
        let deactivate = deactivate_user(&db, school.id, owner.id).await;
        assert!(matches!(deactivate, Err(Error::Validation { .. })));

        let second = create_test_user(&db, school.id, "second@test.dev", Role::Owner).await?;
        let demoted = change_role(&db, school.id, owner.id, Role::Admin).await?;
        assert_eq!(demoted.role, Role::Admin);
        assert_eq!(list_users(&db, school.id, false).await?.len(), 2);

        let deactivated = deactivate_user(&db, school.id, demoted.id).await?;
        assert!(!deactivated.is_active);
        assert_eq!(list_users(&db, school.id, false).await?[0].id, second.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_users_are_scoped_to_their_school() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_school(&db, "First").await?;
        let second = create_test_school(&db, "Second").await?;
        let user = create_test_user(&db, first.id, "scoped@test.dev", Role::Admin).await?;

        let result = change_role(&db, second.id, user.id, Role::Teacher).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_superadmin_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let first = ensure_superadmin(&db, "Root@Platform.dev", "Root").await?;
        let second = ensure_superadmin(&db, "root@platform.dev", "Root").await?;
        assert_eq!(first.id, second.id);
        assert_eq!(first.role, Role::Superadmin);
        assert!(first.school_id.is_none());

        let school = create_test_school(&db, "Clash").await?;
        create_test_user(&db, school.id, "staff@platform.dev", Role::Admin).await?;
        let clash = ensure_superadmin(&db, "staff@platform.dev", "Staff").await;
        assert!(matches!(clash, Err(Error::Conflict { .. })));
        Ok(())
    }
}
