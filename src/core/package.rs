//! Credit package business logic - pricing, course targeting and validity.
//!
//! A package can be used for a course in one of three ways, resolved by priority:
//! 1. `is_universal` - every course of the school
//! 2. an explicit applicable-course list (when non-empty)
//! 3. the legacy single `course_id`
//!
//! The pure helpers in this module ([`price_per_credit`], [`final_price`],
//! [`applies_to_course`], [`ValidityPolicy::expires_at`]) carry the pricing rules;
//! the async functions persist packages and their course links.

use crate::{
    core::course,
    entities::{CreditPackage, PackageCourse, ValidityType, credit_package, package_course},
    errors::{Error, Result},
};
use chrono::{DateTime, Months, NaiveDate, NaiveTime, TimeDelta, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Price of one credit, bonus credits included. A package without credits costs 0 per credit.
#[must_use]
pub fn price_per_credit(price: f64, credits: i32, bonus_credits: i32) -> f64 {
    let total = f64::from(credits) + f64::from(bonus_credits);
    if total <= 0.0 {
        return 0.0;
    }
    price / total
}

/// Amount charged after a discount, never below zero.
#[must_use]
pub fn final_price(package_price: f64, discount_amount: f64) -> f64 {
    (package_price - discount_amount).max(0.0)
}

/// Which courses a package can pay for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageTarget {
    /// Every course of the school
    Universal,
    /// An explicit list of courses
    Courses(Vec<i64>),
    /// The legacy single course
    Course(i64),
    /// No course at all
    Unassigned,
}

impl PackageTarget {
    /// Resolves targeting fields by priority: universal, explicit list, legacy course.
    #[must_use]
    pub fn resolve(is_universal: bool, course_ids: &[i64], legacy_course_id: Option<i64>) -> Self {
        if is_universal {
            Self::Universal
        } else if !course_ids.is_empty() {
            Self::Courses(course_ids.to_vec())
        } else if let Some(course_id) = legacy_course_id {
            Self::Course(course_id)
        } else {
            Self::Unassigned
        }
    }

    /// Whether credits bought under this target can be spent on `course_id`.
    #[must_use]
    pub fn includes(&self, course_id: i64) -> bool {
        match self {
            Self::Universal => true,
            Self::Courses(ids) => ids.contains(&course_id),
            Self::Course(id) => *id == course_id,
            Self::Unassigned => false,
        }
    }
}

/// Whether a package is usable for `course_id`.
#[must_use]
pub fn applies_to_course(
    is_universal: bool,
    applicable_course_ids: &[i64],
    legacy_course_id: Option<i64>,
    course_id: i64,
) -> bool {
    PackageTarget::resolve(is_universal, applicable_course_ids, legacy_course_id).includes(course_id)
}

/// Expiry rule of a package, validated from its stored columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityPolicy {
    Unlimited,
    Days(u32),
    Months(u32),
    /// Usable through the end of this date (UTC)
    FixedDate(NaiveDate),
}

impl ValidityPolicy {
    /// Builds a policy from the stored validity columns.
    pub fn from_parts(
        validity: ValidityType,
        value: Option<i32>,
        valid_until: Option<NaiveDate>,
    ) -> Result<Self> {
        let positive = |value: Option<i32>| {
            value
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
                .ok_or_else(|| Error::validation("Validity period must be a positive number"))
        };

        match validity {
            ValidityType::Unlimited => Ok(Self::Unlimited),
            ValidityType::Days => positive(value).map(Self::Days),
            ValidityType::Months => positive(value).map(Self::Months),
            ValidityType::FixedDate => valid_until
                .map(Self::FixedDate)
                .ok_or_else(|| Error::validation("Fixed-date validity requires valid_until")),
        }
    }

    /// Policy of a stored package.
    pub fn of(package: &credit_package::Model) -> Result<Self> {
        Self::from_parts(package.validity, package.validity_value, package.valid_until)
    }

    /// When credits bought at `purchased_at` stop being usable. `None` never expires.
    #[must_use]
    pub fn expires_at(&self, purchased_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            Self::Unlimited => None,
            Self::Days(days) => purchased_at.checked_add_signed(TimeDelta::days(i64::from(days))),
            Self::Months(months) => purchased_at.checked_add_months(Months::new(months)),
            Self::FixedDate(date) => Some(
                date.succ_opt()
                    .unwrap_or(date)
                    .and_time(NaiveTime::MIN)
                    .and_utc(),
            ),
        }
    }
}

/// Fields accepted when creating or updating a package.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub credits: i32,
    #[serde(default)]
    pub bonus_credits: i32,
    pub price: f64,
    #[serde(default = "default_validity")]
    pub validity: ValidityType,
    #[serde(default)]
    pub validity_value: Option<i32>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub is_universal: bool,
    #[serde(default)]
    pub applicable_course_ids: Vec<i64>,
    #[serde(default)]
    pub course_id: Option<i64>,
}

const fn default_validity() -> ValidityType {
    ValidityType::Unlimited
}

/// A package together with its resolved course list and unit price.
#[derive(Debug, Clone, Serialize)]
pub struct PackageDetails {
    #[serde(flatten)]
    pub package: credit_package::Model,
    pub applicable_course_ids: Vec<i64>,
    pub price_per_credit: f64,
}

impl PackageDetails {
    fn new(package: credit_package::Model, applicable_course_ids: Vec<i64>) -> Self {
        let price_per_credit =
            price_per_credit(package.price, package.credits, package.bonus_credits);
        Self {
            package,
            applicable_course_ids,
            price_per_credit,
        }
    }

    /// Resolved targeting of this package.
    #[must_use]
    pub fn target(&self) -> PackageTarget {
        PackageTarget::resolve(
            self.package.is_universal,
            &self.applicable_course_ids,
            self.package.course_id,
        )
    }
}

async fn validate_input<C>(db: &C, school_id: i64, input: &PackageInput) -> Result<String>
where
    C: ConnectionTrait,
{
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::validation("Package name cannot be empty"));
    }
    if input.credits < 1 {
        return Err(Error::validation("A package must grant at least 1 credit"));
    }
    if input.bonus_credits < 0 {
        return Err(Error::validation("Bonus credits cannot be negative"));
    }
    if input.credits.checked_add(input.bonus_credits).is_none() {
        return Err(Error::validation("Package grants too many credits"));
    }
    if !input.price.is_finite() || input.price < 0.0 {
        return Err(Error::InvalidAmount {
            amount: input.price,
        });
    }
    ValidityPolicy::from_parts(input.validity, input.validity_value, input.valid_until)?;

    for course_id in input.applicable_course_ids.iter().chain(input.course_id.iter()) {
        course::require_course(db, school_id, *course_id).await?;
    }

    Ok(name.to_string())
}

fn dedup_course_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

async fn replace_course_links<C>(
    db: &C,
    school_id: i64,
    package_id: i64,
    course_ids: &[i64],
) -> Result<()>
where
    C: ConnectionTrait,
{
    PackageCourse::delete_many()
        .filter(package_course::Column::PackageId.eq(package_id))
        .exec(db)
        .await?;

    if course_ids.is_empty() {
        return Ok(());
    }

    let links = course_ids.iter().map(|course_id| package_course::ActiveModel {
        school_id: Set(school_id),
        package_id: Set(package_id),
        course_id: Set(*course_id),
        ..Default::default()
    });
    PackageCourse::insert_many(links).exec(db).await?;
    Ok(())
}

/// Applicable course ids of a package, ascending.
pub async fn load_course_ids<C>(db: &C, package_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let links = PackageCourse::find()
        .filter(package_course::Column::PackageId.eq(package_id))
        .order_by_asc(package_course::Column::CourseId)
        .all(db)
        .await?;
    Ok(links.into_iter().map(|link| link.course_id).collect())
}

/// Resolved targets for a set of packages, keyed by package id.
pub async fn load_targets<C>(db: &C, package_ids: &[i64]) -> Result<HashMap<i64, PackageTarget>>
where
    C: ConnectionTrait,
{
    if package_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let packages = CreditPackage::find()
        .filter(credit_package::Column::Id.is_in(package_ids.iter().copied()))
        .all(db)
        .await?;
    let links = PackageCourse::find()
        .filter(package_course::Column::PackageId.is_in(package_ids.iter().copied()))
        .all(db)
        .await?;

    let mut course_ids: HashMap<i64, Vec<i64>> = HashMap::new();
    for link in links {
        course_ids.entry(link.package_id).or_default().push(link.course_id);
    }

    Ok(packages
        .into_iter()
        .map(|package| {
            let ids = course_ids.remove(&package.id).unwrap_or_default();
            let target = PackageTarget::resolve(package.is_universal, &ids, package.course_id);
            (package.id, target)
        })
        .collect())
}

/// Creates a package and its applicable-course links.
pub async fn create_package(
    db: &DatabaseConnection,
    school_id: i64,
    input: PackageInput,
) -> Result<PackageDetails> {
    let txn = db.begin().await?;
    let name = validate_input(&txn, school_id, &input).await?;
    let course_ids = dedup_course_ids(&input.applicable_course_ids);

    let now = chrono::Utc::now();
    let package = credit_package::ActiveModel {
        school_id: Set(school_id),
        name: Set(name),
        description: Set(input.description.filter(|d| !d.trim().is_empty())),
        credits: Set(input.credits),
        bonus_credits: Set(input.bonus_credits),
        price: Set(input.price),
        validity: Set(input.validity),
        validity_value: Set(input.validity_value),
        valid_until: Set(input.valid_until),
        is_universal: Set(input.is_universal),
        course_id: Set(input.course_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    replace_course_links(&txn, school_id, package.id, &course_ids).await?;
    txn.commit().await?;

    Ok(PackageDetails::new(package, course_ids))
}

/// Retrieves a package of the school with its course list, active or not.
pub async fn get_package<C>(db: &C, school_id: i64, package_id: i64) -> Result<Option<PackageDetails>>
where
    C: ConnectionTrait,
{
    let Some(package) = CreditPackage::find_by_id(package_id)
        .filter(credit_package::Column::SchoolId.eq(school_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let course_ids = load_course_ids(db, package.id).await?;
    Ok(Some(PackageDetails::new(package, course_ids)))
}

/// Lists packages ordered by name. With `course_id`, only packages usable for that course.
pub async fn list_packages(
    db: &DatabaseConnection,
    school_id: i64,
    include_inactive: bool,
    course_id: Option<i64>,
) -> Result<Vec<PackageDetails>> {
    let mut query = CreditPackage::find().filter(credit_package::Column::SchoolId.eq(school_id));
    if !include_inactive {
        query = query.filter(credit_package::Column::IsActive.eq(true));
    }
    let packages = query
        .order_by_asc(credit_package::Column::Name)
        .all(db)
        .await?;

    let links = PackageCourse::find()
        .filter(package_course::Column::SchoolId.eq(school_id))
        .order_by_asc(package_course::Column::CourseId)
        .all(db)
        .await?;
    let mut course_ids: HashMap<i64, Vec<i64>> = HashMap::new();
    for link in links {
        course_ids.entry(link.package_id).or_default().push(link.course_id);
    }

    Ok(packages
        .into_iter()
        .map(|package| {
            let ids = course_ids.remove(&package.id).unwrap_or_default();
            PackageDetails::new(package, ids)
        })
        .filter(|details| course_id.is_none_or(|id| details.target().includes(id)))
        .collect())
}

/// Replaces a package's fields and course list.
///
/// Credits already bought keep their counters and expiry; targeting changes apply
/// to them from now on.
pub async fn update_package(
    db: &DatabaseConnection,
    school_id: i64,
    package_id: i64,
    input: PackageInput,
) -> Result<PackageDetails> {
    let txn = db.begin().await?;
    let name = validate_input(&txn, school_id, &input).await?;
    let existing = get_package(&txn, school_id, package_id)
        .await?
        .ok_or_else(|| Error::not_found("Package", package_id))?;
    let course_ids = dedup_course_ids(&input.applicable_course_ids);

    let mut active: credit_package::ActiveModel = existing.package.into();
    active.name = Set(name);
    active.description = Set(input.description.filter(|d| !d.trim().is_empty()));
    active.credits = Set(input.credits);
    active.bonus_credits = Set(input.bonus_credits);
    active.price = Set(input.price);
    active.validity = Set(input.validity);
    active.validity_value = Set(input.validity_value);
    active.valid_until = Set(input.valid_until);
    active.is_universal = Set(input.is_universal);
    active.course_id = Set(input.course_id);
    active.updated_at = Set(chrono::Utc::now());
    let package = active.update(&txn).await?;

    replace_course_links(&txn, school_id, package_id, &course_ids).await?;
    txn.commit().await?;

    Ok(PackageDetails::new(package, course_ids))
}

/// Soft-deletes a package so it can no longer be purchased.
pub async fn deactivate_package(
    db: &DatabaseConnection,
    school_id: i64,
    package_id: i64,
) -> Result<credit_package::Model> {
    let package = CreditPackage::find_by_id(package_id)
        .filter(credit_package::Column::SchoolId.eq(school_id))
        .filter(credit_package::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Package", package_id))?;

    let mut active: credit_package::ActiveModel = package.into();
    active.is_active = Set(false);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::CourseCategory;
    use crate::test_utils::*;
    use chrono::TimeZone;

    fn input(name: &str) -> PackageInput {
        PackageInput {
            name: name.to_string(),
            description: None,
            credits: 10,
            bonus_credits: 0,
            price: 100.0,
            validity: ValidityType::Unlimited,
            validity_value: None,
            valid_until: None,
            is_universal: false,
            applicable_course_ids: Vec::new(),
            course_id: None,
        }
    }

    #[test]
    fn test_price_per_credit() {
        assert_eq!(price_per_credit(100.0, 10, 0), 10.0);
        assert_eq!(price_per_credit(120.0, 10, 2), 10.0);
        assert_eq!(price_per_credit(50.0, 0, 0), 0.0);
        assert!(price_per_credit(1.0, i32::MAX, i32::MAX) > 0.0);
    }

    #[test]
    fn test_final_price_never_negative() {
        assert_eq!(final_price(100.0, 15.0), 85.0);
        assert_eq!(final_price(100.0, 0.0), 100.0);
        assert_eq!(final_price(100.0, 150.0), 0.0);
    }

    #[test]
    fn test_targeting_priority() {
        // Universal wins over everything
        assert!(applies_to_course(true, &[1], Some(2), 99));
        // Explicit list wins over the legacy course
        assert!(applies_to_course(false, &[1, 3], Some(2), 3));
        assert!(!applies_to_course(false, &[1, 3], Some(2), 2));
        // Legacy course is the fallback
        assert!(applies_to_course(false, &[], Some(2), 2));
        assert!(!applies_to_course(false, &[], Some(2), 3));
        // Nothing set targets nothing
        assert!(!applies_to_course(false, &[], None, 1));
    }

    #[test]
    fn test_validity_policy_from_parts() {
        assert_eq!(
            ValidityPolicy::from_parts(ValidityType::Days, Some(30), None).unwrap(),
            ValidityPolicy::Days(30)
        );
        assert!(ValidityPolicy::from_parts(ValidityType::Days, None, None).is_err());
        assert!(ValidityPolicy::from_parts(ValidityType::Months, Some(0), None).is_err());
        assert!(ValidityPolicy::from_parts(ValidityType::Months, Some(-3), None).is_err());
        assert!(ValidityPolicy::from_parts(ValidityType::FixedDate, None, None).is_err());
        assert_eq!(
            ValidityPolicy::from_parts(ValidityType::Unlimited, Some(5), None).unwrap(),
            ValidityPolicy::Unlimited
        );
    }

    #[test]
    fn test_expiry_computation() {
        let purchased = Utc.with_ymd_and_hms(2026, 1, 31, 10, 0, 0).unwrap();

        assert_eq!(ValidityPolicy::Unlimited.expires_at(purchased), None);
        assert_eq!(
            ValidityPolicy::Days(10).expires_at(purchased),
            Some(Utc.with_ymd_and_hms(2026, 2, 10, 10, 0, 0).unwrap())
        );
        // Month arithmetic clamps to the last day of the month
        assert_eq!(
            ValidityPolicy::Months(1).expires_at(purchased),
            Some(Utc.with_ymd_and_hms(2026, 2, 28, 10, 0, 0).unwrap())
        );
        let date = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        assert_eq!(
            ValidityPolicy::FixedDate(date).expires_at(purchased),
            Some(Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_create_package_with_course_list() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Package School").await?;
        let piano = create_test_course(&db, school.id, "Piano", CourseCategory::Art).await?;
        let violin = create_test_course(&db, school.id, "Violin", CourseCategory::Art).await?;

        let mut package = input("Strings & Keys");
        package.bonus_credits = 2;
        package.price = 120.0;
        package.applicable_course_ids = vec![violin.id, piano.id, violin.id];
        let details = create_package(&db, school.id, package).await?;

        assert_eq!(details.applicable_course_ids, vec![piano.id, violin.id]);
        assert_eq!(details.price_per_credit, 10.0);
        assert!(details.target().includes(piano.id));

        let loaded = get_package(&db, school.id, details.package.id).await?.unwrap();
        assert_eq!(loaded.applicable_course_ids, vec![piano.id, violin.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_package_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Package School").await?;

        let mut zero = input("Zero");
        zero.credits = 0;
        assert!(matches!(
            create_package(&db, school.id, zero).await,
            Err(Error::Validation { .. })
        ));

        let mut negative = input("Negative");
        negative.price = -1.0;
        assert!(matches!(
            create_package(&db, school.id, negative).await,
            Err(Error::InvalidAmount { .. })
        ));

        let mut huge = input("Huge");
        huge.credits = i32::MAX;
        huge.bonus_credits = 1;
        assert!(matches!(
            create_package(&db, school.id, huge).await,
            Err(Error::Validation { .. })
        ));

        let mut days = input("Days");
        days.validity = ValidityType::Days;
        assert!(matches!(
            create_package(&db, school.id, days).await,
            Err(Error::Validation { .. })
        ));

        let mut foreign = input("Foreign");
        foreign.applicable_course_ids = vec![12345];
        assert!(matches!(
            create_package(&db, school.id, foreign).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_packages_for_course() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Package School").await?;
        let math = create_test_course(&db, school.id, "Math", CourseCategory::Academic).await?;
        let art = create_test_course(&db, school.id, "Art", CourseCategory::Art).await?;

        let mut universal = input("All Access");
        universal.is_universal = true;
        create_package(&db, school.id, universal).await?;

        let mut legacy = input("Math Legacy");
        legacy.course_id = Some(math.id);
        create_package(&db, school.id, legacy).await?;

        let mut listed = input("Art Pack");
        listed.applicable_course_ids = vec![art.id];
        listed.course_id = Some(math.id);
        create_package(&db, school.id, listed).await?;

        let for_math = list_packages(&db, school.id, false, Some(math.id)).await?;
        let names: Vec<&str> = for_math.iter().map(|p| p.package.name.as_str()).collect();
        assert_eq!(names, ["All Access", "Math Legacy"]);

        let for_art = list_packages(&db, school.id, false, Some(art.id)).await?;
        assert_eq!(for_art.len(), 2);
        assert_eq!(list_packages(&db, school.id, false, None).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_replaces_course_links_and_deactivate() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Package School").await?;
        let first = create_test_course(&db, school.id, "First", CourseCategory::Other).await?;
        let second = create_test_course(&db, school.id, "Second", CourseCategory::Other).await?;
        let created = create_course_list_package(&db, school.id, &[first.id], 10).await?;

        let mut change = input("Renamed");
        change.applicable_course_ids = vec![second.id];
        let updated = update_package(&db, school.id, created.package.id, change).await?;
        assert_eq!(updated.package.name, "Renamed");
        assert_eq!(updated.applicable_course_ids, vec![second.id]);
        assert_eq!(load_course_ids(&db, created.package.id).await?, vec![second.id]);

        deactivate_package(&db, school.id, created.package.id).await?;
        assert!(list_packages(&db, school.id, false, None).await?.is_empty());
        assert_eq!(list_packages(&db, school.id, true, None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_targets() -> Result<()> {
        let db = setup_test_db().await?;
        let school = create_test_school(&db, "Package School").await?;
        let course = create_test_course(&db, school.id, "Yoga", CourseCategory::Sport).await?;
        let listed = create_course_list_package(&db, school.id, &[course.id], 5).await?;
        let universal = create_universal_package(&db, school.id, 5).await?;

        let targets = load_targets(&db, &[listed.package.id, universal.package.id]).await?;
        assert_eq!(
            targets.get(&listed.package.id),
            Some(&PackageTarget::Courses(vec![course.id]))
        );
        assert_eq!(
            targets.get(&universal.package.id),
            Some(&PackageTarget::Universal)
        );
        Ok(())
    }
}
