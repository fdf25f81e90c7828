//! Student credit business logic - purchases, balances and deductions.
//!
//! A purchase writes a `student_credits` row and its `purchases` payment record in one
//! database transaction. Credits are spent through [`deduct_credits`], a single guarded
//! `UPDATE` that refuses to take `remaining_credits` below zero.

use crate::{
    core::{
        package::{self, ValidityPolicy},
        school::{self, Feature},
        student,
    },
    entities::{
        CreditPackage, PaymentMethod, StudentCredit, credit_package, purchase, student_credit,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};

/// Details of a package sale.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    pub package_id: i64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub note: Option<String>,
}

const fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Cash
}

/// Rows written by a purchase.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub credit: student_credit::Model,
    pub purchase: purchase::Model,
}

/// Derived state of a student credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    Active,
    Expired,
    Exhausted,
}

/// Status of `credit` at `now`. Expiry takes precedence over exhaustion.
#[must_use]
pub fn credit_status(credit: &student_credit::Model, now: DateTime<Utc>) -> CreditStatus {
    if is_expired(credit, now) {
        CreditStatus::Expired
    } else if credit.remaining_credits <= 0 {
        CreditStatus::Exhausted
    } else {
        CreditStatus::Active
    }
}

/// Whether `credit` can no longer be used at `now`.
#[must_use]
pub fn is_expired(credit: &student_credit::Model, now: DateTime<Utc>) -> bool {
    credit.expires_at.is_some_and(|expires_at| now >= expires_at)
}

/// A credit row with its derived status.
#[derive(Debug, Clone, Serialize)]
pub struct CreditView {
    #[serde(flatten)]
    pub credit: student_credit::Model,
    pub status: CreditStatus,
}

/// Aggregate balance of one student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudentBalance {
    pub student_id: i64,
    /// Remaining credits on non-expired rows
    pub usable_credits: i64,
    /// Remaining credits lost to expiry
    pub expired_credits: i64,
    /// Number of rows in `Active` status
    pub active_packages: usize,
}

/// Sells a package to a student.
///
/// # Errors
/// Returns an error if:
/// - The discount is negative or not finite
/// - A discount is given while the school's plan does not include discounts
/// - The student or package is missing, inactive or belongs to another school
/// - A fixed-date package's validity has already ended
pub async fn purchase_package(
    db: &DatabaseConnection,
    school_id: i64,
    student_id: i64,
    request: PurchaseRequest,
    purchased_by: Option<i64>,
) -> Result<PurchaseReceipt> {
    let discount = request.discount_amount;
    if !discount.is_finite() || discount < 0.0 {
        return Err(Error::InvalidAmount { amount: discount });
    }

    let txn = db.begin().await?;

    let school = school::require_school(&txn, school_id).await?;
    if discount > 0.0 {
        school::ensure_feature(&school, Feature::Discounts)?;
    }

    let student = student::require_active_student(&txn, school_id, student_id).await?;
    let package = CreditPackage::find_by_id(request.package_id)
        .filter(credit_package::Column::SchoolId.eq(school_id))
        .filter(credit_package::Column::IsActive.eq(true))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Package", request.package_id))?;

    let granted = package
        .credits
        .checked_add(package.bonus_credits)
        .ok_or_else(|| {
            Error::validation(format!("Package {} grants too many credits", package.name))
        })?;

    let now = Utc::now();
    let expires_at = ValidityPolicy::of(&package)?.expires_at(now);
    if expires_at.is_some_and(|expires_at| expires_at <= now) {
        return Err(Error::validation(format!(
            "Package {} is no longer valid",
            package.name
        )));
    }

    let credit = student_credit::ActiveModel {
        school_id: Set(school_id),
        student_id: Set(student.id),
        package_id: Set(package.id),
        package_name: Set(package.name.clone()),
        total_credits: Set(package.credits),
        bonus_credits: Set(package.bonus_credits),
        used_credits: Set(0),
        remaining_credits: Set(granted),
        purchased_at: Set(now),
        expires_at: Set(expires_at),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let purchase = purchase::ActiveModel {
        school_id: Set(school_id),
        student_id: Set(student.id),
        package_id: Set(package.id),
        student_credit_id: Set(credit.id),
        original_price: Set(package.price),
        discount_amount: Set(discount),
        final_price: Set(package::final_price(package.price, discount)),
        payment_method: Set(request.payment_method),
        note: Set(request.note.filter(|n| !n.trim().is_empty())),
        purchased_by: Set(purchased_by),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        school_id,
        student_id,
        package_id = package.id,
        credit_id = credit.id,
        final_price = purchase.final_price,
        "Recorded purchase"
    );
    Ok(PurchaseReceipt { credit, purchase })
}

/// Retrieves a credit of the school by id.
pub async fn get_credit<C>(
    db: &C,
    school_id: i64,
    credit_id: i64,
) -> Result<Option<student_credit::Model>>
where
    C: ConnectionTrait,
{
    StudentCredit::find_by_id(credit_id)
        .filter(student_credit::Column::SchoolId.eq(school_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists every credit of a student, newest purchase first.
pub async fn list_student_credits(
    db: &DatabaseConnection,
    school_id: i64,
    student_id: i64,
) -> Result<Vec<CreditView>> {
    let now = Utc::now();
    let credits = StudentCredit::find()
        .filter(student_credit::Column::SchoolId.eq(school_id))
        .filter(student_credit::Column::StudentId.eq(student_id))
        .order_by_desc(student_credit::Column::PurchasedAt)
        .order_by_desc(student_credit::Column::Id)
        .all(db)
        .await?;

    Ok(credits
        .into_iter()
        .map(|credit| CreditView {
            status: credit_status(&credit, now),
            credit,
        })
        .collect())
}

/// Sorts credits so the one to spend first comes first: soonest expiry, then oldest purchase.
pub fn sort_for_spending(credits: &mut [student_credit::Model]) {
    credits.sort_by(|a, b| {
        let expiry = match (a.expires_at, b.expires_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        expiry
            .then(a.purchased_at.cmp(&b.purchased_at))
            .then(a.id.cmp(&b.id))
    });
}

/// Credits a student can spend on `course_id` at `now`, in spending order.
pub async fn usable_credits<C>(
    db: &C,
    school_id: i64,
    student_id: i64,
    course_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<student_credit::Model>>
where
    C: ConnectionTrait,
{
    let candidates: Vec<student_credit::Model> = StudentCredit::find()
        .filter(student_credit::Column::SchoolId.eq(school_id))
        .filter(student_credit::Column::StudentId.eq(student_id))
        .filter(student_credit::Column::RemainingCredits.gt(0))
        .all(db)
        .await?
        .into_iter()
        .filter(|credit| !is_expired(credit, now))
        .collect();

    let mut package_ids: Vec<i64> = candidates.iter().map(|c| c.package_id).collect();
    package_ids.sort_unstable();
    package_ids.dedup();
    let targets = package::load_targets(db, &package_ids).await?;

    let mut usable: Vec<student_credit::Model> = candidates
        .into_iter()
        .filter(|credit| {
            targets
                .get(&credit.package_id)
                .is_some_and(|target| target.includes(course_id))
        })
        .collect();
    sort_for_spending(&mut usable);
    Ok(usable)
}

/// Sums a student's credits into a balance.
#[must_use]
pub fn summarize_balance(
    student_id: i64,
    credits: &[student_credit::Model],
    now: DateTime<Utc>,
) -> StudentBalance {
    let mut balance = StudentBalance {
        student_id,
        ..StudentBalance::default()
    };
    for credit in credits {
        match credit_status(credit, now) {
            CreditStatus::Active => {
                balance.usable_credits += i64::from(credit.remaining_credits);
                balance.active_packages += 1;
            }
            CreditStatus::Expired => {
                balance.expired_credits += i64::from(credit.remaining_credits.max(0));
            }
            CreditStatus::Exhausted => {}
        }
    }
    balance
}

/// Current balance of a student.
pub async fn student_balance(
    db: &DatabaseConnection,
    school_id: i64,
    student_id: i64,
) -> Result<StudentBalance> {
    student::get_student(db, school_id, student_id)
        .await?
        .ok_or_else(|| Error::not_found("Student", student_id))?;

    let credits = StudentCredit::find()
        .filter(student_credit::Column::SchoolId.eq(school_id))
        .filter(student_credit::Column::StudentId.eq(student_id))
        .all(db)
        .await?;
    Ok(summarize_balance(student_id, &credits, Utc::now()))
}

/// Atomically moves `amount` credits from remaining to used.
///
/// The `UPDATE` only matches while `remaining_credits >= amount`, so concurrent
/// check-ins can never overdraw a credit.
pub async fn deduct_credits<C>(db: &C, credit_id: i64, amount: i32) -> Result<student_credit::Model>
where
    C: ConnectionTrait,
{
    if amount <= 0 {
        return Err(Error::validation("Deducted credits must be positive"));
    }

    let result = StudentCredit::update_many()
        .col_expr(
            student_credit::Column::RemainingCredits,
            Expr::col(student_credit::Column::RemainingCredits).sub(amount),
        )
        .col_expr(
            student_credit::Column::UsedCredits,
            Expr::col(student_credit::Column::UsedCredits).add(amount),
        )
        .col_expr(student_credit::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(student_credit::Column::Id.eq(credit_id))
        .filter(student_credit::Column::RemainingCredits.gte(amount))
        .exec(db)
        .await?;

    let credit = StudentCredit::find_by_id(credit_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Credit", credit_id))?;

    if result.rows_affected == 0 {
        return Err(Error::InsufficientCredits {
            remaining: credit.remaining_credits,
            required: amount,
        });
    }
    Ok(credit)
}

/// Returns `amount` previously deducted credits. Used when a check-in is undone.
pub async fn restore_credits<C>(db: &C, credit_id: i64, amount: i32) -> Result<student_credit::Model>
where
    C: ConnectionTrait,
{
    StudentCredit::update_many()
        .col_expr(
            student_credit::Column::RemainingCredits,
            Expr::col(student_credit::Column::RemainingCredits).add(amount),
        )
        .col_expr(
            student_credit::Column::UsedCredits,
            Expr::col(student_credit::Column::UsedCredits).sub(amount),
        )
        .col_expr(student_credit::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(student_credit::Column::Id.eq(credit_id))
        .exec(db)
        .await?;

    StudentCredit::find_by_id(credit_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Credit", credit_id))
}

/// Manually grants (`delta > 0`) or removes (`delta < 0`) credits.
///
/// The change is recorded as bonus credits; `remaining_credits` cannot drop below zero.
pub async fn adjust_credit(
    db: &DatabaseConnection,
    school_id: i64,
    credit_id: i64,
    delta: i32,
) -> Result<student_credit::Model> {
    if delta == 0 {
        return Err(Error::validation("Adjustment cannot be zero"));
    }

    let txn = db.begin().await?;
    let credit = get_credit(&txn, school_id, credit_id)
        .await?
        .ok_or_else(|| Error::not_found("Credit", credit_id))?;

    let out_of_range = || Error::InvalidAmount {
        amount: f64::from(delta),
    };
    let remaining = credit
        .remaining_credits
        .checked_add(delta)
        .ok_or_else(out_of_range)?;
    if remaining < 0 {
        return Err(Error::InsufficientCredits {
            remaining: credit.remaining_credits,
            required: delta.checked_neg().ok_or_else(out_of_range)?,
        });
    }

    let bonus = credit
        .bonus_credits
        .checked_add(delta)
        .ok_or_else(out_of_range)?;
    let mut active: student_credit::ActiveModel = credit.into();
    active.remaining_credits = Set(remaining);
    active.bonus_credits = Set(bonus);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    tracing::info!(school_id, credit_id, delta, "Adjusted credit");
    Ok(updated)
}
