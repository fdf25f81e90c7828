//! Attendance business logic - check-ins that consume credits.
//!
//! A check-in picks a usable credit (or validates the one given), deducts the course's
//! `credits_per_session` from it and writes an attendance row, all in one database
//! transaction. Undoing a check-in gives the credits back.

use crate::{
    core::{course, credit, package, student},
    entities::{Attendance, CourseStatus, attendance, student_credit},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};

/// Largest page returned by [`list_attendance`].
pub const MAX_ATTENDANCE_PAGE: u64 = 500;

/// Details of a check-in.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckInRequest {
    pub student_id: i64,
    pub course_id: i64,
    /// Credit to spend; picked automatically when absent
    #[serde(default)]
    pub credit_id: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
    /// Defaults to now
    #[serde(default)]
    pub checked_in_at: Option<DateTime<Utc>>,
}

/// Rows touched by a check-in.
#[derive(Debug, Clone, Serialize)]
pub struct CheckInReceipt {
    pub attendance: attendance::Model,
    pub credit: student_credit::Model,
}

/// Filters for [`list_attendance`]. Dates are inclusive UTC days.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AttendanceFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub student_id: Option<i64>,
    pub course_id: Option<i64>,
    pub limit: Option<u64>,
}

/// Start of `date` in UTC.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Start of the day after `date` in UTC, the exclusive end of an inclusive range.
#[must_use]
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.succ_opt()
        .map_or(DateTime::<Utc>::MAX_UTC, start_of_day)
}

/// Records a student attending a course session.
///
/// # Errors
/// Returns an error if:
/// - The student is missing or inactive
/// - The course is missing, deleted or not `active`
/// - The given credit belongs to someone else, is expired, does not cover the course
///   or has too few credits left
/// - No credit of the student can pay for the session
pub async fn check_in(
    db: &DatabaseConnection,
    school_id: i64,
    request: CheckInRequest,
    recorded_by: Option<i64>,
) -> Result<CheckInReceipt> {
    let txn = db.begin().await?;

    let student = student::require_active_student(&txn, school_id, request.student_id).await?;
    let course = course::require_course(&txn, school_id, request.course_id).await?;
    if course.status != CourseStatus::Active {
        return Err(Error::validation(format!(
            "Course {} is not accepting check-ins",
            course.name
        )));
    }

    let cost = course.credits_per_session;
    let now = Utc::now();
    let checked_in_at = request.checked_in_at.unwrap_or(now);
    if checked_in_at > now {
        return Err(Error::validation("Check-in time cannot be in the future"));
    }

    let chosen = match request.credit_id {
        Some(credit_id) => {
            let credit = credit::get_credit(&txn, school_id, credit_id)
                .await?
                .filter(|c| c.student_id == student.id)
                .ok_or_else(|| Error::not_found("Credit", credit_id))?;
            if credit.purchased_at > checked_in_at {
                return Err(Error::validation(format!(
                    "Credit {credit_id} was bought after {checked_in_at}"
                )));
            }
            if credit::is_expired(&credit, checked_in_at) {
                return Err(Error::CreditExpired { credit_id });
            }
            let target = package::load_targets(&txn, &[credit.package_id]).await?;
            if !target
                .get(&credit.package_id)
                .is_some_and(|t| t.includes(course.id))
            {
                return Err(Error::validation(format!(
                    "Credit {credit_id} cannot be used for {}",
                    course.name
                )));
            }
            if credit.remaining_credits < cost {
                return Err(Error::InsufficientCredits {
                    remaining: credit.remaining_credits,
                    required: cost,
                });
            }
            credit
        }
        None => {
            let usable: Vec<student_credit::Model> =
                credit::usable_credits(&txn, school_id, student.id, course.id, checked_in_at)
                    .await?
                    .into_iter()
                    .filter(|c| c.purchased_at <= checked_in_at)
                    .collect();
            if usable.is_empty() {
                return Err(Error::NoUsableCredits {
                    student_id: student.id,
                    course_id: course.id,
                });
            }
            let best_remaining = usable
                .iter()
                .map(|c| c.remaining_credits)
                .max()
                .unwrap_or(0);
            usable
                .into_iter()
                .find(|c| c.remaining_credits >= cost)
                .ok_or(Error::InsufficientCredits {
                    remaining: best_remaining,
                    required: cost,
                })?
        }
    };

    let credit = credit::deduct_credits(&txn, chosen.id, cost).await?;

    let attendance = attendance::ActiveModel {
        school_id: Set(school_id),
        student_id: Set(student.id),
        course_id: Set(course.id),
        student_credit_id: Set(credit.id),
        student_name: Set(student.name.clone()),
        course_name: Set(course.name.clone()),
        credits_used: Set(cost),
        note: Set(request.note.filter(|n| !n.trim().is_empty())),
        recorded_by: Set(recorded_by),
        checked_in_at: Set(checked_in_at),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        school_id,
        student_id = student.id,
        course_id = course.id,
        credit_id = credit.id,
        remaining = credit.remaining_credits,
        "Recorded check-in"
    );
    Ok(CheckInReceipt { attendance, credit })
}

/// Deletes a check-in and returns its credits to the credit it was paid from.
pub async fn undo_check_in(
    db: &DatabaseConnection,
    school_id: i64,
    attendance_id: i64,
) -> Result<student_credit::Model> {
    let txn = db.begin().await?;

    let record = Attendance::find_by_id(attendance_id)
        .filter(attendance::Column::SchoolId.eq(school_id))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Attendance", attendance_id))?;

    let credit =
        credit::restore_credits(&txn, record.student_credit_id, record.credits_used).await?;
    Attendance::delete_by_id(record.id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        school_id,
        attendance_id,
        credit_id = credit.id,
        restored = record.credits_used,
        "Undid check-in"
    );
    Ok(credit)
}

/// Lists check-ins, newest first.
pub async fn list_attendance(
    db: &DatabaseConnection,
    school_id: i64,
    filter: AttendanceFilter,
) -> Result<Vec<attendance::Model>> {
    let mut query = Attendance::find().filter(attendance::Column::SchoolId.eq(school_id));
    if let Some(from) = filter.from {
        query = query.filter(attendance::Column::CheckedInAt.gte(start_of_day(from)));
    }
    if let Some(to) = filter.to {
        query = query.filter(attendance::Column::CheckedInAt.lt(end_of_day(to)));
    }
    if let Some(student_id) = filter.student_id {
        query = query.filter(attendance::Column::StudentId.eq(student_id));
    }
    if let Some(course_id) = filter.course_id {
        query = query.filter(attendance::Column::CourseId.eq(course_id));
    }

    query
        .order_by_desc(attendance::Column::CheckedInAt)
        .order_by_desc(attendance::Column::Id)
        .limit(
            filter
                .limit
                .unwrap_or(MAX_ATTENDANCE_PAGE)
                .min(MAX_ATTENDANCE_PAGE),
        )
        .all(db)
        .await
        .map_err(Into::into)
}
