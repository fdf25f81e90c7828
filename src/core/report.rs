//! Report generation business logic.
//!
//! Each report is built in two steps: an async function loads the rows of a school
//! for a date range, and a pure `summarize_*` function aggregates them. The API layer
//! checks the school's `reports_enabled` flag before calling in here.

use crate::{
    core::{attendance::end_of_day, attendance::start_of_day, credit, school},
    entities::{
        Attendance, Course, CreditPackage, PlanTier, Purchase, School, Student, StudentCredit,
        User, attendance, course, credit_package, purchase, student, student_credit, user,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use sea_orm::{QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Longest range a report may cover.
pub const MAX_REPORT_DAYS: i64 = 366;

/// Longest look-ahead accepted for expiring credits.
pub const MAX_EXPIRING_WINDOW_DAYS: u32 = 3650;

/// Inclusive range of UTC days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Validates that `from <= to` and the range is at most [`MAX_REPORT_DAYS`] long.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(Error::validation("Report range starts after it ends"));
        }
        if (to - from).num_days() >= MAX_REPORT_DAYS {
            return Err(Error::validation(format!(
                "Report range cannot exceed {MAX_REPORT_DAYS} days"
            )));
        }
        Ok(Self { from, to })
    }

    /// The `days` days ending with `today`.
    #[must_use]
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let from = today
            .checked_sub_signed(TimeDelta::days(i64::from(days.max(1)) - 1))
            .unwrap_or(today);
        Self { from, to: today }
    }

    /// From the first of `today`'s month through `today`.
    #[must_use]
    pub fn month_to_date(today: NaiveDate) -> Self {
        Self {
            from: today.with_day(1).unwrap_or(today),
            to: today,
        }
    }

    /// Inclusive lower bound.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        start_of_day(self.from)
    }

    /// Exclusive upper bound.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        end_of_day(self.to)
    }
}

/// Revenue of one package.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageRevenue {
    pub package_id: i64,
    pub package_name: String,
    pub purchases: u64,
    pub net: f64,
}

/// Revenue of one calendar month, keyed `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRevenue {
    pub month: String,
    pub purchases: u64,
    pub net: f64,
}

/// Sales over a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueReport {
    pub range: DateRange,
    pub purchase_count: u64,
    /// Sum of list prices
    pub gross: f64,
    /// Sum of discounts actually granted
    pub discounts: f64,
    /// Sum of amounts charged
    pub net: f64,
    pub by_package: Vec<PackageRevenue>,
    pub by_month: Vec<MonthRevenue>,
}

/// Aggregates purchases into a revenue report.
///
/// `discounts` is `gross - net`, so a discount larger than the price only counts
/// up to the price. Packages are ordered by net revenue, highest first.
#[must_use]
pub fn summarize_revenue(
    range: DateRange,
    purchases: &[purchase::Model],
    package_names: &HashMap<i64, String>,
) -> RevenueReport {
    let mut gross = 0.0;
    let mut net = 0.0;
    let mut by_package: HashMap<i64, (u64, f64)> = HashMap::new();
    let mut by_month: BTreeMap<String, (u64, f64)> = BTreeMap::new();

    for purchase in purchases {
        gross += purchase.original_price;
        net += purchase.final_price;

        let package = by_package.entry(purchase.package_id).or_default();
        package.0 += 1;
        package.1 += purchase.final_price;

        let month = by_month
            .entry(purchase.created_at.format("%Y-%m").to_string())
            .or_default();
        month.0 += 1;
        month.1 += purchase.final_price;
    }

    let mut by_package: Vec<PackageRevenue> = by_package
        .into_iter()
        .map(|(package_id, (purchases, net))| PackageRevenue {
            package_id,
            package_name: package_names
                .get(&package_id)
                .cloned()
                .unwrap_or_else(|| format!("Package {package_id}")),
            purchases,
            net,
        })
        .collect();
    by_package.sort_by(|a, b| {
        b.net
            .total_cmp(&a.net)
            .then_with(|| a.package_name.cmp(&b.package_name))
    });

    RevenueReport {
        range,
        purchase_count: purchases.len() as u64,
        gross,
        discounts: gross - net,
        net,
        by_package,
        by_month: by_month
            .into_iter()
            .map(|(month, (purchases, net))| MonthRevenue {
                month,
                purchases,
                net,
            })
            .collect(),
    }
}

/// Revenue report of a school.
pub async fn revenue_report(
    db: &DatabaseConnection,
    school_id: i64,
    range: DateRange,
) -> Result<RevenueReport> {
    let purchases = Purchase::find()
        .filter(purchase::Column::SchoolId.eq(school_id))
        .filter(purchase::Column::CreatedAt.gte(range.start()))
        .filter(purchase::Column::CreatedAt.lt(range.end()))
        .order_by_asc(purchase::Column::CreatedAt)
        .all(db)
        .await?;

    let package_names: HashMap<i64, String> = CreditPackage::find()
        .filter(credit_package::Column::SchoolId.eq(school_id))
        .all(db)
        .await?
        .into_iter()
        .map(|package| (package.id, package.name))
        .collect();

    Ok(summarize_revenue(range, &purchases, &package_names))
}

/// Check-ins of one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseAttendance {
    pub course_id: i64,
    pub course_name: String,
    pub check_ins: u64,
    pub credits: i64,
}

/// Check-ins of one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAttendance {
    pub date: NaiveDate,
    pub check_ins: u64,
    pub credits: i64,
}

/// Attendance over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceReport {
    pub range: DateRange,
    pub check_ins: u64,
    pub credits_consumed: i64,
    pub unique_students: usize,
    pub by_course: Vec<CourseAttendance>,
    pub by_day: Vec<DayAttendance>,
}

/// Aggregates attendance rows. Courses are ordered by check-ins, busiest first.
#[must_use]
pub fn summarize_attendance(range: DateRange, records: &[attendance::Model]) -> AttendanceReport {
    let mut credits_consumed = 0;
    let mut students = HashSet::new();
    let mut by_course: HashMap<i64, CourseAttendance> = HashMap::new();
    let mut by_day: BTreeMap<NaiveDate, (u64, i64)> = BTreeMap::new();

    for record in records {
        let credits = i64::from(record.credits_used);
        credits_consumed += credits;
        students.insert(record.student_id);

        let course = by_course
            .entry(record.course_id)
            .or_insert_with(|| CourseAttendance {
                course_id: record.course_id,
                course_name: record.course_name.clone(),
                check_ins: 0,
                credits: 0,
            });
        course.check_ins += 1;
        course.credits += credits;

        let day = by_day.entry(record.checked_in_at.date_naive()).or_default();
        day.0 += 1;
        day.1 += credits;
    }

    let mut by_course: Vec<CourseAttendance> = by_course.into_values().collect();
    by_course.sort_by(|a, b| {
        b.check_ins
            .cmp(&a.check_ins)
            .then_with(|| a.course_name.cmp(&b.course_name))
    });

    AttendanceReport {
        range,
        check_ins: records.len() as u64,
        credits_consumed,
        unique_students: students.len(),
        by_course,
        by_day: by_day
            .into_iter()
            .map(|(date, (check_ins, credits))| DayAttendance {
                date,
                check_ins,
                credits,
            })
            .collect(),
    }
}

/// Attendance report of a school.
pub async fn attendance_report(
    db: &DatabaseConnection,
    school_id: i64,
    range: DateRange,
) -> Result<AttendanceReport> {
    let records = Attendance::find()
        .filter(attendance::Column::SchoolId.eq(school_id))
        .filter(attendance::Column::CheckedInAt.gte(range.start()))
        .filter(attendance::Column::CheckedInAt.lt(range.end()))
        .all(db)
        .await?;
    Ok(summarize_attendance(range, &records))
}

/// Credits sold but not yet consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditLiability {
    /// Remaining credits on non-expired rows
    pub outstanding_credits: i64,
    pub students_with_credits: usize,
    /// Part of `outstanding_credits` that expires within `expiring_within_days`
    pub expiring_credits: i64,
    pub expiring_within_days: u32,
}

/// Aggregates credits into the school's outstanding liability at `now`.
#[must_use]
pub fn summarize_liability(
    credits: &[student_credit::Model],
    now: DateTime<Utc>,
    expiring_within_days: u32,
) -> CreditLiability {
    let horizon = now
        .checked_add_signed(TimeDelta::days(i64::from(expiring_within_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let mut outstanding = 0;
    let mut expiring = 0;
    let mut students = HashSet::new();

    for credit in credits {
        if credit::credit_status(credit, now) != credit::CreditStatus::Active {
            continue;
        }
        let remaining = i64::from(credit.remaining_credits);
        outstanding += remaining;
        students.insert(credit.student_id);
        if credit.expires_at.is_some_and(|at| at <= horizon) {
            expiring += remaining;
        }
    }

    CreditLiability {
        outstanding_credits: outstanding,
        students_with_credits: students.len(),
        expiring_credits: expiring,
        expiring_within_days,
    }
}

/// Outstanding credit liability of a school.
pub async fn credit_liability(
    db: &DatabaseConnection,
    school_id: i64,
    expiring_within_days: u32,
) -> Result<CreditLiability> {
    if expiring_within_days > MAX_EXPIRING_WINDOW_DAYS {
        return Err(Error::validation(format!(
            "Expiry window cannot exceed {MAX_EXPIRING_WINDOW_DAYS} days"
        )));
    }
    let credits = StudentCredit::find()
        .filter(student_credit::Column::SchoolId.eq(school_id))
        .filter(student_credit::Column::RemainingCredits.gt(0))
        .all(db)
        .await?;
    Ok(summarize_liability(
        &credits,
        Utc::now(),
        expiring_within_days,
    ))
}

/// Share of a quota in use, as a percentage. A zero limit reports 100%.
#[must_use]
pub fn usage_percent(used: u64, limit: i32) -> f64 {
    if limit <= 0 {
        return 100.0;
    }
    (used as f64 / f64::from(limit)) * 100.0
}

/// Usage of one plan quota.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaUsage {
    pub used: u64,
    pub limit: i32,
    pub percent: f64,
}

impl QuotaUsage {
    fn new(used: u64, limit: i32) -> Self {
        Self {
            used,
            limit,
            percent: usage_percent(used, limit),
        }
    }
}

/// Headline numbers for a school's home screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolDashboard {
    pub school_id: i64,
    pub plan: PlanTier,
    pub students: QuotaUsage,
    pub courses: QuotaUsage,
    pub staff: QuotaUsage,
    pub active_packages: u64,
    pub check_ins_today: u64,
    pub revenue_month_to_date: f64,
    pub outstanding_credits: i64,
}

/// Dashboard counters of a school.
pub async fn school_dashboard(db: &DatabaseConnection, school_id: i64) -> Result<SchoolDashboard> {
    let school = school::require_school(db, school_id).await?;
    let now = Utc::now();
    let today = now.date_naive();

    let students = Student::find()
        .filter(student::Column::SchoolId.eq(school_id))
        .filter(student::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let courses = Course::find()
        .filter(course::Column::SchoolId.eq(school_id))
        .filter(course::Column::IsDeleted.eq(false))
        .count(db)
        .await?;
    let staff = User::find()
        .filter(user::Column::SchoolId.eq(school_id))
        .filter(user::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let active_packages = CreditPackage::find()
        .filter(credit_package::Column::SchoolId.eq(school_id))
        .filter(credit_package::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let check_ins_today = Attendance::find()
        .filter(attendance::Column::SchoolId.eq(school_id))
        .filter(attendance::Column::CheckedInAt.gte(start_of_day(today)))
        .filter(attendance::Column::CheckedInAt.lt(end_of_day(today)))
        .count(db)
        .await?;

    let month = DateRange::month_to_date(today);
    let revenue_month_to_date = Purchase::find()
        .filter(purchase::Column::SchoolId.eq(school_id))
        .filter(purchase::Column::CreatedAt.gte(month.start()))
        .filter(purchase::Column::CreatedAt.lt(month.end()))
        .all(db)
        .await?
        .iter()
        .map(|p| p.final_price)
        .sum();

    let liability = credit_liability(db, school_id, 0).await?;

    Ok(SchoolDashboard {
        school_id,
        plan: school.plan,
        students: QuotaUsage::new(students, school.max_students),
        courses: QuotaUsage::new(courses, school.max_courses),
        staff: QuotaUsage::new(staff, school.max_staff),
        active_packages,
        check_ins_today,
        revenue_month_to_date,
        outstanding_credits: liability.outstanding_credits,
    })
}

/// Schools on one plan tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanCount {
    pub plan: PlanTier,
    pub schools: u64,
}

/// Platform-wide counters for the superadmin console.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStats {
    pub schools: u64,
    pub active_schools: u64,
    pub schools_by_plan: Vec<PlanCount>,
    pub students: u64,
    pub staff: u64,
    pub purchases: u64,
    pub revenue: f64,
    pub check_ins: u64,
}

/// Counts across every school.
pub async fn platform_stats(db: &DatabaseConnection) -> Result<PlatformStats> {
    let schools = School::find().all(db).await?;

    let mut by_plan: HashMap<PlanTier, u64> = HashMap::new();
    for school in &schools {
        *by_plan.entry(school.plan).or_default() += 1;
    }
    let schools_by_plan = [
        PlanTier::Free,
        PlanTier::Basic,
        PlanTier::Pro,
        PlanTier::Enterprise,
    ]
    .into_iter()
    .map(|plan| PlanCount {
        plan,
        schools: by_plan.get(&plan).copied().unwrap_or(0),
    })
    .collect();

    let purchases = Purchase::find().all(db).await?;

    Ok(PlatformStats {
        schools: schools.len() as u64,
        active_schools: schools.iter().filter(|s| s.is_active).count() as u64,
        schools_by_plan,
        students: Student::find()
            .filter(student::Column::IsActive.eq(true))
            .count(db)
            .await?,
        staff: User::find()
            .filter(user::Column::SchoolId.is_not_null())
            .filter(user::Column::IsActive.eq(true))
            .count(db)
            .await?,
        purchases: purchases.len() as u64,
        revenue: purchases.iter().map(|p| p.final_price).sum(),
        check_ins: Attendance::find().count(db).await?,
    })
}
