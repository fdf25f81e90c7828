//! Reports. Every endpoint needs the `reports` feature of the school's plan.

use super::{AppState, auth::AuthContext};
use crate::{
    core::{
        report::{self, AttendanceReport, CreditLiability, DateRange, RevenueReport},
        school::{self, Feature},
        user::Capability,
    },
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

/// Days covered when a report request names no range.
const DEFAULT_REPORT_DAYS: u32 = 30;

#[derive(Debug, Default, Deserialize)]
struct RangeQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl RangeQuery {
    fn resolve(self) -> Result<DateRange> {
        let today = Utc::now().date_naive();
        match (self.from, self.to) {
            (None, None) => Ok(DateRange::last_days(today, DEFAULT_REPORT_DAYS)),
            (from, to) => {
                let to = to.unwrap_or(today);
                let from =
                    from.unwrap_or_else(|| DateRange::last_days(to, DEFAULT_REPORT_DAYS).from);
                DateRange::new(from, to)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct LiabilityQuery {
    #[serde(default = "default_expiring_days")]
    expiring_within_days: u32,
}

const fn default_expiring_days() -> u32 {
    30
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/revenue", get(revenue))
        .route("/reports/attendance", get(attendance))
        .route("/reports/credits", get(credit_liability))
}

async fn authorize_reports(state: &AppState, auth: &AuthContext, school_id: i64) -> Result<()> {
    let school = auth
        .authorize(state, school_id, Capability::ViewReports)
        .await?;
    school::ensure_feature(&school, Feature::Reports)
}

async fn revenue(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<RevenueReport>> {
    authorize_reports(&state, &auth, school_id).await?;
    Ok(Json(
        report::revenue_report(&state.db, school_id, query.resolve()?).await?,
    ))
}

async fn attendance(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<AttendanceReport>> {
    authorize_reports(&state, &auth, school_id).await?;
    Ok(Json(
        report::attendance_report(&state.db, school_id, query.resolve()?).await?,
    ))
}

async fn credit_liability(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Query(query): Query<LiabilityQuery>,
) -> Result<Json<CreditLiability>> {
    authorize_reports(&state, &auth, school_id).await?;
    Ok(Json(
        report::credit_liability(&state.db, school_id, query.expiring_within_days).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{send, test_state};
    use crate::config::AppConfig;
    use crate::entities::{PlanTier, Role};
    use crate::test_utils::*;
    use axum::http::{Method, StatusCode};

    #[test]
    fn test_range_defaults() -> Result<()> {
        let today = Utc::now().date_naive();
        let range = RangeQuery::default().resolve()?;
        assert_eq!(range.to, today);
        assert_eq!((range.to - range.from).num_days(), 29);

        let backwards = RangeQuery {
            from: Some(today),
            to: today.pred_opt(),
        };
        assert!(backwards.resolve().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_reports_gated_by_plan() -> Result<()> {
        let state = test_state().await?;
        let school = create_test_school(&state.db, "Reports").await?;
        let owner = create_test_user(&state.db, school.id, "owner@reports.dev", Role::Owner).await?;
        let uri = format!("/schools/{}/reports/revenue", school.id);

        let (status, body) = send(&state, Method::GET, &uri, Some(owner.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["purchase_count"], 0);

        school::change_plan(&state.db, &AppConfig::default(), school.id, PlanTier::Free).await?;
        let (status, body) = send(&state, Method::GET, &uri, Some(owner.id), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "feature_disabled");
        Ok(())
    }

    #[tokio::test]
    async fn test_liability_window_out_of_range() -> Result<()> {
        let state = test_state().await?;
        let school = create_test_school(&state.db, "Horizon").await?;
        let owner = create_test_user(&state.db, school.id, "owner@horizon.dev", Role::Owner).await?;
        let uri = format!(
            "/schools/{}/reports/credits?expiring_within_days=4294967295",
            school.id
        );

        let (status, body) = send(&state, Method::GET, &uri, Some(owner.id), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation_failed");
        Ok(())
    }
}
