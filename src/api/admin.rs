//! Superadmin console: tenant lifecycle and platform statistics.

use super::{AppState, auth::AuthContext};
use crate::{
    core::{
        report::{self, PlatformStats},
        school::{self, DeletionReport, SchoolOverrides},
        user,
    },
    entities::{PlanTier, Role, school as school_entity, user as user_entity},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct CreateSchoolRequest {
    name: String,
    #[serde(default)]
    contact_email: Option<String>,
    #[serde(default = "default_plan")]
    plan: PlanTier,
    /// First owner of the school
    #[serde(default)]
    owner: Option<OwnerRequest>,
}

const fn default_plan() -> PlanTier {
    PlanTier::Free
}

#[derive(Debug, Deserialize)]
struct OwnerRequest {
    email: String,
    display_name: String,
}

#[derive(Debug, Serialize)]
struct CreatedSchool {
    school: school_entity::Model,
    owner: Option<user_entity::Model>,
}

#[derive(Debug, Default, Deserialize)]
struct ListSchoolsQuery {
    #[serde(default)]
    include_inactive: bool,
}

#[derive(Debug, Deserialize)]
struct ChangePlanRequest {
    plan: PlanTier,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/schools", get(list_schools).post(create_school))
        .route("/schools/{school_id}", get(get_school).delete(delete_school))
        .route("/schools/{school_id}/plan", put(change_plan))
        .route("/schools/{school_id}/limits", put(apply_overrides))
        .route("/schools/{school_id}/activate", post(activate_school))
        .route("/schools/{school_id}/deactivate", post(deactivate_school))
        .route("/stats", get(platform_stats))
}

async fn list_schools(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListSchoolsQuery>,
) -> Result<Json<Vec<school_entity::Model>>> {
    auth.require_superadmin()?;
    Ok(Json(
        school::list_schools(&state.db, query.include_inactive).await?,
    ))
}

async fn create_school(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateSchoolRequest>,
) -> Result<(StatusCode, Json<CreatedSchool>)> {
    auth.require_superadmin()?;

    let school = school::create_school(
        &state.db,
        &state.config,
        request.name,
        request.contact_email,
        request.plan,
    )
    .await?;

    let owner = match request.owner {
        Some(owner) => Some(
            user::create_user(
                &state.db,
                school.id,
                &owner.email,
                &owner.display_name,
                Role::Owner,
            )
            .await?,
        ),
        None => None,
    };

    Ok((StatusCode::CREATED, Json(CreatedSchool { school, owner })))
}

async fn get_school(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
) -> Result<Json<school_entity::Model>> {
    auth.require_superadmin()?;
    Ok(Json(school::require_school(&state.db, school_id).await?))
}

async fn change_plan(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Json(request): Json<ChangePlanRequest>,
) -> Result<Json<school_entity::Model>> {
    auth.require_superadmin()?;
    Ok(Json(
        school::change_plan(&state.db, &state.config, school_id, request.plan).await?,
    ))
}

async fn apply_overrides(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Json(overrides): Json<SchoolOverrides>,
) -> Result<Json<school_entity::Model>> {
    auth.require_superadmin()?;
    Ok(Json(
        school::apply_overrides(&state.db, school_id, overrides).await?,
    ))
}

async fn activate_school(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
) -> Result<Json<school_entity::Model>> {
    auth.require_superadmin()?;
    Ok(Json(
        school::set_school_active(&state.db, school_id, true).await?,
    ))
}

async fn deactivate_school(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
) -> Result<Json<school_entity::Model>> {
    auth.require_superadmin()?;
    Ok(Json(
        school::set_school_active(&state.db, school_id, false).await?,
    ))
}

async fn delete_school(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
) -> Result<Json<DeletionReport>> {
    auth.require_superadmin()?;
    tracing::warn!(school_id, by = auth.user.id, "Deleting school");
    Ok(Json(school::delete_school(&state.db, school_id).await?))
}

async fn platform_stats(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<PlatformStats>> {
    auth.require_superadmin()?;
    Ok(Json(report::platform_stats(&state.db).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, test_state};
    use crate::core::user::ensure_superadmin;
    use crate::errors::Result;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_school_lifecycle_through_console() -> Result<()> {
        let state = test_state().await?;
        let admin = ensure_superadmin(&state.db, "root@platform.dev", "Root").await?;

        let (status, body) = send(
            &state,
            Method::POST,
            "/admin/schools",
            Some(admin.id),
            Some(json!({
                "name": "Harbor Music",
                "plan": "basic",
                "owner": { "email": "owner@harbor.dev", "display_name": "Owner" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["school"]["max_students"], 100);
        assert_eq!(body["owner"]["role"], "owner");
        let school_id = body["school"]["id"].as_i64().unwrap_or_default();
        let owner_id = body["owner"]["id"].as_i64().unwrap_or_default();

        let (status, body) = send(
            &state,
            Method::PUT,
            &format!("/admin/schools/{school_id}/plan"),
            Some(admin.id),
            Some(json!({ "plan": "pro" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["discounts_enabled"], true);

        // School staff cannot use the console
        let (status, _) = send(&state, Method::GET, "/admin/stats", Some(owner_id), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&state, Method::GET, "/admin/stats", Some(admin.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["schools"], 1);

        let (status, body) = send(
            &state,
            Method::DELETE,
            &format!("/admin/schools/{school_id}"),
            Some(admin.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["school_id"], school_id);
        Ok(())
    }

    #[tokio::test]
    async fn test_console_requires_identity() -> Result<()> {
        let state = test_state().await?;
        let (status, body) = send(&state, Method::GET, "/admin/schools", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "unauthorized");

        let (status, _) = send(&state, Method::GET, "/admin/schools", Some(404), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
