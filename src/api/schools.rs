//! School profile, dashboard and staff management.

use super::{AppState, auth::AuthContext};
use crate::{
    core::{
        report::{self, SchoolDashboard},
        school::{self, SchoolProfile},
        user::{self, Capability},
    },
    entities::{Role, school as school_entity, user as user_entity},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    email: String,
    display_name: String,
    role: Role,
}

#[derive(Debug, Deserialize)]
struct ChangeRoleRequest {
    role: Role,
}

#[derive(Debug, Default, Deserialize)]
struct ListUsersQuery {
    #[serde(default)]
    include_inactive: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile).patch(update_profile))
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{user_id}/role", put(change_role))
        .route("/users/{user_id}/deactivate", post(deactivate_user))
}

async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
) -> Result<Json<school_entity::Model>> {
    let school = auth
        .authorize(&state, school_id, Capability::ViewRoster)
        .await?;
    Ok(Json(school))
}

async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Json(profile): Json<SchoolProfile>,
) -> Result<Json<school_entity::Model>> {
    auth.authorize(&state, school_id, Capability::ManageSchool)
        .await?;
    Ok(Json(
        school::update_school_profile(&state.db, school_id, profile).await?,
    ))
}

async fn dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
) -> Result<Json<SchoolDashboard>> {
    auth.authorize(&state, school_id, Capability::ViewReports)
        .await?;
    Ok(Json(report::school_dashboard(&state.db, school_id).await?))
}

async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<user_entity::Model>>> {
    auth.authorize(&state, school_id, Capability::ManageStaff)
        .await?;
    Ok(Json(
        user::list_users(&state.db, school_id, query.include_inactive).await?,
    ))
}

async fn create_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<user_entity::Model>)> {
    auth.authorize(&state, school_id, Capability::ManageStaff)
        .await?;
    let user = user::create_user(
        &state.db,
        school_id,
        &request.email,
        &request.display_name,
        request.role,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn change_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, user_id)): Path<(i64, i64)>,
    Json(request): Json<ChangeRoleRequest>,
) -> Result<Json<user_entity::Model>> {
    auth.authorize(&state, school_id, Capability::ManageStaff)
        .await?;
    Ok(Json(
        user::change_role(&state.db, school_id, user_id, request.role).await?,
    ))
}

async fn deactivate_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, user_id)): Path<(i64, i64)>,
) -> Result<Json<user_entity::Model>> {
    auth.authorize(&state, school_id, Capability::ManageStaff)
        .await?;
    Ok(Json(
        user::deactivate_user(&state.db, school_id, user_id).await?,
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, test_state};
    use crate::entities::Role;
    use crate::errors::Result;
    use crate::test_utils::*;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_staff_scope_and_roles() -> Result<()> {
        let state = test_state().await?;
        let home = create_test_school(&state.db, "Home").await?;
        let away = create_test_school(&state.db, "Away").await?;
        let owner = create_test_user(&state.db, home.id, "owner@home.dev", Role::Owner).await?;
        let teacher =
            create_test_user(&state.db, home.id, "teacher@home.dev", Role::Teacher).await?;

        let uri = format!("/schools/{}/users", home.id);
        let (status, body) = send(
            &state,
            Method::POST,
            &uri,
            Some(owner.id),
            Some(json!({ "email": "Admin@Home.dev", "display_name": "Admin", "role": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "admin@home.dev");

        // Teachers cannot manage staff
        let (status, _) = send(&state, Method::GET, &uri, Some(teacher.id), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Nobody reaches another school
        let (status, _) = send(
            &state,
            Method::GET,
            &format!("/schools/{}", away.id),
            Some(owner.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &state,
            Method::GET,
            &format!("/schools/{}", home.id),
            Some(teacher.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Home");
        Ok(())
    }

    #[tokio::test]
    async fn test_last_owner_is_protected() -> Result<()> {
        let state = test_state().await?;
        let school = create_test_school(&state.db, "Solo").await?;
        let owner = create_test_user(&state.db, school.id, "solo@owner.dev", Role::Owner).await?;

        let (status, body) = send(
            &state,
            Method::PUT,
            &format!("/schools/{}/users/{}/role", school.id, owner.id),
            Some(owner.id),
            Some(json!({ "role": "teacher" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation_failed");
        Ok(())
    }
}
