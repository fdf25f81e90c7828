//! Course catalog and credit packages.

use super::{AppState, auth::AuthContext};
use crate::{
    core::{
        course::{self, CourseFilter, CourseInput},
        package::{self, PackageDetails, PackageInput},
        user::Capability,
    },
    entities::{course as course_entity, credit_package},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct ListPackagesQuery {
    #[serde(default)]
    include_inactive: bool,
    /// Only packages usable for this course
    #[serde(default)]
    course_id: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{course_id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/packages", get(list_packages).post(create_package))
        .route(
            "/packages/{package_id}",
            get(get_package)
                .put(update_package)
                .delete(deactivate_package),
        )
}

async fn list_courses(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Query(filter): Query<CourseFilter>,
) -> Result<Json<Vec<course_entity::Model>>> {
    auth.authorize(&state, school_id, Capability::ViewRoster)
        .await?;
    Ok(Json(course::list_courses(&state.db, school_id, filter).await?))
}

async fn create_course(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Json(input): Json<CourseInput>,
) -> Result<(StatusCode, Json<course_entity::Model>)> {
    auth.authorize(&state, school_id, Capability::ManageCatalog)
        .await?;
    let course = course::create_course(&state.db, school_id, input).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn get_course(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, course_id)): Path<(i64, i64)>,
) -> Result<Json<course_entity::Model>> {
    auth.authorize(&state, school_id, Capability::ViewRoster)
        .await?;
    Ok(Json(
        course::require_course(&state.db, school_id, course_id).await?,
    ))
}

async fn update_course(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, course_id)): Path<(i64, i64)>,
    Json(input): Json<CourseInput>,
) -> Result<Json<course_entity::Model>> {
    auth.authorize(&state, school_id, Capability::ManageCatalog)
        .await?;
    Ok(Json(
        course::update_course(&state.db, school_id, course_id, input).await?,
    ))
}

async fn delete_course(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, course_id)): Path<(i64, i64)>,
) -> Result<Json<course_entity::Model>> {
    auth.authorize(&state, school_id, Capability::ManageCatalog)
        .await?;
    Ok(Json(
        course::delete_course(&state.db, school_id, course_id).await?,
    ))
}

async fn list_packages(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Query(query): Query<ListPackagesQuery>,
) -> Result<Json<Vec<PackageDetails>>> {
    auth.authorize(&state, school_id, Capability::ViewRoster)
        .await?;
    Ok(Json(
        package::list_packages(
            &state.db,
            school_id,
            query.include_inactive,
            query.course_id,
        )
        .await?,
    ))
}

async fn create_package(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Json(input): Json<PackageInput>,
) -> Result<(StatusCode, Json<PackageDetails>)> {
    auth.authorize(&state, school_id, Capability::ManageCatalog)
        .await?;
    let details = package::create_package(&state.db, school_id, input).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

async fn get_package(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, package_id)): Path<(i64, i64)>,
) -> Result<Json<PackageDetails>> {
    auth.authorize(&state, school_id, Capability::ViewRoster)
        .await?;
    package::get_package(&state.db, school_id, package_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Package", package_id))
}

async fn update_package(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, package_id)): Path<(i64, i64)>,
    Json(input): Json<PackageInput>,
) -> Result<Json<PackageDetails>> {
    auth.authorize(&state, school_id, Capability::ManageCatalog)
        .await?;
    Ok(Json(
        package::update_package(&state.db, school_id, package_id, input).await?,
    ))
}

async fn deactivate_package(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, package_id)): Path<(i64, i64)>,
) -> Result<Json<credit_package::Model>> {
    auth.authorize(&state, school_id, Capability::ManageCatalog)
        .await?;
    Ok(Json(
        package::deactivate_package(&state.db, school_id, package_id).await?,
    ))
}
