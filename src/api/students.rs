//! Student roster, purchases and credit balances.

use super::{AppState, auth::AuthContext};
use crate::{
    core::{
        credit::{self, CreditView, PurchaseReceipt, PurchaseRequest, StudentBalance},
        student::{self, StudentInput},
        user::Capability,
    },
    entities::{student as student_entity, student_credit},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct ListStudentsQuery {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    include_inactive: bool,
}

#[derive(Debug, Deserialize)]
struct UsableCreditsQuery {
    course_id: i64,
}

#[derive(Debug, Deserialize)]
struct AdjustCreditRequest {
    delta: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students).post(create_student))
        .route(
            "/students/{student_id}",
            get(get_student).put(update_student).delete(deactivate_student),
        )
        .route("/students/{student_id}/reactivate", post(reactivate_student))
        .route("/students/{student_id}/purchases", post(purchase_package))
        .route("/students/{student_id}/credits", get(list_credits))
        .route("/students/{student_id}/credits/usable", get(usable_credits))
        .route("/students/{student_id}/balance", get(balance))
        .route("/credits/{credit_id}/adjust", post(adjust_credit))
}

async fn list_students(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Query(query): Query<ListStudentsQuery>,
) -> Result<Json<Vec<student_entity::Model>>> {
    auth.authorize(&state, school_id, Capability::ViewRoster)
        .await?;
    Ok(Json(
        student::list_students(
            &state.db,
            school_id,
            query.search.as_deref(),
            query.include_inactive,
        )
        .await?,
    ))
}

async fn create_student(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(school_id): Path<i64>,
    Json(input): Json<StudentInput>,
) -> Result<(StatusCode, Json<student_entity::Model>)> {
    auth.authorize(&state, school_id, Capability::ManageStudents)
        .await?;
    let student = student::create_student(&state.db, school_id, input).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

async fn get_student(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, student_id)): Path<(i64, i64)>,
) -> Result<Json<student_entity::Model>> {
    auth.authorize(&state, school_id, Capability::ViewRoster)
        .await?;
    student::get_student(&state.db, school_id, student_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Student", student_id))
}

async fn update_student(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, student_id)): Path<(i64, i64)>,
    Json(input): Json<StudentInput>,
) -> Result<Json<student_entity::Model>> {
    auth.authorize(&state, school_id, Capability::ManageStudents)
        .await?;
    Ok(Json(
        student::update_student(&state.db, school_id, student_id, input).await?,
    ))
}

async fn deactivate_student(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, student_id)): Path<(i64, i64)>,
) -> Result<Json<student_entity::Model>> {
    auth.authorize(&state, school_id, Capability::ManageStudents)
        .await?;
    Ok(Json(
        student::deactivate_student(&state.db, school_id, student_id).await?,
    ))
}

async fn reactivate_student(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, student_id)): Path<(i64, i64)>,
) -> Result<Json<student_entity::Model>> {
    auth.authorize(&state, school_id, Capability::ManageStudents)
        .await?;
    Ok(Json(
        student::reactivate_student(&state.db, school_id, student_id).await?,
    ))
}

async fn purchase_package(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, student_id)): Path<(i64, i64)>,
    Json(request): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseReceipt>)> {
    auth.authorize(&state, school_id, Capability::SellCredits)
        .await?;
    let receipt =
        credit::purchase_package(&state.db, school_id, student_id, request, Some(auth.user.id))
            .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn list_credits(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, student_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<CreditView>>> {
    auth.authorize(&state, school_id, Capability::ViewRoster)
        .await?;
    Ok(Json(
        credit::list_student_credits(&state.db, school_id, student_id).await?,
    ))
}

async fn usable_credits(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, student_id)): Path<(i64, i64)>,
    Query(query): Query<UsableCreditsQuery>,
) -> Result<Json<Vec<student_credit::Model>>> {
    auth.authorize(&state, school_id, Capability::ViewRoster)
        .await?;
    Ok(Json(
        credit::usable_credits(
            &state.db,
            school_id,
            student_id,
            query.course_id,
            Utc::now(),
        )
        .await?,
    ))
}

async fn balance(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, student_id)): Path<(i64, i64)>,
) -> Result<Json<StudentBalance>> {
    auth.authorize(&state, school_id, Capability::ViewRoster)
        .await?;
    Ok(Json(
        credit::student_balance(&state.db, school_id, student_id).await?,
    ))
}

async fn adjust_credit(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((school_id, credit_id)): Path<(i64, i64)>,
    Json(request): Json<AdjustCreditRequest>,
) -> Result<Json<student_credit::Model>> {
    auth.authorize(&state, school_id, Capability::SellCredits)
        .await?;
    Ok(Json(
        credit::adjust_credit(&state.db, school_id, credit_id, request.delta).await?,
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, test_state};
    use crate::entities::{CourseCategory, Role};
    use crate::errors::Result;
    use crate::test_utils::*;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_sell_and_inspect_credits() -> Result<()> {
        let state = test_state().await?;
        let school = create_test_school(&state.db, "Front Desk").await?;
        let admin = create_test_user(&state.db, school.id, "desk@school.dev", Role::Admin).await?;
        let course = create_test_course(&state.db, school.id, "Violin", CourseCategory::Art).await?;
        let package = create_universal_package(&state.db, school.id, 8).await?;

        let base = format!("/schools/{}", school.id);
        let (status, student) = send(
            &state,
            Method::POST,
            &format!("{base}/students"),
            Some(admin.id),
            Some(json!({ "name": "Mia", "guardian_name": "Lena" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let student_id = student["id"].as_i64().unwrap_or_default();

        let (status, receipt) = send(
            &state,
            Method::POST,
            &format!("{base}/students/{student_id}/purchases"),
            Some(admin.id),
            Some(json!({ "package_id": package.package.id, "discount_amount": 5.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipt["purchase"]["purchased_by"], admin.id);
        assert_eq!(receipt["purchase"]["payment_method"], "cash");
        assert_eq!(receipt["credit"]["remaining_credits"], 8);

        let (status, usable) = send(
            &state,
            Method::GET,
            &format!("{base}/students/{student_id}/credits/usable?course_id={}", course.id),
            Some(admin.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(usable.as_array().map(Vec::len), Some(1));

        let (status, balance) = send(
            &state,
            Method::GET,
            &format!("{base}/students/{student_id}/balance"),
            Some(admin.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(balance["usable_credits"], 8);
        Ok(())
    }

    #[tokio::test]
    async fn test_teacher_cannot_sell() -> Result<()> {
        let state = test_state().await?;
        let school = create_test_school(&state.db, "Front Desk").await?;
        let teacher =
            create_test_user(&state.db, school.id, "teach@school.dev", Role::Teacher).await?;
        let student = create_test_student(&state.db, school.id, "Noah").await?;
        let package = create_universal_package(&state.db, school.id, 8).await?;

        let (status, _) = send(
            &state,
            Method::POST,
            &format!("/schools/{}/students/{}/purchases", school.id, student.id),
            Some(teacher.id),
            Some(json!({ "package_id": package.package.id })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, list) = send(
            &state,
            Method::GET,
            &format!("/schools/{}/students?search=no", school.id),
            Some(teacher.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().map(Vec::len), Some(1));
        Ok(())
    }
}
