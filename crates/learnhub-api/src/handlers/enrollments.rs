// LearnHub
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Enrollment handlers

use super::is_staff;
use crate::error::ApiError;
use crate::models::EnrollRequest;
use crate::request::{ApiRequest, json_response};
use crate::router::HandlerResult;
use crate::state::AppState;
use hyper::StatusCode;
use learnhub_core::models::Enrollment;
use tracing::info;

/// Enroll the caller, or as staff another learner, in a course
/// POST /api/v1/courses/{id}/enroll
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/enroll",
    params(("id" = String, Path, description = "Course id")),
    request_body = EnrollRequest,
    responses(
        (status = 201, description = "Enrolled", body = Enrollment),
        (status = 403, description = "May not enroll other users"),
        (status = 409, description = "Already enrolled"),
        (status = 422, description = "Course not published or prerequisites missing")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn enroll(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let course_id = req.param("id")?;
    let request: EnrollRequest = req.input_or_default()?;

    let learner_id = request.user_id.unwrap_or_else(|| claims.sub.clone());
    if learner_id != claims.sub {
        if !is_staff(claims) {
            return Err(ApiError::forbidden("Only staff may enroll other users"));
        }
        let course = state.catalog.get_course(course_id).await?;
        state.rbac.authorize(claims, "courses", "update", &[&course.instructor_id])?;
    }

    let enrollment = state.enrollments.enroll(&learner_id, course_id, request.due_date).await?;
    info!("User {} enrolled in {} by {}", learner_id, course_id, claims.sub);
    json_response(StatusCode::CREATED, &enrollment)
}

/// List enrollments
/// GET /api/v1/enrollments
#[utoipa::path(
    get,
    path = "/api/v1/enrollments",
    params(
        ("user_id" = Option<String>, Query, description = "Learner id, defaults to the caller"),
        ("course_id" = Option<String>, Query, description = "All enrollments of a course")
    ),
    responses(
        (status = 200, description = "Enrollments", body = [Enrollment]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn list_enrollments(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;

    let enrollments = if let Some(course_id) = req.query_param("course_id") {
        let course = state.catalog.get_course(course_id).await?;
        state.rbac.authorize(claims, "enrollments", "read", &[&course.instructor_id])?;
        state.enrollments.list_for_course(course_id).await?
    } else {
        let user_id = req.query_param("user_id").unwrap_or(claims.sub.as_str());
        state.rbac.authorize(claims, "enrollments", "read", &[user_id])?;
        state.enrollments.list_for_user(user_id).await?
    };

    json_response(StatusCode::OK, &enrollments)
}

/// Drop an enrollment
/// DELETE /api/v1/enrollments/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/enrollments/{id}",
    params(("id" = String, Path, description = "Enrollment id")),
    responses(
        (status = 200, description = "Enrollment dropped", body = Enrollment),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Enrollment not found"),
        (status = 409, description = "Enrollment already completed")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn drop_enrollment(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let enrollment = state.enrollments.get_enrollment(req.param("id")?).await?;
    let course = state.catalog.get_course(&enrollment.course_id).await?;
    state.rbac.authorize(claims, "enrollments", "delete", &[&enrollment.user_id, &course.instructor_id])?;

    let enrollment = state.enrollments.drop_enrollment(&enrollment.id).await?;
    info!("Enrollment {} dropped by {}", enrollment.id, claims.sub);
    json_response(StatusCode::OK, &enrollment)
}
