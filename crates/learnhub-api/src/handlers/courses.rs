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

//! Course catalog handlers

use super::is_staff;
use crate::auth::Claims;
use crate::error::{ApiError, ApiResult};
use crate::models::ReorderRequest;
use crate::request::{ApiRequest, json_response, no_content};
use crate::router::HandlerResult;
use crate::state::AppState;
use hyper::StatusCode;
use learnhub_core::catalog::CourseDetail;
use learnhub_core::models::{Course, CourseModule, CourseQuery, CourseStatus, CourseUpdate, ModuleUpdate, NewCourse, NewModule, UserRole};
use tracing::info;

/// Load a course and check the caller may `action` it
async fn owned_course(state: &AppState, claims: &Claims, course_id: &str, action: &str) -> ApiResult<Course> {
    let course = state.catalog.get_course(course_id).await?;
    state.rbac.authorize(claims, "courses", action, &[&course.instructor_id])?;
    Ok(course)
}

fn check_instructor_change(claims: &Claims, instructor_id: Option<&String>) -> ApiResult<()> {
    match instructor_id {
        Some(id) if claims.role != UserRole::Admin && id != &claims.sub => Err(ApiError::forbidden("Only admins may assign courses to another instructor")),
        _ => Ok(()),
    }
}

/// List courses
/// GET /api/v1/courses
#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(
        ("status" = Option<String>, Query, description = "draft, published or archived"),
        ("category" = Option<String>, Query, description = "Exact category"),
        ("instructor_id" = Option<String>, Query, description = "Instructor user id"),
        ("search" = Option<String>, Query, description = "Text search over code, title and description")
    ),
    responses(
        (status = 200, description = "Courses", body = [Course]),
        (status = 422, description = "Invalid filter")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn list_courses(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let mut query = CourseQuery {
        status: req.query_param("status").map(str::parse).transpose()?,
        category: req.query_param("category").map(str::to_string),
        instructor_id: req.query_param("instructor_id").map(str::to_string),
        search: req.query_param("search").or_else(|| req.query_param("q")).map(str::to_string),
    };

    // Learners browse the published catalog only
    if !is_staff(claims) {
        query.status = Some(CourseStatus::Published);
    }

    let courses = state.catalog.list_courses(&query).await?;
    json_response(StatusCode::OK, &courses)
}

/// Create a course
/// POST /api/v1/courses
#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = NewCourse,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Course code already exists"),
        (status = 422, description = "Invalid course")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn create_course(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let new_course: NewCourse = req.input()?;
    check_instructor_change(claims, new_course.instructor_id.as_ref())?;

    let course = state.catalog.create_course(&claims.sub, new_course).await?;
    info!("Course {} created by {}", course.code, claims.sub);
    json_response(StatusCode::CREATED, &course)
}

/// Get a course with its modules
/// GET /api/v1/courses/{id}
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course detail", body = CourseDetail),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn get_course(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let course_id = req.param("id")?;
    let detail = state.catalog.get_course_detail(course_id).await?;

    if detail.course.status == CourseStatus::Draft && !is_staff(claims) {
        return Err(ApiError::NotFound {
            message: format!("Course not found: {}", course_id),
        });
    }

    json_response(StatusCode::OK, &detail)
}

/// Update a course (PUT and PATCH both apply a partial update)
/// PUT /api/v1/courses/{id}
#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    request_body = CourseUpdate,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 403, description = "Not the course instructor"),
        (status = 404, description = "Course not found"),
        (status = 422, description = "Invalid update")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn update_course(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let course = owned_course(&state, claims, req.param("id")?, "update").await?;
    let update: CourseUpdate = req.input()?;
    check_instructor_change(claims, update.instructor_id.as_ref())?;

    let course = state.catalog.update_course(&course.id, update).await?;
    json_response(StatusCode::OK, &course)
}

/// Delete a course without enrollments
/// DELETE /api/v1/courses/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 403, description = "Not the course instructor"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Course has enrollments or dependants")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn delete_course(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let course = owned_course(&state, claims, req.param("id")?, "delete").await?;

    state.catalog.delete_course(&course.id).await?;
    info!("Course {} deleted by {}", course.code, claims.sub);
    no_content()
}

/// Publish a course
/// POST /api/v1/courses/{id}/publish
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/publish",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course published", body = Course),
        (status = 422, description = "Course has no modules")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn publish_course(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let course = owned_course(&state, claims, req.param("id")?, "update").await?;
    let course = state.catalog.publish_course(&course.id).await?;
    json_response(StatusCode::OK, &course)
}

/// Archive a course
/// POST /api/v1/courses/{id}/archive
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/archive",
    params(("id" = String, Path, description = "Course id")),
    responses((status = 200, description = "Course archived", body = Course)),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn archive_course(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let course = owned_course(&state, claims, req.param("id")?, "update").await?;
    let course = state.catalog.archive_course(&course.id).await?;
    json_response(StatusCode::OK, &course)
}

/// Add a module to a course
/// POST /api/v1/courses/{id}/modules
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/modules",
    params(("id" = String, Path, description = "Course id")),
    request_body = NewModule,
    responses(
        (status = 201, description = "Module added", body = CourseModule),
        (status = 422, description = "Invalid module")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn add_module(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let course = owned_course(&state, claims, req.param("id")?, "update").await?;
    let new_module: NewModule = req.input()?;

    let module = state.catalog.add_module(&course.id, new_module).await?;
    json_response(StatusCode::CREATED, &module)
}

/// Update a module
/// PUT /api/v1/courses/{id}/modules/{module_id}
#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}/modules/{module_id}",
    params(
        ("id" = String, Path, description = "Course id"),
        ("module_id" = String, Path, description = "Module id")
    ),
    request_body = ModuleUpdate,
    responses(
        (status = 200, description = "Module updated", body = CourseModule),
        (status = 422, description = "Invalid update")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn update_module(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let course = owned_course(&state, claims, req.param("id")?, "update").await?;
    let update: ModuleUpdate = req.input()?;

    let module = state.catalog.update_module(&course.id, req.param("module_id")?, update).await?;
    json_response(StatusCode::OK, &module)
}

/// Remove a module
/// DELETE /api/v1/courses/{id}/modules/{module_id}
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}/modules/{module_id}",
    params(
        ("id" = String, Path, description = "Course id"),
        ("module_id" = String, Path, description = "Module id")
    ),
    responses(
        (status = 204, description = "Module removed"),
        (status = 404, description = "Module not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn remove_module(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let course = owned_course(&state, claims, req.param("id")?, "update").await?;

    state.catalog.remove_module(&course.id, req.param("module_id")?).await?;
    no_content()
}

/// Reorder modules
/// PUT /api/v1/courses/{id}/modules/order
#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}/modules/order",
    params(("id" = String, Path, description = "Course id")),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Modules in their new order", body = [CourseModule]),
        (status = 422, description = "Order does not list every module exactly once")
    ),
    security(("bearer_auth" = [])),
    tag = "Courses"
)]
pub async fn reorder_modules(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let course = owned_course(&state, claims, req.param("id")?, "update").await?;
    let reorder: ReorderRequest = req.input()?;

    let modules = state.catalog.reorder_modules(&course.id, &reorder.module_ids).await?;
    json_response(StatusCode::OK, &modules)
}
