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

//! Progress tracking handlers
//!
//! These are the endpoints the module player calls in the background; they
//! always act on the caller's own progress.

use crate::models::{CompleteRequest, HeartbeatRequest};
use crate::request::{ApiRequest, json_response};
use crate::router::HandlerResult;
use crate::state::AppState;
use hyper::StatusCode;
use learnhub_core::models::{CourseProgress, ModuleProgress};
use learnhub_core::progress::ModuleCompletion;
use tracing::info;

/// Start a module
/// POST /api/v1/progress/modules/{module_id}/start
#[utoipa::path(
    post,
    path = "/api/v1/progress/modules/{module_id}/start",
    params(("module_id" = String, Path, description = "Module id")),
    responses(
        (status = 200, description = "Module progress", body = ModuleProgress),
        (status = 404, description = "No active enrollment in the module's course"),
        (status = 422, description = "Prerequisite modules incomplete")
    ),
    security(("bearer_auth" = [])),
    tag = "Progress"
)]
pub async fn start_module(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let progress = state.progress.start_module(&claims.sub, req.param("module_id")?).await?;
    json_response(StatusCode::OK, &progress)
}

/// Record time on task
/// POST /api/v1/progress/modules/{module_id}/heartbeat
#[utoipa::path(
    post,
    path = "/api/v1/progress/modules/{module_id}/heartbeat",
    params(("module_id" = String, Path, description = "Module id")),
    request_body = HeartbeatRequest,
    responses((status = 200, description = "Module progress", body = ModuleProgress)),
    security(("bearer_auth" = [])),
    tag = "Progress"
)]
pub async fn heartbeat(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let beat: HeartbeatRequest = req.input()?;
    let progress = state.progress.heartbeat(&claims.sub, req.param("module_id")?, beat.seconds).await?;
    json_response(StatusCode::OK, &progress)
}

/// Complete a module
/// POST /api/v1/progress/modules/{module_id}/complete
#[utoipa::path(
    post,
    path = "/api/v1/progress/modules/{module_id}/complete",
    params(("module_id" = String, Path, description = "Module id")),
    request_body = CompleteRequest,
    responses(
        (status = 200, description = "Completion outcome and course progress", body = ModuleCompletion),
        (status = 422, description = "Missing or out of range quiz score")
    ),
    security(("bearer_auth" = [])),
    tag = "Progress"
)]
pub async fn complete_module(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let request: CompleteRequest = req.input_or_default()?;
    let completion = state.progress.complete_module(&claims.sub, req.param("module_id")?, request.score).await?;

    if completion.passed {
        info!("{} completed module {} ({}% of course)", claims.sub, completion.progress.module_id, completion.course.percent);
    }
    json_response(StatusCode::OK, &completion)
}

/// A learner's progress through a course
/// GET /api/v1/courses/{id}/progress
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/progress",
    params(
        ("id" = String, Path, description = "Course id"),
        ("user_id" = Option<String>, Query, description = "Learner id, defaults to the caller")
    ),
    responses(
        (status = 200, description = "Course progress", body = CourseProgress),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not enrolled")
    ),
    security(("bearer_auth" = [])),
    tag = "Progress"
)]
pub async fn course_progress(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let course_id = req.param("id")?;
    let user_id = req.query_param("user_id").unwrap_or(claims.sub.as_str());

    if user_id != claims.sub {
        let course = state.catalog.get_course(course_id).await?;
        state.rbac.authorize(claims, "enrollments", "read", &[&course.instructor_id])?;
    }

    let progress = state.progress.course_progress(user_id, course_id).await?;
    json_response(StatusCode::OK, &progress)
}
