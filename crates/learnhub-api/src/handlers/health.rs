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

//! Health check handlers

use crate::models::HealthResponse;
use crate::request::{ApiRequest, json_response};
use crate::router::HandlerResult;
use crate::state::AppState;
use chrono::Utc;
use hyper::StatusCode;
use tracing::info;

/// Health check handler
/// GET /api/v1/health
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Storage is unavailable")
    ),
    tag = "Health"
)]
pub async fn health_check(_req: ApiRequest, state: AppState) -> HandlerResult {
    info!("Processing health check request");

    let (courses, users) = match (state.courses.list_courses().await, state.users.list_users().await) {
        (Ok(courses), Ok(users)) => (courses.len(), users.len()),
        _ => {
            let unhealthy = HealthResponse {
                status: "unhealthy".to_string(),
                timestamp: Utc::now(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                courses: 0,
                users: 0,
            };
            return json_response(StatusCode::SERVICE_UNAVAILABLE, &unhealthy);
        }
    };

    let health_response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        courses,
        users,
    };

    json_response(StatusCode::OK, &health_response)
}
