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

//! OpenAPI document for the REST API

use crate::handlers::{auth, courses, enrollments, health, progress, reports};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
#[openapi(
    info(title = "LearnHub API", description = "Course catalog, enrollment, progress tracking and reporting"),
    paths(
        // Health endpoints
        health::health_check,

        // Auth endpoints
        auth::login,
        auth::profile,

        // Catalog endpoints
        courses::list_courses,
        courses::create_course,
        courses::get_course,
        courses::update_course,
        courses::delete_course,
        courses::publish_course,
        courses::archive_course,
        courses::add_module,
        courses::reorder_modules,
        courses::update_module,
        courses::remove_module,

        // Enrollment endpoints
        enrollments::enroll,
        enrollments::list_enrollments,
        enrollments::drop_enrollment,

        // Progress endpoints
        progress::start_module,
        progress::heartbeat,
        progress::complete_module,
        progress::course_progress,

        // Report endpoints
        reports::run_report,
        reports::export_report,
    ),
    components(
        schemas(
            crate::models::LoginRequest,
            crate::models::TokenResponse,
            crate::models::HealthResponse,
            crate::models::EnrollRequest,
            crate::models::HeartbeatRequest,
            crate::models::CompleteRequest,
            crate::models::ReorderRequest,
            learnhub_core::models::UserRole,
            learnhub_core::models::UserSummary,
            learnhub_core::models::CourseStatus,
            learnhub_core::models::Course,
            learnhub_core::models::NewCourse,
            learnhub_core::models::CourseUpdate,
            learnhub_core::models::ModuleKind,
            learnhub_core::models::CourseModule,
            learnhub_core::models::NewModule,
            learnhub_core::models::ModuleUpdate,
            learnhub_core::models::EnrollmentStatus,
            learnhub_core::models::Enrollment,
            learnhub_core::models::ProgressStatus,
            learnhub_core::models::ModuleProgress,
            learnhub_core::models::ModuleProgressView,
            learnhub_core::models::CourseProgress,
            learnhub_core::catalog::CourseDetail,
            learnhub_core::progress::ModuleCompletion,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Authentication", description = "Login and profile"),
        (name = "Courses", description = "Course catalog and module management"),
        (name = "Enrollments", description = "Course enrollment"),
        (name = "Progress", description = "Module progress tracking"),
        (name = "Reports", description = "Reports and exports")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme("bearer_auth", SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()))
        }
    }
}

/// Pretty-printed OpenAPI JSON
pub fn generate_openapi_spec() -> String {
    ApiDoc::openapi().to_pretty_json().unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_endpoint() {
        let doc: serde_json::Value = serde_json::from_str(&generate_openapi_spec()).unwrap();
        let paths = doc["paths"].as_object().unwrap();

        for path in [
            "/api/v1/health",
            "/api/v1/auth/login",
            "/api/v1/courses/{id}/modules/order",
            "/api/v1/progress/modules/{module_id}/complete",
            "/api/v1/reports/{kind}/export/{format}",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
        assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
    }
}
