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

//! Route table of the REST API

use crate::config::Config;
use crate::error::ApiResult;
use crate::handlers::{auth, courses, enrollments, health, progress, reports};
use crate::middleware::MiddlewareRegistry;
use crate::openapi::generate_openapi_spec;
use crate::router::{HandlerResult, Router, handler};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode, header};
use tracing::info;

/// Build the router with every endpoint registered.
///
/// Order matters: routes are matched first to last, so literal segments such
/// as `modules/order` are registered before the `{module_id}` routes.
pub fn build_router(config: &Config) -> ApiResult<Router> {
    let mut router = Router::new(MiddlewareRegistry::default()).with_max_body_size(config.max_body_size);

    router.group("/api/v1", &[], |api| {
        api.get("/health", handler(health::health_check))?;

        api.group("/auth", &[], |g| {
            g.route(Method::POST, "/login", &["json"], handler(auth::login))?;
            g.route(Method::GET, "/profile", &["auth"], handler(auth::profile))
        })?;

        api.group("/courses", &["auth"], |g| {
            g.get("/", handler(courses::list_courses))?;
            g.route(Method::POST, "/", &["json", "permission:courses:create"], handler(courses::create_course))?;
            g.get("/{id}", handler(courses::get_course))?;
            g.route(Method::PUT, "/{id}", &["json", "permission:courses:update"], handler(courses::update_course))?;
            g.route(Method::PATCH, "/{id}", &["json", "permission:courses:update"], handler(courses::update_course))?;
            g.route(Method::DELETE, "/{id}", &["permission:courses:delete"], handler(courses::delete_course))?;
            g.route(Method::POST, "/{id}/publish", &["permission:courses:update"], handler(courses::publish_course))?;
            g.route(Method::POST, "/{id}/archive", &["permission:courses:update"], handler(courses::archive_course))?;

            g.route(Method::POST, "/{id}/modules", &["json", "permission:courses:update"], handler(courses::add_module))?;
            g.route(Method::PUT, "/{id}/modules/order", &["json", "permission:courses:update"], handler(courses::reorder_modules))?;
            g.route(Method::PUT, "/{id}/modules/{module_id}", &["json", "permission:courses:update"], handler(courses::update_module))?;
            g.route(Method::DELETE, "/{id}/modules/{module_id}", &["permission:courses:update"], handler(courses::remove_module))?;

            g.route(Method::POST, "/{id}/enroll", &["json", "permission:enrollments:create"], handler(enrollments::enroll))?;
            g.get("/{id}/progress", handler(progress::course_progress))
        })?;

        api.group("/enrollments", &["auth"], |g| {
            g.get("/", handler(enrollments::list_enrollments))?;
            g.delete("/{id}", handler(enrollments::drop_enrollment))
        })?;

        api.group("/progress/modules/{module_id}", &["auth", "json"], |g| {
            g.post("/start", handler(progress::start_module))?;
            g.post("/heartbeat", handler(progress::heartbeat))?;
            g.post("/complete", handler(progress::complete_module))
        })?;

        api.group("/reports/{kind}", &["auth"], |g| {
            g.route(Method::GET, "/", &["permission:reports:read"], handler(reports::run_report))?;
            g.route(Method::GET, "/export/{format}", &["permission:reports:export"], handler(reports::export_report))
        })
    })?;

    if config.openapi_enabled {
        let spec = Bytes::from(generate_openapi_spec());
        router.get(
            "/openapi.json",
            handler(move |_req, _state| {
                let spec = spec.clone();
                async move { openapi_response(spec) }
            }),
        )?;
    }

    info!("Registered {} routes", router.routes().len());
    Ok(router)
}

fn openapi_response(spec: Bytes) -> HandlerResult {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(spec))?)
}
