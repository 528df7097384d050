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

//! Report handlers

use crate::request::{ApiRequest, json_response};
use crate::router::HandlerResult;
use crate::state::AppState;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode, header};
use learnhub_core::export::ExportFormat;
use learnhub_core::reports::{ReportFilter, ReportKind};
use tracing::info;

/// Run a report
/// GET /api/v1/reports/{kind}
#[utoipa::path(
    get,
    path = "/api/v1/reports/{kind}",
    params(
        ("kind" = String, Path, description = "enrollments, course_summary or learner_activity"),
        ("course_id" = Option<String>, Query, description = "Course id"),
        ("user_id" = Option<String>, Query, description = "Learner id"),
        ("instructor_id" = Option<String>, Query, description = "Instructor id"),
        ("category" = Option<String>, Query, description = "Course category"),
        ("status" = Option<String>, Query, description = "active, completed or dropped"),
        ("department" = Option<String>, Query, description = "Learner department"),
        ("from" = Option<String>, Query, description = "Enrolled on or after (YYYY-MM-DD)"),
        ("to" = Option<String>, Query, description = "Enrolled on or before (YYYY-MM-DD)"),
        ("search" = Option<String>, Query, description = "Free-text search"),
        ("sort" = Option<String>, Query, description = "Column key"),
        ("direction" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<u32>, Query, description = "Page number, from 1"),
        ("per_page" = Option<u32>, Query, description = "Rows per page, 1 to 500")
    ),
    responses(
        (status = 200, description = "One page of rows with summary and chart data over all filtered rows"),
        (status = 403, description = "Report not available to the caller"),
        (status = 422, description = "Invalid filter")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn run_report(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let kind: ReportKind = req.param("kind")?.parse()?;
    let filter = ReportFilter::from_params(&req.query)?;
    let scope = state.rbac.report_scope(claims);

    let report = state.reports.run(kind, &filter, &scope).await?;
    info!("Report {} for {}: {} of {} rows", kind, claims.sub, report.rows.len(), report.pagination.total_rows);
    json_response(StatusCode::OK, &report)
}

/// Export a report as a file
/// GET /api/v1/reports/{kind}/export/{format}
#[utoipa::path(
    get,
    path = "/api/v1/reports/{kind}/export/{format}",
    params(
        ("kind" = String, Path, description = "enrollments, course_summary or learner_activity"),
        ("format" = String, Path, description = "json, csv, xlsx or pdf")
    ),
    responses(
        (status = 200, description = "Report file; every filtered row, unpaginated"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Unknown format or invalid filter")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn export_report(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let kind: ReportKind = req.param("kind")?.parse()?;
    let format: ExportFormat = req.param("format")?.parse()?;
    let filter = ReportFilter::from_params(&req.query)?;
    let scope = state.rbac.report_scope(claims);

    let file = state.reports.export(kind, &filter, &scope, format).await?;
    info!("Exported {} ({} bytes) for {}", file.file_name, file.bytes.len(), claims.sub);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type)
        .header(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file.file_name))
        .body(Full::new(Bytes::from(file.bytes)))?)
}
