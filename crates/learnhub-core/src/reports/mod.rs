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

//! Reporting over enrollments and progress
//!
//! A [`ReportFilter`] selects enrollments; the engine turns them into a
//! [`ReportTable`] plus summary statistics and chart series. The same table
//! feeds the paginated JSON view and every export format, so exports always
//! agree with what the report screen shows.

pub mod engine;
pub mod filter;
pub mod pagination;
pub mod table;

#[cfg(test)]
mod tests;

pub use engine::{ChartSeries, ReportCharts, ReportDataset, ReportOutput, ReportScope, ReportSummary, build_report};
pub use filter::{ReportFilter, ReportKind, SortDirection};
pub use pagination::Pagination;
pub use table::{Cell, Column, ReportTable};

use crate::error::CoreResult;
use crate::export::{ExportFile, ExportFormat, ExportOptions, render_with};
use crate::store::{CourseStore, EnrollmentStore, ProgressStore, UserStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// One page of a report as returned to API clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub kind: ReportKind,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub filter: ReportFilter,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
    pub pagination: Pagination,
    pub summary: ReportSummary,
    pub charts: ReportCharts,
}

impl Report {
    /// Cut one page out of a full report output
    pub fn paginate(output: ReportOutput, filter: &ReportFilter, generated_at: DateTime<Utc>) -> Self {
        let pagination = Pagination::new(filter.page, filter.per_page, output.table.rows.len());
        Self::with_pagination(output, filter, generated_at, pagination)
    }

    /// Keep every row on a single page
    pub fn complete(output: ReportOutput, filter: &ReportFilter, generated_at: DateTime<Utc>) -> Self {
        let pagination = Pagination::single(output.table.rows.len());
        Self::with_pagination(output, filter, generated_at, pagination)
    }

    fn with_pagination(output: ReportOutput, filter: &ReportFilter, generated_at: DateTime<Utc>, pagination: Pagination) -> Self {
        let ReportOutput { kind, table, summary, charts } = output;
        let rows = table.rows[pagination.range()].to_vec();
        Self {
            kind,
            title: table.title,
            generated_at,
            filter: filter.clone(),
            columns: table.columns,
            rows,
            pagination,
            summary,
            charts,
        }
    }
}

/// Loads report data from storage and runs reports
pub struct ReportService {
    users: Arc<dyn UserStore>,
    courses: Arc<dyn CourseStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    progress: Arc<dyn ProgressStore>,
    export_options: ExportOptions,
}

impl ReportService {
    pub fn new(users: Arc<dyn UserStore>, courses: Arc<dyn CourseStore>, enrollments: Arc<dyn EnrollmentStore>, progress: Arc<dyn ProgressStore>) -> Self {
        Self {
            users,
            courses,
            enrollments,
            progress,
            export_options: ExportOptions::default(),
        }
    }

    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export_options = options;
        self
    }

    pub async fn dataset(&self) -> CoreResult<ReportDataset> {
        Ok(ReportDataset::new(
            self.users.list_users().await?,
            self.courses.list_courses().await?,
            self.courses.list_all_modules().await?,
            self.enrollments.list_enrollments().await?,
            self.progress.list_all_progress().await?,
        ))
    }

    /// Run a report and return the requested page
    pub async fn run(&self, kind: ReportKind, filter: &ReportFilter, scope: &ReportScope) -> CoreResult<Report> {
        let dataset = self.dataset().await?;
        let now = Utc::now();
        let output = build_report(&dataset, kind, filter, scope, now.date_naive())?;
        info!("Ran {} report: {} rows", kind, output.table.rows.len());
        Ok(Report::paginate(output, filter, now))
    }

    /// Render every filtered row in the requested format
    pub async fn export(&self, kind: ReportKind, filter: &ReportFilter, scope: &ReportScope, format: ExportFormat) -> CoreResult<ExportFile> {
        let dataset = self.dataset().await?;
        let now = Utc::now();
        let output = build_report(&dataset, kind, filter, scope, now.date_naive())?;
        let report = Report::complete(output, filter, now);
        let file = render_with(&report, format, &self.export_options)?;
        info!("Exported {} report as {} ({} bytes)", kind, format, file.bytes.len());
        metrics::increment_counter!("learnhub_report_exports_total", "format" => format.extension());
        Ok(file)
    }
}
