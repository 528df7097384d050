use crate::commands::CommandContext;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use learnhub_core::export::{self, ExportFormat};
use learnhub_core::reports::{Report, ReportDataset, ReportFilter, ReportKind, ReportScope, build_report};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

fn parse_kind(value: &str) -> Result<ReportKind, String> {
    value.parse().map_err(|e: learnhub_core::CoreError| e.to_string())
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    value.parse().map_err(|e: learnhub_core::CoreError| e.to_string())
}

/// Filters shared by every report command
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub course: Option<String>,
    #[arg(long)]
    pub learner: Option<String>,
    #[arg(long)]
    pub instructor: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    /// active, completed or dropped
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub department: Option<String>,
    /// Enrolled on or after (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,
    /// Enrolled on or before (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    /// Column key to sort by
    #[arg(long)]
    pub sort: Option<String>,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
}

impl FilterArgs {
    /// Same parameter names the HTTP API accepts
    pub fn to_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        let pairs = [
            ("course_id", &self.course),
            ("user_id", &self.learner),
            ("instructor_id", &self.instructor),
            ("category", &self.category),
            ("status", &self.status),
            ("department", &self.department),
            ("from", &self.from),
            ("to", &self.to),
            ("search", &self.search),
            ("sort", &self.sort),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                params.insert(key.to_string(), value.clone());
            }
        }
        if self.desc {
            params.insert("direction".to_string(), "desc".to_string());
        }
        params
    }

    pub fn to_filter(&self) -> Result<ReportFilter> {
        ReportFilter::from_params(&self.to_params()).context("invalid report filter")
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// enrollments, course_summary or learner_activity
    #[arg(value_parser = parse_kind)]
    pub kind: ReportKind,
    /// json, csv, xlsx or pdf; defaults to the configured format
    #[arg(long, short, value_parser = parse_format)]
    pub format: Option<ExportFormat>,
    /// Output directory; defaults to the configured directory
    #[arg(long, short)]
    pub out: Option<PathBuf>,
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[arg(value_parser = parse_kind)]
    pub kind: ReportKind,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 25)]
    pub per_page: u32,
    #[command(flatten)]
    pub filter: FilterArgs,
}

fn run(dataset: &ReportDataset, kind: ReportKind, filter: &ReportFilter, paginate: bool) -> Result<Report> {
    let now = Utc::now();
    let output = build_report(dataset, kind, filter, &ReportScope::All, now.date_naive())?;
    Ok(if paginate { Report::paginate(output, filter, now) } else { Report::complete(output, filter, now) })
}

/// Render a report file and return where it was written
pub fn export_report(ctx: &CommandContext, args: ExportArgs) -> Result<PathBuf> {
    let format = args.format.unwrap_or(ctx.config.format);
    let out_dir = args.out.unwrap_or_else(|| ctx.config.output_dir.clone());
    let filter = args.filter.to_filter()?;

    let report = run(&ctx.dataset()?, args.kind, &filter, false)?;
    let file = export::render_with(&report, format, &ctx.config.export_options())?;

    std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let path = file.write_to(&out_dir).with_context(|| format!("writing {}", file.file_name))?;
    info!("Wrote {} rows to {}", report.rows.len(), path.display());
    Ok(path)
}

/// Print one page of a report with its summary
pub fn show_report(ctx: &CommandContext, args: ShowArgs) -> Result<()> {
    let mut filter = args.filter.to_filter()?;
    filter.page = Some(args.page);
    filter.per_page = Some(args.per_page);

    let report = run(&ctx.dataset()?, args.kind, &filter, true)?;
    print!("{}", render_text(&report));
    Ok(())
}

/// Plain-text table followed by the summary block
pub fn render_text(report: &Report) -> String {
    let headers: Vec<String> = report.columns.iter().map(|c| c.label.clone()).collect();
    let rows: Vec<Vec<String>> = report.rows.iter().map(|row| row.iter().map(|cell| cell.to_string()).collect()).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        let padded: Vec<String> = cells.iter().zip(&widths).map(|(cell, width)| format!("{:<width$}", cell, width = *width)).collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut out = format!("{}\n\n", report.title);
    out.push_str(&line(&headers));
    out.push_str(&format!("{}\n", widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")));
    for row in &rows {
        out.push_str(&line(row));
    }

    let p = &report.pagination;
    out.push_str(&format!("\nPage {} of {} ({} rows)\n\n", p.page, p.total_pages.max(1), p.total_rows));
    for (label, value) in report.summary.entries() {
        out.push_str(&format!("{:<22}{}\n", label, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use learnhub_core::models::{Course, CourseModule, CourseStatus, Enrollment, EnrollmentStatus, ModuleKind, User, UserRole};
    use learnhub_core::store::Snapshot;

    fn snapshot() -> Snapshot {
        let instructor = User::new("ian@example.com".into(), "Ian Instructor".into(), UserRole::Instructor, String::new());
        let ada = User::new("ada@example.com".into(), "Ada Lovelace".into(), UserRole::Learner, String::new()).with_department("Engineering");
        let grace = User::new("grace@example.com".into(), "Grace Hopper".into(), UserRole::Learner, String::new()).with_department("Research");

        let now = Utc::now();
        let course = Course {
            id: "c1".into(),
            code: "RUST-101".into(),
            title: "Rust Basics".into(),
            description: String::new(),
            category: "Programming".into(),
            instructor_id: instructor.id.clone(),
            status: CourseStatus::Published,
            prerequisite_course_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let module = CourseModule {
            id: "m1".into(),
            course_id: "c1".into(),
            title: "Ownership".into(),
            kind: ModuleKind::Reading,
            position: 1,
            duration_minutes: 20,
            required: true,
            passing_score: None,
            prerequisite_module_ids: Vec::new(),
        };

        let active = Enrollment::new(ada.id.clone(), "c1".into(), None);
        let mut completed = Enrollment::new(grace.id.clone(), "c1".into(), None);
        completed.status = EnrollmentStatus::Completed;
        completed.completed_at = Some(now);
        completed.progress_percent = 100.0;

        Snapshot {
            users: vec![instructor, ada, grace],
            courses: vec![course],
            modules: vec![module],
            enrollments: vec![active, completed],
            progress: Vec::new(),
        }
    }

    fn context(dir: &std::path::Path, format: ExportFormat) -> CommandContext {
        let data = dir.join("snapshot.json");
        snapshot().save(&data).unwrap();
        CommandContext::new(CliConfig {
            data: Some(data),
            output_dir: dir.join("out"),
            format,
            pdf_font: None,
        })
    }

    #[test]
    fn test_filter_args_use_api_parameter_names() {
        let args = FilterArgs {
            course: Some("c1".into()),
            status: Some("active".into()),
            desc: true,
            ..FilterArgs::default()
        };
        let params = args.to_params();
        assert_eq!(params.get("course_id").map(String::as_str), Some("c1"));
        assert_eq!(params.get("direction").map(String::as_str), Some("desc"));
        assert_eq!(params.len(), 3);

        let bad = FilterArgs {
            from: Some("2025-02-01".into()),
            to: Some("2025-01-01".into()),
            ..FilterArgs::default()
        };
        assert!(bad.to_filter().is_err());
    }

    #[test]
    fn test_export_writes_all_filtered_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), ExportFormat::Csv);

        let path = export_report(
            &ctx,
            ExportArgs {
                kind: ReportKind::Enrollments,
                format: None,
                out: None,
                filter: FilterArgs::default(),
            },
        )
        .unwrap();

        assert!(path.starts_with(dir.path().join("out")));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));
        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("Ada Lovelace"));
        assert!(csv.contains("Grace Hopper"));
    }

    #[test]
    fn test_export_respects_filters_and_format_override() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), ExportFormat::Csv);

        let path = export_report(
            &ctx,
            ExportArgs {
                kind: ReportKind::Enrollments,
                format: Some(ExportFormat::Json),
                out: Some(dir.path().join("json")),
                filter: FilterArgs {
                    department: Some("Research".into()),
                    ..FilterArgs::default()
                },
            },
        )
        .unwrap();

        let report: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(report["pagination"]["total_rows"], 1);
        assert_eq!(report["summary"]["completed"], 1);
    }

    #[test]
    fn test_text_rendering_pages_rows_but_not_summary() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), ExportFormat::Csv);
        let mut filter = ReportFilter::default();
        filter.per_page = Some(1);

        let report = run(&ctx.dataset().unwrap(), ReportKind::Enrollments, &filter, true).unwrap();
        let text = render_text(&report);
        assert!(text.contains("Page 1 of 2 (2 rows)"));
        assert!(text.contains("Total enrollments     2"));
    }

    #[test]
    fn test_missing_snapshot_is_reported() {
        let ctx = CommandContext::new(CliConfig::default());
        assert!(ctx.snapshot().is_err());
    }
}
