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

use super::*;
use crate::error::CoreError;
use crate::export::ExportFormat;
use crate::models::{Course, CourseModule, CourseStatus, Enrollment, EnrollmentStatus, ModuleKind, ModuleProgress, ProgressStatus, User, UserRole};
use crate::store::{MemoryStore, Snapshot};
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::HashMap;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn user(id: &str, name: &str, role: UserRole, department: Option<&str>) -> User {
    let mut user = User::new(format!("{}@example.com", id), name.to_string(), role, String::new());
    user.id = id.to_string();
    user.department = department.map(str::to_string);
    user
}

fn course(id: &str, code: &str, category: &str, instructor: &str) -> Course {
    Course {
        id: id.to_string(),
        code: code.to_string(),
        title: format!("{} course", code),
        description: String::new(),
        category: category.to_string(),
        instructor_id: instructor.to_string(),
        status: CourseStatus::Published,
        prerequisite_course_ids: Vec::new(),
        created_at: at(2024, 12, 1),
        updated_at: at(2024, 12, 1),
    }
}

fn module(id: &str, course_id: &str, position: u32, kind: ModuleKind) -> CourseModule {
    CourseModule {
        id: id.to_string(),
        course_id: course_id.to_string(),
        title: format!("Module {}", id),
        kind,
        position,
        duration_minutes: 10,
        required: true,
        passing_score: (kind == ModuleKind::Quiz).then_some(70.0),
        prerequisite_module_ids: Vec::new(),
    }
}

fn enrollment(id: &str, user_id: &str, course_id: &str, status: EnrollmentStatus, enrolled: chrono::DateTime<Utc>) -> Enrollment {
    let mut enrollment = Enrollment::new(user_id.to_string(), course_id.to_string(), None);
    enrollment.id = id.to_string();
    enrollment.status = status;
    enrollment.enrolled_at = enrolled;
    enrollment
}

fn progress(user_id: &str, course_id: &str, module_id: &str, completed: bool, score: Option<f64>, secs: u64) -> ModuleProgress {
    let mut record = ModuleProgress::new(user_id.to_string(), course_id.to_string(), module_id.to_string());
    record.status = if completed { ProgressStatus::Completed } else { ProgressStatus::InProgress };
    record.attempts = u32::from(score.is_some());
    record.best_score = score;
    record.time_spent_secs = secs;
    record.last_activity_at = Some(at(2025, 2, 12));
    record
}

/// Ada: active in CS101 (half done, overdue) and SEC-200. Grace completed
/// CS101. Alan dropped SEC-200.
fn snapshot() -> Snapshot {
    let mut overdue = enrollment("e1", "ada", "c1", EnrollmentStatus::Active, at(2025, 1, 10));
    overdue.due_date = Some(date(2025, 2, 1));
    let mut completed = enrollment("e2", "grace", "c1", EnrollmentStatus::Completed, at(2025, 1, 5));
    completed.completed_at = Some(at(2025, 2, 10));

    Snapshot {
        users: vec![
            user("ada", "Ada Lovelace", UserRole::Learner, Some("Engineering")),
            user("grace", "Grace Hopper", UserRole::Learner, Some("Operations")),
            user("alan", "Alan Turing", UserRole::Learner, None),
            user("ian", "Ian Instructor", UserRole::Instructor, None),
            user("ivy", "Ivy Instructor", UserRole::Instructor, None),
        ],
        courses: vec![course("c1", "CS101", "Programming", "ian"), course("c2", "SEC-200", "Security", "ivy")],
        modules: vec![
            module("m1", "c1", 1, ModuleKind::Reading),
            module("m2", "c1", 2, ModuleKind::Quiz),
            module("m3", "c2", 1, ModuleKind::Video),
        ],
        enrollments: vec![
            overdue,
            completed,
            enrollment("e3", "alan", "c2", EnrollmentStatus::Dropped, at(2025, 2, 20)),
            enrollment("e4", "ada", "c2", EnrollmentStatus::Active, at(2025, 2, 15)),
        ],
        progress: vec![
            progress("ada", "c1", "m1", true, None, 600),
            progress("ada", "c1", "m2", false, Some(60.0), 300),
            progress("grace", "c1", "m1", true, None, 1200),
            progress("grace", "c1", "m2", true, Some(90.0), 600),
        ],
    }
}

fn today() -> NaiveDate {
    date(2025, 3, 1)
}

fn run(kind: ReportKind, filter: &ReportFilter, scope: &ReportScope) -> ReportOutput {
    build_report(&ReportDataset::from_snapshot(snapshot()), kind, filter, scope, today()).unwrap()
}

fn column(output: &ReportOutput, key: &str) -> Vec<Cell> {
    let index = output.table.column_index(key).unwrap();
    output.table.rows.iter().map(|row| row[index].clone()).collect()
}

#[test]
fn test_enrollment_rows_default_to_enrollment_date_order() {
    let output = run(ReportKind::Enrollments, &ReportFilter::default(), &ReportScope::All);

    assert_eq!(output.table.rows.len(), 4);
    assert_eq!(
        column(&output, "learner"),
        vec![Cell::text("Grace Hopper"), Cell::text("Ada Lovelace"), Cell::text("Ada Lovelace"), Cell::text("Alan Turing")]
    );
    assert_eq!(column(&output, "progress"), vec![Cell::Number(100.0), Cell::Number(50.0), Cell::Number(0.0), Cell::Number(0.0)]);
    assert_eq!(column(&output, "modules")[1], Cell::text("1/2"));
    assert_eq!(column(&output, "score")[1], Cell::Number(60.0));
    assert_eq!(column(&output, "time_minutes")[0], Cell::Integer(30));
    assert_eq!(column(&output, "overdue"), vec![Cell::text("no"), Cell::text("yes"), Cell::text("no"), Cell::text("no")]);
    assert_eq!(column(&output, "department")[3], Cell::Empty);
}

#[test]
fn test_summary_covers_all_filtered_rows() {
    let output = run(ReportKind::Enrollments, &ReportFilter::default(), &ReportScope::All);
    let summary = &output.summary;

    assert_eq!(summary.total_enrollments, 4);
    assert_eq!((summary.active, summary.completed, summary.dropped, summary.overdue), (2, 1, 1, 1));
    assert_eq!((summary.learners, summary.courses), (3, 2));
    assert_eq!(summary.completion_rate, 25.0);
    assert_eq!(summary.average_progress, 37.5);
    assert_eq!(summary.average_score, Some(75.0));
    assert_eq!(summary.total_time_secs, 2700);
}

#[test]
fn test_pagination_does_not_change_summary_or_charts() {
    let filter = ReportFilter {
        page: Some(2),
        per_page: Some(3),
        ..ReportFilter::default()
    };
    let output = run(ReportKind::Enrollments, &filter, &ReportScope::All);
    let full_summary = output.summary.clone();
    let full_charts = output.charts.clone();

    let report = Report::paginate(output, &filter, Utc::now());
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0][0], Cell::text("Alan Turing"));
    assert_eq!(report.pagination.total_rows, 4);
    assert_eq!(report.pagination.total_pages, 2);
    assert_eq!(report.summary, full_summary);
    assert_eq!(report.charts, full_charts);
}

#[test]
fn test_filters_narrow_rows_and_summary_together() {
    let cases: Vec<(ReportFilter, usize)> = vec![
        (
            ReportFilter {
                status: Some(EnrollmentStatus::Active),
                ..ReportFilter::default()
            },
            2,
        ),
        (
            ReportFilter {
                department: Some("engineering".to_string()),
                ..ReportFilter::default()
            },
            2,
        ),
        (
            ReportFilter {
                enrolled_from: Some(date(2025, 2, 1)),
                enrolled_to: Some(date(2025, 2, 15)),
                ..ReportFilter::default()
            },
            1,
        ),
        (
            ReportFilter {
                search: Some("sec-".to_string()),
                ..ReportFilter::default()
            },
            2,
        ),
        (
            ReportFilter {
                category: Some("PROGRAMMING".to_string()),
                ..ReportFilter::default()
            },
            2,
        ),
        (
            ReportFilter {
                course_id: Some("c2".to_string()),
                user_id: Some("ada".to_string()),
                ..ReportFilter::default()
            },
            1,
        ),
    ];

    for (filter, expected) in cases {
        let output = run(ReportKind::Enrollments, &filter, &ReportScope::All);
        assert_eq!(output.table.rows.len(), expected, "filter {:?}", filter);
        assert_eq!(output.summary.total_enrollments, expected, "filter {:?}", filter);
    }
}

#[test]
fn test_sorting() {
    let filter = ReportFilter {
        sort: Some("progress".to_string()),
        direction: SortDirection::Desc,
        ..ReportFilter::default()
    };
    let output = run(ReportKind::Enrollments, &filter, &ReportScope::All);
    assert_eq!(column(&output, "progress")[0], Cell::Number(100.0));

    let filter = ReportFilter {
        sort: Some("salary".to_string()),
        ..ReportFilter::default()
    };
    let result = build_report(&ReportDataset::from_snapshot(snapshot()), ReportKind::Enrollments, &filter, &ReportScope::All, today());
    assert!(matches!(result, Err(CoreError::Validation { .. })));
}

#[test]
fn test_course_summary_rows() {
    let output = run(ReportKind::CourseSummary, &ReportFilter::default(), &ReportScope::All);
    assert_eq!(column(&output, "course_code"), vec![Cell::text("CS101"), Cell::text("SEC-200")]);

    let cs101 = &output.table.rows[0];
    let value = |key: &str| cs101[output.table.column_index(key).unwrap()].clone();
    assert_eq!(value("enrolled"), Cell::Integer(2));
    assert_eq!(value("completed"), Cell::Integer(1));
    assert_eq!(value("completion_rate"), Cell::Number(50.0));
    assert_eq!(value("average_progress"), Cell::Number(75.0));
    assert_eq!(value("average_score"), Cell::Number(75.0));

    assert_eq!(output.table.rows[1][output.table.column_index("average_score").unwrap()], Cell::Empty);
}

#[test]
fn test_learner_activity_rows() {
    let output = run(ReportKind::LearnerActivity, &ReportFilter::default(), &ReportScope::All);
    assert_eq!(
        column(&output, "learner"),
        vec![Cell::text("Ada Lovelace"), Cell::text("Alan Turing"), Cell::text("Grace Hopper")]
    );
    assert_eq!(column(&output, "courses")[0], Cell::Integer(2));
    assert_eq!(column(&output, "average_progress")[0], Cell::Number(25.0));
    assert_eq!(column(&output, "last_activity")[1], Cell::Empty);
}

#[test]
fn test_charts() {
    let charts = run(ReportKind::Enrollments, &ReportFilter::default(), &ReportScope::All).charts;
    assert_eq!(charts.status_distribution.values, vec![2.0, 1.0, 1.0]);
    assert_eq!(charts.completions_by_month.labels, vec!["2025-02".to_string()]);
    assert_eq!(charts.completions_by_month.values, vec![1.0]);
    assert_eq!(charts.progress_distribution.values, vec![2.0, 0.0, 1.0, 0.0, 1.0]);
    assert_eq!(charts.course_completion_rate.labels, vec!["CS101".to_string(), "SEC-200".to_string()]);
    assert_eq!(charts.course_completion_rate.values, vec![50.0, 0.0]);
}

#[test]
fn test_instructor_scope_limits_to_own_courses() {
    let output = run(ReportKind::CourseSummary, &ReportFilter::default(), &ReportScope::Instructor("ian".to_string()));
    assert_eq!(column(&output, "course_code"), vec![Cell::text("CS101")]);
    assert_eq!(output.summary.courses, 1);
    assert_eq!(output.summary.total_enrollments, 2);
}

#[test]
fn test_learner_scope() {
    let scope = ReportScope::Learner("ada".to_string());
    let output = run(ReportKind::Enrollments, &ReportFilter::default(), &scope);
    assert_eq!(output.table.rows.len(), 2);
    assert_eq!(output.summary.learners, 1);

    let dataset = ReportDataset::from_snapshot(snapshot());
    let result = build_report(&dataset, ReportKind::CourseSummary, &ReportFilter::default(), &scope, today());
    assert!(matches!(result, Err(CoreError::Forbidden { .. })));
}

#[test]
fn test_inverted_date_range_is_rejected() {
    let mut params = HashMap::new();
    params.insert("from".to_string(), "2025-03-01".to_string());
    params.insert("to".to_string(), "2025-01-01".to_string());
    assert!(ReportFilter::from_params(&params).is_err());
}

#[tokio::test]
async fn test_service_runs_and_exports_from_store() {
    let store = Arc::new(MemoryStore::from_snapshot(snapshot()));
    let service = ReportService::new(store.clone(), store.clone(), store.clone(), store);

    let filter = ReportFilter {
        per_page: Some(2),
        ..ReportFilter::default()
    };
    let report = service.run(ReportKind::Enrollments, &filter, &ReportScope::All).await.unwrap();
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.pagination.total_rows, 4);

    let file = service.export(ReportKind::Enrollments, &filter, &ReportScope::All, ExportFormat::Csv).await.unwrap();
    let text = String::from_utf8(file.bytes).unwrap();
    // Exports ignore pagination: header plus every row
    assert_eq!(text.lines().count(), 5);
}
