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
use crate::reports::{Cell, ChartSeries, Column, Pagination, ReportCharts, ReportFilter, ReportKind, ReportSummary};
use chrono::{TimeZone, Utc};

fn series(name: &str, labels: &[&str], values: &[f64]) -> ChartSeries {
    ChartSeries {
        name: name.to_string(),
        labels: labels.iter().map(|s| s.to_string()).collect(),
        values: values.to_vec(),
    }
}

pub(super) fn sample_report() -> Report {
    let rows = vec![
        vec![Cell::text("Lovelace, Ada"), Cell::text("CS101"), Cell::Number(50.0), Cell::Number(88.5)],
        vec![Cell::text("Grace Hopper"), Cell::text("CS102"), Cell::Number(100.0), Cell::Empty],
        vec![Cell::text("Alan Turing"), Cell::text("CS101"), Cell::Number(0.0), Cell::Integer(70)],
    ];
    Report {
        kind: ReportKind::Enrollments,
        title: "Enrollment Progress".to_string(),
        generated_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
        filter: ReportFilter::default(),
        columns: vec![
            Column::new("learner", "Learner", 18),
            Column::new("course_code", "Course", 10),
            Column::new("progress", "Progress %", 9),
            Column::new("score", "Avg Score", 8),
        ],
        pagination: Pagination::single(rows.len()),
        rows,
        summary: ReportSummary {
            total_enrollments: 3,
            active: 2,
            completed: 1,
            learners: 3,
            courses: 2,
            completion_rate: 33.3,
            average_progress: 50.0,
            average_score: Some(79.3),
            total_time_secs: 5400,
            ..ReportSummary::default()
        },
        charts: ReportCharts {
            status_distribution: series("Enrollment status", &["Active", "Completed", "Dropped"], &[2.0, 1.0, 0.0]),
            completions_by_month: series("Completions per month", &["2025-03"], &[1.0]),
            progress_distribution: series("Progress distribution", &["0-24%", "25-49%", "50-74%", "75-99%", "100%"], &[1.0, 0.0, 1.0, 0.0, 1.0]),
            course_completion_rate: series("Completion rate by course", &["CS101", "CS102"], &[0.0, 100.0]),
        },
    }
}

#[test]
fn test_format_parsing() {
    assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
    assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
    assert!("docx".parse::<ExportFormat>().is_err());
}

#[test]
fn test_file_metadata() {
    let report = sample_report();
    for format in [ExportFormat::Json, ExportFormat::Csv, ExportFormat::Xlsx, ExportFormat::Pdf] {
        let file = render(&report, format).unwrap();
        assert_eq!(file.file_name, format!("enrollments_20250314_093000.{}", format.extension()));
        assert_eq!(file.content_type, format.content_type());
        assert!(!file.bytes.is_empty());
    }
}

#[test]
fn test_csv_and_json_carry_the_same_table() {
    let report = sample_report();

    let json: serde_json::Value = serde_json::from_slice(&render(&report, ExportFormat::Json).unwrap().bytes).unwrap();
    let json_rows = json["rows"].as_array().unwrap();
    assert_eq!(json_rows.len(), 3);
    assert_eq!(json["summary"]["total_enrollments"], 3);

    let csv_bytes = render(&report, ExportFormat::Csv).unwrap().bytes;
    let mut reader = csv::Reader::from_reader(csv_bytes.as_slice());
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, vec!["Learner", "Course", "Progress %", "Avg Score"]);

    let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), json_rows.len());
    for (record, row) in records.iter().zip(&report.rows) {
        let expected: Vec<String> = row.iter().map(Cell::to_string).collect();
        assert_eq!(record.iter().collect::<Vec<_>>(), expected);
    }
}

#[test]
fn test_pdf_contains_every_row_and_summary() {
    let report = sample_report();
    let bytes = render(&report, ExportFormat::Pdf).unwrap().bytes;
    let text = String::from_utf8_lossy(&bytes);
    for name in ["(Lovelace, Ada) Tj", "(Grace Hopper) Tj", "(Alan Turing) Tj", "(Total enrollments:) Tj"] {
        assert!(text.contains(name), "missing {}", name);
    }
}

#[test]
fn test_write_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let file = render(&sample_report(), ExportFormat::Csv).unwrap();
    let path = file.write_to(dir.path()).unwrap();
    assert_eq!(std::fs::read(path).unwrap(), file.bytes);
}
