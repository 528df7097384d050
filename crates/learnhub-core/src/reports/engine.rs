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

//! Aggregation of enrollment and progress data into report tables
//!
//! The pipeline is: dataset -> filtered enrollment facts -> report table
//! (one of three shapes) -> sort. Summary statistics and chart series are
//! always computed from the full filtered fact set, never from a page.

use super::filter::{ReportFilter, ReportKind, SortDirection};
use super::table::{Cell, Column, ReportTable};
use crate::error::{CoreError, CoreResult};
use crate::models::{Course, CourseModule, Enrollment, EnrollmentStatus, ModuleKind, ModuleProgress, User};
use crate::progress::{completion_stats, round1};
use crate::store::Snapshot;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Whose data a caller may see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportScope {
    All,
    /// Only courses taught by this instructor
    Instructor(String),
    /// Only this learner's own enrollments
    Learner(String),
}

/// Indexed copy of everything a report reads
#[derive(Debug, Clone, Default)]
pub struct ReportDataset {
    pub users: HashMap<String, User>,
    pub courses: HashMap<String, Course>,
    pub modules_by_course: HashMap<String, Vec<CourseModule>>,
    pub enrollments: Vec<Enrollment>,
    /// Keyed by (user id, course id)
    pub progress: HashMap<(String, String), Vec<ModuleProgress>>,
}

impl ReportDataset {
    pub fn new(users: Vec<User>, courses: Vec<Course>, modules: Vec<CourseModule>, mut enrollments: Vec<Enrollment>, progress: Vec<ModuleProgress>) -> Self {
        let mut modules_by_course: HashMap<String, Vec<CourseModule>> = HashMap::new();
        for module in modules {
            modules_by_course.entry(module.course_id.clone()).or_default().push(module);
        }
        for list in modules_by_course.values_mut() {
            list.sort_by_key(|m| m.position);
        }

        let mut progress_map: HashMap<(String, String), Vec<ModuleProgress>> = HashMap::new();
        for record in progress {
            progress_map.entry((record.user_id.clone(), record.course_id.clone())).or_default().push(record);
        }

        enrollments.sort_by(|a, b| a.enrolled_at.cmp(&b.enrolled_at).then_with(|| a.id.cmp(&b.id)));

        Self {
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
            courses: courses.into_iter().map(|c| (c.id.clone(), c)).collect(),
            modules_by_course,
            enrollments,
            progress: progress_map,
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::new(snapshot.users, snapshot.courses, snapshot.modules, snapshot.enrollments, snapshot.progress)
    }
}

/// One enrollment joined with its learner, course and progress
#[derive(Debug, Clone)]
pub struct EnrollmentFact<'a> {
    pub enrollment: &'a Enrollment,
    pub user: &'a User,
    pub course: &'a Course,
    pub percent: f64,
    pub modules_completed: usize,
    pub modules_counted: usize,
    pub time_spent_secs: u64,
    /// Mean of best quiz scores, if any quiz was attempted
    pub average_score: Option<f64>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl EnrollmentFact<'_> {
    fn is_overdue(&self, today: NaiveDate) -> bool {
        self.enrollment.status == EnrollmentStatus::Active && self.enrollment.due_date.is_some_and(|due| due < today)
    }
}

/// Aggregate statistics over the filtered rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_enrollments: usize,
    pub active: usize,
    pub completed: usize,
    pub dropped: usize,
    pub overdue: usize,
    pub learners: usize,
    pub courses: usize,
    /// Completed enrollments as a percentage of all enrollments
    pub completion_rate: f64,
    pub average_progress: f64,
    pub average_score: Option<f64>,
    pub total_time_secs: u64,
}

impl ReportSummary {
    /// Label/value pairs in display order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total enrollments", self.total_enrollments.to_string()),
            ("Active", self.active.to_string()),
            ("Completed", self.completed.to_string()),
            ("Dropped", self.dropped.to_string()),
            ("Overdue", self.overdue.to_string()),
            ("Learners", self.learners.to_string()),
            ("Courses", self.courses.to_string()),
            ("Completion rate (%)", format!("{:.1}", self.completion_rate)),
            ("Average progress (%)", format!("{:.1}", self.average_progress)),
            ("Average score", self.average_score.map_or_else(|| "-".to_string(), |s| format!("{:.1}", s))),
            ("Total time (hours)", format!("{:.1}", self.total_time_secs as f64 / 3600.0)),
        ]
    }
}

/// Label/value series ready for a chart widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportCharts {
    pub status_distribution: ChartSeries,
    pub completions_by_month: ChartSeries,
    pub progress_distribution: ChartSeries,
    pub course_completion_rate: ChartSeries,
}

/// Full, unpaginated result of running a report
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub kind: ReportKind,
    pub table: ReportTable,
    pub summary: ReportSummary,
    pub charts: ReportCharts,
}

/// Run a report over a dataset
pub fn build_report(dataset: &ReportDataset, kind: ReportKind, filter: &ReportFilter, scope: &ReportScope, today: NaiveDate) -> CoreResult<ReportOutput> {
    if let ReportScope::Learner(_) = scope {
        if kind != ReportKind::Enrollments {
            return Err(CoreError::Forbidden {
                message: format!("The {} report is not available to learners", kind),
            });
        }
    }
    filter.validate()?;

    let facts = collect_facts(dataset, filter, scope);
    let mut table = match kind {
        ReportKind::Enrollments => enrollment_table(&facts, today),
        ReportKind::CourseSummary => course_table(&facts),
        ReportKind::LearnerActivity => learner_table(&facts),
    };

    let (sort_key, default_direction) = default_sort(kind);
    let sort_key = filter.sort.as_deref().unwrap_or(sort_key);
    let index = table
        .column_index(sort_key)
        .ok_or_else(|| CoreError::validation(format!("Cannot sort {} by '{}'", kind, sort_key)))?;
    let direction = if filter.sort.is_some() { filter.direction } else { default_direction };
    table.sort_by_column(index, direction == SortDirection::Desc);

    Ok(ReportOutput {
        kind,
        summary: summarize(&facts, today),
        charts: charts(&facts),
        table,
    })
}

fn default_sort(kind: ReportKind) -> (&'static str, SortDirection) {
    match kind {
        ReportKind::Enrollments => ("enrolled_at", SortDirection::Asc),
        ReportKind::CourseSummary => ("course_code", SortDirection::Asc),
        ReportKind::LearnerActivity => ("learner", SortDirection::Asc),
    }
}

/// Join and filter enrollments. Enrollments pointing at missing users or
/// courses are skipped.
pub fn collect_facts<'a>(dataset: &'a ReportDataset, filter: &ReportFilter, scope: &ReportScope) -> Vec<EnrollmentFact<'a>> {
    let needle = filter.search.as_ref().map(|s| s.to_lowercase());
    let no_modules: Vec<CourseModule> = Vec::new();

    dataset
        .enrollments
        .iter()
        .filter_map(|enrollment| {
            let user = dataset.users.get(&enrollment.user_id)?;
            let course = dataset.courses.get(&enrollment.course_id)?;

            let in_scope = match scope {
                ReportScope::All => true,
                ReportScope::Instructor(id) => &course.instructor_id == id,
                ReportScope::Learner(id) => &enrollment.user_id == id,
            };
            let enrolled_on = enrollment.enrolled_at.date_naive();
            let keep = in_scope
                && filter.course_id.as_ref().is_none_or(|id| &course.id == id)
                && filter.user_id.as_ref().is_none_or(|id| &user.id == id)
                && filter.instructor_id.as_ref().is_none_or(|id| &course.instructor_id == id)
                && filter.category.as_ref().is_none_or(|c| course.category.eq_ignore_ascii_case(c))
                && filter.status.is_none_or(|s| enrollment.status == s)
                && filter
                    .department
                    .as_ref()
                    .is_none_or(|d| user.department.as_ref().is_some_and(|ud| ud.eq_ignore_ascii_case(d)))
                && filter.enrolled_from.is_none_or(|from| enrolled_on >= from)
                && filter.enrolled_to.is_none_or(|to| enrolled_on <= to)
                && needle.as_ref().is_none_or(|n| {
                    [&user.full_name, &user.email, &course.code, &course.title]
                        .iter()
                        .any(|field| field.to_lowercase().contains(n.as_str()))
                });
            if !keep {
                return None;
            }

            let records: &[ModuleProgress] = dataset
                .progress
                .get(&(enrollment.user_id.clone(), enrollment.course_id.clone()))
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let modules = dataset.modules_by_course.get(&course.id).unwrap_or(&no_modules);
            let by_module: HashMap<String, ModuleProgress> = records.iter().map(|r| (r.module_id.clone(), r.clone())).collect();
            let (modules_completed, modules_counted, percent) = completion_stats(modules, &by_module);

            let quiz_ids: HashSet<&str> = modules.iter().filter(|m| m.kind == ModuleKind::Quiz).map(|m| m.id.as_str()).collect();
            let scores: Vec<f64> = records
                .iter()
                .filter(|r| quiz_ids.contains(r.module_id.as_str()))
                .filter_map(|r| r.best_score)
                .collect();

            Some(EnrollmentFact {
                enrollment,
                user,
                course,
                // Completed enrollments stay at 100 even if modules were added later
                percent: if enrollment.status == EnrollmentStatus::Completed { 100.0 } else { percent },
                modules_completed,
                modules_counted,
                time_spent_secs: records.iter().map(|r| r.time_spent_secs).sum(),
                average_score: mean(&scores).map(round1),
                last_activity_at: records.iter().filter_map(|r| r.last_activity_at).max(),
            })
        })
        .collect()
}

fn enrollment_table(facts: &[EnrollmentFact<'_>], today: NaiveDate) -> ReportTable {
    let columns = vec![
        Column::new("learner", "Learner", 18),
        Column::new("email", "Email", 22),
        Column::new("department", "Department", 12),
        Column::new("course_code", "Course", 10),
        Column::new("course_title", "Title", 22),
        Column::new("status", "Status", 10),
        Column::new("progress", "Progress %", 9),
        Column::new("modules", "Modules", 8),
        Column::new("score", "Avg Score", 8),
        Column::new("time_minutes", "Time (min)", 8),
        Column::new("enrolled_at", "Enrolled", 10),
        Column::new("due_date", "Due", 10),
        Column::new("completed_at", "Completed", 10),
        Column::new("overdue", "Overdue", 7),
    ];

    let rows = facts
        .iter()
        .map(|f| {
            vec![
                Cell::text(&f.user.full_name),
                Cell::text(&f.user.email),
                Cell::opt_text(f.user.department.clone()),
                Cell::text(&f.course.code),
                Cell::text(&f.course.title),
                Cell::text(f.enrollment.status.as_str()),
                Cell::Number(f.percent),
                Cell::text(format!("{}/{}", f.modules_completed, f.modules_counted)),
                Cell::opt_number(f.average_score),
                Cell::Integer((f.time_spent_secs / 60) as i64),
                Cell::text(f.enrollment.enrolled_at.format("%Y-%m-%d").to_string()),
                Cell::opt_text(f.enrollment.due_date.map(|d| d.format("%Y-%m-%d").to_string())),
                Cell::opt_text(f.enrollment.completed_at.map(|d| d.format("%Y-%m-%d").to_string())),
                Cell::text(if f.is_overdue(today) { "yes" } else { "no" }),
            ]
        })
        .collect();

    ReportTable {
        title: ReportKind::Enrollments.title().to_string(),
        columns,
        rows,
    }
}

fn course_table(facts: &[EnrollmentFact<'_>]) -> ReportTable {
    let columns = vec![
        Column::new("course_code", "Course", 10),
        Column::new("course_title", "Title", 26),
        Column::new("category", "Category", 12),
        Column::new("enrolled", "Enrolled", 8),
        Column::new("active", "Active", 7),
        Column::new("completed", "Completed", 8),
        Column::new("dropped", "Dropped", 7),
        Column::new("completion_rate", "Completion %", 9),
        Column::new("average_progress", "Avg Progress %", 9),
        Column::new("average_score", "Avg Score", 8),
        Column::new("time_hours", "Time (h)", 8),
    ];

    let mut groups: BTreeMap<&str, Vec<&EnrollmentFact<'_>>> = BTreeMap::new();
    for fact in facts {
        groups.entry(fact.course.id.as_str()).or_default().push(fact);
    }

    let rows = groups
        .values()
        .map(|group| {
            let course = group[0].course;
            let (active, completed, dropped) = status_counts(group.iter().copied());
            let scores: Vec<f64> = group.iter().filter_map(|f| f.average_score).collect();
            let time: u64 = group.iter().map(|f| f.time_spent_secs).sum();
            vec![
                Cell::text(&course.code),
                Cell::text(&course.title),
                Cell::text(&course.category),
                Cell::Integer(group.len() as i64),
                Cell::Integer(active as i64),
                Cell::Integer(completed as i64),
                Cell::Integer(dropped as i64),
                Cell::Number(percentage(completed, group.len())),
                Cell::Number(round1(mean(&group.iter().map(|f| f.percent).collect::<Vec<_>>()).unwrap_or(0.0))),
                Cell::opt_number(mean(&scores).map(round1)),
                Cell::Number(round1(time as f64 / 3600.0)),
            ]
        })
        .collect();

    ReportTable {
        title: ReportKind::CourseSummary.title().to_string(),
        columns,
        rows,
    }
}

fn learner_table(facts: &[EnrollmentFact<'_>]) -> ReportTable {
    let columns = vec![
        Column::new("learner", "Learner", 18),
        Column::new("email", "Email", 24),
        Column::new("department", "Department", 12),
        Column::new("courses", "Courses", 7),
        Column::new("active", "Active", 7),
        Column::new("completed", "Completed", 8),
        Column::new("average_progress", "Avg Progress %", 9),
        Column::new("average_score", "Avg Score", 8),
        Column::new("time_hours", "Time (h)", 8),
        Column::new("last_activity", "Last Activity", 12),
    ];

    let mut groups: BTreeMap<&str, Vec<&EnrollmentFact<'_>>> = BTreeMap::new();
    for fact in facts {
        groups.entry(fact.user.id.as_str()).or_default().push(fact);
    }

    let rows = groups
        .values()
        .map(|group| {
            let user = group[0].user;
            let (active, completed, _) = status_counts(group.iter().copied());
            let scores: Vec<f64> = group.iter().filter_map(|f| f.average_score).collect();
            let time: u64 = group.iter().map(|f| f.time_spent_secs).sum();
            let last = group.iter().filter_map(|f| f.last_activity_at).max();
            vec![
                Cell::text(&user.full_name),
                Cell::text(&user.email),
                Cell::opt_text(user.department.clone()),
                Cell::Integer(group.len() as i64),
                Cell::Integer(active as i64),
                Cell::Integer(completed as i64),
                Cell::Number(round1(mean(&group.iter().map(|f| f.percent).collect::<Vec<_>>()).unwrap_or(0.0))),
                Cell::opt_number(mean(&scores).map(round1)),
                Cell::Number(round1(time as f64 / 3600.0)),
                Cell::opt_text(last.map(|d| d.format("%Y-%m-%d %H:%M").to_string())),
            ]
        })
        .collect();

    ReportTable {
        title: ReportKind::LearnerActivity.title().to_string(),
        columns,
        rows,
    }
}

pub fn summarize(facts: &[EnrollmentFact<'_>], today: NaiveDate) -> ReportSummary {
    let (active, completed, dropped) = status_counts(facts.iter());
    let scores: Vec<f64> = facts.iter().filter_map(|f| f.average_score).collect();

    ReportSummary {
        total_enrollments: facts.len(),
        active,
        completed,
        dropped,
        overdue: facts.iter().filter(|f| f.is_overdue(today)).count(),
        learners: facts.iter().map(|f| f.user.id.as_str()).collect::<HashSet<_>>().len(),
        courses: facts.iter().map(|f| f.course.id.as_str()).collect::<HashSet<_>>().len(),
        completion_rate: percentage(completed, facts.len()),
        average_progress: round1(mean(&facts.iter().map(|f| f.percent).collect::<Vec<_>>()).unwrap_or(0.0)),
        average_score: mean(&scores).map(round1),
        total_time_secs: facts.iter().map(|f| f.time_spent_secs).sum(),
    }
}

pub fn charts(facts: &[EnrollmentFact<'_>]) -> ReportCharts {
    let (active, completed, dropped) = status_counts(facts.iter());
    let status_distribution = ChartSeries {
        name: "Enrollment status".to_string(),
        labels: vec!["Active".to_string(), "Completed".to_string(), "Dropped".to_string()],
        values: vec![active as f64, completed as f64, dropped as f64],
    };

    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
    for completed_at in facts.iter().filter_map(|f| f.enrollment.completed_at) {
        *by_month.entry(completed_at.format("%Y-%m").to_string()).or_default() += 1.0;
    }
    let completions_by_month = ChartSeries {
        name: "Completions per month".to_string(),
        labels: by_month.keys().cloned().collect(),
        values: by_month.values().copied().collect(),
    };

    let mut buckets = [0.0; 5];
    for fact in facts {
        let index = match fact.percent {
            p if p >= 100.0 => 4,
            p if p >= 75.0 => 3,
            p if p >= 50.0 => 2,
            p if p >= 25.0 => 1,
            _ => 0,
        };
        buckets[index] += 1.0;
    }
    let progress_distribution = ChartSeries {
        name: "Progress distribution".to_string(),
        labels: ["0-24%", "25-49%", "50-74%", "75-99%", "100%"].iter().map(|s| s.to_string()).collect(),
        values: buckets.to_vec(),
    };

    let mut per_course: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for fact in facts {
        let entry = per_course.entry(fact.course.code.as_str()).or_default();
        entry.0 += 1;
        if fact.enrollment.status == EnrollmentStatus::Completed {
            entry.1 += 1;
        }
    }
    let course_completion_rate = ChartSeries {
        name: "Completion rate by course".to_string(),
        labels: per_course.keys().map(|k| k.to_string()).collect(),
        values: per_course.values().map(|(total, done)| percentage(*done, *total)).collect(),
    };

    ReportCharts {
        status_distribution,
        completions_by_month,
        progress_distribution,
        course_completion_rate,
    }
}

fn status_counts<'f, 'a: 'f>(facts: impl Iterator<Item = &'f EnrollmentFact<'a>>) -> (usize, usize, usize) {
    facts.fold((0, 0, 0), |(active, completed, dropped), fact| match fact.enrollment.status {
        EnrollmentStatus::Active => (active + 1, completed, dropped),
        EnrollmentStatus::Completed => (active, completed + 1, dropped),
        EnrollmentStatus::Dropped => (active, completed, dropped + 1),
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { round1(part as f64 * 100.0 / whole as f64) }
}
