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

//! Module progress and course completion tracking

use crate::error::{CoreError, CoreResult};
use crate::models::{CourseModule, CourseProgress, Enrollment, EnrollmentStatus, ModuleKind, ModuleProgress, ModuleProgressView, ProgressStatus};
use crate::store::{CourseStore, EnrollmentStore, ProgressStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::ToSchema;

/// Upper bound on time credited by a single heartbeat
pub const MAX_HEARTBEAT_SECS: u64 = 300;

/// Outcome of a completion attempt
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModuleCompletion {
    pub progress: ModuleProgress,
    /// False when a quiz score was below the passing score
    pub passed: bool,
    pub course: CourseProgress,
}

pub struct ProgressService {
    courses: Arc<dyn CourseStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    progress: Arc<dyn ProgressStore>,
}

impl ProgressService {
    pub fn new(courses: Arc<dyn CourseStore>, enrollments: Arc<dyn EnrollmentStore>, progress: Arc<dyn ProgressStore>) -> Self {
        Self { courses, enrollments, progress }
    }

    /// Open a module. Prerequisite modules must be completed first.
    pub async fn start_module(&self, user_id: &str, module_id: &str) -> CoreResult<ModuleProgress> {
        let module = self.module(module_id).await?;
        self.open_enrollment(user_id, &module.course_id).await?;
        self.start(user_id, &module).await
    }

    /// Credit time on task for an open module
    pub async fn heartbeat(&self, user_id: &str, module_id: &str, seconds: u64) -> CoreResult<ModuleProgress> {
        let module = self.module(module_id).await?;
        self.open_enrollment(user_id, &module.course_id).await?;

        let mut progress = self.start(user_id, &module).await?;
        progress.time_spent_secs += seconds.min(MAX_HEARTBEAT_SECS);
        progress.last_activity_at = Some(Utc::now());
        debug!("Heartbeat {}s for {} on module {}", seconds, user_id, module_id);
        self.progress.upsert_progress(progress).await
    }

    /// Mark a module complete. Quiz modules need a passing `score`.
    pub async fn complete_module(&self, user_id: &str, module_id: &str, score: Option<f64>) -> CoreResult<ModuleCompletion> {
        let module = self.module(module_id).await?;
        let enrollment = self.open_enrollment(user_id, &module.course_id).await?;
        let mut progress = self.start(user_id, &module).await?;
        let now = Utc::now();

        let passed = match module.kind {
            ModuleKind::Quiz => {
                let score = score.ok_or_else(|| CoreError::validation("A score is required to complete a quiz"))?;
                if !(0.0..=100.0).contains(&score) {
                    return Err(CoreError::validation(format!("Score must be between 0 and 100, got {}", score)));
                }
                progress.attempts += 1;
                progress.best_score = Some(progress.best_score.map_or(score, |best| best.max(score)));
                score >= module.passing_score.unwrap_or(0.0)
            }
            _ => true,
        };

        if passed && !progress.is_completed() {
            progress.status = ProgressStatus::Completed;
            progress.completed_at = Some(now);
            info!("{} completed module {}", user_id, module.title);
        }
        progress.last_activity_at = Some(now);
        let progress = self.progress.upsert_progress(progress).await?;

        let course = self.refresh_enrollment(enrollment).await?;
        Ok(ModuleCompletion { progress, passed, course })
    }

    /// A learner's outline for a course with per-module status
    pub async fn course_progress(&self, user_id: &str, course_id: &str) -> CoreResult<CourseProgress> {
        let enrollment = self
            .enrollments
            .find_enrollment(user_id, course_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Enrollment", format!("{}/{}", user_id, course_id)))?;
        self.build_course_progress(&enrollment).await
    }

    async fn module(&self, module_id: &str) -> CoreResult<CourseModule> {
        self.courses.get_module(module_id).await?.ok_or_else(|| CoreError::not_found("Module", module_id))
    }

    async fn open_enrollment(&self, user_id: &str, course_id: &str) -> CoreResult<Enrollment> {
        match self.enrollments.find_enrollment(user_id, course_id).await? {
            Some(enrollment) if enrollment.is_held() => Ok(enrollment),
            _ => Err(CoreError::Forbidden {
                message: "Not enrolled in this course".to_string(),
            }),
        }
    }

    async fn start(&self, user_id: &str, module: &CourseModule) -> CoreResult<ModuleProgress> {
        let existing = self.progress.get_progress(user_id, &module.id).await?;
        if let Some(progress) = existing {
            if progress.status != ProgressStatus::NotStarted {
                return Ok(progress);
            }
        }

        let mut missing = Vec::new();
        for prerequisite_id in &module.prerequisite_module_ids {
            let done = self.progress.get_progress(user_id, prerequisite_id).await?.is_some_and(|p| p.is_completed());
            if !done {
                let label = match self.courses.get_module(prerequisite_id).await? {
                    Some(prerequisite) => prerequisite.title,
                    None => prerequisite_id.clone(),
                };
                missing.push(label);
            }
        }
        if !missing.is_empty() {
            return Err(CoreError::PrerequisitesNotMet { missing });
        }

        let now = Utc::now();
        let mut progress = ModuleProgress::new(user_id.to_string(), module.course_id.clone(), module.id.clone());
        progress.status = ProgressStatus::InProgress;
        progress.started_at = Some(now);
        progress.last_activity_at = Some(now);
        self.progress.upsert_progress(progress).await
    }

    /// Recompute the cached percentage and close the enrollment at 100%
    async fn refresh_enrollment(&self, mut enrollment: Enrollment) -> CoreResult<CourseProgress> {
        let mut course = self.build_course_progress(&enrollment).await?;

        enrollment.progress_percent = course.percent;
        if course.percent >= 100.0 && enrollment.status == EnrollmentStatus::Active {
            enrollment.status = EnrollmentStatus::Completed;
            enrollment.completed_at = Some(Utc::now());
            info!("{} completed course {}", enrollment.user_id, enrollment.course_id);
            metrics::increment_counter!("learnhub_course_completions_total");
        }
        let enrollment = self.enrollments.update_enrollment(enrollment).await?;
        course.enrollment_status = enrollment.status;
        Ok(course)
    }

    async fn build_course_progress(&self, enrollment: &Enrollment) -> CoreResult<CourseProgress> {
        let modules = self.courses.list_modules(&enrollment.course_id).await?;
        let records: HashMap<String, ModuleProgress> = self
            .progress
            .list_course_progress(&enrollment.user_id, &enrollment.course_id)
            .await?
            .into_iter()
            .map(|p| (p.module_id.clone(), p))
            .collect();

        let (completed_modules, counted_modules, mut percent) = completion_stats(&modules, &records);
        // Completion is permanent even if required modules are added later
        if enrollment.status == EnrollmentStatus::Completed {
            percent = 100.0;
        }
        let views = modules
            .iter()
            .map(|module| {
                let record = records.get(&module.id);
                let locked = module
                    .prerequisite_module_ids
                    .iter()
                    .any(|id| !records.get(id).is_some_and(ModuleProgress::is_completed));
                ModuleProgressView {
                    module_id: module.id.clone(),
                    title: module.title.clone(),
                    kind: module.kind,
                    position: module.position,
                    required: module.required,
                    status: record.map_or(ProgressStatus::NotStarted, |r| r.status),
                    best_score: record.and_then(|r| r.best_score),
                    time_spent_secs: record.map_or(0, |r| r.time_spent_secs),
                    locked,
                }
            })
            .collect();

        Ok(CourseProgress {
            course_id: enrollment.course_id.clone(),
            user_id: enrollment.user_id.clone(),
            enrollment_status: enrollment.status,
            percent,
            completed_modules,
            counted_modules,
            time_spent_secs: records.values().map(|r| r.time_spent_secs).sum(),
            modules: views,
        })
    }
}

/// Count completed modules among those that count towards completion.
///
/// Required modules count; when a course marks none as required, every
/// module counts. Returns `(completed, counted, percent)` with the
/// percentage rounded to one decimal.
pub fn completion_stats(modules: &[CourseModule], records: &HashMap<String, ModuleProgress>) -> (usize, usize, f64) {
    let any_required = modules.iter().any(|m| m.required);
    let counted: Vec<&CourseModule> = modules.iter().filter(|m| m.required || !any_required).collect();
    if counted.is_empty() {
        return (0, 0, 0.0);
    }

    let completed = counted.iter().filter(|m| records.get(&m.id).is_some_and(ModuleProgress::is_completed)).count();
    let percent = round1(completed as f64 * 100.0 / counted.len() as f64);
    (completed, counted.len(), percent)
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
