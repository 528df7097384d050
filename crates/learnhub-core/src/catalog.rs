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

//! Course catalog management

use crate::error::{CoreError, CoreResult};
use crate::graph::find_cycle;
use crate::models::{Course, CourseModule, CourseQuery, CourseStatus, CourseUpdate, ModuleKind, ModuleUpdate, NewCourse, NewModule, UserRole, new_id};
use crate::store::{CourseStore, EnrollmentStore, UserStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

/// Passing score applied to quizzes created without one
pub const DEFAULT_PASSING_SCORE: f64 = 70.0;

/// A course together with its ordered modules
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseDetail {
    pub course: Course,
    pub modules: Vec<CourseModule>,
}

/// Course and module management service
pub struct CatalogService {
    courses: Arc<dyn CourseStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    users: Arc<dyn UserStore>,
}

impl CatalogService {
    pub fn new(courses: Arc<dyn CourseStore>, enrollments: Arc<dyn EnrollmentStore>, users: Arc<dyn UserStore>) -> Self {
        Self { courses, enrollments, users }
    }

    /// Create a draft course. `actor_id` becomes the instructor when none is given.
    pub async fn create_course(&self, actor_id: &str, request: NewCourse) -> CoreResult<Course> {
        let code = required_text("code", &request.code)?;
        let title = required_text("title", &request.title)?;
        let category = required_text("category", &request.category)?;

        let instructor_id = request.instructor_id.unwrap_or_else(|| actor_id.to_string());
        self.ensure_instructor(&instructor_id).await?;

        let prerequisites = dedup(request.prerequisite_course_ids);
        for prerequisite in &prerequisites {
            if self.courses.get_course(prerequisite).await?.is_none() {
                return Err(CoreError::validation(format!("Unknown prerequisite course: {}", prerequisite)));
            }
        }

        let now = Utc::now();
        let course = Course {
            id: new_id(),
            code,
            title,
            description: request.description.trim().to_string(),
            category,
            instructor_id,
            status: CourseStatus::Draft,
            prerequisite_course_ids: prerequisites,
            created_at: now,
            updated_at: now,
        };

        let course = self.courses.insert_course(course).await?;
        info!("Created course {} ({})", course.code, course.id);
        Ok(course)
    }

    pub async fn get_course(&self, course_id: &str) -> CoreResult<Course> {
        self.courses.get_course(course_id).await?.ok_or_else(|| CoreError::not_found("Course", course_id))
    }

    pub async fn get_course_detail(&self, course_id: &str) -> CoreResult<CourseDetail> {
        let course = self.get_course(course_id).await?;
        let modules = self.courses.list_modules(course_id).await?;
        Ok(CourseDetail { course, modules })
    }

    /// List courses matching the query, ordered by code
    pub async fn list_courses(&self, query: &CourseQuery) -> CoreResult<Vec<Course>> {
        let needle = query.search.as_ref().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());

        let courses = self.courses.list_courses().await?;
        Ok(courses
            .into_iter()
            .filter(|c| query.status.is_none_or(|s| c.status == s))
            .filter(|c| query.category.as_ref().is_none_or(|cat| c.category.eq_ignore_ascii_case(cat)))
            .filter(|c| query.instructor_id.as_ref().is_none_or(|id| &c.instructor_id == id))
            .filter(|c| {
                needle
                    .as_ref()
                    .is_none_or(|n| c.title.to_lowercase().contains(n) || c.code.to_lowercase().contains(n) || c.description.to_lowercase().contains(n))
            })
            .collect())
    }

    pub async fn update_course(&self, course_id: &str, update: CourseUpdate) -> CoreResult<Course> {
        let mut course = self.get_course(course_id).await?;

        if let Some(title) = update.title {
            course.title = required_text("title", &title)?;
        }
        if let Some(description) = update.description {
            course.description = description.trim().to_string();
        }
        if let Some(category) = update.category {
            course.category = required_text("category", &category)?;
        }
        if let Some(instructor_id) = update.instructor_id {
            self.ensure_instructor(&instructor_id).await?;
            course.instructor_id = instructor_id;
        }
        if let Some(prerequisites) = update.prerequisite_course_ids {
            let prerequisites = dedup(prerequisites);
            self.validate_course_prerequisites(course_id, &prerequisites).await?;
            course.prerequisite_course_ids = prerequisites;
        }

        course.updated_at = Utc::now();
        self.courses.update_course(course).await
    }

    /// Delete a course that nobody has enrolled in
    pub async fn delete_course(&self, course_id: &str) -> CoreResult<()> {
        self.get_course(course_id).await?;

        let enrolled = self.enrollments.list_enrollments().await?.iter().any(|e| e.course_id == course_id);
        if enrolled {
            return Err(CoreError::conflict("Course has enrollments; archive it instead"));
        }

        let dependents: Vec<String> = self
            .courses
            .list_courses()
            .await?
            .into_iter()
            .filter(|c| c.prerequisite_course_ids.iter().any(|p| p == course_id))
            .map(|c| c.code)
            .collect();
        if !dependents.is_empty() {
            return Err(CoreError::conflict(format!("Course is a prerequisite of: {}", dependents.join(", "))));
        }

        self.courses.delete_course(course_id).await?;
        info!("Deleted course {}", course_id);
        Ok(())
    }

    pub async fn publish_course(&self, course_id: &str) -> CoreResult<Course> {
        let mut course = self.get_course(course_id).await?;
        if self.courses.list_modules(course_id).await?.is_empty() {
            return Err(CoreError::validation("A course needs at least one module before publishing"));
        }
        course.status = CourseStatus::Published;
        course.updated_at = Utc::now();
        info!("Published course {}", course.code);
        self.courses.update_course(course).await
    }

    pub async fn archive_course(&self, course_id: &str) -> CoreResult<Course> {
        let mut course = self.get_course(course_id).await?;
        course.status = CourseStatus::Archived;
        course.updated_at = Utc::now();
        info!("Archived course {}", course.code);
        self.courses.update_course(course).await
    }

    /// Append a module to the end of a course
    pub async fn add_module(&self, course_id: &str, request: NewModule) -> CoreResult<CourseModule> {
        self.get_course(course_id).await?;
        let title = required_text("title", &request.title)?;
        let passing_score = normalize_passing_score(request.kind, request.passing_score)?;

        let existing = self.courses.list_modules(course_id).await?;
        let prerequisites = dedup(request.prerequisite_module_ids);
        ensure_same_course(&existing, &prerequisites)?;

        let module = CourseModule {
            id: new_id(),
            course_id: course_id.to_string(),
            title,
            kind: request.kind,
            position: existing.iter().map(|m| m.position).max().unwrap_or(0) + 1,
            duration_minutes: request.duration_minutes,
            required: request.required,
            passing_score,
            prerequisite_module_ids: prerequisites,
        };

        self.courses.insert_module(module).await
    }

    pub async fn update_module(&self, course_id: &str, module_id: &str, update: ModuleUpdate) -> CoreResult<CourseModule> {
        let mut module = self.course_module(course_id, module_id).await?;

        if let Some(title) = update.title {
            module.title = required_text("title", &title)?;
        }
        if let Some(duration) = update.duration_minutes {
            module.duration_minutes = duration;
        }
        if let Some(required) = update.required {
            module.required = required;
        }
        if update.passing_score.is_some() {
            module.passing_score = normalize_passing_score(module.kind, update.passing_score)?;
        }
        if let Some(prerequisites) = update.prerequisite_module_ids {
            let prerequisites = dedup(prerequisites);
            let siblings = self.courses.list_modules(course_id).await?;
            ensure_same_course(&siblings, &prerequisites)?;

            let mut edges: HashMap<String, Vec<String>> = siblings.into_iter().map(|m| (m.id, m.prerequisite_module_ids)).collect();
            edges.insert(module.id.clone(), prerequisites.clone());
            if let Some(cycle) = find_cycle(&edges) {
                return Err(CoreError::validation(format!("Module prerequisites form a cycle: {}", cycle.join(" -> "))));
            }
            module.prerequisite_module_ids = prerequisites;
        }

        self.courses.update_module(module).await
    }

    /// Remove a module and close the gap in positions
    pub async fn remove_module(&self, course_id: &str, module_id: &str) -> CoreResult<()> {
        self.course_module(course_id, module_id).await?;
        self.courses.delete_module(module_id).await?;

        let remaining = self.courses.list_modules(course_id).await?;
        for (index, mut module) in remaining.into_iter().enumerate() {
            let position = index as u32 + 1;
            if module.position != position {
                module.position = position;
                self.courses.update_module(module).await?;
            }
        }
        Ok(())
    }

    /// Reorder modules; `ordered_ids` must list every module of the course exactly once
    pub async fn reorder_modules(&self, course_id: &str, ordered_ids: &[String]) -> CoreResult<Vec<CourseModule>> {
        self.get_course(course_id).await?;
        let modules = self.courses.list_modules(course_id).await?;

        let current: HashSet<&str> = modules.iter().map(|m| m.id.as_str()).collect();
        let requested: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();
        if requested.len() != ordered_ids.len() || current != requested {
            return Err(CoreError::validation("Module order must list every module of the course exactly once"));
        }

        let mut by_id: HashMap<String, CourseModule> = modules.into_iter().map(|m| (m.id.clone(), m)).collect();
        let mut reordered = Vec::with_capacity(ordered_ids.len());
        for (index, id) in ordered_ids.iter().enumerate() {
            if let Some(mut module) = by_id.remove(id) {
                module.position = index as u32 + 1;
                reordered.push(self.courses.update_module(module).await?);
            }
        }
        Ok(reordered)
    }

    async fn course_module(&self, course_id: &str, module_id: &str) -> CoreResult<CourseModule> {
        match self.courses.get_module(module_id).await? {
            Some(module) if module.course_id == course_id => Ok(module),
            _ => Err(CoreError::not_found("Module", module_id)),
        }
    }

    async fn ensure_instructor(&self, user_id: &str) -> CoreResult<()> {
        let user = self.users.get_user(user_id).await?.ok_or_else(|| CoreError::not_found("User", user_id))?;
        if user.role == UserRole::Learner {
            return Err(CoreError::validation(format!("User {} cannot instruct courses", user.email)));
        }
        Ok(())
    }

    async fn validate_course_prerequisites(&self, course_id: &str, prerequisites: &[String]) -> CoreResult<()> {
        if prerequisites.iter().any(|p| p == course_id) {
            return Err(CoreError::validation("A course cannot be its own prerequisite"));
        }

        let courses = self.courses.list_courses().await?;
        let known: HashSet<&str> = courses.iter().map(|c| c.id.as_str()).collect();
        if let Some(unknown) = prerequisites.iter().find(|p| !known.contains(p.as_str())) {
            return Err(CoreError::validation(format!("Unknown prerequisite course: {}", unknown)));
        }

        let mut edges: HashMap<String, Vec<String>> = courses.iter().map(|c| (c.id.clone(), c.prerequisite_course_ids.clone())).collect();
        edges.insert(course_id.to_string(), prerequisites.to_vec());
        if let Some(cycle) = find_cycle(&edges) {
            return Err(CoreError::validation(format!("Course prerequisites form a cycle: {}", cycle.join(" -> "))));
        }
        Ok(())
    }
}

fn required_text(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

fn normalize_passing_score(kind: ModuleKind, score: Option<f64>) -> CoreResult<Option<f64>> {
    match (kind, score) {
        (ModuleKind::Quiz, None) => Ok(Some(DEFAULT_PASSING_SCORE)),
        (ModuleKind::Quiz, Some(score)) if (0.0..=100.0).contains(&score) => Ok(Some(score)),
        (ModuleKind::Quiz, Some(score)) => Err(CoreError::validation(format!("Passing score must be between 0 and 100, got {}", score))),
        (_, Some(_)) => Err(CoreError::validation("Only quiz modules have a passing score")),
        (_, None) => Ok(None),
    }
}

fn ensure_same_course(siblings: &[CourseModule], prerequisites: &[String]) -> CoreResult<()> {
    for prerequisite in prerequisites {
        if !siblings.iter().any(|m| &m.id == prerequisite) {
            return Err(CoreError::validation(format!("Prerequisite module {} is not part of this course", prerequisite)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Enrollment, User};
    use crate::store::MemoryStore;

    async fn setup() -> (CatalogService, Arc<MemoryStore>, String) {
        let store = Arc::new(MemoryStore::new());
        let instructor = store
            .insert_user(User::new("teach@example.com".to_string(), "Teach".to_string(), UserRole::Instructor, String::new()))
            .await
            .unwrap();
        let catalog = CatalogService::new(store.clone(), store.clone(), store.clone());
        (catalog, store, instructor.id)
    }

    fn new_course(code: &str) -> NewCourse {
        NewCourse {
            code: code.to_string(),
            title: format!("Course {}", code),
            description: String::new(),
            category: "security".to_string(),
            instructor_id: None,
            prerequisite_course_ids: Vec::new(),
        }
    }

    fn video(title: &str) -> NewModule {
        NewModule {
            title: title.to_string(),
            kind: ModuleKind::Video,
            duration_minutes: 5,
            required: true,
            passing_score: None,
            prerequisite_module_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_course_defaults_instructor_to_actor() {
        let (catalog, _, instructor) = setup().await;
        let course = catalog.create_course(&instructor, new_course("SEC-101")).await.unwrap();
        assert_eq!(course.instructor_id, instructor);
        assert_eq!(course.status, CourseStatus::Draft);
    }

    #[tokio::test]
    async fn test_publish_requires_module() {
        let (catalog, _, instructor) = setup().await;
        let course = catalog.create_course(&instructor, new_course("SEC-101")).await.unwrap();
        assert!(matches!(catalog.publish_course(&course.id).await, Err(CoreError::Validation { .. })));

        catalog.add_module(&course.id, video("Intro")).await.unwrap();
        let published = catalog.publish_course(&course.id).await.unwrap();
        assert_eq!(published.status, CourseStatus::Published);
    }

    #[tokio::test]
    async fn test_course_prerequisite_cycle_rejected() {
        let (catalog, _, instructor) = setup().await;
        let a = catalog.create_course(&instructor, new_course("A-1")).await.unwrap();
        let mut b_request = new_course("B-1");
        b_request.prerequisite_course_ids = vec![a.id.clone()];
        let b = catalog.create_course(&instructor, b_request).await.unwrap();

        let update = CourseUpdate {
            prerequisite_course_ids: Some(vec![b.id.clone()]),
            ..Default::default()
        };
        let result = catalog.update_course(&a.id, update).await;
        assert!(matches!(result, Err(CoreError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_quiz_gets_default_passing_score() {
        let (catalog, _, instructor) = setup().await;
        let course = catalog.create_course(&instructor, new_course("Q-1")).await.unwrap();
        let mut quiz = video("Check");
        quiz.kind = ModuleKind::Quiz;
        let module = catalog.add_module(&course.id, quiz).await.unwrap();
        assert_eq!(module.passing_score, Some(DEFAULT_PASSING_SCORE));

        let mut reading = video("Read");
        reading.kind = ModuleKind::Reading;
        reading.passing_score = Some(50.0);
        assert!(catalog.add_module(&course.id, reading).await.is_err());
    }

    #[tokio::test]
    async fn test_reorder_and_remove_keep_positions_dense() {
        let (catalog, _, instructor) = setup().await;
        let course = catalog.create_course(&instructor, new_course("R-1")).await.unwrap();
        let first = catalog.add_module(&course.id, video("one")).await.unwrap();
        let second = catalog.add_module(&course.id, video("two")).await.unwrap();
        let third = catalog.add_module(&course.id, video("three")).await.unwrap();

        let order = vec![third.id.clone(), first.id.clone(), second.id.clone()];
        let reordered = catalog.reorder_modules(&course.id, &order).await.unwrap();
        assert_eq!(reordered[0].id, third.id);
        assert_eq!(reordered[0].position, 1);

        assert!(catalog.reorder_modules(&course.id, &order[..2]).await.is_err());

        catalog.remove_module(&course.id, &first.id).await.unwrap();
        let detail = catalog.get_course_detail(&course.id).await.unwrap();
        let positions: Vec<u32> = detail.modules.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(detail.modules[0].id, third.id);
    }

    #[tokio::test]
    async fn test_module_prerequisite_cycle_rejected() {
        let (catalog, _, instructor) = setup().await;
        let course = catalog.create_course(&instructor, new_course("M-1")).await.unwrap();
        let first = catalog.add_module(&course.id, video("one")).await.unwrap();
        let mut second_request = video("two");
        second_request.prerequisite_module_ids = vec![first.id.clone()];
        let second = catalog.add_module(&course.id, second_request).await.unwrap();

        let update = ModuleUpdate {
            prerequisite_module_ids: Some(vec![second.id.clone()]),
            ..Default::default()
        };
        assert!(catalog.update_module(&course.id, &first.id, update).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_enrolled_course_conflicts() {
        let (catalog, store, instructor) = setup().await;
        let course = catalog.create_course(&instructor, new_course("D-1")).await.unwrap();
        store.insert_enrollment(Enrollment::new("learner".to_string(), course.id.clone(), None)).await.unwrap();

        assert!(matches!(catalog.delete_course(&course.id).await, Err(CoreError::Conflict { .. })));
        catalog.archive_course(&course.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_courses_filters() {
        let (catalog, _, instructor) = setup().await;
        catalog.create_course(&instructor, new_course("SEC-101")).await.unwrap();
        let mut other = new_course("DATA-200");
        other.category = "data".to_string();
        other.title = "Spreadsheets for analysts".to_string();
        catalog.create_course(&instructor, other).await.unwrap();

        let query = CourseQuery {
            search: Some("spreadsheet".to_string()),
            ..Default::default()
        };
        let found = catalog.list_courses(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "DATA-200");

        let query = CourseQuery {
            category: Some("SECURITY".to_string()),
            ..Default::default()
        };
        assert_eq!(catalog.list_courses(&query).await.unwrap().len(), 1);
    }
}
