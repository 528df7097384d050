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

//! Enrollment lifecycle

use crate::error::{CoreError, CoreResult};
use crate::models::{CourseStatus, Enrollment, EnrollmentStatus};
use crate::store::{CourseStore, EnrollmentStore, UserStore};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

pub struct EnrollmentService {
    courses: Arc<dyn CourseStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    users: Arc<dyn UserStore>,
}

impl EnrollmentService {
    pub fn new(courses: Arc<dyn CourseStore>, enrollments: Arc<dyn EnrollmentStore>, users: Arc<dyn UserStore>) -> Self {
        Self { courses, enrollments, users }
    }

    /// Enroll a user in a published course.
    ///
    /// Every prerequisite course must already be completed. A dropped
    /// enrollment is re-activated with its previous progress intact.
    pub async fn enroll(&self, user_id: &str, course_id: &str, due_date: Option<NaiveDate>) -> CoreResult<Enrollment> {
        let user = self.users.get_user(user_id).await?.ok_or_else(|| CoreError::not_found("User", user_id))?;
        if !user.active {
            return Err(CoreError::validation(format!("User {} is inactive", user.email)));
        }

        let course = self.courses.get_course(course_id).await?.ok_or_else(|| CoreError::not_found("Course", course_id))?;
        if course.status != CourseStatus::Published {
            return Err(CoreError::validation(format!("Course {} is not open for enrollment", course.code)));
        }

        let existing = self.enrollments.find_enrollment(user_id, course_id).await?;
        if let Some(enrollment) = &existing {
            if enrollment.is_held() {
                return Err(CoreError::conflict(format!("Already enrolled in {}", course.code)));
            }
        }

        let mut missing = Vec::new();
        for prerequisite_id in &course.prerequisite_course_ids {
            let completed = self
                .enrollments
                .find_enrollment(user_id, prerequisite_id)
                .await?
                .is_some_and(|e| e.status == EnrollmentStatus::Completed);
            if !completed {
                let label = match self.courses.get_course(prerequisite_id).await? {
                    Some(prerequisite) => prerequisite.code,
                    None => prerequisite_id.clone(),
                };
                missing.push(label);
            }
        }
        if !missing.is_empty() {
            warn!("Enrollment of {} in {} blocked by prerequisites: {:?}", user_id, course.code, missing);
            return Err(CoreError::PrerequisitesNotMet { missing });
        }

        let enrollment = match existing {
            Some(mut dropped) => {
                dropped.status = EnrollmentStatus::Active;
                dropped.due_date = due_date.or(dropped.due_date);
                self.enrollments.update_enrollment(dropped).await?
            }
            None => self.enrollments.insert_enrollment(Enrollment::new(user_id.to_string(), course_id.to_string(), due_date)).await?,
        };

        info!("Enrolled {} in {}", user.email, course.code);
        metrics::increment_counter!("learnhub_enrollments_total");
        Ok(enrollment)
    }

    pub async fn get_enrollment(&self, enrollment_id: &str) -> CoreResult<Enrollment> {
        self.enrollments
            .get_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Enrollment", enrollment_id))
    }

    /// Withdraw from a course. Completed enrollments cannot be dropped.
    pub async fn drop_enrollment(&self, enrollment_id: &str) -> CoreResult<Enrollment> {
        let mut enrollment = self.get_enrollment(enrollment_id).await?;
        match enrollment.status {
            EnrollmentStatus::Completed => Err(CoreError::conflict("Completed enrollments cannot be dropped")),
            EnrollmentStatus::Dropped => Ok(enrollment),
            EnrollmentStatus::Active => {
                enrollment.status = EnrollmentStatus::Dropped;
                info!("Dropped enrollment {}", enrollment.id);
                self.enrollments.update_enrollment(enrollment).await
            }
        }
    }

    pub async fn list_for_user(&self, user_id: &str) -> CoreResult<Vec<Enrollment>> {
        let enrollments = self.enrollments.list_enrollments().await?;
        Ok(enrollments.into_iter().filter(|e| e.user_id == user_id).collect())
    }

    pub async fn list_for_course(&self, course_id: &str) -> CoreResult<Vec<Enrollment>> {
        let enrollments = self.enrollments.list_enrollments().await?;
        Ok(enrollments.into_iter().filter(|e| e.course_id == course_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, User, UserRole, new_id};
    use crate::store::MemoryStore;
    use chrono::Utc;

    async fn published_course(store: &MemoryStore, code: &str, prerequisites: Vec<String>) -> Course {
        let now = Utc::now();
        store
            .insert_course(Course {
                id: new_id(),
                code: code.to_string(),
                title: code.to_string(),
                description: String::new(),
                category: "general".to_string(),
                instructor_id: "instructor-x".to_string(),
                status: CourseStatus::Published,
                prerequisite_course_ids: prerequisites,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
    }

    async fn setup() -> (EnrollmentService, Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let learner = store
            .insert_user(User::new("learner@example.com".to_string(), "Learner".to_string(), UserRole::Learner, String::new()))
            .await
            .unwrap();
        (EnrollmentService::new(store.clone(), store.clone(), store.clone()), store, learner)
    }

    #[tokio::test]
    async fn test_enroll_and_duplicate() {
        let (service, store, learner) = setup().await;
        let course = published_course(&store, "SEC-101", Vec::new()).await;

        let enrollment = service.enroll(&learner.id, &course.id, None).await.unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Active);

        let again = service.enroll(&learner.id, &course.id, None).await;
        assert!(matches!(again, Err(CoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_draft_course_rejects_enrollment() {
        let (service, store, learner) = setup().await;
        let mut course = published_course(&store, "SEC-102", Vec::new()).await;
        course.status = CourseStatus::Draft;
        store.update_course(course.clone()).await.unwrap();

        assert!(matches!(service.enroll(&learner.id, &course.id, None).await, Err(CoreError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_prerequisites_reported_by_code() {
        let (service, store, learner) = setup().await;
        let basics = published_course(&store, "SEC-101", Vec::new()).await;
        let advanced = published_course(&store, "SEC-201", vec![basics.id.clone()]).await;

        match service.enroll(&learner.id, &advanced.id, None).await {
            Err(CoreError::PrerequisitesNotMet { missing }) => assert_eq!(missing, vec!["SEC-101".to_string()]),
            other => panic!("unexpected result: {:?}", other),
        }

        let mut done = service.enroll(&learner.id, &basics.id, None).await.unwrap();
        done.status = EnrollmentStatus::Completed;
        store.update_enrollment(done).await.unwrap();

        assert!(service.enroll(&learner.id, &advanced.id, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_drop_then_reenroll_reactivates() {
        let (service, store, learner) = setup().await;
        let course = published_course(&store, "SEC-101", Vec::new()).await;
        let enrollment = service.enroll(&learner.id, &course.id, None).await.unwrap();

        let dropped = service.drop_enrollment(&enrollment.id).await.unwrap();
        assert_eq!(dropped.status, EnrollmentStatus::Dropped);

        let back = service.enroll(&learner.id, &course.id, None).await.unwrap();
        assert_eq!(back.id, enrollment.id);
        assert_eq!(back.status, EnrollmentStatus::Active);
        assert_eq!(service.list_for_course(&course.id).await.unwrap().len(), 1);
    }
}
