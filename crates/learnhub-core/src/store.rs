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

//! Storage layer
//!
//! Services talk to storage through the traits below. [`MemoryStore`] is the
//! bundled implementation; it can be seeded from and saved to a JSON
//! [`Snapshot`].

use crate::error::{CoreError, CoreResult};
use crate::models::{Course, CourseModule, Enrollment, ModuleProgress, User};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;

/// User account storage
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: User) -> CoreResult<User>;
    async fn get_user(&self, user_id: &str) -> CoreResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> CoreResult<Option<User>>;
    async fn update_user(&self, user: User) -> CoreResult<User>;
    async fn list_users(&self) -> CoreResult<Vec<User>>;
}

/// Course and module storage
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn insert_course(&self, course: Course) -> CoreResult<Course>;
    async fn get_course(&self, course_id: &str) -> CoreResult<Option<Course>>;
    async fn get_course_by_code(&self, code: &str) -> CoreResult<Option<Course>>;
    async fn update_course(&self, course: Course) -> CoreResult<Course>;
    async fn delete_course(&self, course_id: &str) -> CoreResult<()>;
    async fn list_courses(&self) -> CoreResult<Vec<Course>>;

    async fn insert_module(&self, module: CourseModule) -> CoreResult<CourseModule>;
    async fn get_module(&self, module_id: &str) -> CoreResult<Option<CourseModule>>;
    async fn update_module(&self, module: CourseModule) -> CoreResult<CourseModule>;
    async fn delete_module(&self, module_id: &str) -> CoreResult<()>;
    /// Modules of a course ordered by position
    async fn list_modules(&self, course_id: &str) -> CoreResult<Vec<CourseModule>>;
    async fn list_all_modules(&self) -> CoreResult<Vec<CourseModule>>;
}

/// Enrollment storage
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn insert_enrollment(&self, enrollment: Enrollment) -> CoreResult<Enrollment>;
    async fn get_enrollment(&self, enrollment_id: &str) -> CoreResult<Option<Enrollment>>;
    async fn find_enrollment(&self, user_id: &str, course_id: &str) -> CoreResult<Option<Enrollment>>;
    async fn update_enrollment(&self, enrollment: Enrollment) -> CoreResult<Enrollment>;
    async fn list_enrollments(&self) -> CoreResult<Vec<Enrollment>>;
}

/// Module progress storage, keyed by (user, module)
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get_progress(&self, user_id: &str, module_id: &str) -> CoreResult<Option<ModuleProgress>>;
    async fn upsert_progress(&self, progress: ModuleProgress) -> CoreResult<ModuleProgress>;
    async fn list_course_progress(&self, user_id: &str, course_id: &str) -> CoreResult<Vec<ModuleProgress>>;
    async fn list_all_progress(&self) -> CoreResult<Vec<ModuleProgress>>;
}

/// Serializable image of the whole store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub modules: Vec<CourseModule>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub progress: Vec<ModuleProgress>,
}

impl Snapshot {
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    courses: HashMap<String, Course>,
    modules: HashMap<String, CourseModule>,
    enrollments: HashMap<String, Enrollment>,
    progress: HashMap<(String, String), ModuleProgress>,
}

/// In-memory store implementing every storage trait
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut tables = Tables::default();
        for user in snapshot.users {
            tables.users.insert(user.id.clone(), user);
        }
        for course in snapshot.courses {
            tables.courses.insert(course.id.clone(), course);
        }
        for module in snapshot.modules {
            tables.modules.insert(module.id.clone(), module);
        }
        for enrollment in snapshot.enrollments {
            tables.enrollments.insert(enrollment.id.clone(), enrollment);
        }
        for progress in snapshot.progress {
            tables.progress.insert((progress.user_id.clone(), progress.module_id.clone()), progress);
        }

        info!(
            users = tables.users.len(),
            courses = tables.courses.len(),
            enrollments = tables.enrollments.len(),
            "Loaded store snapshot"
        );

        Self { tables: RwLock::new(tables) }
    }

    /// Load a store from a JSON snapshot file
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        Ok(Self::from_snapshot(Snapshot::load(path)?))
    }

    /// Copy the current contents out as a snapshot
    pub async fn snapshot(&self) -> Snapshot {
        let tables = self.tables.read().await;
        let mut snapshot = Snapshot {
            users: tables.users.values().cloned().collect(),
            courses: tables.courses.values().cloned().collect(),
            modules: tables.modules.values().cloned().collect(),
            enrollments: tables.enrollments.values().cloned().collect(),
            progress: tables.progress.values().cloned().collect(),
        };
        // Stable output for diffs
        snapshot.users.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot.courses.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot.modules.sort_by(|a, b| (&a.course_id, a.position).cmp(&(&b.course_id, b.position)));
        snapshot.enrollments.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot.progress.sort_by(|a, b| (&a.user_id, &a.module_id).cmp(&(&b.user_id, &b.module_id)));
        snapshot
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> CoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(CoreError::conflict(format!("Email already registered: {}", user.email)));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> CoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn update_user(&self, user: User) -> CoreResult<User> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(CoreError::not_found("User", user.id)),
        }
    }

    async fn list_users(&self) -> CoreResult<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn insert_course(&self, course: Course) -> CoreResult<Course> {
        let mut tables = self.tables.write().await;
        if tables.courses.values().any(|c| c.code.eq_ignore_ascii_case(&course.code)) {
            return Err(CoreError::conflict(format!("Course code already exists: {}", course.code)));
        }
        tables.courses.insert(course.id.clone(), course.clone());
        Ok(course)
    }

    async fn get_course(&self, course_id: &str) -> CoreResult<Option<Course>> {
        Ok(self.tables.read().await.courses.get(course_id).cloned())
    }

    async fn get_course_by_code(&self, code: &str) -> CoreResult<Option<Course>> {
        let tables = self.tables.read().await;
        Ok(tables.courses.values().find(|c| c.code.eq_ignore_ascii_case(code)).cloned())
    }

    async fn update_course(&self, course: Course) -> CoreResult<Course> {
        let mut tables = self.tables.write().await;
        match tables.courses.get_mut(&course.id) {
            Some(existing) => {
                *existing = course.clone();
                Ok(course)
            }
            None => Err(CoreError::not_found("Course", course.id)),
        }
    }

    async fn delete_course(&self, course_id: &str) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.courses.remove(course_id).is_none() {
            return Err(CoreError::not_found("Course", course_id));
        }
        tables.modules.retain(|_, m| m.course_id != course_id);
        tables.progress.retain(|_, p| p.course_id != course_id);
        Ok(())
    }

    async fn list_courses(&self) -> CoreResult<Vec<Course>> {
        let mut courses: Vec<Course> = self.tables.read().await.courses.values().cloned().collect();
        courses.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(courses)
    }

    async fn insert_module(&self, module: CourseModule) -> CoreResult<CourseModule> {
        let mut tables = self.tables.write().await;
        if !tables.courses.contains_key(&module.course_id) {
            return Err(CoreError::not_found("Course", module.course_id));
        }
        tables.modules.insert(module.id.clone(), module.clone());
        Ok(module)
    }

    async fn get_module(&self, module_id: &str) -> CoreResult<Option<CourseModule>> {
        Ok(self.tables.read().await.modules.get(module_id).cloned())
    }

    async fn update_module(&self, module: CourseModule) -> CoreResult<CourseModule> {
        let mut tables = self.tables.write().await;
        match tables.modules.get_mut(&module.id) {
            Some(existing) => {
                *existing = module.clone();
                Ok(module)
            }
            None => Err(CoreError::not_found("Module", module.id)),
        }
    }

    async fn delete_module(&self, module_id: &str) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.modules.remove(module_id).is_none() {
            return Err(CoreError::not_found("Module", module_id));
        }
        tables.progress.retain(|(_, m), _| m != module_id);
        for module in tables.modules.values_mut() {
            module.prerequisite_module_ids.retain(|id| id != module_id);
        }
        Ok(())
    }

    async fn list_modules(&self, course_id: &str) -> CoreResult<Vec<CourseModule>> {
        let tables = self.tables.read().await;
        let mut modules: Vec<CourseModule> = tables.modules.values().filter(|m| m.course_id == course_id).cloned().collect();
        modules.sort_by_key(|m| m.position);
        Ok(modules)
    }

    async fn list_all_modules(&self) -> CoreResult<Vec<CourseModule>> {
        Ok(self.tables.read().await.modules.values().cloned().collect())
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn insert_enrollment(&self, enrollment: Enrollment) -> CoreResult<Enrollment> {
        let mut tables = self.tables.write().await;
        let duplicate = tables
            .enrollments
            .values()
            .any(|e| e.user_id == enrollment.user_id && e.course_id == enrollment.course_id);
        if duplicate {
            return Err(CoreError::conflict("Enrollment already exists"));
        }
        tables.enrollments.insert(enrollment.id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    async fn get_enrollment(&self, enrollment_id: &str) -> CoreResult<Option<Enrollment>> {
        Ok(self.tables.read().await.enrollments.get(enrollment_id).cloned())
    }

    async fn find_enrollment(&self, user_id: &str, course_id: &str) -> CoreResult<Option<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables.enrollments.values().find(|e| e.user_id == user_id && e.course_id == course_id).cloned())
    }

    async fn update_enrollment(&self, enrollment: Enrollment) -> CoreResult<Enrollment> {
        let mut tables = self.tables.write().await;
        match tables.enrollments.get_mut(&enrollment.id) {
            Some(existing) => {
                *existing = enrollment.clone();
                Ok(enrollment)
            }
            None => Err(CoreError::not_found("Enrollment", enrollment.id)),
        }
    }

    async fn list_enrollments(&self) -> CoreResult<Vec<Enrollment>> {
        let mut enrollments: Vec<Enrollment> = self.tables.read().await.enrollments.values().cloned().collect();
        enrollments.sort_by(|a, b| a.enrolled_at.cmp(&b.enrolled_at).then_with(|| a.id.cmp(&b.id)));
        Ok(enrollments)
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_progress(&self, user_id: &str, module_id: &str) -> CoreResult<Option<ModuleProgress>> {
        let tables = self.tables.read().await;
        Ok(tables.progress.get(&(user_id.to_string(), module_id.to_string())).cloned())
    }

    async fn upsert_progress(&self, progress: ModuleProgress) -> CoreResult<ModuleProgress> {
        let mut tables = self.tables.write().await;
        tables.progress.insert((progress.user_id.clone(), progress.module_id.clone()), progress.clone());
        Ok(progress)
    }

    async fn list_course_progress(&self, user_id: &str, course_id: &str) -> CoreResult<Vec<ModuleProgress>> {
        let tables = self.tables.read().await;
        Ok(tables.progress.values().filter(|p| p.user_id == user_id && p.course_id == course_id).cloned().collect())
    }

    async fn list_all_progress(&self) -> CoreResult<Vec<ModuleProgress>> {
        Ok(self.tables.read().await.progress.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseStatus, UserRole};
    use chrono::Utc;

    fn course(code: &str) -> Course {
        Course {
            id: crate::models::new_id(),
            code: code.to_string(),
            title: format!("{} title", code),
            description: String::new(),
            category: "general".to_string(),
            instructor_id: "instructor".to_string(),
            status: CourseStatus::Draft,
            prerequisite_course_ids: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_case_insensitively() {
        let store = MemoryStore::new();
        store
            .insert_user(User::new("Ada@example.com".to_string(), "Ada".to_string(), UserRole::Learner, String::new()))
            .await
            .unwrap();

        let result = store
            .insert_user(User::new("ada@example.com".to_string(), "Ada Two".to_string(), UserRole::Learner, String::new()))
            .await;
        assert!(matches!(result, Err(CoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_delete_course_cascades_modules() {
        let store = MemoryStore::new();
        let c = store.insert_course(course("SEC-101")).await.unwrap();
        let module = CourseModule {
            id: crate::models::new_id(),
            course_id: c.id.clone(),
            title: "Intro".to_string(),
            kind: crate::models::ModuleKind::Video,
            position: 1,
            duration_minutes: 10,
            required: true,
            passing_score: None,
            prerequisite_module_ids: Vec::new(),
        };
        store.insert_module(module.clone()).await.unwrap();

        store.delete_course(&c.id).await.unwrap();
        assert!(store.get_module(&module.id).await.unwrap().is_none());
        assert!(store.list_modules(&c.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let store = MemoryStore::new();
        store.insert_course(course("DATA-200")).await.unwrap();
        store.snapshot().await.save(&path).unwrap();

        let reloaded = MemoryStore::load(&path).unwrap();
        let found = reloaded.get_course_by_code("data-200").await.unwrap();
        assert!(found.is_some());
    }
}
