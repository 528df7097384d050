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

//! Domain models for courses, modules, enrollments and progress

use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Generate a fresh entity identifier
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ====== Users ======

/// Account role, ordered from most to least privileged
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Instructor,
    Learner,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Instructor => "instructor",
            UserRole::Learner => "learner",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "instructor" => Ok(UserRole::Instructor),
            "learner" | "student" => Ok(UserRole::Learner),
            other => Err(CoreError::validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Stored user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub department: Option<String>,
    pub role: UserRole,
    /// Argon2 PHC string
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(email: String, full_name: String, role: UserRole, password_hash: String) -> Self {
        Self {
            id: new_id(),
            email,
            full_name,
            department: None,
            role,
            password_hash,
            active: true,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Public view without credentials
    pub fn to_summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            department: self.department.clone(),
            role: self.role,
            active: self.active,
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

/// User record as exposed through the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub department: Option<String>,
    pub role: UserRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

// ====== Courses ======

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "draft",
            CourseStatus::Published => "published",
            CourseStatus::Archived => "archived",
        }
    }
}

impl FromStr for CourseStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(CourseStatus::Draft),
            "published" => Ok(CourseStatus::Published),
            "archived" => Ok(CourseStatus::Archived),
            other => Err(CoreError::validation(format!("Unknown course status: {}", other))),
        }
    }
}

/// A course in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Course {
    pub id: String,
    /// Unique short code, e.g. "SEC-101"
    pub code: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub instructor_id: String,
    pub status: CourseStatus,
    /// Courses a learner must complete before enrolling
    #[serde(default)]
    pub prerequisite_course_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a course
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewCourse {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    /// Defaults to the creating user
    pub instructor_id: Option<String>,
    #[serde(default)]
    pub prerequisite_course_ids: Vec<String>,
}

/// Partial course update
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub instructor_id: Option<String>,
    pub prerequisite_course_ids: Option<Vec<String>>,
}

/// Catalog listing filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseQuery {
    pub status: Option<CourseStatus>,
    pub category: Option<String>,
    pub instructor_id: Option<String>,
    pub search: Option<String>,
}

// ====== Modules ======

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Video,
    Reading,
    Quiz,
    Assignment,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Video => "video",
            ModuleKind::Reading => "reading",
            ModuleKind::Quiz => "quiz",
            ModuleKind::Assignment => "assignment",
        }
    }
}

/// A unit of course content
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseModule {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub kind: ModuleKind,
    /// 1-based position within the course
    pub position: u32,
    pub duration_minutes: u32,
    pub required: bool,
    /// Minimum score (0-100) to pass a quiz
    pub passing_score: Option<f64>,
    #[serde(default)]
    pub prerequisite_module_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewModule {
    pub title: String,
    pub kind: ModuleKind,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default = "default_required")]
    pub required: bool,
    pub passing_score: Option<f64>,
    #[serde(default)]
    pub prerequisite_module_ids: Vec<String>,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ModuleUpdate {
    pub title: Option<String>,
    pub duration_minutes: Option<u32>,
    pub required: Option<bool>,
    pub passing_score: Option<f64>,
    pub prerequisite_module_ids: Option<Vec<String>>,
}

// ====== Enrollments ======

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Dropped => "dropped",
        }
    }
}

impl FromStr for EnrollmentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(EnrollmentStatus::Active),
            "completed" => Ok(EnrollmentStatus::Completed),
            "dropped" => Ok(EnrollmentStatus::Dropped),
            other => Err(CoreError::validation(format!("Unknown enrollment status: {}", other))),
        }
    }
}

/// A learner's registration in a course
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Enrollment {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Cached course progress percentage
    pub progress_percent: f64,
}

impl Enrollment {
    pub fn new(user_id: String, course_id: String, due_date: Option<NaiveDate>) -> Self {
        Self {
            id: new_id(),
            user_id,
            course_id,
            status: EnrollmentStatus::Active,
            enrolled_at: Utc::now(),
            due_date,
            completed_at: None,
            progress_percent: 0.0,
        }
    }

    /// Active or completed enrollments count as held
    pub fn is_held(&self) -> bool {
        self.status != EnrollmentStatus::Dropped
    }
}

// ====== Progress ======

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Per-learner progress on one module
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModuleProgress {
    pub user_id: String,
    pub course_id: String,
    pub module_id: String,
    pub status: ProgressStatus,
    pub attempts: u32,
    pub best_score: Option<f64>,
    pub time_spent_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl ModuleProgress {
    pub fn new(user_id: String, course_id: String, module_id: String) -> Self {
        Self {
            user_id,
            course_id,
            module_id,
            status: ProgressStatus::NotStarted,
            attempts: 0,
            best_score: None,
            time_spent_secs: 0,
            started_at: None,
            completed_at: None,
            last_activity_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }
}

/// Module row in a learner's course outline
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModuleProgressView {
    pub module_id: String,
    pub title: String,
    pub kind: ModuleKind,
    pub position: u32,
    pub required: bool,
    pub status: ProgressStatus,
    pub best_score: Option<f64>,
    pub time_spent_secs: u64,
    /// Prerequisite modules are still incomplete
    pub locked: bool,
}

/// A learner's progress through one course
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseProgress {
    pub course_id: String,
    pub user_id: String,
    pub enrollment_status: EnrollmentStatus,
    pub percent: f64,
    pub completed_modules: usize,
    pub counted_modules: usize,
    pub time_spent_secs: u64,
    pub modules: Vec<ModuleProgressView>,
}
