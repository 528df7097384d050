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

//! Report filters and their query-string form

use crate::error::{CoreError, CoreResult};
use crate::models::EnrollmentStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PER_PAGE: u32 = 25;
pub const MAX_PER_PAGE: u32 = 500;

/// Report families
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// One row per enrollment
    Enrollments,
    /// One row per course
    CourseSummary,
    /// One row per learner
    LearnerActivity,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Enrollments => "enrollments",
            ReportKind::CourseSummary => "course_summary",
            ReportKind::LearnerActivity => "learner_activity",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Enrollments => "Enrollment Progress Report",
            ReportKind::CourseSummary => "Course Summary Report",
            ReportKind::LearnerActivity => "Learner Activity Report",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "enrollments" | "progress" => Ok(ReportKind::Enrollments),
            "course_summary" | "courses" => Ok(ReportKind::CourseSummary),
            "learner_activity" | "learners" => Ok(ReportKind::LearnerActivity),
            other => Err(CoreError::validation(format!("Unknown report: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Filters applied before aggregation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportFilter {
    pub course_id: Option<String>,
    pub user_id: Option<String>,
    pub instructor_id: Option<String>,
    pub category: Option<String>,
    pub status: Option<EnrollmentStatus>,
    pub department: Option<String>,
    /// Inclusive lower bound on the enrollment date
    pub enrolled_from: Option<NaiveDate>,
    /// Inclusive upper bound on the enrollment date
    pub enrolled_to: Option<NaiveDate>,
    /// Case-insensitive match on learner name/email and course code/title
    pub search: Option<String>,
    /// Column key to sort by; each report has its own default
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ReportFilter {
    /// Parse filters from decoded query parameters. Empty values are ignored.
    pub fn from_params(params: &HashMap<String, String>) -> CoreResult<Self> {
        let get = |key: &str| params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string);

        let status = get("status").map(|s| s.parse::<EnrollmentStatus>()).transpose()?;
        let direction = match get("direction").or_else(|| get("dir")).as_deref() {
            None => SortDirection::Asc,
            Some(d) if d.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            Some(other) => return Err(CoreError::validation(format!("Sort direction must be 'asc' or 'desc', got '{}'", other))),
        };

        let filter = Self {
            course_id: get("course_id"),
            user_id: get("user_id"),
            instructor_id: get("instructor_id"),
            category: get("category"),
            status,
            department: get("department"),
            enrolled_from: get("from").map(|d| parse_date("from", &d)).transpose()?,
            enrolled_to: get("to").map(|d| parse_date("to", &d)).transpose()?,
            search: get("search").or_else(|| get("q")),
            sort: get("sort"),
            direction,
            page: get("page").map(|p| parse_number("page", &p)).transpose()?,
            per_page: get("per_page").map(|p| parse_number("per_page", &p)).transpose()?,
        };
        filter.validate()?;
        Ok(filter)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if let (Some(from), Some(to)) = (self.enrolled_from, self.enrolled_to) {
            if from > to {
                return Err(CoreError::validation("'from' must not be after 'to'"));
            }
        }
        Ok(())
    }
}

fn parse_date(field: &str, value: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| CoreError::validation(format!("{} must be a YYYY-MM-DD date, got '{}'", field, value)))
}

fn parse_number(field: &str, value: &str) -> CoreResult<u32> {
    value.parse().map_err(|_| CoreError::validation(format!("{} must be a positive integer, got '{}'", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parses_full_filter() {
        let filter = ReportFilter::from_params(&params(&[
            ("status", "Completed"),
            ("from", "2025-01-01"),
            ("to", "2025-03-31"),
            ("q", "  ada "),
            ("sort", "progress"),
            ("dir", "DESC"),
            ("page", "2"),
            ("per_page", "50"),
            ("category", ""),
        ]))
        .unwrap();

        assert_eq!(filter.status, Some(EnrollmentStatus::Completed));
        assert_eq!(filter.enrolled_from, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(filter.search.as_deref(), Some("ada"));
        assert_eq!(filter.direction, SortDirection::Desc);
        assert_eq!(filter.page, Some(2));
        assert_eq!(filter.per_page, Some(50));
        assert_eq!(filter.category, None);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ReportFilter::from_params(&params(&[("from", "01/02/2025")])).is_err());
        assert!(ReportFilter::from_params(&params(&[("page", "-1")])).is_err());
        assert!(ReportFilter::from_params(&params(&[("dir", "up")])).is_err());
        assert!(ReportFilter::from_params(&params(&[("from", "2025-02-01"), ("to", "2025-01-01")])).is_err());
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!("course-summary".parse::<ReportKind>().unwrap(), ReportKind::CourseSummary);
        assert_eq!("Learners".parse::<ReportKind>().unwrap(), ReportKind::LearnerActivity);
        assert!("grades".parse::<ReportKind>().is_err());
    }
}
