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

//! Permission definitions

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access to an action on a resource, optionally restricted by conditions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    /// Resource identifier (e.g., "courses", "enrollments", "reports")
    pub resource: String,

    /// Action identifier (e.g., "read", "create", "update", "export")
    pub action: String,

    /// Conditions that must be met for this permission to apply
    pub conditions: Vec<PermissionCondition>,
}

impl Permission {
    pub fn new(resource: &str, action: &str) -> Self {
        Self {
            resource: resource.to_string(),
            action: action.to_string(),
            conditions: Vec::new(),
        }
    }

    /// Only applies to resources the caller owns
    pub fn owned(resource: &str, action: &str) -> Self {
        Self {
            conditions: vec![PermissionCondition::Ownership],
            ..Self::new(resource, action)
        }
    }

    /// Parse a `resource:action` string
    pub fn parse(value: &str) -> ApiResult<Self> {
        match value.split_once(':') {
            Some((resource, action)) if !resource.is_empty() && !action.is_empty() && !action.contains(':') => Ok(Self::new(resource, action)),
            _ => Err(ApiError::RouterError(format!("Invalid permission '{}', expected resource:action", value))),
        }
    }

    /// Get the permission key for caching and comparison
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }

    /// Check if this permission matches a resource and action
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        (self.resource == "*" || self.resource == resource) && (self.action == "*" || self.action == action)
    }

    /// Evaluate conditions for this permission
    pub fn evaluate_conditions(&self, context: &PermissionContext<'_>) -> bool {
        self.conditions.iter().all(|condition| condition.evaluate(context))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())?;
        if self.conditions.contains(&PermissionCondition::Ownership) {
            f.write_str(":own")?;
        }
        Ok(())
    }
}

/// Permission condition that must be evaluated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PermissionCondition {
    /// Caller must be one of the resource owners
    Ownership,
}

impl PermissionCondition {
    /// Evaluate this condition against the given context
    pub fn evaluate(&self, context: &PermissionContext<'_>) -> bool {
        match self {
            PermissionCondition::Ownership => context.owners.iter().any(|owner| *owner == context.user_id),
        }
    }
}

/// Facts about a concrete resource access
#[derive(Debug, Clone)]
pub struct PermissionContext<'a> {
    pub user_id: &'a str,
    /// Users that own the resource, e.g. a course instructor or an enrolled learner
    pub owners: Vec<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards() {
        assert!(Permission::new("*", "*").matches("courses", "delete"));
        assert!(Permission::new("progress", "*").matches("progress", "update"));
        assert!(!Permission::new("courses", "read").matches("courses", "update"));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Permission::parse("reports:export").unwrap(), Permission::new("reports", "export"));
        assert!(Permission::parse("reports").is_err());
        assert!(Permission::parse("a:b:c").is_err());
        assert!(Permission::parse(":read").is_err());
    }

    #[test]
    fn test_ownership_condition() {
        let permission = Permission::owned("courses", "update");
        let owner = PermissionContext {
            user_id: "u1",
            owners: vec!["u1"],
        };
        let stranger = PermissionContext {
            user_id: "u2",
            owners: vec!["u1"],
        };
        assert!(permission.evaluate_conditions(&owner));
        assert!(!permission.evaluate_conditions(&stranger));
        assert_eq!(permission.to_string(), "courses:update:own");
    }
}
