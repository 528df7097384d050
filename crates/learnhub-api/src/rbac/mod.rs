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

//! Role-Based Access Control (RBAC)
//!
//! Roles are hierarchical (admin inherits instructor, instructor inherits
//! learner). Route middleware asks whether a role may perform an action at
//! all; handlers then authorize the concrete resource, which is where
//! ownership conditions apply.

pub mod permissions;
pub mod roles;

pub use permissions::{Permission, PermissionCondition, PermissionContext};
pub use roles::{direct_permissions, parent_role, role_includes};

use crate::auth::Claims;
use crate::error::{ApiError, ApiResult};
use dashmap::DashMap;
use learnhub_core::models::UserRole;
use learnhub_core::reports::ReportScope;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves and checks role permissions, caching the resolved set per role
#[derive(Debug, Default)]
pub struct RbacService {
    cache: DashMap<UserRole, Arc<Vec<Permission>>>,
}

impl RbacService {
    pub fn new() -> Self {
        Self::default()
    }

    /// All permissions of a role including inherited ones
    pub fn permissions_for(&self, role: UserRole) -> Arc<Vec<Permission>> {
        if let Some(cached) = self.cache.get(&role) {
            return cached.clone();
        }

        let mut resolved: Vec<Permission> = Vec::new();
        let mut current = Some(role);
        while let Some(r) = current {
            for permission in direct_permissions(r) {
                if !resolved.contains(&permission) {
                    resolved.push(permission);
                }
            }
            current = parent_role(r);
        }
        debug!("Resolved {} permissions for role {}", resolved.len(), role);

        let resolved = Arc::new(resolved);
        self.cache.insert(role, resolved.clone());
        resolved
    }

    /// Whether the role holds the permission for at least some resources
    pub fn has_permission(&self, role: UserRole, resource: &str, action: &str) -> bool {
        self.permissions_for(role).iter().any(|p| p.matches(resource, action))
    }

    /// Route-level check
    pub fn check(&self, role: UserRole, resource: &str, action: &str) -> ApiResult<()> {
        if self.has_permission(role, resource, action) {
            Ok(())
        } else {
            warn!("Role {} lacks permission {}:{}", role, resource, action);
            Err(ApiError::forbidden(format!("Missing required permission: {}:{}", resource, action)))
        }
    }

    /// Resource-level check. `owners` lists the users who own the resource.
    pub fn authorize(&self, claims: &Claims, resource: &str, action: &str, owners: &[&str]) -> ApiResult<()> {
        let context = PermissionContext {
            user_id: &claims.sub,
            owners: owners.to_vec(),
        };
        let allowed = self
            .permissions_for(claims.role)
            .iter()
            .any(|p| p.matches(resource, action) && p.evaluate_conditions(&context));

        if allowed {
            Ok(())
        } else {
            warn!("User {} denied {}:{}", claims.sub, resource, action);
            Err(ApiError::forbidden(format!("Not allowed to {} this {}", action, resource.trim_end_matches('s'))))
        }
    }

    /// Which report rows the caller may see
    pub fn report_scope(&self, claims: &Claims) -> ReportScope {
        match claims.role {
            UserRole::Admin => ReportScope::All,
            UserRole::Instructor => ReportScope::Instructor(claims.sub.clone()),
            UserRole::Learner => ReportScope::Learner(claims.sub.clone()),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(sub: &str, role: UserRole) -> Claims {
        Claims::new(sub.to_string(), role, Vec::new(), Duration::hours(1))
    }

    #[test]
    fn test_inheritance() {
        let rbac = RbacService::new();
        assert!(rbac.has_permission(UserRole::Instructor, "progress", "update"));
        assert!(rbac.has_permission(UserRole::Admin, "anything", "at_all"));
        assert!(!rbac.has_permission(UserRole::Learner, "courses", "create"));
        assert!(!rbac.has_permission(UserRole::Learner, "reports", "export"));
        assert!(rbac.check(UserRole::Learner, "reports", "export").is_err());
    }

    #[test]
    fn test_resolved_permissions_are_cached() {
        let rbac = RbacService::new();
        let first = rbac.permissions_for(UserRole::Instructor);
        let second = rbac.permissions_for(UserRole::Instructor);
        assert!(Arc::ptr_eq(&first, &second));
        rbac.clear_cache();
        assert!(!Arc::ptr_eq(&first, &rbac.permissions_for(UserRole::Instructor)));
    }

    #[test]
    fn test_instructor_ownership() {
        let rbac = RbacService::new();
        let ian = claims("ian", UserRole::Instructor);
        assert!(rbac.authorize(&ian, "courses", "update", &["ian"]).is_ok());
        assert!(rbac.authorize(&ian, "courses", "update", &["ivy"]).is_err());
        assert!(rbac.authorize(&claims("root", UserRole::Admin), "courses", "update", &["ivy"]).is_ok());
    }

    #[test]
    fn test_learner_owns_own_enrollments() {
        let rbac = RbacService::new();
        let ada = claims("ada", UserRole::Learner);
        assert!(rbac.authorize(&ada, "enrollments", "delete", &["ada", "ian"]).is_ok());
        assert!(rbac.authorize(&ada, "enrollments", "delete", &["grace", "ian"]).is_err());
    }

    #[test]
    fn test_report_scope() {
        let rbac = RbacService::new();
        assert_eq!(rbac.report_scope(&claims("a", UserRole::Admin)), ReportScope::All);
        assert_eq!(rbac.report_scope(&claims("i", UserRole::Instructor)), ReportScope::Instructor("i".into()));
        assert_eq!(rbac.report_scope(&claims("l", UserRole::Learner)), ReportScope::Learner("l".into()));
    }
}
