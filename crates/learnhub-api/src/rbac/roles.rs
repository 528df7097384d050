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

//! Built-in roles and their grants

use super::permissions::Permission;
use learnhub_core::models::UserRole;

/// Role a role inherits from, if any
pub fn parent_role(role: UserRole) -> Option<UserRole> {
    match role {
        UserRole::Admin => Some(UserRole::Instructor),
        UserRole::Instructor => Some(UserRole::Learner),
        UserRole::Learner => None,
    }
}

/// `held` is `required` or inherits from it
pub fn role_includes(held: UserRole, required: UserRole) -> bool {
    let mut current = Some(held);
    while let Some(role) = current {
        if role == required {
            return true;
        }
        current = parent_role(role);
    }
    false
}

/// Permissions granted directly to a role, without inheritance
pub fn direct_permissions(role: UserRole) -> Vec<Permission> {
    match role {
        UserRole::Admin => vec![Permission::new("*", "*")],
        UserRole::Instructor => vec![
            Permission::new("courses", "create"),
            Permission::owned("courses", "update"),
            Permission::owned("courses", "delete"),
            Permission::owned("enrollments", "read"),
            Permission::owned("enrollments", "delete"),
            Permission::new("reports", "export"),
        ],
        UserRole::Learner => vec![
            Permission::new("courses", "read"),
            Permission::new("enrollments", "create"),
            Permission::owned("enrollments", "read"),
            Permission::owned("enrollments", "delete"),
            Permission::new("progress", "*"),
            Permission::new("reports", "read"),
        ],
    }
}
