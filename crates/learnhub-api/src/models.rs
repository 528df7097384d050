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

//! Request and response bodies of the REST API

use chrono::{DateTime, NaiveDate, Utc};
use learnhub_core::models::UserSummary;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: u64,
    pub user: UserSummary,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub courses: usize,
    pub users: usize,
}

/// Enrollment request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EnrollRequest {
    /// Learner to enroll; defaults to the caller. Only staff may enroll others.
    pub user_id: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Time-on-task ping from the module player
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HeartbeatRequest {
    pub seconds: u64,
}

/// Module completion request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CompleteRequest {
    /// Quiz score between 0 and 100
    pub score: Option<f64>,
}

/// New module order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReorderRequest {
    /// Module ids first to last; form bodies send them comma-separated
    #[serde(deserialize_with = "id_list")]
    pub module_ids: Vec<String>,
}

fn id_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ids {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Ids::deserialize(deserializer)? {
        Ids::List(ids) => ids,
        Ids::Joined(joined) => joined.split(',').map(str::trim).filter(|id| !id.is_empty()).map(str::to_string).collect(),
    })
}
