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

//! Authentication handlers

use crate::models::{LoginRequest, TokenResponse};
use crate::request::{ApiRequest, json_response};
use crate::router::HandlerResult;
use crate::state::AppState;
use hyper::StatusCode;
use learnhub_core::models::UserSummary;
use tracing::info;

/// Login handler
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is inactive"),
        (status = 400, description = "Bad request")
    ),
    tag = "Authentication"
)]
pub async fn login(req: ApiRequest, state: AppState) -> HandlerResult {
    info!("Processing login request");

    let login_request: LoginRequest = req.input()?;
    let token = state.auth.login(login_request).await?;

    info!("User {} authenticated successfully", token.user.id);
    json_response(StatusCode::OK, &token)
}

/// Get current user profile
/// GET /api/v1/auth/profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    responses(
        (status = 200, description = "User profile", body = UserSummary),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn profile(req: ApiRequest, state: AppState) -> HandlerResult {
    let claims = req.claims()?;
    let profile = state.auth.get_user_profile(&claims.sub).await?;
    json_response(StatusCode::OK, &profile)
}
