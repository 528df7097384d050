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

//! Configuration management for the LearnHub API server

use std::env;
use std::path::PathBuf;

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// JWT secret key for authentication
    pub jwt_secret: String,

    /// Lifetime of issued access tokens in seconds
    pub token_ttl_secs: i64,

    /// Enable CORS for web clients
    pub cors_enabled: bool,

    /// Allowed CORS origins
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// JSON snapshot loaded into the store at startup
    pub seed_path: Option<PathBuf>,

    /// Bootstrap administrator created when no account with this email exists
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,

    /// Serve the OpenAPI document
    pub openapi_enabled: bool,

    /// TrueType font embedded in PDF report exports
    pub pdf_font: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            jwt_secret: "default-secret-change-in-production".to_string(),
            token_ttl_secs: 24 * 60 * 60,
            cors_enabled: true,
            cors_origins: vec!["http://localhost:3000".to_string()],
            max_body_size: 2 * 1024 * 1024, // 2MB
            seed_path: None,
            admin_email: None,
            admin_password: None,
            openapi_enabled: true,
            pdf_font: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("LEARNHUB_BIND_ADDRESS").unwrap_or(defaults.bind_address),

            jwt_secret: env::var("LEARNHUB_JWT_SECRET").unwrap_or(defaults.jwt_secret),

            token_ttl_secs: env::var("LEARNHUB_TOKEN_TTL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.token_ttl_secs),

            cors_enabled: env::var("LEARNHUB_CORS_ENABLED").map(|v| v.parse().unwrap_or(true)).unwrap_or(true),

            cors_origins: env::var("LEARNHUB_CORS_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or(defaults.cors_origins),

            max_body_size: env::var("LEARNHUB_MAX_BODY_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.max_body_size),

            seed_path: env::var("LEARNHUB_SEED_PATH").ok().filter(|v| !v.is_empty()).map(PathBuf::from),

            admin_email: env::var("LEARNHUB_ADMIN_EMAIL").ok().filter(|v| !v.is_empty()),

            admin_password: env::var("LEARNHUB_ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),

            openapi_enabled: env::var("LEARNHUB_OPENAPI_ENABLED").map(|v| v.parse().unwrap_or(true)).unwrap_or(true),

            pdf_font: env::var("LEARNHUB_PDF_FONT").ok().filter(|v| !v.is_empty()).map(PathBuf::from),
        }
    }
}
