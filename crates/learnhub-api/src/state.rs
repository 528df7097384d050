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

//! Shared application state

use crate::auth::{AuthService, hash_password};
use crate::config::Config;
use crate::error::ApiResult;
use crate::rbac::RbacService;
use learnhub_core::catalog::CatalogService;
use learnhub_core::enrollment::EnrollmentService;
use learnhub_core::export::ExportOptions;
use learnhub_core::models::{User, UserRole};
use learnhub_core::progress::ProgressService;
use learnhub_core::reports::ReportService;
use learnhub_core::store::{CourseStore, MemoryStore, UserStore};
use std::sync::Arc;
use tracing::info;

/// Services shared by every request; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub rbac: Arc<RbacService>,
    pub users: Arc<dyn UserStore>,
    pub courses: Arc<dyn CourseStore>,
    pub catalog: Arc<CatalogService>,
    pub enrollments: Arc<EnrollmentService>,
    pub progress: Arc<ProgressService>,
    pub reports: Arc<ReportService>,
}

impl AppState {
    /// Wire every service to one store
    pub fn new(config: Config, store: Arc<MemoryStore>) -> Self {
        let rbac = Arc::new(RbacService::new());
        let auth = Arc::new(AuthService::new(&config.jwt_secret, config.token_ttl_secs, store.clone(), rbac.clone()));
        let export_options = ExportOptions {
            pdf_font: config.pdf_font.clone(),
        };

        Self {
            config: Arc::new(config),
            auth,
            rbac,
            users: store.clone(),
            courses: store.clone(),
            catalog: Arc::new(CatalogService::new(store.clone(), store.clone(), store.clone())),
            enrollments: Arc::new(EnrollmentService::new(store.clone(), store.clone(), store.clone())),
            progress: Arc::new(ProgressService::new(store.clone(), store.clone(), store.clone())),
            reports: Arc::new(ReportService::new(store.clone(), store.clone(), store.clone(), store).with_export_options(export_options)),
        }
    }

    /// Build state from configuration, loading seed data and the bootstrap admin
    pub async fn from_config(config: Config) -> ApiResult<Self> {
        let store = match &config.seed_path {
            Some(path) => Arc::new(MemoryStore::load(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        let state = Self::new(config, store);
        state.ensure_admin().await?;
        Ok(state)
    }

    async fn ensure_admin(&self) -> ApiResult<()> {
        let (Some(email), Some(password)) = (&self.config.admin_email, &self.config.admin_password) else {
            return Ok(());
        };
        if self.users.get_user_by_email(email).await?.is_some() {
            return Ok(());
        }

        let admin = User::new(email.clone(), "Administrator".to_string(), UserRole::Admin, hash_password(password)?);
        self.users.insert_user(admin).await?;
        info!("Created bootstrap administrator {}", email);
        Ok(())
    }
}
