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

//! Middleware for the LearnHub API
//!
//! Per-route middleware is resolved by name from a [`MiddlewareRegistry`]
//! when routes are registered (`auth`, `role:admin,instructor`,
//! `permission:courses:update`, `json`). Connection-wide concerns such as
//! request logging are tower layers.

use crate::auth::extract_token_from_header;
use crate::error::{ApiError, ApiResult};
use crate::rbac::{Permission, role_includes};
use crate::request::ApiRequest;
use crate::state::AppState;
use async_trait::async_trait;
use hyper::{Method, Request, Response, header};
use learnhub_core::models::UserRole;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{debug, error, info};

/// A step in a route's pipeline. Returning an error short-circuits the request.
#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, req: &mut ApiRequest, state: &AppState) -> ApiResult<()>;
}

/// Requires a valid bearer token and stores its claims on the request
pub struct AuthMiddleware;

#[async_trait]
impl Middleware for AuthMiddleware {
    fn name(&self) -> &str {
        "auth"
    }

    async fn handle(&self, req: &mut ApiRequest, state: &AppState) -> ApiResult<()> {
        let auth_header = req.headers.get(header::AUTHORIZATION).ok_or_else(|| ApiError::Unauthorized {
            message: "No authentication information found".to_string(),
        })?;
        let auth_str = auth_header.to_str().map_err(|_| ApiError::Unauthorized {
            message: "Invalid authorization header encoding".to_string(),
        })?;

        let token = extract_token_from_header(auth_str)?;
        let claims = state.auth.validate_token(token)?;
        debug!("Authenticated {} as {}", claims.sub, claims.role);
        req.claims = Some(claims);
        Ok(())
    }
}

/// Caller must hold one of the roles, directly or by inheritance
pub struct RoleMiddleware {
    name: String,
    roles: Vec<UserRole>,
}

impl RoleMiddleware {
    pub fn parse(argument: &str) -> ApiResult<Self> {
        let roles = argument
            .split(',')
            .map(|r| r.parse::<UserRole>().map_err(|e| ApiError::RouterError(e.to_string())))
            .collect::<ApiResult<Vec<_>>>()?;
        Ok(Self {
            name: format!("role:{}", argument),
            roles,
        })
    }
}

#[async_trait]
impl Middleware for RoleMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, req: &mut ApiRequest, _state: &AppState) -> ApiResult<()> {
        let claims = req.claims()?;
        if self.roles.iter().any(|required| role_includes(claims.role, *required)) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("Role {} may not access this resource", claims.role)))
        }
    }
}

/// Caller's role must grant `resource:action`
pub struct PermissionMiddleware {
    name: String,
    permission: Permission,
}

impl PermissionMiddleware {
    pub fn parse(argument: &str) -> ApiResult<Self> {
        Ok(Self {
            name: format!("permission:{}", argument),
            permission: Permission::parse(argument)?,
        })
    }
}

#[async_trait]
impl Middleware for PermissionMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, req: &mut ApiRequest, state: &AppState) -> ApiResult<()> {
        let claims = req.claims()?;
        state.rbac.check(claims.role, &self.permission.resource, &self.permission.action)
    }
}

/// Bodies of mutating requests must be JSON or a urlencoded form
pub struct JsonMiddleware;

#[async_trait]
impl Middleware for JsonMiddleware {
    fn name(&self) -> &str {
        "json"
    }

    async fn handle(&self, req: &mut ApiRequest, _state: &AppState) -> ApiResult<()> {
        let mutating = matches!(req.original_method, Method::POST | Method::PUT | Method::PATCH);
        if mutating && !req.body.is_empty() && !req.is_json() && !req.is_form() {
            return Err(ApiError::UnsupportedMediaType {
                message: "Expected application/json or application/x-www-form-urlencoded".to_string(),
            });
        }
        Ok(())
    }
}

type MiddlewareFactory = Arc<dyn Fn(Option<&str>) -> ApiResult<Arc<dyn Middleware>> + Send + Sync>;

/// Named middleware constructors. A name may carry an argument after the
/// first colon, e.g. `role:admin`.
#[derive(Clone)]
pub struct MiddlewareRegistry {
    factories: HashMap<String, MiddlewareFactory>,
}

impl MiddlewareRegistry {
    pub fn empty() -> Self {
        Self { factories: HashMap::new() }
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(Option<&str>) -> ApiResult<Arc<dyn Middleware>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// Build the middleware for a name such as `permission:reports:read`
    pub fn resolve(&self, declaration: &str) -> ApiResult<Arc<dyn Middleware>> {
        let (name, argument) = match declaration.split_once(':') {
            Some((name, argument)) => (name, Some(argument)),
            None => (declaration, None),
        };
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ApiError::RouterError(format!("Unknown middleware '{}'", declaration)))?;
        factory(argument)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for MiddlewareRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("auth", |arg| match arg {
            None => Ok(Arc::new(AuthMiddleware) as Arc<dyn Middleware>),
            Some(_) => Err(ApiError::RouterError("'auth' takes no argument".to_string())),
        });
        registry.register("json", |arg| match arg {
            None => Ok(Arc::new(JsonMiddleware) as Arc<dyn Middleware>),
            Some(_) => Err(ApiError::RouterError("'json' takes no argument".to_string())),
        });
        registry.register("role", |arg| {
            let argument = arg.ok_or_else(|| ApiError::RouterError("'role' needs a role list".to_string()))?;
            Ok(Arc::new(RoleMiddleware::parse(argument)?) as Arc<dyn Middleware>)
        });
        registry.register("permission", |arg| {
            let argument = arg.ok_or_else(|| ApiError::RouterError("'permission' needs resource:action".to_string()))?;
            Ok(Arc::new(PermissionMiddleware::parse(argument)?) as Arc<dyn Middleware>)
        });
        registry
    }
}

/// Request logging middleware
#[derive(Clone)]
pub struct LoggingMiddleware<S> {
    inner: S,
}

impl<S> LoggingMiddleware<S> {
    /// Create a new logging middleware
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for LoggingMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Display + Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut inner = self.inner.clone();
        let method = req.method().clone();
        let uri = req.uri().clone();
        let start_time = Instant::now();

        Box::pin(async move {
            info!("Request: {} {}", method, uri);

            let result = inner.call(req).await;
            let duration = start_time.elapsed();

            match &result {
                Ok(response) => {
                    info!("Response: {} {} - {} in {:?}", method, uri, response.status(), duration);
                    metrics::increment_counter!(
                        "learnhub_http_requests_total",
                        "method" => method.to_string(),
                        "status" => response.status().as_u16().to_string()
                    );
                }
                Err(e) => {
                    error!("Error: {} {} - {} in {:?}", method, uri, e, duration);
                }
            }

            result
        })
    }
}

/// Logging middleware layer
#[derive(Debug, Clone, Default)]
pub struct LoggingLayer;

impl LoggingLayer {
    /// Create a new logging layer
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingMiddleware::new(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolves_builtin_names() {
        let registry = MiddlewareRegistry::default();
        assert_eq!(registry.resolve("auth").unwrap().name(), "auth");
        assert_eq!(registry.resolve("role:admin,instructor").unwrap().name(), "role:admin,instructor");
        assert_eq!(registry.resolve("permission:reports:export").unwrap().name(), "permission:reports:export");
    }

    #[test]
    fn test_registry_rejects_unknown_or_malformed_names() {
        let registry = MiddlewareRegistry::default();
        assert!(registry.resolve("throttle").is_err());
        assert!(registry.resolve("role:wizard").is_err());
        assert!(registry.resolve("permission:reports").is_err());
        assert!(registry.resolve("auth:strict").is_err());
    }
}
