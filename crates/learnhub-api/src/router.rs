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

//! HTTP routing for the REST API
//!
//! Routes are kept in registration order and matched linearly: the first
//! route whose template matches the whole path and whose method matches the
//! request wins. Templates use `{name}` for a single path segment or
//! `{name:regex}` for a constrained one.

use crate::error::{ApiError, ApiResult};
use crate::middleware::{Middleware, MiddlewareRegistry};
use crate::request::{ApiRequest, METHOD_FIELD};
use crate::state::AppState;
use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Header that may carry an overridden method on POST requests
pub const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";

const DEFAULT_SEGMENT: &str = "[^/]+";

pub type HandlerResult = ApiResult<Response<Full<Bytes>>>;
pub type Handler = Arc<dyn Fn(ApiRequest, AppState) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Box an async function into a [`Handler`]
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(ApiRequest, AppState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |req, state| Box::pin(f(req, state)))
}

/// A registered route
pub struct Route {
    pub method: Method,
    pub template: String,
    regex: Regex,
    pub param_names: Vec<String>,
    pub middleware_names: Vec<String>,
    middleware: Vec<Arc<dyn Middleware>>,
    handler: Handler,
}

impl Route {
    fn accepts(&self, method: &Method) -> bool {
        self.method == method || (method == Method::HEAD && self.method == Method::GET)
    }

    fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;
        Some(
            self.param_names
                .iter()
                .filter_map(|name| captures.name(name).map(|m| (name.clone(), m.as_str().to_string())))
                .collect(),
        )
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.template)
            .field("middleware", &self.middleware_names)
            .finish()
    }
}

/// Outcome of matching a method and path against the route table
#[derive(Debug)]
pub enum RouteMatch<'r> {
    Found { route: &'r Route, params: HashMap<String, String> },
    MethodNotAllowed { allowed: Vec<String> },
    NotFound,
}

/// Ordered route table with its middleware registry
pub struct Router {
    routes: Vec<Route>,
    registry: MiddlewareRegistry,
    max_body_size: usize,
}

impl Router {
    pub fn new(registry: MiddlewareRegistry) -> Self {
        Self {
            routes: Vec::new(),
            registry,
            max_body_size: 2 * 1024 * 1024,
        }
    }

    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Register a route with its own middleware
    pub fn route(&mut self, method: Method, template: &str, middleware: &[&str], handler: Handler) -> ApiResult<()> {
        let template = normalize_path(template);
        let (regex, param_names) = compile_template(&template)?;
        let middleware_list = middleware.iter().map(|name| self.registry.resolve(name)).collect::<ApiResult<Vec<_>>>()?;

        debug!("Registered route {} {}", method, template);
        self.routes.push(Route {
            method,
            template,
            regex,
            param_names,
            middleware_names: middleware.iter().map(|s| s.to_string()).collect(),
            middleware: middleware_list,
            handler,
        });
        Ok(())
    }

    pub fn add(&mut self, method: Method, template: &str, handler: Handler) -> ApiResult<()> {
        self.route(method, template, &[], handler)
    }

    pub fn get(&mut self, template: &str, handler: Handler) -> ApiResult<()> {
        self.add(Method::GET, template, handler)
    }

    pub fn post(&mut self, template: &str, handler: Handler) -> ApiResult<()> {
        self.add(Method::POST, template, handler)
    }

    pub fn put(&mut self, template: &str, handler: Handler) -> ApiResult<()> {
        self.add(Method::PUT, template, handler)
    }

    pub fn patch(&mut self, template: &str, handler: Handler) -> ApiResult<()> {
        self.add(Method::PATCH, template, handler)
    }

    pub fn delete(&mut self, template: &str, handler: Handler) -> ApiResult<()> {
        self.add(Method::DELETE, template, handler)
    }

    /// Declare routes sharing a path prefix and middleware
    pub fn group<F>(&mut self, prefix: &str, middleware: &[&str], f: F) -> ApiResult<()>
    where
        F: FnOnce(&mut RouteGroup<'_>) -> ApiResult<()>,
    {
        let mut group = RouteGroup {
            router: self,
            prefix: prefix.trim_end_matches('/').to_string(),
            middleware: middleware.iter().map(|s| s.to_string()).collect(),
        };
        f(&mut group)
    }

    /// Match a method and raw path against the route table
    pub fn resolve(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let path = normalize_path(path);
        let mut allowed = BTreeSet::new();

        for route in &self.routes {
            let Some(params) = route.captures(&path) else {
                continue;
            };
            if route.accepts(method) {
                return RouteMatch::Found { route, params };
            }
            allowed.insert(route.method.to_string());
            if route.method == Method::GET {
                allowed.insert(Method::HEAD.to_string());
            }
        }

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed {
                allowed: allowed.into_iter().collect(),
            }
        }
    }

    /// Handle a request end to end. Errors become problem+json responses.
    pub async fn dispatch<B>(&self, req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let instance = normalize_path(req.uri().path());
        match self.try_dispatch(req, state).await {
            Ok(response) => response,
            Err(e) => e.into_response(&instance),
        }
    }

    async fn try_dispatch<B>(&self, req: Request<B>, state: &AppState) -> HandlerResult
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let body = Limited::new(body, self.max_body_size).collect().await.map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                ApiError::PayloadTooLarge {
                    message: format!("Request body exceeds {} bytes", self.max_body_size),
                }
            } else {
                ApiError::bad_request(format!("Failed to read request body: {}", e))
            }
        })?;

        let path = normalize_path(parts.uri.path());
        let mut request = ApiRequest::new(parts.method, &path, parts.uri.query(), parts.headers, body.to_bytes());
        if let Some(method) = override_method(&request) {
            info!("Method override: {} -> {} for {}", request.original_method, method, path);
            request.method = method;
        }

        let (route, params) = match self.resolve(&request.method, &path) {
            RouteMatch::Found { route, params } => (route, params),
            RouteMatch::MethodNotAllowed { allowed } => {
                return Err(ApiError::MethodNotAllowed {
                    message: format!("{} {}", request.method, path),
                    allowed,
                });
            }
            RouteMatch::NotFound => {
                warn!("Route not found: {} {}", request.method, path);
                return Err(ApiError::NotFound {
                    message: format!("Route not found: {} {}", request.method, path),
                });
            }
        };

        request.params = decode_params(params)?;

        for middleware in &route.middleware {
            middleware.handle(&mut request, state).await?;
        }

        (route.handler)(request, state.clone()).await
    }
}

/// Percent-decode captured path parameters
fn decode_params(params: HashMap<String, String>) -> ApiResult<HashMap<String, String>> {
    params
        .into_iter()
        .map(|(name, raw)| {
            let decoded = percent_encoding::percent_decode_str(&raw)
                .decode_utf8()
                .map_err(|_| ApiError::bad_request(format!("Path parameter '{}' is not valid UTF-8", name)))?
                .into_owned();
            Ok((name, decoded))
        })
        .collect()
}

/// Routes declared under a shared prefix and middleware list
pub struct RouteGroup<'r> {
    router: &'r mut Router,
    prefix: String,
    middleware: Vec<String>,
}

impl RouteGroup<'_> {
    /// Register a route; group middleware runs before the route's own
    pub fn route(&mut self, method: Method, template: &str, middleware: &[&str], handler: Handler) -> ApiResult<()> {
        let full_template = format!("{}/{}", self.prefix, template.trim_start_matches('/'));
        let names: Vec<&str> = self.middleware.iter().map(String::as_str).chain(middleware.iter().copied()).collect();
        self.router.route(method, &full_template, &names, handler)
    }

    pub fn get(&mut self, template: &str, handler: Handler) -> ApiResult<()> {
        self.route(Method::GET, template, &[], handler)
    }

    pub fn post(&mut self, template: &str, handler: Handler) -> ApiResult<()> {
        self.route(Method::POST, template, &[], handler)
    }

    pub fn put(&mut self, template: &str, handler: Handler) -> ApiResult<()> {
        self.route(Method::PUT, template, &[], handler)
    }

    pub fn patch(&mut self, template: &str, handler: Handler) -> ApiResult<()> {
        self.route(Method::PATCH, template, &[], handler)
    }

    pub fn delete(&mut self, template: &str, handler: Handler) -> ApiResult<()> {
        self.route(Method::DELETE, template, &[], handler)
    }

    /// Nested group; prefixes and middleware accumulate
    pub fn group<F>(&mut self, prefix: &str, middleware: &[&str], f: F) -> ApiResult<()>
    where
        F: FnOnce(&mut RouteGroup<'_>) -> ApiResult<()>,
    {
        let mut nested = RouteGroup {
            prefix: format!("{}/{}", self.prefix, prefix.trim_matches('/')).trim_end_matches('/').to_string(),
            middleware: self.middleware.iter().cloned().chain(middleware.iter().map(|s| s.to_string())).collect(),
            router: &mut *self.router,
        };
        f(&mut nested)
    }
}

/// Collapse repeated slashes and drop a trailing slash, keeping `/` itself
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Compile a route template into an anchored regex and its parameter names
pub fn compile_template(template: &str) -> ApiResult<(Regex, Vec<String>)> {
    let mut pattern = String::from("^");
    let mut names: Vec<String> = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices();

    while let Some((start, c)) = chars.next() {
        match c {
            '{' => {
                pattern.push_str(&regex::escape(&literal));
                literal.clear();

                // Constraints may contain their own braces, e.g. {year:\d{4}}
                let mut depth = 1;
                let mut end = None;
                for (i, inner) in chars.by_ref() {
                    match inner {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(i);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let end = end.ok_or_else(|| ApiError::RouterError(format!("Unbalanced '{{' in route template '{}'", template)))?;
                let placeholder = &template[start + 1..end];
                let (name, constraint) = match placeholder.split_once(':') {
                    Some((name, constraint)) => (name, constraint),
                    None => (placeholder, DEFAULT_SEGMENT),
                };

                if !is_identifier(name) {
                    return Err(ApiError::RouterError(format!("Invalid parameter name '{}' in route template '{}'", name, template)));
                }
                if names.iter().any(|n| n == name) {
                    return Err(ApiError::RouterError(format!("Duplicate parameter '{}' in route template '{}'", name, template)));
                }
                if constraint.is_empty() {
                    return Err(ApiError::RouterError(format!("Empty constraint for '{}' in route template '{}'", name, template)));
                }

                pattern.push_str(&format!("(?P<{}>{})", name, constraint));
                names.push(name.to_string());
            }
            '}' => {
                return Err(ApiError::RouterError(format!("Unbalanced '}}' in route template '{}'", template)));
            }
            other => literal.push(other),
        }
    }

    pattern.push_str(&regex::escape(&literal));
    pattern.push('$');
    Ok((Regex::new(&pattern)?, names))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Effective method of a POST carrying `_method` or the override header
fn override_method(req: &ApiRequest) -> Option<Method> {
    if req.original_method != Method::POST {
        return None;
    }
    let requested = req
        .form
        .get(METHOD_FIELD)
        .map(String::as_str)
        .or_else(|| req.headers.get(METHOD_OVERRIDE_HEADER).and_then(|v| v.to_str().ok()))?;

    match requested.trim().to_ascii_uppercase().as_str() {
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}
