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

//! HTTP server

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::middleware::LoggingLayer;
use crate::router::{METHOD_OVERRIDE_HEADER, Router};
use crate::routes::build_router;
use crate::state::AppState;
use hyper::body::Incoming;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::{ServiceBuilder, service_fn};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

pub struct ApiServer {
    config: Arc<Config>,
    bind_address: SocketAddr,
    router: Arc<Router>,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server
    pub async fn new(config: Config) -> ApiResult<Self> {
        // Parse bind address
        let bind_address: SocketAddr = config.bind_address.parse().map_err(|e| ApiError::BadRequest {
            message: format!("Invalid bind address: {}", e),
        })?;

        let router = Arc::new(build_router(&config)?);
        let state = AppState::from_config(config).await?;

        info!("API server created with {} routes", router.routes().len());

        Ok(Self {
            config: state.config.clone(),
            bind_address,
            router,
            state,
        })
    }

    /// Get the bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    fn cors_layer(&self) -> Option<CorsLayer> {
        if !self.config.cors_enabled {
            return None;
        }

        let origins: Vec<HeaderValue> = self
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();

        Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE, HeaderName::from_static(METHOD_OVERRIDE_HEADER)]),
        )
    }

    /// Start the server
    pub async fn run(self) -> ApiResult<()> {
        // Create TCP listener
        let listener = TcpListener::bind(self.bind_address).await.map_err(ApiError::IoError)?;

        info!("LearnHub API listening on http://{}", self.bind_address);
        if self.config.openapi_enabled {
            info!("OpenAPI document available at http://{}/openapi.json", self.bind_address);
        }

        let cors = self.cors_layer();

        // Accept connections
        loop {
            let (stream, remote_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let router = self.router.clone();
            let state = self.state.clone();
            let cors = cors.clone();

            // Spawn a task to handle the connection
            tokio::task::spawn(async move {
                let service = ServiceBuilder::new()
                    .layer(LoggingLayer::new())
                    .option_layer(cors)
                    .service(service_fn(move |req: Request<Incoming>| {
                        let router = router.clone();
                        let state = state.clone();
                        async move { Ok::<_, Infallible>(router.dispatch(req, &state).await) }
                    }));

                // Serve the connection
                if let Err(err) = http1::Builder::new().serve_connection(io, TowerToHyperService::new(service)).await {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}
