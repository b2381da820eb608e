/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use crate::configs::{HttpApiConfig, HttpCorsConfig, parse_duration};
use crate::connect::ConnectService;
use crate::context::RequestContext;
use crate::error::AdminRuntimeError;
use crate::kafka::KafkaService;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use models::ClustersResponse;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

mod connect;
mod consumer_groups;
pub mod error;
pub mod models;

#[derive(Debug)]
pub struct AppState {
    pub connect: ConnectService,
    pub kafka: KafkaService,
    pub request_timeout: Duration,
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Context for a single API request: bounded by the request timeout and
    /// cancelled when the server shuts down.
    pub fn context(&self) -> RequestContext {
        RequestContext::background()
            .with_timeout(self.request_timeout)
            .with_cancellation(self.shutdown.clone())
    }
}

pub fn router(state: Arc<AppState>, cors: Option<&HttpCorsConfig>) -> Router {
    let mut app = Router::new()
        .route("/", get(|| async { "Kafka Admin" }))
        .route("/ping", get(|| async { "pong" }))
        .route("/health", get(|| async { "healthy" }))
        .route("/api/clusters", get(get_clusters).with_state(state.clone()))
        .merge(connect::router(state.clone()))
        .merge(consumer_groups::router(state));

    if let Some(cors) = cors.filter(|cors| cors.enabled) {
        app = app.layer(cors_layer(cors));
    }
    app.layer(TraceLayer::new_for_http())
}

pub async fn start(
    config: &HttpApiConfig,
    connect: ConnectService,
    kafka: KafkaService,
    shutdown: watch::Receiver<bool>,
) -> Result<(), AdminRuntimeError> {
    let request_timeout = parse_duration("http.request_timeout", &config.request_timeout)?;
    let state = Arc::new(AppState {
        connect,
        kafka,
        request_timeout,
        shutdown: shutdown.clone(),
    });
    let app = router(state, config.cors.as_ref());

    let listener = tokio::net::TcpListener::bind(&config.address)
        .await
        .map_err(|error| {
            error!("Failed to bind TCP listener: {:?}", error);
            AdminRuntimeError::FailedToStartHttpServer
        })?;
    info!("HTTP API listening on: {}", config.address);

    let mut shutdown = shutdown;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stopped| *stopped).await;
        })
        .await
        .map_err(|error| {
            error!("HTTP server failed: {:?}", error);
            AdminRuntimeError::FailedToStartHttpServer
        })
}

async fn get_clusters(State(state): State<Arc<AppState>>) -> Json<ClustersResponse> {
    Json(ClustersResponse {
        connect: owned(state.connect.cluster_names()),
        kafka: owned(state.kafka.cluster_names()),
    })
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(ToOwned::to_owned).collect()
}

fn cors_layer(config: &HttpCorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect::<Vec<_>>();
    layer.allow_origin(AllowOrigin::list(origins))
}
