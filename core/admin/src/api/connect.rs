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

use crate::api::AppState;
use crate::connect::ConnectorStatus;
use crate::envelope::ErrorEnvelope;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{info, instrument};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/kafka-connect/clusters/{cluster_name}/connectors/{connector}/pause",
            put(pause_connector),
        )
        .route(
            "/api/kafka-connect/clusters/{cluster_name}/connectors/{connector}/resume",
            put(resume_connector),
        )
        .route(
            "/api/kafka-connect/clusters/{cluster_name}/connectors/{connector}/status",
            get(get_connector_status),
        )
        .with_state(state)
}

#[instrument(skip_all, fields(cluster_name = %cluster_name, connector = %connector))]
async fn pause_connector(
    State(state): State<Arc<AppState>>,
    Path((cluster_name, connector)): Path<(String, String)>,
) -> Result<StatusCode, ErrorEnvelope> {
    state
        .connect
        .pause_connector(&state.context(), &cluster_name, &connector)
        .await?;
    info!("Requested pause of connector: {connector} on cluster: {cluster_name}");
    Ok(StatusCode::ACCEPTED)
}

#[instrument(skip_all, fields(cluster_name = %cluster_name, connector = %connector))]
async fn resume_connector(
    State(state): State<Arc<AppState>>,
    Path((cluster_name, connector)): Path<(String, String)>,
) -> Result<StatusCode, ErrorEnvelope> {
    state
        .connect
        .resume_connector(&state.context(), &cluster_name, &connector)
        .await?;
    info!("Requested resume of connector: {connector} on cluster: {cluster_name}");
    Ok(StatusCode::ACCEPTED)
}

async fn get_connector_status(
    State(state): State<Arc<AppState>>,
    Path((cluster_name, connector)): Path<(String, String)>,
) -> Result<Json<ConnectorStatus>, ErrorEnvelope> {
    let status = state
        .connect
        .connector_status(&state.context(), &cluster_name, &connector)
        .await?;
    Ok(Json(status))
}
