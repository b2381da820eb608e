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
use crate::api::models::{DeleteOffsetsRequest, EditOffsetsRequest, OffsetsResponse};
use crate::envelope::ErrorEnvelope;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, patch};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{instrument, warn};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/clusters/{cluster_name}/consumer-groups/{group_id}",
            patch(edit_offsets),
        )
        .route(
            "/api/clusters/{cluster_name}/consumer-groups/{group_id}/offsets",
            delete(delete_offsets),
        )
        .with_state(state)
}

#[instrument(skip_all, fields(cluster_name = %cluster_name, group_id = %group_id))]
async fn edit_offsets(
    State(state): State<Arc<AppState>>,
    Path((cluster_name, group_id)): Path<(String, String)>,
    request: Result<Json<EditOffsetsRequest>, JsonRejection>,
) -> Result<Json<OffsetsResponse>, ErrorEnvelope> {
    let Json(request) =
        request.map_err(|rejection| invalid_body(rejection, &cluster_name, &group_id))?;
    if request.topics.is_empty() {
        return Err(empty_topics(&cluster_name, &group_id));
    }

    let topics = request.topics.into_iter().map(Into::into).collect();
    let response = state
        .kafka
        .edit_consumer_group_offsets(&state.context(), &cluster_name, &group_id, topics)
        .await?;

    let failed = response.failed_partitions();
    if !failed.is_empty() {
        warn!(
            "Offset commit for group: {group_id} on cluster: {cluster_name} rejected {} partition(s): {failed:?}",
            failed.len()
        );
    }
    Ok(Json(response.into()))
}

#[instrument(skip_all, fields(cluster_name = %cluster_name, group_id = %group_id))]
async fn delete_offsets(
    State(state): State<Arc<AppState>>,
    Path((cluster_name, group_id)): Path<(String, String)>,
    request: Result<Json<DeleteOffsetsRequest>, JsonRejection>,
) -> Result<Json<OffsetsResponse>, ErrorEnvelope> {
    let Json(request) =
        request.map_err(|rejection| invalid_body(rejection, &cluster_name, &group_id))?;
    if request.topics.is_empty() {
        return Err(empty_topics(&cluster_name, &group_id));
    }

    let topics = request.topics.into_iter().map(Into::into).collect();
    let response = state
        .kafka
        .delete_consumer_group_offsets(&state.context(), &cluster_name, &group_id, topics)
        .await?;

    if response.error_code != 0 || !response.failed_partitions().is_empty() {
        warn!(
            "Offset delete for group: {group_id} on cluster: {cluster_name} returned group error code: {}, failed partitions: {:?}",
            response.error_code,
            response.failed_partitions()
        );
    }
    Ok(Json(response.into()))
}

fn empty_topics(cluster_name: &str, group_id: &str) -> ErrorEnvelope {
    ErrorEnvelope::bad_request("no topics given", "At least one topic must be specified")
        .with_field("cluster_name", cluster_name)
        .with_field("group_id", group_id)
        .silent()
}

fn invalid_body(rejection: JsonRejection, cluster_name: &str, group_id: &str) -> ErrorEnvelope {
    let message = rejection.body_text();
    ErrorEnvelope::bad_request(rejection, message)
        .with_field("cluster_name", cluster_name)
        .with_field("group_id", group_id)
        .silent()
}
