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

use super::{
    BrokerClient, BrokerClientError, OffsetCommitRequest, OffsetCommitResponse, OffsetCommitTopic,
    OffsetDeleteRequest, OffsetDeleteResponse, OffsetDeleteTopic,
};
use crate::context::RequestContext;
use crate::envelope::{ClusterNotFound, ErrorEnvelope};
use crate::registry::{ClusterHandle, ClusterRegistry};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum OffsetError {
    #[error("a client for the given cluster name does not exist")]
    ClusterNotFound { cluster: String, group: String },
    #[error("failed to commit group offsets for group '{group}': {source}")]
    Commit {
        cluster: String,
        group: String,
        source: BrokerClientError,
    },
    #[error("failed to commit group offset delete request for group '{group}': {source}")]
    Delete {
        cluster: String,
        group: String,
        source: BrokerClientError,
    },
}

impl OffsetError {
    pub fn group(&self) -> &str {
        match self {
            OffsetError::ClusterNotFound { group, .. }
            | OffsetError::Commit { group, .. }
            | OffsetError::Delete { group, .. } => group,
        }
    }

    pub fn cluster(&self) -> &str {
        match self {
            OffsetError::ClusterNotFound { cluster, .. }
            | OffsetError::Commit { cluster, .. }
            | OffsetError::Delete { cluster, .. } => cluster,
        }
    }
}

impl From<OffsetError> for ErrorEnvelope {
    fn from(error: OffsetError) -> Self {
        let cluster = error.cluster().to_owned();
        let group = error.group().to_owned();
        let envelope = match error {
            OffsetError::ClusterNotFound { .. } => ErrorEnvelope::not_found(
                ClusterNotFound,
                "There's no configured cluster with the given Kafka cluster name",
            ),
            error => {
                let message = error.to_string();
                ErrorEnvelope::bad_gateway(error, message)
            }
        };
        envelope
            .with_field("cluster_name", cluster)
            .with_field("group_id", group)
    }
}

/// Consumer group offset administration across configured Kafka clusters.
#[derive(Debug, Clone)]
pub struct KafkaService {
    clusters: Arc<ClusterRegistry<dyn BrokerClient>>,
}

impl KafkaService {
    pub fn new(clusters: Arc<ClusterRegistry<dyn BrokerClient>>) -> Self {
        Self { clusters }
    }

    pub fn cluster_names(&self) -> Vec<&str> {
        self.clusters.names()
    }

    /// Commits the given offsets for an existing group.
    ///
    /// Per partition outcomes are returned untouched in the response.
    pub async fn edit_consumer_group_offsets(
        &self,
        ctx: &RequestContext,
        cluster_name: &str,
        group_id: &str,
        topics: Vec<OffsetCommitTopic>,
    ) -> Result<OffsetCommitResponse, OffsetError> {
        let cluster = self.resolve(cluster_name, group_id)?;
        let request = OffsetCommitRequest {
            group: group_id.to_owned(),
            topics,
        };
        debug!("Committing offsets for group: {group_id} on Kafka cluster: {cluster_name}");
        cluster
            .client()
            .send_offset_commit_request(ctx, request)
            .await
            .map_err(|source| OffsetError::Commit {
                cluster: cluster_name.to_owned(),
                group: group_id.to_owned(),
                source,
            })
    }

    pub async fn delete_consumer_group_offsets(
        &self,
        ctx: &RequestContext,
        cluster_name: &str,
        group_id: &str,
        topics: Vec<OffsetDeleteTopic>,
    ) -> Result<OffsetDeleteResponse, OffsetError> {
        let cluster = self.resolve(cluster_name, group_id)?;
        let request = OffsetDeleteRequest {
            group: group_id.to_owned(),
            topics,
        };
        debug!("Deleting offsets for group: {group_id} on Kafka cluster: {cluster_name}");
        cluster
            .client()
            .send_offset_delete_request(ctx, request)
            .await
            .map_err(|source| OffsetError::Delete {
                cluster: cluster_name.to_owned(),
                group: group_id.to_owned(),
                source,
            })
    }

    fn resolve(
        &self,
        cluster_name: &str,
        group_id: &str,
    ) -> Result<&ClusterHandle<dyn BrokerClient>, OffsetError> {
        self.clusters
            .resolve(cluster_name)
            .ok_or_else(|| OffsetError::ClusterNotFound {
                cluster: cluster_name.to_owned(),
                group: group_id.to_owned(),
            })
    }
}
