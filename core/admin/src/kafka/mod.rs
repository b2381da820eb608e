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

use crate::configs::{KafkaConfig, parse_duration};
use crate::context::{ContextError, RequestContext};
use crate::error::AdminRuntimeError;
use crate::registry::{ClusterHandle, ClusterRegistry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

mod client;
mod service;

pub use client::TcpBrokerClient;
pub use service::{KafkaService, OffsetError};

pub fn init(config: &KafkaConfig) -> Result<KafkaService, AdminRuntimeError> {
    let connect_timeout = parse_duration("kafka.connect_timeout", &config.connect_timeout)?;
    let mut handles = Vec::with_capacity(config.clusters.len());
    for cluster in &config.clusters {
        if cluster.brokers.is_empty() {
            return Err(AdminRuntimeError::InvalidConfiguration(format!(
                "Kafka cluster '{}' has no bootstrap brokers",
                cluster.name
            )));
        }
        let client = TcpBrokerClient::new(cluster, connect_timeout);
        handles.push(ClusterHandle::new(
            cluster.name.to_owned(),
            Arc::new(client) as Arc<dyn BrokerClient>,
        ));
    }
    let registry = ClusterRegistry::new(handles)?;
    info!(
        "Configured {} Kafka cluster(s): {:?}",
        registry.len(),
        registry.names()
    );
    Ok(KafkaService::new(Arc::new(registry)))
}

#[derive(Debug, Error)]
pub enum BrokerClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("unable to find coordinator for group '{group}', error code: {error_code}")]
    Coordinator { group: String, error_code: i16 },
    #[error("correlation ID mismatch, expected: {expected}, received: {received}")]
    CorrelationMismatch { expected: i32, received: i32 },
    #[error("response of {size} bytes exceeds the limit of {limit} bytes")]
    ResponseTooLarge { size: usize, limit: usize },
    #[error("none of the bootstrap brokers is reachable")]
    NoBrokersAvailable,
    #[error(transparent)]
    Context(#[from] ContextError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetCommitPartition {
    pub partition: i32,
    pub offset: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader_epoch: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetCommitTopic {
    pub topic: String,
    pub partitions: Vec<OffsetCommitPartition>,
}

/// Group offset commit, sent to the group coordinator as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitRequest {
    pub group: String,
    pub topics: Vec<OffsetCommitTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetCommitPartitionResponse {
    pub partition: i32,
    pub offset: i64,
    pub error_code: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetCommitTopicResponse {
    pub topic: String,
    pub partitions: Vec<OffsetCommitPartitionResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetCommitResponse {
    pub group: String,
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetCommitTopicResponse>,
}

impl OffsetCommitResponse {
    /// Partitions the broker rejected. A transport level success can still
    /// carry these, inspecting them is up to the caller.
    pub fn failed_partitions(&self) -> Vec<PartitionError<'_>> {
        self.topics
            .iter()
            .flat_map(|topic| {
                topic
                    .partitions
                    .iter()
                    .filter(|partition| partition.error_code != 0)
                    .map(|partition| PartitionError {
                        topic: &topic.topic,
                        partition: partition.partition,
                        error_code: partition.error_code,
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetDeleteTopic {
    pub topic: String,
    pub partitions: Vec<i32>,
}

/// Group offset deletion, every listed partition loses its committed offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetDeleteRequest {
    pub group: String,
    pub topics: Vec<OffsetDeleteTopic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetDeletePartitionResponse {
    pub partition: i32,
    pub error_code: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetDeleteTopicResponse {
    pub topic: String,
    pub partitions: Vec<OffsetDeletePartitionResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetDeleteResponse {
    pub group: String,
    pub error_code: i16,
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetDeleteTopicResponse>,
}

impl OffsetDeleteResponse {
    pub fn failed_partitions(&self) -> Vec<PartitionError<'_>> {
        self.topics
            .iter()
            .flat_map(|topic| {
                topic
                    .partitions
                    .iter()
                    .filter(|partition| partition.error_code != 0)
                    .map(|partition| PartitionError {
                        topic: &topic.topic,
                        partition: partition.partition,
                        error_code: partition.error_code,
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionError<'a> {
    pub topic: &'a str,
    pub partition: i32,
    pub error_code: i16,
}

/// Kafka wire capabilities used for consumer group administration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn send_offset_commit_request(
        &self,
        ctx: &RequestContext,
        request: OffsetCommitRequest,
    ) -> Result<OffsetCommitResponse, BrokerClientError>;

    async fn send_offset_delete_request(
        &self,
        ctx: &RequestContext,
        request: OffsetDeleteRequest,
    ) -> Result<OffsetDeleteResponse, BrokerClientError>;
}
