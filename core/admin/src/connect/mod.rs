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

use crate::configs::{ConnectConfig, parse_duration};
use crate::context::{ContextError, RequestContext};
use crate::error::AdminRuntimeError;
use crate::registry::{ClusterHandle, ClusterRegistry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::Display;
use thiserror::Error;
use tracing::info;

mod client;
mod service;

pub use client::HttpConnectClient;
pub use service::ConnectService;

pub fn init(config: &ConnectConfig) -> Result<ConnectService, AdminRuntimeError> {
    let timeout = parse_duration("connect.request_timeout", &config.request_timeout)?;
    let handles = config
        .clusters
        .iter()
        .map(|cluster| {
            let client = HttpConnectClient::new(cluster, timeout)?;
            Ok(ClusterHandle::new(
                cluster.name.to_owned(),
                Arc::new(client) as Arc<dyn ConnectClient>,
            ))
        })
        .collect::<Result<Vec<_>, AdminRuntimeError>>()?;
    let registry = ClusterRegistry::new(handles)?;
    info!(
        "Configured {} Kafka Connect cluster(s): {:?}",
        registry.len(),
        registry.names()
    );
    Ok(ConnectService::new(Arc::new(registry)))
}

#[derive(Debug, Error)]
pub enum ConnectClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Rest { status: u16, message: String },
    #[error("invalid connector name: '{0}'")]
    InvalidConnectorName(String),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Kafka Connect REST capabilities used by this service.
///
/// Pause and resume only request a state transition from the Connect leader.
/// Tasks converge to the new state asynchronously, use
/// [`ConnectClient::connector_status`] to observe that.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectClient: Send + Sync {
    async fn pause_connector(
        &self,
        ctx: &RequestContext,
        connector: &str,
    ) -> Result<(), ConnectClientError>;

    async fn resume_connector(
        &self,
        ctx: &RequestContext,
        connector: &str,
    ) -> Result<(), ConnectClientError>;

    async fn connector_status(
        &self,
        ctx: &RequestContext,
        connector: &str,
    ) -> Result<ConnectorStatus, ConnectClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ConnectorState {
    Running,
    Paused,
    Unassigned,
    Failed,
    Restarting,
    Stopped,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorStateInfo {
    pub state: ConnectorState,
    pub worker_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStateInfo {
    pub id: i32,
    pub state: ConnectorState,
    pub worker_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// Response of `GET /connectors/{name}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorStatus {
    pub name: String,
    pub connector: ConnectorStateInfo,
    #[serde(default)]
    pub tasks: Vec<TaskStateInfo>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub connector_type: Option<String>,
}

impl ConnectorStatus {
    /// True once the connector and every one of its tasks report `PAUSED`.
    pub fn is_paused(&self) -> bool {
        self.connector.state == ConnectorState::Paused
            && self
                .tasks
                .iter()
                .all(|task| task.state == ConnectorState::Paused)
    }

    pub fn is_running(&self) -> bool {
        self.connector.state == ConnectorState::Running
            && self
                .tasks
                .iter()
                .all(|task| task.state == ConnectorState::Running)
    }
}
