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

use super::{ConnectClient, ConnectClientError, ConnectorStatus};
use crate::context::RequestContext;
use crate::envelope::{ClusterNotFound, ErrorEnvelope};
use crate::registry::{ClusterHandle, ClusterRegistry};
use std::sync::Arc;
use tracing::debug;

const CLUSTER_NOT_FOUND_MESSAGE: &str =
    "There's no configured cluster with the given connect cluster name";

/// Connector administration across every configured Kafka Connect cluster.
#[derive(Debug, Clone)]
pub struct ConnectService {
    clusters: Arc<ClusterRegistry<dyn ConnectClient>>,
}

impl ConnectService {
    pub fn new(clusters: Arc<ClusterRegistry<dyn ConnectClient>>) -> Self {
        Self { clusters }
    }

    pub fn cluster_names(&self) -> Vec<&str> {
        self.clusters.names()
    }

    /// Pauses the connector and its tasks.
    ///
    /// A successful return means the Connect leader accepted the request, the
    /// tasks reach `PAUSED` later. Poll [`ConnectService::connector_status`]
    /// to observe the transition.
    pub async fn pause_connector(
        &self,
        ctx: &RequestContext,
        cluster_name: &str,
        connector: &str,
    ) -> Result<(), ErrorEnvelope> {
        let cluster = self.resolve(cluster_name, connector)?;
        debug!("Pausing connector: {connector} on Kafka Connect cluster: {cluster_name}");
        cluster
            .client()
            .pause_connector(ctx, connector)
            .await
            .map_err(|error| {
                remote_error(error, "Failed to pause connector", cluster_name, connector)
            })
    }

    /// Resumes a paused connector. Same acceptance semantics as pausing.
    pub async fn resume_connector(
        &self,
        ctx: &RequestContext,
        cluster_name: &str,
        connector: &str,
    ) -> Result<(), ErrorEnvelope> {
        let cluster = self.resolve(cluster_name, connector)?;
        debug!("Resuming connector: {connector} on Kafka Connect cluster: {cluster_name}");
        cluster
            .client()
            .resume_connector(ctx, connector)
            .await
            .map_err(|error| {
                remote_error(error, "Failed to resume connector", cluster_name, connector)
            })
    }

    pub async fn connector_status(
        &self,
        ctx: &RequestContext,
        cluster_name: &str,
        connector: &str,
    ) -> Result<ConnectorStatus, ErrorEnvelope> {
        let cluster = self.resolve(cluster_name, connector)?;
        cluster
            .client()
            .connector_status(ctx, connector)
            .await
            .map_err(|error| {
                remote_error(
                    error,
                    "Failed to get connector status",
                    cluster_name,
                    connector,
                )
            })
    }

    fn resolve(
        &self,
        cluster_name: &str,
        connector: &str,
    ) -> Result<&ClusterHandle<dyn ConnectClient>, ErrorEnvelope> {
        self.clusters.resolve(cluster_name).ok_or_else(|| {
            ErrorEnvelope::not_found(ClusterNotFound, CLUSTER_NOT_FOUND_MESSAGE)
                .with_field("cluster_name", cluster_name)
                .with_field("connector", connector)
        })
    }
}

fn remote_error(
    error: ConnectClientError,
    action: &str,
    cluster_name: &str,
    connector: &str,
) -> ErrorEnvelope {
    let message = format!("{action}: {error}");
    ErrorEnvelope::service_unavailable(error, message)
        .with_field("cluster_name", cluster_name)
        .with_field("connector", connector)
}
