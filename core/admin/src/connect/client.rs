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
use crate::configs::ConnectClusterConfig;
use crate::context::RequestContext;
use crate::error::AdminRuntimeError;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct ConnectErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
enum Auth {
    None,
    Basic { username: String, password: String },
    Bearer(String),
}

/// REST client for a single Kafka Connect cluster.
#[derive(Debug, Clone)]
pub struct HttpConnectClient {
    client: Client,
    base_url: Url,
    auth: Auth,
}

impl HttpConnectClient {
    pub fn new(config: &ConnectClusterConfig, timeout: Duration) -> Result<Self, AdminRuntimeError> {
        let base_url = Url::parse(&config.url).map_err(|error| {
            AdminRuntimeError::InvalidConfiguration(format!(
                "invalid URL '{}' for Kafka Connect cluster '{}': {error}",
                config.url, config.name
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AdminRuntimeError::InvalidConfiguration(format!(
                "URL '{}' for Kafka Connect cluster '{}' cannot be used as a base URL",
                config.url, config.name
            )));
        }

        let mut builder = Client::builder().timeout(timeout);
        if let Some(tls) = &config.tls {
            if tls.enabled && tls.insecure_skip_verify {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }
        let client = builder.build().map_err(|error| {
            AdminRuntimeError::InvalidConfiguration(format!(
                "failed to build HTTP client for Kafka Connect cluster '{}': {error}",
                config.name
            ))
        })?;

        let auth = match (&config.token, &config.username) {
            (Some(token), _) if !token.is_empty() => Auth::Bearer(token.to_owned()),
            (_, Some(username)) if !username.is_empty() => Auth::Basic {
                username: username.to_owned(),
                password: config.password.clone().unwrap_or_default(),
            },
            _ => Auth::None,
        };

        info!(
            "Created Kafka Connect client for cluster: {} at: {}",
            config.name, base_url
        );
        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    fn connector_url(&self, connector: &str, action: Option<&str>) -> Result<Url, ConnectClientError> {
        // Dot segments would be normalized away and address another resource.
        if matches!(connector, "" | "." | "..") {
            return Err(ConnectClientError::InvalidConnectorName(connector.to_owned()));
        }

        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ConnectClientError::InvalidConnectorName(connector.to_owned()))?;
            segments.pop_if_empty().push("connectors").push(connector);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth {
            Auth::None => builder,
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::Bearer(token) => builder.bearer_auth(token),
        }
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: Url,
    ) -> Result<Response, ConnectClientError> {
        debug!("Sending {method} request to Kafka Connect: {url}");
        let response = ctx.run(self.request(method, url).send()).await??;
        Ok(response)
    }

    async fn put_state_change(
        &self,
        ctx: &RequestContext,
        connector: &str,
        action: &str,
    ) -> Result<(), ConnectClientError> {
        let url = self.connector_url(connector, Some(action))?;
        let response = self.send(ctx, Method::PUT, url).await?;
        if response.status() == StatusCode::ACCEPTED {
            return Ok(());
        }
        Err(rest_error(ctx, response).await)
    }
}

async fn rest_error(ctx: &RequestContext, response: Response) -> ConnectClientError {
    let status = response.status();
    let body = ctx
        .run(response.text())
        .await
        .ok()
        .and_then(Result::ok)
        .unwrap_or_default();
    let message = serde_json::from_str::<ConnectErrorBody>(&body)
        .map(|body| body.message)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                format!("unexpected response status: {status}")
            } else {
                format!("unexpected response status: {status}, body: {body}")
            }
        });
    ConnectClientError::Rest {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl ConnectClient for HttpConnectClient {
    async fn pause_connector(
        &self,
        ctx: &RequestContext,
        connector: &str,
    ) -> Result<(), ConnectClientError> {
        self.put_state_change(ctx, connector, "pause").await
    }

    async fn resume_connector(
        &self,
        ctx: &RequestContext,
        connector: &str,
    ) -> Result<(), ConnectClientError> {
        self.put_state_change(ctx, connector, "resume").await
    }

    async fn connector_status(
        &self,
        ctx: &RequestContext,
        connector: &str,
    ) -> Result<ConnectorStatus, ConnectClientError> {
        let url = self.connector_url(connector, Some("status"))?;
        let response = self.send(ctx, Method::GET, url).await?;
        if !response.status().is_success() {
            return Err(rest_error(ctx, response).await);
        }
        let status = ctx.run(response.json::<ConnectorStatus>()).await??;
        Ok(status)
    }
}
