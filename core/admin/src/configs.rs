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

use crate::error::AdminRuntimeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub http: HttpApiConfig,
    pub kafka: KafkaConfig,
    pub connect: ConnectConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpApiConfig {
    pub address: String,
    pub request_timeout: String,
    pub cors: Option<HttpCorsConfig>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct HttpCorsConfig {
    pub enabled: bool,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub connect_timeout: String,
    pub clusters: Vec<KafkaClusterConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KafkaClusterConfig {
    pub name: String,
    pub brokers: Vec<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectConfig {
    pub request_timeout: String,
    pub clusters: Vec<ConnectClusterConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectClusterConfig {
    pub name: String,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub tls: Option<ConnectTlsConfig>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct ConnectTlsConfig {
    pub enabled: bool,
    pub insecure_skip_verify: bool,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8080".to_owned(),
            request_timeout: "30s".to_owned(),
            cors: None,
        }
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            connect_timeout: "10s".to_owned(),
            clusters: Vec::new(),
        }
    }
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            request_timeout: "60s".to_owned(),
            clusters: Vec::new(),
        }
    }
}

pub fn parse_duration(setting: &str, value: &str) -> Result<Duration, AdminRuntimeError> {
    humantime::parse_duration(value).map_err(|error| {
        AdminRuntimeError::InvalidConfiguration(format!(
            "invalid duration '{value}' for '{setting}': {error}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_deserialize_toml_with_defaults() {
        let config: AdminConfig = toml_config(
            r#"
            [kafka]
            clusters = [{ name = "prod", brokers = ["kafka-0:9092", "kafka-1:9092"] }]

            [[connect.clusters]]
            name = "prod"
            url = "http://connect:8083"
            username = "admin"
            password = "secret"
            "#,
        );

        assert_eq!(config.http.address, "localhost:8080");
        assert_eq!(config.http.request_timeout, "30s");
        assert_eq!(config.kafka.connect_timeout, "10s");
        assert_eq!(config.kafka.clusters[0].brokers.len(), 2);
        assert_eq!(config.kafka.clusters[0].client_id, None);
        assert_eq!(config.connect.clusters[0].username.as_deref(), Some("admin"));
        assert!(config.connect.clusters[0].tls.is_none());
    }

    #[test]
    fn should_parse_humantime_durations() {
        assert_eq!(
            parse_duration("http.request_timeout", "1m 30s").unwrap(),
            Duration::from_secs(90)
        );
        assert!(matches!(
            parse_duration("http.request_timeout", "soon"),
            Err(AdminRuntimeError::InvalidConfiguration(_))
        ));
    }

    fn toml_config(content: &str) -> AdminConfig {
        config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
