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
    BrokerClient, BrokerClientError, OffsetCommitPartitionResponse, OffsetCommitRequest,
    OffsetCommitResponse, OffsetCommitTopicResponse, OffsetDeletePartitionResponse,
    OffsetDeleteRequest, OffsetDeleteResponse, OffsetDeleteTopicResponse,
};
use crate::configs::KafkaClusterConfig;
use crate::context::RequestContext;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use kafka_protocol::messages::offset_commit_request::{
    OffsetCommitRequestPartition, OffsetCommitRequestTopic,
};
use kafka_protocol::messages::offset_delete_request::{
    OffsetDeleteRequestPartition, OffsetDeleteRequestTopic,
};
use kafka_protocol::messages::{self, FindCoordinatorRequest, GroupId, RequestHeader, ResponseHeader, TopicName};
use kafka_protocol::protocol::{Decodable, Encodable, HeaderVersion, Request, StrBytes};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

const FIND_COORDINATOR_VERSION: i16 = 2;
const OFFSET_COMMIT_VERSION: i16 = 7;
const OFFSET_DELETE_VERSION: i16 = 0;
const GROUP_KEY_TYPE: i8 = 0;
const MAX_RESPONSE_SIZE: usize = 100 * 1024 * 1024;
const DEFAULT_CLIENT_ID: &str = "kafka-admin";

/// Kafka client speaking the wire protocol to one cluster.
///
/// Group requests have to reach the group coordinator, so every call first
/// asks the bootstrap brokers for it and then talks to the coordinator over a
/// fresh connection.
#[derive(Debug)]
pub struct TcpBrokerClient {
    bootstrap_brokers: Vec<String>,
    client_id: StrBytes,
    connect_timeout: Duration,
    correlation_id: AtomicI32,
}

impl TcpBrokerClient {
    pub fn new(config: &KafkaClusterConfig, connect_timeout: Duration) -> Self {
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_owned());
        info!(
            "Created Kafka client for cluster: {} with bootstrap brokers: {}",
            config.name,
            config.brokers.join(",")
        );
        Self {
            bootstrap_brokers: config.brokers.clone(),
            client_id: StrBytes::from_string(client_id),
            connect_timeout,
            correlation_id: AtomicI32::new(1),
        }
    }

    async fn find_coordinator(
        &self,
        ctx: &RequestContext,
        group: &str,
    ) -> Result<String, BrokerClientError> {
        let request = FindCoordinatorRequest::default()
            .with_key(StrBytes::from_string(group.to_owned()))
            .with_key_type(GROUP_KEY_TYPE);

        for broker in &self.bootstrap_brokers {
            match self
                .send(ctx, broker, FIND_COORDINATOR_VERSION, &request)
                .await
            {
                Ok(response) => {
                    if response.error_code != 0 {
                        return Err(BrokerClientError::Coordinator {
                            group: group.to_owned(),
                            error_code: response.error_code,
                        });
                    }
                    let address = broker_address(&text(&response.host), response.port);
                    debug!("Found coordinator: {address} for group: {group}");
                    return Ok(address);
                }
                Err(BrokerClientError::Context(error)) => return Err(error.into()),
                Err(error) => {
                    warn!("Failed to find coordinator for group: {group} via broker: {broker}. {error}");
                }
            }
        }

        Err(BrokerClientError::NoBrokersAvailable)
    }

    async fn send<Req>(
        &self,
        ctx: &RequestContext,
        address: &str,
        version: i16,
        request: &Req,
    ) -> Result<Req::Response, BrokerClientError>
    where
        Req: Request + Encodable + HeaderVersion,
        Req::Response: Decodable + HeaderVersion,
    {
        let correlation_id = self.correlation_id.fetch_add(1, Ordering::Relaxed);
        let header = RequestHeader::default()
            .with_request_api_key(Req::KEY)
            .with_request_api_version(version)
            .with_correlation_id(correlation_id)
            .with_client_id(Some(self.client_id.clone()));

        let mut body = BytesMut::new();
        header
            .encode(&mut body, Req::header_version(version))
            .map_err(protocol_error)?;
        request.encode(&mut body, version).map_err(protocol_error)?;

        let payload = ctx
            .run(self.round_trip(address, body.freeze()))
            .await??;
        let mut payload = Bytes::from(payload);

        let header = ResponseHeader::decode(
            &mut payload,
            <Req::Response as HeaderVersion>::header_version(version),
        )
        .map_err(protocol_error)?;
        if header.correlation_id != correlation_id {
            return Err(BrokerClientError::CorrelationMismatch {
                expected: correlation_id,
                received: header.correlation_id,
            });
        }

        Req::Response::decode(&mut payload, version).map_err(protocol_error)
    }

    async fn round_trip(&self, address: &str, body: Bytes) -> Result<Vec<u8>, BrokerClientError> {
        let mut stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connection to {address} timed out"),
                )
            })??;
        stream.set_nodelay(true)?;

        let size = i32::try_from(body.len())
            .map_err(|_| BrokerClientError::Protocol("request too large".to_owned()))?;
        stream.write_all(&size.to_be_bytes()).await?;
        stream.write_all(&body).await?;
        stream.flush().await?;

        let size = stream.read_i32().await?;
        let size = usize::try_from(size)
            .map_err(|_| BrokerClientError::Protocol(format!("invalid response size: {size}")))?;
        if size > MAX_RESPONSE_SIZE {
            return Err(BrokerClientError::ResponseTooLarge {
                size,
                limit: MAX_RESPONSE_SIZE,
            });
        }
        let mut payload = vec![0; size];
        stream.read_exact(&mut payload).await?;
        Ok(payload)
    }
}

#[async_trait]
impl BrokerClient for TcpBrokerClient {
    async fn send_offset_commit_request(
        &self,
        ctx: &RequestContext,
        request: OffsetCommitRequest,
    ) -> Result<OffsetCommitResponse, BrokerClientError> {
        let mut requested_offsets = HashMap::new();
        let topics = request
            .topics
            .iter()
            .map(|topic| {
                let partitions = topic
                    .partitions
                    .iter()
                    .map(|partition| {
                        requested_offsets
                            .insert((topic.topic.clone(), partition.partition), partition.offset);
                        OffsetCommitRequestPartition::default()
                            .with_partition_index(partition.partition)
                            .with_committed_offset(partition.offset)
                            .with_committed_leader_epoch(partition.leader_epoch.unwrap_or(-1))
                            .with_committed_metadata(
                                partition.metadata.clone().map(StrBytes::from_string),
                            )
                    })
                    .collect();
                OffsetCommitRequestTopic::default()
                    .with_name(topic_name(&topic.topic))
                    .with_partitions(partitions)
            })
            .collect();
        let wire_request = messages::OffsetCommitRequest::default()
            .with_group_id(GroupId(StrBytes::from_string(request.group.clone())))
            .with_topics(topics);

        let coordinator = self.find_coordinator(ctx, &request.group).await?;
        let response = self
            .send(ctx, &coordinator, OFFSET_COMMIT_VERSION, &wire_request)
            .await?;

        let OffsetCommitRequest {
            group,
            topics: requested_topics,
        } = request;
        Ok(OffsetCommitResponse {
            group,
            throttle_time_ms: response.throttle_time_ms,
            topics: response
                .topics
                .into_iter()
                .enumerate()
                .map(|(topic_position, topic)| {
                    let name = text(&topic.name.0);
                    let requested = requested_topics
                        .get(topic_position)
                        .filter(|requested| requested.topic == name);
                    OffsetCommitTopicResponse {
                        partitions: topic
                            .partitions
                            .into_iter()
                            .enumerate()
                            .map(|(position, partition)| {
                                // Brokers answer in request order, the map only covers reordering.
                                let offset = requested
                                    .and_then(|requested| requested.partitions.get(position))
                                    .filter(|requested| {
                                        requested.partition == partition.partition_index
                                    })
                                    .map(|requested| requested.offset)
                                    .or_else(|| {
                                        requested_offsets
                                            .get(&(name.clone(), partition.partition_index))
                                            .copied()
                                    })
                                    .unwrap_or(-1);
                                OffsetCommitPartitionResponse {
                                    partition: partition.partition_index,
                                    offset,
                                    error_code: partition.error_code,
                                }
                            })
                            .collect(),
                        topic: name,
                    }
                })
                .collect(),
        })
    }

    async fn send_offset_delete_request(
        &self,
        ctx: &RequestContext,
        request: OffsetDeleteRequest,
    ) -> Result<OffsetDeleteResponse, BrokerClientError> {
        let topics = request
            .topics
            .iter()
            .map(|topic| {
                OffsetDeleteRequestTopic::default()
                    .with_name(topic_name(&topic.topic))
                    .with_partitions(
                        topic
                            .partitions
                            .iter()
                            .map(|partition| {
                                OffsetDeleteRequestPartition::default()
                                    .with_partition_index(*partition)
                            })
                            .collect(),
                    )
            })
            .collect();
        let wire_request = messages::OffsetDeleteRequest::default()
            .with_group_id(GroupId(StrBytes::from_string(request.group.clone())))
            .with_topics(topics);

        let coordinator = self.find_coordinator(ctx, &request.group).await?;
        let response = self
            .send(ctx, &coordinator, OFFSET_DELETE_VERSION, &wire_request)
            .await?;

        Ok(OffsetDeleteResponse {
            group: request.group,
            error_code: response.error_code,
            throttle_time_ms: response.throttle_time_ms,
            topics: response
                .topics
                .into_iter()
                .map(|topic| OffsetDeleteTopicResponse {
                    topic: text(&topic.name.0),
                    partitions: topic
                        .partitions
                        .into_iter()
                        .map(|partition| OffsetDeletePartitionResponse {
                            partition: partition.partition_index,
                            error_code: partition.error_code,
                        })
                        .collect(),
                })
                .collect(),
        })
    }
}

fn protocol_error(error: impl std::fmt::Display) -> BrokerClientError {
    BrokerClientError::Protocol(error.to_string())
}

fn topic_name(name: &str) -> TopicName {
    TopicName(StrBytes::from_string(name.to_owned()))
}

fn text(value: &StrBytes) -> String {
    String::from(&**value)
}

fn broker_address(host: &str, port: i32) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::{OffsetCommitPartition, OffsetCommitTopic, OffsetDeleteTopic};
    use kafka_protocol::messages::find_coordinator_response::FindCoordinatorResponse;
    use kafka_protocol::messages::offset_commit_response::{
        OffsetCommitResponsePartition, OffsetCommitResponseTopic,
    };
    use kafka_protocol::messages::offset_delete_response::{
        OffsetDeleteResponsePartition, OffsetDeleteResponseTopic,
    };
    use kafka_protocol::messages::{ApiKey, BrokerId};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    const UNKNOWN_TOPIC_OR_PARTITION: i16 = 3;
    const COORDINATOR_NOT_AVAILABLE: i16 = 15;
    const GROUP_SUBSCRIBED_TO_TOPIC: i16 = 86;

    #[derive(Debug, Default)]
    struct Seen {
        api_keys: Vec<i16>,
        client_ids: Vec<String>,
        commit_groups: Vec<String>,
    }

    /// Minimal coordinator: answers FindCoordinator with its own address and
    /// echoes offset commits and deletes.
    async fn fake_broker() -> (String, Arc<Mutex<Seen>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Seen::default()));
        let state = seen.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let state = state.clone();
                tokio::spawn(async move {
                    handle_connection(stream, address.port() as i32, state).await;
                });
            }
        });
        (address.to_string(), seen)
    }

    async fn handle_connection(mut stream: TcpStream, port: i32, seen: Arc<Mutex<Seen>>) {
        while let Ok(size) = stream.read_i32().await {
            let mut payload = vec![0; size as usize];
            stream.read_exact(&mut payload).await.unwrap();
            let api_key = i16::from_be_bytes([payload[0], payload[1]]);
            let version = i16::from_be_bytes([payload[2], payload[3]]);
            let mut payload = Bytes::from(payload);

            let mut body = BytesMut::new();
            match ApiKey::try_from(api_key).unwrap() {
                ApiKey::FindCoordinator => {
                    let header = RequestHeader::decode(
                        &mut payload,
                        FindCoordinatorRequest::header_version(version),
                    )
                    .unwrap();
                    let request = FindCoordinatorRequest::decode(&mut payload, version).unwrap();
                    record(&seen, api_key, &header);
                    let error_code = if &*request.key == "no-coordinator" {
                        COORDINATOR_NOT_AVAILABLE
                    } else {
                        0
                    };
                    let response = FindCoordinatorResponse::default()
                        .with_error_code(error_code)
                        .with_node_id(BrokerId(1))
                        .with_host(StrBytes::from_static_str("127.0.0.1"))
                        .with_port(port);
                    write_header::<FindCoordinatorResponse>(&mut body, &header, version);
                    response.encode(&mut body, version).unwrap();
                }
                ApiKey::OffsetCommit => {
                    let header = RequestHeader::decode(
                        &mut payload,
                        messages::OffsetCommitRequest::header_version(version),
                    )
                    .unwrap();
                    let request =
                        messages::OffsetCommitRequest::decode(&mut payload, version).unwrap();
                    record(&seen, api_key, &header);
                    seen.lock()
                        .unwrap()
                        .commit_groups
                        .push(text(&request.group_id.0));
                    let response = messages::OffsetCommitResponse::default().with_topics(
                        request
                            .topics
                            .iter()
                            .map(|topic| {
                                OffsetCommitResponseTopic::default()
                                    .with_name(topic.name.clone())
                                    .with_partitions(
                                        topic
                                            .partitions
                                            .iter()
                                            .map(|partition| {
                                                let error_code = if partition.partition_index == 99 {
                                                    UNKNOWN_TOPIC_OR_PARTITION
                                                } else {
                                                    0
                                                };
                                                OffsetCommitResponsePartition::default()
                                                    .with_partition_index(partition.partition_index)
                                                    .with_error_code(error_code)
                                            })
                                            .collect(),
                                    )
                            })
                            .collect(),
                    );
                    let mut header = header;
                    if &*request.group_id.0 == "bad-correlation" {
                        header.correlation_id += 1000;
                    }
                    write_header::<messages::OffsetCommitResponse>(&mut body, &header, version);
                    response.encode(&mut body, version).unwrap();
                }
                ApiKey::OffsetDelete => {
                    let header = RequestHeader::decode(
                        &mut payload,
                        messages::OffsetDeleteRequest::header_version(version),
                    )
                    .unwrap();
                    let request =
                        messages::OffsetDeleteRequest::decode(&mut payload, version).unwrap();
                    record(&seen, api_key, &header);
                    let response = messages::OffsetDeleteResponse::default()
                        .with_error_code(0)
                        .with_topics(
                            request
                                .topics
                                .iter()
                                .map(|topic| {
                                    OffsetDeleteResponseTopic::default()
                                        .with_name(topic.name.clone())
                                        .with_partitions(
                                            topic
                                                .partitions
                                                .iter()
                                                .map(|partition| {
                                                    OffsetDeleteResponsePartition::default()
                                                        .with_partition_index(
                                                            partition.partition_index,
                                                        )
                                                        .with_error_code(GROUP_SUBSCRIBED_TO_TOPIC)
                                                })
                                                .collect(),
                                        )
                                })
                                .collect(),
                        );
                    write_header::<messages::OffsetDeleteResponse>(&mut body, &header, version);
                    response.encode(&mut body, version).unwrap();
                }
                other => panic!("unexpected API key: {other:?}"),
            }

            stream
                .write_all(&(body.len() as i32).to_be_bytes())
                .await
                .unwrap();
            stream.write_all(&body).await.unwrap();
        }
    }

    fn record(seen: &Arc<Mutex<Seen>>, api_key: i16, header: &RequestHeader) {
        let mut seen = seen.lock().unwrap();
        seen.api_keys.push(api_key);
        if let Some(client_id) = &header.client_id {
            seen.client_ids.push(text(client_id));
        }
    }

    fn write_header<Resp: HeaderVersion>(body: &mut BytesMut, request: &RequestHeader, version: i16) {
        ResponseHeader::default()
            .with_correlation_id(request.correlation_id)
            .encode(body, Resp::header_version(version))
            .unwrap();
    }

    fn client(brokers: Vec<String>) -> TcpBrokerClient {
        TcpBrokerClient::new(
            &KafkaClusterConfig {
                name: "local".to_owned(),
                brokers,
                client_id: Some("admin-tests".to_owned()),
            },
            Duration::from_secs(2),
        )
    }

    fn commit(group: &str, partitions: &[(i32, i64)]) -> OffsetCommitRequest {
        OffsetCommitRequest {
            group: group.to_owned(),
            topics: vec![OffsetCommitTopic {
                topic: "orders".to_owned(),
                partitions: partitions
                    .iter()
                    .map(|(partition, offset)| OffsetCommitPartition {
                        partition: *partition,
                        offset: *offset,
                        leader_epoch: None,
                        metadata: Some("reset by admin".to_owned()),
                    })
                    .collect(),
            }],
        }
    }

    #[tokio::test]
    async fn should_commit_offsets_via_coordinator() {
        let (address, seen) = fake_broker().await;
        let client = client(vec![address]);

        let response = client
            .send_offset_commit_request(&RequestContext::background(), commit("g1", &[(0, 5), (99, 7)]))
            .await
            .unwrap();

        assert_eq!(response.group, "g1");
        assert_eq!(response.topics.len(), 1);
        assert_eq!(response.topics[0].topic, "orders");
        assert_eq!(response.topics[0].partitions[0].offset, 5);
        assert_eq!(response.topics[0].partitions[0].error_code, 0);
        assert_eq!(
            response.topics[0].partitions[1].error_code,
            UNKNOWN_TOPIC_OR_PARTITION
        );
        assert_eq!(response.failed_partitions().len(), 1);

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.api_keys,
            vec![ApiKey::FindCoordinator as i16, ApiKey::OffsetCommit as i16]
        );
        assert_eq!(seen.commit_groups, vec!["g1".to_owned()]);
        assert!(seen.client_ids.iter().all(|id| id == "admin-tests"));
    }

    #[tokio::test]
    async fn should_report_each_requested_offset_for_repeated_partitions() {
        let (address, _) = fake_broker().await;
        let client = client(vec![address]);

        let response = client
            .send_offset_commit_request(
                &RequestContext::background(),
                commit("g1", &[(0, 5), (1, 3), (0, 9)]),
            )
            .await
            .unwrap();

        let offsets = response.topics[0]
            .partitions
            .iter()
            .map(|partition| (partition.partition, partition.offset))
            .collect::<Vec<_>>();
        assert_eq!(offsets, vec![(0, 5), (1, 3), (0, 9)]);
    }

    #[tokio::test]
    async fn should_delete_offsets_via_coordinator() {
        let (address, _) = fake_broker().await;
        let client = client(vec![address]);

        let response = client
            .send_offset_delete_request(
                &RequestContext::background(),
                OffsetDeleteRequest {
                    group: "g1".to_owned(),
                    topics: vec![OffsetDeleteTopic {
                        topic: "orders".to_owned(),
                        partitions: vec![0, 1],
                    }],
                },
            )
            .await
            .unwrap();

        assert_eq!(response.group, "g1");
        assert_eq!(response.error_code, 0);
        assert_eq!(response.topics[0].partitions.len(), 2);
        assert_eq!(response.failed_partitions().len(), 2);
    }

    #[tokio::test]
    async fn should_skip_unreachable_bootstrap_broker() {
        let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let unreachable = unused.local_addr().unwrap().to_string();
        drop(unused);
        let (address, _) = fake_broker().await;
        let client = client(vec![unreachable, address]);

        let response = client
            .send_offset_commit_request(&RequestContext::background(), commit("g1", &[(0, 1)]))
            .await
            .unwrap();

        assert_eq!(response.topics[0].partitions[0].offset, 1);
    }

    #[tokio::test]
    async fn should_fail_when_no_broker_is_reachable() {
        let client = client(vec![]);

        let error = client
            .send_offset_commit_request(&RequestContext::background(), commit("g1", &[(0, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(error, BrokerClientError::NoBrokersAvailable));
    }

    #[tokio::test]
    async fn should_fail_on_coordinator_error() {
        let (address, _) = fake_broker().await;
        let client = client(vec![address]);

        let error = client
            .send_offset_commit_request(
                &RequestContext::background(),
                commit("no-coordinator", &[(0, 1)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            BrokerClientError::Coordinator {
                error_code: COORDINATOR_NOT_AVAILABLE,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn should_detect_correlation_mismatch() {
        let (address, _) = fake_broker().await;
        let client = client(vec![address]);

        let error = client
            .send_offset_commit_request(
                &RequestContext::background(),
                commit("bad-correlation", &[(0, 1)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, BrokerClientError::CorrelationMismatch { .. }));
    }

    #[tokio::test]
    async fn should_abort_on_cancelled_context() {
        let (address, seen) = fake_broker().await;
        let client = client(vec![address]);
        let (_tx, rx) = tokio::sync::watch::channel(true);
        let ctx = RequestContext::background().with_cancellation(rx);

        let error = client
            .send_offset_commit_request(&ctx, commit("g1", &[(0, 1)]))
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "context canceled");
        assert!(seen.lock().unwrap().api_keys.is_empty());
    }

    #[test]
    fn should_bracket_ipv6_coordinator_hosts() {
        assert_eq!(broker_address("::1", 9092), "[::1]:9092");
        assert_eq!(broker_address("kafka-0.internal", 9092), "kafka-0.internal:9092");
    }
}
