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

use crate::kafka::{
    OffsetCommitPartition, OffsetCommitResponse, OffsetCommitTopic, OffsetDeleteResponse,
    OffsetDeleteTopic,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ClustersResponse {
    pub connect: Vec<String>,
    pub kafka: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOffsetsPartition {
    pub partition_id: i32,
    pub offset: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOffsetsTopic {
    pub topic_name: String,
    pub partitions: Vec<EditOffsetsPartition>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EditOffsetsRequest {
    pub topics: Vec<EditOffsetsTopic>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOffsetsTopic {
    pub topic_name: String,
    pub partition_ids: Vec<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteOffsetsRequest {
    pub topics: Vec<DeleteOffsetsTopic>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionOutcome {
    pub partition_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub error_code: i16,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicOutcome {
    pub topic_name: String,
    pub partitions: Vec<PartitionOutcome>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetsResponse {
    pub group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i16>,
    pub topics: Vec<TopicOutcome>,
}

impl From<EditOffsetsTopic> for OffsetCommitTopic {
    fn from(topic: EditOffsetsTopic) -> Self {
        OffsetCommitTopic {
            topic: topic.topic_name,
            partitions: topic
                .partitions
                .into_iter()
                .map(|partition| OffsetCommitPartition {
                    partition: partition.partition_id,
                    offset: partition.offset,
                    leader_epoch: None,
                    metadata: None,
                })
                .collect(),
        }
    }
}

impl From<DeleteOffsetsTopic> for OffsetDeleteTopic {
    fn from(topic: DeleteOffsetsTopic) -> Self {
        OffsetDeleteTopic {
            topic: topic.topic_name,
            partitions: topic.partition_ids,
        }
    }
}

impl From<OffsetCommitResponse> for OffsetsResponse {
    fn from(response: OffsetCommitResponse) -> Self {
        OffsetsResponse {
            group_id: response.group,
            error_code: None,
            topics: response
                .topics
                .into_iter()
                .map(|topic| TopicOutcome {
                    topic_name: topic.topic,
                    partitions: topic
                        .partitions
                        .into_iter()
                        .map(|partition| PartitionOutcome {
                            partition_id: partition.partition,
                            offset: Some(partition.offset),
                            error_code: partition.error_code,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl From<OffsetDeleteResponse> for OffsetsResponse {
    fn from(response: OffsetDeleteResponse) -> Self {
        OffsetsResponse {
            group_id: response.group,
            error_code: Some(response.error_code),
            topics: response
                .topics
                .into_iter()
                .map(|topic| TopicOutcome {
                    topic_name: topic.topic,
                    partitions: topic
                        .partitions
                        .into_iter()
                        .map(|partition| PartitionOutcome {
                            partition_id: partition.partition,
                            offset: None,
                            error_code: partition.error_code,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
