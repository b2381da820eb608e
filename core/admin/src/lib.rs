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

//! Administrative control plane for Kafka clusters and Kafka Connect clusters.
//!
//! Connector pause, resume and status go through [`connect::ConnectService`],
//! consumer group offset edits and deletes through [`kafka::KafkaService`].
//! Both resolve the target cluster by name from a [`registry::ClusterRegistry`]
//! and report failures as [`envelope::ErrorEnvelope`] values.

pub mod api;
pub mod configs;
pub mod connect;
pub mod context;
pub mod envelope;
pub mod error;
pub mod kafka;
pub mod registry;
