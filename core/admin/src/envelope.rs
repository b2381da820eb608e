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

use std::error::Error as StdError;
use std::fmt;
use strum::Display;
use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Outcome class of a failed operation. The HTTP layer maps it to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    BadRequest,
    NotFound,
    BadGateway,
    ServiceUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogField {
    pub key: &'static str,
    pub value: String,
}

impl LogField {
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

impl fmt::Display for LogField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Uniform failure returned to the API layer.
///
/// Carries the original cause, the outcome class, a human readable message,
/// the diagnostic fields to log alongside it and whether logging should be
/// suppressed.
#[derive(Debug)]
pub struct ErrorEnvelope {
    pub cause: BoxError,
    pub class: ErrorClass,
    pub message: String,
    pub fields: Vec<LogField>,
    pub is_silent: bool,
}

impl ErrorEnvelope {
    pub fn new(cause: impl Into<BoxError>, class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
            class,
            message: message.into(),
            fields: Vec::new(),
            is_silent: false,
        }
    }

    pub fn not_found(cause: impl Into<BoxError>, message: impl Into<String>) -> Self {
        Self::new(cause, ErrorClass::NotFound, message)
    }

    pub fn service_unavailable(cause: impl Into<BoxError>, message: impl Into<String>) -> Self {
        Self::new(cause, ErrorClass::ServiceUnavailable, message)
    }

    pub fn bad_gateway(cause: impl Into<BoxError>, message: impl Into<String>) -> Self {
        Self::new(cause, ErrorClass::BadGateway, message)
    }

    pub fn bad_request(cause: impl Into<BoxError>, message: impl Into<String>) -> Self {
        Self::new(cause, ErrorClass::BadRequest, message)
    }

    pub fn with_field(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.fields.push(LogField::new(key, value));
        self
    }

    pub fn silent(mut self) -> Self {
        self.is_silent = true;
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| field.value.as_str())
    }

    /// Space separated `key=value` pairs, in insertion order.
    pub fn fields_display(&self) -> String {
        self.fields
            .iter()
            .map(LogField::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ErrorEnvelope {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Cause attached to envelopes produced on a registry miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a client for the given cluster name does not exist")]
pub struct ClusterNotFound;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_keep_fields_in_insertion_order() {
        let envelope = ErrorEnvelope::not_found(ClusterNotFound, "missing")
            .with_field("cluster_name", "staging")
            .with_field("connector", "x");

        assert_eq!(envelope.class, ErrorClass::NotFound);
        assert!(!envelope.is_silent);
        assert_eq!(envelope.field("cluster_name"), Some("staging"));
        assert_eq!(envelope.field("connector"), Some("x"));
        assert_eq!(envelope.field("group_id"), None);
        assert_eq!(envelope.fields_display(), "cluster_name=staging connector=x");
    }

    #[test]
    fn should_expose_cause_as_source() {
        let envelope = ErrorEnvelope::service_unavailable(ClusterNotFound, "boom");

        assert_eq!(envelope.to_string(), "boom");
        assert_eq!(
            envelope.source().map(ToString::to_string).as_deref(),
            Some("a client for the given cluster name does not exist")
        );
    }

    #[test]
    fn should_mark_envelope_silent() {
        let envelope = ErrorEnvelope::bad_gateway("remote failure", "failed").silent();

        assert!(envelope.is_silent);
        assert_eq!(envelope.class, ErrorClass::BadGateway);
        assert_eq!(envelope.cause.to_string(), "remote failure");
    }

    #[test]
    fn should_display_class_in_snake_case() {
        assert_eq!(ErrorClass::ServiceUnavailable.to_string(), "service_unavailable");
        assert_eq!(ErrorClass::NotFound.to_string(), "not_found");
    }
}
