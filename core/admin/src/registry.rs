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

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("cluster name cannot be empty")]
    EmptyClusterName,
    #[error("cluster '{0}' is configured more than once")]
    DuplicateCluster(String),
}

/// A cluster name bound to the client that talks to that cluster.
pub struct ClusterHandle<C: ?Sized> {
    name: String,
    client: Arc<C>,
}

impl<C: ?Sized> ClusterHandle<C> {
    pub fn new(name: impl Into<String>, client: Arc<C>) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: ?Sized> fmt::Debug for ClusterHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Read-only lookup of cluster handles by name, built once at startup.
pub struct ClusterRegistry<C: ?Sized> {
    clusters: HashMap<String, ClusterHandle<C>>,
}

impl<C: ?Sized> ClusterRegistry<C> {
    pub fn new(handles: Vec<ClusterHandle<C>>) -> Result<Self, RegistryError> {
        let mut clusters = HashMap::with_capacity(handles.len());
        for handle in handles {
            if handle.name.trim().is_empty() {
                return Err(RegistryError::EmptyClusterName);
            }
            match clusters.entry(handle.name.clone()) {
                Entry::Occupied(entry) => {
                    return Err(RegistryError::DuplicateCluster(entry.key().to_owned()));
                }
                Entry::Vacant(entry) => {
                    entry.insert(handle);
                }
            }
        }
        Ok(Self { clusters })
    }

    pub fn empty() -> Self {
        Self {
            clusters: HashMap::new(),
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&ClusterHandle<C>> {
        self.clusters.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names = self
            .clusters
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

impl<C: ?Sized> fmt::Debug for ClusterRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterRegistry")
            .field("clusters", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str, client: u32) -> ClusterHandle<u32> {
        ClusterHandle::new(name, Arc::new(client))
    }

    #[test]
    fn should_resolve_existing_cluster() {
        let registry = ClusterRegistry::new(vec![handle("prod", 1), handle("staging", 2)]).unwrap();

        let resolved = registry.resolve("staging").unwrap();
        assert_eq!(resolved.name(), "staging");
        assert_eq!(*resolved.client(), 2);
    }

    #[test]
    fn should_return_none_for_unknown_cluster() {
        let registry = ClusterRegistry::new(vec![handle("prod", 1)]).unwrap();

        assert!(registry.resolve("dev").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn should_reject_duplicate_cluster_names() {
        let result = ClusterRegistry::new(vec![handle("prod", 1), handle("prod", 2)]);

        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicateCluster("prod".to_owned())
        );
    }

    #[test]
    fn should_reject_empty_cluster_name() {
        let result = ClusterRegistry::new(vec![handle("  ", 1)]);

        assert_eq!(result.unwrap_err(), RegistryError::EmptyClusterName);
    }

    #[test]
    fn should_list_names_sorted() {
        let registry = ClusterRegistry::new(vec![
            handle("staging", 1),
            handle("dev", 2),
            handle("prod", 3),
        ])
        .unwrap();

        assert_eq!(registry.names(), vec!["dev", "prod", "staging"]);
        assert_eq!(registry.len(), 3);
        assert!(ClusterRegistry::<u32>::empty().is_empty());
    }
}
