// Tencent is pleased to support the open source community by making Polaris available.
//
// Copyright (C) 2019 THL A29 Limited, a Tencent company. All rights reserved.
//
// Licensed under the BSD 3-Clause License (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://opensource.org/licenses/BSD-3-Clause
//
// Unless required by applicable law or agreed to in writing, software distributed
// under the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR
// CONDITIONS OF ANY KIND, either express or implied. See the License for the
// specific language governing permissions and limitations under the License.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::core::model::cache::RegistryEntry;
use crate::core::model::error::{ClientError, ErrorCode};
use crate::core::model::naming::ServiceInstances;
use crate::core::plugin::cache::ResourceCache;
use crate::core::plugin::connector::Connector;
use crate::core::plugin::plugins::Plugin;

type RefreshResult = Result<Arc<RegistryEntry>, ClientError>;

/// MemoryCache the registry cache: last known instances per service, refreshed
/// from the connector once older than the ttl.
///
/// Concurrent refreshes of one service share a single connector call; the
/// first caller drives it, the others wait on the same cell.
pub struct MemoryCache {
    connector: Arc<dyn Connector>,
    cache_ttl: Duration,
    entries: RwLock<HashMap<String, Arc<RegistryEntry>>>,
    in_flight: Mutex<HashMap<String, Arc<OnceCell<RefreshResult>>>>,
}

impl MemoryCache {
    pub fn new(connector: Arc<dyn Connector>, cache_ttl: Duration) -> Self {
        Self {
            connector,
            cache_ttl,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn get_entry(&self, service: &str) -> Option<Arc<RegistryEntry>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(service).cloned()
    }

    async fn fetch_and_store(&self, service: &str) -> RefreshResult {
        let instances = self.connector.fetch_instances(service).await?;
        let entry = Arc::new(RegistryEntry::new(service.to_string(), instances));
        tracing::debug!(
            "[resilient][registry] service {} refreshed, {} instances",
            service,
            entry.instances.len()
        );
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(service.to_string(), entry.clone());
        Ok(entry)
    }

    async fn refresh(&self, service: &str) -> RefreshResult {
        let cell = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            in_flight
                .entry(service.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let ret = cell
            .get_or_init(|| self.fetch_and_store(service))
            .await
            .clone();

        // a later refresh may already have installed a new cell
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let finished = in_flight
            .get(service)
            .map_or(false, |current| Arc::ptr_eq(current, &cell));
        if finished {
            in_flight.remove(service);
        }
        ret
    }
}

impl Plugin for MemoryCache {
    fn name(&self) -> String {
        "memory".to_string()
    }
}

#[async_trait::async_trait]
impl ResourceCache for MemoryCache {
    async fn load_service_instances(
        &self,
        service: &str,
    ) -> Result<ServiceInstances, ClientError> {
        let current = self.get_entry(service);
        if let Some(entry) = current.as_ref() {
            if !entry.is_expired(self.cache_ttl) {
                return Ok(entry.to_service_instances());
            }
        }

        match self.refresh(service).await {
            Ok(entry) => Ok(entry.to_service_instances()),
            Err(err) => match current {
                Some(entry) => {
                    tracing::warn!(
                        "[resilient][registry] refresh service {} failed: {}, serve stale instances fetched {:?} ago",
                        service,
                        err,
                        entry.age()
                    );
                    let mut instances = entry.to_service_instances();
                    instances.stale = true;
                    Ok(instances)
                }
                None => {
                    tracing::error!(
                        "[resilient][registry] refresh service {} failed and no cached instances: {}",
                        service,
                        err
                    );
                    Err(ClientError::new(
                        ErrorCode::ServiceDiscoveryUnavailable,
                        format!("discover service {} failed: {}", service, err),
                    ))
                }
            },
        }
    }

    fn invalidate(&self, service: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(service) {
            *entry = Arc::new(entry.invalidated());
        }
    }

    fn get_services(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tracing_test::traced_test;

    use super::MemoryCache;
    use crate::core::model::error::ErrorCode;
    use crate::core::model::naming::Instance;
    use crate::core::plugin::cache::ResourceCache;
    use crate::plugins::connector::memory::memory::MemoryConnector;

    const TTL: Duration = Duration::from_secs(30);

    fn instance(id: &str) -> Instance {
        Instance {
            id: id.to_string(),
            service: "orders".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            healthy: true,
            ..Instance::default()
        }
    }

    fn setup() -> (Arc<MemoryConnector>, MemoryCache) {
        let connector = Arc::new(MemoryConnector::new());
        connector.add_instance(instance("a"));
        connector.add_instance(instance("b"));
        let cache = MemoryCache::new(connector.clone(), TTL);
        (connector, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_served_without_io() {
        let (connector, cache) = setup();
        let first = cache.load_service_instances("orders").await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(connector.fetch_count(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        let second = cache.load_service_instances("orders").await.unwrap();
        assert_eq!(second.instances, first.instances);
        assert_eq!(connector.fetch_count(), 1);
        assert_eq!(cache.get_services(), vec!["orders".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_is_refreshed() {
        let (connector, cache) = setup();
        cache.load_service_instances("orders").await.unwrap();

        connector.add_instance(instance("c"));
        tokio::time::advance(Duration::from_secs(31)).await;
        let refreshed = cache.load_service_instances("orders").await.unwrap();
        assert_eq!(refreshed.len(), 3);
        assert!(!refreshed.stale);
        assert_eq!(connector.fetch_count(), 2);
    }

    #[traced_test]
    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_serves_stale() {
        let (connector, cache) = setup();
        cache.load_service_instances("orders").await.unwrap();

        connector.set_available(false);
        tokio::time::advance(Duration::from_secs(31)).await;
        let stale = cache.load_service_instances("orders").await.unwrap();
        assert!(stale.stale);
        assert_eq!(stale.len(), 2);
        assert_eq!(connector.fetch_count(), 2);
        assert!(logs_contain("serve stale instances"));

        // still stale, so every lookup retries the backend first
        cache.load_service_instances("orders").await.unwrap();
        assert_eq!(connector.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_no_entry_and_backend_down() {
        let (connector, cache) = setup();
        connector.set_available(false);
        let err = cache.load_service_instances("orders").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ServiceDiscoveryUnavailable);
    }

    #[tokio::test]
    async fn test_unknown_service_is_empty() {
        let (_, cache) = setup();
        let instances = cache.load_service_instances("users").await.unwrap();
        assert!(instances.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_is_coalesced() {
        let connector = Arc::new(MemoryConnector::new().with_fetch_delay(Duration::from_millis(100)));
        connector.add_instance(instance("a"));
        let cache = Arc::new(MemoryCache::new(connector.clone(), TTL));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.load_service_instances("orders").await })
            })
            .collect();
        for task in tasks {
            let instances = task.await.unwrap().unwrap();
            assert_eq!(instances.len(), 1);
        }
        assert_eq!(connector.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stale_refresh_is_coalesced() {
        let connector = Arc::new(MemoryConnector::new().with_fetch_delay(Duration::from_millis(100)));
        connector.add_instance(instance("a"));
        let cache = Arc::new(MemoryCache::new(connector.clone(), TTL));
        cache.load_service_instances("orders").await.unwrap();
        assert_eq!(connector.fetch_count(), 1);

        connector.add_instance(instance("b"));
        tokio::time::advance(Duration::from_secs(31)).await;
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.load_service_instances("orders").await })
            })
            .collect();
        for task in tasks {
            let instances = task.await.unwrap().unwrap();
            assert_eq!(instances.len(), 2);
            assert!(!instances.stale);
        }
        assert_eq!(connector.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let (connector, cache) = setup();
        cache.load_service_instances("orders").await.unwrap();
        cache.invalidate("orders");
        cache.invalidate("users");
        cache.load_service_instances("orders").await.unwrap();
        assert_eq!(connector.fetch_count(), 2);
        cache.load_service_instances("orders").await.unwrap();
        assert_eq!(connector.fetch_count(), 2);
    }
}
