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
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::core::model::error::{ClientError, ErrorCode};
use crate::core::model::naming::{Instance, InstanceRequest, InstanceResponse};
use crate::core::plugin::connector::Connector;
use crate::core::plugin::plugins::Plugin;

/// MemoryConnector an in-process discovery backend.
///
/// `set_available(false)` makes every call fail with `NetworkError`, which is
/// how backend outages are simulated.
pub struct MemoryConnector {
    services: RwLock<HashMap<String, Vec<Instance>>>,
    available: AtomicBool,
    fetch_count: AtomicU64,
    fetch_delay: Option<Duration>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            fetch_count: AtomicU64::new(0),
            fetch_delay: None,
        }
    }

    /// with_fetch_delay makes every fetch take `delay` before answering
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// fetch_count number of fetch_instances calls received so far
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// add_instance upserts `instance` under its service, matched by id
    pub fn add_instance(&self, instance: Instance) -> bool {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        let instances = services.entry(instance.service.clone()).or_default();
        match instances.iter_mut().find(|ins| ins.id == instance.id) {
            Some(exist) => {
                *exist = instance;
                true
            }
            None => {
                instances.push(instance);
                false
            }
        }
    }

    fn check_available(&self, action: &str) -> Result<(), ClientError> {
        if self.available.load(Ordering::SeqCst) {
            return Ok(());
        }
        Err(ClientError::new(
            ErrorCode::NetworkError,
            format!("{} failed: discovery backend unreachable", action),
        ))
    }
}

impl Plugin for MemoryConnector {
    fn name(&self) -> String {
        "memory".to_string()
    }
}

#[async_trait::async_trait]
impl Connector for MemoryConnector {
    async fn fetch_instances(&self, service: &str) -> Result<Vec<Instance>, ClientError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available("fetch_instances")?;
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        Ok(services.get(service).cloned().unwrap_or_default())
    }

    async fn register_instance(
        &self,
        req: InstanceRequest,
    ) -> Result<InstanceResponse, ClientError> {
        self.check_available("register_instance")?;
        let id = req.instance.id.clone();
        if self.add_instance(req.instance) {
            return Ok(InstanceResponse::exist_resource(id));
        }
        Ok(InstanceResponse::success(id))
    }

    async fn deregister_instance(&self, req: InstanceRequest) -> Result<(), ClientError> {
        self.check_available("deregister_instance")?;
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        let instances = services.get_mut(&req.instance.service);
        let removed = match instances {
            Some(instances) => {
                let before = instances.len();
                instances.retain(|ins| ins.id != req.instance.id);
                before != instances.len()
            }
            None => false,
        };
        if !removed {
            return Err(ClientError::new(
                ErrorCode::InstanceNotFound,
                format!(
                    "instance {} of service {} not found",
                    req.instance.id, req.instance.service
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryConnector;
    use crate::core::model::error::ErrorCode;
    use crate::core::model::naming::{Instance, InstanceRequest};
    use crate::core::plugin::connector::Connector;

    fn request(id: &str, port: u32) -> InstanceRequest {
        InstanceRequest {
            flow_id: "flow".to_string(),
            instance: Instance {
                id: id.to_string(),
                service: "orders".to_string(),
                host: "10.0.0.1".to_string(),
                port,
                healthy: true,
                ..Instance::default()
            },
        }
    }

    #[tokio::test]
    async fn test_register_upserts_by_id() {
        let connector = MemoryConnector::new();
        let rsp = connector.register_instance(request("a", 80)).await.unwrap();
        assert!(!rsp.exist);
        assert_eq!(rsp.instance_id, "a");

        let rsp = connector.register_instance(request("a", 81)).await.unwrap();
        assert!(rsp.exist);

        let instances = connector.fetch_instances("orders").await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].port, 81);
    }

    #[tokio::test]
    async fn test_deregister() {
        let connector = MemoryConnector::new();
        connector.register_instance(request("a", 80)).await.unwrap();
        connector.deregister_instance(request("a", 80)).await.unwrap();
        assert!(connector.fetch_instances("orders").await.unwrap().is_empty());

        let err = connector.deregister_instance(request("a", 80)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InstanceNotFound);
    }

    #[tokio::test]
    async fn test_unavailable_backend() {
        let connector = MemoryConnector::new();
        connector.set_available(false);
        let err = connector.fetch_instances("orders").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NetworkError);
        assert_eq!(connector.fetch_count(), 1);

        let err = connector.register_instance(request("a", 80)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NetworkError);
    }
}
