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

use std::sync::Arc;

use super::model::naming::ServiceInstances;
use super::plugin::cache::ResourceCache;
use super::plugin::connector::Connector;
use crate::core::config::config::Configuration;
use crate::core::model::error::ClientError;
use crate::core::model::naming::InstanceRequest;
use crate::core::plugin::plugins::Extensions;
use crate::discovery::req::{
    InstanceDeregisterRequest, InstanceRegisterRequest, InstanceRegisterResponse,
};

fn flow_id_or_new(flow_id: &str) -> String {
    if flow_id.is_empty() {
        return uuid::Uuid::new_v4().to_string();
    }
    flow_id.to_string()
}

/// Engine owns the plugin set of one context and serves the discovery apis.
pub struct Engine
where
    Self: Send + Sync,
{
    extensions: Arc<Extensions>,
    local_cache: Arc<dyn ResourceCache>,
    server_connector: Arc<dyn Connector>,
}

impl Engine {
    pub fn new(
        arc_conf: Arc<Configuration>,
        server_connector: Arc<dyn Connector>,
    ) -> Result<Self, ClientError> {
        let extension = Arc::new(Extensions::build(arc_conf, server_connector)?);
        let server_connector = extension.get_server_connector();
        let local_cache = extension.get_resource_cache();

        Ok(Self {
            extensions: extension,
            local_cache,
            server_connector,
        })
    }

    /// register_instance 同步注册实例
    pub async fn register_instance(
        &self,
        req: InstanceRegisterRequest,
    ) -> Result<InstanceRegisterResponse, ClientError> {
        req.check_valid()?;
        let mut instance = req.convert_instance();
        if instance.id.is_empty() {
            instance.id = uuid::Uuid::new_v4().to_string();
        }
        let service = instance.service.clone();

        let rsp = self
            .server_connector
            .register_instance(InstanceRequest {
                flow_id: flow_id_or_new(&req.flow_id),
                instance,
            })
            .await?;

        self.local_cache.invalidate(&service);
        tracing::info!(
            "[resilient][engine] register instance {} of service {}, exist: {}",
            rsp.instance_id,
            service,
            rsp.exist
        );
        Ok(InstanceRegisterResponse {
            instance_id: rsp.instance_id,
            exist: rsp.exist,
        })
    }

    /// deregister_instance 同步注销实例
    pub async fn deregister_instance(
        &self,
        req: InstanceDeregisterRequest,
    ) -> Result<(), ClientError> {
        req.check_valid()?;
        self.server_connector
            .deregister_instance(InstanceRequest {
                flow_id: flow_id_or_new(&req.flow_id),
                instance: req.convert_instance(),
            })
            .await?;

        self.local_cache.invalidate(&req.service);
        tracing::info!(
            "[resilient][engine] deregister instance {} of service {}",
            req.id,
            req.service
        );
        Ok(())
    }

    /// get_service_instances 获取服务实例
    pub async fn get_service_instances(
        &self,
        service: &str,
        only_healthy: bool,
    ) -> Result<ServiceInstances, ClientError> {
        let instances = self.local_cache.load_service_instances(service).await?;
        if only_healthy {
            return Ok(instances.retain_instances(|ins| ins.is_available()));
        }
        Ok(instances)
    }

    pub fn get_extensions(&self) -> Arc<Extensions> {
        self.extensions.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Engine;
    use crate::core::config::config::Configuration;
    use crate::discovery::req::{InstanceDeregisterRequest, InstanceRegisterRequest};
    use crate::plugins::connector::memory::memory::MemoryConnector;

    fn register_request(id: Option<&str>) -> InstanceRegisterRequest {
        InstanceRegisterRequest {
            id: id.map(str::to_string),
            service: "orders".to_string(),
            host: "10.0.0.1".to_string(),
            port: 8080,
            healthy: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_assigns_id_and_invalidates() {
        let connector = Arc::new(MemoryConnector::new());
        let engine = Engine::new(Arc::new(Configuration::default()), connector.clone()).unwrap();
        assert!(engine.get_service_instances("orders", false).await.unwrap().is_empty());

        let rsp = engine.register_instance(register_request(None)).await.unwrap();
        assert!(uuid::Uuid::parse_str(&rsp.instance_id).is_ok());
        assert!(!rsp.exist);

        // the cached empty list was invalidated by the write
        let instances = engine.get_service_instances("orders", false).await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances.instances[0].id, rsp.instance_id);
        assert_eq!(connector.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_deregister() {
        let connector = Arc::new(MemoryConnector::new());
        let engine = Engine::new(Arc::new(Configuration::default()), connector).unwrap();
        engine.register_instance(register_request(Some("a"))).await.unwrap();
        engine.register_instance(register_request(Some("b"))).await.unwrap();
        assert_eq!(engine.get_service_instances("orders", true).await.unwrap().len(), 2);

        engine
            .deregister_instance(InstanceDeregisterRequest {
                service: "orders".to_string(),
                id: "a".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let instances = engine.get_service_instances("orders", true).await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances.instances[0].id, "b");
    }
}
