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

use std::future::Future;
use std::sync::Arc;

use crate::core::config::config::Configuration;
use crate::core::context::SDKContext;
use crate::core::flow::InvokeFlow;
use crate::core::model::circuitbreaker::{CircuitBreakerStatus, Resource};
use crate::core::model::error::{CallError, ClientError};
use crate::core::model::naming::ServiceInstances;
use crate::core::plugin::connector::Connector;

/// new_resilient_client builds a client with its own context
pub fn new_resilient_client(
    conf: Configuration,
    connector: Arc<dyn Connector>,
) -> Result<ResilientClient, ClientError> {
    let context = SDKContext::create_by_configuration(conf, connector)?;
    Ok(ResilientClient::new(Arc::new(context)))
}

/// new_resilient_client_by_context shares `context` (cache, breakers, balancer
/// state) with the discovery apis built on it
pub fn new_resilient_client_by_context(context: Arc<SDKContext>) -> ResilientClient {
    ResilientClient::new(context)
}

/// ResilientClient calls a named service through discovery, load balancing
/// and circuit breaking.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use resilient_client::client::api::new_resilient_client;
/// # use resilient_client::core::config::config::Configuration;
/// # use resilient_client::plugins::connector::memory::memory::MemoryConnector;
/// # async fn demo() {
/// let client = new_resilient_client(Configuration::default(), Arc::new(MemoryConnector::new())).unwrap();
/// let ret: Result<String, _> = client
///     .execute_request("orders", |base_url| async move {
///         Ok::<_, std::io::Error>(format!("{}/orders/42", base_url))
///     })
///     .await;
/// # }
/// ```
pub struct ResilientClient {
    context: Arc<SDKContext>,
    flow: InvokeFlow,
}

impl ResilientClient {
    pub fn new(context: Arc<SDKContext>) -> Self {
        let flow = InvokeFlow::new(context.get_engine().get_extensions());
        Self { context, flow }
    }

    /// execute_request selects an instance of `service`, asks the breaker for
    /// permission, runs `factory(base_url)` and records its outcome.
    ///
    /// Errors from `factory` come back as `CallError::Operation` unchanged;
    /// everything the client rejected is a `CallError::Client`.
    pub async fn execute_request<F, Fut, T, E>(
        &self,
        service: &str,
        factory: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.flow.execute(service, factory).await
    }

    /// get_instances the registry view of `service`, unfiltered
    pub async fn get_instances(&self, service: &str) -> Result<ServiceInstances, ClientError> {
        self.context
            .get_engine()
            .get_service_instances(service, false)
            .await
    }

    /// breaker_status snapshot of the breaker guarding `service`, or one of
    /// its instances when breaking per instance. None until the first call.
    pub fn breaker_status(
        &self,
        service: &str,
        instance_id: Option<&str>,
    ) -> Option<CircuitBreakerStatus> {
        let resource = match instance_id {
            Some(id) => Resource::instance(service, id),
            None => Resource::service(service),
        };
        self.flow.get_circuit_breaker_flow().get_status(&resource)
    }

    pub fn get_context(&self) -> Arc<SDKContext> {
        self.context.clone()
    }
}
