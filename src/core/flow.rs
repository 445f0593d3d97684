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

use crate::circuitbreaker::api::InvokeHandler;
use crate::core::config::consumer::BreakerGranularity;

use super::{
    model::{
        circuitbreaker::{CheckResult, CircuitBreakerStatus, Resource, ResourceStat, Status},
        error::{CallError, ClientError, ErrorCode},
        loadbalance::Criteria,
        naming::{Instance, ServiceInstances},
    },
    plugin::{loadbalance::LoadBalancer, plugins::Extensions},
};

/// CircuitBreakerFlow adapts the breaker plugin into check / report calls.
/// With breaking disabled every check passes and reports are dropped.
pub struct CircuitBreakerFlow {
    extensions: Arc<Extensions>,
}

impl CircuitBreakerFlow {
    pub fn new(extensions: Arc<Extensions>) -> Self {
        CircuitBreakerFlow { extensions }
    }

    pub fn check_resource(&self, resource: &Resource) -> CheckResult {
        match self.extensions.get_circuit_breaker() {
            Some(circuit_breaker) => {
                CircuitBreakerFlow::convert_from_status(circuit_breaker.check_resource(resource))
            }
            None => CheckResult::pass(),
        }
    }

    /// is_available whether `resource` would be admitted now, without side effects
    pub fn is_available(&self, resource: &Resource) -> bool {
        match self.extensions.get_circuit_breaker() {
            Some(circuit_breaker) => circuit_breaker.is_available(resource),
            None => true,
        }
    }

    pub fn report_stat(&self, stat: ResourceStat) {
        if let Some(circuit_breaker) = self.extensions.get_circuit_breaker() {
            circuit_breaker.report_stat(&stat);
        }
    }

    pub fn get_status(&self, resource: &Resource) -> Option<CircuitBreakerStatus> {
        self.extensions
            .get_circuit_breaker()
            .and_then(|circuit_breaker| circuit_breaker.get_status(resource))
    }

    fn convert_from_status(ret: CircuitBreakerStatus) -> CheckResult {
        CheckResult {
            pass: ret.status != Status::Open,
            rule_name: ret.circuit_breaker,
            status: ret.status,
        }
    }
}

/// CallGuard holds a load balancer slot for one call; dropping it, including
/// when the caller's future is cancelled, ends the call.
struct CallGuard {
    load_balancer: Arc<dyn LoadBalancer>,
    instance: Instance,
}

impl CallGuard {
    fn new(load_balancer: Arc<dyn LoadBalancer>, instance: Instance) -> Self {
        load_balancer.on_call_start(&instance);
        CallGuard {
            load_balancer,
            instance,
        }
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.load_balancer.on_call_end(&self.instance);
    }
}

/// InvokeFlow resolves a service to one instance and runs the caller's
/// operation against it behind the circuit breaker.
pub struct InvokeFlow {
    extensions: Arc<Extensions>,
    circuit_breaker: Arc<CircuitBreakerFlow>,
}

impl InvokeFlow {
    pub fn new(extensions: Arc<Extensions>) -> Self {
        let circuit_breaker = Arc::new(CircuitBreakerFlow::new(extensions.clone()));
        InvokeFlow {
            extensions,
            circuit_breaker,
        }
    }

    pub fn get_circuit_breaker_flow(&self) -> Arc<CircuitBreakerFlow> {
        self.circuit_breaker.clone()
    }

    fn per_instance(&self) -> bool {
        let cb_conf = &self.extensions.conf.consumer.circuit_breaker;
        cb_conf.enable && cb_conf.granularity == BreakerGranularity::PerInstance
    }

    /// resource_of the breaker key a call to `instance` is accounted under
    pub fn resource_of(&self, instance: &Instance) -> Resource {
        if self.per_instance() {
            Resource::instance(&instance.service, &instance.id)
        } else {
            Resource::service(&instance.service)
        }
    }

    fn filter_healthy(&self, instances: ServiceInstances) -> Result<ServiceInstances, ClientError> {
        let healthy = instances.retain_instances(|ins| ins.is_available());
        if !healthy.is_empty() {
            return Ok(healthy);
        }
        if self.extensions.conf.consumer.health_filter.recover_all {
            tracing::warn!(
                "[resilient][flow] service {} has no healthy instance, recover all {} instances",
                instances.service,
                instances.len()
            );
            return Ok(instances);
        }
        Err(ClientError::no_instances(&instances.service))
    }

    fn filter_breakers(&self, instances: ServiceInstances) -> Result<ServiceInstances, ClientError> {
        let available = instances.retain_instances(|ins| {
            self.circuit_breaker
                .is_available(&Resource::instance(&ins.service, &ins.id))
        });
        if available.is_empty() {
            return Err(ClientError::new(
                ErrorCode::AllInstancesUnavailable,
                format!(
                    "all {} instances of service {} are circuit broken",
                    instances.len(),
                    instances.service
                ),
            ));
        }
        Ok(available)
    }

    /// select_instance lookup, filtering and load balancing for one call
    pub async fn select_instance(&self, service: &str) -> Result<Instance, ClientError> {
        let instances = self
            .extensions
            .get_resource_cache()
            .load_service_instances(service)
            .await?;
        if instances.is_empty() {
            return Err(ClientError::no_instances(service));
        }

        let mut candidates = self.filter_healthy(instances)?;
        if self.per_instance() {
            candidates = self.filter_breakers(candidates)?;
        }

        let instance = self
            .extensions
            .get_load_balancer()
            .choose_instance(&Criteria::new(service), &candidates)?;
        tracing::debug!(
            "[resilient][flow] service {} choose instance {} at {}",
            service,
            instance.id,
            instance.format_address()
        );
        Ok(instance)
    }

    /// execute runs `factory(base_url)` against one instance of `service`.
    ///
    /// The breaker is consulted before the operation starts; when it rejects,
    /// `factory` is never called.
    pub async fn execute<F, Fut, T, E>(&self, service: &str, factory: F) -> Result<T, CallError<E>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let instance = self.select_instance(service).await?;
        let handler = InvokeHandler::new(self.resource_of(&instance), self.circuit_breaker.clone());
        let load_balancer = self.extensions.get_load_balancer();
        let base_url = instance.base_url();

        handler
            .execute(async move {
                let _guard = CallGuard::new(load_balancer, instance);
                factory(base_url).await
            })
            .await
    }
}
