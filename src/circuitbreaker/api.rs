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
use std::time::Duration;

use tokio::time::Instant;

use crate::core::{
    context::SDKContext,
    flow::CircuitBreakerFlow,
    model::{
        circuitbreaker::{CheckResult, CircuitBreakerStatus, Resource, ResourceStat, RetStatus},
        error::{CallError, ClientError},
    },
};

use super::default::DefaultCircuitBreakerAPI;

/// new_circuit_breaker_api builds an api over an owned context
pub fn new_circuit_breaker_api(context: SDKContext) -> Box<dyn CircuitBreakerAPI> {
    Box::new(DefaultCircuitBreakerAPI::new_raw(context))
}

/// new_circuit_breaker_api_by_context shares `context` with other apis
pub fn new_circuit_breaker_api_by_context(context: Arc<SDKContext>) -> Box<dyn CircuitBreakerAPI> {
    Box::new(DefaultCircuitBreakerAPI::new(context))
}

pub trait CircuitBreakerAPI
where
    Self: Send + Sync,
{
    /// check_resource 检查资源是否可被调用
    fn check_resource(&self, resource: &Resource) -> CheckResult;
    /// report_stat 上报调用结果
    fn report_stat(&self, stat: ResourceStat);
    /// make_invoke_handler a handler guarding calls to `resource`
    fn make_invoke_handler(&self, resource: Resource) -> Arc<InvokeHandler>;
    /// get_status breaker snapshot, None when the resource was never called
    fn get_status(&self, resource: &Resource) -> Option<CircuitBreakerStatus>;
}

/// InvokeHandler wraps calls to one resource: permission first, outcome after.
///
/// No lock is held while the operation runs; only the permission check and
/// the outcome report touch breaker state.
pub struct InvokeHandler {
    resource: Resource,
    flow: Arc<CircuitBreakerFlow>,
}

impl InvokeHandler {
    pub fn new(resource: Resource, flow: Arc<CircuitBreakerFlow>) -> Self {
        InvokeHandler { resource, flow }
    }

    pub fn get_resource(&self) -> &Resource {
        &self.resource
    }

    /// acquire_permission 检查当前请求是否可放通
    pub fn acquire_permission(&self) -> Result<(), ClientError> {
        let ret = self.flow.check_resource(&self.resource);
        if ret.pass {
            return Ok(());
        }
        tracing::debug!(
            "[resilient][circuitbreaker] call to {} rejected, breaker {}",
            ret.rule_name,
            ret.status
        );
        Err(ClientError::circuit_open(&self.resource.key()))
    }

    pub fn on_success(&self, delay: Duration) {
        self.report(delay, RetStatus::RetSuccess);
    }

    pub fn on_error(&self, delay: Duration) {
        self.report(delay, RetStatus::RetFail);
    }

    fn report(&self, delay: Duration, status: RetStatus) {
        self.flow.report_stat(ResourceStat {
            resource: self.resource.clone(),
            delay,
            status,
        });
    }

    /// execute runs `op` when the breaker admits it and records the outcome.
    /// The operation's own error comes back untouched as `CallError::Operation`.
    pub async fn execute<Fut, T, E>(&self, op: Fut) -> Result<T, CallError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        self.acquire_permission()?;
        let start = Instant::now();
        match op.await {
            Ok(value) => {
                self.on_success(start.elapsed());
                Ok(value)
            }
            Err(err) => {
                self.on_error(start.elapsed());
                Err(CallError::Operation(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::new_circuit_breaker_api;
    use crate::core::config::config::Configuration;
    use crate::core::context::SDKContext;
    use crate::core::model::circuitbreaker::{Resource, Status};
    use crate::core::model::error::{CallError, ErrorCode};
    use crate::plugins::connector::memory::memory::MemoryConnector;

    fn api() -> Box<dyn super::CircuitBreakerAPI> {
        let mut conf = Configuration::default();
        conf.consumer.circuit_breaker.failure_threshold = 2;
        let context =
            SDKContext::create_by_configuration(conf, Arc::new(MemoryConnector::new())).unwrap();
        new_circuit_breaker_api(context)
    }

    #[tokio::test]
    async fn test_open_breaker_fails_fast() {
        let api = api();
        let handler = api.make_invoke_handler(Resource::service("orders"));
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let ret: Result<(), CallError<&str>> = handler
                .execute(async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("timeout")
                })
                .await;
            assert_eq!(ret.unwrap_err().into_operation(), Some("timeout"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let ret: Result<(), CallError<&str>> = handler
            .execute(async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        let err = ret.unwrap_err();
        assert!(err.is_circuit_open());
        assert_eq!(err.code(), Some(ErrorCode::CircuitBreakError));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let status = api.get_status(&Resource::service("orders")).unwrap();
        assert_eq!(status.status, Status::Open);
        assert!(!api.check_resource(&Resource::service("orders")).pass);
    }

    #[tokio::test]
    async fn test_success_passes_value_through() {
        let api = api();
        let handler = api.make_invoke_handler(Resource::instance("orders", "a"));
        let ret: Result<u32, CallError<String>> = handler.execute(async { Ok(7) }).await;
        assert_eq!(ret.unwrap(), 7);
        assert!(handler.acquire_permission().is_ok());
        assert_eq!(handler.get_resource().key(), "orders#a");
    }
}
