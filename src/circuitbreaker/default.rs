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

use crate::core::{
    context::SDKContext,
    flow::CircuitBreakerFlow,
    model::circuitbreaker::{CheckResult, CircuitBreakerStatus, Resource, ResourceStat},
};

use super::api::{CircuitBreakerAPI, InvokeHandler};

/// DefaultCircuitBreakerAPI .
pub struct DefaultCircuitBreakerAPI {
    // context keeps the engine (and its breaker registry) alive
    _context: Arc<SDKContext>,
    // flow: 熔断器流程
    flow: Arc<CircuitBreakerFlow>,
}

impl DefaultCircuitBreakerAPI {
    pub fn new_raw(context: SDKContext) -> Self {
        Self::new(Arc::new(context))
    }

    pub fn new(context: Arc<SDKContext>) -> Self {
        let extensions = context.get_engine().get_extensions();
        Self {
            _context: context,
            flow: Arc::new(CircuitBreakerFlow::new(extensions)),
        }
    }
}

impl CircuitBreakerAPI for DefaultCircuitBreakerAPI {
    fn check_resource(&self, resource: &Resource) -> CheckResult {
        self.flow.check_resource(resource)
    }

    fn report_stat(&self, stat: ResourceStat) {
        self.flow.report_stat(stat)
    }

    fn make_invoke_handler(&self, resource: Resource) -> Arc<InvokeHandler> {
        Arc::new(InvokeHandler::new(resource, self.flow.clone()))
    }

    fn get_status(&self, resource: &Resource) -> Option<CircuitBreakerStatus> {
        self.flow.get_status(resource)
    }
}
