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

use crate::core::model::circuitbreaker::{CircuitBreakerStatus, Resource, ResourceStat};

use crate::core::plugin::plugins::Plugin;

pub trait CircuitBreaker: Plugin {
    /// check_resource 检查资源: gates one call attempt, an Open status rejects it
    fn check_resource(&self, resource: &Resource) -> CircuitBreakerStatus;

    /// is_available reports whether a call would currently be admitted, without
    /// changing any breaker state
    fn is_available(&self, resource: &Resource) -> bool;

    /// report_stat 上报统计信息
    fn report_stat(&self, stat: &ResourceStat);

    /// get_status snapshot of the breaker, None when the resource was never used
    fn get_status(&self, resource: &Resource) -> Option<CircuitBreakerStatus>;
}
