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

use std::fmt::{self, Display};
use std::time::Duration;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status {
    Closed,
    HalfOpen,
    Open,
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Closed => write!(f, "closed"),
            Status::HalfOpen => write!(f, "half-open"),
            Status::Open => write!(f, "open"),
        }
    }
}

/// CircuitBreakerStatus point-in-time view of one breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerStatus {
    // key of the breaker this status belongs to
    pub circuit_breaker: String,
    pub status: Status,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    // time spent in the current status
    pub since: Duration,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RetStatus {
    RetSuccess,
    RetFail,
}

pub struct ResourceStat {
    pub resource: Resource,
    pub delay: Duration,
    pub status: RetStatus,
}

/// Resource what a breaker protects: a whole service or a single instance of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    ServiceResource(ServiceResource),
    InstanceResource(InstanceResource),
}

impl Resource {
    pub fn service(service: &str) -> Self {
        Resource::ServiceResource(ServiceResource::new(service.to_string()))
    }

    pub fn instance(service: &str, instance_id: &str) -> Self {
        Resource::InstanceResource(InstanceResource::new(
            service.to_string(),
            instance_id.to_string(),
        ))
    }

    /// key the breaker key; instance keys are `service#instance_id`
    pub fn key(&self) -> String {
        match self {
            Resource::ServiceResource(r) => r.service.clone(),
            Resource::InstanceResource(r) => format!("{}#{}", r.service, r.instance_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResource {
    pub service: String,
}

impl ServiceResource {
    pub fn new(service: String) -> Self {
        ServiceResource { service }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceResource {
    pub service: String,
    pub instance_id: String,
}

impl InstanceResource {
    pub fn new(service: String, instance_id: String) -> Self {
        InstanceResource {
            service,
            instance_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub pass: bool,
    pub rule_name: String,
    pub status: Status,
}

impl CheckResult {
    pub fn pass() -> CheckResult {
        Self {
            pass: true,
            rule_name: "".to_string(),
            status: Status::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Resource;

    #[test]
    fn test_resource_keys() {
        assert_eq!(Resource::service("orders").key(), "orders");
        assert_eq!(Resource::instance("orders", "a-1").key(), "orders#a-1");
    }
}
