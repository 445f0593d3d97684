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

use serde::Deserialize;

use crate::core::model::loadbalance::{
    LOAD_BALANCE_LEAST_CONNECTIONS, LOAD_BALANCE_RANDOM, LOAD_BALANCE_ROUND_ROBIN,
    LOAD_BALANCE_WEIGHTED_RANDOM, LOAD_BALANCE_WEIGHTED_ROUND_ROBIN,
};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ConsumerConfig {
    pub load_balancer: LoadBalancerConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub health_filter: HealthFilterConfig,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum LoadBalancePolicy {
    #[default]
    RoundRobin,
    WeightedRoundRobin,
    Random,
    WeightedRandom,
    LeastConnections,
}

impl LoadBalancePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBalancePolicy::RoundRobin => LOAD_BALANCE_ROUND_ROBIN,
            LoadBalancePolicy::WeightedRoundRobin => LOAD_BALANCE_WEIGHTED_ROUND_ROBIN,
            LoadBalancePolicy::Random => LOAD_BALANCE_RANDOM,
            LoadBalancePolicy::WeightedRandom => LOAD_BALANCE_WEIGHTED_RANDOM,
            LoadBalancePolicy::LeastConnections => LOAD_BALANCE_LEAST_CONNECTIONS,
        }
    }
}

impl Display for LoadBalancePolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LoadBalancerConfig {
    pub default_policy: LoadBalancePolicy,
}

/// BreakerGranularity what one breaker guards
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum BreakerGranularity {
    #[default]
    PerService,
    PerInstance,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CircuitBreakerConfig {
    pub enable: bool,
    pub granularity: BreakerGranularity,
    // consecutive failures in closed state that open the breaker
    pub failure_threshold: u32,
    // consecutive successes in half-open state that close the breaker
    pub success_threshold: u32,
    #[serde(with = "humantime_serde")]
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enable: true,
            granularity: BreakerGranularity::PerService,
            failure_threshold: 5,
            success_threshold: 3,
            open_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct HealthFilterConfig {
    // recover_all keeps every instance when none is reported healthy
    pub recover_all: bool,
}

impl Default for HealthFilterConfig {
    fn default() -> Self {
        Self { recover_all: true }
    }
}
