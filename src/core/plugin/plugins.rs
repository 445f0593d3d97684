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
use std::sync::Arc;

use crate::core::config::config::Configuration;
use crate::core::config::consumer::LoadBalancePolicy;
use crate::core::model::error::ClientError;
use crate::core::plugin::cache::ResourceCache;
use crate::core::plugin::circuitbreaker::CircuitBreaker;
use crate::core::plugin::connector::Connector;
use crate::core::plugin::loadbalance::LoadBalancer;
use crate::plugins::cache::memory::memory::MemoryCache;
use crate::plugins::circuitbreaker::errorcount::errorcount::ErrorCountCircuitBreaker;
use crate::plugins::loadbalance::leastconn::leastconn::LeastConnectionBalancer;
use crate::plugins::loadbalance::random::random::{RandomLoadBalancer, WeightRandomLoadbalancer};
use crate::plugins::loadbalance::roundrobin::roundrobin::RoundRobinBalancer;
use crate::plugins::loadbalance::weightedroundrobin::weightedroundrobin::WeightedRoundRobinBalancer;

#[derive(Debug, Eq, PartialEq, Hash)]
pub enum PluginType {
    PluginCache,
    PluginLoadBalance,
    PluginCircuitBreaker,
    PluginConnector,
}

impl Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub trait Plugin
where
    Self: Send + Sync,
{
    fn name(&self) -> String;
}

/// Extensions the component set one client runs with, built once from configuration.
#[derive(Clone)]
pub struct Extensions
where
    Self: Send + Sync,
{
    pub conf: Arc<Configuration>,
    pub server_connector: Arc<dyn Connector>,
    pub resource_cache: Arc<dyn ResourceCache>,
    pub load_balancer: Arc<dyn LoadBalancer>,
    // None when circuit breaking is disabled
    pub circuit_breaker: Option<Arc<dyn CircuitBreaker>>,
}

impl Extensions {
    pub fn build(
        conf: Arc<Configuration>,
        server_connector: Arc<dyn Connector>,
    ) -> Result<Self, ClientError> {
        conf.validate()?;

        let (lb_builder, lb_name) = load_balancer_builder(conf.consumer.load_balancer.default_policy);
        let load_balancer: Arc<dyn LoadBalancer> = Arc::from(lb_builder());

        let resource_cache: Arc<dyn ResourceCache> = Arc::new(MemoryCache::new(
            server_connector.clone(),
            conf.global.local_cache.cache_ttl,
        ));

        let cb_conf = &conf.consumer.circuit_breaker;
        let circuit_breaker: Option<Arc<dyn CircuitBreaker>> = if cb_conf.enable {
            let (cb_builder, _) = ErrorCountCircuitBreaker::builder();
            Some(Arc::from(cb_builder(cb_conf.clone())))
        } else {
            None
        };

        tracing::info!(
            "[resilient][extensions] {}={}, {}={}, {}={}, {}={:?}",
            PluginType::PluginConnector,
            server_connector.name(),
            PluginType::PluginCache,
            resource_cache.name(),
            PluginType::PluginLoadBalance,
            lb_name,
            PluginType::PluginCircuitBreaker,
            circuit_breaker.as_ref().map(|cb| cb.name()),
        );

        Ok(Self {
            conf,
            server_connector,
            resource_cache,
            load_balancer,
            circuit_breaker,
        })
    }

    pub fn get_server_connector(&self) -> Arc<dyn Connector> {
        self.server_connector.clone()
    }

    pub fn get_resource_cache(&self) -> Arc<dyn ResourceCache> {
        self.resource_cache.clone()
    }

    pub fn get_load_balancer(&self) -> Arc<dyn LoadBalancer> {
        self.load_balancer.clone()
    }

    pub fn get_circuit_breaker(&self) -> Option<Arc<dyn CircuitBreaker>> {
        self.circuit_breaker.clone()
    }
}

fn load_balancer_builder(policy: LoadBalancePolicy) -> (fn() -> Box<dyn LoadBalancer>, String) {
    match policy {
        LoadBalancePolicy::RoundRobin => RoundRobinBalancer::builder(),
        LoadBalancePolicy::WeightedRoundRobin => WeightedRoundRobinBalancer::builder(),
        LoadBalancePolicy::Random => RandomLoadBalancer::builder(),
        LoadBalancePolicy::WeightedRandom => WeightRandomLoadbalancer::builder(),
        LoadBalancePolicy::LeastConnections => LeastConnectionBalancer::builder(),
    }
}
