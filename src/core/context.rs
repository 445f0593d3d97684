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

use crate::core::config::config::{load_default, Configuration};
use crate::core::engine::Engine;
use crate::core::model::error::ClientError;
use crate::core::plugin::connector::Connector;

/// SDKContext owns the configuration and the engine built from it. APIs share
/// one context through `Arc` so they see the same cache and breakers.
pub struct SDKContext {
    cfg: Arc<Configuration>,
    engine: Engine,
}

impl SDKContext {
    // default loads configuration from the environment / working directory
    pub fn default(connector: Arc<dyn Connector>) -> Result<SDKContext, ClientError> {
        let cfg = load_default()?;
        Self::create_by_configuration(cfg, connector)
    }

    // create_by_configuration
    pub fn create_by_configuration(
        cfg: Configuration,
        connector: Arc<dyn Connector>,
    ) -> Result<SDKContext, ClientError> {
        let cfg = Arc::new(cfg);
        let engine = Engine::new(cfg.clone(), connector)?;
        tracing::info!(
            "[resilient][context] context created, cache ttl {:?}, load balancer {}",
            cfg.global.local_cache.cache_ttl,
            cfg.consumer.load_balancer.default_policy
        );
        Ok(Self { cfg, engine })
    }

    pub fn get_engine(&self) -> &Engine {
        &self.engine
    }

    pub fn get_config(&self) -> Arc<Configuration> {
        self.cfg.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::SDKContext;
    use crate::core::config::config::Configuration;
    use crate::core::model::error::ErrorCode;
    use crate::plugins::connector::memory::memory::MemoryConnector;

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let mut conf = Configuration::default();
        conf.consumer.circuit_breaker.failure_threshold = 0;
        let ret = SDKContext::create_by_configuration(conf, Arc::new(MemoryConnector::new()));
        assert_eq!(ret.err().map(|e| e.code()), Some(ErrorCode::InvalidConfig));
    }

    #[test]
    fn test_context_exposes_configuration() {
        let ctx =
            SDKContext::create_by_configuration(Configuration::default(), Arc::new(MemoryConnector::new()))
                .unwrap();
        assert_eq!(ctx.get_config().consumer.circuit_breaker.failure_threshold, 5);
        assert!(ctx.get_engine().get_extensions().get_circuit_breaker().is_some());
    }
}
