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

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use crate::core::{
    model::{
        error::ClientError,
        loadbalance::{Criteria, LOAD_BALANCE_LEAST_CONNECTIONS},
        naming::{Instance, ServiceInstances},
    },
    plugin::{loadbalance::LoadBalancer, plugins::Plugin},
};

/// LeastConnectionBalancer picks the instance with the fewest calls in flight.
///
/// The in-flight counters are fed by `on_call_start` / `on_call_end`, so the
/// balancer only sees calls made through the invoke flow. An instance with no
/// call in flight has no entry.
pub struct LeastConnectionBalancer {
    active: RwLock<HashMap<String, u64>>,
}

impl LeastConnectionBalancer {
    pub fn builder() -> (fn() -> Box<dyn LoadBalancer>, String) {
        (new_instance, LOAD_BALANCE_LEAST_CONNECTIONS.to_string())
    }

    pub fn new() -> Self {
        Self {
            active: RwLock::new(HashMap::new()),
        }
    }

    fn counter_key(instance: &Instance) -> String {
        format!("{}#{}", instance.service, instance.id)
    }

    /// active_calls calls currently in flight against `instance`
    pub fn active_calls(&self, instance: &Instance) -> u64 {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner);
        active
            .get(&Self::counter_key(instance))
            .copied()
            .unwrap_or(0)
    }
}

impl Default for LeastConnectionBalancer {
    fn default() -> Self {
        Self::new()
    }
}

fn new_instance() -> Box<dyn LoadBalancer> {
    Box::new(LeastConnectionBalancer::new())
}

impl Plugin for LeastConnectionBalancer {
    fn name(&self) -> String {
        LOAD_BALANCE_LEAST_CONNECTIONS.to_string()
    }
}

impl LoadBalancer for LeastConnectionBalancer {
    fn choose_instance(
        &self,
        criteria: &Criteria,
        instances: &ServiceInstances,
    ) -> Result<Instance, ClientError> {
        let mut selected: Option<(&Instance, u64)> = None;
        for ins in instances.instances.iter() {
            let calls = self.active_calls(ins);
            match selected {
                Some((_, least)) if calls >= least => {}
                _ => selected = Some((ins, calls)),
            }
        }
        match selected {
            Some((ins, calls)) => {
                tracing::debug!(
                    "[resilient][loadbalancer][least_connections] service {} choose {} with {} active calls",
                    criteria.service,
                    ins.id,
                    calls
                );
                Ok(ins.clone())
            }
            None => Err(ClientError::no_instances(&criteria.service)),
        }
    }

    fn on_call_start(&self, instance: &Instance) {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *active.entry(Self::counter_key(instance)).or_insert(0) += 1;
    }

    fn on_call_end(&self, instance: &Instance) {
        let key = Self::counter_key(instance);
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(calls) = active.get_mut(&key) {
            *calls = calls.saturating_sub(1);
            if *calls == 0 {
                active.remove(&key);
            }
        }
    }
}
