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
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use crate::core::{
    model::{
        error::{ClientError, ErrorCode},
        loadbalance::{Criteria, LOAD_BALANCE_WEIGHTED_ROUND_ROBIN},
        naming::{Instance, ServiceInstances},
    },
    plugin::{loadbalance::LoadBalancer, plugins::Plugin},
};

/// WeightedRoundRobinBalancer smooth weighted round robin.
///
/// Each pick adds every instance's weight to its current weight, selects the
/// largest current weight (first one wins a tie) and subtracts the total
/// weight from the winner. Over one cycle every instance is picked exactly
/// `weight` times and heavy instances are interleaved with light ones.
pub struct WeightedRoundRobinBalancer {
    round_robin_cache: RwLock<HashMap<String, Arc<Mutex<WeightedRoundRobins>>>>,
}

impl WeightedRoundRobinBalancer {
    pub fn builder() -> (fn() -> Box<dyn LoadBalancer>, String) {
        (new_instance, LOAD_BALANCE_WEIGHTED_ROUND_ROBIN.to_string())
    }

    pub fn new() -> Self {
        Self {
            round_robin_cache: RwLock::new(HashMap::new()),
        }
    }

    fn round_robins(&self, cache_key: &str) -> Arc<Mutex<WeightedRoundRobins>> {
        {
            let cache = self
                .round_robin_cache
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(rr) = cache.get(cache_key) {
                return rr.clone();
            }
        }
        let mut cache = self
            .round_robin_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(cache_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(WeightedRoundRobins::default())))
            .clone()
    }
}

impl Default for WeightedRoundRobinBalancer {
    fn default() -> Self {
        Self::new()
    }
}

fn new_instance() -> Box<dyn LoadBalancer> {
    Box::new(WeightedRoundRobinBalancer::new())
}

impl Plugin for WeightedRoundRobinBalancer {
    fn name(&self) -> String {
        LOAD_BALANCE_WEIGHTED_ROUND_ROBIN.to_string()
    }
}

impl LoadBalancer for WeightedRoundRobinBalancer {
    fn choose_instance(
        &self,
        criteria: &Criteria,
        instances: &ServiceInstances,
    ) -> Result<Instance, ClientError> {
        if instances.is_empty() {
            return Err(ClientError::no_instances(&criteria.service));
        }
        let members: Vec<(String, u32)> = instances
            .instances
            .iter()
            .map(|ins| (ins.id.clone(), ins.weight()))
            .collect();
        let total_weight: i64 = members.iter().map(|(_, w)| *w as i64).sum();
        if total_weight == 0 {
            return Err(ClientError::new(
                ErrorCode::NoInstancesAvailable,
                format!("total weight of service {} instances is 0", criteria.service),
            ));
        }

        let state = self.round_robins(&criteria.service);
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.members != members {
            // membership changed, start a new cycle
            tracing::debug!(
                "[resilient][loadbalancer][weighted_round_robin] service {} members changed, reset weights",
                criteria.service
            );
            state.reset(members);
        }

        let index = state.next(total_weight);
        Ok(instances.instances[index].clone())
    }
}

#[derive(Default)]
struct WeightedRoundRobins {
    members: Vec<(String, u32)>,
    cur_weights: Vec<i64>,
}

impl WeightedRoundRobins {
    fn reset(&mut self, members: Vec<(String, u32)>) {
        self.cur_weights = vec![0; members.len()];
        self.members = members;
    }

    fn next(&mut self, total_weight: i64) -> usize {
        let mut selected: Option<usize> = None;
        for (i, (_, weight)) in self.members.iter().enumerate() {
            self.cur_weights[i] += *weight as i64;
            if *weight == 0 {
                continue;
            }
            match selected {
                Some(best) if self.cur_weights[i] <= self.cur_weights[best] => {}
                _ => selected = Some(i),
            }
        }
        // total_weight > 0 guarantees a positive-weight member exists
        let index = selected.unwrap_or(0);
        self.cur_weights[index] -= total_weight;
        index
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::WeightedRoundRobinBalancer;
    use crate::core::model::error::ErrorCode;
    use crate::core::model::loadbalance::Criteria;
    use crate::core::plugin::loadbalance::LoadBalancer;
    use crate::plugins::loadbalance::testing::service_instances;

    #[test]
    fn test_smooth_sequence() {
        let lb = WeightedRoundRobinBalancer::new();
        let criteria = Criteria::new("orders");
        let instances = service_instances(&[("a", 3), ("b", 1)]);

        let picked: Vec<String> = (0..8)
            .map(|_| lb.choose_instance(&criteria, &instances).unwrap().id)
            .collect();
        assert_eq!(picked, vec!["a", "a", "b", "a", "a", "a", "b", "a"]);
    }

    #[test]
    fn test_ratio_follows_weights() {
        let lb = WeightedRoundRobinBalancer::new();
        let criteria = Criteria::new("orders");
        let instances = service_instances(&[("a", 3), ("b", 1)]);

        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..4000 {
            let ins = lb.choose_instance(&criteria, &instances).unwrap();
            *counts.entry(ins.id).or_default() += 1;
        }
        let a = counts["a"] as f64;
        let b = counts["b"] as f64;
        assert!((a / 4000.0 - 0.75).abs() <= 0.02, "a={} b={}", a, b);
        assert!((b / 4000.0 - 0.25).abs() <= 0.02, "a={} b={}", a, b);
    }

    #[test]
    fn test_zero_weight_never_selected() {
        let lb = WeightedRoundRobinBalancer::new();
        let criteria = Criteria::new("orders");
        let instances = service_instances(&[("a", 0), ("b", 2), ("c", 1)]);
        for _ in 0..30 {
            assert_ne!(lb.choose_instance(&criteria, &instances).unwrap().id, "a");
        }

        let all_zero = service_instances(&[("a", 0), ("b", 0)]);
        let err = lb.choose_instance(&criteria, &all_zero).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoInstancesAvailable);
    }

    #[test]
    fn test_member_change_restarts_cycle() {
        let lb = WeightedRoundRobinBalancer::new();
        let criteria = Criteria::new("orders");
        let first = service_instances(&[("a", 3), ("b", 1)]);
        lb.choose_instance(&criteria, &first).unwrap();

        let second = service_instances(&[("b", 1), ("c", 1)]);
        let picked: Vec<String> = (0..4)
            .map(|_| lb.choose_instance(&criteria, &second).unwrap().id)
            .collect();
        assert_eq!(picked, vec!["b", "c", "b", "c"]);
    }
}
