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

use rand::Rng;

use crate::core::{
    model::{
        error::{ClientError, ErrorCode},
        loadbalance::{Criteria, LOAD_BALANCE_RANDOM, LOAD_BALANCE_WEIGHTED_RANDOM},
        naming::{Instance, ServiceInstances},
    },
    plugin::{loadbalance::LoadBalancer, plugins::Plugin},
};

/// RandomLoadBalancer uniform pick, no shared state.
pub struct RandomLoadBalancer {}

impl RandomLoadBalancer {
    pub fn builder() -> (fn() -> Box<dyn LoadBalancer>, String) {
        (new_random, LOAD_BALANCE_RANDOM.to_string())
    }
}

fn new_random() -> Box<dyn LoadBalancer> {
    Box::new(RandomLoadBalancer {})
}

impl Plugin for RandomLoadBalancer {
    fn name(&self) -> String {
        LOAD_BALANCE_RANDOM.to_string()
    }
}

impl LoadBalancer for RandomLoadBalancer {
    fn choose_instance(
        &self,
        criteria: &Criteria,
        instances: &ServiceInstances,
    ) -> Result<Instance, ClientError> {
        if instances.is_empty() {
            return Err(ClientError::no_instances(&criteria.service));
        }
        let index = rand::thread_rng().gen_range(0..instances.len());
        Ok(instances.instances[index].clone())
    }
}

/// WeightRandomLoadbalancer picks with probability proportional to weight.
pub struct WeightRandomLoadbalancer {}

impl WeightRandomLoadbalancer {
    pub fn builder() -> (fn() -> Box<dyn LoadBalancer>, String) {
        (new_weighted_random, LOAD_BALANCE_WEIGHTED_RANDOM.to_string())
    }
}

fn new_weighted_random() -> Box<dyn LoadBalancer> {
    Box::new(WeightRandomLoadbalancer {})
}

impl Plugin for WeightRandomLoadbalancer {
    fn name(&self) -> String {
        LOAD_BALANCE_WEIGHTED_RANDOM.to_string()
    }
}

impl LoadBalancer for WeightRandomLoadbalancer {
    fn choose_instance(
        &self,
        criteria: &Criteria,
        instances: &ServiceInstances,
    ) -> Result<Instance, ClientError> {
        if instances.is_empty() {
            return Err(ClientError::no_instances(&criteria.service));
        }
        let total_weight = instances.get_total_weight();
        if total_weight == 0 {
            return Err(ClientError::new(
                ErrorCode::NoInstancesAvailable,
                format!("total weight of service {} instances is 0", criteria.service),
            ));
        }

        let rand_weight = rand::thread_rng().gen_range(0..total_weight);
        let mut left: u64 = 0;
        let mut right: u64 = 0;

        for instance in instances.instances.iter() {
            right += instance.weight() as u64;
            if rand_weight >= left && rand_weight < right {
                return Ok(instance.clone());
            }
            left = right;
        }

        tracing::debug!(
            "[resilient][loadbalancer][weight_random] choose instance failed, rand_weight: {}",
            rand_weight
        );
        let index = (rand_weight % instances.len() as u64) as usize;
        Ok(instances.instances[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{RandomLoadBalancer, WeightRandomLoadbalancer};
    use crate::core::model::error::ErrorCode;
    use crate::core::model::loadbalance::Criteria;
    use crate::core::model::naming::ServiceInstances;
    use crate::core::plugin::loadbalance::LoadBalancer;
    use crate::plugins::loadbalance::testing::service_instances;

    #[test]
    fn test_random_reaches_every_instance() {
        let lb = RandomLoadBalancer {};
        let criteria = Criteria::new("orders");
        let instances = service_instances(&[("a", 1), ("b", 1), ("c", 1)]);

        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..3000 {
            let ins = lb.choose_instance(&criteria, &instances).unwrap();
            *counts.entry(ins.id).or_default() += 1;
        }
        assert_eq!(counts.len(), 3);
        for (id, count) in counts {
            assert!(count > 700, "instance {} picked only {} times", id, count);
        }
    }

    #[test]
    fn test_random_empty() {
        let lb = RandomLoadBalancer {};
        let empty = ServiceInstances::new("orders".to_string(), vec![]);
        let err = lb.choose_instance(&Criteria::new("orders"), &empty).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoInstancesAvailable);
    }

    #[test]
    fn test_weighted_random_skips_zero_weight() {
        let lb = WeightRandomLoadbalancer {};
        let criteria = Criteria::new("orders");
        let instances = service_instances(&[("a", 0), ("b", 9), ("c", 1)]);

        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..2000 {
            let ins = lb.choose_instance(&criteria, &instances).unwrap();
            *counts.entry(ins.id).or_default() += 1;
        }
        assert!(!counts.contains_key("a"));
        assert!(counts["b"] > counts["c"] * 4);
    }
}
