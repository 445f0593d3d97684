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
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use crate::core::{
    model::{
        error::ClientError,
        loadbalance::{Criteria, LOAD_BALANCE_ROUND_ROBIN},
        naming::{Instance, ServiceInstances},
    },
    plugin::{loadbalance::LoadBalancer, plugins::Plugin},
};

/// RoundRobinBalancer walks the candidate list with one cursor per service.
pub struct RoundRobinBalancer {
    cursors: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

impl RoundRobinBalancer {
    pub fn builder() -> (fn() -> Box<dyn LoadBalancer>, String) {
        (new_instance, LOAD_BALANCE_ROUND_ROBIN.to_string())
    }

    pub fn new() -> Self {
        Self {
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn cursor(&self, service: &str) -> Arc<AtomicU64> {
        {
            let cursors = self.cursors.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cursor) = cursors.get(service) {
                return cursor.clone();
            }
        }
        let mut cursors = self.cursors.write().unwrap_or_else(PoisonError::into_inner);
        cursors
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone()
    }
}

impl Default for RoundRobinBalancer {
    fn default() -> Self {
        Self::new()
    }
}

fn new_instance() -> Box<dyn LoadBalancer> {
    Box::new(RoundRobinBalancer::new())
}

impl Plugin for RoundRobinBalancer {
    fn name(&self) -> String {
        LOAD_BALANCE_ROUND_ROBIN.to_string()
    }
}

impl LoadBalancer for RoundRobinBalancer {
    fn choose_instance(
        &self,
        criteria: &Criteria,
        instances: &ServiceInstances,
    ) -> Result<Instance, ClientError> {
        if instances.is_empty() {
            return Err(ClientError::no_instances(&criteria.service));
        }
        // every call advances the cursor exactly once, even if the call later fails
        let seq = self.cursor(&criteria.service).fetch_add(1, Ordering::Relaxed);
        let index = (seq % instances.len() as u64) as usize;
        Ok(instances.instances[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::RoundRobinBalancer;
    use crate::core::model::error::ErrorCode;
    use crate::core::model::loadbalance::Criteria;
    use crate::core::model::naming::ServiceInstances;
    use crate::core::plugin::loadbalance::LoadBalancer;
    use crate::plugins::loadbalance::testing::service_instances;

    #[test]
    fn test_cycles_from_first_instance() {
        let lb = RoundRobinBalancer::new();
        let criteria = Criteria::new("orders");
        let instances = service_instances(&[("a", 1), ("b", 1), ("c", 1)]);

        let picked: Vec<String> = (0..9)
            .map(|_| lb.choose_instance(&criteria, &instances).unwrap().id)
            .collect();
        assert_eq!(picked, vec!["a", "b", "c", "a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn test_cursor_per_service() {
        let lb = RoundRobinBalancer::new();
        let instances = service_instances(&[("a", 1), ("b", 1)]);

        assert_eq!(lb.choose_instance(&Criteria::new("orders"), &instances).unwrap().id, "a");
        assert_eq!(lb.choose_instance(&Criteria::new("users"), &instances).unwrap().id, "a");
        assert_eq!(lb.choose_instance(&Criteria::new("orders"), &instances).unwrap().id, "b");
    }

    #[test]
    fn test_empty_candidates() {
        let lb = RoundRobinBalancer::new();
        let empty = ServiceInstances::new("orders".to_string(), vec![]);
        let err = lb.choose_instance(&Criteria::new("orders"), &empty).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoInstancesAvailable);
    }

    #[test]
    fn test_concurrent_cursor_values_are_unique() {
        let lb = Arc::new(RoundRobinBalancer::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let lb = lb.clone();
                std::thread::spawn(move || {
                    (0..1000)
                        .map(|_| lb.cursor("orders").fetch_add(1, std::sync::atomic::Ordering::Relaxed))
                        .collect::<Vec<u64>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for t in threads {
            for v in t.join().unwrap() {
                assert!(seen.insert(v), "cursor value {} observed twice", v);
            }
        }
        assert_eq!(seen.len(), 8000);
    }
}
