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
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use tokio::time::Instant;

use crate::core::{
    config::consumer::CircuitBreakerConfig,
    model::circuitbreaker::{CircuitBreakerStatus, Resource, ResourceStat, RetStatus, Status},
    plugin::{circuitbreaker::CircuitBreaker, plugins::Plugin},
};

static PLUGIN_NAME: &str = "errorCount";

fn new_circuit_breaker(conf: CircuitBreakerConfig) -> Box<dyn CircuitBreaker> {
    Box::new(ErrorCountCircuitBreaker::new(conf))
}

/// ErrorCountCircuitBreaker keeps one consecutive-error breaker per resource key.
///
/// The map lock is only taken to find or create a breaker; every breaker
/// guards its own counters, so unrelated services never contend.
pub struct ErrorCountCircuitBreaker {
    conf: CircuitBreakerConfig,
    breakers: RwLock<HashMap<String, Arc<ResourceBreaker>>>,
}

impl ErrorCountCircuitBreaker {
    pub fn builder() -> (fn(CircuitBreakerConfig) -> Box<dyn CircuitBreaker>, String) {
        (new_circuit_breaker, PLUGIN_NAME.to_string())
    }

    pub fn new(conf: CircuitBreakerConfig) -> Self {
        Self {
            conf,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    fn lookup(&self, key: &str) -> Option<Arc<ResourceBreaker>> {
        let breakers = self.breakers.read().unwrap_or_else(PoisonError::into_inner);
        breakers.get(key).cloned()
    }

    fn acquire_breaker(&self, resource: &Resource) -> Arc<ResourceBreaker> {
        let key = resource.key();
        if let Some(breaker) = self.lookup(&key) {
            return breaker;
        }
        let mut breakers = self.breakers.write().unwrap_or_else(PoisonError::into_inner);
        breakers
            .entry(key.clone())
            .or_insert_with(|| Arc::new(ResourceBreaker::new(key, self.conf.clone())))
            .clone()
    }
}

impl Plugin for ErrorCountCircuitBreaker {
    fn name(&self) -> String {
        PLUGIN_NAME.to_string()
    }
}

impl CircuitBreaker for ErrorCountCircuitBreaker {
    fn check_resource(&self, resource: &Resource) -> CircuitBreakerStatus {
        self.acquire_breaker(resource).acquire()
    }

    fn is_available(&self, resource: &Resource) -> bool {
        match self.lookup(&resource.key()) {
            Some(breaker) => breaker.is_available(),
            None => true,
        }
    }

    fn report_stat(&self, stat: &ResourceStat) {
        let breaker = self.acquire_breaker(&stat.resource);
        match stat.status {
            RetStatus::RetSuccess => breaker.on_success(),
            RetStatus::RetFail => breaker.on_failure(),
        }
    }

    fn get_status(&self, resource: &Resource) -> Option<CircuitBreakerStatus> {
        self.lookup(&resource.key()).map(|breaker| breaker.snapshot())
    }
}

struct BreakerState {
    status: Status,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_transition: Instant,
}

/// ResourceBreaker the state machine guarding one resource key.
pub struct ResourceBreaker {
    key: String,
    conf: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl ResourceBreaker {
    pub fn new(key: String, conf: CircuitBreakerConfig) -> Self {
        Self {
            key,
            conf,
            state: Mutex::new(BreakerState {
                status: Status::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_transition: Instant::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, state: &mut BreakerState, to: Status) {
        if to == Status::Open {
            tracing::warn!(
                "[resilient][circuitbreaker] {} {} -> {} after {} consecutive failures",
                self.key,
                state.status,
                to,
                state.consecutive_failures
            );
        } else {
            tracing::info!(
                "[resilient][circuitbreaker] {} {} -> {}",
                self.key,
                state.status,
                to
            );
        }
        state.status = to;
        state.consecutive_failures = 0;
        state.consecutive_successes = 0;
        state.last_transition = Instant::now();
    }

    fn status_of(&self, state: &BreakerState) -> CircuitBreakerStatus {
        CircuitBreakerStatus {
            circuit_breaker: self.key.clone(),
            status: state.status,
            consecutive_failures: state.consecutive_failures,
            consecutive_successes: state.consecutive_successes,
            since: state.last_transition.elapsed(),
        }
    }

    /// acquire gates one call attempt. An Open breaker whose timeout elapsed
    /// moves to HalfOpen and lets this call through as a probe.
    pub fn acquire(&self) -> CircuitBreakerStatus {
        let mut state = self.lock();
        if state.status == Status::Open
            && state.last_transition.elapsed() >= self.conf.open_timeout
        {
            self.transition(&mut state, Status::HalfOpen);
        }
        self.status_of(&state)
    }

    pub fn is_available(&self) -> bool {
        let state = self.lock();
        state.status != Status::Open || state.last_transition.elapsed() >= self.conf.open_timeout
    }

    pub fn on_success(&self) {
        let mut state = self.lock();
        match state.status {
            Status::Closed => state.consecutive_failures = 0,
            Status::HalfOpen => {
                state.consecutive_successes += 1;
                if state.consecutive_successes >= self.conf.success_threshold {
                    self.transition(&mut state, Status::Closed);
                }
            }
            // the call was admitted before the breaker opened
            Status::Open => {}
        }
    }

    pub fn on_failure(&self) {
        let mut state = self.lock();
        match state.status {
            Status::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.conf.failure_threshold {
                    self.transition(&mut state, Status::Open);
                }
            }
            Status::HalfOpen => self.transition(&mut state, Status::Open),
            Status::Open => {}
        }
    }

    pub fn snapshot(&self) -> CircuitBreakerStatus {
        let state = self.lock();
        self.status_of(&state)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::{ErrorCountCircuitBreaker, ResourceBreaker};
    use crate::core::config::consumer::CircuitBreakerConfig;
    use crate::core::model::circuitbreaker::{Resource, ResourceStat, RetStatus, Status};
    use crate::core::plugin::circuitbreaker::CircuitBreaker;

    fn conf(failure_threshold: u32, success_threshold: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold,
            success_threshold,
            open_timeout: Duration::from_secs(60),
            ..CircuitBreakerConfig::default()
        }
    }

    #[test]
    fn test_opens_at_threshold() {
        let breaker = ResourceBreaker::new("orders".to_string(), conf(3, 1));
        breaker.on_failure();
        breaker.on_failure();
        assert_eq!(breaker.snapshot().status, Status::Closed);
        assert_eq!(breaker.snapshot().consecutive_failures, 2);

        breaker.on_failure();
        let status = breaker.snapshot();
        assert_eq!(status.status, Status::Open);
        assert_eq!(status.consecutive_failures, 0);
        assert!(!breaker.is_available());
    }

    #[test]
    fn test_success_resets_failures() {
        let breaker = ResourceBreaker::new("orders".to_string(), conf(3, 1));
        breaker.on_failure();
        breaker.on_failure();
        breaker.on_success();
        breaker.on_failure();
        breaker.on_failure();
        assert_eq!(breaker.snapshot().status, Status::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_recovery() {
        let breaker = ResourceBreaker::new("orders".to_string(), conf(1, 2));
        breaker.on_failure();
        assert_eq!(breaker.acquire().status, Status::Open);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(breaker.acquire().status, Status::Open);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(breaker.is_available());
        assert_eq!(breaker.acquire().status, Status::HalfOpen);

        breaker.on_success();
        assert_eq!(breaker.snapshot().status, Status::HalfOpen);
        assert_eq!(breaker.snapshot().consecutive_successes, 1);
        breaker.on_success();
        assert_eq!(breaker.snapshot().status, Status::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let breaker = ResourceBreaker::new("orders".to_string(), conf(1, 3));
        breaker.on_failure();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(breaker.acquire().status, Status::HalfOpen);

        breaker.on_success();
        breaker.on_failure();
        let status = breaker.snapshot();
        assert_eq!(status.status, Status::Open);
        assert_eq!(status.since, Duration::ZERO);
        assert_eq!(breaker.acquire().status, Status::Open);
    }

    #[test]
    fn test_outcomes_while_open_are_ignored() {
        let breaker = ResourceBreaker::new("orders".to_string(), conf(1, 1));
        breaker.on_failure();
        breaker.on_success();
        breaker.on_failure();
        let status = breaker.snapshot();
        assert_eq!(status.status, Status::Open);
        assert_eq!(status.consecutive_successes, 0);
    }

    #[test]
    fn test_breakers_are_keyed() {
        let cb = ErrorCountCircuitBreaker::new(conf(1, 1));
        let a = Resource::instance("orders", "a");
        let b = Resource::instance("orders", "b");
        assert!(cb.get_status(&a).is_none());

        cb.report_stat(&ResourceStat {
            resource: a.clone(),
            delay: Duration::from_millis(3),
            status: RetStatus::RetFail,
        });
        assert!(!cb.is_available(&a));
        assert!(cb.is_available(&b));
        assert_eq!(cb.check_resource(&a).status, Status::Open);
        assert_eq!(cb.check_resource(&b).status, Status::Closed);
    }

    // Replays random outcome sequences and checks every step against the
    // transition table, with no time passing so Open is absorbing.
    #[test]
    fn test_random_sequences_follow_transition_table() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let threshold = rng.gen_range(1..6);
            let breaker = ResourceBreaker::new("orders".to_string(), conf(threshold, 2));
            let mut failures = 0;
            let mut open = false;

            for _ in 0..rng.gen_range(1..40) {
                let success = rng.gen_bool(0.6);
                if success {
                    breaker.on_success();
                    if !open {
                        failures = 0;
                    }
                } else {
                    breaker.on_failure();
                    if !open {
                        failures += 1;
                        if failures >= threshold {
                            open = true;
                            failures = 0;
                        }
                    }
                }

                let status = breaker.snapshot();
                let expected = if open { Status::Open } else { Status::Closed };
                assert_eq!(status.status, expected);
                assert_eq!(status.consecutive_failures, failures);
                assert_eq!(breaker.acquire().status, expected);
            }
        }
    }
}
