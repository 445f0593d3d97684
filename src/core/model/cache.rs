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

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;

use super::naming::{Instance, ServiceInstances};

/// RegistryEntry the cached snapshot of one service.
///
/// Entries are never mutated after construction; the cache swaps whole
/// entries, so a reader holding an `Arc<RegistryEntry>` always sees one
/// consistent snapshot.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub service: String,
    pub instances: Vec<Instance>,
    pub fetched_at: Instant,
    // force_expired marks an entry invalidated after a provider write
    force_expired: bool,
}

impl RegistryEntry {
    /// new builds a snapshot, dropping instances whose id repeats an earlier one
    pub fn new(service: String, instances: Vec<Instance>) -> Self {
        let mut seen = HashSet::with_capacity(instances.len());
        let mut unique = Vec::with_capacity(instances.len());
        for ins in instances {
            if !seen.insert(ins.id.clone()) {
                tracing::warn!(
                    "[resilient][registry] service {} returned duplicate instance id {}, keep the first one",
                    service,
                    ins.id
                );
                continue;
            }
            unique.push(ins);
        }
        Self {
            service,
            instances: unique,
            fetched_at: Instant::now(),
            force_expired: false,
        }
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.force_expired || self.age() > ttl
    }

    /// invalidated copies the entry and marks the copy as expired
    pub fn invalidated(&self) -> Self {
        Self {
            force_expired: true,
            ..self.clone()
        }
    }

    pub fn to_service_instances(&self) -> ServiceInstances {
        ServiceInstances::new(self.service.clone(), self.instances.clone())
    }
}
