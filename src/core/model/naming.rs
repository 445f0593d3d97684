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

use std::collections::HashMap;

pub static DEFAULT_SCHEME: &str = "http";
pub static WEIGHT_METADATA_KEY: &str = "weight";
pub const DEFAULT_WEIGHT: u32 = 1;

/// Instance one reachable endpoint of a service, as reported by discovery.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub service: String,
    pub host: String,
    pub port: u32,
    pub scheme: String,
    // metadata carries free-form labels; "weight" is read by the weighted balancers
    pub metadata: HashMap<String, String>,
    pub healthy: bool,
}

impl Instance {
    pub fn new() -> Instance {
        Default::default()
    }

    /// weight declared through metadata, 1 when absent or malformed
    pub fn weight(&self) -> u32 {
        self.metadata
            .get(WEIGHT_METADATA_KEY)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn is_available(&self) -> bool {
        self.healthy
    }

    pub fn format_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// base_url the address handed to the caller's operation
    pub fn base_url(&self) -> String {
        let scheme = if self.scheme.is_empty() {
            DEFAULT_SCHEME
        } else {
            self.scheme.as_str()
        };
        format!("{}://{}", scheme, self.format_address())
    }
}

/// ServiceInstances a snapshot of one service's instances handed out by the cache.
#[derive(Default, Debug, Clone)]
pub struct ServiceInstances {
    pub service: String,
    pub instances: Vec<Instance>,
    // stale is set when the snapshot outlived its ttl and a refresh failed
    pub stale: bool,
}

impl ServiceInstances {
    pub fn new(service: String, instances: Vec<Instance>) -> Self {
        Self {
            service,
            instances,
            stale: false,
        }
    }

    pub fn get_cache_key(&self) -> String {
        self.service.clone()
    }

    pub fn get_total_weight(&self) -> u64 {
        self.instances.iter().map(|ins| ins.weight() as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// retain_instances keeps only the instances matching `f`, preserving order
    pub fn retain_instances<F>(&self, f: F) -> ServiceInstances
    where
        F: Fn(&Instance) -> bool,
    {
        ServiceInstances {
            service: self.service.clone(),
            instances: self.instances.iter().filter(|ins| f(ins)).cloned().collect(),
            stale: self.stale,
        }
    }
}

// Connector request and response

pub struct InstanceRequest {
    pub flow_id: String,
    pub instance: Instance,
}

#[derive(Default, Debug, Clone)]
pub struct InstanceResponse {
    pub exist: bool,
    pub instance_id: String,
}

impl InstanceResponse {
    pub fn success(id: String) -> Self {
        Self {
            exist: false,
            instance_id: id,
        }
    }

    pub fn exist_resource(id: String) -> Self {
        Self {
            exist: true,
            instance_id: id,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{Instance, ServiceInstances};

    fn instance(id: &str, weight: Option<&str>) -> Instance {
        let mut metadata = HashMap::new();
        if let Some(w) = weight {
            metadata.insert("weight".to_string(), w.to_string());
        }
        Instance {
            id: id.to_string(),
            service: "orders".to_string(),
            host: "10.0.0.1".to_string(),
            port: 8080,
            scheme: String::new(),
            metadata,
            healthy: true,
        }
    }

    #[test]
    fn test_weight_from_metadata() {
        assert_eq!(instance("a", None).weight(), 1);
        assert_eq!(instance("a", Some("3")).weight(), 3);
        assert_eq!(instance("a", Some("0")).weight(), 0);
        assert_eq!(instance("a", Some("heavy")).weight(), 1);
    }

    #[test]
    fn test_base_url_defaults_scheme() {
        let mut ins = instance("a", None);
        assert_eq!(ins.base_url(), "http://10.0.0.1:8080");
        ins.scheme = "https".to_string();
        assert_eq!(ins.base_url(), "https://10.0.0.1:8080");
    }

    #[test]
    fn test_retain_keeps_order() {
        let svc = ServiceInstances::new(
            "orders".to_string(),
            vec![instance("a", Some("2")), instance("b", None), instance("c", Some("5"))],
        );
        assert_eq!(svc.get_total_weight(), 8);
        let kept = svc.retain_instances(|ins| ins.id != "b");
        let ids: Vec<&str> = kept.instances.iter().map(|ins| ins.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
