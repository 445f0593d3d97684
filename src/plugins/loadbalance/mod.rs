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

pub mod leastconn;
pub mod random;
pub mod roundrobin;
pub mod weightedroundrobin;

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use crate::core::model::naming::{Instance, ServiceInstances};

    pub fn instance(id: &str, weight: u32) -> Instance {
        let mut metadata = HashMap::new();
        metadata.insert("weight".to_string(), weight.to_string());
        Instance {
            id: id.to_string(),
            service: "orders".to_string(),
            host: format!("{}.orders.local", id),
            port: 8080,
            scheme: "http".to_string(),
            metadata,
            healthy: true,
        }
    }

    pub fn service_instances(members: &[(&str, u32)]) -> ServiceInstances {
        ServiceInstances::new(
            "orders".to_string(),
            members.iter().map(|(id, w)| instance(id, *w)).collect(),
        )
    }
}
