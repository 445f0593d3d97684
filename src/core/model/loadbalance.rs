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

pub static LOAD_BALANCE_ROUND_ROBIN: &str = "roundRobin";
pub static LOAD_BALANCE_WEIGHTED_ROUND_ROBIN: &str = "weightedRoundRobin";
pub static LOAD_BALANCE_RANDOM: &str = "random";
pub static LOAD_BALANCE_WEIGHTED_RANDOM: &str = "weightedRandom";
pub static LOAD_BALANCE_LEAST_CONNECTIONS: &str = "leastConnections";

/// Criteria per-call selection input
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    pub service: String,
}

impl Criteria {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }
}
