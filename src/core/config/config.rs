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

use std::{env, fs, path::Path};

use serde::Deserialize;

use crate::core::config::consumer::ConsumerConfig;
use crate::core::config::global::GlobalConfig;
use crate::core::model::error::{ClientError, ErrorCode};

pub static CONFIG_PATH_ENV: &str = "RESILIENT_CLIENT_CONFIG";
pub static DEFAULT_CONFIG_FILE: &str = "./resilient.yaml";

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Configuration {
    pub global: GlobalConfig,
    pub consumer: ConsumerConfig,
}

impl Configuration {
    /// validate rejects settings the components cannot run with
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.global.local_cache.cache_ttl.is_zero() {
            return Err(invalid_config("global.localCache.cacheTtl must be positive"));
        }
        let cb = &self.consumer.circuit_breaker;
        if cb.failure_threshold == 0 {
            return Err(invalid_config(
                "consumer.circuitBreaker.failureThreshold must be at least 1",
            ));
        }
        if cb.success_threshold == 0 {
            return Err(invalid_config(
                "consumer.circuitBreaker.successThreshold must be at least 1",
            ));
        }
        Ok(())
    }
}

fn invalid_config(msg: &str) -> ClientError {
    ClientError::new(ErrorCode::InvalidConfig, msg.to_string())
}

pub fn load_from_str(data: &str) -> Result<Configuration, ClientError> {
    let conf: Configuration = serde_yaml::from_str(data).map_err(|e| {
        ClientError::new(
            ErrorCode::InvalidConfig,
            format!("failure to parse yaml config: {}", e),
        )
    })?;
    conf.validate()?;
    Ok(conf)
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<Configuration, ClientError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|e| {
        ClientError::new(
            ErrorCode::InvalidConfig,
            format!("read config file {} fail: {}", path.display(), e),
        )
    })?;
    load_from_str(&data)
}

/// load_default reads the file named by `RESILIENT_CLIENT_CONFIG`, then
/// `./resilient.yaml`, and falls back to built-in defaults.
pub fn load_default() -> Result<Configuration, ClientError> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        return load(path);
    }
    if Path::new(DEFAULT_CONFIG_FILE).exists() {
        return load(DEFAULT_CONFIG_FILE);
    }
    tracing::info!("[resilient][config] no config file found, use default configuration");
    Ok(Configuration::default())
}
