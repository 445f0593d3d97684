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

use std::sync::Arc;
use std::time::Duration;

use tracing::level_filters::LevelFilter;

use resilient_client::client::api::new_resilient_client;
use resilient_client::core::config::config::load_default;
use resilient_client::core::config::consumer::BreakerGranularity;
use resilient_client::core::model::error::CallError;
use resilient_client::discovery::api::{new_provider_api_by_context, ProviderAPI};
use resilient_client::discovery::req::InstanceRegisterRequest;
use resilient_client::plugins::connector::memory::memory::MemoryConnector;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_thread_names(true)
        .with_file(true)
        .with_level(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_max_level(LevelFilter::INFO)
        .init();

    let mut conf = match load_default() {
        Ok(conf) => conf,
        Err(err) => {
            tracing::error!("load configuration fail: {}", err);
            return;
        }
    };
    conf.consumer.circuit_breaker.granularity = BreakerGranularity::PerInstance;
    let client = match new_resilient_client(conf, Arc::new(MemoryConnector::new())) {
        Ok(client) => client,
        Err(err) => {
            tracing::error!("create client fail: {}", err);
            return;
        }
    };

    let provider = new_provider_api_by_context(client.get_context());
    let mut instance_ids = Vec::new();
    for (host, weight) in [("127.0.0.1", 100), ("127.0.0.2", 100)] {
        let req = InstanceRegisterRequest {
            flow_id: uuid::Uuid::new_v4().to_string(),
            id: None,
            service: "resilient-demo".to_string(),
            host: host.to_string(),
            port: 8080,
            healthy: true,
            weight: Some(weight),
            ..Default::default()
        };
        match provider.register(req).await {
            Ok(rsp) => {
                tracing::info!("register {} as {}", host, rsp.instance_id);
                instance_ids.push(rsp.instance_id);
            }
            Err(err) => tracing::error!("register fail: {}", err),
        }
    }

    // the first instance is broken; its breaker opens and traffic moves away
    for i in 0..20 {
        let ret: Result<Duration, CallError<String>> = client
            .execute_request("resilient-demo", |base_url| async move {
                let start = std::time::Instant::now();
                tokio::time::sleep(Duration::from_millis(5)).await;
                if base_url.contains("127.0.0.1") {
                    return Err(format!("{} connection refused", base_url));
                }
                Ok(start.elapsed())
            })
            .await;
        match ret {
            Ok(cost) => tracing::info!("call {} succeeded in {:?}", i, cost),
            Err(err) => tracing::warn!("call {} failed: {}", i, err),
        }
    }

    for id in instance_ids.iter() {
        if let Some(status) = client.breaker_status("resilient-demo", Some(id)) {
            tracing::info!(
                "breaker {} is {} since {:?}, consecutive failures {}",
                status.circuit_breaker,
                status.status,
                status.since,
                status.consecutive_failures
            );
        }
    }
}
