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

use crate::core::context::SDKContext;
use crate::core::model::error::ClientError;
use crate::core::plugin::connector::Connector;
use crate::discovery::default::{DefaultConsumerAPI, DefaultProviderAPI};
use crate::discovery::req::*;

/// new_provider_api
pub fn new_provider_api(connector: Arc<dyn Connector>) -> Result<impl ProviderAPI, ClientError> {
    let start_time = std::time::Instant::now();
    let context = SDKContext::default(connector)?;
    tracing::info!("create sdk context cost: {:?}", start_time.elapsed());
    Ok(DefaultProviderAPI::new_raw(context))
}

pub fn new_provider_api_by_context(context: Arc<SDKContext>) -> impl ProviderAPI {
    DefaultProviderAPI::new(context)
}

/// ProviderAPI 负责服务提供者的生命周期管理
#[async_trait::async_trait]
pub trait ProviderAPI
where
    Self: Send + Sync,
{
    /// register 实例注册
    async fn register(
        &self,
        req: InstanceRegisterRequest,
    ) -> Result<InstanceRegisterResponse, ClientError>;

    /// deregister 实例反注册
    async fn deregister(&self, req: InstanceDeregisterRequest) -> Result<(), ClientError>;
}

/// new_consumer_api
pub fn new_consumer_api(connector: Arc<dyn Connector>) -> Result<impl ConsumerAPI, ClientError> {
    let context = SDKContext::default(connector)?;
    Ok(DefaultConsumerAPI::new_raw(context))
}

pub fn new_consumer_api_by_context(context: Arc<SDKContext>) -> impl ConsumerAPI {
    DefaultConsumerAPI::new(context)
}

/// ConsumerAPI 负责服务消费方完成获取被调服务的 IP 地址完成远程调用
#[async_trait::async_trait]
pub trait ConsumerAPI
where
    Self: Send + Sync,
{
    /// get_one_instance picks one instance the way a protected call would
    async fn get_one_instance(
        &self,
        req: GetOneInstanceRequest,
    ) -> Result<InstanceResponse, ClientError>;

    /// get_all_instances 拉取所有实例
    async fn get_all_instances(
        &self,
        req: GetAllInstanceRequest,
    ) -> Result<InstancesResponse, ClientError>;
}
