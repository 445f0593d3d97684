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
use crate::core::flow::InvokeFlow;
use crate::core::model::error::ClientError;
use crate::discovery::api::{ConsumerAPI, ProviderAPI};
use crate::discovery::req::{
    GetAllInstanceRequest, GetOneInstanceRequest, InstanceDeregisterRequest,
    InstanceRegisterRequest, InstanceRegisterResponse, InstanceResponse, InstancesResponse,
};

pub struct DefaultConsumerAPI {
    context: Arc<SDKContext>,
    flow: InvokeFlow,
}

impl DefaultConsumerAPI {
    pub fn new_raw(context: SDKContext) -> Self {
        Self::new(Arc::new(context))
    }

    pub fn new(context: Arc<SDKContext>) -> Self {
        let flow = InvokeFlow::new(context.get_engine().get_extensions());
        Self { context, flow }
    }
}

#[async_trait::async_trait]
impl ConsumerAPI for DefaultConsumerAPI {
    async fn get_one_instance(
        &self,
        req: GetOneInstanceRequest,
    ) -> Result<InstanceResponse, ClientError> {
        req.check_valid()?;
        let instance = self.flow.select_instance(&req.service).await?;
        Ok(InstanceResponse { instance })
    }

    async fn get_all_instances(
        &self,
        req: GetAllInstanceRequest,
    ) -> Result<InstancesResponse, ClientError> {
        req.check_valid()?;
        let instances = self
            .context
            .get_engine()
            .get_service_instances(&req.service, req.only_healthy)
            .await?;
        Ok(InstancesResponse { instances })
    }
}

pub struct DefaultProviderAPI {
    context: Arc<SDKContext>,
}

impl DefaultProviderAPI {
    pub fn new_raw(context: SDKContext) -> Self {
        Self::new(Arc::new(context))
    }

    pub fn new(context: Arc<SDKContext>) -> Self {
        Self { context }
    }
}

#[async_trait::async_trait]
impl ProviderAPI for DefaultProviderAPI {
    async fn register(
        &self,
        req: InstanceRegisterRequest,
    ) -> Result<InstanceRegisterResponse, ClientError> {
        let rsp = self.context.get_engine().register_instance(req).await;
        tracing::info!("[resilient][discovery][provider] register instance result: {rsp:?}");
        rsp
    }

    async fn deregister(&self, req: InstanceDeregisterRequest) -> Result<(), ClientError> {
        self.context.get_engine().deregister_instance(req).await
    }
}
