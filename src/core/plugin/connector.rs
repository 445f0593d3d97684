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

use crate::core::model::error::ClientError;
use crate::core::model::naming::{Instance, InstanceRequest, InstanceResponse};
use crate::core::plugin::plugins::Plugin;

/// Connector the discovery backend the registry reads from and providers write to.
#[async_trait::async_trait]
pub trait Connector: Plugin {
    /// fetch_instances lists the current instances of a service
    async fn fetch_instances(&self, service: &str) -> Result<Vec<Instance>, ClientError>;

    /// register_instance 实例注册
    async fn register_instance(&self, req: InstanceRequest)
        -> Result<InstanceResponse, ClientError>;

    /// deregister_instance 实例反注册, matched by service and instance id
    async fn deregister_instance(&self, req: InstanceRequest) -> Result<(), ClientError>;
}
