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
use crate::core::model::naming::ServiceInstances;
use crate::core::plugin::plugins::Plugin;

#[async_trait::async_trait]
pub trait ResourceCache: Plugin {
    /// load_service_instances 加载服务实例, refreshing from the connector when stale
    async fn load_service_instances(&self, service: &str)
        -> Result<ServiceInstances, ClientError>;

    /// invalidate forces the next lookup of `service` to refresh
    fn invalidate(&self, service: &str);

    /// get_services names of the services currently cached
    fn get_services(&self) -> Vec<String>;
}
