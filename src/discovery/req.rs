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

use crate::core::model::error::{ClientError, ErrorCode};
use crate::core::model::naming::{Instance, ServiceInstances, WEIGHT_METADATA_KEY};

// ProviderAPI request and response definition

#[derive(Clone, Debug, Default)]
pub struct InstanceRegisterRequest {
    pub flow_id: String,
    // id is assigned by the client when absent
    pub id: Option<String>,
    pub service: String,
    pub host: String,
    pub port: u32,
    pub scheme: String,
    pub metadata: HashMap<String, String>,
    pub healthy: bool,
    // weight is stored as metadata["weight"]; 0 keeps the instance out of
    // weighted load balancing
    pub weight: Option<u32>,
}

impl InstanceRegisterRequest {
    pub fn check_valid(&self) -> Result<(), ClientError> {
        if self.service.is_empty() {
            return Err(ClientError::new(
                ErrorCode::ApiInvalidArgument,
                "service is empty".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(ClientError::new(
                ErrorCode::ApiInvalidArgument,
                "host is empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn convert_instance(&self) -> Instance {
        let mut metadata = self.metadata.clone();
        if let Some(weight) = self.weight {
            metadata.insert(WEIGHT_METADATA_KEY.to_string(), weight.to_string());
        }
        Instance {
            id: self.id.clone().unwrap_or_default(),
            service: self.service.clone(),
            host: self.host.clone(),
            port: self.port,
            scheme: self.scheme.clone(),
            metadata,
            healthy: self.healthy,
        }
    }
}

#[derive(Clone, Debug)]
pub struct InstanceRegisterResponse {
    pub instance_id: String,
    pub exist: bool,
}

#[derive(Clone, Debug, Default)]
pub struct InstanceDeregisterRequest {
    pub flow_id: String,
    pub service: String,
    pub id: String,
}

impl InstanceDeregisterRequest {
    pub fn check_valid(&self) -> Result<(), ClientError> {
        if self.service.is_empty() || self.id.is_empty() {
            return Err(ClientError::new(
                ErrorCode::ApiInvalidArgument,
                "service and instance id are required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn convert_instance(&self) -> Instance {
        Instance {
            id: self.id.clone(),
            service: self.service.clone(),
            ..Instance::default()
        }
    }
}

// ConsumerAPI request and response definition

#[derive(Clone, Debug, Default)]
pub struct GetAllInstanceRequest {
    pub flow_id: String,
    pub service: String,
    // only_healthy drops instances reported unhealthy
    pub only_healthy: bool,
}

impl GetAllInstanceRequest {
    pub fn check_valid(&self) -> Result<(), ClientError> {
        check_service(&self.service)
    }
}

#[derive(Clone, Debug, Default)]
pub struct GetOneInstanceRequest {
    pub flow_id: String,
    pub service: String,
}

impl GetOneInstanceRequest {
    pub fn check_valid(&self) -> Result<(), ClientError> {
        check_service(&self.service)
    }
}

fn check_service(service: &str) -> Result<(), ClientError> {
    if service.is_empty() {
        return Err(ClientError::new(
            ErrorCode::ApiInvalidArgument,
            "service is empty".to_string(),
        ));
    }
    Ok(())
}

pub struct InstancesResponse {
    pub instances: ServiceInstances,
}

pub struct InstanceResponse {
    pub instance: Instance,
}

#[cfg(test)]
mod tests {
    use super::InstanceRegisterRequest;
    use crate::core::model::error::ErrorCode;

    #[test]
    fn test_register_request_weight_goes_to_metadata() {
        let req = InstanceRegisterRequest {
            service: "orders".to_string(),
            host: "10.0.0.1".to_string(),
            port: 8080,
            weight: Some(0),
            ..Default::default()
        };
        let ins = req.convert_instance();
        assert_eq!(ins.metadata.get("weight").map(String::as_str), Some("0"));
        assert_eq!(ins.weight(), 0);
        assert!(ins.id.is_empty());
    }

    #[test]
    fn test_register_request_validation() {
        let req = InstanceRegisterRequest {
            service: "orders".to_string(),
            ..Default::default()
        };
        assert_eq!(req.check_valid().unwrap_err().code(), ErrorCode::ApiInvalidArgument);
    }
}
