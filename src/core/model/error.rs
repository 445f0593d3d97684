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

use std::fmt;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ApiInvalidArgument = 1001,
    InvalidConfig = 1002,
    NetworkError = 1007,
    CircuitBreakError = 1008,
    InstanceNotFound = 1010,
    InternalError = 1014,
    ServiceDiscoveryUnavailable = 1021,
    NoInstancesAvailable = 1022,
    AllInstancesUnavailable = 1023,
}

#[derive(Debug, Clone)]
pub struct ClientError {
    err_msg: String,
    err_code: ErrorCode,
}

impl Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "code: {:?}({}), msg: {}", self.err_code, self.err_code as i32, self.err_msg)
    }
}

impl std::error::Error for ClientError {}

impl ClientError {
    pub fn new(code: ErrorCode, err_msg: String) -> Self {
        ClientError {
            err_msg,
            err_code: code,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.err_code
    }

    pub fn message(&self) -> &str {
        &self.err_msg
    }

    /// no_instances the service resolved to an empty candidate list
    pub fn no_instances(service: &str) -> Self {
        ClientError::new(
            ErrorCode::NoInstancesAvailable,
            format!("no instances available for service {}", service),
        )
    }

    /// circuit_open the breaker guarding `key` rejected the call
    pub fn circuit_open(key: &str) -> Self {
        ClientError::new(
            ErrorCode::CircuitBreakError,
            format!("circuit breaker {} is open, call rejected", key),
        )
    }
}

/// CallError is the outcome of a protected call that did not succeed.
///
/// `Client` carries the rejections produced before or around the call
/// (discovery unavailable, nothing to select, breaker open). `Operation`
/// carries the caller's own error exactly as the operation returned it.
#[derive(Debug)]
pub enum CallError<E> {
    Client(ClientError),
    Operation(E),
}

impl<E> CallError<E> {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            CallError::Client(err) => Some(err.code()),
            CallError::Operation(_) => None,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        self.code() == Some(ErrorCode::CircuitBreakError)
    }

    pub fn is_operation(&self) -> bool {
        matches!(self, CallError::Operation(_))
    }

    pub fn into_operation(self) -> Option<E> {
        match self {
            CallError::Operation(err) => Some(err),
            CallError::Client(_) => None,
        }
    }
}

impl<E> From<ClientError> for CallError<E> {
    fn from(err: ClientError) -> Self {
        CallError::Client(err)
    }
}

impl<E: Display> Display for CallError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CallError::Client(err) => err.fmt(f),
            CallError::Operation(err) => write!(f, "operation failed: {}", err),
        }
    }
}

impl<E> std::error::Error for CallError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CallError::Client(err) => Some(err),
            CallError::Operation(err) => Some(err),
        }
    }
}
