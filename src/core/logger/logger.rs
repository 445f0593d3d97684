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

use tracing::level_filters::LevelFilter;
use tracing_appender::{non_blocking::WorkerGuard, rolling};

use crate::core::model::error::{ClientError, ErrorCode};

/// init_logger installs a global subscriber writing to `dir/file`.
///
/// Keep the returned guard alive for as long as logs should be flushed; the
/// library itself never installs a subscriber.
pub fn init_logger(dir: &str, file: &str, l: LevelFilter) -> Result<WorkerGuard, ClientError> {
    let file_appender = rolling::never(dir, file);
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_thread_names(true)
        .with_file(true)
        .with_level(true)
        .with_writer(non_blocking_appender)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_max_level(l)
        .try_init()
        .map_err(|err| {
            ClientError::new(
                ErrorCode::InternalError,
                format!("logger already initialized: {}", err),
            )
        })?;

    Ok(guard)
}
