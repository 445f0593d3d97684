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

use resilient_client::core::logger::logger::init_logger;
use resilient_client::core::model::error::ErrorCode;

#[test]
fn test_init_logger_writes_to_file() {
    let dir = std::env::temp_dir().join(format!("resilient-logger-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let dir_str = dir.to_string_lossy().to_string();

    let guard = init_logger(&dir_str, "resilient.log", LevelFilter::INFO).unwrap();
    tracing::info!("[resilient][test] logger installed");
    tracing::debug!("[resilient][test] filtered out");
    drop(guard);

    let content = std::fs::read_to_string(dir.join("resilient.log")).unwrap();
    assert!(content.contains("logger installed"));
    assert!(!content.contains("filtered out"));

    let err = init_logger(&dir_str, "resilient.log", LevelFilter::INFO).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InternalError);
    let _ = std::fs::remove_dir_all(dir);
}
