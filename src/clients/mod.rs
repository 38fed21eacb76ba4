// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 客户端模块
///
/// 定义DOM客户端能力契约及内置的静态HTML实现
pub mod http_client;
pub mod traits;
