// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 插件模块
///
/// 定义流水线阶段契约、注册表与执行器
pub mod builtin;
pub mod pipeline;
pub mod plugin;
pub mod registry;
