// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 客户端模块
///
/// 实现抓取页面用的DOM客户端
pub mod clients;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体与仓库接口
pub mod domain;

/// 基础设施模块
///
/// 提供数据库连接、实体与仓库实现
pub mod infrastructure;

/// 插件模块
///
/// 实现流水线阶段、注册表与执行器
pub mod plugins;

/// 调度模块
///
/// 实现资源认领、并发与重试调度
pub mod scheduler;

/// 抓取入口模块
///
/// 面向调用方的门面与生命周期事件
pub mod scraper;

/// 工具模块
///
/// 提供URL处理、重试策略与日志初始化
pub mod utils;

#[cfg(test)]
pub mod test_support;
