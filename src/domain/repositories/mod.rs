// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义后端无关的数据访问契约
pub mod project_repository;
pub mod resource_repository;
