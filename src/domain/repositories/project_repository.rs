// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::project::Project;
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 项目标识：按ID或名称查找
#[derive(Debug, Clone)]
pub enum ProjectRef {
    Id(Uuid),
    Name(String),
}

/// 项目仓库特质
///
/// 定义项目数据访问接口，项目的名称、URL和插件配置
/// 在创建后不再通过正常流程修改
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// 创建新项目
    async fn create(&self, project: &Project) -> Result<Project, RepositoryError>;
    /// 按ID或名称查找项目
    async fn find(&self, by: &ProjectRef) -> Result<Option<Project>, RepositoryError>;
    /// 获取所有项目
    async fn find_all(&self) -> Result<Vec<Project>, RepositoryError>;
    /// 获取仍有待处理资源的项目，发现模式用于多项目迭代
    async fn find_with_pending_resources(&self) -> Result<Vec<Project>, RepositoryError>;
}

#[async_trait]
impl<T: ProjectRepository + ?Sized> ProjectRepository for std::sync::Arc<T> {
    async fn create(&self, project: &Project) -> Result<Project, RepositoryError> {
        (**self).create(project).await
    }

    async fn find(&self, by: &ProjectRef) -> Result<Option<Project>, RepositoryError> {
        (**self).find(by).await
    }

    async fn find_all(&self) -> Result<Vec<Project>, RepositoryError> {
        (**self).find_all().await
    }

    async fn find_with_pending_resources(&self) -> Result<Vec<Project>, RepositoryError> {
        (**self).find_with_pending_resources().await
    }
}
