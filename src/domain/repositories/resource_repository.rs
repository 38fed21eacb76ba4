// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::resource::{Resource, ResourceSeed, ResourceStatus};
use crate::domain::repositories::project_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 资源分页查询参数
#[derive(Debug, Default, Clone)]
pub struct ResourceQuery {
    pub project_id: Uuid,
    pub statuses: Option<Vec<ResourceStatus>>,
    pub limit: u64,
    pub offset: u64,
}

/// 资源仓库特质
///
/// 资源队列是调度器与流水线之间唯一的共享可变状态，
/// 实现必须串行化来自多个工作单元的并发写入
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// 创建新资源
    async fn create(&self, resource: &Resource) -> Result<Resource, RepositoryError>;
    /// 保存资源的状态与内容变更
    async fn save(&self, resource: &Resource) -> Result<Resource, RepositoryError>;
    /// 按ID查找资源
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Resource>, RepositoryError>;
    /// 按URL查找项目内资源
    async fn find_by_url(
        &self,
        project_id: Uuid,
        url: &str,
    ) -> Result<Option<Resource>, RepositoryError>;
    /// 批量插入新发现的资源
    ///
    /// 无效URL静默跳过，重复URL（项目内）为无操作而非错误。
    /// 按`chunk_size`分批写入。
    async fn batch_insert(
        &self,
        project_id: Uuid,
        seeds: &[ResourceSeed],
        chunk_size: usize,
    ) -> Result<u64, RepositoryError>;
    /// 原子认领下一个可抓取的资源
    ///
    /// 挑选一个计划时间已到的Pending资源并通过单条
    /// compare-and-set更新将其置为InProgress，写入认领令牌。
    /// 并发调用时同一资源最多被认领一次。
    async fn claim_next(
        &self,
        project_id: Uuid,
        worker_id: Uuid,
    ) -> Result<Option<Resource>, RepositoryError>;
    /// 统计项目资源总数
    async fn count(&self, project_id: Uuid) -> Result<u64, RepositoryError>;
    /// 统计项目内处于指定状态的资源数
    async fn count_by_status(
        &self,
        project_id: Uuid,
        status: ResourceStatus,
    ) -> Result<u64, RepositoryError>;
    /// 分页查询资源
    async fn find_paged(&self, query: &ResourceQuery) -> Result<Vec<Resource>, RepositoryError>;
    /// 退还一个刚认领的资源
    ///
    /// 来源受限时调用：资源放回Pending且不计入尝试次数，
    /// 仅当仍处于InProgress且令牌匹配时生效
    async fn release_claim(&self, id: Uuid, worker_id: Uuid) -> Result<(), RepositoryError>;
    /// 重置项目内遗留的InProgress资源
    ///
    /// 崩溃恢复：上次运行中断时被认领但未完成的资源放回队列
    async fn reset_in_progress(&self, project_id: Uuid) -> Result<u64, RepositoryError>;
}

#[async_trait]
impl<T: ResourceRepository + ?Sized> ResourceRepository for std::sync::Arc<T> {
    async fn create(&self, resource: &Resource) -> Result<Resource, RepositoryError> {
        (**self).create(resource).await
    }

    async fn save(&self, resource: &Resource) -> Result<Resource, RepositoryError> {
        (**self).save(resource).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Resource>, RepositoryError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_url(
        &self,
        project_id: Uuid,
        url: &str,
    ) -> Result<Option<Resource>, RepositoryError> {
        (**self).find_by_url(project_id, url).await
    }

    async fn batch_insert(
        &self,
        project_id: Uuid,
        seeds: &[ResourceSeed],
        chunk_size: usize,
    ) -> Result<u64, RepositoryError> {
        (**self).batch_insert(project_id, seeds, chunk_size).await
    }

    async fn claim_next(
        &self,
        project_id: Uuid,
        worker_id: Uuid,
    ) -> Result<Option<Resource>, RepositoryError> {
        (**self).claim_next(project_id, worker_id).await
    }

    async fn count(&self, project_id: Uuid) -> Result<u64, RepositoryError> {
        (**self).count(project_id).await
    }

    async fn count_by_status(
        &self,
        project_id: Uuid,
        status: ResourceStatus,
    ) -> Result<u64, RepositoryError> {
        (**self).count_by_status(project_id, status).await
    }

    async fn find_paged(&self, query: &ResourceQuery) -> Result<Vec<Resource>, RepositoryError> {
        (**self).find_paged(query).await
    }

    async fn release_claim(&self, id: Uuid, worker_id: Uuid) -> Result<(), RepositoryError> {
        (**self).release_claim(id, worker_id).await
    }

    async fn reset_in_progress(&self, project_id: Uuid) -> Result<u64, RepositoryError> {
        (**self).reset_in_progress(project_id).await
    }
}
