// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::resource::{Resource, ResourceSeed, ResourceStatus};
use crate::domain::repositories::project_repository::RepositoryError;
use crate::domain::repositories::resource_repository::{ResourceQuery, ResourceRepository};
use crate::infrastructure::database::entities::resource as resource_entity;
use crate::utils::url_utils::normalize_url;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 资源仓库实现
///
/// 基于SeaORM实现的资源数据访问层。认领采用单条
/// compare-and-set更新而非行锁，Postgres与SQLite行为一致。
#[derive(Clone)]
pub struct ResourceRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ResourceRepositoryImpl {
    /// 创建新的资源仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<resource_entity::Model> for Resource {
    fn from(model: resource_entity::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            url: model.url,
            depth: model.depth,
            status: model.status.parse().unwrap_or_default(),
            payload: model.payload,
            content_type: model.content_type,
            error: model.error,
            attempt_count: model.attempt_count,
            scheduled_at: model.scheduled_at,
            lock_token: model.lock_token,
            started_at: model.started_at,
            completed_at: model.completed_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<Resource> for resource_entity::ActiveModel {
    fn from(resource: Resource) -> Self {
        Self {
            id: Set(resource.id),
            project_id: Set(resource.project_id),
            url: Set(resource.url.clone()),
            depth: Set(resource.depth),
            status: Set(resource.status.to_string()),
            payload: Set(resource.payload.clone()),
            content_type: Set(resource.content_type.clone()),
            error: Set(resource.error.clone()),
            attempt_count: Set(resource.attempt_count),
            scheduled_at: Set(resource.scheduled_at),
            lock_token: Set(resource.lock_token),
            started_at: Set(resource.started_at),
            completed_at: Set(resource.completed_at),
            created_at: Set(resource.created_at),
            updated_at: Set(resource.updated_at),
        }
    }
}

#[async_trait]
impl ResourceRepository for ResourceRepositoryImpl {
    async fn create(&self, resource: &Resource) -> Result<Resource, RepositoryError> {
        let model: resource_entity::ActiveModel = resource.clone().into();

        model.insert(self.db.as_ref()).await?;
        Ok(resource.clone())
    }

    async fn save(&self, resource: &Resource) -> Result<Resource, RepositoryError> {
        let mut model: resource_entity::ActiveModel = resource.clone().into();
        model.updated_at = Set(Utc::now().into());

        let updated = model.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Resource>, RepositoryError> {
        let model = resource_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn find_by_url(
        &self,
        project_id: Uuid,
        url: &str,
    ) -> Result<Option<Resource>, RepositoryError> {
        let model = resource_entity::Entity::find()
            .filter(resource_entity::Column::ProjectId.eq(project_id))
            .filter(resource_entity::Column::Url.eq(url))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn batch_insert(
        &self,
        project_id: Uuid,
        seeds: &[ResourceSeed],
        chunk_size: usize,
    ) -> Result<u64, RepositoryError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut models = Vec::new();

        for seed in seeds {
            let normalized = match normalize_url(&seed.url) {
                Ok(url) => url.to_string(),
                Err(e) => {
                    // 无效URL静默跳过，不让单个坏链接拖垮整批
                    warn!(url = %seed.url, error = %e, "invalid url skipped");
                    continue;
                }
            };
            if !seen.insert(normalized.clone()) {
                continue;
            }
            let model: resource_entity::ActiveModel =
                Resource::new(project_id, &normalized, seed.depth).into();
            models.push(model);
        }

        let mut inserted = 0;
        for chunk in models.chunks(chunk_size.max(1)) {
            let affected = resource_entity::Entity::insert_many(chunk.to_vec())
                .on_conflict(
                    // 项目内URL唯一，已存在的URL为无操作
                    OnConflict::columns([
                        resource_entity::Column::ProjectId,
                        resource_entity::Column::Url,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(self.db.as_ref())
                .await?;
            inserted += affected;
        }

        debug!(total = seeds.len(), inserted, "batch insert finished");
        Ok(inserted)
    }

    async fn claim_next(
        &self,
        project_id: Uuid,
        worker_id: Uuid,
    ) -> Result<Option<Resource>, RepositoryError> {
        loop {
            let candidate = resource_entity::Entity::find()
                .filter(resource_entity::Column::ProjectId.eq(project_id))
                .filter(
                    resource_entity::Column::Status.eq(ResourceStatus::Pending.to_string()),
                )
                .filter(
                    Condition::any()
                        .add(resource_entity::Column::ScheduledAt.is_null())
                        .add(resource_entity::Column::ScheduledAt.lte(Utc::now())),
                )
                .order_by_asc(resource_entity::Column::CreatedAt)
                .one(self.db.as_ref())
                .await?;

            let Some(model) = candidate else {
                return Ok(None);
            };

            let now: DateTime<FixedOffset> = Utc::now().into();
            let result = resource_entity::Entity::update_many()
                .col_expr(
                    resource_entity::Column::Status,
                    Expr::value(ResourceStatus::InProgress.to_string()),
                )
                .col_expr(resource_entity::Column::LockToken, Expr::value(Some(worker_id)))
                .col_expr(resource_entity::Column::StartedAt, Expr::value(Some(now)))
                .col_expr(resource_entity::Column::UpdatedAt, Expr::value(now))
                .col_expr(
                    resource_entity::Column::AttemptCount,
                    Expr::col(resource_entity::Column::AttemptCount).add(1),
                )
                .filter(resource_entity::Column::Id.eq(model.id))
                .filter(
                    resource_entity::Column::Status.eq(ResourceStatus::Pending.to_string()),
                )
                .exec(self.db.as_ref())
                .await?;

            if result.rows_affected == 1 {
                let claimed = resource_entity::Entity::find_by_id(model.id)
                    .one(self.db.as_ref())
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                return Ok(Some(claimed.into()));
            }
            // 被其他工作单元抢先认领，尝试下一个候选
        }
    }

    async fn count(&self, project_id: Uuid) -> Result<u64, RepositoryError> {
        let count = resource_entity::Entity::find()
            .filter(resource_entity::Column::ProjectId.eq(project_id))
            .count(self.db.as_ref())
            .await?;
        Ok(count)
    }

    async fn count_by_status(
        &self,
        project_id: Uuid,
        status: ResourceStatus,
    ) -> Result<u64, RepositoryError> {
        let count = resource_entity::Entity::find()
            .filter(resource_entity::Column::ProjectId.eq(project_id))
            .filter(resource_entity::Column::Status.eq(status.to_string()))
            .count(self.db.as_ref())
            .await?;
        Ok(count)
    }

    async fn find_paged(&self, query: &ResourceQuery) -> Result<Vec<Resource>, RepositoryError> {
        let mut select = resource_entity::Entity::find()
            .filter(resource_entity::Column::ProjectId.eq(query.project_id))
            .order_by_asc(resource_entity::Column::CreatedAt);

        if let Some(statuses) = &query.statuses {
            let names: Vec<String> = statuses.iter().map(ToString::to_string).collect();
            select = select.filter(resource_entity::Column::Status.is_in(names));
        }
        // SQLite不接受没有LIMIT的OFFSET，不限数量时给一个足够大的上限
        if query.limit > 0 {
            select = select.limit(query.limit);
        } else if query.offset > 0 {
            select = select.limit(i64::MAX as u64);
        }
        if query.offset > 0 {
            select = select.offset(query.offset);
        }

        let models = select.all(self.db.as_ref()).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn release_claim(&self, id: Uuid, worker_id: Uuid) -> Result<(), RepositoryError> {
        resource_entity::Entity::update_many()
            .col_expr(
                resource_entity::Column::Status,
                Expr::value(ResourceStatus::Pending.to_string()),
            )
            .col_expr(
                resource_entity::Column::LockToken,
                Expr::value(Option::<Uuid>::None),
            )
            .col_expr(
                resource_entity::Column::StartedAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .col_expr(
                resource_entity::Column::AttemptCount,
                Expr::col(resource_entity::Column::AttemptCount).sub(1),
            )
            .filter(resource_entity::Column::Id.eq(id))
            .filter(resource_entity::Column::Status.eq(ResourceStatus::InProgress.to_string()))
            .filter(resource_entity::Column::LockToken.eq(worker_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn reset_in_progress(&self, project_id: Uuid) -> Result<u64, RepositoryError> {
        let result = resource_entity::Entity::update_many()
            .col_expr(
                resource_entity::Column::Status,
                Expr::value(ResourceStatus::Pending.to_string()),
            )
            .col_expr(
                resource_entity::Column::LockToken,
                Expr::value(Option::<Uuid>::None),
            )
            .col_expr(
                resource_entity::Column::StartedAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .filter(resource_entity::Column::ProjectId.eq(project_id))
            .filter(resource_entity::Column::Status.eq(ResourceStatus::InProgress.to_string()))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}
