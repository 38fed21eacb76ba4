// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::project::Project;
use crate::domain::models::resource::ResourceStatus;
use crate::domain::repositories::project_repository::{
    ProjectRef, ProjectRepository, RepositoryError,
};
use crate::infrastructure::database::entities::project as project_entity;
use crate::infrastructure::database::entities::resource as resource_entity;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;

/// 项目仓库实现
///
/// 基于SeaORM实现的项目数据访问层
#[derive(Clone)]
pub struct ProjectRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ProjectRepositoryImpl {
    /// 创建新的项目仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 填充项目的资源计数
    async fn hydrate(&self, model: project_entity::Model) -> Result<Project, RepositoryError> {
        let count = resource_entity::Entity::find()
            .filter(resource_entity::Column::ProjectId.eq(model.id))
            .count(self.db.as_ref())
            .await?;
        let mut project: Project = model.into();
        project.resource_count = count;
        Ok(project)
    }
}

impl From<project_entity::Model> for Project {
    fn from(model: project_entity::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            url: model.url,
            plugin_opts: serde_json::from_value(model.plugin_opts).unwrap_or_default(),
            resource_count: 0,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<Project> for project_entity::ActiveModel {
    fn from(project: Project) -> Self {
        Self {
            id: Set(project.id),
            name: Set(project.name.clone()),
            url: Set(project.url.clone()),
            plugin_opts: Set(
                serde_json::to_value(&project.plugin_opts).unwrap_or(serde_json::Value::Null)
            ),
            created_at: Set(project.created_at),
            updated_at: Set(project.updated_at),
        }
    }
}

#[async_trait]
impl ProjectRepository for ProjectRepositoryImpl {
    async fn create(&self, project: &Project) -> Result<Project, RepositoryError> {
        let model: project_entity::ActiveModel = project.clone().into();

        model.insert(self.db.as_ref()).await?;
        Ok(project.clone())
    }

    async fn find(&self, by: &ProjectRef) -> Result<Option<Project>, RepositoryError> {
        let query = match by {
            ProjectRef::Id(id) => project_entity::Entity::find_by_id(*id),
            ProjectRef::Name(name) => project_entity::Entity::find()
                .filter(project_entity::Column::Name.eq(name.clone())),
        };

        match query.one(self.db.as_ref()).await? {
            Some(model) => Ok(Some(self.hydrate(model).await?)),
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> Result<Vec<Project>, RepositoryError> {
        let models = project_entity::Entity::find()
            .order_by_asc(project_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        let mut projects = Vec::with_capacity(models.len());
        for model in models {
            projects.push(self.hydrate(model).await?);
        }
        Ok(projects)
    }

    async fn find_with_pending_resources(&self) -> Result<Vec<Project>, RepositoryError> {
        let ids: Vec<uuid::Uuid> = resource_entity::Entity::find()
            .select_only()
            .column(resource_entity::Column::ProjectId)
            .distinct()
            .filter(resource_entity::Column::Status.eq(ResourceStatus::Pending.to_string()))
            .into_tuple()
            .all(self.db.as_ref())
            .await?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = project_entity::Entity::find()
            .filter(project_entity::Column::Id.is_in(ids))
            .order_by_asc(project_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        let mut projects = Vec::with_capacity(models.len());
        for model in models {
            projects.push(self.hydrate(model).await?);
        }
        Ok(projects)
    }
}
