// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 单元测试共用的内存仓库与夹具

use crate::clients::traits::{ClientCapabilities, ClientError, DomClient, FetchedPage};
use crate::domain::models::project::Project;
use crate::domain::models::resource::{Resource, ResourceSeed, ResourceStatus};
use crate::domain::repositories::project_repository::{
    ProjectRef, ProjectRepository, RepositoryError,
};
use crate::domain::repositories::resource_repository::{ResourceQuery, ResourceRepository};
use crate::plugins::plugin::ExecutionContext;
use crate::utils::url_utils::normalize_url;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 构造一个200文本HTML响应
pub fn html_page(body: &str) -> FetchedPage {
    FetchedPage {
        status_code: 200,
        content: format!("<html><body>{}</body></html>", body),
        content_type: "text/html".to_string(),
        headers: HashMap::new(),
        response_time_ms: 1,
    }
}

/// 构造一个携带页面的执行上下文
///
/// 项目与资源使用同一URL，资源已被认领（InProgress）
pub fn context_with_page(url: &str, page: FetchedPage) -> ExecutionContext {
    let project = Arc::new(Project::new("test", url, vec![]).unwrap());
    let resource = Resource::new(project.id, &project.url, 0)
        .start(Uuid::new_v4())
        .unwrap();
    ExecutionContext {
        project,
        resource,
        page: Some(page),
        client: Arc::new(StaticClient::default()),
        resources: Arc::new(MemoryResourceRepository::new()),
        discovered: Vec::new(),
    }
}

/// 返回预置页面的DOM客户端
///
/// 未预置的URL返回空白页，便于不关心页面内容的测试
#[derive(Default)]
pub struct StaticClient {
    pages: Mutex<HashMap<String, String>>,
}

impl StaticClient {
    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.pages.lock().insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl DomClient for StaticClient {
    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            dom_read: true,
            dom_write: false,
        }
    }

    async fn fetch(&self, url: &url::Url) -> Result<FetchedPage, ClientError> {
        let content = self
            .pages
            .lock()
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| "<html></html>".to_string());
        Ok(FetchedPage {
            status_code: 200,
            content,
            content_type: "text/html".to_string(),
            headers: HashMap::new(),
            response_time_ms: 1,
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// 内存资源仓库
///
/// 用互斥锁串行化全部操作，语义与数据库实现对齐：
/// 项目内URL唯一、CAS认领、计划时间过滤
#[derive(Default)]
pub struct MemoryResourceRepository {
    rows: Mutex<Vec<Resource>>,
}

impl MemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceRepository for MemoryResourceRepository {
    async fn create(&self, resource: &Resource) -> Result<Resource, RepositoryError> {
        self.rows.lock().push(resource.clone());
        Ok(resource.clone())
    }

    async fn save(&self, resource: &Resource) -> Result<Resource, RepositoryError> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|r| r.id == resource.id)
            .ok_or(RepositoryError::NotFound)?;
        *row = resource.clone();
        Ok(resource.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Resource>, RepositoryError> {
        Ok(self.rows.lock().iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_url(
        &self,
        project_id: Uuid,
        url: &str,
    ) -> Result<Option<Resource>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|r| r.project_id == project_id && r.url == url)
            .cloned())
    }

    async fn batch_insert(
        &self,
        project_id: Uuid,
        seeds: &[ResourceSeed],
        _chunk_size: usize,
    ) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.lock();
        let mut inserted = 0;
        for seed in seeds {
            // 无效URL静默跳过
            let Ok(normalized) = normalize_url(&seed.url) else {
                continue;
            };
            let url = normalized.to_string();
            if rows
                .iter()
                .any(|r| r.project_id == project_id && r.url == url)
            {
                continue;
            }
            rows.push(Resource::new(project_id, &url, seed.depth));
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn claim_next(
        &self,
        project_id: Uuid,
        worker_id: Uuid,
    ) -> Result<Option<Resource>, RepositoryError> {
        let now = Utc::now();
        let mut rows = self.rows.lock();
        let candidate = rows.iter_mut().find(|r| {
            r.project_id == project_id
                && r.status == ResourceStatus::Pending
                && r.scheduled_at.map(|at| at <= now).unwrap_or(true)
        });
        match candidate {
            Some(row) => {
                let claimed = row
                    .clone()
                    .start(worker_id)
                    .map_err(|_| RepositoryError::NotFound)?;
                *row = claimed.clone();
                Ok(Some(claimed))
            }
            None => Ok(None),
        }
    }

    async fn count(&self, project_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| r.project_id == project_id)
            .count() as u64)
    }

    async fn count_by_status(
        &self,
        project_id: Uuid,
        status: ResourceStatus,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| r.project_id == project_id && r.status == status)
            .count() as u64)
    }

    async fn find_paged(&self, query: &ResourceQuery) -> Result<Vec<Resource>, RepositoryError> {
        let rows = self.rows.lock();
        let filtered = rows.iter().filter(|r| {
            r.project_id == query.project_id
                && query
                    .statuses
                    .as_ref()
                    .map(|s| s.contains(&r.status))
                    .unwrap_or(true)
        });
        let limit = if query.limit == 0 {
            usize::MAX
        } else {
            query.limit as usize
        };
        Ok(filtered
            .skip(query.offset as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn release_claim(&self, id: Uuid, worker_id: Uuid) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock();
        if let Some(row) = rows.iter_mut().find(|r| {
            r.id == id
                && r.status == ResourceStatus::InProgress
                && r.lock_token == Some(worker_id)
        }) {
            row.status = ResourceStatus::Pending;
            row.lock_token = None;
            row.started_at = None;
            row.attempt_count -= 1;
        }
        Ok(())
    }

    async fn reset_in_progress(&self, project_id: Uuid) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.lock();
        let mut reset = 0;
        for row in rows
            .iter_mut()
            .filter(|r| r.project_id == project_id && r.status == ResourceStatus::InProgress)
        {
            row.status = ResourceStatus::Pending;
            row.lock_token = None;
            row.started_at = None;
            reset += 1;
        }
        Ok(reset)
    }
}

/// 内存项目仓库
///
/// `link_resources`后才支持发现模式的待处理项目查询
#[derive(Default)]
pub struct MemoryProjectRepository {
    rows: Mutex<Vec<Project>>,
    resources: Mutex<Option<Arc<MemoryResourceRepository>>>,
}

impl MemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 关联资源仓库，供find_with_pending_resources使用
    pub fn link_resources(&self, resources: Arc<MemoryResourceRepository>) {
        *self.resources.lock() = Some(resources);
    }
}

#[async_trait]
impl ProjectRepository for MemoryProjectRepository {
    async fn create(&self, project: &Project) -> Result<Project, RepositoryError> {
        self.rows.lock().push(project.clone());
        Ok(project.clone())
    }

    async fn find(&self, by: &ProjectRef) -> Result<Option<Project>, RepositoryError> {
        let rows = self.rows.lock();
        Ok(match by {
            ProjectRef::Id(id) => rows.iter().find(|p| p.id == *id).cloned(),
            ProjectRef::Name(name) => rows.iter().find(|p| p.name == *name).cloned(),
        })
    }

    async fn find_all(&self) -> Result<Vec<Project>, RepositoryError> {
        Ok(self.rows.lock().clone())
    }

    async fn find_with_pending_resources(&self) -> Result<Vec<Project>, RepositoryError> {
        let Some(resources) = self.resources.lock().clone() else {
            return Ok(Vec::new());
        };
        let projects = self.rows.lock().clone();
        let mut pending = Vec::new();
        for project in projects {
            if resources
                .count_by_status(project.id, ResourceStatus::Pending)
                .await?
                > 0
            {
                pending.push(project);
            }
        }
        Ok(pending)
    }
}
