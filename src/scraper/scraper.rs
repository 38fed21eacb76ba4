// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ScrapeDefinition;
use crate::domain::models::project::{DomainError, Project};
use crate::domain::models::resource::ResourceSeed;
use crate::domain::repositories::project_repository::{
    ProjectRef, ProjectRepository, RepositoryError,
};
use crate::domain::repositories::resource_repository::ResourceRepository;
use crate::plugins::registry::PluginRegistry;
use crate::scheduler::scheduler::{ResourceScheduler, SchedulerError};
use crate::scraper::events::{EventBus, ScrapeEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// 抓取入口错误类型
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    /// 配置错误（缺少抓取定义、清单文件不可读等）
    #[error("Invalid scrape configuration: {0}")]
    Config(String),

    /// 领域错误（种子URL非法等）
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// 调度器错误
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// 已有一次抓取在进行中
    #[error("A scrape is already in progress")]
    AlreadyRunning,
}

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeMode {
    /// 单项目抓取
    Scrape,
    /// 多项目发现
    Discover,
}

/// 入口状态
///
/// 同一实例一次只允许一个运行，Completed/Failed后可重新发起
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScraperState {
    Idle,
    Running(ScrapeMode),
    Completed,
    Failed,
}

/// 抓取入口
///
/// 面向调用方的门面：解析抓取定义、建立/复用项目、
/// 种子入队，然后把队列交给调度器驱动。生命周期事件
/// 通过事件总线广播。
pub struct Scraper {
    projects: Arc<dyn ProjectRepository>,
    resources: Arc<dyn ResourceRepository>,
    scheduler: ResourceScheduler,
    events: Arc<EventBus>,
    state: Mutex<ScraperState>,
}

impl Scraper {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        resources: Arc<dyn ResourceRepository>,
        scheduler: ResourceScheduler,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            projects,
            resources,
            scheduler,
            events,
            state: Mutex::new(ScraperState::Idle),
        }
    }

    /// 订阅生命周期事件
    pub fn subscribe(&self) -> broadcast::Receiver<ScrapeEvent> {
        self.events.subscribe()
    }

    /// 当前状态
    pub fn state(&self) -> ScraperState {
        *self.state.lock()
    }

    /// 按抓取定义运行单项目抓取
    ///
    /// 项目按名称复用：已存在时沿用其持久化配置，否则用
    /// 定义中的种子URL和插件配置创建。种子与清单导入是
    /// 幂等的，重复发起同一定义不会产生重复资源。
    #[instrument(skip(self, definition), fields(name = %definition.name))]
    pub async fn scrape(&self, definition: &ScrapeDefinition) -> Result<(), ScrapeError> {
        self.begin(ScrapeMode::Scrape)?;
        let result = self.run_scrape(definition).await;
        self.finish(result.is_ok());
        result
    }

    /// 发现模式：建立配置的项目（如有）并推进所有仍有
    /// 待处理资源的项目
    #[instrument(skip(self, definition))]
    pub async fn discover(&self, definition: Option<&ScrapeDefinition>) -> Result<(), ScrapeError> {
        self.begin(ScrapeMode::Discover)?;
        let result = self.run_discover(definition).await;
        self.finish(result.is_ok());
        result
    }

    async fn run_discover(&self, definition: Option<&ScrapeDefinition>) -> Result<(), ScrapeError> {
        // 配置携带抓取定义时，先建立并播种该项目再扫描
        if let Some(definition) = definition {
            let project = match self.resolve_project(definition).await {
                Ok(project) => Arc::new(project),
                Err(e) => {
                    self.events.project_error(None, e.to_string());
                    return Err(e);
                }
            };
            if let Err(e) = self.seed_project(&project, definition).await {
                self.events.project_error(Some(project), e.to_string());
                return Err(e);
            }
        }
        self.scheduler.discover().await.map_err(ScrapeError::from)
    }

    async fn run_scrape(&self, definition: &ScrapeDefinition) -> Result<(), ScrapeError> {
        let project = match self.resolve_project(definition).await {
            Ok(project) => Arc::new(project),
            Err(e) => {
                // 项目尚未建立，发出无项目归属的错误事件
                self.events.project_error(None, e.to_string());
                return Err(e);
            }
        };

        self.events.begin_project(project.id);
        if let Err(e) = self.seed_project(&project, definition).await {
            self.events.project_error(Some(project), e.to_string());
            return Err(e);
        }
        self.scheduler.scrape(project).await?;
        Ok(())
    }

    /// 按名称复用或新建项目
    async fn resolve_project(&self, definition: &ScrapeDefinition) -> Result<Project, ScrapeError> {
        if let Some(existing) = self
            .projects
            .find(&ProjectRef::Name(definition.name.clone()))
            .await?
        {
            info!(project = %existing.name, "existing project reused");
            return Ok(existing);
        }

        let plugin_opts = if definition.plugin_opts.is_empty() {
            PluginRegistry::default_pipeline()
        } else {
            definition.plugin_opts.clone()
        };

        let project = Project::new(&definition.name, &definition.url, plugin_opts)?;
        let created = self.projects.create(&project).await?;
        info!(project = %created.name, url = %created.url, "project created");
        Ok(created)
    }

    /// 入队种子URL与清单文件中的URL
    async fn seed_project(
        &self,
        project: &Project,
        definition: &ScrapeDefinition,
    ) -> Result<(), ScrapeError> {
        let mut seeds = vec![ResourceSeed {
            url: project.url.clone(),
            depth: 0,
        }];

        if let Some(path) = &definition.resource_path {
            let listing = tokio::fs::read_to_string(path).await.map_err(|e| {
                ScrapeError::Config(format!("cannot read resource list {}: {}", path, e))
            })?;
            seeds.extend(
                listing
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(|line| ResourceSeed {
                        url: line.to_string(),
                        depth: 0,
                    }),
            );
        }

        let inserted = self
            .resources
            .batch_insert(project.id, &seeds, 100)
            .await?;
        info!(count = inserted, "seed resources enqueued");
        Ok(())
    }

    /// 进入Running状态，已在运行时拒绝
    fn begin(&self, mode: ScrapeMode) -> Result<(), ScrapeError> {
        let mut state = self.state.lock();
        if let ScraperState::Running(current) = *state {
            warn!(?current, "scrape rejected, already running");
            return Err(ScrapeError::AlreadyRunning);
        }
        *state = ScraperState::Running(mode);
        Ok(())
    }

    fn finish(&self, ok: bool) {
        *self.state.lock() = if ok {
            ScraperState::Completed
        } else {
            ScraperState::Failed
        };
    }
}
