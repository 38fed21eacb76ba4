// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::clients::traits::DomClient;
use crate::config::settings::{ConcurrencyOptions, OriginScope, ProcessOptions};
use crate::domain::models::project::Project;
use crate::domain::models::resource::ResourceStatus;
use crate::domain::repositories::project_repository::{ProjectRepository, RepositoryError};
use crate::domain::repositories::resource_repository::ResourceRepository;
use crate::plugins::pipeline::PipelineExecutor;
use crate::plugins::plugin::{ExecutionContext, Plugin, PluginError};
use crate::plugins::registry::PluginRegistry;
use crate::scheduler::origin_limiter::{Denial, OriginLimiter};
use crate::scraper::events::EventBus;
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::url_utils::origin_of;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 调度器错误类型
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// 流水线初始化失败（未知插件、非法选项或客户端能力不足）
    #[error("Pipeline initialization failed: {0}")]
    Pipeline(#[from] PluginError),

    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 工作单元执行结果
struct WorkerOutcome {
    origin: String,
    resource: crate::domain::models::resource::Resource,
    result: Result<(), PluginError>,
}

/// 队列空转时的轮询间隔
const IDLE_POLL: Duration = Duration::from_millis(50);

/// 资源调度器
///
/// 从资源队列认领待处理资源并发执行流水线，直到项目
/// 完成（无待处理资源且无在途资源）。并发受全局上限和
/// 来源上限双重约束，瞬态失败按退避策略重新入队。
#[derive(Clone)]
pub struct ResourceScheduler {
    projects: Arc<dyn ProjectRepository>,
    resources: Arc<dyn ResourceRepository>,
    client: Arc<dyn DomClient>,
    registry: Arc<PluginRegistry>,
    events: Arc<EventBus>,
    concurrency: ConcurrencyOptions,
    process: ProcessOptions,
    retry: RetryPolicy,
    /// originScope=global时跨项目共享的限制器
    global_limiter: Arc<OriginLimiter>,
}

impl ResourceScheduler {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        resources: Arc<dyn ResourceRepository>,
        client: Arc<dyn DomClient>,
        registry: Arc<PluginRegistry>,
        events: Arc<EventBus>,
        concurrency: ConcurrencyOptions,
        process: ProcessOptions,
    ) -> Self {
        let retry = RetryPolicy::from_process_opts(process.retry, process.delay);
        let global_limiter = Arc::new(OriginLimiter::new(
            concurrency.max_requests_per_origin,
            Duration::from_millis(process.delay),
        ));
        Self {
            projects,
            resources,
            client,
            registry,
            events,
            concurrency,
            process,
            retry,
            global_limiter,
        }
    }

    /// 抓取单个项目直至完成
    ///
    /// 按项目配置实例化流水线（含DOM能力预检），随后驱动
    /// 资源队列至排空。结束时在事件总线上发出恰好一个
    /// 终结事件（ProjectScraped或ProjectError）。
    #[instrument(skip(self, project), fields(project = %project.name))]
    pub async fn scrape(&self, project: Arc<Project>) -> Result<(), SchedulerError> {
        self.events.begin_project(project.id);

        let plugins = match self
            .registry
            .init_pipeline(&project.plugin_opts, self.client.capabilities())
        {
            Ok(plugins) => Arc::new(plugins),
            Err(e) => {
                error!(error = %e, "pipeline initialization failed");
                self.events.project_error(Some(project), e.to_string());
                return Err(e.into());
            }
        };

        let limiter = self.limiter_for_project();
        match self.drive(project.clone(), plugins, limiter).await {
            Ok(()) => {
                info!("project scraped");
                self.events.project_scraped(project);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "project scrape failed");
                self.events.project_error(Some(project), e.to_string());
                Err(e.into())
            }
        }
    }

    /// 发现模式：推进所有仍有待处理资源的项目
    ///
    /// 每轮挑选至多`maxProjects`个项目并发抓取，反复扫描
    /// 直到没有项目剩有待处理资源。流水线初始化失败的项目
    /// 在本次运行内跳过，避免死循环。
    #[instrument(skip(self))]
    pub async fn discover(&self) -> Result<(), SchedulerError> {
        let mut failed: HashSet<Uuid> = HashSet::new();

        loop {
            let candidates = self.projects.find_with_pending_resources().await?;
            let wave: Vec<Arc<Project>> = candidates
                .into_iter()
                .filter(|p| !failed.contains(&p.id))
                .take(self.concurrency.max_projects.max(1))
                .map(Arc::new)
                .collect();

            if wave.is_empty() {
                debug!("no projects with pending resources remain");
                return Ok(());
            }

            let mut runs = JoinSet::new();
            for project in wave {
                let scheduler = self.clone();
                let id = project.id;
                runs.spawn(async move { (id, scheduler.scrape(project).await) });
            }

            while let Some(joined) = runs.join_next().await {
                match joined {
                    Ok((id, Err(_))) => {
                        // 终结事件已在scrape内发出
                        failed.insert(id);
                    }
                    Ok((_, Ok(()))) => {}
                    Err(e) => error!(error = %e, "project run task failed"),
                }
            }
        }
    }

    /// 驱动单个项目的资源队列至排空
    async fn drive(
        &self,
        project: Arc<Project>,
        plugins: Arc<Vec<Box<dyn Plugin>>>,
        limiter: Arc<OriginLimiter>,
    ) -> Result<(), RepositoryError> {
        // 崩溃恢复：上次运行遗留的InProgress资源放回队列
        let reset = self.resources.reset_in_progress(project.id).await?;
        if reset > 0 {
            warn!(count = reset, "reset stale in-progress resources");
        }

        let mut tasks: JoinSet<WorkerOutcome> = JoinSet::new();
        // 任务ID到来源的映射：工作单元panic时也要能归还来源槽位
        let mut origins: HashMap<tokio::task::Id, String> = HashMap::new();

        loop {
            let wait_hint = self
                .fill_slots(&project, &plugins, &limiter, &mut tasks, &mut origins)
                .await?;

            if tasks.is_empty() {
                // 无在途资源：要么项目完成，要么待处理资源
                // 尚未到计划时间/被来源限制挡住
                let pending = self
                    .resources
                    .count_by_status(project.id, ResourceStatus::Pending)
                    .await?;
                if pending == 0 {
                    return Ok(());
                }
                tokio::time::sleep(wait_hint.unwrap_or(IDLE_POLL)).await;
                continue;
            }

            match wait_hint {
                // 来源受限但仍有空槽：等待在途完成或限制解除
                Some(hint) => {
                    tokio::select! {
                        joined = tasks.join_next_with_id() => {
                            if let Some(joined) = joined {
                                self.settle(&limiter, &mut origins, joined).await?;
                            }
                        }
                        _ = tokio::time::sleep(hint) => {}
                    }
                }
                None => {
                    if let Some(joined) = tasks.join_next_with_id().await {
                        self.settle(&limiter, &mut origins, joined).await?;
                    }
                }
            }
        }
    }

    /// 认领资源填满并发槽位
    ///
    /// 来源受限的认领先押着继续往后认领，让其他来源的资源
    /// 不被队首挡住；退出前统一退还且不计尝试。返回来源限制
    /// 给出的最小等待提示（若有）
    async fn fill_slots(
        &self,
        project: &Arc<Project>,
        plugins: &Arc<Vec<Box<dyn Plugin>>>,
        limiter: &Arc<OriginLimiter>,
        tasks: &mut JoinSet<WorkerOutcome>,
        origins: &mut HashMap<tokio::task::Id, String>,
    ) -> Result<Option<Duration>, RepositoryError> {
        let mut throttled: Vec<(Uuid, Uuid)> = Vec::new();
        let mut hint: Option<Duration> = None;

        while tasks.len() < self.concurrency.max_requests.max(1) {
            let worker_id = Uuid::new_v4();
            let Some(resource) = self.resources.claim_next(project.id, worker_id).await? else {
                break;
            };

            let origin = match url::Url::parse(&resource.url) {
                Ok(parsed) => origin_of(&parsed),
                Err(_) => "invalid".to_string(),
            };

            match limiter.try_acquire(&origin) {
                Ok(()) => {
                    debug!(url = %resource.url, attempt = resource.attempt_count, "resource dispatched");
                    let project = project.clone();
                    let plugins = plugins.clone();
                    let client = self.client.clone();
                    let resources = self.resources.clone();
                    let task_origin = origin.clone();
                    let handle = tasks.spawn(async move {
                        let mut ctx = ExecutionContext {
                            project,
                            resource,
                            page: None,
                            client,
                            resources,
                            discovered: Vec::new(),
                        };
                        let result = PipelineExecutor::run(plugins.as_slice(), &mut ctx).await;
                        WorkerOutcome {
                            origin: task_origin,
                            resource: ctx.resource,
                            result,
                        }
                    });
                    origins.insert(handle.id(), origin);
                }
                Err(denial) => {
                    let wait = match denial {
                        Denial::Saturated => IDLE_POLL,
                        Denial::Cooldown(remaining) => remaining,
                    };
                    hint = Some(hint.map_or(wait, |h| h.min(wait)));
                    debug!(origin = %origin, ?denial, "origin throttled, claim held back");
                    throttled.push((resource.id, worker_id));
                }
            }
        }

        for (id, worker_id) in throttled {
            self.resources.release_claim(id, worker_id).await?;
        }
        Ok(hint)
    }

    /// 结算一个已完成的工作单元
    async fn settle(
        &self,
        limiter: &Arc<OriginLimiter>,
        origins: &mut HashMap<tokio::task::Id, String>,
        joined: Result<(tokio::task::Id, WorkerOutcome), tokio::task::JoinError>,
    ) -> Result<(), RepositoryError> {
        let outcome = match joined {
            Ok((task_id, outcome)) => {
                origins.remove(&task_id);
                outcome
            }
            Err(e) => {
                // 资源停留在InProgress，下次运行时由崩溃恢复重置；
                // 来源槽位必须归还，否则该来源对后续资源永久饱和
                if let Some(origin) = origins.remove(&e.id()) {
                    limiter.release(&origin);
                }
                error!(error = %e, "worker task failed");
                return Ok(());
            }
        };

        limiter.release(&outcome.origin);

        match outcome.result {
            Ok(()) => {
                let url = outcome.resource.url.clone();
                match outcome.resource.complete() {
                    Ok(done) => {
                        self.resources.save(&done).await?;
                        debug!(url = %url, "resource done");
                    }
                    Err(e) => warn!(url = %url, error = %e, "illegal completion transition"),
                }
            }
            Err(plugin_err) => self.settle_failure(outcome.resource, plugin_err).await?,
        }

        Ok(())
    }

    /// 失败结算：瞬态失败按退避重新入队，否则置为Errored
    async fn settle_failure(
        &self,
        resource: crate::domain::models::resource::Resource,
        plugin_err: PluginError,
    ) -> Result<(), RepositoryError> {
        let attempts = resource.attempt_count.max(1) as u32;
        let url = resource.url.clone();
        let detail = plugin_err.to_string();

        // retry=N表示首次之外最多再试N次
        if plugin_err.is_transient() && self.retry.should_retry(attempts - 1) {
            let next_at = self.retry.next_retry_time(attempts, Utc::now());
            match resource.requeue(&detail, next_at) {
                Ok(requeued) => {
                    self.resources.save(&requeued).await?;
                    info!(url = %url, attempt = attempts, next_at = %next_at, "transient failure, requeued");
                }
                Err(e) => warn!(url = %url, error = %e, "illegal requeue transition"),
            }
        } else {
            match resource.fail(&detail) {
                Ok(errored) => {
                    self.resources.save(&errored).await?;
                    warn!(url = %url, attempt = attempts, error = %detail, "resource errored");
                }
                Err(e) => warn!(url = %url, error = %e, "illegal failure transition"),
            }
        }

        Ok(())
    }

    /// 按配置返回项目使用的来源限制器
    fn limiter_for_project(&self) -> Arc<OriginLimiter> {
        match self.concurrency.origin_scope {
            OriginScope::Global => self.global_limiter.clone(),
            OriginScope::Project => Arc::new(OriginLimiter::new(
                self.concurrency.max_requests_per_origin,
                Duration::from_millis(self.process.delay),
            )),
        }
    }
}
