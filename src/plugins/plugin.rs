// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::clients::traits::{ClientError, DomClient, FetchedPage};
use crate::domain::models::project::Project;
use crate::domain::models::resource::{Resource, ResourceSeed};
use crate::domain::repositories::project_repository::RepositoryError;
use crate::domain::repositories::resource_repository::ResourceRepository;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// 插件错误类型
#[derive(Error, Debug)]
pub enum PluginError {
    /// 未注册的插件名
    #[error("Unknown plugin {0}")]
    UnknownPlugin(String),

    /// 插件选项缺失或格式错误，实例化时校验失败
    #[error("Invalid config for plugin {plugin}: {detail}")]
    InvalidConfig { plugin: String, detail: String },

    /// DOM客户端错误
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// 非成功的HTTP状态
    #[error("Fetch returned status {0}")]
    Status(u16),

    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// 阶段执行错误
    #[error("Execution error: {0}")]
    Execution(String),
}

impl PluginError {
    /// 判断错误是否为瞬态失败
    ///
    /// 瞬态失败（网络/超时/服务端错误）按processOpts重试，
    /// 其余失败直接将资源置为Errored
    pub fn is_transient(&self) -> bool {
        match self {
            PluginError::Client(e) => e.is_retryable(),
            PluginError::Status(code) => (500..600).contains(code),
            _ => false,
        }
    }
}

/// 插件能力声明
///
/// 调度器依据这些标志判断项目是否需要具备DOM能力的客户端，
/// 流水线依据它们决定阶段的跳过条件
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginCapabilities {
    /// 读取DOM
    pub dom_read: bool,
    /// 修改DOM
    pub dom_write: bool,
    /// 需要网络访问
    pub needs_network: bool,
}

/// 阶段执行结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// 继续执行后续阶段
    Continue,
    /// 提前终止本资源的流水线（例如内容类型不符）
    Stop,
}

/// 流水线执行上下文
///
/// 同一资源的各阶段顺序共享：当前资源、抓取到的页面、
/// 项目引用以及本轮新发现的URL。DOM句柄不在此处持有，
/// 需要DOM的阶段在同步块内从`page.content`解析。
pub struct ExecutionContext {
    /// 所属项目
    pub project: Arc<Project>,
    /// 当前处理的资源，各阶段可变更/注解
    pub resource: Resource,
    /// 抓取阶段填充的页面
    pub page: Option<FetchedPage>,
    /// DOM客户端
    pub client: Arc<dyn DomClient>,
    /// 资源仓库，持久化类阶段使用
    pub resources: Arc<dyn ResourceRepository>,
    /// 本轮提取到的新URL，发现模式下入队
    pub discovered: Vec<ResourceSeed>,
}

/// 插件特质
///
/// 具名、可配置的流水线阶段。每次调用无状态，
/// 对单个资源顺序执行，不同资源的流水线并发执行。
#[async_trait]
pub trait Plugin: Send + Sync {
    /// 插件名称（注册表键名）
    fn name(&self) -> &'static str;

    /// 能力声明
    fn capabilities(&self) -> PluginCapabilities;

    /// 激活判定，决定是否对当前资源执行本阶段
    fn should_apply(&self, ctx: &ExecutionContext) -> bool;

    /// 对当前资源执行本阶段
    async fn apply(&self, ctx: &mut ExecutionContext) -> Result<ApplyOutcome, PluginError>;
}
