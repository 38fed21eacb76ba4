// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::project::Project;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

/// 抓取生命周期事件
///
/// 每个项目恰好收到一个终结事件：ProjectScraped或ProjectError。
/// 项目解析失败（尚无项目实体）时project为None。
#[derive(Debug, Clone)]
pub enum ScrapeEvent {
    /// 项目抓取完毕：队列中不再有待处理资源
    ProjectScraped { project: Arc<Project> },
    /// 项目级失败：配置错误、插件解析失败或仓库不可用
    ProjectError {
        project: Option<Arc<Project>>,
        error: String,
    },
}

/// 事件总线
///
/// 基于广播通道的发布/订阅。发送方不关心是否有订阅者，
/// 慢订阅者可能丢事件（Lagged），终结事件去重由总线保证。
pub struct EventBus {
    sender: broadcast::Sender<ScrapeEvent>,
    /// 已发出终结事件的项目，保证每项目恰好一个终结事件
    terminated: DashMap<Uuid, ()>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            terminated: DashMap::new(),
        }
    }

    /// 订阅事件流
    pub fn subscribe(&self) -> broadcast::Receiver<ScrapeEvent> {
        self.sender.subscribe()
    }

    /// 发出项目完成事件
    pub fn project_scraped(&self, project: Arc<Project>) {
        if !self.mark_terminal(project.id) {
            warn!(project = %project.name, "terminal event already emitted, skipping");
            return;
        }
        let _ = self.sender.send(ScrapeEvent::ProjectScraped { project });
    }

    /// 发出项目失败事件
    ///
    /// project为None表示项目尚未成功解析（例如种子URL非法），
    /// 此类事件不做去重
    pub fn project_error(&self, project: Option<Arc<Project>>, error: impl Into<String>) {
        if let Some(p) = &project {
            if !self.mark_terminal(p.id) {
                warn!(project = %p.name, "terminal event already emitted, skipping");
                return;
            }
        }
        let _ = self.sender.send(ScrapeEvent::ProjectError {
            project,
            error: error.into(),
        });
    }

    /// 新一轮运行开始，允许该项目再次发出终结事件
    pub fn begin_project(&self, project_id: Uuid) {
        self.terminated.remove(&project_id);
    }

    /// 登记终结事件，返回是否为首次
    fn mark_terminal(&self, project_id: Uuid) -> bool {
        self.terminated.insert(project_id, ()).is_none()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
