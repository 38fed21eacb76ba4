// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::project::DomainError;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 资源实体
///
/// 属于某个项目的单个URL，携带爬取深度和处理状态。
/// 状态转换严格单向：Pending → InProgress → Done/Errored，
/// 唯一的回退边是显式的重试重置（requeue）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// 资源唯一标识符
    pub id: Uuid,
    /// 所属项目ID
    pub project_id: Uuid,
    /// 资源URL，项目内唯一
    pub url: String,
    /// 爬取深度，种子资源为0
    pub depth: i32,
    /// 处理状态
    pub status: ResourceStatus,
    /// 流水线阶段产出的内容/元数据，对调度器不透明
    pub payload: serde_json::Value,
    /// 抓取到的内容类型
    pub content_type: Option<String>,
    /// 出错时保留的最后错误详情
    pub error: Option<String>,
    /// 已尝试次数
    pub attempt_count: i32,
    /// 计划执行时间，重试退避时使用
    pub scheduled_at: Option<DateTime<FixedOffset>>,
    /// 锁定令牌，调度时由认领该资源的工作单元写入
    pub lock_token: Option<Uuid>,
    /// 开始处理时间
    pub started_at: Option<DateTime<FixedOffset>>,
    /// 完成时间
    pub completed_at: Option<DateTime<FixedOffset>>,
    /// 发现时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

/// 资源状态枚举
///
/// 状态转换遵循以下流程：
/// Pending → InProgress → Done/Errored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// 待处理，已入队尚未被认领
    #[default]
    Pending,
    /// 处理中，已被某个工作单元独占认领
    InProgress,
    /// 已完成，流水线成功执行完毕
    Done,
    /// 已出错，重试耗尽或不可重试的失败
    Errored,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResourceStatus::Pending => write!(f, "pending"),
            ResourceStatus::InProgress => write!(f, "in_progress"),
            ResourceStatus::Done => write!(f, "done"),
            ResourceStatus::Errored => write!(f, "errored"),
        }
    }
}

impl FromStr for ResourceStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ResourceStatus::Pending),
            "in_progress" => Ok(ResourceStatus::InProgress),
            "done" => Ok(ResourceStatus::Done),
            "errored" => Ok(ResourceStatus::Errored),
            _ => Err(()),
        }
    }
}

/// 新发现资源的种子，由链接提取阶段产出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSeed {
    pub url: String,
    pub depth: i32,
}

impl Resource {
    /// 创建一个新的待处理资源
    pub fn new(project_id: Uuid, url: &str, depth: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            url: url.to_string(),
            depth,
            status: ResourceStatus::Pending,
            payload: serde_json::Value::Null,
            content_type: None,
            error: None,
            attempt_count: 0,
            scheduled_at: None,
            lock_token: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    /// 开始处理资源
    ///
    /// 将状态从Pending变更为InProgress并记录认领令牌
    pub fn start(mut self, lock_token: Uuid) -> Result<Self, DomainError> {
        match self.status {
            ResourceStatus::Pending => {
                self.status = ResourceStatus::InProgress;
                self.lock_token = Some(lock_token);
                self.started_at = Some(Utc::now().into());
                self.attempt_count += 1;
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 完成资源处理
    ///
    /// 将状态从InProgress变更为Done
    pub fn complete(mut self) -> Result<Self, DomainError> {
        match self.status {
            ResourceStatus::InProgress => {
                self.status = ResourceStatus::Done;
                self.lock_token = None;
                self.completed_at = Some(Utc::now().into());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 标记资源出错
    ///
    /// 将状态从InProgress变更为Errored，保留最后的错误详情
    pub fn fail(mut self, error: &str) -> Result<Self, DomainError> {
        match self.status {
            ResourceStatus::InProgress => {
                self.status = ResourceStatus::Errored;
                self.lock_token = None;
                self.error = Some(error.to_string());
                self.completed_at = Some(Utc::now().into());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 重试重置
    ///
    /// 唯一允许的回退转换：瞬态失败后把资源放回队列，
    /// 记录错误详情并设置退避后的计划执行时间
    pub fn requeue(
        mut self,
        error: &str,
        next_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        match self.status {
            ResourceStatus::InProgress => {
                self.status = ResourceStatus::Pending;
                self.lock_token = None;
                self.started_at = None;
                self.error = Some(error.to_string());
                self.scheduled_at = Some(next_at.into());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }
}
