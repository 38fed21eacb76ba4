// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::url_utils;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 无效的状态转换，当资源状态转换不符合业务规则时发生
    #[error("Invalid state transition")]
    InvalidStateTransition,

    /// 无效的URL，项目种子URL必须在构造时通过规范化校验
    #[error("Invalid url {0}: {1}")]
    InvalidUrl(String, url::ParseError),

    /// 验证错误，当输入数据不符合领域规则时发生
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 插件配置
///
/// 声明式的流水线阶段配置：注册表键名加上该阶段自有的选项。
/// 选项在插件实例化时按各插件自己的schema反序列化校验。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginOpts {
    /// 插件注册表键名
    pub name: String,
    /// 阶段特定选项
    #[serde(flatten, default)]
    pub opts: serde_json::Value,
}

impl PluginOpts {
    /// 创建无额外选项的插件配置
    ///
    /// 选项为空对象而非Null：flatten序列化要求map
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            opts: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// 项目实体
///
/// 共享同一抓取配置的资源分组，以一个种子URL为根。
/// 项目是恢复执行和导出的基本单位。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// 项目唯一标识符
    pub id: Uuid,
    /// 项目名称，存储中唯一
    pub name: String,
    /// 规范化后的种子URL
    pub url: String,
    /// 有序的插件配置列表
    pub plugin_opts: Vec<PluginOpts>,
    /// 资源计数缓存，加载时由countResources填充
    #[serde(default)]
    pub resource_count: u64,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

impl Project {
    /// 创建一个新的项目
    ///
    /// 种子URL在此处规范化，无效URL立即报错。批量导入资源时
    /// 无效URL是静默跳过的，而项目初始化必须失败。
    ///
    /// # 参数
    ///
    /// * `name` - 项目名称
    /// * `url` - 种子URL
    /// * `plugin_opts` - 有序的插件配置
    ///
    /// # 返回值
    ///
    /// * `Ok(Project)` - 新创建的项目
    /// * `Err(DomainError)` - 种子URL无效
    pub fn new(name: &str, url: &str, plugin_opts: Vec<PluginOpts>) -> Result<Self, DomainError> {
        let normalized = url_utils::normalize_url(url)
            .map_err(|e| DomainError::InvalidUrl(url.to_string(), e))?;

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url: normalized.to_string(),
            plugin_opts,
            resource_count: 0,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        })
    }
}
