// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::project::PluginOpts;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含存储、DOM客户端、抓取定义、并发与处理策略等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// DOM客户端配置
    pub dom: DomSettings,
    /// 抓取定义（项目配置）
    pub scrape: Option<ScrapeDefinition>,
    /// 并发控制配置
    #[serde(default)]
    pub concurrency: ConcurrencyOptions,
    /// 处理策略配置
    #[serde(default)]
    pub process: ProcessOptions,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// DOM客户端配置设置
#[derive(Debug, Deserialize)]
pub struct DomSettings {
    /// 客户端类型 (http)
    pub client: String,
    /// 单次抓取超时时间（秒）
    pub timeout: Option<u64>,
}

/// 抓取定义
///
/// 声明一个项目：名称、种子URL和有序的插件配置
///
/// JSON侧使用camelCase，配置文件侧接受snake_case别名
/// （config库会把文件键统一转小写）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeDefinition {
    /// 项目名称
    pub name: String,
    /// 种子URL
    pub url: String,
    /// 有序的插件配置，缺省使用内置默认流水线
    #[serde(default, alias = "plugin_opts")]
    pub plugin_opts: Vec<PluginOpts>,
    /// 批量导入的URL清单文件，每行一个URL
    #[serde(alias = "resource_path")]
    pub resource_path: Option<String>,
}

/// 来源并发限制的作用域
///
/// 发现模式同时推进多个项目时，同一来源的并发上限
/// 可按项目独立计数，也可跨项目全局计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OriginScope {
    /// 每个项目独立计数
    #[default]
    Project,
    /// 跨项目全局计数
    Global,
}

/// 并发控制配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConcurrencyOptions {
    /// 全局同时在途资源上限
    #[serde(alias = "max_requests")]
    pub max_requests: usize,
    /// 单一来源同时在途资源上限（礼貌性限制）
    #[serde(alias = "max_requests_per_origin")]
    pub max_requests_per_origin: usize,
    /// 发现模式下同时推进的项目上限
    #[serde(alias = "max_projects")]
    pub max_projects: usize,
    /// 来源限制的作用域
    #[serde(alias = "origin_scope")]
    pub origin_scope: OriginScope,
}

impl Default for ConcurrencyOptions {
    fn default() -> Self {
        Self {
            max_requests: 4,
            max_requests_per_origin: 1,
            max_projects: 1,
            origin_scope: OriginScope::default(),
        }
    }
}

/// 处理策略配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessOptions {
    /// 瞬态失败的最大重试次数
    pub retry: u32,
    /// 对同一来源连续抓取之间的间隔（毫秒）
    pub delay: u64,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            retry: 3,
            delay: 1000,
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件和环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Default DB pool settings
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 2)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default DOM client settings
            .set_default("dom.client", "http")?
            .set_default("dom.timeout", 30)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("HARVESTRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}
