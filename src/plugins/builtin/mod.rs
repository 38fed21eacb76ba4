// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 内置插件模块
///
/// 默认的流水线阶段集合：抓取、链接提取、内容提取、持久化
pub mod extract_html_content;
pub mod extract_urls;
pub mod fetch;
pub mod insert_resources;
pub mod scroll;
pub mod upsert_resource;

use crate::domain::models::project::PluginOpts;
use crate::plugins::plugin::PluginError;
use serde::de::DeserializeOwned;

/// 按插件自己的schema反序列化声明式选项
///
/// 选项缺失时回退到各字段默认值，格式错误立即报InvalidConfig
pub(crate) fn parse_opts<T>(plugin: &str, opts: &PluginOpts) -> Result<T, PluginError>
where
    T: DeserializeOwned + Default,
{
    if opts.opts.is_null() {
        return Ok(T::default());
    }

    serde_json::from_value(opts.opts.clone()).map_err(|e| PluginError::InvalidConfig {
        plugin: plugin.to_string(),
        detail: e.to_string(),
    })
}
