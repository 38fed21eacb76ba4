// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::clients::traits::ClientCapabilities;
use crate::domain::models::project::PluginOpts;
use crate::plugins::builtin;
use crate::plugins::plugin::{Plugin, PluginError};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::warn;

/// 插件工厂函数
///
/// 接收声明式选项，校验通过后返回插件实例
pub type PluginFactory = fn(&PluginOpts) -> Result<Box<dyn Plugin>, PluginError>;

/// 插件注册表
///
/// 进程级的名称到工厂的查找表，启动时填充一次。
/// 重复注册采用后者覆盖（last-wins）并记录警告，保证行为确定。
pub struct PluginRegistry {
    factories: RwLock<HashMap<String, PluginFactory>>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// 创建已注册全部内置插件的注册表
    pub fn builtin() -> Self {
        let registry = Self::new();
        registry.register("FetchPlugin", builtin::fetch::factory);
        registry.register("ExtractUrlsPlugin", builtin::extract_urls::factory);
        registry.register(
            "ExtractHtmlContentPlugin",
            builtin::extract_html_content::factory,
        );
        registry.register("InsertResourcesPlugin", builtin::insert_resources::factory);
        registry.register("UpsertResourcePlugin", builtin::upsert_resource::factory);
        registry.register("ScrollPlugin", builtin::scroll::factory);
        registry
    }

    /// 缺省流水线配置：抓取、提取链接与内容、入队、落盘
    pub fn default_pipeline() -> Vec<PluginOpts> {
        [
            "FetchPlugin",
            "ExtractUrlsPlugin",
            "ExtractHtmlContentPlugin",
            "InsertResourcesPlugin",
            "UpsertResourcePlugin",
        ]
        .iter()
        .map(|name| PluginOpts::named(name))
        .collect()
    }

    /// 注册插件工厂
    ///
    /// # 参数
    ///
    /// * `name` - 注册表键名
    /// * `factory` - 工厂函数
    pub fn register(&self, name: &str, factory: PluginFactory) {
        let mut factories = self.factories.write();
        if factories.insert(name.to_string(), factory).is_some() {
            warn!("Plugin {} re-registered, previous factory replaced", name);
        }
    }

    /// 解析插件工厂
    ///
    /// # 返回值
    ///
    /// * `Ok(PluginFactory)` - 对应的工厂函数
    /// * `Err(PluginError::UnknownPlugin)` - 名称未注册
    pub fn resolve(&self, name: &str) -> Result<PluginFactory, PluginError> {
        self.factories
            .read()
            .get(name)
            .copied()
            .ok_or_else(|| PluginError::UnknownPlugin(name.to_string()))
    }

    /// 按配置实例化单个插件
    pub fn instantiate(&self, opts: &PluginOpts) -> Result<Box<dyn Plugin>, PluginError> {
        let factory = self.resolve(&opts.name)?;
        factory(opts)
    }

    /// 按项目配置实例化整条流水线并做能力校验
    ///
    /// 所有阶段在任何资源被处理前实例化完毕；请求DOM读写的
    /// 插件搭配能力不足的客户端时在此处快速失败，而不是爬取中途。
    ///
    /// # 参数
    ///
    /// * `plugin_opts` - 有序的插件配置
    /// * `caps` - 当前DOM客户端的能力
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<Box<dyn Plugin>>)` - 按配置顺序的插件实例
    /// * `Err(PluginError)` - 未知插件、选项非法或客户端能力不足
    pub fn init_pipeline(
        &self,
        plugin_opts: &[PluginOpts],
        caps: ClientCapabilities,
    ) -> Result<Vec<Box<dyn Plugin>>, PluginError> {
        let plugins = plugin_opts
            .iter()
            .map(|opts| self.instantiate(opts))
            .collect::<Result<Vec<_>, _>>()?;

        let dom_plugins: Vec<&'static str> = plugins
            .iter()
            .filter(|p| {
                let need = p.capabilities();
                (need.dom_read && !caps.dom_read) || (need.dom_write && !caps.dom_write)
            })
            .map(|p| p.name())
            .collect();

        if !dom_plugins.is_empty() {
            return Err(PluginError::Execution(format!(
                "Attempting to run DOM plugins ({}) without a capable client",
                dom_plugins.join(", ")
            )));
        }

        Ok(plugins)
    }
}
