// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::project::PluginOpts;
use crate::domain::models::resource::ResourceSeed;
use crate::plugins::builtin::parse_opts;
use crate::plugins::plugin::{
    ApplyOutcome, ExecutionContext, Plugin, PluginCapabilities, PluginError,
};
use crate::utils::url_utils;
use async_trait::async_trait;
use ::scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

/// 链接选择器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorPair {
    /// 链接元素的CSS选择器
    #[serde(alias = "url_selector")]
    pub url_selector: String,
}

/// 链接提取插件选项
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractUrlsOpts {
    /// 最大爬取深度，达到后不再提取
    #[serde(alias = "max_depth")]
    pub max_depth: i32,
    /// 链接选择器列表
    #[serde(alias = "selector_pairs")]
    pub selector_pairs: Vec<SelectorPair>,
    /// 是否跟随到其他来源（跨域链接）
    #[serde(alias = "follow_external")]
    pub follow_external: bool,
}

impl Default for ExtractUrlsOpts {
    fn default() -> Self {
        Self {
            max_depth: 10,
            selector_pairs: vec![SelectorPair {
                url_selector: "a".to_string(),
            }],
            follow_external: false,
        }
    }
}

/// 链接提取插件
///
/// 发现模式的核心阶段：从抓取到的HTML中按选择器提取链接，
/// 解析为绝对URL并作为下一深度的资源种子放入上下文
pub struct ExtractUrlsPlugin {
    opts: ExtractUrlsOpts,
    selectors: Vec<Selector>,
}

pub fn factory(opts: &PluginOpts) -> Result<Box<dyn Plugin>, PluginError> {
    let parsed: ExtractUrlsOpts = parse_opts("ExtractUrlsPlugin", opts)?;

    // 选择器在实例化时解析，无效选择器快速失败
    let selectors = parsed
        .selector_pairs
        .iter()
        .map(|pair| {
            Selector::parse(&pair.url_selector).map_err(|e| PluginError::InvalidConfig {
                plugin: "ExtractUrlsPlugin".to_string(),
                detail: format!("bad selector {}: {}", pair.url_selector, e),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Box::new(ExtractUrlsPlugin {
        opts: parsed,
        selectors,
    }))
}

#[async_trait]
impl Plugin for ExtractUrlsPlugin {
    fn name(&self) -> &'static str {
        "ExtractUrlsPlugin"
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities {
            dom_read: true,
            dom_write: false,
            needs_network: false,
        }
    }

    fn should_apply(&self, ctx: &ExecutionContext) -> bool {
        let is_html = ctx
            .page
            .as_ref()
            .map(|p| p.content_type.contains("text/html"))
            .unwrap_or(false);
        is_html && ctx.resource.depth < self.opts.max_depth
    }

    async fn apply(&self, ctx: &mut ExecutionContext) -> Result<ApplyOutcome, PluginError> {
        let page = ctx
            .page
            .as_ref()
            .ok_or_else(|| PluginError::Execution("no page to extract from".to_string()))?;

        let base_url = url::Url::parse(&ctx.resource.url)
            .map_err(|e| PluginError::Execution(format!("invalid base url: {}", e)))?;
        let base_origin = url_utils::origin_of(&base_url);

        // Html句柄非Send，解析工作收在同步块内完成
        let unique_links = {
            let document = Html::parse_document(&page.content);
            let mut links = HashSet::new();

            for selector in &self.selectors {
                for element in document.select(selector) {
                    let Some(href) = element.value().attr("href") else {
                        continue;
                    };

                    let Ok(absolute) = url_utils::resolve_url(&base_url, href) else {
                        continue;
                    };
                    let Ok(normalized) = url_utils::normalize_url(absolute.as_str()) else {
                        continue;
                    };

                    // 过滤非http/https协议
                    if !matches!(normalized.scheme(), "http" | "https") {
                        continue;
                    }

                    // 过滤自身
                    if normalized.as_str() == ctx.resource.url {
                        continue;
                    }

                    if !self.opts.follow_external
                        && url_utils::origin_of(&normalized) != base_origin
                    {
                        continue;
                    }

                    links.insert(normalized.to_string());
                }
            }
            links
        };

        debug!(
            url = %ctx.resource.url,
            count = unique_links.len(),
            "extracted links"
        );

        let next_depth = ctx.resource.depth + 1;
        for link in unique_links {
            ctx.discovered.push(ResourceSeed {
                url: link,
                depth: next_depth,
            });
        }

        Ok(ApplyOutcome::Continue)
    }
}
