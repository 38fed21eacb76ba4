// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::project::PluginOpts;
use crate::plugins::builtin::parse_opts;
use crate::plugins::plugin::{
    ApplyOutcome, ExecutionContext, Plugin, PluginCapabilities, PluginError,
};
use async_trait::async_trait;
use ::scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::json;

/// 内容选择器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSelector {
    /// 内容元素的CSS选择器
    #[serde(alias = "content_selector")]
    pub content_selector: String,
    /// 导出时使用的列名，缺省取选择器本身
    pub label: Option<String>,
}

/// 内容提取插件选项
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractHtmlContentOpts {
    /// 内容选择器列表
    #[serde(alias = "selector_pairs")]
    pub selector_pairs: Vec<ContentSelector>,
}

/// 内容提取插件
///
/// 抓取模式的提取阶段：按选择器收集文本内容，
/// 以label为键写入资源的payload
pub struct ExtractHtmlContentPlugin {
    opts: ExtractHtmlContentOpts,
    selectors: Vec<Selector>,
}

pub fn factory(opts: &PluginOpts) -> Result<Box<dyn Plugin>, PluginError> {
    let parsed: ExtractHtmlContentOpts = parse_opts("ExtractHtmlContentPlugin", opts)?;

    let selectors = parsed
        .selector_pairs
        .iter()
        .map(|pair| {
            Selector::parse(&pair.content_selector).map_err(|e| PluginError::InvalidConfig {
                plugin: "ExtractHtmlContentPlugin".to_string(),
                detail: format!("bad selector {}: {}", pair.content_selector, e),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Box::new(ExtractHtmlContentPlugin {
        opts: parsed,
        selectors,
    }))
}

#[async_trait]
impl Plugin for ExtractHtmlContentPlugin {
    fn name(&self) -> &'static str {
        "ExtractHtmlContentPlugin"
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities {
            dom_read: true,
            dom_write: false,
            needs_network: false,
        }
    }

    fn should_apply(&self, ctx: &ExecutionContext) -> bool {
        !self.selectors.is_empty()
            && ctx
                .page
                .as_ref()
                .map(|p| p.content_type.contains("text/html"))
                .unwrap_or(false)
    }

    async fn apply(&self, ctx: &mut ExecutionContext) -> Result<ApplyOutcome, PluginError> {
        let page = ctx
            .page
            .as_ref()
            .ok_or_else(|| PluginError::Execution("no page to extract from".to_string()))?;

        let extracted = {
            let document = Html::parse_document(&page.content);
            let mut content = serde_json::Map::new();

            for (pair, selector) in self.opts.selector_pairs.iter().zip(&self.selectors) {
                let values: Vec<String> = document
                    .select(selector)
                    .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
                    .filter(|text| !text.is_empty())
                    .collect();

                let label = pair.label.clone().unwrap_or_else(|| pair.content_selector.clone());
                content.insert(label, json!(values));
            }
            content
        };

        // 追加到payload，不覆盖前序阶段写入的其他键
        if !ctx.resource.payload.is_object() {
            ctx.resource.payload = json!({});
        }
        if let Some(obj) = ctx.resource.payload.as_object_mut() {
            obj.insert("content".to_string(), serde_json::Value::Object(extracted));
        }

        Ok(ApplyOutcome::Continue)
    }
}
