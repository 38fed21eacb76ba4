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
use serde::Deserialize;
use tracing::debug;

/// 抓取插件选项
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchOpts {
    /// 仅接受这些内容类型前缀，其余提前终止流水线
    #[serde(alias = "accepted_content_types")]
    pub accepted_content_types: Option<Vec<String>>,
}

/// 抓取插件
///
/// 流水线的第一阶段：通过DOM客户端抓取/渲染资源URL，
/// 把页面放入执行上下文供后续阶段使用
pub struct FetchPlugin {
    opts: FetchOpts,
}

pub fn factory(opts: &PluginOpts) -> Result<Box<dyn Plugin>, PluginError> {
    let opts: FetchOpts = parse_opts("FetchPlugin", opts)?;
    Ok(Box::new(FetchPlugin { opts }))
}

#[async_trait]
impl Plugin for FetchPlugin {
    fn name(&self) -> &'static str {
        "FetchPlugin"
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities {
            dom_read: false,
            dom_write: false,
            needs_network: true,
        }
    }

    fn should_apply(&self, ctx: &ExecutionContext) -> bool {
        ctx.page.is_none()
    }

    async fn apply(&self, ctx: &mut ExecutionContext) -> Result<ApplyOutcome, PluginError> {
        let url = url::Url::parse(&ctx.resource.url)
            .map_err(|e| PluginError::Execution(format!("invalid resource url: {}", e)))?;

        let page = ctx.client.fetch(&url).await?;

        if page.status_code >= 400 {
            return Err(PluginError::Status(page.status_code));
        }

        debug!(
            url = %ctx.resource.url,
            status = page.status_code,
            elapsed_ms = page.response_time_ms,
            "fetched resource"
        );

        ctx.resource.content_type = Some(page.content_type.clone());

        // 内容类型不符时提前终止，资源仍算处理完成
        if let Some(accepted) = &self.opts.accepted_content_types {
            if !accepted.iter().any(|t| page.content_type.starts_with(t)) {
                ctx.page = Some(page);
                return Ok(ApplyOutcome::Stop);
            }
        }

        ctx.page = Some(page);
        Ok(ApplyOutcome::Continue)
    }
}
