// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::clients::traits::ClientError;
use crate::domain::models::project::PluginOpts;
use crate::plugins::builtin::parse_opts;
use crate::plugins::plugin::{
    ApplyOutcome, ExecutionContext, Plugin, PluginCapabilities, PluginError,
};
use async_trait::async_trait;
use serde::Deserialize;

/// 滚动插件选项
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrollOpts {
    /// 最大滚动次数
    pub max_scrolls: u32,
    /// 每次滚动后的等待时间（毫秒）
    pub delay_ms: u64,
}

impl Default for ScrollOpts {
    fn default() -> Self {
        Self {
            max_scrolls: 5,
            delay_ms: 500,
        }
    }
}

/// 滚动插件
///
/// 针对无限滚动页面的DOM交互阶段，要求dom_write能力。
/// 配置了本插件而客户端不具备该能力时，项目在插件
/// 初始化阶段即被拒绝，不会走到这里。
pub struct ScrollPlugin {
    #[allow(dead_code)]
    opts: ScrollOpts,
}

pub fn factory(opts: &PluginOpts) -> Result<Box<dyn Plugin>, PluginError> {
    let opts: ScrollOpts = parse_opts("ScrollPlugin", opts)?;
    Ok(Box::new(ScrollPlugin { opts }))
}

#[async_trait]
impl Plugin for ScrollPlugin {
    fn name(&self) -> &'static str {
        "ScrollPlugin"
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities {
            dom_read: true,
            dom_write: true,
            needs_network: false,
        }
    }

    fn should_apply(&self, ctx: &ExecutionContext) -> bool {
        ctx.page.is_some() && ctx.client.capabilities().dom_write
    }

    async fn apply(&self, ctx: &mut ExecutionContext) -> Result<ApplyOutcome, PluginError> {
        // DOM交互契约由浏览器类客户端扩展提供
        Err(PluginError::Client(ClientError::CapabilityNotSupported(
            format!("{} cannot scroll", ctx.client.name()),
        )))
    }
}
