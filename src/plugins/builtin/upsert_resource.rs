// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::project::PluginOpts;
use crate::plugins::plugin::{
    ApplyOutcome, ExecutionContext, Plugin, PluginCapabilities, PluginError,
};
use async_trait::async_trait;

/// 资源保存插件
///
/// 流水线的收尾阶段：把前序阶段对资源的变更
/// （payload、content_type）写回仓库。最终的状态转换
/// 由调度器在流水线结束后统一落库。
pub struct UpsertResourcePlugin;

pub fn factory(_opts: &PluginOpts) -> Result<Box<dyn Plugin>, PluginError> {
    Ok(Box::new(UpsertResourcePlugin))
}

#[async_trait]
impl Plugin for UpsertResourcePlugin {
    fn name(&self) -> &'static str {
        "UpsertResourcePlugin"
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities::default()
    }

    fn should_apply(&self, _ctx: &ExecutionContext) -> bool {
        true
    }

    async fn apply(&self, ctx: &mut ExecutionContext) -> Result<ApplyOutcome, PluginError> {
        let saved = ctx.resources.save(&ctx.resource).await?;
        ctx.resource = saved;
        Ok(ApplyOutcome::Continue)
    }
}
