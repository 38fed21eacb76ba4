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

/// 入库插件选项
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsertResourcesOpts {
    /// 批量写入的分批大小
    #[serde(alias = "chunk_size")]
    pub chunk_size: usize,
}

impl Default for InsertResourcesOpts {
    fn default() -> Self {
        Self { chunk_size: 100 }
    }
}

/// 新资源入库插件
///
/// 把本轮提取到的URL批量写入资源队列。去重依赖
/// 仓库层的项目内URL唯一约束，重复URL为无操作。
pub struct InsertResourcesPlugin {
    opts: InsertResourcesOpts,
}

pub fn factory(opts: &PluginOpts) -> Result<Box<dyn Plugin>, PluginError> {
    let opts: InsertResourcesOpts = parse_opts("InsertResourcesPlugin", opts)?;
    Ok(Box::new(InsertResourcesPlugin { opts }))
}

#[async_trait]
impl Plugin for InsertResourcesPlugin {
    fn name(&self) -> &'static str {
        "InsertResourcesPlugin"
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities::default()
    }

    fn should_apply(&self, ctx: &ExecutionContext) -> bool {
        !ctx.discovered.is_empty()
    }

    async fn apply(&self, ctx: &mut ExecutionContext) -> Result<ApplyOutcome, PluginError> {
        let seeds = std::mem::take(&mut ctx.discovered);
        let inserted = ctx
            .resources
            .batch_insert(ctx.project.id, &seeds, self.opts.chunk_size)
            .await?;

        debug!(
            project = %ctx.project.name,
            discovered = seeds.len(),
            inserted,
            "queued discovered resources"
        );

        Ok(ApplyOutcome::Continue)
    }
}
