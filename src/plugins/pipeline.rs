// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::plugins::plugin::{ApplyOutcome, ExecutionContext, Plugin, PluginError};
use tracing::{debug, instrument};

/// 流水线执行器
///
/// 对单个资源顺序执行项目配置的插件序列。阶段间通过
/// 执行上下文传递状态（插件可能依赖前序阶段的产出），
/// 不同资源的流水线由调度器并发驱动。
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// 对上下文中的资源执行一遍流水线
    ///
    /// 每个阶段先经激活判定，跳过不适用的阶段；阶段可请求
    /// 提前终止（Stop）。任一阶段出错立即返回，错误由调用方
    /// 记在该资源上，不跨资源传播。
    ///
    /// # 参数
    ///
    /// * `plugins` - 按项目配置排序的插件实例
    /// * `ctx` - 执行上下文
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 流水线执行完毕（含提前终止）
    /// * `Err(PluginError)` - 某个阶段失败
    #[instrument(skip(plugins, ctx), fields(url = %ctx.resource.url, project = %ctx.project.name))]
    pub async fn run(
        plugins: &[Box<dyn Plugin>],
        ctx: &mut ExecutionContext,
    ) -> Result<(), PluginError> {
        for plugin in plugins {
            if !plugin.should_apply(ctx) {
                debug!(plugin = plugin.name(), "stage skipped");
                continue;
            }

            debug!(plugin = plugin.name(), "stage apply");
            match plugin.apply(ctx).await? {
                ApplyOutcome::Continue => {}
                ApplyOutcome::Stop => {
                    debug!(plugin = plugin.name(), "pipeline stopped early");
                    break;
                }
            }
        }

        Ok(())
    }
}
