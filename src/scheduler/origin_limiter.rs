// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// 来源槽位申请被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// 该来源的在途资源已达上限
    Saturated,
    /// 距离上次对该来源的调度未满礼貌间隔
    Cooldown(Duration),
}

#[derive(Debug)]
struct OriginState {
    inflight: usize,
    last_dispatch: Option<Instant>,
}

/// 来源并发限制器
///
/// 按来源（scheme://host:port）跟踪在途资源数和最近一次
/// 调度时间，实现"不集中轰炸单一站点"的礼貌性约束。
/// 间隔是通过延迟调度实现的软保证，不做全局串行化。
pub struct OriginLimiter {
    /// 单一来源同时在途上限
    max_per_origin: usize,
    /// 同一来源连续调度的最小间隔
    delay: Duration,
    /// 各来源的状态
    origins: DashMap<String, OriginState>,
}

impl OriginLimiter {
    /// 创建新的来源限制器
    ///
    /// # 参数
    ///
    /// * `max_per_origin` - 单一来源并发上限，0视为1
    /// * `delay` - 同一来源连续调度间隔
    pub fn new(max_per_origin: usize, delay: Duration) -> Self {
        Self {
            max_per_origin: max_per_origin.max(1),
            delay,
            origins: DashMap::new(),
        }
    }

    /// 尝试占用一个来源槽位
    ///
    /// 成功时记录在途数和调度时间；拒绝时调用方应将资源
    /// 放回队列并按提示退避
    pub fn try_acquire(&self, origin: &str) -> Result<(), Denial> {
        let mut entry = self
            .origins
            .entry(origin.to_string())
            .or_insert(OriginState {
                inflight: 0,
                last_dispatch: None,
            });

        if entry.inflight >= self.max_per_origin {
            return Err(Denial::Saturated);
        }

        if let Some(last) = entry.last_dispatch {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                return Err(Denial::Cooldown(self.delay - elapsed));
            }
        }

        entry.inflight += 1;
        entry.last_dispatch = Some(Instant::now());
        Ok(())
    }

    /// 释放一个来源槽位
    pub fn release(&self, origin: &str) {
        if let Some(mut entry) = self.origins.get_mut(origin) {
            entry.inflight = entry.inflight.saturating_sub(1);
        }
    }

    /// 当前某来源的在途资源数
    pub fn inflight(&self, origin: &str) -> usize {
        self.origins.get(origin).map(|s| s.inflight).unwrap_or(0)
    }
}
