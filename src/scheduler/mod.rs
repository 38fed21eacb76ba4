// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 调度模块：来源限制与资源调度器

pub mod origin_limiter;
pub mod scheduler;

pub use origin_limiter::OriginLimiter;
pub use scheduler::{ResourceScheduler, SchedulerError};
