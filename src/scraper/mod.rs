// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 抓取入口模块：门面与生命周期事件

pub mod events;
pub mod scraper;

pub use events::{EventBus, ScrapeEvent};
pub use scraper::{ScrapeError, ScrapeMode, Scraper, ScraperState};
