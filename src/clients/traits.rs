// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// 客户端错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 客户端能力不足，请求了客户端不支持的DOM操作
    #[error("Capability not supported: {0}")]
    CapabilityNotSupported(String),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl ClientError {
    /// 判断错误是否为瞬态（可重试）
    ///
    /// # 返回值
    ///
    /// 网络/超时类错误返回true，否则返回false
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RequestFailed(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            ClientError::Timeout => true,
            _ => false,
        }
    }
}

/// DOM客户端能力声明
///
/// 调度器据此在插件初始化阶段校验项目配置：
/// 请求DOM读写的插件必须搭配具备相应能力的客户端
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientCapabilities {
    /// 可读取渲染后的DOM
    pub dom_read: bool,
    /// 可修改DOM（滚动、点击等交互）
    pub dom_write: bool,
}

/// 抓取到的页面
///
/// DOM句柄不跨越await点传递：原始内容以字符串形式携带，
/// 需要DOM的插件在同步块内自行解析
pub struct FetchedPage {
    /// HTTP状态码
    pub status_code: u16,
    /// 响应内容
    pub content: String,
    /// 内容类型
    pub content_type: String,
    /// 响应头
    pub headers: HashMap<String, String>,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

/// DOM客户端特质
///
/// 抓取/渲染一个URL并返回提取后的内容。具体实现
/// （无头浏览器驱动、纯HTML解析客户端）是外部协作者，
/// 核心只依赖这份能力契约。
#[async_trait]
pub trait DomClient: Send + Sync {
    /// 客户端能力声明
    fn capabilities(&self) -> ClientCapabilities;

    /// 抓取/渲染URL
    async fn fetch(&self, url: &url::Url) -> Result<FetchedPage, ClientError>;

    /// 客户端名称
    fn name(&self) -> &'static str;
}
