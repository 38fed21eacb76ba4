// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::clients::traits::{ClientCapabilities, ClientError, DomClient, FetchedPage};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// 静态HTML客户端
///
/// 基于reqwest的纯HTTP客户端，不执行JavaScript。
/// 返回的原始HTML可被提取类插件在同步块内解析，
/// 因此声明dom_read能力；不支持DOM交互（dom_write）。
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// 创建新的静态HTML客户端
    ///
    /// # 参数
    ///
    /// * `timeout` - 单次请求超时时间
    ///
    /// # 返回值
    ///
    /// * `Ok(HttpClient)` - 客户端实例
    /// * `Err(ClientError)` - 底层HTTP客户端构建失败
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; harvestrs/0.1; +https://github.com/Kirky-X)")
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DomClient for HttpClient {
    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            dom_read: true,
            dom_write: false,
        }
    }

    async fn fetch(&self, url: &url::Url) -> Result<FetchedPage, ClientError> {
        let start = Instant::now();
        let response = self.client.get(url.clone()).send().await?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        // Ensure content_type is not empty
        let content_type = if content_type.trim().is_empty() {
            "text/html".to_string()
        } else {
            content_type
        };

        let mut headers = std::collections::HashMap::new();
        for (k, v) in response.headers() {
            if let Ok(v_str) = v.to_str() {
                headers.insert(k.as_str().to_string(), v_str.to_string());
            }
        }

        let content = response.text().await?;

        Ok(FetchedPage {
            status_code,
            content,
            content_type,
            headers,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
