// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 规范化URL
///
/// 解析并重新序列化URL，统一主机名大小写、默认端口和根路径斜杠，
/// 使同一地址的不同写法得到相同的规范形式
///
/// # 参数
///
/// * `raw` - 原始URL字符串
///
/// # 返回值
///
/// * `Ok(Url)` - 规范化后的URL
/// * `Err(ParseError)` - URL无效
pub fn normalize_url(raw: &str) -> Result<Url, ParseError> {
    let mut url = Url::parse(raw.trim())?;

    // 丢弃fragment，同一页面的锚点不构成新资源
    url.set_fragment(None);

    Ok(url)
}

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 提取URL的来源标识（scheme://host:port）
///
/// 用于按站点分组的并发限制，无法确定主机的URL归入"opaque"组
pub fn origin_of(url: &Url) -> String {
    match url.host_str() {
        Some(host) => match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        },
        None => "opaque".to_string(),
    }
}
