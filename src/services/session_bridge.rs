//! 会话桥 - 业务能力层
//!
//! 把浏览器里已建立的门户会话（Cookie）导出给无头 HTTP 客户端使用

use crate::error::GatewayError;
use crate::infrastructure::{BrowserCookie, PortalSurface};
use crate::models::SessionTokens;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// 会话桥
///
/// 职责：
/// - 读取浏览器 Cookie 罐中属于门户域名的 Cookie
/// - 对页面没有任何副作用
pub struct SessionBridge {
    portal_host: String,
}

impl SessionBridge {
    pub fn new(portal_host: impl Into<String>) -> Self {
        Self {
            portal_host: portal_host.into().to_lowercase(),
        }
    }

    /// 从门户地址中取出主机名
    pub fn for_url(portal_url: &str) -> Result<Self> {
        let url = url::Url::parse(portal_url)
            .with_context(|| format!("无法解析门户地址: {}", portal_url))?;
        let host = url
            .host_str()
            .with_context(|| format!("门户地址缺少主机名: {}", portal_url))?;
        Ok(Self::new(host))
    }

    /// 导出当前会话
    pub async fn snapshot<S: PortalSurface + ?Sized>(
        &self,
        surface: &S,
    ) -> Result<SessionTokens, GatewayError> {
        let cookies = surface
            .cookies()
            .await
            .map_err(|e| GatewayError::SessionUnavailable(format!("读取浏览器 Cookie 失败: {:#}", e)))?;
        let total = cookies.len();

        let tokens: SessionTokens = cookies
            .into_iter()
            .filter(|c| self.in_scope(c))
            .map(|c| (c.name, c.value))
            .collect();

        info!("🍪 已导出会话 Cookie: {}/{} 个", tokens.len(), total);
        debug!("Cookie 名称: {:?}", tokens.names().collect::<Vec<_>>());

        Ok(tokens)
    }

    /// Cookie 域名是否覆盖门户主机（含 `.example.com` 形式的父域）
    fn in_scope(&self, cookie: &BrowserCookie) -> bool {
        let domain = cookie.domain.trim_start_matches('.').to_lowercase();
        !domain.is_empty()
            && (self.portal_host == domain || self.portal_host.ends_with(&format!(".{}", domain)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(domain: &str) -> BrowserCookie {
        BrowserCookie {
            name: "PHPSESSID".to_string(),
            value: "v".to_string(),
            domain: domain.to_string(),
        }
    }

    #[test]
    fn test_for_url_extracts_host() {
        let bridge = SessionBridge::for_url("https://hcservices.ecourts.gov.in/hcservices/main.php").unwrap();
        assert_eq!(bridge.portal_host, "hcservices.ecourts.gov.in");
        assert!(SessionBridge::for_url("not a url").is_err());
    }

    #[test]
    fn test_cookie_scope() {
        let bridge = SessionBridge::new("hcservices.ecourts.gov.in");
        assert!(bridge.in_scope(&cookie("hcservices.ecourts.gov.in")));
        assert!(bridge.in_scope(&cookie(".ecourts.gov.in")));
        assert!(!bridge.in_scope(&cookie("tracker.example.com")));
        assert!(!bridge.in_scope(&cookie("courts.gov.in.evil")));
        assert!(!bridge.in_scope(&cookie("")));
    }
}
