//! 交互页面抽象 - 基础设施层
//!
//! 门户控制器、拓扑发现、会话桥只通过这个 trait 操作页面，
//! 生产环境由 [`JsExecutor`](super::JsExecutor) 实现，测试中用假页面替换。

use crate::models::SelectOption;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// 页面元素定位器：CSS 选择器，可选再按文字过滤
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locator {
    pub selector: String,
    /// 元素文字（或 input 的 value），忽略大小写和首尾空白
    pub text: Option<String>,
    /// 为真时文字必须完全相同，否则包含即可
    pub exact: bool,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: None,
            exact: false,
        }
    }

    pub fn with_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: Some(text.into()),
            exact: false,
        }
    }

    /// 文字完全相同才算匹配（用于 `input[value=…]` 这类按钮）
    pub fn with_exact_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            exact: true,
            ..Self::with_text(selector, text)
        }
    }

    /// 元素文字是否满足过滤条件
    pub fn matches_text(&self, element_text: &str) -> bool {
        let Some(wanted) = &self.text else {
            return true;
        };
        let wanted = wanted.trim().to_lowercase();
        let actual = element_text.trim().to_lowercase();
        if self.exact {
            actual == wanted
        } else {
            actual.contains(&wanted)
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.text, self.exact) {
            (Some(text), true) => write!(f, "{}:text-is('{}')", self.selector, text),
            (Some(text), false) => write!(f, "{}:has-text('{}')", self.selector, text),
            (None, _) => f.write_str(&self.selector),
        }
    }
}

/// 浏览器 Cookie 的最小视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// 交互页面能力
///
/// 只能由单一逻辑线程驱动：选择法院会改变页面状态，法庭发现依赖这个状态
#[async_trait]
pub trait PortalSurface: Send + Sync {
    /// 导航到指定地址
    async fn navigate(&self, url: &str) -> Result<()>;

    /// 文档是否加载完毕
    async fn is_ready(&self) -> Result<bool>;

    /// 点击最内层的可见匹配元素（文字最短者优先，其次按文档顺序），
    /// 没有可见元素时返回 false
    async fn click_if_visible(&self, locator: &Locator) -> Result<bool>;

    /// 发送 Escape 按键
    async fn press_escape(&self) -> Result<()>;

    /// 在主文档中选中下拉框的某个值并触发 change，找不到下拉框时返回 false
    async fn select_option(&self, select_css: &str, value: &str) -> Result<bool>;

    /// 读取下拉框的全部选项
    ///
    /// `search_frames` 为真时同时搜索所有已挂载的子文档（iframe / frame），
    /// 找不到下拉框时返回 None
    async fn read_options(
        &self,
        select_css: &str,
        search_frames: bool,
    ) -> Result<Option<Vec<SelectOption>>>;

    /// 浏览器 Cookie 罐中的全部 Cookie
    async fn cookies(&self) -> Result<Vec<BrowserCookie>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_match_modes() {
        let loose = Locator::with_text("button", "OK");
        assert!(loose.matches_text("  ok "));
        assert!(loose.matches_text("Book now"));

        let exact = Locator::with_exact_text("input[type='button']", "OK");
        assert!(exact.matches_text(" Ok "));
        assert!(!exact.matches_text("Book now"));
        assert!(!exact.matches_text("OK, got it"));

        assert!(Locator::css(".modal button").matches_text("anything"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Locator::css("#x").to_string(), "#x");
        assert_eq!(Locator::with_text("a", "Case Status").to_string(), "a:has-text('Case Status')");
        assert_eq!(Locator::with_exact_text("input", "OK").to_string(), "input:text-is('OK')");
    }
}
