//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"和少量页面操作的能力

use super::surface::{BrowserCookie, Locator, PortalSurface};
use crate::models::SelectOption;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

/// read_options 脚本的返回值（避免直接返回 null）
#[derive(Deserialize)]
struct OptionsReading {
    options: Option<Vec<SelectOption>>,
}

/// 页面上一个可能被点击的元素
#[derive(Debug, Clone, Deserialize)]
struct ClickCandidate {
    /// 在 `querySelectorAll` 结果中的位置（文档顺序）
    index: usize,
    text: String,
    visible: bool,
    /// 被它包含的其他候选的 index
    #[serde(default)]
    contains: Vec<usize>,
}

/// 选出要点击的元素
///
/// 文字匹配且可见的候选中，去掉包含其他匹配候选的外层容器，
/// 再取文字最短的一个；长度相同按文档顺序
fn pick_click_target(candidates: &[ClickCandidate], locator: &Locator) -> Option<usize> {
    let matching: Vec<&ClickCandidate> = candidates
        .iter()
        .filter(|c| c.visible && locator.matches_text(&c.text))
        .collect();

    matching
        .iter()
        .filter(|c| {
            !matching
                .iter()
                .any(|other| other.index != c.index && c.contains.contains(&other.index))
        })
        .min_by_key(|c| (c.text.trim().chars().count(), c.index))
        .map(|c| c.index)
}

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 不认识法院 / 法庭 / 查询
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }
}

#[async_trait]
impl PortalSurface for JsExecutor {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("导航到: {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn is_ready(&self) -> Result<bool> {
        self.eval_as("document.readyState === 'complete'").await
    }

    async fn click_if_visible(&self, locator: &Locator) -> Result<bool> {
        // 先粗筛（包含文字即可），精确匹配和挑选在 pick_click_target 中完成
        let collect_js = format!(
            r#"
            (() => {{
                const loc = {};
                const textOf = el => ((el.innerText || el.value || '') + '').trim();
                const visible = el => {{
                    const rect = el.getBoundingClientRect();
                    const style = window.getComputedStyle(el);
                    return rect.width > 0 && rect.height > 0
                        && style.visibility !== 'hidden' && style.display !== 'none';
                }};
                const wanted = (loc.text || '').trim().toLowerCase();
                const all = Array.from(document.querySelectorAll(loc.selector));
                const picked = all
                    .map((el, index) => ({{ el, index }}))
                    .filter(c => !wanted || textOf(c.el).toLowerCase().includes(wanted));
                return picked.map(c => ({{
                    index: c.index,
                    text: textOf(c.el),
                    visible: visible(c.el),
                    contains: picked
                        .filter(o => o.el !== c.el && c.el.contains(o.el))
                        .map(o => o.index)
                }}));
            }})()
            "#,
            serde_json::to_string(locator)?
        );
        let candidates: Vec<ClickCandidate> = self.eval_as(collect_js).await?;

        let Some(index) = pick_click_target(&candidates, locator) else {
            return Ok(false);
        };
        debug!("点击 {} 的第 {} 个匹配元素", locator, index);

        let click_js = format!(
            r#"
            (() => {{
                const el = document.querySelectorAll({})[{}];
                if (!el) return false;
                el.click();
                return true;
            }})()
            "#,
            serde_json::to_string(&locator.selector)?,
            index
        );
        self.eval_as(click_js).await
    }

    async fn press_escape(&self) -> Result<()> {
        for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let params = DispatchKeyEventParams::builder()
                .r#type(kind)
                .key("Escape")
                .code("Escape")
                .windows_virtual_key_code(27)
                .build()
                .map_err(|e| anyhow!("构建按键事件失败: {}", e))?;
            self.page.execute(params).await?;
        }
        Ok(())
    }

    async fn select_option(&self, select_css: &str, value: &str) -> Result<bool> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.value = {};
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            serde_json::to_string(select_css)?,
            serde_json::to_string(value)?
        );
        self.eval_as(js_code).await
    }

    async fn read_options(
        &self,
        select_css: &str,
        search_frames: bool,
    ) -> Result<Option<Vec<SelectOption>>> {
        // 同源子文档可以直接通过 contentDocument 访问；跨域的会抛异常，忽略即可
        let js_code = format!(
            r#"
            (() => {{
                const selector = {};
                const docs = [];
                const collect = doc => {{
                    docs.push(doc);
                    if (!{}) return;
                    for (const frame of doc.querySelectorAll('iframe, frame')) {{
                        try {{
                            if (frame.contentDocument) collect(frame.contentDocument);
                        }} catch (e) {{}}
                    }}
                }};
                collect(document);
                for (const doc of docs) {{
                    const el = doc.querySelector(selector);
                    if (el && el.options) {{
                        return {{ options: Array.from(el.options).map(o => ({{
                            value: o.value || '',
                            text: (o.textContent || '').trim()
                        }})) }};
                    }}
                }}
                return {{ options: null }};
            }})()
            "#,
            serde_json::to_string(select_css)?,
            search_frames
        );
        let reading: OptionsReading = self.eval_as(js_code).await?;
        Ok(reading.options)
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        let cookies = self.page.get_cookies().await?;
        Ok(cookies
            .into_iter()
            .map(|c| BrowserCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(index: usize, text: &str, contains: &[usize]) -> ClickCandidate {
        ClickCandidate {
            index,
            text: text.to_string(),
            visible: true,
            contains: contains.to_vec(),
        }
    }

    #[test]
    fn test_innermost_match_beats_later_wrapper() {
        let locator = Locator::with_text("a, button, li, span, div", "Case Status");
        let candidates = vec![
            candidate(0, "Home Case Status Cause List", &[1, 2]),
            candidate(1, "Case Status", &[2]),
            candidate(2, "Case Status", &[]),
            // 页脚里的包装 div，文档顺序最靠后
            candidate(9, "Contact | Case Status | Help", &[]),
        ];

        assert_eq!(pick_click_target(&candidates, &locator), Some(2));
    }

    #[test]
    fn test_shortest_text_then_document_order() {
        let locator = Locator::with_text("a", "Case Status");
        let candidates = vec![
            candidate(3, "Case Status (new)", &[]),
            candidate(5, "Case Status", &[]),
            candidate(7, "Case Status", &[]),
        ];

        assert_eq!(pick_click_target(&candidates, &locator), Some(5));
    }

    #[test]
    fn test_exact_text_skips_partial_values() {
        let locator = Locator::with_exact_text("input[type='button']", "OK");
        let candidates = vec![candidate(0, "Book", &[]), candidate(1, " ok ", &[])];
        assert_eq!(pick_click_target(&candidates, &locator), Some(1));

        let only_partial = vec![candidate(0, "Book", &[])];
        assert_eq!(pick_click_target(&only_partial, &locator), None);
    }

    #[test]
    fn test_hidden_candidates_are_ignored() {
        let locator = Locator::css(".modal button");
        let mut hidden = candidate(0, "Close", &[]);
        hidden.visible = false;

        assert_eq!(pick_click_target(&[hidden.clone()], &locator), None);
        assert_eq!(
            pick_click_target(&[hidden, candidate(4, "Close", &[])], &locator),
            Some(4)
        );
    }
}
