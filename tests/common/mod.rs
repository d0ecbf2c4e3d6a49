//! 集成测试共用的假页面 / 假门户 / 假验证码策略
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use case_status_scout::error::TransportError;
use case_status_scout::infrastructure::{BrowserCookie, Locator, PortalSurface};
use case_status_scout::models::{SelectOption, SessionTokens};
use case_status_scout::services::captcha::{CaptchaResolver, CaptchaStrategy};
use case_status_scout::services::portal_http::{PortalHttp, SearchForm};
use case_status_scout::services::SearchPolicy;
use case_status_scout::workflow::SessionProvider;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HEADER_ROW: &str = "<tr><th>Case</th><th>Party</th><th>Next Date</th><th>Status</th></tr>";

/// 拼一张结果表格
pub fn results_table(rows: &[[&str; 4]]) -> String {
    let body: String = rows
        .iter()
        .map(|r| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                r[0], r[1], r[2], r[3]
            )
        })
        .collect();
    format!(
        r#"<html><body><table id="searchResults">{}{}</table></body></html>"#,
        HEADER_ROW, body
    )
}

pub fn no_table_page() -> String {
    "<html><body><div id='loading'>Please wait</div></body></html>".to_string()
}

/// 零等待的重试策略
pub fn fast_policy() -> SearchPolicy {
    SearchPolicy {
        retry_backoff: Duration::ZERO,
        ..SearchPolicy::default()
    }
}

pub fn tokens(value: &str) -> SessionTokens {
    [("PHPSESSID", value)].into_iter().collect()
}

// ========== 假门户 HTTP ==========

/// 按脚本依次返回响应的门户
#[derive(Default)]
pub struct ScriptedPortal {
    challenges: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
    submissions: Mutex<VecDeque<Result<String, TransportError>>>,
    pub fetches: AtomicUsize,
    pub submits: AtomicUsize,
    forms: Mutex<Vec<SearchForm>>,
    sessions: Mutex<Vec<String>>,
}

impl ScriptedPortal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次返回的搜索响应正文
    pub fn with_pages(pages: Vec<String>) -> Self {
        let portal = Self::new();
        for page in pages {
            portal.push_submission(Ok(page));
        }
        portal
    }

    pub fn push_challenge(&self, response: Result<Vec<u8>, TransportError>) {
        self.challenges.lock().unwrap().push_back(response);
    }

    pub fn push_submission(&self, response: Result<String, TransportError>) {
        self.submissions.lock().unwrap().push_back(response);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn forms(&self) -> Vec<SearchForm> {
        self.forms.lock().unwrap().clone()
    }

    /// 每次提交时携带的 Cookie 头
    pub fn submitted_sessions(&self) -> Vec<String> {
        self.sessions.lock().unwrap().clone()
    }
}

pub fn forbidden() -> TransportError {
    TransportError::Unauthenticated {
        endpoint: "index_qry.php".to_string(),
        status: 403,
    }
}

pub fn bad_gateway() -> TransportError {
    TransportError::BadStatus {
        endpoint: "index_qry.php".to_string(),
        status: 502,
    }
}

#[async_trait]
impl PortalHttp for ScriptedPortal {
    async fn fetch_challenge(&self, _session: &SessionTokens) -> Result<Vec<u8>, TransportError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.challenges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("captcha-image-{}", n).into_bytes()))
    }

    async fn submit_search(
        &self,
        session: &SessionTokens,
        form: &SearchForm,
    ) -> Result<String, TransportError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.forms.lock().unwrap().push(form.clone());
        self.sessions.lock().unwrap().push(session.cookie_header());
        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(no_table_page()))
    }
}

// ========== 假验证码策略 ==========

/// 固定答案的策略，记录调用次数和收到的图片
pub struct FixedAnswer {
    answer: Option<String>,
    calls: Arc<AtomicUsize>,
    images: Arc<Mutex<Vec<Vec<u8>>>>,
}

#[async_trait]
impl CaptchaStrategy for FixedAnswer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn solve(&self, image_bytes: &[u8]) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.images.lock().unwrap().push(image_bytes.to_vec());
        self.answer.clone()
    }
}

/// 识别器 + 观察句柄
pub struct ScriptedCaptcha {
    pub resolver: Arc<CaptchaResolver>,
    pub calls: Arc<AtomicUsize>,
    pub images: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ScriptedCaptcha {
    pub fn answering(answer: Option<&str>) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let images = Arc::new(Mutex::new(Vec::new()));
        let strategy = FixedAnswer {
            answer: answer.map(str::to_string),
            calls: calls.clone(),
            images: images.clone(),
        };
        Self {
            resolver: Arc::new(CaptchaResolver::new(vec![Box::new(strategy)])),
            calls,
            images,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

// ========== 假会话来源 ==========

/// 每次刷新生成 `session-N` 的会话
pub struct CountingSessions {
    current: Mutex<SessionTokens>,
    pub refreshes: AtomicUsize,
    fail_refresh: bool,
}

impl CountingSessions {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(tokens("session-0")),
            refreshes: AtomicUsize::new(0),
            fail_refresh: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_refresh: true,
            ..Self::new()
        }
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for CountingSessions {
    async fn current(&self) -> SessionTokens {
        self.current.lock().unwrap().clone()
    }

    async fn refresh(&self, _stale: &SessionTokens) -> Result<SessionTokens> {
        if self.fail_refresh {
            return Err(anyhow!("gateway unavailable"));
        }
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        let fresh = tokens(&format!("session-{}", n));
        *self.current.lock().unwrap() = fresh.clone();
        Ok(fresh)
    }
}

/// 刷新要很久才完成的会话来源（模拟重新打开门户时的页面等待）
pub struct SlowSessions {
    pub delay: Duration,
    pub started: AtomicUsize,
    pub finished: AtomicUsize,
}

impl SlowSessions {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SessionProvider for SlowSessions {
    async fn current(&self) -> SessionTokens {
        tokens("session-0")
    }

    async fn refresh(&self, _stale: &SessionTokens) -> Result<SessionTokens> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(tokens("session-slow"))
    }
}

// ========== 假页面 ==========

/// 可脚本化的门户页面
#[derive(Default)]
pub struct FakeSurface {
    pub fail_navigation: bool,
    /// 读取法院下拉框时脚本报错
    pub fail_court_read: bool,
    /// 读取 Cookie 罐时报错
    pub fail_cookies: bool,
    /// 可以点击成功的定位器
    pub clickable: Vec<Locator>,
    pub court_options: Option<Vec<SelectOption>>,
    /// 法庭下拉框在第几次读取时才出现（模拟延迟挂载的 iframe）
    pub bench_appears_after: usize,
    /// 法庭下拉框在第几次读取时才填充完毕
    pub bench_populated_after: usize,
    pub bench_options: Vec<SelectOption>,
    pub cookies: Vec<BrowserCookie>,

    pub navigations: AtomicUsize,
    pub escapes: AtomicUsize,
    pub bench_reads: AtomicUsize,
    pub clicks: Mutex<Vec<Locator>>,
    pub selected: Mutex<Vec<String>>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn click_attempts(&self) -> Vec<Locator> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn selected(&self) -> Vec<String> {
        self.selected.lock().unwrap().clone()
    }

    pub fn navigation_count(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    pub fn escape_count(&self) -> usize {
        self.escapes.load(Ordering::SeqCst)
    }
}

pub fn option(value: &str, text: &str) -> SelectOption {
    SelectOption::new(value, text)
}

pub fn cookie(name: &str, value: &str, domain: &str) -> BrowserCookie {
    BrowserCookie {
        name: name.to_string(),
        value: value.to_string(),
        domain: domain.to_string(),
    }
}

#[async_trait]
impl PortalSurface for FakeSurface {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        if self.fail_navigation {
            return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED at {}", url));
        }
        Ok(())
    }

    async fn is_ready(&self) -> Result<bool> {
        Ok(true)
    }

    async fn click_if_visible(&self, locator: &Locator) -> Result<bool> {
        self.clicks.lock().unwrap().push(locator.clone());
        Ok(self.clickable.contains(locator))
    }

    async fn press_escape(&self) -> Result<()> {
        self.escapes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn select_option(&self, _select_css: &str, value: &str) -> Result<bool> {
        if self.court_options.is_none() {
            return Ok(false);
        }
        self.selected.lock().unwrap().push(value.to_string());
        Ok(true)
    }

    async fn read_options(
        &self,
        select_css: &str,
        search_frames: bool,
    ) -> Result<Option<Vec<SelectOption>>> {
        if select_css == "#sess_state_code" {
            if self.fail_court_read {
                return Err(anyhow!("Runtime.evaluate: Execution context was destroyed"));
            }
            return Ok(self.court_options.clone());
        }

        // 法庭下拉框只在子文档里
        if !search_frames {
            return Ok(None);
        }
        let reads = self.bench_reads.fetch_add(1, Ordering::SeqCst) + 1;
        if reads < self.bench_appears_after {
            return Ok(None);
        }
        if reads < self.bench_populated_after {
            return Ok(Some(vec![option("0", "Select Bench")]));
        }
        Ok(Some(self.bench_options.clone()))
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        if self.fail_cookies {
            return Err(anyhow!("Network.getCookies: target closed"));
        }
        Ok(self.cookies.clone())
    }
}
