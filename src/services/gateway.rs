//! 门户控制器 - 业务能力层
//!
//! 把门户页面整理到"可以查询"的状态：导航、进入 Case Status、关闭弹窗

use crate::config::Config;
use crate::error::GatewayError;
use crate::infrastructure::{Locator, PortalSurface};
use crate::utils::first_success;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// 门户已就绪的凭证，只能由 [`PortalGateway::open`] 产生
#[derive(Debug)]
pub struct Ready {
    _private: (),
}

/// 等待时长配置
#[derive(Debug, Clone)]
pub struct GatewayTimings {
    /// 页面加载的硬上限
    pub page_wait: Duration,
    /// 页面就绪后的静默时间（等待异步请求结束）
    pub settle: Duration,
    /// 每个弹窗候选的探测上限
    pub popup_probe: Duration,
    /// 轮询间隔
    pub poll_interval: Duration,
}

impl Default for GatewayTimings {
    fn default() -> Self {
        Self {
            page_wait: Duration::from_secs(20),
            settle: Duration::from_secs(2),
            popup_probe: Duration::from_secs(1),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl GatewayTimings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_wait: config.page_wait_timeout(),
            popup_probe: config.popup_probe_timeout(),
            ..Self::default()
        }
    }
}

/// 进入 Case Status 的候选定位器（按顺序）
pub fn case_status_locators() -> Vec<Locator> {
    vec![
        Locator::with_text("a, button, li, span, div", "Case Status"),
        Locator::with_text("a", "Case Status"),
        Locator::css("#case_status_link"),
    ]
}

/// 关闭弹窗的候选定位器（按顺序）
pub fn dismissal_locators() -> Vec<Locator> {
    vec![
        Locator::with_text("button", "OK"),
        Locator::with_text("button", "Okay"),
        Locator::with_text("button", "Close"),
        Locator::with_exact_text("input[type='button'], input[type='submit']", "OK"),
        Locator::with_exact_text("input[type='button'], input[type='submit']", "Okay"),
        Locator::with_exact_text("input[type='button'], input[type='submit']", "Close"),
        Locator::css(".popup button"),
        Locator::css(".modal button"),
        Locator::css("#popup button"),
        Locator::css("button[onclick*='close']"),
        Locator::css("button[onclick*='hide']"),
    ]
}

/// 门户控制器
///
/// 职责：
/// - 打开入口页面并等待就绪
/// - 尽力进入 Case Status 区域（失败不阻断）
/// - 关闭随机出现的弹窗（失败不阻断）
pub struct PortalGateway<'s, S: PortalSurface + ?Sized> {
    surface: &'s S,
    entry_url: String,
    timings: GatewayTimings,
}

impl<'s, S: PortalSurface + ?Sized> PortalGateway<'s, S> {
    pub fn new(surface: &'s S, entry_url: impl Into<String>, timings: GatewayTimings) -> Self {
        Self {
            surface,
            entry_url: entry_url.into(),
            timings,
        }
    }

    /// 打开门户并整理到可查询状态
    ///
    /// 只有导航失败或页面超时才会返回错误
    pub async fn open(&self) -> Result<Ready, GatewayError> {
        info!("🌐 正在打开门户: {}", self.entry_url);

        timeout(self.timings.page_wait, self.surface.navigate(&self.entry_url))
            .await
            .map_err(|_| GatewayError::PageTimeout {
                url: self.entry_url.clone(),
            })?
            .map_err(|e| GatewayError::NavigationFailed {
                url: self.entry_url.clone(),
                reason: e.to_string(),
            })?;

        self.wait_until_settled().await?;

        let locators = case_status_locators();
        let clicked = first_success(&locators, |locator| async move {
            self.try_click(locator, self.timings.page_wait).await
        })
        .await;

        match clicked {
            Some(locator) => {
                info!("✅ 已进入 Case Status ({})", locator);
                // 点击后页面可能整体刷新，等待失败不影响继续
                if let Err(e) = self.wait_until_settled().await {
                    warn!("进入 Case Status 后页面未及时就绪: {}", e);
                }
            }
            None => info!("未找到 Case Status 入口，直接使用当前页面"),
        }

        // 无论走哪条路径，门户都可能弹窗
        self.dismiss_interstitial().await;

        Ok(Ready { _private: () })
    }

    /// 尝试关闭弹窗，永远不会失败
    pub async fn dismiss_interstitial(&self) {
        let locators = dismissal_locators();
        let dismissed = first_success(&locators, |locator| async move {
            self.try_click(locator, self.timings.popup_probe).await
        })
        .await;

        match dismissed {
            Some(locator) => info!("已关闭弹窗 ({})", locator),
            None => match self.surface.press_escape().await {
                Ok(()) => debug!("未发现弹窗，已发送 Escape"),
                Err(e) => debug!("发送 Escape 失败（忽略）: {}", e),
            },
        }
    }

    /// 在限定时间内尝试点击一个候选
    async fn try_click(&self, locator: &Locator, limit: Duration) -> anyhow::Result<bool> {
        match timeout(limit, self.surface.click_if_visible(locator)).await {
            Ok(result) => result,
            Err(_) => Ok(false),
        }
    }

    /// 等待文档加载完成，再静默一小段时间
    async fn wait_until_settled(&self) -> Result<(), GatewayError> {
        let deadline = Instant::now() + self.timings.page_wait;
        loop {
            match self.surface.is_ready().await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => debug!("读取页面状态失败: {}", e),
            }
            if Instant::now() >= deadline {
                return Err(GatewayError::PageTimeout {
                    url: self.entry_url.clone(),
                });
            }
            sleep(self.timings.poll_interval).await;
        }

        sleep(self.timings.settle).await;
        Ok(())
    }
}
