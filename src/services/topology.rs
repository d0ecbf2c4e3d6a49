//! 法院 / 法庭拓扑发现 - 业务能力层
//!
//! 法院下拉框在主文档中；法庭下拉框在选择法院后异步填充，
//! 有时还位于稍后才挂载的 iframe 中。

use crate::error::GatewayError;
use crate::infrastructure::PortalSurface;
use crate::models::{selectable_options, Bench, Court, SelectOption};
use crate::utils::until_cancelled;
use anyhow::Result;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 法院下拉框
pub const COURT_SELECT: &str = "#sess_state_code";
/// 法庭下拉框
pub const BENCH_SELECT: &str = "#court_complex_code";

/// 轮询参数
#[derive(Debug, Clone)]
pub struct TopologyTimings {
    /// 寻找法庭下拉框的最大次数
    pub locate_attempts: usize,
    /// 两次寻找之间的间隔
    pub locate_interval: Duration,
    /// 等待选项填充的硬上限
    pub population_timeout: Duration,
    /// 检查选项数量的间隔
    pub population_poll: Duration,
}

impl Default for TopologyTimings {
    fn default() -> Self {
        Self {
            locate_attempts: 10,
            locate_interval: Duration::from_secs(1),
            population_timeout: Duration::from_secs(20),
            population_poll: Duration::from_millis(500),
        }
    }
}

/// 拓扑发现器
///
/// 职责：
/// - 列出可选法院（过滤占位项，保持文档顺序）
/// - 对某个法院列出法庭（选择法院 → 找下拉框 → 等待填充 → 过滤）
/// - 同一页面只能串行调用
/// - 取消后正在进行的等待立即结束，按"没有找到"处理
pub struct TopologyDiscoverer<'s, S: PortalSurface + ?Sized> {
    surface: &'s S,
    timings: TopologyTimings,
    cancel: CancellationToken,
}

impl<'s, S: PortalSurface + ?Sized> TopologyDiscoverer<'s, S> {
    pub fn new(surface: &'s S, timings: TopologyTimings) -> Self {
        Self {
            surface,
            timings,
            cancel: CancellationToken::new(),
        }
    }

    /// 绑定运行取消令牌
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 列出所有可选法院
    ///
    /// 页面读取失败说明门户没有进入可用状态，返回 `GatewayError`
    pub async fn list_courts(&self) -> Result<Vec<Court>, GatewayError> {
        let read = until_cancelled(&self.cancel, self.surface.read_options(COURT_SELECT, false));
        let options = match read.await {
            None => {
                warn!("⏹️ 法院列表读取已取消");
                return Ok(Vec::new());
            }
            Some(Err(e)) => return Err(GatewayError::TopologyUnavailable(format!("{:#}", e))),
            Some(Ok(Some(options))) => options,
            Some(Ok(None)) => {
                warn!("⚠️ 法院下拉框不存在");
                return Ok(Vec::new());
            }
        };

        let courts: Vec<Court> = selectable_options(options)
            .into_iter()
            .map(Court::from)
            .collect();

        info!("找到 {} 个法院", courts.len());
        for court in &courts {
            debug!("  - {} (代码: {})", court.display_name, court.code);
        }

        Ok(courts)
    }

    /// 列出某个法院下的全部法庭
    ///
    /// 超时、取消或找不到下拉框时返回空列表，不视为错误
    pub async fn list_benches(&self, court_code: &str) -> Result<Vec<Bench>> {
        match until_cancelled(&self.cancel, self.discover_benches(court_code)).await {
            Some(result) => result,
            None => {
                warn!("⏹️ 法院 {} 的法庭发现已取消", court_code);
                Ok(Vec::new())
            }
        }
    }

    async fn discover_benches(&self, court_code: &str) -> Result<Vec<Bench>> {
        if !self.surface.select_option(COURT_SELECT, court_code).await? {
            warn!("⚠️ 无法选择法院 {}：下拉框不存在", court_code);
            return Ok(Vec::new());
        }
        debug!("已选择法院: {}", court_code);

        if !self.locate_bench_select().await? {
            warn!("⚠️ 法院 {} 的法庭下拉框始终未出现", court_code);
            return Ok(Vec::new());
        }

        let options = match self.wait_for_population().await? {
            Some(options) => options,
            None => {
                warn!("⚠️ 等待法院 {} 的法庭选项超时", court_code);
                return Ok(Vec::new());
            }
        };

        let benches: Vec<Bench> = selectable_options(options)
            .into_iter()
            .map(|o| Bench::from_option(o, court_code))
            .collect();

        info!("法院 {} 找到 {} 个法庭", court_code, benches.len());
        Ok(benches)
    }

    /// 在主文档和所有子文档中寻找法庭下拉框（约每秒一次）
    async fn locate_bench_select(&self) -> Result<bool> {
        for attempt in 1..=self.timings.locate_attempts {
            if self.surface.read_options(BENCH_SELECT, true).await?.is_some() {
                debug!("第 {} 次尝试找到法庭下拉框", attempt);
                return Ok(true);
            }
            if attempt < self.timings.locate_attempts {
                sleep(self.timings.locate_interval).await;
            }
        }
        Ok(false)
    }

    /// 等待选项数量 > 1（不只是占位项），超时返回 None
    async fn wait_for_population(&self) -> Result<Option<Vec<SelectOption>>> {
        let deadline = Instant::now() + self.timings.population_timeout;
        loop {
            if let Some(options) = self.surface.read_options(BENCH_SELECT, true).await? {
                if options.len() > 1 {
                    return Ok(Some(options));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(self.timings.population_poll).await;
        }
    }
}
