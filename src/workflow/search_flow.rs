//! 查询处理流程 - 流程层
//!
//! 核心职责：定义"一个查询"的完整处理流程
//!
//! 流程顺序：
//! 1. 取当前会话 → SearchExecutor 执行
//! 2. 会话失效 → 刷新会话后重跑（有次数上限）
//! 3. 成功 → 整批写入案件
//! 4. 无论成败 → 上报一次结果事件

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::SearchError;
use crate::models::{CaseRecord, SearchOutcomeEvent, SearchQuery, SessionTokens};
use crate::services::{PortalHttp, RecordSink, SearchExecutor};
use crate::utils::logging::truncate_text;
use crate::utils::until_cancelled;
use crate::workflow::search_ctx::SearchCtx;

/// 会话来源
///
/// 刷新需要独占浏览器页面，由持有页面的编排层实现
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// 当前会话
    async fn current(&self) -> SessionTokens;

    /// 重新建立会话
    ///
    /// `stale` 是调用方手里已失效的会话；若别的任务已刷新过，直接返回新会话。
    /// 调用方可能在取消时丢弃这个 future，实现不能假设它一定跑完
    async fn refresh(&self, stale: &SessionTokens) -> anyhow::Result<SessionTokens>;
}

/// 流程参数
#[derive(Debug, Clone)]
pub struct FlowPolicy {
    /// 每个查询最多刷新几次会话
    pub session_refresh_limit: usize,
    /// 连续多少个查询验证码无法识别后刷新会话
    pub captcha_failure_threshold: usize,
}

impl Default for FlowPolicy {
    fn default() -> Self {
        Self {
            session_refresh_limit: 1,
            captcha_failure_threshold: 3,
        }
    }
}

impl FlowPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_refresh_limit: config.session_refresh_limit,
            captcha_failure_threshold: config.captcha_failure_threshold.max(1),
        }
    }
}

/// 单个查询的处理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReport {
    /// 解析出的案件数
    pub result_count: usize,
    /// 实际新写入的案件数（去重后）
    pub records_written: usize,
    /// 失败原因
    pub error_detail: Option<String>,
}

impl SearchReport {
    pub fn succeeded(&self) -> bool {
        self.error_detail.is_none()
    }
}

/// 查询处理流程
///
/// - 不持有任何页面资源
/// - 每个查询只上报一次结果事件
/// - 可以在多个任务间共享（`Arc<SearchFlow>`）
pub struct SearchFlow {
    executor: SearchExecutor<dyn PortalHttp>,
    sink: Arc<dyn RecordSink>,
    sessions: Arc<dyn SessionProvider>,
    policy: FlowPolicy,
    captcha_streak: AtomicUsize,
}

impl SearchFlow {
    pub fn new(
        executor: SearchExecutor<dyn PortalHttp>,
        sink: Arc<dyn RecordSink>,
        sessions: Arc<dyn SessionProvider>,
        policy: FlowPolicy,
    ) -> Self {
        Self {
            executor,
            sink,
            sessions,
            policy,
            captcha_streak: AtomicUsize::new(0),
        }
    }

    pub async fn run(
        &self,
        query: &SearchQuery,
        ctx: &SearchCtx,
        cancel: &CancellationToken,
    ) -> SearchReport {
        info!(
            "{} 🔍 查询 {}/{}: {} = {} ({})",
            ctx,
            ctx.query_index,
            ctx.query_total,
            query.search_type,
            truncate_text(&query.query_text, 40),
            query.year
        );

        let outcome = self.execute_with_refresh(query, ctx, cancel).await;
        self.track_captcha_streak(&outcome, ctx, cancel).await;

        let report = match outcome {
            Ok(records) => self.store(&records, ctx).await,
            Err(e) => {
                match &e {
                    SearchError::Cancelled => warn!("{} ⏹️ 查询已取消", ctx),
                    other => error!("{} ❌ 查询失败: {}", ctx, other),
                }
                SearchReport {
                    error_detail: Some(e.to_string()),
                    ..SearchReport::default()
                }
            }
        };

        let event = match &report.error_detail {
            None => SearchOutcomeEvent::succeeded(query, report.result_count),
            Some(detail) => SearchOutcomeEvent::failed(query, detail.clone()),
        };
        if let Err(e) = self.sink.record_outcome(&event).await {
            error!("{} 结果事件写入失败: {}", ctx, e);
        }

        report
    }

    /// 执行查询；会话失效时刷新后重跑
    async fn execute_with_refresh(
        &self,
        query: &SearchQuery,
        ctx: &SearchCtx,
        cancel: &CancellationToken,
    ) -> Result<Vec<CaseRecord>, SearchError> {
        let mut session = self.sessions.current().await;
        let mut refreshes = 0;

        loop {
            match self.executor.execute(query, &session, cancel).await {
                Err(SearchError::SessionExpired) if refreshes < self.policy.session_refresh_limit => {
                    refreshes += 1;
                    warn!(
                        "{} 🔄 会话失效，刷新会话后重试 ({}/{})",
                        ctx, refreshes, self.policy.session_refresh_limit
                    );
                    match until_cancelled(cancel, self.sessions.refresh(&session)).await {
                        None => return Err(SearchError::Cancelled),
                        Some(Ok(fresh)) => session = fresh,
                        Some(Err(e)) => {
                            error!("{} 刷新会话失败: {}", ctx, e);
                            return Err(SearchError::SessionExpired);
                        }
                    }
                }
                other => return other,
            }
        }
    }

    /// 统计连续的验证码识别失败，达到阈值后刷新会话
    async fn track_captcha_streak(
        &self,
        outcome: &Result<Vec<CaseRecord>, SearchError>,
        ctx: &SearchCtx,
        cancel: &CancellationToken,
    ) {
        match outcome {
            Err(SearchError::CaptchaUnresolved) => {
                let streak = self.captcha_streak.fetch_add(1, Ordering::SeqCst) + 1;
                if streak < self.policy.captcha_failure_threshold {
                    return;
                }
                self.captcha_streak.store(0, Ordering::SeqCst);
                warn!("{} 🔄 连续 {} 个查询验证码无法识别，刷新会话", ctx, streak);
                let stale = self.sessions.current().await;
                match until_cancelled(cancel, self.sessions.refresh(&stale)).await {
                    None => warn!("{} ⏹️ 会话刷新已取消", ctx),
                    Some(Err(e)) => error!("{} 刷新会话失败: {}", ctx, e),
                    Some(Ok(_)) => {}
                }
            }
            Err(SearchError::Cancelled) => {}
            _ => self.captcha_streak.store(0, Ordering::SeqCst),
        }
    }

    /// 整批写入案件
    async fn store(&self, records: &[CaseRecord], ctx: &SearchCtx) -> SearchReport {
        match self.sink.upsert_cases(records).await {
            Ok(written) => {
                info!(
                    "{} ✅ 查询成功: {} 条结果，新写入 {} 条",
                    ctx,
                    records.len(),
                    written
                );
                SearchReport {
                    result_count: records.len(),
                    records_written: written,
                    error_detail: None,
                }
            }
            Err(e) => {
                error!("{} ❌ 案件写入失败: {}", ctx, e);
                SearchReport {
                    result_count: records.len(),
                    records_written: 0,
                    error_detail: Some(e.to_string()),
                }
            }
        }
    }
}
