//! 搜索执行器 - 业务能力层
//!
//! 一次 (法院, 法庭, 查询) 的完整协议：
//! 获取验证码 → 识别 → 提交 → 解析，带重试。
//! 拿到会话 Cookie 后不再接触浏览器页面，可以安全并发。

use crate::config::Config;
use crate::error::{SearchError, TransportError};
use crate::models::{
    AttemptOutcome, CaptchaChallenge, CaseRecord, SearchAttempt, SearchQuery, SessionTokens,
};
use crate::services::captcha::CaptchaResolver;
use crate::services::portal_http::{build_search_form, PortalHttp};
use crate::services::result_parser::{parse_results_page, ParsedPage};
use crate::utils::until_cancelled;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 重试策略
#[derive(Debug, Clone)]
pub struct SearchPolicy {
    /// 外层尝试次数上限
    pub max_retries: usize,
    /// 两次尝试之间的固定等待
    pub retry_backoff: Duration,
    /// 结果数量提示上限（超过只告警，不截断）
    pub max_results: usize,
    /// 连续多少次未认证响应视为会话失效
    pub unauthenticated_threshold: usize,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff: Duration::from_secs(2),
            max_results: 20,
            unauthenticated_threshold: 2,
        }
    }
}

impl SearchPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            retry_backoff: config.retry_backoff(),
            max_results: config.max_results,
            ..Self::default()
        }
    }
}

/// 搜索执行器
///
/// 职责：
/// - 每次尝试都重新获取验证码（验证码只能用一次）
/// - 验证码无法识别时整个查询终止，不重试
/// - 网络错误、验证码被拒、表格缺失都按固定间隔重试
pub struct SearchExecutor<H: PortalHttp + ?Sized> {
    http: Arc<H>,
    resolver: Arc<CaptchaResolver>,
    policy: SearchPolicy,
}

impl<H: PortalHttp + ?Sized> SearchExecutor<H> {
    pub fn new(http: Arc<H>, resolver: Arc<CaptchaResolver>, policy: SearchPolicy) -> Self {
        Self {
            http,
            resolver,
            policy,
        }
    }

    /// 执行一次查询
    ///
    /// 返回解析出的案件；失败原因以 [`SearchError`] 返回，由调用方上报
    pub async fn execute(
        &self,
        query: &SearchQuery,
        session: &SessionTokens,
        cancel: &CancellationToken,
    ) -> Result<Vec<CaseRecord>, SearchError> {
        let max_retries = self.policy.max_retries;
        let mut last_failure: Option<SearchError> = None;
        let mut unauthenticated_streak = 0;

        for attempt_number in 1..=max_retries {
            debug!("第 {}/{} 次尝试", attempt_number, max_retries);

            // ① 获取验证码
            let challenge = match cancellable(cancel, self.http.fetch_challenge(session)).await? {
                Ok(image_bytes) => CaptchaChallenge {
                    image_bytes,
                    issued_for_session: session.clone(),
                },
                Err(e) => {
                    self.note_transport(query, attempt_number, &e, &mut unauthenticated_streak)?;
                    last_failure = Some(SearchError::Transport(e));
                    self.backoff(attempt_number, cancel).await?;
                    continue;
                }
            };

            // ② 识别：失败即终止整个查询
            let answer = cancellable(cancel, self.resolver.resolve(&challenge.image_bytes)).await?;
            let Some(answer) = answer else {
                error!("验证码无法识别，放弃本次查询");
                return Err(SearchError::CaptchaUnresolved);
            };

            // ③ 提交：challenge 在这里被消耗，下一次尝试必须重新获取
            let form = build_search_form(query, &answer);
            let body = match cancellable(
                cancel,
                self.http.submit_search(&challenge.issued_for_session, &form),
            )
            .await?
            {
                Ok(body) => body,
                Err(e) => {
                    self.note_transport(query, attempt_number, &e, &mut unauthenticated_streak)?;
                    last_failure = Some(SearchError::Transport(e));
                    self.backoff(attempt_number, cancel).await?;
                    continue;
                }
            };
            drop(challenge);

            // ④ 解析
            let outcome = match parse_results_page(&body) {
                ParsedPage::Table(rows) => AttemptOutcome::Success(
                    rows.into_iter()
                        .map(|row| CaseRecord::from_row(row, query))
                        .collect(),
                ),
                ParsedPage::CaptchaRejected => AttemptOutcome::CaptchaRejected,
                ParsedPage::SessionExpired => {
                    AttemptOutcome::TransportError("门户返回会话过期页面".to_string())
                }
                ParsedPage::NoTable => AttemptOutcome::NoResultsTable,
            };
            let attempt = SearchAttempt {
                query,
                attempt_number,
                outcome,
            };
            log_attempt(&attempt);

            match attempt.outcome {
                AttemptOutcome::Success(records) => {
                    if records.len() > self.policy.max_results {
                        warn!(
                            "结果数量 {} 超过上限 {}（不截断）",
                            records.len(),
                            self.policy.max_results
                        );
                    }
                    info!("✓ 找到 {} 条结果", records.len());
                    return Ok(records);
                }
                AttemptOutcome::CaptchaRejected => {
                    unauthenticated_streak = 0;
                    last_failure = Some(SearchError::CaptchaRejected {
                        attempts: attempt_number,
                    });
                }
                AttemptOutcome::TransportError(_) => {
                    unauthenticated_streak += 1;
                    if unauthenticated_streak >= self.policy.unauthenticated_threshold {
                        return Err(SearchError::SessionExpired);
                    }
                    last_failure = Some(SearchError::SessionExpired);
                }
                AttemptOutcome::NoResultsTable => {
                    unauthenticated_streak = 0;
                    last_failure = Some(SearchError::ParseAnomaly {
                        attempts: attempt_number,
                    });
                }
            }

            self.backoff(attempt_number, cancel).await?;
        }

        let failure = match last_failure {
            Some(SearchError::ParseAnomaly { .. }) | None => SearchError::ParseAnomaly {
                attempts: max_retries,
            },
            Some(SearchError::CaptchaRejected { .. }) => SearchError::CaptchaRejected {
                attempts: max_retries,
            },
            Some(other) => other,
        };
        error!("查询失败，已尝试 {} 次: {}", max_retries, failure);
        Err(failure)
    }

    /// 记录网络错误；连续未认证达到阈值时返回会话失效
    fn note_transport(
        &self,
        query: &SearchQuery,
        attempt_number: usize,
        err: &TransportError,
        unauthenticated_streak: &mut usize,
    ) -> Result<(), SearchError> {
        log_attempt(&SearchAttempt {
            query,
            attempt_number,
            outcome: AttemptOutcome::TransportError(err.to_string()),
        });

        if err.is_unauthenticated() {
            *unauthenticated_streak += 1;
            if *unauthenticated_streak >= self.policy.unauthenticated_threshold {
                return Err(SearchError::SessionExpired);
            }
        } else {
            *unauthenticated_streak = 0;
        }
        Ok(())
    }

    /// 还有剩余次数时等待固定间隔
    async fn backoff(&self, attempt_number: usize, cancel: &CancellationToken) -> Result<(), SearchError> {
        if attempt_number < self.policy.max_retries && !self.policy.retry_backoff.is_zero() {
            cancellable(cancel, sleep(self.policy.retry_backoff)).await?;
        }
        Ok(())
    }
}

/// 与取消信号赛跑，取消时丢弃进行中的操作
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, SearchError> {
    until_cancelled(cancel, fut).await.ok_or(SearchError::Cancelled)
}

fn log_attempt(attempt: &SearchAttempt<'_>) {
    let q = attempt.query;
    match &attempt.outcome {
        AttemptOutcome::Success(records) => debug!(
            "[{} / {}] 第 {} 次尝试成功: {} 行",
            q.court_code,
            q.bench_code,
            attempt.attempt_number,
            records.len()
        ),
        AttemptOutcome::CaptchaRejected => warn!(
            "[{} / {}] 第 {} 次尝试: 验证码被拒绝，下次重新获取",
            q.court_code, q.bench_code, attempt.attempt_number
        ),
        AttemptOutcome::TransportError(reason) => warn!(
            "[{} / {}] 第 {} 次尝试: 网络错误 {}",
            q.court_code, q.bench_code, attempt.attempt_number, reason
        ),
        AttemptOutcome::NoResultsTable => warn!(
            "[{} / {}] 第 {} 次尝试: 未找到结果表格",
            q.court_code, q.bench_code, attempt.attempt_number
        ),
    }
}
