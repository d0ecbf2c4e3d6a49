//! 批量法庭处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次完整运行的资源管理和调度。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：连接 / 启动浏览器、创建 JsExecutor、打开结果文件、加载搜索计划
//! 2. **门户准备**：打开门户（失败即终止整次运行）
//! 3. **拓扑发现**：先完整列出法院和法庭，再开始查询
//! 4. **会话导出**：把浏览器 Cookie 交给 HTTP 客户端
//! 5. **并发控制**：使用 Semaphore 限制同时处理的法庭数
//! 6. **取消**：Ctrl-C 触发取消，进行中的查询尽快结束
//! 7. **全局统计**：汇总所有法庭的处理结果
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有 Browser 的模块
//! - **向下委托**：委托 bench_processor 处理单个法庭

use crate::browser;
use crate::config::Config;
use crate::error::{AppError, AppResult, GatewayError};
use crate::infrastructure::JsExecutor;
use crate::models::{load_search_plan, Bench, Court, SearchPlan};
use crate::orchestrator::bench_processor::{self, BenchStats};
use crate::orchestrator::session_keeper::SharedSession;
use crate::services::{
    CaptchaResolver, GatewayTimings, JsonlRecordSink, PortalGateway, PortalHttp, RecordSink,
    ReqwestPortal, SearchExecutor, SearchPolicy, SessionBridge, TesseractCli, TopologyDiscoverer,
    TopologyTimings,
};
use crate::utils::logging::{log_court_start, log_startup, print_final_stats};
use crate::utils::until_cancelled;
use crate::workflow::{FlowPolicy, SearchFlow};
use anyhow::Result;
use chromiumoxide::Browser;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    surface: Arc<JsExecutor>,
    sink: Arc<JsonlRecordSink>,
    plan: SearchPlan,
    cancel: CancellationToken,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(
            &config.portal_entry_url,
            config.max_concurrent_searches,
            config.headless,
        );

        // 连接或启动浏览器
        let (browser, page) = browser::open_browser(&config).await?;

        // 创建 JsExecutor（持有 page）
        let surface = Arc::new(JsExecutor::new(page));

        let sink = Arc::new(JsonlRecordSink::open(&config.output_dir).await?);
        info!("📁 案件记录写入: {}", sink.cases_path().display());

        let plan = load_search_plan(Path::new(&config.search_plan_file)).await?;

        Ok(Self {
            config,
            _browser: browser,
            surface,
            sink,
            plan,
            cancel: CancellationToken::new(),
        })
    }

    /// 运行取消令牌（外部也可以触发取消）
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 运行应用主逻辑
    ///
    /// 运行中途只有门户错误会中止；单个查询的失败都在查询内部消化
    pub async fn run(&self) -> AppResult<()> {
        self.watch_ctrl_c();

        // 门户打不开时整次运行终止
        let timings = GatewayTimings::from_config(&self.config);
        let gateway = PortalGateway::new(
            self.surface.as_ref(),
            self.config.portal_entry_url.clone(),
            timings.clone(),
        );
        match until_cancelled(&self.cancel, gateway.open()).await {
            Some(opened) => {
                opened?;
            }
            None => {
                warn!("⏹️ 打开门户时运行被取消");
                self.sink.close().await?;
                return Ok(());
            }
        }

        // 先完整发现拓扑，再开始查询
        let topology = self.discover_topology().await?;
        if topology.iter().all(|(_, benches)| benches.is_empty()) {
            warn!("⚠️ 没有找到可查询的法庭，程序结束");
            self.sink.close().await?;
            return Ok(());
        }

        let bridge = SessionBridge::for_url(&self.config.portal_base_url)
            .map_err(|e| AppError::Config(format!("{:#}", e)))?;
        let initial = bridge.snapshot(self.surface.as_ref()).await?;
        if initial.is_empty() {
            warn!("⚠️ 浏览器中没有门户 Cookie，查询可能被拒绝");
        }
        let sessions = Arc::new(SharedSession::new(
            self.surface.clone(),
            bridge,
            initial,
            self.config.portal_entry_url.clone(),
            timings,
        ));

        let flow = Arc::new(self.build_flow(sessions)?);

        let stats = self.process_all_courts(flow, topology).await;

        self.sink.close().await?;

        print_final_stats(
            stats.succeeded,
            stats.failed,
            stats.records,
            &self.config.log_file,
        );

        if self.cancel.is_cancelled() {
            warn!("⏹️ 运行已被取消，部分查询未完成");
        }

        Ok(())
    }

    /// Ctrl-C 触发取消
    fn watch_ctrl_c(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⏹️ 收到中断信号，正在取消剩余查询...");
                cancel.cancel();
            }
        });
    }

    /// 装配查询流程
    fn build_flow(&self, sessions: Arc<SharedSession<JsExecutor>>) -> AppResult<SearchFlow> {
        let portal = ReqwestPortal::new(&self.config).map_err(|e| AppError::Config(e.to_string()))?;
        let http: Arc<dyn PortalHttp> = Arc::new(portal);
        let resolver = Arc::new(CaptchaResolver::with_ocr(
            Arc::new(TesseractCli::new(self.config.tesseract_path.clone())),
            self.config.captcha_fallback.clone(),
        ));
        let executor = SearchExecutor::new(http, resolver, SearchPolicy::from_config(&self.config));
        let sink: Arc<dyn RecordSink> = self.sink.clone();

        Ok(SearchFlow::new(
            executor,
            sink,
            sessions,
            FlowPolicy::from_config(&self.config),
        ))
    }

    /// 列出计划内的法院及其法庭
    async fn discover_topology(&self) -> Result<Vec<(Court, Vec<Bench>)>, GatewayError> {
        info!("\n🏛️ 正在发现法院和法庭...");
        let discoverer = TopologyDiscoverer::new(self.surface.as_ref(), TopologyTimings::default())
            .with_cancel(self.cancel.clone());

        let courts: Vec<Court> = discoverer
            .list_courts()
            .await?
            .into_iter()
            .filter(|court| self.plan.includes_court(&court.code))
            .collect();
        info!("✓ 计划内法院: {} 个", courts.len());

        let mut topology = Vec::with_capacity(courts.len());
        for court in courts {
            if self.cancel.is_cancelled() {
                break;
            }
            let benches = match discoverer.list_benches(&court.code).await {
                Ok(benches) => benches,
                Err(e) => {
                    error!("法院 {} 的法庭列表读取失败: {}", court.code, e);
                    Vec::new()
                }
            };
            topology.push((court, benches));
        }

        Ok(topology)
    }

    /// 逐个法院处理；同一法院的法庭并发处理
    async fn process_all_courts(
        &self,
        flow: Arc<SearchFlow>,
        topology: Vec<(Court, Vec<Bench>)>,
    ) -> BenchStats {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_searches.max(1)));
        let plan = Arc::new(self.plan.clone());
        let total_courts = topology.len();
        let mut stats = BenchStats::default();

        for (index, (court, benches)) in topology.into_iter().enumerate() {
            log_court_start(index + 1, total_courts, &court.display_name, &court.code);

            if benches.is_empty() {
                warn!("⚠️ 法院 {} 没有可查询的法庭，跳过", court.code);
                continue;
            }

            let court_stats = self
                .process_court(&flow, &plan, benches, semaphore.clone())
                .await;
            stats.absorb(court_stats);
        }

        stats
    }

    /// 并发处理一个法院的全部法庭
    async fn process_court(
        &self,
        flow: &Arc<SearchFlow>,
        plan: &Arc<SearchPlan>,
        benches: Vec<Bench>,
        semaphore: Arc<Semaphore>,
    ) -> BenchStats {
        let mut handles = Vec::new();

        for bench in benches {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("[法庭 {}] 无法获取并发许可: {}", bench.code, e);
                    break;
                }
            };
            let flow = flow.clone();
            let plan = plan.clone();
            let cancel = self.cancel.clone();
            let bench_code = bench.code.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                bench_processor::process_bench(&flow, &bench, &plan, &cancel).await
            });
            handles.push((bench_code, handle));
        }

        let mut stats = BenchStats::default();
        for (bench_code, handle) in handles {
            match handle.await {
                Ok(bench_stats) => stats.absorb(bench_stats),
                Err(e) => error!("[法庭 {}] 任务执行失败: {}", bench_code, e),
            }
        }

        stats
    }
}
