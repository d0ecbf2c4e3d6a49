//! # Case Status Scout
//!
//! 自动化查询高等法院门户案件状态的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，实现 `PortalSurface`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `PortalGateway` - 打开门户、进入 Case Status、关闭弹窗
//! - `TopologyDiscoverer` - 列出法院 / 法庭
//! - `SessionBridge` - 导出浏览器 Cookie
//! - `CaptchaResolver` - 按顺序尝试验证码策略（OCR → 兜底）
//! - `SearchExecutor` - 获取验证码 → 识别 → 提交 → 解析，带重试
//! - `RecordSink` - 幂等写入案件和查询结果事件
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个查询"的完整处理流程
//! - `SearchCtx` - 上下文封装（法院 + 法庭 + 查询序号）
//! - `SearchFlow` - 流程编排（执行 → 会话刷新 → 写入 → 上报）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 管理资源、拓扑发现、并发和取消
//! - `orchestrator/bench_processor` - 单个法庭处理器，遍历查询列表
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, GatewayError, SearchError, SinkError, TransportError};
pub use infrastructure::{JsExecutor, PortalSurface};
pub use models::{Bench, CaseRecord, Court, SearchOutcomeEvent, SearchPlan, SearchQuery, SearchType};
pub use orchestrator::{process_bench, App};
pub use workflow::{SearchCtx, SearchFlow, SearchReport, SessionProvider};
