//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次运行的资源管理和流程调度。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量法庭处理器
//! - 管理应用生命周期（初始化、运行、清理）
//! - 打开门户、发现法院 / 法庭拓扑
//! - 控制并发数量（Semaphore）和取消（CancellationToken）
//! - 管理浏览器资源（Browser、JsExecutor）
//! - 输出全局统计信息
//!
//! ### `bench_processor` - 单个法庭处理器
//! - 遍历单个法庭的所有查询（Vec<SearchQuery>）
//! - 复用共享的 SearchFlow
//! - 输出单个法庭的统计信息
//!
//! ### `session_keeper` - 共享会话
//! - 持有当前 Cookie，串行化刷新
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Court> / Vec<Bench>)
//!     ↓
//! bench_processor (处理 Vec<SearchQuery>)
//!     ↓
//! workflow::SearchFlow (处理单个 SearchQuery)
//!     ↓
//! services (能力层：gateway / topology / captcha / http / sink)
//!     ↓
//! infrastructure (基础设施：JsExecutor)
//! ```

pub mod batch_processor;
pub mod bench_processor;
pub mod session_keeper;

// 重新导出主要类型
pub use batch_processor::App;
pub use bench_processor::{process_bench, BenchStats};
pub use session_keeper::SharedSession;
