//! 单个法庭处理器 - 编排层
//!
//! ## 职责
//!
//! 按搜索计划依次执行一个法庭的所有查询（`Vec<SearchQuery>`），
//! 每个查询委托给 `SearchFlow`，并汇总该法庭的统计。

use crate::models::{Bench, SearchPlan};
use crate::utils::logging::log_bench_complete;
use crate::workflow::{SearchCtx, SearchFlow};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// 法庭处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BenchStats {
    pub succeeded: usize,
    pub failed: usize,
    pub records: usize,
}

impl BenchStats {
    pub fn absorb(&mut self, other: BenchStats) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.records += other.records;
    }
}

/// 处理单个法庭
///
/// 查询之间串行，单个查询失败不影响后续查询
pub async fn process_bench(
    flow: &SearchFlow,
    bench: &Bench,
    plan: &SearchPlan,
    cancel: &CancellationToken,
) -> BenchStats {
    let queries = plan.queries_for(bench);
    let total = queries.len();
    info!(
        "[法院 {} / 法庭 {}] 开始处理: {}，共 {} 个查询",
        bench.parent_court_code, bench.code, bench.display_name, total
    );

    let mut stats = BenchStats::default();

    for (index, query) in queries.iter().enumerate() {
        let ctx = SearchCtx::new(bench, index + 1, total);
        let report = flow.run(query, &ctx, cancel).await;

        if report.succeeded() {
            stats.succeeded += 1;
            stats.records += report.records_written;
        } else {
            stats.failed += 1;
        }
    }

    log_bench_complete(&bench.display_name, stats.succeeded, total, stats.records);
    stats
}
