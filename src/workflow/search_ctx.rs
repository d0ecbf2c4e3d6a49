//! 查询上下文
//!
//! 封装"我正在处理哪个法院、哪个法庭的第几个查询"这一信息

use crate::models::{Bench, SearchQuery};
use std::fmt::Display;

/// 查询上下文（仅用于日志显示）
#[derive(Debug, Clone)]
pub struct SearchCtx {
    /// 法院代码
    pub court_code: String,

    /// 法庭代码
    pub bench_code: String,

    /// 法庭名称
    pub bench_name: String,

    /// 查询在该法庭中的序号（从1开始）
    pub query_index: usize,

    /// 该法庭的查询总数
    pub query_total: usize,
}

impl SearchCtx {
    pub fn new(bench: &Bench, query_index: usize, query_total: usize) -> Self {
        Self {
            court_code: bench.parent_court_code.clone(),
            bench_code: bench.code.clone(),
            bench_name: bench.display_name.clone(),
            query_index,
            query_total,
        }
    }

    /// 不依赖法庭信息，直接从查询构建
    pub fn for_query(query: &SearchQuery) -> Self {
        Self {
            court_code: query.court_code.clone(),
            bench_code: query.bench_code.clone(),
            bench_name: query.bench_code.clone(),
            query_index: 1,
            query_total: 1,
        }
    }
}

impl Display for SearchCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[法院 {} / 法庭 {}]", self.court_code, self.bench_code)
    }
}
