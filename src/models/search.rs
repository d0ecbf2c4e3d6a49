use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 搜索方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// 按当事人姓名
    PartyName,
    /// 按案号
    CaseNumber,
}

impl SearchType {
    /// 门户表单中的 caseStatusSearchType 取值
    pub fn portal_token(self) -> &'static str {
        match self {
            SearchType::PartyName => "CSpartyName",
            SearchType::CaseNumber => "CScaseNumber",
        }
    }

    /// 日志 / 存储中使用的名称
    pub fn name(self) -> &'static str {
        match self {
            SearchType::PartyName => "party_name",
            SearchType::CaseNumber => "case_number",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 一次搜索请求（不可变）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub court_code: String,
    pub bench_code: String,
    pub search_type: SearchType,
    pub query_text: String,
    pub year: String,
}

impl SearchQuery {
    pub fn new(
        court_code: impl Into<String>,
        bench_code: impl Into<String>,
        search_type: SearchType,
        query_text: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self {
            court_code: court_code.into(),
            bench_code: bench_code.into(),
            search_type,
            query_text: query_text.into(),
            year: year.into(),
        }
    }
}

/// 结果表格中的一行案件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_number: String,
    pub party_names: String,
    /// 门户原样给出的下次开庭日期
    pub next_hearing_date: String,
    /// 解析成功时的日期（dd-mm-yyyy）
    pub next_hearing_on: Option<NaiveDate>,
    pub status: String,
    pub court_code: String,
    pub bench_code: String,
    pub search_type: SearchType,
    pub query_text: String,
    pub scraped_at: DateTime<Utc>,
}

impl CaseRecord {
    /// 由表格的四列和来源查询构造记录
    pub fn from_row(columns: [String; 4], query: &SearchQuery) -> Self {
        let [case_number, party_names, next_hearing_date, status] = columns;
        Self {
            next_hearing_on: parse_hearing_date(&next_hearing_date),
            case_number,
            party_names,
            next_hearing_date,
            status,
            court_code: query.court_code.clone(),
            bench_code: query.bench_code.clone(),
            search_type: query.search_type,
            query_text: query.query_text.clone(),
            scraped_at: Utc::now(),
        }
    }

    /// 去重键：法院 + 法庭 + 案号 + 搜索方式 + 查询词
    pub fn dedup_key(&self) -> String {
        [
            self.court_code.as_str(),
            self.bench_code.as_str(),
            self.case_number.as_str(),
            self.search_type.name(),
            self.query_text.as_str(),
        ]
        .join("\u{1f}")
    }
}

/// 解析门户的 dd-mm-yyyy 日期，失败返回 None
pub fn parse_hearing_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d-%m-%Y").ok()
}

/// 单次尝试的结果（只用于驱动重试状态机）
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(Vec<CaseRecord>),
    CaptchaRejected,
    TransportError(String),
    NoResultsTable,
}

/// 一次尝试（不持久化）
#[derive(Debug)]
pub struct SearchAttempt<'q> {
    pub query: &'q SearchQuery,
    pub attempt_number: usize,
    pub outcome: AttemptOutcome,
}

/// 搜索结果事件，每个查询上报一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcomeEvent {
    pub court_code: String,
    pub bench_code: String,
    pub search_type: SearchType,
    pub query_text: String,
    pub result_count: usize,
    pub success: bool,
    pub error_detail: Option<String>,
    pub executed_at: DateTime<Utc>,
}

impl SearchOutcomeEvent {
    pub fn succeeded(query: &SearchQuery, result_count: usize) -> Self {
        Self::build(query, result_count, true, None)
    }

    pub fn failed(query: &SearchQuery, detail: impl Into<String>) -> Self {
        Self::build(query, 0, false, Some(detail.into()))
    }

    fn build(
        query: &SearchQuery,
        result_count: usize,
        success: bool,
        error_detail: Option<String>,
    ) -> Self {
        Self {
            court_code: query.court_code.clone(),
            bench_code: query.bench_code.clone(),
            search_type: query.search_type,
            query_text: query.query_text.clone(),
            result_count,
            success,
            error_detail,
            executed_at: Utc::now(),
        }
    }
}
