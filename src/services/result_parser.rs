//! 搜索结果解析 - 业务能力层
//!
//! 只负责从响应 HTML 中读出结果表格，不关心重试

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// 结果表格的主标识
pub const PRIMARY_TABLE: &str = "table#searchResults";
/// 结果表格的备用标识
pub const FALLBACK_TABLE: &str = "table#dispTable";

/// 每行固定读取的列数：案号、当事人、下次开庭日期、状态
pub const COLUMN_COUNT: usize = 4;

/// 一行结果的四列文字
pub type ResultRow = [String; COLUMN_COUNT];

/// 响应页面的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPage {
    /// 找到表格（表头已跳过，可能为空）
    Table(Vec<ResultRow>),
    /// 门户提示验证码错误
    CaptchaRejected,
    /// 门户返回的是会话过期页面
    SessionExpired,
    /// 没有结果表格（零结果与页面未就绪在这一层无法区分）
    NoTable,
}

/// 解析搜索响应
pub fn parse_results_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    for table_selector in [PRIMARY_TABLE, FALLBACK_TABLE] {
        let Ok(selector) = Selector::parse(table_selector) else {
            continue;
        };
        if let Some(table) = document.select(&selector).next() {
            if table_selector == FALLBACK_TABLE {
                debug!("主结果表格不存在，使用备用表格 {}", FALLBACK_TABLE);
            }
            return ParsedPage::Table(read_rows(table));
        }
    }

    if matches_pattern(r"(?i)invalid\s*captcha|captcha\s*(code\s*)?(is\s*)?(invalid|incorrect|wrong)", html) {
        return ParsedPage::CaptchaRejected;
    }
    if matches_pattern(r"(?i)session\s*(has\s*)?(expired|timed?\s*out)", html) {
        return ParsedPage::SessionExpired;
    }

    ParsedPage::NoTable
}

/// 跳过表头，读取每行前四列
fn read_rows(table: ElementRef<'_>) -> Vec<ResultRow> {
    let (Ok(row_selector), Ok(cell_selector)) = (Selector::parse("tr"), Selector::parse("td"))
    else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for (index, row) in table.select(&row_selector).skip(1).enumerate() {
        let cells: Vec<String> = row.select(&cell_selector).map(cell_text).collect();
        if cells.len() < COLUMN_COUNT {
            warn!("第 {} 行只有 {} 列，已跳过", index + 1, cells.len());
            continue;
        }
        rows.push([
            cells[0].clone(),
            cells[1].clone(),
            cells[2].clone(),
            cells[3].clone(),
        ]);
    }
    rows
}

/// 单元格文字：每个文本片段去掉首尾空白，用空格连接
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn matches_pattern(pattern: &str, text: &str) -> bool {
    Regex::new(pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}
