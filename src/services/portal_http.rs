//! 门户 HTTP 客户端 - 业务能力层
//!
//! 用浏览器导出的 Cookie 直接请求验证码图片和搜索接口，不再经过页面

use crate::config::Config;
use crate::error::TransportError;
use crate::models::{SearchQuery, SearchType, SessionTokens};
use async_trait::async_trait;
use reqwest::header::{COOKIE, REFERER};
use reqwest::{Client, StatusCode};
use tracing::debug;

/// 搜索表单（application/x-www-form-urlencoded）
pub type SearchForm = Vec<(&'static str, String)>;

/// 门户 HTTP 能力
#[async_trait]
pub trait PortalHttp: Send + Sync {
    /// GET 一张新的验证码图片
    async fn fetch_challenge(&self, session: &SessionTokens) -> Result<Vec<u8>, TransportError>;

    /// POST 搜索表单，返回响应正文
    async fn submit_search(
        &self,
        session: &SessionTokens,
        form: &SearchForm,
    ) -> Result<String, TransportError>;
}

/// 构建搜索表单
///
/// 查询词按搜索方式放入当事人或案号字段，另一个字段留空
pub fn build_search_form(query: &SearchQuery, captcha: &str) -> SearchForm {
    let (party_name, case_no) = match query.search_type {
        SearchType::PartyName => (query.query_text.clone(), String::new()),
        SearchType::CaseNumber => (String::new(), query.query_text.clone()),
    };

    vec![
        ("court_code", query.bench_code.clone()),
        ("state_code", query.court_code.clone()),
        ("court_complex_code", query.bench_code.clone()),
        ("caseStatusSearchType", query.search_type.portal_token().to_string()),
        ("captcha", captcha.to_string()),
        ("f", "Both".to_string()),
        ("petres_name", party_name),
        ("caseNo", case_no),
        ("rgyear", query.year.clone()),
    ]
}

/// 基于 reqwest 的门户客户端
pub struct ReqwestPortal {
    client: Client,
    captcha_url: String,
    search_url: String,
    referer: String,
}

impl ReqwestPortal {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::request_failed("client", e))?;

        Ok(Self {
            client,
            captcha_url: config.captcha_url(),
            search_url: config.search_url(),
            referer: config.portal_entry_url.clone(),
        })
    }
}

/// 把状态码映射成传输错误（2xx 返回 None）
fn check_status(endpoint: &str, status: StatusCode) -> Option<TransportError> {
    if status.is_success() {
        None
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Some(TransportError::Unauthenticated {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        })
    } else {
        Some(TransportError::BadStatus {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl PortalHttp for ReqwestPortal {
    async fn fetch_challenge(&self, session: &SessionTokens) -> Result<Vec<u8>, TransportError> {
        // 时间戳参数保证每次拿到新图片
        let url = format!("{}?{}", self.captcha_url, chrono::Utc::now().timestamp_millis());
        debug!("获取验证码: {}", url);

        let response = self
            .client
            .get(&url)
            .header(COOKIE, session.cookie_header())
            .header(REFERER, &self.referer)
            .send()
            .await
            .map_err(|e| TransportError::request_failed(&self.captcha_url, e))?;

        if let Some(err) = check_status(&self.captcha_url, response.status()) {
            return Err(err);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::request_failed(&self.captcha_url, e))?;
        Ok(bytes.to_vec())
    }

    async fn submit_search(
        &self,
        session: &SessionTokens,
        form: &SearchForm,
    ) -> Result<String, TransportError> {
        debug!("提交搜索表单: {:?}", form);

        let response = self
            .client
            .post(&self.search_url)
            .header(COOKIE, session.cookie_header())
            .header(REFERER, &self.referer)
            .form(form)
            .send()
            .await
            .map_err(|e| TransportError::request_failed(&self.search_url, e))?;

        if let Some(err) = check_status(&self.search_url, response.status()) {
            return Err(err);
        }

        response
            .text()
            .await
            .map_err(|e| TransportError::request_failed(&self.search_url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(form: &'a SearchForm, name: &str) -> &'a str {
        form.iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
            .unwrap()
    }

    #[test]
    fn test_party_name_form() {
        let query = SearchQuery::new("26", "1", SearchType::PartyName, "kumar", "2024");
        let form = build_search_form(&query, "aB3d");

        assert_eq!(field(&form, "state_code"), "26");
        assert_eq!(field(&form, "court_complex_code"), "1");
        assert_eq!(field(&form, "caseStatusSearchType"), "CSpartyName");
        assert_eq!(field(&form, "captcha"), "aB3d");
        assert_eq!(field(&form, "petres_name"), "kumar");
        assert_eq!(field(&form, "caseNo"), "");
        assert_eq!(field(&form, "rgyear"), "2024");
    }

    #[test]
    fn test_case_number_form() {
        let query = SearchQuery::new("3", "2", SearchType::CaseNumber, "123", "2023");
        let form = build_search_form(&query, "zzzz");

        assert_eq!(field(&form, "caseStatusSearchType"), "CScaseNumber");
        assert_eq!(field(&form, "petres_name"), "");
        assert_eq!(field(&form, "caseNo"), "123");
    }

    #[test]
    fn test_check_status() {
        assert!(check_status("x", StatusCode::OK).is_none());
        assert!(check_status("x", StatusCode::FORBIDDEN)
            .unwrap()
            .is_unauthenticated());
        assert!(matches!(
            check_status("x", StatusCode::BAD_GATEWAY),
            Some(TransportError::BadStatus { status: 502, .. })
        ));
    }
}
