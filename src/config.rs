use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 门户入口页面（浏览器首先打开的地址）
    pub portal_entry_url: String,
    /// 门户 HTTP 根地址（验证码与搜索接口都基于它）
    pub portal_base_url: String,
    /// 验证码图片路径
    pub captcha_path: String,
    /// 搜索 POST 路径
    pub search_path: String,
    /// 是否以无头模式启动浏览器
    pub headless: bool,
    /// 浏览器调试端口（0 表示自行启动浏览器）
    pub browser_debug_port: u16,
    /// 自定义浏览器可执行文件
    pub chrome_executable: Option<String>,
    /// HTTP 请求使用的 User-Agent
    pub user_agent: String,
    // --- 搜索策略 ---
    pub max_retries: usize,
    pub retry_backoff_ms: u64,
    pub http_timeout_secs: u64,
    pub page_wait_timeout_secs: u64,
    pub popup_probe_timeout_ms: u64,
    /// 单次查询的结果数量上限（仅提示，不截断）
    pub max_results: usize,
    /// 同时执行的搜索数量
    pub max_concurrent_searches: usize,
    /// 连续多少次验证码失败后刷新会话
    pub captcha_failure_threshold: usize,
    /// 单个查询最多刷新几次会话
    pub session_refresh_limit: usize,
    // --- 输入输出 ---
    pub search_plan_file: String,
    pub output_dir: String,
    pub log_file: String,
    // --- 验证码 ---
    pub tesseract_path: String,
    pub captcha_fallback: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_entry_url: "https://hcservices.ecourts.gov.in/hcservices/main.php".to_string(),
            portal_base_url: "https://hcservices.ecourts.gov.in/hcservices".to_string(),
            captcha_path: "securimage/securimage_show.php".to_string(),
            search_path: "cases_qry/index_qry.php".to_string(),
            headless: true,
            browser_debug_port: 0,
            chrome_executable: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            max_retries: 3,
            retry_backoff_ms: 2000,
            http_timeout_secs: 15,
            page_wait_timeout_secs: 20,
            popup_probe_timeout_ms: 1000,
            max_results: 20,
            max_concurrent_searches: 4,
            captcha_failure_threshold: 3,
            session_refresh_limit: 1,
            search_plan_file: "search_plan.toml".to_string(),
            output_dir: "output".to_string(),
            log_file: "proofs/scraper.log".to_string(),
            tesseract_path: "tesseract".to_string(),
            captcha_fallback: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        // .env 不存在时静默忽略
        let _ = dotenvy::dotenv();

        let default = Self::default();
        Self {
            portal_entry_url: std::env::var("PORTAL_ENTRY_URL").unwrap_or(default.portal_entry_url),
            portal_base_url: std::env::var("PORTAL_BASE_URL").unwrap_or(default.portal_base_url),
            captcha_path: std::env::var("CAPTCHA_PATH").unwrap_or(default.captcha_path),
            search_path: std::env::var("SEARCH_PATH").unwrap_or(default.search_path),
            headless: std::env::var("HEADLESS").ok().map(|v| parse_flag(&v)).unwrap_or(default.headless),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().filter(|v| !v.trim().is_empty()),
            user_agent: std::env::var("USER_AGENT").unwrap_or(default.user_agent),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            retry_backoff_ms: std::env::var("RETRY_BACKOFF_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_backoff_ms),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.http_timeout_secs),
            page_wait_timeout_secs: std::env::var("PAGE_WAIT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.page_wait_timeout_secs),
            popup_probe_timeout_ms: std::env::var("POPUP_PROBE_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.popup_probe_timeout_ms),
            max_results: std::env::var("MAX_RESULTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_results),
            max_concurrent_searches: std::env::var("MAX_CONCURRENT_SEARCHES").ok().and_then(|v| v.parse().ok()).filter(|n: &usize| *n > 0).unwrap_or(default.max_concurrent_searches),
            captcha_failure_threshold: std::env::var("CAPTCHA_FAILURE_THRESHOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.captcha_failure_threshold),
            session_refresh_limit: std::env::var("SESSION_REFRESH_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.session_refresh_limit),
            search_plan_file: std::env::var("SEARCH_PLAN_FILE").unwrap_or(default.search_plan_file),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            log_file: std::env::var("LOG_FILE").unwrap_or(default.log_file),
            tesseract_path: std::env::var("TESSERACT_PATH").unwrap_or(default.tesseract_path),
            captcha_fallback: std::env::var("CAPTCHA_FALLBACK").ok().filter(|v| !v.trim().is_empty()),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().map(|v| parse_flag(&v)).unwrap_or(default.verbose_logging),
        }
    }

    /// 验证码图片完整地址
    pub fn captcha_url(&self) -> String {
        join_url(&self.portal_base_url, &self.captcha_path)
    }

    /// 搜索接口完整地址
    pub fn search_url(&self) -> String {
        join_url(&self.portal_base_url, &self.search_path)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn page_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.page_wait_timeout_secs)
    }

    pub fn popup_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.popup_probe_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// 解析 "1/true/yes" 风格的布尔开关
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
