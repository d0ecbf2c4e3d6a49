use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 门户初始化失败（整次运行终止）
    #[error("门户错误: {0}")]
    Gateway(#[from] GatewayError),
    /// 结果写入失败
    #[error("存储错误: {0}")]
    Sink(#[from] SinkError),
    /// 配置无法使用（地址无法解析、HTTP 客户端无法构建等）
    #[error("配置错误: {0}")]
    Config(String),
}

/// 门户导航 / 初始化错误
///
/// 唯一允许中止整次运行的错误类型
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 启动或连接浏览器失败
    #[error("无法启动浏览器: {0}")]
    BrowserUnavailable(String),
    /// 导航到入口页面失败
    #[error("导航到 {url} 失败: {reason}")]
    NavigationFailed { url: String, reason: String },
    /// 页面在限定时间内没有就绪
    #[error("页面等待超时 ({url})")]
    PageTimeout { url: String },
    /// 无法读取法院列表
    #[error("无法读取法院列表: {0}")]
    TopologyUnavailable(String),
    /// 无法从浏览器导出会话
    #[error("无法导出门户会话: {0}")]
    SessionUnavailable(String),
}

/// 网络传输错误，按退避策略重试
#[derive(Debug, Error)]
pub enum TransportError {
    /// 请求未能完成（连接、超时等）
    #[error("请求失败 ({endpoint}): {reason}")]
    RequestFailed { endpoint: String, reason: String },
    /// 返回非 2xx 状态
    #[error("HTTP 状态异常 ({endpoint}): {status}")]
    BadStatus { endpoint: String, status: u16 },
    /// 门户认为会话未认证
    #[error("会话未认证 ({endpoint}): {status}")]
    Unauthenticated { endpoint: String, status: u16 },
}

impl TransportError {
    pub fn request_failed(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        TransportError::RequestFailed {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// 是否像是会话失效导致的失败
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, TransportError::Unauthenticated { .. })
    }
}

/// 单个 (法院, 法庭, 查询) 的终止错误
///
/// 这些错误只在查询边界内处理，并以搜索结果事件的形式上报
#[derive(Debug, Error)]
pub enum SearchError {
    /// 验证码无法识别，不重试
    #[error("验证码无法识别")]
    CaptchaUnresolved,
    /// 每次提交都被门户判定验证码错误
    #[error("验证码被拒绝 (已尝试 {attempts} 次)")]
    CaptchaRejected { attempts: usize },
    /// 多次尝试后仍找不到结果表格
    #[error("未找到结果表格 (已尝试 {attempts} 次)")]
    ParseAnomaly { attempts: usize },
    /// 会话失效，需要重新获取 Cookie
    #[error("会话已失效")]
    SessionExpired,
    /// 重试耗尽后的最后一次网络错误
    #[error("网络错误: {0}")]
    Transport(#[from] TransportError),
    /// 运行被取消
    #[error("cancelled")]
    Cancelled,
}

/// 结果存储错误
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("写入失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
