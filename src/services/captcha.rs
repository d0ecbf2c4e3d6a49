//! 验证码识别服务 - 业务能力层
//!
//! 按顺序尝试多种策略（OCR → 兜底），第一个给出答案的策略生效。
//! 所有策略都只依赖图片字节，不修改共享状态。

use crate::services::ocr::{to_grayscale_png, LayoutHint, OcrEngine, CAPTCHA_CHARSET};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 门户验证码通常为 4-6 位，更短的识别结果视为失败
pub const MIN_CAPTCHA_LEN: usize = 4;

/// 单个验证码识别策略
#[async_trait]
pub trait CaptchaStrategy: Send + Sync {
    /// 策略名称（用于日志）
    fn name(&self) -> &'static str;

    /// 尝试识别，无法识别时返回 None
    async fn solve(&self, image_bytes: &[u8]) -> Option<String>;
}

/// OCR 策略
pub struct OcrStrategy {
    engine: Arc<dyn OcrEngine>,
}

impl OcrStrategy {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self { engine }
    }
}

/// 去掉所有空白，长度不足时视为识别失败
pub fn normalize_ocr_text(raw: &str) -> Option<String> {
    let text: String = raw.split_whitespace().collect();
    if text.chars().count() >= MIN_CAPTCHA_LEN {
        Some(text)
    } else {
        None
    }
}

#[async_trait]
impl CaptchaStrategy for OcrStrategy {
    fn name(&self) -> &'static str {
        "ocr"
    }

    async fn solve(&self, image_bytes: &[u8]) -> Option<String> {
        let gray = match to_grayscale_png(image_bytes) {
            Ok(gray) => gray,
            Err(e) => {
                error!("验证码图片预处理失败: {}", e);
                return None;
            }
        };

        let raw = match self
            .engine
            .recognize(&gray, CAPTCHA_CHARSET, LayoutHint::SingleWord)
            .await
        {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!("OCR 没有识别出任何文字");
                return None;
            }
            Err(e) => {
                error!("OCR 识别失败: {}", e);
                return None;
            }
        };

        match normalize_ocr_text(&raw) {
            Some(text) => {
                info!("OCR 识别验证码: {}", text);
                Some(text)
            }
            None => {
                warn!("OCR 识别结果过短: {:?}", raw.trim());
                None
            }
        }
    }
}

/// 兜底策略：返回预设答案（人工输入的占位能力）
pub struct FallbackStrategy {
    placeholder: Option<String>,
}

impl FallbackStrategy {
    pub fn new(placeholder: Option<String>) -> Self {
        Self { placeholder }
    }
}

#[async_trait]
impl CaptchaStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn solve(&self, _image_bytes: &[u8]) -> Option<String> {
        match &self.placeholder {
            Some(answer) => {
                info!("使用兜底验证码答案");
                Some(answer.clone())
            }
            None => {
                debug!("未配置兜底验证码答案");
                None
            }
        }
    }
}

/// 验证码识别器
///
/// 职责：
/// - 按顺序调用各个策略
/// - 全部失败时返回 None（常见情况，不是异常）
pub struct CaptchaResolver {
    strategies: Vec<Box<dyn CaptchaStrategy>>,
}

impl CaptchaResolver {
    pub fn new(strategies: Vec<Box<dyn CaptchaStrategy>>) -> Self {
        Self { strategies }
    }

    /// 标准策略链：OCR → 兜底
    pub fn with_ocr(engine: Arc<dyn OcrEngine>, fallback: Option<String>) -> Self {
        Self::new(vec![
            Box::new(OcrStrategy::new(engine)),
            Box::new(FallbackStrategy::new(fallback)),
        ])
    }

    pub async fn resolve(&self, image_bytes: &[u8]) -> Option<String> {
        info!("正在识别验证码...");

        for strategy in &self.strategies {
            if let Some(answer) = strategy.solve(image_bytes).await {
                info!("✓ 验证码由 {} 策略给出", strategy.name());
                return Some(answer);
            }
            debug!("{} 策略未给出答案，尝试下一个", strategy.name());
        }

        error!("所有验证码策略均失败");
        None
    }
}
