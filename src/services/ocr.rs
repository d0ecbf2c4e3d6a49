//! OCR 引擎 - 业务能力层
//!
//! 只负责"图片 → 文字"，不关心验证码长度等业务规则

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// 验证码字符集：数字 + 大小写拉丁字母
pub const CAPTCHA_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// 版面提示
///
/// 门户验证码是一个不含空格的词
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutHint {
    /// 单个词
    SingleWord,
}

impl LayoutHint {
    /// tesseract 的 page segmentation mode
    pub fn psm(self) -> &'static str {
        match self {
            LayoutHint::SingleWord => "8",
        }
    }
}

/// OCR 能力：灰度图片 + 字符集约束 + 版面提示 → 尽力识别的文字
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(
        &self,
        grayscale_png: &[u8],
        charset: &str,
        layout: LayoutHint,
    ) -> Result<Option<String>>;
}

/// 把任意格式的图片转成单通道灰度 PNG
pub fn to_grayscale_png(image_bytes: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(image_bytes).context("无法解码验证码图片")?;
    let gray = DynamicImage::ImageLuma8(img.to_luma8());

    let mut buf = Vec::new();
    gray.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .context("无法编码灰度图片")?;
    Ok(buf)
}

/// 调用本机 tesseract 命令行
pub struct TesseractCli {
    program: String,
    timeout: Duration,
}

impl TesseractCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize(
        &self,
        grayscale_png: &[u8],
        charset: &str,
        layout: LayoutHint,
    ) -> Result<Option<String>> {
        let mut child = Command::new(&self.program)
            .arg("stdin")
            .arg("stdout")
            .arg("--psm")
            .arg(layout.psm())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", charset))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("无法启动 {}", self.program))?;

        let mut stdin = child.stdin.take().context("无法获取 tesseract 标准输入")?;
        stdin.write_all(grayscale_png).await?;
        drop(stdin);

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .context("tesseract 超时")??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("tesseract 执行失败: {}", stderr.trim());
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        debug!("tesseract 原始输出: {:?}", text);

        Ok(Some(text).filter(|t| !t.trim().is_empty()))
    }
}
