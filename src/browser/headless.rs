use std::path::Path;

use anyhow::{anyhow, Result};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 启动浏览器（无头或有界面）并打开空白页
pub async fn launch_browser(
    headless: bool,
    chrome_executable: Option<&str>,
    user_agent: &str,
) -> Result<(Browser, Page)> {
    info!(
        "🚀 启动{}浏览器...",
        if headless { "无头" } else { "有界面" }
    );

    let mut builder = BrowserConfig::builder();
    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(exe) = chrome_executable {
        debug!("使用浏览器: {}", exe);
        builder = builder.chrome_executable(Path::new(exe));
    }

    let config = builder
        .args(vec![
            "--no-sandbox".to_string(),            // 容器内运行时需要
            "--disable-dev-shm-usage".to_string(), // 防止共享内存不足
            format!("--user-agent={}", user_agent),
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            anyhow!("配置浏览器失败: {}", e)
        })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        anyhow!("创建页面失败: {}", e)
    })?;

    Ok((browser, page))
}
