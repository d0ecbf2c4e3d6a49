/// 日志工具模块
///
/// 负责初始化 tracing，以及输出启动 / 汇总横幅
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志：同时输出到终端和日志文件
///
/// `RUST_LOG` 优先；未设置时 verbose 为 debug，否则为 info
pub fn init(log_file_path: &str, verbose: bool) -> Result<()> {
    let path = Path::new(log_file_path);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("无法创建日志目录: {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("日志系统已初始化")?;

    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(entry_url: &str, max_concurrent: usize, headless: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 案件状态检索");
    info!("🌐 门户入口: {}", entry_url);
    info!("📊 最大并发搜索数: {}", max_concurrent);
    info!("🖥️ 浏览器模式: {}", if headless { "无头" } else { "有界面" });
    info!("{}", "=".repeat(60));
}

/// 记录法院开始处理
pub fn log_court_start(index: usize, total: usize, court_name: &str, court_code: &str) {
    info!("\n{}", "=".repeat(60));
    info!("🏛️ 开始处理第 {}/{} 个法院: {} (代码: {})", index, total, court_name, court_code);
    info!("{}", "=".repeat(60));
}

/// 记录法庭处理完成
pub fn log_bench_complete(bench_name: &str, succeeded: usize, total: usize, records: usize) {
    info!("{}", "─".repeat(60));
    info!(
        "✓ 法庭 {} 完成: 成功 {}/{} 个查询，共 {} 条案件",
        bench_name, succeeded, total, records
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(succeeded: usize, failed: usize, records: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功查询: {}/{}", succeeded, succeeded + failed);
    info!("❌ 失败查询: {}", failed);
    info!("📁 案件记录: {}", records);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
