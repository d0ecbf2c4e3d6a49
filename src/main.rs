use anyhow::Result;
use case_status_scout::utils::logging;
use case_status_scout::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（含 .env）
    let config = Config::from_env();

    // 初始化日志
    logging::init(&config.log_file, config.verbose_logging)?;

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
