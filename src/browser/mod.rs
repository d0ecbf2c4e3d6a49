mod connection;
mod headless;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_browser;

use crate::config::Config;
use crate::error::GatewayError;
use chromiumoxide::{Browser, Page};

/// 按配置获取浏览器：调试端口非 0 时连接已有浏览器，否则自行启动
pub async fn open_browser(config: &Config) -> Result<(Browser, Page), GatewayError> {
    let result = if config.browser_debug_port != 0 {
        connect_to_browser_and_page(config.browser_debug_port, Some("Case Status")).await
    } else {
        launch_browser(
            config.headless,
            config.chrome_executable.as_deref(),
            &config.user_agent,
        )
        .await
    };

    result.map_err(|e| GatewayError::BrowserUnavailable(e.to_string()))
}
