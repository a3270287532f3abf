use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::BrowserError;

/// 启动参数
const CHROME_ARGS: [&str; 5] = [
    "--start-maximized",
    "--ignore-certificate-errors",
    "--no-sandbox",
    "--disable-extensions",
    "--disable-blink-features=AutomationControlled",
];

/// 打开浏览器会话
///
/// 配置了 `browser.debug_port` 时连接已在运行的浏览器，否则启动新的 Chrome。
pub async fn open_session(config: &Config) -> Result<(Browser, Page), BrowserError> {
    match config.browser.debug_port {
        Some(port) => connect_to_browser(port).await,
        None => {
            let profile = config.resolved_profile_path();
            launch_browser(
                config.browser.headless,
                profile.as_deref(),
                config.browser.chrome_executable.as_deref(),
            )
            .await
        }
    }
}

/// 启动新的浏览器
pub async fn launch_browser(
    headless: bool,
    profile_path: Option<&Path>,
    chrome_executable: Option<&Path>,
) -> Result<(Browser, Page), BrowserError> {
    info!("🚀 启动浏览器...");
    debug!("无头模式: {}, 用户目录: {:?}", headless, profile_path);

    let mut builder = BrowserConfig::builder().args(CHROME_ARGS);
    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(profile) = profile_path {
        builder = builder.user_data_dir(profile);
    }
    if let Some(executable) = chrome_executable {
        builder = builder.chrome_executable(executable);
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        BrowserError::ConfigurationFailed(e)
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        BrowserError::LaunchFailed { source: Box::new(e) }
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
        BrowserError::LaunchFailed { source: Box::new(e) }
    })?;

    info!("✅ 浏览器已就绪");
    Ok((browser, page))
}

/// 连接到已在运行的浏览器并新建页面
pub async fn connect_to_browser(port: u16) -> Result<(Browser, Page), BrowserError> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        BrowserError::ConnectionFailed {
            port,
            source: Box::new(e),
        }
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        BrowserError::ConnectionFailed {
            port,
            source: Box::new(e),
        }
    })?;

    Ok((browser, page))
}
