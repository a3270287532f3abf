use std::path::Path;

use anyhow::Result;
use easy_apply_bot::utils::logging;
use easy_apply_bot::{App, AppError, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    let log_path = logging::init(Path::new("logs"))?;

    // 加载配置，缺字段时在启动浏览器之前退出
    let config = Config::from_env().map_err(AppError::from)?;

    // 初始化并运行应用
    let mut app = App::initialize(config, Some(log_path)).await?;
    app.run().await?;

    Ok(())
}
