use tracing::{info, warn};

use crate::error::DriverResult;
use crate::infrastructure::PageDriver;
use crate::services::Pacing;
use crate::site;

/// 登录
///
/// 找不到登录表单时（例如用户目录里已有登录状态）只记录日志并继续。
/// 出现一键二次验证时再等待一段时间，留给人工处理。
pub async fn login(driver: &dyn PageDriver, username: &str, password: &str, pacing: &Pacing) -> DriverResult<()> {
    info!("🔐 正在登录...");
    driver.navigate(site::LOGIN_URL).await?;
    pacing.settle().await;

    let username_input = driver.find_optional(&site::USERNAME_INPUT).await;
    let password_input = driver.find_optional(&site::PASSWORD_INPUT).await;
    let login_button = driver.find_optional(&site::LOGIN_BUTTON).await;

    let (Some(username_input), Some(password_input), Some(login_button)) =
        (username_input, password_input, login_button)
    else {
        warn!("⚠️ 找不到登录表单，跳过登录");
        return Ok(());
    };

    driver.type_text(&username_input, username).await?;
    pacing.human_pause().await;
    driver.type_text(&password_input, password).await?;
    pacing.human_pause().await;
    driver.click(&login_button).await?;
    pacing.login_wait().await;

    if driver.is_present(&site::TWO_FACTOR_ONE_CLICK).await {
        info!("📱 需要二次验证，等待人工处理...");
        pacing.two_factor_wait().await;
    }

    info!("✓ 登录完成");
    Ok(())
}
