//! 页面加载与滚动 - 业务能力层
//!
//! 站点的职位列表和详情都是懒加载的，需要滚动才会渲染出来。

use tracing::debug;

use crate::error::DriverResult;
use crate::infrastructure::PageDriver;
use crate::services::pacing::Pacing;
use crate::site;

const PAGE_SCROLL_LIMIT: u32 = 4000;
const PAGE_SCROLL_STEP: usize = 500;
const RESULTS_SCROLL_RANGE: (u32, u32) = (300, 3000);
const RESULTS_SCROLL_STEP: usize = 100;

/// 导航到 `url` 并滚动整页，触发懒加载
pub async fn open_and_load(driver: &dyn PageDriver, url: &str, pacing: &Pacing) -> DriverResult<()> {
    driver.navigate(url).await?;
    load_page(driver, pacing).await
}

/// 从顶部每次向下滚动 500px 直到 4000px，然后回到顶部
pub async fn load_page(driver: &dyn PageDriver, pacing: &Pacing) -> DriverResult<()> {
    for y in (0..PAGE_SCROLL_LIMIT).step_by(PAGE_SCROLL_STEP) {
        driver.scroll_page(y).await?;
        pacing.scroll_settle().await;
    }
    driver.scroll_page(0).await?;
    pacing.scroll_settle().await;
    Ok(())
}

/// 滚动搜索结果列表，让列表里的所有条目都渲染出来
///
/// 列表不存在时什么也不做。
pub async fn scroll_results(driver: &dyn PageDriver, pacing: &Pacing) -> DriverResult<()> {
    let Some(list) = driver.find_optional(&site::SEARCH_RESULTS).await else {
        debug!("页面上没有搜索结果列表，跳过列表滚动");
        return Ok(());
    };

    let (start, end) = RESULTS_SCROLL_RANGE;
    for y in (start..end).step_by(RESULTS_SCROLL_STEP) {
        driver.scroll_element(&list, y).await?;
    }
    pacing.settle().await;
    Ok(())
}
