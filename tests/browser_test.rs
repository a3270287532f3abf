use easy_apply_bot::browser::launch_browser;
use easy_apply_bot::infrastructure::{ChromeDriver, Locator, PageDriver, WindowGeometry};

#[tokio::test]
#[ignore] // 需要本机安装 Chrome：cargo test -- --ignored
async fn test_chrome_driver_against_real_browser() {
    let (_browser, page) = launch_browser(true, None, None)
        .await
        .expect("启动浏览器失败");
    let driver = ChromeDriver::new(page);

    driver
        .navigate("data:text/html,<title>Probe</title><button id='go'>Easy Apply</button>")
        .await
        .expect("导航失败");

    assert_eq!(driver.title().await.unwrap(), "Probe");

    let button = driver
        .find_optional(&Locator::css("#go"))
        .await
        .expect("应该找到按钮");
    assert_eq!(driver.element_text(&button).await.unwrap(), "Easy Apply");
    assert!(driver.find_optional(&Locator::css("#missing")).await.is_none());
}

#[tokio::test]
#[ignore]
async fn test_window_geometry_round_trip() {
    let (_browser, page) = launch_browser(false, None, None)
        .await
        .expect("启动浏览器失败");
    let driver = ChromeDriver::new(page);

    assert!(driver.set_window_geometry(WindowGeometry::hidden()).await.is_ok());
    assert!(driver.set_window_geometry(WindowGeometry::Maximized).await.is_ok());
}
