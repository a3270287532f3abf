//! 页面自动化能力 - 基础设施层
//!
//! 上层只依赖 `PageDriver` 这个抽象能力，不关心背后是哪个浏览器引擎。
//! 生产环境由 `ChromeDriver` 实现，测试里可以换成内存中的假页面。

use std::borrow::Cow;
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::DriverResult;

/// 元素选择器
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(Cow<'static, str>),
    XPath(Cow<'static, str>),
}

impl Locator {
    pub const fn css(selector: &'static str) -> Self {
        Locator::Css(Cow::Borrowed(selector))
    }

    pub const fn xpath(selector: &'static str) -> Self {
        Locator::XPath(Cow::Borrowed(selector))
    }

    pub fn selector(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// 元素句柄
///
/// 不透明的编号，由具体的 `PageDriver` 实现分配和解释。
/// 页面跳转后旧句柄失效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// 窗口位置与大小
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowGeometry {
    Bounds {
        left: i64,
        top: i64,
        width: i64,
        height: i64,
    },
    Maximized,
}

impl WindowGeometry {
    /// 缩到 1x1 并移出屏幕
    pub fn hidden() -> Self {
        WindowGeometry::Bounds {
            left: 2000,
            top: 2000,
            width: 1,
            height: 1,
        }
    }
}

/// 页面自动化能力
///
/// 职责：
/// - 持有唯一的浏览器会话
/// - 只暴露"导航 / 找元素 / 点击 / 输入 / 滚动 / 读页面"能力
/// - 不认识职位、表单、问答
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// 在整个页面中查找所有匹配元素
    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<ElementHandle>>;

    /// 在某个元素内部查找
    async fn find_within(&self, parent: &ElementHandle, locator: &Locator) -> DriverResult<Vec<ElementHandle>>;

    /// 元素的可见文本
    async fn element_text(&self, element: &ElementHandle) -> DriverResult<String>;

    async fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>>;

    async fn click(&self, element: &ElementHandle) -> DriverResult<()>;

    /// 清空输入框
    async fn clear(&self, element: &ElementHandle) -> DriverResult<()>;

    async fn type_text(&self, element: &ElementHandle, text: &str) -> DriverResult<()>;

    /// 给 `<input type="file">` 设置文件
    async fn upload_file(&self, element: &ElementHandle, path: &Path) -> DriverResult<()>;

    /// 页面滚动到纵向位置 `y`
    async fn scroll_page(&self, y: u32) -> DriverResult<()>;

    /// 元素内部滚动到纵向位置 `y`
    async fn scroll_element(&self, element: &ElementHandle, y: u32) -> DriverResult<()>;

    async fn title(&self) -> DriverResult<String>;

    async fn page_source(&self) -> DriverResult<String>;

    /// 等待元素可点击，超时返回 `Ok(false)`
    async fn wait_until_clickable(&self, element: &ElementHandle, timeout: Duration) -> DriverResult<bool>;

    async fn set_window_geometry(&self, geometry: WindowGeometry) -> DriverResult<()>;

    /// 查找第一个匹配元素，找不到（或查找本身出错）都视为不存在
    async fn find_optional(&self, locator: &Locator) -> Option<ElementHandle> {
        match self.find_all(locator).await {
            Ok(elements) => elements.into_iter().next(),
            Err(e) if e.is_absence() => None,
            Err(e) => {
                debug!("查找 {} 失败，按不存在处理: {}", locator, e);
                None
            }
        }
    }

    /// 页面上是否存在匹配元素
    async fn is_present(&self, locator: &Locator) -> bool {
        self.find_optional(locator).await.is_some()
    }
}
