//! Chrome 页面驱动 - 基础设施层
//!
//! 持有唯一的 chromiumoxide `Page`，实现 `PageDriver`

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    Bounds, GetWindowForTargetParams, SetWindowBoundsParams, WindowState,
};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::{Element, Page};
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{DriverError, DriverResult};
use crate::infrastructure::page_driver::{ElementHandle, Locator, PageDriver, WindowGeometry};

const CLICKABLE_JS: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return !this.disabled
        && rect.width > 0
        && rect.height > 0
        && style.visibility !== 'hidden'
        && style.pointerEvents !== 'none';
}"#;

const CLEAR_JS: &str = r#"function() {
    this.value = '';
    this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

/// 当前文档中已经交给上层的元素
///
/// 句柄编号 = (文档代数 << 32) | 下标，导航后代数加一，旧句柄自然失效。
#[derive(Default)]
struct Registry {
    generation: u64,
    elements: Vec<Element>,
}

impl Registry {
    fn register(&mut self, elements: Vec<Element>) -> Vec<ElementHandle> {
        elements
            .into_iter()
            .map(|element| {
                let index = self.elements.len() as u64;
                self.elements.push(element);
                ElementHandle::new((self.generation << 32) | index)
            })
            .collect()
    }

    fn get(&self, handle: &ElementHandle) -> DriverResult<&Element> {
        let id = handle.id();
        if id >> 32 != self.generation {
            return Err(DriverError::StaleElement(id));
        }
        self.elements
            .get((id & 0xFFFF_FFFF) as usize)
            .ok_or(DriverError::StaleElement(id))
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.elements.clear();
    }
}

/// Chrome 页面驱动
pub struct ChromeDriver {
    page: Page,
    registry: Mutex<Registry>,
}

impl ChromeDriver {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> DriverResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    async fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().await
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        debug!("导航到: {}", url);
        self.page.goto(url).await?;
        self.registry().await.reset();
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<ElementHandle>> {
        let elements = match locator {
            Locator::Css(selector) => self.page.find_elements(selector.to_string()).await?,
            // DOM.performSearch 在没有结果时会直接报错
            Locator::XPath(selector) => match self.page.find_xpaths(selector.to_string()).await {
                Ok(elements) => elements,
                Err(e) => {
                    debug!("XPath 查询无结果 {}: {}", selector, e);
                    Vec::new()
                }
            },
        };
        Ok(self.registry().await.register(elements))
    }

    async fn find_within(&self, parent: &ElementHandle, locator: &Locator) -> DriverResult<Vec<ElementHandle>> {
        let mut registry = self.registry().await;
        let elements = match locator {
            Locator::Css(selector) => registry.get(parent)?.find_elements(selector.to_string()).await?,
            Locator::XPath(_) => {
                return Err(DriverError::Unsupported(format!("元素内 XPath 查询: {}", locator)));
            }
        };
        Ok(registry.register(elements))
    }

    async fn element_text(&self, element: &ElementHandle) -> DriverResult<String> {
        let registry = self.registry().await;
        Ok(registry.get(element)?.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>> {
        let registry = self.registry().await;
        Ok(registry.get(element)?.attribute(name).await?)
    }

    async fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        let registry = self.registry().await;
        let el = registry.get(element)?;
        if let Err(e) = el.click().await {
            // 被遮挡的单选框等，退回到脚本点击
            debug!("原生点击失败，改用脚本点击: {}", e);
            el.call_js_fn("function() { this.click(); }", false).await?;
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> DriverResult<()> {
        let registry = self.registry().await;
        registry.get(element)?.call_js_fn(CLEAR_JS, false).await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        let registry = self.registry().await;
        registry.get(element)?.focus().await?.type_str(text).await?;
        Ok(())
    }

    async fn upload_file(&self, element: &ElementHandle, path: &Path) -> DriverResult<()> {
        let registry = self.registry().await;
        let el = registry.get(element)?;
        let params = SetFileInputFilesParams::builder()
            .file(path.to_string_lossy().to_string())
            .backend_node_id(el.backend_node_id)
            .build()
            .map_err(DriverError::Unsupported)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn scroll_page(&self, y: u32) -> DriverResult<()> {
        self.eval(format!("window.scrollTo(0, {});", y)).await?;
        Ok(())
    }

    async fn scroll_element(&self, element: &ElementHandle, y: u32) -> DriverResult<()> {
        let registry = self.registry().await;
        registry
            .get(element)?
            .call_js_fn(format!("function() {{ this.scrollTo(0, {}); }}", y), false)
            .await?;
        Ok(())
    }

    async fn title(&self) -> DriverResult<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn page_source(&self) -> DriverResult<String> {
        Ok(self.page.content().await?)
    }

    async fn wait_until_clickable(&self, element: &ElementHandle, timeout: Duration) -> DriverResult<bool> {
        let deadline = Instant::now() + timeout;
        let registry = self.registry().await;
        let el = registry.get(element)?;

        loop {
            let returns = el.call_js_fn(CLICKABLE_JS, false).await?;
            let clickable = returns
                .result
                .value
                .as_ref()
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if clickable {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(Duration::from_millis(250)).await;
        }
    }

    async fn set_window_geometry(&self, geometry: WindowGeometry) -> DriverResult<()> {
        let window = self.page.execute(GetWindowForTargetParams::default()).await?;
        let window_id = window.result.window_id.clone();

        let bounds = match geometry {
            WindowGeometry::Bounds {
                left,
                top,
                width,
                height,
            } => Bounds::builder()
                .left(left)
                .top(top)
                .width(width)
                .height(height)
                .window_state(WindowState::Normal)
                .build(),
            WindowGeometry::Maximized => Bounds::builder().window_state(WindowState::Maximized).build(),
        };

        self.page.execute(SetWindowBoundsParams::new(window_id, bounds)).await?;
        Ok(())
    }
}
