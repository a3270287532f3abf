//! 测试用的内存假页面
//!
//! 页面由若干"屏幕"组成，按 URL 片段路由（没有命中时是空白页）；点击元素可以切换到另一个屏幕。
//! 所有交互都记录下来供断言。

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use easy_apply_bot::error::{DriverError, DriverResult};
use easy_apply_bot::infrastructure::{ElementHandle, Locator, PageDriver, WindowGeometry};

/// 记录下来的交互
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(String),
    Click(String),
    Clear(String),
    Type { target: String, text: String },
    Upload { target: String, path: PathBuf },
    ScrollPage(u32),
    ScrollElement { target: String, y: u32 },
    Window(WindowGeometry),
}

/// 页面上的一个元素
#[derive(Debug, Clone)]
pub struct FakeNode {
    locator: Locator,
    name: String,
    text: String,
    attrs: HashMap<String, String>,
    clickable: bool,
    on_click: Option<String>,
    children: Vec<FakeNode>,
}

impl FakeNode {
    pub fn new(locator: &Locator) -> Self {
        Self {
            locator: locator.clone(),
            name: locator.selector().to_string(),
            text: String::new(),
            attrs: HashMap::new(),
            clickable: true,
            on_click: None,
            children: Vec::new(),
        }
    }

    /// 在动作记录里使用的名字
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, child: FakeNode) -> Self {
        self.children.push(child);
        self
    }

    /// 点击后切换到另一个屏幕
    pub fn on_click(mut self, screen: &str) -> Self {
        self.on_click = Some(screen.to_string());
        self
    }

    pub fn not_clickable(mut self) -> Self {
        self.clickable = false;
        self
    }
}

/// 一个屏幕（一份文档）
#[derive(Debug, Clone, Default)]
pub struct Screen {
    title: String,
    source: String,
    nodes: Vec<FakeNode>,
}

impl Screen {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn node(mut self, node: FakeNode) -> Self {
        self.nodes.push(node);
        self
    }
}

#[derive(Default)]
struct State {
    screens: HashMap<String, Screen>,
    routes: Vec<(String, String)>,
    failing: Vec<String>,
    current: Option<String>,
    generation: u64,
    handles: Vec<(u64, Vec<usize>)>,
    actions: Vec<Action>,
}

impl State {
    fn screen(&self) -> Option<&Screen> {
        self.current.as_ref().and_then(|name| self.screens.get(name))
    }

    fn node(&self, path: &[usize]) -> Option<&FakeNode> {
        let screen = self.screen()?;
        let (first, rest) = path.split_first()?;
        let mut node = screen.nodes.get(*first)?;
        for index in rest {
            node = node.children.get(*index)?;
        }
        Some(node)
    }

    fn resolve(&self, handle: &ElementHandle) -> DriverResult<(Vec<usize>, FakeNode)> {
        let id = handle.id();
        let (generation, path) = self
            .handles
            .get(id as usize)
            .ok_or(DriverError::StaleElement(id))?;
        if *generation != self.generation {
            return Err(DriverError::StaleElement(id));
        }
        let node = self.node(path).ok_or(DriverError::StaleElement(id))?;
        Ok((path.clone(), node.clone()))
    }

    fn register(&mut self, paths: Vec<Vec<usize>>) -> Vec<ElementHandle> {
        paths
            .into_iter()
            .map(|path| {
                self.handles.push((self.generation, path));
                ElementHandle::new((self.handles.len() - 1) as u64)
            })
            .collect()
    }

    fn switch_to(&mut self, screen: Option<String>) {
        self.current = screen;
        self.generation += 1;
    }
}

fn collect_matches(nodes: &[FakeNode], locator: &Locator, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (index, node) in nodes.iter().enumerate() {
        prefix.push(index);
        if &node.locator == locator {
            out.push(prefix.clone());
        }
        collect_matches(&node.children, locator, prefix, out);
        prefix.pop();
    }
}

/// 内存假页面
#[derive(Default)]
pub struct FakePage {
    state: Mutex<State>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册屏幕
    pub fn screen(self, name: &str, screen: Screen) -> Self {
        self.lock().screens.insert(name.to_string(), screen);
        self
    }

    /// URL 包含 `fragment` 时显示 `screen`，多条命中时取最先注册的
    pub fn route(self, fragment: &str, screen: &str) -> Self {
        self.lock().routes.push((fragment.to_string(), screen.to_string()));
        self
    }

    /// URL 包含 `fragment` 时导航失败
    pub fn failing_route(self, fragment: &str) -> Self {
        self.lock().failing.push(fragment.to_string());
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.lock().actions.clone()
    }

    pub fn current_screen(&self) -> Option<String> {
        self.lock().current.clone()
    }

    pub fn clicks(&self, name: &str) -> usize {
        self.lock()
            .actions
            .iter()
            .filter(|a| matches!(a, Action::Click(target) if target == name))
            .count()
    }

    pub fn typed_into(&self, name: &str) -> Vec<String> {
        self.lock()
            .actions
            .iter()
            .filter_map(|a| match a {
                Action::Type { target, text } if target == name => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock()
            .actions
            .iter()
            .filter_map(|a| match a {
                Action::Navigate(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut state = self.lock();
        state.actions.push(Action::Navigate(url.to_string()));
        if state.failing.iter().any(|f| url.contains(f.as_str())) {
            return Err(DriverError::Unsupported(format!("导航失败: {}", url)));
        }
        let screen = state
            .routes
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, screen)| screen.clone());
        state.switch_to(screen);
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<ElementHandle>> {
        let mut state = self.lock();
        let mut paths = Vec::new();
        if let Some(screen) = state.screen() {
            collect_matches(&screen.nodes, locator, &mut Vec::new(), &mut paths);
        }
        Ok(state.register(paths))
    }

    async fn find_within(&self, parent: &ElementHandle, locator: &Locator) -> DriverResult<Vec<ElementHandle>> {
        let mut state = self.lock();
        let (mut prefix, node) = state.resolve(parent)?;
        let mut paths = Vec::new();
        collect_matches(&node.children, locator, &mut prefix, &mut paths);
        Ok(state.register(paths))
    }

    async fn element_text(&self, element: &ElementHandle) -> DriverResult<String> {
        let state = self.lock();
        Ok(state.resolve(element)?.1.text)
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>> {
        let state = self.lock();
        Ok(state.resolve(element)?.1.attrs.get(name).cloned())
    }

    async fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        let mut state = self.lock();
        let (_, node) = state.resolve(element)?;
        state.actions.push(Action::Click(node.name.clone()));
        if let Some(next) = node.on_click {
            state.switch_to(Some(next));
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> DriverResult<()> {
        let mut state = self.lock();
        let (_, node) = state.resolve(element)?;
        state.actions.push(Action::Clear(node.name));
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        let mut state = self.lock();
        let (_, node) = state.resolve(element)?;
        state.actions.push(Action::Type {
            target: node.name,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn upload_file(&self, element: &ElementHandle, path: &Path) -> DriverResult<()> {
        let mut state = self.lock();
        let (_, node) = state.resolve(element)?;
        state.actions.push(Action::Upload {
            target: node.name,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn scroll_page(&self, y: u32) -> DriverResult<()> {
        self.lock().actions.push(Action::ScrollPage(y));
        Ok(())
    }

    async fn scroll_element(&self, element: &ElementHandle, y: u32) -> DriverResult<()> {
        let mut state = self.lock();
        let (_, node) = state.resolve(element)?;
        state.actions.push(Action::ScrollElement { target: node.name, y });
        Ok(())
    }

    async fn title(&self) -> DriverResult<String> {
        Ok(self.lock().screen().map(|s| s.title.clone()).unwrap_or_default())
    }

    async fn page_source(&self) -> DriverResult<String> {
        Ok(self.lock().screen().map(|s| s.source.clone()).unwrap_or_default())
    }

    async fn wait_until_clickable(&self, element: &ElementHandle, timeout: Duration) -> DriverResult<bool> {
        let clickable = {
            let state = self.lock();
            state.resolve(element)?.1.clickable
        };
        if !clickable {
            tokio::time::sleep(timeout).await;
        }
        Ok(clickable)
    }

    async fn set_window_geometry(&self, geometry: WindowGeometry) -> DriverResult<()> {
        self.lock().actions.push(Action::Window(geometry));
        Ok(())
    }
}
