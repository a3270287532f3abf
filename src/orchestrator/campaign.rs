//! 整次运行处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责所有搜索组合的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：打开浏览器、登录、加载投递记录和问答知识库
//! 2. **组合生成**：职位 × 地点，打乱顺序，最多取 `max_combinations` 个
//! 3. **时间控制**：整次运行的时间预算在每个组合开始前检查
//! 4. **资源管理**：持有 Browser 和 ChromeDriver，确保生命周期正确
//! 5. **全局统计**：汇总所有组合的处理结果
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个职位的细节
//! - **资源所有者**：唯一持有 Browser 的模块
//! - **向下委托**：委托 discovery 处理单个组合

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{ChromeDriver, PageDriver, WindowGeometry};
use crate::models::{CampaignStats, SearchCombination};
use crate::orchestrator::discovery::Discovery;
use crate::services::{AnswerRules, KnowledgeBase, Ledger, Pacing};
use crate::utils::logging::{log_config_summary, log_startup, print_final_stats};
use crate::workflow::{ApplyFlow, ApplySettings};

/// 一次完整运行
///
/// 职责：
/// - 持有投递流程（以及其中的投递记录、问答知识库）
/// - 遍历所有搜索组合，交给 `Discovery`
/// - 不持有浏览器，页面能力由调用方传入
pub struct Campaign {
    positions: Vec<String>,
    locations: Vec<String>,
    max_combinations: usize,
    campaign_budget: Duration,
    recent_window: chrono::Duration,
    discovery: Discovery,
    flow: ApplyFlow,
}

impl Campaign {
    pub fn new(
        positions: Vec<String>,
        locations: Vec<String>,
        max_combinations: usize,
        campaign_budget: Duration,
        recent_window: chrono::Duration,
        discovery: Discovery,
        flow: ApplyFlow,
    ) -> Self {
        Self {
            positions,
            locations,
            max_combinations,
            campaign_budget,
            recent_window,
            discovery,
            flow,
        }
    }

    /// 按配置组装：投递记录、问答知识库、节奏控制、投递流程、搜索处理器
    pub fn from_config(config: &Config) -> Self {
        let pacing = Pacing::from_settings(&config.pacing);
        let ledger = Ledger::new(&config.output_filename);
        let knowledge_base = KnowledgeBase::open(&config.qa_filename, AnswerRules::from_config(config));
        let flow = ApplyFlow::new(ApplySettings::from_config(config), ledger, knowledge_base, pacing.clone());
        let discovery = Discovery::from_config(config, pacing);

        Self::new(
            config.positions.clone(),
            config.locations.clone(),
            config.limits.max_combinations,
            config.limits.campaign_budget(),
            config.limits.recent_window(),
            discovery,
            flow,
        )
    }

    pub fn flow(&self) -> &ApplyFlow {
        &self.flow
    }

    /// 运行所有搜索组合
    pub async fn run(&mut self, driver: &dyn PageDriver) -> CampaignStats {
        let mut seen: HashSet<String> = self.flow.ledger().load_recent(self.recent_window);

        let combos = SearchCombination::shuffled(
            &self.positions,
            &self.locations,
            self.max_combinations,
            &mut rand::thread_rng(),
        );
        info!("📋 共 {} 个搜索组合", combos.len());

        let mut stats = CampaignStats {
            planned_pairs: combos.len(),
            ..Default::default()
        };

        // 窗口缩小移到屏幕外
        if let Err(e) = driver.set_window_geometry(WindowGeometry::hidden()).await {
            warn!("⚠️ 无法隐藏浏览器窗口: {}", e);
        }

        let started = Instant::now();
        for (index, combo) in combos.iter().enumerate() {
            if started.elapsed() >= self.campaign_budget {
                warn!(
                    "⏰ 已超过运行时间预算 {} 分钟，剩余 {} 个组合不再处理",
                    self.campaign_budget.as_secs() / 60,
                    combos.len() - index
                );
                break;
            }

            info!("🎯 [{}/{}] 目标: {}", index + 1, combos.len(), combo);
            if let Err(e) = driver.set_window_geometry(WindowGeometry::Maximized).await {
                warn!("⚠️ 无法最大化浏览器窗口: {}", e);
            }

            let pair = self
                .discovery
                .search_pair(driver, combo, &mut self.flow, &mut seen)
                .await;
            stats.record_pair(pair);
        }

        stats
    }
}

/// 打开浏览器并登录
async fn start_session(config: &Config) -> AppResult<(Browser, ChromeDriver)> {
    let (browser, page) = browser::open_session(config).await?;
    let driver = ChromeDriver::new(page);

    let pacing = Pacing::from_settings(&config.pacing);
    browser::login(&driver, &config.username, &config.password, &pacing).await?;

    Ok((browser, driver))
}

/// 应用主结构
pub struct App {
    _browser: Browser,
    driver: ChromeDriver,
    campaign: Campaign,
    log_path: Option<PathBuf>,
}

impl App {
    /// 初始化应用
    ///
    /// 打开浏览器并登录，任何一步失败都是致命错误。
    pub async fn initialize(config: Config, log_path: Option<PathBuf>) -> Result<Self> {
        log_startup(&config.experience_levels());
        log_config_summary(&config);

        let campaign = Campaign::from_config(&config);

        let (browser, driver) = start_session(&config)
            .await
            .context("无法建立浏览器会话")?;

        Ok(Self {
            _browser: browser,
            driver,
            campaign,
            log_path,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&mut self) -> Result<CampaignStats> {
        let stats = self.campaign.run(&self.driver).await;
        print_final_stats(&stats, self.log_path.as_deref());
        Ok(stats)
    }
}
