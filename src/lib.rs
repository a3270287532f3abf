//! # Easy Apply Bot
//!
//! 一个用于在 LinkedIn 上自动投递 Easy Apply 职位的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PageDriver` - 页面自动化能力抽象（导航 / 查找 / 点击 / 输入 / 滚动）
//! - `ChromeDriver` - 唯一的 page owner，基于 chromiumoxide 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `Ledger` - 读写投递记录能力
//! - `KnowledgeBase` - 筛选问题查询 / 推断 / 记录能力
//! - `Pacing` - 停顿与退避能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个职位"的完整投递流程
//! - `JobCtx` - 上下文封装（job_id + 搜索组合）
//! - `ApplyFlow` - 状态机（按钮检查 → 表单循环 → 提交 / 放弃 → 记录）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/campaign` - 整次运行处理器，管理资源和时间预算
//! - `orchestrator/discovery` - 单个搜索组合处理器，翻页遍历职位
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod site;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{ChromeDriver, ElementHandle, Locator, PageDriver, WindowGeometry};
pub use models::{CampaignStats, JobRecord, PairStats, SearchCombination};
pub use orchestrator::{App, Campaign, Discovery};
pub use services::{AnswerRules, KnowledgeBase, Ledger, Pacing};
pub use workflow::{ApplyFlow, ApplyOutcome, ApplySettings, ApplyVerdict, JobCtx};
