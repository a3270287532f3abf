//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整次运行和搜索组合的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `campaign` - 整次运行处理器
//! - 管理应用生命周期（初始化、登录、运行）
//! - 生成并打乱搜索组合（Vec<SearchCombination>）
//! - 控制整次运行的时间预算
//! - 管理浏览器资源（Browser、ChromeDriver）
//! - 输出全局统计信息
//!
//! ### `discovery` - 单个搜索组合处理器
//! - 翻页遍历一个组合的搜索结果
//! - 过滤候选职位（黑名单 / 已投递 / 近期处理过）
//! - 逐个交给 ApplyFlow
//! - 输出单个组合的统计信息
//!
//! ## 层次关系
//!
//! ```text
//! campaign (处理 Vec<SearchCombination>)
//!     ↓
//! discovery (处理一页页的 Vec<JobCandidate>)
//!     ↓
//! workflow::ApplyFlow (处理单个职位)
//!     ↓
//! services (能力层：ledger / knowledge_base / pacing / navigation)
//!     ↓
//! infrastructure (基础设施：PageDriver)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：campaign 管整次运行，discovery 管单个组合
//! 2. **资源隔离**：只有编排层持有 Browser
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和统计，不做具体表单判断

pub mod campaign;
pub mod discovery;

// 重新导出主要类型
pub use campaign::{App, Campaign};
pub use discovery::Discovery;
