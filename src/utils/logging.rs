/// 日志工具模块
///
/// 初始化 tracing 订阅器，并提供日志格式化和输出的辅助函数
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::models::{CampaignStats, ExperienceLevel, PairStats, SearchCombination};

/// 初始化日志
///
/// 同时输出到控制台和 `log_dir` 下本次运行的日志文件，返回日志文件路径。
/// 日志级别默认为 `info`，可以用 `RUST_LOG` 覆盖。重复调用不会报错。
///
/// # 参数
/// - `log_dir`: 日志目录
pub fn init(log_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(log_dir).with_context(|| format!("无法创建日志目录 {}", log_dir.display()))?;

    let file_name = format!("{} applyJobs.log", chrono::Local::now().format("%m_%d_%y %H_%M_%S"));
    let log_path = log_dir.join(file_name);
    let log_file = fs::File::create(&log_path)
        .with_context(|| format!("无法创建日志文件 {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // 已经初始化过时忽略
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Arc::new(log_file)),
        )
        .try_init();

    Ok(log_path)
}

/// 记录程序启动信息
pub fn log_startup(levels: &[ExperienceLevel]) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - Easy Apply 自动投递");
    if let Ok(dir) = std::env::current_dir() {
        info!("📂 工作目录: {}", dir.display());
    }
    if levels.is_empty() {
        info!("🎯 经验等级: 全部");
    } else {
        let labels: Vec<&str> = levels.iter().map(|l| l.label()).collect();
        info!("🎯 经验等级: {}", labels.join(", "));
    }
    info!("{}", "=".repeat(60));
}

/// 记录配置摘要（不含账号密码）
pub fn log_config_summary(config: &Config) {
    info!("⚙️ 配置: {}", config.redacted_summary());
}

/// 记录搜索组合开始信息
///
/// # 参数
/// - `combo`: 搜索组合
/// - `budget`: 本组合的时间预算
pub fn log_pair_start(combo: &SearchCombination, budget: Duration) {
    info!("\n{}", "=".repeat(60));
    info!("🔍 开始搜索: {}", combo);
    info!("⏱️ 时间预算: {} 分钟", budget.as_secs() / 60);
    info!("{}", "=".repeat(60));
}

/// 记录搜索组合完成信息
pub fn log_pair_complete(combo: &SearchCombination, stats: &PairStats, elapsed: Duration) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 搜索完成 [{}]: {} 页, {} 个候选, 投递成功 {}/{}, 失败 {} (耗时 {}s)",
        combo,
        stats.pages,
        stats.candidates,
        stats.submitted,
        stats.processed(),
        stats.failed,
        elapsed.as_secs()
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `stats`: 整次运行统计
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(stats: &CampaignStats, log_file_path: Option<&Path>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("🔍 搜索组合: {}/{}", stats.pairs, stats.planned_pairs);
    info!("📄 结果页: {}", stats.totals.pages);
    info!("👀 候选职位: {}", stats.totals.candidates);
    info!("✅ 投递成功: {}", stats.totals.submitted);
    info!("⏭️ 未投递: {}", stats.totals.not_submitted);
    info!("❌ 失败: {}", stats.totals.failed);
    info!("{}", "=".repeat(60));
    if let Some(path) = log_file_path {
        info!("\n日志已保存至: {}", path.display());
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
