//! 单个搜索组合处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责一个（职位, 地点）组合的翻页搜索，是搜索级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **翻页搜索**：按 `start` 偏移逐页打开搜索结果
//! 2. **懒加载**：滚动页面和结果列表
//! 3. **候选过滤**：去掉黑名单、已标记 Applied、近期处理过的职位
//! 4. **流程调度**：逐个交给 `ApplyFlow`
//! 5. **统计输出**：记录页数、候选数、投递结果

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::infrastructure::PageDriver;
use crate::models::{CandidateSet, CandidateStatus, ExperienceLevel, PairStats, SearchCombination};
use crate::services::{navigation, Pacing};
use crate::site;
use crate::utils::logging::{log_pair_complete, log_pair_start};
use crate::workflow::{ApplyFlow, JobCtx};

/// 一页扫描的结果
#[derive(Debug, Default)]
struct PageScan {
    /// 页面上的职位条目数（过滤前）
    listings: usize,
    candidates: CandidateSet,
}

/// 搜索组合处理器
pub struct Discovery {
    blacklist: Vec<String>,
    levels: Vec<ExperienceLevel>,
    page_size: usize,
    max_empty_pages: usize,
    search_budget: Duration,
    pacing: Pacing,
}

impl Discovery {
    pub fn new(
        blacklist: Vec<String>,
        levels: Vec<ExperienceLevel>,
        page_size: usize,
        max_empty_pages: usize,
        search_budget: Duration,
        pacing: Pacing,
    ) -> Self {
        Self {
            blacklist,
            levels,
            page_size,
            max_empty_pages,
            search_budget,
            pacing,
        }
    }

    pub fn from_config(config: &Config, pacing: Pacing) -> Self {
        Self::new(
            config.blacklist.clone(),
            config.experience_levels(),
            config.limits.page_size,
            config.limits.max_empty_pages,
            config.limits.search_budget(),
            pacing,
        )
    }

    /// 处理一个搜索组合，直到时间预算用完或连续多页没有结果
    ///
    /// `seen` 是近期处理过的 job_id，处理过的职位会加入其中。
    pub async fn search_pair(
        &self,
        driver: &dyn PageDriver,
        combo: &SearchCombination,
        flow: &mut ApplyFlow,
        seen: &mut HashSet<String>,
    ) -> PairStats {
        log_pair_start(combo, self.search_budget);

        let started = Instant::now();
        let mut stats = PairStats::default();
        let mut offset = 0;
        let mut empty_pages = 0;

        while started.elapsed() < self.search_budget {
            let remaining = self.search_budget.saturating_sub(started.elapsed());
            info!("[搜索 {}] 剩余 {} 分钟", combo, remaining.as_secs() / 60);

            match self.search_page(driver, combo, offset, flow, seen, &mut stats).await {
                Ok(0) => {
                    empty_pages += 1;
                    info!("[搜索 {}] 第 {} 页没有结果（连续 {} 页）", combo, stats.pages, empty_pages);
                }
                Ok(_) => empty_pages = 0,
                Err(e) => {
                    error!("[搜索 {}] ❌ 本页处理出错: {:#}", combo, e);
                    empty_pages += 1;
                }
            }

            if empty_pages >= self.max_empty_pages {
                info!("[搜索 {}] 连续 {} 页没有结果，结束", combo, empty_pages);
                break;
            }
            offset += self.page_size;
        }

        log_pair_complete(combo, &stats, started.elapsed());
        stats
    }

    /// 处理一页搜索结果，返回页面上的职位条目数
    async fn search_page(
        &self,
        driver: &dyn PageDriver,
        combo: &SearchCombination,
        offset: usize,
        flow: &mut ApplyFlow,
        seen: &mut HashSet<String>,
        stats: &mut PairStats,
    ) -> Result<usize> {
        self.pacing.human_pause().await;

        let url = site::search_url(combo, offset, &self.levels);
        debug!("[搜索 {}] 打开 {}", combo, url);
        navigation::open_and_load(driver, &url, &self.pacing).await?;
        navigation::scroll_results(driver, &self.pacing).await?;
        stats.pages += 1;

        let PageScan {
            listings,
            mut candidates,
        } = self.scan_page(driver, combo, seen).await?;
        stats.candidates += candidates.len();
        info!(
            "[搜索 {}] 第 {} 页: {} 个条目, {} 个待投递",
            combo,
            stats.pages,
            listings,
            candidates.len()
        );

        for (index, job_id) in candidates.pending().into_iter().enumerate() {
            let ctx = JobCtx::new(job_id.clone(), combo.to_string(), index + 1);

            let status = match flow.run(driver, &ctx).await {
                Ok(outcome) if outcome.submitted() => {
                    stats.submitted += 1;
                    CandidateStatus::Applied
                }
                Ok(_) => {
                    stats.not_submitted += 1;
                    CandidateStatus::Skipped
                }
                Err(e) => {
                    error!("{} ❌ 处理失败: {:#}", ctx, e);
                    stats.failed += 1;
                    CandidateStatus::Failed
                }
            };
            candidates.set_status(&job_id, status);
            seen.insert(job_id);
        }

        Ok(listings)
    }

    /// 读出页面上的职位条目并过滤
    async fn scan_page(
        &self,
        driver: &dyn PageDriver,
        combo: &SearchCombination,
        seen: &HashSet<String>,
    ) -> Result<PageScan> {
        let links = driver.find_all(&site::JOB_LINKS).await?;
        let mut scan = PageScan {
            listings: links.len(),
            candidates: CandidateSet::new(),
        };

        for link in links {
            let text = driver.element_text(&link).await.unwrap_or_default();
            if is_marked_applied(&text) {
                continue;
            }
            if self.blacklist.iter().any(|b| text.contains(b.as_str())) {
                debug!("[搜索 {}] 黑名单条目: {}", combo, text.lines().next().unwrap_or_default());
                continue;
            }

            let job_id = match driver.attribute(&link, site::JOB_ID_ATTRIBUTE).await {
                Ok(Some(id)) if !id.trim().is_empty() && id != "search" => id.trim().to_string(),
                Ok(other) => {
                    debug!("[搜索 {}] 条目没有有效的 job_id: {:?}", combo, other);
                    continue;
                }
                Err(e) => {
                    debug!("[搜索 {}] 读取 job_id 失败: {}", combo, e);
                    continue;
                }
            };
            if seen.contains(&job_id) {
                debug!("[搜索 {}] 近期已处理: {}", combo, job_id);
                continue;
            }
            scan.candidates.insert(job_id);
        }

        Ok(scan)
    }
}

/// 条目上是否有单独一行 "Applied" 标记
fn is_marked_applied(text: &str) -> bool {
    text.lines().any(|line| line.trim() == site::APPLIED_BADGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applied_badge_must_be_its_own_line() {
        assert!(is_marked_applied("Rust Engineer\nAcme\nApplied"));
        assert!(!is_marked_applied("Applied Scientist\nAcme"));
    }
}
