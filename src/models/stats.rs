//! 运行统计

use std::ops::AddAssign;

/// 单个搜索组合的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PairStats {
    pub pages: usize,
    pub candidates: usize,
    pub submitted: usize,
    pub not_submitted: usize,
    pub failed: usize,
}

impl PairStats {
    /// 交给投递流程的职位数
    pub fn processed(&self) -> usize {
        self.submitted + self.not_submitted + self.failed
    }
}

impl AddAssign for PairStats {
    fn add_assign(&mut self, other: Self) {
        self.pages += other.pages;
        self.candidates += other.candidates;
        self.submitted += other.submitted;
        self.not_submitted += other.not_submitted;
        self.failed += other.failed;
    }
}

/// 整次运行的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CampaignStats {
    /// 实际处理的搜索组合数
    pub pairs: usize,
    /// 计划处理的搜索组合数
    pub planned_pairs: usize,
    pub totals: PairStats,
}

impl CampaignStats {
    pub fn record_pair(&mut self, pair: PairStats) {
        self.pairs += 1;
        self.totals += pair;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_pair_accumulates() {
        let mut stats = CampaignStats::default();
        stats.record_pair(PairStats {
            pages: 2,
            candidates: 3,
            submitted: 1,
            not_submitted: 1,
            failed: 1,
        });
        stats.record_pair(PairStats {
            pages: 1,
            ..Default::default()
        });

        assert_eq!(stats.pairs, 2);
        assert_eq!(stats.totals.pages, 3);
        assert_eq!(stats.totals.processed(), 3);
    }
}
