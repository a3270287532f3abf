//! 搜索结果页上的候选职位（只在处理一页期间存在）

/// 候选职位状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStatus {
    ToBeProcessed,
    Applied,
    Skipped,
    Failed,
}

/// 候选职位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCandidate {
    pub job_id: String,
    pub status: CandidateStatus,
}

/// 一页候选职位，保持页面上的出现顺序，按 job_id 去重
#[derive(Debug, Default)]
pub struct CandidateSet {
    items: Vec<JobCandidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入一个待处理的职位，已存在时返回 false
    pub fn insert(&mut self, job_id: impl Into<String>) -> bool {
        let job_id = job_id.into();
        if self.items.iter().any(|c| c.job_id == job_id) {
            return false;
        }
        self.items.push(JobCandidate {
            job_id,
            status: CandidateStatus::ToBeProcessed,
        });
        true
    }

    /// 待处理的 job_id 列表
    pub fn pending(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|c| c.status == CandidateStatus::ToBeProcessed)
            .map(|c| c.job_id.clone())
            .collect()
    }

    pub fn set_status(&mut self, job_id: &str, status: CandidateStatus) {
        if let Some(candidate) = self.items.iter_mut().find(|c| c.job_id == job_id) {
            candidate.status = status;
        }
    }

    pub fn count(&self, status: CandidateStatus) -> usize {
        self.items.iter().filter(|c| c.status == status).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobCandidate> {
        self.items.iter()
    }
}
