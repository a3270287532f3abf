//! 职位处理上下文
//!
//! 封装"我正在处理哪个搜索组合下的哪个职位"这一信息

use std::fmt::Display;

/// 职位处理上下文
#[derive(Debug, Clone)]
pub struct JobCtx {
    /// 职位ID
    pub job_id: String,

    /// 所属搜索组合（仅用于日志显示）
    pub search: String,

    /// 在本页候选中的序号（从1开始）
    pub index: usize,
}

impl JobCtx {
    pub fn new(job_id: impl Into<String>, search: impl Into<String>, index: usize) -> Self {
        Self {
            job_id: job_id.into(),
            search: search.into(),
            index,
        }
    }
}

impl Display for JobCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[职位 #{}]", self.job_id)
    }
}
