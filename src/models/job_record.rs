//! 投递记录（ledger 的一行）

use chrono::NaiveDateTime;
use regex::Regex;

/// 记录时间戳格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 投递记录
///
/// 列顺序: `timestamp, job_id, job_title, company, attempted, result`。
/// 不变式: `attempted == false` 时 `result` 必为 `false`，由构造函数保证。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub timestamp: NaiveDateTime,
    pub job_id: String,
    pub job_title: String,
    pub company: String,
    attempted: bool,
    result: bool,
}

impl JobRecord {
    /// 创建投递记录
    ///
    /// # 参数
    /// - `page_title`: 浏览器标题，形如 `"(3) Rust Engineer | Acme | LinkedIn"`
    /// - `attempted`: 是否拿到了 Easy Apply 按钮
    /// - `result`: 是否提交成功
    pub fn new(
        timestamp: NaiveDateTime,
        job_id: impl Into<String>,
        page_title: &str,
        attempted: bool,
        result: bool,
    ) -> Self {
        let (job_title, company) = split_page_title(page_title);
        Self {
            timestamp,
            job_id: job_id.into(),
            job_title,
            company,
            attempted,
            result: attempted && result,
        }
    }

    pub fn attempted(&self) -> bool {
        self.attempted
    }

    pub fn result(&self) -> bool {
        self.result
    }

    /// 转为 CSV 行
    pub fn to_row(&self) -> [String; 6] {
        [
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.job_id.clone(),
            self.job_title.clone(),
            self.company.clone(),
            self.attempted.to_string(),
            self.result.to_string(),
        ]
    }
}

/// 从页面标题中拆出职位名与公司名
///
/// 标题的第一段是职位（可能带有 "(3) " 这样的通知计数前缀），第二段是公司。
pub fn split_page_title(title: &str) -> (String, String) {
    let mut parts = title.split(" | ");
    let job_part = parts.next().unwrap_or_default();
    let company_part = parts.next().unwrap_or_default();

    (
        capture_first(job_part, r"\(?\d*\)?\s*(\w.*)"),
        capture_first(company_part, r"(\w.*)"),
    )
}

fn capture_first(text: &str, pattern: &str) -> String {
    Regex::new(pattern)
        .ok()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
