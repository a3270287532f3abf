//! 投递记录服务 - 业务能力层
//!
//! 只负责"读写投递记录文件"能力，不关心流程

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::error::FileError;
use crate::models::{JobRecord, TIMESTAMP_FORMAT};

/// 投递记录（append-only CSV，无表头）
///
/// 职责：
/// - 每次投递尝试追加一行，立即落盘
/// - 读出最近一段时间内处理过的 job_id，用于短期去重
/// - 读写失败都不会中断运行
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 最近 `max_age` 内出现过的 job_id
    ///
    /// 文件不存在、格式错误、时间戳无法解析时返回空集合。
    pub fn load_recent(&self, max_age: chrono::Duration) -> HashSet<String> {
        self.load_recent_at(Local::now().naive_local(), max_age)
    }

    /// 以 `now` 为当前时间计算去重窗口
    pub fn load_recent_at(&self, now: NaiveDateTime, max_age: chrono::Duration) -> HashSet<String> {
        match self.read_rows() {
            Ok(rows) => {
                // 窗口超出可表示的时间范围时，所有记录都算近期
                let cutoff = now.checked_sub_signed(max_age);
                let ids: HashSet<String> = rows
                    .into_iter()
                    .filter(|(timestamp, _)| cutoff.map_or(true, |cutoff| *timestamp > cutoff))
                    .map(|(_, job_id)| job_id)
                    .collect();
                info!("✓ 从投递记录中加载了 {} 个近期 job_id", ids.len());
                ids
            }
            Err(e) => {
                info!("未能加载投递记录 {}: {}", self.path.display(), e);
                HashSet::new()
            }
        }
    }

    /// 追加一条记录
    ///
    /// 每条记录单独打开、写入、刷新，崩溃时最多丢失正在写的这一条。
    pub fn append(&self, record: &JobRecord) -> Result<(), FileError> {
        debug!(
            "写入投递记录: {} | attempted={} | result={}",
            record.job_id,
            record.attempted(),
            record.result()
        );

        let path = self.path.display().to_string();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| FileError::write_failed(&path, e))?;

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record(record.to_row())
            .map_err(|e| FileError::write_failed(&path, e))?;
        let mut file = writer
            .into_inner()
            .map_err(|e| FileError::write_failed(&path, e.into_error()))?;
        file.flush().map_err(|e| FileError::write_failed(&path, e))?;
        file.sync_data().map_err(|e| FileError::write_failed(&path, e))?;

        Ok(())
    }

    /// 追加一条记录，失败只记日志
    pub fn append_or_warn(&self, record: &JobRecord) {
        if let Err(e) = self.append(record) {
            warn!("⚠️ 投递记录写入失败，本次结果未记录: {}", e);
        }
    }

    /// 读出所有 (时间戳, job_id)，任意一行无法解析即视为整个文件损坏
    fn read_rows(&self) -> Result<Vec<(NaiveDateTime, String)>, FileError> {
        let path = self.path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| FileError::read_failed(&path, e))?;

        let mut rows = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result.map_err(|e| FileError::read_failed(&path, e))?;
            if record.len() < 6 {
                return Err(FileError::read_failed(
                    &path,
                    MalformedRow::new(line + 1, format!("只有 {} 列", record.len())),
                ));
            }

            let timestamp = NaiveDateTime::parse_from_str(record[0].trim(), TIMESTAMP_FORMAT)
                .map_err(|e| FileError::read_failed(&path, MalformedRow::new(line + 1, e.to_string())))?;
            let job_id = record[1].trim().to_string();
            if job_id.is_empty() {
                return Err(FileError::read_failed(&path, MalformedRow::new(line + 1, "job_id 为空")));
            }
            if parse_flag(&record[4]).is_none() || parse_flag(&record[5]).is_none() {
                return Err(FileError::read_failed(
                    &path,
                    MalformedRow::new(line + 1, "attempted/result 不是布尔值"),
                ));
            }

            rows.push((timestamp, job_id));
        }

        Ok(rows)
    }
}

/// 兼容 `true` / `True` / `1` 等写法
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
#[error("第 {line} 行格式错误: {reason}")]
struct MalformedRow {
    line: usize,
    reason: String,
}

impl MalformedRow {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_load_recent_filters_by_window() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("output.csv"));

        ledger.append(&JobRecord::new(at(15, 9), "old", "Old | Co", true, true)).unwrap();
        ledger.append(&JobRecord::new(at(17, 9), "fresh", "Fresh | Co", true, false)).unwrap();
        ledger.append(&JobRecord::new(at(18, 8), "newest", "New | Co", false, false)).unwrap();

        let recent = ledger.load_recent_at(at(18, 10), chrono::Duration::hours(48));

        assert_eq!(recent.len(), 2);
        assert!(recent.contains("fresh"));
        assert!(recent.contains("newest"));
        assert!(!recent.contains("old"));
    }

    #[test]
    fn test_window_beyond_calendar_range_keeps_everything() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("output.csv"));
        ledger.append(&JobRecord::new(at(1, 9), "ancient", "Old | Co", true, true)).unwrap();

        let recent = ledger.load_recent_at(at(18, 10), chrono::Duration::hours(10_000_000_000));

        assert!(recent.contains("ancient"));
    }

    #[test]
    fn test_failed_append_only_warns() {
        let dir = tempdir().unwrap();
        // 目录无法作为文件追加
        let ledger = Ledger::new(dir.path());

        assert!(ledger.append(&JobRecord::new(at(18, 9), "9", "Job | Co", true, true)).is_err());
        ledger.append_or_warn(&JobRecord::new(at(18, 9), "9", "Job | Co", true, true));
        assert!(ledger.load_recent_at(at(18, 10), chrono::Duration::hours(48)).is_empty());
    }

    #[test]
    fn test_missing_file_yields_empty_set() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("absent.csv"));

        assert!(ledger.load_recent(chrono::Duration::hours(48)).is_empty());
    }

    #[test]
    fn test_malformed_file_yields_empty_set() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output.csv");
        std::fs::write(
            &path,
            "2026-10-18 09:00:00,1,Job,Co,true,true\nnot a timestamp,2,Job,Co,true,false\n",
        )
        .unwrap();

        let ledger = Ledger::new(&path);
        assert!(ledger.load_recent_at(at(18, 10), chrono::Duration::hours(48)).is_empty());
    }

    #[test]
    fn test_reads_rows_written_with_python_booleans() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output.csv");
        std::fs::write(&path, "2026-10-18 09:00:00,77,Job,\"Acme, Inc\",True,False\n").unwrap();

        let ledger = Ledger::new(&path);
        let recent = ledger.load_recent_at(at(18, 10), chrono::Duration::hours(48));
        assert!(recent.contains("77"));
    }

    #[test]
    fn test_append_quotes_commas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output.csv");
        let ledger = Ledger::new(&path);

        ledger
            .append(&JobRecord::new(at(18, 9), "5", "Engineer, Platform | Acme, Inc", true, true))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "2026-10-18 09:00:00,5,\"Engineer, Platform\",\"Acme, Inc\",true,true\n"
        );
    }
}
