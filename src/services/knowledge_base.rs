//! 问答知识库服务 - 业务能力层
//!
//! 负责"筛选问题 → 答案"的查询、推断与持久化

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::FileError;
use crate::services::pacing::Pacing;

/// 规则都没命中时记录的占位答案
pub const MANUAL_PLACEHOLDER: &str = "user provided";

const DECLINE_ANSWER: &str = "Wish not to answer";
const GOVERNMENT_DECLINE_ANSWER: &str = "I do not wish to self-identify";

/// 问题归一化: 去掉首尾空白并转小写
pub fn normalize_question(question: &str) -> String {
    question.trim().to_lowercase()
}

/// 推断结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inference {
    /// 规则命中
    Rule(String),
    /// 没有规则可用，需要人工作答
    Manual,
}

#[derive(Debug, Clone, Copy)]
enum RuleAnswer {
    Fixed(&'static str),
    Salary,
    Gender,
    Demographic,
    Government,
}

/// 按顺序匹配，第一个命中的规则生效
const RULES: &[(&[&str], RuleAnswer)] = &[
    (&["how many"], RuleAnswer::Fixed("1")),
    (&["experience"], RuleAnswer::Fixed("1")),
    (&["sponsor"], RuleAnswer::Fixed("No")),
    (&["do you "], RuleAnswer::Fixed("Yes")),
    (&["have you "], RuleAnswer::Fixed("Yes")),
    (&["us citizen"], RuleAnswer::Fixed("Yes")),
    (&["are you "], RuleAnswer::Fixed("Yes")),
    (&["salary"], RuleAnswer::Salary),
    (&["can you"], RuleAnswer::Fixed("Yes")),
    (&["gender"], RuleAnswer::Gender),
    (&["race", "lgbtq", "ethnicity"], RuleAnswer::Demographic),
    (&["nationality"], RuleAnswer::Demographic),
    (&["government"], RuleAnswer::Government),
    // 被 "are you " 覆盖，保留以维持规则表完整
    (&["are you legally"], RuleAnswer::Fixed("Yes")),
];

/// 默认答案规则
#[derive(Debug, Clone)]
pub struct AnswerRules {
    salary: Option<String>,
    gender: String,
    decline_demographics: bool,
}

impl AnswerRules {
    pub fn new(salary: Option<String>, gender: impl Into<String>, decline_demographics: bool) -> Self {
        Self {
            salary,
            gender: gender.into(),
            decline_demographics,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.salary.clone(),
            config.answers.gender.clone(),
            config.answers.decline_demographics,
        )
    }

    /// 按规则表推断答案
    ///
    /// 子串匹配，规则与问题都按小写比较。
    pub fn infer(&self, question: &str) -> Inference {
        let question = normalize_question(question);
        let matched = RULES
            .iter()
            .find(|(patterns, _)| patterns.iter().any(|p| question.contains(p)));

        let Some((_, rule)) = matched else {
            return Inference::Manual;
        };

        match rule {
            RuleAnswer::Fixed(answer) => Inference::Rule(answer.to_string()),
            RuleAnswer::Salary => match &self.salary {
                Some(salary) => Inference::Rule(salary.clone()),
                None => Inference::Manual,
            },
            RuleAnswer::Gender | RuleAnswer::Government if self.decline_demographics => {
                Inference::Rule(DECLINE_ANSWER.to_string())
            }
            RuleAnswer::Gender => Inference::Rule(self.gender.clone()),
            RuleAnswer::Demographic => Inference::Rule(DECLINE_ANSWER.to_string()),
            RuleAnswer::Government => Inference::Rule(GOVERNMENT_DECLINE_ANSWER.to_string()),
        }
    }
}

impl Default for AnswerRules {
    fn default() -> Self {
        Self::new(None, "Male", false)
    }
}

#[derive(Debug, Deserialize)]
struct QaRow {
    #[serde(rename = "Question")]
    question: String,
    #[serde(rename = "Answer")]
    answer: String,
}

/// 问答知识库
///
/// 职责：
/// - 启动时把 CSV 全量读入内存
/// - 新问题第一次出现时写入，之后不覆盖（先写入者为准）
/// - 读写失败都不会中断运行
pub struct KnowledgeBase {
    path: PathBuf,
    answers: HashMap<String, String>,
    rules: AnswerRules,
}

impl KnowledgeBase {
    /// 打开知识库文件，不存在时创建只有表头的新文件
    pub fn open(path: impl Into<PathBuf>, rules: AnswerRules) -> Self {
        let path = path.into();
        let answers = if path.is_file() {
            match Self::read_entries(&path) {
                Ok(answers) => {
                    info!("✓ 问答知识库已加载 {} 条", answers.len());
                    answers
                }
                Err(e) => {
                    warn!("⚠️ 问答知识库读取失败，使用空知识库: {}", e);
                    HashMap::new()
                }
            }
        } else {
            if let Err(e) = Self::create_with_header(&path) {
                warn!("⚠️ 无法创建问答知识库文件: {}", e);
            }
            HashMap::new()
        };

        Self { path, answers, rules }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// 精确查询（归一化后比较）
    pub fn lookup(&self, question: &str) -> Option<&str> {
        self.answers.get(&normalize_question(question)).map(String::as_str)
    }

    /// 按规则推断
    pub fn infer(&self, question: &str) -> Inference {
        self.rules.infer(question)
    }

    /// 记录新问题
    ///
    /// 问题已存在时不做任何事并返回 `Ok(false)`。写文件失败时内存中仍保留该条，
    /// 本次运行不会重复询问。
    pub fn record(&mut self, question: &str, answer: &str) -> Result<bool, FileError> {
        let key = normalize_question(question);
        if self.answers.contains_key(&key) {
            return Ok(false);
        }
        self.answers.insert(key.clone(), answer.to_string());
        self.append_entry(&key, answer)?;
        info!("已将问题 '{}' 的答案 '{}' 写入知识库", key, answer);
        Ok(true)
    }

    /// 给出问题的答案: 先查知识库，没有再推断并记录
    ///
    /// 规则都没命中时先暂停一段时间，留给人工在页面上作答，然后记录占位答案。
    pub async fn answer(&mut self, question: &str, pacing: &Pacing) -> String {
        if let Some(known) = self.lookup(question) {
            debug!("知识库命中: '{}' → '{}'", normalize_question(question), known);
            return known.to_string();
        }

        let answer = match self.infer(question) {
            Inference::Rule(answer) => answer,
            Inference::Manual => {
                info!("❓ 未知问题，请手动作答: {}", normalize_question(question));
                pacing.operator_pause().await;
                MANUAL_PLACEHOLDER.to_string()
            }
        };

        if let Err(e) = self.record(question, &answer) {
            warn!("⚠️ 知识库写入失败: {}", e);
        }
        info!("回答问题 '{}': '{}'", normalize_question(question), answer);
        answer
    }

    fn read_entries(path: &Path) -> Result<HashMap<String, String>, FileError> {
        let display = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| FileError::read_failed(&display, e))?;

        let mut answers = HashMap::new();
        for row in reader.deserialize::<QaRow>() {
            let row = row.map_err(|e| FileError::read_failed(&display, e))?;
            answers
                .entry(normalize_question(&row.question))
                .or_insert(row.answer);
        }
        Ok(answers)
    }

    fn create_with_header(path: &Path) -> Result<(), FileError> {
        let display = path.display().to_string();
        let mut writer = csv::Writer::from_path(path).map_err(|e| FileError::write_failed(&display, e))?;
        writer
            .write_record(["Question", "Answer"])
            .map_err(|e| FileError::write_failed(&display, e))?;
        writer.flush().map_err(|e| FileError::write_failed(&display, e))?;
        Ok(())
    }

    fn append_entry(&self, question: &str, answer: &str) -> Result<(), FileError> {
        let display = self.path.display().to_string();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| FileError::write_failed(&display, e))?;

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record([question, answer])
            .map_err(|e| FileError::write_failed(&display, e))?;
        let mut file = writer
            .into_inner()
            .map_err(|e| FileError::write_failed(&display, e.into_error()))?;
        file.flush().map_err(|e| FileError::write_failed(&display, e))?;
        file.sync_data().map_err(|e| FileError::write_failed(&display, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn rules() -> AnswerRules {
        AnswerRules::new(Some("95000".to_string()), "Male", false)
    }

    #[test]
    fn test_rule_precedence_experience_before_sponsor() {
        assert_eq!(
            rules().infer("Please describe your sponsor-related experience"),
            Inference::Rule("1".to_string())
        );
    }

    #[test]
    fn test_rule_table() {
        let rules = rules();
        let cases = [
            ("How many years of Rust?", "1"),
            ("Will you require visa sponsorship?", "No"),
            ("Do you have a driver's license?", "Yes"),
            ("Have you worked remotely before?", "Yes"),
            ("Is US citizenship required?", "Yes"),
            ("Are you willing to relocate internationally?", "Yes"),
            ("Desired salary", "95000"),
            ("Can you start immediately?", "Yes"),
            ("Gender", "Male"),
            ("Race", "Wish not to answer"),
            ("Do you identify as LGBTQ+", "Yes"),
            ("Ethnicity", "Wish not to answer"),
            ("Nationality", "Wish not to answer"),
            ("Government official status", "I do not wish to self-identify"),
        ];
        for (question, expected) in cases {
            assert_eq!(
                rules.infer(question),
                Inference::Rule(expected.to_string()),
                "问题: {}",
                question
            );
        }
    }

    #[test]
    fn test_unknown_question_needs_manual_answer() {
        assert_eq!(rules().infer("Willing to relocate internationally?"), Inference::Manual);
    }

    #[test]
    fn test_salary_without_config_needs_manual_answer() {
        assert_eq!(AnswerRules::default().infer("Expected salary?"), Inference::Manual);
    }

    #[test]
    fn test_decline_demographics_opt_out() {
        let rules = AnswerRules::new(None, "Male", true);
        assert_eq!(rules.infer("Gender"), Inference::Rule("Wish not to answer".to_string()));
        assert_eq!(
            rules.infer("Government official status"),
            Inference::Rule("Wish not to answer".to_string())
        );
    }

    #[test]
    fn test_record_is_first_write_wins() {
        let dir = tempdir().unwrap();
        let mut kb = KnowledgeBase::open(dir.path().join("qa.csv"), rules());

        assert!(kb.record("Favourite Editor?", "Helix").unwrap());
        assert!(!kb.record("favourite editor?", "Vim").unwrap());

        assert_eq!(kb.lookup("FAVOURITE EDITOR?"), Some("Helix"));
    }

    #[test]
    fn test_write_failure_keeps_answer_in_memory() {
        let dir = tempdir().unwrap();
        // 目录既读不出条目也写不进去
        let mut kb = KnowledgeBase::open(dir.path(), rules());
        assert!(kb.is_empty());

        assert!(kb.record("Notice period?", "Two weeks").is_err());
        assert_eq!(kb.lookup("notice period?"), Some("Two weeks"));
        assert!(!kb.record("Notice period?", "One month").unwrap());
        assert_eq!(kb.lookup("notice period?"), Some("Two weeks"));
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qa.csv");

        {
            let mut kb = KnowledgeBase::open(&path, rules());
            kb.record("Preferred pronouns, if any?", "they/them").unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Question,Answer\n"));

        let kb = KnowledgeBase::open(&path, rules());
        assert_eq!(kb.lookup("preferred pronouns, if any?"), Some("they/them"));
        assert_eq!(kb.len(), 1);
    }

    #[test]
    fn test_unreadable_file_falls_back_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qa.csv");
        std::fs::write(&path, "Question,Answer\n\"unterminated,quote\n").unwrap();

        let kb = KnowledgeBase::open(&path, rules());
        assert!(kb.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_question_pauses_then_records_placeholder_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qa.csv");
        let mut kb = KnowledgeBase::open(&path, rules());
        let pacing = Pacing::default();

        let start = tokio::time::Instant::now();
        let answer = kb.answer("Willing to relocate internationally?", &pacing).await;
        assert_eq!(answer, MANUAL_PLACEHOLDER);
        assert!(start.elapsed() >= Duration::from_secs(15));

        // 第二次直接命中知识库，不再暂停
        let again = tokio::time::Instant::now();
        kb.answer("Willing to relocate internationally?", &pacing).await;
        assert_eq!(again.elapsed(), Duration::ZERO);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("user provided").count(), 1);
    }
}
