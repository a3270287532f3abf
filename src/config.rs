use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::models::{DocumentKind, ExperienceLevel};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 单个节奏参数的上限（秒）
pub const MAX_PACING_SECS: f64 = 86_400.0;

/// 去重窗口上限（小时）
pub const MAX_RECENT_WINDOW_HOURS: i64 = 24 * 365;

/// 程序配置文件
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// 搜索的职位关键词
    #[serde(default)]
    pub positions: Vec<String>,
    /// 搜索的地点
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// 表单中"Mobile phone number"字段填写的号码
    #[serde(default)]
    pub phone_number: String,
    /// 薪资类问题的回答
    #[serde(default, deserialize_with = "string_or_number")]
    pub salary: Option<String>,
    /// 时薪
    #[serde(default, deserialize_with = "string_or_number")]
    pub rate: Option<String>,
    /// Chrome 用户数据目录
    #[serde(default)]
    pub profile_path: Option<PathBuf>,
    /// 投递记录文件（CSV，无表头）
    #[serde(default = "default_output_filename")]
    pub output_filename: PathBuf,
    /// 问答知识库文件（CSV，表头 Question,Answer）
    #[serde(default = "default_qa_filename")]
    pub qa_filename: PathBuf,
    /// 搜索结果中需要排除的文本片段（公司名、职位名等）
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// 职位页标题中出现即跳过的短语
    #[serde(default, rename = "blackListTitles")]
    pub blacklist_titles: Vec<String>,
    /// 上传文件: "Resume" / "Cover Letter" → 路径
    #[serde(default)]
    pub uploads: HashMap<DocumentKind, PathBuf>,
    /// 经验等级代码 (1-6)
    #[serde(default)]
    pub experience_level: Vec<u8>,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub pacing: PacingSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub answers: AnswerSettings,
}

/// 运行预算与循环上限
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// 单个 (职位, 地点) 组合的搜索时长（分钟）
    pub max_search_minutes: u64,
    /// 整个运行的时长（分钟）
    pub max_campaign_minutes: u64,
    /// 组合数量硬上限
    pub max_combinations: usize,
    /// 单次投递最多推进的表单步数
    pub max_form_steps: usize,
    /// 连续多少步找不到可识别控件就放弃
    pub max_idle_passes: usize,
    /// 筛选问题的最多回答轮数
    pub max_question_rounds: usize,
    /// 去重窗口（小时）
    pub recent_window_hours: i64,
    /// 每页结果数（翻页偏移步长）
    pub page_size: usize,
    /// 连续空页数达到该值即结束当前组合
    pub max_empty_pages: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_search_minutes: 60,
            max_campaign_minutes: 600,
            max_combinations: 500,
            max_form_steps: 10,
            max_idle_passes: 2,
            max_question_rounds: 4,
            recent_window_hours: 48,
            page_size: 25,
            max_empty_pages: 3,
        }
    }
}

impl Limits {
    pub fn search_budget(&self) -> Duration {
        Duration::from_secs(self.max_search_minutes.saturating_mul(60))
    }

    pub fn campaign_budget(&self) -> Duration {
        Duration::from_secs(self.max_campaign_minutes.saturating_mul(60))
    }

    pub fn recent_window(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.recent_window_hours).unwrap_or(chrono::Duration::MAX)
    }
}

/// 节奏控制（秒）
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    pub action_delay_min_secs: f64,
    pub action_delay_max_secs: f64,
    pub settle_secs: f64,
    pub scroll_settle_secs: f64,
    pub question_backoff_secs: f64,
    pub question_backoff_max_secs: f64,
    /// 遇到未知问题时留给人工介入的时间
    pub operator_pause_secs: f64,
    pub login_wait_secs: f64,
    pub two_factor_wait_secs: f64,
    /// 等待元素可点击的超时
    pub element_timeout_secs: f64,
}

impl PacingSettings {
    /// (字段名, 秒数)，用于统一校验
    fn entries(&self) -> [(&'static str, f64); 10] {
        [
            ("action_delay_min_secs", self.action_delay_min_secs),
            ("action_delay_max_secs", self.action_delay_max_secs),
            ("settle_secs", self.settle_secs),
            ("scroll_settle_secs", self.scroll_settle_secs),
            ("question_backoff_secs", self.question_backoff_secs),
            ("question_backoff_max_secs", self.question_backoff_max_secs),
            ("operator_pause_secs", self.operator_pause_secs),
            ("login_wait_secs", self.login_wait_secs),
            ("two_factor_wait_secs", self.two_factor_wait_secs),
            ("element_timeout_secs", self.element_timeout_secs),
        ]
    }
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            action_delay_min_secs: 1.5,
            action_delay_max_secs: 2.9,
            settle_secs: 1.0,
            scroll_settle_secs: 0.5,
            question_backoff_secs: 5.0,
            question_backoff_max_secs: 30.0,
            operator_pause_secs: 15.0,
            login_wait_secs: 15.0,
            two_factor_wait_secs: 15.0,
            element_timeout_secs: 30.0,
        }
    }
}

/// 浏览器设置
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// 无头模式
    pub headless: bool,
    /// 设置后连接到已开启远程调试的浏览器，而不是新启动一个
    pub debug_port: Option<u16>,
    /// 自定义浏览器可执行文件
    pub chrome_executable: Option<PathBuf>,
}

/// 问题默认回答的可调部分
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerSettings {
    pub gender: String,
    /// 为 true 时所有人口统计类问题统一回答"不愿透露"
    pub decline_demographics: bool,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            gender: "Male".to_string(),
            decline_demographics: false,
        }
    }
}

fn default_output_filename() -> PathBuf {
    PathBuf::from("output.csv")
}

fn default_qa_filename() -> PathBuf {
    PathBuf::from("qa.csv")
}

/// salary 常写成数字，这里字符串和数字都接受
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    }))
}

impl Config {
    /// 从环境变量指定的路径加载配置
    ///
    /// - `EASY_APPLY_CONFIG`: 配置文件路径（默认 `config.toml`）
    /// - `LINKEDIN_USERNAME` / `LINKEDIN_PASSWORD`: 覆盖文件中的账号密码
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("EASY_APPLY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(Path::new(&path))?;

        if let Ok(username) = std::env::var("LINKEDIN_USERNAME") {
            config.username = username;
        }
        if let Ok(password) = std::env::var("LINKEDIN_PASSWORD") {
            config.password = password;
        }

        config.validate()?;
        Ok(config)
    }

    /// 读取并解析 TOML 配置文件（不做校验）
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content).map_err(|source| ConfigError::ParseFailed {
            path: origin.to_string(),
            source,
        })?;

        // 去掉空白条目
        config.positions.retain(|p| !p.trim().is_empty());
        config.locations.retain(|l| !l.trim().is_empty());
        config.blacklist.retain(|b| !b.trim().is_empty());
        config.blacklist_titles.retain(|b| !b.trim().is_empty());

        Ok(config)
    }

    /// 校验必填字段与取值范围，在启动浏览器之前调用
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.positions.is_empty() {
            return Err(ConfigError::missing("positions"));
        }
        if self.locations.is_empty() {
            return Err(ConfigError::missing("locations"));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::missing("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::missing("password"));
        }
        if self.phone_number.trim().is_empty() {
            return Err(ConfigError::missing("phone_number"));
        }

        for (kind, path) in &self.uploads {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid(
                    format!("uploads.{}", kind.label()),
                    "路径为空",
                ));
            }
        }

        for code in &self.experience_level {
            if ExperienceLevel::from_code(*code).is_none() {
                return Err(ConfigError::invalid(
                    "experience_level",
                    format!("未知的经验等级代码 {}，应为 1-6", code),
                ));
            }
        }

        let pacing = &self.pacing;
        for (field, value) in pacing.entries() {
            if !value.is_finite() || !(0.0..=MAX_PACING_SECS).contains(&value) {
                return Err(ConfigError::invalid(
                    format!("pacing.{}", field),
                    format!("必须是 0 到 {} 之间的有限秒数，实际为 {}", MAX_PACING_SECS, value),
                ));
            }
        }
        if pacing.action_delay_min_secs < 0.0 || pacing.action_delay_min_secs > pacing.action_delay_max_secs {
            return Err(ConfigError::invalid(
                "pacing.action_delay_min_secs",
                "必须非负且不大于 action_delay_max_secs",
            ));
        }
        if pacing.question_backoff_secs > pacing.question_backoff_max_secs {
            return Err(ConfigError::invalid(
                "pacing.question_backoff_secs",
                "不能大于 question_backoff_max_secs",
            ));
        }

        let limits = &self.limits;
        if limits.max_form_steps == 0 || limits.max_idle_passes == 0 || limits.max_question_rounds == 0 {
            return Err(ConfigError::invalid("limits", "循环上限必须大于 0"));
        }
        if limits.page_size == 0 {
            return Err(ConfigError::invalid("limits.page_size", "必须大于 0"));
        }
        if !(1..=MAX_RECENT_WINDOW_HOURS).contains(&limits.recent_window_hours) {
            return Err(ConfigError::invalid(
                "limits.recent_window_hours",
                format!("必须在 1 到 {} 之间", MAX_RECENT_WINDOW_HOURS),
            ));
        }

        Ok(())
    }

    /// 解析后的经验等级
    pub fn experience_levels(&self) -> Vec<ExperienceLevel> {
        self.experience_level
            .iter()
            .filter_map(|code| ExperienceLevel::from_code(*code))
            .collect()
    }

    /// Chrome 用户数据目录，未配置时使用 `~/.config/chrome-profile`
    pub fn resolved_profile_path(&self) -> Option<PathBuf> {
        self.profile_path.clone().or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("chrome-profile"))
        })
    }

    /// 去掉账号密码后的配置快照，用于启动日志
    pub fn redacted_summary(&self) -> String {
        match serde_json::to_value(self) {
            Ok(mut value) => {
                if let Some(map) = value.as_object_mut() {
                    map.remove("username");
                    map.remove("password");
                }
                value.to_string()
            }
            Err(e) => format!("<无法序列化配置: {}>", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        positions = ["Rust Engineer", ""]
        locations = ["Remote"]
        username = "me@example.com"
        password = "hunter2"
        phone_number = "5550100"
        salary = 120000
        blackListTitles = ["Staffing Agency"]
        experience_level = [1, 2]

        [uploads]
        Resume = "/tmp/resume.pdf"
        "Cover Letter" = "/tmp/cover.pdf"

        [limits]
        max_search_minutes = 5
    "#;

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::from_toml_str(MINIMAL, "inline").unwrap();

        assert_eq!(config.positions, vec!["Rust Engineer".to_string()]);
        assert_eq!(config.salary.as_deref(), Some("120000"));
        assert_eq!(config.blacklist_titles, vec!["Staffing Agency".to_string()]);
        assert_eq!(
            config.uploads.get(&DocumentKind::CoverLetter),
            Some(&PathBuf::from("/tmp/cover.pdf"))
        );
        assert_eq!(config.limits.max_search_minutes, 5);
        // 未写的字段取默认值
        assert_eq!(config.limits.max_combinations, 500);
        assert_eq!(config.output_filename, PathBuf::from("output.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_required_field_fails_fast() {
        let content = MINIMAL.replace("phone_number = \"5550100\"", "");
        let config = Config::from_toml_str(&content, "inline").unwrap();

        match config.validate() {
            Err(ConfigError::MissingField { field }) => assert_eq!(field, "phone_number"),
            other => panic!("应该报缺少 phone_number, 实际: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_experience_level_rejected() {
        let content = MINIMAL.replace("[1, 2]", "[1, 9]");
        let config = Config::from_toml_str(&content, "inline").unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_non_finite_pacing_rejected() {
        let content = format!("{}\n[pacing]\nsettle_secs = inf\n", MINIMAL);
        let config = Config::from_toml_str(&content, "inline").unwrap();

        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "pacing.settle_secs"),
            other => panic!("应该拒绝 settle_secs = inf, 实际: {:?}", other),
        }
    }

    #[test]
    fn test_recent_window_must_be_bounded() {
        for hours in ["0", "-5", "10000000000"] {
            let content = MINIMAL.replace(
                "max_search_minutes = 5",
                &format!("max_search_minutes = 5\nrecent_window_hours = {}", hours),
            );
            let config = Config::from_toml_str(&content, "inline").unwrap();

            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidValue { .. })),
                "recent_window_hours = {} 应该被拒绝",
                hours
            );
        }
    }

    #[test]
    fn test_huge_limits_do_not_overflow() {
        let content = MINIMAL.replace(
            "max_search_minutes = 5",
            "max_search_minutes = 9223372036854775807\nmax_campaign_minutes = 9223372036854775807",
        );
        let config = Config::from_toml_str(&content, "inline").unwrap();

        assert_eq!(config.limits.search_budget(), Duration::from_secs(u64::MAX));
        assert_eq!(config.limits.campaign_budget(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_redacted_summary_hides_credentials() {
        let config = Config::from_toml_str(MINIMAL, "inline").unwrap();
        let summary = config.redacted_summary();

        assert!(!summary.contains("hunter2"));
        assert!(!summary.contains("me@example.com"));
        assert!(summary.contains("Rust Engineer"));
    }

    #[test]
    fn test_example_config_is_valid() {
        let config =
            Config::from_toml_str(include_str!("../config.example.toml"), "config.example.toml").unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.experience_levels().len(), 3);
        assert_eq!(config.rate.as_deref(), Some("60"));
    }
}
