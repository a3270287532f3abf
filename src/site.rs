//! LinkedIn 页面地址与元素选择器
//!
//! 站点标记经常变动，所有选择器集中放在这里。

use std::borrow::Cow;

use reqwest::Url;

use crate::infrastructure::Locator;
use crate::models::{ExperienceLevel, SearchCombination};

pub const LOGIN_URL: &str = "https://www.linkedin.com/login?trk=guest_homepage-basic_nav-header-signin";
pub const JOB_VIEW_URL: &str = "https://www.linkedin.com/jobs/view/";
pub const JOB_SEARCH_URL: &str = "https://www.linkedin.com/jobs/search/";

/// 页面源码中出现即表示此前已投递
pub const ALREADY_APPLIED_MARKER: &str = "You applied on";
/// 页面源码中出现即表示申请已发出
pub const SUBMITTED_MARKER: &str = "application was sent";
/// Easy Apply 按钮上的文字
pub const EASY_APPLY_TEXT: &str = "Easy Apply";
/// 搜索结果条目上的"已投递"标记
pub const APPLIED_BADGE: &str = "Applied";
/// 基础字段: 手机号的标签文字
pub const PHONE_FIELD_LABEL: &str = "Mobile phone number";

// ========== 登录 ==========

pub const USERNAME_INPUT: Locator = Locator::css("#username");
pub const PASSWORD_INPUT: Locator = Locator::css("#password");
pub const LOGIN_BUTTON: Locator = Locator::xpath(r#"//*[@id="organic-div"]/form/div[3]/button"#);
pub const TWO_FACTOR_ONE_CLICK: Locator = Locator::css("#reset-password-submit-button");

// ========== 搜索结果 ==========

pub const SEARCH_RESULTS: Locator = Locator::css(".jobs-search-results-list");
pub const JOB_LINKS: Locator = Locator::css("div[data-job-id]");
pub const JOB_ID_ATTRIBUTE: &str = "data-job-id";

// ========== 职位页 / 表单 ==========

pub const EASY_APPLY_BUTTON: Locator = Locator::css("button.jobs-apply-button");
pub const NEXT_BUTTON: Locator = Locator::css("button[aria-label='Continue to next step']");
pub const REVIEW_BUTTON: Locator = Locator::css("button[aria-label='Review your application']");
pub const SUBMIT_BUTTON: Locator = Locator::css("button[aria-label='Submit application']");
pub const FOLLOW_COMPANY: Locator = Locator::css("label[for='follow-company-checkbox']");
pub const VALIDATION_ERROR: Locator = Locator::css(".artdeco-inline-feedback__message");

pub const UPLOAD_RESUME_MARKER: Locator = Locator::xpath(r#"//span[text()="Upload resume"]"#);
pub const UPLOAD_COVER_LETTER_MARKER: Locator = Locator::xpath(r#"//span[text()="Upload cover letter"]"#);
pub const RESUME_INPUT: Locator = Locator::css("[id*='jobs-document-upload-file-input-upload-resume']");
pub const COVER_LETTER_INPUT: Locator = Locator::css("[id*='jobs-document-upload-file-input-upload-cover-letter']");

pub const FORM_FIELDS: Locator = Locator::css(".jobs-easy-apply-form-section__grouping");
pub const FIELD_INPUT: Locator = Locator::css("input");
pub const RADIO_INPUT: Locator = Locator::css("input[type='radio']");
pub const MULTI_ENTRY_INPUT: Locator = Locator::css("[id*='text-entity-list-form-component']");
pub const TEXT_INPUT: Locator = Locator::css(".artdeco-text-input--input");

/// 值为 `value` 的单选项
pub fn radio_option(value: &str) -> Locator {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    Locator::Css(Cow::Owned(format!(r#"input[type='radio'][value="{}"]"#, escaped)))
}

/// 职位详情页地址
pub fn job_url(job_id: &str) -> String {
    format!("{}{}", JOB_VIEW_URL, job_id)
}

/// 搜索结果页地址
///
/// `f_LF=f_AL` 只看支持 Easy Apply 的职位，`start` 为翻页偏移。
pub fn search_url(combo: &SearchCombination, offset: usize, levels: &[ExperienceLevel]) -> String {
    let mut params: Vec<(&str, String)> = vec![
        ("f_LF", "f_AL".to_string()),
        ("keywords", combo.position.clone()),
        ("location", combo.location.clone()),
        ("start", offset.to_string()),
    ];
    if !levels.is_empty() {
        let codes: Vec<String> = levels.iter().map(|l| l.code().to_string()).collect();
        params.push(("f_E", codes.join(",")));
    }

    match Url::parse_with_params(JOB_SEARCH_URL, &params) {
        Ok(url) => url.to_string(),
        // 基础地址是常量，解析不会失败
        Err(_) => JOB_SEARCH_URL.to_string(),
    }
}
