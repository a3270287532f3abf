//! 表单控件
//!
//! 每一步表单上的控件统一成 `FormControl`，探测阶段按优先级决定是哪一种，
//! 之后只需要调用 `apply`。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DriverError, DriverResult};
use crate::infrastructure::{ElementHandle, Locator, PageDriver};
use crate::site;

/// 上传文件类型（配置里 `uploads` 的键）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "Resume")]
    Resume,
    #[serde(rename = "Cover Letter")]
    CoverLetter,
}

impl DocumentKind {
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Resume => "Resume",
            DocumentKind::CoverLetter => "Cover Letter",
        }
    }
}

/// 推进表单的按钮
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Submit,
    Next,
    Review,
    FollowCompany,
}

impl StepAction {
    pub fn name(self) -> &'static str {
        match self {
            StepAction::Submit => "提交",
            StepAction::Next => "下一步",
            StepAction::Review => "检查申请",
            StepAction::FollowCompany => "关注公司",
        }
    }
}

/// 表单控件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormControl {
    /// 单选组，持有所在的问题分组元素
    RadioGroup { field: ElementHandle },
    /// 多值输入（带联想的输入框）
    MultiEntryList { input: ElementHandle },
    /// 普通文本框
    FreeText { input: ElementHandle },
    /// 文件上传
    Upload { kind: DocumentKind, input: ElementHandle },
    /// 推进按钮
    ActionButton { action: StepAction, button: ElementHandle },
}

impl FormControl {
    /// 探测一个问题分组里的作答控件
    ///
    /// 优先级: 单选 → 多值输入 → 文本框
    pub async fn detect_answer_control(driver: &dyn PageDriver, field: &ElementHandle) -> Option<Self> {
        if has_child(driver, field, &site::RADIO_INPUT).await {
            return Some(FormControl::RadioGroup { field: *field });
        }
        if let Some(input) = first_child(driver, field, &site::MULTI_ENTRY_INPUT).await {
            return Some(FormControl::MultiEntryList { input });
        }
        if let Some(input) = first_child(driver, field, &site::TEXT_INPUT).await {
            return Some(FormControl::FreeText { input });
        }
        None
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FormControl::RadioGroup { .. } => "单选",
            FormControl::MultiEntryList { .. } => "多值输入",
            FormControl::FreeText { .. } => "文本",
            FormControl::Upload { .. } => "上传",
            FormControl::ActionButton { .. } => "按钮",
        }
    }

    /// 把值应用到控件上
    ///
    /// - 单选: 点击 value 与 `value` 相同的选项
    /// - 输入框: 清空后输入 `value`
    /// - 上传: `value` 为文件路径
    /// - 按钮: 忽略 `value`，等待可点击后点击
    pub async fn apply(&self, driver: &dyn PageDriver, value: &str, timeout: Duration) -> DriverResult<()> {
        match self {
            FormControl::RadioGroup { field } => {
                let option_locator = site::radio_option(value);
                let option = driver
                    .find_within(field, &option_locator)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| DriverError::ElementNotFound {
                        selector: option_locator.to_string(),
                    })?;
                driver.click(&option).await
            }
            FormControl::MultiEntryList { input } | FormControl::FreeText { input } => {
                driver.clear(input).await?;
                driver.type_text(input, value).await
            }
            FormControl::Upload { input, .. } => driver.upload_file(input, Path::new(value)).await,
            FormControl::ActionButton { action, button } => {
                if !driver.wait_until_clickable(button, timeout).await? {
                    return Err(DriverError::Timeout {
                        what: format!("{}按钮", action.name()),
                        timeout_secs: timeout.as_secs_f64(),
                    });
                }
                driver.click(button).await
            }
        }
    }
}

async fn first_child(
    driver: &dyn PageDriver,
    parent: &ElementHandle,
    locator: &Locator,
) -> Option<ElementHandle> {
    driver
        .find_within(parent, locator)
        .await
        .ok()
        .and_then(|found| found.into_iter().next())
}

async fn has_child(driver: &dyn PageDriver, parent: &ElementHandle, locator: &Locator) -> bool {
    first_child(driver, parent, locator).await.is_some()
}
