//! 投递流程 - 流程层
//!
//! 核心职责：定义"一个职位"的完整投递流程
//!
//! 状态流转：
//! ```text
//! Start → ButtonCheck ─┬─ NotApplicable（已投递 / 没有 Easy Apply / 标题在黑名单）
//!                      └─ Clicked → FormLoop ─┬─ Submitted
//!                                             └─ Abandoned
//! ```
//!
//! 每个终止状态恰好写入一条投递记录。

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::DriverResult;
use crate::infrastructure::{ElementHandle, Locator, PageDriver};
use crate::models::{DocumentKind, FormControl, JobRecord, StepAction};
use crate::services::{navigation, KnowledgeBase, Ledger, Pacing};
use crate::site;
use crate::workflow::job_ctx::JobCtx;
use crate::workflow::questions::answer_questions;

/// 投递结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyVerdict {
    /// 之前已经投递过
    AlreadyApplied,
    /// 页面上没有 Easy Apply 按钮
    NoExpressApply,
    /// 标题命中黑名单，未点击
    BlacklistedTitle,
    /// 申请已提交
    Submitted,
    /// 表单无法完成，放弃
    Abandoned,
}

impl ApplyVerdict {
    /// 记录在日志里的说明
    pub fn note(self) -> &'static str {
        match self {
            ApplyVerdict::AlreadyApplied => "already applied",
            ApplyVerdict::NoExpressApply => "no express apply",
            ApplyVerdict::BlacklistedTitle => "blacklisted title",
            ApplyVerdict::Submitted => "submitted",
            ApplyVerdict::Abandoned => "abandoned",
        }
    }
}

/// 流程状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyState {
    Start,
    ButtonCheck,
    Clicked(ElementHandle),
    FormLoop,
    NotApplicable(ApplyVerdict),
    Submitted,
    Abandoned,
}

/// 一个职位的投递结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub job_id: String,
    pub page_title: String,
    /// 是否拿到了 Easy Apply 按钮
    pub attempted: bool,
    pub verdict: ApplyVerdict,
}

impl ApplyOutcome {
    pub fn submitted(&self) -> bool {
        self.verdict == ApplyVerdict::Submitted
    }

    pub fn note(&self) -> &'static str {
        self.verdict.note()
    }
}

/// 表单循环单步的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepOutcome {
    Submitted,
    Abandoned,
    Advanced,
    NoControl,
}

/// 投递流程需要的配置
#[derive(Debug, Clone)]
pub struct ApplySettings {
    pub phone_number: String,
    pub uploads: HashMap<DocumentKind, PathBuf>,
    pub blacklist_titles: Vec<String>,
    pub max_form_steps: usize,
    pub max_idle_passes: usize,
    pub max_question_rounds: usize,
}

impl ApplySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            phone_number: config.phone_number.clone(),
            uploads: config.uploads.clone(),
            blacklist_titles: config.blacklist_titles.clone(),
            max_form_steps: config.limits.max_form_steps,
            max_idle_passes: config.limits.max_idle_passes,
            max_question_rounds: config.limits.max_question_rounds,
        }
    }
}

/// 投递流程
///
/// - 编排单个职位的完整投递流程
/// - 持有投递记录和问答知识库（进程内唯一写入者）
/// - 不持有浏览器，页面能力由调用方传入
pub struct ApplyFlow {
    settings: ApplySettings,
    ledger: Ledger,
    knowledge_base: KnowledgeBase,
    pacing: Pacing,
}

impl ApplyFlow {
    pub fn new(settings: ApplySettings, ledger: Ledger, knowledge_base: KnowledgeBase, pacing: Pacing) -> Self {
        Self {
            settings,
            ledger,
            knowledge_base,
            pacing,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    /// 对一个职位执行完整投递流程
    ///
    /// 打开职位页之前或期间出错时返回错误，此时不写投递记录；
    /// 拿到结论后一定写入一条记录。
    pub async fn run(&mut self, driver: &dyn PageDriver, ctx: &JobCtx) -> Result<ApplyOutcome> {
        let mut state = ApplyState::Start;
        let mut button_obtained = false;
        let mut page_title = String::new();

        let verdict = loop {
            debug!("{} 状态: {:?}", ctx, state);
            state = match state {
                ApplyState::Start => {
                    navigation::open_and_load(driver, &site::job_url(&ctx.job_id), &self.pacing)
                        .await
                        .with_context(|| format!("{} 打开职位页失败", ctx))?;
                    self.pacing.settle().await;
                    page_title = match driver.title().await {
                        Ok(title) => title,
                        Err(e) => {
                            warn!("{} ⚠️ 读取页面标题失败: {}", ctx, e);
                            String::new()
                        }
                    };
                    ApplyState::ButtonCheck
                }
                ApplyState::ButtonCheck => match self.find_easy_apply_button(driver, ctx).await {
                    None => ApplyState::NotApplicable(self.classify_missing_button(driver, ctx).await),
                    Some(button) => {
                        button_obtained = true;
                        if self.is_blacklisted_title(&page_title) {
                            info!("{} 标题命中黑名单，跳过", ctx);
                            ApplyState::NotApplicable(ApplyVerdict::BlacklistedTitle)
                        } else {
                            ApplyState::Clicked(button)
                        }
                    }
                },
                ApplyState::Clicked(button) => {
                    info!("{} 🖱️ 点击 Easy Apply", ctx);
                    match driver.click(&button).await {
                        Ok(()) => {
                            self.pacing.settle().await;
                            self.fill_basic_fields(driver, ctx).await;
                            ApplyState::FormLoop
                        }
                        Err(e) => {
                            error!("{} ❌ 点击 Easy Apply 失败: {}", ctx, e);
                            ApplyState::Abandoned
                        }
                    }
                }
                ApplyState::FormLoop => match self.form_loop(driver, ctx).await {
                    StepOutcome::Submitted => ApplyState::Submitted,
                    _ => ApplyState::Abandoned,
                },
                ApplyState::NotApplicable(verdict) => break verdict,
                ApplyState::Submitted => break ApplyVerdict::Submitted,
                ApplyState::Abandoned => break ApplyVerdict::Abandoned,
            };
        };

        let outcome = ApplyOutcome {
            job_id: ctx.job_id.clone(),
            page_title,
            attempted: button_obtained,
            verdict,
        };
        self.record(&outcome);
        log_outcome(ctx, &outcome);
        Ok(outcome)
    }

    /// 查找可点击的 Easy Apply 按钮
    ///
    /// 按钮文字必须包含 "Easy Apply"，且在超时内变为可点击；否则视为不存在。
    async fn find_easy_apply_button(&self, driver: &dyn PageDriver, ctx: &JobCtx) -> Option<ElementHandle> {
        let buttons = match driver.find_all(&site::EASY_APPLY_BUTTON).await {
            Ok(buttons) => buttons,
            Err(e) => {
                debug!("{} 查找 Easy Apply 按钮出错: {}", ctx, e);
                return None;
            }
        };

        for button in buttons {
            let text = driver.element_text(&button).await.unwrap_or_default();
            if !text.contains(site::EASY_APPLY_TEXT) {
                debug!("{} 按钮文字不含 Easy Apply: {}", ctx, text.trim());
                continue;
            }
            match driver.wait_until_clickable(&button, self.pacing.element_timeout()).await {
                Ok(true) => return Some(button),
                Ok(false) => debug!("{} Easy Apply 按钮在超时内不可点击", ctx),
                Err(e) => debug!("{} 等待 Easy Apply 按钮出错: {}", ctx, e),
            }
        }
        None
    }

    async fn classify_missing_button(&self, driver: &dyn PageDriver, ctx: &JobCtx) -> ApplyVerdict {
        match driver.page_source().await {
            Ok(source) if source.contains(site::ALREADY_APPLIED_MARKER) => {
                info!("{} 之前已经投递过", ctx);
                ApplyVerdict::AlreadyApplied
            }
            Ok(_) => {
                info!("{} 没有 Easy Apply 按钮", ctx);
                ApplyVerdict::NoExpressApply
            }
            Err(e) => {
                warn!("{} ⚠️ 读取页面源码失败: {}", ctx, e);
                ApplyVerdict::NoExpressApply
            }
        }
    }

    fn is_blacklisted_title(&self, title: &str) -> bool {
        self.settings
            .blacklist_titles
            .iter()
            .any(|phrase| title.contains(phrase.as_str()))
    }

    /// 填写可直接定位的基础字段（手机号）
    async fn fill_basic_fields(&self, driver: &dyn PageDriver, ctx: &JobCtx) {
        let fields = match driver.find_all(&site::FORM_FIELDS).await {
            Ok(fields) => fields,
            Err(e) => {
                debug!("{} 读取基础字段失败: {}", ctx, e);
                return;
            }
        };

        for field in fields {
            let label = driver.element_text(&field).await.unwrap_or_default();
            if !label.contains(site::PHONE_FIELD_LABEL) {
                continue;
            }
            let input = match driver.find_within(&field, &site::FIELD_INPUT).await {
                Ok(inputs) => inputs.into_iter().next(),
                Err(e) => {
                    warn!("{} ⚠️ 找不到手机号输入框: {}", ctx, e);
                    None
                }
            };
            if let Some(input) = input {
                let control = FormControl::FreeText { input };
                match control
                    .apply(driver, &self.settings.phone_number, self.pacing.element_timeout())
                    .await
                {
                    Ok(()) => info!("{} ✓ 已填写手机号", ctx),
                    Err(e) => warn!("{} ⚠️ 填写手机号失败: {}", ctx, e),
                }
            }
        }
    }

    /// 表单循环
    ///
    /// 最多 `max_form_steps` 步；连续 `max_idle_passes` 步没有可识别的控件（或出错）就放弃。
    async fn form_loop(&mut self, driver: &dyn PageDriver, ctx: &JobCtx) -> StepOutcome {
        let mut idle_passes = 0;

        for step in 1..=self.settings.max_form_steps {
            self.pacing.settle().await;
            debug!("{} 表单第 {} 步", ctx, step);

            match self.form_step(driver, ctx).await {
                Ok(StepOutcome::Submitted) => return StepOutcome::Submitted,
                Ok(StepOutcome::Abandoned) => return StepOutcome::Abandoned,
                Ok(StepOutcome::Advanced) => idle_passes = 0,
                Ok(StepOutcome::NoControl) => {
                    debug!("{} 本步没有可识别的控件", ctx);
                    idle_passes += 1;
                }
                Err(e) => {
                    warn!("{} ⚠️ 表单第 {} 步操作失败: {}", ctx, step, e);
                    idle_passes += 1;
                }
            }

            if idle_passes >= self.settings.max_idle_passes {
                info!("{} 连续 {} 步无进展，放弃", ctx, idle_passes);
                return StepOutcome::Abandoned;
            }
        }

        info!("{} 超过表单步数上限 {}，放弃", ctx, self.settings.max_form_steps);
        StepOutcome::Abandoned
    }

    /// 处理表单的一步
    ///
    /// 先处理附件（简历 → 求职信，否则关注公司），再按 提交 → 校验错误 → 下一步 → 检查 的顺序
    /// 执行第一个存在的动作。
    async fn form_step(&mut self, driver: &dyn PageDriver, ctx: &JobCtx) -> DriverResult<StepOutcome> {
        if driver.is_present(&site::UPLOAD_RESUME_MARKER).await {
            self.upload(driver, ctx, DocumentKind::Resume, &site::RESUME_INPUT).await;
        }
        if driver.is_present(&site::UPLOAD_COVER_LETTER_MARKER).await {
            self.upload(driver, ctx, DocumentKind::CoverLetter, &site::COVER_LETTER_INPUT)
                .await;
        } else if let Some(follow) = driver.find_optional(&site::FOLLOW_COMPANY).await {
            match self.press(driver, StepAction::FollowCompany, follow).await {
                Ok(()) => info!("{} 已点击关注公司", ctx),
                Err(e) => warn!("{} ⚠️ 点击关注公司失败: {}", ctx, e),
            }
        }

        if let Some(submit) = driver.find_optional(&site::SUBMIT_BUTTON).await {
            self.press(driver, StepAction::Submit, submit).await?;
            info!("{} 📤 申请已提交", ctx);
            return Ok(StepOutcome::Submitted);
        }

        if driver.is_present(&site::VALIDATION_ERROR).await {
            return Ok(self.screening(driver, ctx).await);
        }

        if let Some(next) = driver.find_optional(&site::NEXT_BUTTON).await {
            self.press(driver, StepAction::Next, next).await?;
            info!("{} ➡️ 下一步", ctx);
            return Ok(StepOutcome::Advanced);
        }

        if let Some(review) = driver.find_optional(&site::REVIEW_BUTTON).await {
            self.press(driver, StepAction::Review, review).await?;
            info!("{} 🔎 检查申请", ctx);
            return Ok(StepOutcome::Advanced);
        }

        Ok(StepOutcome::NoControl)
    }

    /// 筛选问题步骤
    ///
    /// 每轮先按指数退避等待，再作答并尝试推进；页面确认提交则成功，
    /// Easy Apply 按钮重新出现则放弃，校验错误消失则回到表单循环。
    async fn screening(&mut self, driver: &dyn PageDriver, ctx: &JobCtx) -> StepOutcome {
        if self.submission_confirmed(driver).await {
            info!("{} ✓ 页面确认申请已发出", ctx);
            return StepOutcome::Submitted;
        }

        let rounds = self.settings.max_question_rounds;
        for round in 0..rounds {
            info!(
                "{} ❓ 检测到筛选问题，等待 {}s 后作答（第 {}/{} 轮）",
                ctx,
                self.pacing.question_backoff_delay(round).as_secs_f64(),
                round + 1,
                rounds
            );
            self.pacing.question_backoff(round).await;

            answer_questions(driver, &mut self.knowledge_base, &self.pacing, ctx).await;

            if self.submission_confirmed(driver).await {
                info!("{} ✓ 作答后申请已发出", ctx);
                return StepOutcome::Submitted;
            }
            if driver.is_present(&site::EASY_APPLY_BUTTON).await {
                info!("{} Easy Apply 按钮重新出现，放弃", ctx);
                return StepOutcome::Abandoned;
            }

            let advance = match driver.find_optional(&site::NEXT_BUTTON).await {
                Some(next) => Some((StepAction::Next, next)),
                None => driver
                    .find_optional(&site::REVIEW_BUTTON)
                    .await
                    .map(|review| (StepAction::Review, review)),
            };
            if let Some((action, button)) = advance {
                if let Err(e) = self.press(driver, action, button).await {
                    warn!("{} ⚠️ 点击{}失败: {}", ctx, action.name(), e);
                }
            }
            self.pacing.settle().await;

            if !driver.is_present(&site::VALIDATION_ERROR).await {
                debug!("{} 校验错误已消失", ctx);
                return StepOutcome::Advanced;
            }
        }

        info!("{} 筛选问题 {} 轮后仍未通过，放弃", ctx, rounds);
        StepOutcome::Abandoned
    }

    async fn submission_confirmed(&self, driver: &dyn PageDriver) -> bool {
        driver
            .page_source()
            .await
            .map(|source| source.contains(site::SUBMITTED_MARKER))
            .unwrap_or(false)
    }

    async fn press(&self, driver: &dyn PageDriver, action: StepAction, button: ElementHandle) -> DriverResult<()> {
        FormControl::ActionButton { action, button }
            .apply(driver, "", self.pacing.element_timeout())
            .await
    }

    /// 上传附件，未配置路径或找不到上传框时只记录日志
    async fn upload(&self, driver: &dyn PageDriver, ctx: &JobCtx, kind: DocumentKind, locator: &Locator) {
        let Some(path) = self.settings.uploads.get(&kind) else {
            warn!("{} ⚠️ 页面要求上传 {}，但配置中没有对应文件", ctx, kind.label());
            return;
        };
        let Some(input) = driver.find_optional(locator).await else {
            warn!("{} ⚠️ 找不到 {} 上传框", ctx, kind.label());
            return;
        };

        let control = FormControl::Upload { kind, input };
        match control
            .apply(driver, &path.to_string_lossy(), self.pacing.element_timeout())
            .await
        {
            Ok(()) => info!("{} 📎 已上传 {}", ctx, kind.label()),
            Err(e) => error!("{} ❌ 上传 {} 失败: {}", ctx, kind.label(), e),
        }
    }

    fn record(&self, outcome: &ApplyOutcome) {
        let record = JobRecord::new(
            Local::now().naive_local(),
            outcome.job_id.clone(),
            &outcome.page_title,
            outcome.attempted,
            outcome.submitted(),
        );
        self.ledger.append_or_warn(&record);
    }
}

// ========== 日志辅助函数 ==========

fn log_outcome(ctx: &JobCtx, outcome: &ApplyOutcome) {
    if outcome.submitted() {
        info!("{} ✅ 投递成功: {}", ctx, outcome.page_title);
    } else {
        info!(
            "{} ⏭️ 未投递 ({}): {}",
            ctx,
            outcome.note(),
            outcome.page_title
        );
    }
}
