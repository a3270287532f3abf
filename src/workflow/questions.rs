//! 筛选问题作答
//!
//! 对当前步骤里每个可见的问题分组：取标签文本 → 知识库给出答案 → 探测控件类型 → 填入。
//! 单个问题失败只记录日志，不影响其他问题。

use tracing::{debug, info, warn};

use crate::infrastructure::{ElementHandle, PageDriver};
use crate::models::FormControl;
use crate::services::{KnowledgeBase, Pacing};
use crate::site;
use crate::utils::logging::truncate_text;
use crate::workflow::job_ctx::JobCtx;

/// 一轮作答的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnswerStats {
    pub answered: usize,
    pub failed: usize,
}

/// 回答当前步骤上所有可见问题
pub async fn answer_questions(
    driver: &dyn PageDriver,
    knowledge_base: &mut KnowledgeBase,
    pacing: &Pacing,
    ctx: &JobCtx,
) -> AnswerStats {
    pacing.settle().await;

    let mut stats = AnswerStats::default();
    let fields = match driver.find_all(&site::FORM_FIELDS).await {
        Ok(fields) => fields,
        Err(e) => {
            warn!("{} ⚠️ 无法读取问题列表: {}", ctx, e);
            return stats;
        }
    };

    for field in fields {
        match answer_field(driver, knowledge_base, pacing, ctx, &field).await {
            Some(true) => stats.answered += 1,
            Some(false) => stats.failed += 1,
            None => {}
        }
    }

    info!(
        "{} 本轮作答完成: 成功 {} 个, 失败 {} 个",
        ctx, stats.answered, stats.failed
    );
    stats
}

/// 回答单个问题
///
/// 返回 `None` 表示该分组不需要作答（空标签或基础字段）。
async fn answer_field(
    driver: &dyn PageDriver,
    knowledge_base: &mut KnowledgeBase,
    pacing: &Pacing,
    ctx: &JobCtx,
    field: &ElementHandle,
) -> Option<bool> {
    let question = match driver.element_text(field).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("{} ⚠️ 读取问题文本失败: {}", ctx, e);
            return Some(false);
        }
    };
    if question.is_empty() || question.contains(site::PHONE_FIELD_LABEL) {
        return None;
    }

    let answer = knowledge_base.answer(&question, pacing).await;
    debug!("{} 问题 '{}' → '{}'", ctx, truncate_text(&question, 60), answer);

    let control = FormControl::detect_answer_control(driver, field).await;

    // Yes/No 答案优先按单选处理
    if is_yes_no(&answer) && !matches!(control, Some(FormControl::RadioGroup { .. })) {
        let radio = FormControl::RadioGroup { field: *field };
        if radio.apply(driver, &answer, pacing.element_timeout()).await.is_ok() {
            return Some(true);
        }
    }

    let Some(control) = control else {
        warn!("{} ⚠️ 问题没有可识别的作答控件: {}", ctx, truncate_text(&question, 60));
        return Some(false);
    };

    match control.apply(driver, &answer, pacing.element_timeout()).await {
        Ok(()) => Some(true),
        Err(e) => {
            warn!("{} ⚠️ {}控件作答失败: {}", ctx, control.kind_name(), e);
            Some(false)
        }
    }
}

fn is_yes_no(answer: &str) -> bool {
    answer == "Yes" || answer == "No"
}
