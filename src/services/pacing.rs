//! 节奏控制服务 - 业务能力层
//!
//! 所有刻意的等待都集中在这里：模仿人工操作的随机停顿、页面稳定等待、
//! 筛选问题的退避、留给人工介入的暂停。全部基于 `tokio::time`。

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::debug;

use crate::config::{PacingSettings, MAX_PACING_SECS};

/// 节奏控制
#[derive(Debug, Clone)]
pub struct Pacing {
    action_delay: (Duration, Duration),
    settle: Duration,
    scroll_settle: Duration,
    question_backoff: Duration,
    question_backoff_max: Duration,
    operator_pause: Duration,
    login_wait: Duration,
    two_factor_wait: Duration,
    element_timeout: Duration,
}

impl Pacing {
    pub fn from_settings(settings: &PacingSettings) -> Self {
        Self {
            action_delay: (
                secs(settings.action_delay_min_secs),
                secs(settings.action_delay_max_secs),
            ),
            settle: secs(settings.settle_secs),
            scroll_settle: secs(settings.scroll_settle_secs),
            question_backoff: secs(settings.question_backoff_secs),
            question_backoff_max: secs(settings.question_backoff_max_secs),
            operator_pause: secs(settings.operator_pause_secs),
            login_wait: secs(settings.login_wait_secs),
            two_factor_wait: secs(settings.two_factor_wait_secs),
            element_timeout: secs(settings.element_timeout_secs),
        }
    }

    /// 等待元素可点击的超时
    pub fn element_timeout(&self) -> Duration {
        self.element_timeout
    }

    /// 随机停顿，模仿人工操作
    pub async fn human_pause(&self) {
        let (min, max) = self.action_delay;
        let delay = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        debug!("停顿 {:.1}s", delay.as_secs_f64());
        sleep(delay).await;
    }

    /// 页面操作后的稳定等待
    pub async fn settle(&self) {
        sleep(self.settle).await;
    }

    /// 滚动后的等待
    pub async fn scroll_settle(&self) {
        sleep(self.scroll_settle).await;
    }

    /// 第 `round` 轮（从 0 开始）回答筛选问题前的退避时间
    pub fn question_backoff_delay(&self, round: usize) -> Duration {
        let factor = 2u32.saturating_pow(round.min(16) as u32);
        self.question_backoff
            .saturating_mul(factor)
            .min(self.question_backoff_max)
    }

    pub async fn question_backoff(&self, round: usize) {
        sleep(self.question_backoff_delay(round)).await;
    }

    /// 留给人工介入的暂停
    pub async fn operator_pause(&self) {
        sleep(self.operator_pause).await;
    }

    pub async fn login_wait(&self) {
        sleep(self.login_wait).await;
    }

    pub async fn two_factor_wait(&self) {
        sleep(self.two_factor_wait).await;
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_settings(&PacingSettings::default())
    }
}

/// 负数和 NaN 按 0 处理，超出范围按上限处理
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::from_secs_f64(MAX_PACING_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_backoff_is_exponential_and_capped() {
        let pacing = Pacing::default();

        assert_eq!(pacing.question_backoff_delay(0), Duration::from_secs(5));
        assert_eq!(pacing.question_backoff_delay(1), Duration::from_secs(10));
        assert_eq!(pacing.question_backoff_delay(2), Duration::from_secs(20));
        assert_eq!(pacing.question_backoff_delay(3), Duration::from_secs(30));
        assert_eq!(pacing.question_backoff_delay(40), Duration::from_secs(30));
    }

    #[test]
    fn test_out_of_range_seconds_are_clamped() {
        let settings = PacingSettings {
            settle_secs: f64::INFINITY,
            scroll_settle_secs: f64::NAN,
            operator_pause_secs: -3.0,
            ..PacingSettings::default()
        };
        let pacing = Pacing::from_settings(&settings);

        assert_eq!(pacing.settle, Duration::from_secs(86_400));
        assert_eq!(pacing.scroll_settle, Duration::ZERO);
        assert_eq!(pacing.operator_pause, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_human_pause_stays_in_range() {
        let pacing = Pacing::default();
        let start = tokio::time::Instant::now();

        pacing.human_pause().await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed <= Duration::from_millis(2950));
    }
}
