//! 考试计时器 - 业务能力层
//!
//! 已用 / 剩余时间完全由服务端下发的开始时刻和总时限推导，
//! 不累加本地 tick，页面刷新或任务挂起都不会丢时间。

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::models::{ExamAttempt, SharedAttempt};

/// 考试计时器
///
/// 纯推导：elapsed = now - started_at，remaining = max(0, limit - elapsed)
#[derive(Debug, Clone, Copy)]
pub struct ExamTimer {
    started_at: DateTime<Utc>,
    /// 总时限（秒），None 表示不限时
    time_limit: Option<u64>,
}

impl ExamTimer {
    pub fn new(started_at: DateTime<Utc>, time_limit: Option<u64>) -> Self {
        Self { started_at, time_limit }
    }

    pub fn from_attempt(attempt: &ExamAttempt) -> Self {
        Self::new(attempt.started_at, attempt.total_time_limit)
    }

    /// 指定时刻的已用秒数，开始前按 0 计
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_seconds().max(0) as u64
    }

    /// 指定时刻的剩余秒数；不限时返回 None
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<u64> {
        self.time_limit.map(|limit| limit.saturating_sub(self.elapsed_at(now)))
    }

    /// 指定时刻是否已到时
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.remaining_at(now), Some(0))
    }

    /// 当前已用秒数
    pub fn elapsed_now(&self) -> u64 {
        self.elapsed_at(Utc::now())
    }

    /// 当前剩余秒数
    pub fn remaining_now(&self) -> Option<u64> {
        self.remaining_at(Utc::now())
    }
}

/// 倒计时循环
///
/// 按 tick 间隔重算剩余时间，到时后只发一次到时信号即退出；
/// 会话进入终态时冻结在服务端回报的用时上，不再继续走表。
/// 到时信号由提交协调器独占消费（自动提交）。
pub async fn run_countdown(
    timer: ExamTimer,
    attempt: SharedAttempt,
    tick: Duration,
    expiry_tx: mpsc::Sender<()>,
) {
    if timer.time_limit.is_none() {
        debug!("本场考试不限时，计时器仅记录已用时间");
        return;
    }

    let mut interval = tokio::time::interval(tick);
    loop {
        interval.tick().await;

        let (completed, frozen) = {
            let attempt = attempt.lock().unwrap_or_else(|e| e.into_inner());
            (attempt.is_completed(), attempt.total_time_spent)
        };
        if completed {
            info!("会话已完成，计时冻结于 {} 秒", frozen);
            return;
        }

        let now = Utc::now();
        match timer.remaining_at(now) {
            Some(0) => {
                info!("⏰ 考试时间已用尽");
                let _ = expiry_tx.send(()).await;
                return;
            }
            Some(remaining) => {
                if remaining % 60 == 0 {
                    debug!("剩余时间: {} 秒", remaining);
                }
            }
            None => return,
        }
    }
}
