//! 单个会话处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责跑完一个答题脚本对应的完整会话，是会话级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **组件装配**：为本次会话创建缓存与答题流程
//! 2. **流程调度**：委托 `AttemptFlow` 执行生命周期
//! 3. **统计输出**：记录作答 / 恢复 / 提交数量

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::clients::ExamService;
use crate::config::Config;
use crate::models::AttemptScript;
use crate::services::{AnswerCache, FocusSurface};
use crate::workflow::{AttemptFlow, AttemptOutcome};

/// 会话处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// 已提交并拿到成绩
    Completed,
    /// 跳过（脚本放弃提交 / 会话早已完成）
    Skipped,
}

/// 处理单个答题脚本
///
/// # 参数
/// - `service`: 考试服务接口
/// - `surface`: 专注面能力（监考模式为浏览器实现）
/// - `script`: 答题脚本
/// - `attempt_index`: 会话索引（用于日志）
/// - `config`: 配置
pub async fn process_attempt(
    service: Arc<dyn ExamService>,
    surface: Box<dyn FocusSurface>,
    script: AttemptScript,
    attempt_index: usize,
    config: &Config,
) -> Result<ProcessResult> {
    log_attempt_start(attempt_index, &script);

    let cache = AnswerCache::new(&config.answer_cache_folder);
    let flow = AttemptFlow::new(
        service,
        cache,
        Duration::from_millis(config.autosave_debounce_ms),
        Duration::from_millis(config.timer_tick_ms),
    );

    let outcome = flow.run(&script, surface, attempt_index).await?;
    log_attempt_complete(attempt_index, &outcome);

    if outcome.completion.is_some() {
        Ok(ProcessResult::Completed)
    } else {
        Ok(ProcessResult::Skipped)
    }
}

// ========== 日志辅助函数 ==========

fn log_attempt_start(attempt_index: usize, script: &AttemptScript) {
    info!("\n{}", "─".repeat(60));
    info!("[会话 {}] 📝 脚本: {} (考试 {})", attempt_index, script.label(), script.exam_id);
    info!("[会话 {}] 计划作答 {} 题", attempt_index, script.answers.len());
}

fn log_attempt_complete(attempt_index: usize, outcome: &AttemptOutcome) {
    if outcome.restored > 0 {
        info!("[会话 {}] 本地恢复: {} 条", attempt_index, outcome.restored);
    }
    info!(
        "[会话 {}] 作答 {} 题，提交 {} 个小节{}",
        attempt_index,
        outcome.answered,
        outcome.sections_submitted,
        if outcome.auto_submitted { "（到时自动提交）" } else { "" }
    );
    if outcome.completion.is_none() {
        warn!("[会话 {}] 本次会话未完成提交", attempt_index);
    }
}
