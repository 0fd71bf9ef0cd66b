//! 答题流程 - 流程层
//!
//! 定义"一次会话"的完整生命周期：
//! 开始（幂等恢复）→ 本地缓存回灌 → 按节作答 + 自动保存 →
//! 小节提交 → 整卷提交（或到时自动提交）
//!
//! 不持有任何资源，只依赖业务能力（services）和考试服务接口

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::clients::{ExamService, SubmitSectionRequest};
use crate::error::SessionError;
use crate::models::{
    shared_attempt, Answer, AttemptScript, CompletionSummary, QuestionKind, ScriptedAnswer,
    ScriptedResponse, SectionQuestions, SectionStatus, SharedAttempt,
};
use crate::services::answer_store::{shared_store, SharedAnswerStore};
use crate::services::{
    run_countdown, AnswerCache, AutosaveHandle, AutosaveScheduler, ExamTimer, FocusSurface,
    FullscreenGuard, GuardState,
};
use crate::workflow::attempt_ctx::AttemptCtx;
use crate::workflow::submission::{SubmissionCoordinator, SubmitOutcome};

/// 会话处理结果
#[derive(Debug)]
pub struct AttemptOutcome {
    pub attempt_id: String,
    /// 最终已作答题目数
    pub answered: usize,
    /// 从本地缓存恢复的答案条数
    pub restored: usize,
    pub sections_submitted: usize,
    /// 是否由到时信号触发提交
    pub auto_submitted: bool,
    /// 提交成功后的成绩摘要；未提交（脚本放弃 / 会话早已完成）为 None
    pub completion: Option<CompletionSummary>,
}

/// 一次会话运行期间的组件集合
struct Session {
    ctx: AttemptCtx,
    attempt: SharedAttempt,
    store: SharedAnswerStore,
    autosave: AutosaveHandle,
    coordinator: SubmissionCoordinator,
    guard: FullscreenGuard,
    expiry_rx: mpsc::Receiver<()>,
    restored: usize,
}

/// 答题流程
pub struct AttemptFlow {
    service: Arc<dyn ExamService>,
    cache: AnswerCache,
    autosave_debounce: Duration,
    timer_tick: Duration,
}

impl AttemptFlow {
    /// 创建新的答题流程
    pub fn new(
        service: Arc<dyn ExamService>,
        cache: AnswerCache,
        autosave_debounce: Duration,
        timer_tick: Duration,
    ) -> Self {
        Self { service, cache, autosave_debounce, timer_tick }
    }

    /// 运行一场脚本化的答题会话
    pub async fn run(
        &self,
        script: &AttemptScript,
        surface: Box<dyn FocusSurface>,
        attempt_index: usize,
    ) -> Result<AttemptOutcome> {
        if script.exam_id.trim().is_empty() {
            return Err(SessionError::EmptyExamId.into());
        }

        info!("[会话 {}] 🚀 开始考试: {}", attempt_index, script.label());
        let attempt = self
            .service
            .start_exam(&script.exam_id)
            .await
            .with_context(|| format!("无法开始考试 {}", script.exam_id))?;
        let ctx = AttemptCtx::new(attempt.id.clone(), script.exam_id.clone(), attempt_index);

        if attempt.is_completed() {
            info!("{} 会话已是完成状态，直接跳过", ctx);
            return Ok(AttemptOutcome {
                attempt_id: ctx.attempt_id,
                answered: 0,
                restored: 0,
                sections_submitted: 0,
                auto_submitted: false,
                completion: None,
            });
        }

        let timer = ExamTimer::from_attempt(&attempt);
        let shared = shared_attempt(attempt);
        let store = shared_store();

        // 回灌本地缓存：有缓存时缓存优先于空仓库，并告知恢复情况
        let restored = match self.cache.load(&ctx.attempt_id).await {
            Ok(Some(stored)) => {
                let saved_at = stored
                    .saved_at()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "未知时刻".to_string());
                let count = {
                    let mut store = store.lock().unwrap_or_else(|e| e.into_inner());
                    store.hydrate(stored.answers.into_values())
                };
                if count > 0 {
                    info!("{} ✓ 已恢复 {} 条本地答案 (保存于 {})", ctx, count, saved_at);
                }
                count
            }
            Ok(None) => 0,
            Err(e) => {
                warn!("{} 读取本地缓存失败: {}", ctx, e);
                0
            }
        };

        let autosave = AutosaveScheduler::spawn(
            ctx.attempt_id.clone(),
            store.clone(),
            shared.clone(),
            self.cache.clone(),
            self.autosave_debounce,
        );

        let (expiry_tx, expiry_rx) = mpsc::channel(1);
        let countdown =
            tokio::spawn(run_countdown(timer, shared.clone(), self.timer_tick, expiry_tx));

        let coordinator = SubmissionCoordinator::new(
            self.service.clone(),
            store.clone(),
            shared.clone(),
            self.cache.clone(),
            timer,
        );

        let mut session = Session {
            ctx: ctx.clone(),
            attempt: shared,
            store,
            autosave: autosave.handle(),
            coordinator,
            guard: FullscreenGuard::new(surface),
            expiry_rx,
            restored,
        };

        let result = self.drive(script, &mut session).await;

        // 统一收尾：兜底强制保存（已完成的会话会自动跳过）、
        // 无条件释放全屏、停掉计时与调度任务
        session.autosave.force_save().await;
        session.guard.release().await;
        autosave.shutdown().await;
        countdown.abort();

        match &result {
            Ok(outcome) => {
                if let Some(summary) = &outcome.completion {
                    info!(
                        "{} 🎉 会话完成，总分 {:.1} ({:.0}%)，结果可凭 {} 查询",
                        ctx, summary.total_score, summary.total_percentage, summary.attempt_id
                    );
                }
            }
            Err(e) => {
                error!("{} ❌ 会话处理失败: {}", ctx, e);
            }
        }

        result
    }

    /// 驱动一次会话的作答与提交
    async fn drive(&self, script: &AttemptScript, session: &mut Session) -> Result<AttemptOutcome> {
        let sections = {
            let attempt = session.attempt.lock().unwrap_or_else(|e| e.into_inner());
            attempt.sections.clone()
        };
        let default_think = script.think_time_ms.unwrap_or(0);

        let mut sections_submitted = 0;
        let mut total_questions = 0;
        let mut auto_submitted = false;
        let mut completion = None;

        // ========== 按既定顺序处理各小节，后面的小节在前面提交前锁定 ==========
        'sections: for (section_index, section) in sections.iter().enumerate() {
            if section.status == SectionStatus::Completed {
                info!("{} 小节 {} 已完成，跳过", session.ctx, section_index + 1);
                continue;
            }

            let section_questions = self
                .service
                .section_questions(&session.ctx.attempt_id, &section.section_id)
                .await
                .with_context(|| format!("无法加载小节 {} 的题目", section.section_id))?;
            total_questions += section_questions.questions.len();

            // 回填技能标签
            {
                let mut attempt = session.attempt.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(s) = attempt.sections.get_mut(section_index) {
                    s.skill = Some(section_questions.skill);
                }
            }

            info!(
                "{} 📖 小节 {}/{} [{}] 共 {} 题",
                session.ctx,
                section_index + 1,
                sections.len(),
                section_questions.skill,
                section_questions.questions.len()
            );
            if let Some(remaining) = section_questions.remaining_time {
                debug!("服务端提示小节剩余 {} 秒", remaining);
            }

            // 题目就绪后自动尝试进入全屏，整场只尝试一次
            session.guard.enter_once().await;

            // ========== 执行本小节的脚本作答 ==========
            for scripted in script.answers.iter().filter(|a| a.section == section_index + 1) {
                let think_ms = scripted.think_time_ms.unwrap_or(default_think);

                // 思考期间仍要响应到时信号
                let expired = if think_ms > 0 {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(think_ms)) => false,
                        Some(_) = session.expiry_rx.recv() => true,
                    }
                } else {
                    session.expiry_rx.try_recv().is_ok()
                };
                if expired {
                    completion = self.auto_submit(session).await?;
                    auto_submitted = true;
                    break 'sections;
                }

                let answer = build_answer(scripted, &section_questions, think_ms)?;
                {
                    let mut store = session.store.lock().unwrap_or_else(|e| e.into_inner());
                    store.set_answer(answer);
                }
                session.autosave.touch();

                // 监考轮询：脚本化作答遇到非自愿退出一律取消离开、重回全屏
                if session.guard.check().await == GuardState::ExitPendingConfirmation {
                    session.guard.resolve_exit(false).await;
                }
            }

            // ========== 小节完整性检查：全部作答才允许提交本节 ==========
            let question_ids: Vec<&str> =
                section_questions.questions.iter().map(|q| q.id.as_str()).collect();
            let answered = {
                let store = session.store.lock().unwrap_or_else(|e| e.into_inner());
                store.answered_among(question_ids.iter().copied())
            };
            if answered < question_ids.len() {
                let remaining = question_ids.len() - answered;
                warn!(
                    "{} ⚠️ 小节 {} 还有 {} 题未作答，拒绝提交",
                    session.ctx,
                    section_index + 1,
                    remaining
                );
                return Err(SessionError::IncompleteSection {
                    section_id: section.section_id.clone(),
                    remaining,
                }
                .into());
            }

            // 先取消挂起的防抖保存再提交，避免迟到的快照覆盖新状态
            session.autosave.force_save().await;

            let section_answers: Vec<Answer> = {
                let store = session.store.lock().unwrap_or_else(|e| e.into_inner());
                question_ids.iter().filter_map(|id| store.answer(id).cloned()).collect()
            };
            let section_time: u64 = section_answers.iter().map(|a| a.time_spent).sum();
            let request = SubmitSectionRequest { answers: section_answers, time_spent: section_time };

            match self
                .service
                .submit_section(&session.ctx.attempt_id, &section.section_id, &request)
                .await
            {
                Ok(progress) => {
                    sections_submitted += 1;
                    {
                        let mut attempt =
                            session.attempt.lock().unwrap_or_else(|e| e.into_inner());
                        if let Some(s) = attempt.sections.get_mut(section_index) {
                            s.status = SectionStatus::Completed;
                            s.time_spent = section_time;
                        }
                    }
                    info!(
                        "{} ✓ 小节 {} 提交成功，剩余 {} 节",
                        session.ctx,
                        section_index + 1,
                        progress.remaining_sections_count
                    );
                    if !progress.has_more_sections {
                        break;
                    }
                }
                Err(e) => {
                    // 答案已落盘，失败后可重跑脚本续作
                    error!("{} 小节 {} 提交失败: {}", session.ctx, section_index + 1, e);
                    return Err(e).with_context(|| {
                        SessionError::SectionSubmitFailed { section_id: section.section_id.clone() }
                            .to_string()
                    });
                }
            }
        }

        // ========== 整卷提交 ==========
        if !auto_submitted {
            if session.expiry_rx.try_recv().is_ok() {
                completion = self.auto_submit(session).await?;
                auto_submitted = true;
            } else if !script.confirm_submit {
                // 学员在确认框点了取消：保留进行中状态与本地缓存
                info!("{} 脚本选择不确认提交，会话保持进行中", session.ctx);
            } else {
                match session.coordinator.submit(&session.ctx, false).await {
                    Ok(SubmitOutcome::Completed(summary)) => {
                        session.guard.complete().await;
                        completion = Some(summary);
                    }
                    Ok(other) => {
                        debug!("{} 提交被跳过: {:?}", session.ctx, other);
                    }
                    Err(e) => {
                        return Err(e).context("整卷提交失败");
                    }
                }
            }
        }

        let answered = {
            let store = session.store.lock().unwrap_or_else(|e| e.into_inner());
            store.count()
        };
        if total_questions > 0 {
            debug!("{} 已作答 {}/{} 题", session.ctx, answered, total_questions);
        }

        Ok(AttemptOutcome {
            attempt_id: session.ctx.attempt_id.clone(),
            answered,
            restored: session.restored,
            sections_submitted,
            auto_submitted,
            completion,
        })
    }

    /// 到时自动提交：跳过确认环节，协调器闩锁保证至多一次
    async fn auto_submit(&self, session: &mut Session) -> Result<Option<CompletionSummary>> {
        info!("{} ⏰ 到时，触发自动提交", session.ctx);
        match session.coordinator.submit(&session.ctx, true).await {
            Ok(SubmitOutcome::Completed(summary)) => {
                session.guard.complete().await;
                Ok(Some(summary))
            }
            Ok(other) => {
                debug!("{} 自动提交被跳过: {:?}", session.ctx, other);
                Ok(None)
            }
            Err(e) => Err(e).context("自动提交失败"),
        }
    }
}

/// 把脚本作答映射成一条答案
///
/// 载荷与题型不匹配只告警，仓库不做校验（与作答界面的分工一致）
fn build_answer(
    scripted: &ScriptedAnswer,
    section: &SectionQuestions,
    think_ms: u64,
) -> Result<Answer> {
    let question = scripted
        .question
        .checked_sub(1)
        .and_then(|i| section.questions.get(i))
        .ok_or(SessionError::ScriptReferenceOutOfRange {
            section: scripted.section,
            question: scripted.question,
        })?;

    debug!(
        "第 {} 题 [{}] 题干: {}",
        scripted.question,
        question.kind_name(),
        crate::utils::logging::truncate_text(question.text(), 80)
    );

    // 思考时间向上取整记为本题耗时
    let time_spent = think_ms.div_ceil(1000);

    let answer = match &scripted.response {
        ScriptedResponse::Choice { select } => Answer::selected(&question.id, select, time_spent),
        ScriptedResponse::Text { text } => Answer::writing(&question.id, text, time_spent),
        ScriptedResponse::Audio { audio, duration } => {
            Answer::speaking(&question.id, audio, *duration, time_spent)
        }
        ScriptedResponse::Pairs { pairs } => Answer::matching(&question.id, pairs, time_spent),
    };

    let fits = matches!(
        (&scripted.response, &question.kind),
        (ScriptedResponse::Choice { .. }, QuestionKind::MultipleChoice { .. })
            | (ScriptedResponse::Choice { .. }, QuestionKind::FillBlank { .. })
            | (ScriptedResponse::Choice { .. }, QuestionKind::TrueFalse { .. })
            | (ScriptedResponse::Text { .. }, QuestionKind::Writing { .. })
            | (ScriptedResponse::Audio { .. }, QuestionKind::Speaking { .. })
            | (ScriptedResponse::Pairs { .. }, QuestionKind::Matching { .. })
    );
    if !fits {
        warn!(
            "题目 {} ({}) 收到{}类作答，按原样记录",
            question.id,
            question.kind_name(),
            answer.payload.kind_name()
        );
    }

    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, Question, Skill};

    fn section_with_questions() -> SectionQuestions {
        SectionQuestions {
            section_id: "s1".to_string(),
            skill: Skill::Reading,
            time_limit: Some(600),
            remaining_time: Some(600),
            questions: vec![
                Question {
                    id: "q1".to_string(),
                    points: 1.0,
                    kind: QuestionKind::MultipleChoice {
                        question_text: "选一个".to_string(),
                        options: vec![Choice { text: "A".to_string() }, Choice { text: "B".to_string() }],
                    },
                },
                Question {
                    id: "q2".to_string(),
                    points: 2.0,
                    kind: QuestionKind::Writing {
                        question_text: "写一段".to_string(),
                        min_words: Some(50),
                    },
                },
            ],
        }
    }

    #[test]
    fn build_answer_maps_script_indices_to_question_ids() {
        let section = section_with_questions();
        let scripted = ScriptedAnswer {
            section: 1,
            question: 2,
            response: ScriptedResponse::Text { text: "an essay".to_string() },
            think_time_ms: None,
        };

        let answer = build_answer(&scripted, &section, 2500).unwrap();
        assert_eq!(answer.question_id, "q2");
        assert_eq!(answer.time_spent, 3, "思考时间应向上取整到秒");
    }

    #[test]
    fn build_answer_rejects_out_of_range_reference() {
        let section = section_with_questions();
        let scripted = ScriptedAnswer {
            section: 1,
            question: 5,
            response: ScriptedResponse::Choice { select: "A".to_string() },
            think_time_ms: None,
        };

        assert!(build_answer(&scripted, &section, 0).is_err());
    }
}
