//! 提交协调器 - 流程层
//!
//! 整卷提交的唯一入口：拼装完成请求、防止重复提交、
//! 成功后清理本地缓存并把会话推进到终态。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clients::{CompleteRequest, ExamService};
use crate::error::{AppResult, SessionError};
use crate::models::{AttemptStatus, CompletionSummary, SharedAttempt};
use crate::services::answer_store::SharedAnswerStore;
use crate::services::{AnswerCache, ExamTimer};
use crate::workflow::attempt_ctx::AttemptCtx;

/// 提交结果
#[derive(Debug)]
pub enum SubmitOutcome {
    /// 提交成功，会话进入终态
    Completed(CompletionSummary),
    /// 已有提交在途，按无操作处理
    InFlight,
    /// 会话已不在进行中，按无操作处理
    AlreadyCompleted,
    /// 到时信号已消费过，不再重复自动提交
    ExpiryAlreadyHandled,
}

/// 提交协调器
///
/// 职责：
/// - 从答案仓库取全量快照（不按小节过滤）拼装完成请求
/// - submitting 标志挡住在途重入；到时闩锁保证自动提交至多一次
/// - 成功清缓存，失败放行重试且保留缓存
pub struct SubmissionCoordinator {
    service: Arc<dyn ExamService>,
    store: SharedAnswerStore,
    attempt: SharedAttempt,
    cache: AnswerCache,
    timer: ExamTimer,
    submitting: AtomicBool,
    expiry_handled: AtomicBool,
}

impl SubmissionCoordinator {
    pub fn new(
        service: Arc<dyn ExamService>,
        store: SharedAnswerStore,
        attempt: SharedAttempt,
        cache: AnswerCache,
        timer: ExamTimer,
    ) -> Self {
        Self {
            service,
            store,
            attempt,
            cache,
            timer,
            submitting: AtomicBool::new(false),
            expiry_handled: AtomicBool::new(false),
        }
    }

    /// 提交整卷
    ///
    /// auto_submit 为 true 表示到时自动提交（跳过确认环节是调用方的约定）。
    /// 前置条件：会话进行中、无在途提交；不满足时按无操作返回而不是报错。
    pub async fn submit(&self, ctx: &AttemptCtx, auto_submit: bool) -> AppResult<SubmitOutcome> {
        // 到时闩锁先于一切检查：反复越过零点的 tick 至多换来一次自动提交
        if auto_submit && self.expiry_handled.swap(true, Ordering::SeqCst) {
            debug!("{} 到时信号已处理过，忽略", ctx);
            return Ok(SubmitOutcome::ExpiryAlreadyHandled);
        }

        {
            let attempt = self.attempt.lock().unwrap_or_else(|e| e.into_inner());
            match attempt.status {
                AttemptStatus::InProgress => {}
                AttemptStatus::Completed => {
                    debug!("{} 会话已完成，跳过提交", ctx);
                    return Ok(SubmitOutcome::AlreadyCompleted);
                }
                AttemptStatus::NotStarted => {
                    return Err(SessionError::NotInProgress {
                        status: attempt.status.to_string(),
                    }
                    .into());
                }
            }
        }

        if self.submitting.swap(true, Ordering::SeqCst) {
            debug!("{} 已有提交在途，忽略本次调用", ctx);
            return Ok(SubmitOutcome::InFlight);
        }

        let answers = {
            let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
            store.snapshot()
        };
        let time_spent = self.timer.elapsed_now();

        info!(
            "[会话 {}] 📤 正在提交整卷... ({} 条答案, 用时 {} 秒, 自动提交: {})",
            ctx.attempt_index,
            answers.len(),
            time_spent,
            auto_submit
        );

        let request = CompleteRequest { answers, time_spent, auto_submit };

        match self.service.complete_attempt(&ctx.attempt_id, &request).await {
            Ok(summary) => {
                {
                    let mut attempt = self.attempt.lock().unwrap_or_else(|e| e.into_inner());
                    attempt.status = AttemptStatus::Completed;
                    attempt.total_time_spent = time_spent;
                    attempt.total_score = summary.total_score;
                    attempt.total_percentage = summary.total_percentage;
                    attempt.completed_at = Some(summary.completed_at);
                }

                // 服务端已持有权威答卷，本地缓存没有存在价值了
                if let Err(e) = self.cache.clear(&ctx.attempt_id).await {
                    warn!("[会话 {}] 清理本地缓存失败: {}", ctx.attempt_index, e);
                }

                info!(
                    "[会话 {}] ✓ 整卷提交成功，得分 {:.1} ({:.0}%)",
                    ctx.attempt_index, summary.total_score, summary.total_percentage
                );

                self.submitting.store(false, Ordering::SeqCst);
                Ok(SubmitOutcome::Completed(summary))
            }
            Err(e) => {
                // 放行重试；答案缓存保留，不会丢作答
                self.submitting.store(false, Ordering::SeqCst);
                warn!("[会话 {}] ⚠️ 整卷提交失败: {}（可重试，缓存保留）", ctx.attempt_index, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{SectionProgress, SubmitSectionRequest};
    use crate::error::ApiError;
    use crate::models::{
        shared_attempt, Answer, ExamAttempt, SectionQuestions,
    };
    use crate::services::answer_store::shared_store;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn test_folder(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("take_exam_submit_submit_{}_{}", std::process::id(), name))
    }

    fn in_progress_attempt(id: &str) -> ExamAttempt {
        ExamAttempt {
            id: id.to_string(),
            exam: "exam-1".to_string(),
            status: AttemptStatus::InProgress,
            sections: Vec::new(),
            total_time_limit: Some(3600),
            started_at: Utc::now(),
            total_time_spent: 0,
            total_score: 0.0,
            total_percentage: 0.0,
            completed_at: None,
        }
    }

    /// 可编排的考试服务桩实现
    #[derive(Default)]
    struct MockService {
        complete_calls: AtomicUsize,
        fail_complete: AtomicBool,
        /// 设置后，complete_attempt 会等到放行通知才返回
        hold: Option<Arc<Notify>>,
    }

    impl MockService {
        fn completions(&self) -> usize {
            self.complete_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExamService for MockService {
        async fn start_exam(&self, _exam_id: &str) -> AppResult<ExamAttempt> {
            unimplemented!("本测试不涉及")
        }

        async fn section_questions(
            &self,
            _attempt_id: &str,
            _section_id: &str,
        ) -> AppResult<SectionQuestions> {
            unimplemented!("本测试不涉及")
        }

        async fn submit_section(
            &self,
            _attempt_id: &str,
            _section_id: &str,
            _request: &SubmitSectionRequest,
        ) -> AppResult<SectionProgress> {
            unimplemented!("本测试不涉及")
        }

        async fn complete_attempt(
            &self,
            attempt_id: &str,
            _request: &CompleteRequest,
        ) -> AppResult<CompletionSummary> {
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            self.complete_calls.fetch_add(1, Ordering::SeqCst);

            if self.fail_complete.load(Ordering::SeqCst) {
                return Err(ApiError::EmptyResponse { endpoint: "/submit".to_string() }.into());
            }

            Ok(CompletionSummary {
                attempt_id: attempt_id.to_string(),
                total_score: 8.5,
                total_percentage: 85.0,
                completed_at: Utc::now(),
                sections: Vec::new(),
            })
        }

        async fn attempt_result(&self, _attempt_id: &str) -> AppResult<ExamAttempt> {
            unimplemented!("本测试不涉及")
        }
    }

    fn coordinator_with(
        service: Arc<MockService>,
        attempt_id: &str,
        cache_folder: PathBuf,
    ) -> (Arc<SubmissionCoordinator>, SharedAnswerStore, SharedAttempt, AnswerCache) {
        let store = shared_store();
        let attempt = shared_attempt(in_progress_attempt(attempt_id));
        let cache = AnswerCache::new(cache_folder);
        let timer = ExamTimer::new(Utc::now() - chrono::Duration::seconds(30), Some(3600));
        let coordinator = Arc::new(SubmissionCoordinator::new(
            service,
            store.clone(),
            attempt.clone(),
            cache.clone(),
            timer,
        ));
        (coordinator, store, attempt, cache)
    }

    fn ctx(attempt_id: &str) -> AttemptCtx {
        AttemptCtx::new(attempt_id.to_string(), "exam-1".to_string(), 1)
    }

    #[tokio::test]
    async fn repeated_expiry_auto_submits_once() {
        let service = Arc::new(MockService::default());
        let (coordinator, _store, _attempt, _cache) =
            coordinator_with(service.clone(), "att-exp", test_folder("expiry"));
        let ctx = ctx("att-exp");

        let first = coordinator.submit(&ctx, true).await.unwrap();
        assert!(matches!(first, SubmitOutcome::Completed(_)));

        // 模拟 tick 反复越过零点
        for _ in 0..3 {
            let again = coordinator.submit(&ctx, true).await.unwrap();
            assert!(matches!(again, SubmitOutcome::ExpiryAlreadyHandled));
        }

        assert_eq!(service.completions(), 1);
    }

    #[tokio::test]
    async fn concurrent_manual_submits_send_one_request() {
        let hold = Arc::new(Notify::new());
        let service = Arc::new(MockService { hold: Some(hold.clone()), ..Default::default() });
        let (coordinator, _store, _attempt, _cache) =
            coordinator_with(service.clone(), "att-dup", test_folder("dup"));
        let ctx0 = ctx("att-dup");

        let first = {
            let coordinator = coordinator.clone();
            let ctx = ctx0.clone();
            tokio::spawn(async move { coordinator.submit(&ctx, false).await })
        };
        // 让首个提交进入在途状态
        tokio::task::yield_now().await;

        let second = coordinator.submit(&ctx0, false).await.unwrap();
        assert!(matches!(second, SubmitOutcome::InFlight));

        hold.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, SubmitOutcome::Completed(_)));
        assert_eq!(service.completions(), 1);
    }

    #[tokio::test]
    async fn success_clears_cache_failure_preserves_it() {
        // 成功路径：提交后缓存应为空
        let service = Arc::new(MockService::default());
        let (coordinator, store, attempt, cache) =
            coordinator_with(service.clone(), "A1", test_folder("cache_ok"));
        let ctx_ok = ctx("A1");

        let snapshot = {
            let mut store = store.lock().unwrap();
            store.set_answer(Answer::selected("q1", "A", 3));
            store.set_answer(Answer::selected("q2", "B", 5));
            store.snapshot()
        };
        cache.save("A1", &snapshot).await.unwrap();

        let outcome = coordinator.submit(&ctx_ok, false).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed(_)));
        assert!(cache.load("A1").await.unwrap().is_none(), "提交成功后缓存应被清理");
        assert!(attempt.lock().unwrap().is_completed());

        // 失败路径：缓存保留，两条答案都还在
        let failing = Arc::new(MockService::default());
        failing.fail_complete.store(true, Ordering::SeqCst);
        let (coordinator, store, attempt, cache) =
            coordinator_with(failing.clone(), "A1", test_folder("cache_fail"));
        let ctx_fail = ctx("A1");

        let snapshot = {
            let mut store = store.lock().unwrap();
            store.set_answer(Answer::selected("q1", "A", 3));
            store.set_answer(Answer::selected("q2", "B", 5));
            store.snapshot()
        };
        cache.save("A1", &snapshot).await.unwrap();

        assert!(coordinator.submit(&ctx_fail, false).await.is_err());
        let stored = cache.load("A1").await.unwrap().unwrap();
        assert_eq!(stored.answers.len(), 2, "提交失败后缓存应原样保留");
        assert!(attempt.lock().unwrap().is_in_progress());

        // 失败释放了在途标志，重试可以继续
        failing.fail_complete.store(false, Ordering::SeqCst);
        let retried = coordinator.submit(&ctx_fail, false).await.unwrap();
        assert!(matches!(retried, SubmitOutcome::Completed(_)));

        tokio::fs::remove_dir_all(test_folder("cache_ok")).await.ok();
        tokio::fs::remove_dir_all(test_folder("cache_fail")).await.ok();
    }

    #[tokio::test]
    async fn completed_attempt_is_not_resubmitted() {
        let service = Arc::new(MockService::default());
        let (coordinator, _store, attempt, _cache) =
            coordinator_with(service.clone(), "att-done", test_folder("done"));
        attempt.lock().unwrap().status = AttemptStatus::Completed;

        let outcome = coordinator.submit(&ctx("att-done"), false).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::AlreadyCompleted));
        assert_eq!(service.completions(), 0);
    }
}
