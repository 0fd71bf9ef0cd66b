pub mod exam_client;

pub use exam_client::{CompleteRequest, ExamClient, SectionProgress, SubmitSectionRequest};

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{CompletionSummary, ExamAttempt, SectionQuestions};

/// 考试服务接口
///
/// 五个操作对应服务端的答题会话 API。
/// 生产实现是 `ExamClient`；测试注入模拟实现。
#[async_trait]
pub trait ExamService: Send + Sync {
    /// 开始考试
    ///
    /// 对已开始的会话幂等：服务端返回现有会话而不是新建，等同于"恢复"
    async fn start_exam(&self, exam_id: &str) -> AppResult<ExamAttempt>;

    /// 拉取小节题目
    async fn section_questions(
        &self,
        attempt_id: &str,
        section_id: &str,
    ) -> AppResult<SectionQuestions>;

    /// 提交单个小节的答案
    async fn submit_section(
        &self,
        attempt_id: &str,
        section_id: &str,
        request: &SubmitSectionRequest,
    ) -> AppResult<SectionProgress>;

    /// 提交整场考试，会话进入终态
    async fn complete_attempt(
        &self,
        attempt_id: &str,
        request: &CompleteRequest,
    ) -> AppResult<CompletionSummary>;

    /// 查询会话结果
    async fn attempt_result(&self, attempt_id: &str) -> AppResult<ExamAttempt>;
}
