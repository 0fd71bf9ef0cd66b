//! 答题会话数据模型
//!
//! 状态只向前推进：not_started → in_progress → completed，
//! startedAt 一经服务端设置不再变化。

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::skill::Skill;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl AttemptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::NotStarted => "not_started",
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 小节状态（仅展示用，不作为权威判断）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    InProgress,
    Completed,
}

/// 会话中的一个小节
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionAttempt {
    pub section_id: String,
    pub status: SectionStatus,
    /// 技能标签随题目加载后回填
    #[serde(default)]
    pub skill: Option<Skill>,
    #[serde(default)]
    pub time_spent: u64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub percentage: f64,
}

/// 一次答题会话
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAttempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub exam: String,
    pub status: AttemptStatus,
    pub sections: Vec<SectionAttempt>,
    /// 总时限（秒），缺省表示不限时
    #[serde(default)]
    pub total_time_limit: Option<u64>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub total_time_spent: u64,
    #[serde(default)]
    pub total_score: f64,
    #[serde(default)]
    pub total_percentage: f64,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExamAttempt {
    pub fn is_in_progress(&self) -> bool {
        self.status == AttemptStatus::InProgress
    }

    pub fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }
}

/// 会话共享句柄
///
/// 会话状态的唯一持有者是答题流程，计时器 / 自动保存 / 提交协调器
/// 通过该句柄借用读写，锁内不做任何 IO
pub type SharedAttempt = Arc<Mutex<ExamAttempt>>;

pub fn shared_attempt(attempt: ExamAttempt) -> SharedAttempt {
    Arc::new(Mutex::new(attempt))
}

/// 完成响应中的单节得分
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionScore {
    pub section_id: String,
    #[serde(default)]
    pub skill: Option<Skill>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub percentage: f64,
}

/// 提交成功后的结果摘要，凭 attempt_id 可再取完整成绩
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub attempt_id: String,
    #[serde(default)]
    pub total_score: f64,
    #[serde(default)]
    pub total_percentage: f64,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub sections: Vec<SectionScore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_parses_server_payload() {
        let json = r#"{
            "_id": "att-1",
            "exam": "exam-9",
            "status": "in_progress",
            "sections": [
                {"sectionId": "s1", "status": "in_progress", "timeSpent": 0},
                {"sectionId": "s2", "status": "completed", "timeSpent": 300, "score": 8.0, "percentage": 80.0}
            ],
            "totalTimeLimit": 3600,
            "startedAt": "2025-06-01T08:00:00Z",
            "totalTimeSpent": 300
        }"#;

        let attempt: ExamAttempt = serde_json::from_str(json).unwrap();
        assert!(attempt.is_in_progress());
        assert_eq!(attempt.total_time_limit, Some(3600));
        assert_eq!(attempt.sections.len(), 2);
        assert_eq!(attempt.sections[1].status, SectionStatus::Completed);
    }

    #[test]
    fn missing_time_limit_means_untimed() {
        let json = r#"{
            "_id": "att-2",
            "exam": "exam-9",
            "status": "in_progress",
            "sections": [],
            "startedAt": "2025-06-01T08:00:00Z"
        }"#;

        let attempt: ExamAttempt = serde_json::from_str(json).unwrap();
        assert_eq!(attempt.total_time_limit, None);
    }
}
