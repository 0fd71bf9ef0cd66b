//! 会话处理上下文
//!
//! 封装"我正在处理哪场考试的哪次会话"这一信息

use std::fmt::Display;

/// 会话处理上下文
#[derive(Debug, Clone)]
pub struct AttemptCtx {
    /// 会话ID（服务端分配）
    pub attempt_id: String,

    /// 考试ID
    pub exam_id: String,

    /// 会话索引（仅用于日志显示）
    pub attempt_index: usize,
}

impl AttemptCtx {
    /// 创建新的会话上下文
    pub fn new(attempt_id: String, exam_id: String, attempt_index: usize) -> Self {
        Self { attempt_id, exam_id, attempt_index }
    }
}

impl Display for AttemptCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[会话 ID#{} 考试#{}]", self.attempt_id, self.exam_id)
    }
}
