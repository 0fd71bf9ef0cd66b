//! 答案仓库 - 业务能力层
//!
//! 会话期间答案的唯一权威来源。只有输入侧（脚本执行 / 恢复）写入，
//! 自动保存和提交只读快照。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::Answer;

/// 答案仓库
///
/// 职责：
/// - 维护 question_id → Answer 的内存映射
/// - 写入即覆盖，不校验载荷与题型是否匹配（由作答侧保证）
/// - 通过修订号向自动保存暴露"脏"状态
pub struct AnswerStore {
    answers: HashMap<String, Answer>,
    revision: u64,
}

impl AnswerStore {
    /// 创建空仓库
    pub fn new() -> Self {
        Self { answers: HashMap::new(), revision: 0 }
    }

    /// 写入或覆盖一题的答案
    pub fn set_answer(&mut self, answer: Answer) {
        self.answers.insert(answer.question_id.clone(), answer);
        self.revision += 1;
    }

    /// 读取一题的答案
    pub fn answer(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    /// 该题是否已作答
    pub fn is_answered(&self, question_id: &str) -> bool {
        self.answers.contains_key(question_id)
    }

    /// 已作答的不同题目数量
    pub fn count(&self) -> usize {
        self.answers.len()
    }

    /// 当前修订号，每次写入递增
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// 全量快照，按题目 ID 排序保证载荷稳定
    pub fn snapshot(&self) -> Vec<Answer> {
        let mut answers: Vec<Answer> = self.answers.values().cloned().collect();
        answers.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        answers
    }

    /// 从本地缓存恢复答案，返回恢复条数
    ///
    /// 整体只算一次修订，避免触发一连串自动保存
    pub fn hydrate(&mut self, answers: impl IntoIterator<Item = Answer>) -> usize {
        let mut restored = 0;
        for answer in answers {
            self.answers.insert(answer.question_id.clone(), answer);
            restored += 1;
        }
        if restored > 0 {
            self.revision += 1;
        }
        restored
    }

    /// 统计给定题目集合中已作答的数量
    pub fn answered_among<'a>(&self, question_ids: impl IntoIterator<Item = &'a str>) -> usize {
        question_ids.into_iter().filter(|id| self.is_answered(id)).count()
    }
}

impl Default for AnswerStore {
    fn default() -> Self {
        Self::new()
    }
}

/// 仓库共享句柄
///
/// 锁内只做内存读写，不跨 await 持有
pub type SharedAnswerStore = Arc<Mutex<AnswerStore>>;

pub fn shared_store() -> SharedAnswerStore {
    Arc::new(Mutex::new(AnswerStore::new()))
}
