//! 答案数据模型
//!
//! 与服务端的 Answer 结构对齐：selectedAnswer / writingAnswer / speakingAnswer
//! 三种载荷互斥。匹配题沿用 selectedAnswer，配对以 "左:右" 逗号串编码。

use serde::{Deserialize, Serialize};

/// 单题答案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    #[serde(flatten)]
    pub payload: AnswerPayload,
    /// 本题作答耗时（秒，尽力统计）
    pub time_spent: u64,
}

/// 答案载荷
///
/// 序列化后恰好是服务端的三个可选字段之一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnswerPayload {
    /// 单选 / 填空 / 判断 / 匹配
    #[serde(rename = "selectedAnswer")]
    Selected(String),
    /// 写作
    #[serde(rename = "writingAnswer", rename_all = "camelCase")]
    Writing { text: String, word_count: usize },
    /// 口语
    #[serde(rename = "speakingAnswer", rename_all = "camelCase")]
    Speaking { audio_url: String, duration: u64 },
}

impl Answer {
    /// 选择型答案（单选/填空/判断）
    pub fn selected(question_id: impl Into<String>, value: impl Into<String>, time_spent: u64) -> Self {
        Self {
            question_id: question_id.into(),
            payload: AnswerPayload::Selected(value.into()),
            time_spent,
        }
    }

    /// 写作答案，字数自动统计
    pub fn writing(question_id: impl Into<String>, text: impl Into<String>, time_spent: u64) -> Self {
        let text = text.into();
        let word_count = text.split_whitespace().count();
        Self {
            question_id: question_id.into(),
            payload: AnswerPayload::Writing { text, word_count },
            time_spent,
        }
    }

    /// 口语答案（录音引用 + 时长）
    pub fn speaking(
        question_id: impl Into<String>,
        audio_url: impl Into<String>,
        duration: u64,
        time_spent: u64,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            payload: AnswerPayload::Speaking { audio_url: audio_url.into(), duration },
            time_spent,
        }
    }

    /// 匹配答案，配对编码为 "左:右,左:右"
    pub fn matching(
        question_id: impl Into<String>,
        pairs: &[(String, String)],
        time_spent: u64,
    ) -> Self {
        let encoded = pairs
            .iter()
            .map(|(left, right)| format!("{}:{}", left, right))
            .collect::<Vec<_>>()
            .join(",");
        Self::selected(question_id, encoded, time_spent)
    }
}

impl AnswerPayload {
    /// 载荷类型名称（用于日志）
    pub fn kind_name(&self) -> &'static str {
        match self {
            AnswerPayload::Selected(_) => "选择",
            AnswerPayload::Writing { .. } => "写作",
            AnswerPayload::Speaking { .. } => "口语",
        }
    }

    /// 解码匹配配对串；非选择载荷返回 None
    pub fn matching_pairs(&self) -> Option<Vec<(String, String)>> {
        let AnswerPayload::Selected(encoded) = self else {
            return None;
        };

        let pairs = encoded
            .split(',')
            .filter_map(|pair| {
                let (left, right) = pair.split_once(':')?;
                Some((left.trim().to_string(), right.trim().to_string()))
            })
            .collect();

        Some(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_answer_uses_server_field_name() {
        let answer = Answer::selected("q1", "B", 12);
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["questionId"], "q1");
        assert_eq!(json["selectedAnswer"], "B");
        assert_eq!(json["timeSpent"], 12);
    }

    #[test]
    fn writing_answer_counts_words() {
        let answer = Answer::writing("q2", "the quick  brown fox", 90);
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["writingAnswer"]["wordCount"], 4);
        assert_eq!(json["writingAnswer"]["text"], "the quick  brown fox");
    }

    #[test]
    fn speaking_answer_round_trips() {
        let answer = Answer::speaking("q3", "https://cdn/a.webm", 45, 50);
        let json = serde_json::to_string(&answer).unwrap();
        let back: Answer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, answer);
    }

    #[test]
    fn matching_answer_encodes_pairs() {
        let pairs = vec![
            ("cat".to_string(), "猫".to_string()),
            ("dog".to_string(), "狗".to_string()),
        ];
        let answer = Answer::matching("q4", &pairs, 30);
        assert_eq!(answer.payload, AnswerPayload::Selected("cat:猫,dog:狗".to_string()));
        assert_eq!(answer.payload.matching_pairs().unwrap(), pairs);
    }
}
