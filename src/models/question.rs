//! 题目数据模型
//!
//! 题型是封闭的标签联合，新增题型必须补全所有 match 分支

use serde::{Deserialize, Serialize};

use crate::models::skill::Skill;

/// 选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
}

/// 题目
///
/// `kind` 按服务端的 type 字段区分题型，各题型携带自己的内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub points: f64,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// 题型
///
/// 与服务端的六种 type 一一对应，不允许未知题型静默通过
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    /// 单选题
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        question_text: String,
        #[serde(default)]
        options: Vec<Choice>,
    },
    /// 填空题
    #[serde(rename_all = "camelCase")]
    FillBlank { question_text: String },
    /// 判断题
    #[serde(rename_all = "camelCase")]
    TrueFalse { question_text: String },
    /// 写作题
    #[serde(rename_all = "camelCase")]
    Writing {
        question_text: String,
        #[serde(default)]
        min_words: Option<usize>,
    },
    /// 口语题
    #[serde(rename_all = "camelCase")]
    Speaking {
        question_text: String,
        #[serde(default)]
        audio: Option<String>,
    },
    /// 匹配题（选项以 "左项 - 右项" 编码配对）
    #[serde(rename_all = "camelCase")]
    Matching {
        question_text: String,
        #[serde(default)]
        options: Vec<Choice>,
    },
}

impl Question {
    /// 获取题干
    pub fn text(&self) -> &str {
        match &self.kind {
            QuestionKind::MultipleChoice { question_text, .. }
            | QuestionKind::FillBlank { question_text }
            | QuestionKind::TrueFalse { question_text }
            | QuestionKind::Writing { question_text, .. }
            | QuestionKind::Speaking { question_text, .. }
            | QuestionKind::Matching { question_text, .. } => question_text,
        }
    }

    /// 获取题型名称（用于日志）
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            QuestionKind::MultipleChoice { .. } => "单选",
            QuestionKind::FillBlank { .. } => "填空",
            QuestionKind::TrueFalse { .. } => "判断",
            QuestionKind::Writing { .. } => "写作",
            QuestionKind::Speaking { .. } => "口语",
            QuestionKind::Matching { .. } => "匹配",
        }
    }

    /// 解析匹配题的左右配对
    ///
    /// 非匹配题返回 None；无分隔符的选项按"只有左项"处理
    pub fn matching_pairs(&self) -> Option<Vec<(String, String)>> {
        let QuestionKind::Matching { options, .. } = &self.kind else {
            return None;
        };

        let pairs = options
            .iter()
            .map(|option| match option.text.split_once(" - ") {
                Some((left, right)) => (left.trim().to_string(), right.trim().to_string()),
                None => (option.text.trim().to_string(), String::new()),
            })
            .collect();

        Some(pairs)
    }
}

/// 小节题目列表（服务端按小节下发）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionQuestions {
    pub section_id: String,
    pub skill: Skill,
    #[serde(default)]
    pub time_limit: Option<u64>,
    #[serde(default)]
    pub remaining_time: Option<u64>,
    pub questions: Vec<Question>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_multiple_choice_with_options() {
        let json = r#"{
            "_id": "q1",
            "type": "multiple_choice",
            "questionText": "Choose one",
            "options": [{"text": "A"}, {"text": "B"}],
            "points": 2
        }"#;

        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.id, "q1");
        assert_eq!(question.text(), "Choose one");
        match &question.kind {
            QuestionKind::MultipleChoice { options, .. } => assert_eq!(options.len(), 2),
            other => panic!("题型错误: {:?}", other),
        }
    }

    #[test]
    fn unknown_question_type_is_an_error() {
        let json = r#"{"_id": "q9", "type": "essay_cloze", "questionText": "?"}"#;
        assert!(serde_json::from_str::<Question>(json).is_err());
    }

    #[test]
    fn matching_pairs_split_on_separator() {
        let question = Question {
            id: "q2".to_string(),
            points: 1.0,
            kind: QuestionKind::Matching {
                question_text: "配对".to_string(),
                options: vec![
                    Choice { text: "cat - 猫".to_string() },
                    Choice { text: "dog - 狗".to_string() },
                    Choice { text: "orphan".to_string() },
                ],
            },
        };

        let pairs = question.matching_pairs().unwrap();
        assert_eq!(pairs[0], ("cat".to_string(), "猫".to_string()));
        assert_eq!(pairs[2], ("orphan".to_string(), String::new()));
    }

    #[test]
    fn matching_pairs_is_none_for_other_kinds() {
        let question = Question {
            id: "q3".to_string(),
            points: 1.0,
            kind: QuestionKind::FillBlank { question_text: "填空".to_string() },
        };
        assert!(question.matching_pairs().is_none());
    }

    #[test]
    fn section_questions_parse_skill() {
        let json = r#"{
            "sectionId": "s1",
            "skill": "listening",
            "timeLimit": 600,
            "remainingTime": 540,
            "questions": []
        }"#;

        let section: SectionQuestions = serde_json::from_str(json).unwrap();
        assert_eq!(section.skill, Skill::Listening);
        assert_eq!(section.time_limit, Some(600));
    }
}
