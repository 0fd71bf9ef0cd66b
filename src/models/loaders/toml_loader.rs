//! 答题脚本加载
//!
//! 每个 TOML 文件描述一场考试的作答内容：考哪场、按什么节奏、答什么

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 答题脚本
#[derive(Debug, Clone, Deserialize)]
pub struct AttemptScript {
    /// 考试 ID（服务端的 exam 标识）
    pub exam_id: String,
    /// 脚本名称（仅用于日志）
    #[serde(default)]
    pub name: Option<String>,
    /// 最终提交前是否确认（false 表示放弃提交）
    #[serde(default = "default_confirm_submit")]
    pub confirm_submit: bool,
    /// 每题默认思考时间（毫秒）
    #[serde(default)]
    pub think_time_ms: Option<u64>,
    /// 作答列表，按出现顺序执行
    #[serde(default)]
    pub answers: Vec<ScriptedAnswer>,
    /// 来源文件路径
    #[serde(skip)]
    pub file_path: Option<String>,
}

fn default_confirm_submit() -> bool {
    true
}

impl AttemptScript {
    /// 日志显示用标签
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.exam_id)
    }
}

/// 脚本中的一次作答
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedAnswer {
    /// 小节序号（从 1 开始）
    pub section: usize,
    /// 题目在小节内的序号（从 1 开始）
    pub question: usize,
    #[serde(flatten)]
    pub response: ScriptedResponse,
    /// 本题思考时间，覆盖脚本级默认值
    #[serde(default)]
    pub think_time_ms: Option<u64>,
}

/// 作答内容，按字段名区分类型
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptedResponse {
    /// 口语：录音引用 + 时长（秒）
    Audio { audio: String, duration: u64 },
    /// 匹配：左右配对列表
    Pairs { pairs: Vec<(String, String)> },
    /// 单选 / 判断 / 填空
    Choice { select: String },
    /// 写作
    Text { text: String },
}

/// 从 TOML 文件加载答题脚本
pub async fn load_script_file(script_path: &Path) -> Result<AttemptScript> {
    let content = fs::read_to_string(script_path)
        .await
        .with_context(|| format!("无法读取脚本文件: {}", script_path.display()))?;

    let mut script: AttemptScript = toml::from_str(&content)
        .with_context(|| format!("无法解析脚本文件: {}", script_path.display()))?;

    script.file_path = Some(script_path.to_string_lossy().to_string());

    Ok(script)
}

/// 从文件夹加载所有答题脚本
///
/// 单个文件解析失败只告警，不影响其他脚本
pub async fn load_all_scripts(folder_path: &str) -> Result<Vec<AttemptScript>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut scripts = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            tracing::info!(
                "正在加载: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );

            match load_script_file(&path).await {
                Ok(script) => {
                    tracing::info!("成功加载脚本 [{}]，共 {} 次作答", script.label(), script.answers.len());
                    scripts.push(script);
                }
                Err(e) => {
                    tracing::warn!("加载脚本失败 {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_response_kinds() {
        let content = r#"
            exam_id = "exam-9"
            name = "六月模考"
            think_time_ms = 800

            [[answers]]
            section = 1
            question = 1
            select = "B"

            [[answers]]
            section = 2
            question = 1
            text = "My summer holiday was quiet."
            think_time_ms = 5000

            [[answers]]
            section = 3
            question = 1
            audio = "https://cdn/rec.webm"
            duration = 42

            [[answers]]
            section = 1
            question = 2
            pairs = [["cat", "猫"], ["dog", "狗"]]
        "#;

        let script: AttemptScript = toml::from_str(content).unwrap();
        assert_eq!(script.label(), "六月模考");
        assert!(script.confirm_submit);
        assert_eq!(script.answers.len(), 4);
        assert!(matches!(script.answers[0].response, ScriptedResponse::Choice { .. }));
        assert!(matches!(script.answers[1].response, ScriptedResponse::Text { .. }));
        assert!(matches!(script.answers[2].response, ScriptedResponse::Audio { .. }));
        assert!(matches!(script.answers[3].response, ScriptedResponse::Pairs { .. }));
        assert_eq!(script.answers[1].think_time_ms, Some(5000));
    }

    #[test]
    fn confirm_submit_can_opt_out() {
        let content = r#"
            exam_id = "exam-9"
            confirm_submit = false
        "#;

        let script: AttemptScript = toml::from_str(content).unwrap();
        assert!(!script.confirm_submit);
        assert!(script.answers.is_empty());
    }
}
