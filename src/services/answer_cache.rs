//! 答案本地缓存 - 业务能力层
//!
//! 以 attempt_id 命名空间落盘，崩溃 / 刷新后可恢复。
//! 只在确认提交成功后删除。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{AppResult, StorageError};
use crate::models::Answer;

/// 缓存格式版本，不一致时告警但不拒绝加载
pub const STORAGE_VERSION: &str = "1.0.0";

const CACHE_PREFIX: &str = "exam_answers_";

/// 落盘的缓存记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnswers {
    pub answers: HashMap<String, Answer>,
    /// 保存时刻（Unix 毫秒）
    pub timestamp: i64,
    pub version: String,
}

impl StoredAnswers {
    /// 保存时刻，时间戳非法时为 None
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// 答案缓存
///
/// 职责：
/// - 每个会话一个 JSON 文件：`exam_answers_{attempt_id}.json`
/// - 全量覆盖写，不做增量
/// - 不认识防抖 / 提交流程
#[derive(Clone)]
pub struct AnswerCache {
    folder: PathBuf,
}

impl AnswerCache {
    /// 创建缓存，目录在首次写入时创建
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self { folder: folder.into() }
    }

    /// 缓存文件路径
    pub fn cache_path(&self, attempt_id: &str) -> PathBuf {
        self.folder.join(format!("{}{}.json", CACHE_PREFIX, attempt_id))
    }

    /// 全量保存一个会话的答案
    pub async fn save(&self, attempt_id: &str, answers: &[Answer]) -> AppResult<()> {
        fs::create_dir_all(&self.folder).await.map_err(|e| StorageError::WriteFailed {
            path: self.folder.display().to_string(),
            source: e,
        })?;

        let record = StoredAnswers {
            answers: answers
                .iter()
                .map(|a| (a.question_id.clone(), a.clone()))
                .collect(),
            timestamp: Utc::now().timestamp_millis(),
            version: STORAGE_VERSION.to_string(),
        };

        let path = self.cache_path(attempt_id);
        let content = serde_json::to_vec(&record).map_err(|e| StorageError::CacheParseFailed {
            path: path.display().to_string(),
            source: e,
        })?;

        fs::write(&path, content).await.map_err(|e| StorageError::WriteFailed {
            path: path.display().to_string(),
            source: e,
        })?;

        debug!("缓存已写入: {} ({} 条答案)", path.display(), record.answers.len());

        Ok(())
    }

    /// 加载一个会话的缓存，不存在时返回 None
    pub async fn load(&self, attempt_id: &str) -> AppResult<Option<StoredAnswers>> {
        let path = self.cache_path(attempt_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await.map_err(|e| StorageError::ReadFailed {
            path: path.display().to_string(),
            source: e,
        })?;

        let record: StoredAnswers =
            serde_json::from_str(&content).map_err(|e| StorageError::CacheParseFailed {
                path: path.display().to_string(),
                source: e,
            })?;

        if record.version != STORAGE_VERSION {
            warn!(
                "缓存版本不一致 ({} != {})，按当前格式继续加载: {}",
                record.version,
                STORAGE_VERSION,
                path.display()
            );
        }

        Ok(Some(record))
    }

    /// 删除一个会话的缓存，文件不存在视为成功
    pub async fn clear(&self, attempt_id: &str) -> AppResult<()> {
        let path = self.cache_path(attempt_id);
        match fs::remove_file(&path).await {
            Ok(_) => {
                debug!("缓存已删除: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed {
                path: path.display().to_string(),
                source: e,
            }
            .into()),
        }
    }

    /// 清理其他会话遗留的缓存文件，返回删除数量
    ///
    /// 写入失败（如磁盘配额）时的自救手段：只保留当前会话
    pub async fn purge_others(&self, keep_attempt_id: &str) -> AppResult<usize> {
        let keep_name = self
            .cache_path(keep_attempt_id)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut entries = match fs::read_dir(&self.folder).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    path: self.folder.display().to_string(),
                    source: e,
                }
                .into())
            }
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(|e| StorageError::ReadFailed {
            path: self.folder.display().to_string(),
            source: e,
        })? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(CACHE_PREFIX) && name.ends_with(".json") && name != keep_name {
                if let Err(e) = fs::remove_file(entry.path()).await {
                    warn!("清理缓存失败 {}: {}", name, e);
                } else {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            debug!("已清理 {} 个历史缓存文件", removed);
        }

        Ok(removed)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn test_folder(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("take_exam_submit_{}_{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let cache = AnswerCache::new(test_folder("round_trip"));
        let answers = vec![
            Answer::selected("q1", "A", 3),
            Answer::writing("q2", "an essay", 120),
        ];

        assert_ok!(cache.save("att-1", &answers).await);
        let stored = cache.load("att-1").await.unwrap().unwrap();

        assert_eq!(stored.version, STORAGE_VERSION);
        assert_eq!(stored.answers.len(), 2);
        assert_eq!(stored.answers["q1"], answers[0]);
        assert!(stored.saved_at().is_some());

        fs::remove_dir_all(cache.folder()).await.ok();
    }

    #[tokio::test]
    async fn load_missing_cache_is_none() {
        let cache = AnswerCache::new(test_folder("missing"));
        assert!(cache.load("att-none").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_removes_file_and_tolerates_absence() {
        let cache = AnswerCache::new(test_folder("clear"));
        cache.save("att-2", &[Answer::selected("q1", "A", 1)]).await.unwrap();
        assert!(cache.cache_path("att-2").exists());

        cache.clear("att-2").await.unwrap();
        assert!(!cache.cache_path("att-2").exists());

        // 再删一次不报错
        cache.clear("att-2").await.unwrap();

        fs::remove_dir_all(cache.folder()).await.ok();
    }

    #[tokio::test]
    async fn version_mismatch_still_loads() {
        let cache = AnswerCache::new(test_folder("version"));
        fs::create_dir_all(cache.folder()).await.unwrap();
        let content = r#"{"answers": {}, "timestamp": 1748800000000, "version": "0.9.0"}"#;
        fs::write(cache.cache_path("att-3"), content).await.unwrap();

        let stored = cache.load("att-3").await.unwrap().unwrap();
        assert_eq!(stored.version, "0.9.0");

        fs::remove_dir_all(cache.folder()).await.ok();
    }

    #[tokio::test]
    async fn purge_others_keeps_current_attempt() {
        let cache = AnswerCache::new(test_folder("purge"));
        cache.save("att-keep", &[Answer::selected("q1", "A", 1)]).await.unwrap();
        cache.save("att-old-1", &[Answer::selected("q1", "B", 1)]).await.unwrap();
        cache.save("att-old-2", &[Answer::selected("q1", "C", 1)]).await.unwrap();

        let removed = cache.purge_others("att-keep").await.unwrap();

        assert_eq!(removed, 2);
        assert!(cache.cache_path("att-keep").exists());
        assert!(!cache.cache_path("att-old-1").exists());

        fs::remove_dir_all(cache.folder()).await.ok();
    }
}
